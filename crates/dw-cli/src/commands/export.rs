use std::path::Path;

use dw_core::StateDefinition;
use dw_dsl::{ScriptConfig, print_script};

pub fn run(
    path: &Path,
    config: &ScriptConfig,
    format: &str,
    output: Option<&Path>,
) -> Result<(), String> {
    let script = super::load(path, config)?;

    let content = match format {
        "json" => {
            let mut json = serde_json::to_string_pretty(script.graph())
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            json.push('\n');
            json
        }
        "script" | "md" => {
            let states: Vec<StateDefinition> = script.graph().states().cloned().collect();
            print_script(&states, config)
        }
        _ => {
            return Err(format!(
                "unsupported format: \"{format}\". Use: json, script"
            ));
        }
    };

    if let Some(path) = output {
        std::fs::write(path, &content)
            .map_err(|e| format!("cannot write to {}: {e}", path.display()))?;
        println!("  Exported to {}", path.display());
    } else {
        print!("{content}");
    }

    Ok(())
}
