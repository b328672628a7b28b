use std::path::Path;

use dw_dsl::ScriptConfig;
use dw_dsl::diagnostics::Diagnostic;

pub fn run(path: &Path, config: &ScriptConfig) -> Result<(), String> {
    let script = super::load(path, config)?;
    let graph = script.graph();

    let mut warnings = Vec::new();
    for id in graph.unreachable() {
        warnings.push(
            Diagnostic::warning(script.header(id), format!("state {id} is unreachable"))
                .in_state(id),
        );
    }
    for state in graph.states() {
        let all_conditional = !state.replies.is_empty()
            && state.replies.iter().all(|r| r.condition.is_some());
        if all_conditional {
            warnings.push(
                Diagnostic::warning(
                    script.header(state.id),
                    format!("every reply of state {} is conditional", state.id),
                )
                .with_label("players may find no way forward here")
                .in_state(state.id),
            );
        }
    }
    super::print_diagnostics(&script.source, path, &warnings);

    let replies: usize = graph.states().map(|s| s.replies.len()).sum();
    let locks = graph.states().filter(|s| s.lock.is_some()).count();
    let endings = graph.states().filter(|s| s.is_terminal()).count();

    println!("  All checks passed for '{}'.", path.display());
    println!(
        "  {} states, {replies} replies, {locks} locks, {endings} endings",
        graph.len()
    );

    Ok(())
}
