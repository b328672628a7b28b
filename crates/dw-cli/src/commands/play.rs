//! Play a script in the terminal.
//!
//! Standard input is the player's side of the chat: `/start` begins a game,
//! every other line is sent as a message, and `/quit` or end of input
//! leaves. Outbound messages are drained from a channel by a printer task.

use std::path::{Path, PathBuf};

use dw_dsl::ScriptConfig;
use dw_fiction::{Engine, EngineConfig, Event, Outbound, Outbox, Phrases, UserId, button_rows};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// The terminal hosts a single player.
const PLAYER: UserId = 1;

/// Options for the `play` command.
pub struct PlayOptions {
    pub seed: Option<u64>,
    pub phrases: Option<PathBuf>,
    pub wait_scale: f64,
    pub money_threshold: u32,
}

pub fn run(path: &Path, config: &ScriptConfig, options: PlayOptions) -> Result<(), String> {
    let script = super::load(path, config)?;

    let mut engine_config = EngineConfig::default()
        .with_wait_scale(options.wait_scale)
        .with_money_threshold(options.money_threshold);
    if let Some(seed) = options.seed {
        engine_config = engine_config.with_seed(seed);
    }
    if let Some(phrases) = &options.phrases {
        engine_config = engine_config.with_phrases(Phrases::load(phrases).map_err(|e| e.to_string())?);
    }

    tracing::info!(script = %path.display(), states = script.graph().len(), "script loaded");
    let engine = Engine::new(script.loaded.graph, engine_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {e}"))?;
    let result = runtime.block_on(serve(engine));
    // A pending stdin read would otherwise hold up shutdown after /quit.
    runtime.shutdown_background();
    result
}

async fn serve(engine: Engine) -> Result<(), String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = rx.recv().await {
            let text = format!("{}\n\n", render(&message));
            if stdout.write_all(text.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    });

    tx.emit_text("Type /start to begin and /quit to leave.".to_string());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("cannot read input: {e}"))?
    {
        let event = match line.trim() {
            "/quit" => break,
            "/start" => Event::Start,
            _ => Event::Text(line),
        };
        engine
            .handle(PLAYER, event, &tx)
            .await
            .map_err(|e| e.to_string())?;
    }

    drop(tx);
    printer.await.map_err(|e| format!("output task failed: {e}"))
}

/// Render a message, laying out menus with their buttons underneath.
fn render(message: &Outbound) -> String {
    match message {
        Outbound::Text(_) => message.render(),
        Outbound::Menu(choices) => {
            let buttons = button_rows(choices.len())
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|n| format!("[{n}]"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n{buttons}", message.render())
        }
    }
}
