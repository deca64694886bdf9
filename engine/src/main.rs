//! mimic-replay - run a recorded s-expression script through the engine
//! and print dispatched actions and toggle events.

use anyhow::Context;
use clap::Parser;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;

use mimic_engine::replay::Replay;
use mimic_engine::{EngineConfig, InteractionMode, Profile, SmoothingConfig};

#[derive(Parser, Debug)]
#[command(name = "mimic-replay", about = "Replay expression frames through the mimic engine")]
struct Cli {
    /// Script file, one s-expression per line (default: stdin)
    script: Option<PathBuf>,

    /// Smoothing factor (clamped to 0.1-0.9)
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    /// Interaction mode: expression-only, cursor-click, head-mouse
    #[arg(long, default_value = "expression-only")]
    mode: String,

    /// Global cooldown between any two trigger fires
    #[arg(long, default_value_t = 300)]
    global_cooldown_ms: u64,

    /// Also print dwell progress and key consumption events
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mimic_engine=info".into()),
        )
        .init();

    let Some(mode) = InteractionMode::from_str(&cli.mode) else {
        anyhow::bail!(
            "Unknown mode: {}. Use: expression-only, cursor-click, head-mouse",
            cli.mode
        );
    };

    let config = EngineConfig {
        mode,
        smoothing: SmoothingConfig {
            alpha: cli.alpha,
            ..SmoothingConfig::default()
        },
        profile: Profile::default().with_global_cooldown(cli.global_cooldown_ms),
        ..EngineConfig::default()
    };

    info!("mimic-replay v{} starting", env!("CARGO_PKG_VERSION"));
    let mut replay = Replay::new(config, cli.trace);

    let (source, reader): (String, Box<dyn BufRead>) = match &cli.script {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            (path.display().to_string(), Box::new(BufReader::new(file)))
        }
        None => ("<stdin>".to_string(), Box::new(BufReader::new(std::io::stdin()))),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", source))?;
        let emitted = replay
            .apply_line(&line)
            .with_context(|| format!("{}:{}", source, n + 1))?;
        for event in emitted {
            writeln!(out, "{}", event)?;
        }
    }
    writeln!(
        out,
        "(:type :event :event :finished :engine {})",
        replay.engine().status_sexp()
    )?;
    Ok(())
}
