use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "gan-audit-server", version)]
#[command(about = "Iterative adversarial code-audit server")]
pub struct Cli {
    /// Transport the server speaks. `stdio` is the only built-in realization
    /// of the (otherwise out-of-scope) transport layer.
    #[arg(long, default_value = "stdio")]
    pub transport: Transport,

    /// Overrides `stateDirectory` from `.gan-audit.toml`/env.
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Overrides `judgeExecutable` from `.gan-audit.toml`/env.
    #[arg(long)]
    pub judge: Option<PathBuf>,

    /// Working directory to load `.gan-audit.toml` from and resolve relative
    /// paths against (defaults to the current directory).
    #[arg(long)]
    pub cd: Option<PathBuf>,

    /// Tracing filter, e.g. `info`, `gan_engine=debug`. Falls back to
    /// `RUST_LOG` then `info`.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
}
