use std::path::PathBuf;

use clap::Parser;

use crate::config::{Mode, ServerConfig};

#[derive(Debug, Clone, Parser)]
#[command(name = "ferry", version, about = "Static file server and forward proxy")]
pub struct Cli {
    /// TOML configuration file; flags given here override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long)]
    pub bind: Option<String>,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Directory served in file mode
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Compress responses for clients that accept gzip
    #[arg(long)]
    pub gzip: bool,

    /// Close every connection after one response
    #[arg(long)]
    pub no_keep_alive: bool,
}

impl Cli {
    /// Overrides `config` with the flags that were given.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.bind.clone_from(bind);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        if self.gzip {
            config.gzip = true;
        }
        if self.no_keep_alive {
            config.keep_alive = false;
        }
    }
}
