use std::path::PathBuf;

use clap::Parser;
use textgrab_config::Config;
use textgrab_types::{BackendId, Shortcut};

/// Copy the text of any screen region to the clipboard with a global hotkey
#[derive(Parser, Debug)]
#[command(name = "textgrab", version)]
pub struct Cli {
    /// Settings file, defaults to the user config directory
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hotkey for this run, e.g. "shift+ctrl+t"
    #[arg(long)]
    pub shortcut: Option<Shortcut>,

    /// OCR backend for this run
    #[arg(long)]
    pub backend: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Print the effective settings and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Apply command line overrides, which win over the file and the environment
    pub fn apply(&self, config: &mut Config) {
        if let Some(shortcut) = &self.shortcut {
            config.hotkey.shortcut = shortcut.clone();
        }
        if let Some(backend) = &self.backend {
            config.ocr.backend = BackendId::new(backend.trim());
        }
    }
}
