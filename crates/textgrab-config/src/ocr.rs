use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use textgrab_types::BackendId;

fn default_backend() -> BackendId {
    if cfg!(windows) {
        BackendId::new("windows-ocr")
    } else {
        BackendId::new("tesseract")
    }
}

fn default_probe_args() -> Vec<String> {
    vec!["--version".to_string()]
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_language() -> String {
    "ja".to_string()
}

/// How to reach one recognition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// External program reading a PNG on stdin and printing text on stdout
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_probe_args")]
        probe_args: Vec<String>,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Windows.Media.Ocr
    WindowsOcr {
        #[serde(default = "default_language")]
        language: String,
    },
}

impl BackendConfig {
    pub fn command(program: &str, args: &[&str]) -> Self {
        BackendConfig::Command {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            probe_args: default_probe_args(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_backends() -> BTreeMap<BackendId, BackendConfig> {
    BTreeMap::from([
        (
            BackendId::new("tesseract"),
            BackendConfig::command("tesseract", &["stdin", "stdout", "-l", "eng"]),
        ),
        (
            BackendId::new("tesseract-jpn"),
            BackendConfig::command("tesseract", &["stdin", "stdout", "-l", "jpn"]),
        ),
        (
            BackendId::new("windows-ocr"),
            BackendConfig::WindowsOcr {
                language: default_language(),
            },
        ),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Currently selected backend
    #[serde(default = "default_backend")]
    pub backend: BackendId,
    #[serde(default = "default_backends")]
    pub backends: BTreeMap<BackendId, BackendConfig>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            backends: default_backends(),
        }
    }
}
