use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbaImage;
use textgrab_config::BackendConfig;
use textgrab_core::{BackendProvider, Recognizer};
use textgrab_types::RecognitionError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::encode_png;

/// External recognizer: PNG on stdin, UTF-8 text on stdout
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    probe_args: Vec<String>,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(program: &str, args: &[String], probe_args: &[String], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            probe_args: probe_args.to_vec(),
            timeout,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Option<Self> {
        match config {
            BackendConfig::Command {
                program,
                args,
                probe_args,
                timeout_ms,
            } => Some(Self::new(
                program,
                args,
                probe_args,
                Duration::from_millis(*timeout_ms),
            )),
            _ => None,
        }
    }

    async fn probe(&self) -> Result<()> {
        if self.probe_args.is_empty() {
            return Ok(());
        }

        let status = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.probe_args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status(),
        )
        .await
        .with_context(|| format!("{} did not answer in time", self.program))?
        .with_context(|| format!("Failed to run {}", self.program))?;

        anyhow::ensure!(status.success(), "{} exited with {status}", self.program);
        Ok(())
    }
}

#[async_trait]
impl BackendProvider for CommandProvider {
    async fn initialize(&self) -> Result<Arc<dyn Recognizer>, RecognitionError> {
        self.probe()
            .await
            .map_err(|e| RecognitionError::Unavailable(format!("{e:#}")))?;

        tracing::debug!(program = %self.program, "Command backend probed");
        Ok(Arc::new(CommandRecognizer {
            config: self.clone(),
        }))
    }
}

struct CommandRecognizer {
    config: CommandProvider,
}

impl CommandRecognizer {
    async fn run(&self, image: &RgbaImage) -> Result<String> {
        let png = encode_png(image)?;
        let program = &self.config.program;

        let mut child = Command::new(program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {program}"))?;

        let mut stdin = child.stdin.take().context("Child stdin is not piped")?;
        let write = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };

        let (written, output) = tokio::time::timeout(self.config.timeout, async move {
            tokio::join!(write, child.wait_with_output())
        })
        .await
        .with_context(|| format!("{program} timed out"))?;

        let output = output.with_context(|| format!("Failed to read output of {program}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{program} exited with {}: {}", output.status, stderr.trim());
        }
        written.with_context(|| format!("Failed to send image to {program}"))?;

        String::from_utf8(output.stdout).with_context(|| format!("{program} printed invalid UTF-8"))
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        self.run(image)
            .await
            .map_err(|e| RecognitionError::Engine(format!("{e:#}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, probe: &[&str]) -> CommandProvider {
        CommandProvider::new(
            "sh",
            &["-c".to_string(), script.to_string()],
            &probe.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_stdout_becomes_text() {
        let provider = shell("cat > /dev/null; printf 'こんにちは\\n'", &["-c", "true"]);
        let recognizer = provider.initialize().await.unwrap();

        let text = recognizer.recognize(&RgbaImage::new(4, 4)).await.unwrap();
        assert_eq!(text, "こんにちは\n");
    }

    #[tokio::test]
    async fn test_receives_png_on_stdin() {
        let provider = shell("head -c 4 | tail -c 3", &[]);
        let recognizer = provider.initialize().await.unwrap();

        let text = recognizer.recognize(&RgbaImage::new(2, 2)).await.unwrap();
        assert_eq!(text, "PNG");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_engine_error() {
        let provider = shell("cat > /dev/null; echo boom >&2; exit 3", &[]);
        let recognizer = provider.initialize().await.unwrap();

        match recognizer.recognize(&RgbaImage::new(2, 2)).await {
            Err(RecognitionError::Engine(message)) => assert!(message.contains("boom")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_probe_is_unavailable() {
        let provider = shell("true", &["-c", "exit 1"]);
        assert!(matches!(
            provider.initialize().await,
            Err(RecognitionError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let provider = CommandProvider::new(
            "textgrab-no-such-ocr-program",
            &[],
            &["--version".to_string()],
            Duration::from_secs(5),
        );
        assert!(matches!(
            provider.initialize().await,
            Err(RecognitionError::Unavailable(_))
        ));
    }
}
