//! Topic extraction through a child process
//!
//! The request is written to the child's stdin as JSON and the response is
//! read from its stdout. The child is killed if the call is dropped (e.g. on
//! timeout).

use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ExtractorError, TopicExtractor, TopicRequest, TopicResponse};

/// Runs an external topic model as a child process
#[derive(Debug, Clone)]
pub struct SubprocessExtractor {
    program: String,
    args: Vec<String>,
}

impl SubprocessExtractor {
    /// Create from a program and its arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create from a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Extractor command is empty"))?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Program being executed
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl TopicExtractor for SubprocessExtractor {
    fn name(&self) -> &str {
        "subprocess"
    }

    async fn extract(&self, request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExtractorError::Spawn)?;

        tracing::debug!(
            program = %self.program,
            documents = request.items.len(),
            "Spawned topic extractor"
        );

        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => {
                    stdin.write_all(&payload).await?;
                    stdin.shutdown().await
                }
                None => Ok::<(), std::io::Error>(()),
            }
        };

        // Feed stdin while draining stdout so a chatty child cannot block
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(ExtractorError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // A child that ignores stdin may close the pipe early
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(ExtractorError::Io(e));
            }
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractorError::EmptyOutput);
        }

        let response = serde_json::from_slice(&output.stdout)?;
        Ok(response)
    }
}
