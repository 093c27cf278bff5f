use std::io::{self, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

const WL_COPY_COMMAND: &str = "wl-copy";
const MIME_IMAGE_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to run clipboard command: {command}")]
    CommandIo {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("clipboard command exited with non-zero status: {status}")]
    CommandFailed { status: String },
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardBackend {
    fn copy_png(&self, png: &[u8]) -> ClipboardResult<()>;
}

/// Pipes PNG bytes into an external clipboard program.
#[derive(Debug, Clone)]
pub struct CommandClipboardBackend {
    program: String,
    args: Vec<String>,
}

impl Default for CommandClipboardBackend {
    fn default() -> Self {
        Self::with_command(
            WL_COPY_COMMAND,
            ["--type".to_string(), MIME_IMAGE_PNG.to_string()],
        )
    }
}

impl CommandClipboardBackend {
    pub fn with_command(
        program: impl Into<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn io_error(&self, source: io::Error) -> ClipboardError {
        ClipboardError::CommandIo {
            command: self.program.clone(),
            source,
        }
    }
}

impl ClipboardBackend for CommandClipboardBackend {
    fn copy_png(&self, png: &[u8]) -> ClipboardResult<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|err| self.io_error(err))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).map_err(|err| self.io_error(err))?;
        }

        let status = child.wait().map_err(|err| self.io_error(err))?;
        if status.success() {
            tracing::debug!(bytes = png.len(), program = %self.program, "copied png to clipboard");
            Ok(())
        } else {
            Err(ClipboardError::CommandFailed {
                status: status.to_string(),
            })
        }
    }
}
