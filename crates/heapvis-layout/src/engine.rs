use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The engine binary could not be started.
    Unavailable(String),
    /// The engine ran but reported failure.
    Failed(String),
    /// The engine's output could not be parsed.
    Parse(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Unavailable(msg) => write!(f, "layout engine unavailable: {msg}"),
            LayoutError::Failed(msg) => write!(f, "layout failed: {msg}"),
            LayoutError::Parse(msg) => write!(f, "malformed layout output: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Turns a DOT script into an xdot drawing script.
pub trait LayoutEngine: Send + Sync {
    /// Cheap probe run before switching to a view that needs the engine.
    fn is_available(&self) -> bool;

    fn layout(&self, dot: &str) -> Result<String, LayoutError>;
}

/// Graphviz `dot`, run as a subprocess.
#[derive(Debug, Clone)]
pub struct Graphviz {
    program: PathBuf,
}

impl Graphviz {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn spawn_error(&self, e: io::Error) -> LayoutError {
        let program = self.program.display();
        if e.kind() == io::ErrorKind::NotFound {
            LayoutError::Unavailable(format!("{program} not found"))
        } else {
            LayoutError::Unavailable(format!("spawn {program}: {e}"))
        }
    }
}

impl Default for Graphviz {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl LayoutEngine for Graphviz {
    fn is_available(&self) -> bool {
        let status = Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!(program = %self.program.display(), error = %e, "layout engine probe failed");
                false
            }
        }
    }

    fn layout(&self, dot: &str) -> Result<String, LayoutError> {
        let mut child = Command::new(&self.program)
            .arg("-Txdot")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dot.as_bytes())
                .map_err(|e| LayoutError::Failed(format!("write dot input: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| LayoutError::Failed(format!("wait for dot: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LayoutError::Failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        debug!(bytes = output.stdout.len(), "layout engine finished");
        String::from_utf8(output.stdout)
            .map_err(|e| LayoutError::Parse(format!("xdot output is not utf-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = Graphviz::new("/nonexistent/heapvis-test/dot");
        assert!(!engine.is_available());
        match engine.layout("digraph {}") {
            Err(LayoutError::Unavailable(msg)) => assert!(msg.contains("not found"), "{msg}"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn errors_render_with_context() {
        assert_eq!(
            LayoutError::Failed("boom".into()).to_string(),
            "layout failed: boom"
        );
        assert_eq!(
            LayoutError::Unavailable("dot not found".into()).to_string(),
            "layout engine unavailable: dot not found"
        );
    }
}
