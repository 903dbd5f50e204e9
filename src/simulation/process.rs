//! Subprocess-backed solver.
//!
//! Command line:
//!
//! ```text
//! <python> <script> <filePath> <outputNode> <frameKey> <toPrint> <minIndex>
//!          <loggingLevel> <debugNodesCsv> <debugEdgesCsv>
//! ```
//!
//! The script may print diagnostics before its result; the result is the
//! last stdout line that starts with `{`.

use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use super::{SimulationRequest, SimulationResult, Solver, SolverConfig};
use crate::{Error, Result};

const SOLVER_PACKAGE: &str = "constrainthg";

/// Runs the configured script once per request. No retries, no cancellation.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    config: SolverConfig,
}

impl ProcessSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Arguments after the interpreter.
    pub fn args(&self, request: &SimulationRequest) -> Vec<OsString> {
        let c = &self.config;
        vec![
            c.script.clone().into_os_string(),
            request.file_path.clone().into_os_string(),
            request.node.clone().into(),
            request.frame.clone().into(),
            c.to_print.to_string().into(),
            c.min_index.to_string().into(),
            c.logging_level.to_string().into(),
            c.debug_nodes.join(",").into(),
            c.debug_edges.join(",").into(),
        ]
    }
}

#[async_trait]
impl Solver for ProcessSolver {
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult> {
        tracing::info!(node = %request.node, frame = %request.frame, "starting solver");
        let output = Command::new(&self.config.python)
            .args(self.args(request))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::Simulation {
                    message: format!("interpreter '{}' not found", self.config.python.display()),
                    remediation: Some("set the solver interpreter path".into()),
                },
                _ => Error::Io(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let result = parse_output(output.status, &stdout, &stderr);
        if let Err(e) = &result {
            tracing::error!(node = %request.node, error = %e, "solver failed");
        }
        result
    }
}

/// Interpret a finished solver run.
pub fn parse_output(status: ExitStatus, stdout: &str, stderr: &str) -> Result<SimulationResult> {
    if !status.success() {
        return Err(failure(stderr, format!("solver exited with {status}")));
    }
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| failure(stderr, "solver printed no result".into()))?;
    serde_json::from_str(line).map_err(|e| failure(stderr, format!("unreadable solver result: {e}")))
}

fn failure(stderr: &str, fallback: String) -> Error {
    let stderr = stderr.trim();
    let remediation = stderr
        .contains(&format!("No module named '{SOLVER_PACKAGE}'"))
        .then(|| format!("pip install {SOLVER_PACKAGE}"));
    Error::Simulation {
        message: if stderr.is_empty() { fallback } else { stderr.to_string() },
        remediation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    fn status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_argument_order() {
        let solver = ProcessSolver::new(SolverConfig {
            debug_nodes: vec!["a".into(), "b".into()],
            ..SolverConfig::default()
        });
        let req = SimulationRequest {
            file_path: PathBuf::from("/tmp/g.json"),
            node: "b".into(),
            frame: "f0".into(),
        };
        let args: Vec<String> = solver.args(&req).into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(args, vec!["simulate_chg.py", "/tmp/g.json", "b", "f0", "false", "0", "30", "a,b", ""]);
    }

    #[cfg(unix)]
    #[test]
    fn test_last_json_line_wins() {
        let out = "loading...\n{\"partial\": true}\nstep 3\n{\"value\": 4}\n";
        let r = parse_output(status(0), out, "").unwrap();
        assert!(matches!(r, SimulationResult::Success(s) if s.value == serde_json::json!(4)));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let err = parse_output(status(1), "", "ModuleNotFoundError: No module named 'constrainthg'").unwrap_err();
        match err {
            Error::Simulation { message, remediation } => {
                assert!(message.contains("constrainthg"));
                assert_eq!(remediation.as_deref(), Some("pip install constrainthg"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_no_result_line() {
        assert!(matches!(parse_output(status(0), "nothing here\n", ""), Err(Error::Simulation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_progress_line_is_not_a_result() {
        let out = "{\"value\": 4}\n{\"status\": \"done\"}\n";
        match parse_output(status(0), out, "") {
            Err(Error::Simulation { message, .. }) => assert!(message.starts_with("unreadable solver result")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
