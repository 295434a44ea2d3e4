use super::{junit, RunnerError, TestExecutor, TestInvocation, TestOutcome};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const OUTPUT_TAIL_LINES: usize = 20;

/// Runs the test command through a shell, the way a developer would type it.
///
/// On Unix the shell leads its own process group. A timeout kills the whole
/// group, including any JVMs the build tool forked.
#[derive(Debug, Clone)]
pub struct ProcessTestExecutor {
    shell: String,
}

impl Default for ProcessTestExecutor {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ProcessTestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl TestExecutor for ProcessTestExecutor {
    async fn execute(&self, invocation: &TestInvocation) -> Result<TestOutcome, RunnerError> {
        info!(
            module = %invocation.module,
            command = %invocation.command,
            dir = %invocation.working_dir.display(),
            "Running tests"
        );

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&invocation.command)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let child = command.spawn().map_err(|source| RunnerError::Spawn {
            command: invocation.command.clone(),
            source,
        })?;
        let pid = child.id();

        let waited = match invocation.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    if let Some(pid) = pid {
                        kill_group(pid);
                    }
                    return Err(RunnerError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| RunnerError::Spawn {
            command: invocation.command.clone(),
            source,
        })?;
        let duration = start.elapsed();

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let cases = junit::collect_results(&invocation.results_dir)
            .map_err(|e| RunnerError::Results(format!("{:#}", e)))?;

        debug!(
            module = %invocation.module,
            exit_code = ?output.status.code(),
            tests = cases.len(),
            duration_ms = duration.as_millis(),
            "Test command finished"
        );

        Ok(TestOutcome {
            exit_code: output.status.code(),
            cases,
            duration,
            trace_path: invocation.trace_path.clone(),
            output_tail: tail(&combined, OUTPUT_TAIL_LINES),
        })
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match i32::try_from(pid) {
        Ok(raw) => {
            if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                debug!(pid, error = %e, "Process group already gone");
            }
        }
        Err(_) => warn!(pid, "Cannot signal process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
