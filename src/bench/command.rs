use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How often the runner polls a child for exit while the budget lasts
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of one invocation under a wall-clock budget
#[derive(Debug)]
pub enum RunOutcome {
    /// The process exited on its own; nonzero exits land here too
    Completed {
        /// stdout and stderr merged in arrival order
        output: String,
        exit_code: i32,
    },
    /// The budget expired and the process tree was killed; any partial
    /// output is discarded
    TimedOut,
}

/// Executes a single command with captured output and a hard timeout
///
/// Commands are spawned with explicit argument vectors, never through a
/// shell. Each child gets its own process group so that a timeout kills
/// everything the command spawned (mpirun and its workers included).
pub struct ProcessRunner {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, working_dir: Option<PathBuf>) -> Self {
        Self {
            timeout,
            working_dir,
        }
    }

    /// Run a command to completion or until the budget expires.
    ///
    /// A nonzero exit code is a normal return, not an error; `Err` is
    /// reserved for failures of the runner itself (spawn, wait).
    pub fn run(&self, program: &str, args: &[String]) -> Result<RunOutcome> {
        debug!("Executing: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn command: {program}"))?;

        let merged = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::new();

        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Arc::clone(&merged)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Arc::clone(&merged)));
        }

        let deadline = Instant::now() + self.timeout;

        loop {
            match child.try_wait().context("Failed to poll child process")? {
                Some(status) => {
                    for handle in readers {
                        let _ = handle.join();
                    }
                    let output = merged.lock().unwrap_or_else(|e| e.into_inner()).clone();
                    return Ok(RunOutcome::Completed {
                        output,
                        exit_code: status.code().unwrap_or(-1),
                    });
                }
                None => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Command '{}' exceeded {}s budget, killing process group",
                            program,
                            self.timeout.as_secs()
                        );
                        kill_process_group(&mut child);
                        for handle in readers {
                            let _ = handle.join();
                        }
                        return Ok(RunOutcome::TimedOut);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

/// Drain a child stream into the shared merged buffer chunk by chunk,
/// so stdout and stderr interleave close to the order they were written
fn spawn_reader<R: Read + Send + 'static>(
    mut stream: R,
    merged: Arc<Mutex<String>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if let Ok(mut merged) = merged.lock() {
                        merged.push_str(&chunk);
                    }
                }
                Err(e) => {
                    debug!("Stream read ended: {e}");
                    break;
                }
            }
        }
    })
}

/// SIGKILL the child's whole process group, then reap the child
fn kill_process_group(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        // The group may already be gone; fall back to the child itself
        debug!("killpg({pgid}) failed, killing child directly");
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(secs: u64) -> ProcessRunner {
        ProcessRunner::new(Duration::from_secs(secs), None)
    }

    #[test]
    fn test_captures_merged_output() {
        let outcome = runner(10)
            .run(
                "sh",
                &["-c".to_string(), "echo out; echo err >&2".to_string()],
            )
            .unwrap();

        match outcome {
            RunOutcome::Completed { output, exit_code } => {
                assert_eq!(exit_code, 0);
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            RunOutcome::TimedOut => panic!("should not time out"),
        }
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let outcome = runner(10)
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .unwrap();

        match outcome {
            RunOutcome::Completed { exit_code, .. } => assert_eq!(exit_code, 3),
            RunOutcome::TimedOut => panic!("should not time out"),
        }
    }

    #[test]
    fn test_timeout_kills_and_discards_output() {
        let start = Instant::now();
        let outcome = runner(1)
            .run(
                "sh",
                &["-c".to_string(), "echo partial; sleep 30".to_string()],
            )
            .unwrap();

        assert!(matches!(outcome, RunOutcome::TimedOut));
        // Killed well before the sleep would have finished
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let result = runner(5).run("/nonexistent/pibench-no-such-binary", &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(
            Duration::from_secs(5),
            Some(dir.path().to_path_buf()),
        );
        let outcome = runner.run("pwd", &[]).unwrap();

        match outcome {
            RunOutcome::Completed { output, exit_code } => {
                assert_eq!(exit_code, 0);
                let canonical = dir.path().canonicalize().unwrap();
                assert!(output.trim().ends_with(
                    canonical.file_name().unwrap().to_str().unwrap()
                ));
            }
            RunOutcome::TimedOut => panic!("should not time out"),
        }
    }
}
