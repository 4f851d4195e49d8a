//! Running the renderer as a guarded, blocking child process.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::renderer::{ProcFsTable, ProcessTable, Renderer};
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs renderer commands one at a time.
///
/// A command is refused when the renderer executable is missing or when an
/// instance of it is already running: LibreOffice hands work to a running
/// instance and exits without producing output. The running check is a
/// best-effort guard, not a lock.
pub struct CommandRunner {
    renderer: Renderer,
    processes: Box<dyn ProcessTable + Send + Sync>,
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            processes: Box::new(ProcFsTable),
            timeout: None,
        }
    }

    /// Kill the renderer when it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the process table consulted by the already-running guard
    pub fn with_process_table<P>(mut self, processes: P) -> Self
    where
        P: ProcessTable + Send + Sync + 'static,
    {
        self.processes = Box::new(processes);
        self
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Run the renderer with `args` and return its combined stdout and stderr.
    pub fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let exe = self.renderer.path();
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = command_line(exe, &args);

        if !self.renderer.is_available() {
            return Err(Error::ExecutableNotFound {
                path: exe.to_path_buf(),
            });
        }
        if self.processes.is_running(exe) {
            warn!(path = %exe.display(), "renderer already running, refusing to start another");
            return Err(Error::AlreadyRunning {
                path: exe.to_path_buf(),
            });
        }

        // Both streams share one file so the output keeps its interleaving
        let mut capture = tempfile::tempfile().map_err(|source| Error::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let stdout = capture.try_clone().map_err(|source| io_error(exe, source))?;
        let stderr = capture.try_clone().map_err(|source| io_error(exe, source))?;

        debug!(%command, "running renderer");
        let mut child = Command::new(exe)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => Error::ExecutableNotFound {
                    path: exe.to_path_buf(),
                },
                _ => io_error(exe, source),
            })?;

        let status = self.wait(&mut child, &command)?;
        let output = read_capture(&mut capture).map_err(|source| io_error(exe, source))?;
        debug!(%command, %status, bytes = output.len(), "renderer finished");

        if !status.success() {
            return Err(Error::CommandFailed { command, output });
        }
        Ok(output)
    }

    fn wait(&self, child: &mut Child, command: &str) -> Result<ExitStatus> {
        let exe = self.renderer.path();
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| io_error(exe, source));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(|source| io_error(exe, source))? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                if let Err(err) = child.kill() {
                    warn!(%command, error = %err, "failed to kill timed out renderer");
                }
                if let Err(err) = child.wait() {
                    warn!(%command, error = %err, "failed to reap timed out renderer");
                }
                return Err(Error::Timeout {
                    command: command.to_string(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_capture(capture: &mut File) -> io::Result<String> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The command as a shell-like line, for messages
fn command_line(exe: &Path, args: &[OsString]) -> String {
    std::iter::once(exe.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Busy;

    impl ProcessTable for Busy {
        fn is_running(&self, _exe: &Path) -> bool {
            true
        }
    }

    #[test]
    fn test_command_line() {
        let args = vec![OsString::from("--convert-to"), OsString::from("html")];
        assert_eq!(
            command_line(Path::new("/usr/bin/soffice"), &args),
            "/usr/bin/soffice --convert-to html"
        );
    }

    #[test]
    fn test_missing_executable() {
        let runner = CommandRunner::new(Renderer::new("/nonexistent/soffice"));
        let err = runner.run(["--version"]).unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// A fake renderer that answers the version probe and runs `body`
        /// for everything else
        fn script(dir: &Path, body: &str) -> Renderer {
            let path = dir.join("soffice");
            std::fs::write(
                &path,
                format!(
                    "#!/bin/sh\n\
                     [ \"$1\" = --version ] && {{ echo 'LibreOffice 7.6'; exit 0; }}\n\
                     {}\n",
                    body
                ),
            )
            .unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            Renderer::new(path)
        }

        #[test]
        fn test_merges_stdout_and_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let runner = CommandRunner::new(script(dir.path(), "echo out; echo err >&2"));
            assert_eq!(runner.run(["x"]).unwrap(), "out\nerr\n");
        }

        #[test]
        fn test_passes_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let runner = CommandRunner::new(script(dir.path(), "echo \"$@\""));
            assert_eq!(runner.run(["--headless", "a b"]).unwrap(), "--headless a b\n");
        }

        #[test]
        fn test_failure_carries_command_and_output() {
            let dir = tempfile::tempdir().unwrap();
            let runner = CommandRunner::new(script(dir.path(), "echo broken; exit 3"));
            match runner.run(["--convert-to", "html"]).unwrap_err() {
                Error::CommandFailed { command, output } => {
                    assert!(command.ends_with("soffice --convert-to html"));
                    assert_eq!(output, "broken\n");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_already_running_does_not_spawn() {
            let dir = tempfile::tempdir().unwrap();
            let marker = dir.path().join("ran");
            let renderer = script(dir.path(), &format!("touch '{}'", marker.display()));
            let runner = CommandRunner::new(renderer).with_process_table(Busy);

            let err = runner.run(["x"]).unwrap_err();
            assert!(matches!(err, Error::AlreadyRunning { .. }));
            assert!(!marker.exists());
        }

        #[test]
        fn test_timeout_kills_renderer() {
            let dir = tempfile::tempdir().unwrap();
            let runner = CommandRunner::new(script(dir.path(), "exec sleep 10"))
                .with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let err = runner.run(["x"]).unwrap_err();
            assert!(
                matches!(err, Error::Timeout { timeout, .. } if timeout == Duration::from_millis(200))
            );
            assert!(err.to_string().ends_with("timed out after 200ms"));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
