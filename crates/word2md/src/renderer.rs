//! The external renderer: a LibreOffice `soffice` executable.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;
use which::which_in;

use crate::{Error, Result};

/// Environment variable naming the renderer executable
pub const SOFFICE_PATH_VAR: &str = "SOFFICE_PATH";

/// A renderer executable, resolved once and passed by reference.
///
/// Resolution looks a bare name up on the `PATH` and asks the executable for
/// its version. The renderer counts as available only when that probe
/// succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    path: PathBuf,
    version: Option<String>,
}

impl Renderer {
    /// Use the executable at `path`, or the one named `path` on the `PATH`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::resolve(path.into(), env::var_os("PATH").as_deref())
    }

    /// Find the renderer on this machine.
    ///
    /// Looks at `SOFFICE_PATH`, then `soffice` on the `PATH`, then the usual
    /// install locations.
    pub fn locate() -> Result<Self> {
        Self::locate_in(env::var_os(SOFFICE_PATH_VAR), env::var_os("PATH").as_deref())
    }

    fn locate_in(override_path: Option<OsString>, search: Option<&OsStr>) -> Result<Self> {
        if let Some(path) = override_path.filter(|path| !path.is_empty()) {
            return Ok(Self::resolve(PathBuf::from(path), search));
        }

        if let Some(path) = find_in(Path::new("soffice"), search) {
            return Ok(Self::resolve(path, search));
        }

        let candidates = install_locations();
        match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "found renderer in install location");
                Ok(Self::resolve(path, search))
            }
            None => Err(Error::ExecutableNotFound {
                path: PathBuf::from("soffice"),
            }),
        }
    }

    fn resolve(path: PathBuf, search: Option<&OsStr>) -> Self {
        let path = if is_bare_name(&path) {
            find_in(&path, search).unwrap_or(path)
        } else {
            path
        };
        let version = probe_version(&path);
        debug!(path = %path.display(), ?version, "resolved renderer");
        Self { path, version }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version reported by `--version`, with the `LibreOffice ` prefix removed
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

fn is_bare_name(path: &Path) -> bool {
    !path.is_absolute() && path.components().count() == 1
}

fn find_in(name: &Path, search: Option<&OsStr>) -> Option<PathBuf> {
    let search = search?;
    let cwd = env::current_dir().ok()?;
    which_in(name, Some(search), cwd).ok()
}

/// `None` when the executable is missing, cannot be run or exits
/// unsuccessfully
fn probe_version(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let text = text.trim();
    Some(text.strip_prefix("LibreOffice ").unwrap_or(text).to_string())
}

#[cfg(target_os = "macos")]
fn install_locations() -> Vec<PathBuf> {
    let bundle = "LibreOffice.app/Contents/MacOS/soffice";
    let mut paths = Vec::new();
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join("Applications").join(bundle));
    }
    paths.push(PathBuf::from("/Applications").join(bundle));
    paths
}

#[cfg(target_os = "windows")]
fn install_locations() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Program Files\LibreOffice\program\soffice.exe"),
        PathBuf::from(r"C:\Program Files (x86)\LibreOffice 4\program\soffice.exe"),
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn install_locations() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/bin/soffice"),
        PathBuf::from("/usr/lib/libreoffice/program/soffice"),
        PathBuf::from("/opt/libreoffice/program/soffice"),
    ]
}

/// Running processes, as far as the already-running guard is concerned
pub trait ProcessTable {
    /// Is a process running the executable at `exe`?
    fn is_running(&self, exe: &Path) -> bool;
}

/// Process table read from `/proc` on Linux. Elsewhere nothing is reported
/// as running.
///
/// On Linux `soffice` is a launcher script that execs `soffice.bin` from the
/// same directory, so a process running that sibling counts as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcFsTable;

impl ProcessTable for ProcFsTable {
    #[cfg(target_os = "linux")]
    fn is_running(&self, exe: &Path) -> bool {
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return false;
        };
        let targets = launched_executables(exe);

        entries.flatten().any(|entry| {
            let is_pid = entry
                .file_name()
                .to_str()
                .map(|name| name.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false);
            // Processes of other users are unreadable and skipped
            is_pid
                && std::fs::read_link(entry.path().join("exe"))
                    .map(|running| targets.contains(&running))
                    .unwrap_or(false)
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn is_running(&self, _exe: &Path) -> bool {
        false
    }
}

/// `exe` and its `.bin` sibling, canonicalized where they exist
#[cfg(target_os = "linux")]
fn launched_executables(exe: &Path) -> Vec<PathBuf> {
    let canonical = |path: PathBuf| path.canonicalize().unwrap_or(path);
    let exe = canonical(exe.to_path_buf());

    let mut targets = Vec::with_capacity(2);
    if let Some(name) = exe.file_name() {
        let mut bin = name.to_os_string();
        bin.push(".bin");
        targets.push(canonical(exe.with_file_name(bin)));
    }
    targets.push(exe);
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_unavailable() {
        let renderer = Renderer::new("/nonexistent/soffice");
        assert!(!renderer.is_available());
        assert_eq!(renderer.version(), None);
    }

    #[test]
    fn test_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!Renderer::new(dir.path()).is_available());
    }

    #[test]
    fn test_bare_name() {
        assert!(is_bare_name(Path::new("soffice")));
        assert!(!is_bare_name(Path::new("./soffice")));
        assert!(!is_bare_name(Path::new("bin/soffice")));
        assert!(!is_bare_name(Path::new("/usr/bin/soffice")));
    }

    #[test]
    fn test_proc_table_ignores_unknown_executable() {
        assert!(!ProcFsTable.is_running(Path::new("/nonexistent/soffice")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_table_sees_current_process() {
        let exe = std::env::current_exe().unwrap();
        assert!(ProcFsTable.is_running(&exe));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn executable(path: &Path, body: &str) {
            fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn fake_soffice(dir: &Path) -> PathBuf {
            let path = dir.join("soffice");
            executable(&path, "echo 'LibreOffice 7.6.4.1 10(Build:1)'");
            path
        }

        #[test]
        fn test_version_is_probed_once() {
            let dir = tempfile::tempdir().unwrap();
            let renderer = Renderer::new(fake_soffice(dir.path()));
            assert!(renderer.is_available());
            assert_eq!(renderer.version(), Some("7.6.4.1 10(Build:1)"));

            // Later changes to the executable are not seen
            executable(&dir.path().join("soffice"), "exit 1");
            assert!(renderer.is_available());
        }

        #[test]
        fn test_failing_version_probe_is_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("soffice");
            executable(&path, "exit 1");

            let renderer = Renderer::new(&path);
            assert!(!renderer.is_available());
            assert_eq!(renderer.path(), path);
        }

        #[test]
        fn test_override_with_bare_name_is_looked_up() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_soffice(dir.path());

            let renderer =
                Renderer::locate_in(Some("soffice".into()), Some(dir.path().as_os_str())).unwrap();
            assert_eq!(renderer.path(), script);
            assert!(renderer.is_available());

            let output = crate::CommandRunner::new(renderer).run(["--version"]).unwrap();
            assert_eq!(output, "LibreOffice 7.6.4.1 10(Build:1)\n");
        }

        #[test]
        fn test_locate_on_search_path() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_soffice(dir.path());

            let renderer = Renderer::locate_in(None, Some(dir.path().as_os_str())).unwrap();
            assert_eq!(renderer.path(), script);
            assert_eq!(renderer.version(), Some("7.6.4.1 10(Build:1)"));
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn test_proc_table_sees_launched_binary() {
            use std::process::Command;
            use std::thread;
            use std::time::{Duration, Instant};

            let dir = tempfile::tempdir().unwrap();
            let sleep = which::which("sleep").unwrap();
            fs::copy(&sleep, dir.path().join("soffice.bin")).unwrap();
            let launcher = dir.path().join("soffice");
            executable(&launcher, "exec \"$(dirname \"$0\")/soffice.bin\" \"$@\"");

            assert!(!ProcFsTable.is_running(&launcher));
            let mut child = Command::new(&launcher).arg("10").spawn().unwrap();

            let started = Instant::now();
            let mut seen = false;
            while !seen && started.elapsed() < Duration::from_secs(5) {
                seen = ProcFsTable.is_running(&launcher);
                thread::sleep(Duration::from_millis(20));
            }
            child.kill().unwrap();
            child.wait().unwrap();

            assert!(seen);
        }
    }
}
