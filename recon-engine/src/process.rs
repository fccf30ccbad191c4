//! Child-process stage runner.

use recon_pipeline::PipelineError;
use recon_pipeline::reconstruction::{EngineOptions, StageInvocation, StageOutput, StageRunner, StageStatus};
use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised before a stage process is running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Locate an engine executable.
///
/// Names without a directory component are searched for in `PATH`; anything
/// else must point at an existing file.
pub fn resolve_executable(program: &Path) -> Result<PathBuf, EngineError> {
    if program.components().count() > 1 || program.is_absolute() {
        return if program.is_file() {
            Ok(program.to_path_buf())
        } else {
            Err(EngineError::NotFound(program.to_path_buf()))
        };
    }

    let search = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| EngineError::NotFound(program.to_path_buf()))
}

/// How long to wait for output readers after a timed-out stage is killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runs each stage as `<executable> <command> <args...>` and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: None,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Runner configured from the engine section of a pipeline config.
    pub fn from_options(options: &EngineOptions) -> Self {
        Self::new(&options.executable).with_timeout(options.stage_timeout())
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Kill stages that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn command(&self, invocation: &StageInvocation) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg(invocation.stage.command())
            .args(&invocation.args)
            .envs(invocation.env.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        command
    }

    fn spawn(&self, invocation: &StageInvocation) -> Result<Child, EngineError> {
        self.command(invocation).spawn().map_err(|source| EngineError::Spawn {
            program: self.executable.clone(),
            source,
        })
    }

    /// Wait for the child, honoring the timeout. `None` means it was killed.
    fn wait(&self, child: &mut Child) -> io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Ok(None);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl StageRunner for ProcessRunner {
    fn run(&self, invocation: &StageInvocation) -> Result<StageOutput, PipelineError> {
        let stage = invocation.stage;
        let launch_error = |err: EngineError| PipelineError::Launch {
            stage,
            message: err.to_string(),
        };

        debug!("Spawning {} {}", self.executable.display(), invocation.display_args());
        let mut child = self.spawn(invocation).map_err(launch_error)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.wait(&mut child).map_err(EngineError::from).map_err(launch_error)? {
            Some(status) => status,
            None => {
                warn!("{} exceeded {:?} and was killed", stage, self.timeout.unwrap_or_default());
                // A grandchild may still hold the pipe open; readers past the deadline are abandoned.
                let deadline = Instant::now() + DRAIN_GRACE;
                let mut output = collect_until(stdout, deadline, self.poll_interval);
                output.push_str(&collect_until(stderr, deadline, self.poll_interval));
                return Ok(StageOutput {
                    status: StageStatus::TimedOut,
                    output,
                });
            }
        };

        let mut output = collect(stdout);
        output.push_str(&collect(stderr));
        let status = match status.code() {
            Some(code) => StageStatus::Exited(code),
            None => StageStatus::Terminated,
        };
        Ok(StageOutput { status, output })
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            debug!("Failed reading stage output after {} bytes: {}", buf.len(), e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Like [`collect`], but gives up on a reader still blocked at `deadline`.
fn collect_until(handle: Option<JoinHandle<String>>, deadline: Instant, poll: Duration) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            debug!("Abandoning stage output reader still blocked after kill");
            return String::new();
        }
        thread::sleep(poll);
    }
    collect(Some(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_pipeline::reconstruction::StageKind;
    use std::ffi::OsStr;

    #[test]
    fn test_command_layout() {
        let runner = ProcessRunner::new("/opt/engine/bin/colmap");
        let invocation = StageInvocation::new(StageKind::Mapping)
            .path("database_path", Path::new("/data/scene/database.db"))
            .option("Mapper.min_num_matches", 10)
            .env("QT_QPA_PLATFORM", "offscreen")
            .current_dir("/data/scene");

        let command = runner.command(&invocation);
        assert_eq!(command.get_program(), OsStr::new("/opt/engine/bin/colmap"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            vec![
                OsStr::new("mapper"),
                OsStr::new("--database_path"),
                OsStr::new("/data/scene/database.db"),
                OsStr::new("--Mapper.min_num_matches"),
                OsStr::new("10"),
            ]
        );
        let envs: Vec<_> = command.get_envs().collect();
        assert_eq!(envs, vec![(OsStr::new("QT_QPA_PLATFORM"), Some(OsStr::new("offscreen")))]);
        assert_eq!(command.get_current_dir(), Some(Path::new("/data/scene")));
    }

    #[test]
    fn test_from_options() {
        let options = EngineOptions {
            executable: PathBuf::from("engine"),
            stage_timeout_secs: Some(90),
            ..EngineOptions::default()
        };
        let runner = ProcessRunner::from_options(&options);
        assert_eq!(runner.executable(), Path::new("engine"));
        assert_eq!(runner.timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_resolve_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-engine");
        assert!(matches!(resolve_executable(&missing), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_resolve_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("engine");
        std::fs::write(&exe, b"").unwrap();
        assert_eq!(resolve_executable(&exe).unwrap(), exe);
    }

    #[test]
    fn test_collect_until_joins_finished_reader() {
        let handle = drain(io::Cursor::new(b"mapper done\n".to_vec()));
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(collect_until(Some(handle), deadline, Duration::from_millis(5)), "mapper done\n");
    }

    #[test]
    fn test_collect_until_abandons_blocked_reader() {
        let (_keep_open, rx) = std::sync::mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            let _ = rx.recv();
            String::from("late")
        });
        let deadline = Instant::now() + Duration::from_millis(50);
        assert_eq!(collect_until(Some(handle), deadline, Duration::from_millis(5)), "");
        assert_eq!(collect_until(None, deadline, Duration::from_millis(5)), "");
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path().join("absent"));
        let err = runner.run(&StageInvocation::new(StageKind::FeatureExtraction)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Launch {
                stage: StageKind::FeatureExtraction,
                ..
            }
        ));
    }
}
