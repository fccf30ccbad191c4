//! Engine stages and the typed invocation handed to a [`StageRunner`].

use crate::PipelineError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// One engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    FeatureExtraction,
    SequentialMatching,
    ExhaustiveMatching,
    Mapping,
}

impl StageKind {
    /// Engine subcommand name.
    pub fn command(&self) -> &'static str {
        match self {
            StageKind::FeatureExtraction => "feature_extractor",
            StageKind::SequentialMatching => "sequential_matcher",
            StageKind::ExhaustiveMatching => "exhaustive_matcher",
            StageKind::Mapping => "mapper",
        }
    }

    pub fn is_matching(&self) -> bool {
        matches!(self, StageKind::SequentialMatching | StageKind::ExhaustiveMatching)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    /// Killed by a signal, no exit code.
    Terminated,
    /// Exceeded the wall-clock limit and was killed.
    TimedOut,
}

impl StageStatus {
    pub fn success(&self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }

    /// Exit code to propagate; non-exit endings map to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Terminated | StageStatus::TimedOut => 1,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Exited(code) => write!(f, "exit code {code}"),
            StageStatus::Terminated => f.write_str("terminated by signal"),
            StageStatus::TimedOut => f.write_str("timed out"),
        }
    }
}

/// A fully specified engine command: subcommand, argv, environment overrides and working directory.
///
/// Arguments are passed to the process verbatim, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    pub stage: StageKind,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
    pub working_dir: Option<PathBuf>,
}

impl StageInvocation {
    pub fn new(stage: StageKind) -> Self {
        Self {
            stage,
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
        }
    }

    /// Append `--name value`.
    pub fn option(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.args.push(format!("--{name}").into());
        self.args.push(value.to_string().into());
        self
    }

    /// Append `--name 1` or `--name 0`.
    pub fn toggle(self, name: &str, enabled: bool) -> Self {
        self.option(name, u8::from(enabled))
    }

    /// Append `--name <path>` without lossy conversion.
    pub fn path(mut self, name: &str, path: &Path) -> Self {
        self.args.push(format!("--{name}").into());
        self.args.push(path.as_os_str().to_owned());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env.push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Value following `--name`, if present.
    pub fn value_of(&self, name: &str) -> Option<&OsStr> {
        let flag = format!("--{name}");
        self.args
            .windows(2)
            .find(|pair| pair[0].as_os_str() == OsStr::new(&flag))
            .map(|pair| pair[1].as_os_str())
    }

    /// Space-joined argv for logging.
    pub fn display_args(&self) -> String {
        std::iter::once(self.stage.command().to_string())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status and captured output of a finished stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub status: StageStatus,
    pub output: String,
}

impl StageOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            status: StageStatus::Exited(code),
            output: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs one engine stage to completion.
///
/// Implementations block until the stage ends. A stage that ran and failed is
/// an `Ok` with a non-success status; `Err` is reserved for stages that could
/// not be started at all.
pub trait StageRunner: Send + Sync {
    fn run(&self, invocation: &StageInvocation) -> Result<StageOutput, PipelineError>;
}

impl<R: StageRunner + ?Sized> StageRunner for &R {
    fn run(&self, invocation: &StageInvocation) -> Result<StageOutput, PipelineError> {
        (**self).run(invocation)
    }
}
