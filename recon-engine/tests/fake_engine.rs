//! Drives `ProcessRunner` against shell scripts standing in for the engine.
#![cfg(unix)]

use recon_data::{ImagePose, write_pose_file};
use recon_engine::ProcessRunner;
use recon_pipeline::PipelineError;
use recon_pipeline::quality::Quality;
use recon_pipeline::reconstruction::{
    EngineOptions, LayoutOutcome, ReconstructionDriver, SceneJob, StageInvocation, StageKind, StageRunner,
    StageStatus, Strategy,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Engine stand-in: logs each command, fails the listed ones, and has the mapper
/// drop `fixture` loosely into `--output_path`.
fn scripted_engine(dir: &Path, failing: &[&str], fixture: &Path) -> (PathBuf, PathBuf) {
    let log = dir.join("calls.log");
    let failing = failing.join(" ");
    let body = format!(
        r#"cmd="$1"
shift
echo "$cmd" >> "{log}"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output_path) out="$2"; shift ;;
  esac
  shift
done
for f in {failing}; do
  if [ "$f" = "$cmd" ]; then
    echo "$cmd failed" >&2
    exit 1
  fi
done
if [ "$cmd" = "mapper" ]; then
  cp "{fixture}" "$out/images.bin"
fi
exit 0"#,
        log = log.display(),
        fixture = fixture.display(),
    );
    (write_script(dir, "engine", &body), log)
}

fn pose_fixture(dir: &Path, count: u32) -> PathBuf {
    let path = dir.join("fixture_images.bin");
    let poses: Vec<ImagePose> = (1..=count)
        .map(|i| ImagePose::new(i, Default::default(), Default::default(), 1, format!("{i:06}.png")))
        .collect();
    write_pose_file(&path, &poses).unwrap();
    path
}

fn scene(dir: &Path) -> SceneJob {
    let job = SceneJob::from_roots("scene0001_00", &dir.join("data"), &dir.join("results"));
    fs::create_dir_all(&job.image_dir).unwrap();
    job
}

fn calls(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn exit_code_and_output_are_captured() {
    let dir = TempDir::new().unwrap();
    let exe = write_script(dir.path(), "engine", "echo \"running $1\"\necho oops >&2\nexit 3");
    let runner = ProcessRunner::new(&exe);

    let output = runner.run(&StageInvocation::new(StageKind::FeatureExtraction)).unwrap();
    assert_eq!(output.status, StageStatus::Exited(3));
    assert!(output.output.contains("running feature_extractor"));
    assert!(output.output.contains("oops"));
}

#[test]
fn environment_and_working_dir_reach_the_child() {
    let dir = TempDir::new().unwrap();
    let work = dir.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let exe = write_script(dir.path(), "engine", "printf '%s\\n' \"$QT_QPA_PLATFORM\"\npwd");
    let runner = ProcessRunner::new(&exe);

    let invocation = StageInvocation::new(StageKind::Mapping)
        .env("QT_QPA_PLATFORM", "offscreen")
        .current_dir(&work);
    let output = runner.run(&invocation).unwrap();

    let lines: Vec<&str> = output.output.lines().collect();
    assert_eq!(lines[0], "offscreen");
    assert_eq!(
        fs::canonicalize(lines[1]).unwrap(),
        fs::canonicalize(&work).unwrap()
    );
}

#[test]
fn hung_stage_is_killed() {
    let dir = TempDir::new().unwrap();
    let exe = write_script(dir.path(), "engine", "exec sleep 30");
    let runner = ProcessRunner::new(&exe)
        .with_timeout(Some(Duration::from_millis(200)))
        .with_poll_interval(Duration::from_millis(10));

    let started = Instant::now();
    let output = runner.run(&StageInvocation::new(StageKind::ExhaustiveMatching)).unwrap();
    assert_eq!(output.status, StageStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn killed_stage_keeps_its_output() {
    let dir = TempDir::new().unwrap();
    let exe = write_script(dir.path(), "engine", "echo \"matching started\"\nexec sleep 30");
    let runner = ProcessRunner::new(&exe)
        .with_timeout(Some(Duration::from_millis(300)))
        .with_poll_interval(Duration::from_millis(10));

    let output = runner.run(&StageInvocation::new(StageKind::ExhaustiveMatching)).unwrap();
    assert_eq!(output.status, StageStatus::TimedOut);
    assert!(output.output.contains("matching started"));
}

#[test]
fn orphaned_pipe_does_not_block_timeout() {
    let dir = TempDir::new().unwrap();
    // The background sleep outlives the killed shell and keeps stdout open.
    let exe = write_script(dir.path(), "engine", "sleep 30 &\nwait");
    let runner = ProcessRunner::new(&exe)
        .with_timeout(Some(Duration::from_millis(200)))
        .with_poll_interval(Duration::from_millis(10));

    let started = Instant::now();
    let output = runner.run(&StageInvocation::new(StageKind::Mapping)).unwrap();
    assert_eq!(output.status, StageStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn robust_run_falls_back_to_exhaustive_matching() {
    let dir = TempDir::new().unwrap();
    let fixture = pose_fixture(dir.path(), 30);
    let (exe, log) = scripted_engine(dir.path(), &["sequential_matcher"], &fixture);
    let job = scene(dir.path());

    let driver = ReconstructionDriver::new(ProcessRunner::new(&exe), Strategy::robust(), EngineOptions::default());
    let report = driver.run(&job).unwrap();

    assert_eq!(
        calls(&log),
        vec!["feature_extractor", "sequential_matcher", "exhaustive_matcher", "mapper"]
    );
    assert_eq!(report.layout, LayoutOutcome::Moved(1));
    assert_eq!(report.registered, 30);
    assert_eq!(report.quality, Quality::Good);
    assert_eq!(report.warnings.len(), 1);
    assert!(job.pose_file().is_file());
}

#[test]
fn robust_run_aborts_when_both_matchers_fail() {
    let dir = TempDir::new().unwrap();
    let fixture = pose_fixture(dir.path(), 5);
    let (exe, log) = scripted_engine(dir.path(), &["sequential_matcher", "exhaustive_matcher"], &fixture);
    let job = scene(dir.path());

    let driver = ReconstructionDriver::new(ProcessRunner::new(&exe), Strategy::robust(), EngineOptions::default());
    let err = driver.run(&job).unwrap_err();

    assert!(matches!(err, PipelineError::MatchingFailed { .. }));
    assert_eq!(
        calls(&log),
        vec!["feature_extractor", "sequential_matcher", "exhaustive_matcher"]
    );
}

#[test]
fn standard_mapper_failure_forwards_exit_code() {
    let dir = TempDir::new().unwrap();
    let fixture = pose_fixture(dir.path(), 5);
    let (exe, _log) = scripted_engine(dir.path(), &["mapper"], &fixture);
    let job = scene(dir.path());

    let driver = ReconstructionDriver::new(ProcessRunner::new(&exe), Strategy::standard(), EngineOptions::default());
    let err = driver.run(&job).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: StageKind::Mapping,
            status: StageStatus::Exited(1)
        }
    ));
    assert_eq!(err.exit_code(), 1);
}
