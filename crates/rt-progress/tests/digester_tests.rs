use std::sync::Arc;
use std::time::Duration;

use rt_core::NodeId;
use rt_progress::{ArtifactNames, BarState, DigesterConfig, Phase, PhaseState, ProgressDigester, ProgressError, SetupEvent,
                  SetupEventHandler, SolveSpinner};
use uuid::Uuid;

fn names(ids: &[&str]) -> ArtifactNames { ids.iter().map(|id| (NodeId::from(*id), format!("pkg-{id}"))).collect() }

fn start(build: &[&str], download: &[&str], install: &[&str]) -> SetupEvent {
    SetupEvent::Start { recipe_id: Uuid::new_v4(),
                        requires_build: !build.is_empty(),
                        log_file_path: None,
                        artifacts_to_build: names(build),
                        artifacts_to_download: names(download),
                        artifacts_to_install: names(install) }
}

fn digester() -> ProgressDigester {
    let cfg = DigesterConfig { refresh_interval: Duration::from_millis(5),
                               close_timeout: Duration::from_millis(300),
                               ..DigesterConfig::hidden() };
    ProgressDigester::new(cfg).expect("runtime activo")
}

fn id(s: &str) -> NodeId { NodeId::from(s) }

#[tokio::test]
async fn three_builds_complete_the_build_phase() {
    let d = digester();
    d.handle(&start(&["a", "b", "c"], &[], &[])).unwrap();
    for a in ["a", "b", "c"] {
        d.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id(a), log_uri: None }).unwrap();
    }
    assert_eq!(d.phase_state(Phase::Build), PhaseState::Complete);
    assert_eq!(d.phase_progress(Phase::Build), Some((3, 3)));
    d.handle(&SetupEvent::Success).unwrap();
    d.close().await.expect("sin error de fase incompleta");
}

#[tokio::test]
async fn any_event_before_start_is_rejected() {
    let d = digester();
    for ev in [SetupEvent::Success,
               SetupEvent::ArtifactDownloadSkipped { artifact_id: id("x") },
               SetupEvent::BuildStarted { log_file_path: None }]
    {
        let name = ev.name();
        assert_eq!(d.handle(&ev).unwrap_err(), ProgressError::EventBeforeStart { event: name });
    }
    assert_eq!(d.phase_state(Phase::Build), PhaseState::NotStarted);
    d.handle(&start(&[], &[], &[])).unwrap();
    assert_eq!(d.handle(&start(&[], &[], &[])).unwrap_err(), ProgressError::DuplicateStart);
    d.close().await.unwrap();
}

#[tokio::test]
async fn solve_events_before_start_are_rejected() {
    let d = digester();
    for ev in [SetupEvent::SolveStart, SetupEvent::SolveSuccess, SetupEvent::SolveError { message: "x".into() }] {
        let name = ev.name();
        assert_eq!(d.handle(&ev).unwrap_err(), ProgressError::EventBeforeStart { event: name });
    }
    assert_eq!(d.phase_state(Phase::Solve), PhaseState::NotStarted);
    d.handle(&start(&[], &["a"], &["a"])).unwrap();
    d.close().await.unwrap();
}

#[tokio::test]
async fn solve_spinner_keeps_start_first_for_the_digester() {
    let d = Arc::new(digester());
    let s = SolveSpinner::new(&DigesterConfig::hidden(), d.clone());
    s.handle(&SetupEvent::SolveStart).unwrap();
    assert_eq!(s.handle(&start(&[], &[], &[])).unwrap_err(), ProgressError::SolveInProgress);
    s.handle(&SetupEvent::SolveSuccess).unwrap();
    s.handle(&start(&[], &["a"], &[])).unwrap();
    s.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap();
    s.handle(&SetupEvent::Success).unwrap();

    assert_eq!(d.event_log(), vec!["Start", "ArtifactDownloadSkipped", "Success"]);
    assert_eq!(d.phase_state(Phase::Solve), PhaseState::NotStarted);
    assert_eq!(s.solve_state(), PhaseState::Complete);
    s.close().await.unwrap();
}

#[tokio::test]
async fn repeated_build_success_is_counted_once() {
    let d = digester();
    d.handle(&start(&["a", "b"], &[], &[])).unwrap();
    d.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id("a"), log_uri: None }).unwrap();
    d.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id("a"), log_uri: None }).unwrap();
    assert_eq!(d.phase_progress(Phase::Build), Some((1, 2)));
    assert_eq!(d.phase_state(Phase::Build), PhaseState::InProgress);
    d.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id("b"), log_uri: None }).unwrap();
    assert_eq!(d.phase_state(Phase::Build), PhaseState::Complete);
    d.close().await.unwrap();
}

#[tokio::test]
async fn repeated_download_or_install_completion_is_an_error() {
    let d = digester();
    d.handle(&start(&[], &["a", "b"], &["a", "b"])).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap();
    assert_eq!(d.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap_err(),
               ProgressError::ArtifactAlreadyCompleted { phase: Phase::Download, artifact_id: id("a") });
    assert_eq!(d.handle(&SetupEvent::ArtifactDownloadStarted { artifact_id: id("a"), total_size: 4 }).unwrap_err(),
               ProgressError::ArtifactAlreadyCompleted { phase: Phase::Download, artifact_id: id("a") });

    d.handle(&SetupEvent::ArtifactInstallStarted { artifact_id: id("a"), total_size: 4 }).unwrap();
    d.handle(&SetupEvent::ArtifactInstallProgress { artifact_id: id("a"), increment: 4 }).unwrap();
    d.handle(&SetupEvent::ArtifactInstallSuccess { artifact_id: id("a") }).unwrap();
    assert_eq!(d.handle(&SetupEvent::ArtifactInstallSuccess { artifact_id: id("a") }).unwrap_err(),
               ProgressError::ArtifactAlreadyCompleted { phase: Phase::Install, artifact_id: id("a") });
    assert_eq!(d.phase_progress(Phase::Download), Some((1, 2)));
    assert_eq!(d.phase_progress(Phase::Install), Some((1, 2)));

    d.handle(&SetupEvent::Success).unwrap();
    let err = d.close().await.unwrap_err();
    assert_eq!(err, ProgressError::PhaseIncomplete { phase: Phase::Download, current: 1, total: 2 });
}

#[tokio::test]
async fn completed_phase_rejects_a_second_skip() {
    let d = digester();
    d.handle(&start(&[], &["a"], &[])).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap();
    assert_eq!(d.phase_state(Phase::Download), PhaseState::Complete);
    let err = d.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap_err();
    assert_eq!(err, ProgressError::ArtifactAlreadyCompleted { phase: Phase::Download, artifact_id: id("a") });
    d.close().await.unwrap();
}

#[tokio::test]
async fn artifact_bar_overflow_reports_current_and_total() {
    let d = digester();
    d.handle(&start(&[], &["a"], &[])).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadStarted { artifact_id: id("a"), total_size: 10 }).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadProgress { artifact_id: id("a"), increment: 6 }).unwrap();
    let err = d.handle(&SetupEvent::ArtifactDownloadProgress { artifact_id: id("a"), increment: 6 }).unwrap_err();
    assert_eq!(err, ProgressError::Overflow { label: "pkg-a".into(), current: 6, total: 10, increment: 6 });
    d.close().await.unwrap();
}

#[tokio::test]
async fn build_failure_aborts_download_and_install() {
    let d = digester();
    d.handle(&start(&["b"], &["b", "c"], &["b", "c"])).unwrap();
    d.handle(&SetupEvent::BuildStarted { log_file_path: None }).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadStarted { artifact_id: id("c"), total_size: 100 }).unwrap();
    d.handle(&SetupEvent::BuildFailure { message: "compiler exploded".into() }).unwrap();

    assert_eq!(d.phase_state(Phase::Build), PhaseState::Aborted);
    assert_eq!(d.phase_state(Phase::Download), PhaseState::Aborted);
    assert_eq!(d.phase_state(Phase::Install), PhaseState::Aborted);
    assert_eq!(d.artifact_bar_state(&id("c"), Phase::Download), Some(BarState::Aborted));
    // eventos tardíos de fases abortadas se ignoran
    d.handle(&SetupEvent::ArtifactDownloadProgress { artifact_id: id("c"), increment: 1 }).unwrap();
    d.handle(&SetupEvent::Failure { message: "build failed".into() }).unwrap();
    d.close().await.unwrap();
}

#[tokio::test]
async fn unexpected_artifacts_warn_for_build_but_fail_for_download() {
    let d = digester();
    d.handle(&start(&["a"], &["a"], &[])).unwrap();
    d.handle(&SetupEvent::ArtifactBuildSuccess { artifact_id: id("legacy"), log_uri: None }).unwrap();
    assert_eq!(d.phase_progress(Phase::Build), Some((0, 1)));
    let err = d.handle(&SetupEvent::ArtifactDownloadSuccess { artifact_id: id("other") }).unwrap_err();
    assert_eq!(err, ProgressError::UnexpectedArtifact { phase: Phase::Download, artifact_id: id("other") });
    d.close().await.unwrap();
}

#[tokio::test]
async fn close_after_success_reports_incomplete_phase() {
    let d = digester();
    d.handle(&start(&[], &["a", "b"], &[])).unwrap();
    d.handle(&SetupEvent::ArtifactDownloadSkipped { artifact_id: id("a") }).unwrap();
    d.handle(&SetupEvent::Success).unwrap();
    let err = d.close().await.unwrap_err();
    assert_eq!(err, ProgressError::PhaseIncomplete { phase: Phase::Download, current: 1, total: 2 });
    assert_eq!(d.close().await.unwrap_err(), ProgressError::Closed);
}

#[tokio::test]
async fn solve_spinner_and_build_skip_rules() {
    let d = digester();
    d.handle(&start(&[], &[], &[])).unwrap();
    d.handle(&SetupEvent::SolveStart).unwrap();
    assert_eq!(d.handle(&SetupEvent::SolveStart).unwrap_err(), ProgressError::PhaseAlreadyStarted(Phase::Solve));
    d.handle(&SetupEvent::SolveSuccess).unwrap();
    assert_eq!(d.phase_state(Phase::Solve), PhaseState::Complete);
    d.handle(&SetupEvent::BuildSkipped).unwrap();
    d.handle(&SetupEvent::BuildStarted { log_file_path: None }).unwrap();
    assert_eq!(d.handle(&SetupEvent::BuildSkipped).unwrap_err(), ProgressError::BuildSkippedAfterStart);
    assert_eq!(d.event_log().first(), Some(&"Start"));
    d.close().await.unwrap();
    assert!(matches!(d.handle(&SetupEvent::Success), Err(ProgressError::Closed)));
}

#[test]
fn digester_requires_runtime() {
    assert!(matches!(ProgressDigester::new(DigesterConfig::hidden()), Err(ProgressError::NoRuntime)));
}
