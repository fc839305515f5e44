use std::sync::Arc;

use rtflow::core::{BuildPlan, FixedPlatform};
use rtflow::progress::{DigesterConfig, RecordingHandler, SetupEventHandler};
use rtflow::setup::{RuntimeSetup, SetupConfig, SetupError, SetupOutcome, SetupRequest, SimulatedBackend};
use rtflow::{update_with_progress, AppError};

const LINUX: &str = "0fa42e8c-ac7b-5dd7-9407-8aa15f9b993a";
const OPENSSL_V1: &str = "74e180be-af7c-5d3e-9d8e-7c177285475f";

fn plan(raw: &str) -> BuildPlan { BuildPlan::from_json_str(raw).expect("fixture válida") }

fn setup_in(dir: &std::path::Path, backend: &Arc<SimulatedBackend>) -> RuntimeSetup {
    let config = SetupConfig { digester: DigesterConfig::hidden(), ..SetupConfig::default() }.with_state_dir(dir);
    RuntimeSetup::new(config,
                      Arc::new(FixedPlatform(LINUX.into())),
                      backend.clone(),
                      backend.clone(),
                      backend.clone(),
                      backend.clone())
}

#[tokio::test]
async fn install_update_then_nothing_to_do() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SimulatedBackend::new(plan(include_str!("../fixtures/python_plan.json"))));
    let setup = setup_in(dir.path(), &backend);

    let first = update_with_progress(&setup, &SetupRequest::new("org/py", "c1"), None).await.unwrap();
    assert!(matches!(first, SetupOutcome::Updated(ref s) if s.installed.len() == 5));

    backend.set_plan(plan(include_str!("../fixtures/python_plan_v2.json")));
    let rec = Arc::new(RecordingHandler::new());
    let extra: Arc<dyn SetupEventHandler> = rec.clone();
    let second = update_with_progress(&setup, &SetupRequest::new("org/py", "c2"), Some(extra)).await.unwrap();
    match second {
        SetupOutcome::Updated(s) => {
            assert_eq!(s.uninstalled.len(), 1);
            assert_eq!(s.uninstalled[0].as_str(), OPENSSL_V1);
            assert_eq!(s.artifacts.len(), 9);
        }
        SetupOutcome::UpToDate => panic!("el commit cambió"),
    }
    assert_eq!(rec.names().last(), Some(&"Success"));

    let third = update_with_progress(&setup, &SetupRequest::new("org/py", "c2"), None).await.unwrap();
    assert_eq!(third, SetupOutcome::UpToDate);
    assert_eq!(backend.solve_count(), 2);
}

#[tokio::test]
async fn hash_survives_a_new_setup_instance() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SimulatedBackend::new(plan(include_str!("../fixtures/python_plan.json"))));
    let req = SetupRequest::new("org/py", "c1");
    update_with_progress(&setup_in(dir.path(), &backend), &req, None).await.unwrap();

    let again = update_with_progress(&setup_in(dir.path(), &backend), &req, None).await.unwrap();
    assert_eq!(again, SetupOutcome::UpToDate);
}

#[tokio::test]
async fn setup_errors_win_over_digester_errors() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SimulatedBackend::new(plan(include_str!("../fixtures/python_plan.json"))));
    backend.fail_install(OPENSSL_V1);
    let setup = setup_in(dir.path(), &backend);

    let err = update_with_progress(&setup, &SetupRequest::new("org/py", "c1"), None).await.unwrap_err();
    assert!(matches!(err, AppError::Setup(SetupError::Install { .. })), "{err:?}");
    assert!(!err.is_user_facing());
    assert_eq!(setup.hash_cache().stored().unwrap(), None);
}
