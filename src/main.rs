//! `rtflow-demo`: instala un runtime simulado y luego lo actualiza a un
//! plan nuevo, mostrando el progreso y el resumen de cambios.

use std::sync::Arc;

use log::info;
use rtflow::core::{runtime_closure, to_named, BuildPlan, ChangeSummary, Changeset, FixedPlatform, ResolveOptions};
use rtflow::setup::{init_dotenv, RuntimeSetup, SetupConfig, SetupOutcome, SetupRequest, SimulatedBackend};
use rtflow::{update_with_progress, AppError};

const DEFAULT_PLATFORM: &str = "0fa42e8c-ac7b-5dd7-9407-8aa15f9b993a";
const NAMESPACE: &str = "demo/python";

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn report(label: &str, outcome: &SetupOutcome) {
    match outcome {
        SetupOutcome::UpToDate => println!("[{label}] runtime al día, nada que hacer"),
        SetupOutcome::Updated(s) => println!("[{label}] {} artifacts: {} descargados, {} instalados, {} desinstalados",
                                             s.artifacts.len(),
                                             s.downloaded.len(),
                                             s.installed.len(),
                                             s.uninstalled.len()),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_dotenv();
    setup_tracing();

    let mut config = SetupConfig::from_env()?;
    if !cfg!(feature = "visible_progress") {
        config.digester.hidden = true;
    }
    let platform = std::env::var("RTFLOW_PLATFORM_ID").unwrap_or_else(|_| DEFAULT_PLATFORM.to_string());

    let v1 = BuildPlan::from_json_str(include_str!("../fixtures/python_plan.json"))?;
    let v2 = BuildPlan::from_json_str(include_str!("../fixtures/python_plan_v2.json"))?;

    let backend = Arc::new(SimulatedBackend::new(v1.clone()));
    let setup = RuntimeSetup::new(config,
                                  Arc::new(FixedPlatform(platform.clone())),
                                  backend.clone(),
                                  backend.clone(),
                                  backend.clone(),
                                  backend.clone());
    info!("runtime state in {}", setup.config().state_dir.display());

    let first = update_with_progress(&setup, &SetupRequest::new(NAMESPACE, "commit-1"), None).await?;
    report("commit-1", &first);

    backend.set_plan(v2.clone());
    let second = update_with_progress(&setup, &SetupRequest::new(NAMESPACE, "commit-2"), None).await?;
    report("commit-2", &second);

    let old = runtime_closure(&v1, &platform, ResolveOptions::default())?;
    let new = runtime_closure(&v2, &platform, ResolveOptions::default())?;
    let changes = Changeset::between(&to_named(&old), &to_named(&new));
    for update in &changes.updated {
        println!("actualizado: {} {} → {}", update.to.name, update.from.version, update.to.version);
    }
    if let Some(summary) = ChangeSummary::from_changeset(&changes, &new, &old) {
        print!("{summary}");
    }
    Ok(())
}
