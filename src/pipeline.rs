//! Ejecuta una actualización del runtime con el `ProgressDigester` como
//! consumidor de eventos, cerrándolo siempre al terminar. El solve previo al
//! `Start` lo dibuja un `SolveSpinner` delante del digester.

use std::sync::Arc;

use log::{debug, warn};
use rt_progress::{EventMultiplexer, ProgressDigester, SetupEventHandler, SolveSpinner};
use rt_setup::{RuntimeSetup, SetupOutcome, SetupRequest};

use crate::errors::AppError;

/// `extra` recibe los mismos eventos que el digester (p. ej. un
/// `RecordingHandler`). Si la actualización falla, su error tiene prioridad
/// sobre uno de cierre del digester, que sólo se registra.
pub async fn update_with_progress(setup: &RuntimeSetup,
                                  request: &SetupRequest,
                                  extra: Option<Arc<dyn SetupEventHandler>>)
                                  -> Result<SetupOutcome, AppError> {
    let config = &setup.config().digester;
    let digester = Arc::new(ProgressDigester::new(config.clone())?);
    let spinner = Arc::new(SolveSpinner::new(config, digester.clone()));
    let mut handlers: Vec<Arc<dyn SetupEventHandler>> = vec![spinner.clone()];
    handlers.extend(extra);
    let events: Arc<dyn SetupEventHandler> = Arc::new(EventMultiplexer::new(handlers));

    let result = setup.update(request, events).await;
    let closed = spinner.close().await;
    debug!("digester event log: {:?}", digester.event_log());

    match (result, closed) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), closed) => {
            if let Err(ce) = closed {
                warn!("progress digester did not close cleanly: {ce}");
            }
            Err(e.into())
        }
    }
}
