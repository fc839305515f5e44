//! Contrato de consumo de eventos y handlers básicos.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::errors::ProgressError;
use crate::events::{SetupEvent, SetupEventRecord};

/// Consumidor de eventos del setup. `handle` se invoca de forma concurrente
/// desde varias tareas; `close` se llama una vez al terminar.
#[async_trait]
pub trait SetupEventHandler: Send + Sync {
    fn handle(&self, event: &SetupEvent) -> Result<(), ProgressError>;

    async fn close(&self) -> Result<(), ProgressError> { Ok(()) }
}

/// Descarta todos los eventos.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoidHandler;

#[async_trait]
impl SetupEventHandler for VoidHandler {
    fn handle(&self, _event: &SetupEvent) -> Result<(), ProgressError> { Ok(()) }
}

/// Reenvía cada evento a varios handlers. Todos reciben el evento aunque
/// alguno falle; se devuelve el primer error.
#[derive(Default, Clone)]
pub struct EventMultiplexer {
    handlers: Vec<Arc<dyn SetupEventHandler>>,
}

impl EventMultiplexer {
    pub fn new(handlers: Vec<Arc<dyn SetupEventHandler>>) -> Self { Self { handlers } }

    pub fn with(mut self, handler: Arc<dyn SetupEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize { self.handlers.len() }

    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }
}

#[async_trait]
impl SetupEventHandler for EventMultiplexer {
    fn handle(&self, event: &SetupEvent) -> Result<(), ProgressError> {
        let mut first = None;
        for h in &self.handlers {
            if let Err(e) = h.handle(event) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    async fn close(&self) -> Result<(), ProgressError> {
        let mut first = None;
        for h in &self.handlers {
            if let Err(e) = h.close().await {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Guarda los eventos en orden de llegada (tests y depuración).
#[derive(Debug, Default)]
pub struct RecordingHandler {
    records: Mutex<Vec<SetupEventRecord>>,
}

impl RecordingHandler {
    pub fn new() -> Self { Self::default() }

    pub fn records(&self) -> Vec<SetupEventRecord> { self.records.lock().clone() }

    pub fn events(&self) -> Vec<SetupEvent> { self.records.lock().iter().map(|r| r.event.clone()).collect() }

    pub fn names(&self) -> Vec<&'static str> { self.records.lock().iter().map(|r| r.event.name()).collect() }

    /// Un registro JSON por línea, para adjuntar a un reporte de error.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let records = self.records.lock();
        let mut out = String::new();
        for r in records.iter() {
            out.push_str(&serde_json::to_string(r)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl SetupEventHandler for RecordingHandler {
    fn handle(&self, event: &SetupEvent) -> Result<(), ProgressError> {
        let mut records = self.records.lock();
        let seq = records.len() as u64;
        records.push(SetupEventRecord { seq, event: event.clone(), ts: Utc::now() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl SetupEventHandler for Failing {
        fn handle(&self, _event: &SetupEvent) -> Result<(), ProgressError> { Err(ProgressError::Handler("boom".into())) }
    }

    #[test]
    fn multiplexer_delivers_to_all_and_returns_first_error() {
        let rec_a = Arc::new(RecordingHandler::new());
        let rec_b = Arc::new(RecordingHandler::new());
        let mux = EventMultiplexer::default().with(rec_a.clone())
                                             .with(Arc::new(Failing))
                                             .with(rec_b.clone())
                                             .with(Arc::new(VoidHandler));
        let err = mux.handle(&SetupEvent::SolveStart).unwrap_err();
        assert_eq!(err, ProgressError::Handler("boom".into()));
        assert_eq!(rec_a.names(), vec!["SolveStart"]);
        assert_eq!(rec_b.names(), vec!["SolveStart"], "el handler posterior al fallo también recibe el evento");
        assert_eq!(mux.len(), 4);
    }

    #[test]
    fn recording_keeps_order_and_sequence() {
        let rec = RecordingHandler::new();
        rec.handle(&SetupEvent::SolveStart).unwrap();
        rec.handle(&SetupEvent::SolveSuccess).unwrap();
        tokio_test::block_on(rec.close()).unwrap();
        let records = rec.records();
        assert_eq!(records.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(rec.events()[1], SetupEvent::SolveSuccess);

        let lines = rec.to_json_lines().unwrap();
        let first: serde_json::Value = serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        assert_eq!(first["seq"], 0);
        assert_eq!(first["event"], "SolveStart");
    }
}
