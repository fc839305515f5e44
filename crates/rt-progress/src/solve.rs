//! Spinner del solve previo al `Start`.
//!
//! El solve produce los conjuntos que viajan en `Start`, así que sus eventos
//! llegan antes. `SolveSpinner` los dibuja por su cuenta y reenvía al handler
//! interno todo lo demás, de modo que el digester sigue viendo `Start` como
//! primer evento. Tras el `Start` todos los eventos se reenvían sin cambios.

use std::sync::Arc;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressDrawTarget};
use log::debug;
use parking_lot::Mutex;

use crate::bar::{BarState, TrackedBar};
use crate::config::DigesterConfig;
use crate::digester::PhaseState;
use crate::errors::ProgressError;
use crate::events::{Phase, SetupEvent};
use crate::handler::SetupEventHandler;

struct SpinnerState {
    multi: MultiProgress,
    bar: Option<TrackedBar>,
    started: bool,
}

pub struct SolveSpinner {
    inner: Arc<dyn SetupEventHandler>,
    state: Mutex<SpinnerState>,
}

impl SolveSpinner {
    pub fn new(config: &DigesterConfig, inner: Arc<dyn SetupEventHandler>) -> Self {
        let target = if config.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let state = SpinnerState { multi: MultiProgress::with_draw_target(target), bar: None, started: false };
        Self { inner, state: Mutex::new(state) }
    }

    /// Estado del solve visto antes del `Start`.
    pub fn solve_state(&self) -> PhaseState {
        match self.state.lock().bar.as_ref().map(TrackedBar::state) {
            None => PhaseState::NotStarted,
            Some(BarState::Active) => PhaseState::InProgress,
            Some(BarState::Complete) => PhaseState::Complete,
            Some(BarState::Aborted) => PhaseState::Aborted,
        }
    }

    fn solve_event(st: &mut SpinnerState, event: &SetupEvent) -> Result<(), ProgressError> {
        match event {
            SetupEvent::SolveStart => {
                if st.bar.is_some() {
                    return Err(ProgressError::PhaseAlreadyStarted(Phase::Solve));
                }
                st.bar = Some(TrackedBar::spinner(&st.multi, "Resolving dependencies"));
                Ok(())
            }
            SetupEvent::SolveSuccess => {
                st.bar.as_mut().ok_or(ProgressError::PhaseNotStarted(Phase::Solve))?.increment(1)
            }
            SetupEvent::SolveError { message } => {
                debug!("solve failed: {message}");
                if let Some(bar) = st.bar.as_mut() {
                    bar.abort();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SetupEventHandler for SolveSpinner {
    fn handle(&self, event: &SetupEvent) -> Result<(), ProgressError> {
        {
            let mut st = self.state.lock();
            if !st.started {
                if event.phase() == Some(Phase::Solve) {
                    let res = Self::solve_event(&mut st, event);
                    if let Some(bar) = st.bar.as_ref() {
                        bar.tick();
                    }
                    return res;
                }
                if matches!(event, SetupEvent::Start { .. }) {
                    if st.bar.as_ref().is_some_and(TrackedBar::is_active) {
                        return Err(ProgressError::SolveInProgress);
                    }
                    st.started = true;
                }
            }
        }
        self.inner.handle(event)
    }

    /// Abandona un spinner que no terminó y cierra el handler interno.
    async fn close(&self) -> Result<(), ProgressError> {
        if let Some(bar) = self.state.lock().bar.as_mut() {
            bar.abort();
        }
        self.inner.close().await
    }
}
