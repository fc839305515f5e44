//! Barras con contabilidad propia sobre `indicatif`.
//!
//! `indicatif` satura en silencio al superar el total; aquí cada barra lleva
//! su `current/total` y un incremento que lo excede es un error.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::errors::ProgressError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BarState {
    Active,
    Complete,
    Aborted,
}

#[derive(Debug)]
pub struct TrackedBar {
    label: String,
    bar: ProgressBar,
    current: u64,
    total: u64,
    state: BarState,
}

impl TrackedBar {
    fn new(bar: ProgressBar, label: String, total: u64) -> Self {
        let mut tracked = Self { label, bar, current: 0, total, state: BarState::Active };
        if total == 0 {
            tracked.complete();
        }
        tracked
    }

    /// Barra agregada de una fase (un paso por artifact).
    pub fn aggregate(multi: &MultiProgress, label: &str, total: u64) -> Self {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(style("{spinner} {msg:<20} [{bar:30}] {pos}/{len}"));
        pb.set_message(label.to_string());
        Self::new(pb, label.to_string(), total)
    }

    /// Barra por artifact, en bytes.
    pub fn artifact(multi: &MultiProgress, label: &str, total: u64) -> Self {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(style("  {msg:<40} [{bar:30}] {bytes}/{total_bytes}"));
        pb.set_message(label.to_string());
        Self::new(pb, label.to_string(), total)
    }

    /// Spinner de un solo paso (solve, build por artifact).
    pub fn spinner(multi: &MultiProgress, label: &str) -> Self {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(style("{spinner} {msg}"));
        pb.set_message(label.to_string());
        Self::new(pb, label.to_string(), 1)
    }

    pub fn label(&self) -> &str { &self.label }

    pub fn current(&self) -> u64 { self.current }

    pub fn total(&self) -> u64 { self.total }

    pub fn state(&self) -> BarState { self.state }

    pub fn is_active(&self) -> bool { self.state == BarState::Active }

    pub fn increment(&mut self, by: u64) -> Result<(), ProgressError> {
        if !self.is_active() {
            return Err(ProgressError::BarNotActive { label: self.label.clone() });
        }
        let next = self.current
                       .checked_add(by)
                       .filter(|n| *n <= self.total)
                       .ok_or_else(|| ProgressError::Overflow { label: self.label.clone(),
                                                                current: self.current,
                                                                total: self.total,
                                                                increment: by })?;
        self.current = next;
        self.bar.set_position(next);
        if next == self.total {
            self.complete();
        }
        Ok(())
    }

    /// Marca la barra como terminada y la lleva a su total.
    pub fn complete(&mut self) {
        if self.is_active() {
            self.current = self.total;
            self.bar.set_position(self.total);
            self.bar.finish();
            self.state = BarState::Complete;
        }
    }

    /// No bloquea: deja la barra dibujada en su posición actual.
    pub fn abort(&mut self) {
        if self.is_active() {
            self.bar.abandon();
            self.state = BarState::Aborted;
        }
    }

    pub fn tick(&self) {
        if self.is_active() {
            self.bar.tick();
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
                                          .progress_chars("=> ")
}

/// Recorta un nombre para que quepa en la columna de etiquetas.
pub fn fit_label(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let keep: String = name.chars().take(width.saturating_sub(1)).collect();
    format!("{keep}…")
}
