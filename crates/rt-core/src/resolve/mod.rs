//! Resolución del plan de build: terminales, información de source y
//! clausuras runtime/buildtime.
//!
//! Todas las funciones son síncronas y puras sobre un plan inmutable. No se
//! paralelizan internamente; resolver planes distintos desde hilos distintos
//! es seguro porque no hay estado compartido.

mod closure;
mod source;
mod terminal;

pub use closure::{ClosureBuilder, ClosureKind};
pub use source::source_info;
pub use terminal::{filter_platform_terminal, terminal_targets, trim_display_name};

use log::debug;

use crate::constants::TAG_ORPHANS;
use crate::errors::ResolveError;
use crate::lookup::LookupTable;
use crate::model::{to_named, ArtifactMap, BuildPlan, NamedArtifactMap, Terminal, TerminalArtifactMap};

/// Opciones de recorrido desde los terminales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Detener el descenso en el primer artifact instalable. Con `false` se
    /// registran todos los artifacts del camino.
    pub installable_only: bool,
    /// No fallar ante artifacts con estado de error.
    pub allow_failed: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self { Self { installable_only: true, allow_failed: false } }
}

impl ResolveOptions {
    /// Incluye intermedios e instaladores, no sólo artifacts instalables.
    pub fn all_artifacts() -> Self { Self { installable_only: false, ..Self::default() } }

    pub fn with_allow_failed(mut self, allow: bool) -> Self {
        self.allow_failed = allow;
        self
    }
}

/// Resuelve un terminal concreto a su mapa de artifacts.
pub fn resolve_terminal(lookup: &LookupTable<'_>,
                        terminal: &Terminal,
                        kind: ClosureKind,
                        opts: ResolveOptions)
                        -> Result<ArtifactMap, ResolveError> {
    let targets = terminal_targets(lookup, &terminal.node_ids, opts)?;
    debug!("terminal {} resolves to {} target(s)", terminal.tag, targets.len());
    let mut builder = ClosureBuilder::new(lookup, kind, opts);
    for id in &targets {
        builder.add_target(id)?;
    }
    Ok(builder.finish())
}

fn resolve_platform(plan: &BuildPlan,
                    platform_id: &str,
                    kind: ClosureKind,
                    opts: ResolveOptions)
                    -> Result<ArtifactMap, ResolveError> {
    let terminal = filter_platform_terminal(plan, platform_id)?;
    let lookup = LookupTable::new(plan);
    resolve_terminal(&lookup, terminal, kind, opts)
}

/// Clausura runtime para la plataforma indicada.
pub fn runtime_closure(plan: &BuildPlan, platform_id: &str, opts: ResolveOptions) -> Result<ArtifactMap, ResolveError> {
    resolve_platform(plan, platform_id, ClosureKind::Runtime, opts)
}

/// Clausura buildtime para la plataforma indicada (superconjunto de la runtime).
pub fn buildtime_closure(plan: &BuildPlan, platform_id: &str, opts: ResolveOptions) -> Result<ArtifactMap, ResolveError> {
    resolve_platform(plan, platform_id, ClosureKind::Buildtime, opts)
}

/// Clausura runtime indexada por nombre, para diffs entre commits.
pub fn named_runtime_closure(plan: &BuildPlan,
                             platform_id: &str,
                             opts: ResolveOptions)
                             -> Result<NamedArtifactMap, ResolveError> {
    Ok(to_named(&runtime_closure(plan, platform_id, opts)?))
}

/// Resuelve todos los terminales salvo `orphans`, uno por tag.
pub fn resolve_terminal_maps(plan: &BuildPlan,
                             kind: ClosureKind,
                             opts: ResolveOptions)
                             -> Result<TerminalArtifactMap, ResolveError> {
    let lookup = LookupTable::new(plan);
    let mut out = TerminalArtifactMap::new();
    for terminal in plan.terminals.iter().filter(|t| t.tag != TAG_ORPHANS) {
        let map = resolve_terminal(&lookup, terminal, kind, opts)?;
        out.insert(terminal.tag.clone(), map);
    }
    Ok(out)
}
