//! Construcción de clausuras runtime y buildtime.
//!
//! Ambas variantes son recorridos post-orden: las dependencias entran al
//! mapa antes que el artifact que las requiere. Los conjuntos de
//! dependencias se memorizan por `NodeId`, así un sub-DAG compartido por
//! varios padres (diamante) se deriva una sola vez.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use log::debug;
use uuid::Uuid;

use super::{source_info, trim_display_name, ResolveOptions};
use crate::constants::{MAX_TRAVERSAL_DEPTH, TAG_DEPENDENCY, UUID_TEXT_LEN};
use crate::errors::ResolveError;
use crate::lookup::{LookupTable, Node};
use crate::model::{Artifact, ArtifactMap, NodeId, ResolvedArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    /// Lo necesario para ejecutar: dependencias runtime transitivas.
    Runtime,
    /// Todo lo que participó en producirlo: runtime más inputs `deps` de
    /// los steps, recursivamente.
    Buildtime,
}

pub struct ClosureBuilder<'l, 'a> {
    lookup: &'l LookupTable<'a>,
    kind: ClosureKind,
    opts: ResolveOptions,
    runtime_memo: HashMap<NodeId, Vec<NodeId>>,
    buildtime_memo: HashMap<NodeId, Vec<NodeId>>,
    runtime_path: HashSet<NodeId>,
    buildtime_path: HashSet<NodeId>,
    map: ArtifactMap,
}

impl<'l, 'a> ClosureBuilder<'l, 'a> {
    pub fn new(lookup: &'l LookupTable<'a>, kind: ClosureKind, opts: ResolveOptions) -> Self {
        Self { lookup,
               kind,
               opts,
               runtime_memo: HashMap::new(),
               buildtime_memo: HashMap::new(),
               runtime_path: HashSet::new(),
               buildtime_path: HashSet::new(),
               map: ArtifactMap::new() }
    }

    /// Agrega un artifact objetivo (y su clausura) al mapa.
    pub fn add_target(&mut self, id: &NodeId) -> Result<(), ResolveError> {
        match self.kind {
            ClosureKind::Runtime => self.build_runtime_entry(id, 0),
            ClosureKind::Buildtime => self.build_buildtime_entry(id, 0),
        }
    }

    pub fn finish(self) -> ArtifactMap { self.map }

    fn checked_artifact(&self, id: &NodeId) -> Result<&'a Artifact, ResolveError> {
        let artifact = self.lookup.artifact(id)?;
        if artifact.status.is_failure() && !self.opts.allow_failed {
            return Err(ResolveError::ArtifactFailed { artifact_id: id.clone(),
                                                      display_name: trim_display_name(&artifact.display_name).to_string(),
                                                      status: artifact.status });
        }
        Ok(artifact)
    }

    fn enter(path: &mut HashSet<NodeId>, id: &NodeId, depth: usize) -> Result<(), ResolveError> {
        if depth > MAX_TRAVERSAL_DEPTH {
            return Err(ResolveError::DepthExceeded { id: id.clone(), depth });
        }
        if !path.insert(id.clone()) {
            return Err(ResolveError::CycleDetected(id.clone()));
        }
        Ok(())
    }

    /// Dependencias runtime directas más las de cada dependencia, sin duplicados.
    fn runtime_deps(&mut self, id: &NodeId, depth: usize) -> Result<Vec<NodeId>, ResolveError> {
        if let Some(deps) = self.runtime_memo.get(id) {
            return Ok(deps.clone());
        }
        Self::enter(&mut self.runtime_path, id, depth)?;
        let artifact = self.checked_artifact(id)?;
        let mut deps = IndexSet::new();
        for dep in &artifact.runtime_dependencies {
            deps.insert(dep.clone());
            deps.extend(self.runtime_deps(dep, depth + 1)?);
        }
        self.runtime_path.remove(id);
        let deps: Vec<NodeId> = deps.into_iter().collect();
        self.runtime_memo.insert(id.clone(), deps.clone());
        Ok(deps)
    }

    /// Clausura runtime unida a los inputs `deps` del step generador,
    /// expandidos con la misma semántica.
    fn buildtime_deps(&mut self, id: &NodeId, depth: usize) -> Result<Vec<NodeId>, ResolveError> {
        if let Some(deps) = self.buildtime_memo.get(id) {
            return Ok(deps.clone());
        }
        Self::enter(&mut self.buildtime_path, id, depth)?;
        let artifact = self.checked_artifact(id)?;
        let mut deps: IndexSet<NodeId> = self.runtime_deps(id, depth)?.into_iter().collect();
        if let Some(step) = self.lookup.step(&artifact.generated_by) {
            for input in step.inputs_tagged(TAG_DEPENDENCY) {
                match self.lookup.get(input) {
                    Some(Node::Artifact(_)) => {
                        deps.insert(input.clone());
                        deps.extend(self.buildtime_deps(input, depth + 1)?);
                    }
                    Some(other) => debug!("skipping {} dependency input {input} of step {}", other.kind(), step.step_id),
                    None => return Err(ResolveError::NodeNotFound(input.clone())),
                }
            }
        }
        self.buildtime_path.remove(id);
        let deps: Vec<NodeId> = deps.into_iter().collect();
        self.buildtime_memo.insert(id.clone(), deps.clone());
        Ok(deps)
    }

    fn build_runtime_entry(&mut self, id: &NodeId, depth: usize) -> Result<(), ResolveError> {
        if self.map.contains_key(id) {
            return Ok(());
        }
        let artifact = self.checked_artifact(id)?;
        let deps = self.runtime_deps(id, depth)?;
        for dep in &artifact.runtime_dependencies {
            self.build_runtime_entry(dep, depth + 1)?;
        }
        let record = self.runtime_record(artifact, deps)?;
        self.map.insert(id.clone(), record);
        Ok(())
    }

    fn build_buildtime_entry(&mut self, id: &NodeId, depth: usize) -> Result<(), ResolveError> {
        if self.map.contains_key(id) {
            return Ok(());
        }
        let artifact = self.checked_artifact(id)?;
        let deps = self.buildtime_deps(id, depth)?;
        for dep in &deps {
            self.build_buildtime_entry(dep, depth + 1)?;
        }
        let info = source_info(self.lookup, &artifact.generated_by)?;
        let record = ResolvedArtifact { artifact_id: artifact.node_id.clone(),
                                        name: info.name,
                                        namespace: info.namespace,
                                        version: info.version,
                                        dependencies: deps,
                                        generated_by: artifact.generated_by.clone(),
                                        url: artifact.url.clone(),
                                        mime_type: artifact.mime_type.clone() };
        self.map.insert(id.clone(), record);
        Ok(())
    }

    fn runtime_record(&self, artifact: &Artifact, deps: Vec<NodeId>) -> Result<ResolvedArtifact, ResolveError> {
        let info = source_info(self.lookup, &artifact.generated_by)?;
        let name = if artifact.is_installable() {
            info.name
        } else {
            display_derived_name(&artifact.display_name, &artifact.url)
        };
        Ok(ResolvedArtifact { artifact_id: artifact.node_id.clone(),
                              name,
                              namespace: info.namespace,
                              version: info.version,
                              dependencies: deps,
                              generated_by: artifact.generated_by.clone(),
                              url: artifact.url.clone(),
                              mime_type: artifact.mime_type.clone() })
    }
}

/// Nombre de un artifact no instalable: display name sin prefijo UUID,
/// completado con el nombre de archivo de su URL.
pub(crate) fn display_derived_name(display_name: &str, url: &str) -> String {
    let mut name = display_name;
    if name.len() >= UUID_TEXT_LEN
       && name.is_char_boundary(UUID_TEXT_LEN)
       && Uuid::parse_str(&name[..UUID_TEXT_LEN]).is_ok()
    {
        name = name[UUID_TEXT_LEN..].trim();
    }
    let filename = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    match (name.is_empty(), filename.is_empty()) {
        (false, false) => format!("{name} ({filename})"),
        (false, true) => name.to_string(),
        (true, _) => filename.to_string(),
    }
}
