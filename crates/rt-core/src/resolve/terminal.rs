//! Resolución de terminales: filtra por plataforma y desciende hasta los
//! artifacts objetivo.

use std::collections::HashSet;

use indexmap::IndexSet;
use log::debug;

use super::ResolveOptions;
use crate::constants::{MAX_TRAVERSAL_DEPTH, PLATFORM_TAG_PREFIX, TAG_SOURCE};
use crate::errors::ResolveError;
use crate::lookup::{LookupTable, Node};
use crate::model::{BuildPlan, NodeId, Terminal};

/// Terminal cuyo tag es exactamente `platform:<platform_id>`.
pub fn filter_platform_terminal<'p>(plan: &'p BuildPlan, platform_id: &str) -> Result<&'p Terminal, ResolveError> {
    plan.terminals
        .iter()
        .find(|t| t.tag.strip_prefix(PLATFORM_TAG_PREFIX) == Some(platform_id))
        .ok_or_else(|| ResolveError::NoMatchingPlatform { platform_id: platform_id.to_string(),
                                                          available: plan.platform_ids() })
}

/// Nombre de artifact recortado en el primer `.`, para mensajes de error.
pub fn trim_display_name(display_name: &str) -> &str {
    match display_name.find('.') {
        Some(idx) => &display_name[..idx],
        None => display_name,
    }
}

/// Desciende desde los nodos de entrada de un terminal y devuelve los
/// artifacts objetivo en orden de descubrimiento, sin duplicados.
///
/// - Un nodo que no es artifact es una rama muerta (sin error).
/// - Un artifact con estado no exitoso falla salvo `allow_failed`.
/// - Con `installable_only`, un artifact instalable se registra y corta el
///   descenso; en otro caso se registra todo artifact y se sigue bajando por
///   los inputs `src` del step que lo generó.
pub fn terminal_targets(lookup: &LookupTable<'_>,
                        entry_ids: &[NodeId],
                        opts: ResolveOptions)
                        -> Result<Vec<NodeId>, ResolveError> {
    let mut walk = TargetWalk { lookup, opts, targets: IndexSet::new(), expanded: HashSet::new(), path: HashSet::new() };
    for id in entry_ids {
        walk.unpack(id, 0)?;
    }
    Ok(walk.targets.into_iter().collect())
}

struct TargetWalk<'l, 'a> {
    lookup: &'l LookupTable<'a>,
    opts: ResolveOptions,
    targets: IndexSet<NodeId>,
    expanded: HashSet<NodeId>,
    path: HashSet<NodeId>,
}

impl TargetWalk<'_, '_> {
    fn unpack(&mut self, id: &NodeId, depth: usize) -> Result<(), ResolveError> {
        if depth > MAX_TRAVERSAL_DEPTH {
            return Err(ResolveError::DepthExceeded { id: id.clone(), depth });
        }
        let artifact = match self.lookup.get(id) {
            Some(Node::Artifact(a)) => a,
            _ => {
                debug!("node {id} does not resolve to an artifact");
                return Ok(());
            }
        };
        if self.expanded.contains(id) {
            return Ok(());
        }
        if !artifact.status.is_success() && !self.opts.allow_failed {
            return Err(ResolveError::ArtifactFailed { artifact_id: id.clone(),
                                                      display_name: trim_display_name(&artifact.display_name).to_string(),
                                                      status: artifact.status });
        }

        if !self.opts.installable_only {
            self.targets.insert(id.clone());
        } else if artifact.is_installable() {
            self.targets.insert(id.clone());
            self.expanded.insert(id.clone());
            return Ok(());
        }

        let Some(step) = self.lookup.step(&artifact.generated_by) else {
            debug!("artifact {id} has no generating step, dead branch");
            self.expanded.insert(id.clone());
            return Ok(());
        };

        if !self.path.insert(id.clone()) {
            return Err(ResolveError::CycleDetected(id.clone()));
        }
        for input in step.inputs_tagged(TAG_SOURCE) {
            self.unpack(input, depth + 1)?;
        }
        self.path.remove(id);
        self.expanded.insert(id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactStatus;
    use serde_json::json;

    fn plan(status: &str) -> BuildPlan {
        BuildPlan::from_json_value(json!({
            "terminals": [{"tag": "platform:p1", "nodeIds": ["top"]}, {"tag": "platform:p2", "nodeIds": []}],
            "steps": [
                {"stepId": "s-top", "inputs": [{"tag": "src", "nodeIds": ["mid", "ghost"]}]},
                {"stepId": "s-mid", "inputs": [{"tag": "src", "nodeIds": ["src-mid"]}]}
            ],
            "artifacts": [
                {"nodeId": "top", "mimeType": "application/x-gozip-installer", "status": "SUCCEEDED", "generatedBy": "s-top", "displayName": "top.installer"},
                {"nodeId": "mid", "mimeType": "application/x.artifact", "status": status, "generatedBy": "s-mid", "displayName": "python.3.10 build"}
            ],
            "sources": [{"nodeId": "src-mid", "name": "python", "namespace": "language", "version": "3.10"}]
        }))
        .unwrap()
    }

    #[test]
    fn platform_filter_is_exact_after_prefix() {
        let p = plan("SUCCEEDED");
        assert_eq!(filter_platform_terminal(&p, "p1").unwrap().tag, "platform:p1");
        let err = filter_platform_terminal(&p, "p").unwrap_err();
        match err {
            ResolveError::NoMatchingPlatform { platform_id, available } => {
                assert_eq!(platform_id, "p");
                assert_eq!(available, vec!["p1".to_string(), "p2".to_string()]);
            }
            other => panic!("error inesperado: {other:?}"),
        }
    }

    #[test]
    fn installable_only_stops_at_first_installable() {
        let p = plan("SUCCEEDED");
        let lookup = LookupTable::new(&p);
        let targets = terminal_targets(&lookup, &["top".into()], ResolveOptions::default()).unwrap();
        assert_eq!(targets, vec![NodeId::from("mid")]);
        let all = terminal_targets(&lookup, &["top".into()], ResolveOptions::all_artifacts()).unwrap();
        assert_eq!(all, vec![NodeId::from("top"), NodeId::from("mid")]);
    }

    #[test]
    fn failed_artifact_reports_trimmed_display_name() {
        let p = plan("FAILED_PERMANENTLY");
        let lookup = LookupTable::new(&p);
        let err = terminal_targets(&lookup, &["top".into()], ResolveOptions::default()).unwrap_err();
        assert_eq!(err,
                   ResolveError::ArtifactFailed { artifact_id: "mid".into(),
                                                  display_name: "python".into(),
                                                  status: ArtifactStatus::FailedPermanently });
        assert!(err.to_string().contains("'python'"));
        let allowed = terminal_targets(&lookup, &["top".into()], ResolveOptions::default().with_allow_failed(true)).unwrap();
        assert_eq!(allowed, vec![NodeId::from("mid")]);
    }

    #[test]
    fn non_artifact_entry_is_dead_branch() {
        let p = plan("SUCCEEDED");
        let lookup = LookupTable::new(&p);
        let targets = terminal_targets(&lookup, &["s-top".into(), "nope".into()], ResolveOptions::default()).unwrap();
        assert!(targets.is_empty());
    }
}
