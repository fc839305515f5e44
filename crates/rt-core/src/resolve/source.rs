//! Recuperación de nombre/namespace/versión de un artifact.
//!
//! Relación: `Artifact (generatedBy) -> Step (input src) -> Source`, con
//! posibles artifacts intermedios antes del source real.

use crate::constants::{MAX_TRAVERSAL_DEPTH, TAG_SOURCE};
use crate::errors::ResolveError;
use crate::lookup::{LookupTable, Node};
use crate::model::{NodeId, SourceInfo};

/// Resuelve la identidad del ingrediente a partir del `generatedBy` de un
/// artifact. No encontrar un source es un error, nunca un valor vacío.
pub fn source_info(lookup: &LookupTable<'_>, generated_by: &NodeId) -> Result<SourceInfo, ResolveError> {
    source_info_at(lookup, generated_by, 0)
}

fn source_info_at(lookup: &LookupTable<'_>, id: &NodeId, depth: usize) -> Result<SourceInfo, ResolveError> {
    if depth > MAX_TRAVERSAL_DEPTH {
        return Err(ResolveError::DepthExceeded { id: id.clone(), depth });
    }
    let step = match lookup.get(id) {
        None => return Err(ResolveError::NodeNotFound(id.clone())),
        Some(Node::Source(source)) => return Ok(source.into()),
        Some(Node::Step(step)) => step,
        Some(Node::Artifact(_)) => {
            return Err(ResolveError::UnexpectedNodeKind { id: id.clone(), expected: "step or source" })
        }
    };

    // El primer input src decide: source directo o cadena de artifacts.
    if let Some(input) = step.inputs_tagged(TAG_SOURCE).next() {
        return match lookup.get(input) {
            Some(Node::Source(source)) => Ok(source.into()),
            Some(Node::Artifact(artifact)) => source_info_at(lookup, &artifact.generated_by, depth + 1),
            Some(Node::Step(_)) | None => Err(ResolveError::InvalidSourceInput(input.clone())),
        };
    }
    Err(ResolveError::SourceNotResolved(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BuildPlan;
    use serde_json::json;

    fn chain_plan() -> BuildPlan {
        BuildPlan::from_json_value(json!({
            "steps": [
                {"stepId": "s-outer", "inputs": [{"tag": "deps", "nodeIds": ["src-b"]}, {"tag": "src", "nodeIds": ["inner"]}]},
                {"stepId": "s-inner", "inputs": [{"tag": "src", "nodeIds": ["src-a"]}]},
                {"stepId": "s-empty", "inputs": [{"tag": "deps", "nodeIds": ["src-a"]}]},
                {"stepId": "s-bad", "inputs": [{"tag": "src", "nodeIds": ["s-inner"]}]}
            ],
            "artifacts": [
                {"nodeId": "inner", "mimeType": "application/x.artifact", "status": "SUCCEEDED", "generatedBy": "s-inner"}
            ],
            "sources": [
                {"nodeId": "src-a", "name": "requests", "namespace": "language/python", "version": "2.31.0"},
                {"nodeId": "src-b", "name": "other", "namespace": "x", "version": "0"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn follows_intermediate_artifacts_to_source() {
        let plan = chain_plan();
        let lookup = LookupTable::new(&plan);
        let info = source_info(&lookup, &"s-outer".into()).unwrap();
        assert_eq!(info.name, "requests");
        assert_eq!(info.namespace, "language/python");
        assert_eq!(info.version, "2.31.0");
        // un source directo también es válido como generatedBy
        assert_eq!(source_info(&lookup, &"src-b".into()).unwrap().name, "other");
    }

    #[test]
    fn missing_source_is_hard_error() {
        let plan = chain_plan();
        let lookup = LookupTable::new(&plan);
        assert_eq!(source_info(&lookup, &"s-empty".into()).unwrap_err(), ResolveError::SourceNotResolved("s-empty".into()));
        assert_eq!(source_info(&lookup, &"s-bad".into()).unwrap_err(), ResolveError::InvalidSourceInput("s-inner".into()));
        assert_eq!(source_info(&lookup, &"missing".into()).unwrap_err(), ResolveError::NodeNotFound("missing".into()));
    }
}
