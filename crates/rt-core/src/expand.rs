//! Expansión de dependencias sobre un `ArtifactMap` ya construido.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{ArtifactMap, NodeId};

/// Conjunto transitivo de dependencias de `id` (sin incluir `id`). Ids que
/// no están en el mapa se ignoran. Recorrido iterativo con worklist.
pub fn recursive_dependencies_for(id: &NodeId, map: &ArtifactMap) -> BTreeSet<NodeId> {
    let Some(root) = map.get(id) else {
        return BTreeSet::new();
    };
    let mut visited = BTreeSet::new();
    let mut worklist: Vec<&NodeId> = root.dependencies.iter().collect();
    while let Some(next) = worklist.pop() {
        if visited.contains(next) {
            continue;
        }
        let Some(artifact) = map.get(next) else {
            continue;
        };
        visited.insert(next.clone());
        worklist.extend(artifact.dependencies.iter());
    }
    visited.remove(id);
    visited
}

/// Dependencias de `id` que no son alcanzables a través de otra de sus
/// dependencias. Los registros del mapa guardan la clausura completa, esto
/// recupera las aristas directas.
pub fn direct_dependencies(id: &NodeId, map: &ArtifactMap) -> BTreeSet<NodeId> {
    let Some(root) = map.get(id) else {
        return BTreeSet::new();
    };
    let mut indirect = HashSet::new();
    for dep in &root.dependencies {
        indirect.extend(recursive_dependencies_for(dep, map));
    }
    root.dependencies
        .iter()
        .filter(|d| *d != id && map.contains_key(*d) && !indirect.contains(*d))
        .cloned()
        .collect()
}

/// Para cada dependencia directa de `id` que no esté ya instalada, sus
/// propias dependencias recursivas (también excluyendo las instaladas).
pub fn dependency_tree_for(id: &NodeId,
                           map: &ArtifactMap,
                           installed: &ArtifactMap)
                           -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    direct_dependencies(id, map).into_iter()
                                .filter(|d| !installed.contains_key(d))
                                .map(|d| {
                                    let subs = recursive_dependencies_for(&d, map).into_iter()
                                                                                 .filter(|s| !installed.contains_key(s))
                                                                                 .collect();
                                    (d, subs)
                                })
                                .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolvedArtifact;

    fn rec(id: &str, deps: &[&str]) -> (NodeId, ResolvedArtifact) {
        (id.into(),
         ResolvedArtifact { artifact_id: id.into(),
                            name: id.to_string(),
                            namespace: "ns".into(),
                            version: "1".into(),
                            dependencies: deps.iter().map(|d| NodeId::from(*d)).collect(),
                            generated_by: "s".into(),
                            url: String::new(),
                            mime_type: String::new() })
    }

    fn sample() -> ArtifactMap {
        // a -> b -> c ; a -> c ; b -> ghost (no está en el mapa)
        [rec("a", &["b", "c"]), rec("b", &["c", "ghost"]), rec("c", &[])].into_iter().collect()
    }

    #[test]
    fn recursive_set_excludes_query_and_unknown_ids() {
        let map = sample();
        let deps = recursive_dependencies_for(&"a".into(), &map);
        assert_eq!(deps, BTreeSet::from(["b".into(), "c".into()]));
        assert_eq!(recursive_dependencies_for(&"a".into(), &map), deps, "debe ser un punto fijo");
        assert!(recursive_dependencies_for(&"zzz".into(), &map).is_empty());
    }

    #[test]
    fn self_loop_does_not_include_query() {
        let map: ArtifactMap = [rec("a", &["b"]), rec("b", &["a"])].into_iter().collect();
        assert_eq!(recursive_dependencies_for(&"a".into(), &map), BTreeSet::from(["b".into()]));
    }

    #[test]
    fn direct_dependencies_drop_transitive_edges() {
        let map = sample();
        assert_eq!(direct_dependencies(&"a".into(), &map), BTreeSet::from(["b".into()]));
    }

    #[test]
    fn tree_skips_installed() {
        let map = sample();
        let installed: ArtifactMap = [rec("c", &[])].into_iter().collect();
        let tree = dependency_tree_for(&"a".into(), &map, &installed);
        assert_eq!(tree.len(), 1);
        assert!(tree[&NodeId::from("b")].is_empty());
    }
}
