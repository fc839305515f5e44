//! Diferencias entre dos mapas de artifacts indexados por nombre.

mod summary;

pub use summary::{ChangeSummary, SummaryEntry};

use serde::Serialize;

use crate::model::{NamedArtifactMap, ResolvedArtifact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUpdate {
    pub from: ResolvedArtifact,
    pub to: ResolvedArtifact,
}

/// Clasificación de cada nombre presente en `old ∪ new`. Cada nombre cae
/// en exactamente una de las cuatro listas; todas ordenadas por nombre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub added: Vec<ResolvedArtifact>,
    pub removed: Vec<ResolvedArtifact>,
    pub updated: Vec<ArtifactUpdate>,
    pub unchanged: Vec<ResolvedArtifact>,
}

impl Changeset {
    pub fn between(old: &NamedArtifactMap, new: &NamedArtifactMap) -> Self {
        let mut cs = Changeset::default();
        for (name, artifact) in new {
            match old.get(name) {
                None => cs.added.push(artifact.clone()),
                Some(prev) if prev.version != artifact.version => {
                    cs.updated.push(ArtifactUpdate { from: prev.clone(), to: artifact.clone() })
                }
                Some(_) => cs.unchanged.push(artifact.clone()),
            }
        }
        cs.removed = old.iter().filter(|(name, _)| !new.contains_key(*name)).map(|(_, a)| a.clone()).collect();
        cs
    }

    pub fn is_empty(&self) -> bool { self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty() }

    /// Número total de nombres clasificados.
    pub fn len(&self) -> usize { self.added.len() + self.removed.len() + self.updated.len() + self.unchanged.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeId;

    fn named(entries: &[(&str, &str, &str)]) -> NamedArtifactMap {
        entries.iter()
               .map(|(id, name, version)| {
                   (name.to_string(),
                    ResolvedArtifact { artifact_id: NodeId::from(*id),
                                       name: name.to_string(),
                                       namespace: "language/python".into(),
                                       version: version.to_string(),
                                       dependencies: vec![],
                                       generated_by: "s".into(),
                                       url: String::new(),
                                       mime_type: String::new() })
               })
               .collect()
    }

    #[test]
    fn classifies_each_name_once() {
        let old = named(&[("1", "requests", "2.30"), ("2", "urllib3", "2.0"), ("3", "six", "1.16")]);
        let new = named(&[("4", "requests", "2.31"), ("2", "urllib3", "2.0"), ("5", "idna", "3.6")]);
        let cs = Changeset::between(&old, &new);
        assert_eq!(cs.added.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["idna"]);
        assert_eq!(cs.removed.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["six"]);
        assert_eq!(cs.updated.len(), 1);
        assert_eq!(cs.updated[0].from.version, "2.30");
        assert_eq!(cs.updated[0].to.artifact_id, NodeId::from("4"));
        assert_eq!(cs.unchanged.len(), 1);
        assert_eq!(cs.len(), 4);
        assert!(!cs.is_empty());
    }

    #[test]
    fn identical_maps_are_all_unchanged() {
        let m = named(&[("1", "a", "1"), ("2", "b", "2")]);
        let cs = Changeset::between(&m, &m);
        assert!(cs.is_empty());
        assert_eq!(cs.unchanged.len(), 2);
    }
}
