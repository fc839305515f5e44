//! Resumen de dependencias adicionales cuando un cambio agrega un único
//! paquete independiente.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::Changeset;
use crate::expand::{dependency_tree_for, recursive_dependencies_for};
use crate::model::{ArtifactMap, NodeId, ResolvedArtifact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub artifact_id: NodeId,
    pub name: String,
    pub version: String,
    pub sub_dependencies: usize,
    /// Versión instalada previamente, si difiere de la nueva.
    pub previous_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub requested: ResolvedArtifact,
    /// Dependencias directas, ordenadas por nombre.
    pub entries: Vec<SummaryEntry>,
    /// Directas más indirectas, sin duplicados.
    pub total_dependencies: usize,
}

impl ChangeSummary {
    /// `None` si no hay exactamente un artifact agregado sin dependientes, o
    /// si ese artifact no trae dependencias nuevas.
    pub fn from_changeset(changeset: &Changeset, map: &ArtifactMap, installed: &ArtifactMap) -> Option<Self> {
        let mut requested: Option<&ResolvedArtifact> = None;
        for candidate in &changeset.added {
            if has_dependant(&candidate.artifact_id, changeset, map) {
                continue;
            }
            if requested.is_some() {
                return None;
            }
            requested = Some(candidate);
        }
        let requested = requested?;

        let tree = dependency_tree_for(&requested.artifact_id, map, installed);
        if tree.is_empty() {
            return None;
        }
        let mut unique: BTreeSet<&NodeId> = BTreeSet::new();
        for (id, subs) in &tree {
            unique.insert(id);
            unique.extend(subs.iter());
        }

        let previous: HashMap<String, &str> =
            installed.values().map(|a| (a.qualified_name(), a.version.as_str())).collect();

        let mut entries: Vec<SummaryEntry> = tree.iter()
                                                 .filter_map(|(id, subs)| {
                                                     let dep = map.get(id)?;
                                                     let previous_version = previous.get(&dep.qualified_name())
                                                                                    .filter(|old| !dep.version.is_empty() && **old != dep.version)
                                                                                    .map(|old| old.to_string());
                                                     Some(SummaryEntry { artifact_id: id.clone(),
                                                                         name: dep.name.clone(),
                                                                         version: dep.version.clone(),
                                                                         sub_dependencies: subs.len(),
                                                                         previous_version })
                                                 })
                                                 .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Some(ChangeSummary { requested: requested.clone(), entries, total_dependencies: unique.len() })
    }
}

fn has_dependant(id: &NodeId, changeset: &Changeset, map: &ArtifactMap) -> bool {
    let depends_on = |other: &NodeId| recursive_dependencies_for(other, map).contains(id);
    changeset.added.iter().any(|a| &a.artifact_id != id && depends_on(&a.artifact_id))
    || changeset.updated.iter().any(|u| depends_on(&u.to.artifact_id) || depends_on(&u.from.artifact_id))
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direct = self.entries.len();
        write!(f, "{} includes {direct} direct dependencies", self.requested.name_with_version())?;
        if direct < self.total_dependencies {
            write!(f, " ({} total)", self.total_dependencies)?;
        }
        writeln!(f)?;
        for (i, entry) in self.entries.iter().enumerate() {
            let prefix = if i + 1 == direct { "└─" } else { "├─" };
            let mut item = format!("{}@{}", entry.name, entry.version);
            if entry.sub_dependencies > 0 {
                item.push_str(&format!(" ({} dependencies)", entry.sub_dependencies));
            }
            if let Some(old) = &entry.previous_version {
                item = format!("{}@{old} → {item} (updated)", entry.name);
            }
            writeln!(f, "  {prefix} {item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::ArtifactUpdate;

    fn rec(id: &str, name: &str, version: &str, deps: &[&str]) -> ResolvedArtifact {
        ResolvedArtifact { artifact_id: id.into(),
                           name: name.into(),
                           namespace: "language/python".into(),
                           version: version.into(),
                           dependencies: deps.iter().map(|d| NodeId::from(*d)).collect(),
                           generated_by: "s".into(),
                           url: String::new(),
                           mime_type: String::new() }
    }

    fn map_of(items: &[ResolvedArtifact]) -> ArtifactMap {
        items.iter().map(|a| (a.artifact_id.clone(), a.clone())).collect()
    }

    #[test]
    fn lists_direct_dependencies_of_single_added_package() {
        // requests -> {urllib3, idna, certifi}; urllib3 -> brotli
        let requests = rec("r", "requests", "2.31.0", &["u", "i", "c", "b"]);
        let urllib3 = rec("u", "urllib3", "2.1.0", &["b"]);
        let idna = rec("i", "idna", "3.6", &[]);
        let certifi = rec("c", "certifi", "2024.2", &[]);
        let brotli = rec("b", "brotli", "1.1", &[]);
        let map = map_of(&[requests.clone(), urllib3.clone(), idna.clone(), certifi.clone(), brotli.clone()]);
        let installed = map_of(&[rec("old-u", "urllib3", "1.26.0", &[])]);
        let cs = Changeset { added: vec![requests, idna, certifi, brotli],
                             updated: vec![ArtifactUpdate { from: rec("old-u", "urllib3", "1.26.0", &[]), to: urllib3 }],
                             ..Changeset::default() };

        let summary = ChangeSummary::from_changeset(&cs, &map, &installed).expect("debe haber resumen");
        assert_eq!(summary.requested.name, "requests");
        let names: Vec<&str> = summary.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["certifi", "idna", "urllib3"]);
        let u = &summary.entries[2];
        assert_eq!(u.sub_dependencies, 1);
        assert_eq!(u.previous_version.as_deref(), Some("1.26.0"));
        assert_eq!(summary.total_dependencies, 4);

        let text = summary.to_string();
        assert!(text.starts_with("requests@2.31.0 includes 3 direct dependencies (4 total)"));
        assert!(text.contains("  ├─ certifi@2024.2\n"));
        assert!(text.contains("  └─ urllib3@1.26.0 → urllib3@2.1.0 (1 dependencies) (updated)\n"));
    }

    #[test]
    fn two_independent_additions_yield_no_summary() {
        let a = rec("a", "a", "1", &["x"]);
        let b = rec("b", "b", "1", &[]);
        let x = rec("x", "x", "1", &[]);
        let map = map_of(&[a.clone(), b.clone(), x.clone()]);
        let cs = Changeset { added: vec![a, b, x], ..Changeset::default() };
        assert!(ChangeSummary::from_changeset(&cs, &map, &ArtifactMap::new()).is_none());
    }
}
