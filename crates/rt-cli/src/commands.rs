//! Implementación de los subcomandos. Cada función devuelve el texto a
//! imprimir; `main` sólo decide dónde y con qué código de salida.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use rt_core::{direct_dependencies, recursive_dependencies_for, to_named, ArtifactListing, BuildPlan, ChangeSummary,
              Changeset, ClosureKind, ResolveOptions, ResolvedArtifact};
use serde::Serialize;

use crate::errors::CliError;

const SHORT_ID_LEN: usize = 8;

pub fn load_plan(path: &Path) -> Result<BuildPlan, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    BuildPlan::from_json_str(&raw).map_err(CliError::Plan)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRow {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub version: String,
}

impl ArtifactRow {
    fn new(artifact: &ResolvedArtifact, full_id: bool) -> Self {
        let id = if full_id { artifact.artifact_id.to_string() } else { artifact.artifact_id.short().to_string() };
        Self { id, name: artifact.name.clone(), namespace: artifact.namespace.clone(), version: artifact.version.clone() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFlags {
    pub all: bool,
    pub full_id: bool,
    pub buildtime: bool,
    pub json: bool,
}

fn options(all: bool) -> ResolveOptions {
    if all {
        ResolveOptions::all_artifacts()
    } else {
        ResolveOptions::default()
    }
}

fn kind(buildtime: bool) -> ClosureKind {
    if buildtime {
        ClosureKind::Buildtime
    } else {
        ClosureKind::Runtime
    }
}

/// Filas ordenadas por nombre (y por id a igualdad de nombre).
pub fn artifact_rows(plan: BuildPlan, platform_id: &str, flags: ListFlags) -> Result<Vec<ArtifactRow>, CliError> {
    let listing = ArtifactListing::new(plan, platform_id, options(flags.all));
    let mut rows: Vec<ArtifactRow> =
        listing.closure(kind(flags.buildtime))?.values().map(|a| ArtifactRow::new(a, flags.full_id)).collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(rows)
}

pub fn artifacts(plan: BuildPlan, platform_id: &str, flags: ListFlags) -> Result<String, CliError> {
    let rows = artifact_rows(plan, platform_id, flags)?;
    if flags.json {
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(SHORT_ID_LEN);
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    let mut out = String::new();
    let _ = writeln!(out, "{:<id_width$}  {:<name_width$}  VERSION  NAMESPACE", "ID", "NAME");
    for r in &rows {
        let _ = writeln!(out, "{:<id_width$}  {:<name_width$}  {}  {}", r.id, r.name, r.version, r.namespace);
    }
    Ok(out)
}

/// Busca un único artifact por prefijo de id en la clausura elegida.
fn unique_by_prefix<'a>(listing: &'a ArtifactListing,
                        prefix: &str,
                        kind: ClosureKind)
                        -> Result<&'a ResolvedArtifact, CliError> {
    let mut matches = listing.find_by_prefix(prefix, kind)?;
    match matches.len() {
        0 => Err(CliError::NotFound(prefix.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(CliError::Ambiguous { prefix: prefix.to_string(),
                                       matches: matches.iter()
                                                       .map(|a| format!("{} ({})", a.artifact_id, a.name))
                                                       .collect() }),
    }
}

/// Ruta local de una url `file://` o de una ruta sin esquema.
fn local_source(url: &str) -> Result<PathBuf, CliError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") || url.is_empty() {
        return Err(CliError::UnsupportedUrl(url.to_string()));
    }
    Ok(PathBuf::from(url))
}

/// Copia el artifact al directorio destino y devuelve la ruta escrita.
pub fn download(plan: BuildPlan, platform_id: &str, prefix: &str, target: &Path) -> Result<PathBuf, CliError> {
    let listing = ArtifactListing::new(plan, platform_id, ResolveOptions::all_artifacts());
    let artifact = unique_by_prefix(&listing, prefix, ClosureKind::Runtime)?;
    let source = local_source(&artifact.url)?;
    let file_name = source.file_name()
                          .map(|n| n.to_os_string())
                          .ok_or_else(|| CliError::UnsupportedUrl(artifact.url.clone()))?;
    fs::create_dir_all(target).map_err(|source| CliError::Write { path: target.to_path_buf(), source })?;
    let dest = target.join(file_name);
    fs::copy(&source, &dest).map_err(|e| CliError::Read { path: source.clone(), source: e })?;
    debug!("copied {} to {}", source.display(), dest.display());
    Ok(dest)
}

pub fn changes(old: BuildPlan, new: BuildPlan, platform_id: &str) -> Result<String, CliError> {
    let opts = ResolveOptions::default();
    let old_map = rt_core::runtime_closure(&old, platform_id, opts)?;
    let new_map = rt_core::runtime_closure(&new, platform_id, opts)?;
    let cs = Changeset::between(&to_named(&old_map), &to_named(&new_map));

    let mut out = String::new();
    if cs.is_empty() {
        out.push_str("no changes\n");
        return Ok(out);
    }
    for a in &cs.added {
        let _ = writeln!(out, "+ {}", a.name_with_version());
    }
    for a in &cs.removed {
        let _ = writeln!(out, "- {}", a.name_with_version());
    }
    for u in &cs.updated {
        let _ = writeln!(out, "~ {} {} → {}", u.to.name, u.from.version, u.to.version);
    }
    let _ = writeln!(out, "{} unchanged", cs.unchanged.len());
    if let Some(summary) = ChangeSummary::from_changeset(&cs, &new_map, &old_map) {
        let _ = write!(out, "\n{summary}");
    }
    Ok(out)
}

pub fn deps(plan: BuildPlan, platform_id: &str, prefix: &str) -> Result<String, CliError> {
    let listing = ArtifactListing::new(plan, platform_id, ResolveOptions::default());
    let artifact = unique_by_prefix(&listing, prefix, ClosureKind::Runtime)?;
    let map = listing.runtime_closure()?;
    let direct = direct_dependencies(&artifact.artifact_id, map);

    let mut lines: Vec<(String, bool)> = recursive_dependencies_for(&artifact.artifact_id, map)
        .iter()
        .filter_map(|id| map.get(id).map(|a| (a.name_with_version(), direct.contains(id))))
        .collect();
    lines.sort();

    let mut out = String::new();
    let _ = writeln!(out, "{} ({} dependencies)", artifact.name_with_version(), lines.len());
    for (name, is_direct) in lines {
        let _ = writeln!(out, "  {name}{}", if is_direct { "" } else { " (indirect)" });
    }
    Ok(out)
}
