//! Constantes del plan de build.
//!
//! Los tags de input y los mime types forman parte del contrato con el
//! solver remoto: un cambio aquí altera qué nodos se recorren y qué
//! artifacts se consideran instalables.

/// Prefijo de los tags de terminal que codifican una plataforma.
pub const PLATFORM_TAG_PREFIX: &str = "platform:";

/// Tag de terminal que agrupa nodos huérfanos (no asociados a plataforma).
pub const TAG_ORPHANS: &str = "orphans";

/// Inputs "source" de un step (ingredientes).
pub const TAG_SOURCE: &str = "src";
/// Inputs "dependency" de un step (dependencias de build).
pub const TAG_DEPENDENCY: &str = "deps";
/// Inputs del builder que ejecuta el step.
pub const TAG_BUILDER: &str = "builder";

/// Mime types de artifacts instalables directamente.
pub const INSTALLABLE_MIME_TYPES: &[&str] = &[
    "application/x.artifact",
    "application/x-activestate-artifacts",
    "application/x-camel-installer",
];

/// Profundidad máxima de recursión al recorrer el grafo. Un plan bien
/// formado nunca se acerca a este valor.
pub const MAX_TRAVERSAL_DEPTH: usize = 512;

/// Longitud de un UUID en forma textual (8-4-4-4-12).
pub const UUID_TEXT_LEN: usize = 36;

/// Devuelve true si el mime type corresponde a un artifact instalable.
pub fn is_installable_mime(mime_type: &str) -> bool {
    INSTALLABLE_MIME_TYPES.contains(&mime_type)
}
