//! Hash helpers (blake3, hex).

use blake3::Hasher;

use super::to_canonical_json;
use crate::errors::ResolveError;
use crate::model::ArtifactMap;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

/// Huella estable de un `ArtifactMap`: blake3 sobre su JSON canónico. El
/// orden de las dependencias dentro de cada registro sí cuenta.
pub fn fingerprint(map: &ArtifactMap) -> Result<String, ResolveError> {
    let value = serde_json::to_value(map)?;
    Ok(hash_str(&to_canonical_json(&value)))
}
