use std::fmt;

use serde::{Deserialize, Serialize};

/// Identificador opaco de un nodo del plan. Artifacts, steps y sources
/// comparten el mismo espacio de identificadores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Forma corta (primeros 8 caracteres) usada en listados.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { Self(s) }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str { &self.0 }
}
