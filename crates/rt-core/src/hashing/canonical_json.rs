//! Texto JSON canónico para la huella de un `ArtifactMap`.
//!
//! `ArtifactMap` es un `HashMap`: `serde_json` lo serializa en el orden de
//! iteración, que cambia entre procesos. Para que dos resoluciones iguales
//! den la misma huella, las claves de cada objeto se emiten ordenadas y sin
//! espacios. Los arrays (p. ej. `dependencies`) conservan su orden.

use serde_json::Value;

pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::String(s) => write_string(s, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) { out.push_str(&Value::String(s.to_owned()).to_string()) }
