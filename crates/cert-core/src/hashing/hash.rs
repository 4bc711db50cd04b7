//! Hash helpers (blake3, hex).

use blake3::Hasher;
use serde_json::Value;

use super::canonical_json::to_canonical_json;
use crate::constants::CORE_VERSION;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

/// Hash estable de la configuración de un nodo (independiente del orden de
/// claves). Se compara contra el snapshot del último output para decidir si
/// una re-ejecución puede omitirse.
pub fn config_hash(config: &Value) -> String {
    hash_str(&format!("{CORE_VERSION}|{}", to_canonical_json(config)))
}
