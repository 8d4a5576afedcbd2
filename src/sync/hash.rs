//! External identifiers
//!
//! Natural keys (JIDs, message ids) never leave the store; consumers see a
//! SHA-256 of `session_id + id` instead.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Field name the external identifier is stored under.
pub const API_ID_FIELD: &str = "apiId";

/// Deterministic, session-scoped external id for an entity.
pub fn api_id(session_id: &str, id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stamp `apiId` onto a normalized record that carries a non-empty `id`.
/// Records without one are left untouched.
pub fn assign_api_id(session_id: &str, record: &mut Map<String, Value>) {
    let id = match record.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return,
    };
    record.insert(API_ID_FIELD.to_string(), Value::String(api_id(session_id, &id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_id_is_stable() {
        let a = api_id("S1", "a@s.whatsapp.net");
        let b = api_id("S1", "a@s.whatsapp.net");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_api_id_is_session_scoped() {
        assert_ne!(api_id("S1", "m1"), api_id("S2", "m1"));
        assert_ne!(api_id("S1", "m1"), api_id("S1", "m2"));
    }

    #[test]
    fn test_api_id_known_vector() {
        // sha256("abc")
        assert_eq!(
            api_id("a", "bc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_assign_skips_records_without_id() {
        let mut record = json!({"name": "x"}).as_object().cloned().unwrap();
        assign_api_id("S1", &mut record);
        assert!(!record.contains_key(API_ID_FIELD));

        let mut empty = json!({"id": ""}).as_object().cloned().unwrap();
        assign_api_id("S1", &mut empty);
        assert!(!empty.contains_key(API_ID_FIELD));

        let mut chat = json!({"id": "a@s.whatsapp.net"}).as_object().cloned().unwrap();
        assign_api_id("S1", &mut chat);
        assert_eq!(chat[API_ID_FIELD], json!(api_id("S1", "a@s.whatsapp.net")));
    }
}
