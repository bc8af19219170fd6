// src/common/serde_utils.rs

use serde::{Deserialize, Deserializer};

/// Distingue "campo ausente" (`None`) de "campo enviado como null"
/// (`Some(None)`) em payloads de PATCH.
/// Usar junto com `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Aplica um campo de PATCH sobre o valor atual.
pub fn merge_patch<T>(current: Option<T>, requested: Option<Option<T>>) -> Option<T> {
    match requested {
        Some(value) => value,
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        port_id: Option<Option<Uuid>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.port_id, None);

        let null: Patch = serde_json::from_str(r#"{"port_id": null}"#).unwrap();
        assert_eq!(null.port_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"port_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.port_id, Some(Some(id)));
    }

    #[test]
    fn merge_keeps_clears_or_replaces() {
        assert_eq!(merge_patch(Some(1), None), Some(1));
        assert_eq!(merge_patch(Some(1), Some(None)), None);
        assert_eq!(merge_patch(Some(1), Some(Some(2))), Some(2));
        assert_eq!(merge_patch(None::<i32>, Some(Some(3))), Some(3));
    }
}
