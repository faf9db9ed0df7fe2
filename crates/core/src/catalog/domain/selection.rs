use uuid::Uuid;

use crate::shared::constants::{BUILT_IN_MODEL_ID, BUILT_IN_MODEL_NAME};

/// Port over the persisted model choice.
///
/// Stores hold the raw persisted string; interpretation (including legacy
/// values) goes through [`normalize_selection`] so every caller applies
/// the same rules.
pub trait SelectionStore: Send {
    fn load(&self) -> Option<String>;
    fn save(&mut self, id: Uuid);
}

/// Interprets a persisted selection value as a model id.
///
/// Early releases stored the bundled model under its display name rather
/// than an id. That alias still resolves to the reserved id on read, but
/// is never written back; saves always store canonical ids.
pub fn normalize_selection(raw: Option<&str>) -> Option<Uuid> {
    match raw {
        None => None,
        Some(BUILT_IN_MODEL_NAME) => Some(BUILT_IN_MODEL_ID),
        Some(value) => Uuid::parse_str(value).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_selection_is_none() {
        assert_eq!(normalize_selection(None), None);
    }

    #[test]
    fn test_canonical_id_parses() {
        let id = Uuid::new_v4();
        assert_eq!(normalize_selection(Some(&id.to_string())), Some(id));
    }

    #[test]
    fn test_legacy_name_resolves_to_reserved_id() {
        assert_eq!(
            normalize_selection(Some("yolov4-tiny-coco")),
            Some(Uuid::nil())
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(normalize_selection(Some("not-a-uuid")), None);
        assert_eq!(normalize_selection(Some("")), None);
    }
}
