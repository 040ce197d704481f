//! Mapping files (`{"<key>": ["<filename>", ...]}`) and their inversion.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

/// filename -> key, built from a mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    entries: HashMap<String, String>,
}

impl Lookup {
    /// Inverts a key -> filenames document.
    ///
    /// Keys are visited in document order and filenames in array order, so
    /// when several keys claim the same filename the last key in the
    /// document wins. Values that are not arrays, and array items that are
    /// not strings, are skipped.
    pub fn invert(document: &Map<String, Value>) -> Self {
        let mut entries = HashMap::new();
        for (key, files) in document {
            let Some(files) = files.as_array() else {
                warn!(key = %key, "mapping value is not an array, skipping");
                continue;
            };
            for file in files.iter().filter_map(Value::as_str) {
                entries.insert(file.to_string(), key.clone());
            }
        }
        Self { entries }
    }

    pub fn get(&self, file: &str) -> Option<&str> {
        self.entries.get(file).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads a mapping file and inverts it. Absent, unreadable or malformed
/// files give an empty lookup.
pub async fn load_lookup(path: &Path) -> Lookup {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Lookup::default(),
        Err(err) => {
            warn!(file = %path.display(), "failed to read mapping file: {err}");
            return Lookup::default();
        }
    };

    match serde_json::from_slice::<Map<String, Value>>(&raw) {
        Ok(document) => Lookup::invert(&document),
        Err(err) => {
            warn!(file = %path.display(), "mapping file is not a JSON object: {err}");
            Lookup::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(raw: &str) -> Map<String, Value> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn inverts_key_to_files() {
        let lookup = Lookup::invert(&document(r#"{"jane": ["cat.png", "dog.svg"], "joe": ["owl.png"]}"#));
        assert_eq!(lookup.get("cat.png"), Some("jane"));
        assert_eq!(lookup.get("dog.svg"), Some("jane"));
        assert_eq!(lookup.get("owl.png"), Some("joe"));
        assert_eq!(lookup.get("fox.png"), None);
        assert_eq!(lookup.len(), 3);
    }

    #[test]
    fn last_key_in_document_order_wins() {
        let lookup = Lookup::invert(&document(r#"{"zed": ["cat.png"], "amy": ["cat.png"]}"#));
        assert_eq!(lookup.get("cat.png"), Some("amy"));

        let lookup = Lookup::invert(&document(r#"{"amy": ["cat.png"], "zed": ["cat.png"]}"#));
        assert_eq!(lookup.get("cat.png"), Some("zed"));
    }

    #[test]
    fn malformed_values_are_skipped() {
        let lookup = Lookup::invert(&document(r#"{"jane": "cat.png", "joe": ["owl.png", 3, null]}"#));
        assert_eq!(lookup.get("cat.png"), None);
        assert_eq!(lookup.get("owl.png"), Some("joe"));
        assert_eq!(lookup.len(), 1);
    }

    #[tokio::test]
    async fn absent_or_broken_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lookup(&dir.path().join("artists.json")).await.is_empty());

        let broken = dir.path().join("programs.json");
        std::fs::write(&broken, b"{not json").unwrap();
        assert!(load_lookup(&broken).await.is_empty());

        let wrong_shape = dir.path().join("list.json");
        std::fs::write(&wrong_shape, b"[\"cat.png\"]").unwrap();
        assert!(load_lookup(&wrong_shape).await.is_empty());
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artists.json");
        std::fs::write(&path, br#"{"jane": ["cat.png"]}"#).unwrap();
        assert_eq!(load_lookup(&path).await.get("cat.png"), Some("jane"));
    }
}
