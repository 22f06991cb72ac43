use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{KeyValueStore, StorageError};

/// File-backed storage: one file per key under `base_path`.
///
/// Key `cart:products` is stored as `<base_path>/cart%3Aproducts.json`.
/// Only `%` and `:` are escaped, so distinct keys always map to distinct
/// files.
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at `base_path`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the file holding `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is not safe to use as
    /// a filename.
    pub fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", escape_key(key))))
    }

    /// Rejects empty keys, path separators, `..`, and control characters.
    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
        }
        if key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(StorageError::InvalidKey(format!(
                "key contains path characters: {key:?}"
            )));
        }
        if key.chars().any(char::is_control) {
            return Err(StorageError::InvalidKey(format!(
                "key contains control characters: {key:?}"
            )));
        }
        Ok(())
    }
}

/// Percent-escape the characters that are not portable in filenames.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        tokio::fs::create_dir_all(&self.base_path).await?;

        let tmp_path = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> FileStore {
        FileStore::new(std::env::temp_dir().join(format!("pocket-cart-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_key_path_escapes_colons() {
        let store = FileStore::new("/data");
        assert_eq!(
            store.key_path("cart:products").unwrap(),
            PathBuf::from("/data/cart%3Aproducts.json")
        );
    }

    #[test]
    fn test_similar_keys_get_distinct_paths() {
        let store = FileStore::new("/data");
        let keys = ["a:b", "a_b", "a%3Ab", "a%b", "a%25b"];
        let paths: std::collections::HashSet<_> =
            keys.iter().map(|k| store.key_path(k).unwrap()).collect();
        assert_eq!(paths.len(), keys.len());
    }

    #[tokio::test]
    async fn test_colon_and_underscore_keys_do_not_collide() {
        let store = temp_store();
        store.set("a:b", "colon".to_string()).await.unwrap();
        store.set("a_b", "underscore".to_string()).await.unwrap();

        assert_eq!(store.get("a:b").await.unwrap().as_deref(), Some("colon"));
        assert_eq!(store.get("a_b").await.unwrap().as_deref(), Some("underscore"));

        tokio::fs::remove_dir_all(store.base_path()).await.unwrap();
    }

    #[test]
    fn test_rejects_unsafe_keys() {
        let store = FileStore::new("/data");
        for key in ["", "../etc/passwd", "a/b", "a\\b", "bad\nkey", "x..y"] {
            assert!(
                matches!(store.key_path(key), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let store = temp_store();
        assert_eq!(store.get("cart:products").await.unwrap(), None);

        store
            .set("cart:products", "[1,2,3]".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("cart:products").await.unwrap().as_deref(),
            Some("[1,2,3]")
        );
        assert!(!store.base_path().join("cart%3Aproducts.json.tmp").exists());

        store.remove("cart:products").await.unwrap();
        assert_eq!(store.get("cart:products").await.unwrap(), None);
        store.remove("cart:products").await.unwrap();

        tokio::fs::remove_dir_all(store.base_path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = temp_store();
        store.set("k", "first".to_string()).await.unwrap();
        store.set("k", "second".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
        tokio::fs::remove_dir_all(store.base_path()).await.unwrap();
    }
}
