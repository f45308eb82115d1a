//! In-memory registry, loaded once from a JSON document.

use super::{ClientRecord, ClientRegistry, RegistryError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Read-only registry held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    records: HashMap<String, ClientRecord>,
}

impl InMemoryClientRegistry {
    /// Build from records.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Malformed`] if two records share an identifier
    /// or a record has an empty identifier.
    pub fn new(records: impl IntoIterator<Item = ClientRecord>) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();
        for record in records {
            if record.client_id.is_empty() {
                return Err(RegistryError::Malformed("empty clientId".to_string()));
            }
            if map.contains_key(&record.client_id) {
                return Err(RegistryError::Malformed(format!(
                    "duplicate clientId {}",
                    record.client_id
                )));
            }
            map.insert(record.client_id.clone(), record);
        }
        Ok(Self { records: map })
    }

    /// Parse a JSON array of client records.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Malformed`] on invalid JSON or duplicate ids.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let records: Vec<ClientRecord> =
            serde_json::from_str(json).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        Self::new(records)
    }

    /// Load a JSON array of client records from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unavailable`] if the file cannot be read and
    /// [`RegistryError::Malformed`] if it cannot be parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>, RegistryError> {
        Ok(self.records.get(client_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClientStatus;

    #[tokio::test]
    async fn test_exact_match_lookup() {
        let registry = InMemoryClientRegistry::new([
            ClientRecord::new("acme", "s3cr3t", ["read", "write"]),
            ClientRecord::new("beta", "pw", ["read"]).with_status(ClientStatus::Disabled),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("acme").await.unwrap().is_some());
        assert!(registry.lookup("ACME").await.unwrap().is_none());
        assert!(registry.lookup("acme ").await.unwrap().is_none());
        assert!(registry.lookup("").await.unwrap().is_none());
        assert!(!registry.lookup("beta").await.unwrap().unwrap().is_active());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = InMemoryClientRegistry::new([
            ClientRecord::new("acme", "a", ["read"]),
            ClientRecord::new("acme", "b", ["write"]),
        ]);
        assert!(matches!(result, Err(RegistryError::Malformed(_))));
    }

    #[test]
    fn test_from_json() {
        let hash = ClientRecord::hash_secret("s3cr3t");
        let json = format!(
            r#"[{{"clientId":"acme","clientSecretHash":"{hash}","allowedScopes":["read","write"]}}]"#
        );
        let registry = InMemoryClientRegistry::from_json_str(&json).unwrap();
        assert_eq!(registry.len(), 1);

        assert!(InMemoryClientRegistry::from_json_str("{").is_err());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let result = InMemoryClientRegistry::from_json_file("/nonexistent/clients.json");
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
    }
}
