use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use lotgate_core::TenantId;

/// Opaque reference to a stored file (inspection photo, report, ...).
///
/// The receiving core never interprets the contents; it only carries the
/// reference on QC records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum AttachmentStoreError {
    #[error("attachment storage unavailable: {0}")]
    Unavailable(String),
}

/// File-attachment storage: bytes in, opaque reference out.
pub trait AttachmentStore: Send + Sync {
    fn store(
        &self,
        tenant_id: TenantId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<AttachmentRef, AttachmentStoreError>;
}

/// In-memory attachment store for dev/test.
#[derive(Debug, Default)]
pub struct InMemoryAttachmentStore {
    files: RwLock<HashMap<(TenantId, AttachmentRef), Vec<u8>>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: TenantId, reference: &AttachmentRef) -> Option<Vec<u8>> {
        let files = self.files.read().ok()?;
        files.get(&(tenant_id, reference.clone())).cloned()
    }
}

impl AttachmentStore for InMemoryAttachmentStore {
    fn store(
        &self,
        tenant_id: TenantId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<AttachmentRef, AttachmentStoreError> {
        let reference = AttachmentRef::new(format!("mem://{}/{}", Uuid::now_v7(), filename));
        let mut files = self
            .files
            .write()
            .map_err(|_| AttachmentStoreError::Unavailable("lock poisoned".to_string()))?;
        files.insert((tenant_id, reference.clone()), bytes);
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_bytes_come_back_under_the_returned_ref() {
        let store = InMemoryAttachmentStore::new();
        let tenant = TenantId::new();

        let reference = store.store(tenant, "report.pdf", vec![1, 2, 3]).unwrap();
        assert_eq!(store.get(tenant, &reference), Some(vec![1, 2, 3]));
    }
}
