//! `lotgate-catalog` — external collaborators at their interfaces.
//!
//! Supplier/warehouse/product master data and file storage are owned by other
//! systems; the receiving core only needs existence lookups and opaque
//! attachment references. CRUD for any of these is explicitly out of scope.

mod attachments;
mod directory;

pub use attachments::{AttachmentRef, AttachmentStore, InMemoryAttachmentStore};
pub use directory::{CatalogDirectory, InMemoryCatalog, ProductId, ProductRef, SupplierId, WarehouseId};
