use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use lotgate_core::{AggregateId, TenantId};

/// Supplier identifier (tenant-scoped).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Warehouse identifier (tenant-scoped).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(pub AggregateId);

impl WarehouseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Product identifier (tenant-scoped).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Minimal product view the receiving flow needs for display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub barcode: String,
}

/// Read-only lookup into the supplier/warehouse/product masters.
///
/// Used by the boundary to validate references before any write is attempted;
/// a request naming an unknown supplier never reaches the aggregate.
pub trait CatalogDirectory: Send + Sync {
    fn supplier_exists(&self, tenant_id: TenantId, supplier_id: SupplierId) -> bool;
    fn warehouse_exists(&self, tenant_id: TenantId, warehouse_id: WarehouseId) -> bool;
    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<ProductRef>;
}

impl<D> CatalogDirectory for Arc<D>
where
    D: CatalogDirectory + ?Sized,
{
    fn supplier_exists(&self, tenant_id: TenantId, supplier_id: SupplierId) -> bool {
        (**self).supplier_exists(tenant_id, supplier_id)
    }

    fn warehouse_exists(&self, tenant_id: TenantId, warehouse_id: WarehouseId) -> bool {
        (**self).warehouse_exists(tenant_id, warehouse_id)
    }

    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<ProductRef> {
        (**self).product(tenant_id, product_id)
    }
}

/// In-memory directory for dev/test; seeded explicitly.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    suppliers: RwLock<HashSet<(TenantId, SupplierId)>>,
    warehouses: RwLock<HashSet<(TenantId, WarehouseId)>>,
    products: RwLock<Vec<(TenantId, ProductRef)>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) {
        if let Ok(mut suppliers) = self.suppliers.write() {
            suppliers.insert((tenant_id, supplier_id));
        }
    }

    pub fn add_warehouse(&self, tenant_id: TenantId, warehouse_id: WarehouseId) {
        if let Ok(mut warehouses) = self.warehouses.write() {
            warehouses.insert((tenant_id, warehouse_id));
        }
    }

    pub fn add_product(&self, tenant_id: TenantId, product: ProductRef) {
        if let Ok(mut products) = self.products.write() {
            products.push((tenant_id, product));
        }
    }
}

impl CatalogDirectory for InMemoryCatalog {
    fn supplier_exists(&self, tenant_id: TenantId, supplier_id: SupplierId) -> bool {
        self.suppliers
            .read()
            .map(|s| s.contains(&(tenant_id, supplier_id)))
            .unwrap_or(false)
    }

    fn warehouse_exists(&self, tenant_id: TenantId, warehouse_id: WarehouseId) -> bool {
        self.warehouses
            .read()
            .map(|w| w.contains(&(tenant_id, warehouse_id)))
            .unwrap_or(false)
    }

    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<ProductRef> {
        let products = self.products.read().ok()?;
        products
            .iter()
            .find(|(t, p)| *t == tenant_id && p.id == product_id)
            .map(|(_, p)| p.clone())
    }
}
