use std::sync::Arc;

use lotgate_catalog::{InMemoryAttachmentStore, InMemoryCatalog};
use lotgate_core::{AggregateId, DomainError, TenantId};
use lotgate_events::{EventBus, EventEnvelope, InMemoryEventBus};
use lotgate_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{InMemoryEventStore, StoredEvent},
    projections::receiving::{OrdersProjection, PurchaseOrderReadModel},
    read_model::InMemoryTenantStore,
};
use lotgate_receiving::PurchaseOrderId;

type InMemoryDispatcher = CommandDispatcher<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
>;

type OrdersProj =
    OrdersProjection<Arc<InMemoryTenantStore<PurchaseOrderId, PurchaseOrderReadModel>>>;

/// Wiring shared by all handlers: dispatcher, read models, and the catalog
/// and attachment capabilities the receiving flow depends on.
pub struct AppServices {
    dispatcher: InMemoryDispatcher,
    orders_projection: Arc<OrdersProj>,
    pub catalog: Arc<InMemoryCatalog>,
    pub attachments: Arc<InMemoryAttachmentStore>,
}

pub fn build_services() -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());

    let orders_store: Arc<InMemoryTenantStore<PurchaseOrderId, PurchaseOrderReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let orders_projection = Arc::new(OrdersProjection::new(orders_store));

    // Background subscriber: bus -> projection.
    {
        let sub = bus.subscribe();
        let orders_projection = orders_projection.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(env) = sub.recv() {
                if env.aggregate_type() != "receiving.purchase_order" {
                    continue;
                }
                if let Err(e) = orders_projection.apply_envelope(&env) {
                    tracing::warn!("projection apply failed: {e}");
                }
            }
        });
    }

    AppServices {
        dispatcher: CommandDispatcher::new(store, bus),
        orders_projection,
        catalog: Arc::new(InMemoryCatalog::new()),
        attachments: Arc::new(InMemoryAttachmentStore::new()),
    }
}

impl AppServices {
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: lotgate_core::Aggregate<Error = DomainError>,
        A::Event: lotgate_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        self.dispatcher
            .dispatch::<A>(tenant_id, aggregate_id, aggregate_type, command, make_aggregate)
    }

    pub fn orders_get(
        &self,
        tenant_id: TenantId,
        order_id: &PurchaseOrderId,
    ) -> Option<PurchaseOrderReadModel> {
        self.orders_projection.get(tenant_id, order_id)
    }

    pub fn orders_list(&self, tenant_id: TenantId) -> Vec<PurchaseOrderReadModel> {
        self.orders_projection.list(tenant_id)
    }
}
