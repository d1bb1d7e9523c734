//! Session-lifetime cache in front of a resource catalog
//!
//! Each entity list is fetched once per filter key and then served from
//! memory. Staleness is accepted for the life of the session; `invalidate`
//! drops everything.

use crate::error::Result;
use crate::types::SessionContext;
use crate::workflow::traits::ResourceCatalog;
use async_trait::async_trait;
use movement_types::*;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

type Cache<K, V> = RwLock<HashMap<K, Vec<V>>>;

pub struct CachedCatalog<C: ?Sized> {
    inner: Arc<C>,
    clients: Cache<(), Client>,
    quotes: Cache<Option<ClientId>, Quote>,
    business_units: Cache<(), BusinessUnit>,
    movement_types: Cache<BusinessUnitId, MovementType>,
    movement_subtypes: Cache<MovementTypeId, MovementSubtype>,
    employees: Cache<(), Employee>,
    equipment: Cache<(), Equipment>,
}

impl<C: ResourceCatalog + ?Sized> CachedCatalog<C> {
    pub fn new(inner: Arc<C>) -> Self {
        Self {
            inner,
            clients: RwLock::new(HashMap::new()),
            quotes: RwLock::new(HashMap::new()),
            business_units: RwLock::new(HashMap::new()),
            movement_types: RwLock::new(HashMap::new()),
            movement_subtypes: RwLock::new(HashMap::new()),
            employees: RwLock::new(HashMap::new()),
            equipment: RwLock::new(HashMap::new()),
        }
    }

    pub async fn invalidate(&self) {
        self.clients.write().await.clear();
        self.quotes.write().await.clear();
        self.business_units.write().await.clear();
        self.movement_types.write().await.clear();
        self.movement_subtypes.write().await.clear();
        self.employees.write().await.clear();
        self.equipment.write().await.clear();
        log::info!("Catalog cache cleared");
    }
}

async fn cached<K, V, F, Fut>(cache: &Cache<K, V>, entity: &str, key: K, load: F) -> Result<Vec<V>>
where
    K: Eq + Hash,
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<V>>>,
{
    if let Some(hit) = cache.read().await.get(&key) {
        log::debug!("Catalog cache hit for {}", entity);
        return Ok(hit.clone());
    }

    // Failed loads are not cached, so the next call retries
    let fresh = load().await?;
    log::debug!("Catalog cache filled for {} ({} entries)", entity, fresh.len());
    cache.write().await.insert(key, fresh.clone());
    Ok(fresh)
}

#[async_trait]
impl<C: ResourceCatalog + ?Sized> ResourceCatalog for CachedCatalog<C> {
    async fn clients(&self, ctx: &SessionContext) -> Result<Vec<Client>> {
        cached(&self.clients, "clients", (), || self.inner.clients(ctx)).await
    }

    async fn approved_quotes(&self, ctx: &SessionContext, client: Option<&ClientId>) -> Result<Vec<Quote>> {
        cached(&self.quotes, "approved quotes", client.cloned(), || {
            self.inner.approved_quotes(ctx, client)
        })
        .await
    }

    async fn business_units(&self, ctx: &SessionContext) -> Result<Vec<BusinessUnit>> {
        cached(&self.business_units, "business units", (), || self.inner.business_units(ctx)).await
    }

    async fn movement_types(&self, ctx: &SessionContext, business_unit: &BusinessUnitId) -> Result<Vec<MovementType>> {
        cached(&self.movement_types, "movement types", business_unit.clone(), || {
            self.inner.movement_types(ctx, business_unit)
        })
        .await
    }

    async fn movement_subtypes(&self, ctx: &SessionContext, movement_type: &MovementTypeId) -> Result<Vec<MovementSubtype>> {
        cached(&self.movement_subtypes, "movement subtypes", movement_type.clone(), || {
            self.inner.movement_subtypes(ctx, movement_type)
        })
        .await
    }

    async fn active_employees(&self, ctx: &SessionContext) -> Result<Vec<Employee>> {
        cached(&self.employees, "employees", (), || self.inner.active_employees(ctx)).await
    }

    async fn active_equipment(&self, ctx: &SessionContext) -> Result<Vec<Equipment>> {
        cached(&self.equipment, "equipment", (), || self.inner.active_equipment(ctx)).await
    }
}
