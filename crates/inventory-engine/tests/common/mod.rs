//! Shared fixture: tenant `acme` with environment `prod`, resource type `host`,
//! metric type `cpu` and resource `host1`.

#![allow(dead_code)]

use std::sync::Arc;

use inventory_core::{
    CanonicalPath, EnvironmentBlueprint, MetricTypeBlueprint, ResourceBlueprint,
    ResourceTypeBlueprint, TenantBlueprint,
};
use inventory_engine::{
    CollectingSink, Environments, Inventory, MemoryBackend, ResourceTypes, Resources, Single,
    Tenants,
};

pub type Mem = MemoryBackend;

pub struct Fixture {
    pub inventory: Inventory<Mem>,
    pub sink: Arc<CollectingSink>,
    pub acme: Single<Mem, Tenants>,
    pub prod: Single<Mem, Environments>,
    pub host_type: Single<Mem, ResourceTypes>,
    pub host1: Single<Mem, Resources>,
}

pub fn path(raw: &str) -> CanonicalPath {
    raw.parse().unwrap()
}

pub fn host_type_path() -> CanonicalPath {
    path("/t;acme/rt;host")
}

pub fn cpu_type_path() -> CanonicalPath {
    path("/t;acme/mt;cpu")
}

pub async fn fixture() -> Fixture {
    let sink = Arc::new(CollectingSink::new());
    let inventory = Inventory::new(MemoryBackend::new()).with_sink(sink.clone());

    let acme = inventory
        .tenants()
        .create(&TenantBlueprint::new("acme"))
        .await
        .unwrap();
    let prod = acme
        .environments()
        .create(&EnvironmentBlueprint::new("prod"))
        .await
        .unwrap();
    let host_type = acme
        .resource_types()
        .create(&ResourceTypeBlueprint::new("host").with_version("1.0"))
        .await
        .unwrap();
    acme.metric_types()
        .create(&MetricTypeBlueprint::new("cpu", "percent"))
        .await
        .unwrap();
    let host1 = prod
        .resources()
        .create(&ResourceBlueprint::new("host1", host_type_path()))
        .await
        .unwrap();

    sink.take();
    Fixture {
        inventory,
        sink,
        acme,
        prod,
        host_type,
        host1,
    }
}

pub fn ids<I, E>(entities: I) -> Vec<String>
where
    I: IntoIterator<Item = E>,
    E: inventory_core::InventoryEntity,
{
    entities.into_iter().map(|e| e.id().to_string()).collect()
}
