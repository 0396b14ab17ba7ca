//! Traversal and fetching against the in-memory backend.

mod common;

use common::{fixture, host_type_path, ids, path};
use inventory_core::{
    EnvironmentBlueprint, InventoryEntity, InventoryError, Order, Pager, ResourceBlueprint,
    TenantBlueprint,
};
use inventory_engine::{Filter, Inventory, MemoryBackend, Resources};
use serde_json::json;

#[tokio::test]
async fn walks_from_tenant_to_resources() {
    let fx = fixture().await;

    let found = fx
        .inventory
        .tenants()
        .get("acme")
        .environments()
        .get("prod")
        .resources()
        .get_all()
        .all()
        .await
        .unwrap();

    assert_eq!(ids(found), vec!["host1"]);
}

#[tokio::test]
async fn entity_is_missing_until_created() {
    let inventory = Inventory::new(MemoryBackend::new());
    let acme = inventory
        .tenants()
        .create(&TenantBlueprint::new("acme"))
        .await
        .unwrap();

    let lookup = acme.environments().get("prod");
    let err = lookup.entity().await.unwrap_err();
    assert!(matches!(err, InventoryError::EntityNotFound { .. }));
    assert!(!lookup.exists().await.unwrap());

    acme.environments()
        .create(&EnvironmentBlueprint::new("prod"))
        .await
        .unwrap();

    let prod = lookup.entity().await.unwrap();
    let tenant = acme.entity().await.unwrap();
    assert!(prod.path.is_child_of(&tenant.path));
    assert_eq!(prod.path.to_string(), "/t;acme/e;prod");
}

#[tokio::test]
async fn created_view_points_at_new_entity() {
    let fx = fixture().await;
    let resource = fx.host1.entity().await.unwrap();
    assert_eq!(resource.path, path("/t;acme/e;prod/r;host1"));
    assert_eq!(resource.resource_type, host_type_path());
}

#[tokio::test]
async fn multiple_is_empty_not_an_error() {
    let fx = fixture().await;
    let feeds = fx.prod.feeds().get_all();
    assert_eq!(feeds.count().await.unwrap(), 0);
    assert!(feeds.entities(&Pager::unlimited()).await.unwrap().is_empty());
}

#[tokio::test]
async fn where_all_is_union_without_duplicates() {
    let inventory = Inventory::new(MemoryBackend::new());
    for id in ["a", "b", "c"] {
        inventory
            .tenants()
            .create(&TenantBlueprint::new(id))
            .await
            .unwrap();
    }
    let tenants = inventory.tenants();

    let first = tenants
        .get_all_where(vec![vec![Filter::id("a")]])
        .all()
        .await
        .unwrap();
    let second = tenants
        .get_all_where(vec![vec![Filter::ids(["a", "b"])]])
        .all()
        .await
        .unwrap();
    let both = tenants
        .get_all_where(vec![vec![Filter::id("a")], vec![Filter::ids(["a", "b"])]])
        .all()
        .await
        .unwrap();

    assert_eq!(ids(first), vec!["a"]);
    assert_eq!(ids(second), vec!["a", "b"]);
    assert_eq!(ids(both), vec!["a", "b"]);
}

#[tokio::test]
async fn property_filter_narrows_position() {
    let fx = fixture().await;
    fx.prod
        .resources()
        .create(
            &ResourceBlueprint::new("db1", host_type_path()).with_property("zone", json!("eu")),
        )
        .await
        .unwrap();

    let eu = fx
        .prod
        .resources()
        .get_all_where(vec![vec![Filter::property("zone", json!("eu"))]])
        .all()
        .await
        .unwrap();
    assert_eq!(ids(eu), vec!["db1"]);
}

#[tokio::test]
async fn pages_are_sliced_after_ordering() {
    let fx = fixture().await;
    for (id, rank) in [("r1", 3), ("r2", 1), ("r3", 5), ("r4", 2)] {
        fx.prod
            .resources()
            .create(&ResourceBlueprint::new(id, host_type_path()).with_property("rank", json!(rank)))
            .await
            .unwrap();
    }

    let ranked = fx
        .prod
        .resources()
        .get_all_where(vec![vec![Filter::ids(["r1", "r2", "r3", "r4"])]]);
    let page = ranked
        .entities(&Pager::new(1, 2).ordered_by(Order::desc("rank")))
        .await
        .unwrap();

    assert_eq!(page.total, 4);
    assert!(page.has_more());
    assert_eq!(ids(page.items), vec!["r1", "r4"]);
}

#[tokio::test]
async fn default_page_limit_applies_to_unlimited_requests() {
    let inventory = Inventory::new(MemoryBackend::new()).with_page_limit(Some(2));
    for id in ["a", "b", "c"] {
        inventory
            .tenants()
            .create(&TenantBlueprint::new(id))
            .await
            .unwrap();
    }
    let all = inventory.tenants().get_all();
    let page = all.entities(&Pager::unlimited()).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.total, 3);
    assert_eq!(all.all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn multiple_views_navigate_read_only() {
    let fx = fixture().await;
    fx.inventory
        .tenants()
        .create(&TenantBlueprint::new("globex"))
        .await
        .unwrap();

    let envs = fx
        .inventory
        .tenants()
        .get_all()
        .environments()
        .get_all()
        .all()
        .await
        .unwrap();
    assert_eq!(ids(envs), vec!["prod"]);
}

#[tokio::test]
async fn type_navigation_follows_defines() {
    let fx = fixture().await;

    let defined = fx.host_type.resources().get_all().all().await.unwrap();
    assert_eq!(ids(defined), vec!["host1"]);

    let host_type = fx.host1.resource_type().entity().await.unwrap();
    assert_eq!(host_type.path, host_type_path());
    assert_eq!(host_type.version.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn single_rejects_ambiguous_matches() {
    let fx = fixture().await;
    let dev = fx
        .acme
        .environments()
        .create(&EnvironmentBlueprint::new("dev"))
        .await
        .unwrap();
    dev.resources()
        .create(&ResourceBlueprint::new("host1", host_type_path()))
        .await
        .unwrap();

    let err = fx
        .host_type
        .resources()
        .get("host1")
        .entity()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InventoryError::AmbiguousResult { count: 2, .. }
    ));
}

#[tokio::test]
async fn inspect_checks_kind() {
    let fx = fixture().await;
    let host = fx
        .inventory
        .inspect::<Resources>(&path("/t;acme/e;prod/r;host1"))
        .unwrap();
    assert_eq!(host.entity().await.unwrap().id(), "host1");

    let err = fx
        .inventory
        .inspect::<Resources>(&path("/t;acme/e;prod"))
        .err()
        .unwrap();
    assert!(matches!(err, InventoryError::IllegalArgument(_)));
}

#[tokio::test]
async fn kind_erased_lookups() {
    let fx = fixture().await;

    let entity = fx
        .inventory
        .entity_at(&path("/t;acme/e;prod"))
        .await
        .unwrap();
    assert_eq!(entity.id(), "prod");

    let children = fx
        .inventory
        .children_of(&path("/t;acme"))
        .await
        .unwrap();
    let mut names: Vec<String> = children.iter().map(|e| e.path().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["/t;acme/e;prod", "/t;acme/mt;cpu", "/t;acme/rt;host"]);

    assert!(fx
        .inventory
        .entity_at(&path("/t;acme/e;staging"))
        .await
        .unwrap_err()
        .is_not_found());
}
