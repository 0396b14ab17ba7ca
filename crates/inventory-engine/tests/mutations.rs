//! Create, update and delete through the mutation template.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{fixture, path};
use inventory_core::{
    Action, DataEntity, DataEntityBlueprint, DataEntityUpdate, DataRole, EntityKind, EntityUpdate,
    EnvironmentBlueprint, EventPayload, FeedBlueprint, InventoryEntity, InventoryError,
    Properties, RelativePath, ResourceBlueprint, StructuredData,
};
use inventory_engine::{Backend, Filter, FilterPath};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;

#[tokio::test]
async fn second_data_entity_with_same_role_collides() {
    let fx = fixture().await;
    let data = fx.host1.data();

    data.create(&DataEntityBlueprint::new(
        DataRole::Configuration,
        json!({"port": 8080}),
    ))
    .await
    .unwrap();
    let err = data
        .create(&DataEntityBlueprint::new(DataRole::Configuration, json!(1)))
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        InventoryError::EntityAlreadyExists {
            kind: EntityKind::DataEntity,
            ..
        }
    ));
    assert_eq!(data.get_all().count().await.unwrap(), 1);

    let stored: DataEntity = data.get("configuration").entity().await.unwrap();
    assert_eq!(stored.value, StructuredData::from(json!({"port": 8080})));
}

#[tokio::test]
async fn duplicate_ids_collide_within_scope_only() {
    let fx = fixture().await;
    let err = fx
        .acme
        .environments()
        .create(&EnvironmentBlueprint::new("prod"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, InventoryError::EntityAlreadyExists { .. }));

    // Same id, different parent.
    let feed = fx
        .prod
        .feeds()
        .create(&FeedBlueprint::new("agent"))
        .await
        .unwrap();
    feed.resources()
        .create(&ResourceBlueprint::new("host1", common::host_type_path()))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creates_of_one_id_yield_one_winner() {
    let fx = fixture().await;
    let first = fx.acme.environments();
    let second = fx.acme.environments();
    let blueprint = EnvironmentBlueprint::new("staging");

    let (a, b) = tokio::join!(first.create(&blueprint), second.create(&blueprint));
    let outcomes = [a.map(|_| ()), b.map(|_| ())];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(InventoryError::EntityAlreadyExists {
            kind: EntityKind::Environment,
            ..
        })
    )));
    let staging = fx
        .acme
        .environments()
        .get_all_where(vec![vec![Filter::id("staging")]])
        .count()
        .await
        .unwrap();
    assert_eq!(staging, 1);
}

#[tokio::test]
async fn containment_rules_are_enforced() {
    let fx = fixture().await;
    let bad = fx
        .prod
        .resources()
        .create(&ResourceBlueprint::new("x", path("/t;acme/e;prod")))
        .await
        .err()
        .unwrap();
    assert!(matches!(bad, InventoryError::IllegalArgument(_)));

    let missing_type = fx
        .prod
        .resources()
        .create(&ResourceBlueprint::new("x", path("/t;acme/rt;nope")))
        .await
        .err()
        .unwrap();
    assert!(matches!(missing_type, InventoryError::EntityNotFound { .. }));
    assert!(!fx.prod.resources().get("x").exists().await.unwrap());
}

#[tokio::test]
async fn create_under_missing_parent_fails() {
    let fx = fixture().await;
    let err = fx
        .inventory
        .tenants()
        .get("nobody")
        .environments()
        .create(&EnvironmentBlueprint::new("prod"))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        InventoryError::EntityNotFound {
            kind: EntityKind::Tenant,
            ..
        }
    ));
}

#[tokio::test]
async fn delete_cascades_through_data() {
    let fx = fixture().await;
    fx.host1
        .data()
        .create(&DataEntityBlueprint::new(
            DataRole::Configuration,
            json!({"a": {"b": [1, 2]}}),
        ))
        .await
        .unwrap();
    let backend = fx.inventory.backend();
    assert_eq!(backend.data_node_count().await, 5);
    let entities_before = backend.entity_count().await;
    fx.sink.take();

    fx.prod.resources().delete("host1").await.unwrap();

    assert_eq!(backend.data_node_count().await, 0);
    assert_eq!(backend.entity_count().await, entities_before - 2);
    assert!(!fx.host1.exists().await.unwrap());

    let deleted: Vec<EntityKind> = fx
        .sink
        .take()
        .into_iter()
        .map(|event| match event.payload {
            EventPayload::EntityDeleted { entity } => entity.kind(),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(deleted, vec![EntityKind::DataEntity, EntityKind::Resource]);
}

struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn deleting_data_without_structure_warns_and_completes() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let fx = fixture().await;
    let backend = fx.inventory.backend();
    let host_path = path("/t;acme/e;prod/r;host1");

    // A data entity attached without any structured data behind it.
    let host = backend.resolve(&FilterPath::to(&host_path)).await.unwrap()[0];
    let orphan = DataEntity {
        path: host_path.extend(EntityKind::DataEntity, "configuration").unwrap(),
        role: DataRole::Configuration,
        value: StructuredData::Undefined,
        properties: Properties::new(),
    };
    let node = backend.persist(&orphan.into_entity()).await.unwrap();
    backend
        .relate(&host, &node, "contains", &Properties::new())
        .await
        .unwrap();

    fx.inventory.delete_at(&host_path).await.unwrap();

    assert_eq!(warnings.load(Ordering::SeqCst), 1);
    assert!(fx
        .inventory
        .entity_at(&host_path)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn delete_of_missing_entity_is_not_found() {
    let fx = fixture().await;
    let err = fx.prod.resources().delete("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_replaces_properties_and_publishes_old_and_new() {
    let fx = fixture().await;
    let mut properties = Properties::new();
    properties.insert("owner".into(), json!("ops"));

    fx.acme
        .environments()
        .update("prod", &EntityUpdate::properties(properties.clone()))
        .await
        .unwrap();

    let prod = fx.prod.entity().await.unwrap();
    assert_eq!(prod.properties, properties);

    let events = fx.sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), Action::Updated);
    match &events[0].payload {
        EventPayload::EntityUpdated { old, new } => {
            assert!(old.properties().is_empty());
            assert_eq!(new.properties(), &properties);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn data_update_swaps_the_tree() {
    let fx = fixture().await;
    let data = fx.host1.data();
    data.create(&DataEntityBlueprint::new(
        DataRole::Configuration,
        json!({"a": [1, 2, 3]}),
    ))
    .await
    .unwrap();

    data.update(
        "configuration",
        &DataEntityUpdate {
            value: json!({"b": true}).into(),
        },
    )
    .await
    .unwrap();

    let value = data
        .get("configuration")
        .data(&RelativePath::empty())
        .await
        .unwrap();
    assert_eq!(value, StructuredData::from(json!({"b": true})));
    assert_eq!(fx.inventory.backend().data_node_count().await, 2);
}

#[tokio::test]
async fn create_publishes_after_wiring() {
    let fx = fixture().await;
    fx.acme
        .environments()
        .create(&EnvironmentBlueprint::new("dev"))
        .await
        .unwrap();

    let events = fx.sink.take();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::EntityCreated { entity } => {
            assert_eq!(entity.path(), &path("/t;acme/e;dev"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}
