//! Relationship browsing, cross-navigation, associations and nested data.

mod common;

use common::{cpu_type_path, fixture, ids, path};
use inventory_core::{
    DataEntityBlueprint, DataRole, Direction, EntityKind, EventPayload, InventoryError,
    MetricBlueprint, Order, Pager, RelativePath, Shape, StructuredData, WellKnown,
};
use inventory_engine::Filter;
use serde_json::json;

#[tokio::test]
async fn unknown_relationship_is_not_found() {
    let fx = fixture().await;
    let err = fx
        .acme
        .relationships()
        .get("nonexistent-id")
        .entity()
        .await
        .unwrap_err();

    match err {
        InventoryError::RelationNotFound {
            source_kind, id, ..
        } => {
            assert_eq!(source_kind, EntityKind::Tenant);
            assert_eq!(id, "nonexistent-id");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn non_id_filters_are_rejected_up_front() {
    let fx = fixture().await;
    let result = fx
        .acme
        .relationships()
        .get_all(vec![Filter::id("x"), Filter::of_type(EntityKind::Tenant)]);

    match result {
        Err(InventoryError::IllegalArgument(message)) => {
            assert!(message.contains("WithType(Tenant)"), "{message}");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("type filter accepted on relationships"),
    }
}

#[tokio::test]
async fn relationship_writes_are_unsupported() {
    let fx = fixture().await;
    let relationships = fx.acme.relationships();
    assert!(matches!(
        relationships.create("likes", &path("/t;acme/e;prod"), Default::default()),
        Err(InventoryError::Unsupported(_))
    ));
    assert!(matches!(
        relationships.delete("any"),
        Err(InventoryError::Unsupported(_))
    ));
}

#[tokio::test]
async fn lists_and_crosses_contains_edges() {
    let fx = fixture().await;
    let contains = fx
        .acme
        .relationships()
        .named(WellKnown::Contains.name())
        .get_all(Vec::new())
        .unwrap();

    let page = contains.entities(&Pager::unlimited()).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|r| r.label == "contains"));

    let envs = contains.environments().get_all().all().await.unwrap();
    assert_eq!(ids(envs), vec!["prod"]);

    let to_prod = page
        .items
        .iter()
        .find(|r| r.target.id() == "prod")
        .unwrap();
    let single = fx.acme.relationships().get(to_prod.id.clone());
    assert_eq!(single.entity().await.unwrap().source.id(), "acme");
    let prod = single
        .environments()
        .get("prod")
        .entity()
        .await
        .unwrap();
    assert_eq!(prod.path, path("/t;acme/e;prod"));
    assert!(single.resource_types().get_all().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn id_filters_pin_relationships() {
    let fx = fixture().await;
    let all = fx
        .acme
        .relationships()
        .get_all(Vec::new())
        .unwrap()
        .entities(&Pager::unlimited())
        .await
        .unwrap();
    let to_type = all
        .items
        .iter()
        .find(|r| r.target.kind() == EntityKind::ResourceType)
        .unwrap();

    let pinned = fx
        .acme
        .relationships()
        .get_all(vec![Filter::id(to_type.id.clone())])
        .unwrap();
    assert_eq!(pinned.count().await.unwrap(), 1);
    let types = pinned.resource_types().get_all().all().await.unwrap();
    assert_eq!(ids(types), vec!["host"]);
    assert!(pinned.environments().get_all().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn incoming_edges_reach_definers_and_parents() {
    let fx = fixture().await;
    let incoming = fx
        .host1
        .relationships_with(Direction::Incoming)
        .get_all(Vec::new())
        .unwrap()
        .entities(&Pager::unlimited())
        .await
        .unwrap();

    let mut labels: Vec<String> = incoming.items.iter().map(|r| r.label.clone()).collect();
    labels.sort();
    assert_eq!(labels, vec!["contains", "defines"]);
}

#[tokio::test]
async fn has_data_edges_are_never_listed() {
    let fx = fixture().await;
    let config = fx
        .host1
        .data()
        .create(&DataEntityBlueprint::new(
            DataRole::Configuration,
            json!({"x": 1}),
        ))
        .await
        .unwrap();

    let from_data = config
        .relationships()
        .get_all(Vec::new())
        .unwrap()
        .count()
        .await
        .unwrap();
    assert_eq!(from_data, 0);

    let named = config
        .relationships()
        .named(WellKnown::HasData.name())
        .get_all(Vec::new())
        .unwrap()
        .count()
        .await
        .unwrap();
    assert_eq!(named, 0);

    let from_host = fx
        .host1
        .relationships()
        .get_all(Vec::new())
        .unwrap()
        .entities(&Pager::unlimited())
        .await
        .unwrap();
    assert_eq!(from_host.total, 1);
    assert_eq!(from_host.items[0].target.kind(), EntityKind::DataEntity);
}

#[tokio::test]
async fn associate_and_disassociate_metrics() {
    let fx = fixture().await;
    let metric_path = path("/t;acme/e;prod/m;cpu-host1");
    fx.prod
        .metrics()
        .create(&MetricBlueprint::new("cpu-host1", cpu_type_path()))
        .await
        .unwrap();
    fx.sink.take();

    let owned = fx.host1.metrics();
    let relationship = owned.associate(&metric_path).await.unwrap();
    assert_eq!(relationship.label, WellKnown::Owns.name());
    assert_eq!(relationship.target.path(), &metric_path);
    assert_eq!(ids(owned.get_all().all().await.unwrap()), vec!["cpu-host1"]);
    assert!(matches!(
        fx.sink.take()[0].payload,
        EventPayload::RelationshipCreated { .. }
    ));

    let again = owned.associate(&metric_path).await.unwrap_err();
    assert!(matches!(again, InventoryError::RelationAlreadyExists { .. }));

    owned.disassociate(&metric_path).await.unwrap();
    assert!(owned.get_all().all().await.unwrap().is_empty());
    assert!(owned
        .disassociate(&metric_path)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn associate_rejects_metric_in_other_tenant() {
    let fx = fixture().await;
    let err = fx
        .host1
        .metrics()
        .associate(&path("/t;globex/e;prod/m;cpu"))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::IllegalArgument(_)));
}

#[tokio::test]
async fn deep_and_shallow_data_agree_on_shape() {
    let fx = fixture().await;
    let value = json!({
        "name": "db",
        "ports": [5432, 5433],
        "tls": {"enabled": true, "ciphers": ["a", "b"]}
    });
    let config = fx
        .host1
        .data()
        .create(&DataEntityBlueprint::new(DataRole::Configuration, value.clone()))
        .await
        .unwrap();

    let root = RelativePath::empty();
    let deep = config.data(&root).await.unwrap();
    assert_eq!(deep, StructuredData::from(value));

    let flat = config.flat_data(&root).await.unwrap();
    assert_eq!(flat, deep.shallow());

    let probes = [
        RelativePath::empty(),
        RelativePath::empty().key("ports"),
        RelativePath::empty().key("ports").index(1),
        RelativePath::empty().key("tls"),
        RelativePath::empty().key("tls").key("ciphers"),
        RelativePath::empty().key("name"),
    ];
    for probe in &probes {
        let deep = config.data(probe).await.unwrap();
        let flat = config.flat_data(probe).await.unwrap();
        assert_eq!(flat.top_level_shape(), deep.top_level_shape(), "{probe}");
    }

    let tls = config
        .flat_data(&RelativePath::empty().key("tls"))
        .await
        .unwrap();
    assert_eq!(tls, StructuredData::from(json!({"enabled": true, "ciphers": []})));
    assert_eq!(
        config
            .data(&RelativePath::empty().key("ports").index(0))
            .await
            .unwrap()
            .top_level_shape(),
        Shape::Integral
    );
}

#[tokio::test]
async fn missing_data_path_is_not_found() {
    let fx = fixture().await;
    let config = fx
        .host1
        .data()
        .create(&DataEntityBlueprint::new(DataRole::Configuration, json!({"a": 1})))
        .await
        .unwrap();

    let err = config
        .data(&RelativePath::empty().key("b"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InventoryError::EntityNotFound {
            kind: EntityKind::DataEntity,
            ..
        }
    ));

    let err = config
        .data(&RelativePath::empty().up())
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidPath(_)));
}

#[tokio::test]
async fn paged_data_skips_unresolved_entities() {
    let fx = fixture().await;
    let data = fx.host1.data();
    data.create(&DataEntityBlueprint::new(
        DataRole::Configuration,
        json!({"port": 1}),
    ))
    .await
    .unwrap();
    data.create(&DataEntityBlueprint::new(
        DataRole::ConnectionConfiguration,
        json!({"host": "x"}),
    ))
    .await
    .unwrap();

    let ports = data
        .get_all()
        .data(&RelativePath::empty().key("port"), &Pager::unlimited())
        .await
        .unwrap();
    assert_eq!(ports.items, vec![StructuredData::Integral(1)]);

    let roots = data
        .get_all()
        .flat_data(&RelativePath::empty(), &Pager::unlimited())
        .await
        .unwrap();
    assert_eq!(roots.total, 2);
}

#[tokio::test]
async fn named_scope_limits_cross_navigation() {
    let fx = fixture().await;
    let contains = fx
        .acme
        .relationships()
        .named(WellKnown::Contains.name())
        .get_all(Vec::new())
        .unwrap()
        .entities(&Pager::unlimited())
        .await
        .unwrap();
    let to_prod = contains
        .items
        .iter()
        .find(|r| r.target.id() == "prod")
        .unwrap()
        .id
        .clone();

    let defines = fx.acme.relationships().named(WellKnown::Defines.name());
    let pinned = defines.get_all(vec![Filter::id(to_prod.clone())]).unwrap();
    assert_eq!(pinned.count().await.unwrap(), 0);
    assert!(pinned.environments().get_all().all().await.unwrap().is_empty());

    let single = defines.get(to_prod.clone());
    assert!(!single.exists().await.unwrap());
    assert!(single.environments().get_all().all().await.unwrap().is_empty());

    let envs = fx
        .acme
        .relationships()
        .named(WellKnown::Contains.name())
        .get(to_prod)
        .environments()
        .get_all()
        .all()
        .await
        .unwrap();
    assert_eq!(ids(envs), vec!["prod"]);
}

#[tokio::test]
async fn paged_data_follows_the_requested_order() {
    let fx = fixture().await;
    let data = fx.host1.data();
    for (role, port) in [
        (DataRole::Configuration, 1),
        (DataRole::ConnectionConfiguration, 2),
        (DataRole::ConfigurationSchema, 3),
    ] {
        data.create(&DataEntityBlueprint::new(role, json!({ "port": port })))
            .await
            .unwrap();
    }
    let port = RelativePath::empty().key("port");

    let ascending = data
        .get_all()
        .data(&port, &Pager::unlimited().ordered_by(Order::asc("id")))
        .await
        .unwrap();
    assert_eq!(
        ascending.items,
        vec![
            StructuredData::Integral(1),
            StructuredData::Integral(3),
            StructuredData::Integral(2)
        ]
    );

    let descending = data
        .get_all()
        .data(&port, &Pager::new(0, 2).ordered_by(Order::desc("id")))
        .await
        .unwrap();
    assert_eq!(descending.total, 3);
    assert_eq!(
        descending.items,
        vec![StructuredData::Integral(2), StructuredData::Integral(3)]
    );
}
