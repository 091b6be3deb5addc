//! End-to-end table lifecycle against in-memory stores.

use std::collections::HashMap;

use arco_core::Operation;
use arco_nessie::prelude::*;
use arco_test_utils::{
    CatalogFixture, TEST_WAREHOUSE, assert_commit_count, attempted_operations, init_test_logging,
    sample_schema,
};

#[tokio::test]
async fn create_then_load_table() {
    init_test_logging();
    let fx = CatalogFixture::new();
    fx.namespace("db").await;

    let created = fx.table("db.orders").await;
    assert_eq!(created.identifier().to_string(), "db.orders@main");
    assert!(
        created
            .metadata_location()
            .starts_with(&format!("{TEST_WAREHOUSE}/db/orders_"))
    );
    assert!(created.metadata_location().contains("/metadata/00000-"));

    let loaded = fx.catalog.load_table("db.orders").await.expect("load");
    assert_eq!(loaded.metadata_location(), created.metadata_location());
    assert_eq!(loaded.metadata(), created.metadata());
    assert_eq!(loaded.branch().hash, fx.head("main"));
    assert!(fx.catalog.table_exists("db.orders").await.expect("exists"));
}

#[tokio::test]
async fn catalog_prefix_is_stripped() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;

    let loaded = fx.catalog.load_table("nessie.db.orders").await.expect("load");
    assert_eq!(loaded.identifier().table_path(), "db.orders");
}

#[tokio::test]
async fn create_table_requires_namespace() {
    let fx = CatalogFixture::new();
    let err = fx
        .catalog
        .create_table("missing.orders", TableCreation::new(sample_schema()))
        .await
        .expect_err("namespace missing");
    assert!(matches!(err, CatalogError::NoSuchNamespace { .. }));
    assert_commit_count(&fx.store, "main", 0);
}

#[tokio::test]
async fn create_table_with_explicit_location() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx
        .catalog
        .create_table(
            "db.events",
            TableCreation::new(sample_schema())
                .with_location("memory://elsewhere/events/")
                .with_property("owner", "data-eng"),
        )
        .await
        .expect("create");
    assert_eq!(table.metadata().location, "memory://elsewhere/events");
    assert!(
        table
            .metadata_location()
            .starts_with("memory://elsewhere/events/metadata/00000-")
    );
    assert_eq!(
        table.metadata().properties.get("owner").map(String::as_str),
        Some("data-eng")
    );
}

#[tokio::test]
async fn drop_then_load_is_not_found() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;

    fx.catalog.drop_table("db.orders").await.expect("drop");
    let err = fx.catalog.load_table("db.orders").await.expect_err("dropped");
    assert!(matches!(err, CatalogError::NoSuchTable { .. }));
    assert!(!fx.catalog.table_exists("db.orders").await.expect("exists"));

    let err = fx.catalog.drop_table("db.orders").await.expect_err("again");
    assert!(matches!(err, CatalogError::NoSuchTable { .. }));
}

#[tokio::test]
async fn commit_table_swaps_metadata_pointer() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;
    let before = fx.head("main");

    let response = fx
        .catalog
        .commit_table(table.new_commit_request().with_update(TableUpdate::SetProperties {
            updates: HashMap::from([("owner".to_string(), "ops".to_string())]),
        }))
        .await
        .expect("commit");

    assert_ne!(response.metadata_location, table.metadata_location());
    assert!(response.metadata_location.contains("/metadata/00001-"));
    assert_eq!(
        response.metadata.metadata_log.last().map(|e| e.metadata_file.as_str()),
        Some(table.metadata_location())
    );
    assert_ne!(fx.head("main"), before);

    let reloaded = fx.catalog.load_table("db.orders").await.expect("reload");
    assert_eq!(reloaded.metadata_location(), response.metadata_location);
    assert_eq!(
        reloaded.metadata().properties.get("owner").map(String::as_str),
        Some("ops")
    );
}

#[tokio::test]
async fn commit_table_without_updates_commits_nothing() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;
    let before = fx.head("main");

    let response = fx
        .catalog
        .commit_table(table.new_commit_request())
        .await
        .expect("no-op");
    assert_eq!(response.metadata_location, table.metadata_location());
    assert_eq!(fx.head("main"), before);
}

#[tokio::test]
async fn commit_table_adds_snapshot() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;

    let snapshot = Snapshot {
        snapshot_id: 42,
        parent_snapshot_id: None,
        sequence_number: 1,
        timestamp_ms: 1_700_000_000_000,
        manifest_list: format!("{}/metadata/snap-42.avro", table.metadata().location),
        summary: HashMap::from([("operation".to_string(), "append".to_string())]),
        schema_id: Some(0),
    };
    let request = table
        .new_commit_request()
        .with_requirement(UpdateRequirement::AssertRefSnapshotId {
            ref_name: "main".to_string(),
            snapshot_id: None,
        })
        .with_update(TableUpdate::AddSnapshot { snapshot })
        .with_update(TableUpdate::SetSnapshotRef {
            ref_name: "main".to_string(),
            ref_type: SnapshotRefType::Branch,
            snapshot_id: 42,
        });
    let response = fx.catalog.commit_table(request).await.expect("commit");
    assert_eq!(response.metadata.current_snapshot_id, Some(42));

    let reloaded = fx.catalog.load_table("db.orders").await.expect("reload");
    assert_eq!(
        reloaded.metadata().current_snapshot().map(|s| s.snapshot_id),
        Some(42)
    );
}

#[tokio::test]
async fn commit_table_requirement_mismatch_conflicts() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;
    let before = fx.head("main");

    let err = fx
        .catalog
        .commit_table(
            table
                .new_commit_request()
                .with_requirement(UpdateRequirement::AssertCurrentSchemaId {
                    current_schema_id: 7,
                })
                .with_update(TableUpdate::RemoveProperties {
                    removals: vec!["owner".to_string()],
                }),
        )
        .await
        .expect_err("requirement");
    assert!(matches!(err, CatalogError::CommitConflict { .. }));
    assert_eq!(fx.head("main"), before);
}

#[tokio::test]
async fn rename_moves_table_in_one_commit() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.namespace("archive").await;
    let original = fx.table("db.orders").await;
    fx.store.clear_operations();

    let renamed = fx
        .catalog
        .rename_table("db.orders", "archive.orders_2024")
        .await
        .expect("rename");
    assert_eq!(renamed.identifier().to_string(), "archive.orders_2024@main");
    assert_eq!(renamed.metadata_location(), original.metadata_location());

    assert!(!fx.catalog.table_exists("db.orders").await.expect("exists"));
    assert!(
        fx.catalog
            .table_exists("archive.orders_2024")
            .await
            .expect("exists")
    );

    let commits = attempted_operations(&fx.store);
    assert_eq!(commits.len(), 1);
    assert!(matches!(commits[0][0], Operation::Delete { .. }));
    assert!(matches!(commits[0][1], Operation::Put { .. }));
}

#[tokio::test]
async fn rename_to_occupied_key_fails() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;
    fx.table("db.customers").await;
    let before = fx.head("main");

    let err = fx
        .catalog
        .rename_table("db.orders", "db.customers")
        .await
        .expect_err("occupied");
    assert!(matches!(err, CatalogError::TableAlreadyExists { .. }));
    assert_eq!(fx.head("main"), before);
}

#[tokio::test]
async fn rename_across_branches_is_rejected() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;
    fx.branch("dev", "main").await;

    let err = fx
        .catalog
        .rename_table("db.orders@main", "db.orders2@dev")
        .await
        .expect_err("cross-branch");
    assert!(matches!(err, CatalogError::InvalidArgument { .. }));
}

#[tokio::test]
async fn register_existing_metadata_file() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;

    let registered = fx
        .catalog
        .register_table("db.orders_copy", table.metadata_location())
        .await
        .expect("register");
    assert_eq!(registered.metadata_location(), table.metadata_location());
    assert_eq!(registered.metadata().table_uuid, table.metadata().table_uuid);

    let err = fx
        .catalog
        .register_table("db.ghost", "memory://warehouse/none.metadata.json")
        .await
        .expect_err("missing file");
    assert!(matches!(err, CatalogError::InvalidArgument { .. }));
}

#[tokio::test]
async fn branches_are_isolated() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.branch("dev", "main").await;

    let table = fx.table("db.orders@dev").await;
    assert_eq!(table.identifier().to_string(), "db.orders@dev");

    assert!(fx.catalog.table_exists("db.orders@dev").await.expect("dev"));
    assert!(!fx.catalog.table_exists("db.orders").await.expect("main"));
    assert!(!fx.catalog.table_exists("db.orders@main").await.expect("main"));
}

#[tokio::test]
async fn trailing_at_selects_default_branch() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;

    let table = fx.catalog.load_table("db.orders@").await.expect("load");
    assert_eq!(table.branch().name, "main");
}

#[tokio::test]
async fn unknown_branch_is_reported() {
    let fx = CatalogFixture::new();
    let err = fx
        .catalog
        .load_table("db.orders@nope")
        .await
        .expect_err("branch");
    assert!(matches!(err, CatalogError::NoSuchBranch { .. }));
}

#[tokio::test]
async fn configured_reference_is_the_default() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.branch("etl", "main").await;

    let etl = arco_nessie::NessieCatalog::new(
        arco_test_utils::default_config().with_reference("etl"),
        fx.store.clone(),
        fx.metadata.clone(),
    )
    .expect("catalog");
    etl.create_table("db.staging", TableCreation::new(sample_schema()))
        .await
        .expect("create on etl");

    assert!(fx.catalog.table_exists("db.staging@etl").await.expect("etl"));
    assert!(!fx.catalog.table_exists("db.staging").await.expect("main"));
}

#[tokio::test]
async fn commits_carry_author_and_message() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    fx.table("db.orders").await;

    let log = fx.store.commit_log("main");
    assert_eq!(log[0].meta.message, "iceberg: create table db.orders");
    assert_eq!(log[0].meta.author.as_deref(), Some("test-user"));
    assert_eq!(
        log[0].meta.properties.get("application-type").map(String::as_str),
        Some("iceberg")
    );
}

#[tokio::test]
async fn issued_identifiers_address_the_same_table() {
    let fx = CatalogFixture::new();
    fx.namespace("nessie").await;
    fx.namespace("nessie.nessie.sub").await;
    fx.namespace("sub").await;
    let handle = fx.table("nessie.nessie.sub.t").await;
    let other = fx.table("sub.t").await;
    assert_eq!(
        handle.identifier().namespace,
        vec!["nessie".to_string(), "sub".to_string()]
    );

    let owner = |value: &str| TableUpdate::SetProperties {
        updates: HashMap::from([("owner".to_string(), value.to_string())]),
    };

    let first = fx
        .catalog
        .commit_table(handle.new_commit_request().with_update(owner("x")))
        .await
        .expect("commit through handle");
    let reloaded = fx
        .catalog
        .load_table(handle.identifier())
        .await
        .expect("load through handle");
    assert_eq!(reloaded.metadata_location(), first.metadata_location);

    let listed = fx
        .catalog
        .list_tables("nessie.nessie.sub")
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    let loaded = fx.catalog.load_table(&listed[0]).await.expect("load listed");
    assert_eq!(loaded.metadata_location(), first.metadata_location);

    let second = fx
        .catalog
        .commit_table(
            CommitTableRequest::new(&listed[0])
                .with_base_metadata_location(first.metadata_location.clone())
                .with_update(owner("y")),
        )
        .await
        .expect("commit through listed identifier");
    let current = fx.catalog.load_table(handle.identifier()).await.expect("load");
    assert_eq!(current.metadata_location(), second.metadata_location);
    assert_eq!(
        current.metadata().properties.get("owner").map(String::as_str),
        Some("y")
    );

    let untouched = fx.catalog.load_table("sub.t").await.expect("load sub.t");
    assert_eq!(untouched.metadata_location(), other.metadata_location());
    assert!(!untouched.metadata().properties.contains_key("owner"));

    let namespaces = fx.catalog.list_namespaces("nessie").await.expect("list");
    assert_eq!(namespaces.len(), 1);
    assert!(fx.catalog.namespace_exists(&namespaces[0]).await.expect("exists"));
    let tables = fx.catalog.list_tables(&namespaces[0]).await.expect("list");
    assert_eq!(tables, listed);
}

#[tokio::test]
async fn raw_names_can_build_commit_requests() {
    let fx = CatalogFixture::new();
    fx.namespace("db").await;
    let table = fx.table("db.orders").await;

    let identifier = fx
        .catalog
        .parse_table_identifier("nessie.db.orders")
        .expect("parse");
    let response = fx
        .catalog
        .commit_table(CommitTableRequest::new(identifier).with_update(
            TableUpdate::RemoveProperties {
                removals: vec!["absent".to_string()],
            },
        ))
        .await
        .expect("commit");
    assert_ne!(response.metadata_location, table.metadata_location());
}
