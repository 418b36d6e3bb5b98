use std::time::Duration;
use sylva_dom::Document;
use sylva_query::{CollectionValidation, EngineConfig, QueryEngine, QueryError};

fn fixture() -> (Document, QueryEngine) {
    let _ = env_logger::builder().is_test(true).try_init();
    let document = Document::new();
    let engine = QueryEngine::with_config(
        document.clone(),
        EngineConfig {
            poll_interval: Duration::from_millis(5),
            ..EngineConfig::default()
        },
    );
    (document, engine)
}

#[tokio::test]
async fn wait_for_resolves_once_the_node_appears() {
    let (document, engine) = fixture();
    let writer = document.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let node = writer.create_element("div");
        writer.set_attribute(node, "id", "late");
        writer.append_child(writer.root(), node);
    });

    let element = engine
        .wait_for("#late", Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(element.id().as_deref(), Some("late"));
}

#[tokio::test]
async fn wait_for_times_out_with_the_selector_in_the_error() {
    let (_, engine) = fixture();
    let error = engine
        .wait_for("#never", Duration::from_millis(30))
        .await
        .unwrap_err();
    let QueryError::WaitTimeout { selector, waited } = error;
    assert_eq!(selector, "#never");
    assert_eq!(waited, Duration::from_millis(30));
}

#[tokio::test]
async fn wait_for_all_resolves_at_the_requested_count() {
    let (document, engine) = fixture();
    let writer = document.clone();
    tokio::spawn(async move {
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let node = writer.create_element("li");
            writer.add_class(node, "row");
            writer.append_child(writer.root(), node);
        }
    });

    let rows = engine
        .wait_for_all(".row", 3, Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn wait_for_all_times_out_below_the_requested_count() {
    let (document, engine) = fixture();
    let node = document.create_element("li");
    document.add_class(node, "row");
    document.append_child(document.root(), node);

    let error = engine
        .wait_for_all(".row", 2, Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(error, QueryError::WaitTimeout { .. }));
}

#[tokio::test]
async fn maintenance_prunes_entries_for_detached_nodes() {
    let (document, engine) = fixture();
    let node = document.create_element("div");
    document.set_attribute(node, "id", "short-lived");
    document.append_child(document.root(), node);
    assert!(engine.query("#short-lived").is_some());
    assert_eq!(engine.stats().cache_size, 1);

    // Detach the invalidator so only the background pruner can drop the
    // entry.
    engine.destroy();
    let handle = engine.spawn_maintenance(Duration::from_millis(10));
    document.remove(node);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();

    assert_eq!(engine.stats().cache_size, 0);
}

#[tokio::test]
async fn maintenance_picks_up_reconfigured_validation() {
    let (document, engine) = fixture();
    let root = document.root();
    let head = document.create_element("li");
    let tail = document.create_element("li");
    for node in [head, tail] {
        document.add_class(node, "row");
        document.append_child(root, node);
    }
    assert_eq!(engine.query_all(".row").len(), 2);

    engine.destroy();
    let handle = engine.spawn_maintenance(Duration::from_millis(10));
    // Switch to exact validation after the task is already running.
    engine.configure(EngineConfig {
        collection_validation: CollectionValidation::FullScan,
        ..EngineConfig::default()
    });

    // Only the tail member detaches; first-member validation would keep
    // the entry alive.
    document.remove(tail);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();

    assert_eq!(engine.stats().cache_size, 0);
}
