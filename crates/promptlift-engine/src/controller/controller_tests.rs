use promptlift_bridge::storage::{LAST_SELECTED_PLATFORM_KEY, PENDING_INSERTION_KEY};
use promptlift_bridge::{
    BackgroundBridge, DurableStore, MemoryStore, RecordingTabOpener, RewriteClient,
};

use super::*;
use crate::page::{ElementId, LayerKind, SnapshotNode, SnapshotPage, ViewportInfo};

struct Harness {
    controller: PageController<SnapshotPage>,
    store: Arc<MemoryStore>,
    tabs: Arc<RecordingTabOpener>,
}

fn harness(page: SnapshotPage) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let tabs = Arc::new(RecordingTabOpener::new());
    let bridge = BackgroundBridge::new(
        store.clone(),
        tabs.clone(),
        RewriteClient::new("http://127.0.0.1:9/v1/enhance"),
    );
    let controller = PageController::new(
        page,
        Arc::new(PlatformRegistry::with_builtins()),
        BridgeClient::new(Arc::new(bridge)),
        &Config::default(),
    );
    Harness {
        controller,
        store,
        tabs,
    }
}

fn editor_node() -> SnapshotNode {
    SnapshotNode::new("div")
        .key("editor")
        .attr("contenteditable", "true")
        .attr("class", "ql-editor")
        .bbox(110.0, 510.0, 700.0, 80.0)
}

fn gemini_page(with_editor: bool) -> SnapshotPage {
    let mut page = SnapshotPage::new("https://gemini.google.com/app", ViewportInfo::default());
    let mut form = SnapshotNode::new("form").key("form").bbox(100.0, 500.0, 800.0, 120.0);
    if with_editor {
        form = form.child(editor_node());
    }
    form = form.child(
        SnapshotNode::new("button")
            .key("send")
            .attr("aria-label", "Send message")
            .bbox(840.0, 540.0, 40.0, 40.0),
    );
    page.append(None, form);
    page
}

fn find(controller: &PageController<SnapshotPage>, key: &str) -> ElementId {
    controller.page().lock().find(key).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_initialize_attaches_overlay_and_records_ids() {
    let h = harness(gemini_page(true));
    let report = h.controller.initialize().await.unwrap();

    assert_eq!(report.platform.as_deref(), Some("gemini"));
    assert_eq!(report.delivery, DeliveryOutcome::None);
    let target = report.target.unwrap();
    assert_eq!(target.editable, find(&h.controller, "editor"));
    assert!(h.controller.overlay_attached());
    assert_eq!(h.controller.current_anchor(), AnchorCorner::TopRight);

    assert!(h.store.get(USER_ID_KEY).await.unwrap().is_some());
    assert_eq!(
        h.store.get(SESSION_ID_KEY).await.unwrap().unwrap(),
        serde_json::json!(report.session_id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_user_id_is_stable() {
    let h = harness(gemini_page(true));
    h.controller.initialize().await.unwrap();
    let first = h.store.get(USER_ID_KEY).await.unwrap();
    h.controller.initialize().await.unwrap();
    assert_eq!(h.store.get(USER_ID_KEY).await.unwrap(), first);
}

#[tokio::test(start_paused = true)]
async fn test_pending_insertion_delivered_with_send() {
    let h = harness(gemini_page(true));
    h.controller.pending().create("plan a trip", "gemini").await.unwrap();

    let report = h.controller.initialize().await.unwrap();
    assert_eq!(
        report.delivery,
        DeliveryOutcome::Delivered {
            platform_id: "gemini".to_string(),
            clicked_send: true,
        }
    );

    let editor = find(&h.controller, "editor");
    let send = find(&h.controller, "send");
    let page = h.controller.page();
    assert_eq!(page.lock().read_text(editor).as_deref(), Some("plan a trip"));
    assert_eq!(page.lock().clicks(), &[send]);
    assert!(h.store.get(PENDING_INSERTION_KEY).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pending_for_other_platform_left_alone() {
    let h = harness(gemini_page(true));
    h.controller.pending().create("for claude", "claude").await.unwrap();

    let report = h.controller.initialize().await.unwrap();
    assert_eq!(report.delivery, DeliveryOutcome::OtherPlatform("claude".to_string()));
    assert!(h.store.get(PENDING_INSERTION_KEY).await.unwrap().is_some());

    let editor = find(&h.controller, "editor");
    assert_eq!(h.controller.page().lock().read_text(editor).as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_pending_waits_for_target() {
    let h = harness(gemini_page(false));
    h.controller.pending().create("late input", "gemini").await.unwrap();

    let report = h.controller.initialize().await.unwrap();
    assert!(report.target.is_none());
    assert_eq!(report.delivery, DeliveryOutcome::Waiting);

    {
        let page = h.controller.page();
        let mut page = page.lock();
        let form = page.find("form").unwrap();
        page.append(Some(form), editor_node());
    }
    h.controller.on_mutation(MutationSignal::added(1)).await.unwrap();

    let editor = find(&h.controller, "editor");
    assert_eq!(
        h.controller.page().lock().read_text(editor).as_deref(),
        Some("late input")
    );
    assert!(h.store.get(PENDING_INSERTION_KEY).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_held_insertion_not_delivered_after_ttl() {
    let h = harness(gemini_page(false));
    h.controller.pending().create("stale text", "gemini").await.unwrap();
    let report = h.controller.initialize().await.unwrap();
    assert_eq!(report.delivery, DeliveryOutcome::Waiting);

    // The input shows up only after the TTL has run out.
    let aged = {
        let mut session = h.controller.session.lock();
        let held = session.pending_delivery.as_mut().unwrap();
        held.created_at -= chrono::TimeDelta::seconds(301);
        held.clone()
    };
    h.store
        .set(
            PENDING_INSERTION_KEY,
            serde_json::to_value(crate::pending::InsertionState::Pending(aged)).unwrap(),
        )
        .await
        .unwrap();
    {
        let page = h.controller.page();
        let mut page = page.lock();
        let form = page.find("form").unwrap();
        page.append(Some(form), editor_node());
    }
    h.controller.on_mutation(MutationSignal::added(1)).await.unwrap();

    let editor = find(&h.controller, "editor");
    assert_eq!(h.controller.page().lock().read_text(editor).as_deref(), Some(""));
    assert!(h.controller.page().lock().clicks().is_empty());
    assert!(h.controller.session.lock().pending_delivery.is_none());
    assert!(h.store.get(PENDING_INSERTION_KEY).await.unwrap().is_none());
    assert_eq!(h.controller.deliver_pending().await.unwrap(), DeliveryOutcome::None);
}

/// Memory store whose next `remove` calls fail.
#[derive(Default)]
struct FlakyRemoveStore {
    inner: MemoryStore,
    failures: std::sync::atomic::AtomicUsize,
}

#[async_trait::async_trait]
impl DurableStore for FlakyRemoveStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, promptlift_bridge::BridgeError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), promptlift_bridge::BridgeError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), promptlift_bridge::BridgeError> {
        use std::sync::atomic::Ordering;
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(promptlift_bridge::BridgeError::Storage("disk full".to_string()));
        }
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, promptlift_bridge::BridgeError> {
        self.inner.keys().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_delivery_survives_failed_removal() {
    let store = Arc::new(FlakyRemoveStore::default());
    let bridge = BackgroundBridge::new(
        store.clone(),
        Arc::new(RecordingTabOpener::new()),
        RewriteClient::new("http://127.0.0.1:9/v1/enhance"),
    );
    let controller = PageController::new(
        gemini_page(true),
        Arc::new(PlatformRegistry::with_builtins()),
        BridgeClient::new(Arc::new(bridge)),
        &Config::default(),
    );
    controller.pending().create("keep going", "gemini").await.unwrap();
    store.failures.store(1, std::sync::atomic::Ordering::SeqCst);

    let report = controller.initialize().await.unwrap();

    assert_eq!(
        report.delivery,
        DeliveryOutcome::Delivered {
            platform_id: "gemini".to_string(),
            clicked_send: true,
        }
    );
    let editor = find(&controller, "editor");
    assert_eq!(controller.page().lock().read_text(editor).as_deref(), Some("keep going"));
    assert!(store.inner.get(PENDING_INSERTION_KEY).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_open_in_platform() {
    let h = harness(gemini_page(true));
    let insertion = h.controller.open_in_platform("claude", "hello").await.unwrap();

    assert_eq!(insertion.platform_id, "claude");
    assert_eq!(h.tabs.opened(), vec!["https://claude.ai/new".to_string()]);
    assert_eq!(
        h.store.get(LAST_SELECTED_PLATFORM_KEY).await.unwrap().unwrap(),
        serde_json::json!("claude")
    );

    let err = h.controller.open_in_platform("nope", "hello").await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownPlatform(_)));
}

#[tokio::test(start_paused = true)]
async fn test_navigation_recreates_session() {
    let h = harness(gemini_page(true));
    let first = h.controller.initialize().await.unwrap();

    let editor = find(&h.controller, "editor");
    {
        let page = h.controller.page();
        page.lock().set_url("https://example.com/notes");
    }
    let second = h.controller.on_navigation("https://example.com/notes").await.unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.platform, None);
    assert_eq!(second.target.unwrap().editable, editor);
    assert_eq!(h.controller.current_anchor(), AnchorCorner::BottomRight);

    let page = h.controller.page();
    assert_eq!(page.lock().layers_of(LayerKind::Overlay).len(), 1);
    assert_eq!(page.lock().layers_of(LayerKind::Control).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_detached_target_reresolved_on_mutation() {
    let h = harness(gemini_page(true));
    h.controller.initialize().await.unwrap();

    {
        let page = h.controller.page();
        let mut page = page.lock();
        let editor = page.find("editor").unwrap();
        let form = page.find("form").unwrap();
        page.detach(editor);
        page.append(Some(form), editor_node());
    }
    h.controller.on_mutation(MutationSignal::added(1)).await.unwrap();

    let fresh = find(&h.controller, "editor");
    assert_eq!(h.controller.resolved_target().unwrap().editable, fresh);
    assert!(h.controller.overlay_attached());
}
