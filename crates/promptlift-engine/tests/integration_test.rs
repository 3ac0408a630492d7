//! End-to-end behavior of the page engine against in-memory pages and a
//! scripted background side.
//!
//! Run with: cargo test -p promptlift-engine --test integration_test

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use promptlift_bridge::storage::PENDING_INSERTION_KEY;
use promptlift_bridge::{
    Bridge, BridgeClient, BridgeError, BridgeRequest, BridgeResponse, DurableStore, MemoryStore,
    RewriteRequest, RewriteStream, StreamMessage,
};
use promptlift_config::Config;
use promptlift_engine::page::{LayerKind, PageTree, Point, SnapshotNode, SnapshotPage, ViewportInfo, WriteQuirks};
use promptlift_engine::pending::{InsertionState, PendingInsertion};
use promptlift_engine::platform::{Matcher, StructuralRule};
use promptlift_engine::resolver::{ResolutionTier, TargetResolver};
use promptlift_engine::{
    AnchorCorner, ControlState, DeliveryOutcome, EngineError, EnhanceOutcome, LayoutSignal,
    NoticeKind, PageController, PlatformRegistry, RefreshOutcome,
};
use serde_json::json;
use tokio::time::Instant;

/// Background side with scripted rewrite replies and in-memory storage.
#[derive(Default)]
struct ScriptedBridge {
    store: MemoryStore,
    replies: Mutex<HashMap<String, (Duration, Result<String, String>)>>,
    streams: Mutex<HashMap<String, Vec<(Duration, StreamMessage)>>>,
    rewrite_calls: AtomicUsize,
}

impl ScriptedBridge {
    fn reply(&self, prompt: &str, delay: Duration, result: Result<&str, &str>) {
        let result = result.map(str::to_string).map_err(str::to_string);
        self.replies.lock().insert(prompt.to_string(), (delay, result));
    }

    fn stream(&self, prompt: &str, script: Vec<(u64, StreamMessage)>) {
        let script = script
            .into_iter()
            .map(|(ms, m)| (Duration::from_millis(ms), m))
            .collect();
        self.streams.lock().insert(prompt.to_string(), script);
    }

    fn calls(&self) -> usize {
        self.rewrite_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bridge for ScriptedBridge {
    async fn request(&self, request: BridgeRequest) -> BridgeResponse {
        let result = match request {
            BridgeRequest::Rewrite(req) => {
                self.rewrite_calls.fetch_add(1, Ordering::SeqCst);
                let scripted = self.replies.lock().get(&req.prompt).cloned();
                let (delay, reply) =
                    scripted.unwrap_or((Duration::ZERO, Ok(format!("enhanced: {}", req.prompt))));
                tokio::time::sleep(delay).await;
                return match reply {
                    Ok(text) => BridgeResponse::ok(Some(json!({
                        "success": true,
                        "enhancedText": text,
                    }))),
                    Err(error) => BridgeResponse::ok(Some(json!({
                        "success": false,
                        "error": error,
                    }))),
                };
            }
            BridgeRequest::StorageGet { key } => self.store.get(&key).await,
            BridgeRequest::StorageSet { key, value } => self.store.set(&key, value).await.map(|_| None),
            BridgeRequest::StorageRemove { key } => self.store.remove(&key).await.map(|_| None),
            BridgeRequest::StorageKeys => self.store.keys().await.map(|k| Some(json!(k))),
            BridgeRequest::OpenPage { .. } => Ok(None),
            other => Err(BridgeError::UnsupportedAction(other.action().to_string())),
        };
        match result {
            Ok(data) => BridgeResponse::ok(data),
            Err(e) => BridgeResponse::fail(e.to_string()),
        }
    }

    async fn open_stream(&self, request: RewriteRequest) -> Result<RewriteStream, BridgeError> {
        self.rewrite_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .streams
            .lock()
            .get(&request.prompt)
            .cloned()
            .unwrap_or_default();
        let stream = futures::stream::iter(script).then(|(delay, message)| async move {
            tokio::time::sleep(delay).await;
            message
        });
        Ok(Box::pin(stream))
    }
}

struct Harness {
    controller: PageController<SnapshotPage>,
    bridge: Arc<ScriptedBridge>,
}

impl Harness {
    fn new(page: SnapshotPage) -> Self {
        let bridge = Arc::new(ScriptedBridge::default());
        let controller = PageController::new(
            page,
            Arc::new(PlatformRegistry::with_builtins()),
            BridgeClient::new(bridge.clone()),
            &Config::default(),
        );
        Self { controller, bridge }
    }

    fn text(&self, key: &str) -> String {
        let page = self.controller.page();
        let page = page.lock();
        let id = page.find(key).unwrap();
        page.read_text(id).unwrap_or_default()
    }

    fn layer_count(&self, kind: LayerKind) -> usize {
        self.controller.page().lock().layers_of(kind).len()
    }
}

fn composer_page(value: &str, quirks: WriteQuirks) -> SnapshotPage {
    let mut page = SnapshotPage::new("https://notes.example.com/", ViewportInfo::default());
    let mut input = SnapshotNode::new("textarea")
        .key("input")
        .bbox(100.0, 500.0, 600.0, 100.0)
        .quirks(quirks);
    input.value = value.to_string();
    page.append(None, input);
    page
}

fn node_for(rule: &StructuralRule) -> SnapshotNode {
    let mut node = SnapshotNode::new("div");
    for matcher in &rule.matchers {
        match matcher {
            Matcher::Tag(tag) => node.tag = tag.clone(),
            Matcher::AttributeContains { name, value } => node = node.attr(name.as_str(), value.as_str()),
            Matcher::HasAttribute(name) => node = node.attr(name.as_str(), ""),
            Matcher::Role(role) => node = node.attr("role", role.as_str()),
            Matcher::Editable => {}
        }
    }
    let needs_editable = rule.matchers.contains(&Matcher::Editable)
        && node.tag != "textarea"
        && node.tag != "input";
    if needs_editable {
        node = node.attr("contenteditable", "true");
    }
    node
}

#[test]
fn test_each_platform_resolves_its_single_visible_candidate() {
    let registry = PlatformRegistry::with_builtins();
    for profile in registry.list() {
        let rule = &profile.rules[0];
        let mut page = SnapshotPage::new(profile.launch_url.clone(), ViewportInfo::default());
        page.append(
            None,
            node_for(rule)
                .key("decoy")
                .attr("hidden", "")
                .bbox(0.0, 0.0, 1200.0, 600.0),
        );
        page.append(None, node_for(rule).key("live").bbox(200.0, 600.0, 700.0, 80.0));

        assert_eq!(registry.detect(&profile.launch_url).unwrap().id, profile.id);

        let resolver = TargetResolver::new(Duration::from_secs(1));
        let target = resolver
            .find(&page, Some(profile.as_ref()), Instant::now())
            .unwrap_or_else(|| panic!("{} did not resolve", profile.id));
        assert_eq!(target.tier, ResolutionTier::Platform, "{}", profile.id);
        assert_eq!(target.rule, rule.name, "{}", profile.id);
        assert_eq!(target.container, page.find("live").unwrap(), "{}", profile.id);
    }
}

#[tokio::test(start_paused = true)]
async fn test_enhance_replaces_draft() {
    let h = Harness::new(composer_page("make this better", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();

    let outcome = h.controller.enhance(None).await.unwrap();
    assert!(matches!(outcome, EnhanceOutcome::Applied { .. }));
    assert_eq!(h.text("input"), "enhanced: make this better");
    assert_eq!(h.controller.control_state(), ControlState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_trigger_sends_one_request() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();

    let first = h.controller.enhance(Some("same text")).await.unwrap();
    let second = h.controller.enhance(Some("same text")).await.unwrap();
    assert!(matches!(first, EnhanceOutcome::Applied { .. }));
    assert_eq!(second, EnhanceOutcome::Suppressed);
    assert_eq!(h.bridge.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    h.controller.enhance(Some("same text")).await.unwrap();
    assert_eq!(h.bridge.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_last_request_wins_when_first_is_slower() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.reply("first", Duration::from_millis(300), Ok("FIRST"));
    h.bridge.reply("second", Duration::from_millis(100), Ok("SECOND"));

    let (a, b) = tokio::join!(
        h.controller.enhance(Some("first")),
        h.controller.enhance(Some("second"))
    );
    assert_eq!(a.unwrap(), EnhanceOutcome::Superseded);
    assert!(matches!(b.unwrap(), EnhanceOutcome::Applied { .. }));
    assert_eq!(h.text("input"), "SECOND");
}

#[tokio::test(start_paused = true)]
async fn test_last_request_wins_when_first_is_faster() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.reply("first", Duration::from_millis(50), Ok("FIRST"));
    h.bridge.reply("second", Duration::from_millis(200), Ok("SECOND"));

    let (a, b) = tokio::join!(
        h.controller.enhance(Some("first")),
        h.controller.enhance(Some("second"))
    );
    assert_eq!(a.unwrap(), EnhanceOutcome::Superseded);
    assert!(matches!(b.unwrap(), EnhanceOutcome::Applied { .. }));
    assert_eq!(h.text("input"), "SECOND");
}

#[tokio::test(start_paused = true)]
async fn test_remote_timeout_shows_high_load() {
    let h = Harness::new(composer_page("slow prompt", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.reply("slow prompt", Duration::from_secs(13), Ok("too late"));

    let start = Instant::now();
    let err = h.controller.enhance(None).await.unwrap_err();

    assert!(matches!(err, EngineError::RemoteTimeout(d) if d == Duration::from_secs(12)));
    assert_eq!(start.elapsed(), Duration::from_secs(12));
    assert_eq!(h.controller.control_state(), ControlState::Idle);
    assert_eq!(h.controller.notices(), vec![NoticeKind::HighLoad]);
    assert_eq!(h.text("input"), "slow prompt");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(h.text("input"), "slow prompt");

    tokio::time::advance(Duration::from_secs(3)).await;
    h.controller.tick();
    assert!(h.controller.notices().is_empty());
    assert_eq!(h.layer_count(LayerKind::Notice), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_surfaces_notice() {
    let h = Harness::new(composer_page("broken", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.reply("broken", Duration::ZERO, Err("model overloaded"));

    let err = h.controller.enhance(None).await.unwrap_err();
    assert!(matches!(err, EngineError::RemoteError(ref m) if m.contains("model overloaded")));
    assert_eq!(h.text("input"), "broken");
    assert_eq!(h.controller.notices().len(), 1);

    h.controller.dismiss_notices();
    assert!(h.controller.notices().is_empty());
    assert_eq!(h.layer_count(LayerKind::Notice), 0);
}

#[tokio::test(start_paused = true)]
async fn test_injection_failure_keeps_draft_and_invalidates_target() {
    let quirks = WriteQuirks {
        ignore_value_assignment: true,
        reject_insert_text: true,
        ..Default::default()
    };
    let h = Harness::new(composer_page("stubborn draft", quirks));
    h.controller.initialize().await.unwrap();

    let err = h.controller.enhance(None).await.unwrap_err();
    assert!(matches!(err, EngineError::InjectionFailure { .. }));
    assert_eq!(h.text("input"), "stubborn draft");
    assert_eq!(h.controller.notices(), vec![NoticeKind::InjectionFailed]);
    assert!(h.controller.resolved_target().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_draft_and_missing_target() {
    let h = Harness::new(composer_page("   ", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    assert!(matches!(h.controller.enhance(None).await, Err(EngineError::EmptyDraft)));

    let bare = Harness::new(SnapshotPage::new("https://blank.example.com/", ViewportInfo::default()));
    bare.controller.initialize().await.unwrap();
    let err = bare.controller.enhance(Some("text")).await.unwrap_err();
    assert!(matches!(err, EngineError::ResolutionFailure(_)));
    assert!(!err.is_user_visible());
    assert!(bare.controller.notices().is_empty());
    assert_eq!(bare.bridge.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_streaming_renders_fragments() {
    let h = Harness::new(composer_page("draft", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.stream(
        "draft",
        vec![
            (10, StreamMessage::chunk("Hel")),
            (10, StreamMessage::chunk("lo ")),
            (10, StreamMessage::chunk("world")),
            (10, StreamMessage::complete()),
        ],
    );

    let outcome = h.controller.enhance_streaming(None).await.unwrap();
    match outcome {
        EnhanceOutcome::Applied { text, .. } => assert_eq!(text, "Hello world"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.text("input"), "Hello world");
    assert_eq!(h.layer_count(LayerKind::Cursor), 0);
    assert_eq!(h.layer_count(LayerKind::Emphasis), 1);
    assert_eq!(h.controller.control_state(), ControlState::Idle);
    assert!(!h.controller.is_streaming());

    tokio::time::advance(Duration::from_millis(600)).await;
    h.controller.tick();
    assert_eq!(h.layer_count(LayerKind::Emphasis), 0);
}

#[tokio::test(start_paused = true)]
async fn test_streaming_error_restores_draft() {
    let h = Harness::new(composer_page("my draft", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.stream(
        "my draft",
        vec![
            (10, StreamMessage::chunk("partial")),
            (10, StreamMessage::error("upstream failed")),
        ],
    );

    let err = h.controller.enhance_streaming(None).await.unwrap_err();
    assert!(matches!(err, EngineError::RemoteError(ref m) if m == "upstream failed"));
    assert_eq!(h.text("input"), "my draft");
    assert_eq!(
        h.controller.notices(),
        vec![NoticeKind::Error("upstream failed".to_string())]
    );
    assert_eq!(h.layer_count(LayerKind::Cursor), 0);

    // Shown under the input, not under the control.
    let page = h.controller.page();
    let page = page.lock();
    let notice = page.layers_of(LayerKind::Notice)[0].bbox;
    assert_eq!(notice.x, 100.0);
    assert_eq!(notice.y, 604.0);
}

#[tokio::test(start_paused = true)]
async fn test_trickling_stream_hits_overall_deadline() {
    let h = Harness::new(composer_page("slow draft", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    let mut script: Vec<(u64, StreamMessage)> =
        (0..12).map(|_| (7_000, StreamMessage::chunk("."))).collect();
    script.push((10, StreamMessage::complete()));
    h.bridge.stream("slow draft", script);

    let start = Instant::now();
    let err = h.controller.enhance_streaming(None).await.unwrap_err();

    assert!(matches!(err, EngineError::RemoteTimeout(d) if d == Duration::from_secs(60)));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    assert_eq!(h.text("input"), "slow draft");
    assert_eq!(h.controller.notices(), vec![NoticeKind::HighLoad]);
    assert_eq!(h.controller.control_state(), ControlState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_new_request_cancels_stream() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.stream(
        "stream me",
        vec![
            (100, StreamMessage::chunk("Hel")),
            (1000, StreamMessage::chunk("lo")),
            (10, StreamMessage::complete()),
        ],
    );

    let (streamed, replaced) = tokio::join!(h.controller.enhance_streaming(Some("stream me")), async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        h.controller.enhance(Some("replace me")).await
    });

    assert_eq!(streamed.unwrap(), EnhanceOutcome::Superseded);
    assert!(matches!(replaced.unwrap(), EnhanceOutcome::Applied { .. }));
    assert_eq!(h.text("input"), "enhanced: replace me");
    assert_eq!(h.layer_count(LayerKind::Cursor), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cursor_blinks_while_streaming() {
    let h = Harness::new(composer_page("blink", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    h.bridge.stream(
        "blink",
        vec![
            (10, StreamMessage::chunk("a")),
            (5000, StreamMessage::complete()),
        ],
    );

    let (_, visibility) = tokio::join!(h.controller.enhance_streaming(None), async {
        tokio::time::sleep(Duration::from_millis(600)).await;
        h.controller.tick();
        let page = h.controller.page();
        let page = page.lock();
        page.layers_of(LayerKind::Cursor).first().map(|l| l.visible)
    });
    assert_eq!(visibility, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_dragged_anchor_stays_pinned_after_layout_change() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    h.controller.initialize().await.unwrap();
    assert_eq!(h.controller.current_anchor(), AnchorCorner::BottomRight);

    assert!(h.controller.pointer_down(Point::new(692.0, 592.0)));
    assert!(h.controller.pointer_move(Point::new(120.0, 520.0)));
    assert_eq!(h.controller.pointer_up(Point::new(120.0, 520.0)), Some(AnchorCorner::TopLeft));

    assert!(h.controller.pointer_down(Point::new(108.0, 508.0)));
    assert_eq!(h.controller.pointer_up(Point::new(680.0, 580.0)), Some(AnchorCorner::BottomRight));

    {
        let page = h.controller.page();
        let mut page = page.lock();
        let input = page.find("input").unwrap();
        page.translate(input, -50.0, -200.0);
    }
    h.controller.on_layout(LayoutSignal::Resize);
    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(h.controller.tick(), RefreshOutcome::Repositioned);

    let page = h.controller.page();
    let control = page.lock().layers_of(LayerKind::Control)[0].bbox;
    assert_eq!((control.x, control.y), (626.0, 376.0));
    assert_eq!(h.controller.current_anchor(), AnchorCorner::BottomRight);
}

#[tokio::test(start_paused = true)]
async fn test_expired_insertion_deleted_on_load() {
    let h = Harness::new(composer_page("", WriteQuirks::default()));
    let created_at = Utc::now() - TimeDelta::seconds(301);
    let stale = PendingInsertion::new("old text", "chatgpt", Duration::from_secs(300))
        .with_created_at(created_at);
    h.bridge
        .store
        .set(PENDING_INSERTION_KEY, serde_json::to_value(InsertionState::Pending(stale)).unwrap())
        .await
        .unwrap();

    let report = h.controller.initialize().await.unwrap();
    assert_eq!(report.delivery, DeliveryOutcome::None);
    assert!(h.bridge.store.get(PENDING_INSERTION_KEY).await.unwrap().is_none());
    assert_eq!(h.text("input"), "");
}
