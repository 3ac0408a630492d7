//! Page controller: wires resolution, overlay, injection and pending
//! delivery to the host's events.
//!
//! Host events arrive one at a time on a single-threaded runtime. Locks on
//! the page and the session are only held inside synchronous sections,
//! always session first, and never across an await.

mod delivery;
mod enhance;

pub use delivery::DeliveryOutcome;
pub use enhance::EnhanceOutcome;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use chrono::Utc;
use parking_lot::Mutex;
use promptlift_bridge::BridgeClient;
use promptlift_bridge::storage::{SESSION_ID_KEY, USER_ID_KEY};
use promptlift_config::{Config, EngineConfig};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::injection::InjectionEngine;
use crate::notice::NoticeKind;
use crate::overlay::{AnchorCorner, LayoutSignal, RefreshOutcome};
use crate::page::{PageTree, Point};
use crate::pending::PendingInsertionStore;
use crate::platform::PlatformRegistry;
use crate::resolver::{MutationSignal, ResolvedTarget};
use crate::session::{ControlState, EngineSession};

/// Summary of a session start.
#[derive(Debug, Clone, PartialEq)]
pub struct InitReport {
    pub session_id: String,
    pub platform: Option<String>,
    pub target: Option<ResolvedTarget>,
    pub delivery: DeliveryOutcome,
}

pub struct PageController<P: PageTree> {
    page: Arc<Mutex<P>>,
    registry: Arc<PlatformRegistry>,
    bridge: BridgeClient,
    pending: PendingInsertionStore,
    engine: InjectionEngine,
    config: EngineConfig,
    style: String,
    requests: AtomicU64,
    session: Mutex<EngineSession>,
}

impl<P: PageTree> PageController<P> {
    pub fn new(
        page: P,
        registry: Arc<PlatformRegistry>,
        bridge: BridgeClient,
        config: &Config,
    ) -> Self {
        let url = page.url();
        let session = EngineSession::new(url.clone(), registry.detect(&url), &config.engine);
        Self {
            page: Arc::new(Mutex::new(page)),
            registry,
            pending: PendingInsertionStore::new(bridge.clone(), config.pending.ttl()),
            bridge,
            engine: InjectionEngine::new(&config.engine),
            config: config.engine.clone(),
            style: config.remote.default_style.clone(),
            requests: AtomicU64::new(0),
            session: Mutex::new(session),
        }
    }

    pub fn page(&self) -> Arc<Mutex<P>> {
        self.page.clone()
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn pending(&self) -> &PendingInsertionStore {
        &self.pending
    }

    pub fn session_id(&self) -> String {
        self.session.lock().id.clone()
    }

    pub fn platform_id(&self) -> Option<String> {
        self.session.lock().platform_id().map(str::to_string)
    }

    pub fn control_state(&self) -> ControlState {
        self.session.lock().state
    }

    pub fn current_anchor(&self) -> AnchorCorner {
        self.session.lock().overlay.current_anchor()
    }

    pub fn resolved_target(&self) -> Option<ResolvedTarget> {
        self.session.lock().resolver.cached().cloned()
    }

    pub fn overlay_attached(&self) -> bool {
        self.session.lock().overlay.is_attached()
    }

    pub fn is_streaming(&self) -> bool {
        self.session.lock().streaming.is_some()
    }

    pub fn notices(&self) -> Vec<NoticeKind> {
        self.session
            .lock()
            .notices
            .active()
            .iter()
            .map(|n| n.kind.clone())
            .collect()
    }

    /// Remove every visible notice now.
    pub fn dismiss_notices(&self) {
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        session.notices.dismiss_all(&mut *page);
    }

    /// First start on a freshly loaded page.
    pub async fn initialize(&self) -> Result<InitReport, EngineError> {
        if let Err(e) = self.pending.prune(Utc::now()).await {
            warn!("Failed to prune pending insertion: {}", e);
        }
        self.ensure_user_id().await;

        let url = self.page.lock().url();
        self.start_session(url).await
    }

    /// SPA route change or full navigation: drop the session and start over.
    pub async fn on_navigation(&self, url: &str) -> Result<InitReport, EngineError> {
        info!("Navigation to {}", url);
        self.start_session(url.to_string()).await
    }

    /// Host mutation batch.
    pub async fn on_mutation(&self, signal: MutationSignal) -> Result<(), EngineError> {
        let now = Instant::now();
        let should_resolve = {
            let mut session = self.session.lock();
            let mut page = self.page.lock();
            let s = &mut *session;
            s.overlay.signal(LayoutSignal::Mutation, now);

            if s.resolver.valid_cached(&*page).is_some() {
                false
            } else {
                if s.resolver.cached().is_some() {
                    debug!("Cached input target left the document");
                    s.resolver.invalidate();
                    s.overlay.detach(&mut *page);
                }
                s.resolver.should_retry(&signal, now)
            }
        };

        if should_resolve {
            self.try_attach(now);
        }

        let has_pending = self.session.lock().pending_delivery.is_some();
        if has_pending {
            self.deliver_pending().await?;
        }
        Ok(())
    }

    /// Scroll or resize.
    pub fn on_layout(&self, kind: LayoutSignal) {
        self.session.lock().overlay.signal(kind, Instant::now());
    }

    /// Periodic housekeeping: overlay refresh, notice expiry, cursor blink.
    pub fn tick(&self) -> RefreshOutcome {
        let now = Instant::now();
        let outcome = {
            let mut session = self.session.lock();
            let mut page = self.page.lock();
            let s = &mut *session;

            let outcome = s.overlay.tick(&mut *page, now);
            if outcome == RefreshOutcome::Detached {
                s.resolver.invalidate();
            }

            s.notices.prune(&mut *page, now);

            if let Some((layer, until)) = s.emphasis {
                if now >= until {
                    page.remove_layer(layer);
                    s.emphasis = None;
                }
            }

            if let Some(stream) = s.streaming.as_mut() {
                let due = s
                    .last_blink
                    .is_none_or(|at| now.duration_since(at) >= self.config.cursor_blink());
                if due {
                    self.engine.blink(&mut *page, stream);
                    s.last_blink = Some(now);
                }
            }
            outcome
        };

        if outcome == RefreshOutcome::Detached {
            self.try_attach(now);
        }
        outcome
    }

    pub fn pointer_down(&self, point: Point) -> bool {
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        session.overlay.pointer_down(&mut *page, point)
    }

    pub fn pointer_move(&self, point: Point) -> bool {
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        session.overlay.pointer_move(&mut *page, point)
    }

    pub fn pointer_up(&self, point: Point) -> Option<AnchorCorner> {
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        session.overlay.pointer_up(&mut *page, point)
    }

    async fn start_session(&self, url: String) -> Result<InitReport, EngineError> {
        let platform = self.registry.detect(&url);
        let session_id = {
            let mut session = self.session.lock();
            let mut page = self.page.lock();
            session.teardown(&mut *page, &self.engine);
            *session = EngineSession::new(url.clone(), platform.clone(), &self.config);
            session.id.clone()
        };
        info!(
            "Session {} started on {} (platform: {})",
            session_id,
            url,
            platform.as_deref().map(|p| p.id.as_str()).unwrap_or("generic")
        );

        if let Err(e) = self.bridge.set(SESSION_ID_KEY, &session_id).await {
            warn!("Failed to record session id: {}", e);
        }

        let target = self.try_attach(Instant::now());
        let delivery = self.check_pending().await?;

        Ok(InitReport {
            session_id,
            platform: platform.map(|p| p.id.clone()),
            target,
            delivery,
        })
    }

    async fn ensure_user_id(&self) {
        match self.bridge.get::<String>(USER_ID_KEY).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let id = uuid::Uuid::new_v4().to_string();
                match self.bridge.set(USER_ID_KEY, &id).await {
                    Ok(()) => info!("Generated user id {}", id),
                    Err(e) => warn!("Failed to store user id: {}", e),
                }
            }
            Err(e) => warn!("Failed to read user id: {}", e),
        }
    }

    /// Resolve (or reuse) the target and make sure the overlay frames it.
    fn try_attach(&self, now: Instant) -> Option<ResolvedTarget> {
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        match resolve_and_attach(&mut session, &mut *page, now) {
            Ok(target) => Some(target),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

/// Resolve against the session's platform and attach the overlay if it is
/// not already framing the resolved container.
fn resolve_and_attach<P: PageTree + ?Sized>(
    s: &mut EngineSession,
    page: &mut P,
    now: Instant,
) -> Result<ResolvedTarget, EngineError> {
    let target = s.resolver.resolve(&*page, s.platform.as_deref(), now)?;
    let tracked = s.overlay.overlay().map(|o| o.tracked_container);
    if tracked != Some(target.container) {
        if let Err(e) = s.overlay.attach(page, target.container, now) {
            s.resolver.invalidate();
            return Err(e);
        }
    }
    Ok(target)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
