//! Per-page engine session.
//!
//! Everything tied to one page load lives here and is dropped as a unit on
//! navigation, so nothing from a previous page can leak into the next.

use std::sync::Arc;

use promptlift_config::EngineConfig;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::injection::{InjectionEngine, StreamingSession, TriggerGuard};
use crate::notice::NoticeBoard;
use crate::overlay::{AnchorCorner, OverlayController};
use crate::page::{LayerId, PageTree};
use crate::pending::PendingInsertion;
use crate::platform::PlatformProfile;
use crate::resolver::TargetResolver;

/// What the action control is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    #[default]
    Idle,
    Loading,
    Streaming,
}

#[derive(Debug)]
pub struct EngineSession {
    pub id: String,
    pub url: String,
    pub platform: Option<Arc<PlatformProfile>>,
    pub resolver: TargetResolver,
    pub overlay: OverlayController,
    pub notices: NoticeBoard,
    pub guard: TriggerGuard,
    pub state: ControlState,
    /// Request whose result may still be applied. Zero when none.
    pub current_request: u64,
    pub streaming: Option<StreamingSession>,
    pub pending_delivery: Option<PendingInsertion>,
    pub delivery_attempts: u32,
    pub emphasis: Option<(LayerId, Instant)>,
    pub last_blink: Option<Instant>,
}

impl EngineSession {
    pub fn new(
        url: impl Into<String>,
        platform: Option<Arc<PlatformProfile>>,
        config: &EngineConfig,
    ) -> Self {
        let anchor = platform
            .as_ref()
            .map(|p| p.anchor_hint)
            .unwrap_or(AnchorCorner::BottomRight);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            platform,
            resolver: TargetResolver::new(config.resolution_give_up()),
            overlay: OverlayController::new(config, anchor),
            notices: NoticeBoard::new(config.notice_display()),
            guard: TriggerGuard::new(config.dedup_window()),
            state: ControlState::Idle,
            current_request: 0,
            streaming: None,
            pending_delivery: None,
            delivery_attempts: 0,
            emphasis: None,
            last_blink: None,
        }
    }

    pub fn platform_id(&self) -> Option<&str> {
        self.platform.as_deref().map(|p| p.id.as_str())
    }

    pub fn is_current(&self, request: u64) -> bool {
        self.current_request == request
    }

    /// Stop an in-flight stream, leaving written text in place.
    pub fn cancel_stream<P: PageTree + ?Sized>(&mut self, page: &mut P, engine: &InjectionEngine) {
        if let Some(mut stream) = self.streaming.take() {
            engine.cancel_stream(page, &mut stream);
        }
    }

    /// Remove every layer this session mounted.
    pub fn teardown<P: PageTree + ?Sized>(&mut self, page: &mut P, engine: &InjectionEngine) {
        self.cancel_stream(page, engine);
        self.overlay.detach(page);
        self.notices.dismiss_all(page);
        if let Some((layer, _)) = self.emphasis.take() {
            page.remove_layer(layer);
        }
        self.current_request = 0;
        self.state = ControlState::Idle;
    }
}
