//! Writing enhanced text back into the host page.
//!
//! Immediate injection tries the commit strategies in order and keeps the
//! first one whose result reads back correctly. When none does, the original
//! draft is put back and the injection fails closed.

mod dedup;
mod strategy;
mod streaming;

pub use dedup::{TriggerGuard, content_hash};
pub use strategy::{CommitStrategy, normalize, order_for, verify};
pub use streaming::StreamingSession;

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use promptlift_config::EngineConfig;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::page::{EditableKind, ElementId, PageError, PageTree, ancestors};
use crate::platform::{PlatformProfile, PostInjectionAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMode {
    Immediate,
    Streaming,
}

/// One accepted enhancement trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionRequest {
    /// Content hash plus trigger timestamp.
    pub id: String,
    pub source_text: String,
    pub mode: InjectionMode,
    pub target: ElementId,
    pub generation: u64,
}

impl InjectionRequest {
    pub fn new(
        hash: u64,
        source_text: impl Into<String>,
        mode: InjectionMode,
        target: ElementId,
        generation: u64,
    ) -> Self {
        Self {
            id: format!("{hash:016x}-{}", Utc::now().timestamp_millis()),
            source_text: source_text.into(),
            mode,
            target,
            generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjectionReport {
    /// Strategy whose write verified.
    pub strategy: CommitStrategy,
    pub attempts: usize,
}

#[derive(Debug, Clone)]
pub struct InjectionEngine {
    settle: Duration,
    max_stream_retries: u32,
}

impl InjectionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            settle: config.send_settle(),
            max_stream_retries: config.stream_max_retries,
        }
    }

    /// Write `text` into `editable` in one step.
    pub fn inject_immediate<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        editable: ElementId,
        text: &str,
        preferred: &[CommitStrategy],
    ) -> Result<InjectionReport, EngineError> {
        let kind = editable_kind(page, editable)?;
        let original = page.read_text(editable).unwrap_or_default();
        let order = order_for(kind, preferred);

        let mut attempts = 0;
        let mut last_error = String::from("no applicable strategy");
        for strategy in &order {
            attempts += 1;
            match strategy.apply(page, editable, text) {
                Ok(()) if verify(page, editable, text) => {
                    debug!("Injected into {} via {} after {} attempt(s)", editable, strategy, attempts);
                    return Ok(InjectionReport {
                        strategy: *strategy,
                        attempts,
                    });
                }
                Ok(()) => {
                    debug!("Strategy {} did not verify on {}", strategy, editable);
                    last_error = format!("{strategy}: read-back mismatch");
                }
                Err(e) => {
                    debug!("Strategy {} failed on {}: {}", strategy, editable, e);
                    last_error = format!("{strategy}: {e}");
                }
            }
            if !page.is_connected(editable) {
                break;
            }
        }

        restore(page, editable, &original, &order);
        warn!("Injection into {} failed after {} attempt(s): {}", editable, attempts, last_error);
        Err(EngineError::InjectionFailure {
            attempts,
            message: last_error,
        })
    }

    /// Run the platform's post-injection action. Returns whether a send
    /// control was clicked.
    pub async fn run_post_action<P: PageTree>(
        &self,
        page: &Mutex<P>,
        profile: &PlatformProfile,
        container: ElementId,
    ) -> Result<bool, EngineError> {
        if profile.post_action != PostInjectionAction::ClickSend {
            return Ok(false);
        }

        tokio::time::sleep(self.settle).await;

        let mut page = page.lock();
        if !page.is_connected(container) {
            debug!("Input {} went away during the settle delay, not sending", container);
            return Ok(false);
        }
        let Some(send) = find_send_control(&*page, profile, container) else {
            warn!("No enabled send control found for {}", profile.id);
            return Ok(false);
        };
        page.click(send)?;
        info!("Clicked send control {} on {}", send, profile.id);
        Ok(true)
    }
}

fn editable_kind<P: PageTree + ?Sized>(page: &P, id: ElementId) -> Result<EditableKind, EngineError> {
    if !page.is_connected(id) {
        return Err(EngineError::InjectionFailure {
            attempts: 0,
            message: PageError::Detached(id).to_string(),
        });
    }
    let info = page.info(id).ok_or(PageError::ElementNotFound(id))?;
    Ok(info.editable_kind())
}

/// Put the original draft back if a failed attempt left something else.
fn restore<P: PageTree + ?Sized>(
    page: &mut P,
    id: ElementId,
    original: &str,
    order: &[CommitStrategy],
) {
    if !page.is_connected(id) || verify(page, id, original) {
        return;
    }
    for strategy in order {
        if strategy.apply(page, id, original).is_ok() && verify(page, id, original) {
            debug!("Restored original draft in {}", id);
            return;
        }
    }
    warn!("Could not restore original draft in {}", id);
}

/// Nearest enabled send control: inside the container, then each ancestor's
/// subtree, then anywhere on the page.
pub fn find_send_control<P: PageTree + ?Sized>(
    page: &P,
    profile: &PlatformProfile,
    container: ElementId,
) -> Option<ElementId> {
    let scopes = std::iter::once(Some(container))
        .chain(ancestors(page, container).into_iter().map(Some))
        .chain(std::iter::once(None));

    for scope in scopes {
        for rule in &profile.send_rules {
            if let Some(found) = rule.find(page, scope).into_iter().next() {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "injection_tests.rs"]
mod tests;
