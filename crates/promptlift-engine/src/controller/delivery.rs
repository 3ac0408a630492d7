//! Pending insertion delivery and the "open in platform" action.

use chrono::Utc;
use promptlift_bridge::storage::LAST_SELECTED_PLATFORM_KEY;
use tokio::time::Instant;
use tracing::{info, warn};

use super::PageController;
use crate::error::EngineError;
use crate::notice::NoticeKind;
use crate::page::PageTree;
use crate::pending::{Delivery, PendingInsertion};

/// Attempts per session before a pending insertion is left for next time.
const MAX_DELIVERY_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Nothing stored.
    None,
    /// Addressed here, waiting for an input target to appear.
    Waiting,
    Delivered { platform_id: String, clicked_send: bool },
    Expired,
    /// Addressed to another platform; left in storage.
    OtherPlatform(String),
    /// Writing failed; the insertion stays stored until its TTL runs out.
    Failed(String),
}

impl<P: PageTree> PageController<P> {
    /// Store `text` for `platform_id` and open that platform's page.
    pub async fn open_in_platform(
        &self,
        platform_id: &str,
        text: &str,
    ) -> Result<PendingInsertion, EngineError> {
        let profile = self
            .registry
            .get(platform_id)
            .ok_or_else(|| EngineError::UnknownPlatform(platform_id.to_string()))?;

        let insertion = self.pending.create(text, &profile.id).await?;
        if let Err(e) = self.bridge.set(LAST_SELECTED_PLATFORM_KEY, &profile.id).await {
            warn!("Failed to remember selected platform: {}", e);
        }
        self.bridge.open_page(&profile.launch_url).await?;
        info!("Opened {} for pending insertion", profile.launch_url);
        Ok(insertion)
    }

    /// Look for an insertion addressed to this page's platform.
    pub(super) async fn check_pending(&self) -> Result<DeliveryOutcome, EngineError> {
        let platform = self.platform_id();
        let delivery = match self.pending.check(platform.as_deref(), Utc::now()).await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!("Failed to check pending insertion: {}", e);
                return Ok(DeliveryOutcome::None);
            }
        };

        match delivery {
            Delivery::Nothing => Ok(DeliveryOutcome::None),
            Delivery::Expired(_) => Ok(DeliveryOutcome::Expired),
            Delivery::OtherPlatform(p) => Ok(DeliveryOutcome::OtherPlatform(p.platform_id)),
            Delivery::Deliver(insertion) => {
                {
                    let mut session = self.session.lock();
                    session.pending_delivery = Some(insertion);
                    session.delivery_attempts = 0;
                }
                match self.deliver_pending().await {
                    Ok(outcome) => Ok(outcome),
                    Err(e) => {
                        warn!("Pending insertion delivery failed: {}", e);
                        Ok(DeliveryOutcome::Failed(e.to_string()))
                    }
                }
            }
        }
    }

    /// Write the held insertion into the resolved target, then consume it
    /// and run the platform's post-injection action.
    ///
    /// The TTL is checked again here: an insertion held while waiting for
    /// the input may have gone stale since the page loaded.
    pub async fn deliver_pending(&self) -> Result<DeliveryOutcome, EngineError> {
        let stale = {
            let mut session = self.session.lock();
            let now = Utc::now();
            if session
                .pending_delivery
                .as_ref()
                .is_some_and(|p| p.is_expired_at(now))
            {
                session.pending_delivery.take()
            } else {
                None
            }
        };
        if let Some(insertion) = stale {
            let now = Utc::now();
            info!(
                "{}",
                EngineError::StaleInsertion {
                    platform_id: insertion.platform_id.clone(),
                    age_seconds: insertion.age_seconds(now),
                }
            );
            self.pending.expire(&insertion).await?;
            return Ok(DeliveryOutcome::Expired);
        }

        let (insertion, container, profile) = {
            let mut session = self.session.lock();
            let mut page = self.page.lock();
            let s = &mut *session;

            let Some(target) = s.resolver.valid_cached(&*page).cloned() else {
                return Ok(if s.pending_delivery.is_some() {
                    DeliveryOutcome::Waiting
                } else {
                    DeliveryOutcome::None
                });
            };
            let Some(insertion) = s.pending_delivery.take() else {
                return Ok(DeliveryOutcome::None);
            };

            let preferred = s
                .platform
                .as_deref()
                .map(|p| p.commit_order.clone())
                .unwrap_or_default();
            if let Err(e) =
                self.engine
                    .inject_immediate(&mut *page, target.editable, &insertion.text, &preferred)
            {
                s.resolver.invalidate();
                s.delivery_attempts += 1;
                if s.delivery_attempts < MAX_DELIVERY_ATTEMPTS {
                    s.pending_delivery = Some(insertion);
                } else {
                    let near = s.overlay.control().bbox();
                    s.notices.show(&mut *page, NoticeKind::InjectionFailed, near, Instant::now());
                }
                return Err(e);
            }
            (insertion, target.container, s.platform.clone())
        };

        // Text is already written. A record left behind replays on next load.
        if let Err(e) = self.pending.consume(&insertion).await {
            warn!("Delivered insertion could not be removed, retrying: {}", e);
            if let Err(e) = self.pending.consume(&insertion).await {
                warn!("Delivered insertion for {} is still stored: {}", insertion.platform_id, e);
            }
        }
        info!("Delivered pending insertion for {}", insertion.platform_id);

        let clicked_send = match profile {
            Some(profile) => {
                self.engine
                    .run_post_action(&self.page, &profile, container)
                    .await?
            }
            None => false,
        };

        Ok(DeliveryOutcome::Delivered {
            platform_id: insertion.platform_id,
            clicked_send,
        })
    }
}
