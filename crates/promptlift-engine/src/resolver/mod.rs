//! Input target resolution.
//!
//! Resolution runs in three tiers and stops at the first that yields a
//! candidate:
//!
//! 1. the platform's own structural rules, in priority order
//! 2. generic editable patterns
//! 3. heuristic scoring of composer-like containers
//!
//! The winner becomes the container the overlay frames. The element text is
//! written into is looked up again inside that container.

mod generic;
mod retry;
mod scoring;

pub use generic::generic_rules;
pub use retry::{MutationSignal, ResolutionRetry, RetryState};
pub use scoring::{HeuristicScorer, ScoredCandidate};

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::EngineError;
use crate::page::{EditableKind, ElementId, PageTree, ViewportInfo, is_interactable};
use crate::platform::{PlatformProfile, StructuralRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Platform,
    Generic,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    /// Element the overlay is drawn around.
    pub container: ElementId,
    /// Element text is written into; may equal the container.
    pub editable: ElementId,
    pub score: f64,
    pub resolved_at: Instant,
    pub tier: ResolutionTier,
    /// Name of the rule (or heuristic reasons) that produced the match.
    pub rule: String,
}

/// Resolves and caches the input target for one page session.
#[derive(Debug)]
pub struct TargetResolver {
    cache: Option<ResolvedTarget>,
    retry: ResolutionRetry,
    generic: Vec<StructuralRule>,
    scorer: HeuristicScorer,
}

impl TargetResolver {
    pub fn new(give_up: Duration) -> Self {
        Self {
            cache: None,
            retry: ResolutionRetry::new(give_up),
            generic: generic_rules(),
            scorer: HeuristicScorer::new(),
        }
    }

    pub fn cached(&self) -> Option<&ResolvedTarget> {
        self.cache.as_ref()
    }

    /// Cached target if both of its elements are still in the document.
    pub fn valid_cached<P: PageTree + ?Sized>(&self, page: &P) -> Option<&ResolvedTarget> {
        self.cache
            .as_ref()
            .filter(|t| page.is_connected(t.container) && page.is_connected(t.editable))
    }

    pub fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("Input target cache invalidated");
        }
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry.state()
    }

    /// Cached target, or a fresh resolution.
    pub fn resolve<P: PageTree + ?Sized>(
        &mut self,
        page: &P,
        profile: Option<&PlatformProfile>,
        now: Instant,
    ) -> Result<ResolvedTarget, EngineError> {
        if let Some(target) = self.valid_cached(page) {
            return Ok(target.clone());
        }
        self.cache = None;

        match self.find(page, profile, now) {
            Some(target) => {
                debug!(
                    "Resolved input target {} (editable {}) via {:?} rule '{}'",
                    target.container, target.editable, target.tier, target.rule
                );
                self.retry.record_success();
                self.cache = Some(target.clone());
                Ok(target)
            }
            None => {
                self.retry.record_failure(now);
                Err(EngineError::ResolutionFailure(format!(
                    "no candidate on {}",
                    page.url()
                )))
            }
        }
    }

    /// Whether a mutation should trigger another attempt while unresolved.
    pub fn should_retry(&mut self, signal: &MutationSignal, now: Instant) -> bool {
        self.retry.should_attempt(signal, now)
    }

    /// Run the tiers without touching the cache.
    pub fn find<P: PageTree + ?Sized>(
        &self,
        page: &P,
        profile: Option<&PlatformProfile>,
        now: Instant,
    ) -> Option<ResolvedTarget> {
        let viewport = page.viewport();

        if let Some(profile) = profile {
            if let Some(target) =
                resolve_by_rules(page, &profile.rules, ResolutionTier::Platform, 100.0, &viewport, now)
            {
                return Some(target);
            }
        }

        if let Some(target) =
            resolve_by_rules(page, &self.generic, ResolutionTier::Generic, 50.0, &viewport, now)
        {
            return Some(target);
        }

        let best = self.scorer.rank(page).into_iter().next()?;
        let editable = editable_within(page, best.id, &self.generic, &viewport)
            .unwrap_or(best.id);
        Some(ResolvedTarget {
            container: best.id,
            editable,
            score: best.score,
            resolved_at: now,
            tier: ResolutionTier::Heuristic,
            rule: best.reasons.join(","),
        })
    }
}

fn resolve_by_rules<P: PageTree + ?Sized>(
    page: &P,
    rules: &[StructuralRule],
    tier: ResolutionTier,
    base_score: f64,
    viewport: &ViewportInfo,
    now: Instant,
) -> Option<ResolvedTarget> {
    for (index, rule) in rules.iter().enumerate() {
        let candidates = rule.find(page, None);
        let Some(container) = pick_best(page, &candidates, viewport) else {
            continue;
        };
        let editable = editable_within(page, container, rules, viewport).unwrap_or(container);
        return Some(ResolvedTarget {
            container,
            editable,
            score: base_score - index as f64,
            resolved_at: now,
            tier,
            rule: rule.name.clone(),
        });
    }
    None
}

/// Highest-priority rule match inside the container that is itself editable,
/// else the best editable anywhere in the container.
fn editable_within<P: PageTree + ?Sized>(
    page: &P,
    container: ElementId,
    rules: &[StructuralRule],
    viewport: &ViewportInfo,
) -> Option<ElementId> {
    let is_editable = |id: &ElementId| {
        page.info(*id)
            .is_some_and(|i| i.editable_kind() != EditableKind::None)
    };

    rules
        .iter()
        .find_map(|rule| {
            let inner: Vec<ElementId> = rule
                .find(page, Some(container))
                .into_iter()
                .filter(|id| is_editable(id))
                .collect();
            pick_best(page, &inner, viewport)
        })
        .or_else(|| {
            let any: Vec<ElementId> = page
                .elements(Some(container))
                .into_iter()
                .filter(|id| is_interactable(page, *id))
                .filter(|id| is_editable(id))
                .collect();
            pick_best(page, &any, viewport)
        })
}

/// Largest area wins; equal areas go to the one whose bottom edge is closest
/// to the bottom of the viewport.
fn pick_best<P: PageTree + ?Sized>(
    page: &P,
    candidates: &[ElementId],
    viewport: &ViewportInfo,
) -> Option<ElementId> {
    let vh = viewport.height as f64;
    let mut best: Option<(ElementId, f64, f64)> = None;
    for id in candidates {
        let Some(info) = page.info(*id) else {
            continue;
        };
        let area = info.bbox.area();
        let distance = (vh - info.bbox.bottom()).abs();
        let better = match best {
            None => true,
            Some((_, best_area, best_distance)) => {
                if (area - best_area).abs() < 1.0 {
                    distance < best_distance
                } else {
                    area > best_area
                }
            }
        };
        if better {
            best = Some((*id, area, distance));
        }
    }
    best.map(|(id, _, _)| id)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
