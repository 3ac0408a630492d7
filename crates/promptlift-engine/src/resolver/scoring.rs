//! Last-resort heuristic scoring of composer-like containers.
//!
//! Each signal contributes points and a reason string so a resolution can be
//! explained in logs.

use crate::page::{BoundingBox, EditableKind, ElementId, ElementInfo, PageTree, ViewportInfo, is_interactable};

/// Minimum score for a heuristic candidate to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 3.0;

const SEND_WORDS: [&str; 4] = ["send", "submit", "ask", "arrow-up"];
const ENTRY_HINTS: [&str; 5] = ["input", "editor", "composer", "prompt", "textbox"];

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: ElementId,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every interactable element that looks like, or contains, a text
    /// entry. Best first.
    pub fn rank<P: PageTree + ?Sized>(&self, page: &P) -> Vec<ScoredCandidate> {
        let viewport = page.viewport();
        let mut ranked: Vec<ScoredCandidate> = page
            .elements(None)
            .into_iter()
            .filter(|id| is_interactable(page, *id))
            .filter_map(|id| {
                let info = page.info(id)?;
                let entries = entry_descendants(page, id);
                if !looks_like_entry(&info) && entries.is_empty() {
                    return None;
                }
                let (score, reasons) = Self::calculate_score(page, id, &info, &entries, &viewport);
                Some(ScoredCandidate { id, score, reasons })
            })
            .filter(|c| c.score >= ACCEPT_THRESHOLD)
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn calculate_score<P: PageTree + ?Sized>(
        page: &P,
        id: ElementId,
        info: &ElementInfo,
        entries: &[BoundingBox],
        viewport: &ViewportInfo,
    ) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut reasons = Vec::new();

        if looks_like_entry(info) {
            score += 1.0;
            reasons.push("entry_like".to_string());
        }

        if has_send_control_nearby(page, id) {
            score += 3.0;
            reasons.push("send_control_nearby".to_string());
        }

        let framing = info.framing_signals();
        if framing > 0 {
            score += 0.5 * framing as f64;
            reasons.push(format!("framing:{framing}"));
        }

        // Wider than the entry it frames, but not a whole-page wrapper.
        if let Some(widest) = entries.iter().map(|b| b.width).reduce(f64::max) {
            let margin = info.bbox.width - widest;
            if (8.0..=400.0).contains(&margin) {
                score += 1.5;
                reasons.push("frames_entry".to_string());
            }
        } else if info.bbox.width >= viewport.width as f64 * 0.3 {
            score += 1.0;
            reasons.push("wide_entry".to_string());
        }

        let center_y = info.bbox.center().y;
        if center_y >= viewport.height as f64 * 0.6 {
            score += 2.0;
            reasons.push("lower_viewport".to_string());
        }

        (score, reasons)
    }
}

fn looks_like_entry(info: &ElementInfo) -> bool {
    if info.editable_kind() != EditableKind::None {
        return true;
    }
    if info.attributes.contains_key("placeholder")
        || info.attributes.contains_key("data-placeholder")
        || info.attr("aria-multiline") == Some("true")
    {
        return true;
    }
    let class = info.attr("class").unwrap_or("").to_lowercase();
    ENTRY_HINTS.iter().any(|h| class.contains(h))
}

fn entry_descendants<P: PageTree + ?Sized>(page: &P, id: ElementId) -> Vec<BoundingBox> {
    page.elements(Some(id))
        .into_iter()
        .skip(1)
        .filter_map(|d| page.info(d))
        .filter(|i| i.is_visible() && looks_like_entry(i))
        .map(|i| i.bbox)
        .collect()
}

fn is_send_like(info: &ElementInfo) -> bool {
    let is_button = info.tag == "button" || info.attr("role") == Some("button");
    if !is_button {
        return false;
    }
    let label = info.label();
    let class = info.attr("class").unwrap_or("").to_lowercase();
    info.attr("type") == Some("submit")
        || SEND_WORDS
            .iter()
            .any(|w| label.contains(w) || class.contains(w))
}

/// A send-like control inside the element or among its parent's children.
fn has_send_control_nearby<P: PageTree + ?Sized>(page: &P, id: ElementId) -> bool {
    let scope = page.parent(id).unwrap_or(id);
    page.elements(Some(scope))
        .into_iter()
        .filter_map(|e| page.info(e))
        .any(|i| i.is_visible() && is_send_like(&i))
}
