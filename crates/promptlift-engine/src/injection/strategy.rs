//! Commit strategies for writing text into host editables.
//!
//! Host frameworks keep their own model of the input. A write only counts
//! once reading the element back yields the text, so every strategy is
//! followed by [`verify`] and the next strategy is tried on mismatch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::page::{EditableKind, ElementId, HostEvent, InputType, PageTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Assign the control's value and fire input/change.
    ValueAssignment,
    /// Replace the editable region's content and fire input.
    ContentReplacement,
    /// Focus, clear, then insert through the host's insertion path.
    PasteEquivalent,
    /// Focus, select everything, then insert over the selection.
    SelectAllInsert,
}

impl CommitStrategy {
    pub const ALL: [CommitStrategy; 4] = [
        CommitStrategy::ValueAssignment,
        CommitStrategy::ContentReplacement,
        CommitStrategy::PasteEquivalent,
        CommitStrategy::SelectAllInsert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStrategy::ValueAssignment => "value_assignment",
            CommitStrategy::ContentReplacement => "content_replacement",
            CommitStrategy::PasteEquivalent => "paste_equivalent",
            CommitStrategy::SelectAllInsert => "select_all_insert",
        }
    }

    /// Default order: the primary strategy for the element kind, then the
    /// fixed fallback sequence.
    pub fn default_order(kind: EditableKind) -> Vec<CommitStrategy> {
        let primary = match kind {
            EditableKind::TextControl => CommitStrategy::ValueAssignment,
            _ => CommitStrategy::ContentReplacement,
        };
        vec![
            primary,
            CommitStrategy::PasteEquivalent,
            CommitStrategy::SelectAllInsert,
        ]
    }

    /// Whether the strategy can apply to this kind of element at all.
    pub fn supports(&self, kind: EditableKind) -> bool {
        match self {
            CommitStrategy::ValueAssignment => kind == EditableKind::TextControl,
            CommitStrategy::ContentReplacement => kind != EditableKind::TextControl,
            _ => true,
        }
    }

    /// Perform the write. Does not verify.
    pub fn apply<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        id: ElementId,
        text: &str,
    ) -> Result<(), EngineError> {
        match self {
            CommitStrategy::ValueAssignment => {
                page.assign_value(id, text)?;
                page.dispatch(
                    id,
                    HostEvent::Input {
                        input_type: InputType::InsertReplacementText,
                    },
                )?;
                page.dispatch(id, HostEvent::Change)?;
            }
            CommitStrategy::ContentReplacement => {
                page.replace_content(id, text)?;
                page.dispatch(
                    id,
                    HostEvent::Input {
                        input_type: InputType::InsertReplacementText,
                    },
                )?;
            }
            CommitStrategy::PasteEquivalent => {
                page.focus(id)?;
                clear(page, id)?;
                if !text.is_empty() && !page.insert_text(id, text)? {
                    return Err(rejected(*self));
                }
                page.dispatch(
                    id,
                    HostEvent::Input {
                        input_type: InputType::InsertFromPaste,
                    },
                )?;
            }
            CommitStrategy::SelectAllInsert => {
                page.focus(id)?;
                page.select_all(id)?;
                if text.is_empty() {
                    clear(page, id)?;
                } else if !page.insert_text(id, text)? {
                    return Err(rejected(*self));
                }
                page.dispatch(
                    id,
                    HostEvent::Input {
                        input_type: InputType::InsertText,
                    },
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitStrategy::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown commit strategy '{s}'"))
    }
}

/// Strategy order for an element: the platform's preference first, then the
/// defaults, skipping strategies the element kind cannot take.
pub fn order_for(kind: EditableKind, preferred: &[CommitStrategy]) -> Vec<CommitStrategy> {
    let mut order: Vec<CommitStrategy> = Vec::new();
    for strategy in preferred
        .iter()
        .copied()
        .chain(CommitStrategy::default_order(kind))
    {
        if strategy.supports(kind) && !order.contains(&strategy) {
            order.push(strategy);
        }
    }
    order
}

/// Read the element back and compare, ignoring whitespace differences that
/// rich editors introduce.
pub fn verify<P: PageTree + ?Sized>(page: &P, id: ElementId, expected: &str) -> bool {
    page.read_text(id)
        .is_some_and(|actual| normalize(&actual) == normalize(expected))
}

pub fn normalize(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn clear<P: PageTree + ?Sized>(page: &mut P, id: ElementId) -> Result<(), EngineError> {
    let kind = page
        .info(id)
        .map(|i| i.editable_kind())
        .unwrap_or(EditableKind::None);
    match kind {
        EditableKind::TextControl => page.assign_value(id, "")?,
        _ => page.replace_content(id, "")?,
    }
    Ok(())
}

fn rejected(strategy: CommitStrategy) -> EngineError {
    EngineError::InjectionFailure {
        attempts: 1,
        message: format!("host rejected insertion via {strategy}"),
    }
}
