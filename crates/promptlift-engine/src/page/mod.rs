//! Host page abstraction.
//!
//! The engine never touches a concrete DOM. Everything it needs from the
//! host (querying elements, reading geometry, writing text, mounting its own
//! layers) goes through [`PageTree`], so the same resolution and injection
//! logic runs against a live page adapter or an in-memory [`SnapshotPage`].

mod snapshot;
mod types;

pub use snapshot::{PageSnapshot, SnapshotNode, SnapshotPage, WriteQuirks};
pub use types::{BoundingBox, ComputedStyle, EditableKind, ElementInfo, Point, ViewportInfo};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to an element in the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a layer mounted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

/// Errors raised by page operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PageError {
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Element detached from document: {0}")]
    Detached(ElementId),

    #[error("Element is not editable: {0}")]
    NotEditable(ElementId),

    #[error("Layer not found: {0:?}")]
    LayerNotFound(LayerId),
}

/// Kind of input event, mirroring `InputEvent.inputType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    InsertText,
    InsertFromPaste,
    InsertReplacementText,
}

/// Synthetic events dispatched so host frameworks observe a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    Focus,
    Input { input_type: InputType },
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Overlay,
    Control,
    Anchor,
    Cursor,
    Emphasis,
    Notice,
}

/// A visual element owned by the engine, drawn above the host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub visible: bool,
}

impl Layer {
    pub fn new(kind: LayerKind, bbox: BoundingBox) -> Self {
        Self {
            kind,
            bbox,
            text: None,
            visible: true,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Synchronous access to the host element tree.
///
/// Implementations must reflect host mutations immediately: a node removed by
/// the host reports `is_connected == false` from then on.
pub trait PageTree {
    fn url(&self) -> String;

    fn viewport(&self) -> ViewportInfo;

    /// Connected elements in document order. With a scope, the scope itself
    /// comes first followed by its descendants.
    fn elements(&self, scope: Option<ElementId>) -> Vec<ElementId>;

    fn parent(&self, id: ElementId) -> Option<ElementId>;

    fn info(&self, id: ElementId) -> Option<ElementInfo>;

    fn is_connected(&self, id: ElementId) -> bool;

    /// Current text content: the value for text controls, otherwise the
    /// concatenated text of the subtree.
    fn read_text(&self, id: ElementId) -> Option<String>;

    fn assign_value(&mut self, id: ElementId, text: &str) -> Result<(), PageError>;

    fn replace_content(&mut self, id: ElementId, text: &str) -> Result<(), PageError>;

    fn focus(&mut self, id: ElementId) -> Result<(), PageError>;

    fn select_all(&mut self, id: ElementId) -> Result<(), PageError>;

    /// Host-accepted text insertion at the caret, replacing any selection.
    /// Returns `false` when the host refuses the insertion.
    fn insert_text(&mut self, id: ElementId, text: &str) -> Result<bool, PageError>;

    fn dispatch(&mut self, id: ElementId, event: HostEvent) -> Result<(), PageError>;

    fn click(&mut self, id: ElementId) -> Result<(), PageError>;

    fn scroll_to_end(&mut self, id: ElementId) -> Result<(), PageError>;

    fn mount_layer(&mut self, layer: Layer) -> LayerId;

    fn update_layer(&mut self, id: LayerId, layer: Layer) -> Result<(), PageError>;

    fn remove_layer(&mut self, id: LayerId);
}

/// Visible, enabled and connected.
pub fn is_interactable<P: PageTree + ?Sized>(page: &P, id: ElementId) -> bool {
    page.is_connected(id)
        && page
            .info(id)
            .is_some_and(|info| info.is_visible() && !info.is_disabled())
}

/// Walk up from `id` (exclusive), nearest first.
pub fn ancestors<P: PageTree + ?Sized>(page: &P, id: ElementId) -> Vec<ElementId> {
    let mut out = Vec::new();
    let mut current = page.parent(id);
    while let Some(p) = current {
        out.push(p);
        current = page.parent(p);
    }
    out
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
