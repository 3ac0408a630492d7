//! In-memory page built from a JSON snapshot.
//!
//! Used by the CLI to run the engine against a captured page and by tests to
//! model host behavior, including frameworks that silently discard some kinds
//! of writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    BoundingBox, ComputedStyle, EditableKind, ElementId, ElementInfo, HostEvent, InputType, Layer,
    LayerId, LayerKind, PageError, PageTree, ViewportInfo,
};

/// Write behaviors of a host framework that ignores or rejects some writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteQuirks {
    /// Direct value assignment is reverted by the host.
    pub ignore_value_assignment: bool,
    /// Raw content replacement is reverted by the host.
    pub ignore_content_replacement: bool,
    /// `insert_text` is refused.
    pub reject_insert_text: bool,
}

/// One node of a captured page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Lookup key for tests and CLI output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub quirks: WriteQuirks,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            key: None,
            tag: tag.into(),
            attributes: BTreeMap::new(),
            style: ComputedStyle::default(),
            bbox: BoundingBox::default(),
            text: String::new(),
            value: String::new(),
            quirks: WriteQuirks::default(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn bbox(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = BoundingBox::new(x, y, width, height);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn quirks(mut self, quirks: WriteQuirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Top-level snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub viewport: ViewportInfo,
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone)]
struct Node {
    key: Option<String>,
    info: ElementInfo,
    value: String,
    quirks: WriteQuirks,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    connected: bool,
}

/// Arena-backed [`PageTree`].
#[derive(Debug, Clone)]
pub struct SnapshotPage {
    url: String,
    viewport: ViewportInfo,
    nodes: Vec<Node>,
    roots: Vec<ElementId>,
    layers: BTreeMap<LayerId, Layer>,
    next_layer: u64,
    focused: Option<ElementId>,
    selected_all: Option<ElementId>,
    events: Vec<(ElementId, HostEvent)>,
    clicks: Vec<ElementId>,
    scrolls: Vec<ElementId>,
}

impl SnapshotPage {
    pub fn new(url: impl Into<String>, viewport: ViewportInfo) -> Self {
        Self {
            url: url.into(),
            viewport,
            nodes: Vec::new(),
            roots: Vec::new(),
            layers: BTreeMap::new(),
            next_layer: 1,
            focused: None,
            selected_all: None,
            events: Vec::new(),
            clicks: Vec::new(),
            scrolls: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: PageSnapshot) -> Self {
        let mut page = Self::new(snapshot.url, snapshot.viewport);
        for node in snapshot.nodes {
            page.append(None, node);
        }
        page
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    /// Add a subtree under `parent` (or as a root), returning its id.
    pub fn append(&mut self, parent: Option<ElementId>, node: SnapshotNode) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        let connected = parent.is_none_or(|p| self.is_connected(p));
        let SnapshotNode {
            key,
            tag,
            attributes,
            style,
            bbox,
            text,
            value,
            quirks,
            children,
        } = node;

        self.nodes.push(Node {
            key,
            info: ElementInfo {
                tag: tag.to_ascii_lowercase(),
                attributes,
                style,
                bbox,
                text,
            },
            value,
            quirks,
            parent,
            children: Vec::new(),
            connected,
        });

        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(p.0 as usize) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        for child in children {
            self.append(Some(id), child);
        }
        id
    }

    /// First connected node carrying `key`.
    pub fn find(&self, key: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, n)| n.connected && n.key.as_deref() == Some(key))
            .map(|(i, _)| ElementId(i as u64))
    }

    /// Remove a subtree from the document, as a host re-render would.
    pub fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
                p.children.retain(|c| *c != id);
            }
        } else {
            self.roots.retain(|r| *r != id);
        }
        self.disconnect(id);
    }

    pub fn set_bbox(&mut self, id: ElementId, bbox: BoundingBox) {
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            node.info.bbox = bbox;
        }
    }

    /// Shift a subtree, as a layout change would.
    pub fn translate(&mut self, id: ElementId, dx: f64, dy: f64) {
        let ids = self.subtree(id);
        for i in ids {
            if let Some(node) = self.nodes.get_mut(i.0 as usize) {
                node.info.bbox.x += dx;
                node.info.bbox.y += dy;
            }
        }
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: Option<&str>) {
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            match value {
                Some(v) => {
                    node.info.attributes.insert(name.to_string(), v.to_string());
                }
                None => {
                    node.info.attributes.remove(name);
                }
            }
        }
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    pub fn layers_of(&self, kind: LayerKind) -> Vec<&Layer> {
        self.layers.values().filter(|l| l.kind == kind).collect()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn events_for(&self, id: ElementId) -> Vec<&HostEvent> {
        self.events
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn clicks(&self) -> &[ElementId] {
        &self.clicks
    }

    pub fn scrolls(&self) -> &[ElementId] {
        &self.scrolls
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn writable(&mut self, id: ElementId) -> Result<&mut Node, PageError> {
        let node = self
            .nodes
            .get_mut(id.0 as usize)
            .ok_or(PageError::ElementNotFound(id))?;
        if !node.connected {
            return Err(PageError::Detached(id));
        }
        Ok(node)
    }

    fn disconnect(&mut self, id: ElementId) {
        for i in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(i.0 as usize) {
                node.connected = false;
            }
        }
        if self.focused.is_some_and(|f| !self.is_connected(f)) {
            self.focused = None;
        }
    }

    fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                out.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        if let Some(node) = self.node(id) {
            out.push_str(&node.info.text);
            for child in &node.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Set rich content, dropping child nodes the way `textContent =` does.
    fn set_content(&mut self, id: ElementId, text: &str) {
        let children = self
            .node(id)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.disconnect(child);
        }
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            node.children.clear();
            node.info.text = text.to_string();
        }
    }
}

impl PageTree for SnapshotPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn viewport(&self) -> ViewportInfo {
        self.viewport
    }

    fn elements(&self, scope: Option<ElementId>) -> Vec<ElementId> {
        match scope {
            Some(id) if self.is_connected(id) => self.subtree(id),
            Some(_) => Vec::new(),
            None => self
                .roots
                .iter()
                .flat_map(|r| self.subtree(*r))
                .collect(),
        }
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn info(&self, id: ElementId) -> Option<ElementInfo> {
        self.node(id).map(|n| n.info.clone())
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.node(id).is_some_and(|n| n.connected)
    }

    fn read_text(&self, id: ElementId) -> Option<String> {
        let node = self.node(id)?;
        if node.info.editable_kind() == EditableKind::TextControl {
            return Some(node.value.clone());
        }
        let mut out = String::new();
        self.collect_text(id, &mut out);
        Some(out)
    }

    fn assign_value(&mut self, id: ElementId, text: &str) -> Result<(), PageError> {
        let node = self.writable(id)?;
        if node.info.editable_kind() != EditableKind::TextControl {
            return Err(PageError::NotEditable(id));
        }
        if !node.quirks.ignore_value_assignment {
            node.value = text.to_string();
        }
        self.selected_all = None;
        Ok(())
    }

    fn replace_content(&mut self, id: ElementId, text: &str) -> Result<(), PageError> {
        let ignore = self.writable(id)?.quirks.ignore_content_replacement;
        if !ignore {
            self.set_content(id, text);
        }
        self.selected_all = None;
        Ok(())
    }

    fn focus(&mut self, id: ElementId) -> Result<(), PageError> {
        self.writable(id)?;
        if self.focused != Some(id) {
            self.selected_all = None;
        }
        self.focused = Some(id);
        self.events.push((id, HostEvent::Focus));
        Ok(())
    }

    fn select_all(&mut self, id: ElementId) -> Result<(), PageError> {
        self.writable(id)?;
        self.selected_all = Some(id);
        Ok(())
    }

    fn insert_text(&mut self, id: ElementId, text: &str) -> Result<bool, PageError> {
        let node = self.writable(id)?;
        if node.quirks.reject_insert_text || node.info.editable_kind() == EditableKind::None {
            return Ok(false);
        }
        if self.focused != Some(id) {
            return Ok(false);
        }

        let replace = self.selected_all == Some(id);
        let current = self.read_text(id).unwrap_or_default();
        let next = if replace {
            text.to_string()
        } else {
            format!("{current}{text}")
        };

        let is_control = self
            .node(id)
            .is_some_and(|n| n.info.editable_kind() == EditableKind::TextControl);
        if is_control {
            if let Some(node) = self.nodes.get_mut(id.0 as usize) {
                node.value = next;
            }
        } else {
            self.set_content(id, &next);
        }

        self.selected_all = None;
        self.events.push((
            id,
            HostEvent::Input {
                input_type: InputType::InsertText,
            },
        ));
        Ok(true)
    }

    fn dispatch(&mut self, id: ElementId, event: HostEvent) -> Result<(), PageError> {
        self.writable(id)?;
        self.events.push((id, event));
        Ok(())
    }

    fn click(&mut self, id: ElementId) -> Result<(), PageError> {
        self.writable(id)?;
        self.clicks.push(id);
        Ok(())
    }

    fn scroll_to_end(&mut self, id: ElementId) -> Result<(), PageError> {
        self.writable(id)?;
        self.scrolls.push(id);
        Ok(())
    }

    fn mount_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(id, layer);
        id
    }

    fn update_layer(&mut self, id: LayerId, layer: Layer) -> Result<(), PageError> {
        match self.layers.get_mut(&id) {
            Some(slot) => {
                *slot = layer;
                Ok(())
            }
            None => Err(PageError::LayerNotFound(id)),
        }
    }

    fn remove_layer(&mut self, id: LayerId) {
        self.layers.remove(&id);
    }
}
