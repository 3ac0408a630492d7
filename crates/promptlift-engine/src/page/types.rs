//! Shared page types: viewport, geometry, computed style and element info.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Visible area of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportInfo {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Default for ViewportInfo {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rect in viewport coordinates (`getBoundingClientRect`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Edges inclusive.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Grow the box by `padding` on every side.
    pub fn expand(&self, padding: f64) -> BoundingBox {
        BoundingBox {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }

    /// Positive-area overlap; touching edges do not count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let overlap_w = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        overlap_w > 0.0 && overlap_h > 0.0
    }

    /// At least partly on screen.
    pub fn is_visible_in_viewport(&self, viewport: &ViewportInfo) -> bool {
        self.intersects(&BoundingBox::new(
            0.0,
            0.0,
            f64::from(viewport.width),
            f64::from(viewport.height),
        ))
    }

    /// Same box within half a pixel on every edge.
    pub fn approx_eq(&self, other: &BoundingBox) -> bool {
        (self.x - other.x).abs() < 0.5
            && (self.y - other.y).abs() < 0.5
            && (self.width - other.width).abs() < 0.5
            && (self.height - other.height).abs() < 0.5
    }
}

/// The computed style properties the engine looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub border_width: f64,
    #[serde(default)]
    pub border_radius: f64,
    #[serde(default)]
    pub box_shadow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

fn default_display() -> String {
    "block".to_string()
}

fn default_visibility() -> String {
    "visible".to_string()
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: default_display(),
            visibility: default_visibility(),
            border_width: 0.0,
            border_radius: 0.0,
            box_shadow: false,
            background: None,
        }
    }
}

/// How text is written into an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableKind {
    /// `input` / `textarea`, written through their value.
    TextControl,
    /// `contenteditable` or `role="textbox"` regions.
    RichText,
    None,
}

const TEXT_INPUT_TYPES: [&str; 5] = ["", "text", "search", "email", "url"];

/// A read-only view of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Tag name (lowercase).
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub bbox: BoundingBox,
    /// Direct text only, not from children.
    #[serde(default)]
    pub text: String,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_visible(&self) -> bool {
        !self.bbox.is_empty()
            && self.style.display != "none"
            && self.style.visibility != "hidden"
            && !self.attributes.contains_key("hidden")
    }

    pub fn is_disabled(&self) -> bool {
        self.attributes.contains_key("disabled") || self.attr("aria-disabled") == Some("true")
    }

    pub fn editable_kind(&self) -> EditableKind {
        match self.tag.as_str() {
            "textarea" => return EditableKind::TextControl,
            "input" => {
                let input_type = self.attr("type").unwrap_or("").to_ascii_lowercase();
                return if TEXT_INPUT_TYPES.contains(&input_type.as_str()) {
                    EditableKind::TextControl
                } else {
                    EditableKind::None
                };
            }
            _ => {}
        }

        match self.attr("contenteditable") {
            Some(v) if v.is_empty() || v == "true" || v == "plaintext-only" => {
                return EditableKind::RichText;
            }
            _ => {}
        }

        if self.attr("role") == Some("textbox") {
            EditableKind::RichText
        } else {
            EditableKind::None
        }
    }

    /// Lowercased accessible label: aria-label, then title, then text.
    pub fn label(&self) -> String {
        self.attr("aria-label")
            .or_else(|| self.attr("title"))
            .unwrap_or(&self.text)
            .to_lowercase()
    }

    /// Border, shadow, rounded corners or a background.
    pub fn framing_signals(&self) -> usize {
        [
            self.style.border_width > 0.0,
            self.style.box_shadow,
            self.style.border_radius >= 4.0,
            self.style.background.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }
}
