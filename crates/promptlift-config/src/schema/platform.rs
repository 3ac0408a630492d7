//! Platform profile entries as they appear in configuration.
//!
//! These are plain data. The engine converts them into typed profiles and
//! rejects entries it cannot interpret.

use serde::{Deserialize, Serialize};

/// A platform profile declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Host names (or suffixes) this platform is served from.
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Page opened when text is sent to this platform from elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_url: Option<String>,

    /// Rules locating the editable, highest priority first.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,

    /// Rules locating the platform's own send control.
    #[serde(default)]
    pub send_rules: Vec<RuleEntry>,

    /// Preferred corner for the action control (`top_left`, `bottom_right`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,

    /// Write strategies to try, in order.
    #[serde(default)]
    pub commit_order: Vec<String>,

    /// Click the send control after writing.
    #[serde(default)]
    pub auto_send: bool,
}

/// One structural rule: every matcher must hold for an element to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub matchers: Vec<MatcherEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum MatcherEntry {
    Tag { name: String },
    Attribute { name: String, contains: String },
    HasAttribute { name: String },
    Role { role: String },
    Editable,
}
