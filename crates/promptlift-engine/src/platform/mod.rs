//! Platform profiles: per-site rules for finding the prompt input, the send
//! control and how writes must be committed.

mod builtin;
mod registry;
mod rules;

pub use registry::PlatformRegistry;
pub use rules::{Matcher, StructuralRule};

use promptlift_config::PlatformEntry;

use crate::error::EngineError;
use crate::injection::CommitStrategy;
use crate::overlay::AnchorCorner;

/// Which pages a profile applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlMatcher {
    pub hosts: Vec<String>,
    pub path_prefix: Option<String>,
}

impl UrlMatcher {
    pub fn new(hosts: &[&str]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            path_prefix: None,
        }
    }

    /// Host matches exactly or as a subdomain; path must start with the
    /// prefix if one is set.
    pub fn matches(&self, raw: &str) -> bool {
        let Ok(parsed) = url::Url::parse(raw) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let host_ok = self.hosts.iter().any(|h| {
            let h = h.to_ascii_lowercase();
            host == h || host.ends_with(&format!(".{h}"))
        });

        host_ok
            && self
                .path_prefix
                .as_deref()
                .is_none_or(|prefix| parsed.path().starts_with(prefix))
    }
}

/// What happens after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostInjectionAction {
    None,
    /// Invoke the page's own send control after a settle delay.
    ClickSend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformProfile {
    pub id: String,
    pub name: String,
    pub url: UrlMatcher,
    /// Editable-locating rules, highest priority first.
    pub rules: Vec<StructuralRule>,
    pub send_rules: Vec<StructuralRule>,
    pub anchor_hint: AnchorCorner,
    /// Preferred strategies; empty means the defaults for the element kind.
    pub commit_order: Vec<CommitStrategy>,
    pub post_action: PostInjectionAction,
    pub launch_url: String,
}

impl TryFrom<&PlatformEntry> for PlatformProfile {
    type Error = EngineError;

    fn try_from(entry: &PlatformEntry) -> Result<Self, Self::Error> {
        let invalid = |message: String| EngineError::InvalidProfile {
            id: entry.id.clone(),
            message,
        };

        if entry.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if entry.hosts.is_empty() {
            return Err(invalid("at least one host is required".to_string()));
        }

        let anchor_hint = match &entry.anchor {
            Some(raw) => raw.parse().map_err(invalid)?,
            None => AnchorCorner::BottomRight,
        };

        let commit_order = entry
            .commit_order
            .iter()
            .map(|s| s.parse::<CommitStrategy>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        let launch_url = entry
            .launch_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/", entry.hosts[0]));

        Ok(Self {
            id: entry.id.clone(),
            name: entry.name.clone().unwrap_or_else(|| entry.id.clone()),
            url: UrlMatcher {
                hosts: entry.hosts.clone(),
                path_prefix: entry.path_prefix.clone(),
            },
            rules: entry.rules.iter().map(StructuralRule::from).collect(),
            send_rules: entry.send_rules.iter().map(StructuralRule::from).collect(),
            anchor_hint,
            commit_order,
            post_action: if entry.auto_send {
                PostInjectionAction::ClickSend
            } else {
                PostInjectionAction::None
            },
            launch_url,
        })
    }
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
