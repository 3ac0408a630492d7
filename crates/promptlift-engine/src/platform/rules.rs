//! Declarative structural rules for locating elements.

use promptlift_config::{MatcherEntry, RuleEntry};

use crate::page::{EditableKind, ElementId, ElementInfo, PageTree, is_interactable};

/// A single predicate over one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Tag(String),
    /// Attribute present and containing the substring (case-insensitive).
    AttributeContains { name: String, value: String },
    HasAttribute(String),
    Role(String),
    /// Any editable kind.
    Editable,
}

impl Matcher {
    pub fn matches(&self, info: &ElementInfo) -> bool {
        match self {
            Matcher::Tag(tag) => info.tag.eq_ignore_ascii_case(tag),
            Matcher::AttributeContains { name, value } => info
                .attr(name)
                .is_some_and(|v| v.to_lowercase().contains(&value.to_lowercase())),
            Matcher::HasAttribute(name) => info.attributes.contains_key(name),
            Matcher::Role(role) => info.attr("role") == Some(role.as_str()),
            Matcher::Editable => info.editable_kind() != EditableKind::None,
        }
    }
}

impl From<&MatcherEntry> for Matcher {
    fn from(entry: &MatcherEntry) -> Self {
        match entry {
            MatcherEntry::Tag { name } => Matcher::Tag(name.clone()),
            MatcherEntry::Attribute { name, contains } => Matcher::AttributeContains {
                name: name.clone(),
                value: contains.clone(),
            },
            MatcherEntry::HasAttribute { name } => Matcher::HasAttribute(name.clone()),
            MatcherEntry::Role { role } => Matcher::Role(role.clone()),
            MatcherEntry::Editable => Matcher::Editable,
        }
    }
}

/// Conjunction of matchers with a name for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralRule {
    pub name: String,
    pub matchers: Vec<Matcher>,
}

impl StructuralRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matchers: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.matchers.push(Matcher::Tag(tag.to_string()));
        self
    }

    pub fn attr(mut self, name: &str, contains: &str) -> Self {
        self.matchers.push(Matcher::AttributeContains {
            name: name.to_string(),
            value: contains.to_string(),
        });
        self
    }

    pub fn has_attr(mut self, name: &str) -> Self {
        self.matchers.push(Matcher::HasAttribute(name.to_string()));
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.matchers.push(Matcher::Role(role.to_string()));
        self
    }

    pub fn editable(mut self) -> Self {
        self.matchers.push(Matcher::Editable);
        self
    }

    pub fn matches(&self, info: &ElementInfo) -> bool {
        !self.matchers.is_empty() && self.matchers.iter().all(|m| m.matches(info))
    }

    /// Visible, enabled elements under `scope` matching this rule.
    pub fn find<P: PageTree + ?Sized>(&self, page: &P, scope: Option<ElementId>) -> Vec<ElementId> {
        page.elements(scope)
            .into_iter()
            .filter(|id| is_interactable(page, *id))
            .filter(|id| page.info(*id).is_some_and(|info| self.matches(&info)))
            .collect()
    }
}

impl From<&RuleEntry> for StructuralRule {
    fn from(entry: &RuleEntry) -> Self {
        let matchers: Vec<Matcher> = entry.matchers.iter().map(Matcher::from).collect();
        let name = entry.name.clone().unwrap_or_else(|| {
            matchers
                .iter()
                .map(|m| match m {
                    Matcher::Tag(t) => t.clone(),
                    Matcher::AttributeContains { name, value } => format!("[{name}*={value}]"),
                    Matcher::HasAttribute(name) => format!("[{name}]"),
                    Matcher::Role(role) => format!("[role={role}]"),
                    Matcher::Editable => ":editable".to_string(),
                })
                .collect::<String>()
        });
        Self { name, matchers }
    }
}
