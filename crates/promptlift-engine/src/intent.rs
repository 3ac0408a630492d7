//! Coarse intent classification sent along with rewrite requests.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentHint {
    Coding,
    Writing,
    Research,
    Analysis,
    General,
}

const CODING: &[&str] = &[
    "code", "function", "bug", "error", "compile", "rust", "python", "javascript", "typescript",
    "api", "sql", "regex", "refactor", "stack trace", "debug",
];
const WRITING: &[&str] = &[
    "write", "essay", "email", "story", "poem", "blog", "rewrite", "draft", "tone", "letter",
    "article",
];
const RESEARCH: &[&str] = &[
    "research", "sources", "find", "what is", "who", "history", "explain", "latest", "compare",
    "references",
];
const ANALYSIS: &[&str] = &[
    "analyze", "analyse", "data", "trend", "statistics", "evaluate", "pros and cons", "metrics",
    "breakdown", "chart",
];

impl IntentHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentHint::Coding => "coding",
            IntentHint::Writing => "writing",
            IntentHint::Research => "research",
            IntentHint::Analysis => "analysis",
            IntentHint::General => "general",
        }
    }

    /// Keyword vote; ties resolve in declaration order, no hits is `General`.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let hits = |words: &[&str]| words.iter().filter(|w| lower.contains(*w)).count();

        let mut best = (IntentHint::General, 0);
        for (hint, words) in [
            (IntentHint::Coding, CODING),
            (IntentHint::Writing, WRITING),
            (IntentHint::Research, RESEARCH),
            (IntentHint::Analysis, ANALYSIS),
        ] {
            let count = hits(words);
            if count > best.1 {
                best = (hint, count);
            }
        }
        best.0
    }
}

impl fmt::Display for IntentHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
