//! Site-independent input patterns, tried when no platform rule matches.

use crate::platform::StructuralRule;

pub fn generic_rules() -> Vec<StructuralRule> {
    vec![
        StructuralRule::new("contenteditable").attr("contenteditable", "true"),
        StructuralRule::new("contenteditable-plaintext")
            .attr("contenteditable", "plaintext-only"),
        StructuralRule::new("role-textbox").role("textbox"),
        StructuralRule::new("textarea").tag("textarea"),
        StructuralRule::new("text-input").tag("input").attr("type", "text"),
        StructuralRule::new("search-input")
            .tag("input")
            .attr("type", "search"),
    ]
}
