//! Built-in profiles for the supported chat sites.

use super::{PlatformProfile, PostInjectionAction, StructuralRule, UrlMatcher};
use crate::injection::CommitStrategy;
use crate::overlay::AnchorCorner;

fn send_button(label: &str) -> StructuralRule {
    StructuralRule::new(format!("send-button[{label}]"))
        .tag("button")
        .attr("aria-label", label)
}

fn chatgpt() -> PlatformProfile {
    PlatformProfile {
        id: "chatgpt".to_string(),
        name: "ChatGPT".to_string(),
        url: UrlMatcher::new(&["chatgpt.com", "chat.openai.com"]),
        rules: vec![
            StructuralRule::new("prompt-textarea").attr("id", "prompt-textarea"),
            StructuralRule::new("prosemirror")
                .editable()
                .attr("class", "ProseMirror"),
            StructuralRule::new("composer-textarea")
                .tag("textarea")
                .attr("placeholder", "message"),
        ],
        send_rules: vec![
            StructuralRule::new("send-button-testid")
                .tag("button")
                .attr("data-testid", "send-button"),
            send_button("send"),
        ],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: vec![
            CommitStrategy::SelectAllInsert,
            CommitStrategy::ContentReplacement,
        ],
        post_action: PostInjectionAction::None,
        launch_url: "https://chatgpt.com/".to_string(),
    }
}

fn claude() -> PlatformProfile {
    PlatformProfile {
        id: "claude".to_string(),
        name: "Claude".to_string(),
        url: UrlMatcher::new(&["claude.ai"]),
        rules: vec![
            StructuralRule::new("prosemirror")
                .editable()
                .attr("class", "ProseMirror"),
            StructuralRule::new("prompt-textbox")
                .role("textbox")
                .attr("aria-label", "prompt"),
        ],
        send_rules: vec![send_button("send")],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: vec![
            CommitStrategy::PasteEquivalent,
            CommitStrategy::SelectAllInsert,
        ],
        post_action: PostInjectionAction::None,
        launch_url: "https://claude.ai/new".to_string(),
    }
}

fn gemini() -> PlatformProfile {
    PlatformProfile {
        id: "gemini".to_string(),
        name: "Gemini".to_string(),
        url: UrlMatcher::new(&["gemini.google.com"]),
        rules: vec![
            StructuralRule::new("ql-editor")
                .editable()
                .attr("class", "ql-editor"),
            StructuralRule::new("prompt-textbox")
                .role("textbox")
                .attr("aria-label", "prompt"),
        ],
        send_rules: vec![send_button("send")],
        anchor_hint: AnchorCorner::TopRight,
        commit_order: vec![CommitStrategy::SelectAllInsert],
        post_action: PostInjectionAction::ClickSend,
        launch_url: "https://gemini.google.com/app".to_string(),
    }
}

fn perplexity() -> PlatformProfile {
    PlatformProfile {
        id: "perplexity".to_string(),
        name: "Perplexity".to_string(),
        url: UrlMatcher::new(&["perplexity.ai"]),
        rules: vec![
            StructuralRule::new("ask-input").editable().attr("id", "ask-input"),
            StructuralRule::new("ask-textarea")
                .tag("textarea")
                .attr("placeholder", "ask"),
        ],
        send_rules: vec![send_button("submit")],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: Vec::new(),
        post_action: PostInjectionAction::ClickSend,
        launch_url: "https://www.perplexity.ai/".to_string(),
    }
}

fn deepseek() -> PlatformProfile {
    PlatformProfile {
        id: "deepseek".to_string(),
        name: "DeepSeek".to_string(),
        url: UrlMatcher::new(&["chat.deepseek.com"]),
        rules: vec![
            StructuralRule::new("chat-input")
                .tag("textarea")
                .attr("id", "chat-input"),
            StructuralRule::new("message-textarea")
                .tag("textarea")
                .attr("placeholder", "message"),
        ],
        send_rules: vec![
            StructuralRule::new("send-role-button")
                .role("button")
                .attr("class", "send"),
            send_button("send"),
        ],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: Vec::new(),
        post_action: PostInjectionAction::ClickSend,
        launch_url: "https://chat.deepseek.com/".to_string(),
    }
}

fn grok() -> PlatformProfile {
    PlatformProfile {
        id: "grok".to_string(),
        name: "Grok".to_string(),
        url: UrlMatcher::new(&["grok.com"]),
        rules: vec![
            StructuralRule::new("ask-grok")
                .tag("textarea")
                .attr("aria-label", "ask grok"),
            StructuralRule::new("prosemirror")
                .editable()
                .attr("class", "ProseMirror"),
        ],
        send_rules: vec![
            StructuralRule::new("submit-button")
                .tag("button")
                .attr("type", "submit"),
        ],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: Vec::new(),
        post_action: PostInjectionAction::None,
        launch_url: "https://grok.com/".to_string(),
    }
}

fn mistral() -> PlatformProfile {
    PlatformProfile {
        id: "mistral".to_string(),
        name: "Le Chat".to_string(),
        url: UrlMatcher::new(&["chat.mistral.ai"]),
        rules: vec![
            StructuralRule::new("prosemirror")
                .editable()
                .attr("class", "ProseMirror"),
            StructuralRule::new("ask-textarea")
                .tag("textarea")
                .attr("placeholder", "ask"),
        ],
        send_rules: vec![send_button("send")],
        anchor_hint: AnchorCorner::BottomLeft,
        commit_order: Vec::new(),
        post_action: PostInjectionAction::None,
        launch_url: "https://chat.mistral.ai/chat".to_string(),
    }
}

fn copilot() -> PlatformProfile {
    PlatformProfile {
        id: "copilot".to_string(),
        name: "Copilot".to_string(),
        url: UrlMatcher::new(&["copilot.microsoft.com"]),
        rules: vec![
            StructuralRule::new("user-input")
                .tag("textarea")
                .attr("id", "userInput"),
        ],
        send_rules: vec![send_button("submit")],
        anchor_hint: AnchorCorner::BottomRight,
        commit_order: vec![CommitStrategy::ValueAssignment],
        post_action: PostInjectionAction::None,
        launch_url: "https://copilot.microsoft.com/".to_string(),
    }
}

pub(super) fn builtin_profiles() -> Vec<PlatformProfile> {
    vec![
        chatgpt(),
        claude(),
        gemini(),
        perplexity(),
        deepseek(),
        grok(),
        mistral(),
        copilot(),
    ]
}
