//! Property-based tests for LLM provider translation layers
//!
//! These tests verify that the translation between our internal types
//! and provider wire formats preserves key invariants:
//! - Every message survives translation, in order, with its role
//! - The system prompt is placed where each provider expects it
//! - Response text is preserved through normalization

use super::anthropic::{
    AnthropicContentBlock, AnthropicModel, AnthropicResponse, AnthropicService, AnthropicUsage,
};
use super::openai::{
    OpenAIChoice, OpenAIMessage, OpenAIModel, OpenAIResponse, OpenAIService, OpenAIUsage,
};
use super::types::{LlmMessage, LlmRequest, MessageRole};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (
        prop_oneof![Just(MessageRole::User), Just(MessageRole::Assistant)],
        "[a-zA-Z0-9 _.!?,]{0,100}",
    )
        .prop_map(|(role, content)| LlmMessage { role, content })
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::option::of("[a-zA-Z ]{1,60}"),
        proptest::collection::vec(arb_message(), 1..8),
        proptest::option::of(1u32..4096),
    )
        .prop_map(|(system, messages, max_tokens)| LlmRequest {
            system,
            messages,
            max_tokens,
            temperature: None,
        })
}

fn openai_service() -> OpenAIService {
    OpenAIService::new("test-key".to_string(), OpenAIModel::Llama33Groq, None).unwrap()
}

fn anthropic_service() -> AnthropicService {
    AnthropicService::new("test-key".to_string(), AnthropicModel::Claude45Haiku, None).unwrap()
}

// ============================================================================
// Request translation
// ============================================================================

proptest! {
    /// OpenAI: system prompt becomes a leading "system" message, the rest follow in order
    #[test]
    fn prop_openai_translate_preserves_messages(request in arb_request()) {
        let translated = openai_service().translate_request(&request);
        let offset = usize::from(request.system.is_some());

        prop_assert_eq!(translated.messages.len(), request.messages.len() + offset);
        if let Some(system) = &request.system {
            prop_assert_eq!(translated.messages[0].role.as_str(), "system");
            prop_assert_eq!(translated.messages[0].content.as_deref(), Some(system.as_str()));
        }
        for (original, wire) in request.messages.iter().zip(&translated.messages[offset..]) {
            prop_assert_eq!(wire.role.as_str(), original.role.as_str());
            prop_assert_eq!(wire.content.as_deref(), Some(original.content.as_str()));
        }
        prop_assert_eq!(translated.max_tokens, request.max_tokens);
    }

    /// Anthropic: system prompt travels out of band, messages map one-to-one
    #[test]
    fn prop_anthropic_translate_bijective(request in arb_request()) {
        let translated = anthropic_service().translate_request(&request);

        prop_assert_eq!(translated.messages.len(), request.messages.len());
        prop_assert_eq!(translated.system.as_deref(), request.system.as_deref());
        for (original, wire) in request.messages.iter().zip(&translated.messages) {
            prop_assert_eq!(wire.role.as_str(), original.role.as_str());
            prop_assert_eq!(&wire.content, &original.content);
        }
        prop_assert!(translated.max_tokens > 0);
    }
}

// ============================================================================
// Response normalization
// ============================================================================

proptest! {
    #[test]
    fn prop_openai_normalize_preserves_text(
        text in "[a-zA-Z0-9 _.!?,]{0,200}",
        finish_reason in proptest::option::of(prop_oneof![Just("stop".to_string()), Just("length".to_string())]),
    ) {
        let resp = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_string(),
                    content: Some(text.clone()),
                },
                finish_reason: finish_reason.clone(),
            }],
            usage: Some(OpenAIUsage { prompt_tokens: 10, completion_tokens: 5 }),
        };
        let normalized = OpenAIService::normalize_response(resp).unwrap();
        prop_assert_eq!(&normalized.text, &text);
        prop_assert_eq!(normalized.end_turn, finish_reason.as_deref() == Some("stop"));
    }

    #[test]
    fn prop_anthropic_normalize_concatenates_text_in_order(
        parts in proptest::collection::vec("[a-zA-Z0-9 ]{0,30}", 0..6),
        interleave_other in any::<bool>(),
    ) {
        let mut content = Vec::new();
        for part in &parts {
            content.push(AnthropicContentBlock::Text { text: part.clone() });
            if interleave_other {
                content.push(AnthropicContentBlock::Other);
            }
        }
        let resp = AnthropicResponse {
            content,
            stop_reason: Some("end_turn".to_string()),
            usage: AnthropicUsage { input_tokens: 1, output_tokens: 1 },
        };
        let normalized = AnthropicService::normalize_response(resp);
        prop_assert_eq!(normalized.text, parts.concat());
    }
}
