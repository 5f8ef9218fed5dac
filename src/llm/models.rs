//! Centralized model definitions for all LLM providers
//!
//! This module contains all model definitions in a single location,
//! making it easier to add new models and providers.

use super::anthropic::AnthropicModel;
use super::openai::OpenAIModel;
use super::{AnthropicService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Groq,
    OpenAI,
    Anthropic,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Groq => "Groq",
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "llama-3.3-70b")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn openai_compatible(
    api_key: &str,
    gateway: Option<&str>,
    model: OpenAIModel,
) -> Result<Arc<dyn LlmService>, String> {
    // Accept any non-empty key (including "implicit" for gateway mode)
    if api_key.is_empty() {
        return Err(format!("{} requires an API key or gateway", model.model_id()));
    }
    let service = OpenAIService::new(api_key.to_string(), model, gateway)?;
    Ok(Arc::new(service))
}

fn anthropic(
    api_key: &str,
    gateway: Option<&str>,
    model: AnthropicModel,
) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!("{} requires ANTHROPIC_API_KEY or gateway", model.model_id()));
    }
    let service = AnthropicService::new(api_key.to_string(), model, gateway)?;
    Ok(Arc::new(service))
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        // Groq models
        ModelDef {
            id: "llama-3.3-70b",
            provider: Provider::Groq,
            description: "Llama 3.3 70B Versatile on Groq (default)",
            factory: |api_key, gateway| {
                openai_compatible(api_key, gateway, OpenAIModel::Llama33Groq)
            },
        },
        ModelDef {
            id: "gpt-oss-120b",
            provider: Provider::Groq,
            description: "GPT-OSS 120B on Groq",
            factory: |api_key, gateway| {
                openai_compatible(api_key, gateway, OpenAIModel::GptOss120bGroq)
            },
        },
        ModelDef {
            id: "llama-3.1-8b",
            provider: Provider::Groq,
            description: "Llama 3.1 8B Instant on Groq (fast, cheap)",
            factory: |api_key, gateway| {
                openai_compatible(api_key, gateway, OpenAIModel::Llama31InstantGroq)
            },
        },
        // OpenAI models
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o (balanced)",
            factory: |api_key, gateway| openai_compatible(api_key, gateway, OpenAIModel::GPT4o),
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o Mini (fast, efficient)",
            factory: |api_key, gateway| {
                openai_compatible(api_key, gateway, OpenAIModel::GPT4oMini)
            },
        },
        // Anthropic models
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            description: "Claude Sonnet 4.5 (balanced performance)",
            factory: |api_key, gateway| {
                anthropic(api_key, gateway, AnthropicModel::Claude45Sonnet)
            },
        },
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            description: "Claude Haiku 4.5 (fast, efficient)",
            factory: |api_key, gateway| {
                anthropic(api_key, gateway, AnthropicModel::Claude45Haiku)
            },
        },
    ]
}
