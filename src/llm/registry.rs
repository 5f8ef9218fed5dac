//! Builds the configured model clients and picks the one that answers

use super::{all_models, Instrumented, LlmService, ModelDef, Provider};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Used when `DEFAULT_MODEL` is unset or names a model without credentials
const PREFERRED_DEFAULT: &str = "llama-3.3-70b";

/// Stand-in credential when an authenticating gateway sits in front
const GATEWAY_CREDENTIAL: &str = "implicit";

/// Provider credentials and model choice, read from the environment
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    /// OpenAI-compatible gateway URL that handles authentication upstream
    pub gateway: Option<String>,
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            groq_api_key: get(Provider::Groq.api_key_env_var()),
            openai_api_key: get(Provider::OpenAI.api_key_env_var()),
            anthropic_api_key: get(Provider::Anthropic.api_key_env_var()),
            gateway: get("LLM_GATEWAY"),
            default_model: get("DEFAULT_MODEL"),
        }
    }

    fn credential(&self, provider: Provider) -> Option<&str> {
        if self.gateway.is_some() {
            return Some(GATEWAY_CREDENTIAL);
        }
        let key = match provider {
            Provider::Groq => &self.groq_api_key,
            Provider::OpenAI => &self.openai_api_key,
            Provider::Anthropic => &self.anthropic_api_key,
        };
        key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Clients for every model whose provider has credentials, keyed by model id
pub struct ModelRegistry {
    services: BTreeMap<&'static str, Arc<dyn LlmService>>,
    default_id: Option<&'static str>,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let services: BTreeMap<_, _> = all_models()
            .iter()
            .filter_map(|def| Some((def.id, build(def, config)?)))
            .collect();
        let default_id = choose_default(config.default_model.as_deref(), &services);
        Self { services, default_id }
    }

    /// The model that answers questions, if any provider is configured
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.services.get(self.default_model_id()?).cloned()
    }

    pub fn default_model_id(&self) -> Option<&'static str> {
        self.default_id
    }

    /// Ids of the models that were built, sorted
    pub fn available_models(&self) -> Vec<&'static str> {
        self.services.keys().copied().collect()
    }
}

fn build(def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
    let credential = config.credential(def.provider)?;
    match (def.factory)(credential, config.gateway.as_deref()) {
        Ok(service) => Some(Instrumented::wrap(service)),
        Err(e) => {
            tracing::warn!(
                model = def.id,
                provider = def.provider.display_name(),
                error = %e,
                "Skipping model"
            );
            None
        }
    }
}

/// The requested model if it was built, then the preferred default, then the
/// first built model in definition order
fn choose_default(
    requested: Option<&str>,
    services: &BTreeMap<&'static str, Arc<dyn LlmService>>,
) -> Option<&'static str> {
    let built = |id: &str| services.get_key_value(id).map(|(id, _)| *id);
    requested
        .and_then(built)
        .or_else(|| built(PREFERRED_DEFAULT))
        .or_else(|| all_models().iter().map(|def| def.id).find(|id| services.contains_key(id)))
}
