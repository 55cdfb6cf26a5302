use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;

use super::{LlmProvider, ProviderError, ollama::OllamaProvider, openai::OpenAiProvider};

pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn from_config(cfg: &Config, timeout: Duration) -> Result<Self, ProviderError> {
        let mut map: HashMap<String, Box<dyn LlmProvider>> = HashMap::new();

        if let Some(oc) = &cfg.openai {
            if let Some(key) = oc.effective_api_key() {
                let base = oc
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".into());
                let model = oc
                    .default_model
                    .clone()
                    .unwrap_or_else(|| "gpt-3.5-turbo".into());
                let p = OpenAiProvider::new(base, key, model, timeout)?;
                map.insert("openai".into(), Box::new(p));
            }
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let p = OpenAiProvider::new(
                "https://api.openai.com/v1".into(),
                key,
                "gpt-3.5-turbo".into(),
                timeout,
            )?;
            map.insert("openai".into(), Box::new(p));
        }

        let (base, model) = match &cfg.ollama {
            Some(oc) => (
                oc.effective_base_url(),
                oc.default_model.clone().unwrap_or_else(|| "llama3.1".into()),
            ),
            None => ("http://localhost:11434".into(), "llama3.1".into()),
        };
        map.insert("ollama".into(), Box::new(OllamaProvider::new(base, model, timeout)?));

        Ok(Self { providers: map })
    }

    pub fn get(&self, key: &str) -> Result<&dyn LlmProvider, ProviderError> {
        self.providers.get(key).map(|b| b.as_ref()).ok_or_else(|| {
            if key == "openai" {
                ProviderError::Config(
                    "openai needs an API key: set OPENAI_API_KEY or [openai].api_key".into(),
                )
            } else {
                ProviderError::Config(format!("unknown provider: {key}"))
            }
        })
    }

    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.providers.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    #[test]
    fn registers_configured_providers() {
        let cfg = Config {
            openai: Some(OpenAiConfig {
                api_key: Some("sk-test".into()),
                base_url: None,
                default_model: Some("gpt-4o-mini".into()),
            }),
            ..Config::default()
        };
        let registry = ProviderRegistry::from_config(&cfg, Duration::from_secs(5)).unwrap();
        assert_eq!(registry.list(), vec!["ollama", "openai"]);
        assert_eq!(registry.get("openai").unwrap().default_model(), "gpt-4o-mini");
        assert!(matches!(registry.get("grok"), Err(ProviderError::Config(_))));
    }
}
