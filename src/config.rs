use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub openai: Option<OpenAiConfig>,
    pub ollama: Option<OllamaConfig>,
    pub langflow: Option<LangflowConfig>,
    pub analysis: Option<AnalysisConfig>,
    /// Extra or overridden model profiles, keyed by model name.
    pub models: Option<HashMap<String, ModelProfileConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LangflowConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub input_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Forces an encoding for every model (e.g. "cl100k_base")
    pub encoding: Option<String>,
    pub system_prompt: Option<String>,
    /// Template name under the templates dir
    pub template: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfileConfig {
    pub max_context_tokens: usize,
    pub reserved_completion_tokens: Option<usize>,
    pub encoding: Option<String>,
}

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_FLOW_TIMEOUT_SECS: u64 = 300;

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            let text = fs::read_to_string(p).with_context(|| format!("reading config at {p}"))?;
            return parse(&text).with_context(|| "parsing config");
        }
        let default = Self::default_path()?;
        if default.exists() {
            let text = fs::read_to_string(&default)
                .with_context(|| format!("reading config at {}", default.display()))?;
            parse(&text).with_context(|| "parsing config")
        } else {
            Ok(Self::default())
        }
    }

    pub fn dir() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| anyhow!("cannot resolve config dir"))?;
        Ok(base.join("doc-analyst"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::dir()?.join("config.toml"))
    }

    pub fn write_example_if_absent() -> Result<PathBuf> {
        let path = Self::default_path()?;
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let example = r#"# doc-analyst config (TOML)

[openai]
# api_key can be omitted to use env var OPENAI_API_KEY
api_key = ""
base_url = "https://api.openai.com/v1"
default_model = "gpt-3.5-turbo"

[ollama]
base_url = "http://localhost:11434"
default_model = "llama3.1"

[analysis]
provider = "openai"
model = "gpt-3.5-turbo"
temperature = 0.7
timeout_secs = 120
# template = "api-docs"
# encoding = "cl100k_base"

[langflow]
# api_key can be omitted to use env var LANGFLOW_API_KEY
api_url = "http://localhost:7860/api/v1/run/YOUR_FLOW_ID"
input_key = "company_name"
timeout_secs = 300

# Model profiles. Built-in: gpt-3.5-turbo, gpt-4, gpt-4-turbo, gpt-4o, gpt-4o-mini, llama3.1
# [models."my-model"]
# max_context_tokens = 32768
# reserved_completion_tokens = 1024
# encoding = "cl100k_base"
"#;
            fs::write(&path, example)?;
            // Create templates dir and a starter template
            if let Some(parent) = path.parent() {
                let tdir = parent.join("templates");
                let _ = std::fs::create_dir_all(&tdir);
                let starter = "Read the following document:\n\n---\n{document}\n---\n\nAnswer concisely: \"{query}\"";
                let _ = fs::write(tdir.join("concise.tmpl"), starter);
            }
        }
        Ok(path)
    }
}

fn parse(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| anyhow!(e))
}

impl OpenAiConfig {
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl OllamaConfig {
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".into())
    }
}

impl LangflowConfig {
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("LANGFLOW_API_KEY").ok())
    }
}
