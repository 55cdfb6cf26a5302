use super::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(base_url: String, default_model: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url, default_model })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str { "ollama" }
    fn default_model(&self) -> &str { &self.default_model }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        #[derive(Serialize)]
        struct Msg<'a> { role: &'a str, content: &'a str }
        #[derive(Serialize)]
        struct Body<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            stream: bool,
            options: Options,
        }
        #[derive(Serialize, Default)]
        struct Options { temperature: Option<f32>, num_predict: Option<u32> }
        #[derive(Deserialize)]
        struct RespMsg { content: String }
        #[derive(Deserialize)]
        struct Resp {
            message: RespMsg,
            #[serde(default)]
            prompt_eval_count: Option<u32>,
            #[serde(default)]
            eval_count: Option<u32>,
        }

        let mut messages: Vec<Msg> = Vec::new();
        if let Some(sys) = &req.system { messages.push(Msg { role: "system", content: sys }); }
        for m in &req.messages { messages.push(Msg { role: &m.role, content: &m.content }); }

        let body = Body {
            model: &req.model,
            messages,
            stream: false,
            options: Options { temperature: req.temperature, num_predict: req.max_tokens },
        };

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        tracing::debug!(%url, model = %req.model, "ollama chat request");
        let resp: Resp = self.client
            .post(url)
            .json(&body)
            .send().await?
            .error_for_status()?
            .json().await?;
        let usage = match (resp.prompt_eval_count, resp.eval_count) {
            (Some(input), Some(output)) => Some(super::Usage {
                input_tokens: input,
                output_tokens: output,
                total_tokens: input + output,
            }),
            _ => None,
        };
        Ok(ChatResponse { content: Some(resp.message.content), usage })
    }
}
