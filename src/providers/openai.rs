use super::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        default_model: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            default_model,
        })
    }
}

#[derive(Serialize)]
#[serde(tag = "role")]
enum Msg<'a> {
    #[serde(rename = "system")]
    System { content: &'a str },
    #[serde(rename = "user")]
    User { content: &'a str },
    #[serde(rename = "assistant")]
    Assistant { content: &'a str },
}

#[derive(Serialize)]
struct Body<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

fn body(req: &ChatRequest) -> Body<'_> {
    let mut messages: Vec<Msg> = Vec::new();
    if let Some(sys) = &req.system {
        messages.push(Msg::System { content: sys });
    }
    for m in &req.messages {
        match m.role.as_str() {
            "system" => messages.push(Msg::System { content: &m.content }),
            "assistant" => messages.push(Msg::Assistant { content: &m.content }),
            _ => messages.push(Msg::User { content: &m.content }),
        }
    }
    Body {
        model: &req.model,
        messages,
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }
    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Usage {
            prompt_tokens: u32,
            completion_tokens: u32,
            total_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
            usage: Option<Usage>,
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!(%url, model = %req.model, "openai chat request");
        let resp: Resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body(&req))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let usage = resp.usage.map(|u| super::Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let content = resp.choices.into_iter().next().and_then(|c| c.message.content);
        Ok(ChatResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatMessage;

    #[test]
    fn body_puts_system_first() {
        let req = ChatRequest {
            model: "gpt-3.5-turbo".into(),
            system: Some("be brief".into()),
            messages: vec![ChatMessage::user("hi")],
            temperature: Some(0.7),
            max_tokens: Some(500),
        };
        let json = serde_json::to_value(body(&req)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7f32,
                "max_tokens": 500
            })
        );
    }
}
