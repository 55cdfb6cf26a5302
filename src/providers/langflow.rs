//! Client for a Langflow flow exposed at `/api/v1/run/<flow_id>`.

use super::ProviderError;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const PLACEHOLDER_FLOW_ID: &str = "YOUR_FLOW_ID";
pub const DEFAULT_INPUT_KEY: &str = "company_name";

pub struct LangflowClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    input_key: String,
}

#[derive(Serialize)]
struct RunBody<'a> {
    inputs: serde_json::Map<String, Value>,
    output_type: &'a str,
    stream: bool,
}

impl LangflowClient {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        input_key: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_url.trim().is_empty() || api_url.contains(PLACEHOLDER_FLOW_ID) {
            return Err(ProviderError::Config(
                "a Langflow flow URL is required (set [langflow].api_url or --url)".into(),
            ));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            input_key,
        })
    }

    /// Runs the flow once with `value` bound to the configured input key and
    /// returns the first text output found.
    pub async fn run(&self, value: &str) -> Result<String, ProviderError> {
        let mut inputs = serde_json::Map::new();
        inputs.insert(self.input_key.clone(), Value::String(value.to_string()));
        let body = RunBody { inputs, output_type: "chat", stream: false };

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        tracing::debug!(url = %self.api_url, input_key = %self.input_key, "running flow");
        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), body: text });
        }
        let json: Value = serde_json::from_str(&text)?;
        extract_output(&json)
            .ok_or_else(|| ProviderError::Other(format!("no text output in flow response: {text}")))
    }
}

/// Looks for the answer in `outputs[*]`, trying chat messages, then
/// `results[0].result`, then a bare `text` field.
pub fn extract_output(resp: &Value) -> Option<String> {
    let outputs = resp.get("outputs")?.as_array()?;
    for output in outputs {
        if let Some(messages) = output.get("messages").and_then(Value::as_array)
            && !messages.is_empty()
        {
            if let Some(text) = messages.iter().find_map(|m| m.get("text")) {
                return Some(as_text(text));
            }
        } else if let Some(result) = output
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(|r| r.get("result"))
        {
            return Some(as_text(result));
        } else if let Some(text) = output.get("text") {
            return Some(as_text(text));
        }
    }
    None
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_chat_messages() {
        let resp = json!({"outputs": [
            {"messages": [{"role": "ai"}, {"text": "Market is growing."}]},
            {"text": "ignored"}
        ]});
        assert_eq!(extract_output(&resp).as_deref(), Some("Market is growing."));
    }

    #[test]
    fn falls_back_to_results_then_text() {
        let results = json!({"outputs": [{"results": [{"result": "from results"}]}]});
        assert_eq!(extract_output(&results).as_deref(), Some("from results"));

        let text = json!({"outputs": [{"other": 1}, {"text": "plain"}]});
        assert_eq!(extract_output(&text).as_deref(), Some("plain"));
    }

    #[test]
    fn non_string_result_is_rendered_as_json() {
        let resp = json!({"outputs": [{"results": [{"result": {"score": 3}}]}]});
        assert_eq!(extract_output(&resp).as_deref(), Some(r#"{"score":3}"#));
    }

    #[test]
    fn missing_outputs_yield_none() {
        assert_eq!(extract_output(&json!({})), None);
        assert_eq!(extract_output(&json!({"outputs": []})), None);
        assert_eq!(extract_output(&json!({"outputs": [{"messages": [{"role": "ai"}]}]})), None);
    }

    #[test]
    fn placeholder_url_is_rejected() {
        let err = LangflowClient::new(
            "http://localhost:7860/api/v1/run/YOUR_FLOW_ID".into(),
            None,
            DEFAULT_INPUT_KEY.into(),
            Duration::from_secs(5),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[test]
    fn run_body_shape() {
        let mut inputs = serde_json::Map::new();
        inputs.insert("company_name".into(), json!("Google"));
        let body = RunBody { inputs, output_type: "chat", stream: false };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"inputs": {"company_name": "Google"}, "output_type": "chat", "stream": false})
        );
    }
}
