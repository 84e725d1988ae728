use async_trait::async_trait;
use futures_util::Stream;
use pin_project::pin_project;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use super::sse::{SseEvent, SseParser};
use super::stream_processor::StreamProcessor;
use super::translator::WireTranslator;
use super::types::*;
use crate::config::AzureOpenAiSettings;
use crate::error::EngineError;
use crate::llm::client::{
    Completion, CompletionOptions, CompletionStream, LlmClient, Message, MessagePart,
    StreamChunk, ToolChoice, ToolDefinition,
};

/// Chat-completions client for an Azure OpenAI deployment.
pub struct AzureOpenAiClient {
    settings: AzureOpenAiSettings,
    http: reqwest::Client,
}

impl AzureOpenAiClient {
    pub fn new(settings: AzureOpenAiSettings) -> Result<Self, EngineError> {
        if settings.endpoint.is_empty() {
            return Err(EngineError::Config(
                "Azure OpenAI endpoint is required".to_string(),
            ));
        }
        if settings.deployment.is_empty() {
            return Err(EngineError::Config(
                "Azure OpenAI deployment is required".to_string(),
            ));
        }
        if settings.api_key.is_empty() {
            return Err(EngineError::Config(
                "Azure OpenAI api key is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { settings, http })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment,
            self.settings.api_version
        )
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
        stream: bool,
    ) -> ChatCompletionRequest {
        let wire_tools: Vec<ApiTool> = match options.tool_choice {
            ToolChoice::Auto => tools.iter().map(WireTranslator::tool_to_wire).collect(),
            ToolChoice::None => Vec::new(),
        };

        ChatCompletionRequest {
            messages: WireTranslator::messages_to_wire(messages),
            tool_choice: if wire_tools.is_empty() {
                None
            } else {
                Some(Value::String("auto".to_string()))
            },
            tools: if wire_tools.is_empty() {
                None
            } else {
                Some(wire_tools)
            },
            temperature: options.temperature.or(Some(self.settings.temperature)),
            max_tokens: options.max_tokens.or(self.settings.max_tokens),
            stream,
        }
    }

    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        let mut retries = 0;
        let mut last_error = None;

        while retries <= self.settings.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    log::warn!("completion call failed (attempt {}): {e}", retries + 1);
                    last_error = Some(e);
                    if retries < self.settings.max_retries {
                        let delay = Duration::from_millis(100 * 2u64.pow(retries));
                        tokio::time::sleep(delay).await;
                    }
                    retries += 1;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| EngineError::Llm("max retries exceeded".to_string())))
    }

    async fn send_chat_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, EngineError> {
        let url = self.completions_url();
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.settings.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(decoded) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(EngineError::Llm(format!(
                    "provider error ({status}): {}",
                    decoded.error.message
                )));
            }
            return Err(EngineError::Llm(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::Parse(format!("bad completion response: {e}")))
    }

    fn convert_response(response: ChatCompletionResponse) -> Result<Completion, EngineError> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| EngineError::Parse("no choices in response".to_string()))?;

        let message = WireTranslator::wire_to_message(&choice.message);

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let parameters: Value =
                            serde_json::from_str(&call.function.arguments)
                                .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
                        (call.id.clone(), call.function.name.clone(), parameters)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Completion {
            message,
            tool_calls,
        })
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<Completion, EngineError> {
        let request = self.build_request(messages, tools, options, false);
        log::debug!(
            "sending completion request: {} messages, {} tools",
            request.messages.len(),
            request.tools.as_ref().map(Vec::len).unwrap_or(0)
        );

        let response = self
            .execute_with_retry(|| async { self.send_chat_request(&request).await })
            .await?;

        Self::convert_response(response)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, EngineError> {
        let request = self.build_request(messages, tools, options, true);
        log::debug!(
            "opening completion stream: {} messages, {} tools",
            request.messages.len(),
            request.tools.as_ref().map(Vec::len).unwrap_or(0)
        );

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(decoded) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(EngineError::Llm(format!(
                    "provider error ({status}): {}",
                    decoded.error.message
                )));
            }
            return Err(EngineError::Llm(format!("HTTP {status}: {body}")));
        }

        let parser = SseParser::new(response.bytes_stream());
        Ok(Box::pin(ChunkStream::new(parser)))
    }
}

/// Adapts decoded SSE events into [`StreamChunk`]s. Dropping this stream
/// drops the HTTP response body and releases the provider connection.
#[pin_project]
struct ChunkStream<S> {
    #[pin]
    events: S,
    processor: StreamProcessor,
    buffered: Vec<StreamChunk>,
    emitted_final: bool,
    done: bool,
}

impl<S> ChunkStream<S> {
    fn new(events: S) -> Self {
        Self {
            events,
            processor: StreamProcessor::new(),
            buffered: Vec::new(),
            emitted_final: false,
            done: false,
        }
    }
}

impl<S> ChunkStream<S> {
    fn flush_tool_calls(processor: &mut StreamProcessor, buffered: &mut Vec<StreamChunk>) {
        for call in processor.take_completed_tool_calls() {
            buffered.push(StreamChunk {
                part: MessagePart::ToolCall {
                    tool_call_id: call.id,
                    name: call.name,
                    parameters: call.arguments,
                },
                is_final: false,
                finish_reason: None,
            });
        }
    }
}

impl<S> Stream for ChunkStream<S>
where
    S: Stream<Item = Result<SseEvent, Box<dyn std::error::Error + Send + Sync>>>,
{
    type Item = Result<StreamChunk, EngineError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if !this.buffered.is_empty() {
                return Poll::Ready(Some(Ok(this.buffered.remove(0))));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match this.events.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(SseEvent::Message(json)))) => {
                    if let Some(error) = json.get("error") {
                        let message = error
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("unknown provider error");
                        *this.done = true;
                        return Poll::Ready(Some(Err(EngineError::Llm(message.to_string()))));
                    }

                    // Azure occasionally sends housekeeping events with an
                    // empty choices array; skip them.
                    let Some(choice) = json
                        .get("choices")
                        .and_then(|v| v.as_array())
                        .and_then(|choices| choices.first())
                    else {
                        continue;
                    };

                    if let Some(delta) = choice.get("delta") {
                        this.buffered.extend(this.processor.process_delta(delta));
                    }

                    if let Some(finish_reason) = choice
                        .get("finish_reason")
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.is_empty() && *s != "null")
                    {
                        Self::flush_tool_calls(this.processor, this.buffered);
                        this.buffered.push(StreamChunk {
                            part: MessagePart::Text {
                                text: String::new(),
                            },
                            is_final: true,
                            finish_reason: Some(finish_reason.to_string()),
                        });
                        *this.emitted_final = true;
                    }
                }
                Poll::Ready(Some(Ok(SseEvent::Done))) => {
                    *this.done = true;
                    Self::flush_tool_calls(this.processor, this.buffered);
                    if !*this.emitted_final {
                        this.buffered.push(StreamChunk {
                            part: MessagePart::Text {
                                text: String::new(),
                            },
                            is_final: true,
                            finish_reason: Some("stop".to_string()),
                        });
                        *this.emitted_final = true;
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(EngineError::Network(format!(
                        "stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(endpoint: &str) -> AzureOpenAiSettings {
        AzureOpenAiSettings {
            endpoint: endpoint.to_string(),
            api_key: "unit-key".to_string(),
            deployment: "gpt-4o".to_string(),
            ..AzureOpenAiSettings::default()
        }
    }

    #[test]
    fn url_includes_deployment_and_api_version() {
        let client = AzureOpenAiClient::new(settings("https://unit.openai.azure.com/")).unwrap();
        assert_eq!(
            client.completions_url(),
            format!(
                "https://unit.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version={}",
                client.settings.api_version
            )
        );
    }

    #[test]
    fn new_rejects_missing_api_key() {
        let mut config = settings("https://unit.openai.azure.com");
        config.api_key = String::new();
        assert!(matches!(
            AzureOpenAiClient::new(config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn request_omits_tools_when_choice_is_none() {
        let client = AzureOpenAiClient::new(settings("https://unit.openai.azure.com")).unwrap();
        let tools = vec![ToolDefinition {
            name: "search".to_string(),
            description: "Search the knowledge base".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let request = client.build_request(
            &[Message::user("hi")],
            &tools,
            &CompletionOptions::deterministic(),
            false,
        );
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
        assert_eq!(request.temperature, Some(0.0));
    }

    #[test]
    fn request_carries_tools_under_auto_choice() {
        let client = AzureOpenAiClient::new(settings("https://unit.openai.azure.com")).unwrap();
        let tools = vec![ToolDefinition {
            name: "search".to_string(),
            description: "Search the knowledge base".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let request = client.build_request(
            &[Message::user("hi")],
            &tools,
            &CompletionOptions::with_tools(),
            true,
        );
        assert_eq!(request.tools.as_ref().unwrap().len(), 1);
        assert_eq!(request.tool_choice, Some(Value::String("auto".to_string())));
        assert!(request.stream);
    }

    #[tokio::test]
    async fn complete_decodes_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(header("api-key", "unit-key"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"intent\": \"CREATE_TICKET\"}"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = AzureOpenAiClient::new(settings(&server.uri())).unwrap();
        let completion = client
            .complete(
                &[Message::user("open a ticket")],
                &[],
                &CompletionOptions::deterministic(),
            )
            .await
            .unwrap();
        assert_eq!(completion.message.text(), "{\"intent\": \"CREATE_TICKET\"}");
        assert!(completion.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn complete_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "rate limited", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let mut config = settings(&server.uri());
        config.max_retries = 0;
        let client = AzureOpenAiClient::new(config).unwrap();
        let err = client
            .complete(&[Message::user("hi")], &[], &CompletionOptions::default())
            .await
            .err().unwrap();
        match err {
            EngineError::Llm(message) => assert!(message.contains("rate limited")),
            other => panic!("expected Llm error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_yields_text_then_final_chunk() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = AzureOpenAiClient::new(settings(&server.uri())).unwrap();
        let stream = client
            .complete_stream(
                &[Message::user("hi")],
                &[],
                &CompletionOptions::default(),
            )
            .await
            .unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;

        let texts: Vec<String> = chunks
            .iter()
            .filter_map(|c| match &c.part {
                MessagePart::Text { text } if !text.is_empty() => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
        let last = chunks.last().unwrap();
        assert!(last.is_final);
        assert_eq!(last.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn stream_assembles_tool_calls() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"search\",\"arguments\":\"{\\\"query\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"vpn\\\"}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = AzureOpenAiClient::new(settings(&server.uri())).unwrap();
        let tools = vec![ToolDefinition {
            name: "search".to_string(),
            description: "Search the knowledge base".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let stream = client
            .complete_stream(
                &[Message::user("how do I set up vpn?")],
                &tools,
                &CompletionOptions::with_tools(),
            )
            .await
            .unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;

        let call = chunks
            .iter()
            .find_map(|c| match &c.part {
                MessagePart::ToolCall {
                    name, parameters, ..
                } => Some((name.clone(), parameters.clone())),
                _ => None,
            })
            .expect("tool call chunk");
        assert_eq!(call.0, "search");
        assert_eq!(call.1, json!({"query": "vpn"}));
        assert_eq!(
            chunks.last().unwrap().finish_reason.as_deref(),
            Some("tool_calls")
        );
    }

    #[tokio::test]
    async fn stream_request_error_is_reported_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = AzureOpenAiClient::new(settings(&server.uri())).unwrap();
        let err = client
            .complete_stream(&[Message::user("hi")], &[], &CompletionOptions::default())
            .await
            .err().unwrap();
        assert!(matches!(err, EngineError::Llm(_)));
    }
}
