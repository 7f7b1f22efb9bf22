//! Shared test helpers for agent tests.

use async_trait::async_trait;
use fitcoach_core::error::ProviderError;
use fitcoach_core::message::ToolCallRequest;
use fitcoach_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Once the script runs out every call fails.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicU32,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn tool_then_answer(calls: Vec<ToolCallRequest>, answer: &str) -> Self {
        Self::new(vec![
            Ok(make_tool_call_response(calls, "")),
            Ok(make_text_response(answer)),
        ])
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        self.requests.lock().unwrap().push(request);
        let responses = self.responses.lock().unwrap();
        responses.get(n).cloned().unwrap_or_else(|| {
            Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("no scripted response for call #{}", n + 1),
            })
        })
    }

    /// Streams the scripted text word by word, then a final chunk with the
    /// tool calls.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for word in response.content.split_inclusive(' ') {
                let chunk = StreamChunk {
                    content: Some(word.to_string()),
                    tool_calls: vec![],
                    done: false,
                    usage: None,
                };
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    tool_calls: response.tool_calls,
                    done: true,
                    usage: response.usage,
                }))
                .await;
        });
        Ok(rx)
    }
}

/// A provider that asks for the knowledge tool on every call.
pub struct AlwaysToolProvider {
    calls: AtomicU32,
}

impl AlwaysToolProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for AlwaysToolProvider {
    fn name(&self) -> &str {
        "always_tool"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(make_tool_call_response(
            vec![make_tool_call(
                &format!("call_{n}"),
                "fitness_knowledge",
                serde_json::json!({"query": format!("attempt {n}")}),
            )],
            &format!("Looking this up (attempt {n})."),
        ))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        tool_calls: vec![],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(calls: Vec<ToolCallRequest>, content: &str) -> ProviderResponse {
    ProviderResponse {
        tool_calls: calls,
        ..make_text_response(content)
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args,
    }
}
