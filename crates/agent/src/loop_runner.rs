//! The agent reasoning loop implementation.

use chrono::Utc;
use fitcoach_config::Locale;
use fitcoach_core::agent::{AgentConfig, LoopState, TurnError, TurnResult};
use fitcoach_core::error::{Error, ProviderError, ToolError};
use fitcoach_core::event::{DomainEvent, EventBus};
use fitcoach_core::message::{Message, ThreadId, ToolCallRequest};
use fitcoach_core::provider::{Provider, ProviderRequest, ProviderResponse};
use fitcoach_core::thread::ThreadStore;
use fitcoach_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::reasoning;
use crate::session::TurnGuard;
use crate::stream_event::TurnSnapshot;

/// Where streamed snapshots go. `None` runs the turn without streaming.
pub(crate) type Progress<'a> = Option<&'a mpsc::Sender<TurnSnapshot>>;

/// One assistant tool-call message and the results answering it.
///
/// A round only enters the turn once every call has a result, so the
/// message sequence handed to the store is always consistently paired.
pub struct ToolRound {
    assistant: Message,
    results: Vec<Message>,
}

impl ToolRound {
    pub fn new(response: &ProviderResponse) -> Self {
        Self {
            assistant: response.to_message(),
            results: Vec::with_capacity(response.tool_calls.len()),
        }
    }

    pub fn calls(&self) -> &[ToolCallRequest] {
        self.assistant.tool_calls()
    }

    pub fn record(&mut self, call: &ToolCallRequest, output: impl Into<String>) {
        self.results
            .push(Message::tool_result(&call.id, &call.name, output));
    }

    pub fn is_complete(&self) -> bool {
        self.results.len() == self.calls().len()
    }

    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.results.len() + 1);
        messages.push(self.assistant);
        messages.extend(self.results);
        messages
    }
}

/// The core agent loop that orchestrates LLM calls and tool execution.
#[derive(Clone)]
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Where finished turns are persisted
    store: Arc<dyn ThreadStore>,

    /// The model to use
    model: String,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Localized fallback texts
    locale: &'static Locale,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ThreadStore>,
        model: impl Into<String>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            store,
            model: model.into(),
            max_tokens: None,
            event_bus,
            locale: Locale::for_language(Default::default()),
        }
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Use this locale's fallback and max-iterations texts.
    pub fn with_locale(mut self, locale: &'static Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Run one user turn to a terminal state.
    ///
    /// Provider failures are reported inside the `TurnResult`; the outer
    /// `Err` covers store failures only. Dropping the future before it
    /// completes leaves the thread untouched.
    pub async fn run_turn(
        &self,
        thread_id: &ThreadId,
        user_text: &str,
        config: &AgentConfig,
    ) -> Result<TurnResult, Error> {
        self.drive(thread_id, user_text, config, None).await
    }

    /// Run one user turn, yielding snapshots as it progresses.
    ///
    /// The last item carries the `TurnResult`. Dropping the stream stops
    /// the turn at its next snapshot without writing to the store.
    pub fn stream_turn(
        &self,
        thread_id: ThreadId,
        user_text: impl Into<String>,
        config: AgentConfig,
    ) -> ReceiverStream<TurnSnapshot> {
        self.spawn_stream(thread_id, user_text.into(), config, None)
    }

    /// Drive a streamed turn on its own task, holding `guard` until the
    /// turn ends.
    pub(crate) fn spawn_stream(
        &self,
        thread_id: ThreadId,
        user_text: String,
        config: AgentConfig,
        guard: Option<TurnGuard>,
    ) -> ReceiverStream<TurnSnapshot> {
        let (tx, rx) = mpsc::channel(32);
        let agent = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match agent.drive(&thread_id, &user_text, &config, Some(&tx)).await {
                Ok(_) => {}
                Err(Error::Cancelled) => {
                    debug!(thread_id = %thread_id, "Stream consumer went away; turn discarded");
                }
                Err(e) => warn!(thread_id = %thread_id, error = %e, "Streamed turn failed"),
            }
        });
        ReceiverStream::new(rx)
    }

    /// The state machine shared by `run_turn` and `stream_turn`.
    pub(crate) async fn drive(
        &self,
        thread_id: &ThreadId,
        user_text: &str,
        config: &AgentConfig,
        progress: Progress<'_>,
    ) -> Result<TurnResult, Error> {
        info!(
            thread_id = %thread_id,
            max_iterations = config.iteration_limit(),
            tools = config.tools.len(),
            "Processing turn"
        );
        self.event_bus.publish(DomainEvent::TurnStarted {
            thread_id: thread_id.to_string(),
            content_preview: user_text.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let history = self.store.get(thread_id).await?.messages;
        let definitions = config.tools.definitions();
        let mut turn = vec![Message::user(user_text)];
        let mut tools_invoked: Vec<String> = Vec::new();
        let mut provider_calls = 0u32;
        let mut last_text: Option<String> = None;

        loop {
            // AwaitingModel
            if provider_calls >= config.iteration_limit() {
                return self
                    .abort_at_limit(thread_id, turn, config, last_text, tools_invoked, provider_calls, progress)
                    .await;
            }

            let mut messages = Vec::with_capacity(history.len() + turn.len() + 1);
            messages.push(Message::system(&config.system_prompt));
            messages.extend(history.iter().cloned());
            messages.extend(turn.iter().cloned());

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: config.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };

            provider_calls += 1;
            debug!(thread_id = %thread_id, call = provider_calls, "Calling provider");

            let response = match self.call_provider(request, &tools_invoked, progress).await? {
                Ok(response) => response,
                Err(e) => {
                    warn!(thread_id = %thread_id, error = %e, "Provider call failed; turn aborted");
                    let result = TurnResult {
                        answer_text: String::new(),
                        reasoning_trace: None,
                        tools_invoked,
                        provider_calls,
                        aborted: true,
                        error: Some(TurnError::Provider(e)),
                    };
                    return self.finish(thread_id, None, result, progress).await;
                }
            };

            self.event_bus.publish(DomainEvent::ResponseGenerated {
                thread_id: thread_id.to_string(),
                model: response.model.clone(),
                tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                tool_calls: response.tool_calls.len(),
                timestamp: Utc::now(),
            });

            if !response.content.trim().is_empty() {
                last_text = Some(response.content.clone());
            }

            if response.tool_calls.is_empty() {
                // Done
                let (answer_text, reasoning_trace) =
                    reasoning::finalize(&response.content, self.locale.fallback_answer);
                turn.push(Message::assistant(&response.content));
                let result = TurnResult {
                    answer_text,
                    reasoning_trace,
                    tools_invoked,
                    provider_calls,
                    aborted: false,
                    error: None,
                };
                return self.finish(thread_id, Some(turn), result, progress).await;
            }

            // DispatchingTools
            let round = ToolRound::new(&response);
            if provider_calls >= config.iteration_limit() {
                debug!(
                    thread_id = %thread_id,
                    dropped_calls = round.calls().len(),
                    "Iteration limit reached with tool calls pending"
                );
                return self
                    .abort_at_limit(thread_id, turn, config, last_text, tools_invoked, provider_calls, progress)
                    .await;
            }

            let round = self
                .dispatch(thread_id, &config.tools, round, &mut tools_invoked, progress)
                .await?;
            turn.extend(round.into_messages());
        }
    }

    /// One provider call. With a progress channel the call is streamed and
    /// partial text is forwarded; the outer `Err` means the consumer left.
    async fn call_provider(
        &self,
        request: ProviderRequest,
        tools_invoked: &[String],
        progress: Progress<'_>,
    ) -> Result<Result<ProviderResponse, ProviderError>, Error> {
        let Some(tx) = progress else {
            return Ok(self.provider.complete(request).await);
        };

        let mut chunks = match self.provider.stream(request).await {
            Ok(rx) => rx,
            Err(e) => return Ok(Err(e)),
        };

        let mut response = ProviderResponse::text(String::new(), self.model.clone());
        while let Some(chunk) = chunks.recv().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Ok(Err(e)),
            };
            if let Some(delta) = chunk.content.filter(|d| !d.is_empty()) {
                response.content.push_str(&delta);
                send(
                    tx,
                    TurnSnapshot::progress(LoopState::AwaitingModel, &response.content, tools_invoked),
                )
                .await?;
            }
            response.tool_calls.extend(chunk.tool_calls);
            if chunk.usage.is_some() {
                response.usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }
        Ok(Ok(response))
    }

    /// Resolve every call of `round` in request order.
    async fn dispatch(
        &self,
        thread_id: &ThreadId,
        tools: &ToolRegistry,
        mut round: ToolRound,
        tools_invoked: &mut Vec<String>,
        progress: Progress<'_>,
    ) -> Result<ToolRound, Error> {
        let calls = round.calls().to_vec();
        debug!(thread_id = %thread_id, tool_count = calls.len(), "Executing tool calls");

        for call in &calls {
            if let Some(tx) = progress {
                send(
                    tx,
                    TurnSnapshot::progress(LoopState::DispatchingTools, "", tools_invoked),
                )
                .await?;
            }

            let known = tools.get(&call.name).is_some();
            let start = Instant::now();
            let outcome = tools.execute(call).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (output, success) = match outcome {
                Ok(result) => (result.output, result.success),
                Err(ToolError::NotFound(name)) => {
                    warn!(thread_id = %thread_id, tool = %name, "Model requested an unknown tool");
                    (
                        format!(
                            "Error: unknown tool '{name}'. Available tools: {}",
                            tools.names().join(", ")
                        ),
                        false,
                    )
                }
                Err(ToolError::InvalidArguments(reason)) => {
                    warn!(thread_id = %thread_id, tool = %call.name, %reason, "Malformed tool call");
                    (
                        format!("Error: invalid arguments for '{}': {reason}", call.name),
                        false,
                    )
                }
                Err(e) => {
                    warn!(thread_id = %thread_id, tool = %call.name, error = %e, "Tool execution failed");
                    (format!("Error: tool '{}' failed: {e}", call.name), false)
                }
            };

            if known {
                tools_invoked.push(call.name.clone());
            }
            self.event_bus.publish(DomainEvent::ToolExecuted {
                thread_id: thread_id.to_string(),
                tool_name: call.name.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
            round.record(call, output);
        }

        debug_assert!(round.is_complete());
        Ok(round)
    }

    #[allow(clippy::too_many_arguments)]
    async fn abort_at_limit(
        &self,
        thread_id: &ThreadId,
        turn: Vec<Message>,
        config: &AgentConfig,
        last_text: Option<String>,
        tools_invoked: Vec<String>,
        provider_calls: u32,
        progress: Progress<'_>,
    ) -> Result<TurnResult, Error> {
        warn!(
            thread_id = %thread_id,
            limit = config.iteration_limit(),
            "Max tool iterations reached; returning best-effort answer"
        );
        let (answer_text, reasoning_trace) = match last_text {
            Some(text) => reasoning::finalize(&text, self.locale.max_iterations_notice),
            None => (self.locale.max_iterations_notice.to_string(), None),
        };
        let result = TurnResult {
            answer_text,
            reasoning_trace,
            tools_invoked,
            provider_calls,
            aborted: true,
            error: Some(TurnError::MaxIterationsExceeded {
                limit: config.iteration_limit(),
            }),
        };
        self.finish(thread_id, Some(turn), result, progress).await
    }

    /// Persist the turn (if any), announce completion, and emit the final
    /// snapshot.
    async fn finish(
        &self,
        thread_id: &ThreadId,
        turn: Option<Vec<Message>>,
        result: TurnResult,
        progress: Progress<'_>,
    ) -> Result<TurnResult, Error> {
        if let Some(messages) = turn {
            self.store.append(thread_id, messages).await?;
        }

        info!(
            thread_id = %thread_id,
            state = ?result.state(),
            provider_calls = result.provider_calls,
            tools = ?result.tools_invoked,
            "Turn finished"
        );
        self.event_bus.publish(DomainEvent::TurnCompleted {
            thread_id: thread_id.to_string(),
            aborted: result.aborted,
            provider_calls: result.provider_calls,
            tools_invoked: result.tools_invoked.clone(),
            timestamp: Utc::now(),
        });

        if let Some(tx) = progress {
            // The turn is already stored; a missing consumer no longer matters.
            let _ = tx.send(TurnSnapshot::finished(result.clone())).await;
        }
        Ok(result)
    }
}

async fn send(tx: &mpsc::Sender<TurnSnapshot>, snapshot: TurnSnapshot) -> Result<(), Error> {
    tx.send(snapshot).await.map_err(|_| Error::Cancelled)
}
