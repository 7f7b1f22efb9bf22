//! The coach: everything a front end needs to hold a conversation.

use fitcoach_config::{AppConfig, EmbedderKind, Language, Locale, ProviderSettings};
use fitcoach_core::agent::{AgentConfig, TurnResult};
use fitcoach_core::error::{Error, ProviderError};
use fitcoach_core::event::EventBus;
use fitcoach_core::message::ThreadId;
use fitcoach_core::provider::Provider;
use fitcoach_core::thread::ThreadStore;
use fitcoach_core::tool::ToolRegistry;
use fitcoach_knowledge::{
    DirectoryLoader, Embedder, HashingEmbedder, KnowledgeBase, ProviderEmbedder,
    RecursiveSplitter, Retriever,
};
use fitcoach_memory::InMemoryThreadStore;
use fitcoach_providers::build_provider;
use fitcoach_tools::coach_registry;
use serde::Serialize;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::cache::{AgentCache, AgentKey};
use crate::loop_runner::AgentLoop;
use crate::session::SessionManager;
use crate::stream_event::TurnSnapshot;
use crate::style::StyleComposer;

/// Builds a completion provider for a credential.
pub type ProviderFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync>;

pub fn provider_factory<F>(factory: F) -> ProviderFactory
where
    F: Fn(Option<&str>) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// The factory backed by the configured OpenAI-compatible endpoint.
pub fn default_factory(settings: ProviderSettings) -> ProviderFactory {
    provider_factory(move |credential| build_provider(&settings, credential))
}

/// Per-turn choices made by the caller.
#[derive(Clone)]
pub struct TurnOptions {
    pub style: String,
    pub reasoning: bool,
    pub language: Language,

    /// Overrides the configured API key for this turn.
    pub credential: Option<String>,
}

impl TurnOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            style: config.agent.default_style.clone(),
            reasoning: config.agent.reasoning,
            language: config.language,
            credential: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: bool) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

impl std::fmt::Debug for TurnOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOptions")
            .field("style", &self.style)
            .field("reasoning", &self.reasoning)
            .field("language", &self.language)
            .field("credential", &self.credential.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KnowledgeStatus {
    Ready { documents: usize, chunks: usize },
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachStatus {
    pub provider: String,
    pub model: String,
    pub language: Language,
    pub api_key_configured: bool,
    pub documents_dir: String,
    pub knowledge: KnowledgeStatus,
    pub threads: usize,
}

#[derive(Clone)]
struct PreparedAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
}

pub struct Coach {
    config: AppConfig,
    knowledge: Arc<KnowledgeBase>,
    sessions: SessionManager,
    agents: AgentCache<PreparedAgent>,
    factory: ProviderFactory,
    events: Arc<EventBus>,
}

impl Coach {
    pub fn new(
        config: AppConfig,
        knowledge: Arc<KnowledgeBase>,
        store: Arc<dyn ThreadStore>,
        factory: ProviderFactory,
    ) -> Self {
        Self {
            config,
            knowledge,
            sessions: SessionManager::new(store),
            agents: AgentCache::new(),
            factory,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Wire a coach from configuration: documents directory, in-memory
    /// threads, and the configured provider.
    pub fn from_config(config: AppConfig) -> Self {
        let events = Arc::new(EventBus::default());
        let factory = default_factory(config.provider.clone());
        let knowledge = Arc::new(
            knowledge_base(&config, embedder_for(&config, &factory)).with_events(Arc::clone(&events)),
        );
        Self::new(config, knowledge, Arc::new(InMemoryThreadStore::new()), factory)
            .with_events(events)
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Run one turn on `thread`, waiting for any turn already running there.
    pub async fn ask(
        &self,
        thread: &ThreadId,
        text: &str,
        options: &TurnOptions,
    ) -> Result<TurnResult, Error> {
        let (agent, config) = self.prepare(options).await?;
        let _turn = self.sessions.begin_turn(thread).await;
        agent.run_turn(thread, text, &config).await
    }

    /// Like `ask`, but yields snapshots as the turn progresses.
    pub async fn ask_streaming(
        &self,
        thread: &ThreadId,
        text: &str,
        options: &TurnOptions,
    ) -> Result<ReceiverStream<TurnSnapshot>, Error> {
        let (agent, config) = self.prepare(options).await?;
        let guard = self.sessions.begin_turn(thread).await;
        Ok(agent.spawn_stream(thread.clone(), text.to_string(), config, Some(guard)))
    }

    pub async fn status(&self) -> CoachStatus {
        let knowledge = match self.knowledge.store().await {
            Ok(store) if store.is_empty() => KnowledgeStatus::Empty,
            Ok(store) => KnowledgeStatus::Ready {
                documents: store.document_count(),
                chunks: store.len(),
            },
            Err(e) => KnowledgeStatus::Failed {
                reason: e.to_string(),
            },
        };
        let threads = match self.sessions.threads().await {
            Ok(ids) => ids.len(),
            Err(e) => {
                warn!(error = %e, "Could not list threads");
                0
            }
        };

        CoachStatus {
            provider: self.config.provider.name.clone(),
            model: self.config.provider.model.clone(),
            language: self.config.language,
            api_key_configured: self.config.has_api_key(),
            documents_dir: self.config.knowledge.documents_dir.display().to_string(),
            knowledge,
            threads,
        }
    }

    /// Compose the prompt and fetch (or build) the provider and tools for it.
    async fn prepare(&self, options: &TurnOptions) -> Result<(AgentLoop, AgentConfig), Error> {
        let locale = Locale::for_language(options.language);
        let persona = self
            .config
            .persona
            .clone()
            .unwrap_or_else(|| locale.persona.to_string());
        let prompt = StyleComposer::new(options.language).compose(
            &persona,
            &options.style,
            &self.config.styles,
            options.reasoning,
        );

        let credential = options
            .credential
            .as_deref()
            .or(self.config.api_key.as_deref());
        // A failed build is retried by `is_available`, so availability is
        // part of the key rather than baked into a cached registry.
        let knowledge_ready = self.knowledge.is_available().await;
        let key = AgentKey::new(credential, &prompt.system_prompt, prompt.temperature)
            .with_knowledge(knowledge_ready);

        let prepared = self
            .agents
            .get_or_try_init(key, || async {
                let provider = (self.factory)(credential)?;
                let retriever: Option<Arc<dyn Retriever>> = if knowledge_ready {
                    Some(Arc::clone(&self.knowledge) as Arc<dyn Retriever>)
                } else {
                    info!("{}", locale.no_documents);
                    None
                };
                let tools = coach_registry(retriever, self.config.knowledge.top_k, locale);
                info!(
                    provider = provider.name(),
                    tools = ?tools.names(),
                    "Prepared agent"
                );
                Ok::<_, Error>(PreparedAgent {
                    provider,
                    tools: Arc::new(tools),
                })
            })
            .await?;

        let agent = AgentLoop::new(
            prepared.provider,
            self.sessions.store(),
            self.config.provider.model.clone(),
            Arc::clone(&self.events),
        )
        .with_max_tokens(self.config.provider.max_tokens)
        .with_locale(locale);

        let config = AgentConfig::new(prompt.system_prompt, prompt.temperature)
            .with_max_iterations(self.config.agent.max_tool_iterations)
            .with_tools(prepared.tools);

        Ok((agent, config))
    }
}

/// The knowledge base over the configured documents directory.
pub fn knowledge_base(config: &AppConfig, embedder: Arc<dyn Embedder>) -> KnowledgeBase {
    let settings = &config.knowledge;
    KnowledgeBase::new(
        Arc::new(DirectoryLoader::new(&settings.documents_dir)),
        RecursiveSplitter::new(settings.chunk_size, settings.chunk_overlap),
        embedder,
    )
}

fn embedder_for(config: &AppConfig, factory: &ProviderFactory) -> Arc<dyn Embedder> {
    let settings = &config.knowledge;
    match settings.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(settings.embedding_dimensions)),
        EmbedderKind::Provider => match factory(config.api_key.as_deref()) {
            Ok(provider) => Arc::new(ProviderEmbedder::new(provider, &settings.embedding_model)),
            Err(e) => {
                warn!(error = %e, "Embedding provider unavailable; using hashing embedder");
                Arc::new(HashingEmbedder::new(settings.embedding_dimensions))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use fitcoach_core::agent::LoopState;
    use fitcoach_core::message::Message;
    use fitcoach_knowledge::{Document, DocumentSource, StaticDocuments};
    use fitcoach_core::error::KnowledgeError;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        coach: Coach,
        provider: Arc<SequentialMockProvider>,
        builds: Arc<AtomicUsize>,
    }

    fn harness(documents: StaticDocuments, provider: SequentialMockProvider) -> Harness {
        let provider = Arc::new(provider);
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = {
            let provider = Arc::clone(&provider);
            let builds = Arc::clone(&builds);
            provider_factory(move |_credential| {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::clone(&provider) as Arc<dyn Provider>)
            })
        };
        let knowledge = Arc::new(KnowledgeBase::new(
            Arc::new(documents),
            RecursiveSplitter::default(),
            Arc::new(HashingEmbedder::default()),
        ));
        let mut config = AppConfig::default();
        config.api_key = Some("gsk_test".into());
        Harness {
            coach: Coach::new(config, knowledge, Arc::new(InMemoryThreadStore::new()), factory),
            provider,
            builds,
        }
    }

    fn fitness_docs() -> StaticDocuments {
        StaticDocuments::from_texts([
            ("protein.txt", "Aim for 1.6 grams of protein per kilogram of body weight."),
            ("sleep.txt", "Sleep seven to nine hours for recovery."),
        ])
    }

    fn options(coach: &Coach) -> TurnOptions {
        TurnOptions::from_config(coach.config())
    }

    #[tokio::test]
    async fn ask_uses_knowledge_when_available() {
        let h = harness(
            fitness_docs(),
            SequentialMockProvider::tool_then_answer(
                vec![make_tool_call(
                    "c1",
                    "fitness_knowledge",
                    serde_json::json!({"query": "protein per kilogram"}),
                )],
                "About 1.6 g/kg.",
            ),
        );
        let thread = h.coach.sessions().new_thread();

        let result = h
            .coach
            .ask(&thread, "How much protein?", &options(&h.coach))
            .await
            .unwrap();

        assert_eq!(result.answer_text, "About 1.6 g/kg.");
        assert_eq!(result.tools_invoked, vec!["fitness_knowledge"]);
        let requests = h.provider.requests();
        assert_eq!(requests[0].tools[0].name, "fitness_knowledge");
        let tool_output = requests[1].messages[3].content().to_string();
        assert!(tool_output.contains("Source: protein.txt"));
    }

    #[tokio::test]
    async fn empty_knowledge_base_means_no_tools() {
        let h = harness(
            StaticDocuments::default(),
            SequentialMockProvider::single_text("Eat protein with every meal."),
        );
        let thread = ThreadId::from("t1");

        let result = h.coach.ask(&thread, "protein?", &options(&h.coach)).await.unwrap();

        assert_eq!(result.state(), LoopState::Done);
        assert!(result.tools_invoked.is_empty());
        assert!(h.provider.requests()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn prepared_agent_is_cached_per_key() {
        let h = harness(
            fitness_docs(),
            SequentialMockProvider::new(vec![
                Ok(make_text_response("one")),
                Ok(make_text_response("two")),
                Ok(make_text_response("three")),
            ]),
        );
        let thread = ThreadId::from("t1");
        let normal = options(&h.coach);

        h.coach.ask(&thread, "a", &normal).await.unwrap();
        h.coach.ask(&thread, "b", &normal).await.unwrap();
        assert_eq!(h.builds.load(Ordering::SeqCst), 1);

        let creative = normal.clone().with_style("creative");
        h.coach.ask(&thread, "c", &creative).await.unwrap();
        assert_eq!(h.builds.load(Ordering::SeqCst), 2);

        // Creative style reached the provider with its temperature.
        assert!((h.provider.requests()[2].temperature - 1.0).abs() < f32::EPSILON);
    }

    /// Fails its first load, then serves one document.
    struct FlakySource {
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DocumentSource for FlakySource {
        fn describe(&self) -> String {
            "flaky".into()
        }

        async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
            if self.loads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(KnowledgeError::Load {
                    path: "flaky".into(),
                    reason: "disk not mounted".into(),
                });
            }
            StaticDocuments::from_texts([("creatine.txt", "Creatine monohydrate: 3-5 g daily.")])
                .load()
                .await
        }
    }

    #[tokio::test]
    async fn tool_is_registered_once_a_failed_build_recovers() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_text_response("No documents yet.")),
            Ok(make_text_response("3-5 g daily.")),
        ]));
        let factory = {
            let provider = Arc::clone(&provider);
            provider_factory(move |_| Ok(Arc::clone(&provider) as Arc<dyn Provider>))
        };
        let knowledge = Arc::new(KnowledgeBase::new(
            Arc::new(FlakySource {
                loads: AtomicUsize::new(0),
            }),
            RecursiveSplitter::default(),
            Arc::new(HashingEmbedder::default()),
        ));
        let mut config = AppConfig::default();
        config.api_key = Some("gsk_test".into());
        let coach = Coach::new(
            config,
            Arc::clone(&knowledge),
            Arc::new(InMemoryThreadStore::new()),
            factory,
        );
        let thread = ThreadId::from("t1");
        let opts = TurnOptions::from_config(coach.config());

        coach.ask(&thread, "creatine?", &opts).await.unwrap();
        coach.ask(&thread, "creatine dose?", &opts).await.unwrap();

        assert_eq!(knowledge.build_count(), 2);
        let requests = provider.requests();
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[1].tools.len(), 1);
        assert_eq!(requests[1].tools[0].name, "fitness_knowledge");
    }

    #[tokio::test]
    async fn reasoning_option_changes_prompt_and_temperature() {
        let h = harness(
            StaticDocuments::default(),
            SequentialMockProvider::single_text("<thinking>simple</thinking>Drink water."),
        );
        let opts = options(&h.coach).with_reasoning(true);

        let result = h.coach.ask(&ThreadId::from("t1"), "hydration?", &opts).await.unwrap();

        assert_eq!(result.answer_text, "Drink water.");
        let request = &h.provider.requests()[0];
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert!(request.messages[0].content().contains("<thinking>"));
    }

    #[tokio::test]
    async fn same_thread_turns_do_not_interleave() {
        let h = harness(
            StaticDocuments::default(),
            SequentialMockProvider::new(vec![
                Ok(make_text_response("first")),
                Ok(make_text_response("second")),
            ]),
        );
        let coach = Arc::new(h.coach);
        let thread = ThreadId::from("shared");
        let opts = options(&coach);

        let (a, b) = tokio::join!(
            coach.ask(&thread, "q1", &opts),
            coach.ask(&thread, "q2", &opts)
        );
        a.unwrap();
        b.unwrap();

        // The second turn saw the first turn's history.
        let mut sent: Vec<usize> = h.provider.requests().iter().map(|r| r.messages.len()).collect();
        sent.sort();
        assert_eq!(sent, vec![2, 4]);

        let history = coach.sessions().history(&thread).await.unwrap();
        let roles: Vec<_> = history.iter().map(Message::role).collect();
        use fitcoach_core::message::Role::{Assistant, User};
        assert_eq!(roles, vec![User, Assistant, User, Assistant]);
    }

    #[tokio::test]
    async fn streaming_ask_ends_with_result() {
        let h = harness(
            StaticDocuments::default(),
            SequentialMockProvider::single_text("Warm up for ten minutes."),
        );
        let thread = ThreadId::from("t1");

        let snapshots: Vec<TurnSnapshot> = h
            .coach
            .ask_streaming(&thread, "warm up?", &options(&h.coach))
            .await
            .unwrap()
            .collect()
            .await;

        let result = snapshots.last().and_then(|s| s.result.clone()).unwrap();
        assert_eq!(result.answer_text, "Warm up for ten minutes.");
        assert_eq!(h.coach.sessions().history(&thread).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn provider_construction_failure_is_an_error() {
        let knowledge = Arc::new(KnowledgeBase::new(
            Arc::new(StaticDocuments::default()),
            RecursiveSplitter::default(),
            Arc::new(HashingEmbedder::default()),
        ));
        let factory = provider_factory(|_| Err(ProviderError::NotConfigured("no API key".into())));
        let coach = Coach::new(
            AppConfig::default(),
            knowledge,
            Arc::new(InMemoryThreadStore::new()),
            factory,
        );

        let err = coach
            .ask(&ThreadId::from("t1"), "hi", &TurnOptions::from_config(coach.config()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn status_reports_knowledge_and_provider() {
        let h = harness(fitness_docs(), SequentialMockProvider::new(vec![]));
        let status = h.coach.status().await;

        assert_eq!(status.provider, "groq");
        assert!(status.api_key_configured);
        assert_eq!(
            status.knowledge,
            KnowledgeStatus::Ready {
                documents: 2,
                chunks: 2
            }
        );
        assert_eq!(status.threads, 0);
    }

    #[test]
    fn turn_options_debug_redacts_credential() {
        let opts = TurnOptions::from_config(&AppConfig::default()).with_credential("gsk_secret");
        assert!(!format!("{opts:?}").contains("gsk_secret"));
    }
}
