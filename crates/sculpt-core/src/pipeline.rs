//! Command pipeline
//!
//! Owns the scene and runs one command at a time:
//! interpret -> validate -> apply (in order) -> import side effects.
//!
//! Network waits race the pipeline's cancellation signal. An abandoned import
//! leaves nothing behind because the importer stages resources in a guard.
//!
//! Scene events and the last committed snapshot are published outside the
//! command lock, so observers never wait for a running command.

use crate::config::{ConcurrencyPolicy, SculptConfig, SearchMode};
use crate::error::PipelineError;
use crate::executor::{ActionExecutor, SideEffect};
use crate::feedback::{CommandReport, EntryStatus, FeedbackEntry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sculpt_action::ActionValidator;
use sculpt_import::{AssetCandidate, AssetImporter, AssetService, ImportError, SketchfabClient};
use sculpt_interpreter::{CommandInterpreter, LanguageModel, OpenAiChatModel, PromptBuilder};
use sculpt_scene::{ResourceArena, SceneEvent, SceneSnapshot, SceneState, Vec3};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, MutexGuard, Notify};
use tracing::Instrument;
use uuid::Uuid;

const CANCELLED_MESSAGE: &str = "Command cancelled.";

/// Candidates waiting for [`CommandPipeline::choose`]
#[derive(Debug, Clone)]
struct PendingChoice {
    term: String,
    position: Vec3,
    candidates: Vec<AssetCandidate>,
}

struct PipelineState {
    scene: SceneState,
    rng: StdRng,
    pending: Option<PendingChoice>,
}

/// Single-flight command runner
pub struct CommandPipeline {
    interpreter: CommandInterpreter,
    importer: AssetImporter,
    executor: ActionExecutor,
    validator: ActionValidator,
    state: Mutex<PipelineState>,
    events: broadcast::Sender<SceneEvent>,
    published: watch::Sender<SceneSnapshot>,
    cancel: Notify,
    policy: ConcurrencyPolicy,
    search_mode: SearchMode,
}

impl std::fmt::Debug for CommandPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPipeline")
            .field("policy", &self.policy)
            .field("search_mode", &self.search_mode)
            .field("importer", &self.importer)
            .finish_non_exhaustive()
    }
}

impl CommandPipeline {
    /// Create pipeline over a model and an asset service
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, service: Arc<dyn AssetService>) -> Self {
        let arena = ResourceArena::shared();
        let scene = SceneState::new();
        let events = scene.event_sender();
        let (published, _) = watch::channel(scene.snapshot());
        Self {
            interpreter: CommandInterpreter::new(model),
            importer: AssetImporter::new(service, Arc::clone(&arena)),
            executor: ActionExecutor::new(arena),
            validator: ActionValidator::new(),
            state: Mutex::new(PipelineState {
                scene,
                rng: StdRng::from_entropy(),
                pending: None,
            }),
            events,
            published,
            cancel: Notify::new(),
            policy: ConcurrencyPolicy::default(),
            search_mode: SearchMode::Best,
        }
    }

    /// Build the HTTP-backed pipeline described by `config`
    ///
    /// # Errors
    /// - `PipelineError::Config` for invalid values
    /// - `PipelineError::Setup` if a client cannot be constructed
    pub fn from_config(config: &SculptConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let model = OpenAiChatModel::new(&config.interpreter).map_err(|e| PipelineError::Setup(e.to_string()))?;
        let service = SketchfabClient::new(&config.assets.service).map_err(|e| PipelineError::Setup(e.to_string()))?;

        let mut pipeline = Self::new(Arc::new(model), Arc::new(service))
            .with_policy(config.pipeline.concurrency)
            .with_search_mode(config.assets.search_mode())
            .with_prompt(PromptBuilder::new().with_max_snapshot_objects(config.interpreter.max_snapshot_objects));
        if let Some(seed) = config.pipeline.rng_seed {
            pipeline = pipeline.with_seed(seed);
        }
        Ok(pipeline)
    }

    /// With concurrency policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With search mode
    #[inline]
    #[must_use]
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// With deterministic default positions
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.state.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// With custom prompt settings
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.interpreter = self.interpreter.with_prompt(prompt);
        self
    }

    /// Arena holding imported model resources
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &Arc<ResourceArena> {
        self.importer.arena()
    }

    /// Abandon any in-flight network wait of the running command
    pub fn cancel(&self) {
        tracing::info!("cancellation requested");
        self.cancel.notify_waiters();
    }

    /// Scene as of the last finished command
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.published.borrow().clone()
    }

    /// Follow snapshots as commands finish
    #[must_use]
    pub fn watch_snapshots(&self) -> watch::Receiver<SceneSnapshot> {
        self.published.subscribe()
    }

    /// Subscribe to scene change events, including those of a running command
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Read the scene under the command lock
    pub async fn with_scene<R>(&self, f: impl FnOnce(&SceneState) -> R) -> R {
        f(&self.state.lock().await.scene)
    }

    /// Candidates offered by the last `search`, if any
    pub async fn pending_choices(&self) -> Option<Vec<AssetCandidate>> {
        self.state.lock().await.pending.as_ref().map(|p| p.candidates.clone())
    }

    /// Run one natural-language command
    ///
    /// Interpretation failures and per-action problems are reported in the
    /// returned [`CommandReport`].
    ///
    /// # Errors
    /// - `PipelineError::EmptyCommand` for blank text
    /// - `PipelineError::Busy` under `ConcurrencyPolicy::Reject`
    /// - `PipelineError::Cancelled` if cancelled while queued behind another command
    pub async fn execute(&self, text: &str) -> Result<CommandReport, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyCommand);
        }

        let command_id = Uuid::new_v4();
        let span = tracing::info_span!("command", id = %command_id);
        self.run(command_id, text).instrument(span).await
    }

    /// Import the `index`-th candidate offered by the last `search`
    ///
    /// # Errors
    /// - `PipelineError::NoPendingChoice` / `PipelineError::ChoiceOutOfRange`
    /// - `PipelineError::Busy` under `ConcurrencyPolicy::Reject`
    pub async fn choose(&self, index: usize) -> Result<CommandReport, PipelineError> {
        let command_id = Uuid::new_v4();
        let span = tracing::info_span!("command", id = %command_id, choice = index);
        self.run_choice(command_id, index).instrument(span).await
    }

    async fn lock(&self) -> Result<MutexGuard<'_, PipelineState>, PipelineError> {
        match self.policy {
            ConcurrencyPolicy::Queue => tokio::select! {
                guard = self.state.lock() => Ok(guard),
                () = self.cancel.notified() => {
                    tracing::info!("queued command cancelled");
                    Err(PipelineError::Cancelled)
                }
            },
            ConcurrencyPolicy::Reject => self.state.try_lock().map_err(|_| {
                tracing::warn!("command rejected, pipeline busy");
                PipelineError::Busy
            }),
        }
    }

    async fn run(&self, command_id: Uuid, text: &str) -> Result<CommandReport, PipelineError> {
        let mut guard = self.lock().await?;
        let state = &mut *guard;
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);

        metrics::counter!("sculpt_commands_total").increment(1);
        tracing::info!(command = text, "command received");

        let snapshot = state.scene.snapshot();
        let interpreted = tokio::select! {
            result = self.interpreter.interpret(text, &snapshot) => result,
            () = &mut cancelled => {
                tracing::info!("command cancelled during interpretation");
                let entry = FeedbackEntry::skipped(0, CANCELLED_MESSAGE);
                record(&entry);
                return Ok(CommandReport::new(command_id, text, vec![entry]));
            }
        };

        let candidates = match interpreted {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "interpretation failed");
                let entry = FeedbackEntry::failed(0, e.user_message());
                record(&entry);
                return Ok(CommandReport::new(command_id, text, vec![entry]));
            }
        };
        tracing::debug!(candidates = candidates.len(), "candidates parsed");

        let mut entries = Vec::with_capacity(candidates.len());
        let mut aborted = false;

        for (index, candidate) in candidates.iter().enumerate() {
            if aborted {
                entries.push(FeedbackEntry::skipped(index, CANCELLED_MESSAGE));
                continue;
            }

            let action = match self.validator.validate(candidate, &mut state.rng) {
                Ok(action) => action,
                Err(e) => {
                    tracing::info!(index, error = %e, "action rejected");
                    entries.push(FeedbackEntry::failed(index, format!("Could not understand action {index}: {e}.")));
                    continue;
                }
            };

            tracing::info!(index, action = action.tag(), "applying action");
            let applied = self.executor.apply(index, action, &mut state.scene, &mut state.rng);
            let entry = match applied.effect {
                None => applied.entry,
                Some(SideEffect::ImportAsset { term, position }) => {
                    let (entry, was_cancelled) = self
                        .import(index, term, position, state, cancelled.as_mut())
                        .await;
                    aborted = was_cancelled;
                    entry
                }
            };
            entries.push(entry);
        }

        entries.iter().for_each(record);
        self.published.send_replace(state.scene.snapshot());
        let report = CommandReport::new(command_id, text, entries);
        tracing::info!(
            applied = report.applied(),
            skipped = report.count(EntryStatus::Skipped),
            failed = report.failed(),
            "command finished"
        );
        Ok(report)
    }

    async fn run_choice(&self, command_id: Uuid, index: usize) -> Result<CommandReport, PipelineError> {
        let mut guard = self.lock().await?;
        let state = &mut *guard;
        let pending = state.pending.as_ref().ok_or(PipelineError::NoPendingChoice)?;
        let candidate = pending
            .candidates
            .get(index)
            .cloned()
            .ok_or(PipelineError::ChoiceOutOfRange {
                index,
                available: pending.candidates.len(),
            })?;
        let term = pending.term.clone();
        let position = pending.position;

        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        let command = format!("choose {index}");
        metrics::counter!("sculpt_commands_total").increment(1);

        let outcome = race(
            self.importer.import_candidate(candidate, &term, position),
            cancelled.as_mut(),
        )
        .await;
        let entry = match outcome {
            Ok(imported) => {
                state.pending = None;
                metrics::counter!("sculpt_imports_total", "outcome" => "imported").increment(1);
                self.executor.place_import(0, imported, &mut state.scene)
            }
            Err(e) => import_failure(0, &term, &e),
        };
        record(&entry);
        self.published.send_replace(state.scene.snapshot());
        Ok(CommandReport::new(command_id, command, vec![entry]))
    }

    /// Run an import side effect; the flag reports cancellation
    async fn import(
        &self,
        index: usize,
        term: String,
        position: Vec3,
        state: &mut PipelineState,
        cancelled: std::pin::Pin<&mut tokio::sync::futures::Notified<'_>>,
    ) -> (FeedbackEntry, bool) {
        match self.search_mode {
            SearchMode::Best => {
                match race(self.importer.import_best(&term, position), cancelled).await {
                    Ok(imported) => {
                        metrics::counter!("sculpt_imports_total", "outcome" => "imported").increment(1);
                        (self.executor.place_import(index, imported, &mut state.scene), false)
                    }
                    Err(e) => {
                        let was_cancelled = matches!(e, ImportError::Cancelled);
                        (import_failure(index, &term, &e), was_cancelled)
                    }
                }
            }
            SearchMode::Offer { count } => match race(self.importer.search(&term), cancelled).await {
                Ok(mut candidates) => {
                    candidates.truncate(count);
                    let message = offer_message(&term, &candidates);
                    state.pending = Some(PendingChoice {
                        term,
                        position,
                        candidates,
                    });
                    (FeedbackEntry::applied(index, message), false)
                }
                Err(e) => {
                    let was_cancelled = matches!(e, ImportError::Cancelled);
                    (import_failure(index, &term, &e), was_cancelled)
                }
            },
        }
    }
}

/// Await `work` unless the cancellation signal fires first
async fn race<T>(
    work: impl Future<Output = Result<T, ImportError>>,
    cancelled: std::pin::Pin<&mut tokio::sync::futures::Notified<'_>>,
) -> Result<T, ImportError> {
    tokio::select! {
        result = work => result,
        () = cancelled => Err(ImportError::Cancelled),
    }
}

fn import_failure(index: usize, term: &str, error: &ImportError) -> FeedbackEntry {
    metrics::counter!("sculpt_imports_total", "outcome" => error.kind()).increment(1);
    match error {
        ImportError::Cancelled => {
            tracing::info!(term, "import cancelled");
            FeedbackEntry::failed(index, format!("Import of '{term}' cancelled."))
        }
        ImportError::NoResults { .. } => FeedbackEntry::failed(index, format!("No downloadable models found for '{term}'.")),
        other => {
            tracing::warn!(term, error = %other, retryable = other.is_retryable(), "import failed");
            FeedbackEntry::failed(index, format!("Could not import '{term}': {other}."))
        }
    }
}

fn offer_message(term: &str, candidates: &[AssetCandidate]) -> String {
    let mut lines = vec![format!("Found {} model(s) for '{term}':", candidates.len())];
    lines.extend(
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("  [{i}] {} ({} likes, {} views)", c.name, c.like_count, c.view_count)),
    );
    lines.join("\n")
}

fn record(entry: &FeedbackEntry) {
    metrics::counter!("sculpt_actions_total", "status" => entry.status.as_str()).increment(1);
}
