use crate::contextualizer::Contextualizer;
use crate::error::TurnError;
use crate::generator::Generator;
use chat_core::config::{ContextualizeFailurePolicy, ConversationConfig, RetrievalConfig};
use chat_core::{Chunk, InvalidParameterError, SessionStore, Turn};
use llm::GenerationService;
use retrieval::Index;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Contextualizing,
    RetrievingAndGenerating,
    Completed,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::AwaitingInput => "awaiting_input",
            TurnState::Contextualizing => "contextualizing",
            TurnState::RetrievingAndGenerating => "retrieving_and_generating",
            TurnState::Completed => "completed",
            TurnState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub answer: String,
    /// The question actually used for retrieval and answering.
    pub standalone_question: String,
    pub sources: Vec<Chunk>,
    /// Number of turns in the session after this one was recorded.
    pub history_len: usize,
}

struct TurnTracker<'a> {
    session_id: &'a str,
    state: TurnState,
}

impl<'a> TurnTracker<'a> {
    fn start(session_id: &'a str) -> Self {
        Self {
            session_id,
            state: TurnState::AwaitingInput,
        }
    }

    fn advance(&mut self, next: TurnState) {
        debug!(
            session_id = self.session_id,
            from = %self.state,
            to = %next,
            "Turn state transition"
        );
        self.state = next;
    }

    fn fail(&mut self, err: TurnError) -> TurnError {
        warn!(
            session_id = self.session_id,
            state = %self.state,
            retryable = err.is_retryable(),
            "Turn failed: {}",
            err
        );
        self.advance(TurnState::Failed);
        err
    }
}

/// Runs conversation turns against a shared session store.
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    contextualizer: Contextualizer,
    generator: Generator,
    on_contextualize_failure: ContextualizeFailurePolicy,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        llm: Arc<dyn GenerationService>,
        conversation: &ConversationConfig,
        retrieval: &RetrievalConfig,
    ) -> Result<Self, InvalidParameterError> {
        Ok(Self {
            sessions,
            contextualizer: Contextualizer::new(Arc::clone(&llm), conversation),
            generator: Generator::new(llm, conversation, retrieval)?,
            on_contextualize_failure: conversation.on_contextualize_failure,
        })
    }

    pub fn from_parts(
        sessions: Arc<SessionStore>,
        contextualizer: Contextualizer,
        generator: Generator,
        on_contextualize_failure: ContextualizeFailurePolicy,
    ) -> Self {
        Self {
            sessions,
            contextualizer,
            generator,
            on_contextualize_failure,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn ask(
        &self,
        session_id: &str,
        utterance: &str,
        index: &Index,
    ) -> Result<String, TurnError> {
        Ok(self.run_turn(session_id, utterance, index).await?.answer)
    }

    /// Contextualizes, retrieves and answers, then records the turn. The
    /// history is appended to only when every stage succeeds.
    pub async fn run_turn(
        &self,
        session_id: &str,
        utterance: &str,
        index: &Index,
    ) -> Result<TurnOutcome, TurnError> {
        let mut tracker = TurnTracker::start(session_id);

        if utterance.trim().is_empty() {
            return Err(tracker.fail(TurnError::InvalidInput(InvalidParameterError(
                "utterance must not be empty".to_string(),
            ))));
        }

        let history = self.sessions.snapshot(session_id);

        tracker.advance(TurnState::Contextualizing);
        let standalone_question = match self.contextualizer.contextualize(&history, utterance).await
        {
            Ok(question) => question,
            Err(err) if self.on_contextualize_failure == ContextualizeFailurePolicy::RawUtterance => {
                warn!(
                    session_id,
                    "Contextualization failed, falling back to raw utterance: {}", err
                );
                utterance.to_string()
            }
            Err(err) => return Err(tracker.fail(err)),
        };

        tracker.advance(TurnState::RetrievingAndGenerating);
        let answer = match self
            .generator
            .generate_grounded(&standalone_question, &history, index)
            .await
        {
            Ok(answer) => answer,
            Err(err) => return Err(tracker.fail(err)),
        };

        let history_len = self
            .sessions
            .append(session_id, Turn::new(utterance, answer.text.clone()));
        tracker.advance(TurnState::Completed);

        info!(
            session_id,
            history_len,
            sources = answer.sources.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            answer: answer.text,
            standalone_question,
            sources: answer.sources,
            history_len,
        })
    }

    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.history(session_id)
    }
}
