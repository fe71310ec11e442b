use crate::error::{TurnError, TurnStage};
use crate::prompts::CONTEXTUALIZE_SYSTEM_PROMPT;
use crate::run_stage;
use chat_core::config::ConversationConfig;
use chat_core::{GenerationServiceError, Message, SessionHistory};
use llm::GenerationService;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Rewrites a follow-up utterance into a question that stands on its own.
pub struct Contextualizer {
    llm: Arc<dyn GenerationService>,
    system_prompt: String,
    history_window: Option<usize>,
    deadline: Duration,
}

impl Contextualizer {
    pub fn new(llm: Arc<dyn GenerationService>, config: &ConversationConfig) -> Self {
        Self {
            llm,
            system_prompt: config
                .contextualize_prompt
                .clone()
                .unwrap_or_else(|| CONTEXTUALIZE_SYSTEM_PROMPT.to_string()),
            history_window: config.max_history_turns,
            deadline: Duration::from_secs(config.service_timeout_secs),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// System instruction, prior turns, then the new utterance.
    pub fn build_prompt(&self, history: &SessionHistory, utterance: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend(history.to_messages(self.history_window));
        messages.push(Message::user(utterance));
        messages
    }

    /// Returns the standalone question. With no prior turns the utterance is
    /// returned unchanged and no service call is made.
    pub async fn contextualize(
        &self,
        history: &SessionHistory,
        utterance: &str,
    ) -> Result<String, TurnError> {
        if history.to_messages(self.history_window).is_empty() {
            debug!("No prior turns, using utterance as standalone question");
            return Ok(utterance.to_string());
        }

        let messages = self.build_prompt(history, utterance);

        let rewritten = run_stage(TurnStage::Contextualize, self.deadline, async {
            self.llm
                .complete(&messages)
                .await
                .map_err(TurnError::Contextualize)
        })
        .await?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return Err(TurnError::Contextualize(GenerationServiceError::new(
                self.llm.name(),
                "empty standalone question",
            )));
        }

        debug!(original = %utterance, standalone = %rewritten, "Contextualized utterance");
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;
    use chat_core::{Role, Turn};

    fn sky_history() -> SessionHistory {
        let mut history = SessionHistory::new();
        history.push(Turn::new("What color is the sky?", "The sky is blue."));
        history
    }

    #[tokio::test]
    async fn should_skip_service_when_history_is_empty() {
        let llm = Arc::new(ScriptedLlm::replying(&[]));
        let contextualizer = Contextualizer::new(llm.clone(), &ConversationConfig::default());

        let question = contextualizer
            .contextualize(&SessionHistory::new(), "What color is the sky?")
            .await
            .unwrap();

        assert_eq!(question, "What color is the sky?");
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn should_rewrite_follow_up_using_history() {
        let llm = Arc::new(ScriptedLlm::replying(&["  What color is the grass?\n"]));
        let contextualizer = Contextualizer::new(llm.clone(), &ConversationConfig::default());

        let question = contextualizer
            .contextualize(&sky_history(), "What about grass?")
            .await
            .unwrap();

        assert_eq!(question, "What color is the grass?");

        let prompt = &llm.prompts()[0];
        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[0].content, CONTEXTUALIZE_SYSTEM_PROMPT);
        assert_eq!(prompt[1], Message::user("What color is the sky?"));
        assert_eq!(prompt[2], Message::assistant("The sky is blue."));
        assert_eq!(prompt[3], Message::user("What about grass?"));
    }

    #[tokio::test]
    async fn should_use_configured_prompt_and_window() {
        let mut history = sky_history();
        history.push(Turn::new("And the sea?", "The sea is blue too."));
        let config = ConversationConfig {
            contextualize_prompt: Some("Rewrite the question.".to_string()),
            max_history_turns: Some(1),
            ..ConversationConfig::default()
        };
        let llm = Arc::new(ScriptedLlm::replying(&["What color is the grass?"]));
        let contextualizer = Contextualizer::new(llm.clone(), &config);

        contextualizer
            .contextualize(&history, "What about grass?")
            .await
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert_eq!(prompt[0].content, "Rewrite the question.");
        assert_eq!(prompt[1], Message::user("And the sea?"));
        assert_eq!(prompt.len(), 4);
    }

    #[tokio::test]
    async fn should_report_service_failure_as_contextualize_error() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(GenerationServiceError::new(
            "scripted",
            "rate limited",
        ))]));
        let contextualizer = Contextualizer::new(llm, &ConversationConfig::default());

        let err = contextualizer
            .contextualize(&sky_history(), "What about grass?")
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Contextualize(ref e) if e.message == "rate limited"));
    }

    #[tokio::test]
    async fn should_reject_blank_rewrite() {
        let llm = Arc::new(ScriptedLlm::replying(&["   "]));
        let contextualizer = Contextualizer::new(llm, &ConversationConfig::default());

        let err = contextualizer
            .contextualize(&sky_history(), "What about grass?")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(TurnStage::Contextualize));
    }

    #[tokio::test]
    async fn should_time_out_slow_service() {
        let llm = Arc::new(ScriptedLlm::slow(Duration::from_secs(5)));
        let contextualizer = Contextualizer::new(llm, &ConversationConfig::default())
            .with_deadline(Duration::from_millis(20));

        let err = contextualizer
            .contextualize(&sky_history(), "What about grass?")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TurnError::Timeout {
                stage: TurnStage::Contextualize,
                ..
            }
        ));
    }
}
