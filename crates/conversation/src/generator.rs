use crate::error::{TurnError, TurnStage};
use crate::prompts::{render_answer_prompt, ANSWER_SYSTEM_PROMPT};
use crate::run_stage;
use chat_core::config::{ConversationConfig, RetrievalConfig};
use chat_core::{Chunk, InvalidParameterError, Message, SessionHistory};
use llm::GenerationService;
use retrieval::Index;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An answer together with the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<Chunk>,
}

/// Answers a standalone question from the chunks retrieved for it.
pub struct Generator {
    llm: Arc<dyn GenerationService>,
    system_prompt: String,
    top_k: usize,
    history_window: Option<usize>,
    deadline: Duration,
}

impl Generator {
    pub fn new(
        llm: Arc<dyn GenerationService>,
        conversation: &ConversationConfig,
        retrieval: &RetrievalConfig,
    ) -> Result<Self, InvalidParameterError> {
        retrieval.validate()?;
        Ok(Self {
            llm,
            system_prompt: conversation
                .answer_prompt
                .clone()
                .unwrap_or_else(|| ANSWER_SYSTEM_PROMPT.to_string()),
            top_k: retrieval.top_k,
            history_window: conversation.max_history_turns,
            deadline: Duration::from_secs(conversation.service_timeout_secs),
        })
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Instruction with the retrieved context, prior turns, then the query.
    pub fn build_prompt(
        &self,
        query: &str,
        history: &SessionHistory,
        context: &[Chunk],
    ) -> Vec<Message> {
        let context = context
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut messages = vec![Message::system(render_answer_prompt(
            &self.system_prompt,
            &context,
        ))];
        messages.extend(history.to_messages(self.history_window));
        messages.push(Message::user(query));
        messages
    }

    pub async fn generate(
        &self,
        query: &str,
        history: &SessionHistory,
        index: &Index,
    ) -> Result<String, TurnError> {
        Ok(self.generate_grounded(query, history, index).await?.text)
    }

    pub async fn generate_grounded(
        &self,
        query: &str,
        history: &SessionHistory,
        index: &Index,
    ) -> Result<GroundedAnswer, TurnError> {
        let sources = run_stage(TurnStage::Retrieve, self.deadline, async {
            index
                .query(query, self.top_k)
                .await
                .map_err(TurnError::Retrieve)
        })
        .await?;
        debug!(retrieved = sources.len(), top_k = self.top_k, "Retrieved context");

        let messages = self.build_prompt(query, history, &sources);
        let text = run_stage(TurnStage::Generate, self.deadline, async {
            self.llm
                .complete(&messages)
                .await
                .map_err(TurnError::Generate)
        })
        .await?;

        Ok(GroundedAnswer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;
    use chat_core::{Document, GenerationServiceError, Role, Turn};
    use embeddings::{ChunkConfig, FallbackEmbeddingProvider, TextChunker};
    use retrieval::{IndexBuilder, IndexOptions};

    async fn colour_index() -> Index {
        let builder = IndexBuilder::new(
            TextChunker::new(ChunkConfig {
                chunk_size: 100,
                overlap: 10,
            })
            .unwrap(),
            Arc::new(FallbackEmbeddingProvider::new(128)),
            IndexOptions::default(),
        );
        builder
            .ingest(&[
                Document::new("sky.txt", "The sky is blue."),
                Document::new("grass.txt", "Grass is green."),
            ])
            .await
            .unwrap()
    }

    fn generator(llm: Arc<ScriptedLlm>, top_k: usize) -> Generator {
        Generator::new(
            llm,
            &ConversationConfig::default(),
            &RetrievalConfig {
                top_k,
                ..RetrievalConfig::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn should_ground_prompt_in_retrieved_context() {
        let index = colour_index().await;
        let llm = Arc::new(ScriptedLlm::replying(&["The grass is green."]));
        let generator = generator(llm.clone(), 1);

        let answer = generator
            .generate_grounded("What color is the grass?", &SessionHistory::new(), &index)
            .await
            .unwrap();

        assert_eq!(answer.text, "The grass is green.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].source, "grass.txt");

        let prompt = &llm.prompts()[0];
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert!(prompt[0].content.ends_with("\n\nGrass is green."));
        assert_eq!(prompt[1], Message::user("What color is the grass?"));
    }

    #[tokio::test]
    async fn should_include_history_between_context_and_query() {
        let index = colour_index().await;
        let mut history = SessionHistory::new();
        history.push(Turn::new("What color is the sky?", "The sky is blue."));
        let llm = Arc::new(ScriptedLlm::replying(&["Green."]));

        generator(llm.clone(), 2)
            .generate("What color is the grass?", &history, &index)
            .await
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert_eq!(prompt.len(), 4);
        assert!(prompt[0].content.contains("Grass is green."));
        assert!(prompt[0].content.contains("The sky is blue."));
        assert_eq!(prompt[1], Message::user("What color is the sky?"));
        assert_eq!(prompt[2], Message::assistant("The sky is blue."));
        assert_eq!(prompt[3], Message::user("What color is the grass?"));
    }

    #[tokio::test]
    async fn should_answer_from_empty_context_when_index_is_empty() {
        let index = Index::build(
            vec![],
            Arc::new(FallbackEmbeddingProvider::new(16)),
            IndexOptions::default(),
        )
        .await
        .unwrap();
        let llm = Arc::new(ScriptedLlm::replying(&["I don't know."]));

        let answer = generator(llm, 4)
            .generate_grounded("Anything?", &SessionHistory::new(), &index)
            .await
            .unwrap();

        assert_eq!(answer.text, "I don't know.");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn should_return_completion_verbatim() {
        let index = colour_index().await;
        let llm = Arc::new(ScriptedLlm::replying(&["  Blue.\n"]));

        let answer = generator(llm, 1)
            .generate("What color is the sky?", &SessionHistory::new(), &index)
            .await
            .unwrap();

        assert_eq!(answer, "  Blue.\n");
    }

    #[tokio::test]
    async fn should_report_service_failure_as_generate_error() {
        let index = colour_index().await;
        let llm = Arc::new(ScriptedLlm::new(vec![Err(GenerationServiceError::new(
            "scripted",
            "500 Internal Server Error",
        ))]));

        let err = generator(llm, 2)
            .generate("What color is the sky?", &SessionHistory::new(), &index)
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Generate(_)));
    }

    #[test]
    fn should_reject_zero_top_k_at_construction() {
        let result = Generator::new(
            Arc::new(ScriptedLlm::replying(&[])),
            &ConversationConfig::default(),
            &RetrievalConfig {
                top_k: 0,
                ..RetrievalConfig::default()
            },
        );

        let err = result.err().unwrap();
        assert_eq!(err.0, "top_k must be greater than zero");
    }

    #[tokio::test]
    async fn should_time_out_slow_generation() {
        let index = colour_index().await;
        let llm = Arc::new(ScriptedLlm::slow(Duration::from_secs(5)));

        let err = generator(llm, 2)
            .with_deadline(Duration::from_millis(20))
            .generate("What color is the sky?", &SessionHistory::new(), &index)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TurnError::Timeout {
                stage: TurnStage::Generate,
                ..
            }
        ));
    }
}
