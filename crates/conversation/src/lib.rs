pub mod contextualizer;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod prompts;

pub use contextualizer::Contextualizer;
pub use error::{TurnError, TurnStage};
pub use generator::{GroundedAnswer, Generator};
pub use orchestrator::{Orchestrator, TurnOutcome, TurnState};

use std::future::Future;
use std::time::Duration;

/// Runs one external call of a turn under its deadline.
pub(crate) async fn run_stage<T, F>(
    stage: TurnStage,
    deadline: Duration,
    call: F,
) -> Result<T, TurnError>
where
    F: Future<Output = Result<T, TurnError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(TurnError::Timeout {
            stage,
            after: deadline,
        }),
    }
}
