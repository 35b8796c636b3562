//! Question answering over the full extracted text.

use crate::answering::{QuestionAnsweringClient, QuestionAnsweringError};

use super::types::AnswerOutcome;

/// Ask `question` against `context` and return the best span, or [`AnswerOutcome::NotFound`].
///
/// No length validation happens here; oversized contexts are handled (or rejected) by the model.
pub async fn answer_question(
    client: &dyn QuestionAnsweringClient,
    question: &str,
    context: &str,
) -> Result<AnswerOutcome, QuestionAnsweringError> {
    let outcome = match client.answer(question, context).await? {
        Some(answer) => AnswerOutcome::Found(answer),
        None => AnswerOutcome::NotFound,
    };
    tracing::debug!(
        found = matches!(outcome, AnswerOutcome::Found(_)),
        context_chars = context.chars().count(),
        "Question answered"
    );
    Ok(outcome)
}
