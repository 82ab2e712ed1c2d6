//! Multiple-choice quiz over the explanations corpus.
//!
//! The model's answer is returned as-is; nothing checks that it really holds
//! ten questions.

use crate::contract::ChatClient;
use crate::llm::LlmError;
use crate::sanitize::truncate_context;

pub const QUIZ_SYSTEM_PROMPT: &str =
    "You are a programming instructor who writes clear multiple-choice quizzes about source code.";

pub const QUIZ_DOC_HEADER: &str = "# Project Quiz\n\n";

pub const EASY_QUESTIONS: usize = 2;
pub const MEDIUM_QUESTIONS: usize = 3;
pub const HARD_QUESTIONS: usize = 5;

pub fn build_quiz_prompt(corpus: &str, context_chars: usize) -> String {
    let total = EASY_QUESTIONS + MEDIUM_QUESTIONS + HARD_QUESTIONS;
    format!(
        "Using the code explanations below, write a quiz of exactly {total} multiple-choice questions: \
{EASY_QUESTIONS} easy, {MEDIUM_QUESTIONS} medium and {HARD_QUESTIONS} hard, in that order. \
Label each question with its difficulty. Give every question four options labeled A), B), C) and D), \
and after the options write the correct answer as 'Answer: <letter>'.\n\n{}",
        truncate_context(corpus, context_chars)
    )
}

pub async fn generate_quiz<C>(client: &C, corpus: &str, context_chars: usize) -> Result<String, LlmError>
where
    C: ChatClient + ?Sized,
{
    tracing::info!(corpus_chars = corpus.len(), "[QUIZ] Requesting quiz");
    let quiz = client
        .complete(QUIZ_SYSTEM_PROMPT, &build_quiz_prompt(corpus, context_chars))
        .await?;
    tracing::info!(quiz_chars = quiz.len(), "[QUIZ] Quiz received");
    Ok(quiz)
}

pub fn quiz_document(quiz: &str) -> String {
    format!("{QUIZ_DOC_HEADER}{quiz}\n")
}
