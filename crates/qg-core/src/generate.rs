//! The generation collaborator.
//!
//! Generation is an opaque async call: a [`GenerationRequest`] goes in and a
//! list of questions (or a failure) comes out. Backends implement
//! [`QuizGenerator`]; this module only knows how to build the request from a
//! [`QuizConfig`] and how to read the JSON text a backend returns.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{FileContent, QuizConfig, QuizData, QuizSource};

/// Why a generation attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("generation backend returned an invalid quiz: {0}")]
    InvalidResponse(String),
    #[error("generation backend returned no questions")]
    EmptyQuiz,
}

/// Content sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Topic mode: a single text prompt
    Text(String),
    /// File mode: instructions followed by the documents
    Parts {
        text: String,
        files: Vec<FileContent>,
    },
}

impl Prompt {
    /// The instruction text, whatever the shape
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Parts { text, .. } => text,
        }
    }
}

/// Everything a backend needs to produce one quiz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: Prompt,
    /// Present for topic mode so the same code yields the same quiz
    pub seed: Option<u32>,
}

impl GenerationRequest {
    /// Build the request for a config, with prompts in the config's language
    pub fn from_config(config: &QuizConfig) -> Self {
        let messages = config.language.messages();
        let count = config.num_questions.get();
        let prompt = match &config.source {
            QuizSource::Topic { .. } => {
                Prompt::Text(messages.topic_prompt(&config.topic, count, config.difficulty))
            }
            QuizSource::File { file_contents } => Prompt::Parts {
                text: messages.file_prompt(count, config.difficulty),
                files: file_contents.clone(),
            },
        };

        Self {
            model: config.model.clone(),
            prompt,
            seed: config.seed(),
        }
    }
}

/// A backend able to generate quizzes
#[async_trait]
pub trait QuizGenerator: Send + Sync + fmt::Debug {
    async fn generate(&self, request: &GenerationRequest) -> Result<QuizData, GenerationError>;
}

/// Parse the JSON text returned by a backend
///
/// Anything other than a non-empty array of questions is a failure.
pub fn parse_quiz_data(text: &str) -> Result<QuizData, GenerationError> {
    let quiz: QuizData =
        serde_json::from_str(text).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    if quiz.is_empty() {
        return Err(GenerationError::EmptyQuiz);
    }
    Ok(quiz)
}
