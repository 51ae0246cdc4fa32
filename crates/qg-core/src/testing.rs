//! Test doubles, enabled with the `testing` feature.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    generate::{GenerationError, GenerationRequest, QuizGenerator},
    model::{Question, QuizData},
};

/// A quiz of `count` questions whose correct answer is always option `A{n}`
pub fn sample_quiz(count: usize) -> QuizData {
    (1..=count)
        .map(|n| Question {
            question: format!("Question **{n}**?"),
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|letter| format!("{letter}{n}"))
                .collect(),
            correct_answer: format!("A{n}"),
            explanation: format!("A{n} is right."),
        })
        .collect()
}

/// Generator replying with the same canned result every time
#[derive(Debug)]
pub struct StaticGenerator {
    reply: Result<QuizData, GenerationError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StaticGenerator {
    /// Always answer with `quiz`
    pub fn with_quiz(quiz: QuizData) -> Self {
        Self {
            reply: Ok(quiz),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with `error`
    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuizGenerator for StaticGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<QuizData, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.reply.clone()
    }
}
