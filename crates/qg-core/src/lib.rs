//! Core library for QuizGen
//!
//! This crate holds everything about a quiz run that does not touch the network:
//! the data model, the challenge-code codec used to share a quiz configuration,
//! the session state machine that drives a run from setup to results, and the
//! persistence contract used to resume an interrupted run.

pub mod challenge;
pub mod generate;
pub mod i18n;
pub mod model;
pub mod session;
pub mod store;
pub mod topics;
pub mod upload;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use challenge::DecodeError;
pub use generate::{GenerationError, GenerationRequest, Prompt, QuizGenerator};
pub use i18n::{ErrorKind, Messages};
pub use model::{
    Difficulty, FileContent, InputMode, InvalidConfig, Language, QuestionCount, Question,
    QuizConfig, QuizData, QuizSource, SavedState,
};
pub use session::{Completion, GenerationTicket, Phase, Session, SessionError, SessionView};
pub use store::{FileStore, MemoryStore, ProgressSlot, ProgressStore, StoreError};
pub use upload::Upload;
