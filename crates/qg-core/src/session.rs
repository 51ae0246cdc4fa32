//! The quiz session state machine.
//!
//! A [`Session`] walks through the phases of one quiz run:
//!
//! ```text
//!            ┌──────────────── reset ─────────────────┐
//!            v                                        │
//! ResumePending ──> Setup ──> Generating ──> Active ──> Finished <──> Reviewing
//!                     ^           │            │
//!                     └─ failure ─┘            │
//!                     └──────── exit ──────────┘
//! ```
//!
//! Transitions are synchronous. Generation is split in two halves around the
//! only suspension point: [`Session::begin_generation`] hands out a
//! [`GenerationTicket`], the caller runs the generator without holding the
//! session, and [`Session::complete_generation`] applies the result only if
//! the ticket is still the current one.
//!
//! While a run is active and unfinished, every state-affecting action
//! overwrites the snapshot in the session's [`ProgressSlot`]; finishing,
//! resetting or exiting deletes it.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;

use crate::{
    challenge,
    generate::GenerationError,
    i18n::ErrorKind,
    model::{
        DEFAULT_MODEL, Difficulty, InputMode, Language, QuestionCount, Question, QuizConfig,
        QuizData, QuizSource, SavedState,
    },
    store::ProgressSlot,
    topics,
    upload::{self, Upload},
};

/// Seeds are drawn from `0..SEED_RANGE`
pub const SEED_RANGE: u32 = 1_000_000;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    ResumePending,
    Generating,
    Active,
    Finished,
    Reviewing,
}

impl Phase {
    /// Wire name, as serialized
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::ResumePending => "resume_pending",
            Self::Generating => "generating",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Reviewing => "reviewing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while the session is in the {phase} phase")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error("{0} mode setup is incomplete")]
    NotReady(InputMode),
    #[error("'{0}' is not one of the offered options")]
    UnknownOption(String),
    #[error("no uploaded file at index {0}")]
    NoSuchFile(usize),
}

/// The configuration visible in setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub language: Language,
    pub topic: String,
    /// `None` while the field is cleared
    pub num_questions: Option<QuestionCount>,
    pub difficulty: Difficulty,
    pub model: String,
    pub input_mode: InputMode,
    pub uploads: Vec<Upload>,
    pub challenge_code_input: String,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            language: Language::default(),
            topic: String::new(),
            num_questions: Some(QuestionCount::default()),
            difficulty: Difficulty::default(),
            model: DEFAULT_MODEL.to_string(),
            input_mode: InputMode::default(),
            uploads: Vec::new(),
            challenge_code_input: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Progress {
    quiz_data: QuizData,
    current_question_index: usize,
    user_answers: Vec<Option<String>>,
    score: u32,
}

impl Progress {
    fn new(quiz_data: QuizData) -> Self {
        let user_answers = vec![None; quiz_data.len()];
        Self {
            quiz_data,
            current_question_index: 0,
            user_answers,
            score: 0,
        }
    }

    fn current(&self) -> Option<&Question> {
        self.quiz_data.get(self.current_question_index)
    }
}

/// Proof that a generation request was started, presented back on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub id: u64,
    pub config: QuizConfig,
}

/// What [`Session::complete_generation`] did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The quiz is now active
    Ready,
    /// The attempt failed and the session is back in setup
    Failed,
    /// The ticket was outdated; nothing changed
    Stale,
}

/// One quiz run, from setup to results
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    setup: Setup,
    progress: Option<Progress>,
    challenge_code: Option<String>,
    error: Option<ErrorKind>,
    pending: Option<SavedState>,
    generation_id: u64,
    slot: ProgressSlot,
    rng: StdRng,
}

impl Session {
    /// Open a session on `slot`, offering to resume if a snapshot is stored there
    pub fn open(slot: ProgressSlot) -> Self {
        Self::open_with_rng(slot, StdRng::from_entropy())
    }

    /// Like [`Session::open`], with a caller-provided random source
    pub fn open_with_rng(slot: ProgressSlot, rng: StdRng) -> Self {
        let mut session = Self {
            phase: Phase::Setup,
            setup: Setup::default(),
            progress: None,
            challenge_code: None,
            error: None,
            pending: None,
            generation_id: 0,
            slot,
            rng,
        };

        match session.slot.load() {
            Some(saved) => {
                tracing::debug!(key = session.slot.key(), "Found saved progress");
                session.pending = Some(saved);
                session.phase = Phase::ResumePending;
            }
            None => session.pick_default_topic(),
        }

        session
    }

    /// Current phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Setup as currently edited
    pub const fn setup(&self) -> &Setup {
        &self.setup
    }

    /// Error shown in setup, if any
    pub const fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    /// Error text in the current language
    pub fn error_message(&self) -> Option<&'static str> {
        self.error
            .map(|kind| self.setup.language.messages().error(kind))
    }

    /// Code to share for the current run, if it has one
    pub fn challenge_code(&self) -> Option<&str> {
        self.challenge_code.as_deref()
    }

    /// Questions of the current run
    pub fn quiz_data(&self) -> Option<&[Question]> {
        self.progress.as_ref().map(|p| p.quiz_data.as_slice())
    }

    /// Zero-based index of the question on screen
    pub fn current_question_index(&self) -> usize {
        self.progress
            .as_ref()
            .map_or(0, |p| p.current_question_index)
    }

    /// One entry per question, `None` until answered
    pub fn user_answers(&self) -> &[Option<String>] {
        self.progress
            .as_ref()
            .map_or(&[], |p| p.user_answers.as_slice())
    }

    /// Correct answers so far
    pub fn score(&self) -> u32 {
        self.progress.as_ref().map_or(0, |p| p.score)
    }

    /// Id of the most recent generation request
    pub const fn generation_id(&self) -> u64 {
        self.generation_id
    }

    /// Snapshot awaiting a resume decision
    pub const fn pending_resume(&self) -> Option<&SavedState> {
        self.pending.as_ref()
    }

    /// Where snapshots of this session are saved
    pub const fn slot(&self) -> &ProgressSlot {
        &self.slot
    }

    /// Snapshot of the current run, if there is one
    pub fn snapshot(&self) -> Option<SavedState> {
        self.progress.as_ref().map(|p| SavedState {
            quiz_data: p.quiz_data.clone(),
            current_question_index: p.current_question_index,
            user_answers: p.user_answers.clone(),
            score: p.score,
            topic: self.setup.topic.clone(),
            language: self.setup.language,
            generated_challenge_code: self.challenge_code.clone(),
        })
    }

    fn require_phase(&self, allowed: &[Phase], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    fn setup_mut(&mut self, action: &'static str) -> Result<&mut Setup, SessionError> {
        self.require_phase(&[Phase::Setup], action)?;
        Ok(&mut self.setup)
    }

    fn active_progress(&mut self, action: &'static str) -> Result<&mut Progress, SessionError> {
        let phase = self.phase;
        match (phase, self.progress.as_mut()) {
            (Phase::Active, Some(progress)) => Ok(progress),
            _ => Err(SessionError::InvalidTransition { action, phase }),
        }
    }

    fn persist(&self) {
        if self.phase != Phase::Active {
            return;
        }
        if let Some(snapshot) = self.snapshot() {
            self.slot.save(&snapshot);
        }
    }

    fn pick_default_topic(&mut self) {
        self.setup.topic = topics::random_topic(self.setup.language, &mut self.rng).to_string();
    }

    // Resume

    /// Restore the saved run (`true`) or discard it (`false`)
    pub fn resolve_resume(&mut self, resume: bool) -> Result<Phase, SessionError> {
        self.require_phase(&[Phase::ResumePending], "resolve the saved quiz")?;

        match self.pending.take() {
            Some(saved) if resume && saved.is_consistent() => {
                tracing::info!(
                    key = self.slot.key(),
                    index = saved.current_question_index,
                    "Resuming saved quiz"
                );
                self.setup.language = saved.language;
                self.setup.topic = saved.topic;
                self.challenge_code = saved.generated_challenge_code;
                self.progress = Some(Progress {
                    quiz_data: saved.quiz_data,
                    current_question_index: saved.current_question_index,
                    user_answers: saved.user_answers,
                    score: saved.score,
                });
                self.phase = Phase::Active;
            }
            pending => {
                if resume && pending.is_some() {
                    tracing::warn!(key = self.slot.key(), "Saved quiz is inconsistent, discarding it");
                }
                self.slot.clear();
                self.pick_default_topic();
                self.phase = Phase::Setup;
            }
        }

        Ok(self.phase)
    }

    // Setup

    /// Switch the display language; never touches quiz progress
    pub fn set_language(&mut self, language: Language) {
        self.setup.language = language;
        self.persist();
    }

    /// Change the topic; like every setter below, only allowed in setup
    pub fn set_topic(&mut self, topic: impl Into<String>) -> Result<(), SessionError> {
        self.setup_mut("change the topic")?.topic = topic.into();
        Ok(())
    }

    /// `None` leaves the count empty, which blocks generation
    pub fn set_num_questions(&mut self, count: Option<QuestionCount>) -> Result<(), SessionError> {
        self.setup_mut("change the number of questions")?.num_questions = count;
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        self.setup_mut("change the difficulty")?.difficulty = difficulty;
        Ok(())
    }

    /// Pick the model used for the next generation
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), SessionError> {
        self.setup_mut("change the model")?.model = model.into();
        Ok(())
    }

    pub fn set_input_mode(&mut self, mode: InputMode) -> Result<(), SessionError> {
        self.setup_mut("change the input mode")?.input_mode = mode;
        Ok(())
    }

    /// Raw code as typed; decoded only when generating
    pub fn set_challenge_code_input(&mut self, code: impl Into<String>) -> Result<(), SessionError> {
        self.setup_mut("enter a challenge code")?.challenge_code_input = code.into();
        Ok(())
    }

    /// Replace the topic with a different suggestion
    pub fn random_topic(&mut self) -> Result<&str, SessionError> {
        self.require_phase(&[Phase::Setup], "pick a random topic")?;
        let topic = topics::random_topic_except(self.setup.language, &self.setup.topic, &mut self.rng);
        self.setup.topic = topic.to_string();
        Ok(&self.setup.topic)
    }

    /// Offer new files; returns how many were accepted
    pub fn add_files(&mut self, files: Vec<Upload>) -> Result<usize, SessionError> {
        self.require_phase(&[Phase::Setup], "add files")?;
        let admission = upload::admit(&self.setup.uploads, files);
        let accepted = admission.accepted.len();
        self.setup.uploads.extend(admission.accepted);
        self.error = admission.error;
        Ok(accepted)
    }

    /// Drop one upload by position; clears any upload error
    pub fn remove_file(&mut self, index: usize) -> Result<Upload, SessionError> {
        let setup = self.setup_mut("remove a file")?;
        if index >= setup.uploads.len() {
            return Err(SessionError::NoSuchFile(index));
        }
        let removed = setup.uploads.remove(index);
        self.error = None;
        Ok(removed)
    }

    /// Whether the setup is complete enough to start generating
    pub fn can_generate(&self) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }
        let setup = &self.setup;
        match setup.input_mode {
            InputMode::Topic => !setup.topic.trim().is_empty() && setup.num_questions.is_some(),
            InputMode::File => !setup.uploads.is_empty() && setup.num_questions.is_some(),
            InputMode::Challenge => !setup.challenge_code_input.trim().is_empty(),
        }
    }

    // Generation

    /// Start generating a quiz from the current setup
    ///
    /// Returns `Ok(None)` when a challenge code is rejected: the session stays
    /// in setup with [`ErrorKind::InvalidChallengeCode`] and no request must be
    /// issued.
    pub fn begin_generation(&mut self) -> Result<Option<GenerationTicket>, SessionError> {
        self.require_phase(&[Phase::Setup], "generate a quiz")?;
        if !self.can_generate() {
            return Err(SessionError::NotReady(self.setup.input_mode));
        }

        self.progress = None;
        self.challenge_code = None;
        self.error = None;

        let config = match self.setup.input_mode {
            InputMode::Challenge => match self.accept_challenge() {
                Some(config) => config,
                None => return Ok(None),
            },
            InputMode::Topic => {
                let seed = self.rng.gen_range(0..SEED_RANGE);
                let config = self.config_from_setup(QuizSource::Topic { seed });
                // The code exists before the first answer so it can be shared right away
                self.challenge_code = Some(challenge::encode(&config));
                config
            }
            InputMode::File => {
                self.setup.topic = upload::topic_for(&self.setup.uploads);
                let file_contents = self
                    .setup
                    .uploads
                    .iter()
                    .map(|u| u.content.clone())
                    .collect();
                self.config_from_setup(QuizSource::File { file_contents })
            }
        };

        self.generation_id += 1;
        self.phase = Phase::Generating;
        tracing::info!(
            generation_id = self.generation_id,
            mode = %config.mode(),
            model = %config.model,
            questions = config.num_questions.get(),
            "Starting quiz generation"
        );

        Ok(Some(GenerationTicket {
            id: self.generation_id,
            config,
        }))
    }

    fn config_from_setup(&self, source: QuizSource) -> QuizConfig {
        QuizConfig {
            topic: self.setup.topic.trim().to_string(),
            num_questions: self.setup.num_questions.unwrap_or_default(),
            difficulty: self.setup.difficulty,
            language: self.setup.language,
            model: self.setup.model.clone(),
            source,
        }
    }

    fn accept_challenge(&mut self) -> Option<QuizConfig> {
        let code = self.setup.challenge_code_input.trim().to_string();
        match challenge::decode(&code) {
            Ok(config) => {
                // Show the replaying user what they are about to attempt
                self.setup.language = config.language;
                self.setup.topic = config.topic.clone();
                self.setup.num_questions = Some(config.num_questions);
                self.setup.difficulty = config.difficulty;
                self.setup.model = config.model.clone();
                self.challenge_code = Some(code);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Rejected challenge code: {e}");
                self.error = Some(ErrorKind::InvalidChallengeCode);
                None
            }
        }
    }

    /// Apply the outcome of the request started with ticket `ticket_id`
    pub fn complete_generation(
        &mut self,
        ticket_id: u64,
        result: Result<QuizData, GenerationError>,
    ) -> Completion {
        if self.phase != Phase::Generating || ticket_id != self.generation_id {
            tracing::debug!(
                ticket_id,
                current = self.generation_id,
                phase = %self.phase,
                "Ignoring stale generation result"
            );
            return Completion::Stale;
        }

        match result {
            Ok(quiz) if !quiz.is_empty() => {
                tracing::info!(generation_id = ticket_id, questions = quiz.len(), "Quiz generated");
                self.progress = Some(Progress::new(quiz));
                self.phase = Phase::Active;
                self.persist();
                Completion::Ready
            }
            Ok(_) => {
                tracing::error!(generation_id = ticket_id, "Generation returned no questions");
                self.fail_generation();
                Completion::Failed
            }
            Err(e) => {
                tracing::error!(generation_id = ticket_id, "Generation failed: {e}");
                self.fail_generation();
                Completion::Failed
            }
        }
    }

    fn fail_generation(&mut self) {
        self.progress = None;
        self.challenge_code = None;
        self.error = Some(ErrorKind::Generation);
        self.phase = Phase::Setup;
    }

    // Answering

    /// Record an answer for the current question
    ///
    /// The first answer is final: returns `Ok(false)` without changing anything
    /// when the question was already answered.
    pub fn select_answer(&mut self, option: &str) -> Result<bool, SessionError> {
        let progress = self.active_progress("answer a question")?;
        let index = progress.current_question_index;
        if progress.user_answers.get(index).is_some_and(Option::is_some) {
            return Ok(false);
        }

        let Some(question) = progress.current() else {
            return Err(SessionError::InvalidTransition {
                action: "answer a question",
                phase: Phase::Active,
            });
        };
        if !question.offers(option) {
            return Err(SessionError::UnknownOption(option.to_string()));
        }
        let correct = question.is_correct(option);

        if let Some(answer) = progress.user_answers.get_mut(index) {
            *answer = Some(option.to_string());
        }
        if correct {
            progress.score += 1;
        }

        self.persist();
        Ok(true)
    }

    /// Advance to the next question, or finish after the last one
    pub fn next_question(&mut self) -> Result<Phase, SessionError> {
        let progress = self.active_progress("move to the next question")?;
        if progress.current_question_index + 1 < progress.quiz_data.len() {
            progress.current_question_index += 1;
            self.persist();
        } else {
            self.phase = Phase::Finished;
            self.slot.clear();
            tracing::info!(
                score = self.score(),
                total = self.quiz_data().map_or(0, <[Question]>::len),
                "Quiz finished"
            );
        }
        Ok(self.phase)
    }

    // Leaving a run

    /// Abandon the current run after the user confirmed it
    ///
    /// Also accepted while generating; the pending response is then discarded
    /// when it arrives.
    pub fn exit(&mut self) -> Result<(), SessionError> {
        self.require_phase(&[Phase::Active, Phase::Generating], "exit the quiz")?;
        tracing::info!(key = self.slot.key(), "Quiz abandoned");
        self.reset_to_setup();
        Ok(())
    }

    /// Detach the session from its owner
    ///
    /// Any generation still in flight becomes stale, so a result arriving
    /// later neither activates this session nor writes to its slot. A saved
    /// run is left in place for a later reopen.
    pub fn close(&mut self) {
        self.generation_id += 1;
        if self.phase == Phase::Generating {
            self.phase = Phase::Setup;
        }
        tracing::debug!(key = self.slot.key(), "Session closed");
    }

    /// Start over from a fresh setup
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.require_phase(
            &[Phase::Setup, Phase::Finished, Phase::Reviewing],
            "reset the session",
        )?;
        self.reset_to_setup();
        Ok(())
    }

    fn reset_to_setup(&mut self) {
        // Any response still in flight must not land on the fresh setup
        self.generation_id += 1;
        self.progress = None;
        self.challenge_code = None;
        self.error = None;
        self.pending = None;
        self.setup.input_mode = InputMode::Topic;
        self.setup.uploads.clear();
        self.setup.challenge_code_input.clear();
        self.pick_default_topic();
        self.phase = Phase::Setup;
        self.slot.clear();
    }

    // Review

    /// Open the per-question review from the results
    pub fn review(&mut self) -> Result<(), SessionError> {
        self.require_phase(&[Phase::Finished], "review the answers")?;
        self.phase = Phase::Reviewing;
        Ok(())
    }

    /// Leave the review
    pub fn back_to_results(&mut self) -> Result<(), SessionError> {
        self.require_phase(&[Phase::Reviewing], "go back to the results")?;
        self.phase = Phase::Finished;
        Ok(())
    }

    // Views

    /// Everything a client needs to render the session
    pub fn view(&self) -> SessionView {
        let messages = self.setup.language.messages();

        let quiz = self.progress.as_ref().map(|p| {
            let current = (self.phase == Phase::Active)
                .then(|| p.current().map(|q| QuestionView::new(p, q)))
                .flatten();
            let review = (self.phase == Phase::Reviewing).then(|| {
                p.quiz_data
                    .iter()
                    .zip(&p.user_answers)
                    .enumerate()
                    .map(|(i, (q, answer))| ReviewItem {
                        number: i + 1,
                        question: q.question.clone(),
                        options: q.options.clone(),
                        correct_answer: q.correct_answer.clone(),
                        explanation: q.explanation.clone(),
                        user_answer: answer.clone(),
                        is_correct: answer.as_deref().is_some_and(|a| q.is_correct(a)),
                    })
                    .collect()
            });

            QuizView {
                topic: self.setup.topic.clone(),
                total: p.quiz_data.len(),
                score: p.score,
                current_question_index: p.current_question_index,
                user_answers: p.user_answers.clone(),
                current,
                review,
            }
        });

        SessionView {
            phase: self.phase,
            setup: self.setup.clone(),
            difficulty_label: messages.difficulty(self.setup.difficulty),
            can_generate: self.can_generate(),
            error: self.error.map(|kind| ErrorView {
                kind,
                message: messages.error(kind),
            }),
            challenge_code: self.challenge_code.clone(),
            resume_topic: self.pending.as_ref().map(|s| s.topic.clone()),
            quiz,
        }
    }
}

/// Serializable snapshot of a session for clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub setup: Setup,
    pub difficulty_label: &'static str,
    pub can_generate: bool,
    pub error: Option<ErrorView>,
    pub challenge_code: Option<String>,
    /// Topic of the saved run while a resume decision is pending
    pub resume_topic: Option<String>,
    pub quiz: Option<QuizView>,
}

/// Localized error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: &'static str,
}

/// Progress through the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub topic: String,
    pub total: usize,
    pub score: u32,
    pub current_question_index: usize,
    pub user_answers: Vec<Option<String>>,
    /// The question on screen, only while active
    pub current: Option<QuestionView>,
    /// Every question with its outcome, only while reviewing
    pub review: Option<Vec<ReviewItem>>,
}

/// The current question; the answer and explanation stay hidden until answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub number: usize,
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub is_last: bool,
}

impl QuestionView {
    fn new(progress: &Progress, question: &Question) -> Self {
        let index = progress.current_question_index;
        let selected = progress.user_answers.get(index).cloned().flatten();
        let answered = selected.is_some();
        Self {
            number: index + 1,
            question: question.question.clone(),
            options: question.options.clone(),
            selected,
            correct_answer: answered.then(|| question.correct_answer.clone()),
            explanation: answered.then(|| question.explanation.clone()),
            is_last: index + 1 == progress.quiz_data.len(),
        }
    }
}

/// One answered (or skipped) question in the review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub number: usize,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub user_answer: Option<String>,
    pub is_correct: bool,
}
