use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Models offered to the user, the first one being the default.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.5-flash-lite",
];

/// Model selected when the user has not picked one
pub const DEFAULT_MODEL: &str = AVAILABLE_MODELS[0];

/// Error returned when a string does not name a known enumeration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// How hard the generated questions should be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    VeryEasy,
    Easy,
    #[default]
    Medium,
    Hard,
    VeryHard,
    Extreme,
}

impl Difficulty {
    /// Every difficulty, from easiest to hardest
    pub const ALL: [Self; 6] = [
        Self::VeryEasy,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::VeryHard,
        Self::Extreme,
    ];

    /// Wire name used in challenge codes and the HTTP API
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryEasy => "very_easy",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very_hard",
            Self::Extreme => "extreme",
        }
    }

    /// Display label in the given language
    pub fn label(self, language: Language) -> &'static str {
        language.messages().difficulty(self)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "difficulty",
                value: s.to_string(),
            })
    }
}

/// Language of the questions and of every user-facing message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
}

impl Language {
    /// Every supported language
    pub const ALL: [Self; 2] = [Self::Vi, Self::En];

    /// ISO 639-1 code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vi => "vi",
            Self::En => "en",
        }
    }

    /// Exact lowercase code, the form used on the wire
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Codes are matched case-insensitively, like any ISO 639-1 input
        let normalized = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                kind: "language",
                value: s.to_string(),
            })
    }
}

/// Where the questions of a run come from, as picked in setup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Free-text subject
    #[default]
    Topic,
    /// Uploaded documents or images
    File,
    /// Replay of a received challenge code
    Challenge,
}

impl InputMode {
    /// Every mode, in display order
    pub const ALL: [Self; 3] = [Self::Topic, Self::File, Self::Challenge];

    /// Wire name, as serialized
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::File => "file",
            Self::Challenge => "challenge",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "input mode",
                value: s.to_string(),
            })
    }
}

/// Error returned for a question count outside `1..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("number of questions must be between 1 and 100, got {0}")]
pub struct InvalidQuestionCount(pub u64);

/// Number of questions requested, always within `1..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QuestionCount(u8);

impl QuestionCount {
    /// Smallest accepted count
    pub const MIN: u8 = 1;
    /// Largest accepted count
    pub const MAX: u8 = 100;

    /// Validate a raw count
    pub fn new(count: u64) -> Result<Self, InvalidQuestionCount> {
        match u8::try_from(count) {
            Ok(n) if (Self::MIN..=Self::MAX).contains(&n) => Ok(Self(n)),
            _ => Err(InvalidQuestionCount(count)),
        }
    }

    /// The count as a plain integer
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u32> for QuestionCount {
    type Error = InvalidQuestionCount;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(u64::from(value))
    }
}

impl From<QuestionCount> for u32 {
    fn from(count: QuestionCount) -> Self {
        u32::from(count.0)
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One uploaded document, already base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Base64 payload, without any `data:` URL prefix
    pub data: String,
    pub mime_type: String,
}

/// Source of the questions, keyed by `mode` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum QuizSource {
    /// Free-text topic; the seed lets another user regenerate the same quiz
    Topic { seed: u32 },
    /// Uploaded documents sent along with the prompt
    File {
        #[serde(rename = "fileContents")]
        file_contents: Vec<FileContent>,
    },
}

/// Why a [`QuizConfig`] cannot be shared or replayed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidConfig(pub &'static str);

/// Full parameter set of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub topic: String,
    pub num_questions: QuestionCount,
    pub difficulty: Difficulty,
    pub language: Language,
    /// Identifier of the generation backend variant
    pub model: String,
    #[serde(flatten)]
    pub source: QuizSource,
}

impl QuizConfig {
    /// Seed of a topic-mode config
    pub const fn seed(&self) -> Option<u32> {
        match self.source {
            QuizSource::Topic { seed } => Some(seed),
            QuizSource::File { .. } => None,
        }
    }

    /// Input mode this config was built from
    pub const fn mode(&self) -> InputMode {
        match self.source {
            QuizSource::Topic { .. } => InputMode::Topic,
            QuizSource::File { .. } => InputMode::File,
        }
    }

    /// Rules the types alone do not enforce
    ///
    /// Every config that passes can be encoded into a challenge code and
    /// decoded back unchanged.
    pub fn check(&self) -> Result<(), InvalidConfig> {
        if self.topic.trim().is_empty() {
            return Err(InvalidConfig("topic is empty"));
        }
        if self.model.trim().is_empty() {
            return Err(InvalidConfig("model is empty"));
        }
        if let QuizSource::File { file_contents } = &self.source
            && file_contents.is_empty()
        {
            return Err(InvalidConfig("file mode requires fileContents"));
        }
        Ok(())
    }
}

/// A generated multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question text, possibly with embedded markup
    pub question: String,
    pub options: Vec<String>,
    /// Must equal one of `options`
    pub correct_answer: String,
    pub explanation: String,
}

impl Question {
    /// Exact, case-sensitive comparison against the correct answer
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }

    /// Whether `option` is one of the offered choices
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Ordered questions of one run
pub type QuizData = Vec<Question>;

/// Snapshot sufficient to resume a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    pub quiz_data: QuizData,
    pub current_question_index: usize,
    /// One slot per question, `None` until answered
    pub user_answers: Vec<Option<String>>,
    pub score: u32,
    pub topic: String,
    pub language: Language,
    #[serde(default)]
    pub generated_challenge_code: Option<String>,
}

impl SavedState {
    /// Whether the snapshot describes a run that can actually be resumed
    pub fn is_consistent(&self) -> bool {
        let answered = self.user_answers.iter().flatten().count();
        !self.quiz_data.is_empty()
            && self.user_answers.len() == self.quiz_data.len()
            && self.current_question_index < self.quiz_data.len()
            && self.score as usize <= answered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_difficulty_round_trips_through_str() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.as_str().parse::<Difficulty>(), Ok(difficulty));
        }
        assert!("impossible".parse::<Difficulty>().is_err());
        assert_eq!(
            serde_json::to_value(Difficulty::VeryHard).unwrap(),
            json!("very_hard")
        );
    }

    #[test]
    fn test_language_parse_is_case_insensitive() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert_eq!("vi".parse::<Language>(), Ok(Language::Vi));
        assert!("fr".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_code_is_exact() {
        assert_eq!(Language::from_code("en"), Some(Language::En));
        assert_eq!(Language::from_code("EN"), None);
        assert_eq!(Language::from_code(" vi"), None);
    }

    #[test]
    fn test_config_check() {
        let config = QuizConfig {
            topic: "Rivers".to_string(),
            num_questions: QuestionCount::default(),
            difficulty: Difficulty::Easy,
            language: Language::En,
            model: DEFAULT_MODEL.to_string(),
            source: QuizSource::Topic { seed: 1 },
        };
        assert_eq!(config.check(), Ok(()));

        let blank_topic = QuizConfig {
            topic: "  ".to_string(),
            ..config.clone()
        };
        assert_eq!(blank_topic.check(), Err(InvalidConfig("topic is empty")));

        let blank_model = QuizConfig {
            model: String::new(),
            ..config.clone()
        };
        assert_eq!(blank_model.check(), Err(InvalidConfig("model is empty")));

        let no_files = QuizConfig {
            source: QuizSource::File {
                file_contents: Vec::new(),
            },
            ..config
        };
        assert!(no_files.check().is_err());
    }

    #[test]
    fn test_input_mode_parse() {
        assert_eq!("file".parse::<InputMode>(), Ok(InputMode::File));
        assert_eq!(InputMode::Challenge.to_string(), "challenge");
        assert!("File".parse::<InputMode>().is_err());
    }

    #[test]
    fn test_question_count_bounds() {
        assert!(QuestionCount::new(0).is_err());
        assert_eq!(QuestionCount::new(1).unwrap().get(), 1);
        assert_eq!(QuestionCount::new(100).unwrap().get(), 100);
        assert_eq!(QuestionCount::new(101), Err(InvalidQuestionCount(101)));
        assert_eq!(QuestionCount::new(256), Err(InvalidQuestionCount(256)));
        assert_eq!(QuestionCount::default().get(), 5);

        assert!(serde_json::from_value::<QuestionCount>(json!(0)).is_err());
        assert!(serde_json::from_value::<QuestionCount>(json!(-3)).is_err());
        assert_eq!(
            serde_json::from_value::<QuestionCount>(json!(42)).unwrap().get(),
            42
        );
    }

    #[test]
    fn test_quiz_config_wire_shape() {
        let config = QuizConfig {
            topic: "Solar System".to_string(),
            num_questions: QuestionCount::new(5).unwrap(),
            difficulty: Difficulty::Medium,
            language: Language::En,
            model: "m1".to_string(),
            source: QuizSource::Topic { seed: 42 },
        };

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({
                "topic": "Solar System",
                "numQuestions": 5,
                "difficulty": "medium",
                "language": "en",
                "model": "m1",
                "mode": "topic",
                "seed": 42
            })
        );
        assert_eq!(config.seed(), Some(42));
        assert_eq!(config.mode(), InputMode::Topic);

        let file = json!({
            "topic": "notes.pdf",
            "numQuestions": 3,
            "difficulty": "hard",
            "language": "vi",
            "model": "m1",
            "mode": "file",
            "fileContents": [{ "data": "aGk=", "mimeType": "text/plain" }]
        });
        let parsed: QuizConfig = serde_json::from_value(file).unwrap();
        assert_eq!(parsed.seed(), None);
        assert_eq!(
            parsed.source,
            QuizSource::File {
                file_contents: vec![FileContent {
                    data: "aGk=".to_string(),
                    mime_type: "text/plain".to_string(),
                }]
            }
        );
    }

    #[test]
    fn test_question_answer_matching_is_exact() {
        let question = Question {
            question: "Largest planet?".to_string(),
            options: vec![
                "Jupiter".to_string(),
                "Saturn".to_string(),
                "Mars".to_string(),
                "Venus".to_string(),
            ],
            correct_answer: "Jupiter".to_string(),
            explanation: "It is the largest.".to_string(),
        };
        assert!(question.is_correct("Jupiter"));
        assert!(!question.is_correct("jupiter"));
        assert!(!question.is_correct("Jupiter "));
        assert!(question.offers("Mars"));
        assert!(!question.offers("Pluto"));
    }

    #[test]
    fn test_saved_state_accepts_missing_challenge_code() {
        let raw = json!({
            "quizData": [{
                "question": "q",
                "options": ["a", "b", "c", "d"],
                "correctAnswer": "a",
                "explanation": "e"
            }],
            "currentQuestionIndex": 0,
            "userAnswers": [null],
            "score": 0,
            "topic": "t",
            "language": "vi"
        });
        let saved: SavedState = serde_json::from_value(raw).unwrap();
        assert_eq!(saved.generated_challenge_code, None);
        assert!(saved.is_consistent());
    }

    #[test]
    fn test_saved_state_consistency() {
        let question = Question {
            question: "q".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_answer: "a".to_string(),
            explanation: "e".to_string(),
        };
        let saved = SavedState {
            quiz_data: vec![question],
            current_question_index: 1,
            user_answers: vec![None],
            score: 0,
            topic: "t".to_string(),
            language: Language::En,
            generated_challenge_code: None,
        };
        assert!(!saved.is_consistent());

        let empty = SavedState {
            quiz_data: Vec::new(),
            current_question_index: 0,
            user_answers: Vec::new(),
            ..saved.clone()
        };
        assert!(!empty.is_consistent());

        let overscored = SavedState {
            current_question_index: 0,
            score: 1,
            ..saved
        };
        assert!(!overscored.is_consistent());
    }
}
