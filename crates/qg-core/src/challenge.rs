//! Challenge codes.
//!
//! A challenge code is the standard Base64 encoding of the UTF-8 JSON form of a
//! [`QuizConfig`], prefixed with a format version:
//!
//! ```text
//! {"v":1,"topic":..,"numQuestions":..,"difficulty":..,"language":..,"model":..,"mode":"topic","seed":..}
//! ```
//!
//! Exchanging the code lets a second user regenerate the same quiz without
//! shipping the questions themselves.

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{Difficulty, FileContent, Language, QuestionCount, QuizConfig, QuizSource};

/// Format version written into every code
pub const CHALLENGE_VERSION: u64 = 1;

/// Accepts codes whose padding was stripped along the way (e.g. by a chat client)
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a challenge code was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("challenge code is not valid base64-encoded UTF-8 text")]
    MalformedEncoding,
    #[error("challenge code does not contain valid JSON")]
    InvalidJson,
    #[error("challenge code does not describe a quiz: {0}")]
    SchemaViolation(String),
}

#[derive(Serialize)]
struct Envelope<'a> {
    v: u64,
    #[serde(flatten)]
    config: &'a QuizConfig,
}

/// Every field optional so that each missing one gets its own message
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChallenge {
    v: Option<Value>,
    topic: Option<Value>,
    num_questions: Option<Value>,
    difficulty: Option<Value>,
    language: Option<Value>,
    model: Option<Value>,
    mode: Option<Value>,
    seed: Option<Value>,
    file_contents: Option<Value>,
}

/// Encode a config into a shareable challenge code
pub fn encode(config: &QuizConfig) -> String {
    let envelope = Envelope {
        v: CHALLENGE_VERSION,
        config,
    };
    let json = serde_json::to_string(&envelope)
        .expect("a config of strings, integers and unit enums always serializes");
    STANDARD.encode(json.as_bytes())
}

/// Decode a challenge code back into the config it was built from
///
/// Decoding is all-or-nothing: either every field is present and valid, or an
/// error is returned and nothing is produced.
pub fn decode(code: &str) -> Result<QuizConfig, DecodeError> {
    let bytes = LENIENT.decode(code.trim()).map_err(|e| {
        tracing::debug!("Challenge code is not base64: {e}");
        DecodeError::MalformedEncoding
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        tracing::debug!("Challenge code is not UTF-8: {e}");
        DecodeError::MalformedEncoding
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        tracing::debug!("Challenge code is not JSON: {e}");
        DecodeError::InvalidJson
    })?;

    if !value.is_object() {
        return Err(violation("expected a JSON object"));
    }
    let raw: RawChallenge =
        serde_json::from_value(value).map_err(|e| violation(&e.to_string()))?;

    validate(raw)
}

fn violation(reason: &str) -> DecodeError {
    DecodeError::SchemaViolation(reason.to_string())
}

fn validate(raw: RawChallenge) -> Result<QuizConfig, DecodeError> {
    if raw.v.as_ref().and_then(Value::as_u64) != Some(CHALLENGE_VERSION) {
        return Err(violation("unsupported or missing version"));
    }

    let topic = required_str(raw.topic, "topic")?;

    let num_questions = raw
        .num_questions
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| violation("missing numQuestions"))
        .and_then(|n| QuestionCount::new(n).map_err(|e| violation(&e.to_string())))?;

    let difficulty = required_str(raw.difficulty, "difficulty")?
        .parse::<Difficulty>()
        .map_err(|e| violation(&e.to_string()))?;
    let language = required_str(raw.language, "language")?;
    let language = Language::from_code(&language)
        .ok_or_else(|| violation(&format!("unknown language: '{language}'")))?;

    let model = required_str(raw.model, "model")?;

    let source = match required_str(raw.mode, "mode")?.as_str() {
        "topic" => {
            if raw.file_contents.is_some() {
                return Err(violation("topic mode cannot carry fileContents"));
            }
            let seed = raw
                .seed
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|s| u32::try_from(s).ok())
                .ok_or_else(|| violation("topic mode requires an integer seed"))?;
            QuizSource::Topic { seed }
        }
        "file" => {
            if raw.seed.is_some() {
                return Err(violation("file mode cannot carry a seed"));
            }
            let file_contents: Vec<FileContent> = raw
                .file_contents
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| violation(&format!("invalid fileContents: {e}")))?
                .unwrap_or_default();
            QuizSource::File { file_contents }
        }
        other => return Err(violation(&format!("unsupported mode '{other}'"))),
    };

    let config = QuizConfig {
        topic,
        num_questions,
        difficulty,
        language,
        model,
        source,
    };
    config.check().map_err(|e| violation(e.0))?;
    Ok(config)
}

fn required_str(value: Option<Value>, field: &str) -> Result<String, DecodeError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(violation(&format!("{field} must be a string"))),
        None => Err(violation(&format!("missing {field}"))),
    }
}
