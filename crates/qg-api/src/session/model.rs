use qg_core::{
    Difficulty, InputMode, Language, QuestionCount, SessionView, Upload, model::AVAILABLE_MODELS,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Reopen the saved progress of this session instead of starting a new one
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
    #[serde(flatten)]
    pub view: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub resume: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1))]
    pub option: String,
}

/// Present-but-null becomes `Some(None)`, absent stays `None`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial setup update; absent fields are left alone
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetupPatch {
    pub language: Option<String>,
    #[validate(length(max = 500))]
    pub topic: Option<String>,
    /// `null` clears the field, which blocks generation in topic and file mode
    #[serde(default, deserialize_with = "nullable")]
    pub num_questions: Option<Option<u64>>,
    pub difficulty: Option<String>,
    pub model: Option<String>,
    pub input_mode: Option<String>,
    #[validate(length(max = 8192))]
    pub challenge_code: Option<String>,
}

/// A [`SetupPatch`] with every value checked
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SetupChanges {
    pub language: Option<Language>,
    pub topic: Option<String>,
    pub num_questions: Option<Option<QuestionCount>>,
    pub difficulty: Option<Difficulty>,
    pub model: Option<String>,
    pub input_mode: Option<InputMode>,
    pub challenge_code: Option<String>,
}

fn invalid(e: impl std::fmt::Display) -> ApiError {
    ApiError::Validation(e.to_string())
}

impl SetupPatch {
    pub fn into_changes(self) -> Result<SetupChanges, ApiError> {
        self.validate()?;

        if let Some(model) = &self.model
            && !AVAILABLE_MODELS.contains(&model.as_str())
        {
            return Err(ApiError::Validation(format!("unknown model: '{model}'")));
        }

        Ok(SetupChanges {
            language: self.language.map(|l| l.parse::<Language>()).transpose().map_err(invalid)?,
            topic: self.topic,
            num_questions: self
                .num_questions
                .map(|count| count.map(QuestionCount::new).transpose())
                .transpose()
                .map_err(invalid)?,
            difficulty: self.difficulty.map(|d| d.parse::<Difficulty>()).transpose().map_err(invalid)?,
            model: self.model,
            input_mode: self.input_mode.map(|m| m.parse::<InputMode>()).transpose().map_err(invalid)?,
            challenge_code: self.challenge_code,
        })
    }
}

/// Longest accepted file name, in characters
const MAX_FILE_NAME_LEN: usize = 255;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    /// Base64, optionally as a `data:` URL
    pub data: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddFilesRequest {
    #[validate(length(min = 1, max = 20))]
    pub files: Vec<FilePayload>,
}

impl AddFilesRequest {
    pub fn into_uploads(self) -> Result<Vec<Upload>, ApiError> {
        self.validate()?;
        if let Some(file) = self
            .files
            .iter()
            .find(|f| f.name.chars().count() > MAX_FILE_NAME_LEN)
        {
            return Err(ApiError::Validation(format!(
                "file name is longer than {MAX_FILE_NAME_LEN} characters: '{}...'",
                file.name.chars().take(20).collect::<String>()
            )));
        }
        self.files
            .iter()
            .map(|f| Upload::from_base64(&f.name, &f.mime_type, &f.data).map_err(invalid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn patch(value: serde_json::Value) -> SetupPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_patch_parses_every_field() {
        let changes = patch(json!({
            "language": "en",
            "topic": "Volcanoes",
            "numQuestions": 12,
            "difficulty": "very_hard",
            "model": "gemini-2.5-pro",
            "inputMode": "challenge",
            "challengeCode": "abc"
        }))
        .into_changes()
        .unwrap();

        assert_eq!(changes.language, Some(Language::En));
        assert_eq!(changes.topic.as_deref(), Some("Volcanoes"));
        assert_eq!(changes.num_questions, Some(QuestionCount::new(12).ok()));
        assert_eq!(changes.difficulty, Some(Difficulty::VeryHard));
        assert_eq!(changes.input_mode, Some(InputMode::Challenge));
        assert_eq!(changes.challenge_code.as_deref(), Some("abc"));
    }

    #[test]
    fn test_null_question_count_clears_field() {
        let changes = patch(json!({ "numQuestions": null })).into_changes().unwrap();
        assert_eq!(changes.num_questions, Some(None));

        let changes = patch(json!({})).into_changes().unwrap();
        assert_eq!(changes, SetupChanges::default());
    }

    #[test]
    fn test_patch_rejects_bad_values() {
        for value in [
            json!({ "numQuestions": 0 }),
            json!({ "numQuestions": 101 }),
            json!({ "language": "fr" }),
            json!({ "difficulty": "impossible" }),
            json!({ "model": "gpt-4" }),
            json!({ "inputMode": "voice" }),
            json!({ "topic": "x".repeat(501) }),
        ] {
            assert!(
                matches!(patch(value.clone()).into_changes(), Err(ApiError::Validation(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        assert!(serde_json::from_value::<SetupPatch>(json!({ "score": 10 })).is_err());
    }

    #[test]
    fn test_add_files_decodes_payloads() {
        let request: AddFilesRequest = serde_json::from_value(json!({
            "files": [{ "name": "notes.txt", "mimeType": "text/plain", "data": "aGVsbG8=" }]
        }))
        .unwrap();
        let uploads = request.into_uploads().unwrap();
        assert_eq!(uploads[0].size, 5);

        let empty: AddFilesRequest = serde_json::from_value(json!({ "files": [] })).unwrap();
        assert!(empty.into_uploads().is_err());

        let garbage: AddFilesRequest = serde_json::from_value(json!({
            "files": [{ "name": "x.pdf", "mimeType": "application/pdf", "data": "%%%" }]
        }))
        .unwrap();
        assert!(matches!(garbage.into_uploads(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_add_files_limits_file_count() {
        let file = json!({ "name": "a.txt", "mimeType": "text/plain", "data": "aGk=" });

        let twenty: AddFilesRequest =
            serde_json::from_value(json!({ "files": vec![file.clone(); 20] })).unwrap();
        assert_eq!(twenty.into_uploads().unwrap().len(), 20);

        let too_many: AddFilesRequest =
            serde_json::from_value(json!({ "files": vec![file; 21] })).unwrap();
        assert!(matches!(too_many.into_uploads(), Err(ApiError::Validation(_))));
    }
}
