//! User-facing strings.
//!
//! The session only ever stores an [`ErrorKind`]; the text is looked up from the
//! current [`Language`] whenever a view is built, so switching languages
//! re-renders messages without touching quiz progress.

use serde::Serialize;

use crate::model::{Difficulty, Language};

/// The non-fatal errors a session can surface to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The generation backend failed or returned nothing usable
    Generation,
    /// A challenge code could not be decoded
    InvalidChallengeCode,
    /// An upload had a MIME type outside the allowed list
    FileType,
    /// Uploads would exceed the aggregate size limit
    FileSize,
}

/// Localized strings for one language
#[derive(Debug)]
pub struct Messages {
    pub error_message: &'static str,
    pub invalid_challenge_code: &'static str,
    pub file_type_error: &'static str,
    pub file_size_error: &'static str,
    /// Labels indexed in the order of [`Difficulty::ALL`]
    difficulties: [&'static str; 6],
    topic_prompt: &'static str,
    file_prompt: &'static str,
}

static VI: Messages = Messages {
    error_message: "Không thể tạo câu hỏi. Vui lòng thử lại sau.",
    invalid_challenge_code: "Mã thử thách không hợp lệ. Vui lòng kiểm tra lại.",
    file_type_error: "Loại tệp không được hỗ trợ. Vui lòng chọn PDF, TXT, DOCX hoặc hình ảnh.",
    file_size_error: "Tổng dung lượng tệp không được vượt quá 15MB.",
    difficulties: ["Rất dễ", "Dễ", "Trung bình", "Khó", "Rất khó", "Cực khó"],
    topic_prompt: "Tạo một bài kiểm tra trắc nghiệm gồm {count} câu hỏi về chủ đề sau: \"{topic}\". \
Mức độ khó: {difficulty}. Mỗi câu hỏi phải có đúng 4 lựa chọn khác nhau. \
Đảm bảo rằng correctAnswer phải là một trong các giá trị trong mảng options. \
Viết câu hỏi, các lựa chọn và lời giải thích bằng tiếng Việt.",
    file_prompt: "Dựa trên nội dung của các tài liệu được cung cấp, hãy tạo một bài kiểm tra trắc nghiệm gồm {count} câu hỏi. \
Mức độ khó: {difficulty}. Mỗi câu hỏi phải có đúng 4 lựa chọn khác nhau. \
Đảm bảo rằng correctAnswer phải là một trong các giá trị trong mảng options. \
Viết câu hỏi, các lựa chọn và lời giải thích bằng tiếng Việt.",
};

static EN: Messages = Messages {
    error_message: "Could not generate questions. Please try again later.",
    invalid_challenge_code: "Invalid challenge code. Please check it and try again.",
    file_type_error: "Unsupported file type. Please choose a PDF, TXT, DOCX or image file.",
    file_size_error: "The total size of the files must not exceed 15MB.",
    difficulties: ["Very easy", "Easy", "Medium", "Hard", "Very hard", "Extreme"],
    topic_prompt: "Create a multiple-choice quiz with {count} questions on the following topic: \"{topic}\". \
Difficulty: {difficulty}. Each question must have exactly 4 distinct options. \
Make sure correctAnswer is one of the values in the options array. \
Write the questions, options and explanations in English.",
    file_prompt: "Based on the content of the provided documents, create a multiple-choice quiz with {count} questions. \
Difficulty: {difficulty}. Each question must have exactly 4 distinct options. \
Make sure correctAnswer is one of the values in the options array. \
Write the questions, options and explanations in English.",
};

impl Language {
    /// Strings for this language
    pub fn messages(self) -> &'static Messages {
        match self {
            Self::Vi => &VI,
            Self::En => &EN,
        }
    }
}

impl Messages {
    /// Message shown for a session error
    pub const fn error(&self, kind: ErrorKind) -> &'static str {
        match kind {
            ErrorKind::Generation => self.error_message,
            ErrorKind::InvalidChallengeCode => self.invalid_challenge_code,
            ErrorKind::FileType => self.file_type_error,
            ErrorKind::FileSize => self.file_size_error,
        }
    }

    /// Display label of a difficulty
    pub const fn difficulty(&self, difficulty: Difficulty) -> &'static str {
        let index = match difficulty {
            Difficulty::VeryEasy => 0,
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::VeryHard => 4,
            Difficulty::Extreme => 5,
        };
        self.difficulties[index]
    }

    /// Prompt asking for `count` questions about `topic`
    pub fn topic_prompt(&self, topic: &str, count: u8, difficulty: Difficulty) -> String {
        self.topic_prompt
            .replace("{count}", &count.to_string())
            .replace("{difficulty}", self.difficulty(difficulty))
            .replace("{topic}", topic)
    }

    /// Prompt asking for `count` questions about attached documents
    pub fn file_prompt(&self, count: u8, difficulty: Difficulty) -> String {
        self.file_prompt
            .replace("{count}", &count.to_string())
            .replace("{difficulty}", self.difficulty(difficulty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(Difficulty::VeryEasy.label(Language::En), "Very easy");
        assert_eq!(Difficulty::Extreme.label(Language::En), "Extreme");
        assert_eq!(Difficulty::Medium.label(Language::Vi), "Trung bình");
    }

    #[test]
    fn test_topic_prompt_substitution() {
        let prompt = Language::En
            .messages()
            .topic_prompt("Solar System", 5, Difficulty::Hard);
        assert!(prompt.contains("5 questions"));
        assert!(prompt.contains("\"Solar System\""));
        assert!(prompt.contains("Difficulty: Hard."));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_topic_text_is_inserted_verbatim() {
        // Placeholders inside the topic itself must survive untouched
        let prompt = Language::En
            .messages()
            .topic_prompt("{count} braces", 3, Difficulty::Easy);
        assert!(prompt.contains("\"{count} braces\""));
    }

    #[test]
    fn test_file_prompt_substitution() {
        let prompt = Language::Vi.messages().file_prompt(12, Difficulty::Easy);
        assert!(prompt.contains("12 câu hỏi"));
        assert!(prompt.contains("Mức độ khó: Dễ."));
    }

    #[test]
    fn test_error_lookup_follows_language() {
        let kind = ErrorKind::InvalidChallengeCode;
        assert_ne!(
            Language::Vi.messages().error(kind),
            Language::En.messages().error(kind)
        );
        assert_eq!(
            Language::En.messages().error(ErrorKind::Generation),
            "Could not generate questions. Please try again later."
        );
    }
}
