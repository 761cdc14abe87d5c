pub mod bank;
pub mod engine;
pub mod error;
pub mod session;
pub mod shuffle;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// A single question as it is stored in the dataset.
///
/// `options` maps an option key (e.g. `"a"`) to the option text. The order of
/// the keys carries no meaning: options are always shuffled before they are shown.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "question")]
    pub text: String,
    pub options: BTreeMap<String, String>,
    #[serde(rename = "correct_answer")]
    pub correct_key: String,
    pub explanation: String,
    #[serde(rename = "reference", alias = "source", default)]
    pub reference_link: Option<String>,
}

// Citation markers left behind by the tool that generated the explanations
static CONTENT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":contentReference\[.*?\]\{.*?\}").expect("static regex is valid")
});

impl QuestionRecord {
    pub fn new(
        text: impl Into<String>,
        options: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        correct_key: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            correct_key: correct_key.into(),
            explanation: explanation.into(),
            reference_link: None,
        }
    }

    pub fn with_reference(mut self, link: impl Into<String>) -> Self {
        self.reference_link = Some(link.into());
        self
    }

    /// Text of the correct option, looked up in the original (unshuffled) options.
    pub fn correct_text(&self) -> Option<&str> {
        self.options.get(&self.correct_key).map(String::as_str)
    }

    /// Explanation with citation artefacts and zero-width space entities removed.
    pub fn clean_explanation(&self) -> String {
        CONTENT_REFERENCE
            .replace_all(&self.explanation, "")
            .replace("&#8203;", "")
            .trim()
            .to_string()
    }
}

/// Identity of a quiz participant. For the Telegram front end this is the user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-letter label of a displayed option. Always stored upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(char);

impl Label {
    pub const MAX_OPTIONS: usize = 26;

    /// Label for the option at `index` in display order (`0 -> A`).
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::MAX_OPTIONS {
            return None;
        }
        Some(Self((b'A' + index as u8) as char))
    }

    /// Parses user input such as `"b"`, `" B "`. Anything other than one letter is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let mut chars = input.trim().chars();
        let c = chars.next()?;
        if chars.next().is_some() || !c.is_ascii_alphabetic() {
            return None;
        }
        Some(Self(c.to_ascii_uppercase()))
    }

    pub fn as_char(self) -> char {
        self.0
    }

    pub fn to_lowercase(self) -> char {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An option as presented to the participant: a label bound to the option text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOption {
    pub label: Label,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parsing_is_case_insensitive() {
        assert_eq!(Label::parse("b"), Label::from_index(1));
        assert_eq!(Label::parse(" B \n"), Label::from_index(1));
        assert_eq!(Label::parse("ab"), None);
        assert_eq!(Label::parse("1"), None);
        assert_eq!(Label::parse(""), None);
    }

    #[test]
    fn labels_stop_at_z() {
        assert_eq!(Label::from_index(25).map(Label::as_char), Some('Z'));
        assert_eq!(Label::from_index(26), None);
    }

    #[test]
    fn explanation_is_cleaned() {
        let question = QuestionRecord::new(
            "Q",
            [("a", "yes")],
            "a",
            "Traffic is inspected in the cloud.:contentReference[oaicite:0]{index=0}&#8203; ",
        );
        assert_eq!(
            question.clean_explanation(),
            "Traffic is inspected in the cloud."
        );
    }

    #[test]
    fn dataset_record_deserializes_with_source_alias() {
        let json = r#"{
            "question": "Which port?",
            "options": {"a": "80", "b": "443"},
            "correct_answer": "b",
            "explanation": "TLS",
            "source": "https://docs.example.com"
        }"#;
        let question: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(question.correct_text(), Some("443"));
        assert_eq!(
            question.reference_link.as_deref(),
            Some("https://docs.example.com")
        );
    }
}
