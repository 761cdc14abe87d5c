use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::quiz::error::LoadError;
use crate::quiz::{Label, QuestionRecord};

/// Immutable collection of questions, loaded once at startup.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Loads a JSON array of questions from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_reader(BufReader::new(file))?;
        log::info!("Loaded {} questions from {}", bank.size(), path.display());
        Ok(bank)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, LoadError> {
        let questions: Vec<QuestionRecord> = serde_json::from_reader(reader)?;
        Self::from_questions(questions)
    }

    /// Validates and wraps already parsed questions.
    ///
    /// Every question must name one of its own options as the correct answer
    /// and must fit in the `A..=Z` label range.
    pub fn from_questions(mut questions: Vec<QuestionRecord>) -> Result<Self, LoadError> {
        if questions.is_empty() {
            return Err(LoadError::Empty);
        }

        for (index, question) in questions.iter_mut().enumerate() {
            if !question.options.contains_key(&question.correct_key) {
                return Err(LoadError::MissingCorrectKey {
                    index,
                    key: question.correct_key.clone(),
                });
            }
            if question.options.len() > Label::MAX_OPTIONS {
                return Err(LoadError::TooManyOptions {
                    index,
                    count: question.options.len(),
                    max: Label::MAX_OPTIONS,
                });
            }

            // Grading compares option texts, so two identical texts make the result ambiguous
            let mut seen = HashSet::new();
            if question.options.values().any(|text| !seen.insert(text)) {
                log::warn!(
                    "Question #{} has duplicate option texts, grading may be ambiguous",
                    index
                );
            }

            if question
                .reference_link
                .as_deref()
                .is_some_and(|link| link.trim().is_empty())
            {
                question.reference_link = None;
            }
        }

        Ok(Self { questions })
    }

    pub fn size(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    /// Uniform pick with replacement: the same question may come up again later.
    pub fn pick_random(&self) -> &QuestionRecord {
        // The bank is never empty, `from_questions` rejects that
        self.questions
            .choose(&mut thread_rng())
            .unwrap_or(&self.questions[0])
    }

    /// Samples `n` distinct questions. `n` is clamped to the bank size.
    pub fn pick_random_subset(&self, n: usize) -> Vec<&QuestionRecord> {
        let n = n.min(self.size());
        self.questions.choose_multiple(&mut thread_rng(), n).collect()
    }
}
