use std::sync::atomic::{AtomicU64, Ordering};

use crate::quiz::bank::QuestionBank;
use crate::quiz::error::QuizError;
use crate::quiz::session::{CurrentQuestion, PendingQuestion, Retain, SessionRecord, SessionStore};
use crate::quiz::shuffle;
use crate::quiz::{DisplayOption, Label, ParticipantId, QuestionRecord};

/// How questions are drawn from the bank over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Every question is an independent pick, repeats are possible.
    #[default]
    WithReplacement,
    /// The whole session is sampled up front, no question repeats.
    WithoutReplacement,
}

/// A question ready to be shown. Carries no hint of which option is correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    /// Identifies this serving of the question, unique within the engine
    pub ticket: u64,
    pub text: String,
    pub options: Vec<DisplayOption>,
    /// 1-based position of this question within the session
    pub number: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub is_correct: bool,
    pub selected_label: Label,
    pub correct_label: Label,
    pub correct_text: String,
    pub question_text: String,
    pub explanation: String,
    pub reference_link: Option<String>,
    pub answered: usize,
    pub remaining: usize,
    pub correct_count: usize,
    /// The session ran out of questions and was removed
    pub finished: bool,
}

pub struct QuizEngine {
    bank: QuestionBank,
    sessions: SessionStore,
    draw_mode: DrawMode,
    next_ticket: AtomicU64,
}

impl QuizEngine {
    pub fn new(bank: QuestionBank) -> Self {
        Self {
            bank,
            sessions: SessionStore::new(),
            draw_mode: DrawMode::default(),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Opens a session waiting for a question count. Returns the bank size for the prompt.
    pub fn start_session(&self, participant: ParticipantId) -> usize {
        self.sessions.create(participant);
        log::info!("Participant {} started a quiz", participant);
        self.bank.size()
    }

    /// Sets how many questions the session should have and serves the first one.
    ///
    /// `input` is the raw count as typed by the participant.
    pub fn set_question_count(
        &self,
        participant: ParticipantId,
        input: &str,
    ) -> Result<PresentedQuestion, QuizError> {
        self.sessions
            .modify(participant, |record| {
                let served = self.parse_count(input).and_then(|count| {
                    log::debug!("Participant {} asked for {} questions", participant, count);
                    self.restart(record, count);
                    self.serve(record)
                });
                (served, Retain::Keep)
            })
            .unwrap_or(Err(QuizError::NoSession))
    }

    fn parse_count(&self, input: &str) -> Result<usize, QuizError> {
        let max = self.bank.size();
        input
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=max).contains(n))
            .ok_or_else(|| QuizError::InvalidCount {
                input: input.trim().to_string(),
                max,
            })
    }

    fn restart(&self, record: &mut SessionRecord, count: usize) {
        record.remaining = count;
        record.answered = 0;
        record.correct = 0;
        record.current = CurrentQuestion::Unset;
        record.queue = match self.draw_mode {
            DrawMode::WithReplacement => Vec::new(),
            DrawMode::WithoutReplacement => self
                .bank
                .pick_random_subset(count)
                .into_iter()
                .cloned()
                .collect(),
        };
    }

    /// Draws the next question and makes it the pending one.
    pub fn serve_next(&self, participant: ParticipantId) -> Result<PresentedQuestion, QuizError> {
        self.sessions
            .modify(participant, |record| (self.serve(record), Retain::Keep))
            .unwrap_or(Err(QuizError::NoActiveQuestion))
    }

    fn serve(&self, record: &mut SessionRecord) -> Result<PresentedQuestion, QuizError> {
        if record.remaining == 0 {
            return Err(QuizError::NoActiveQuestion);
        }

        let question = self.next_question(record);
        let correct_text = question
            .correct_text()
            .ok_or_else(|| {
                QuizError::DataIntegrity(format!(
                    "correct answer '{}' is not an option of \"{}\"",
                    question.correct_key, question.text
                ))
            })?
            .to_string();
        let display_options = shuffle::shuffle(&question.options);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let presented = PresentedQuestion {
            ticket,
            text: question.text.clone(),
            options: display_options.clone(),
            number: record.answered + 1,
            total: record.answered + record.remaining,
        };
        record.current = CurrentQuestion::Pending(PendingQuestion {
            ticket,
            question,
            display_options,
            correct_text,
        });

        Ok(presented)
    }

    fn next_question(&self, record: &mut SessionRecord) -> QuestionRecord {
        match self.draw_mode {
            DrawMode::WithoutReplacement => record
                .queue
                .pop()
                .unwrap_or_else(|| self.bank.pick_random().clone()),
            DrawMode::WithReplacement => self.bank.pick_random().clone(),
        }
    }

    /// Grades `selected` against the pending question.
    ///
    /// The answer is correct when the option text behind the selected label
    /// equals the text of the original correct option. Labels change on
    /// every question, the text is what stays stable.
    pub fn grade_answer(
        &self,
        participant: ParticipantId,
        selected: &str,
    ) -> Result<GradeOutcome, QuizError> {
        self.grade(participant, None, selected)
    }

    /// Like [`QuizEngine::grade_answer`], but only if `ticket` is the one the
    /// pending question was served with. An answer to any other serving is
    /// `NoActiveQuestion` and changes nothing.
    pub fn grade_ticket(
        &self,
        participant: ParticipantId,
        ticket: u64,
        selected: &str,
    ) -> Result<GradeOutcome, QuizError> {
        self.grade(participant, Some(ticket), selected)
    }

    fn grade(
        &self,
        participant: ParticipantId,
        ticket: Option<u64>,
        selected: &str,
    ) -> Result<GradeOutcome, QuizError> {
        let outcome = self
            .sessions
            .modify(participant, |record| match grade_record(record, ticket, selected) {
                Ok(outcome) if outcome.finished => (Ok(outcome), Retain::Remove),
                graded => (graded, Retain::Keep),
            })
            .unwrap_or(Err(QuizError::NoActiveQuestion))?;

        if outcome.finished {
            log::info!(
                "Participant {} finished a quiz with {}/{} correct",
                participant,
                outcome.correct_count,
                outcome.answered
            );
        }
        Ok(outcome)
    }
}

fn grade_record(
    record: &mut SessionRecord,
    ticket: Option<u64>,
    selected: &str,
) -> Result<GradeOutcome, QuizError> {
    let pending = record
        .current
        .pending()
        .filter(|pending| ticket.map_or(true, |t| t == pending.ticket))
        .ok_or(QuizError::NoActiveQuestion)?;

    let selected_option = Label::parse(selected)
        .and_then(|label| pending.display_options.iter().find(|o| o.label == label))
        .ok_or_else(|| QuizError::UnknownLabel(selected.trim().to_string()))?;
    let correct_label = pending
        .display_options
        .iter()
        .find(|o| o.text == pending.correct_text)
        .map(|o| o.label)
        .ok_or_else(|| {
            QuizError::DataIntegrity(format!(
                "correct answer of \"{}\" is missing from the shown options",
                pending.question.text
            ))
        })?;

    let is_correct = selected_option.text == pending.correct_text;
    let selected_label = selected_option.label;
    let question = &pending.question;
    let mut outcome = GradeOutcome {
        is_correct,
        selected_label,
        correct_label,
        correct_text: pending.correct_text.clone(),
        question_text: question.text.clone(),
        explanation: question.clean_explanation(),
        reference_link: question.reference_link.clone(),
        answered: 0,
        remaining: 0,
        correct_count: 0,
        finished: false,
    };

    record.answered += 1;
    record.remaining = record.remaining.saturating_sub(1);
    if is_correct {
        record.correct += 1;
    }
    record.current = CurrentQuestion::Unset;

    outcome.answered = record.answered;
    outcome.remaining = record.remaining;
    outcome.correct_count = record.correct;
    outcome.finished = record.remaining == 0;
    Ok(outcome)
}
