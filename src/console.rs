//! Terminal front end: one participant, answers typed as letters.

use std::io::{self, BufRead, Write};

use crate::quiz::engine::{GradeOutcome, PresentedQuestion, QuizEngine};
use crate::quiz::error::QuizError;
use crate::quiz::ParticipantId;

const CONSOLE_PARTICIPANT: ParticipantId = ParticipantId(0);

/// Final result of a console run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamScore {
    pub correct: usize,
    pub total: usize,
}

/// Runs one exam against `engine`, reading answers from `input`.
///
/// Returns `Ok(None)` if the input ends before the exam is finished.
pub fn run_exam(
    engine: &QuizEngine,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<ExamScore>> {
    let bank_size = engine.start_session(CONSOLE_PARTICIPANT);

    let mut presented = loop {
        write!(
            output,
            "Enter the number of questions for the exam (1-{}): ",
            bank_size
        )?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match engine.set_question_count(CONSOLE_PARTICIPANT, &line) {
            Ok(presented) => break presented,
            Err(QuizError::InvalidCount { max, .. }) => {
                writeln!(
                    output,
                    "❌ Invalid input. Please enter a number between 1 and {}.",
                    max
                )?;
            }
            Err(e) => return Err(io::Error::other(e)),
        }
    };

    loop {
        write_question(output, &presented)?;
        let outcome = loop {
            write!(output, "📝 Your answer: ")?;
            output.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            match engine.grade_answer(CONSOLE_PARTICIPANT, &line) {
                Ok(outcome) => break outcome,
                Err(QuizError::UnknownLabel(_)) => {
                    let letters = presented
                        .options
                        .iter()
                        .map(|o| o.label.to_lowercase().to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(output, "⚠️ Invalid input. Please enter one of: {}.", letters)?;
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        };
        write_outcome(output, &outcome)?;

        if outcome.finished {
            writeln!(
                output,
                "\n🎯 Your final score: {}/{}",
                outcome.correct_count, outcome.answered
            )?;
            return Ok(Some(ExamScore {
                correct: outcome.correct_count,
                total: outcome.answered,
            }));
        }
        presented = engine
            .serve_next(CONSOLE_PARTICIPANT)
            .map_err(io::Error::other)?;
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn write_question(output: &mut impl Write, presented: &PresentedQuestion) -> io::Result<()> {
    writeln!(output, "\n📝 Question {}/{}", presented.number, presented.total)?;
    writeln!(output, "\n📌 {}", presented.text)?;
    for option in &presented.options {
        writeln!(output, "{}) {}", option.label.to_lowercase(), option.text)?;
    }
    Ok(())
}

fn write_outcome(output: &mut impl Write, outcome: &GradeOutcome) -> io::Result<()> {
    if outcome.is_correct {
        writeln!(output, "✅ Correct!")?;
    } else {
        writeln!(
            output,
            "❌ Incorrect. The correct answer is: {}) {}",
            outcome.correct_label.to_lowercase(),
            outcome.correct_text
        )?;
    }
    if !outcome.explanation.is_empty() {
        writeln!(output, "📖 Explanation: {}", outcome.explanation)?;
    }
    if let Some(link) = &outcome.reference_link {
        writeln!(output, "🔗 Reference: {}", link)?;
    }
    Ok(())
}
