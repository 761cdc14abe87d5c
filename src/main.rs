use std::{sync::Arc, time::Duration};

use quiz_bot::config::Config;
use quiz_bot::{
    GradeOutcome, Label, ParticipantId, PresentedQuestion, QuestionBank, QuizEngine, QuizError,
};
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, User},
    utils::{command::BotCommands, html},
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "show the welcome message.")]
    Start,
    #[command(description = "show how to use the bot.")]
    Help,
    #[command(description = "start a new quiz.")]
    Quiz,
}

#[tokio::main]
async fn main() -> HandlerResult {
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let config = Config::from_env()?;
    let bot = Bot::new(config.require_token()?);

    let bank = QuestionBank::load(&config.questions_path)?;
    let engine = Arc::new(QuizEngine::new(bank));

    if let Some(ttl) = config.session_ttl {
        spawn_session_reaper(engine.clone(), ttl);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(receive_command),
                )
                .branch(dptree::endpoint(receive_question_count)),
        )
        .branch(Update::filter_callback_query().endpoint(receive_answer));

    // Sessions belong to users, not chats: one user's updates are handled in
    // order even when they come from different chats
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .distribution_function(|update: &Update| update.user().map(|user| user.id))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

fn spawn_session_reaper(engine: Arc<QuizEngine>, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl.min(Duration::from_secs(60)));
        loop {
            interval.tick().await;
            let removed = engine.sessions().purge_idle(ttl);
            if removed > 0 {
                log::info!("Dropped {} idle quiz sessions", removed);
            }
        }
    });
}

fn participant(user: &User) -> ParticipantId {
    ParticipantId(user.id.0)
}

const WELCOME_TEXT: &str = "👋 <b>Welcome to the Questions BOT</b>\n\n\
    📌 <b>How to use:</b>\n\
    1️⃣ Type <code>/quiz</code> to start a quiz.\n\
    2️⃣ Enter how many questions you want (e.g., 3).\n\
    3️⃣ Choose the correct answer from the options.\n\
    4️⃣ You'll get an explanation and a reference link for each question.\n\n\
    💡 Use this as a tool to review your knowledge, not as a full training. Do the labs!";
const NO_QUIZ_TEXT: &str = "⚠️ No quiz in progress. Use /quiz to start.";

async fn receive_command(
    bot: Bot,
    engine: Arc<QuizEngine>,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    match cmd {
        Command::Start | Command::Help => {
            bot.send_message(msg.chat.id, WELCOME_TEXT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Quiz => {
            let Some(user) = msg.from() else {
                return Ok(());
            };
            let available = engine.start_session(participant(user));
            bot.send_message(
                msg.chat.id,
                format!(
                    "How many questions do you want to answer? (e.g. 3)\nAvailable: {}",
                    available
                ),
            )
            .await?;
        }
    }
    Ok(())
}

async fn receive_question_count(
    bot: Bot,
    engine: Arc<QuizEngine>,
    msg: Message,
) -> HandlerResult {
    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        return Ok(());
    };

    match engine.set_question_count(participant(user), text) {
        Ok(presented) => send_question(&bot, msg.chat.id, &presented).await?,
        Err(QuizError::InvalidCount { max, .. }) => {
            bot.send_message(
                msg.chat.id,
                format!("❌ Please send a number between 1 and {}.", max),
            )
            .await?;
        }
        Err(QuizError::NoSession) => {
            bot.send_message(msg.chat.id, NO_QUIZ_TEXT).await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Button payload: the ticket of the serving and the option letter, e.g. `"17:b"`.
fn callback_data(ticket: u64, label: Label) -> String {
    format!("{}:{}", ticket, label.to_lowercase())
}

fn parse_callback_data(data: &str) -> Option<(u64, &str)> {
    let (ticket, label) = data.split_once(':')?;
    Some((ticket.parse().ok()?, label))
}

async fn send_question(
    bot: &Bot,
    chat_id: ChatId,
    presented: &PresentedQuestion,
) -> HandlerResult {
    let keyboard = InlineKeyboardMarkup::new(presented.options.iter().map(|option| {
        vec![InlineKeyboardButton::callback(
            format!("{}) {}", option.label, option.text),
            callback_data(presented.ticket, option.label),
        )]
    }));

    bot.send_message(
        chat_id,
        format!(
            "<b>Question {}/{}:</b>\n{}",
            presented.number,
            presented.total,
            html::escape(&presented.text)
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

/// Engine side of a button press: the graded answer and, unless the quiz is
/// over, the question served after it.
#[derive(Debug)]
struct AnswerStep {
    outcome: GradeOutcome,
    next: Option<PresentedQuestion>,
}

/// Grades the pressed button and serves the next question in one go, before
/// anything is sent to Telegram. A failed send can then never leave the
/// session with questions remaining but none pending.
fn answer_and_advance(
    engine: &QuizEngine,
    participant_id: ParticipantId,
    data: &str,
) -> Result<AnswerStep, QuizError> {
    // Buttons without a ticket come from keyboards this bot no longer sends
    let (ticket, label) =
        parse_callback_data(data).ok_or_else(|| QuizError::UnknownLabel(data.to_string()))?;

    let outcome = engine.grade_ticket(participant_id, ticket, label)?;
    let next = if outcome.finished {
        None
    } else {
        Some(engine.serve_next(participant_id)?)
    };
    Ok(AnswerStep { outcome, next })
}

async fn receive_answer(bot: Bot, engine: Arc<QuizEngine>, q: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message else {
        return Ok(());
    };
    let participant_id = participant(&q.from);
    let data = q.data.unwrap_or_default();

    let step = match answer_and_advance(&engine, participant_id, &data) {
        Ok(step) => step,
        Err(QuizError::UnknownLabel(label)) => {
            log::debug!("Participant {} sent unknown option '{}'", participant_id, label);
            return Ok(());
        }
        Err(QuizError::NoActiveQuestion) => {
            bot.edit_message_text(message.chat.id, message.id, NO_QUIZ_TEXT)
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = bot
        .edit_message_text(message.chat.id, message.id, render_outcome(&step.outcome))
        .parse_mode(ParseMode::Html)
        .await
    {
        log::warn!("Failed to show the result to participant {}: {}", participant_id, e);
    }

    let Some(next) = step.next else {
        bot.send_message(
            message.chat.id,
            format!(
                "🏁 Quiz finished! You answered {} questions, {} correctly. 👏",
                step.outcome.answered, step.outcome.correct_count
            ),
        )
        .await?;
        return Ok(());
    };

    if let Err(e) = bot.send_message(message.chat.id, "⏭ Next question:").await {
        log::warn!("Failed to announce the next question: {}", e);
    }
    send_question(&bot, message.chat.id, &next).await
}

fn render_outcome(outcome: &GradeOutcome) -> String {
    let result = if outcome.is_correct {
        "✅ <b>Correct!</b>".to_string()
    } else {
        format!(
            "❌ <b>Wrong!</b> Correct answer: <b>{}</b>",
            outcome.correct_label
        )
    };
    let link = outcome
        .reference_link
        .as_deref()
        .map(|link| {
            format!(
                "\n\n🔗 <a href=\"{}\">Related documentation</a>",
                html::escape(link)
            )
        })
        .unwrap_or_default();

    format!(
        "<b>Question:</b>\n{}\n\n{}\n\n📘 <b>Explanation:</b>\n<i>{}</i>{}",
        html::escape(&outcome.question_text),
        result,
        html::escape(&outcome.explanation),
        link
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_bot::QuestionRecord;

    const USER: ParticipantId = ParticipantId(100);

    fn outcome(is_correct: bool) -> GradeOutcome {
        GradeOutcome {
            is_correct,
            selected_label: Label::parse("a").unwrap(),
            correct_label: Label::parse("c").unwrap(),
            correct_text: "SD-WAN".to_string(),
            question_text: "What is <SASE>?".to_string(),
            explanation: "Secure access".to_string(),
            reference_link: None,
            answered: 1,
            remaining: 0,
            correct_count: 0,
            finished: true,
        }
    }

    fn engine() -> QuizEngine {
        let questions = (0..3)
            .map(|i| {
                QuestionRecord::new(
                    format!("Question {i}"),
                    [("a", format!("yes {i}")), ("b", format!("no {i}"))],
                    "a",
                    "",
                )
            })
            .collect();
        QuizEngine::new(QuestionBank::from_questions(questions).unwrap())
    }

    fn press(presented: &PresentedQuestion) -> String {
        callback_data(presented.ticket, presented.options[0].label)
    }

    #[test]
    fn wrong_answer_names_the_correct_letter() {
        let text = render_outcome(&outcome(false));
        assert!(text.contains("❌ <b>Wrong!</b> Correct answer: <b>C</b>"));
        assert!(text.contains("What is &lt;SASE&gt;?"));
        assert!(!text.contains("Related documentation"));
    }

    #[test]
    fn reference_link_is_rendered() {
        let mut outcome = outcome(true);
        outcome.reference_link = Some("https://docs.example.com".to_string());
        let text = render_outcome(&outcome);
        assert!(text.starts_with("<b>Question:</b>"));
        assert!(text.contains("✅ <b>Correct!</b>"));
        assert!(text.contains("<a href=\"https://docs.example.com\">Related documentation</a>"));
    }

    #[test]
    fn callback_data_carries_ticket_and_letter() {
        let label = Label::parse("B").unwrap();
        assert_eq!(callback_data(17, label), "17:b");
        assert_eq!(parse_callback_data("17:b"), Some((17, "b")));
        assert_eq!(parse_callback_data("b"), None);
        assert_eq!(parse_callback_data("x:b"), None);
    }

    #[test]
    fn next_question_is_pending_before_anything_is_sent() {
        let engine = engine();
        engine.start_session(USER);
        let first = engine.set_question_count(USER, "2").unwrap();

        let step = answer_and_advance(&engine, USER, &press(&first)).unwrap();
        assert!(!step.outcome.finished);
        let next = step.next.unwrap();

        let record = engine.sessions().get(USER).unwrap();
        assert_eq!(record.remaining, 1);
        assert_eq!(record.current.pending().map(|p| p.ticket), Some(next.ticket));

        let last = answer_and_advance(&engine, USER, &press(&next)).unwrap();
        assert!(last.outcome.finished);
        assert!(last.next.is_none());
        assert!(engine.sessions().get(USER).is_none());
    }

    #[test]
    fn button_from_an_abandoned_quiz_is_rejected() {
        let engine = engine();
        engine.start_session(USER);
        let abandoned = engine.set_question_count(USER, "2").unwrap();
        engine.start_session(USER);
        engine.set_question_count(USER, "2").unwrap();

        assert!(matches!(
            answer_and_advance(&engine, USER, &press(&abandoned)),
            Err(QuizError::NoActiveQuestion)
        ));
        assert_eq!(engine.sessions().get(USER).unwrap().answered, 0);
    }

    #[test]
    fn button_without_ticket_is_an_unknown_option() {
        let engine = engine();
        engine.start_session(USER);
        engine.set_question_count(USER, "1").unwrap();

        assert!(matches!(
            answer_and_advance(&engine, USER, "a"),
            Err(QuizError::UnknownLabel(_))
        ));
        assert!(engine.sessions().get(USER).unwrap().current.pending().is_some());
    }
}
