use std::io;

use quiz_bot::config::Config;
use quiz_bot::console;
use quiz_bot::{DrawMode, QuestionBank, QuizEngine};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    pretty_env_logger::init();

    let config = Config::from_env()?;
    let bank = QuestionBank::load(&config.questions_path)?;
    // The console exam never repeats a question
    let engine = QuizEngine::new(bank).with_draw_mode(DrawMode::WithoutReplacement);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    if console::run_exam(&engine, &mut input, &mut output)?.is_none() {
        log::info!("Input closed before the exam was finished");
    }
    Ok(())
}
