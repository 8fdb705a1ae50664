// UI layer: terminal prompts using `dialoguer` and a spinner from
// `indicatif`. Commands talk to the user through the `Prompter` trait;
// validation of what the user typed lives here as plain functions.

use crate::error::{Error, Result};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Interactive questions a command may ask.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Ask for free text. An empty answer is allowed.
    fn text(&mut self, label: &str) -> Result<String>;
}

/// `Prompter` backed by the real terminal.
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()?;
        Ok(answer)
    }

    fn text(&mut self, label: &str) -> Result<String> {
        let answer: String = Input::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

/// Turn a 1-based menu answer into a 0-based index into `count` items.
pub fn parse_choice(noun: &str, input: &str, count: usize) -> Result<usize> {
    let trimmed = input.trim();
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(Error::InvalidChoice {
            noun: noun.to_string(),
            input: trimmed.to_string(),
            max: count,
        }),
    }
}

/// Print a numbered menu of `rows` and ask the user to pick one.
pub fn pick(prompter: &mut dyn Prompter, noun: &str, rows: &[String]) -> Result<usize> {
    for (i, row) in rows.iter().enumerate() {
        println!("[ {} ] {}", i + 1, row);
    }
    let answer = prompter.text(&format!("Choose a {} [1-{}]", noun, rows.len()))?;
    parse_choice(noun, &answer, rows.len())
}

/// A ticking spinner for blocking network calls. Hidden when stderr is
/// not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
