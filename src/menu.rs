//! Interactive task menu.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use colored::Colorize;

use crate::models::IndexRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Downloads,
    Collect,
}

/// What the user picked: a task and the range to run it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub task: Task,
    pub range: IndexRange,
}

const CHOICES: [&str; 4] = [
    "Count downloads (custom range)",
    "Count downloads (auto range)",
    "Add to database (custom range)",
    "Add to database (auto range)",
];

pub struct Menu<R, W> {
    input: R,
    output: W,
    universe_len: usize,
    auto_range: IndexRange,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, universe_len: usize, auto_range: IndexRange) -> Self {
        Self {
            input,
            output,
            universe_len,
            auto_range,
        }
    }

    /// Ask until every answer validates. Fails only if input ends.
    pub fn run(&mut self) -> Result<Selection> {
        writeln!(self.output, "{}", "What task do you want to do?".bold())?;
        for (idx, choice) in CHOICES.iter().enumerate() {
            writeln!(self.output, "  {}) {}", idx + 1, choice)?;
        }

        let choice = self.ask("Task:", parse_choice)?;
        let task = if choice <= 2 { Task::Downloads } else { Task::Collect };

        let range = if choice % 2 == 1 {
            let len = self.universe_len;
            let start = self.ask("Start range:", |s| validate_start(s, len))?;
            let end = self.ask("End range:", |s| validate_end(s, start, len))?;
            IndexRange { start, end }
        } else {
            self.auto_range
        };

        Ok(Selection { task, range })
    }

    fn ask<T>(&mut self, prompt: &str, validate: impl Fn(&str) -> Result<T, String>) -> Result<T> {
        loop {
            write!(self.output, "{} {} ", "?".green(), prompt)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                bail!("input closed before a valid answer to {prompt:?}");
            }
            match validate(line.trim()) {
                Ok(value) => return Ok(value),
                Err(msg) => writeln!(self.output, "{} {}", ">>".red(), msg)?,
            }
        }
    }
}

fn parse_choice(input: &str) -> Result<usize, String> {
    match input.parse::<usize>() {
        Ok(n) if (1..=CHOICES.len()).contains(&n) => Ok(n),
        _ => Err(format!("Choose a task between 1 and {}", CHOICES.len())),
    }
}

fn parse_positive(input: &str) -> Result<usize, String> {
    match input.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err("Must be a positive integer".to_string()),
    }
}

pub fn validate_start(input: &str, universe_len: usize) -> Result<usize, String> {
    let start = parse_positive(input)?;
    if start >= universe_len {
        return Err(format!("Must be <= {}", universe_len.saturating_sub(1)));
    }
    Ok(start)
}

pub fn validate_end(input: &str, start: usize, universe_len: usize) -> Result<usize, String> {
    let end = parse_positive(input)?;
    if end > universe_len {
        return Err(format!("Must be <= {universe_len}"));
    }
    if end < start {
        return Err("End range cannot be less than start range".to_string());
    }
    Ok(end)
}
