//! Line-based terminal prompts for the interactive commands.

use std::io::{BufRead, Write};

use crate::error::{MkquizError, Result};
use crate::folders::Confirm;

/// Questions the interactive commands ask the operator.
pub trait Prompter {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String>;

    /// Returns the index of the chosen entry.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize>;

    /// Returns the indices of the chosen entries in ascending order. An empty
    /// answer selects nothing.
    fn multi_select(&mut self, message: &str, choices: &[String]) -> Result<Vec<usize>>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Asks until `check` accepts the trimmed answer, printing its complaint
/// each time it does not.
pub fn text_until<F>(
    prompter: &mut dyn Prompter,
    message: &str,
    default: Option<&str>,
    check: F,
) -> Result<String>
where
    F: Fn(&str) -> std::result::Result<(), String>,
{
    loop {
        let answer = prompter.text(message, default)?;
        match check(&answer) {
            Ok(()) => return Ok(answer),
            Err(reason) => eprintln!(">> {}", reason),
        }
    }
}

/// Select over string labels, returning the chosen value.
pub fn select_value<T: Copy>(
    prompter: &mut dyn Prompter,
    message: &str,
    values: &[T],
    label: impl Fn(&T) -> String,
) -> Result<T> {
    let labels: Vec<String> = values.iter().map(label).collect();
    let index = prompter.select(message, &labels)?;
    values
        .get(index)
        .copied()
        .ok_or_else(|| MkquizError::validation("Selection out of range", "choice"))
}

/// Routes folder overwrite confirmations through a prompter, defaulting to no.
pub struct PromptConfirm<'a>(pub &'a mut dyn Prompter);

impl Confirm for PromptConfirm<'_> {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.0.confirm(message, false)
    }
}

/// Prompter over any line reader and writer; stdin/stdout in the binary.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "? {} ", prompt).map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(io_error)?;
        if read == 0 {
            return Err(MkquizError::quiz("Operation cancelled.", ""));
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line).map_err(io_error)
    }

    fn list(&mut self, choices: &[String]) -> Result<()> {
        for (i, choice) in choices.iter().enumerate() {
            self.say(&format!("  {}) {}", i + 1, choice))?;
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> MkquizError {
    MkquizError::quiz(format!("Terminal I/O failed: {}", e), "")
}

fn parse_choice(raw: &str, len: usize) -> Option<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        let prompt = match default {
            Some(d) => format!("{} ({})", message, d),
            None => message.to_string(),
        };
        let answer = self.ask(&prompt)?;
        match default {
            Some(d) if answer.is_empty() => Ok(d.to_string()),
            _ => Ok(answer),
        }
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize> {
        if choices.is_empty() {
            return Err(MkquizError::validation("Nothing to choose from", "choice"));
        }
        self.say(&format!("? {}", message))?;
        self.list(choices)?;
        loop {
            let answer = self.ask(&format!("Choose 1-{}:", choices.len()))?;
            if let Some(index) = parse_choice(&answer, choices.len()) {
                return Ok(index);
            }
            self.say(&format!(">> Please enter a number between 1 and {}", choices.len()))?;
        }
    }

    fn multi_select(&mut self, message: &str, choices: &[String]) -> Result<Vec<usize>> {
        self.say(&format!("? {}", message))?;
        self.list(choices)?;
        'ask: loop {
            let answer = self.ask("Numbers separated by spaces or commas (empty for none):")?;
            let mut picked = Vec::new();
            for part in answer.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
                match parse_choice(part, choices.len()) {
                    Some(index) => picked.push(index),
                    None => {
                        self.say(&format!(">> '{}' is not a valid choice", part))?;
                        continue 'ask;
                    }
                }
            }
            picked.sort_unstable();
            picked.dedup();
            return Ok(picked);
        }
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            let answer = self.ask(&format!("{} {}", message, hint))?;
            match answer.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say(">> Please answer y or n")?,
            }
        }
    }
}

// ---- Tests ----
