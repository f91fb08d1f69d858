//! Line-oriented interactive prompts over any `BufRead`/`Write` pair.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::error::AppError;
use crate::models::parse_date;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Reads one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("Failed to read from input")?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn show_label(&mut self, label: &str, default: Option<&str>) -> Result<()> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", label, d)?,
            _ => write!(self.output, "{}: ", label)?,
        }
        self.output.flush()?;
        Ok(())
    }

    /// Asks until a non-empty answer is given. A blank answer takes the
    /// default when there is one.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        loop {
            self.show_label(label, default)?;
            let Some(line) = self.read_line()? else {
                return Err(ended(label));
            };
            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if let Some(d) = default.filter(|d| !d.is_empty()) {
                return Ok(d.to_string());
            }
        }
    }

    /// Like `ask`, but a blank answer with no default is `None`.
    pub fn ask_optional(&mut self, label: &str, default: Option<&str>) -> Result<Option<String>> {
        self.show_label(label, default)?;
        let line = self.read_line()?.unwrap_or_default();
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(Some(answer.to_string()));
        }
        Ok(default.filter(|d| !d.is_empty()).map(str::to_string))
    }

    pub fn ask_date(&mut self, label: &str) -> Result<NaiveDate> {
        let raw = self.ask(label, None)?;
        Ok(parse_date(&raw)?)
    }

    pub fn ask_optional_date(&mut self, label: &str) -> Result<Option<NaiveDate>> {
        match self.ask_optional(label, None)? {
            Some(raw) => Ok(Some(parse_date(&raw)?)),
            None => Ok(None),
        }
    }

    /// Asks for one of `options`, re-prompting on anything else.
    pub fn choose<T>(&mut self, label: &str, options: &[T], default: T) -> Result<T>
    where
        T: FromStr + Display + Copy + PartialEq,
    {
        let listed = options
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/");
        let prompt = format!("{} ({})", label, listed);
        let default_text = default.to_string();
        loop {
            let answer = self.ask(&prompt, Some(&default_text))?;
            match answer.parse::<T>() {
                Ok(value) if options.contains(&value) => return Ok(value),
                _ => self.say(&format!("Please choose one of: {}", listed))?,
            }
        }
    }

    /// Reads lines until one that is exactly `sentinel` (ignoring surrounding
    /// whitespace) or end of input. The sentinel line is not included.
    pub fn read_block(&mut self, sentinel: &str) -> Result<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim() == sentinel {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

fn ended(label: &str) -> anyhow::Error {
    AppError::Validation(format!("Input ended before '{}' was answered.", label)).into()
}
