//! Operator console and the unbounded re-prompt loop.
//!
//! Every interactive choice goes through [`prompt_until`], which walks the
//! states `Prompting -> Validating -> Accepted`. Invalid input returns to
//! `Prompting`; the only exits are an accepted answer or a closed console.

use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("operator input closed")]
    Closed,
    #[error("console I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where questions are asked and answers come from.
pub trait Operator {
    /// Display informational text.
    fn show(&mut self, text: &str);

    /// Ask a question and return the raw answer line.
    fn ask(&mut self, question: &str) -> Result<String, PromptError>;
}

/// States of an interactive question.
#[derive(Debug, PartialEq)]
pub enum PromptState<T> {
    Prompting,
    Validating(String),
    Accepted(T),
}

/// Ask `question` until `validate` accepts the (trimmed) answer.
pub fn prompt_until<T>(
    operator: &mut dyn Operator,
    question: &str,
    invalid_message: &str,
    mut validate: impl FnMut(&str) -> Option<T>,
) -> Result<T, PromptError> {
    let mut state = PromptState::Prompting;
    loop {
        state = match state {
            PromptState::Prompting => PromptState::Validating(operator.ask(question)?),
            PromptState::Validating(answer) => match validate(answer.trim()) {
                Some(value) => PromptState::Accepted(value),
                None => {
                    log::debug!("Rejected answer {answer:?}");
                    operator.show(invalid_message);
                    PromptState::Prompting
                }
            },
            PromptState::Accepted(value) => return Ok(value),
        };
    }
}

/// Operator on the process's stdin/stdout.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn show(&mut self, text: &str) {
        // Console write failures are ignored
        let _ = writeln!(self.output, "{text}");
    }

    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Operator that replays canned answers and records everything shown.
#[cfg(test)]
pub(crate) struct ScriptedOperator {
    answers: std::collections::VecDeque<String>,
    pub shown: Vec<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedOperator {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            shown: Vec::new(),
            asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Operator for ScriptedOperator {
    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        self.asked.push(question.to_string());
        self.answers.pop_front().ok_or(PromptError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_small(s: &str) -> Option<u32> {
        s.parse().ok().filter(|n| (1..=3).contains(n))
    }

    #[test]
    fn test_accepts_first_valid() {
        let mut op = ScriptedOperator::new(&["2"]);
        let v = prompt_until(&mut op, "? ", "Invalid selection", parse_small).unwrap();
        assert_eq!(v, 2);
        assert_eq!(op.asked.len(), 1);
        assert!(op.shown.is_empty());
    }

    #[test]
    fn test_reprompts_until_valid() {
        let mut op = ScriptedOperator::new(&["x", "0", "9", " 3 "]);
        let v = prompt_until(&mut op, "? ", "Invalid selection", parse_small).unwrap();
        assert_eq!(v, 3);
        assert_eq!(op.asked.len(), 4);
        assert_eq!(op.shown, vec!["Invalid selection"; 3]);
    }

    #[test]
    fn test_closed_input_ends_loop() {
        let mut op = ScriptedOperator::new(&["nope"]);
        let err = prompt_until(&mut op, "? ", "Invalid selection", parse_small).unwrap_err();
        assert!(matches!(err, PromptError::Closed));
    }

    #[test]
    fn test_terminal_operator_reads_lines() {
        let input = io::Cursor::new(b"hello\r\n".to_vec());
        let mut output = Vec::new();
        let mut op = TerminalOperator::new(input, &mut output);
        assert_eq!(op.ask("Name: ").unwrap(), "hello");
        assert!(matches!(op.ask("Again: "), Err(PromptError::Closed)));
        op.show("bye");
        drop(op);
        assert_eq!(String::from_utf8(output).unwrap(), "Name: Again: bye\n");
    }
}
