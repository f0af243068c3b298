//! Protocol commands.
//!
//! A [`Command`] is one input line (or one process invocation) split into
//! words: the first word names the command, the rest are its arguments.
//! The [`table`] maps names to handlers; [`Reply`] carries the lines a
//! successful handler produced.

pub mod args;
mod handlers;
pub mod table;
pub mod words;

pub use handlers::IDN;
pub use table::{help_lines, lookup, CommandDescriptor, COMMANDS};
pub use words::split_words;

/// A command name with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    /// Build a command from a name and its arguments.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Build a command from words; `None` when there are no words.
    pub fn from_words<I, S>(words: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut words = words.into_iter().map(Into::into);
        let name = words.next()?;
        Some(Self::new(name, words.collect()))
    }

    /// Split an input line into a command; `None` for blank or comment lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        Self::from_words(split_words(line))
    }

    /// Command name as given by the client.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments following the name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of words, counting the name.
    pub fn word_count(&self) -> usize {
        1 + self.args.len()
    }
}

/// Output of a successful command: zero or more literal lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    lines: Vec<String>,
}

impl Reply {
    /// A reply without output.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A reply of a single line.
    pub fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }

    /// A reply of several lines.
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Output lines, without terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether the reply has no output.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
