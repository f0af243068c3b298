//! Static command table.
//!
//! One [`CommandDescriptor`] per protocol command. The table is the single
//! source for name lookup, arity, usage lines and the `help` listing.

use super::handlers;
use super::Reply;
use crate::backend::DaqBackend;
use crate::error::Result;

/// Handler invoked with the arguments that follow the command name.
///
/// The dispatcher has already checked that `args.len()` equals the number
/// of declared parameters.
pub type Handler = fn(&mut dyn DaqBackend, &[String]) -> Result<Reply>;

/// A protocol command.
#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    /// Command name, matched case-insensitively
    pub name: &'static str,
    /// Parameter placeholders, in order
    pub params: &'static [&'static str],
    /// One-line description for `help`
    pub summary: &'static str,
    /// Handler function
    pub handler: Handler,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CommandDescriptor {
    /// Expected number of words, including the command name.
    pub fn arity(&self) -> usize {
        1 + self.params.len()
    }

    /// Name followed by its parameter placeholders.
    pub fn signature(&self) -> String {
        let mut signature = self.name.to_string();
        for param in self.params {
            signature.push(' ');
            signature.push_str(param);
        }
        signature
    }

    /// Usage line reported on an arity mismatch.
    pub fn usage(&self) -> String {
        format!("Usage: {}", self.signature())
    }
}

/// All commands, in `help` order.
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "help",
        params: &[],
        summary: "Get list of commands.",
        handler: handlers::help,
    },
    CommandDescriptor {
        name: "get_time",
        params: &[],
        summary: "Get current time.",
        handler: handlers::get_time,
    },
    CommandDescriptor {
        name: "*idn?",
        params: &[],
        summary: concat!("Get ID string: \"spp-nidaq ", env!("CARGO_PKG_VERSION"), "\"."),
        handler: handlers::idn,
    },
    CommandDescriptor {
        name: "task_create",
        params: &[],
        summary: "Create new task and return its handle.",
        handler: handlers::task_create,
    },
    CommandDescriptor {
        name: "task_start",
        params: &["<task>"],
        summary: "Start task.",
        handler: handlers::task_start,
    },
    CommandDescriptor {
        name: "task_stop",
        params: &["<task>"],
        summary: "Stop task.",
        handler: handlers::task_stop,
    },
    CommandDescriptor {
        name: "task_wait",
        params: &["<task>", "<timeout>"],
        summary: "Wait for a running task to finish.",
        handler: handlers::task_wait,
    },
    CommandDescriptor {
        name: "task_nchans",
        params: &["<task>"],
        summary: "Print number of channels in the task.",
        handler: handlers::task_nchans,
    },
    CommandDescriptor {
        name: "task_is_done",
        params: &["<task>"],
        summary: "Print 0 or 1 depending on the task status.",
        handler: handlers::task_is_done,
    },
    CommandDescriptor {
        name: "task_clear",
        params: &["<task>"],
        summary: "Clear task.",
        handler: handlers::task_clear,
    },
    CommandDescriptor {
        name: "device_reset",
        params: &["<name>"],
        summary: "Reset device, close all related tasks.",
        handler: handlers::device_reset,
    },
    CommandDescriptor {
        name: "task_add_chan_aivolt",
        params: &["<task>", "<chan>", "<vmin>", "<vmax>"],
        summary: "Add analog input voltage channel.",
        handler: handlers::task_add_chan_aivolt,
    },
    CommandDescriptor {
        name: "task_set_timing",
        params: &["<task>", "<rate>", "<count>"],
        summary: "Configure finite sampling on the default clock, rising edge.",
        handler: handlers::task_set_timing,
    },
    CommandDescriptor {
        name: "task_read_analog",
        params: &["<task>", "<count_per_ch>", "<timeout>"],
        summary: "Read samples, one line per sample with a value for each channel.",
        handler: handlers::task_read_analog,
    },
];

/// Find a command by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS
        .iter()
        .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
}

/// The `help` listing: one `signature -- summary` line per command.
pub fn help_lines() -> Vec<String> {
    COMMANDS
        .iter()
        .map(|descriptor| format!("{} -- {}", descriptor.signature(), descriptor.summary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("TASK_CREATE").map(|d| d.name), Some("task_create"));
        assert_eq!(lookup("*IDN?").map(|d| d.name), Some("*idn?"));
        assert!(lookup("task_creat").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = HashSet::new();
        for descriptor in COMMANDS {
            assert!(
                names.insert(descriptor.name.to_ascii_lowercase()),
                "duplicate command {}",
                descriptor.name
            );
        }
        assert_eq!(COMMANDS.len(), 14);
    }

    #[test]
    fn test_arity_counts_the_name() {
        let descriptor = lookup("task_add_chan_aivolt").unwrap();
        assert_eq!(descriptor.arity(), 5);
        assert_eq!(
            descriptor.usage(),
            "Usage: task_add_chan_aivolt <task> <chan> <vmin> <vmax>"
        );
        assert_eq!(lookup("help").unwrap().usage(), "Usage: help");
    }

    #[test]
    fn test_help_lists_every_command() {
        let lines = help_lines();
        assert_eq!(lines.len(), COMMANDS.len());
        assert_eq!(lines[0], "help -- Get list of commands.");
        assert!(lines
            .iter()
            .any(|l| l.starts_with("task_read_analog <task> <count_per_ch> <timeout> -- ")));
    }
}
