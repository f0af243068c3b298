//! Command dispatch.
//!
//! The [`Dispatcher`] owns the backend and routes each [`Command`] to its
//! handler after name lookup and arity validation. Unknown names and wrong
//! argument counts are rejected before any backend call is made. The
//! dispatcher keeps no state between commands.

use tracing::debug;

use crate::backend::DaqBackend;
use crate::command::{lookup, Command, Reply};
use crate::error::{CommandError, Result};

/// Routes commands to their handlers against a backend.
#[derive(Debug)]
pub struct Dispatcher<B> {
    backend: B,
}

impl<B: DaqBackend> Dispatcher<B> {
    /// Create a dispatcher that owns `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute one command.
    pub fn dispatch(&mut self, command: &Command) -> Result<Reply> {
        let descriptor = lookup(command.name()).ok_or_else(|| CommandError::UnknownCommand {
            name: command.name().to_string(),
        })?;

        if command.word_count() != descriptor.arity() {
            return Err(CommandError::Usage {
                usage: descriptor.usage(),
            });
        }

        debug!(
            command = descriptor.name,
            args = command.args().len(),
            backend = self.backend.name(),
            "Dispatching command"
        );
        (descriptor.handler)(&mut self.backend, command.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::translate::status;
    use crate::backend::{SimulatedBackend, Waveform};
    use crate::command::COMMANDS;
    use crate::error::CommandErrorKind;

    fn dispatcher() -> Dispatcher<SimulatedBackend> {
        Dispatcher::new(
            SimulatedBackend::builder()
                .waveform(Waveform::Counter)
                .seed(Some(1))
                .build(),
        )
    }

    fn run(dispatcher: &mut Dispatcher<SimulatedBackend>, line: &str) -> Result<Reply> {
        let command = Command::parse_line(line).unwrap();
        dispatcher.dispatch(&command)
    }

    fn ok_line(dispatcher: &mut Dispatcher<SimulatedBackend>, line: &str) -> String {
        let reply = run(dispatcher, line).unwrap();
        assert_eq!(reply.lines().len(), 1, "{line} should print one line");
        reply.lines()[0].clone()
    }

    // =========================================================================
    // Lookup and arity
    // =========================================================================

    #[test]
    fn test_unknown_command_makes_no_backend_call() {
        let mut d = dispatcher();
        for line in ["frobnicate", "TASK_FROB 1 2", "idn"] {
            let err = run(&mut d, line).unwrap_err();
            assert_eq!(err.kind(), CommandErrorKind::UnknownCommand);
        }
        let err = run(&mut d, "Task_Frob").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: Task_Frob");
        assert!(d.backend().operations().is_empty());
    }

    #[test]
    fn test_arity_mismatch_makes_no_backend_call() {
        let mut d = dispatcher();
        for descriptor in COMMANDS {
            let too_many = std::iter::once(descriptor.name.to_string())
                .chain((0..descriptor.arity()).map(|i| i.to_string()));
            let command = Command::from_words(too_many).unwrap();
            let err = d.dispatch(&command).unwrap_err();
            assert_eq!(
                err,
                CommandError::Usage {
                    usage: descriptor.usage()
                }
            );

            if descriptor.arity() > 1 {
                let command = Command::new(descriptor.name, Vec::new());
                let err = d.dispatch(&command).unwrap_err();
                assert_eq!(err.kind(), CommandErrorKind::Usage);
            }
        }
        assert!(d.backend().operations().is_empty());
    }

    #[test]
    fn test_names_match_case_insensitively() {
        let mut d = dispatcher();
        let handle = ok_line(&mut d, "TASK_CREATE");
        ok_line(&mut d, "*IDN?");
        assert!(run(&mut d, &format!("Task_Clear {}", handle)).unwrap().is_empty());
    }

    #[test]
    fn test_argument_parse_errors() {
        let mut d = dispatcher();
        let err = run(&mut d, "task_start zzz").unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse \"zzz\" as task handle");

        let handle = ok_line(&mut d, "task_create");
        let err = run(&mut d, &format!("task_set_timing {} 1kHz 10", handle)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse \"1kHz\" as floating point number");

        let err = run(&mut d, &format!("task_set_timing {} 1000 -10", handle)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse \"-10\" as unsigned integer");

        // Only task_create reached the backend
        assert_eq!(d.backend().operations(), &["create_task"]);
    }

    // =========================================================================
    // Command behaviour
    // =========================================================================

    #[test]
    fn test_informational_commands() {
        let mut d = dispatcher();
        let help = run(&mut d, "help").unwrap();
        assert_eq!(help.lines().len(), COMMANDS.len());

        assert_eq!(ok_line(&mut d, "*idn?"), crate::command::IDN);

        let time = ok_line(&mut d, "get_time");
        let pattern = regex::Regex::new(r"^\d+\.\d{6}$").unwrap();
        assert!(pattern.is_match(&time), "unexpected time {time:?}");

        assert!(d.backend().operations().is_empty());
    }

    #[test]
    fn test_create_then_clear_invalidates_handle() {
        let mut d = dispatcher();
        let handle = ok_line(&mut d, "task_create");
        assert!(handle.starts_with("0x"));

        let reply = run(&mut d, &format!("task_clear {}", handle)).unwrap();
        assert!(reply.is_empty());

        let err = run(&mut d, &format!("task_clear {}", handle)).unwrap_err();
        match err {
            CommandError::Backend(ref backend) => assert_eq!(backend.code, status::INVALID_TASK),
            other => panic!("expected backend error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("DAQmx: "));
    }

    #[test]
    fn test_garbage_handle_is_a_backend_error() {
        let mut d = dispatcher();
        let err = run(&mut d, "task_nchans 12345").unwrap_err();
        assert_eq!(err.kind(), CommandErrorKind::Backend);
    }

    #[test]
    fn test_is_done_prints_zero_or_one() {
        let mut d = dispatcher();
        let handle = ok_line(&mut d, "task_create");
        run(&mut d, &format!("task_add_chan_aivolt {} Dev1/ai0 -10 10", handle)).unwrap();
        assert_eq!(ok_line(&mut d, &format!("task_is_done {}", handle)), "1");

        run(&mut d, &format!("task_start {}", handle)).unwrap();
        assert_eq!(ok_line(&mut d, &format!("task_is_done {}", handle)), "0");
    }

    #[test]
    fn test_multichannel_read_rows() {
        let mut d = dispatcher();
        let handle = ok_line(&mut d, "task_create");
        run(&mut d, &format!("task_add_chan_aivolt {} Dev1/ai0:2 -5 5", handle)).unwrap();
        assert_eq!(ok_line(&mut d, &format!("task_nchans {}", handle)), "3");
        run(&mut d, &format!("task_set_timing {} 1000 4", handle)).unwrap();
        run(&mut d, &format!("task_start {}", handle)).unwrap();
        run(&mut d, &format!("task_wait {} 1", handle)).unwrap();

        let reply = run(&mut d, &format!("task_read_analog {} 4 1", handle)).unwrap();
        assert_eq!(
            reply.lines(),
            [" 0 1000 2000", " 1 1001 2001", " 2 1002 2002", " 3 1003 2003"]
        );
    }

    #[test]
    fn test_device_reset_invalidates_tasks() {
        let mut d = dispatcher();
        let handle = ok_line(&mut d, "task_create");
        run(&mut d, &format!("task_add_chan_aivolt {} Dev1/ai0 -1 1", handle)).unwrap();
        assert!(run(&mut d, "device_reset Dev1").unwrap().is_empty());

        let err = run(&mut d, &format!("task_start {}", handle)).unwrap_err();
        assert_eq!(err.kind(), CommandErrorKind::Backend);
    }
}
