//! SPP session protocol.
//!
//! Two ways to run commands, both over the same [`Dispatcher`]:
//!
//! - **Single command**: one command from the process arguments. Handler
//!   output is written as-is; a failure is rendered as an error block and
//!   reported to the caller, which turns it into the exit status.
//! - **Interactive**: a banner, then one command per input line until end
//!   of input. Every command is answered by its output lines followed by
//!   exactly one terminal marker, `#OK` or `#Error: <message>`. Failures
//!   never end the session. Blank and comment-only lines get no answer.
//!
//! Output is flushed after every response so a client on a pipe sees each
//! answer as soon as it is complete.

use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::backend::DaqBackend;
use crate::command::{Command, Reply};
use crate::dispatch::Dispatcher;
use crate::error::CommandError;

/// Protocol identification line opening an interactive session.
pub const PROTOCOL_LINE: &str = "#SPP001";

/// Hint printed after the protocol line.
pub const GREETING: &str = "Type help to see command list.";

/// Terminal marker of a successful command.
pub const OK_MARKER: &str = "#OK";

/// Prefix of the terminal marker of a failed command.
pub const ERROR_MARKER: &str = "#Error:";

/// Counters of an interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Commands answered with `#OK`
    pub ok: usize,
    /// Commands answered with `#Error:`
    pub failed: usize,
}

impl SessionSummary {
    /// Number of commands executed.
    pub fn total(&self) -> usize {
        self.ok + self.failed
    }
}

/// Runs commands against a backend and frames the responses.
#[derive(Debug)]
pub struct Session<B> {
    dispatcher: Dispatcher<B>,
}

impl<B: DaqBackend> Session<B> {
    /// Create a session over `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            dispatcher: Dispatcher::new(backend),
        }
    }

    /// Run one command in single-command mode.
    ///
    /// Returns `Ok(true)` when the command succeeded. A failed command is
    /// rendered to `out` and yields `Ok(false)`; `Err` is reserved for
    /// failures writing the output.
    pub fn run_single<W: Write>(&mut self, command: &Command, out: &mut W) -> io::Result<bool> {
        let succeeded = match self.dispatcher.dispatch(command) {
            Ok(reply) => {
                write_reply(out, &reply)?;
                true
            }
            Err(err) => {
                log_failure(command, &err);
                write_error(out, &err)?;
                false
            }
        };
        out.flush()?;
        Ok(succeeded)
    }

    /// Run an interactive session until `input` is exhausted.
    pub fn run_interactive<R, W>(&mut self, mut input: R, out: &mut W) -> io::Result<SessionSummary>
    where
        R: BufRead,
        W: Write,
    {
        let mut summary = SessionSummary::default();

        writeln!(out, "{}", PROTOCOL_LINE)?;
        writeln!(out, "{}", GREETING)?;
        writeln!(out, "{}", OK_MARKER)?;
        out.flush()?;
        info!("Interactive session started");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(command) = Command::parse_line(line) else {
                continue;
            };

            match self.dispatcher.dispatch(&command) {
                Ok(reply) => {
                    write_reply(out, &reply)?;
                    writeln!(out, "{}", OK_MARKER)?;
                    summary.ok += 1;
                }
                Err(err) => {
                    log_failure(&command, &err);
                    write_error(out, &err)?;
                    summary.failed += 1;
                }
            }
            out.flush()?;
        }

        info!(
            ok = summary.ok,
            failed = summary.failed,
            "Interactive session ended"
        );
        Ok(summary)
    }
}

fn write_reply<W: Write>(out: &mut W, reply: &Reply) -> io::Result<()> {
    for line in reply.lines() {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Render an error block: an empty line, then the error marker line.
pub fn write_error<W: Write>(out: &mut W, err: &CommandError) -> io::Result<()> {
    write!(out, "\n{} {}\n", ERROR_MARKER, err)
}

fn log_failure(command: &Command, err: &CommandError) {
    debug!(
        command = command.name(),
        kind = %err.kind(),
        error = %err,
        "Command failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use std::io::Cursor;
    use tracing_test::traced_test;

    fn interactive(input: &str) -> (String, SessionSummary) {
        let mut session = Session::new(SimulatedBackend::new());
        let mut out = Vec::new();
        let summary = session
            .run_interactive(Cursor::new(input.as_bytes()), &mut out)
            .unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn test_banner_on_empty_input() {
        let (out, summary) = interactive("");
        assert_eq!(out, "#SPP001\nType help to see command list.\n#OK\n");
        assert_eq!(summary, SessionSummary::default());
    }

    #[test]
    fn test_blank_lines_get_no_response() {
        let (out, summary) = interactive("\n   \n# note\r\n");
        assert_eq!(out, "#SPP001\nType help to see command list.\n#OK\n");
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_one_marker_per_command_in_order() {
        let (out, summary) = interactive("*idn?\nbogus\ntask_start\n\n*IDN?\r\n");
        let expected = format!(
            "#SPP001\nType help to see command list.\n#OK\n\
             {idn}\n#OK\n\
             \n#Error: Unknown command: bogus\n\
             \n#Error: Usage: task_start <task>\n\
             {idn}\n#OK\n",
            idn = crate::command::IDN
        );
        assert_eq!(out, expected);
        assert_eq!(summary, SessionSummary { ok: 2, failed: 2 });
    }

    #[test]
    fn test_last_line_without_newline_is_executed() {
        let (out, summary) = interactive("task_create");
        assert!(out.ends_with("#OK\n"));
        assert_eq!(summary.ok, 1);
    }

    #[test]
    fn test_session_survives_oversized_read() {
        let (out, summary) = interactive(
            "task_create\n\
             task_add_chan_aivolt 0x5ee00010 Dev1/ai0 -1 1\n\
             task_read_analog 0x5ee00010 4294967295 0\n\
             *idn?\n",
        );
        assert!(out.contains(
            "\n#Error: DAQmx: Requested value is not a supported value for this property."
        ));
        assert!(out.ends_with(&format!("{}\n#OK\n", crate::command::IDN)));
        assert_eq!(summary, SessionSummary { ok: 3, failed: 1 });
    }

    #[test]
    fn test_single_command_success_without_output() {
        let mut session = Session::new(SimulatedBackend::new());
        let mut out = Vec::new();
        let handle = session
            .dispatcher
            .dispatch(&Command::new("task_create", Vec::new()))
            .unwrap()
            .lines()[0]
            .clone();

        let command = Command::new("task_clear", vec![handle]);
        assert!(session.run_single(&command, &mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_command_failure() {
        let mut session = Session::new(SimulatedBackend::new());
        let mut out = Vec::new();
        let command = Command::new("task_start", vec!["0x1".to_string()]);
        assert!(!session.run_single(&command, &mut out).unwrap());

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("\n#Error: DAQmx: Task specified is invalid"));
        assert!(out.ends_with('\n'));
        assert_eq!(out.matches(ERROR_MARKER).count(), 1);
    }

    #[test]
    #[traced_test]
    fn test_failures_are_logged() {
        let (_, summary) = interactive("task_start 0x99\nhelp\n");
        assert_eq!(summary, SessionSummary { ok: 1, failed: 1 });
        assert!(logs_contain("Command failed"));
        assert!(logs_contain("kind=backend"));
        assert!(logs_contain("Interactive session ended"));
    }
}
