//! # spp-nidaq
//!
//! Line-protocol front end for NI-DAQmx analog-input tasks.
//!
//! Commands arrive either as a single process invocation or as lines of an
//! interactive SPP session (`#SPP001`). Each command is validated against a
//! static table, translated into one call on a [`DaqBackend`], and answered
//! with its output lines followed by `#OK` or `#Error: <message>`.
//!
//! ## Crate Structure
//!
//! - **`backend`**: the [`DaqBackend`] capability trait, the simulated
//!   backend (also the test double), the DAQmx driver backend (`hardware`
//!   feature) and the status code translator.
//! - **`command`**: command table, handlers, argument parsers and the line
//!   tokenizer.
//! - **`dispatch`**: name lookup, arity validation and handler invocation.
//! - **`session`**: single-command and interactive protocol framing.
//! - **`handle`**: text encoding of opaque task handles.
//! - **`error`**: command and backend error types.
//! - **`config`** / **`logging`**: Figment configuration and tracing setup.

pub mod backend;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod logging;
pub mod session;

pub use backend::{AnalogReadout, DaqBackend, SampleClock, SimulatedBackend, VoltageChannel};
pub use command::{Command, Reply};
pub use config::SppConfig;
pub use dispatch::Dispatcher;
pub use error::{BackendError, CommandError, CommandErrorKind};
pub use handle::TaskHandle;
pub use session::{Session, SessionSummary};
