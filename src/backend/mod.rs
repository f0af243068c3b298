//! Acquisition backend capability.
//!
//! The [`DaqBackend`] trait is the only way command handlers reach hardware.
//! It mirrors the task-oriented NI-DAQmx model: a task is created, given
//! analog-input voltage channels and a finite sample clock, started, read and
//! finally cleared. The backend is the sole owner of task state; the
//! dispatch layer keeps no registry of its own.
//!
//! # Implementations
//!
//! - [`SimulatedBackend`] - in-process simulation, also used as the test double
//! - `DaqmxBackend` - NI-DAQmx driver via `nidaqmx-sys` (`hardware` feature)
//!
//! # Timeouts
//!
//! Blocking calls take a timeout in seconds. A negative timeout waits
//! forever, matching `DAQmx_Val_WaitInfinitely`.

pub mod simulated;
pub mod translate;

#[cfg(feature = "hardware")]
pub mod daqmx;

#[cfg(feature = "hardware")]
pub use daqmx::DaqmxBackend;
pub use simulated::{SimulatedBackend, SimulatedDevice, SimulationMode, Waveform};

use crate::error::BackendResult;
use crate::handle::TaskHandle;

/// Analog-input voltage channel to add to a task.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageChannel {
    /// Physical channel expression, e.g. `Dev1/ai0` or `Dev1/ai0:3`
    pub physical_channel: String,
    /// Minimum expected voltage
    pub min_volts: f64,
    /// Maximum expected voltage
    pub max_volts: f64,
}

/// Finite sample clock on the default onboard source, rising edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    /// Sample rate per channel in Hz
    pub rate_hz: f64,
    /// Number of samples to acquire per channel
    pub samples_per_channel: u64,
}

/// Samples returned by a read, one row per sample index.
///
/// Row `i` holds one value per channel, in the order the channels were
/// added to the task. Stored interleaved: value `(i, ch)` lives at
/// `data[i * channels + ch]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalogReadout {
    channels: usize,
    data: Vec<f64>,
}

impl AnalogReadout {
    /// Build a readout from an interleaved (grouped by scan) buffer.
    ///
    /// Only the first `samples_read` rows are kept; the buffer may be
    /// larger than what the backend actually filled.
    pub fn from_interleaved(channels: usize, mut data: Vec<f64>, samples_read: usize) -> Self {
        let len = samples_read.saturating_mul(channels).min(data.len());
        data.truncate(len - len % channels.max(1));
        Self { channels, data }
    }

    /// Number of channels per row.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of samples read per channel.
    pub fn samples_per_channel(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    /// Iterate over sample rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Value of sample `sample` on channel `channel`, if present.
    pub fn value(&self, sample: usize, channel: usize) -> Option<f64> {
        if channel >= self.channels {
            return None;
        }
        self.data.get(sample * self.channels + channel).copied()
    }
}

/// Upper bound on the values (samples times channels) a single read returns.
pub const MAX_READ_VALUES: u64 = 1 << 24;

/// Allocate the interleaved buffer of a read, without initializing it.
///
/// Returns `None` when `channels * samples_per_channel` exceeds
/// [`MAX_READ_VALUES`] or the allocation fails, so an oversized count from
/// a client is reported instead of aborting the process.
pub(crate) fn read_buffer(channels: usize, samples_per_channel: u32) -> Option<Vec<f64>> {
    let len = u64::try_from(channels)
        .ok()?
        .checked_mul(u64::from(samples_per_channel))?;
    if len > MAX_READ_VALUES {
        return None;
    }
    let mut data = Vec::new();
    data.try_reserve_exact(usize::try_from(len).ok()?).ok()?;
    Some(data)
}

/// Task lifecycle and acquisition capability of a DAQ driver.
///
/// Every method maps to one driver operation. Implementations report
/// failures as [`crate::error::BackendError`] values produced by
/// [`translate::check_status`].
pub trait DaqBackend {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Create a new, empty task.
    fn create_task(&mut self) -> BackendResult<TaskHandle>;

    /// Start the task.
    fn start_task(&mut self, task: TaskHandle) -> BackendResult<()>;

    /// Stop the task.
    fn stop_task(&mut self, task: TaskHandle) -> BackendResult<()>;

    /// Release the task; the handle becomes invalid.
    fn clear_task(&mut self, task: TaskHandle) -> BackendResult<()>;

    /// Whether the task has finished.
    fn is_task_done(&mut self, task: TaskHandle) -> BackendResult<bool>;

    /// Block until the task finishes or the timeout elapses.
    fn wait_until_done(&mut self, task: TaskHandle, timeout_secs: f64) -> BackendResult<()>;

    /// Number of virtual channels in the task.
    fn channel_count(&mut self, task: TaskHandle) -> BackendResult<u32>;

    /// Reset a device, aborting and invalidating the tasks that use it.
    fn reset_device(&mut self, device: &str) -> BackendResult<()>;

    /// Add analog-input voltage channels to the task.
    fn add_voltage_channel(&mut self, task: TaskHandle, channel: &VoltageChannel)
        -> BackendResult<()>;

    /// Configure a finite, rising-edge sample clock.
    fn configure_timing(&mut self, task: TaskHandle, clock: SampleClock) -> BackendResult<()>;

    /// Read up to `samples_per_channel` samples from every channel.
    fn read_analog(
        &mut self,
        task: TaskHandle,
        samples_per_channel: u32,
        timeout_secs: f64,
    ) -> BackendResult<AnalogReadout>;
}

impl<B: DaqBackend + ?Sized> DaqBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_task(&mut self) -> BackendResult<TaskHandle> {
        (**self).create_task()
    }

    fn start_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        (**self).start_task(task)
    }

    fn stop_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        (**self).stop_task(task)
    }

    fn clear_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        (**self).clear_task(task)
    }

    fn is_task_done(&mut self, task: TaskHandle) -> BackendResult<bool> {
        (**self).is_task_done(task)
    }

    fn wait_until_done(&mut self, task: TaskHandle, timeout_secs: f64) -> BackendResult<()> {
        (**self).wait_until_done(task, timeout_secs)
    }

    fn channel_count(&mut self, task: TaskHandle) -> BackendResult<u32> {
        (**self).channel_count(task)
    }

    fn reset_device(&mut self, device: &str) -> BackendResult<()> {
        (**self).reset_device(device)
    }

    fn add_voltage_channel(
        &mut self,
        task: TaskHandle,
        channel: &VoltageChannel,
    ) -> BackendResult<()> {
        (**self).add_voltage_channel(task, channel)
    }

    fn configure_timing(&mut self, task: TaskHandle, clock: SampleClock) -> BackendResult<()> {
        (**self).configure_timing(task, clock)
    }

    fn read_analog(
        &mut self,
        task: TaskHandle,
        samples_per_channel: u32,
        timeout_secs: f64,
    ) -> BackendResult<AnalogReadout> {
        (**self).read_analog(task, samples_per_channel, timeout_secs)
    }
}
