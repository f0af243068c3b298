//! Simulated NI-DAQmx backend.
//!
//! Provides an in-process model of analog-input tasks for use without
//! hardware and as the deterministic test double for the dispatch layer.
//! Failures are reported with real DAQmx status codes and diagnostic text
//! and go through the same [`translate`](super::translate) path as the
//! hardware backend.
//!
//! # Model
//!
//! - Devices expose analog-input channels named `<device>/ai<N>`. Channel
//!   expressions accept single channels, ranges (`Dev1/ai0:3`, also
//!   descending) and comma-separated lists. Device names are matched
//!   case-insensitively.
//! - Handles are pointer-like values and are never reused, so a cleared
//!   handle stays invalid for the rest of the process.
//! - A task without a sample clock is on-demand: every read returns the
//!   requested number of samples and the task never reports done while
//!   running.
//! - Reading an idle task starts it implicitly.
//!
//! # Modes
//!
//! - [`SimulationMode::Instant`]: a finite acquisition is complete the moment
//!   the task starts; nothing sleeps. Used by tests.
//! - [`SimulationMode::Realistic`]: samples accrue at the configured rate in
//!   wall-clock time; waits and reads block up to their timeout.

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::translate::{status, translate};
use super::{read_buffer, AnalogReadout, DaqBackend, SampleClock, VoltageChannel};
use crate::error::{BackendError, BackendResult};
use crate::handle::TaskHandle;

const HANDLE_BASE: u64 = 0x5ee0_0000;
const HANDLE_STRIDE: u64 = 0x10;

/// Sample rate assumed for on-demand (untimed) tasks when synthesizing signals.
const ON_DEMAND_RATE_HZ: f64 = 1000.0;

/// Operational mode of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Zero delays, deterministic - for tests
    #[default]
    Instant,
    /// Samples accrue in wall-clock time at the configured rate
    Realistic,
}

/// Signal synthesized on every simulated channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// Sine wave centred in the channel range, with a little seeded noise.
    /// Virtual channel `k` runs at `k + 1` Hz.
    #[default]
    Sine,
    /// `channel_index * 1000 + sample_index`, unclamped. Makes the position
    /// of every value in a readout visible.
    Counter,
}

/// A simulated DAQ device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDevice {
    /// Device name as used in physical channel expressions (e.g. `Dev1`)
    pub name: String,
    /// Number of analog-input channels (`ai0` .. `ai<N-1>`)
    #[serde(default = "default_ai_channels")]
    pub ai_channels: u32,
    /// Largest absolute input voltage the device accepts
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
}

fn default_ai_channels() -> u32 {
    8
}

fn default_max_voltage() -> f64 {
    10.0
}

impl SimulatedDevice {
    /// Device with default channel count and voltage limit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ai_channels: default_ai_channels(),
            max_voltage: default_max_voltage(),
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new("Dev1")
    }
}

/// One virtual channel in a task.
#[derive(Debug, Clone, PartialEq)]
struct SimChannel {
    device: usize,
    index: u32,
    min_volts: f64,
    max_volts: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TaskState {
    Idle,
    Running { started: Instant },
}

#[derive(Debug)]
struct SimTask {
    channels: Vec<SimChannel>,
    clock: Option<SampleClock>,
    state: TaskState,
    /// Samples per channel already returned since the last start
    samples_read: u64,
}

impl SimTask {
    fn new() -> Self {
        Self {
            channels: Vec::new(),
            clock: None,
            state: TaskState::Idle,
            samples_read: 0,
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.state, TaskState::Running { .. })
    }

    fn start(&mut self) {
        self.state = TaskState::Running {
            started: Instant::now(),
        };
        self.samples_read = 0;
    }

    fn elapsed_secs(&self) -> f64 {
        match self.state {
            TaskState::Running { started } => started.elapsed().as_secs_f64(),
            TaskState::Idle => 0.0,
        }
    }

    /// Samples per channel acquired so far; `None` for on-demand tasks.
    fn acquired(&self, mode: SimulationMode) -> Option<u64> {
        let clock = self.clock?;
        if !self.is_running() {
            return Some(0);
        }
        Some(match mode {
            SimulationMode::Instant => clock.samples_per_channel,
            SimulationMode::Realistic => {
                let accrued = (self.elapsed_secs() * clock.rate_hz).floor();
                (accrued as u64).min(clock.samples_per_channel)
            }
        })
    }

    /// Seconds from now until `samples` samples per channel are acquired.
    fn secs_until(&self, samples: u64) -> f64 {
        match self.clock {
            Some(clock) => (samples as f64 / clock.rate_hz - self.elapsed_secs()).max(0.0),
            None => 0.0,
        }
    }

    fn is_done(&self, mode: SimulationMode) -> bool {
        if !self.is_running() {
            return true;
        }
        match (self.clock, self.acquired(mode)) {
            (Some(clock), Some(acquired)) => acquired >= clock.samples_per_channel,
            _ => false,
        }
    }
}

/// Builder for [`SimulatedBackend`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackendBuilder {
    devices: Vec<SimulatedDevice>,
    mode: SimulationMode,
    waveform: Waveform,
    seed: Option<u64>,
}

impl SimulatedBackendBuilder {
    /// Add a device. Without any, a single default `Dev1` is simulated.
    pub fn device(mut self, device: SimulatedDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Add several devices.
    pub fn devices(mut self, devices: impl IntoIterator<Item = SimulatedDevice>) -> Self {
        self.devices.extend(devices);
        self
    }

    /// Set the simulation mode.
    pub fn mode(mut self, mode: SimulationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the synthesized waveform.
    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Seed the noise generator for reproducible output.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Build the backend.
    pub fn build(self) -> SimulatedBackend {
        let devices = if self.devices.is_empty() {
            vec![SimulatedDevice::default()]
        } else {
            self.devices
        };
        let rng = match self.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        SimulatedBackend {
            devices,
            mode: self.mode,
            waveform: self.waveform,
            tasks: BTreeMap::new(),
            next_handle: 0,
            rng,
            operations: Vec::new(),
        }
    }
}

/// In-process simulation of the NI-DAQmx task API.
#[derive(Debug)]
pub struct SimulatedBackend {
    devices: Vec<SimulatedDevice>,
    mode: SimulationMode,
    waveform: Waveform,
    tasks: BTreeMap<TaskHandle, SimTask>,
    next_handle: u64,
    rng: ChaCha8Rng,
    operations: Vec<&'static str>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Instant-mode backend with a single `Dev1` and a fixed seed.
    pub fn new() -> Self {
        Self::builder().seed(Some(0)).build()
    }

    /// Start building a backend.
    pub fn builder() -> SimulatedBackendBuilder {
        SimulatedBackendBuilder::default()
    }

    /// Names of the capability operations invoked so far, in call order.
    pub fn operations(&self) -> &[&'static str] {
        &self.operations
    }

    /// Forget the recorded operations.
    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn record(&mut self, operation: &'static str) {
        trace!(operation, "simulated backend call");
        self.operations.push(operation);
    }

    fn task(&self, handle: TaskHandle) -> BackendResult<&SimTask> {
        self.tasks.get(&handle).ok_or_else(|| invalid_task(handle))
    }

    fn task_mut(&mut self, handle: TaskHandle) -> BackendResult<&mut SimTask> {
        self.tasks.get_mut(&handle).ok_or_else(|| invalid_task(handle))
    }

    fn find_device(&self, name: &str) -> Option<usize> {
        self.devices
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a physical channel expression into `(device, index)` pairs.
    fn resolve_channels(&self, expression: &str) -> BackendResult<Vec<(usize, u32)>> {
        let mut resolved = Vec::new();

        for part in expression.split(',').map(str::trim) {
            let Some((device_name, channel)) = part.split_once('/') else {
                return fail(
                    status::INVALID_PHYSICAL_CHANNEL,
                    format!(
                        "Physical channel specified does not exist on this device.\nChannel Name: {}",
                        part
                    ),
                );
            };

            let Some(device) = self.find_device(device_name) else {
                return fail(
                    status::INVALID_DEVICE,
                    format!("Device identifier is invalid.\nDevice Specified: {}", device_name),
                );
            };

            let ai_channels = self.devices[device].ai_channels;
            let Some(range) = parse_ai_range(channel).filter(|(lo, hi)| *lo.max(hi) < ai_channels)
            else {
                return fail(
                    status::INVALID_PHYSICAL_CHANNEL,
                    format!(
                        "Physical channel specified does not exist on this device.\nChannel Name: {}\nDevice: {}",
                        part, self.devices[device].name
                    ),
                );
            };

            let (first, last) = range;
            if first <= last {
                resolved.extend((first..=last).map(|index| (device, index)));
            } else {
                resolved.extend((last..=first).rev().map(|index| (device, index)));
            }
        }

        Ok(resolved)
    }

    fn sample_value(&mut self, channel: &SimChannel, virtual_index: usize, sample: u64, rate: f64) -> f64 {
        match self.waveform {
            Waveform::Counter => virtual_index as f64 * 1000.0 + sample as f64,
            Waveform::Sine => {
                let center = (channel.min_volts + channel.max_volts) / 2.0;
                let half_span = (channel.max_volts - channel.min_volts) / 2.0;
                let t = sample as f64 / rate;
                let frequency = (virtual_index + 1) as f64;
                let noise = self.rng.gen_range(-1.0..1.0) * 1e-3 * half_span;
                let value = center + 0.8 * half_span * (TAU * frequency * t).sin() + noise;
                value.clamp(channel.min_volts, channel.max_volts)
            }
        }
    }
}

impl DaqBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn create_task(&mut self) -> BackendResult<TaskHandle> {
        self.record("create_task");
        self.next_handle += 1;
        let handle = TaskHandle::from_raw(HANDLE_BASE + self.next_handle * HANDLE_STRIDE);
        self.tasks.insert(handle, SimTask::new());
        debug!(task = %handle, "Created simulated task");
        Ok(handle)
    }

    fn start_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        self.record("start_task");
        let sim = self.task_mut(task)?;
        if sim.is_running() {
            return Ok(());
        }
        if sim.channels.is_empty() {
            return fail(status::NO_CHANNELS, no_channels_detail());
        }
        sim.start();
        debug!(task = %task, "Started simulated task");
        Ok(())
    }

    fn stop_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        self.record("stop_task");
        let sim = self.task_mut(task)?;
        sim.state = TaskState::Idle;
        Ok(())
    }

    fn clear_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        self.record("clear_task");
        self.tasks.remove(&task).ok_or_else(|| invalid_task(task))?;
        debug!(task = %task, "Cleared simulated task");
        Ok(())
    }

    fn is_task_done(&mut self, task: TaskHandle) -> BackendResult<bool> {
        self.record("is_task_done");
        let mode = self.mode;
        Ok(self.task(task)?.is_done(mode))
    }

    fn wait_until_done(&mut self, task: TaskHandle, timeout_secs: f64) -> BackendResult<()> {
        self.record("wait_until_done");
        let mode = self.mode;
        let sim = self.task(task)?;
        if sim.is_done(mode) {
            return Ok(());
        }

        let finishes_in = sim.clock.map(|clock| sim.secs_until(clock.samples_per_channel));
        match (mode, finishes_in) {
            (SimulationMode::Realistic, Some(secs)) if timeout_secs < 0.0 || secs <= timeout_secs => {
                sleep_secs(secs);
                Ok(())
            }
            (SimulationMode::Realistic, _) if timeout_secs >= 0.0 => {
                sleep_secs(timeout_secs);
                fail(status::WAIT_TIMEOUT, wait_timeout_detail())
            }
            _ => fail(status::WAIT_TIMEOUT, wait_timeout_detail()),
        }
    }

    fn channel_count(&mut self, task: TaskHandle) -> BackendResult<u32> {
        self.record("channel_count");
        let count = self.task(task)?.channels.len();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn reset_device(&mut self, device: &str) -> BackendResult<()> {
        self.record("reset_device");
        let Some(index) = self.find_device(device) else {
            return fail(
                status::INVALID_DEVICE,
                format!("Device identifier is invalid.\nDevice Specified: {}", device),
            );
        };

        let before = self.tasks.len();
        self.tasks
            .retain(|_, sim| !sim.channels.iter().any(|c| c.device == index));
        debug!(
            device = %self.devices[index].name,
            cleared_tasks = before - self.tasks.len(),
            "Reset simulated device"
        );
        Ok(())
    }

    fn add_voltage_channel(
        &mut self,
        task: TaskHandle,
        channel: &VoltageChannel,
    ) -> BackendResult<()> {
        self.record("add_voltage_channel");
        if self.task(task)?.is_running() {
            return fail(status::TASK_RUNNING, task_running_detail());
        }

        let resolved = self.resolve_channels(&channel.physical_channel)?;

        for &(device, _) in &resolved {
            let limit = self.devices[device].max_voltage;
            if channel.min_volts >= channel.max_volts
                || channel.min_volts < -limit
                || channel.max_volts > limit
            {
                return fail(
                    status::INVALID_PROPERTY_VALUE,
                    format!(
                        "Requested value is not a supported value for this property. The property value may be invalid because it conflicts with another property.\nProperty: DAQmx_AI_Max\nRequested Value: {}\nProperty: DAQmx_AI_Min\nRequested Value: {}\nYou Can Select: -{} to {}",
                        channel.max_volts, channel.min_volts, limit, limit
                    ),
                );
            }
        }

        let sim = self.task_mut(task)?;
        let mut added: Vec<(usize, u32)> = Vec::with_capacity(resolved.len());
        for &(device, index) in &resolved {
            let taken = sim
                .channels
                .iter()
                .any(|c| c.device == device && c.index == index)
                || added.contains(&(device, index));
            if taken {
                return fail(
                    status::DUPLICATE_CHANNEL,
                    format!(
                        "Specified channel cannot be added to the task, because a channel with the same name is already in the task.\nVirtual Channel Name: {}",
                        channel.physical_channel
                    ),
                );
            }
            added.push((device, index));
        }

        sim.channels.extend(added.into_iter().map(|(device, index)| SimChannel {
            device,
            index,
            min_volts: channel.min_volts,
            max_volts: channel.max_volts,
        }));
        debug!(
            task = %task,
            physical_channel = %channel.physical_channel,
            channels = sim.channels.len(),
            "Added simulated voltage channel"
        );
        Ok(())
    }

    fn configure_timing(&mut self, task: TaskHandle, clock: SampleClock) -> BackendResult<()> {
        self.record("configure_timing");
        let sim = self.task_mut(task)?;
        if sim.is_running() {
            return fail(status::TASK_RUNNING, task_running_detail());
        }
        if clock.rate_hz.is_nan() || clock.rate_hz <= 0.0 {
            return fail(
                status::INVALID_PROPERTY_VALUE,
                format!(
                    "Requested value is not a supported value for this property.\nProperty: DAQmx_SampClk_Rate\nRequested Value: {}",
                    clock.rate_hz
                ),
            );
        }
        if clock.samples_per_channel == 0 {
            return fail(
                status::INVALID_PROPERTY_VALUE,
                "Requested value is not a supported value for this property.\nProperty: DAQmx_SampQuant_SampPerChan\nRequested Value: 0",
            );
        }
        sim.clock = Some(clock);
        Ok(())
    }

    fn read_analog(
        &mut self,
        task: TaskHandle,
        samples_per_channel: u32,
        timeout_secs: f64,
    ) -> BackendResult<AnalogReadout> {
        self.record("read_analog");
        let mode = self.mode;
        let sim = self.task_mut(task)?;
        if sim.channels.is_empty() {
            return fail(status::NO_CHANNELS, no_channels_detail());
        }
        if !sim.is_running() {
            sim.start();
        }

        let count = u64::from(samples_per_channel);
        let first = sim.samples_read;
        let wanted = first + count;

        if let Some(clock) = sim.clock {
            if wanted > clock.samples_per_channel {
                return fail(
                    status::READ_PAST_END,
                    format!(
                        "Attempted to read a sample beyond the final sample acquired. The acquisition has stopped, therefore the sample specified by the combination of position and offset will never be available.\nRequested Sample: {}\nFinal Sample Acquired: {}",
                        wanted.saturating_sub(1),
                        clock.samples_per_channel.saturating_sub(1)
                    ),
                );
            }
        }

        let Some(mut data) = read_buffer(sim.channels.len(), samples_per_channel) else {
            return fail(
                status::INVALID_PROPERTY_VALUE,
                format!(
                    "Requested value is not a supported value for this property.\nProperty: DAQmx_Read_NumSampsPerChan\nRequested Value: {}",
                    samples_per_channel
                ),
            );
        };

        if let Some(clock) = sim.clock {
            let acquired = sim.acquired(mode).unwrap_or(wanted);
            if acquired < wanted {
                let secs = sim.secs_until(wanted);
                if timeout_secs < 0.0 || secs <= timeout_secs {
                    sleep_secs(secs);
                } else {
                    sleep_secs(timeout_secs);
                    return fail(
                        status::SAMPLES_NOT_AVAILABLE,
                        "Some or all of the samples requested have not yet been acquired.\nTo wait for the samples to become available use a longer read timeout or read later in your program.",
                    );
                }
            }
        }

        let rate = sim.clock.map_or(ON_DEMAND_RATE_HZ, |c| c.rate_hz);
        let channels = sim.channels.clone();
        sim.samples_read = wanted;

        for sample in first..wanted {
            for (virtual_index, channel) in channels.iter().enumerate() {
                data.push(self.sample_value(channel, virtual_index, sample, rate));
            }
        }

        trace!(task = %task, samples = count, channels = channels.len(), "Simulated read");
        Ok(AnalogReadout::from_interleaved(
            channels.len(),
            data,
            samples_per_channel as usize,
        ))
    }
}

/// Parse `ai<N>` or `ai<N>:<M>` into an inclusive index pair.
fn parse_ai_range(channel: &str) -> Option<(u32, u32)> {
    let range = channel.strip_prefix("ai")?;
    let (first, last) = match range.split_once(':') {
        Some((first, last)) => (first, last),
        None => (range, range),
    };
    let parse = |s: &str| {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            None
        } else {
            s.parse::<u32>().ok()
        }
    };
    Some((parse(first)?, parse(last)?))
}

fn sleep_secs(secs: f64) {
    if let Ok(duration) = Duration::try_from_secs_f64(secs) {
        thread::sleep(duration);
    }
}

fn fail<T>(code: i32, detail: impl Into<String>) -> BackendResult<T> {
    Err(status_error(code, detail.into()))
}

fn status_error(code: i32, detail: String) -> BackendError {
    let diagnostics = format!("{}\nStatus Code: {}", detail, code);
    translate(code, &diagnostics).unwrap_or(BackendError {
        code,
        message: detail,
    })
}

fn invalid_task(handle: TaskHandle) -> BackendError {
    status_error(
        status::INVALID_TASK,
        format!("Task specified is invalid or does not exist.\nTask Handle: {}", handle),
    )
}

fn no_channels_detail() -> &'static str {
    "Specified operation cannot be performed when there are no channels in the task."
}

fn task_running_detail() -> &'static str {
    "Specified operation cannot be performed while the task is running."
}

fn wait_timeout_detail() -> &'static str {
    "Wait Until Done did not indicate that the task was done within the specified timeout.\nIncrease the timeout, check the program, and make sure connections for external timing and triggering are in place."
}
