//! NI-DAQmx driver backend.
//!
//! Thin safe wrapper over [`nidaqmx_sys`]. Each capability call forwards to
//! the matching `DAQmx*` function and routes the returned status through
//! [`check_status`], fetching the driver's extended error information only
//! when the call failed.
//!
//! Native task handles are pointers; they travel through the protocol as
//! their integer value and are converted back on every call. The driver
//! validates them, so a stale or made-up handle yields a DAQmx error rather
//! than undefined behaviour on our side.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use tracing::debug;

use super::translate::{check_status, status, translate};
use super::{read_buffer, AnalogReadout, DaqBackend, SampleClock, VoltageChannel};
use crate::error::{BackendError, BackendResult};
use crate::handle::TaskHandle;

/// Size of the buffer handed to `DAQmxGetExtendedErrorInfo`.
const ERROR_BUFFER_LEN: usize = 2048;

/// Backend driving real hardware through the NI-DAQmx C library.
#[derive(Debug, Default)]
pub struct DaqmxBackend {
    _private: (),
}

impl DaqmxBackend {
    /// Create the backend. The driver itself needs no initialization.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fetch the driver's description of the most recent failure.
fn extended_error_info() -> String {
    let mut buf = [0 as c_char; ERROR_BUFFER_LEN];
    // SAFETY: buf is writable for ERROR_BUFFER_LEN bytes and the driver
    // NUL-terminates within the given size
    let status = unsafe {
        nidaqmx_sys::DAQmxGetExtendedErrorInfo(buf.as_mut_ptr(), ERROR_BUFFER_LEN as u32)
    };
    if nidaqmx_sys::DAQmxFailed(status) {
        return String::new();
    }
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn check(status: i32) -> BackendResult<()> {
    check_status(status, extended_error_info)
}

fn native(task: TaskHandle) -> nidaqmx_sys::TaskHandle {
    task.raw() as usize as nidaqmx_sys::TaskHandle
}

fn invalid_value(what: &str, value: impl std::fmt::Display) -> BackendError {
    let diagnostics = format!(
        "Requested value is not a supported value for this property.\nProperty: {}\nRequested Value: {}",
        what, value
    );
    translate(status::INVALID_PROPERTY_VALUE, &diagnostics).unwrap_or(BackendError {
        code: status::INVALID_PROPERTY_VALUE,
        message: diagnostics,
    })
}

fn c_string(what: &str, text: &str) -> BackendResult<CString> {
    CString::new(text).map_err(|_| invalid_value(what, text.escape_debug()))
}

impl DaqBackend for DaqmxBackend {
    fn name(&self) -> &'static str {
        "daqmx"
    }

    fn create_task(&mut self) -> BackendResult<TaskHandle> {
        let mut task: nidaqmx_sys::TaskHandle = ptr::null_mut();
        // SAFETY: empty name is a valid C string; task is a valid out pointer
        check(unsafe { nidaqmx_sys::DAQmxCreateTask(c"".as_ptr(), &mut task) })?;
        let handle = TaskHandle::from_raw(task as usize as u64);
        debug!(task = %handle, "Created DAQmx task");
        Ok(handle)
    }

    fn start_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        // SAFETY: the driver validates the handle
        check(unsafe { nidaqmx_sys::DAQmxStartTask(native(task)) })
    }

    fn stop_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        // SAFETY: the driver validates the handle
        check(unsafe { nidaqmx_sys::DAQmxStopTask(native(task)) })
    }

    fn clear_task(&mut self, task: TaskHandle) -> BackendResult<()> {
        // SAFETY: the driver validates the handle
        check(unsafe { nidaqmx_sys::DAQmxClearTask(native(task)) })?;
        debug!(task = %task, "Cleared DAQmx task");
        Ok(())
    }

    fn is_task_done(&mut self, task: TaskHandle) -> BackendResult<bool> {
        let mut done: nidaqmx_sys::bool32 = 0;
        // SAFETY: done is a valid out pointer
        check(unsafe { nidaqmx_sys::DAQmxIsTaskDone(native(task), &mut done) })?;
        Ok(done != 0)
    }

    fn wait_until_done(&mut self, task: TaskHandle, timeout_secs: f64) -> BackendResult<()> {
        let timeout = if timeout_secs < 0.0 {
            nidaqmx_sys::DAQmx_Val_WaitInfinitely
        } else {
            timeout_secs
        };
        // SAFETY: the driver validates the handle
        check(unsafe { nidaqmx_sys::DAQmxWaitUntilTaskDone(native(task), timeout) })
    }

    fn channel_count(&mut self, task: TaskHandle) -> BackendResult<u32> {
        let mut count: nidaqmx_sys::uInt32 = 0;
        // SAFETY: count is a valid out pointer
        check(unsafe { nidaqmx_sys::DAQmxGetTaskNumChans(native(task), &mut count) })?;
        Ok(count)
    }

    fn reset_device(&mut self, device: &str) -> BackendResult<()> {
        let name = c_string("DeviceName", device)?;
        // SAFETY: name is a valid NUL-terminated string for the duration of the call
        check(unsafe { nidaqmx_sys::DAQmxResetDevice(name.as_ptr()) })?;
        debug!(device, "Reset DAQmx device");
        Ok(())
    }

    fn add_voltage_channel(
        &mut self,
        task: TaskHandle,
        channel: &VoltageChannel,
    ) -> BackendResult<()> {
        let physical = c_string("PhysicalChannel", &channel.physical_channel)?;
        // SAFETY: strings are valid for the duration of the call; null custom
        // scale name selects no scale
        check(unsafe {
            nidaqmx_sys::DAQmxCreateAIVoltageChan(
                native(task),
                physical.as_ptr(),
                c"".as_ptr(),
                nidaqmx_sys::DAQmx_Val_Cfg_Default,
                channel.min_volts,
                channel.max_volts,
                nidaqmx_sys::DAQmx_Val_Volts,
                ptr::null(),
            )
        })
    }

    fn configure_timing(&mut self, task: TaskHandle, clock: SampleClock) -> BackendResult<()> {
        // SAFETY: empty source selects the onboard clock
        check(unsafe {
            nidaqmx_sys::DAQmxCfgSampClkTiming(
                native(task),
                c"".as_ptr(),
                clock.rate_hz,
                nidaqmx_sys::DAQmx_Val_Rising,
                nidaqmx_sys::DAQmx_Val_FiniteSamps,
                clock.samples_per_channel,
            )
        })
    }

    fn read_analog(
        &mut self,
        task: TaskHandle,
        samples_per_channel: u32,
        timeout_secs: f64,
    ) -> BackendResult<AnalogReadout> {
        let count = i32::try_from(samples_per_channel)
            .map_err(|_| invalid_value("DAQmx_Read_NumSampsPerChan", samples_per_channel))?;
        let channels = self.channel_count(task)?;

        let mut data = read_buffer(channels as usize, samples_per_channel)
            .ok_or_else(|| invalid_value("DAQmx_Read_NumSampsPerChan", samples_per_channel))?;
        data.resize(channels as usize * samples_per_channel as usize, 0.0);
        let len = u32::try_from(data.len())
            .map_err(|_| invalid_value("DAQmx_Read_NumSampsPerChan", samples_per_channel))?;
        let mut read: nidaqmx_sys::int32 = 0;
        let timeout = if timeout_secs < 0.0 {
            nidaqmx_sys::DAQmx_Val_WaitInfinitely
        } else {
            timeout_secs
        };

        // SAFETY: data holds exactly len values and len is passed as the
        // array size; read is a valid out pointer
        check(unsafe {
            nidaqmx_sys::DAQmxReadAnalogF64(
                native(task),
                count,
                timeout,
                nidaqmx_sys::DAQmx_Val_GroupByScanNumber,
                data.as_mut_ptr(),
                len,
                &mut read,
                ptr::null_mut(),
            )
        })?;

        Ok(AnalogReadout::from_interleaved(
            channels as usize,
            data,
            usize::try_from(read).unwrap_or(0),
        ))
    }
}
