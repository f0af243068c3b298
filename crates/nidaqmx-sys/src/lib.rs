//! Low-level FFI bindings for the NI-DAQmx C library.
//!
//! Only the entry points needed for finite analog-input tasks are declared:
//! task lifecycle, voltage channel creation, sample clock timing, analog
//! reads and extended error information.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use the `daqmx` backend of the `spp_nidaq` crate.
//!
//! # Features
//!
//! - `nidaqmx-sdk`: link against the installed NI-DAQmx runtime. Without
//!   this feature nothing is linked and calling any function fails at link
//!   time of the final binary.
//!
//! # Example (unsafe)
//!
//! ```ignore
//! use nidaqmx_sys::*;
//! use std::ptr;
//!
//! unsafe {
//!     let mut task: TaskHandle = ptr::null_mut();
//!     let status = DAQmxCreateTask(c"".as_ptr(), &mut task);
//!     if DAQmxFailed(status) {
//!         let mut buf = [0 as std::os::raw::c_char; 2048];
//!         DAQmxGetExtendedErrorInfo(buf.as_mut_ptr(), buf.len() as uInt32);
//!     } else {
//!         DAQmxClearTask(task);
//!     }
//! }
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(missing_docs)]
#![allow(clippy::all)]

use std::os::raw::{c_char, c_void};

pub type int32 = i32;
pub type uInt32 = u32;
pub type uInt64 = u64;
pub type float64 = f64;
pub type bool32 = u32;

/// Opaque task handle as handed out by the driver.
pub type TaskHandle = *mut c_void;

// Terminal configuration
pub const DAQmx_Val_Cfg_Default: int32 = -1;

// Units
pub const DAQmx_Val_Volts: int32 = 10348;

// Active edge
pub const DAQmx_Val_Rising: int32 = 10280;
pub const DAQmx_Val_Falling: int32 = 10171;

// Sample mode
pub const DAQmx_Val_FiniteSamps: int32 = 10178;
pub const DAQmx_Val_ContSamps: int32 = 10123;

// Fill mode for reads
pub const DAQmx_Val_GroupByChannel: bool32 = 0;
pub const DAQmx_Val_GroupByScanNumber: bool32 = 1;

// Timeouts
pub const DAQmx_Val_WaitInfinitely: float64 = -1.0;

/// Mirrors the `DAQmxFailed` macro from `NIDAQmx.h`.
#[inline]
pub fn DAQmxFailed(status: int32) -> bool {
    status < 0
}

extern "C" {
    pub fn DAQmxCreateTask(taskName: *const c_char, taskHandle: *mut TaskHandle) -> int32;
    pub fn DAQmxStartTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxStopTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxClearTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxIsTaskDone(taskHandle: TaskHandle, isTaskDone: *mut bool32) -> int32;
    pub fn DAQmxWaitUntilTaskDone(taskHandle: TaskHandle, timeToWait: float64) -> int32;
    pub fn DAQmxGetTaskNumChans(taskHandle: TaskHandle, data: *mut uInt32) -> int32;

    pub fn DAQmxResetDevice(deviceName: *const c_char) -> int32;

    pub fn DAQmxCreateAIVoltageChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        terminalConfig: int32,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;

    pub fn DAQmxCfgSampClkTiming(
        taskHandle: TaskHandle,
        source: *const c_char,
        rate: float64,
        activeEdge: int32,
        sampleMode: int32,
        sampsPerChan: uInt64,
    ) -> int32;

    pub fn DAQmxReadAnalogF64(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxGetExtendedErrorInfo(errorString: *mut c_char, bufferSize: uInt32) -> int32;
}
