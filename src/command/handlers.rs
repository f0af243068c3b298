//! Command handlers.
//!
//! Each handler parses its arguments, makes at most one backend call and
//! formats the result. Arity has been checked by the dispatcher, so the
//! argument slice always has the declared length.

use chrono::Utc;

use super::args::{parse_float, parse_handle, parse_uint};
use super::table::help_lines;
use super::Reply;
use crate::backend::{AnalogReadout, DaqBackend, SampleClock, VoltageChannel};
use crate::error::Result;

/// Identification string returned by `*idn?`.
pub const IDN: &str = concat!("spp-nidaq ", env!("CARGO_PKG_VERSION"));

pub(super) fn help(_backend: &mut dyn DaqBackend, _args: &[String]) -> Result<Reply> {
    Ok(Reply::from_lines(help_lines()))
}

pub(super) fn get_time(_backend: &mut dyn DaqBackend, _args: &[String]) -> Result<Reply> {
    let now = Utc::now();
    Ok(Reply::line(format!(
        "{}.{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )))
}

pub(super) fn idn(_backend: &mut dyn DaqBackend, _args: &[String]) -> Result<Reply> {
    Ok(Reply::line(IDN))
}

pub(super) fn task_create(backend: &mut dyn DaqBackend, _args: &[String]) -> Result<Reply> {
    let task = backend.create_task()?;
    Ok(Reply::line(task.to_string()))
}

pub(super) fn task_start(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    backend.start_task(task)?;
    Ok(Reply::empty())
}

pub(super) fn task_stop(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    backend.stop_task(task)?;
    Ok(Reply::empty())
}

pub(super) fn task_wait(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let timeout = parse_float(&args[1])?;
    backend.wait_until_done(task, timeout)?;
    Ok(Reply::empty())
}

pub(super) fn task_nchans(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let count = backend.channel_count(task)?;
    Ok(Reply::line(count.to_string()))
}

pub(super) fn task_is_done(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let done = backend.is_task_done(task)?;
    Ok(Reply::line(if done { "1" } else { "0" }))
}

pub(super) fn task_clear(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    backend.clear_task(task)?;
    Ok(Reply::empty())
}

pub(super) fn device_reset(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    backend.reset_device(&args[0])?;
    Ok(Reply::empty())
}

pub(super) fn task_add_chan_aivolt(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let channel = VoltageChannel {
        physical_channel: args[1].clone(),
        min_volts: parse_float(&args[2])?,
        max_volts: parse_float(&args[3])?,
    };
    backend.add_voltage_channel(task, &channel)?;
    Ok(Reply::empty())
}

pub(super) fn task_set_timing(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let clock = SampleClock {
        rate_hz: parse_float(&args[1])?,
        samples_per_channel: parse_uint(&args[2])?,
    };
    backend.configure_timing(task, clock)?;
    Ok(Reply::empty())
}

pub(super) fn task_read_analog(backend: &mut dyn DaqBackend, args: &[String]) -> Result<Reply> {
    let task = parse_handle(&args[0])?;
    let count: u32 = parse_uint(&args[1])?;
    let timeout = parse_float(&args[2])?;
    let readout = backend.read_analog(task, count, timeout)?;
    Ok(Reply::from_lines(format_rows(&readout)))
}

/// One line per sample; each channel value preceded by a space.
fn format_rows(readout: &AnalogReadout) -> Vec<String> {
    readout
        .rows()
        .map(|row| row.iter().map(|value| format!(" {}", value)).collect())
        .collect()
}
