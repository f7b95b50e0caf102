//! Input/output device enumeration and selection
//!
//! Thin layer over cpal: list device names, resolve a user-supplied name
//! fragment to a device, and cycle through inputs at runtime. Enumeration
//! goes through an RAII stderr guard because ALSA prints configuration
//! chatter directly to fd 2, which would corrupt the raw-mode terminal.

use std::fs::File;
use std::os::unix::io::AsRawFd;

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use log::warn;

/// RAII guard redirecting stderr to /dev/null, restored on drop.
struct StderrSuppressor {
    saved_fd: i32,
    dev_null: File,
}

impl StderrSuppressor {
    fn new() -> Option<Self> {
        let dev_null = File::open("/dev/null").ok()?;

        let saved_fd = unsafe { libc::dup(2) };
        if saved_fd < 0 {
            return None;
        }

        if unsafe { libc::dup2(dev_null.as_raw_fd(), 2) } < 0 {
            unsafe {
                libc::close(saved_fd);
            }
            return None;
        }

        Some(Self { saved_fd, dev_null })
    }
}

impl Drop for StderrSuppressor {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved_fd, 2);
            libc::close(self.saved_fd);
        }
        let _ = &self.dev_null;
    }
}

/// Names of all capture devices, default host order.
pub fn input_device_names(host: &cpal::Host) -> Vec<String> {
    let _quiet = StderrSuppressor::new();
    host.input_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Names of all playback devices, default host order.
pub fn output_device_names(host: &cpal::Host) -> Vec<String> {
    let _quiet = StderrSuppressor::new();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Case-insensitive substring match on a device name.
fn name_matches(name: &str, wanted: &str) -> bool {
    name.to_lowercase().contains(&wanted.to_lowercase())
}

/// Resolve a capture device. `wanted` is matched as a substring; no match
/// (or no request) falls back to the system default.
pub fn input_device(host: &cpal::Host, wanted: Option<&str>) -> Result<Device> {
    let _quiet = StderrSuppressor::new();

    if let Some(wanted) = wanted {
        let found = host
            .input_devices()
            .ok()
            .and_then(|mut devices| {
                devices.find(|d| d.name().map(|n| name_matches(&n, wanted)).unwrap_or(false))
            });
        match found {
            Some(device) => return Ok(device),
            None => warn!("no input device matching '{wanted}', using default"),
        }
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no audio input device found"))
}

/// Resolve a playback device, same matching rules as [`input_device`].
pub fn output_device(host: &cpal::Host, wanted: Option<&str>) -> Result<Device> {
    let _quiet = StderrSuppressor::new();

    if let Some(wanted) = wanted {
        let found = host
            .output_devices()
            .ok()
            .and_then(|mut devices| {
                devices.find(|d| d.name().map(|n| name_matches(&n, wanted)).unwrap_or(false))
            });
        match found {
            Some(device) => return Ok(device),
            None => warn!("no output device matching '{wanted}', using default"),
        }
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("no audio output device found"))
}

/// The capture device `steps` positions after `current` in enumeration
/// order, wrapping around. Returns `None` when fewer than two devices
/// exist.
pub fn cycle_input(host: &cpal::Host, current: &str, steps: isize) -> Option<Device> {
    let _quiet = StderrSuppressor::new();
    let devices: Vec<Device> = host.input_devices().ok()?.collect();
    if devices.len() < 2 {
        return None;
    }

    let position = devices
        .iter()
        .position(|d| d.name().map(|n| n == current).unwrap_or(false))
        .unwrap_or(0);
    let len = devices.len() as isize;
    let next = (position as isize + steps).rem_euclid(len) as usize;
    devices.into_iter().nth(next)
}
