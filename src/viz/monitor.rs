//! Live monitor screen
//!
//! Owns the capture session, the frame driver with its three sinks, and the
//! recording/playback/loopback controls. One cooperative loop per frame:
//! keys, sink ticks, chrome, present. Switching input devices tears the
//! whole pipeline down and rebuilds it, which is the only time sink
//! smoother state resets.
//!
//! # Keybindings
//! - r: start/stop recording, p: play/stop the last clip
//! - m: loopback monitor on/off, i: mirror overlay on/off
//! - [/]: previous/next input device
//! - Space: pause, q/Esc: quit

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::KeyCode;
use crossterm::style::Color;
use log::{error, info};

use crate::audio::device;
use crate::audio::{CaptureSession, LoopbackMonitor, Player, WavRecorder};
use crate::config::MonitorConfig;
use crate::settings::Settings;
use crate::terminal::Terminal;

use super::bars::BarsSink;
use super::driver::{FrameDriver, SinkHandle};
use super::mirror::MirrorSink;
use super::panel::PanelSink;
use super::{Layout, Placement};

/// Rows above the sink regions: title and status
const HEADER_ROWS: u16 = 2;
/// Rows below the sink regions: key help
const FOOTER_ROWS: u16 = 1;
/// Frame time floor, caps the loop near 60 fps
const MIN_FRAME_TIME: f32 = 0.016;
/// Poll cadence while paused or showing an error
const IDLE_POLL_INTERVAL: f32 = 0.1;

const HELP: &str = " q quit · space pause · r record · p play · m monitor · i mirror · [/] device";

/// A clip available for playback
struct Clip {
    path: PathBuf,
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Run the live monitor until the user quits.
pub fn run(term: &mut Terminal, config: &MonitorConfig, settings: &Settings) -> Result<()> {
    let host = cpal::default_host();

    let input = match device::input_device(&host, config.input.as_deref()) {
        Ok(device) => device,
        Err(err) => return error_screen(term, &err.to_string()),
    };
    let mut session = match CaptureSession::open(&input) {
        Ok(session) => session,
        Err(err) => return error_screen(term, &format!("{err:#}")),
    };

    let recordings_dir = settings
        .recording
        .directory
        .clone()
        .unwrap_or_else(WavRecorder::default_dir);

    let mut driver = FrameDriver::new();
    let mut mirror_handle = spawn_sinks(&mut driver, &session, settings, config.mirror);

    let mut paused = false;
    let mut player = Player::new();
    let mut loopback = LoopbackMonitor::new();
    let mut last_clip: Option<Clip> = None;
    let mut status_note: Option<String> = None;

    let (init_w, init_h) = term.size();
    let mut prev_w = init_w;
    let mut prev_h = init_h;

    loop {
        let (width, height) = crossterm::terminal::size().unwrap_or(term.size());
        if width != prev_w || height != prev_h {
            term.resize(width, height);
            term.clear_screen()?;
            prev_w = width;
            prev_h = height;
        }

        if let Some((code, _mods)) = term.check_key()? {
            match code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char(' ') => paused = !paused,
                KeyCode::Char('r') => {
                    if session.shared().is_recording() {
                        let samples = session.shared().stop_recording();
                        let recorder =
                            WavRecorder::new(session.sample_rate(), recordings_dir.clone());
                        match recorder.save(&samples) {
                            Ok(path) => {
                                status_note = Some(format!("saved {}", path.display()));
                                last_clip = Some(Clip {
                                    path,
                                    samples,
                                    sample_rate: session.sample_rate(),
                                });
                            }
                            Err(err) => {
                                error!("recording save failed: {err:#}");
                                status_note = Some(format!("save failed: {err}"));
                            }
                        }
                    } else {
                        session.shared().start_recording();
                        status_note = None;
                    }
                }
                KeyCode::Char('p') => {
                    if player.is_playing() {
                        player.stop();
                    } else if let Some(clip) = &last_clip {
                        let started = device::output_device(&host, config.output.as_deref())
                            .and_then(|out| {
                                player.play(&out, clip.samples.clone(), clip.sample_rate)
                            });
                        match started {
                            Ok(()) => {
                                info!("playing {}", clip.path.display());
                                status_note = None;
                            }
                            Err(err) => status_note = Some(format!("playback failed: {err}")),
                        }
                    } else {
                        status_note = Some("no recording yet".to_string());
                    }
                }
                KeyCode::Char('m') => {
                    if loopback.is_active() {
                        loopback.stop();
                        session.shared().set_loopback(false);
                    } else {
                        let started = device::output_device(&host, config.output.as_deref())
                            .and_then(|out| {
                                session.shared().set_loopback(true);
                                loopback.start(&out, session.shared().clone())
                            });
                        if let Err(err) = started {
                            session.shared().set_loopback(false);
                            status_note = Some(format!("loopback failed: {err}"));
                        }
                    }
                }
                KeyCode::Char('i') => match mirror_handle.take() {
                    Some(handle) => handle.cancel(),
                    None => mirror_handle = Some(spawn_mirror(&mut driver, &session, settings)),
                },
                KeyCode::Char(c @ ('[' | ']')) => {
                    let steps = if c == '[' { -1 } else { 1 };
                    let current = session.device_name().to_string();
                    match device::cycle_input(&host, &current, steps) {
                        Some(next) => {
                            let mirror_was_on = mirror_handle.is_some();
                            // Sinks must stop before the session they sample
                            driver.cancel_all();
                            mirror_handle = None;
                            loopback.stop();
                            session.shared().set_loopback(false);
                            if session.shared().is_recording() {
                                let _ = session.shared().stop_recording();
                                status_note =
                                    Some("recording discarded on device switch".to_string());
                            }

                            match CaptureSession::open(&next) {
                                Ok(new_session) => {
                                    session = new_session;
                                    mirror_handle = spawn_sinks(
                                        &mut driver,
                                        &session,
                                        settings,
                                        mirror_was_on,
                                    );
                                }
                                Err(err) => {
                                    return error_screen(term, &format!("{err:#}"));
                                }
                            }
                        }
                        None => status_note = Some("no other input device".to_string()),
                    }
                }
                _ => {}
            }
        }

        if paused {
            term.sleep(IDLE_POLL_INTERVAL);
            continue;
        }

        // Release the output stream once a clip has drained
        if !player.is_playing() {
            player.stop();
        }

        term.clear();
        let layout = Layout::compute(width, height, HEADER_ROWS, FOOTER_ROWS);
        driver.run_frame(session.sampler(), term, &layout);
        draw_chrome(
            term,
            &session,
            &player,
            loopback.is_active(),
            status_note.as_deref(),
            height,
        );
        term.present()?;
        term.sleep(config.frame_step.max(MIN_FRAME_TIME));
    }

    // Teardown order matters: no sink may tick against a dropped session
    driver.cancel_all();
    loopback.stop();
    session.shared().set_loopback(false);
    player.stop();
    Ok(())
}

/// Register the always-on sinks, plus the mirror when requested.
fn spawn_sinks(
    driver: &mut FrameDriver,
    session: &CaptureSession,
    settings: &Settings,
    mirror: bool,
) -> Option<SinkHandle> {
    let bins = session.sampler().bin_count();
    driver.spawn(
        Box::new(BarsSink::new(bins, &settings.smoothing)),
        Placement::Bars,
    );
    driver.spawn(
        Box::new(PanelSink::new(
            bins,
            &settings.smoothing,
            settings.thresholds,
        )),
        Placement::Panel,
    );
    mirror.then(|| spawn_mirror(driver, session, settings))
}

fn spawn_mirror(
    driver: &mut FrameDriver,
    session: &CaptureSession,
    settings: &Settings,
) -> SinkHandle {
    driver.spawn(
        Box::new(MirrorSink::new(
            session.sampler().bin_count(),
            &settings.smoothing,
        )),
        Placement::Overlay,
    )
}

/// Header, status line and footer around the sink regions.
fn draw_chrome(
    term: &mut Terminal,
    session: &CaptureSession,
    player: &Player,
    loopback_active: bool,
    status_note: Option<&str>,
    height: u16,
) {
    let title = format!(
        " micmon · {} · {} Hz · {} bins",
        session.device_name(),
        session.sample_rate(),
        session.sampler().bin_count()
    );
    term.set_str(0, 0, &title, Some(Color::Cyan), true);

    let mut x = 1i32;
    if session.shared().is_recording() {
        let secs =
            WavRecorder::duration_seconds(session.shared().recorded_len(), session.sample_rate());
        let segment = format!("● REC {secs:5.1}s ");
        term.set_str(x, 1, &segment, Some(Color::Red), true);
        x += segment.chars().count() as i32;
    }
    if player.is_playing() {
        let segment = format!("▶ playing {:3.0}% ", player.progress() * 100.0);
        term.set_str(x, 1, &segment, Some(Color::Green), false);
        x += segment.chars().count() as i32;
    }
    if loopback_active {
        term.set_str(x, 1, "monitor on ", Some(Color::Yellow), false);
        x += 11;
    }
    if let Some(note) = status_note {
        term.set_str(x, 1, note, Some(Color::DarkGrey), false);
    }

    if height > 0 {
        term.set_str(0, height as i32 - 1, HELP, Some(Color::DarkGrey), false);
    }
}

/// Show one human-readable error and wait for the user to quit.
fn error_screen(term: &mut Terminal, message: &str) -> Result<()> {
    error!("{message}");
    term.clear();
    let (width, height) = term.size();
    let lines = [message, "", "press q to quit"];
    let start_y = height as i32 / 2 - lines.len() as i32 / 2;

    for (i, line) in lines.iter().enumerate() {
        let x = (width as i32 - line.chars().count() as i32) / 2;
        term.set_str(x.max(0), start_y + i as i32, line, None, false);
    }
    term.present()?;

    loop {
        if let Some((code, _)) = term.check_key()? {
            if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(());
            }
        }
        term.sleep(IDLE_POLL_INTERVAL);
    }
}
