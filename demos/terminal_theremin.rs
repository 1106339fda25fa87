//! Mouse-played theremin in the terminal.
//!
//! Hold the left button and drag: up/down is pitch, left/right is volume.
//! 1-4 pick the waveform (sine, square, sawtooth, triangle).
//! D, T and R toggle distortion, tremolo and reverb.
//! S saves the current settings as a preset, L loads the default preset.
//! W starts and stops recording. Q or ESC quits.
//!
//! Run with `cargo run --example terminal_theremin --features playback,wav`.

mod common;

use anyhow::Result;
use common::{InputAction, is_quit_key, run_terminal_instrument};
use crossterm::{
    ExecutableCommand,
    event::{Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind},
    terminal::{Clear, ClearType},
};
use std::io::{Write, stdout};
use std::sync::{Arc, Mutex};
use theremin::{
    ControlBinding, Playback, Surface, ThereminEngine, ToneShape, presets::FileStorage,
};

/// Rows at the top of the screen used for status text.
const STATUS_ROWS: u16 = 4;
const PRESET_NAME: &str = "terminal";

#[derive(Default)]
struct Readout {
    frequency: f64,
    volume: f64,
    warning: Option<String>,
}

/// Copies engine notifications into a shared readout for the UI thread.
struct ReadoutBinding(Arc<Mutex<Readout>>);

impl ControlBinding for ReadoutBinding {
    fn show_frequency(&mut self, hz: f64) {
        if let Ok(mut readout) = self.0.lock() {
            readout.frequency = hz;
        }
    }

    fn show_volume(&mut self, volume: f64) {
        if let Ok(mut readout) = self.0.lock() {
            readout.volume = volume;
        }
    }

    fn show_warning(&mut self, message: &str) {
        if let Ok(mut readout) = self.0.lock() {
            readout.warning = Some(message.to_string());
        }
    }
}

fn playing_surface() -> Result<Surface> {
    let (columns, rows) = crossterm::terminal::size()?;
    Ok(Surface::new(
        columns as f64,
        rows.saturating_sub(STATUS_ROWS) as f64,
    ))
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on " } else { "off" }
}

fn draw_ui(engine: &Arc<Mutex<ThereminEngine>>, readout: &Arc<Mutex<Readout>>) -> Result<()> {
    let engine = engine.lock().unwrap();
    let readout = readout.lock().unwrap();
    let settings = engine.settings();

    let mut stdout = stdout();
    stdout.execute(Clear(ClearType::All))?;
    stdout.execute(crossterm::cursor::MoveTo(0, 0))?;
    write!(
        stdout,
        "{:>7.1} Hz  vol {:.2}  {:<8}  {}",
        readout.frequency,
        readout.volume,
        settings.tone_shape.name(),
        if engine.is_recording() { "REC" } else { "" }
    )?;
    stdout.execute(crossterm::cursor::MoveTo(0, 1))?;
    write!(
        stdout,
        "[D]istortion {}  [T]remolo {}  [R]everb {}  preset: {}",
        on_off(settings.distortion_enabled),
        on_off(settings.tremolo_enabled),
        on_off(settings.reverb_enabled),
        engine.current_preset()
    )?;
    stdout.execute(crossterm::cursor::MoveTo(0, 2))?;
    write!(
        stdout,
        "1-4 waveform  S save  L load default  W record  Q quit  {}",
        readout.warning.as_deref().unwrap_or("")
    )?;
    stdout.flush()?;
    Ok(())
}

fn toggle_recording(engine: &mut ThereminEngine) {
    if engine.is_recording() {
        if let Some(recording) = engine.stop_recording() {
            let path = std::env::temp_dir().join("theremin-recording.wav");
            if let Err(e) = recording.write_wav(&path) {
                log::warn!("{}", e);
            }
        }
    } else {
        engine.start_recording();
    }
}

fn handle_key(engine: &mut ThereminEngine, code: KeyCode) {
    match code {
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            engine.set_tone_shape(ToneShape::ALL[index]);
        }
        KeyCode::Char('d') => {
            let enabled = !engine.settings().distortion_enabled;
            engine.set_distortion_enabled(enabled);
        }
        KeyCode::Char('t') => {
            let enabled = !engine.settings().tremolo_enabled;
            engine.set_tremolo_enabled(enabled);
        }
        KeyCode::Char('r') => {
            let enabled = !engine.settings().reverb_enabled;
            engine.set_reverb_enabled(enabled);
        }
        KeyCode::Char('s') => {
            let _ = engine.save_preset(PRESET_NAME);
        }
        KeyCode::Char('l') => {
            let _ = engine.load_preset(theremin::presets::DEFAULT_PRESET);
        }
        KeyCode::Char('w') => toggle_recording(engine),
        _ => {}
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let readout = Arc::new(Mutex::new(Readout::default()));
    let mut engine = ThereminEngine::new(Playback::default_device_config()?)?
        .with_binding(ReadoutBinding(readout.clone()))
        .with_storage(FileStorage::in_temp_dir());
    engine.set_surface(playing_surface()?);

    let ui_readout = readout.clone();
    run_terminal_instrument(
        engine,
        |engine, event| {
            let mut engine = engine.lock().unwrap();
            match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if is_quit_key(key.code) {
                        return Ok(InputAction::Exit);
                    }
                    handle_key(&mut engine, key.code);
                }
                Event::Mouse(mouse) => {
                    let x = mouse.column as f64;
                    let y = mouse.row.saturating_sub(STATUS_ROWS) as f64;
                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => engine.pointer_down(x, y),
                        MouseEventKind::Drag(MouseButton::Left) => {
                            engine.pointer_move(x, y);
                        }
                        MouseEventKind::Up(MouseButton::Left) => {
                            engine.pointer_up();
                        }
                        _ => {}
                    }
                }
                Event::Resize(columns, rows) => engine.set_surface(Surface::new(
                    *columns as f64,
                    rows.saturating_sub(STATUS_ROWS) as f64,
                )),
                Event::FocusLost => {
                    engine.pointer_leave();
                }
                _ => {}
            }
            Ok(InputAction::Continue)
        },
        move |engine| draw_ui(engine, &ui_readout),
    )?;

    println!("\nGoodbye!");
    Ok(())
}
