//! Terminal plumbing shared by the demos.

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use std::io::stdout;
use std::panic;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use theremin::{Playback, ThereminEngine};

/// What the event loop should do after an event.
pub enum InputAction {
    Continue,
    Exit,
}

/// Runs an engine on the default output device with a mouse-driven terminal UI.
///
/// Handles audio stream setup, raw mode, the alternate screen, mouse capture
/// and restoring the terminal on panic. `handler` sees every terminal event;
/// `redraw` runs after each one and on every idle tick.
pub fn run_terminal_instrument<H, R>(
    engine: ThereminEngine,
    mut handler: H,
    redraw: R,
) -> Result<()>
where
    H: FnMut(&Arc<Mutex<ThereminEngine>>, &Event) -> Result<InputAction>,
    R: Fn(&Arc<Mutex<ThereminEngine>>) -> Result<()>,
{
    let engine = Arc::new(Mutex::new(engine));
    let playback = Playback::start(engine.clone())?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    stdout().execute(crossterm::cursor::Hide)?;

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        cleanup_terminal();
        original_hook(panic_info);
    }));

    redraw(&engine)?;
    loop {
        if event::poll(Duration::from_millis(50))? {
            let event = event::read()?;
            match handler(&engine, &event)? {
                InputAction::Continue => {}
                InputAction::Exit => break,
            }
        }
        redraw(&engine)?;
    }

    cleanup_terminal();
    playback.shutdown()?;
    Ok(())
}

fn cleanup_terminal() {
    let _ = stdout().execute(DisableMouseCapture);
    let _ = stdout().execute(crossterm::cursor::Show);
    let _ = stdout().execute(LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Q or ESC.
pub fn is_quit_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
}
