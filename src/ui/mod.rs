//! Terminal user interface.
//!
//! Snapshots the waveform window once per frame and draws it under a
//! transport bar. Space pauses, `q` or Esc quits.

mod transport;
mod waveform;

use crate::audio::{Playback, SongInfo};
use crate::config::Config;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

pub use transport::{format_time, render_transport, TransportView};
pub use waveform::{render_waveform, waveform_points};

/// What a key press asks the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePause,
}

/// Maps a key press to an action.
pub fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePause),
        _ => None,
    }
}

/// Draws one frame: transport bar on top, waveform below.
pub fn render(frame: &mut Frame, samples: &[f32], transport: &TransportView, gain: f64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(frame.area());

    render_transport(frame, chunks[0], transport);
    render_waveform(frame, chunks[1], samples, gain);
}

/// Runs the viewer until the user quits.
///
/// Sets up the terminal, loops, and always restores the terminal before
/// returning, including when the loop fails.
pub fn run(playback: &Playback, song: &SongInfo, config: &Config) -> Result<()> {
    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let result = run_loop(&mut terminal, playback, song, config);
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;
    result
}

/// Main viewer loop.
fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    playback: &Playback,
    song: &SongInfo,
    config: &Config,
) -> Result<()> {
    let history = playback.history();
    let mut samples = vec![0.0f32; history.len()];
    let tick = Duration::from_millis(config.frame_interval_ms);

    loop {
        history.snapshot(&mut samples);

        let transport = TransportView {
            song,
            paused: playback.is_paused(),
            frames_rendered: history.frames_rendered(),
            sample_rate: config.sample_rate,
            history_len: samples.len(),
            loop_playback: config.loop_playback,
        };

        terminal.draw(|frame| render(frame, &samples, &transport, config.gain))?;

        // Handle events with a short timeout to keep the waveform moving
        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match action_for_key(key.code, key.modifiers) {
                    Some(Action::Quit) => return Ok(()),
                    Some(Action::TogglePause) => {
                        playback.toggle_pause();
                    }
                    None => {}
                }
            }
        }
    }
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}
