//! Transport bar rendering.
//!
//! Displays playback status, position in the song, and what is loaded.

use crate::audio::SongInfo;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Everything the transport bar shows for one frame.
#[derive(Debug, Clone, Copy)]
pub struct TransportView<'a> {
    pub song: &'a SongInfo,
    pub paused: bool,
    pub frames_rendered: u64,
    pub sample_rate: u32,
    pub history_len: usize,
    pub loop_playback: bool,
}

impl TransportView<'_> {
    /// Render position in the song, in seconds.
    ///
    /// Counts frames the bridge has rendered, which runs ahead of what is
    /// audible by up to one block plus the device's own buffering.
    ///
    /// Looping playback wraps back to zero at the end of the song; otherwise
    /// the position stops at the song length.
    pub fn render_position_secs(&self) -> f64 {
        let elapsed = self.frames_rendered as f64 / f64::from(self.sample_rate.max(1));
        let length = self.song.length_secs;
        if length <= 0.0 {
            elapsed
        } else if self.loop_playback {
            elapsed % length
        } else {
            elapsed.min(length)
        }
    }
}

/// Formats seconds as `m:ss.t`.
pub fn format_time(secs: f64) -> String {
    let tenths = (secs.max(0.0) * 10.0).floor() as u64;
    let minutes = tenths / 600;
    let seconds = (tenths / 10) % 60;
    format!("{}:{:02}.{}", minutes, seconds, tenths % 10)
}

/// Renders the transport bar at the top of the screen.
pub fn render_transport(frame: &mut Frame, area: Rect, view: &TransportView) {
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12), // Play status
            Constraint::Length(22), // Position
            Constraint::Length(22), // Sample rate / window
            Constraint::Min(20),    // Files
        ])
        .split(inner);

    let play_status = if view.paused {
        Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let position = Paragraph::new(Line::from(vec![
        Span::styled(
            format_time(view.render_position_secs()),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" / {}", format_time(view.song.length_secs)),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(position, chunks[1]);

    let format = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} Hz", view.sample_rate),
            Style::default().fg(Color::White),
        ),
        Span::styled("  W: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", view.history_len),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(format, chunks[2]);

    let files = Paragraph::new(Line::from(vec![
        Span::styled(
            view.song.midi_name.as_str(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ),
        Span::styled(" via ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            view.song.soundfont_name.as_str(),
            Style::default().fg(Color::Cyan),
        ),
    ]));
    frame.render_widget(files, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> SongInfo {
        SongInfo {
            midi_name: "flourish.mid".to_string(),
            soundfont_name: "TimGM6mb.sf2".to_string(),
            length_secs: 10.0,
        }
    }

    fn view(song: &SongInfo, frames_rendered: u64, loop_playback: bool) -> TransportView<'_> {
        TransportView {
            song,
            paused: false,
            frames_rendered,
            sample_rate: 1000,
            history_len: 512,
            loop_playback,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00.0");
        assert_eq!(format_time(9.96), "0:09.9");
        assert_eq!(format_time(65.25), "1:05.2");
        assert_eq!(format_time(-3.0), "0:00.0");
    }

    #[test]
    fn test_position_wraps_when_looping() {
        let song = song();
        assert_eq!(view(&song, 2500, true).render_position_secs(), 2.5);
        assert_eq!(view(&song, 12_500, true).render_position_secs(), 2.5);
    }

    #[test]
    fn test_render_position_counts_rendered_frames() {
        let song = song();
        // One block queued but not yet heard still counts
        assert_eq!(view(&song, 0, true).render_position_secs(), 0.0);
        assert_eq!(view(&song, 100, true).render_position_secs(), 0.1);
    }

    #[test]
    fn test_position_stops_at_end() {
        let song = song();
        assert_eq!(view(&song, 12_500, false).render_position_secs(), 10.0);
    }
}
