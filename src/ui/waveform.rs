//! Scrolling waveform view.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

/// Maps window samples to points on a `width` x `height` plane.
///
/// Sample `i` of `n` lands at `x = i / n * width`. A sample value `v` lands
/// at `y = height * gain * v + height / 2`, so silence runs along the middle.
/// Values are not clamped; points outside the plane are clipped when drawn.
pub fn waveform_points(samples: &[f32], width: f64, height: f64, gain: f64) -> Vec<(f64, f64)> {
    let n = samples.len() as f64;
    let centre = height / 2.0;
    let scale = height * gain;

    samples
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 / n * width, scale * v as f64 + centre))
        .collect()
}

/// Draws the waveform window as a polyline.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `samples` - Window contents, oldest first
/// * `gain` - Vertical scale as a fraction of the view height
pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32], gain: f64) {
    let block = Block::default()
        .title(" Waveform ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    let width = f64::from(inner.width.max(1));
    let height = f64::from(inner.height.max(1));
    let points = waveform_points(samples, width, height, gain);

    let canvas = Canvas::default()
        .block(block)
        .background_color(Color::Blue)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for pair in points.windows(2) {
                ctx.draw(&Line {
                    x1: pair[0].0,
                    y1: pair[0].1,
                    x2: pair[1].0,
                    y2: pair[1].1,
                    color: Color::LightBlue,
                });
            }
        });

    frame.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn test_points_span_width() {
        let points = waveform_points(&[0.0; 4], 100.0, 50.0, 0.25);
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 25.0, 50.0, 75.0]);
    }

    #[test]
    fn test_silence_is_centred() {
        let points = waveform_points(&[0.0; 3], 10.0, 40.0, 0.25);
        assert!(points.iter().all(|p| p.1 == 20.0));
    }

    #[test]
    fn test_gain_scales_from_centre() {
        // Quarter-height gain: a value of 1.0 sits a quarter above the middle
        let points = waveform_points(&[1.0, -1.0, 2.0], 3.0, 40.0, 0.25);
        assert_eq!(points[0].1, 30.0);
        assert_eq!(points[1].1, 10.0);
        // Raw sums beyond 1.0 are not clamped
        assert_eq!(points[2].1, 40.0);

        let doubled = waveform_points(&[1.0], 1.0, 40.0, 0.5);
        assert_eq!(doubled[0].1, 40.0);
    }

    #[test]
    fn test_render_waveform_draws() {
        let backend = TestBackend::new(40, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let samples: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin()).collect();

        terminal
            .draw(|frame| render_waveform(frame, frame.area(), &samples, 0.25))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let drawn = buffer
            .content()
            .iter()
            .filter(|cell| {
                let symbol = cell.symbol();
                symbol.chars().any(|c| ('\u{2801}'..='\u{28FF}').contains(&c))
            })
            .count();
        assert!(drawn > 0);
    }
}
