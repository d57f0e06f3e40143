// Wheel widget: the partitioned circle drawn on a braille canvas.
//
// Slices are laid out in list order from local angle 0 (east), clockwise on
// screen, and the whole wheel is turned by the current rotation. The pointer is
// fixed at the top. Canvas coordinates have y pointing up, so a screen-clockwise
// angle `a` maps to `(cos a, -sin a)`.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use classwheel_core::wheel::{slice_color, slice_start_angle, slice_width, truncate_label, POINTER_ANGLE};

use crate::tui::ViewState;

/// Half-extent of the shorter canvas axis. The wheel has radius 1.
const EXTENT: f64 = 1.15;
const RADIAL_STEPS: usize = 24;
/// Angular sampling step in degrees.
const ANGLE_STEP: f64 = 1.5;
const LABEL_RADIUS: f64 = 0.62;
/// Above this many slices, slices are labelled with their number only.
const MAX_NAME_LABELS: usize = 12;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Vòng quay may mắn ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let entrants = state.names.len();
    if entrants == 0 || slice_width(entrants).is_none() {
        render_empty(frame, inner);
        return;
    }
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let (x_bounds, y_bounds) = bounds_for(inner);
    let cell_width = (x_bounds[1] - x_bounds[0]) / f64::from(inner.width);

    let slices: Vec<(Color, Vec<(f64, f64)>)> = (0..entrants)
        .map(|i| {
            let ((r, g, b), _) = slice_color(i);
            (Color::Rgb(r, g, b), sector_points(i, entrants, state.rotation))
        })
        .collect();
    let labels: Vec<(f64, f64, Span<'static>)> = (0..entrants)
        .filter_map(|i| label_for(i, state, cell_width))
        .collect();
    let pointer_style = if state.pointer_flash > 0 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    let (px, py) = to_canvas(POINTER_ANGLE, 1.08);

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            for (color, coords) in &slices {
                ctx.draw(&Points {
                    coords,
                    color: *color,
                });
            }
            ctx.layer();
            for (x, y, span) in &labels {
                ctx.print(*x, *y, Line::from(span.clone()));
            }
            ctx.print(px - cell_width / 2.0, py, Line::from(Span::styled("▼", pointer_style)));
            ctx.print(-cell_width / 2.0, 0.0, Line::from(Span::styled("●", Style::default().fg(Color::White))));
        });
    frame.render_widget(canvas, inner);
}

fn render_empty(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "Danh sách trống!",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from("Nhấn s để thêm tên học sinh trong phần cài đặt."),
    ];
    let top = area.height.saturating_sub(2) / 2;
    let centered = Rect {
        y: area.y + top,
        height: area.height.saturating_sub(top),
        ..area
    };
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, centered);
}

fn label_for(index: usize, state: &ViewState, cell_width: f64) -> Option<(f64, f64, Span<'static>)> {
    let entrants = state.names.len();
    let width = slice_width(entrants)?;
    let start = slice_start_angle(index, entrants, state.rotation)?;
    let text = if entrants > MAX_NAME_LABELS {
        (index + 1).to_string()
    } else {
        truncate_label(state.names.get(index)?)
    };
    let ((r, g, b), dark_text) = slice_color(index);
    let mut style = Style::default()
        .fg(if dark_text { Color::Black } else { Color::White })
        .bg(Color::Rgb(r, g, b));
    if state.selected == Some(index) {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    let (x, y) = to_canvas(start + width / 2.0, LABEL_RADIUS);
    let half = text.chars().count() as f64 * cell_width / 2.0;
    Some((x - half, y, Span::styled(text, style)))
}

/// Canvas point for a screen-clockwise angle (degrees) at `radius`.
pub fn to_canvas(angle: f64, radius: f64) -> (f64, f64) {
    let rad = angle.to_radians();
    (radius * rad.cos(), -radius * rad.sin())
}

/// Sample points filling slice `index` after `rotation`.
pub fn sector_points(index: usize, entrants: usize, rotation: f64) -> Vec<(f64, f64)> {
    let (Some(start), Some(width)) = (
        slice_start_angle(index, entrants, rotation),
        slice_width(entrants),
    ) else {
        return Vec::new();
    };
    let angle_steps = ((width / ANGLE_STEP).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(angle_steps * RADIAL_STEPS);
    for a in 0..angle_steps {
        let angle = start + (a as f64 + 0.5) * width / angle_steps as f64;
        for r in 1..=RADIAL_STEPS {
            points.push(to_canvas(angle, r as f64 / RADIAL_STEPS as f64));
        }
    }
    points
}

/// Canvas bounds that keep the wheel round. Terminal cells are roughly twice
/// as tall as they are wide.
pub fn bounds_for(area: Rect) -> ([f64; 2], [f64; 2]) {
    let aspect = f64::from(area.width) / (f64::from(area.height.max(1)) * 2.0);
    if aspect >= 1.0 {
        ([-EXTENT * aspect, EXTENT * aspect], [-EXTENT, EXTENT])
    } else {
        ([-EXTENT, EXTENT], [-EXTENT / aspect, EXTENT / aspect])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::{buffer_text, snapshot};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    const EPS: f64 = 1e-9;

    #[test]
    fn pointer_maps_to_top_of_canvas() {
        let (x, y) = to_canvas(POINTER_ANGLE, 1.0);
        assert!(x.abs() < EPS);
        assert!((y - 1.0).abs() < EPS);
    }

    #[test]
    fn last_of_four_slices_fills_top_right_at_rest() {
        // Slice 3 covers [270, 360): from the top clockwise to the east.
        let points = sector_points(3, 4, 0.0);
        assert!(!points.is_empty());
        assert!(points.iter().all(|(x, y)| *x >= -EPS && *y >= -EPS));
    }

    #[test]
    fn rotation_turns_slices_clockwise() {
        // A quarter turn moves slice 3 from top-right to bottom-right.
        let points = sector_points(3, 4, 90.0);
        assert!(points.iter().all(|(x, y)| *x >= -EPS && *y <= EPS));
    }

    #[test]
    fn empty_wheel_has_no_points() {
        assert!(sector_points(0, 0, 0.0).is_empty());
    }

    #[test]
    fn bounds_keep_aspect() {
        let (x, y) = bounds_for(Rect::new(0, 0, 80, 20));
        assert!((x[1] / y[1] - 2.0).abs() < EPS);
        let (x, y) = bounds_for(Rect::new(0, 0, 20, 20));
        assert!((y[1] / x[1] - 2.0).abs() < EPS);
    }

    #[test]
    fn empty_roster_shows_message() {
        let state = ViewState::default();
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        assert!(buffer_text(&terminal).contains("Danh sách trống!"));
    }

    #[test]
    fn names_are_drawn_on_slices() {
        let mut state = ViewState::default();
        state.apply_snapshot(snapshot());
        state.pointer_flash = 2;
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("An"));
        assert!(text.contains("Chi"));
        assert!(text.contains("▼"));
    }

    #[test]
    fn crowded_wheel_uses_numbers() {
        let mut state = ViewState::default();
        state.names = (1..=20).map(|i| format!("Học sinh {i}")).collect();
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        assert!(!buffer_text(&terminal).contains("Học sinh"));
    }
}
