// Confetti particles drawn straight into the frame buffer over everything else.

use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::Frame;

use classwheel_app::protocol::ConfettiDrop;

const SYMBOL: &str = "▪";

/// Cell for a drop whose `column` and `height` are fractions of the area.
/// Height 1.0 is the top edge.
pub fn cell_for(drop: &ConfettiDrop, area: Rect) -> Option<(u16, u16)> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    if !(0.0..=1.0).contains(&drop.column) || !(0.0..=1.0).contains(&drop.height) {
        return None;
    }
    let max_x = f64::from(area.width - 1);
    let max_y = f64::from(area.height - 1);
    let x = area.x + (drop.column * max_x).round() as u16;
    let y = area.y + ((1.0 - drop.height) * max_y).round() as u16;
    Some((x, y))
}

pub fn render(frame: &mut Frame, area: Rect, drops: &[ConfettiDrop]) {
    let buffer = frame.buffer_mut();
    for drop in drops {
        let Some(position) = cell_for(drop, area) else {
            continue;
        };
        let (r, g, b) = drop.color;
        if let Some(cell) = buffer.cell_mut(position) {
            cell.set_symbol(SYMBOL).set_fg(Color::Rgb(r, g, b));
        }
    }
}
