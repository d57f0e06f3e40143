// Widgets for each screen region and dialog.

pub mod alert;
pub mod confetti;
pub mod credential;
pub mod decision;
pub mod quit_confirm;
pub mod quiz;
pub mod roster;
pub mod settings;
pub mod status_bar;
pub mod wheel;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Compute a centered rectangle of the given size within `area`, clamped to
/// the available space.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width);
    let clamped_height = height.min(area.height);

    let vertical = Layout::vertical([Constraint::Length(clamped_height)])
        .flex(Flex::Center)
        .split(area);

    let horizontal = Layout::horizontal([Constraint::Length(clamped_width)])
        .flex(Flex::Center)
        .split(vertical[0]);

    horizontal[0]
}

/// Strip chemistry and math delimiters for plain-text display:
/// `$\ce{H2O}$` shows as `H2O`, `$x^2$` as `x^2`.
pub fn plain_markup(text: &str) -> String {
    const MACRO: &str = "\\ce{";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(MACRO) {
        out.push_str(&rest[..pos]);
        let body = &rest[pos + MACRO.len()..];
        let mut depth = 1usize;
        let mut end = body.len();
        for (i, ch) in body.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        out.push_str(&body[..end]);
        rest = body.get(end + 1..).unwrap_or("");
    }
    out.push_str(rest);
    out.replace('$', "")
}
