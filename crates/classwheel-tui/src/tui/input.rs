// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app loop,
// or into local ViewState edits (text buffers, focus, dismissing alerts).
// Modes are checked from the top of the overlay stack down.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use classwheel_app::protocol::{GamePhase, UserCommand};
use classwheel_core::quiz::QuizPhase;

use super::{SettingsFocus, ViewState};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop, `None` when it was handled locally or ignored.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }
    if view_state.alert.is_some() {
        return handle_alert(key_event, view_state);
    }
    if view_state.credential_prompt {
        return handle_credential(key_event, view_state);
    }
    if view_state.settings.is_some() {
        return handle_settings(key_event, view_state);
    }

    match view_state.phase {
        GamePhase::Question => handle_question(key_event, view_state),
        GamePhase::Deciding => handle_decision(key_event),
        GamePhase::Idle | GamePhase::Spinning => handle_main(key_event, view_state),
    }
}

fn handle_main(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let idle = view_state.phase == GamePhase::Idle;
    match key_event.code {
        KeyCode::Char(' ') | KeyCode::Enter if idle => Some(UserCommand::Spin),
        KeyCode::Char('s') if idle => Some(UserCommand::OpenSettings),
        KeyCode::Char('k') if idle => Some(UserCommand::ClearCredential),
        KeyCode::Char('R') if idle => Some(UserCommand::ReloadSession),
        KeyCode::Char('m') => Some(UserCommand::ToggleSound),
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

fn handle_question(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let unanswered = view_state
        .quiz
        .as_ref()
        .is_some_and(|quiz| quiz.phase == QuizPhase::Unanswered);
    match key_event.code {
        KeyCode::Char(c) if unanswered && answer_index(c).is_some() => {
            answer_index(c).map(UserCommand::Answer)
        }
        KeyCode::Char('s') | KeyCode::Esc if unanswered => Some(UserCommand::SkipQuestion),
        KeyCode::Char('m') => Some(UserCommand::ToggleSound),
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

/// Option index for `a`-`d` (either case) or `1`-`4`.
pub fn answer_index(c: char) -> Option<usize> {
    match c.to_ascii_lowercase() {
        'a' | '1' => Some(0),
        'b' | '2' => Some(1),
        'c' | '3' => Some(2),
        'd' | '4' => Some(3),
        _ => None,
    }
}

fn handle_decision(key_event: KeyEvent) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Delete => Some(UserCommand::RemoveWinner),
        KeyCode::Enter | KeyCode::Char('g') | KeyCode::Char('G') => Some(UserCommand::KeepWinner),
        KeyCode::Char('m') => Some(UserCommand::ToggleSound),
        _ => None,
    }
}

/// `y`/`q` confirm, `n`/`Esc` cancel, everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn handle_alert(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    if matches!(
        key_event.code,
        KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')
    ) {
        view_state.alert = None;
    }
    None
}

fn handle_credential(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => Some(UserCommand::EnterCredential(
            view_state.credential_input.clone(),
        )),
        KeyCode::Esc => Some(UserCommand::SkipCredential),
        KeyCode::Backspace => {
            view_state.credential_input.pop();
            None
        }
        KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            view_state.credential_input.push(c);
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Settings dialog
// ---------------------------------------------------------------------------

fn handle_settings(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    if view_state.editor.confirm_clear_all {
        return handle_confirm_clear_all(key_event, view_state);
    }
    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    match key_event.code {
        KeyCode::Esc => return Some(UserCommand::CloseSettings),
        KeyCode::Char('s') if ctrl => {
            return Some(UserCommand::SaveSettings {
                roster_text: view_state.editor.roster_text.clone(),
            })
        }
        KeyCode::Char('k') if ctrl => return Some(UserCommand::ClearCredential),
        KeyCode::Char('d') if ctrl => {
            view_state.editor.confirm_clear_all = true;
            return None;
        }
        KeyCode::Tab => {
            view_state.editor.focus = view_state.editor.focus.next();
            return None;
        }
        KeyCode::BackTab => {
            view_state.editor.focus = view_state.editor.focus.prev();
            return None;
        }
        _ if ctrl => return None,
        _ => {}
    }

    let editor = &mut view_state.editor;
    match editor.focus {
        SettingsFocus::Roster => {
            match key_event.code {
                KeyCode::Enter => editor.roster_text.push('\n'),
                KeyCode::Backspace => {
                    editor.roster_text.pop();
                }
                KeyCode::Char(c) => editor.roster_text.push(c),
                _ => {}
            }
            None
        }
        SettingsFocus::Topic => match key_event.code {
            KeyCode::Enter => Some(UserCommand::GenerateFromTopic(editor.topic.clone())),
            code => {
                edit_line(&mut editor.topic, code);
                None
            }
        },
        SettingsFocus::File => match key_event.code {
            KeyCode::Enter => Some(UserCommand::GenerateFromFile(PathBuf::from(
                editor.file_path.trim(),
            ))),
            code => {
                edit_line(&mut editor.file_path, code);
                None
            }
        },
        SettingsFocus::Questions => {
            let count = view_state
                .settings
                .as_ref()
                .map_or(0, |s| s.questions.len());
            let editor = &mut view_state.editor;
            match key_event.code {
                KeyCode::Up => {
                    editor.selected_question = editor.selected_question.saturating_sub(1);
                    None
                }
                KeyCode::Down => {
                    if editor.selected_question + 1 < count {
                        editor.selected_question += 1;
                    }
                    None
                }
                KeyCode::Delete | KeyCode::Char('d') if count > 0 => {
                    Some(UserCommand::RemoveQuestion(editor.selected_question))
                }
                KeyCode::Char('X') if count > 0 => Some(UserCommand::ClearQuestions),
                _ => None,
            }
        }
        SettingsFocus::Duration => {
            let current = view_state
                .settings
                .as_ref()
                .map(|s| s.spin_duration)
                .unwrap_or(view_state.spin_duration);
            match key_event.code {
                KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => {
                    Some(UserCommand::SetSpinDuration(current.next()))
                }
                KeyCode::Left => Some(UserCommand::SetSpinDuration(current.next().next())),
                _ => None,
            }
        }
    }
}

fn edit_line(buffer: &mut String, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) => buffer.push(c),
        _ => {}
    }
}

/// `y` wipes everything, `n`/`Esc` goes back to the dialog.
fn handle_confirm_clear_all(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            view_state.editor.confirm_clear_all = false;
            Some(UserCommand::ClearAllData)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.editor.confirm_clear_all = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
