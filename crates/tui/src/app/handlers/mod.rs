pub(crate) mod command;
pub(crate) mod hitl;

use crate::app::state::InputState;
use crossterm::event::{KeyCode, KeyModifiers};

/// What the event loop should do after a key was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopAction {
    Ignored,
    Redraw,
    Restart,
    Quit,
}

impl LoopAction {
    pub fn from_redraw(redraw: bool) -> Self {
        if redraw {
            Self::Redraw
        } else {
            Self::Ignored
        }
    }
}

/// Line-editing keys shared by the composer and free-text answers. `None` means the key
/// is not an editing key.
pub(crate) fn handle_input_edit_key(
    input: &mut InputState,
    key: KeyCode,
    modifiers: KeyModifiers,
    multiline: bool,
) -> Option<bool> {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match key {
        KeyCode::Char('w') if ctrl => input.delete_word_back(),
        KeyCode::Char('a') if ctrl => input.move_home(),
        KeyCode::Char('e') if ctrl => input.move_end(),
        KeyCode::Char('j') if ctrl && multiline => input.insert_char('\n'),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Delete => input.delete(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Char(ch) => {
            if ctrl || modifiers.contains(KeyModifiers::ALT) {
                return Some(false);
            }
            input.insert_char(ch);
        }
        _ => return None,
    }
    Some(true)
}
