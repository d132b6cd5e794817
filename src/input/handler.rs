use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseEventKind};

use super::keybindings::{Action, KeyBindings};
use crate::app::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
    Action(Action),
    /// Mouse wheel over the given column; the pane under it scrolls
    Wheel { column: u16, down: bool },
    /// Terminal resized; pane sizes must be recomputed
    Resize { width: u16, height: u16 },
}

pub fn handle_input(event: Event, state: &AppState, bindings: &KeyBindings) -> InputResult {
    match event {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            handle_key(key_event, state, bindings)
        }
        Event::Mouse(mouse) if !state.show_help => match mouse.kind {
            MouseEventKind::ScrollDown => InputResult::Wheel {
                column: mouse.column,
                down: true,
            },
            MouseEventKind::ScrollUp => InputResult::Wheel {
                column: mouse.column,
                down: false,
            },
            _ => InputResult::Continue,
        },
        Event::Resize(width, height) => InputResult::Resize { width, height },
        _ => InputResult::Continue,
    }
}

fn handle_key(key: KeyEvent, state: &AppState, bindings: &KeyBindings) -> InputResult {
    if state.show_help {
        return handle_help_input(key, bindings);
    }

    match bindings.get(&key) {
        Some(Action::Quit) => InputResult::Quit,
        Some(action) => InputResult::Action(action),
        None => InputResult::Continue,
    }
}

fn handle_help_input(key: KeyEvent, bindings: &KeyBindings) -> InputResult {
    // In help modal: up/down scroll, Esc or the help key closes
    match bindings.get(&key) {
        Some(Action::Quit) => InputResult::Quit,
        Some(Action::Help | Action::Back) => InputResult::Action(Action::Help),
        Some(action @ (Action::Up | Action::Down)) => InputResult::Action(action),
        _ => InputResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceKind;
    use crate::config::KeybindingMode;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn press(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn state() -> AppState {
        AppState::new(ResourceKind::Video, "http://localhost", Vec::new(), Vec::new())
    }

    #[test]
    fn test_mapped_keys_become_actions() {
        let bindings = KeyBindings::new(&KeybindingMode::Vim);
        let state = state();

        assert_eq!(
            handle_input(press('r'), &state, &bindings),
            InputResult::Action(Action::Refresh)
        );
        assert_eq!(handle_input(press('q'), &state, &bindings), InputResult::Quit);
        assert_eq!(handle_input(press('z'), &state, &bindings), InputResult::Continue);
        assert_eq!(
            handle_input(Event::Resize(120, 40), &state, &bindings),
            InputResult::Resize {
                width: 120,
                height: 40
            }
        );
    }

    #[test]
    fn test_wheel_reports_column() {
        use crossterm::event::{MouseEvent, MouseEventKind};

        let bindings = KeyBindings::new(&KeybindingMode::Vim);
        let wheel = Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 12,
            row: 5,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(
            handle_input(wheel.clone(), &state(), &bindings),
            InputResult::Wheel {
                column: 12,
                down: true
            }
        );

        let mut help = state();
        help.show_help = true;
        assert_eq!(handle_input(wheel, &help, &bindings), InputResult::Continue);
    }

    #[test]
    fn test_help_modal_swallows_other_actions() {
        let bindings = KeyBindings::new(&KeybindingMode::Vim);
        let mut state = state();
        state.show_help = true;

        assert_eq!(handle_input(press('r'), &state, &bindings), InputResult::Continue);
        assert_eq!(
            handle_input(press('j'), &state, &bindings),
            InputResult::Action(Action::Down)
        );
        assert_eq!(
            handle_input(
                Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
                &state,
                &bindings
            ),
            InputResult::Action(Action::Help)
        );
    }
}
