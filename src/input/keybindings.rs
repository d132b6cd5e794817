use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::config::KeybindingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Focused pane
    Up,
    Down,
    Top,
    Bottom,
    PageUp,
    PageDown,

    // Primary pane, regardless of focus
    ScrollUp,
    ScrollDown,

    // Actions
    Jump,
    Refresh,
    PollNow,
    TogglePolling,
    Retry,
    SwitchFocus,
    OpenMedia,
    Back,
    Quit,

    Help,
}

pub struct KeyBindings {
    bindings: HashMap<KeyEvent, Action>,
}

/// A displayable keybinding entry
#[derive(Debug, Clone)]
pub struct KeybindingEntry {
    pub key: String,
    pub description: &'static str,
    pub category: &'static str,
}

impl KeyBindings {
    pub fn new(mode: &KeybindingMode) -> Self {
        let bindings = match mode {
            KeybindingMode::Vim => Self::vim_bindings(),
            KeybindingMode::Arrows => Self::arrow_bindings(),
        };
        Self { bindings }
    }

    pub fn get(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(event).copied()
    }

    /// First key bound to `action`, for hint bars
    pub fn key_for(&self, action: Action) -> Option<String> {
        let mut keys: Vec<String> = self
            .bindings
            .iter()
            .filter(|(_, bound)| **bound == action)
            .map(|(event, _)| format_key_event(event))
            .collect();
        keys.sort_by_key(|key| (key.len(), key.clone()));
        keys.into_iter().next()
    }

    /// All keybindings as displayable entries, grouped by category
    pub fn all_bindings(&self) -> Vec<KeybindingEntry> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(event, action)| KeybindingEntry {
                key: format_key_event(event),
                description: action_description(action),
                category: action_category(action),
            })
            .collect();

        entries.sort_by(|a, b| {
            category_order(a.category)
                .cmp(&category_order(b.category))
                .then_with(|| a.description.cmp(b.description))
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    fn vim_bindings() -> HashMap<KeyEvent, Action> {
        let mut map = HashMap::new();

        // Navigation
        map.insert(key('j'), Action::Down);
        map.insert(key('k'), Action::Up);
        map.insert(key('g'), Action::Top);
        map.insert(shift_key('G'), Action::Bottom);
        map.insert(ctrl_key('d'), Action::PageDown);
        map.insert(ctrl_key('u'), Action::PageUp);
        map.insert(shift_key('J'), Action::ScrollDown);
        map.insert(shift_key('K'), Action::ScrollUp);

        // Actions
        map.insert(key_code(KeyCode::Enter), Action::Jump);
        map.insert(key('r'), Action::Refresh);
        map.insert(key('p'), Action::PollNow);
        map.insert(key('s'), Action::TogglePolling);
        map.insert(shift_key('R'), Action::Retry);
        map.insert(key_code(KeyCode::Tab), Action::SwitchFocus);
        map.insert(key('o'), Action::OpenMedia);
        map.insert(key_code(KeyCode::Esc), Action::Back);
        map.insert(key('q'), Action::Quit);

        map.insert(key('.'), Action::Help);

        map
    }

    fn arrow_bindings() -> HashMap<KeyEvent, Action> {
        let mut map = HashMap::new();

        // Navigation
        map.insert(key_code(KeyCode::Down), Action::Down);
        map.insert(key_code(KeyCode::Up), Action::Up);
        map.insert(key_code(KeyCode::Home), Action::Top);
        map.insert(key_code(KeyCode::End), Action::Bottom);
        map.insert(key_code(KeyCode::PageDown), Action::PageDown);
        map.insert(key_code(KeyCode::PageUp), Action::PageUp);
        map.insert(shift_key_code(KeyCode::Down), Action::ScrollDown);
        map.insert(shift_key_code(KeyCode::Up), Action::ScrollUp);

        // Actions
        map.insert(key_code(KeyCode::Enter), Action::Jump);
        map.insert(key_code(KeyCode::F(5)), Action::Refresh);
        map.insert(ctrl_key('p'), Action::PollNow);
        map.insert(key_code(KeyCode::F(6)), Action::TogglePolling);
        map.insert(ctrl_key('r'), Action::Retry);
        map.insert(key_code(KeyCode::Tab), Action::SwitchFocus);
        map.insert(ctrl_key('o'), Action::OpenMedia);
        map.insert(key_code(KeyCode::Esc), Action::Back);
        map.insert(ctrl_key('q'), Action::Quit);

        map.insert(key_code(KeyCode::F(1)), Action::Help);

        map
    }
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn shift_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
}

fn ctrl_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn shift_key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::SHIFT)
}

/// Format a KeyEvent for display
fn format_key_event(event: &KeyEvent) -> String {
    let mut parts = Vec::new();

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl+");
    }
    // Shifted letters already read as uppercase
    if event.modifiers.contains(KeyModifiers::SHIFT) && !matches!(event.code, KeyCode::Char(_)) {
        parts.push("Shift+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        parts.push("Alt+");
    }

    let key_str = match event.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => format!("{:?}", event.code),
    };

    format!("{}{}", parts.join(""), key_str)
}

fn action_description(action: &Action) -> &'static str {
    match action {
        Action::Up => "Move up",
        Action::Down => "Move down",
        Action::Top => "Go to top",
        Action::Bottom => "Go to bottom",
        Action::PageUp => "Page up",
        Action::PageDown => "Page down",
        Action::ScrollUp => "Scroll history up",
        Action::ScrollDown => "Scroll history down",
        Action::Jump => "Show task in history",
        Action::Refresh => "Reload both panes",
        Action::PollNow => "Check status now",
        Action::TogglePolling => "Pause / resume polling",
        Action::Retry => "Retry failed page",
        Action::SwitchFocus => "Switch pane",
        Action::OpenMedia => "Open media in browser",
        Action::Back => "Close / back",
        Action::Quit => "Quit",
        Action::Help => "Toggle help",
    }
}

fn action_category(action: &Action) -> &'static str {
    match action {
        Action::Up
        | Action::Down
        | Action::Top
        | Action::Bottom
        | Action::PageUp
        | Action::PageDown
        | Action::ScrollUp
        | Action::ScrollDown
        | Action::SwitchFocus => "Navigation",

        Action::Jump
        | Action::Refresh
        | Action::PollNow
        | Action::TogglePolling
        | Action::Retry
        | Action::OpenMedia
        | Action::Back
        | Action::Quit => "Actions",

        Action::Help => "Help",
    }
}

fn category_order(category: &str) -> u8 {
    match category {
        "Navigation" => 0,
        "Actions" => 1,
        "Help" => 2,
        _ => 99,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vim_bindings() {
        let bindings = KeyBindings::new(&KeybindingMode::Vim);

        assert_eq!(bindings.get(&key('j')), Some(Action::Down));
        assert_eq!(bindings.get(&shift_key('J')), Some(Action::ScrollDown));
        assert_eq!(bindings.get(&key_code(KeyCode::Enter)), Some(Action::Jump));
        assert_eq!(bindings.get(&key('p')), Some(Action::PollNow));
        assert_eq!(bindings.get(&shift_key('R')), Some(Action::Retry));
        assert_eq!(bindings.get(&key('q')), Some(Action::Quit));
    }

    #[test]
    fn test_arrow_bindings() {
        let bindings = KeyBindings::new(&KeybindingMode::Arrows);

        assert_eq!(bindings.get(&key_code(KeyCode::Down)), Some(Action::Down));
        assert_eq!(
            bindings.get(&shift_key_code(KeyCode::Up)),
            Some(Action::ScrollUp)
        );
        assert_eq!(bindings.get(&ctrl_key('q')), Some(Action::Quit));
        assert_eq!(bindings.get(&key('j')), None);
    }

    #[test]
    fn test_key_for_and_listing() {
        let bindings = KeyBindings::new(&KeybindingMode::Vim);
        assert_eq!(bindings.key_for(Action::Refresh).as_deref(), Some("r"));
        assert_eq!(bindings.key_for(Action::ScrollDown).as_deref(), Some("J"));
        assert_eq!(bindings.key_for(Action::PageDown).as_deref(), Some("Ctrl+d"));

        let entries = bindings.all_bindings();
        assert_eq!(entries.first().map(|e| e.category), Some("Navigation"));
        assert_eq!(entries.last().map(|e| e.category), Some("Help"));
    }
}
