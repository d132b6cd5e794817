use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem},
};

use super::history::render_history;
use super::navigator::render_navigator;
use super::status_bar::status_bar;
use super::theme::Theme;
use super::widgets::{error_bar, help_bar};
use crate::app::state::{AppState, Focus};
use crate::constants::{MIN_SPLIT_VIEW_WIDTH, NAVIGATOR_WIDTH};
use crate::input::KeybindingEntry;

pub fn render(frame: &mut Frame, state: &AppState) {
    frame.render_widget(Block::default().style(Theme::main_bg()), frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status bar
            Constraint::Min(0),    // Panes
            Constraint::Length(1), // Hints or error
        ])
        .split(frame.area());

    status_bar(frame, chunks[0], state);

    let main_area = chunks[1];
    if main_area.width >= MIN_SPLIT_VIEW_WIDTH {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(NAVIGATOR_WIDTH), Constraint::Min(0)])
            .split(main_area);
        render_navigator(
            frame,
            split[0],
            &state.navigator,
            state.focus == Focus::Navigator,
        );
        render_history(frame, split[1], &state.history, state.focus == Focus::History);
    } else {
        // Narrow terminal: only the focused pane
        match state.focus {
            Focus::Navigator => render_navigator(frame, main_area, &state.navigator, true),
            Focus::History => render_history(frame, main_area, &state.history, true),
        }
    }

    if let Some(error) = &state.status.error {
        error_bar(frame, chunks[2], error);
    } else {
        help_bar(frame, chunks[2], &state.hints);
    }

    // Rendered last so it appears on top
    if state.show_help {
        render_help_popup(frame, frame.area(), &state.keybindings, state.help_scroll);
    }
}

fn render_help_popup(frame: &mut Frame, area: Rect, keys: &[KeybindingEntry], scroll: usize) {
    let mut categories = 0;
    let mut last: Option<&str> = None;
    for key in keys {
        if last != Some(key.category) {
            categories += 1;
            last = Some(key.category);
        }
    }
    let content_height = keys.len() + categories * 2;

    let popup_width = 48.min(area.width.saturating_sub(4)).max(30);
    let popup_height = (content_height as u16 + 2)
        .min(area.height.saturating_sub(4))
        .max(8);
    let popup_area = Rect::new(
        area.width.saturating_sub(popup_width) / 2,
        area.height.saturating_sub(popup_height) / 2,
        popup_width.min(area.width),
        popup_height.min(area.height),
    );

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Help ")
        .title_bottom(" scroll with up/down │ Esc close ")
        .borders(Borders::ALL)
        .border_style(Theme::border_focused());
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key_width = 14;
    let mut items: Vec<ListItem> = Vec::new();
    let mut current_category: Option<&str> = None;
    for entry in keys {
        if current_category != Some(entry.category) {
            if current_category.is_some() {
                items.push(ListItem::new(Line::from("")));
            }
            let rule = inner
                .width
                .saturating_sub(entry.category.len() as u16 + 4) as usize;
            items.push(ListItem::new(Line::from(vec![
                Span::styled(
                    format!("── {} ", entry.category),
                    Theme::text_secondary().add_modifier(Modifier::BOLD),
                ),
                Span::styled("─".repeat(rule), Theme::border()),
            ])));
            current_category = Some(entry.category);
        }

        let key_display = if entry.key.chars().count() > key_width {
            entry.key.chars().take(key_width).collect::<String>()
        } else {
            format!("{:width$}", entry.key, width = key_width)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled("  ", Style::default()),
            Span::styled(key_display, Theme::text_accent()),
            Span::styled(entry.description, Theme::text()),
        ])));
    }

    let visible: Vec<ListItem> = items.into_iter().skip(scroll).collect();
    frame.render_widget(List::new(visible), inner);
}
