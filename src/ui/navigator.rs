//! Thumbnail navigator pane

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme::{Theme, borders, symbols, with_selection_bg};
use super::widgets::truncate_to_width;
use crate::api::MediaType;
use crate::navigator::paginator::LoadStatus;
use crate::navigator::{NavigatorItem, NavigatorView, PosterView};

pub fn render_navigator(frame: &mut Frame, area: Rect, view: &NavigatorView, focused: bool) {
    let title = if view.total_tasks > 0 {
        format!(" Tasks {}/{} ", view.loaded, view.total_tasks)
    } else {
        " Tasks ".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(borders::pane())
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width < 2 || inner.height == 0 {
        return;
    }

    if view.items.is_empty() {
        let message = match view.status {
            LoadStatus::Empty => "No tasks yet".to_string(),
            LoadStatus::Failed => format!(
                "Failed to load: {}",
                view.error.as_deref().unwrap_or("unknown error")
            ),
            _ => "Loading...".to_string(),
        };
        let style = if view.status == LoadStatus::Failed {
            Theme::status_failed()
        } else {
            Theme::text_muted()
        };
        frame.render_widget(Paragraph::new(format!(" {}", message)).style(style), inner);
        return;
    }

    let content_width = inner.width.saturating_sub(1) as usize;
    let height = inner.height as usize;

    let mut lines: Vec<Line> = Vec::with_capacity(view.items.len() * view.item_height);
    for item in &view.items {
        lines.extend(item_lines(item, view.item_height, content_width));
    }
    if view.stalled {
        lines.push(Line::styled(" Load failed, retry", Theme::status_failed()));
    } else if view.loading {
        lines.push(Line::styled(" Loading more...", Theme::text_muted()));
    }

    // The slice starts at slice_offset; show rows from scroll_top
    let lines = position_slice(lines, view.slice_offset, view.scroll_top, height);
    let list_area = Rect {
        width: inner.width - 1,
        ..inner
    };
    frame.render_widget(Paragraph::new(lines), list_area);

    let bar_area = Rect {
        x: inner.x + inner.width - 1,
        width: 1,
        ..inner
    };
    frame.render_widget(Paragraph::new(scrollbar_lines(view, height)), bar_area);
}

fn item_lines(item: &NavigatorItem, item_height: usize, width: usize) -> Vec<Line<'static>> {
    let (marker, marker_style) = if item.active {
        (symbols::ACTIVE, Theme::active_marker())
    } else {
        (symbols::INACTIVE, Theme::text())
    };
    let marker_style = with_selection_bg(marker_style, item.selected);
    let row_style = |style| with_selection_bg(style, item.selected);

    let media = match item.media {
        Some(MediaType::Video) => symbols::VIDEO,
        Some(MediaType::Image) => symbols::IMAGE,
        None => " ",
    };
    let badge = item
        .batch_counter
        .as_ref()
        .map(|counter| format!(" [{}]", counter))
        .unwrap_or_default();
    let id_width = width.saturating_sub(4 + badge.chars().count());
    let task_id = truncate_to_width(&item.task_id, id_width);
    let used = 4 + task_id.chars().count() + badge.chars().count();

    let mut lines = Vec::with_capacity(item_height);
    lines.push(Line::from(vec![
        Span::styled(marker, marker_style),
        Span::styled(format!(" {} ", media), row_style(Theme::text_accent())),
        Span::styled(task_id, row_style(Theme::text())),
        Span::styled(badge, row_style(Theme::batch_badge())),
        Span::styled(" ".repeat(width.saturating_sub(used)), row_style(Theme::text())),
    ]));

    if item_height > 1 {
        let (symbol, label) = match &item.poster {
            PosterView::Pending => (symbols::POSTER_MISSING, String::new()),
            PosterView::Loading => (symbols::POSTER_LOADING, "loading poster".to_string()),
            PosterView::Ready(description) => (symbols::POSTER_READY, description.clone()),
            PosterView::Placeholder => (symbols::POSTER_MISSING, "no poster".to_string()),
        };
        let label = truncate_to_width(&label, width.saturating_sub(4));
        let used = 4 + label.chars().count();
        lines.push(Line::from(vec![
            Span::styled(marker, marker_style),
            Span::styled(format!(" {} ", symbol), row_style(Theme::text_muted())),
            Span::styled(label, row_style(Theme::text_secondary())),
            Span::styled(" ".repeat(width.saturating_sub(used)), row_style(Theme::text())),
        ]));
    }
    while lines.len() < item_height {
        lines.push(Line::from(""));
    }
    lines
}

/// Cut a slice of rows that begins at `first_row` down to the rows visible
/// from `scroll_top`, padding the top if the slice starts below it.
pub(super) fn position_slice<T: Default>(
    mut rows: Vec<T>,
    first_row: usize,
    scroll_top: usize,
    height: usize,
) -> Vec<T> {
    if first_row > scroll_top {
        let pad = (first_row - scroll_top).min(height);
        let mut padded: Vec<T> = (0..pad).map(|_| T::default()).collect();
        padded.extend(rows.into_iter().take(height - pad));
        return padded;
    }
    let skip = (scroll_top - first_row).min(rows.len());
    rows.drain(..skip);
    rows.truncate(height);
    rows
}

/// Thumb start and length in rows, or None when everything fits
pub(super) fn scrollbar_thumb(
    scroll_top: usize,
    height: usize,
    extent: usize,
) -> Option<(usize, usize)> {
    if height == 0 || extent <= height {
        return None;
    }
    let size = (height * height / extent).max(1);
    let max_start = height - size;
    let start = (scroll_top * height / extent).min(max_start);
    Some((start, size))
}

fn scrollbar_lines(view: &NavigatorView, height: usize) -> Vec<Line<'static>> {
    let Some((start, size)) = scrollbar_thumb(view.scroll_top, height, view.total_extent) else {
        return Vec::new();
    };
    (0..height)
        .map(|row| {
            if (start..start + size).contains(&row) {
                Line::styled(symbols::SCROLL_THUMB, Theme::text_accent())
            } else {
                Line::styled(symbols::SCROLL_TRACK, Theme::border())
            }
        })
        .collect()
}
