//! Common UI widgets and utilities

use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::theme::Theme;

pub fn error_bar(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(format!(" Error: {} ", message)).style(Theme::error_bar());
    frame.render_widget(paragraph, area);
}

/// Key hints that fit the width, separated by " │ "
pub fn help_bar(frame: &mut Frame, area: Rect, hints: &[(String, &str)]) {
    let available_width = area.width as usize;

    let mut total_width = 0;
    let mut hints_to_show = 0;
    for (i, (key, desc)) in hints.iter().enumerate() {
        let separator = if i + 1 < hints.len() { 3 } else { 1 };
        let width = key.width() + 2 + desc.width() + separator;
        if total_width + width > available_width {
            break;
        }
        total_width += width;
        hints_to_show += 1;
    }
    // Show at least one hint if possible
    let hints_to_show = hints_to_show.max(1).min(hints.len());

    let mut spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().take(hints_to_show).enumerate() {
        spans.push(Span::styled(format!(" {} ", key), Theme::help_key()));
        spans.push(Span::styled(desc.to_string(), Theme::help_desc()));
        if i + 1 < hints_to_show {
            spans.push(Span::styled(" │ ", Theme::text_muted()));
        }
    }
    spans.push(Span::styled(" ", Theme::text_muted()));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Calculate display width of a string (accounting for Unicode)
pub fn display_width(s: &str) -> usize {
    s.width()
}

/// Truncate to a display width, ending in "..." when cut
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if display_width(s) <= max_width {
        return s.to_string();
    }
    if max_width < 4 {
        return s.chars().take(max_width).collect();
    }

    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);
        if width + char_width > max_width - 3 {
            break;
        }
        width += char_width;
        result.push(c);
    }
    result.push_str("...");
    result
}

/// Collapse whitespace runs and drop control characters (prompts are multi-line)
pub fn single_line(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short creation time relative to `now`. The server writes naive local
/// ISO timestamps; RFC 3339 is accepted too.
pub fn format_created(created_at: &str, now: NaiveDateTime) -> Option<String> {
    let created = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(created_at)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })?;

    let today = now.date();
    let day = created.date();
    let text = if day == today {
        created.format("%H:%M").to_string()
    } else if (today - day).num_days() < 7 {
        created.format("%a %H:%M").to_string()
    } else if day.year() == today.year() {
        created.format("%b %d").to_string()
    } else {
        created.format("%Y-%m-%d").to_string()
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a long task id", 8), "a lon...");
        assert_eq!(truncate_to_width("abcdef", 3), "abc");
        // Wide characters count double
        assert_eq!(truncate_to_width("日本語のテキスト", 9), "日本語...");
    }

    #[test]
    fn test_format_created() {
        let now = NaiveDateTime::parse_from_str("2024-05-10T18:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        assert_eq!(
            format_created("2024-05-10T09:05:12.123456", now).as_deref(),
            Some("09:05")
        );
        assert_eq!(
            format_created("2024-05-08T09:05:12", now).as_deref(),
            Some("Wed 09:05")
        );
        assert_eq!(
            format_created("2024-01-02T09:05:12", now).as_deref(),
            Some("Jan 02")
        );
        assert_eq!(
            format_created("2023-12-31T23:59:59", now).as_deref(),
            Some("2023-12-31")
        );
        assert_eq!(format_created("yesterday", now), None);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a cat\n  on\ta\x1bmat "), "a cat on a mat");
        assert_eq!(single_line(""), "");
    }
}
