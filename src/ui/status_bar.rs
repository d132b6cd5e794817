//! Status bar: poll activity, running count and the latest message

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme::{Theme, symbols};
use super::widgets::{display_width, truncate_to_width};
use crate::app::state::{AppState, Focus, PollStatus};
use crate::constants::SPINNER_FRAME_MS;
use crate::scheduler::SchedulerPhase;

pub fn status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let style = Theme::status_bar();
    let width = area.width as usize;

    let (indicator, indicator_style) = if state.is_busy() {
        (format!(" {} ", spinner_char()), Theme::status_running())
    } else if state.poll.running.is_some_and(|n| n > 0) {
        (format!(" {} ", symbols::RUNNING), Theme::status_running())
    } else {
        (format!(" {} ", symbols::IDLE), Theme::status_muted())
    };
    let error_indicator = if state.status.has_unacknowledged_error {
        "! "
    } else {
        ""
    };

    let title = format!("{} ", state.kind.label());
    let poll = format!("│ {} ", poll_summary(&state.poll));
    let pane = match state.focus {
        Focus::Navigator => "│ navigator ",
        Focus::History => "│ history ",
    };

    let left_width = display_width(&indicator)
        + display_width(error_indicator)
        + display_width(&title)
        + display_width(&poll)
        + display_width(pane);

    // Message first, server name only if there's room
    let available = width.saturating_sub(left_width + 2);
    let message = if state.status.message.is_empty() {
        String::new()
    } else {
        truncate_to_width(&state.status.message, available)
    };
    let server_room = available.saturating_sub(display_width(&message) + 3);
    let server = if server_room >= 12 {
        format!(" │ {}", truncate_to_width(&state.server, server_room))
    } else {
        String::new()
    };

    let right_width = display_width(&message) + display_width(&server) + 1;
    let padding = " ".repeat(width.saturating_sub(left_width + right_width));

    let mut spans = vec![Span::styled(indicator, indicator_style)];
    if !error_indicator.is_empty() {
        spans.push(Span::styled(error_indicator, Theme::status_failed()));
    }
    spans.extend([
        Span::styled(title, style),
        Span::styled(poll, style),
        Span::styled(pane, style),
        Span::styled(padding, style),
        Span::styled(message, style),
        Span::styled(server, Theme::status_muted()),
        Span::styled(" ", style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}

/// e.g. "3 running · every 6s" or "idle"
fn poll_summary(poll: &PollStatus) -> String {
    let running = match poll.running {
        None => return "checking...".to_string(),
        Some(0) => "idle".to_string(),
        Some(n) => format!("{} running", n),
    };
    match poll.phase {
        SchedulerPhase::Idle => running,
        SchedulerPhase::Scheduled | SchedulerPhase::Executing => {
            format!("{} · every {}", running, format_interval(poll.interval))
        }
    }
}

fn format_interval(interval: Duration) -> String {
    let ms = interval.as_millis();
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{:.1}s", interval.as_secs_f64())
    }
}

/// Get an animated spinner character for loading states
pub fn spinner_char() -> char {
    const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    SPINNER[(millis / SPINNER_FRAME_MS) as usize % SPINNER.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(running: Option<usize>, phase: SchedulerPhase, ms: u64) -> PollStatus {
        PollStatus {
            running,
            interval: Duration::from_millis(ms),
            phase,
            polling: false,
            polls: 1,
        }
    }

    #[test]
    fn test_poll_summary() {
        assert_eq!(
            poll_summary(&poll(None, SchedulerPhase::Idle, 3000)),
            "checking..."
        );
        assert_eq!(poll_summary(&poll(Some(0), SchedulerPhase::Idle, 3000)), "idle");
        assert_eq!(
            poll_summary(&poll(Some(2), SchedulerPhase::Scheduled, 6000)),
            "2 running · every 6s"
        );
        assert_eq!(
            poll_summary(&poll(Some(1), SchedulerPhase::Executing, 4500)),
            "1 running · every 4.5s"
        );
    }
}
