//! Task history pane: batch-grouped task rows

use chrono::{Local, NaiveDateTime};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::navigator::position_slice;
use super::theme::{Theme, borders, symbols};
use super::widgets::{format_created, single_line, truncate_to_width};
use crate::api::{TaskStatus, TaskSummary};
use crate::history::{GroupView, HistoryView};

pub fn render_history(frame: &mut Frame, area: Rect, view: &HistoryView, focused: bool) {
    let title = if view.total_tasks > view.loaded_tasks {
        format!(" History {}/{} ", view.loaded_tasks, view.total_tasks)
    } else {
        format!(" History ({}) ", view.loaded_tasks)
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

    if inner.height == 0 {
        return;
    }

    let Some(first) = view.groups.first() else {
        let (message, style) = if let Some(error) = &view.error {
            (format!(" Failed to load history: {}", error), Theme::status_failed())
        } else if view.loading || view.has_more {
            (" Loading history...".to_string(), Theme::text_muted())
        } else {
            (" No tasks".to_string(), Theme::text_muted())
        };
        frame.render_widget(Paragraph::new(message).style(style), inner);
        return;
    };

    let width = inner.width as usize;
    let now = Local::now().naive_local();
    let mut lines: Vec<Line> = Vec::new();
    for group in &view.groups {
        lines.extend(group_lines(group, width, now));
    }
    let at_end = view.scroll_top + inner.height as usize >= view.total_height;
    if at_end {
        if view.loading {
            lines.push(Line::styled(" Loading more...", Theme::text_muted()));
        } else if view.error.is_some() {
            lines.push(Line::styled(" Load failed, retry", Theme::status_failed()));
        }
    }

    let lines = position_slice(lines, first.top, view.scroll_top, inner.height as usize);
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Rows for one group; must match the group's height in the history layout
fn group_lines(group: &GroupView, width: usize, now: NaiveDateTime) -> Vec<Line<'static>> {
    let group_style = if group.highlighted {
        Theme::highlight()
    } else {
        Style::default()
    };

    match &group.batch_id {
        Some(batch_id) => {
            let mut lines = Vec::with_capacity(group.tasks.len() + 2);
            let counter = format!("{}/{}", group.completed, group.tasks.len());
            let title = truncate_to_width(
                &format!("Batch {}", batch_id),
                width.saturating_sub(counter.len() + 3),
            );
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", title), Theme::text_secondary().patch(group_style)),
                Span::styled(counter, Theme::batch_badge().patch(group_style)),
            ]));
            for (index, task) in group.tasks.iter().enumerate() {
                let style = if group.highlighted_task == Some(index) {
                    Theme::highlight()
                } else {
                    Style::default()
                };
                lines.push(task_line(task, "   ", width, style));
            }
            lines.push(Line::from(""));
            lines
        }
        None => {
            let Some(task) = group.tasks.first() else {
                return vec![Line::from(""); 3];
            };
            let prompt = task
                .prompt
                .as_deref()
                .map(single_line)
                .filter(|prompt| !prompt.is_empty())
                .unwrap_or_else(|| "(no prompt)".to_string());
            let created = task
                .created_at
                .as_deref()
                .and_then(|created_at| format_created(created_at, now))
                .map(|created| format!("{} · ", created))
                .unwrap_or_default();
            let prompt = truncate_to_width(
                &prompt,
                width.saturating_sub(4 + created.chars().count()),
            );
            vec![
                task_line(task, " ", width, group_style),
                Line::from(vec![
                    Span::styled(
                        format!("   {}", created),
                        Theme::text_secondary().patch(group_style),
                    ),
                    Span::styled(prompt, Theme::text_muted().patch(group_style)),
                ]),
                Line::from(""),
            ]
        }
    }
}

fn task_line(task: &TaskSummary, indent: &str, width: usize, extra: Style) -> Line<'static> {
    let status = task.task_status;
    let symbol = if status.is_running() {
        symbols::RUNNING
    } else {
        symbols::IDLE
    };
    let label = format!(" {}", status.label());
    let model = task
        .model
        .as_deref()
        .map(|model| format!(" · {}", model))
        .unwrap_or_default();

    let fixed = indent.chars().count() + 2 + label.chars().count();
    let id_width = width.saturating_sub(fixed + model.chars().count()).max(8);
    let task_id = truncate_to_width(&task.task_id, id_width);
    let model = truncate_to_width(
        &model,
        width.saturating_sub(fixed + task_id.chars().count()),
    );

    Line::from(vec![
        Span::styled(indent.to_string(), extra),
        Span::styled(format!("{} ", symbol), status_style(status).patch(extra)),
        Span::styled(task_id, Theme::text().patch(extra)),
        Span::styled(label, status_style(status).patch(extra)),
        Span::styled(model, Theme::text_muted().patch(extra)),
    ])
}

fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Pending | TaskStatus::Running => Theme::status_running(),
        TaskStatus::Succeeded => Theme::status_ok(),
        TaskStatus::Failed => Theme::status_failed(),
        TaskStatus::Canceled | TaskStatus::Unknown => Theme::status_muted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus) -> TaskSummary {
        TaskSummary {
            task_id: id.to_string(),
            task_status: status,
            batch_id: None,
            batch_index: None,
            batch_total: None,
            prompt: Some("a red\nfox".to_string()),
            model: None,
            created_at: None,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-10T18:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn group(batch_id: Option<&str>, tasks: Vec<TaskSummary>) -> GroupView {
        GroupView {
            top: 0,
            batch_id: batch_id.map(str::to_string),
            completed: tasks.iter().filter(|t| !t.task_status.is_running()).count(),
            tasks,
            highlighted: false,
            highlighted_task: None,
        }
    }

    #[test]
    fn test_group_lines_match_layout_heights() {
        let single = group(None, vec![task("t1", TaskStatus::Running)]);
        assert_eq!(group_lines(&single, 40, now()).len(), 3);

        let batch = group(
            Some("b1"),
            vec![
                task("t1", TaskStatus::Succeeded),
                task("t2", TaskStatus::Running),
                task("t3", TaskStatus::Failed),
            ],
        );
        let lines = group_lines(&batch, 40, now());
        assert_eq!(lines.len(), 5);
        assert!(lines[0].to_string().contains("2/3"));
    }

    #[test]
    fn test_single_task_shows_flattened_prompt() {
        let single = group(None, vec![task("t1", TaskStatus::Succeeded)]);
        let lines = group_lines(&single, 40, now());
        assert!(lines[0].to_string().contains("t1 done"));
        assert_eq!(lines[1].to_string().trim(), "a red fox");

        let mut dated = task("t2", TaskStatus::Running);
        dated.created_at = Some("2024-05-10T09:05:12.5".to_string());
        let lines = group_lines(&group(None, vec![dated]), 40, now());
        assert_eq!(lines[1].to_string().trim(), "09:05 · a red fox");
    }
}
