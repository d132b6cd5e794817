//! Batch grouping and row layout for the task history

use std::collections::HashMap;

use crate::api::TaskSummary;

/// Rows taken by a standalone task: header, prompt, separator
const SINGLE_TASK_ROWS: usize = 3;

/// One rendered unit: a standalone task or a whole batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub batch_id: Option<String>,
    pub tasks: Vec<TaskSummary>,
    pub top: usize,
}

impl TaskGroup {
    pub fn is_batch(&self) -> bool {
        self.batch_id.is_some()
    }

    pub fn height(&self) -> usize {
        if self.is_batch() {
            // header, one row per task, separator
            self.tasks.len() + 2
        } else {
            SINGLE_TASK_ROWS
        }
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height()
    }

    pub fn representative(&self) -> &str {
        self.tasks
            .first()
            .map(|task| task.task_id.as_str())
            .unwrap_or_default()
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.task_id == task_id)
    }

    pub fn completed(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| !task.task_status.is_running())
            .count()
    }
}

/// Ordered groups plus the authoritative task/batch -> group index
#[derive(Debug, Default)]
pub struct GroupedTasks {
    groups: Vec<TaskGroup>,
    by_task: HashMap<String, usize>,
    by_batch: HashMap<String, usize>,
    total_height: usize,
}

impl GroupedTasks {
    pub fn groups(&self) -> &[TaskGroup] {
        &self.groups
    }

    pub fn task_count(&self) -> usize {
        self.by_task.len()
    }

    pub fn total_height(&self) -> usize {
        self.total_height
    }

    pub fn group_of_task(&self, task_id: &str) -> Option<usize> {
        self.by_task.get(task_id).copied()
    }

    pub fn group_of_batch(&self, batch_id: &str) -> Option<usize> {
        self.by_batch.get(batch_id).copied()
    }

    /// Append one page of tasks. Tasks already present (the list shifts as
    /// new jobs are prepended) are dropped; batch members join their batch.
    pub fn append(&mut self, tasks: Vec<TaskSummary>) {
        for task in tasks {
            if self.by_task.contains_key(&task.task_id) {
                continue;
            }

            let group = match task.batch_id.as_deref() {
                Some(batch_id) => match self.by_batch.get(batch_id) {
                    Some(&existing) => existing,
                    None => {
                        self.by_batch.insert(batch_id.to_string(), self.groups.len());
                        self.push_group(Some(batch_id.to_string()))
                    }
                },
                None => self.push_group(None),
            };

            self.by_task.insert(task.task_id.clone(), group);
            self.groups[group].tasks.push(task);
        }

        for group in &mut self.groups {
            group.tasks.sort_by_key(|task| task.batch_index.unwrap_or(u32::MAX));
        }
        self.layout();
    }

    fn push_group(&mut self, batch_id: Option<String>) -> usize {
        self.groups.push(TaskGroup {
            batch_id,
            tasks: Vec::new(),
            top: 0,
        });
        self.groups.len() - 1
    }

    fn layout(&mut self) {
        let mut top = 0;
        for group in &mut self.groups {
            group.top = top;
            top += group.height();
        }
        self.total_height = top;
    }

    /// Tasks in groups that start above `row`
    pub fn tasks_above(&self, row: usize) -> usize {
        let end = self.groups.partition_point(|group| group.top < row);
        self.groups[..end].iter().map(|group| group.tasks.len()).sum()
    }

    /// Groups overlapping rows `[top, top + height)`
    pub fn visible(&self, top: usize, height: usize) -> &[TaskGroup] {
        let bottom = top + height;
        let start = self.groups.partition_point(|group| group.bottom() <= top);
        let end = self.groups.partition_point(|group| group.top < bottom);
        &self.groups[start..end.max(start)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TaskStatus;

    fn task(id: &str, batch: Option<(&str, u32)>) -> TaskSummary {
        TaskSummary {
            task_id: id.to_string(),
            task_status: TaskStatus::Succeeded,
            batch_id: batch.map(|(b, _)| b.to_string()),
            batch_index: batch.map(|(_, i)| i),
            batch_total: batch.map(|_| 3),
            prompt: None,
            model: None,
            created_at: None,
        }
    }

    #[test]
    fn test_batches_collapse_into_one_group() {
        let mut grouped = GroupedTasks::default();
        grouped.append(vec![
            task("a", None),
            task("b2", Some(("b", 2))),
            task("b1", Some(("b", 1))),
            task("c", None),
        ]);

        let groups = grouped.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].tasks.len(), 2);
        assert_eq!(groups[1].tasks[0].task_id, "b1");
        assert_eq!(groups[1].top, 3);
        assert_eq!(groups[1].height(), 4);
        assert_eq!(groups[2].top, 7);
        assert_eq!(grouped.total_height(), 10);
        assert_eq!(grouped.group_of_task("b2"), Some(1));
        assert_eq!(grouped.group_of_batch("b"), Some(1));
    }

    #[test]
    fn test_shifted_duplicates_and_split_batches() {
        let mut grouped = GroupedTasks::default();
        grouped.append(vec![task("a", None), task("b1", Some(("b", 1)))]);
        grouped.append(vec![task("b1", Some(("b", 1))), task("b2", Some(("b", 2))), task("d", None)]);

        assert_eq!(grouped.groups().len(), 3);
        assert_eq!(grouped.task_count(), 4);
        assert_eq!(grouped.groups()[1].tasks.len(), 2);
    }

    #[test]
    fn test_visible_groups() {
        let mut grouped = GroupedTasks::default();
        grouped.append((0..10).map(|i| task(&format!("t{}", i), None)).collect());

        let visible = grouped.visible(4, 6);
        let ids: Vec<_> = visible.iter().map(|g| g.representative()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        assert!(grouped.visible(100, 10).is_empty());
        assert_eq!(grouped.visible(0, 1).len(), 1);
    }

    #[test]
    fn test_tasks_above_counts_whole_groups() {
        let mut grouped = GroupedTasks::default();
        grouped.append(vec![
            task("a", None),
            task("b1", Some(("b", 1))),
            task("b2", Some(("b", 2))),
            task("c", None),
        ]);

        assert_eq!(grouped.tasks_above(0), 0);
        assert_eq!(grouped.tasks_above(3), 1);
        // Any row inside the batch counts the whole batch
        assert_eq!(grouped.tasks_above(4), 3);
        assert_eq!(grouped.tasks_above(100), 4);
    }
}
