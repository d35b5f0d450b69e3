use crate::model::task::Task;

/// Task counts shown in the header and footer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn of(tasks: &[Task]) -> TaskStats {
        let completed = tasks.iter().filter(|t| t.completed).count();
        TaskStats {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }

    /// Completed share as a whole percentage, rounded half up; 0 for no tasks.
    pub fn completion_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Priority;
    use chrono::Utc;

    fn tasks(done: &[bool]) -> Vec<Task> {
        done.iter()
            .enumerate()
            .map(|(i, &completed)| Task {
                id: i.to_string(),
                title: format!("t{}", i),
                description: String::new(),
                priority: Priority::Medium,
                due_date: None,
                created_at: Utc::now(),
                completed,
                order: i,
            })
            .collect()
    }

    #[test]
    fn empty_list_has_zero_rate() {
        let stats = TaskStats::of(&[]);
        assert_eq!(stats, TaskStats::default());
        assert_eq!(stats.completion_rate(), 0);
    }

    #[test]
    fn counts_and_rounding() {
        let stats = TaskStats::of(&tasks(&[true, false, false]));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completion_rate(), 33);

        let stats = TaskStats::of(&tasks(&[true, true, false]));
        assert_eq!(stats.completion_rate(), 67);

        let stats = TaskStats::of(&tasks(&[true, false]));
        assert_eq!(stats.completion_rate(), 50);
    }
}
