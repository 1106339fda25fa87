//! Cancellable tasks keyed by the render clock.

/// Handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Work the engine defers until the render clock reaches a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// The release fade has finished; force silence and go idle.
    FinalizeRelease,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: Vec<(TaskId, f64, Task)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run once the clock reaches `due`.
    pub fn schedule(&mut self, due: f64, task: Task) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push((id, due, task));
        id
    }

    /// Removes a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(task_id, _, _)| *task_id != id);
        self.tasks.len() != before
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|(task_id, _, _)| *task_id == id)
    }

    /// Number of tasks scheduled but not yet taken or cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: f64) -> Vec<(TaskId, Task)> {
        let mut due: Vec<(TaskId, f64, Task)> = Vec::new();
        self.tasks.retain(|&entry| {
            if entry.1 <= now {
                due.push(entry);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.1.total_cmp(&b.1));
        due.into_iter().map(|(id, _, task)| (id, task)).collect()
    }

    /// Drops every pending task without running it.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
