//! Dependency index: the board's list of selectable "depends on" targets.
//!
//! The index is derived data. It is rebuilt wholesale when the set of tasks or
//! their labels change and is never patched for unrelated field edits. Task
//! records themselves are not touched when a task disappears, so a task may
//! keep a stale dependency id until it is next edited and saved.

use crate::types::{DependencyOption, Task, TaskId};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    options: Vec<DependencyOption>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index with options read from a store
    pub fn rebuild(&mut self, options: Vec<DependencyOption>) {
        debug!(count = options.len(), "rebuilt dependency index");
        self.options = options;
    }

    /// Replace the index with one option per task in `tasks`
    pub fn rebuild_from_tasks<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        self.rebuild(tasks.into_iter().map(DependencyOption::from).collect());
    }

    /// Drop a single entry immediately, ahead of the next rebuild
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.options.len();
        self.options.retain(|o| &o.id != id);
        before != self.options.len()
    }

    pub fn options(&self) -> &[DependencyOption] {
        &self.options
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.options.iter().any(|o| &o.id == id)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Candidate targets for the task being edited, which never lists itself
    pub fn candidates_for(&self, editing: Option<&TaskId>) -> Vec<&DependencyOption> {
        self.options
            .iter()
            .filter(|o| Some(&o.id) != editing)
            .collect()
    }

    /// Labels of the indexed tasks among `ids`. Ids no longer indexed are skipped.
    pub fn labels_for(&self, ids: &[TaskId]) -> Vec<&DependencyOption> {
        self.options.iter().filter(|o| ids.contains(&o.id)).collect()
    }
}

/// Whether two dependency selections differ, ignoring order
pub fn dependency_set_changed(previous: &[TaskId], current: &[TaskId]) -> bool {
    let mut previous = previous.to_vec();
    let mut current = current.to_vec();
    previous.sort();
    current.sort();
    previous != current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DependencyIndex {
        let mut index = DependencyIndex::new();
        index.rebuild(vec![
            DependencyOption::new("1", "Design"),
            DependencyOption::new("2", "Build"),
            DependencyOption::new("3", "Ship"),
        ]);
        index
    }

    #[test]
    fn test_candidates_exclude_task_being_edited() {
        let index = index();
        let ids: Vec<_> = index
            .candidates_for(Some(&TaskId::from("2")))
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(index.candidates_for(None).len(), 3);
    }

    #[test]
    fn test_remove_drops_candidate() {
        let mut index = index();
        assert!(index.remove(&TaskId::from("1")));
        assert!(!index.remove(&TaskId::from("1")));
        assert!(!index.contains(&TaskId::from("1")));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_labels_skip_stale_ids() {
        let index = index();
        let labels: Vec<_> = index
            .labels_for(&[TaskId::from("3"), TaskId::from("99")])
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Ship"]);
    }

    #[test]
    fn test_rebuild_replaces_every_option() {
        let mut index = index();
        index.rebuild_from_tasks(&[Task::new("9", "Only", "c")]);
        assert_eq!(index.len(), 1);
        assert!(!index.contains(&TaskId::from("1")));
        assert_eq!(index.options()[0].label, "Only");
    }

    #[test]
    fn test_dependency_set_changed_ignores_order() {
        let a = vec![TaskId::from("1"), TaskId::from("2")];
        let b = vec![TaskId::from("2"), TaskId::from("1")];
        assert!(!dependency_set_changed(&a, &b));
        assert!(dependency_set_changed(&a, &[TaskId::from("1")]));
        assert!(!dependency_set_changed(&[], &[]));
    }
}
