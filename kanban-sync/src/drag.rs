//! Drag controller: turns pointer gestures into move intents.
//!
//! The controller never touches the board. A drag only has an effect once it
//! is dropped on a valid target, so cancelling is always side-effect free.

use crate::types::{ColumnId, TaskId};
use tracing::trace;

/// Something a dragged task can be dropped on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    /// The body of a column (empty space or an empty column)
    Column(ColumnId),
    /// A task card, identified together with its column
    Task { column: ColumnId, task: TaskId },
}

impl DragTarget {
    pub fn column(column: impl Into<ColumnId>) -> Self {
        Self::Column(column.into())
    }

    pub fn task(column: impl Into<ColumnId>, task: impl Into<TaskId>) -> Self {
        Self::Task {
            column: column.into(),
            task: task.into(),
        }
    }

    pub fn column_id(&self) -> &ColumnId {
        match self {
            Self::Column(column) | Self::Task { column, .. } => column,
        }
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::Column(_) => None,
            Self::Task { task, .. } => Some(task),
        }
    }

    /// Parse a handle identifier of the form `"{column}-{task}"` or `"{column}"`
    pub fn parse(handle: &str) -> Option<Self> {
        let mut parts = handle.split('-');
        let column = parts.next().filter(|s| !s.is_empty())?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(Self::column(column)),
            (Some(task), None) if !task.is_empty() => Some(Self::task(column, task)),
            _ => None,
        }
    }

    /// The handle identifier for this target
    pub fn handle(&self) -> String {
        match self {
            Self::Column(column) => column.to_string(),
            Self::Task { column, task } => format!("{column}-{task}"),
        }
    }
}

/// What the user asked for when the drag ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
    /// Reorder inside one column: put `from` where `to` is
    Reorder {
        column: ColumnId,
        from: TaskId,
        to: TaskId,
    },
    /// Move to another column, before `before` or at the end
    Transfer {
        source: ColumnId,
        task: TaskId,
        target: ColumnId,
        before: Option<TaskId>,
    },
}

/// Drag state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        column: ColumnId,
        task: TaskId,
        hover: Option<DragTarget>,
    },
}

/// How a drag finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Dropped(MoveIntent),
    Cancelled,
}

impl DragOutcome {
    pub fn intent(self) -> Option<MoveIntent> {
        match self {
            Self::Dropped(intent) => Some(intent),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// The task being dragged, for rendering an overlay
    pub fn active(&self) -> Option<(&ColumnId, &TaskId)> {
        match &self.state {
            DragState::Dragging { column, task, .. } => Some((column, task)),
            DragState::Idle => None,
        }
    }

    /// The current drop-target candidate, for visual feedback only
    pub fn hovered(&self) -> Option<&DragTarget> {
        match &self.state {
            DragState::Dragging { hover, .. } => hover.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Start dragging a task. Ignored while a drag is already in progress.
    pub fn pointer_down(&mut self, column: impl Into<ColumnId>, task: impl Into<TaskId>) -> bool {
        if self.is_dragging() {
            return false;
        }
        let (column, task) = (column.into(), task.into());
        trace!(%column, %task, "drag started");
        self.state = DragState::Dragging {
            column,
            task,
            hover: None,
        };
        true
    }

    pub fn hover(&mut self, target: Option<DragTarget>) {
        if let DragState::Dragging { hover, .. } = &mut self.state {
            *hover = target;
        }
    }

    /// Release the pointer over `target` (or over nothing)
    pub fn drop(&mut self, target: Option<DragTarget>) -> DragOutcome {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging { column, task, .. } = state else {
            return DragOutcome::Cancelled;
        };
        let Some(target) = target else {
            trace!(%task, "dropped outside any target");
            return DragOutcome::Cancelled;
        };

        let outcome = if target.column_id() == &column {
            match target.task_id() {
                Some(over) if over != &task => DragOutcome::Dropped(MoveIntent::Reorder {
                    column,
                    from: task,
                    to: over.clone(),
                }),
                _ => DragOutcome::Cancelled,
            }
        } else {
            DragOutcome::Dropped(MoveIntent::Transfer {
                source: column,
                task,
                target: target.column_id().clone(),
                before: target.task_id().cloned(),
            })
        };
        trace!(?outcome, "drag finished");
        outcome
    }

    /// Abort the drag (pointer released outside the board, escape key, ...)
    pub fn cancel(&mut self) -> DragOutcome {
        self.state = DragState::Idle;
        DragOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_on_task_in_same_column_reorders() {
        let mut drag = DragController::new();
        drag.pointer_down("a", "t1");
        let outcome = drag.drop(Some(DragTarget::task("a", "t3")));
        assert_eq!(
            outcome,
            DragOutcome::Dropped(MoveIntent::Reorder {
                column: "a".into(),
                from: "t1".into(),
                to: "t3".into(),
            })
        );
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn test_drop_in_other_column_transfers() {
        let mut drag = DragController::new();
        drag.pointer_down("a", "t1");
        assert_eq!(
            drag.drop(Some(DragTarget::task("b", "t3"))).intent(),
            Some(MoveIntent::Transfer {
                source: "a".into(),
                task: "t1".into(),
                target: "b".into(),
                before: Some("t3".into()),
            })
        );

        drag.pointer_down("a", "t2");
        assert_eq!(
            drag.drop(Some(DragTarget::column("b"))).intent(),
            Some(MoveIntent::Transfer {
                source: "a".into(),
                task: "t2".into(),
                target: "b".into(),
                before: None,
            })
        );
    }

    #[test]
    fn test_cancelled_drops() {
        let mut drag = DragController::new();

        drag.pointer_down("a", "t1");
        assert_eq!(drag.drop(None), DragOutcome::Cancelled);

        drag.pointer_down("a", "t1");
        assert_eq!(drag.drop(Some(DragTarget::task("a", "t1"))), DragOutcome::Cancelled);

        drag.pointer_down("a", "t1");
        assert_eq!(drag.drop(Some(DragTarget::column("a"))), DragOutcome::Cancelled);

        drag.pointer_down("a", "t1");
        assert_eq!(drag.cancel(), DragOutcome::Cancelled);
        assert!(!drag.is_dragging());

        assert_eq!(drag.drop(Some(DragTarget::column("b"))), DragOutcome::Cancelled);
    }

    #[test]
    fn test_hover_is_tracked_only_while_dragging() {
        let mut drag = DragController::new();
        drag.hover(Some(DragTarget::column("a")));
        assert!(drag.hovered().is_none());

        drag.pointer_down("a", "t1");
        assert!(!drag.pointer_down("b", "t9"));
        drag.hover(Some(DragTarget::column("b")));
        assert_eq!(drag.hovered(), Some(&DragTarget::column("b")));
        assert_eq!(drag.active(), Some((&"a".into(), &"t1".into())));
    }

    #[test]
    fn test_parse_handles() {
        assert_eq!(DragTarget::parse("4-17"), Some(DragTarget::task("4", "17")));
        assert_eq!(DragTarget::parse("4"), Some(DragTarget::column("4")));
        assert_eq!(DragTarget::parse(""), None);
        assert_eq!(DragTarget::parse("4-"), None);
        assert_eq!(DragTarget::parse("a-b-c"), None);
        assert_eq!(DragTarget::task("4", "17").handle(), "4-17");
    }
}
