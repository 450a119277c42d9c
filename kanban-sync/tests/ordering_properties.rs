//! Property-based tests for the ordering engine.

use kanban_sync::types::is_dense;
use kanban_sync::{Column, ColumnId, OrderingEngine, Task, TaskId};
use proptest::prelude::*;

fn engine(a_len: usize, b_len: usize) -> OrderingEngine {
    let tasks = |prefix: &str, column: &str, len: usize| -> Vec<Task> {
        (0..len)
            .map(|i| Task::new(format!("{prefix}{i}"), format!("Task {i}"), column).with_position(i))
            .collect()
    };
    OrderingEngine::from_columns(vec![
        Column::new("A", "Todo").with_tasks(tasks("a", "A", a_len)),
        Column::new("B", "Done").with_tasks(tasks("b", "B", b_len)),
    ])
}

fn order(engine: &OrderingEngine, column: &str) -> Vec<TaskId> {
    engine.column_order(&ColumnId::from(column)).unwrap_or_default()
}

fn sorted(mut ids: Vec<TaskId>) -> Vec<TaskId> {
    ids.sort();
    ids
}

proptest! {
    #[test]
    fn reorders_preserve_membership(
        len in 1usize..12,
        moves in prop::collection::vec((0usize..12, 0usize..12), 0..24),
    ) {
        let mut engine = engine(len, 0);
        let column = ColumnId::from("A");
        let before = sorted(order(&engine, "A"));

        for (from, to) in moves {
            let current = order(&engine, "A");
            let (from, to) = (&current[from % len], &current[to % len]);
            engine.reorder_within_column(&column, from, to);
        }

        let after = order(&engine, "A");
        prop_assert_eq!(after.len(), len);
        prop_assert_eq!(sorted(after), before);
        prop_assert!(is_dense(&engine.column(&column).unwrap().tasks));
    }

    #[test]
    fn reorder_places_task_at_target_index(
        len in 2usize..12,
        from in 0usize..12,
        to in 0usize..12,
    ) {
        let mut engine = engine(len, 0);
        let current = order(&engine, "A");
        let (from, to) = (from % len, to % len);
        prop_assume!(from != to);

        let update = engine
            .reorder_within_column(&ColumnId::from("A"), &current[from], &current[to])
            .unwrap();

        let mut expected = current.clone();
        let moved = expected.remove(from);
        expected.insert(to, moved);
        prop_assert_eq!(&update.task_ids, &expected);
        prop_assert_eq!(order(&engine, "A"), expected);
    }

    #[test]
    fn self_drop_changes_nothing(len in 1usize..12, index in 0usize..12) {
        let mut engine = engine(len, 3);
        let before = (order(&engine, "A"), order(&engine, "B"));
        let task = before.0[index % len].clone();
        let column = ColumnId::from("A");

        prop_assert!(engine.reorder_within_column(&column, &task, &task).is_none());
        prop_assert!(engine.move_between_columns(&column, &task, &column, None).is_empty());
        prop_assert_eq!((order(&engine, "A"), order(&engine, "B")), before);
    }

    #[test]
    fn move_out_and_back_restores_both_columns(
        a_len in 1usize..10,
        b_len in 0usize..10,
        index in 0usize..10,
        slot in 0usize..11,
    ) {
        let mut engine = engine(a_len, b_len);
        let (a, b) = (ColumnId::from("A"), ColumnId::from("B"));
        let original = (order(&engine, "A"), order(&engine, "B"));
        let index = index % a_len;
        let task = original.0[index].clone();
        let follower = original.0.get(index + 1).cloned();
        let before = original.1.get(slot % (b_len + 1)).cloned();

        let updates = engine.move_between_columns(&a, &task, &b, before.as_ref());
        prop_assert_eq!(updates.len(), 2);
        prop_assert_eq!(updates[0].task_ids.len(), a_len - 1);
        prop_assert_eq!(updates[1].task_ids.len(), b_len + 1);
        prop_assert_eq!(updates[1].moved_task.as_ref(), Some(&task));
        prop_assert_eq!(engine.column_of(&task), Some(&b));

        engine.move_between_columns(&b, &task, &a, follower.as_ref());
        prop_assert_eq!((order(&engine, "A"), order(&engine, "B")), original);
        prop_assert_eq!(engine.task_count(), a_len + b_len);
    }
}
