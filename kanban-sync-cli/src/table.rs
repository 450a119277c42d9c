//! Table output for board listings.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kanban_sync::{Board, Column, DependencyOption, Member, Task};

pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

/// Truncate a string to `max` characters, appending "..." if truncated.
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn date_range(task: &Task) -> String {
    match (task.start_date, task.end_date) {
        (Some(start), Some(end)) => format!("{start} .. {end}"),
        (Some(start), None) => format!("{start} .."),
        (None, Some(end)) => format!(".. {end}"),
        (None, None) => String::new(),
    }
}

pub fn columns_table(columns: &[Column]) -> Table {
    let mut table = new_table(&["Column", "#", "Id", "Title", "Dates", "Depends on"]);
    for column in columns {
        if column.tasks.is_empty() {
            table.add_row(vec![
                column.title.clone(),
                String::new(),
                String::new(),
                "(empty)".to_string(),
                String::new(),
                String::new(),
            ]);
        }
        for task in &column.tasks {
            let deps: Vec<&str> = task.depends_on.iter().map(|d| d.as_str()).collect();
            table.add_row(vec![
                column.title.clone(),
                task.position.to_string(),
                task.id.to_string(),
                truncate_str(&task.title, 48),
                date_range(task),
                deps.join(", "),
            ]);
        }
    }
    table
}

pub fn candidates_table(options: &[&DependencyOption]) -> Table {
    let mut table = new_table(&["Id", "Title"]);
    for option in options {
        table.add_row(vec![option.id.to_string(), truncate_str(&option.label, 64)]);
    }
    table
}

pub fn boards_table(boards: &[Board]) -> Table {
    let mut table = new_table(&["Id", "Title", "Description"]);
    for board in boards {
        table.add_row(vec![
            board.id.to_string(),
            truncate_str(&board.title, 48),
            truncate_str(&board.description, 64),
        ]);
    }
    table
}

pub fn members_table(members: &[Member]) -> Table {
    let mut table = new_table(&["Id", "Username"]);
    for member in members {
        table.add_row(vec![member.id.to_string(), member.username.clone()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_columns_table_lists_empty_columns() {
        let columns = vec![
            Column::new("1", "Todo").with_tasks(vec![Task::new("10", "Dig", "1")]),
            Column::new("2", "Done"),
        ];
        let rendered = columns_table(&columns).to_string();
        assert!(rendered.contains("Dig"));
        assert!(rendered.contains("(empty)"));
    }
}
