// File: ./src/model/template.rs
// Default daily note body and the append-style insert helpers.
use crate::model::mutator::append_line;
use chrono::NaiveDate;

pub const TASKS_SECTION: &str = "## Tasks";
pub const TIME_BLOCKS_SECTION: &str = "## Time Blocks";

/// Canonical open-task line for `content`.
pub fn task_line(content: &str) -> String {
    format!("* [ ] {}", content)
}

pub fn time_block_line(content: &str, time: Option<&str>) -> String {
    match time {
        Some(t) => format!("+ [ ] {} {}", t, content),
        None => format!("+ [ ] {}", content),
    }
}

/// Append a new open task at the end of the note.
pub fn insert_task(text: &str, content: &str) -> String {
    append_line(text, &task_line(content))
}

/// Append a new time-block at the end of the note.
pub fn insert_time_block(text: &str, content: &str, time: Option<&str>) -> String {
    append_line(text, &time_block_line(content, time))
}

/// Body used when a daily log is created.
pub fn daily_note_template(date: NaiveDate) -> String {
    format!(
        "# {}\n\n## Today's Focus\n\n\n{}\n\n* [ ]\n\n\n{}\n\n\n## Notes\n\n",
        date.format("%A, %B %-d, %Y"),
        TASKS_SECTION,
        TIME_BLOCKS_SECTION
    )
}
