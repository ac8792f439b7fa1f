// File: ./src/model/parser.rs
//! Line scanner for the checkbox / time-block dialect.
//!
//! Accepted lines (leading whitespace only matters for tasks):
//!
//! ```text
//! task:       <ws>* or -<ws>+[ |x|X]<ws>+<content>
//! time-block: <ws>+<ws>+[ |x|X]<ws>*[H:MM<ws>+]<content>
//! ```
//!
//! Anything else is ordinary text and is skipped. Parsing never fails.
use crate::dates::{format_date, is_time_token};
use crate::model::item::{
    DEFAULT_BLOCK_DURATION_MINS, ParsedDocument, Task, TimeBlock, new_id,
};
use chrono::NaiveDate;

pub(crate) const TASK_MARKERS: &[char] = &['*', '-'];
pub(crate) const TIME_BLOCK_MARKERS: &[char] = &['+'];

/// Two columns of leading whitespace make one indent level.
pub const INDENT_WIDTH: usize = 2;

/// Location of a `<marker> [?]` prefix inside one line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CheckboxLine<'a> {
    pub indent: usize,
    pub checked: bool,
    /// Byte offset of the state character between the brackets.
    pub state_offset: usize,
    /// Everything after the closing bracket.
    pub rest: &'a str,
}

impl CheckboxLine<'_> {
    /// Byte offset just past the closing bracket.
    pub fn prefix_end(&self) -> usize {
        self.state_offset + 2
    }
}

pub(crate) fn match_checkbox<'a>(line: &'a str, markers: &[char]) -> Option<CheckboxLine<'a>> {
    let body = line.trim_start();
    let indent = line[..line.len() - body.len()].chars().count();

    let marker = body.chars().next()?;
    if !markers.contains(&marker) {
        return None;
    }
    let after_marker = &body[marker.len_utf8()..];
    let after_ws = after_marker.trim_start();
    if after_ws.len() == after_marker.len() {
        return None;
    }

    let inner = after_ws.strip_prefix('[')?;
    let checked = match inner.chars().next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = inner[1..].strip_prefix(']')?;

    Some(CheckboxLine {
        indent,
        checked,
        state_offset: line.len() - inner.len(),
        rest,
    })
}

/// Splits a leading `H:MM`/`HH:MM` token followed by whitespace off `s`.
///
/// Mirrors `(\d{1,2}:\d{2}\s+)?(.+)`: the token only counts when at least
/// one character remains for the content afterwards.
pub(crate) fn split_time_prefix(s: &str) -> Option<(&str, &str)> {
    let split = s.find(char::is_whitespace)?;
    let (token, tail) = s.split_at(split);
    if !is_time_token(token) {
        return None;
    }
    let content = tail.trim_start();
    let ws_count = tail[..tail.len() - content.len()].chars().count();
    if content.is_empty() && ws_count < 2 {
        return None;
    }
    Some((token, content))
}

/// Content of a task line: `\s+(.+)` after the bracket.
fn task_content(rest: &str) -> Option<&str> {
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_whitespace() || chars.as_str().is_empty() {
        return None;
    }
    Some(rest.trim())
}

fn parse_time_block(line: &str, line_number: usize) -> Option<TimeBlock> {
    let cb = match_checkbox(line, TIME_BLOCK_MARKERS)?;
    if cb.rest.is_empty() {
        return None;
    }
    let (start_time, content) = match split_time_prefix(cb.rest.trim_start()) {
        Some((time, content)) => (Some(time.to_string()), content.trim()),
        None => (None, cb.rest.trim()),
    };
    Some(TimeBlock {
        id: new_id(),
        content: content.to_string(),
        completed: cb.checked,
        start_time,
        duration: DEFAULT_BLOCK_DURATION_MINS,
        line_number,
    })
}

fn parse_task(line: &str, line_number: usize, created_date: &str) -> Option<Task> {
    let cb = match_checkbox(line, TASK_MARKERS)?;
    let content = task_content(cb.rest)?;

    let (scheduled_time, content) = match split_time_prefix(content) {
        Some((time, rest)) => (Some(time.to_string()), rest),
        None => (None, content),
    };

    Some(Task {
        id: new_id(),
        content: content.to_string(),
        completed: cb.checked,
        line_number,
        created_date: created_date.to_string(),
        scheduled_time,
        indent_level: cb.indent / INDENT_WIDTH,
        parent_id: None,
    })
}

/// Parse raw text into tasks and time-blocks.
///
/// Line numbers are 1-based. A line is tried as a time-block first; it can
/// never be both. The parent of an indented task is the nearest earlier task
/// on the stack with a strictly smaller indent level.
pub fn parse(raw_text: &str, document_date: NaiveDate) -> ParsedDocument {
    let created_date = format_date(document_date);
    let mut tasks: Vec<Task> = Vec::new();
    let mut time_blocks = Vec::new();
    // (task id, indent level)
    let mut stack: Vec<(String, usize)> = Vec::new();

    for (index, raw_line) in raw_text.split('\n').enumerate() {
        let line_number = index + 1;
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if let Some(block) = parse_time_block(line, line_number) {
            time_blocks.push(block);
            continue;
        }

        let Some(mut task) = parse_task(line, line_number, &created_date) else {
            continue;
        };

        let level = task.indent_level;
        if level > 0 {
            task.parent_id = stack
                .iter()
                .rev()
                .find(|(_, l)| *l < level)
                .map(|(id, _)| id.clone());
        }

        stack.push((task.id.clone(), level));
        while stack.len() > 1 && stack[stack.len() - 2].1 >= level {
            let idx = stack.len() - 2;
            stack.remove(idx);
        }

        tasks.push(task);
    }

    ParsedDocument {
        date: document_date,
        tasks,
        time_blocks,
    }
}

/// Incomplete tasks with non-empty content, in line order.
pub fn extract_incomplete_tasks(raw_text: &str, document_date: NaiveDate) -> Vec<Task> {
    parse(raw_text, document_date)
        .tasks
        .into_iter()
        .filter(Task::is_outstanding)
        .collect()
}
