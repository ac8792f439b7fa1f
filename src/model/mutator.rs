// File: ./src/model/mutator.rs
//! Line-targeted edits on raw note text.
//!
//! Every function here is a pure `&str -> String` transform. Line numbers come
//! from an earlier [`parse`](crate::model::parser::parse) and may be stale by
//! the time an edit is applied, so an out-of-range or non-matching line
//! returns the input unchanged instead of failing.
use crate::dates::is_time_token;
use crate::model::parser::{
    CheckboxLine, TASK_MARKERS, TIME_BLOCK_MARKERS, match_checkbox, split_time_prefix,
};

/// Applies `edit` to the 1-based `line_number`; `None` from `edit` means "leave as is".
fn edit_line<F>(text: &str, line_number: usize, edit: F) -> String
where
    F: FnOnce(&str) -> Option<String>,
{
    if line_number == 0 {
        return text.to_string();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    let Some(line) = lines.get(line_number - 1) else {
        return text.to_string();
    };
    match edit(line) {
        Some(new_line) => {
            lines[line_number - 1] = &new_line;
            lines.join("\n")
        }
        None => text.to_string(),
    }
}

fn flip_checkbox(line: &str, cb: CheckboxLine<'_>) -> String {
    let state = if cb.checked { " " } else { "x" };
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..cb.state_offset]);
    out.push_str(state);
    out.push_str(&line[cb.state_offset + 1..]);
    out
}

/// Flip `[ ]` <-> `[x]` on a `*`/`-` task line. Marker and spacing are kept.
pub fn toggle_task(text: &str, line_number: usize) -> String {
    edit_line(text, line_number, |line| {
        match_checkbox(line, TASK_MARKERS).map(|cb| flip_checkbox(line, cb))
    })
}

/// Flip `[ ]` <-> `[x]` on a `+` time-block line.
pub fn toggle_time_block(text: &str, line_number: usize) -> String {
    edit_line(text, line_number, |line| {
        match_checkbox(line, TIME_BLOCK_MARKERS).map(|cb| flip_checkbox(line, cb))
    })
}

/// Put `time` right after the checkbox of an open task, replacing any
/// existing leading time. Completed tasks are left alone.
///
/// The value is not range-checked, but it must have the `H:MM`/`HH:MM` shape:
/// anything else would not read back as a scheduled time and is ignored.
pub fn add_scheduled_time(text: &str, line_number: usize, time: &str) -> String {
    if !is_time_token(time) {
        return text.to_string();
    }
    edit_line(text, line_number, |line| {
        let cb = match_checkbox(line, TASK_MARKERS)?;
        if cb.checked {
            return None;
        }
        let body = leading_ws_content(cb.rest)?;
        let content = match split_time_prefix(body) {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => body,
        };
        Some(format!("{} {} {}", &line[..cb.prefix_end()], time, content))
    })
}

/// Drop the leading `HH:MM ` from a task line. No-op when there is none.
pub fn remove_scheduled_time(text: &str, line_number: usize) -> String {
    edit_line(text, line_number, |line| {
        let cb = match_checkbox(line, TASK_MARKERS)?;
        let body = leading_ws_content(cb.rest)?;
        let (_, content) = split_time_prefix(body)?;
        if content.is_empty() {
            return None;
        }
        Some(format!("{} {}", &line[..cb.prefix_end()], content))
    })
}

/// `\s+(.+)`: requires whitespace after the bracket and returns what follows it.
fn leading_ws_content(rest: &str) -> Option<&str> {
    let body = rest.trim_start();
    if body.len() == rest.len() || body.is_empty() {
        return None;
    }
    Some(body)
}

/// A line that starts a markdown section (`#`, `##`, ...).
pub fn is_section_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Insert `new_lines` under the section whose heading reads exactly
/// `section_header` (after trimming).
///
/// The insertion point is the first non-blank line after the heading, capped
/// at the next section heading. Without such a section the lines are
/// appended at the end of the document.
pub fn insert_lines_under_section(text: &str, section_header: &str, new_lines: &[String]) -> String {
    if new_lines.is_empty() {
        return text.to_string();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    let header = section_header.trim();

    let Some(header_idx) = lines.iter().position(|l| l.trim() == header) else {
        return new_lines
            .iter()
            .fold(text.to_string(), |acc, line| append_line(&acc, line));
    };

    let next_heading = lines[header_idx + 1..]
        .iter()
        .position(|l| is_section_heading(l))
        .map(|offset| header_idx + 1 + offset);

    let mut insert_idx = header_idx + 1;
    while insert_idx < lines.len() && lines[insert_idx].trim().is_empty() {
        insert_idx += 1;
    }
    if let Some(next) = next_heading {
        insert_idx = insert_idx.min(next);
    }

    lines.splice(insert_idx..insert_idx, new_lines.iter().map(String::as_str));
    lines.join("\n")
}

/// Single-line form of [`insert_lines_under_section`].
pub fn insert_under_section(text: &str, section_header: &str, new_line: &str) -> String {
    insert_lines_under_section(text, section_header, &[new_line.to_string()])
}

/// Append `line` as the last line of `text`, keeping a trailing newline if there was one.
pub fn append_line(text: &str, line: &str) -> String {
    if text.trim().is_empty() {
        line.to_string()
    } else if let Some(body) = text.strip_suffix('\n') {
        format!("{}\n{}\n", body, line)
    } else {
        format!("{}\n{}", text, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "# Monday\n\n## Tasks\n\n* [ ] Alpha\n  - [x] Beta\n\n## Time Blocks\n\n+ [ ] 09:00 Focus\n";

    #[test]
    fn test_toggle_task_both_ways() {
        let once = toggle_task(NOTE, 5);
        assert!(once.contains("* [x] Alpha"));
        let twice = toggle_task(&once, 5);
        assert_eq!(twice, NOTE);

        let beta = toggle_task(NOTE, 6);
        assert!(beta.contains("  - [ ] Beta"));
    }

    #[test]
    fn test_toggle_uppercase_x_unchecks() {
        assert_eq!(toggle_task("* [X] Done", 1), "* [ ] Done");
    }

    #[test]
    fn test_toggle_preserves_spacing_and_other_lines() {
        let text = "-   [ ]   spaced   \nkeep me\n* [ ] other";
        let out = toggle_task(text, 1);
        assert_eq!(out, "-   [x]   spaced   \nkeep me\n* [ ] other");
    }

    #[test]
    fn test_toggle_out_of_range_or_non_task_is_noop() {
        assert_eq!(toggle_task(NOTE, 0), NOTE);
        assert_eq!(toggle_task(NOTE, 999), NOTE);
        assert_eq!(toggle_task(NOTE, 1), NOTE);
        // Time-block lines are not tasks.
        assert_eq!(toggle_task(NOTE, 10), NOTE);
    }

    #[test]
    fn test_toggle_locality() {
        let a = toggle_task(NOTE, 5);
        let b = toggle_task(NOTE, 6);
        for (i, (orig, (la, lb))) in NOTE
            .split('\n')
            .zip(a.split('\n').zip(b.split('\n')))
            .enumerate()
        {
            if i != 4 {
                assert_eq!(orig, la);
            }
            if i != 5 {
                assert_eq!(orig, lb);
            }
        }
    }

    #[test]
    fn test_toggle_time_block() {
        let out = toggle_time_block(NOTE, 10);
        assert!(out.contains("+ [x] 09:00 Focus"));
        assert_eq!(toggle_time_block(&out, 10), NOTE);
        assert_eq!(toggle_time_block(NOTE, 5), NOTE);
    }

    #[test]
    fn test_add_and_remove_scheduled_time() {
        let text = "  * [ ] Call Sam";
        let scheduled = add_scheduled_time(text, 1, "10:30");
        assert_eq!(scheduled, "  * [ ] 10:30 Call Sam");

        let rescheduled = add_scheduled_time(&scheduled, 1, "14:00");
        assert_eq!(rescheduled, "  * [ ] 14:00 Call Sam");

        assert_eq!(remove_scheduled_time(&rescheduled, 1), text);
        assert_eq!(remove_scheduled_time(text, 1), text);
    }

    #[test]
    fn test_add_scheduled_time_skips_completed_and_stale() {
        assert_eq!(add_scheduled_time("* [x] Done", 1, "10:00"), "* [x] Done");
        assert_eq!(add_scheduled_time("* [ ] Open", 2, "10:00"), "* [ ] Open");
    }

    #[test]
    fn test_add_scheduled_time_checks_shape_not_range() {
        assert_eq!(add_scheduled_time("* [ ] Open", 1, "25:00"), "* [ ] 25:00 Open");
        assert_eq!(add_scheduled_time("* [ ] Open", 1, "noon"), "* [ ] Open");
        assert_eq!(add_scheduled_time("* [ ] Open", 1, "9:5"), "* [ ] Open");
    }

    #[test]
    fn test_remove_scheduled_time_on_completed_task() {
        assert_eq!(remove_scheduled_time("- [x] 8:00 Run", 1), "- [x] Run");
    }

    #[test]
    fn test_insert_under_section_skips_blank_lines() {
        let out = insert_under_section(NOTE, "## Tasks", "* [ ] Moved");
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines[2], "## Tasks");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "* [ ] Moved");
        assert_eq!(lines[5], "* [ ] Alpha");
    }

    #[test]
    fn test_insert_under_empty_section_lands_before_next_heading() {
        let text = "## Tasks\n\n\n## Notes\nfoo";
        let out = insert_under_section(text, "## Tasks", "* [ ] X");
        assert_eq!(out, "## Tasks\n\n\n* [ ] X\n## Notes\nfoo");
    }

    #[test]
    fn test_insert_under_section_at_end_of_document() {
        let out = insert_under_section("## Tasks", "## Tasks", "* [ ] X");
        assert_eq!(out, "## Tasks\n* [ ] X");
    }

    #[test]
    fn test_insert_block_keeps_order() {
        let lines = vec!["* [ ] One".to_string(), "* [ ] Two".to_string()];
        let out = insert_lines_under_section(NOTE, "  ## Tasks  ", &lines);
        let one = out.find("* [ ] One").unwrap();
        let two = out.find("* [ ] Two").unwrap();
        let alpha = out.find("* [ ] Alpha").unwrap();
        assert!(one < two && two < alpha);
    }

    #[test]
    fn test_insert_without_section_appends() {
        assert_eq!(insert_under_section("", "## Tasks", "* [ ] X"), "* [ ] X");
        assert_eq!(
            insert_under_section("notes\n", "## Tasks", "* [ ] X"),
            "notes\n* [ ] X\n"
        );
        assert_eq!(
            insert_under_section("notes", "## Tasks", "* [ ] X"),
            "notes\n* [ ] X"
        );
    }
}
