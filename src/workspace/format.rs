//! Format workspace command results as text or JSON.

use crate::merge::MergeBlock;
use crate::types::format_millis;
use crate::workspace::types::{
    ChangesResult, CommitResult, DiffResult, FileDiffKind, LogResult, LsResult, StatusResult,
    SwitchResult, TrackingResult, UpdateResult,
};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Pretty JSON for any serializable result.
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn flag(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn format_changes_text(data: &ChangesResult) -> String {
    let changes = &data.changes;
    if changes.is_empty() {
        return format!("No changes against b{}/r{}.\n", data.branch, data.revision);
    }
    let mut out = String::new();
    for path in changes.additions.keys() {
        out.push_str(&format!("{} {}\n", "A".green(), path));
    }
    for path in changes.deletions.keys() {
        out.push_str(&format!("{} {}\n", "D".red(), path));
    }
    for path in changes.modifications.keys() {
        out.push_str(&format!("{} {}\n", "M".yellow(), path));
    }
    out.push_str(&format!(
        "\n{} added, {} deleted, {} modified against b{}/r{}.\n",
        changes.additions.len(),
        changes.deletions.len(),
        changes.modifications.len(),
        data.branch,
        data.revision
    ));
    out
}

fn push_lines(out: &mut String, prefix: &str, start: usize, lines: &[String], colored: fn(&str) -> String) {
    for (offset, line) in lines.iter().enumerate() {
        out.push_str(&colored(&format!("{:>5} {} {}", start + offset + 1, prefix, line)));
        out.push('\n');
    }
}

pub fn format_diff_text(data: &DiffResult) -> String {
    if data.files.is_empty() {
        return format!("No differences against b{}/r{}.\n", data.branch, data.revision);
    }
    let mut out = String::new();
    for file in &data.files {
        match &file.kind {
            FileDiffKind::Added => out.push_str(&format!("{} {}\n", "ADD".green(), file.path)),
            FileDiffKind::Deleted => out.push_str(&format!("{} {}\n", "DEL".red(), file.path)),
            FileDiffKind::Binary => {
                out.push_str(&format!("{} {} (binary)\n", "MOD".yellow(), file.path))
            }
            FileDiffKind::LineEndingsOnly => out.push_str(&format!(
                "{} {} (line endings differ)\n",
                "MOD".yellow(),
                file.path
            )),
            FileDiffKind::TimestampOnly => out.push_str(&format!(
                "{} {} (only timestamp differs)\n",
                "MOD".yellow(),
                file.path
            )),
            FileDiffKind::Changed(blocks) => {
                out.push_str(&format!("{} {}\n", "MOD".yellow(), file.path));
                for block in blocks {
                    match block {
                        MergeBlock::Keep { .. } => {}
                        MergeBlock::Insert { line, lines } => {
                            push_lines(&mut out, "+", *line, lines, |s| s.green().to_string())
                        }
                        MergeBlock::Remove { line, lines } => {
                            push_lines(&mut out, "-", *line, lines, |s| s.red().to_string())
                        }
                        MergeBlock::Replace {
                            line,
                            replaced,
                            replacement,
                        } => {
                            push_lines(&mut out, "-", *line, replaced, |s| s.red().to_string());
                            push_lines(&mut out, "+", *line, replacement, |s| {
                                s.green().to_string()
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

pub fn format_status_text(data: &StatusResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Repository")));
    out.push_str(&format!("  Root: {}\n", data.root.display()));
    let mode = if data.picky {
        "picky"
    } else if data.track {
        "track"
    } else {
        "simple"
    };
    out.push_str(&format!("  Mode: {}\n", mode));
    out.push_str(&format!("  Strict: {}\n", flag(data.strict)));
    out.push_str(&format!("  Compress: {}\n", flag(data.compress)));
    out.push_str(&format!(
        "  Current: b{}/r{}\n",
        data.branch, data.revision
    ));
    out.push_str(&format!(
        "  Pending: {} added, {} deleted, {} modified\n\n",
        data.pending_additions, data.pending_deletions, data.pending_modifications
    ));

    out.push_str(&format!("{}\n\n", format_section_heading("Branches")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["", "Branch", "Name", "Revisions", "In sync", "Created"]);
    for row in &data.branches {
        table.add_row(vec![
            if row.current { "*" } else { "" }.to_string(),
            row.number.to_string(),
            row.name.clone().unwrap_or_else(|| "-".to_string()),
            row.revisions.to_string(),
            if row.in_sync { "yes" } else { "no" }.to_string(),
            format_millis(row.ctime),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    if data.track || data.picky {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Tracked patterns")));
        if data.tracked.is_empty() {
            out.push_str("  (none)\n");
        }
        for pattern in &data.tracked {
            out.push_str(&format!("  {}\n", pattern));
        }
    }
    out
}

pub fn format_log_text(data: &LogResult) -> String {
    let mut out = String::new();
    let title = match &data.name {
        Some(name) => format!("Branch {} ({})", data.branch, name),
        None => format!("Branch {}", data.branch),
    };
    out.push_str(&format!("{}\n\n", format_section_heading(&title)));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Rev", "Time", "+", "-", "~", "Message"]);
    for entry in &data.entries {
        let message = entry.message.clone().unwrap_or_default();
        let message = if entry.tagged {
            format!("{} [tag]", message)
        } else {
            message
        };
        table.add_row(vec![
            entry.revision.to_string(),
            format_millis(entry.ctime),
            entry.additions.to_string(),
            entry.deletions.to_string(),
            entry.modifications.to_string(),
            message,
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_ls_text(data: &LsResult) -> String {
    let mut out = String::new();
    for entry in &data.entries {
        out.push_str(&format!("{} {}\n", entry.marker.symbol(), entry.path));
    }
    out
}

pub fn format_commit_text(data: &CommitResult) -> String {
    let mut out = format!(
        "Created revision b{}/r{} ({} added, {} deleted, {} modified)",
        data.branch, data.revision, data.additions, data.deletions, data.modifications
    );
    if data.bytes_read > 0 && data.bytes_written != data.bytes_read {
        out.push_str(&format!(
            ", stored {} of {} bytes",
            data.bytes_written, data.bytes_read
        ));
    }
    if data.tagged {
        out.push_str(", tagged");
    }
    out
}

pub fn format_switch_text(data: &SwitchResult) -> String {
    format!(
        "Switched to b{}/r{} ({} file(s) touched)",
        data.branch, data.revision, data.files_touched
    )
}

pub fn format_update_text(data: &UpdateResult) -> String {
    let mut out = format!(
        "Updated from b{}/r{}: {} restored, {} removed, {} merged, {} kept",
        data.branch, data.revision, data.restored, data.removed, data.merged, data.kept
    );
    if data.patterns_added > 0 {
        out.push_str(&format!(", {} tracking pattern(s) added", data.patterns_added));
    }
    out
}

pub fn format_tracking_text(data: &TrackingResult) -> String {
    let mut out = format!("Tracking patterns of branch {}:\n", data.branch);
    for pattern in &data.patterns {
        out.push_str(&format!("  {}\n", pattern));
    }
    if data.moved > 0 {
        out.push_str(&format!("Moved {} file(s).\n", data.moved));
    }
    out
}
