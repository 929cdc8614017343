//! User-facing printing.
//! Consistent colored prefixes on a TTY, plain text otherwise. Primary
//! outputs that scripts consume (plan lines, listing rows) go through
//! `print_user` with no prefix.

use owo_colors::OwoColorize;

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Plain user-facing line (no prefix); the scriptable surface.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// A dim step-by-step line ("  3/6 shrink source volume: lvreduce ...").
pub fn print_step(index: usize, total: usize, title: &str, detail: &str) {
    let line = format!("  {index}/{total} {title}: {detail}");
    if is_tty() {
        println!("{}", line.dimmed());
    } else {
        println!("{}", line);
    }
}

/// Render rows as aligned columns for `--list` style output.
pub fn print_columns(rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }
    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i + 1 == row.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
            }
        }
        print_user(line.trim_end());
    }
}
