//! Terminal UI utilities.
//!
//! - `separator` - BEGIN/END banners around toolchain output
//! - `Table` - box-drawn summary table sized to the terminal
//!
//! ## Example
//!
//! ```rust
//! use actionman::ui::Table;
//!
//! let mut table = Table::new(&["Build", "Status"]);
//! table.add_row(vec!["debug".to_string(), "PASS".to_string()]);
//! table.print();
//! ```

use colored::*;

const MAX_WIDTH: usize = 80;

fn term_width() -> usize {
    let (_rows, cols) = console::Term::stdout().size();
    (cols as usize).clamp(20, MAX_WIDTH)
}

/// Render a banner line: `===== message =====` filling `width` columns.
pub fn banner(message: &str, width: usize) -> String {
    if message.is_empty() {
        return "=".repeat(width);
    }
    let message = console::truncate_str(message, width.saturating_sub(4), "...");
    let len = console::measure_text_width(&message);
    let rest = width.saturating_sub(len + 2);
    let left = (rest / 2).max(1);
    let right = rest.saturating_sub(left).max(1);
    format!("{} {} {}", "=".repeat(left), message, "=".repeat(right))
}

/// Print a colored banner sized to the terminal.
pub fn separator(message: &str, color: Color) {
    let line = banner(message, term_width());
    println!("{}", line.color(color).bold());
}

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are ignored.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| console::measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(console::measure_text_width(&flatten(cell)));
            }
        }

        // Shrink the widest column until the table fits (never below 8).
        let overhead = 3 + 3 * widths.len();
        while overhead + widths.iter().sum::<usize>() > max_width {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= 8 {
                break;
            }
            widths[idx] -= 1;
        }

        let rule = |left: &str, mid: &str, right: &str| {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, cells.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(&flatten(cell), *width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            out
        };

        let mut out = vec![rule("┌", "┬", "┐"), line(&self.headers, true), rule("├", "┼", "┤")];
        out.extend(self.rows.iter().map(|row| line(row, false)));
        out.push(rule("└", "┴", "┘"));
        out.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render(term_width()));
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}
