//! Terminal output: styled notes and plain tables for reports.

use storytalk_agent::UsageReport;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn styled(color: &str, symbol: &str, fallback: &str, msg: &str) -> String {
    if supports_color() {
        format!("{color}{BOLD}{symbol}{RESET} {msg}")
    } else {
        format!("{fallback}: {msg}")
    }
}

pub fn note_info(msg: &str) {
    println!("{}", styled(CYAN, "ℹ", "INFO", msg));
}

pub fn note_warn(msg: &str) {
    println!("{}", styled(YELLOW, "⚠", "WARN", msg));
}

pub fn note_error(msg: &str) {
    eprintln!("{}", styled(RED, "✗", "ERROR", msg));
}

pub fn note_success(msg: &str) {
    println!("{}", styled(GREEN, "✓", "OK", msg));
}

/// Speaker-labelled chat line.
pub fn chat_line(speaker: &str, text: &str) {
    if supports_color() {
        println!("{BOLD}{speaker}:{RESET} {text}");
    } else {
        println!("{speaker}: {text}");
    }
}

pub fn dim(text: &str) -> String {
    if supports_color() {
        format!("{DIM}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Left-aligned table with a dashed header rule.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.iter().map(|h| h.to_string()).collect());
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        out.push_str(&line(row.clone()));
    }
    out
}

pub fn render_usage(report: &UsageReport) -> String {
    let rows: Vec<Vec<String>> = report
        .stats
        .iter()
        .map(|stat| {
            vec![
                stat.timestamp.format("%H:%M:%S").to_string(),
                format!("{:?}", stat.kind).to_lowercase(),
                stat.topic.clone(),
                stat.level.clone(),
                stat.input_tokens.to_string(),
                stat.output_tokens.to_string(),
                format!("${:.6}", stat.cost),
            ]
        })
        .collect();

    let totals = report.totals;
    let mut out = render_table(
        &["time", "kind", "topic", "level", "in", "out", "cost"],
        &rows,
    );
    out.push_str(&format!(
        "\n  {} requests, {} tokens, ${:.4} total, ${:.6} average\n",
        totals.requests,
        totals.input_tokens + totals.output_tokens,
        totals.cost,
        totals.average_cost()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use storytalk_agent::UsageTotals;

    #[test]
    fn pads_columns_to_widest_cell() {
        let table = render_table(
            &["name", "n"],
            &[vec!["alice".into(), "42".into()], vec!["bo".into(), "7".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "  name   n");
        assert_eq!(lines[1], "  -----  --");
        assert_eq!(lines[2], "  alice  42");
        assert_eq!(lines[3], "  bo     7");
    }

    #[test]
    fn usage_report_has_totals_line() {
        let report = UsageReport {
            stats: Vec::new(),
            totals: UsageTotals {
                requests: 4,
                input_tokens: 900,
                output_tokens: 100,
                cost: 0.002,
            },
        };
        let out = render_usage(&report);
        assert!(out.contains("4 requests, 1000 tokens, $0.0020 total, $0.000500 average"));
    }
}
