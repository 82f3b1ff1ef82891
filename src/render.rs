//! Text rendering of the banner, transcript and history table.
//!
//! Functions return strings so the terminal front end and tests share them.

use crate::chat::HistoryView;
use crate::config::PresentationSettings;
use crate::session::Turn;
use console::style;

/// Render the branded header.
pub fn banner(settings: &PresentationSettings) -> String {
    let logo = settings.logo_text.trim();
    let width = logo.chars().count().max(settings.welcome.chars().count()) + 4;
    let rule = "═".repeat(width);

    format!(
        "{}\n  {}\n  {}\n{}",
        style(&rule).blue(),
        style(logo).bold().blue(),
        style(&settings.welcome).green(),
        style(&rule).blue()
    )
}

/// The turns to show, honouring an optional "last N" limit.
pub fn visible_turns(turns: &[Turn], limit: Option<usize>) -> &[Turn] {
    match limit {
        Some(n) if n < turns.len() => &turns[turns.len() - n..],
        _ => turns,
    }
}

/// Render one turn: the question, then the answer.
pub fn turn(turn: &Turn) -> String {
    format!(
        "{} {}\n{} {}",
        style("👤").yellow(),
        turn.question,
        style("🤖").cyan(),
        turn.answer
    )
}

/// Render the transcript in chronological order.
pub fn transcript(turns: &[Turn], limit: Option<usize>) -> String {
    let shown = visible_turns(turns, limit);
    let mut out = Vec::with_capacity(shown.len() + 1);

    if shown.len() < turns.len() {
        out.push(
            style(format!("({} earlier turns hidden)", turns.len() - shown.len()))
                .dim()
                .to_string(),
        );
    }
    out.extend(shown.iter().map(turn));
    out.join("\n\n")
}

/// Render a history view as a table. The session column appears only when
/// the rows carry session ids.
pub fn history_table(view: &HistoryView) -> String {
    if view.rows.is_empty() {
        return style("No chat history yet.").dim().to_string();
    }

    let with_session = view.rows.iter().any(|r| r.session_id.is_some());

    let mut header = Vec::new();
    if with_session {
        header.push("Session ID".to_string());
    }
    header.extend(["User Name", "Question", "Answer", "Timestamp"].map(String::from));

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            let mut cells = Vec::new();
            if with_session {
                cells.push(r.session_id.clone().unwrap_or_default());
            }
            cells.push(r.user_name.clone());
            cells.push(single_line(&r.question));
            cells.push(single_line(&r.answer));
            cells.push(r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(style(format_row(&header, &widths)).bold().to_string());
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(rows.iter().map(|row| format_row(row, &widths)));
    lines.join("\n")
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryRow;
    use crate::identity::{Identity, Role};
    use chrono::{TimeZone, Utc};

    fn turn_at(i: u32) -> Turn {
        Turn {
            question: format!("question {}", i),
            answer: format!("answer {}", i),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, i, 0).unwrap(),
        }
    }

    fn row(session: Option<&str>, user: &str) -> HistoryRow {
        HistoryRow {
            session_id: session.map(String::from),
            user_name: user.to_string(),
            question: "What is\ncovered?".to_string(),
            answer: "Theft.".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_transcript_order() {
        let turns: Vec<Turn> = (0..3).map(turn_at).collect();
        let text = console::strip_ansi_codes(&transcript(&turns, None)).to_string();

        let q0 = text.find("question 0").unwrap();
        let a0 = text.find("answer 0").unwrap();
        let q2 = text.find("question 2").unwrap();
        assert!(q0 < a0 && a0 < q2);
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_transcript_limit() {
        let turns: Vec<Turn> = (0..7).map(turn_at).collect();
        assert_eq!(visible_turns(&turns, Some(5)).len(), 5);
        assert_eq!(visible_turns(&turns, Some(5))[0].question, "question 2");
        assert_eq!(visible_turns(&turns, Some(10)).len(), 7);

        let text = console::strip_ansi_codes(&transcript(&turns, Some(5))).to_string();
        assert!(text.contains("(2 earlier turns hidden)"));
        assert!(!text.contains("question 1"));
        assert!(text.contains("question 6"));
    }

    #[test]
    fn test_history_table_admin_has_session_column() {
        let view = HistoryView {
            identity: Identity { user_name: "root".to_string(), role: Role::Admin },
            rows: vec![row(Some("20240101090000"), "alice"), row(Some("20240101091500"), "bob")],
        };
        let text = console::strip_ansi_codes(&history_table(&view)).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Session ID"));
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("20240101090000 | alice"));
        assert!(lines[2].contains("What is covered?"));
        assert!(lines[2].ends_with("2024-01-01 09:30:00"));
    }

    #[test]
    fn test_history_table_standard_has_no_session_column() {
        let view = HistoryView {
            identity: Identity { user_name: "alice".to_string(), role: Role::Standard },
            rows: vec![row(None, "alice")],
        };
        let text = console::strip_ansi_codes(&history_table(&view)).to_string();
        assert!(text.starts_with("User Name"));
        assert!(!text.contains("Session"));
    }

    #[test]
    fn test_banner_and_empty_history() {
        let text = console::strip_ansi_codes(&banner(&PresentationSettings::default())).to_string();
        assert!(text.contains("KASMO"));
        assert!(text.contains("SnowPeon"));

        let empty = HistoryView {
            identity: Identity { user_name: "alice".to_string(), role: Role::Standard },
            rows: Vec::new(),
        };
        assert!(history_table(&empty).contains("No chat history yet."));
    }
}
