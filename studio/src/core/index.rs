//! Index table and history entry rendering.
//!
//! Both are pure functions of `RunRecord`s: rebuilding the index from an
//! unchanged record set yields byte-identical output.

use crate::core::record::RunRecord;

pub const INDEX_HEADER: &str = "# Studio Run Index";
pub const HISTORY_HEADER: &str = "# Studio Run Log\n\n";

const TABLE_HEADER: [&str; 2] = [
    "| Run ID | Phase | Created (UTC) | Status | Input | Summary |",
    "| --- | --- | --- | --- | --- | --- |",
];
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const PENDING_CELL: &str = "_pending_";

/// Render `output/index.md`: newest first, equal timestamps by run id.
pub fn render_index(records: &[RunRecord]) -> String {
    let mut sorted: Vec<&RunRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });

    let mut lines = vec![INDEX_HEADER.to_string(), String::new()];
    lines.extend(TABLE_HEADER.iter().map(|line| line.to_string()));
    for record in sorted {
        let summary = match &record.summary_path {
            Some(path) => format!(
                "[summary]({}/{}/{})",
                record.phase, record.run_id, path
            ),
            None => PENDING_CELL.to_string(),
        };
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            record.run_id,
            record.phase,
            record.created_at.format(DISPLAY_FORMAT),
            record.status,
            sanitize_cell(&record.input),
            summary,
        ));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render one history block for `knowledge/run_log.md`.
pub fn render_history_entry(record: &RunRecord) -> String {
    let na = || "N/A".to_string();
    let summary = record
        .summary_path
        .as_ref()
        .map(|path| {
            format!(
                "[summary](../output/{}/{}/{})",
                record.phase, record.run_id, path
            )
        })
        .unwrap_or_default();
    let lines = [
        format!(
            "## {} ({}) – {}",
            record.run_id, record.phase, record.status
        ),
        format!("- Created: {}", record.created_at.format(DISPLAY_FORMAT)),
        format!(
            "- Verdict: {}",
            record.verdict.map(|v| v.to_string()).unwrap_or_else(na)
        ),
        format!(
            "- Iterations: {}",
            record.iterations_run.map(|n| n.to_string()).unwrap_or_else(na)
        ),
        format!(
            "- Hours: {} | Cost: {}",
            record.hours.map(|h| h.to_string()).unwrap_or_else(na),
            record.cost.map(|c| c.to_string()).unwrap_or_else(na)
        ),
        format!("- Summary: {summary}"),
        String::new(),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Escape pipes and flatten newlines so free text fits one table cell.
pub fn sanitize_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Phase, RunStatus, Verdict};
    use chrono::{TimeZone, Utc};

    fn record(id: &str, hour: u32, input: &str) -> RunRecord {
        let at = Utc.with_ymd_and_hms(2025, 2, 1, hour, 0, 0).unwrap();
        RunRecord::new(id.to_string(), Phase::Market, input.to_string(), at, 3)
    }

    #[test]
    fn index_sorts_newest_first_with_id_tiebreak() {
        let records = vec![
            record("run_b", 9, "b"),
            record("run_c", 10, "c"),
            record("run_a", 9, "a"),
        ];
        let index = render_index(&records);
        let order: Vec<&str> = index
            .lines()
            .filter(|line| line.starts_with("| run_"))
            .map(|line| line.split(" | ").next().unwrap_or_default())
            .collect();
        assert_eq!(order, vec!["| run_c", "| run_a", "| run_b"]);
    }

    #[test]
    fn index_is_independent_of_input_order() {
        let forward = vec![record("run_a", 1, "a"), record("run_b", 2, "b")];
        let reversed: Vec<RunRecord> = forward.iter().rev().cloned().collect();
        assert_eq!(render_index(&forward), render_index(&reversed));
    }

    #[test]
    fn index_row_shows_pending_and_summary_links() {
        let mut done = record("run_market_1", 1, "pipe | and\nnewline");
        done.status = RunStatus::Completed;
        done.summary_path = Some("summary.md".to_string());
        let pending = record("run_market_0", 0, "other");
        let index = render_index(&[done, pending]);

        assert!(index.starts_with("# Studio Run Index\n\n| Run ID |"));
        assert!(index.contains(
            "| run_market_1 | market | 2025-02-01 01:00 | COMPLETED | pipe \\| and newline | [summary](market/run_market_1/summary.md) |"
        ));
        assert!(index.contains("| run_market_0 | market | 2025-02-01 00:00 | PENDING | other | _pending_ |"));
        assert!(index.ends_with("|\n"));
    }

    #[test]
    fn empty_index_has_header_only() {
        let index = render_index(&[]);
        assert_eq!(index.lines().count(), 4);
    }

    #[test]
    fn history_entry_uses_na_for_unset_fields() {
        let mut rec = record("run_market_1", 3, "x");
        rec.status = RunStatus::Completed;
        rec.verdict = Some(Verdict::Approved);
        rec.hours = Some(1.25);
        rec.summary_path = Some("summary.md".to_string());
        let entry = render_history_entry(&rec);
        assert!(entry.starts_with("## run_market_1 (market) – COMPLETED\n"));
        assert!(entry.contains("- Verdict: APPROVED\n"));
        assert!(entry.contains("- Iterations: N/A\n"));
        assert!(entry.contains("- Hours: 1.25 | Cost: N/A\n"));
        assert!(entry.contains("- Summary: [summary](../output/market/run_market_1/summary.md)\n"));
        assert!(entry.ends_with("\n\n"));
    }
}
