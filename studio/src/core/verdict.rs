//! Verdict marker detection in contrarian artifacts.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Verdict;

static VERDICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)VERDICT:\s*(APPROVED|REJECTED)").expect("verdict regex is valid")
});

/// Return the first `VERDICT: APPROVED|REJECTED` marker in `text`, if any.
pub fn extract_verdict(text: &str) -> Option<Verdict> {
    let caps = VERDICT_RE.captures(text)?;
    let word = caps.get(1)?.as_str();
    if word.eq_ignore_ascii_case("APPROVED") {
        Some(Verdict::Approved)
    } else {
        Some(Verdict::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_markers_case_insensitively() {
        assert_eq!(
            extract_verdict("...\nverdict:   approved\n"),
            Some(Verdict::Approved)
        );
        assert_eq!(
            extract_verdict("## Verdict\nVERDICT: REJECTED"),
            Some(Verdict::Rejected)
        );
    }

    #[test]
    fn first_marker_wins() {
        let text = "VERDICT: REJECTED first\nlater VERDICT: APPROVED";
        assert_eq!(extract_verdict(text), Some(Verdict::Rejected));
    }

    #[test]
    fn missing_marker_is_none() {
        assert_eq!(extract_verdict("Looks good to me."), None);
        assert_eq!(extract_verdict("VERDICT: MAYBE"), None);
    }
}
