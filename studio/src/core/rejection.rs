//! Rejection detection and reason extraction for rerun guidance.
//!
//! Detection is a fixed marker list, and the extraction strategies are
//! heuristics over free-form prose. Neither is exhaustive: a contrarian that
//! rejects without any listed marker is not detected.

use std::sync::LazyLock;

use regex::Regex;

/// Patterns that mark a contrarian artifact as a rejection.
const REJECTION_MARKERS: [&str; 3] = [
    r"(?i)VERDICT:\s*REJECTED",
    r"(?i)\*\*VERDICT\*\*:\s*REJECTED",
    r"(?i)^\s*#+\s*VERDICT\s*:?\s*REJECTED",
];

const MAX_REASONS: usize = 5;
const MIN_REASON_CHARS: usize = 16;

static MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REJECTION_MARKERS
        .iter()
        .map(|pattern| {
            regex::RegexBuilder::new(pattern)
                .multi_line(true)
                .build()
                .expect("rejection marker regex")
        })
        .collect()
});
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^##\s*(?:critical\s+)?(?:issues?|(?:rejection\s+)?reasons?|concerns?)\s*$")
        .expect("section regex")
});
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*(.+)$").expect("numbered regex"));
static NUMBERED_BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\.\s*\*\*(.+?)\*\*\s*[-–:]\s*(.+)$").expect("numbered bold regex")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•]\s+(.+)$").expect("bullet regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("italic regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.+?)`").expect("code regex"));

/// Whether `text` carries any known rejection marker.
pub fn is_rejection(text: &str) -> bool {
    MARKERS.iter().any(|re| re.is_match(text))
}

/// Extract up to five rejection reasons, or none if `text` is not a rejection.
///
/// Strategies in order: a dedicated issues/reasons/concerns section, otherwise
/// everything after the verdict marker; within it numbered bold items, plain
/// numbered items, bullets, then the first substantive paragraphs.
pub fn extract_reasons(text: &str) -> Vec<String> {
    if !is_rejection(text) {
        return Vec::new();
    }
    let section = reason_section(text);

    let mut reasons: Vec<String> = section
        .lines()
        .filter_map(|line| NUMBERED_BOLD_RE.captures(line))
        .map(|caps| format!("{} - {}", caps[1].trim(), caps[2].trim()))
        .collect();
    if reasons.is_empty() {
        reasons = capture_lines(section, &NUMBERED_RE);
    }
    if reasons.is_empty() {
        reasons = capture_lines(section, &BULLET_RE);
    }
    if reasons.is_empty() {
        reasons = section
            .split("\n\n")
            .map(str::trim)
            .filter(|para| !para.is_empty() && !para.starts_with('#'))
            .filter(|para| !para.to_ascii_uppercase().contains("VERDICT:"))
            .take(3)
            .map(str::to_string)
            .collect();
    }

    reasons
        .into_iter()
        .map(|reason| strip_markdown(&reason))
        .filter(|reason| reason.chars().count() >= MIN_REASON_CHARS)
        .take(MAX_REASONS)
        .collect()
}

fn reason_section(text: &str) -> &str {
    let start = match SECTION_RE.find(text) {
        Some(found) => found.end(),
        None => MARKERS
            .iter()
            .filter_map(|re| re.find(text))
            .map(|found| found.end())
            .min()
            .unwrap_or(0),
    };
    let rest = &text[start..];
    match rest.find("\n##") {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn capture_lines(section: &str, re: &Regex) -> Vec<String> {
    section
        .lines()
        .filter_map(|line| re.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

fn strip_markdown(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Render rerun guidance for the latest rejected round.
pub fn render_rerun_guidance(iteration: u32, role: Option<&str>, reasons: &[String]) -> String {
    let mut lines = vec![
        "# Rerun Mode Detected".to_string(),
        String::new(),
        format!("Previous iteration {iteration} was **REJECTED**."),
        String::new(),
    ];
    if let Some(role) = role {
        lines.push(format!("**Role**: {role}"));
        lines.push(String::new());
    }
    lines.push("## Rejection Reasons".to_string());
    lines.push(String::new());
    if reasons.is_empty() {
        lines.push("_No structured reasons found; read the contrarian artifact directly._".to_string());
    }
    for (idx, reason) in reasons.iter().enumerate() {
        lines.push(format!("{}. {reason}", idx + 1));
    }
    lines.extend([
        String::new(),
        "## Next Steps".to_string(),
        String::new(),
        "1. Review the rejection reasons above".to_string(),
        "2. Address each concern in the revised advocate proposal".to_string(),
        "3. Focus on the specific issues raised rather than starting from scratch".to_string(),
        String::new(),
    ]);
    lines.join("\n")
}
