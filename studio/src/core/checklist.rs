//! Artifact checklist: which files a run must contain before it can complete.
//!
//! Evaluation is pure. The I/O layer produces a [`RunListing`] (file names plus
//! the verdict marker of each contrarian file) and [`evaluate`] matches it
//! against the requirements for the phase and invited roster.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{Phase, RoleId, RoleStatus, Verdict};

pub const SUMMARY_FILE: &str = "summary.md";
pub const IMPLEMENTATION_FILE: &str = "implementation.md";
pub const INTEGRATOR_FILE: &str = "integrator.md";

static ROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(advocate|contrarian)_(\d+)\.md$").expect("round regex"));
static ROLE_ROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(advocate|contrarian)--(.+)--(\d+)\.md$").expect("role round regex")
});

/// Debate side that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Side {
    Advocate,
    Contrarian,
}

impl Side {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "advocate" => Some(Side::Advocate),
            "contrarian" => Some(Side::Contrarian),
            _ => None,
        }
    }
}

/// Numbered debate artifact recognized from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub side: Side,
    /// Role slug for multi-role files; `None` for `advocate_<n>.md` style.
    pub role: Option<String>,
    pub iteration: u32,
}

/// Parse `advocate_<n>.md`, `contrarian_<n>.md`, `advocate--<role>--<n>.md`
/// or `contrarian--<role>--<n>.md`. Anything else is not a round.
pub fn parse_round(file_name: &str) -> Option<Round> {
    if let Some(caps) = ROLE_ROUND_RE.captures(file_name) {
        return Some(Round {
            side: Side::parse(caps.get(1)?.as_str())?,
            role: Some(caps.get(2)?.as_str().to_string()),
            iteration: caps.get(3)?.as_str().parse().ok()?,
        });
    }
    let caps = ROUND_RE.captures(file_name)?;
    Some(Round {
        side: Side::parse(caps.get(1)?.as_str())?,
        role: None,
        iteration: caps.get(2)?.as_str().parse().ok()?,
    })
}

/// File name for a role round, e.g. `contrarian--live-ops--02.md`.
pub fn role_round_file(side: Side, role: &RoleId, iteration: u32) -> String {
    let kind = match side {
        Side::Advocate => "advocate",
        Side::Contrarian => "contrarian",
    };
    format!("{kind}--{}--{iteration:02}.md", role.slug())
}

/// One requirement a run directory is checked against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    /// At least one `advocate_<n>.md`.
    AdvocateRounds,
    /// At least one `contrarian_<n>.md`.
    ContrarianRounds,
    Implementation,
    Integrator,
    /// The summary file (default `summary.md`, may be overridden at finalize).
    Summary(String),
    /// `run.json` must carry a non-empty invited roster.
    InvitedRoster,
    /// At least one invited role completed its debate with approval.
    AnyRoleCompleted,
    /// At least one `advocate--<role>--<n>.md`.
    RoleAdvocateRounds(RoleId),
    /// At least one `contrarian--<role>--<n>.md`, latest one approved.
    RoleContrarianApproved(RoleId),
}

impl Requirement {
    /// Whether an unmet requirement prevents marking the run `COMPLETED`.
    /// Per-role requirements are recorded in `role_status` instead.
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            Requirement::RoleAdvocateRounds(_) | Requirement::RoleContrarianApproved(_)
        )
    }

    pub fn category(&self) -> Category {
        match self {
            Requirement::AdvocateRounds
            | Requirement::ContrarianRounds
            | Requirement::AnyRoleCompleted => Category::Debate,
            Requirement::Implementation | Requirement::Integrator => Category::Deliverable,
            Requirement::Summary(_) => Category::Summary,
            Requirement::InvitedRoster => Category::Record,
            Requirement::RoleAdvocateRounds(_) | Requirement::RoleContrarianApproved(_) => {
                Category::Roles
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::AdvocateRounds => f.write_str("advocate_<n>.md"),
            Requirement::ContrarianRounds => f.write_str("contrarian_<n>.md"),
            Requirement::Implementation => f.write_str(IMPLEMENTATION_FILE),
            Requirement::Integrator => f.write_str(INTEGRATOR_FILE),
            Requirement::Summary(path) => f.write_str(path),
            Requirement::InvitedRoster => f.write_str("invited roles in run.json"),
            Requirement::AnyRoleCompleted => {
                f.write_str("at least one invited role with an approved contrarian round")
            }
            Requirement::RoleAdvocateRounds(role) => {
                write!(f, "advocate--{}--<n>.md", role.slug())
            }
            Requirement::RoleContrarianApproved(role) => {
                write!(f, "contrarian--{}--<n>.md with VERDICT: APPROVED", role.slug())
            }
        }
    }
}

/// Grouping used by `studio validate` to print pass/fail per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Record,
    Debate,
    Deliverable,
    Summary,
    Roles,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Record => "record",
            Category::Debate => "debate",
            Category::Deliverable => "deliverable",
            Category::Summary => "summary",
            Category::Roles => "roles",
        }
    }
}

/// The file requirements for a phase; counts of numbered rounds are open-ended.
pub fn required_files(
    phase: Phase,
    invited: &[RoleId],
    summary_file: &str,
) -> BTreeSet<Requirement> {
    let mut required = BTreeSet::new();
    if phase.is_multi_role() {
        for role in invited {
            required.insert(Requirement::RoleAdvocateRounds(role.clone()));
            required.insert(Requirement::RoleContrarianApproved(role.clone()));
        }
        required.insert(Requirement::Integrator);
    } else {
        required.insert(Requirement::AdvocateRounds);
        required.insert(Requirement::ContrarianRounds);
        required.insert(Requirement::Implementation);
    }
    required.insert(Requirement::Summary(summary_file.to_string()));
    required
}

/// A file present in the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Path relative to the run directory, `/`-separated.
    pub path: String,
    /// Verdict marker; only populated for contrarian rounds.
    pub verdict: Option<Verdict>,
}

/// Snapshot of a run directory's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunListing {
    pub files: Vec<ListedFile>,
}

impl RunListing {
    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|file| file.path == path)
    }

    /// Numbered rounds at the top level of the run directory.
    pub fn rounds(&self) -> impl Iterator<Item = (Round, &ListedFile)> {
        self.files
            .iter()
            .filter(|file| !file.path.contains('/'))
            .filter_map(|file| parse_round(&file.path).map(|round| (round, file)))
    }
}

/// Debate progress of one invited role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCheck {
    pub status: RoleStatus,
    pub advocate_rounds: u32,
    pub contrarian_rounds: u32,
    /// Latest contrarian round carries `VERDICT: APPROVED`.
    pub approved: bool,
    pub last_iteration: u32,
}

/// Outcome of matching a listing against the checklist. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub phase: Phase,
    pub missing: BTreeSet<Requirement>,
    pub roles: BTreeMap<RoleId, RoleCheck>,
    pub iterations_observed: u32,
}

impl ValidationResult {
    /// Unmet requirements that gate `COMPLETED`.
    pub fn blocking(&self) -> Vec<&Requirement> {
        self.missing.iter().filter(|req| req.is_blocking()).collect()
    }

    pub fn passes(&self) -> bool {
        self.missing.iter().all(|req| !req.is_blocking())
    }

    pub fn role_status(&self) -> BTreeMap<RoleId, RoleStatus> {
        self.roles
            .iter()
            .map(|(role, check)| (role.clone(), check.status))
            .collect()
    }

    /// Pass/fail per category, in stable order. `roles` only for multi-role.
    pub fn categories(&self) -> Vec<(Category, bool, Vec<&Requirement>)> {
        let mut categories = vec![
            Category::Record,
            Category::Debate,
            Category::Deliverable,
            Category::Summary,
        ];
        if self.phase.is_multi_role() {
            categories.push(Category::Roles);
        }
        categories
            .into_iter()
            .map(|category| {
                let unmet: Vec<&Requirement> = self
                    .missing
                    .iter()
                    .filter(|req| req.category() == category)
                    .collect();
                (category, unmet.is_empty(), unmet)
            })
            .collect()
    }
}

/// Match `listing` against the checklist for `phase` and `invited`.
pub fn evaluate(
    phase: Phase,
    invited: &[RoleId],
    summary_file: &str,
    listing: &RunListing,
) -> ValidationResult {
    let required = required_files(phase, invited, summary_file);
    let mut missing = BTreeSet::new();
    let mut roles = BTreeMap::new();
    let iterations_observed;

    if phase.is_multi_role() {
        if invited.is_empty() {
            missing.insert(Requirement::InvitedRoster);
        }
        for role in invited {
            let check = check_role(role, listing);
            if check.advocate_rounds == 0 {
                missing.insert(Requirement::RoleAdvocateRounds(role.clone()));
            }
            if check.contrarian_rounds == 0 || !check.approved {
                missing.insert(Requirement::RoleContrarianApproved(role.clone()));
            }
            roles.insert(role.clone(), check);
        }
        if !roles.values().any(|check| check.status == RoleStatus::Completed) {
            missing.insert(Requirement::AnyRoleCompleted);
        }
        iterations_observed = roles
            .values()
            .filter(|check| check.status == RoleStatus::Completed)
            .map(|check| check.last_iteration)
            .max()
            .unwrap_or(0);
    } else {
        let mut advocates = 0;
        let mut contrarians = 0;
        for (round, _) in listing.rounds().filter(|(round, _)| round.role.is_none()) {
            match round.side {
                Side::Advocate => advocates += 1,
                Side::Contrarian => contrarians += 1,
            }
        }
        if advocates == 0 {
            missing.insert(Requirement::AdvocateRounds);
        }
        if contrarians == 0 {
            missing.insert(Requirement::ContrarianRounds);
        }
        iterations_observed = advocates;
    }

    for req in &required {
        let present = match req {
            Requirement::Implementation => listing.contains(IMPLEMENTATION_FILE),
            Requirement::Integrator => listing.contains(INTEGRATOR_FILE),
            Requirement::Summary(path) => listing.contains(path),
            _ => continue,
        };
        if !present {
            missing.insert(req.clone());
        }
    }

    ValidationResult {
        phase,
        missing,
        roles,
        iterations_observed,
    }
}

fn check_role(role: &RoleId, listing: &RunListing) -> RoleCheck {
    let slug = role.slug();
    let mut advocate_rounds = 0;
    let mut contrarian_rounds = 0;
    let mut latest: Option<(u32, Option<Verdict>)> = None;
    for (round, file) in listing.rounds() {
        if round.role.as_deref() != Some(slug.as_str()) {
            continue;
        }
        match round.side {
            Side::Advocate => advocate_rounds += 1,
            Side::Contrarian => {
                contrarian_rounds += 1;
                if latest.is_none_or(|(iteration, _)| round.iteration > iteration) {
                    latest = Some((round.iteration, file.verdict));
                }
            }
        }
    }
    let approved = matches!(latest, Some((_, Some(Verdict::Approved))));
    let status = if advocate_rounds > 0 && approved {
        RoleStatus::Completed
    } else {
        RoleStatus::Missing
    };
    RoleCheck {
        status,
        advocate_rounds,
        contrarian_rounds,
        approved,
        last_iteration: latest.map(|(iteration, _)| iteration).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(&str, Option<Verdict>)]) -> RunListing {
        RunListing {
            files: entries
                .iter()
                .map(|(path, verdict)| ListedFile {
                    path: path.to_string(),
                    verdict: *verdict,
                })
                .collect(),
        }
    }

    fn roles(names: &[&str]) -> Vec<RoleId> {
        names.iter().map(|name| RoleId::new(*name)).collect()
    }

    #[test]
    fn parses_round_file_names() {
        assert_eq!(
            parse_round("advocate_3.md"),
            Some(Round {
                side: Side::Advocate,
                role: None,
                iteration: 3
            })
        );
        assert_eq!(
            parse_round("contrarian--live-ops--02.md"),
            Some(Round {
                side: Side::Contrarian,
                role: Some("live-ops".to_string()),
                iteration: 2
            })
        );
        assert_eq!(parse_round("advocate_x.md"), None);
        assert_eq!(parse_round("summary.md"), None);
        assert_eq!(parse_round("integrator--advocate--1.md"), None);
    }

    #[test]
    fn role_round_file_pads_iteration() {
        let name = role_round_file(Side::Advocate, &RoleId::new("live ops"), 1);
        assert_eq!(name, "advocate--live-ops--01.md");
        assert!(parse_round(&name).is_some());
    }

    #[test]
    fn single_role_complete_listing_passes() {
        let listing = listing(&[
            ("run.json", None),
            ("advocate_1.md", None),
            ("contrarian_1.md", Some(Verdict::Rejected)),
            ("advocate_2.md", None),
            ("contrarian_2.md", Some(Verdict::Approved)),
            ("implementation.md", None),
            ("summary.md", None),
        ]);
        let result = evaluate(Phase::Market, &[], SUMMARY_FILE, &listing);
        assert!(result.passes(), "missing: {:?}", result.missing);
        assert_eq!(result.iterations_observed, 2);
        assert!(result.roles.is_empty());
    }

    #[test]
    fn missing_summary_is_blocking_and_named() {
        let listing = listing(&[
            ("advocate_1.md", None),
            ("contrarian_1.md", None),
            ("implementation.md", None),
        ]);
        let result = evaluate(Phase::Design, &[], SUMMARY_FILE, &listing);
        assert!(!result.passes());
        let names: Vec<String> = result.blocking().iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["summary.md"]);
    }

    #[test]
    fn single_role_requires_both_sides() {
        let listing = listing(&[("summary.md", None), ("implementation.md", None)]);
        let result = evaluate(Phase::Tech, &[], SUMMARY_FILE, &listing);
        assert!(result.missing.contains(&Requirement::AdvocateRounds));
        assert!(result.missing.contains(&Requirement::ContrarianRounds));
        assert_eq!(result.iterations_observed, 0);
    }

    #[test]
    fn summary_override_is_checked_by_relative_path() {
        let listing = listing(&[
            ("advocate_1.md", None),
            ("contrarian_1.md", None),
            ("implementation.md", None),
            ("notes/final.md", None),
        ]);
        let result = evaluate(Phase::Market, &[], "notes/final.md", &listing);
        assert!(result.passes());
    }

    #[test]
    fn multi_role_records_unmet_roles_without_blocking() {
        let listing = listing(&[
            ("advocate--marketing--01.md", None),
            ("contrarian--marketing--01.md", Some(Verdict::Rejected)),
            ("advocate--marketing--02.md", None),
            ("contrarian--marketing--02.md", Some(Verdict::Approved)),
            ("advocate--design--01.md", None),
            ("integrator.md", None),
            ("summary.md", None),
        ]);
        let invited = roles(&["design", "marketing"]);
        let result = evaluate(Phase::Studio, &invited, SUMMARY_FILE, &listing);

        assert!(result.passes(), "blocking: {:?}", result.blocking());
        let status = result.role_status();
        assert_eq!(status[&RoleId::new("marketing")], RoleStatus::Completed);
        assert_eq!(status[&RoleId::new("design")], RoleStatus::Missing);
        assert!(
            result
                .missing
                .contains(&Requirement::RoleContrarianApproved(RoleId::new("design")))
        );
        assert_eq!(result.iterations_observed, 2);
    }

    #[test]
    fn multi_role_latest_contrarian_decides_approval() {
        let listing = listing(&[
            ("advocate--qa--01.md", None),
            ("contrarian--qa--01.md", Some(Verdict::Approved)),
            ("contrarian--qa--02.md", Some(Verdict::Rejected)),
            ("integrator.md", None),
            ("summary.md", None),
        ]);
        let result = evaluate(Phase::Studio, &roles(&["qa"]), SUMMARY_FILE, &listing);
        assert!(!result.roles[&RoleId::new("qa")].approved);
        assert!(result.missing.contains(&Requirement::AnyRoleCompleted));
        assert!(!result.passes());
    }

    #[test]
    fn multi_role_requires_integrator_and_roster() {
        let result = evaluate(Phase::Studio, &[], SUMMARY_FILE, &listing(&[]));
        let blocking: BTreeSet<&Requirement> = result.blocking().into_iter().collect();
        assert!(blocking.contains(&Requirement::InvitedRoster));
        assert!(blocking.contains(&Requirement::Integrator));
        assert!(blocking.contains(&Requirement::AnyRoleCompleted));
        assert!(blocking.contains(&Requirement::Summary(SUMMARY_FILE.to_string())));
    }

    #[test]
    fn nested_files_are_not_rounds() {
        let listing = listing(&[("drafts/advocate_1.md", None)]);
        assert_eq!(listing.rounds().count(), 0);
    }

    #[test]
    fn categories_report_per_group() {
        let listing = listing(&[("advocate_1.md", None), ("contrarian_1.md", None)]);
        let result = evaluate(Phase::Market, &[], SUMMARY_FILE, &listing);
        let summary: Vec<(&str, bool)> = result
            .categories()
            .iter()
            .map(|(category, passed, _)| (category.as_str(), *passed))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("record", true),
                ("debate", true),
                ("deliverable", false),
                ("summary", false),
            ]
        );
    }
}
