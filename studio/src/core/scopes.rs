//! Proportional iteration-budget allocation across ordered scopes.
//!
//! Largest-remainder rounding keeps the sum exact; a follow-up pass lifts any
//! zero allocation to one by taking a unit from the current largest holder.
//! All arithmetic is integral so results are identical on every platform.

use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// One configured scope: declaration order is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeWeight {
    pub name: String,
    pub focus: String,
    pub weight: i64,
}

/// Ordered scope configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeConfig {
    pub scopes: Vec<ScopeWeight>,
}

/// One allocated scope, persisted in `run.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAllotment {
    pub name: String,
    pub focus: String,
    pub iterations: u32,
}

/// Ordered allocation whose iteration counts sum to the requested budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeAllocation(pub Vec<ScopeAllotment>);

impl ScopeAllocation {
    pub fn total(&self) -> u32 {
        self.0.iter().map(|scope| scope.iterations).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeAllotment> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|scope| scope.name == name)
            .map(|scope| scope.iterations)
    }
}

/// Caller consent for budgets smaller than the scope count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationOptions {
    /// Permit `total_budget < scopes.len()`; some scopes then receive zero.
    pub allow_under_allocation: bool,
}

impl ScopeConfig {
    /// Structural checks shared by the loader and the allocator.
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.scopes.is_empty() {
            return Err(StudioError::config("scopes", "no scopes defined"));
        }
        for (idx, scope) in self.scopes.iter().enumerate() {
            if scope.name.trim().is_empty() {
                return Err(StudioError::config(
                    format!("scopes[{idx}].name"),
                    "must not be empty",
                ));
            }
            if scope.weight <= 0 {
                return Err(StudioError::config(
                    format!("scopes[{idx}].weight"),
                    format!("scope '{}' weight must be > 0 (got {})", scope.name, scope.weight),
                ));
            }
            if self.scopes[..idx].iter().any(|prior| prior.name == scope.name) {
                return Err(StudioError::config(
                    format!("scopes[{idx}].name"),
                    format!("duplicate scope '{}'", scope.name),
                ));
            }
        }
        Ok(())
    }
}

/// Split `total_budget` across `config` proportionally to the weights.
pub fn allocate(
    config: &ScopeConfig,
    total_budget: u32,
    options: AllocationOptions,
) -> Result<ScopeAllocation, StudioError> {
    config.validate()?;
    let count = config.scopes.len();
    if (total_budget as usize) < count && !options.allow_under_allocation {
        return Err(StudioError::config(
            "max_iterations",
            format!(
                "budget {total_budget} is smaller than the {count} configured scopes \
                 (pass --allow-under-allocation to accept zero-iteration scopes)"
            ),
        ));
    }

    let weights: Vec<u128> = config.scopes.iter().map(|s| s.weight as u128).collect();
    let weight_total: u128 = weights.iter().sum();
    let budget = total_budget as u128;

    let mut counts: Vec<u32> = Vec::with_capacity(count);
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(count);
    for (idx, weight) in weights.iter().enumerate() {
        let scaled = budget * weight;
        counts.push((scaled / weight_total) as u32);
        remainders.push((idx, scaled % weight_total));
    }

    let floor_sum: u32 = counts.iter().sum();
    let leftover = (total_budget - floor_sum) as usize;
    // Largest fractional part first; equal fractions keep declaration order.
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (idx, _) in remainders.into_iter().take(leftover) {
        counts[idx] += 1;
    }

    if (total_budget as usize) >= count {
        lift_empty_scopes(&mut counts);
    }

    let allotments = config
        .scopes
        .iter()
        .zip(counts)
        .map(|(scope, iterations)| ScopeAllotment {
            name: scope.name.clone(),
            focus: scope.focus.clone(),
            iterations,
        })
        .collect();
    Ok(ScopeAllocation(allotments))
}

/// Give every zero scope one iteration taken from the largest holder.
///
/// Requires `sum(counts) >= counts.len()`, which guarantees the largest holder
/// has at least two iterations whenever a zero exists.
fn lift_empty_scopes(counts: &mut [u32]) {
    for idx in 0..counts.len() {
        if counts[idx] != 0 {
            continue;
        }
        let donor = largest_holder(counts);
        counts[donor] -= 1;
        counts[idx] = 1;
    }
}

fn largest_holder(counts: &[u32]) -> usize {
    let mut best = 0;
    for (idx, &value) in counts.iter().enumerate() {
        if value > counts[best] {
            best = idx;
        }
    }
    best
}

/// Markdown plan embedded in `instructions.md`.
pub fn render_scope_plan(allocation: &ScopeAllocation) -> String {
    let mut lines = vec![
        "## Scope-Based Iteration Plan".to_string(),
        String::new(),
        "This run uses scope-based iteration allocation:".to_string(),
        String::new(),
    ];
    for scope in allocation.iter() {
        lines.push(format!("### {}", title_case(&scope.name)));
        lines.push(format!("- **Focus**: {}", scope.focus));
        lines.push(format!("- **Max iterations**: {}", scope.iterations));
        lines.push(String::new());
    }
    lines.push(format!("**Total iteration budget**: {}", allocation.total()));
    lines.push(String::new());
    lines.push(
        "Work through scopes sequentially. Once a scope's iterations are exhausted or approved, move to the next scope."
            .to_string(),
    );
    lines.join("\n")
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
