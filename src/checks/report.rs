//! Check outcomes and their text/JSON rendering.

use super::Check;
use serde::Serialize;
use std::fmt;

/// What happened when a check ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed { reasons: Vec<String> },
    /// The collection was too malformed to evaluate the check
    Errored { message: String },
    /// Not evaluated because an earlier check did not pass
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub check: Check,
    pub description: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CheckOutcome {
    pub fn new(check: Check, outcome: Outcome) -> Self {
        Self {
            check,
            description: check.description(),
            outcome,
        }
    }
}

/// Outcomes of one validation run, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    passed: bool,
    outcomes: Vec<CheckOutcome>,
}

impl Report {
    pub fn new(outcomes: Vec<CheckOutcome>) -> Self {
        let passed = outcomes.iter().all(|o| o.outcome == Outcome::Passed);
        Self { passed, outcomes }
    }

    /// True when every check passed.
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    /// Checks that failed or could not be evaluated.
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. } | Outcome::Errored { .. }))
    }

    pub fn outcome_of(&self, check: Check) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.check == check)
            .map(|o| &o.outcome)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.outcomes {
            match &entry.outcome {
                Outcome::Passed => writeln!(f, "PASS  {} ({})", entry.check, entry.description)?,
                Outcome::Skipped => writeln!(f, "SKIP  {}", entry.check)?,
                Outcome::Failed { reasons } => {
                    writeln!(f, "FAIL  {} ({})", entry.check, entry.description)?;
                    for reason in reasons {
                        writeln!(f, "      - {}", reason)?;
                    }
                }
                Outcome::Errored { message } => {
                    writeln!(f, "ERROR {} ({})", entry.check, entry.description)?;
                    writeln!(f, "      - {}", message)?;
                }
            }
        }
        Ok(())
    }
}
