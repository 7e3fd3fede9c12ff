use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{EligibilityCriteria, Student};

/// Reason codes for a failed eligibility check, reported in full so the
/// student sees every shortfall at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    CgpaMissing,
    CgpaTooLow,
    DepartmentNotAllowed,
    BacklogsExceeded,
    GraduationYearNotAllowed,
}

impl EligibilityReason {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityReason::CgpaMissing => "cgpa_missing",
            EligibilityReason::CgpaTooLow => "cgpa_too_low",
            EligibilityReason::DepartmentNotAllowed => "department_not_allowed",
            EligibilityReason::BacklogsExceeded => "backlogs_exceeded",
            EligibilityReason::GraduationYearNotAllowed => "graduation_year_not_allowed",
        }
    }
}

/// Verdict returned by [`evaluate`]; `eligible` holds exactly when no rule
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub failing_reasons: BTreeSet<EligibilityReason>,
}

/// Pure predicate matching a student against a drive's criteria.
///
/// Rules are evaluated independently (no short-circuit) and the function has
/// no side effects: identical inputs always produce identical verdicts.
pub fn evaluate(student: &Student, criteria: &EligibilityCriteria) -> EligibilityVerdict {
    let mut failing_reasons = BTreeSet::new();

    match student.cgpa {
        None => {
            failing_reasons.insert(EligibilityReason::CgpaMissing);
        }
        Some(cgpa) if cgpa < criteria.min_cgpa => {
            failing_reasons.insert(EligibilityReason::CgpaTooLow);
        }
        Some(_) => {}
    }

    if !criteria.allowed_departments.is_empty()
        && !criteria.allowed_departments.contains(&student.department)
    {
        failing_reasons.insert(EligibilityReason::DepartmentNotAllowed);
    }

    if student.backlogs > criteria.max_backlogs {
        failing_reasons.insert(EligibilityReason::BacklogsExceeded);
    }

    if !criteria.graduation_years.is_empty()
        && !criteria.graduation_years.contains(&student.graduation_year)
    {
        failing_reasons.insert(EligibilityReason::GraduationYearNotAllowed);
    }

    EligibilityVerdict {
        eligible: failing_reasons.is_empty(),
        failing_reasons,
    }
}
