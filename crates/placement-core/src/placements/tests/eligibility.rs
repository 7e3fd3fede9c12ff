use std::collections::BTreeSet;

use super::common::*;
use crate::placements::eligibility::{evaluate, EligibilityReason};

#[test]
fn low_cgpa_reports_cgpa_too_low() {
    let mut student = approved_student("stu-1");
    student.cgpa = Some(6.5);

    let verdict = evaluate(&student, &criteria());

    assert!(!verdict.eligible);
    assert_eq!(
        verdict.failing_reasons,
        BTreeSet::from([EligibilityReason::CgpaTooLow])
    );
}

#[test]
fn wrong_department_reports_department_not_allowed() {
    let mut student = approved_student("stu-1");
    student.cgpa = Some(8.0);
    student.department = "IT".to_string();

    let verdict = evaluate(&student, &criteria());

    assert!(!verdict.eligible);
    assert_eq!(
        verdict.failing_reasons,
        BTreeSet::from([EligibilityReason::DepartmentNotAllowed])
    );
}

#[test]
fn missing_cgpa_is_its_own_reason() {
    let mut student = approved_student("stu-1");
    student.cgpa = None;

    let verdict = evaluate(&student, &criteria());

    assert!(verdict
        .failing_reasons
        .contains(&EligibilityReason::CgpaMissing));
    assert!(!verdict
        .failing_reasons
        .contains(&EligibilityReason::CgpaTooLow));
}

#[test]
fn all_failures_are_reported_without_short_circuit() {
    let mut student = approved_student("stu-1");
    student.cgpa = Some(5.0);
    student.department = "ME".to_string();
    student.backlogs = 3;
    student.graduation_year = 2020;

    let mut rules = criteria();
    rules.graduation_years = BTreeSet::from([2026]);

    let verdict = evaluate(&student, &rules);

    assert!(!verdict.eligible);
    assert_eq!(
        verdict.failing_reasons,
        BTreeSet::from([
            EligibilityReason::CgpaTooLow,
            EligibilityReason::DepartmentNotAllowed,
            EligibilityReason::BacklogsExceeded,
            EligibilityReason::GraduationYearNotAllowed,
        ])
    );
}

#[test]
fn empty_sets_leave_dimensions_unconstrained() {
    let mut student = approved_student("stu-1");
    student.department = "EEE".to_string();
    student.graduation_year = 1999;

    let mut rules = criteria();
    rules.allowed_departments.clear();

    let verdict = evaluate(&student, &rules);

    assert!(verdict.eligible, "got {:?}", verdict.failing_reasons);
}

#[test]
fn exact_minimum_cgpa_passes() {
    let mut student = approved_student("stu-1");
    student.cgpa = Some(7.0);

    assert!(evaluate(&student, &criteria()).eligible);
}

#[test]
fn evaluation_is_deterministic() {
    let mut student = approved_student("stu-1");
    student.cgpa = Some(6.9);
    student.backlogs = 1;
    let rules = criteria();

    let first = evaluate(&student, &rules);
    for _ in 0..50 {
        assert_eq!(evaluate(&student, &rules), first);
    }
}
