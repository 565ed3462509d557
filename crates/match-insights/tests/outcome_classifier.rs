mod common;

use common::{dbn, district_snapshot, sid, SnapshotBuilder};
use match_insights::analytics::{
    AdmissionPolicy, AnalyticsError, OutcomeBand, OutcomeClassifier, RankBin,
    ResultAggregator, SkipReason,
};
use std::sync::Arc;

fn district() -> ResultAggregator {
    ResultAggregator::new(Arc::new(district_snapshot())).expect("aggregates")
}

#[test]
fn first_choice_has_no_schools_ahead() {
    let aggregator = district();
    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s1")).expect("outcome");

    assert_eq!(outcome.ahead.skip_reason(), Some(SkipReason::FirstChoice));
    assert_eq!(outcome.bin, RankBin::choice(1));

    let same = outcome.same_school.computed().expect("same-school comparison");
    assert_eq!(same.school, dbn("01M001"));
    assert_eq!(same.cohort_size, 2);
}

#[test]
fn unmatched_student_compares_against_every_listed_school() {
    let aggregator = district();
    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s6")).expect("outcome");

    assert_eq!(outcome.same_school.skip_reason(), Some(SkipReason::Unmatched));
    assert_eq!(outcome.bin, Some(RankBin::UNMATCHED));

    let ahead = outcome.ahead.computed().expect("ahead comparison");
    assert_eq!(ahead.schools_considered.len(), 4);
    assert_eq!(ahead.students_ahead, 5);
    assert_eq!(ahead.better_lottery, 5);
    assert_eq!(ahead.worse_lottery_higher_gpa, 0);
    assert!((ahead.fraction_better_lottery - 1.0).abs() < 1e-12);
}

#[test]
fn ahead_comparison_splits_better_lottery_from_higher_gpa() {
    let aggregator = district();
    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s4")).expect("outcome");

    let ahead = outcome.ahead.computed().expect("ahead comparison");
    assert_eq!(ahead.schools_considered, vec![dbn("01M001")]);
    assert_eq!(ahead.students_ahead, 2);
    assert!((ahead.fraction_better_lottery - 0.5).abs() < 1e-12);
    assert!((ahead.fraction_worse_lottery_higher_gpa - 0.5).abs() < 1e-12);

    let narrative = outcome.narrative();
    assert!(narrative.iter().any(|line| line
        == "Of the 2 students matched at schools ranked higher, 50% had a better lottery number \
and 50% had a worse lottery number but a higher GPA."));
}

#[test]
fn repeated_school_in_preferences_is_counted_once() {
    let snapshot = SnapshotBuilder::default()
        .school("01M001", AdmissionPolicy::Open, 1)
        .school("02M002", AdmissionPolicy::Open, 1)
        .student("s", "50000000", 3.0, &["01M001", "01M001", "02M002"], Some(3))
        .student("o", "10000000", 2.0, &["01M001"], Some(1))
        .build();
    let aggregator = ResultAggregator::new(Arc::new(snapshot)).expect("aggregates");

    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s")).expect("outcome");
    let ahead = outcome.ahead.computed().expect("ahead comparison");
    assert_eq!(ahead.schools_considered, vec![dbn("01M001")]);
    assert_eq!(ahead.students_ahead, 1);
    assert_eq!(ahead.better_lottery, 1);
    assert!((ahead.fraction_better_lottery - 1.0).abs() < 1e-12);
}

#[test]
fn own_school_listed_earlier_is_not_ahead() {
    let snapshot = SnapshotBuilder::default()
        .school("01M001", AdmissionPolicy::Open, 1)
        .school("02M002", AdmissionPolicy::Open, 2)
        .student("s", "50000000", 3.0, &["02M002", "01M001", "02M002"], Some(3))
        .student("m", "20000000", 3.5, &["02M002"], Some(1))
        .student("o", "70000000", 3.9, &["01M001"], Some(1))
        .build();
    let aggregator = ResultAggregator::new(Arc::new(snapshot)).expect("aggregates");

    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s")).expect("outcome");
    let ahead = outcome.ahead.computed().expect("ahead comparison");
    assert_eq!(ahead.schools_considered, vec![dbn("01M001")]);
    assert_eq!(ahead.students_ahead, 1);
    assert_eq!(ahead.better_lottery, 0);
    assert_eq!(ahead.worse_lottery_higher_gpa, 1);
}

#[test]
fn no_students_ahead_is_not_applicable_rather_than_zero() {
    let snapshot = SnapshotBuilder::default()
        .school("09X001", AdmissionPolicy::Screen, 2)
        .school("09X002", AdmissionPolicy::Open, 2)
        .student("a", "10000000", 3.1, &["09X002"], Some(1))
        .student("b", "20000000", 3.4, &["09X001"], None)
        .build();
    let aggregator = ResultAggregator::new(Arc::new(snapshot)).expect("aggregates");

    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("b")).expect("outcome");
    assert_eq!(outcome.ahead.skip_reason(), Some(SkipReason::NoStudentsAhead));
    assert!(!outcome.ahead.is_applicable());
}

#[test]
fn unranked_match_skips_ahead_comparison() {
    let mut snapshot = district_snapshot();
    let placement = snapshot
        .matches
        .get_mut(&sid("s5"))
        .and_then(Option::as_mut)
        .expect("s5 is matched");
    placement.rank = None;
    let aggregator = ResultAggregator::new(Arc::new(snapshot)).expect("aggregates");

    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s5")).expect("outcome");
    assert_eq!(outcome.ahead.skip_reason(), Some(SkipReason::UnrankedMatch));
    assert!(outcome.bin.is_none());
    assert!(outcome.bin_median.is_none());
    assert!(outcome.same_school.is_applicable());
}

#[test]
fn population_lottery_band_follows_lower_is_better() {
    let aggregator = district();

    let best = OutcomeClassifier::student_outcome(&aggregator, &sid("s5")).expect("outcome");
    assert_eq!(best.population_lottery.band, OutcomeBand::Good);

    let worst = OutcomeClassifier::student_outcome(&aggregator, &sid("s6")).expect("outcome");
    assert_eq!(worst.population_lottery.band, OutcomeBand::Bad);
    assert_eq!(worst.population_lottery.label, "bad");
}

#[test]
fn unknown_student_is_reported() {
    let aggregator = district();
    let error =
        OutcomeClassifier::student_outcome(&aggregator, &sid("ghost")).expect_err("unknown");
    assert_eq!(error, AnalyticsError::UnknownStudent(sid("ghost")));
}

#[test]
fn not_applicable_serializes_with_status_tag() {
    let aggregator = district();
    let outcome = OutcomeClassifier::student_outcome(&aggregator, &sid("s1")).expect("outcome");

    let value = serde_json::to_value(&outcome).expect("serializes");
    assert_eq!(value["ahead"]["status"], "not_applicable");
    assert_eq!(value["ahead"]["reason"], "first_choice");
    assert_eq!(value["same_school"]["status"], "computed");
    assert_eq!(value["same_school"]["cohort_size"], 2);
}

#[test]
fn gpa_cohort_example_is_above_average() {
    let classification =
        OutcomeClassifier::classify_gpa(3.2, &[2.0, 3.0, 3.5, 4.0]).expect("classified");
    assert_eq!(classification.band, OutcomeBand::AboveAverage);
}
