use super::aggregate::ResultAggregator;
use super::domain::{
    AnalyticsError, DataIntegrityError, Dbn, Placement, RankBin, ResultSnapshot, Student,
    StudentId,
};
use super::lottery::LotteryNumber;
use serde::Serialize;
use std::collections::BTreeSet;

/// Which direction of a metric counts as a better outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// GPA: higher is better.
    HigherIsBetter,
    /// Lottery rank: a smaller key is served first.
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeBand {
    Bad,
    BelowAverage,
    AboveAverage,
    Good,
}

impl OutcomeBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::AboveAverage => "above average",
            Self::BelowAverage => "below average",
            Self::Bad => "bad",
        }
    }
}

/// 25th, 50th and 75th percentiles of a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn from_values(values: &[f64]) -> Result<Self, DataIntegrityError> {
        if values.is_empty() {
            return Err(DataIntegrityError::EmptyCohort);
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(DataIntegrityError::NonFiniteValue);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(Self {
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
        })
    }

    /// Position of `value` among the four quartile bands, 0 for the lowest.
    fn band_index(&self, value: f64) -> usize {
        if value < self.q1 {
            0
        } else if value < self.median {
            1
        } else if value < self.q3 {
            2
        } else {
            3
        }
    }
}

/// Linear interpolation of the empirical distribution function
/// (Hyndman & Fan type 4) over ascending `sorted` values.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let h = n as f64 * p;
    let k = h.floor() as usize;
    if k == 0 {
        return sorted[0];
    }
    if k >= n {
        return sorted[n - 1];
    }
    let lower = sorted[k - 1];
    let upper = sorted[k];
    lower + (h - k as f64) * (upper - lower)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub band: OutcomeBand,
    pub label: &'static str,
    pub value: f64,
    pub quartiles: Quartiles,
    pub polarity: Polarity,
}

/// Why a comparison has no value. These are business rules, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Matched to their first choice: nothing was ranked ahead.
    FirstChoice,
    /// Matched without a recorded rank, so "ahead" is undefined.
    UnrankedMatch,
    /// No student was matched at any school ranked ahead.
    NoStudentsAhead,
    /// Not matched anywhere, so there is no school cohort.
    Unmatched,
}

impl SkipReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstChoice => "matched to first choice",
            Self::UnrankedMatch => "match has no recorded rank",
            Self::NoStudentsAhead => "no students matched at schools ranked ahead",
            Self::Unmatched => "student is unmatched",
        }
    }
}

/// A computed value, or a typed "not applicable" distinguishable from zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Comparison<T> {
    Computed(T),
    NotApplicable { reason: SkipReason },
}

impl<T> Comparison<T> {
    pub fn not_applicable(reason: SkipReason) -> Self {
        Self::NotApplicable { reason }
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(value) => Some(value),
            Self::NotApplicable { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Computed(_) => None,
            Self::NotApplicable { reason } => Some(*reason),
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AheadComparison {
    pub schools_considered: Vec<Dbn>,
    pub students_ahead: usize,
    pub better_lottery: usize,
    pub worse_lottery_higher_gpa: usize,
    pub fraction_better_lottery: f64,
    pub fraction_worse_lottery_higher_gpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SameSchoolComparison {
    pub school: Dbn,
    pub cohort_size: usize,
    pub lottery: Classification,
    pub gpa: Classification,
}

/// Everything the drill-down view needs about one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentOutcome {
    pub student_id: StudentId,
    pub lottery: LotteryNumber,
    pub gpa: f64,
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<RankBin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_median: Option<LotteryNumber>,
    pub population_lottery: Classification,
    pub same_school: Comparison<SameSchoolComparison>,
    pub ahead: Comparison<AheadComparison>,
}

/// Stateless classification and comparison over a snapshot.
pub struct OutcomeClassifier;

impl OutcomeClassifier {
    pub fn classify(
        value: f64,
        cohort: &[f64],
        polarity: Polarity,
    ) -> Result<Classification, DataIntegrityError> {
        if !value.is_finite() {
            return Err(DataIntegrityError::NonFiniteValue);
        }
        let quartiles = Quartiles::from_values(cohort)?;
        let position = quartiles.band_index(value);
        let band = match (polarity, position) {
            (Polarity::HigherIsBetter, 3) | (Polarity::LowerIsBetter, 0) => OutcomeBand::Good,
            (Polarity::HigherIsBetter, 2) | (Polarity::LowerIsBetter, 1) => {
                OutcomeBand::AboveAverage
            }
            (Polarity::HigherIsBetter, 1) | (Polarity::LowerIsBetter, 2) => {
                OutcomeBand::BelowAverage
            }
            _ => OutcomeBand::Bad,
        };

        Ok(Classification {
            band,
            label: band.label(),
            value,
            quartiles,
            polarity,
        })
    }

    pub fn classify_lottery<'a, I>(
        subject: &LotteryNumber,
        cohort: I,
    ) -> Result<Classification, DataIntegrityError>
    where
        I: IntoIterator<Item = &'a LotteryNumber>,
    {
        let keys: Vec<f64> = cohort
            .into_iter()
            .map(|lottery| f64::from(lottery.to_ordered_key()))
            .collect();
        Self::classify(
            f64::from(subject.to_ordered_key()),
            &keys,
            Polarity::LowerIsBetter,
        )
    }

    pub fn classify_gpa(gpa: f64, cohort: &[f64]) -> Result<Classification, DataIntegrityError> {
        Self::classify(gpa, cohort, Polarity::HigherIsBetter)
    }

    /// Schools the student ranked strictly above their match.
    pub fn schools_ahead<'a>(
        student: &'a Student,
        placement: Option<&Placement>,
    ) -> Result<Comparison<&'a [Dbn]>, DataIntegrityError> {
        match placement {
            None => Ok(Comparison::Computed(&student.preferences[..])),
            Some(Placement { rank: None, .. }) => {
                Ok(Comparison::not_applicable(SkipReason::UnrankedMatch))
            }
            Some(Placement { rank: Some(rank), .. }) if *rank <= 1 => {
                Ok(Comparison::not_applicable(SkipReason::FirstChoice))
            }
            Some(Placement {
                rank: Some(rank),
                school,
            }) => {
                let ahead = usize::from(*rank - 1);
                student
                    .preferences
                    .get(..ahead)
                    .map(Comparison::Computed)
                    .ok_or_else(|| DataIntegrityError::PreferenceMismatch {
                        student: student.id.clone(),
                        rank: *rank,
                        school: school.clone(),
                    })
            }
        }
    }

    /// Each school is visited once. The student's own school never counts as ahead.
    pub fn compare_ahead(
        student: &Student,
        schools_ahead: &[Dbn],
        snapshot: &ResultSnapshot,
    ) -> Result<Comparison<AheadComparison>, DataIntegrityError> {
        let subject_key = student.lottery.to_ordered_key();
        let own_school = snapshot
            .matches
            .get(&student.id)
            .and_then(Option::as_ref)
            .map(|placement| &placement.school);
        let mut visited = BTreeSet::new();
        let mut schools_considered = Vec::new();
        let mut students_ahead = 0usize;
        let mut better_lottery = 0usize;
        let mut worse_lottery_higher_gpa = 0usize;

        for dbn in schools_ahead {
            if own_school == Some(dbn) || !visited.insert(dbn) {
                continue;
            }
            schools_considered.push(dbn.clone());

            let outcome = snapshot.outcome(dbn)?;
            for other_id in &outcome.matched {
                if *other_id == student.id {
                    continue;
                }
                let other = snapshot.student(other_id)?;
                let other_key = other.lottery.to_ordered_key();
                students_ahead += 1;
                if other_key < subject_key {
                    better_lottery += 1;
                } else if other_key > subject_key && other.gpa > student.gpa {
                    worse_lottery_higher_gpa += 1;
                }
            }
        }

        if students_ahead == 0 {
            return Ok(Comparison::not_applicable(SkipReason::NoStudentsAhead));
        }

        Ok(Comparison::Computed(AheadComparison {
            schools_considered,
            students_ahead,
            better_lottery,
            worse_lottery_higher_gpa,
            fraction_better_lottery: better_lottery as f64 / students_ahead as f64,
            fraction_worse_lottery_higher_gpa: worse_lottery_higher_gpa as f64
                / students_ahead as f64,
        }))
    }

    /// Ranks the student within everyone matched at the same school.
    pub fn compare_same_school(
        student: &Student,
        placement: Option<&Placement>,
        snapshot: &ResultSnapshot,
    ) -> Result<Comparison<SameSchoolComparison>, DataIntegrityError> {
        let Some(placement) = placement else {
            return Ok(Comparison::not_applicable(SkipReason::Unmatched));
        };

        let outcome = snapshot.outcome(&placement.school)?;
        let mut cohort = Vec::with_capacity(outcome.matched.len() + 1);
        for id in &outcome.matched {
            cohort.push(snapshot.student(id)?);
        }
        if !outcome.matched.contains(&student.id) {
            cohort.push(student);
        }

        let gpas: Vec<f64> = cohort.iter().map(|member| member.gpa).collect();
        let lottery = Self::classify_lottery(&student.lottery, cohort.iter().map(|m| &m.lottery))?;
        let gpa = Self::classify_gpa(student.gpa, &gpas)?;

        Ok(Comparison::Computed(SameSchoolComparison {
            school: placement.school.clone(),
            cohort_size: cohort.len(),
            lottery,
            gpa,
        }))
    }

    pub fn student_outcome(
        aggregator: &ResultAggregator,
        student_id: &StudentId,
    ) -> Result<StudentOutcome, AnalyticsError> {
        let snapshot = aggregator.snapshot();
        let student = snapshot
            .students
            .get(student_id)
            .ok_or_else(|| AnalyticsError::UnknownStudent(student_id.clone()))?;
        let placement = snapshot.placement(student_id)?;

        let bin = RankBin::for_placement(placement);
        let bin_median = bin.and_then(|bin| aggregator.stats().median(bin).cloned());

        let population = snapshot.rank_bins.iter().flat_map(|(_, values)| values.iter());
        let population_lottery = Self::classify_lottery(&student.lottery, population)?;

        let same_school = Self::compare_same_school(student, placement, snapshot)?;
        let ahead = match Self::schools_ahead(student, placement)? {
            Comparison::Computed(schools) => Self::compare_ahead(student, schools, snapshot)?,
            Comparison::NotApplicable { reason } => Comparison::not_applicable(reason),
        };

        Ok(StudentOutcome {
            student_id: student.id.clone(),
            lottery: student.lottery.clone(),
            gpa: student.gpa,
            placement: placement.cloned(),
            bin,
            bin_median,
            population_lottery,
            same_school,
            ahead,
        })
    }
}
