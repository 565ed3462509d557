use super::lottery::LotteryNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Choice ranks a student can be matched at.
pub const MAX_CHOICES: usize = 12;
/// Choice ranks plus the unmatched bucket.
pub const BIN_COUNT: usize = MAX_CHOICES + 1;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// District-borough-number school identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dbn(pub String);

impl fmt::Display for Dbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a simulated student picked the schools on their list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    Random,
    Popularity,
}

impl SelectionStrategy {
    pub const fn ordered() -> [Self; 2] {
        [Self::Random, Self::Popularity]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Random => 0,
            Self::Popularity => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Popularity => "Popularity-based",
        }
    }
}

/// How a simulated student ordered the schools they picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    Random,
    Likeability,
}

impl RankingStrategy {
    pub const fn ordered() -> [Self; 2] {
        [Self::Random, Self::Likeability]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Random => 0,
            Self::Likeability => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Likeability => "Likeability-based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    Open,
    #[serde(alias = "edopt")]
    EdOpt,
    Screen,
}

impl AdmissionPolicy {
    pub const fn ordered() -> [Self; 3] {
        [Self::Open, Self::EdOpt, Self::Screen]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Open => 0,
            Self::EdOpt => 1,
            Self::Screen => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::EdOpt => "EdOpt",
            Self::Screen => "Screened",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub lottery: LotteryNumber,
    pub gpa: f64,
    #[serde(default)]
    pub selection: Option<SelectionStrategy>,
    #[serde(default)]
    pub ranking: Option<RankingStrategy>,
    #[serde(default)]
    pub list_length: usize,
    /// Ranked choices, most preferred first. Empty when the list is unknown.
    #[serde(default)]
    pub preferences: Vec<Dbn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub dbn: Dbn,
    pub policy: AdmissionPolicy,
    pub popularity: f64,
    pub likeability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Where a student ended up. `rank` is the 1-based position of `school` on the
/// student's list; a placement without one is an unranked match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub school: Dbn,
    #[serde(default)]
    pub rank: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolOutcome {
    #[serde(default)]
    pub matched: Vec<StudentId>,
    pub match_count: usize,
    pub total_seats: usize,
    #[serde(default)]
    pub true_applicants: usize,
}

impl SchoolOutcome {
    /// Seats left open; negative when the school was over-filled.
    pub fn deficit(&self) -> i64 {
        self.total_seats as i64 - self.match_count as i64
    }
}

/// 1-based bucket index: choices 1..=12, then 13 for unmatched students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RankBin(u8);

impl RankBin {
    pub const UNMATCHED: Self = Self(BIN_COUNT as u8);

    pub fn choice(rank: u8) -> Option<Self> {
        (1..=MAX_CHOICES as u8).contains(&rank).then_some(Self(rank))
    }

    pub fn for_placement(placement: Option<&Placement>) -> Option<Self> {
        match placement {
            None => Some(Self::UNMATCHED),
            Some(Placement { rank: Some(rank), .. }) => Self::choice(*rank),
            Some(Placement { rank: None, .. }) => None,
        }
    }

    pub fn ordered() -> [Self; BIN_COUNT] {
        std::array::from_fn(|idx| Self(idx as u8 + 1))
    }

    pub const fn rank(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub const fn is_unmatched(self) -> bool {
        self.0 as usize == BIN_COUNT
    }

    pub fn label(self) -> String {
        if self.is_unmatched() {
            "U".to_string()
        } else {
            self.0.to_string()
        }
    }
}

/// Lottery numbers partitioned by the choice rank students were matched at.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RankBins {
    bins: Vec<Vec<LotteryNumber>>,
}

impl RankBins {
    /// Takes ownership of the buckets and sorts each one ascending.
    pub fn new(mut bins: Vec<Vec<LotteryNumber>>) -> Result<Self, DataIntegrityError> {
        if bins.len() != BIN_COUNT {
            return Err(DataIntegrityError::BinCount {
                expected: BIN_COUNT,
                found: bins.len(),
            });
        }
        for bin in &mut bins {
            bin.sort_unstable();
        }
        Ok(Self { bins })
    }

    pub fn get(&self, bin: RankBin) -> &[LotteryNumber] {
        &self.bins[bin.index()]
    }

    pub fn len(&self, bin: RankBin) -> usize {
        self.get(bin).len()
    }

    pub fn counts(&self) -> [usize; BIN_COUNT] {
        std::array::from_fn(|idx| self.bins[idx].len())
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// The element at `len / 2` of the sorted bucket (upper middle for even lengths).
    pub fn median(&self, bin: RankBin) -> Option<&LotteryNumber> {
        let values = self.get(bin);
        values.get(values.len() / 2)
    }

    /// Mean ordered key of a bucket, `None` when it is empty.
    pub fn average_key(&self, bin: RankBin) -> Option<u32> {
        let values = self.get(bin);
        if values.is_empty() {
            return None;
        }
        let sum: u64 = values
            .iter()
            .map(|lottery| u64::from(lottery.to_ordered_key()))
            .sum();
        Some((sum / values.len() as u64) as u32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RankBin, &[LotteryNumber])> {
        RankBin::ordered()
            .into_iter()
            .map(move |bin| (bin, self.get(bin)))
    }
}

impl<'de> Deserialize<'de> for RankBins {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bins = Vec::<Vec<LotteryNumber>>::deserialize(deserializer)?;
        Self::new(bins).map_err(serde::de::Error::custom)
    }
}

/// One simulation run's complete result, delivered atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub students: BTreeMap<StudentId, Student>,
    pub schools: BTreeMap<Dbn, School>,
    pub rank_bins: RankBins,
    pub matches: BTreeMap<StudentId, Option<Placement>>,
    pub school_outcomes: BTreeMap<Dbn, SchoolOutcome>,
}

impl ResultSnapshot {
    /// Ingestion checks shared by the importer and the aggregator.
    pub fn validate(&self) -> Result<(), DataIntegrityError> {
        let population = self.rank_bins.total();
        if population == 0 {
            return Err(DataIntegrityError::EmptyPopulation);
        }

        if self.matches.len() != population {
            return Err(DataIntegrityError::PopulationMismatch {
                binned: population,
                matches: self.matches.len(),
            });
        }

        for (id, student) in &self.students {
            if *id != student.id {
                return Err(DataIntegrityError::KeyMismatch {
                    key: id.0.clone(),
                    record: student.id.0.clone(),
                });
            }
        }

        for (dbn, school) in &self.schools {
            if *dbn != school.dbn {
                return Err(DataIntegrityError::KeyMismatch {
                    key: dbn.0.clone(),
                    record: school.dbn.0.clone(),
                });
            }
        }

        for (student_id, placement) in &self.matches {
            let student = self
                .students
                .get(student_id)
                .ok_or_else(|| DataIntegrityError::UnknownStudent(student_id.clone()))?;
            let Some(Placement {
                school,
                rank: Some(rank),
            }) = placement
            else {
                continue;
            };
            if RankBin::choice(*rank).is_none() {
                return Err(DataIntegrityError::RankOutOfRange {
                    student: student_id.clone(),
                    rank: *rank,
                });
            }
            if student.preferences.get(usize::from(*rank) - 1) != Some(school) {
                return Err(DataIntegrityError::PreferenceMismatch {
                    student: student_id.clone(),
                    rank: *rank,
                    school: school.clone(),
                });
            }
        }

        for (dbn, outcome) in &self.school_outcomes {
            if outcome.matched.len() != outcome.match_count {
                return Err(DataIntegrityError::MatchCountMismatch {
                    school: dbn.clone(),
                    listed: outcome.matched.len(),
                    match_count: outcome.match_count,
                });
            }
        }

        Ok(())
    }

    pub fn student(&self, id: &StudentId) -> Result<&Student, DataIntegrityError> {
        self.students
            .get(id)
            .ok_or_else(|| DataIntegrityError::UnknownStudent(id.clone()))
    }

    /// `Ok(None)` means the student is known and unmatched.
    pub fn placement(&self, id: &StudentId) -> Result<Option<&Placement>, DataIntegrityError> {
        self.matches
            .get(id)
            .map(Option::as_ref)
            .ok_or_else(|| DataIntegrityError::MissingMatch(id.clone()))
    }

    pub fn outcome(&self, dbn: &Dbn) -> Result<&SchoolOutcome, DataIntegrityError> {
        self.school_outcomes
            .get(dbn)
            .ok_or_else(|| DataIntegrityError::UnknownSchool(dbn.clone()))
    }
}

/// Input shapes that make every derived statistic meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    #[error("snapshot contains no students")]
    EmptyPopulation,
    #[error("cannot classify against an empty cohort")]
    EmptyCohort,
    #[error("cohort or subject value is not a finite number")]
    NonFiniteValue,
    #[error("malformed lottery number '{0}'")]
    MalformedLottery(String),
    #[error("expected {expected} rank bins, found {found}")]
    BinCount { expected: usize, found: usize },
    #[error("rank bins hold {binned} students but {matches} match entries were delivered")]
    PopulationMismatch { binned: usize, matches: usize },
    #[error("record keyed '{key}' carries identifier '{record}'")]
    KeyMismatch { key: String, record: String },
    #[error("unknown student '{0}'")]
    UnknownStudent(StudentId),
    #[error("no match entry for student '{0}'")]
    MissingMatch(StudentId),
    #[error("no outcome recorded for school '{0}'")]
    UnknownSchool(Dbn),
    #[error("student '{student}' matched at rank {rank}, outside 1..=12")]
    RankOutOfRange { student: StudentId, rank: u8 },
    #[error("preference list of '{student}' does not place '{school}' at choice {rank}")]
    PreferenceMismatch {
        student: StudentId,
        rank: u8,
        school: Dbn,
    },
    #[error("school '{school}' lists {listed} matched students but reports {match_count}")]
    MatchCountMismatch {
        school: Dbn,
        listed: usize,
        match_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),
    #[error("student '{0}' is not part of this run")]
    UnknownStudent(StudentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lottery(raw: &str) -> LotteryNumber {
        LotteryNumber::parse(raw).expect("valid lottery number")
    }

    fn bins_with(first: Vec<LotteryNumber>) -> Vec<Vec<LotteryNumber>> {
        let mut bins = vec![Vec::new(); BIN_COUNT];
        bins[0] = first;
        bins
    }

    #[test]
    fn rank_bin_labels_and_bounds() {
        assert_eq!(RankBin::choice(1).expect("rank 1").label(), "1");
        assert_eq!(RankBin::UNMATCHED.label(), "U");
        assert!(RankBin::choice(0).is_none());
        assert!(RankBin::choice(13).is_none());
        assert_eq!(RankBin::ordered().len(), BIN_COUNT);
        assert_eq!(RankBin::ordered()[12], RankBin::UNMATCHED);
    }

    #[test]
    fn placement_maps_to_bins() {
        let ranked = Placement {
            school: Dbn("01M292".to_string()),
            rank: Some(3),
        };
        let unranked = Placement {
            school: Dbn("01M292".to_string()),
            rank: None,
        };
        assert_eq!(RankBin::for_placement(Some(&ranked)), RankBin::choice(3));
        assert_eq!(RankBin::for_placement(None), Some(RankBin::UNMATCHED));
        assert_eq!(RankBin::for_placement(Some(&unranked)), None);
    }

    #[test]
    fn rank_bins_require_thirteen_buckets() {
        let error = RankBins::new(vec![Vec::new(); 12]).expect_err("twelve buckets rejected");
        assert_eq!(
            error,
            DataIntegrityError::BinCount {
                expected: 13,
                found: 12
            }
        );
    }

    #[test]
    fn median_uses_element_at_half_length() {
        let bins = RankBins::new(bins_with(vec![
            lottery("d8b0965e-9e71-c53b-f849-953a82e164d1"),
            lottery("0c68f153-12e5-3e7f-2234-6517592f1763"),
            lottery("7833cfd2-93c5-b281-407b-c3b96160ea3f"),
            lottery("3a4bdc7f-8e91-0c2a-6f5d-1b9e6a38d047"),
        ]))
        .expect("valid bins");

        let first = RankBin::choice(1).expect("rank 1");
        let median = bins.median(first).expect("median present");
        assert_eq!(median.leading_digit(), '7');
        assert!(bins.median(RankBin::UNMATCHED).is_none());
    }

    #[test]
    fn average_key_is_mean_of_ordered_keys() {
        let bins = RankBins::new(bins_with(vec![
            lottery("00000010-0000-0000-0000-000000000000"),
            lottery("00000030-0000-0000-0000-000000000000"),
        ]))
        .expect("valid bins");
        let first = RankBin::choice(1).expect("rank 1");
        assert_eq!(bins.average_key(first), Some(0x20));
        assert_eq!(bins.average_key(RankBin::UNMATCHED), None);
    }

    #[test]
    fn deserializing_bins_sorts_and_validates() {
        let mut raw = vec![Vec::<String>::new(); BIN_COUNT];
        raw[1] = vec![
            "ffffffff-0000-0000-0000-000000000000".to_string(),
            "00000001-0000-0000-0000-000000000000".to_string(),
        ];
        let json = serde_json::to_string(&raw).expect("serialize");
        let bins: RankBins = serde_json::from_str(&json).expect("bins parse");
        let second = RankBin::choice(2).expect("rank 2");
        assert_eq!(bins.get(second)[0].to_ordered_key(), 1);

        let short = serde_json::to_string(&vec![Vec::<String>::new(); 3]).expect("serialize");
        assert!(serde_json::from_str::<RankBins>(&short).is_err());
    }
}
