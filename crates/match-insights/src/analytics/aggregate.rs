//! One-pass aggregate statistics over a validated [`ResultSnapshot`].

use super::domain::{
    AdmissionPolicy, AnalyticsError, DataIntegrityError, Dbn, RankBin, RankingStrategy,
    ResultSnapshot, SelectionStrategy, BIN_COUNT,
};
use super::lottery::LotteryNumber;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bins summed into the "top five choices" figures.
pub const TOP_CHOICES: usize = 5;

/// Students per (selection strategy, ranking strategy) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyMatrix {
    cells: [[usize; 2]; 2],
}

impl StrategyMatrix {
    pub fn get(&self, selection: SelectionStrategy, ranking: RankingStrategy) -> usize {
        self.cells[selection.index()][ranking.index()]
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    fn record(&mut self, selection: SelectionStrategy, ranking: RankingStrategy) {
        self.cells[selection.index()][ranking.index()] += 1;
    }
}

/// Schools per admission policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolicyCounts {
    counts: [usize; 3],
}

impl PolicyCounts {
    pub fn get(&self, policy: AdmissionPolicy) -> usize {
        self.counts[policy.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateStats {
    pub counts: [usize; BIN_COUNT],
    pub ratios: [f64; BIN_COUNT],
    pub total_students: usize,
    pub count_top_five: usize,
    pub ratio_top_five: f64,
    pub avg_list_length: f64,
    pub strategy_matrix: StrategyMatrix,
    pub admission_policies: PolicyCounts,
    pub total_capacity: usize,
    pub seats_unfilled: usize,
    pub schools_unfilled: Vec<Dbn>,
    pub schools_unfilled_count: usize,
    pub overfilled_schools: Vec<Dbn>,
    pub true_applicants_total: usize,
    pub bin_medians: Vec<Option<LotteryNumber>>,
    pub bin_average_keys: [Option<u32>; BIN_COUNT],
    pub average_key_top_five: Option<u32>,
}

impl AggregateStats {
    pub fn count(&self, bin: RankBin) -> usize {
        self.counts[bin.index()]
    }

    pub fn ratio(&self, bin: RankBin) -> f64 {
        self.ratios[bin.index()]
    }

    pub fn median(&self, bin: RankBin) -> Option<&LotteryNumber> {
        self.bin_medians[bin.index()].as_ref()
    }

    pub fn average_key(&self, bin: RankBin) -> Option<u32> {
        self.bin_average_keys[bin.index()]
    }
}

/// Owns one snapshot and the statistics derived from it. Both are immutable
/// once built; a new run means a new aggregator.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    snapshot: Arc<ResultSnapshot>,
    stats: AggregateStats,
}

impl ResultAggregator {
    pub fn new(snapshot: Arc<ResultSnapshot>) -> Result<Self, AnalyticsError> {
        snapshot.validate()?;
        let stats = compute_stats(&snapshot)?;
        debug!(
            total_students = stats.total_students,
            schools = snapshot.schools.len(),
            seats_unfilled = stats.seats_unfilled,
            "aggregate statistics computed"
        );
        Ok(Self { snapshot, stats })
    }

    pub fn snapshot(&self) -> &ResultSnapshot {
        &self.snapshot
    }

    pub fn shared_snapshot(&self) -> Arc<ResultSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }
}

fn compute_stats(snapshot: &ResultSnapshot) -> Result<AggregateStats, DataIntegrityError> {
    let bins = &snapshot.rank_bins;
    let counts = bins.counts();
    let total_students: usize = counts.iter().sum();
    if total_students == 0 {
        return Err(DataIntegrityError::EmptyPopulation);
    }

    let ratios: [f64; BIN_COUNT] =
        std::array::from_fn(|idx| counts[idx] as f64 / total_students as f64);
    let count_top_five: usize = counts[..TOP_CHOICES].iter().sum();
    let ratio_top_five: f64 = ratios[..TOP_CHOICES].iter().sum();

    let bin_medians = RankBin::ordered()
        .into_iter()
        .map(|bin| bins.median(bin).cloned())
        .collect();
    let bin_average_keys: [Option<u32>; BIN_COUNT] =
        std::array::from_fn(|idx| bins.average_key(RankBin::ordered()[idx]));
    let average_key_top_five = weighted_average_key(&counts, &bin_average_keys, TOP_CHOICES);

    let avg_list_length = average_list_length(snapshot)?;
    let strategy_matrix = strategy_matrix(snapshot);
    let admission_policies = admission_policies(snapshot);

    let mut total_capacity = 0;
    let mut seats_unfilled = 0;
    let mut true_applicants_total = 0;
    let mut schools_unfilled = Vec::new();
    let mut overfilled_schools = Vec::new();
    for (dbn, outcome) in &snapshot.school_outcomes {
        total_capacity += outcome.total_seats;
        true_applicants_total += outcome.true_applicants;
        let deficit = outcome.deficit();
        if deficit > 0 {
            seats_unfilled += deficit as usize;
            schools_unfilled.push(dbn.clone());
        } else if deficit < 0 {
            warn!(
                school = %dbn,
                match_count = outcome.match_count,
                total_seats = outcome.total_seats,
                "school matched more students than it has seats"
            );
            overfilled_schools.push(dbn.clone());
        }
    }
    let schools_unfilled_count = schools_unfilled.len();

    Ok(AggregateStats {
        counts,
        ratios,
        total_students,
        count_top_five,
        ratio_top_five,
        avg_list_length,
        strategy_matrix,
        admission_policies,
        total_capacity,
        seats_unfilled,
        schools_unfilled,
        schools_unfilled_count,
        overfilled_schools,
        true_applicants_total,
        bin_medians,
        bin_average_keys,
        average_key_top_five,
    })
}

/// Mean list length over every match entry, unmatched entries included.
fn average_list_length(snapshot: &ResultSnapshot) -> Result<f64, DataIntegrityError> {
    if snapshot.matches.is_empty() {
        return Err(DataIntegrityError::EmptyPopulation);
    }

    let mut total = 0usize;
    for student_id in snapshot.matches.keys() {
        total += snapshot.student(student_id)?.list_length;
    }
    Ok(total as f64 / snapshot.matches.len() as f64)
}

fn strategy_matrix(snapshot: &ResultSnapshot) -> StrategyMatrix {
    let mut matrix = StrategyMatrix::default();
    for student in snapshot.students.values() {
        if let (Some(selection), Some(ranking)) = (student.selection, student.ranking) {
            matrix.record(selection, ranking);
        }
    }
    matrix
}

fn admission_policies(snapshot: &ResultSnapshot) -> PolicyCounts {
    let mut policies = PolicyCounts::default();
    for school in snapshot.schools.values() {
        policies.counts[school.policy.index()] += 1;
    }
    policies
}

/// Count-weighted mean of the first `limit` bin averages.
fn weighted_average_key(
    counts: &[usize; BIN_COUNT],
    averages: &[Option<u32>; BIN_COUNT],
    limit: usize,
) -> Option<u32> {
    let mut weighted = 0u128;
    let mut population = 0u128;
    for (count, average) in counts.iter().zip(averages).take(limit) {
        if let Some(average) = average {
            weighted += *count as u128 * u128::from(*average);
            population += *count as u128;
        }
    }
    (population > 0).then(|| (weighted / population) as u32)
}
