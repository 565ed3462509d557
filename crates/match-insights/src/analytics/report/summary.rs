use super::super::aggregate::ResultAggregator;
use super::super::classify::StudentOutcome;
use super::super::domain::{AdmissionPolicy, RankBin, RankingStrategy, SelectionStrategy};
use super::super::lottery::format_key;
use super::views::{
    BinEntry, CapacityView, HeadlineFigure, PolicyEntry, ResultInsights, ResultSummary,
    StrategyEntry,
};

impl ResultAggregator {
    pub fn summary(&self) -> ResultSummary {
        let stats = self.stats();

        let bins = RankBin::ordered()
            .into_iter()
            .map(|bin| {
                let median = stats.median(bin).cloned();
                BinEntry {
                    bin,
                    label: bin.label(),
                    count: stats.count(bin),
                    ratio: stats.ratio(bin),
                    percentage: stats.ratio(bin) * 100.0,
                    median_leading_digit: median.as_ref().map(|lottery| lottery.leading_digit()),
                    median,
                    average_key: stats.average_key(bin).map(format_key),
                }
            })
            .collect();

        let strategies = SelectionStrategy::ordered()
            .into_iter()
            .flat_map(|selection| {
                RankingStrategy::ordered()
                    .into_iter()
                    .map(move |ranking| (selection, ranking))
            })
            .map(|(selection, ranking)| StrategyEntry {
                selection,
                selection_label: selection.label(),
                ranking,
                ranking_label: ranking.label(),
                students: stats.strategy_matrix.get(selection, ranking),
            })
            .collect();

        let admission_policies = AdmissionPolicy::ordered()
            .into_iter()
            .map(|policy| PolicyEntry {
                policy,
                policy_label: policy.label(),
                schools: stats.admission_policies.get(policy),
            })
            .collect();

        let first = RankBin::ordered()[0];
        let unmatched = RankBin::UNMATCHED;

        ResultSummary {
            total_students: stats.total_students,
            top_choice: HeadlineFigure {
                count: stats.count(first),
                ratio: stats.ratio(first),
                average_key: stats.average_key(first).map(format_key),
            },
            top_five: HeadlineFigure {
                count: stats.count_top_five,
                ratio: stats.ratio_top_five,
                average_key: stats.average_key_top_five.map(format_key),
            },
            unmatched: HeadlineFigure {
                count: stats.count(unmatched),
                ratio: stats.ratio(unmatched),
                average_key: stats.average_key(unmatched).map(format_key),
            },
            avg_list_length: stats.avg_list_length,
            bins,
            strategies,
            admission_policies,
            capacity: CapacityView {
                total_capacity: stats.total_capacity,
                seats_unfilled: stats.seats_unfilled,
                schools_unfilled_count: stats.schools_unfilled_count,
                schools_unfilled: stats.schools_unfilled.clone(),
                overfilled_schools: stats.overfilled_schools.clone(),
                true_applicants_total: stats.true_applicants_total,
            },
        }
    }
}

impl ResultSummary {
    pub fn insights(&self, school_count: usize) -> ResultInsights {
        super::generate_insights(self, school_count)
    }
}

impl StudentOutcome {
    pub fn narrative(&self) -> Vec<String> {
        super::student_narrative(self)
    }
}
