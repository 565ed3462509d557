use super::super::domain::{AdmissionPolicy, Dbn, RankBin, RankingStrategy, SelectionStrategy};
use super::super::lottery::LotteryNumber;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BinEntry {
    pub bin: RankBin,
    pub label: String,
    pub count: usize,
    pub ratio: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<LotteryNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_leading_digit: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyEntry {
    pub selection: SelectionStrategy,
    pub selection_label: &'static str,
    pub ranking: RankingStrategy,
    pub ranking_label: &'static str,
    pub students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyEntry {
    pub policy: AdmissionPolicy,
    pub policy_label: &'static str,
    pub schools: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityView {
    pub total_capacity: usize,
    pub seats_unfilled: usize,
    pub schools_unfilled_count: usize,
    pub schools_unfilled: Vec<Dbn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overfilled_schools: Vec<Dbn>,
    pub true_applicants_total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadlineFigure {
    pub count: usize,
    pub ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub total_students: usize,
    pub top_choice: HeadlineFigure,
    pub top_five: HeadlineFigure,
    pub unmatched: HeadlineFigure,
    pub avg_list_length: f64,
    pub bins: Vec<BinEntry>,
    pub strategies: Vec<StrategyEntry>,
    pub admission_policies: Vec<PolicyEntry>,
    pub capacity: CapacityView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultInsights {
    pub headlines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bin_observations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacity_observations: Vec<String>,
}
