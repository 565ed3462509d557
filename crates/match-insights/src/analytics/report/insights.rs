use super::super::classify::{Comparison, StudentOutcome};
use super::views::{HeadlineFigure, ResultInsights, ResultSummary};

pub(crate) fn generate_insights(summary: &ResultSummary, school_count: usize) -> ResultInsights {
    let total = summary.total_students;

    let mut headlines = vec![
        headline(
            &summary.top_choice,
            total,
            "were matched to their top choice",
        ),
        headline(
            &summary.top_five,
            total,
            "were matched to one of their top five choices",
        ),
        headline(&summary.unmatched, total, "were unmatched"),
    ];
    headlines.push(format!(
        "Students listed {:.1} schools on average.",
        summary.avg_list_length
    ));

    let bin_observations = summary
        .bins
        .iter()
        .filter_map(|entry| {
            let digit = entry.median_leading_digit?;
            let subject = if entry.bin.is_unmatched() {
                "unmatched students".to_string()
            } else {
                format!("students matched to choice {}", entry.label)
            };
            Some(format!(
                "Most {subject} have a lottery number starting with {digit}."
            ))
        })
        .collect();

    let capacity = &summary.capacity;
    let mut capacity_observations = Vec::new();
    if school_count > 0 {
        capacity_observations.push(format!(
            "{} of {} schools have open seats ({} of {} seats unfilled).",
            group_thousands(capacity.schools_unfilled_count),
            group_thousands(school_count),
            group_thousands(capacity.seats_unfilled),
            group_thousands(capacity.total_capacity)
        ));
    }
    if !capacity.overfilled_schools.is_empty() {
        let listed: Vec<&str> = capacity
            .overfilled_schools
            .iter()
            .map(|dbn| dbn.0.as_str())
            .collect();
        capacity_observations.push(format!(
            "{} school{} matched more students than seats: {}.",
            listed.len(),
            if listed.len() == 1 { "" } else { "s" },
            listed.join(", ")
        ));
    }

    ResultInsights {
        headlines,
        bin_observations,
        capacity_observations,
    }
}

fn headline(figure: &HeadlineFigure, total: usize, outcome: &str) -> String {
    let mut line = format!(
        "{:.1}% of the students {outcome} ({} out of {}).",
        figure.ratio * 100.0,
        group_thousands(figure.count),
        group_thousands(total)
    );
    if let Some(key) = &figure.average_key {
        line.push_str(&format!(
            " Their average lottery number starts with the digits {key}."
        ));
    }
    line
}

pub(crate) fn student_narrative(outcome: &StudentOutcome) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(match &outcome.placement {
        Some(placement) => match placement.rank {
            Some(rank) => format!("Matched to {} (choice {rank}).", placement.school),
            None => format!("Matched to {} (rank not recorded).", placement.school),
        },
        None => "Not matched to any school on the list.".to_string(),
    });

    lines.push(format!(
        "Lottery number {} is {} compared to all students.",
        outcome.lottery.prefix(8),
        outcome.population_lottery.label
    ));

    if let Some(median) = &outcome.bin_median {
        lines.push(format!(
            "The median lottery number in the same bin starts with {}.",
            median.prefix(2)
        ));
    }

    lines.push(match &outcome.same_school {
        Comparison::Computed(same) => format!(
            "Among {} students matched at {}, the lottery number is {} and the GPA is {}.",
            same.cohort_size, same.school, same.lottery.label, same.gpa.label
        ),
        Comparison::NotApplicable { reason } => {
            format!("No same-school comparison: {}.", reason.label())
        }
    });

    lines.push(match &outcome.ahead {
        Comparison::Computed(ahead) => format!(
            "Of the {} students matched at schools ranked higher, {:.0}% had a better lottery number and {:.0}% had a worse lottery number but a higher GPA.",
            ahead.students_ahead,
            ahead.fraction_better_lottery * 100.0,
            ahead.fraction_worse_lottery_higher_gpa * 100.0
        ),
        Comparison::NotApplicable { reason } => {
            format!("No comparison with higher-ranked schools: {}.", reason.label())
        }
    });

    lines
}

pub(crate) fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
