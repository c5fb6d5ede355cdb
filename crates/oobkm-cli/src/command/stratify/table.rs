//! Survival analysis table display
//!
//! This module provides functions for displaying per-group survival statistics
//! in a consistent tabular format.

use oobkm_analysis::{
    risk_group::RiskGroup,
    survival::{SurvivalStats, SurvivalStatsMap},
};

/// Print table header
fn print_survival_table_header() {
    println!(
        "  {:<12} {:>8} {:>8} {:>10} {:>12} {:>12} {:>12}",
        "Group", "Subjects", "Events", "Censored%", "Mean(Event)", "Mean(All)", "Median(KM)",
    );
}

/// Print table separator line
fn print_survival_table_separator() {
    // 12 + 8 + 8 + 10 + 12 + 12 + 12 columns, 6 separating spaces
    println!("  {}", "-".repeat(80));
}

/// Print a single table row
fn print_survival_table_row(group: RiskGroup, stats: &SurvivalStats) {
    let median_str = stats
        .median_km
        .map_or("N/A".to_string(), |m| format!("{m:.2}"));

    println!(
        "  {:<12} {:>8} {:>8} {:>9.1}% {:>12.2} {:>12.2} {:>12}",
        group.label(),
        stats.subjects_count,
        stats.event_count(),
        stats.censoring_rate(),
        stats.mean_complete,
        stats.mean_all,
        median_str,
    );
}

/// Print a formatted survival statistics table, one row per risk group
///
/// Groups without subjects are shown as empty rows.
pub(super) fn print_survival_table(group_stats: &SurvivalStatsMap<RiskGroup>) {
    print_survival_table_header();
    print_survival_table_separator();

    for group in RiskGroup::ALL {
        match group_stats.map.get(&group) {
            Some(stats) => print_survival_table_row(group, stats),
            None => println!("  {:<12} {:>8}", group.label(), "(empty)"),
        }
    }
}

/// Print legend explaining table columns
pub(super) fn print_legend() {
    println!("Legend:");
    println!("  Low Risk    : Out-of-bag score at or below the cohort median");
    println!("  High Risk   : Out-of-bag score above the cohort median");
    println!("  Mean(Event) : Mean time of subjects with an observed event (censored data excluded)");
    println!("  Mean(All)   : Naive mean of all times (events + censored, biased estimate)");
    println!("  Median(KM)  : Kaplan-Meier median survival (N/A if survival never drops to 50%)");
}
