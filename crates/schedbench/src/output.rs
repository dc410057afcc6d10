//! Summary rendering for benchmark results

use std::path::Path;

use colored::Colorize;
use schedbench_lib::BenchResults;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn summary_rows(policy: &str, results: &BenchResults) -> Vec<SummaryRow> {
    vec![
        SummaryRow {
            metric: "Scheduler".to_string(),
            value: policy.to_string(),
        },
        SummaryRow {
            metric: "Containers scheduled".to_string(),
            value: results.containers_scheduled.to_string(),
        },
        SummaryRow {
            metric: "Scheduling failures".to_string(),
            value: results.scheduling_failures.to_string(),
        },
        SummaryRow {
            metric: "Average latency".to_string(),
            value: format!("{:.2}ms", results.average_latency_ms),
        },
        SummaryRow {
            metric: "Resource utilization".to_string(),
            value: format!("{:.1}%", results.resource_utilization * 100.0),
        },
    ]
}

/// Print the end-of-run summary table.
pub fn print_summary(policy: &str, results: &BenchResults, output: &Path) {
    println!(
        "{} results written to {}",
        "✓".green().bold(),
        output.display()
    );
    let table = Table::new(summary_rows(policy, results))
        .with(Style::rounded())
        .to_string();
    println!("{table}");
}
