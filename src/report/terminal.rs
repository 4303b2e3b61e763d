use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use super::Analysis;
use crate::models::Finding;

/// Render the store analysis: summary box, most common phantom deps, newest
/// entries, and dependencies that tend to go missing together.
pub fn render_analysis(analysis: &Analysis, store_path: &Path, quiet: bool) {
    let stats = &analysis.stats;

    if quiet {
        println!(
            "Packages: {}  Phantom deps: {}  Average: {:.2}",
            stats.total_packages.to_string().cyan(),
            stats.total_phantom_deps.to_string().yellow(),
            stats.average_phantom_deps_per_package,
        );
        return;
    }

    println!("\n {} v{}", "phantom-scan".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Store: {}\n", store_path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(
        " │  {:<48} │",
        format!("Total unique packages     : {}", stats.total_packages)
    );
    println!(
        " │  {:<48} │",
        format!("Total phantom dependencies: {}", stats.total_phantom_deps)
    );
    println!(
        " │  {:<48} │",
        format!(
            "Average per package       : {:.2}",
            stats.average_phantom_deps_per_package
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if stats.total_packages == 0 {
        println!(" {} The store is empty.\n", "[INFO]".cyan().bold());
        return;
    }

    println!(" {} Most common phantom dependencies:\n", "[TOP]".yellow().bold());
    let mut table = new_table(&["#", "Dependency", "Packages"]);
    for (idx, dep) in stats
        .most_common_phantom_deps
        .iter()
        .take(Analysis::TOP_DEPS)
        .enumerate()
    {
        table.add_row(vec![
            Cell::new(idx + 1).set_alignment(CellAlignment::Right),
            Cell::new(&dep.name),
            Cell::new(dep.packages).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}\n", table);

    println!(
        " {} Newest entries (last {}):\n",
        "[NEW]".green().bold(),
        analysis.newest.len()
    );
    render_findings(&analysis.newest);
    println!();

    if analysis.common_pairs.is_empty() {
        println!(" {} No dependency pairs repeat across packages.\n", "[PAIRS]".magenta().bold());
        return;
    }

    println!(" {} Common dependency pairs:\n", "[PAIRS]".magenta().bold());
    let mut table = new_table(&["Pair", "Packages"]);
    for pair in &analysis.common_pairs {
        table.add_row(vec![
            Cell::new(format!("{} + {}", pair.first, pair.second)),
            Cell::new(pair.packages).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}\n", table);
}

/// Tabulate findings in the order given.
pub fn render_findings(findings: &[Finding]) {
    let mut table = new_table(&["Package", "Phantom deps", "Downloads", "Updated"]);

    for finding in findings {
        let deps = finding
            .phantom_deps
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        let downloads = match finding.download_count {
            Some(count) => Cell::new(count).set_alignment(CellAlignment::Right),
            None => Cell::new("Not recorded").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(&finding.package_name).add_attribute(Attribute::Bold),
            Cell::new(deps).fg(Color::Yellow),
            downloads,
            Cell::new(finding.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }

    println!("{}", table);
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}
