//! Terminal summaries printed at the end of each command.

use recon_pipeline::PipelineError;
use recon_pipeline::ingest::PreprocessSummary;
use recon_pipeline::quality::{CombineSummary, Comparison, ComparisonReport};
use recon_pipeline::reconstruction::DriverReport;
use std::path::Path;

const RULE: &str = "============================================================";
const WORSE_SHOWN: usize = 10;

pub fn print_preprocess(summary: &PreprocessSummary) {
    println!("{RULE}");
    for scene in &summary.scenes {
        println!(
            "{}: {}/{} frames{}",
            scene.scene_id,
            scene.written,
            scene.requested,
            if scene.failures.is_empty() { "" } else { " (some frames skipped)" }
        );
    }
    for (scene_id, reason) in &summary.skipped {
        println!("{scene_id}: skipped, {reason}");
    }
    println!("{RULE}");
    println!(
        "Processed {} frames across {} scenes",
        summary.total_written(),
        summary.scenes.len()
    );
}

pub fn print_reconstruction(results: &[(String, Result<DriverReport, PipelineError>)]) {
    println!("{RULE}");
    for (scene_id, result) in results {
        match result {
            Ok(report) if report.reconstructed() => {
                println!(
                    "{}: {} images registered ({}) -> {}",
                    scene_id,
                    report.registered,
                    report.quality,
                    report.output_dir.display()
                );
            }
            Ok(report) => {
                println!("{}: reconstruction failed, no images registered", scene_id);
                for warning in &report.warnings {
                    println!("    {warning}");
                }
            }
            Err(err) => println!("{scene_id}: {err}"),
        }
    }
    println!("{RULE}");
}

pub fn print_combine(summary: &CombineSummary, good_list: &Path) {
    println!("{RULE}");
    for result in &summary.results {
        let counts: Vec<String> = result
            .candidates
            .iter()
            .map(|c| format!("{}={}", c.tag, c.registered))
            .collect();
        println!(
            "{}: {} frames ({}) {} [{}]",
            result.scene_id,
            result.winner.registered,
            result.winner.tag,
            result.quality.label().to_uppercase(),
            counts.join(", ")
        );
    }
    println!("{RULE}");
    for (tag, picks) in &summary.picks {
        println!("Picked {tag}: {picks}");
    }
    println!("Good scenes: {}", summary.good_scenes.len());
    println!("Saved good scene list to {}", good_list.display());
}

pub fn print_analysis(report: &ComparisonReport, good_threshold: usize, good_list: &Path) {
    println!("{RULE}");
    println!("Scenes analyzed: {}", report.entries.len());
    println!("  Good (>={good_threshold}):  {}", report.count(Comparison::Good));
    println!(
        "  Improved (but <{good_threshold}):  {}",
        report.count(Comparison::Improved)
    );
    println!("  Same:        {}", report.count(Comparison::Same));
    println!("  Worse:       {}", report.count(Comparison::Worse));
    println!("  Failed:      {}", report.count(Comparison::Failed));

    let good = report.good();
    if !good.is_empty() {
        println!("{RULE}");
        println!("Good scenes:");
        for entry in good {
            if entry.baseline == entry.robust {
                println!("  {}: {}", entry.scene_id, entry.robust);
            } else {
                println!("  {}: {} (was {})", entry.scene_id, entry.robust, entry.baseline);
            }
        }
    }

    let improved = report.improved_below_good();
    if !improved.is_empty() {
        println!("{RULE}");
        println!("Improved but below {good_threshold}:");
        for entry in improved {
            println!(
                "  {}: {} -> {} (+{})",
                entry.scene_id,
                entry.baseline,
                entry.robust,
                entry.robust - entry.baseline
            );
        }
    }

    let worse = report.worse(WORSE_SHOWN);
    if !worse.is_empty() {
        println!("{RULE}");
        println!("Got worse:");
        for entry in worse {
            println!("  {}: {} -> {}", entry.scene_id, entry.baseline, entry.robust);
        }
    }
    println!("{RULE}");
    println!("Saved good scene list to {}", good_list.display());
}
