// Enrollment Insights - CLI
// Offline pipeline run: summary to stdout, charts + insights to an output dir

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::env;
use std::fs;
use std::path::Path;

use enrollment_insights::render::RenderConfig;
use enrollment_insights::{analyze_bytes, AnalysisReport};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_mode = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| *a != "--json").collect();

    let Some(csv_path) = positional.first() else {
        eprintln!("Usage: enrollment-insights <dataset.csv> [out-dir] [--json]");
        std::process::exit(2);
    };
    let out_dir = positional
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("report");

    run_report(Path::new(csv_path), Path::new(out_dir), json_mode)
}

fn run_report(csv_path: &Path, out_dir: &Path, json_mode: bool) -> Result<()> {
    println!("📊 Enrollment Insights v{}", enrollment_insights::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load dataset
    println!("\n📂 Loading {}...", csv_path.display());
    let bytes = fs::read(csv_path)
        .with_context(|| format!("Failed to read dataset: {}", csv_path.display()))?;

    // 2. Run the pipeline
    let config = render_config_from_env();
    let report = analyze_bytes(&bytes, &config)
        .with_context(|| format!("Failed to analyze {}", csv_path.display()))?;
    println!(
        "✓ Analyzed {} rows x {} columns",
        report.summary.row_count, report.summary.column_count
    );

    // 3. Print the summary
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    } else {
        print_summary(&report);
    }

    // 4. Write artifacts
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output dir: {}", out_dir.display()))?;
    let mut insights = String::new();
    for (index, artifact) in report.artifacts.iter().enumerate() {
        if let Some(image) = &artifact.image {
            let png = STANDARD
                .decode(image)
                .with_context(|| format!("Failed to decode chart '{}'", artifact.title))?;
            let file = out_dir.join(format!("{:02}-{}.png", index + 1, slug(&artifact.title)));
            fs::write(&file, png)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!("✓ Wrote {}", file.display());
        } else {
            println!("- Skipped '{}' (capability unavailable)", artifact.title);
        }
        insights.push_str(&artifact.insight);
        insights.push('\n');
    }
    fs::write(out_dir.join("insights.txt"), insights)?;
    fs::write(
        out_dir.join("summary.json"),
        serde_json::to_vec_pretty(&report.summary)?,
    )?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ Report complete: {} charts, {} insights → {}",
        report.artifacts.iter().filter(|a| a.image.is_some()).count(),
        report.artifacts.len(),
        out_dir.display()
    );

    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let summary = &report.summary;
    println!("\nColumns: {}", summary.columns.join(", "));

    if !summary.numeric.is_empty() {
        println!("\nNumerical summary:");
        for stat in &summary.numeric {
            println!(
                "  {:<22} count={:<5} mean={:<10.2} std={:<10.2} min={:<8.2} max={:.2}",
                stat.name, stat.count, stat.mean, stat.std, stat.min, stat.max
            );
        }
    }
    if !summary.categorical.is_empty() {
        println!("\nCategorical summary:");
        for stat in &summary.categorical {
            println!(
                "  {:<22} count={:<5} unique={:<4} top={} ({})",
                stat.name, stat.count, stat.unique, stat.top, stat.freq
            );
        }
    }

    let missing: usize = summary.missing.iter().map(|(_, n)| n).sum();
    println!("\nMissing cells: {}", missing);

    println!("\nInsights:");
    for artifact in &report.artifacts {
        println!("  • {}", artifact.insight);
    }
}

/// Runtime configuration for the renderer, shared with the server binary:
/// INSIGHTS_TREEMAP=0/false disables the optional treemap capability.
fn render_config_from_env() -> RenderConfig {
    let treemap = env::var("INSIGHTS_TREEMAP")
        .map(|v| !matches!(v.trim(), "0" | "false" | "off"))
        .unwrap_or(true);
    RenderConfig::detect().with_treemap(treemap)
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
