//! Utility command handlers: auto-replace and stats.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use crate::cli::handlers::read_input;
use crate::cli::output::{output_json, print_header, print_kv, print_success, OutputMode};
use crate::init::AppContext;
use crate::services::{CacheInfo, CollectorSettings, DetectionStatistics};

pub fn handle_replace(
    ctx: &AppContext,
    file: &Path,
    cursor: Option<usize>,
    write: bool,
    mode: OutputMode,
) -> Result<()> {
    if write && file.as_os_str() == "-" {
        bail!("--write needs a file path, not stdin");
    }
    let text = read_input(file)?;
    let (replaced, new_cursor) = match cursor {
        Some(pos) => {
            let (out, moved) = ctx.auto_replace.apply_near_cursor(&text, pos);
            (out, Some(moved))
        }
        None => (ctx.auto_replace.apply(&text), None),
    };

    if write {
        std::fs::write(file, &replaced)
            .with_context(|| format!("Failed to write {}", file.display()))?;
    }

    if mode == OutputMode::Json {
        output_json(&serde_json::json!({
            "text": replaced,
            "cursor": new_cursor,
            "changed": replaced != text,
        }));
        return Ok(());
    }

    if write {
        print_success(&format!("Updated {}", file.display()));
    } else {
        print!("{}", replaced);
    }
    Ok(())
}

#[derive(Serialize)]
struct StatsReport {
    data_path: String,
    catalog_entries: usize,
    detection: DetectionStatistics,
    concept_cache: CacheInfo,
    collector: CollectorSettings,
    replace_rules: usize,
}

pub fn handle_stats(ctx: &AppContext, mode: OutputMode) -> Result<()> {
    let report = StatsReport {
        data_path: ctx.data_path.display().to_string(),
        catalog_entries: ctx.catalog.len(),
        detection: ctx.detector.statistics(),
        concept_cache: ctx.concepts.cache_info(),
        collector: ctx.collector.statistics(),
        replace_rules: ctx.auto_replace.rules().iter().filter(|r| r.enabled).count(),
    };

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }

    print_header(&format!("Scrivo: {}", report.data_path));
    print_kv("Catalog entries", &report.catalog_entries.to_string());
    print_kv(
        "Trackable entries",
        &report.detection.trackable_entries.to_string(),
    );
    print_kv("Aliases", &report.detection.alias_count.to_string());
    for (entity_type, count) in &report.detection.entries_by_type {
        print_kv(&format!("  {}", entity_type), &count.to_string());
    }
    print_kv(
        "Confidence threshold",
        &format!("{:.2}", report.detection.confidence_threshold),
    );
    print_kv(
        "Time filters",
        &format!(
            "{} active, {} disabled",
            report.detection.time_filters.active, report.detection.time_filters.disabled
        ),
    );
    print_kv(
        "Quantity filters",
        &format!(
            "{} active, {} disabled",
            report.detection.quantity_filters.active, report.detection.quantity_filters.disabled
        ),
    );
    if !report.detection.disabled_patterns.is_empty() {
        print_kv(
            "Disabled patterns",
            &report.detection.disabled_patterns.join(", "),
        );
    }
    print_kv(
        "Concept cache",
        &format!(
            "{}/{} entries",
            report.concept_cache.entries, report.concept_cache.max_entries
        ),
    );
    print_kv(
        "Windows",
        &format!(
            "{} before / {} after",
            report.collector.extraction.primary_window_size,
            report.collector.extraction.secondary_window_size
        ),
    );
    print_kv(
        "Max query length",
        &report.collector.collector.max_query_length.to_string(),
    );
    print_kv("Replace rules", &report.replace_rules.to_string());
    Ok(())
}
