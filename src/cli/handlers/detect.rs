//! Detection command handlers: references and concepts.

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;

use crate::cli::handlers::read_input;
use crate::cli::output::{
    format_score, output_json, print_header, print_hint, print_kv, print_table, OutputMode,
};
use crate::init::AppContext;
use crate::models::{ConceptMatch, ConfidenceLevel, DetectedReference};
use crate::services::ConceptStatistics;

pub fn handle_detect(
    ctx: &AppContext,
    file: &Path,
    threshold: Option<f32>,
    mode: OutputMode,
) -> Result<()> {
    let text = read_input(file)?;

    if let Some(value) = threshold {
        if !ctx.detector.set_confidence_threshold(value) {
            bail!("Threshold must be within [0, 1], got {}", value);
        }
    }
    let references = ctx.detector.detect(&text);

    if mode == OutputMode::Json {
        output_json(&references);
        return Ok(());
    }

    print_header(&format!("{} references", references.len()));
    print_table(
        &["Entity", "Type", "Text", "Span", "Confidence"],
        references.iter().map(reference_row).collect(),
    );
    Ok(())
}

fn reference_row(r: &DetectedReference) -> Vec<String> {
    let confidence = format!("{} ({})", format_score(r.confidence), r.confidence_level);
    let confidence = match r.confidence_level {
        ConfidenceLevel::High => confidence.green().to_string(),
        ConfidenceLevel::Medium => confidence.yellow().to_string(),
        ConfidenceLevel::Low => confidence.red().to_string(),
    };
    let matched = if r.is_alias {
        format!("{} (alias)", r.matched_text)
    } else {
        r.matched_text.clone()
    };
    vec![
        r.entity_name.clone(),
        r.entity_type.to_string(),
        matched,
        format!("{}..{}", r.start_offset, r.end_offset),
        confidence,
    ]
}

#[derive(Serialize)]
struct ConceptReport {
    matches: Vec<ConceptMatch>,
    statistics: ConceptStatistics,
}

pub fn handle_concepts(
    ctx: &AppContext,
    file: Option<&Path>,
    complete: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    if let Some(partial) = complete {
        let suggestions = ctx.concepts.find_matching(partial);
        if mode == OutputMode::Json {
            output_json(&suggestions);
            return Ok(());
        }
        print_table(
            &["Name", "Type", "Aliases", "Priority"],
            suggestions
                .iter()
                .map(|c| {
                    vec![
                        c.name.clone(),
                        c.concept_type.to_string(),
                        c.aliases.join(", "),
                        c.effective_priority().to_string(),
                    ]
                })
                .collect(),
        );
        return Ok(());
    }

    let Some(file) = file else {
        bail!("Pass a file to scan or --complete <partial>");
    };
    let text = read_input(file)?;
    let report = ConceptReport {
        matches: ctx.concepts.detect_detailed(&text),
        statistics: ctx.concepts.statistics(&text),
    };

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }

    print_header(&format!("{} concept mentions", report.matches.len()));
    print_table(
        &["Concept", "Type", "Text", "Span"],
        report
            .matches
            .iter()
            .map(|m| {
                vec![
                    m.concept_name.clone(),
                    m.concept_type.to_string(),
                    m.matched_text.clone(),
                    format!("{}..{}", m.start_offset, m.end_offset),
                ]
            })
            .collect(),
    );

    let stats = &report.statistics;
    print_header("Statistics");
    print_kv("Unique concepts", &stats.unique_concepts.to_string());
    print_kv(
        "Coverage",
        &format!("{:.1}%", stats.coverage_ratio * 100.0),
    );
    for (id, count) in &stats.most_frequent {
        print_kv(id, &count.to_string());
    }
    if stats.total_matches == 0 {
        print_hint("No catalog names found. Check --catalog.");
    }
    Ok(())
}
