//! Cursor context command handlers: extraction and retrieval query assembly.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::cli::handlers::read_input;
use crate::cli::output::{
    format_score, output_json, print_header, print_hint, print_kv, print_table, OutputMode,
};
use crate::init::AppContext;
use crate::models::{ContextCollectionResult, RagQuery};
use crate::services::RetrievalOutcome;

pub fn handle_context(ctx: &AppContext, file: &Path, cursor: i64, mode: OutputMode) -> Result<()> {
    let text = read_input(file)?;
    let references = ctx.detector.detect(&text);
    let extracted = ctx
        .extractor
        .extract_with_references(&text, cursor, &references);

    if mode == OutputMode::Json {
        output_json(&extracted);
        return Ok(());
    }

    if extracted.is_empty() {
        print_hint(&format!("Cursor {} is outside the text.", cursor));
        return Ok(());
    }

    print_header(&format!("Context at {}", cursor));
    print_kv("Relevance", &format_score(extracted.relevance_score));
    print_kv("Primary keywords", &extracted.primary_keywords.join(", "));
    print_kv("Secondary keywords", &extracted.secondary_keywords.join(", "));
    print_kv("Summary", &extracted.summary);

    print_header("Segments");
    print_table(
        &["Span", "Type", "Importance", "Keywords", "Text"],
        extracted
            .segments
            .iter()
            .map(|s| {
                vec![
                    format!("{}..{}", s.start_offset, s.end_offset),
                    s.context_type.to_string(),
                    format_score(s.importance),
                    s.keywords.join(", "),
                    s.text.clone(),
                ]
            })
            .collect(),
    );
    Ok(())
}

#[derive(Serialize)]
struct CollectReport {
    result: ContextCollectionResult,
    query: RagQuery,
    retrieval: RetrievalOutcome,
}

pub async fn handle_collect(
    ctx: &AppContext,
    file: &Path,
    cursor: i64,
    mode: OutputMode,
) -> Result<()> {
    let text = read_input(file)?;
    let result = ctx.collector.collect(&text, cursor);
    let query = ctx.collector.get_rag_optimized_query(&result);
    let retrieval = ctx.retrieval.retrieve(&query).await;

    if mode == OutputMode::Json {
        output_json(&CollectReport {
            result,
            query,
            retrieval,
        });
        return Ok(());
    }

    print_header(&format!(
        "Collection at {} ({})",
        cursor,
        result.collection_method.to_string().bold()
    ));
    print_kv("Query", &query.query);
    print_kv("Entities", &result.detected_entities.join(", "));
    print_kv("Keywords", &result.primary_keywords.join(", "));
    print_kv("Relevance", &format_score(result.relevance_score));
    print_kv("Summary", &result.summary);

    if retrieval.available {
        print_header("Retrieved passages");
        print_table(
            &["Source", "Score", "Text"],
            retrieval
                .passages
                .iter()
                .map(|p| vec![p.source.clone(), format_score(p.score), p.text.clone()])
                .collect(),
        );
    } else {
        print_hint("Retrieval service unavailable; query built from local context only.");
    }
    Ok(())
}
