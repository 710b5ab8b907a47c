mod classify;
mod columns;
mod error;
mod merge;
mod model;
mod options;
mod panes;
mod row_assemble;
mod skip;
mod token_reader;
mod tolerance;

use std::path::Path;

use serde::Serialize;

use crate::tolerance::build_page;

pub use classify::{classify, parse_date};
pub use error::ExtractError;
pub use merge::merge_all;
pub use model::{DrawRow, Kind, KindLabel, PageSummary, PageTokens, Session, Token};
pub use options::{
    AttemptParams, ExtractOptions, GameProfile, PageSelection, SUPPORTED_ARITIES, SessionMode,
    TuningParams, ValueDomain,
};
pub use skip::{SkipReason, SkipRecord};
pub use token_reader::{group_tokens_by_page, read_token_dump, read_tokens_csv, read_tokens_json};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub rows: Vec<DrawRow>,
    pub skips: Vec<SkipRecord>,
    pub pages: Vec<PageSummary>,
    pub row_count: usize,
}

fn select_pages<'a>(
    pages: &'a [PageTokens],
    selection: Option<&PageSelection>,
) -> Vec<&'a PageTokens> {
    pages
        .iter()
        .filter(|page| selection.is_none_or(|selection| selection.contains(page.page_number)))
        .collect()
}

/// Reconstructs draw rows from already-decoded pages. Data-quality problems
/// show up as skip records; only unusable input is an error.
pub fn extract_draws(
    pages: &[PageTokens],
    profile: &GameProfile,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    profile.validate()?;
    options.tuning.validate()?;
    if pages.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    let selected = select_pages(pages, options.pages.as_ref());
    if selected.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    let mut rows = Vec::new();
    let mut skips = Vec::new();
    let mut summaries = Vec::with_capacity(selected.len());
    for page in selected {
        let outcome = build_page(page, profile, &options.tuning);
        rows.extend(outcome.rows);
        skips.extend(outcome.skips);
        summaries.push(outcome.summary);
    }

    let rows = merge_all(rows);
    tracing::debug!(
        game = %profile.name,
        rows = rows.len(),
        skips = skips.len(),
        pages = summaries.len(),
        "extraction finished"
    );

    Ok(ExtractionReport {
        row_count: rows.len(),
        rows,
        skips,
        pages: summaries,
    })
}

/// Loads a token dump from disk and runs [`extract_draws`] over it.
pub fn extract_draws_from_dump(
    input: &Path,
    profile: &GameProfile,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let tokens = read_token_dump(input)?;
    let pages = group_tokens_by_page(tokens)?;
    extract_draws(&pages, profile, options)
}
