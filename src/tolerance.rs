use crate::classify::classify_page;
use crate::columns::cluster_columns;
use crate::model::{Cell, DrawRow, Kind, PageSummary, PageTokens};
use crate::options::{AttemptParams, GameProfile, SessionMode, TuningParams};
use crate::panes::split_panes;
use crate::row_assemble::{Assembly, assemble_rows};
use crate::skip::SkipRecord;

#[allow(clippy::cast_precision_loss)]
pub(crate) fn skip_rate(built: usize, skipped: usize) -> f32 {
    let total = built + skipped;
    if total == 0 {
        return 0.0;
    }
    skipped as f32 / total as f32
}

#[allow(clippy::cast_precision_loss)]
fn score(built: usize, rate: f32) -> f32 {
    built as f32 - rate
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoredAttempt {
    /// Zero-based rung of the ladder that produced this result.
    pub attempt: usize,
    pub score: f32,
    pub skip_rate: f32,
    pub assembly: Assembly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Attempting(usize),
    Done,
}

/// Scores each attempt as it completes and decides whether another rung of
/// the ladder is worth running.
#[derive(Debug, Clone)]
pub(crate) struct ToleranceSearch {
    rungs: usize,
    max_skip_rate: f32,
    attempts: usize,
    best: Option<ScoredAttempt>,
}

impl ToleranceSearch {
    pub(crate) fn new(rungs: usize, max_skip_rate: f32) -> Self {
        Self {
            rungs,
            max_skip_rate,
            attempts: 0,
            best: None,
        }
    }

    pub(crate) fn start(&self) -> Step {
        if self.rungs == 0 {
            Step::Done
        } else {
            Step::Attempting(0)
        }
    }

    pub(crate) fn record(&mut self, attempt: usize, assembly: Assembly) -> Step {
        self.attempts += 1;
        let rate = skip_rate(assembly.rows.len(), assembly.skips.len());
        let score = score(assembly.rows.len(), rate);

        if self.best.as_ref().is_none_or(|best| score > best.score) {
            self.best = Some(ScoredAttempt {
                attempt,
                score,
                skip_rate: rate,
                assembly,
            });
        }

        let next = attempt + 1;
        if rate <= self.max_skip_rate || next >= self.rungs {
            Step::Done
        } else {
            Step::Attempting(next)
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }

    pub(crate) fn finish(self) -> Option<ScoredAttempt> {
        self.best
    }
}

/// Best rows and skips for one page, with a summary of how they were found.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageOutcome {
    pub rows: Vec<DrawRow>,
    pub skips: Vec<SkipRecord>,
    pub summary: PageSummary,
}

pub(crate) fn run_attempt(
    cells: &[Cell],
    profile: &GameProfile,
    attempt: &AttemptParams,
    tuning: &TuningParams,
) -> Assembly {
    let columns = cluster_columns(cells, attempt.epsilon_fraction, tuning.epsilon_clamp);
    let panes = split_panes(
        columns,
        attempt.pane_gap_factor,
        tuning.min_value_columns_for(profile.arity),
    );
    assemble_rows(&panes, profile, attempt, tuning)
}

fn has_anchors(cells: &[Cell], mode: SessionMode) -> bool {
    cells.iter().any(|cell| match mode {
        SessionMode::TwoSession => matches!(cell.kind, Kind::Session(_)),
        SessionMode::Daily => matches!(cell.kind, Kind::Date(_)),
    })
}

pub(crate) fn build_page(
    page: &PageTokens,
    profile: &GameProfile,
    tuning: &TuningParams,
) -> PageOutcome {
    let cells = classify_page(&page.tokens, profile.classification_domain());
    let mut search = ToleranceSearch::new(tuning.ladder.len(), tuning.max_skip_rate);

    let mut step = search.start();
    while let Step::Attempting(index) = step {
        let Some(attempt) = tuning.ladder.get(index) else {
            break;
        };
        let assembly = run_attempt(&cells, profile, attempt, tuning);
        tracing::debug!(
            page = page.page_number,
            attempt = index + 1,
            built = assembly.rows.len(),
            skipped = assembly.skips.len(),
            skip_rate = skip_rate(assembly.rows.len(), assembly.skips.len()),
            "tolerance attempt scored"
        );
        step = search.record(index, assembly);
    }

    let attempts = search.attempts();
    let best = search.finish();
    let (chosen_attempt, rate, assembly) = best.map_or_else(
        || (0, 0.0, Assembly::default()),
        |best| (best.attempt + 1, best.skip_rate, best.assembly),
    );

    if assembly.rows.is_empty() && has_anchors(&cells, profile.sessions) {
        tracing::warn!(
            page = page.page_number,
            skipped = assembly.skips.len(),
            "page has row anchors but yielded no rows"
        );
    }

    let skips = assembly
        .skips
        .into_iter()
        .map(|skip| skip.with_page(page.page_number))
        .collect::<Vec<_>>();

    PageOutcome {
        summary: PageSummary {
            page: page.page_number,
            built: assembly.rows.len(),
            skipped: skips.len(),
            attempts,
            chosen_attempt,
            skip_rate: rate,
        },
        rows: assembly.rows,
        skips,
    }
}
