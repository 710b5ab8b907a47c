use chrono::NaiveDate;

use crate::columns::median;
use crate::model::{Cell, DrawRow, Kind, KindLabel, Pane, Session};
use crate::options::{AttemptParams, GameProfile, SessionMode, TuningParams, ValueDomain};
use crate::skip::{SkipReason, SkipRecord};

/// Anchor Y values closer than this belong to the same printed row.
const SAME_ROW: f32 = 1.0;
/// Value cells closer than this horizontally are one token printed twice.
const SAME_TOKEN_DX: f32 = 1.5;
const MAX_TAG_PAIR_DX: f32 = 24.0;
const EXCLUSION_RADIUS: f32 = 2.0;
const CROSS_PANE_REACH: usize = 2;
/// Granularity of the Y-alignment score.
const Y_BUCKET: f32 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Assembly {
    pub rows: Vec<DrawRow>,
    pub skips: Vec<SkipRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BandTolerance {
    pub y: f32,
    pub tag_y: f32,
}

impl BandTolerance {
    pub(crate) fn from_pitch(
        pitch: Option<f32>,
        attempt: &AttemptParams,
        tuning: &TuningParams,
    ) -> Self {
        let pitch = pitch.unwrap_or(tuning.fallback_pitch);
        let (low, high) = tuning.y_tolerance_clamp;
        let y = (pitch * attempt.y_fraction).clamp(low, high);
        let tag_y = (pitch * attempt.tag_y_fraction).clamp(low, high).max(y);
        Self { y, tag_y }
    }
}

/// The cell a row hangs off: a session marker, or the date itself for
/// once-a-day games.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Session { cell: Cell, session: Session },
    Daily { cell: Cell, date: NaiveDate },
}

impl Anchor {
    fn of(cell: &Cell, mode: SessionMode) -> Option<Self> {
        match (mode, cell.kind) {
            (SessionMode::TwoSession, Kind::Session(session)) => Some(Self::Session {
                cell: *cell,
                session,
            }),
            (SessionMode::Daily, Kind::Date(date)) => Some(Self::Daily { cell: *cell, date }),
            _ => None,
        }
    }

    fn cell(&self) -> Cell {
        match self {
            Self::Session { cell, .. } | Self::Daily { cell, .. } => *cell,
        }
    }
}

fn anchors_in(pane: &Pane, mode: SessionMode) -> Vec<Anchor> {
    let mut anchors = pane
        .cells()
        .filter_map(|cell| Anchor::of(cell, mode))
        .collect::<Vec<_>>();
    anchors.sort_by(|left, right| {
        let (left, right) = (left.cell(), right.cell());
        left.y.total_cmp(&right.y).then(left.x.total_cmp(&right.x))
    });
    anchors
}

/// Median vertical spacing between consecutive anchor rows of a pane.
pub(crate) fn row_pitch(pane: &Pane, mode: SessionMode) -> Option<f32> {
    let mut ys = anchors_in(pane, mode)
        .iter()
        .map(|anchor| anchor.cell().y)
        .collect::<Vec<_>>();
    ys.sort_by(f32::total_cmp);
    ys.dedup_by(|next, kept| (*next - *kept).abs() < SAME_ROW);
    let mut deltas = ys
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect::<Vec<_>>();
    median(&mut deltas)
}

/// Horizontal extent of one printed row: right of its date and left of the
/// next date or session marker on the same band.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RowSpan {
    left: f32,
    right: f32,
}

impl RowSpan {
    fn new(anchor: &Cell, date_x: f32, pane: &Pane, tolerance: BandTolerance) -> Self {
        let right = pane
            .cells()
            .filter(|cell| {
                cell.opens_row() && cell.x > anchor.x && (cell.y - anchor.y).abs() <= tolerance.y
            })
            .map(|cell| cell.x)
            .fold(f32::INFINITY, f32::min);
        Self {
            left: date_x,
            right,
        }
    }

    fn contains(self, x: f32) -> bool {
        x > self.left && x < self.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TagHit {
    tag: Cell,
    paired: Option<Cell>,
}

fn nearest_by_dx<'a>(cells: impl Iterator<Item = &'a Cell>, origin: f32) -> Option<Cell> {
    cells
        .min_by(|left, right| (left.x - origin).abs().total_cmp(&(right.x - origin).abs()))
        .copied()
}

fn find_tag(
    anchor: &Cell,
    span: RowSpan,
    pane: &Pane,
    tolerance: BandTolerance,
    special: ValueDomain,
) -> Option<TagHit> {
    let on_band = |cell: &&Cell| {
        cell.kind == Kind::Tag
            && span.contains(cell.x)
            && (cell.y - anchor.y).abs() <= tolerance.tag_y
    };
    let right = nearest_by_dx(
        pane.cells().filter(on_band).filter(|cell| cell.x > anchor.x),
        anchor.x,
    );
    let tag = right.or_else(|| {
        nearest_by_dx(
            pane.cells().filter(on_band).filter(|cell| cell.x < anchor.x),
            anchor.x,
        )
    })?;

    let pairable = |cell: &&Cell| {
        cell.value().is_some_and(|value| special.contains(value))
            && span.contains(cell.x)
            && (cell.y - tag.y).abs() <= tolerance.tag_y
    };
    let paired = nearest_by_dx(
        pane.cells()
            .filter(pairable)
            .filter(|cell| cell.x > tag.x && cell.x - tag.x <= MAX_TAG_PAIR_DX),
        tag.x,
    )
    .or_else(|| {
        nearest_by_dx(
            pane.cells()
                .filter(pairable)
                .filter(|cell| cell.x < tag.x && tag.x - cell.x <= MAX_TAG_PAIR_DX),
            tag.x,
        )
    });

    Some(TagHit { tag, paired })
}

/// Nearest date cell left of a session marker, not reaching past an earlier
/// marker on the same band. Returns the date and its X.
fn find_date(
    anchor: &Cell,
    pane: &Pane,
    tolerance: BandTolerance,
) -> Result<(NaiveDate, f32), SkipReason> {
    let on_band = |cell: &Cell| (cell.y - anchor.y).abs() <= tolerance.y;
    let floor = pane
        .cells()
        .filter(|cell| {
            matches!(cell.kind, Kind::Session(_)) && cell.x < anchor.x && on_band(*cell)
        })
        .map(|cell| cell.x)
        .fold(f32::NEG_INFINITY, f32::max);

    let in_date_column = pane
        .columns_of(KindLabel::Date)
        .flat_map(|column| column.items.iter());
    let loose_dates = pane
        .cells()
        .filter(|cell| matches!(cell.kind, Kind::Date(_)) || cell.malformed_date);

    let nearest = in_date_column
        .chain(loose_dates)
        .filter(|cell| cell.x < anchor.x && cell.x > floor && on_band(*cell))
        .min_by(|left, right| {
            (anchor.x - left.x)
                .total_cmp(&(anchor.x - right.x))
                .then((left.y - anchor.y).abs().total_cmp(&(right.y - anchor.y).abs()))
        })
        .ok_or(SkipReason::NoDateLeft)?;

    match nearest.kind {
        Kind::Date(date) => Ok((date, nearest.x)),
        _ => Err(SkipReason::DateParseFail),
    }
}

/// Everything the value strategies need to know about one row.
#[derive(Debug, Clone, Copy)]
struct RowSearch {
    anchor: Cell,
    span: RowSpan,
    tag: Option<TagHit>,
    tolerance: BandTolerance,
    arity: usize,
    domain: ValueDomain,
}

impl RowSearch {
    fn dy(&self, cell: &Cell) -> f32 {
        (cell.y - self.anchor.y).abs()
    }

    fn is_excluded(&self, cell: &Cell) -> bool {
        self.tag
            .and_then(|hit| hit.paired)
            .is_some_and(|paired| {
                (cell.x - paired.x).abs() < EXCLUSION_RADIUS
                    && (cell.y - paired.y).abs() <= self.tolerance.tag_y
            })
    }

    fn accepts(&self, cell: &Cell) -> bool {
        cell.value().is_some_and(|value| self.domain.contains(value))
            && self.span.contains(cell.x)
            && self.dy(cell) <= self.tolerance.y
            && !self.is_excluded(cell)
    }

    fn band(&self, pane: &Pane) -> Vec<Cell> {
        pane.cells().filter(|cell| self.accepts(cell)).copied().collect()
    }

    fn best_in_column<'a>(&self, items: impl Iterator<Item = &'a Cell>) -> Option<Cell> {
        items
            .filter(|cell| self.accepts(cell))
            .min_by(|left, right| self.dy(left).total_cmp(&self.dy(right)))
            .copied()
    }

    fn has_anchor_on_band(&self, pane: &Pane) -> bool {
        pane.cells()
            .any(|cell| cell.opens_row() && self.dy(cell) <= self.tolerance.y)
    }
}

/// Takes the `arity` best-scored candidates, one per printed token, ordered
/// left to right. Fewer than `arity` distinct tokens is a miss.
fn pick<F>(mut candidates: Vec<Cell>, arity: usize, score: F) -> Option<Vec<Cell>>
where
    F: Fn(&Cell) -> (f32, f32),
{
    candidates.sort_by(|left, right| {
        let (left_major, left_minor) = score(left);
        let (right_major, right_minor) = score(right);
        left_major
            .total_cmp(&right_major)
            .then(left_minor.total_cmp(&right_minor))
    });

    let mut chosen: Vec<Cell> = Vec::with_capacity(arity);
    for cell in candidates {
        if chosen.len() == arity {
            break;
        }
        if chosen
            .iter()
            .any(|kept| (kept.x - cell.x).abs() < SAME_TOKEN_DX)
        {
            continue;
        }
        chosen.push(cell);
    }

    if chosen.len() < arity {
        return None;
    }
    chosen.sort_by(|left, right| left.x.total_cmp(&right.x));
    Some(chosen)
}

/// Value search strategies, tried in `ORDER` until one yields exactly K cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    BetweenSessionAndTag,
    RightOfTag,
    RightOfSession,
    PaneCenter,
}

impl Strategy {
    pub(crate) const ORDER: [Self; 4] = [
        Self::BetweenSessionAndTag,
        Self::RightOfTag,
        Self::RightOfSession,
        Self::PaneCenter,
    ];

    fn run(self, search: &RowSearch, pane: &Pane) -> Option<Vec<Cell>> {
        match self {
            Self::BetweenSessionAndTag => between_session_and_tag(search, pane),
            Self::RightOfTag => right_of_tag(search, pane),
            Self::RightOfSession => right_of_session(search, pane),
            Self::PaneCenter => pane_center(search, pane),
        }
    }
}

fn between_session_and_tag(search: &RowSearch, pane: &Pane) -> Option<Vec<Cell>> {
    let tag = search.tag?.tag;
    let anchor_x = search.anchor.x;
    let (low, high) = if tag.x < anchor_x {
        (tag.x, anchor_x)
    } else {
        (anchor_x, tag.x)
    };
    let center = (low + high) / 2.0;
    let inside = |x: f32| x > low && x < high;
    let score = |cell: &Cell| {
        (
            (search.dy(cell) / Y_BUCKET).floor(),
            (cell.x - center).abs(),
        )
    };

    let aligned = pane
        .columns_of(KindLabel::Value)
        .filter(|column| inside(column.center))
        .filter_map(|column| {
            search.best_in_column(column.items.iter().filter(|cell| inside(cell.x)))
        })
        .collect::<Vec<_>>();
    if aligned.len() >= search.arity {
        return pick(aligned, search.arity, score);
    }

    let tokens = search
        .band(pane)
        .into_iter()
        .filter(|cell| inside(cell.x))
        .collect();
    pick(tokens, search.arity, score)
}

fn right_of(search: &RowSearch, pane: &Pane, origin: f32) -> Option<Vec<Cell>> {
    let candidates = search
        .band(pane)
        .into_iter()
        .filter(|cell| cell.x > origin)
        .collect();
    pick(candidates, search.arity, |cell| {
        (cell.x - origin, search.dy(cell))
    })
}

fn right_of_tag(search: &RowSearch, pane: &Pane) -> Option<Vec<Cell>> {
    let tag = search.tag?.tag;
    right_of(search, pane, tag.x)
}

fn right_of_session(search: &RowSearch, pane: &Pane) -> Option<Vec<Cell>> {
    if search.tag.is_some() {
        return None;
    }
    right_of(search, pane, search.anchor.x)
}

fn pane_center(search: &RowSearch, pane: &Pane) -> Option<Vec<Cell>> {
    let center = pane.center();
    let candidates = pane
        .columns_of(KindLabel::Value)
        .filter_map(|column| search.best_in_column(column.items.iter()))
        .collect();
    pick(candidates, search.arity, |cell| {
        ((cell.x - center).abs(), search.dy(cell))
    })
}

/// Runs each strategy on the home pane, then on up to two panes to its
/// right that carry no date or session marker on this band.
fn find_values(search: &RowSearch, panes: &[Pane], home: usize) -> Option<Vec<Cell>> {
    for strategy in Strategy::ORDER {
        if let Some(cells) = strategy.run(search, &panes[home]) {
            return Some(cells);
        }
        for neighbor in panes.iter().skip(home + 1).take(CROSS_PANE_REACH) {
            if search.has_anchor_on_band(neighbor) {
                continue;
            }
            if let Some(cells) = strategy.run(search, neighbor) {
                tracing::trace!(?strategy, y = search.anchor.y, "values found in a neighbouring pane");
                return Some(cells);
            }
        }
    }
    None
}

fn assemble_row(
    anchor: &Anchor,
    panes: &[Pane],
    home: usize,
    profile: &GameProfile,
    tolerance: BandTolerance,
) -> Result<DrawRow, SkipReason> {
    let pane = &panes[home];
    let cell = anchor.cell();
    let (date, session, date_x) = match *anchor {
        Anchor::Session { session, .. } => {
            let (date, date_x) = find_date(&cell, pane, tolerance)?;
            (date, Some(session), date_x)
        }
        Anchor::Daily { date, .. } => (date, None, cell.x),
    };

    let span = RowSpan::new(&cell, date_x, pane, tolerance);
    let tag = profile
        .special
        .and_then(|special| find_tag(&cell, span, pane, tolerance, special));
    let search = RowSearch {
        anchor: cell,
        span,
        tag,
        tolerance,
        arity: profile.arity,
        domain: profile.domain,
    };

    let cells = find_values(&search, panes, home).ok_or(SkipReason::NotEnoughValues)?;
    let values = cells.iter().filter_map(Cell::value).collect::<Vec<_>>();
    debug_assert_eq!(values.len(), profile.arity);

    Ok(DrawRow {
        date,
        session,
        values,
        special: tag.and_then(|hit| hit.paired).and_then(|paired| paired.value()),
    })
}

/// Builds one row per anchor across all panes of a page. Rows that cannot be
/// completed become skip records; nothing is emitted partially.
pub(crate) fn assemble_rows(
    panes: &[Pane],
    profile: &GameProfile,
    attempt: &AttemptParams,
    tuning: &TuningParams,
) -> Assembly {
    let mut assembly = Assembly::default();
    for (index, pane) in panes.iter().enumerate() {
        let tolerance =
            BandTolerance::from_pitch(row_pitch(pane, profile.sessions), attempt, tuning);
        for anchor in anchors_in(pane, profile.sessions) {
            match assemble_row(&anchor, panes, index, profile, tolerance) {
                Ok(row) => assembly.rows.push(row),
                Err(reason) => {
                    let cell = anchor.cell();
                    tracing::trace!(?reason, pane = index, x = cell.x, y = cell.y, "row skipped");
                    assembly
                        .skips
                        .push(SkipRecord::new(reason, cell.x, cell.y).with_pane(index));
                }
            }
        }
    }
    assembly
}
