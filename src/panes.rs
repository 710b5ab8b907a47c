use crate::columns::median;
use crate::model::{Column, KindLabel, Pane};

const ANCHOR_COUNT: usize = 3;
const KMEANS_ITERATIONS: usize = 8;
/// Centers closer than this are treated as the same position.
const SAME_POSITION: f32 = 1.0;

/// Where panes begin: date columns open a pane on their left edge, while
/// k-means centroids sit mid-pane and split at midpoints.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Anchors {
    LeftEdges(Vec<f32>),
    Centroids(Vec<f32>),
}

impl Anchors {
    fn boundaries(&self) -> Vec<f32> {
        match self {
            Self::LeftEdges(edges) => edges
                .iter()
                .skip(1)
                .map(|edge| edge - SAME_POSITION)
                .collect(),
            Self::Centroids(centroids) => centroids
                .windows(2)
                .map(|pair| (pair[0] + pair[1]) / 2.0)
                .collect(),
        }
    }
}

fn dedup_within(sorted: &mut Vec<f32>, separation: f32) {
    let separation = separation.max(SAME_POSITION);
    sorted.dedup_by(|next, kept| (*next - *kept).abs() < separation);
}

/// Picks three pane anchors from the date columns: both extremes plus the
/// center farthest from either of them.
pub(crate) fn date_anchors(columns: &[Column], min_separation: f32) -> Option<Vec<f32>> {
    let mut centers = columns
        .iter()
        .filter(|column| column.kind == KindLabel::Date)
        .map(|column| column.center)
        .collect::<Vec<_>>();
    centers.sort_by(f32::total_cmp);
    dedup_within(&mut centers, min_separation);

    if centers.len() < ANCHOR_COUNT {
        return None;
    }

    let low = centers[0];
    let high = centers[centers.len() - 1];
    let middle = centers[1..centers.len() - 1]
        .iter()
        .copied()
        .max_by(|left, right| {
            let left_reach = (left - low).min(high - left);
            let right_reach = (right - low).min(high - right);
            left_reach.total_cmp(&right_reach)
        })?;
    Some(vec![low, middle, high])
}

/// One-dimensional k-means seeded at evenly spaced quantiles.
pub(crate) fn kmeans_1d(points: &[f32], k: usize) -> Vec<f32> {
    let mut sorted = points.to_vec();
    sorted.sort_by(f32::total_cmp);
    if sorted.len() <= k {
        dedup_within(&mut sorted, SAME_POSITION);
        return sorted;
    }

    let n = sorted.len();
    let mut centroids = (0..k)
        .map(|index| sorted[((2 * index + 1) * n / (2 * k)).min(n - 1)])
        .collect::<Vec<_>>();

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![0.0_f32; k];
        let mut counts = vec![0_usize; k];
        for &point in &sorted {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, left), (_, right)| {
                    (*left - point).abs().total_cmp(&(*right - point).abs())
                })
                .map_or(0, |(index, _)| index);
            sums[nearest] += point;
            counts[nearest] += 1;
        }

        let mut moved = false;
        for ((centroid, sum), count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if *count == 0 {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / *count as f32;
            moved |= (mean - *centroid).abs() > f32::EPSILON;
            *centroid = mean;
        }
        if !moved {
            break;
        }
    }

    centroids.sort_by(f32::total_cmp);
    dedup_within(&mut centroids, SAME_POSITION);
    centroids
}

fn partition_by_anchors(columns: Vec<Column>, anchors: &Anchors) -> Vec<Vec<Column>> {
    let boundaries = anchors.boundaries();

    let mut groups = vec![Vec::new(); boundaries.len() + 1];
    for column in columns {
        let index = boundaries
            .iter()
            .filter(|boundary| column.center > **boundary)
            .count();
        groups[index].push(column);
    }
    groups.retain(|group| !group.is_empty());
    groups
}

/// Rejoins centroid groups whose gutter is narrower than `min_gutter`. Panes
/// opened by their own date column are never rejoined.
fn merge_narrow_gutters(groups: Vec<Vec<Column>>, min_gutter: f32) -> Vec<Vec<Column>> {
    let mut merged: Vec<Vec<Column>> = Vec::with_capacity(groups.len());
    for group in groups {
        let gutter = merged
            .last()
            .and_then(|previous| previous.last())
            .zip(group.first())
            .map(|(left, right)| right.center - left.center);
        match (gutter, merged.last_mut()) {
            (Some(gutter), Some(previous)) if gutter < min_gutter => previous.extend(group),
            _ => merged.push(group),
        }
    }
    merged
}

fn has_structure(group: &[Column]) -> bool {
    group.iter().any(|column| {
        matches!(
            column.kind,
            KindLabel::Value | KindLabel::Session | KindLabel::Date
        )
    })
}

/// A group holding only tag columns cannot form a table on its own.
fn absorb_orphans(groups: Vec<Vec<Column>>) -> Vec<Vec<Column>> {
    let mut out: Vec<Vec<Column>> = Vec::with_capacity(groups.len());
    let mut pending: Vec<Column> = Vec::new();
    for mut group in groups {
        if !has_structure(&group) {
            match out.last_mut() {
                Some(previous) => previous.extend(group),
                None => pending.extend(group),
            }
            continue;
        }
        if !pending.is_empty() {
            pending.append(&mut group);
            group = std::mem::take(&mut pending);
        }
        out.push(group);
    }
    if !pending.is_empty() {
        out.push(pending);
    }
    out
}

/// Splits a page's columns into side-by-side panes, left to right.
pub(crate) fn split_panes(
    columns: Vec<Column>,
    pane_gap_factor: f32,
    min_value_columns: usize,
) -> Vec<Pane> {
    let mut columns = columns
        .into_iter()
        .filter(|column| column.kind != KindLabel::Noise)
        .collect::<Vec<_>>();
    if columns.is_empty() {
        return Vec::new();
    }
    columns.sort_by(|left, right| left.center.total_cmp(&right.center));

    let value_columns = columns
        .iter()
        .filter(|column| column.kind == KindLabel::Value)
        .count();
    if value_columns < min_value_columns {
        return vec![Pane::from_columns(columns)];
    }

    let centers = columns
        .iter()
        .map(|column| column.center)
        .collect::<Vec<_>>();
    let mut spacing = centers
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect::<Vec<_>>();
    let min_gutter = median(&mut spacing).unwrap_or(0.0) * pane_gap_factor;

    let anchors = date_anchors(&columns, min_gutter).map_or_else(
        || Anchors::Centroids(kmeans_1d(&centers, ANCHOR_COUNT)),
        Anchors::LeftEdges,
    );
    tracing::trace!(?anchors, min_gutter, "pane anchors");

    let groups = partition_by_anchors(columns, &anchors);
    let groups = match anchors {
        Anchors::LeftEdges(_) => groups,
        Anchors::Centroids(_) => merge_narrow_gutters(groups, min_gutter),
    };
    absorb_orphans(groups)
        .into_iter()
        .map(Pane::from_columns)
        .collect()
}
