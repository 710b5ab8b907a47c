use std::collections::BTreeMap;

use crate::model::{Cell, Column, KindLabel};

pub(crate) fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn distinct_rounded_xs(cells: &[Cell]) -> Vec<f32> {
    let mut xs = cells.iter().map(|cell| cell.x.round()).collect::<Vec<_>>();
    xs.sort_by(f32::total_cmp);
    xs.dedup();
    xs
}

/// Merge distance as a fraction of the median gap between distinct X values.
pub(crate) fn merge_epsilon(sorted_xs: &[f32], fraction: f32, clamp: (f32, f32)) -> f32 {
    let mut gaps = sorted_xs
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect::<Vec<_>>();
    median(&mut gaps).map_or(clamp.0, |gap| (gap * fraction).clamp(clamp.0, clamp.1))
}

fn dominant_kind(items: &[Cell]) -> KindLabel {
    let mut counts = BTreeMap::new();
    for cell in items {
        *counts.entry(cell.label()).or_insert(0_usize) += 1;
    }

    counts
        .into_iter()
        .max_by(|(left_kind, left), (right_kind, right)| {
            left.cmp(right).then(right_kind.cmp(left_kind))
        })
        .map_or(KindLabel::Noise, |(kind, _)| kind)
}

fn nearest_center(centers: &[f32], x: f32) -> Option<usize> {
    centers
        .iter()
        .enumerate()
        .min_by(|(_, left), (_, right)| (*left - x).abs().total_cmp(&(*right - x).abs()))
        .map(|(index, _)| index)
}

/// Groups cells sharing an X position into columns, left to right.
pub(crate) fn cluster_columns(
    cells: &[Cell],
    epsilon_fraction: f32,
    epsilon_clamp: (f32, f32),
) -> Vec<Column> {
    let xs = distinct_rounded_xs(cells);
    if xs.is_empty() {
        return Vec::new();
    }

    let epsilon = merge_epsilon(&xs, epsilon_fraction, epsilon_clamp);

    let mut groups: Vec<Vec<f32>> = Vec::new();
    let mut previous = None;
    for x in xs {
        match (previous, groups.last_mut()) {
            (Some(prev), Some(group)) if x - prev <= epsilon => group.push(x),
            _ => groups.push(vec![x]),
        }
        previous = Some(x);
    }

    #[allow(clippy::cast_precision_loss)]
    let centers = groups
        .iter()
        .map(|group| group.iter().sum::<f32>() / group.len() as f32)
        .collect::<Vec<_>>();

    let mut buckets = vec![Vec::new(); centers.len()];
    for cell in cells {
        if let Some(index) = nearest_center(&centers, cell.x) {
            buckets[index].push(*cell);
        }
    }

    centers
        .into_iter()
        .zip(buckets)
        .filter(|(_, items)| !items.is_empty())
        .map(|(center, items)| Column {
            center,
            kind: dominant_kind(&items),
            items,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{cluster_columns, median, merge_epsilon};
    use crate::model::{Cell, Kind, KindLabel, Session};

    const CLAMP: (f32, f32) = (4.0, 14.0);

    fn value(x: f32, y: f32, value: u16) -> Cell {
        Cell::new(x, y, Kind::Value(value))
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn epsilon_is_clamped_fraction_of_median_gap() {
        assert!((merge_epsilon(&[0.0, 20.0, 40.0, 60.0], 0.55, CLAMP) - 11.0).abs() < 1e-4);
        assert!((merge_epsilon(&[0.0, 100.0, 200.0], 0.55, CLAMP) - 14.0).abs() < 1e-4);
        assert!((merge_epsilon(&[0.0, 2.0, 4.0], 0.55, CLAMP) - 4.0).abs() < 1e-4);
        assert!((merge_epsilon(&[10.0], 0.55, CLAMP) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn dense_digit_columns_stay_separate() {
        let mut cells = Vec::new();
        for row in 0..4_u16 {
            let y = 100.0 + f32::from(row) * 12.0;
            let jitter = if row % 2 == 0 { 0.4 } else { -0.4 };
            for col in 0..5_u16 {
                cells.push(value(60.0 + f32::from(col) * 20.0 + jitter, y, col + 1));
            }
        }

        let columns = cluster_columns(&cells, 0.55, CLAMP);
        assert_eq!(columns.len(), 5);
        assert!(columns.iter().all(|column| column.items.len() == 4));
        assert!(columns.iter().all(|column| column.kind == KindLabel::Value));
        assert!((columns[2].center - 100.0).abs() < 1.0);
    }

    #[test]
    fn kerning_jitter_collapses_into_one_column() {
        let cells = vec![
            value(59.7, 100.0, 1),
            value(60.2, 112.0, 2),
            value(60.8, 124.0, 3),
            value(90.0, 100.0, 4),
        ];
        let columns = cluster_columns(&cells, 0.55, CLAMP);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].items.len(), 3);
    }

    #[test]
    fn majority_kind_with_priority_tie_break() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 14).expect("valid test date");
        let cells = vec![
            Cell::new(10.0, 100.0, Kind::Date(date)),
            Cell::new(10.0, 112.0, Kind::Value(3)),
            Cell::new(40.0, 100.0, Kind::Session(Session::Midday)),
            Cell::new(40.0, 112.0, Kind::Session(Session::Evening)),
            Cell::new(40.0, 124.0, Kind::Value(9)),
        ];
        let columns = cluster_columns(&cells, 0.55, CLAMP);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].kind, KindLabel::Date);
        assert_eq!(columns[1].kind, KindLabel::Session);
    }
}
