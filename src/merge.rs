use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;

use crate::model::{DrawRow, Session};

/// Combines rows from every pane and page into one row per `(date, session)`.
/// A row carrying a special value replaces one without; otherwise the first
/// row seen is kept. The result is ordered by date, then session.
#[must_use]
pub fn merge_all(rows: impl IntoIterator<Item = DrawRow>) -> Vec<DrawRow> {
    let mut merged: BTreeMap<(NaiveDate, Option<Session>), DrawRow> = BTreeMap::new();
    for row in rows {
        match merged.entry((row.date, row.session)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().special.is_none() && row.special.is_some() {
                    tracing::trace!(date = %row.date, session = ?row.session, "row superseded by one with a special value");
                    slot.insert(row);
                }
            }
        }
    }
    merged.into_values().collect()
}
