use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    NoDateLeft,
    /// The date slot holds an impossible date like `13/45/25`, or a non-date
    /// cell sitting in the date column.
    DateParseFail,
    NotEnoughValues,
}

impl SkipReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoDateLeft => "no date cell to the left of the session marker",
            Self::DateParseFail => "the date slot holds text that is not a valid date",
            Self::NotEnoughValues => "fewer values than the game arity on the row band",
        }
    }
}

/// A session marker that could not be turned into a complete row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipRecord {
    pub reason: SkipReason,
    pub page: u32,
    pub pane: usize,
    pub session_position: (f32, f32),
}

impl SkipRecord {
    #[must_use]
    pub fn new(reason: SkipReason, x: f32, y: f32) -> Self {
        Self {
            reason,
            page: 0,
            pane: 0,
            session_position: (x, y),
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_pane(mut self, pane: usize) -> Self {
        self.pane = pane;
        self
    }
}
