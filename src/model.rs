use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A positioned text fragment as emitted by the PDF text-layer decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub page: u32,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl Token {
    #[must_use]
    pub fn new(page: u32, text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            page,
            text: text.into(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTokens {
    pub page_number: u32,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Session {
    #[serde(rename = "M")]
    Midday,
    #[serde(rename = "E")]
    Evening,
}

impl Session {
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Midday => 'M',
            Self::Evening => 'E',
        }
    }

    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'M' => Some(Self::Midday),
            'E' => Some(Self::Evening),
            _ => None,
        }
    }
}

/// Semantic kind of a classified fragment, carrying the parsed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Date(NaiveDate),
    Session(Session),
    Value(u16),
    Tag,
    Noise,
}

impl Kind {
    #[must_use]
    pub const fn label(self) -> KindLabel {
        match self {
            Self::Date(_) => KindLabel::Date,
            Self::Session(_) => KindLabel::Session,
            Self::Value(_) => KindLabel::Value,
            Self::Tag => KindLabel::Tag,
            Self::Noise => KindLabel::Noise,
        }
    }
}

/// Payload-free kind. Declaration order is the column tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KindLabel {
    Date,
    Session,
    Tag,
    Value,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cell {
    pub x: f32,
    pub y: f32,
    pub kind: Kind,
    /// Date-shaped text naming no calendar day, e.g. `13/45/25`. The cell is
    /// `Noise` but still occupies its row's date slot.
    pub malformed_date: bool,
}

impl Cell {
    pub(crate) const fn new(x: f32, y: f32, kind: Kind) -> Self {
        Self {
            x,
            y,
            kind,
            malformed_date: false,
        }
    }

    pub(crate) const fn malformed_date(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            kind: Kind::Noise,
            malformed_date: true,
        }
    }

    /// Column label this cell votes for.
    pub(crate) const fn label(&self) -> KindLabel {
        if self.malformed_date {
            KindLabel::Date
        } else {
            self.kind.label()
        }
    }

    /// Dates and session markers start a printed row.
    pub(crate) const fn opens_row(&self) -> bool {
        matches!(self.kind, Kind::Date(_) | Kind::Session(_)) || self.malformed_date
    }

    pub(crate) fn value(&self) -> Option<u16> {
        match self.kind {
            Kind::Value(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub center: f32,
    pub kind: KindLabel,
    pub items: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pane {
    pub columns: Vec<Column>,
    pub bounds: (f32, f32),
}

impl Pane {
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        let min = columns
            .iter()
            .map(|column| column.center)
            .fold(f32::INFINITY, f32::min);
        let max = columns
            .iter()
            .map(|column| column.center)
            .fold(f32::NEG_INFINITY, f32::max);
        Self {
            columns,
            bounds: (min, max),
        }
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.columns.iter().flat_map(|column| column.items.iter())
    }

    pub(crate) fn columns_of(&self, kind: KindLabel) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |column| column.kind == kind)
    }

    pub(crate) fn center(&self) -> f32 {
        (self.bounds.0 + self.bounds.1) / 2.0
    }
}

/// One reconstructed draw. `values` are ordered left to right as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawRow {
    pub date: NaiveDate,
    pub session: Option<Session>,
    pub values: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page: u32,
    pub built: usize,
    pub skipped: usize,
    pub attempts: usize,
    pub chosen_attempt: usize,
    pub skip_rate: f32,
}
