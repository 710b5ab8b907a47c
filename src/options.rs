use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::ExtractError;

pub const SUPPORTED_ARITIES: [usize; 8] = [2, 3, 4, 5, 6, 10, 12, 20];

/// 1-based pages to extract, as inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<RangeInclusive<u32>>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(&page))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_page(text: &str, role: &str) -> Result<u32, String> {
    let page: u32 = text
        .trim()
        .parse()
        .map_err(|_| format!("{role} '{}' is not a page number", text.trim()))?;
    if page == 0 {
        return Err(format!("{role} must be at least 1, pages count from 1"));
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let range = match part.split_once('-') {
                Some((first, last)) => {
                    let first = parse_page(first, "range start")?;
                    let last = parse_page(last, "range end")?;
                    if last < first {
                        return Err(format!("range '{part}' runs backwards"));
                    }
                    first..=last
                }
                None => {
                    let page = parse_page(part, "page")?;
                    page..=page
                }
            };
            ranges.push(range);
        }

        if ranges.is_empty() {
            return Err(format!("no pages selected by '{spec}'"));
        }
        ranges.sort_by_key(|range| *range.start());
        Ok(Self { ranges })
    }
}

/// Inclusive numeric range a value must fall in, e.g. 0-9 digits or 1-80 balls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDomain {
    pub min: u16,
    pub max: u16,
}

impl ValueDomain {
    pub const DIGIT: Self = Self::new(0, 9);

    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(self, value: u16) -> bool {
        value >= self.min && value <= self.max
    }

    #[must_use]
    pub fn hull(self, other: Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    #[must_use]
    pub fn width(self) -> usize {
        usize::from(self.max.saturating_sub(self.min)) + 1
    }

    /// Longest digit run a value in this domain can print as.
    #[must_use]
    pub fn max_digits(self) -> usize {
        self.max.to_string().len()
    }
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for ValueDomain {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (min, max) = spec
            .split_once('-')
            .ok_or_else(|| format!("invalid domain '{spec}', expected min-max"))?;
        let min: u16 = min
            .trim()
            .parse()
            .map_err(|_| format!("invalid domain minimum: '{min}'"))?;
        let max: u16 = max
            .trim()
            .parse()
            .map_err(|_| format!("invalid domain maximum: '{max}'"))?;
        if max < min {
            return Err(format!("invalid domain '{spec}': max is smaller than min"));
        }
        Ok(Self::new(min, max))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Midday and evening rows, each marked by a session letter.
    TwoSession,
    /// One draw per date, no session marker.
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameProfile {
    pub name: String,
    pub arity: usize,
    pub domain: ValueDomain,
    pub special: Option<ValueDomain>,
    pub sessions: SessionMode,
}

impl GameProfile {
    pub const PRESETS: [&'static str; 8] = [
        "pick2",
        "pick3",
        "pick4",
        "lucky-day",
        "lotto",
        "pick10",
        "all-or-nothing",
        "keno",
    ];

    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize, domain: ValueDomain) -> Self {
        Self {
            name: name.into(),
            arity,
            domain,
            special: None,
            sessions: SessionMode::TwoSession,
        }
    }

    #[must_use]
    pub fn with_special(mut self, special: ValueDomain) -> Self {
        self.special = Some(special);
        self
    }

    #[must_use]
    pub fn daily(mut self) -> Self {
        self.sessions = SessionMode::Daily;
        self
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if !SUPPORTED_ARITIES.contains(&self.arity) {
            return Err(ExtractError::InvalidProfile(format!(
                "arity {} is not one of {SUPPORTED_ARITIES:?}",
                self.arity
            )));
        }
        if self.domain.max < self.domain.min {
            return Err(ExtractError::InvalidProfile(format!(
                "domain {} is empty",
                self.domain
            )));
        }
        if self.domain.width() < self.arity && self.domain != ValueDomain::DIGIT {
            return Err(ExtractError::InvalidProfile(format!(
                "domain {} cannot hold {} distinct values",
                self.domain, self.arity
            )));
        }
        if let Some(special) = self.special
            && special.max < special.min
        {
            return Err(ExtractError::InvalidProfile(format!(
                "special domain {special} is empty"
            )));
        }
        Ok(())
    }

    /// Domain used when classifying fragments: the special digit must also
    /// classify as a value so it can be paired with its tag.
    pub(crate) fn classification_domain(&self) -> ValueDomain {
        self.special
            .map_or(self.domain, |special| self.domain.hull(special))
    }
}

impl FromStr for GameProfile {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let key = name.trim().to_ascii_lowercase();
        let (arity, domain, fireball, sessions) = match key.as_str() {
            "pick2" => (2, ValueDomain::DIGIT, true, SessionMode::TwoSession),
            "pick3" => (3, ValueDomain::DIGIT, true, SessionMode::TwoSession),
            "pick4" => (4, ValueDomain::DIGIT, true, SessionMode::TwoSession),
            "lucky-day" => (5, ValueDomain::new(1, 45), false, SessionMode::TwoSession),
            "lotto" => (6, ValueDomain::new(1, 50), false, SessionMode::Daily),
            "pick10" => (10, ValueDomain::new(1, 80), false, SessionMode::Daily),
            "all-or-nothing" => (12, ValueDomain::new(1, 24), false, SessionMode::Daily),
            "keno" => (20, ValueDomain::new(1, 80), false, SessionMode::Daily),
            _ => {
                return Err(format!(
                    "unknown game '{name}', expected one of {}",
                    Self::PRESETS.join(", ")
                ));
            }
        };

        Ok(Self {
            name: key,
            arity,
            domain,
            special: fireball.then_some(ValueDomain::DIGIT),
            sessions,
        })
    }
}

/// Spatial parameters for one pass of the row assembler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptParams {
    /// Row band half-height as a fraction of the pane's row pitch.
    pub y_fraction: f32,
    /// Same, for the looser special-tag search.
    pub tag_y_fraction: f32,
    /// Column merge epsilon as a fraction of the median X gap.
    pub epsilon_fraction: f32,
    /// Minimum pane gutter as a multiple of the median column spacing.
    pub pane_gap_factor: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuningParams {
    pub ladder: Vec<AttemptParams>,
    pub max_skip_rate: f32,
    pub y_tolerance_clamp: (f32, f32),
    pub fallback_pitch: f32,
    pub epsilon_clamp: (f32, f32),
    /// Value columns a page needs before it is split into panes; `2·K` when unset.
    pub min_value_columns: Option<usize>,
}

impl TuningParams {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.ladder.is_empty() {
            return Err(ExtractError::InvalidOption(
                "tolerance ladder needs at least one attempt".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_skip_rate) {
            return Err(ExtractError::InvalidOption(format!(
                "max_skip_rate must be within 0..=1, got {}",
                self.max_skip_rate
            )));
        }
        for (name, (low, high)) in [
            ("y_tolerance_clamp", self.y_tolerance_clamp),
            ("epsilon_clamp", self.epsilon_clamp),
        ] {
            if !(low > 0.0 && low <= high) {
                return Err(ExtractError::InvalidOption(format!(
                    "{name} must satisfy 0 < low <= high, got ({low}, {high})"
                )));
            }
        }
        if self.fallback_pitch <= 0.0 {
            return Err(ExtractError::InvalidOption(
                "fallback_pitch must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn min_value_columns_for(&self, arity: usize) -> usize {
        self.min_value_columns.unwrap_or(arity * 2)
    }
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            ladder: vec![
                AttemptParams {
                    y_fraction: 0.25,
                    tag_y_fraction: 0.32,
                    epsilon_fraction: 0.55,
                    pane_gap_factor: 2.0,
                },
                AttemptParams {
                    y_fraction: 0.29,
                    tag_y_fraction: 0.34,
                    epsilon_fraction: 0.55,
                    pane_gap_factor: 2.0,
                },
                AttemptParams {
                    y_fraction: 0.32,
                    tag_y_fraction: 0.35,
                    epsilon_fraction: 0.6,
                    pane_gap_factor: 1.6,
                },
            ],
            max_skip_rate: 0.25,
            y_tolerance_clamp: (1.5, 8.0),
            fallback_pitch: 12.0,
            epsilon_clamp: (4.0, 14.0),
            min_value_columns: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub tuning: TuningParams,
}

impl ExtractOptions {
    /// Restricts extraction to the pages named by a `1-3,5` selection.
    pub fn with_page_spec(mut self, spec: &str) -> Result<Self, ExtractError> {
        let selection =
            PageSelection::from_str(spec).map_err(ExtractError::InvalidPageSelection)?;
        self.pages = Some(selection);
        Ok(self)
    }
}
