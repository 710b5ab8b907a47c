use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{Cell, Kind, Session, Token};
use crate::options::ValueDomain;

/// Horizontal distance at which the digit of a fused `FB8` token is placed.
pub(crate) const FUSED_VALUE_OFFSET: f32 = 6.0;

static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})([/-])(\d{1,2})([/-])(\d{2}|\d{4})$")
        .expect("hardcoded numeric date regex is valid")
});
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("hardcoded ISO date regex is valid")
});
static MONTH_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{2}|\d{4})$")
        .expect("hardcoded month-first date regex is valid")
});
static DAY_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})[\s-]([a-z]{3,9})\.?[\s-](\d{2}|\d{4})$")
        .expect("hardcoded day-first date regex is valid")
});
static SESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([me])\s*:?$").expect("hardcoded session regex is valid")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:fb|fireball)\s*[:\-]?\s*(\d{1,2})?$").expect("hardcoded tag regex is valid")
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn is_separator_glyph(ch: char) -> bool {
    matches!(ch, '-' | '‐' | '‑' | '–' | '—' | '−')
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let lower = if lower == "sept" { "sep".to_string() } else { lower };
    MONTHS
        .iter()
        .position(|month| lower.len() >= 3 && month.starts_with(&lower))
        .and_then(|index| u32::try_from(index + 1).ok())
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    if raw.len() == 4 {
        return Some(year);
    }
    Some(if year < 70 { 2000 + year } else { 1900 + year })
}

fn capture_u32(captures: &regex::Captures<'_>, index: usize) -> Option<u32> {
    captures.get(index)?.as_str().parse().ok()
}

/// Returns `None` when the text is not date-shaped at all, and `Some(None)`
/// when it is date-shaped but does not name a real calendar day.
fn date_shape(text: &str) -> Option<Option<NaiveDate>> {
    if let Some(captures) = ISO_DATE_RE.captures(text) {
        let year = captures.get(1).and_then(|m| m.as_str().parse().ok());
        let month = capture_u32(&captures, 2);
        let day = capture_u32(&captures, 3);
        return Some(match (year, month, day) {
            (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        });
    }

    if let Some(captures) = NUMERIC_DATE_RE.captures(text) {
        if captures.get(2).map(|m| m.as_str()) != captures.get(4).map(|m| m.as_str()) {
            return Some(None);
        }
        let month = capture_u32(&captures, 1);
        let day = capture_u32(&captures, 3);
        let year = captures.get(5).and_then(|m| expand_year(m.as_str()));
        return Some(match (year, month, day) {
            (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        });
    }

    if let Some(captures) = MONTH_FIRST_RE.captures(text) {
        let month = captures.get(1).and_then(|m| month_from_name(m.as_str()))?;
        let day = capture_u32(&captures, 2);
        let year = captures.get(3).and_then(|m| expand_year(m.as_str()));
        return Some(match (year, day) {
            (Some(year), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        });
    }

    if let Some(captures) = DAY_FIRST_RE.captures(text) {
        let month = captures.get(2).and_then(|m| month_from_name(m.as_str()))?;
        let day = capture_u32(&captures, 1);
        let year = captures.get(3).and_then(|m| expand_year(m.as_str()));
        return Some(match (year, day) {
            (Some(year), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        });
    }

    None
}

/// Normalizes any supported date surface form to a calendar date.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    date_shape(text.trim()).flatten()
}

fn parse_value(text: &str, domain: ValueDomain) -> Option<u16> {
    let digits = text
        .chars()
        .filter(|ch| !is_separator_glyph(*ch))
        .collect::<String>();
    if digits.is_empty()
        || digits.len() > domain.max_digits()
        || !digits.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }

    let value: u16 = digits.parse().ok()?;
    domain.contains(value).then_some(value)
}

/// Classifies one fragment. Pure and total: anything unrecognised is noise.
#[must_use]
pub fn classify(text: &str, domain: ValueDomain) -> Kind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Kind::Noise;
    }

    if let Some(date) = date_shape(trimmed) {
        return date.map_or(Kind::Noise, Kind::Date);
    }

    if let Some(captures) = SESSION_RE.captures(trimmed)
        && let Some(session) = captures
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Session::from_code)
    {
        return Kind::Session(session);
    }

    if TAG_RE.is_match(trimmed) {
        return Kind::Tag;
    }

    parse_value(trimmed, domain).map_or(Kind::Noise, Kind::Value)
}

/// Turns a token into zero, one, or two cells. A tag fused with its digit
/// becomes a tag cell plus a value cell just to its right.
pub(crate) fn classify_token(token: &Token, domain: ValueDomain, out: &mut Vec<Cell>) {
    if !token.x.is_finite() || !token.y.is_finite() {
        return;
    }

    let trimmed = token.text.trim();
    match classify(trimmed, domain) {
        Kind::Noise if date_shape(trimmed).is_some() => {
            out.push(Cell::malformed_date(token.x, token.y));
        }
        Kind::Noise => {}
        Kind::Tag => {
            out.push(Cell::new(token.x, token.y, Kind::Tag));
            let fused = TAG_RE
                .captures(trimmed)
                .and_then(|captures| captures.get(1))
                .and_then(|digit| parse_value(digit.as_str(), domain));
            if let Some(value) = fused {
                out.push(Cell::new(
                    token.x + FUSED_VALUE_OFFSET,
                    token.y,
                    Kind::Value(value),
                ));
            }
        }
        kind => out.push(Cell::new(token.x, token.y, kind)),
    }
}

pub(crate) fn classify_page(tokens: &[Token], domain: ValueDomain) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(tokens.len());
    for token in tokens {
        classify_token(token, domain, &mut cells);
    }
    cells
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{FUSED_VALUE_OFFSET, classify, classify_page, parse_date};
    use crate::model::{Kind, KindLabel, Session, Token};
    use crate::options::ValueDomain;

    const BALLS: ValueDomain = ValueDomain::new(1, 45);

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[test]
    fn classifies_date_surface_forms() {
        let expected = Kind::Date(ymd(2025, 10, 14));
        for text in [
            "10/14/25",
            "10/14/2025",
            "10-14-2025",
            "2025-10-14",
            "Oct 14, 2025",
            "October 14 2025",
            "14-Oct-2025",
            "14 Oct 25",
            "  10/14/25 ",
        ] {
            assert_eq!(classify(text, BALLS), expected, "surface form {text:?}");
        }
    }

    #[test]
    fn rejects_impossible_dates_as_noise() {
        assert_eq!(classify("13/45/25", BALLS), Kind::Noise);
        assert_eq!(classify("2/30/2024", BALLS), Kind::Noise);
        assert_eq!(classify("10/14-25", BALLS), Kind::Noise);
        assert_eq!(classify("Foo 14, 2025", BALLS), Kind::Noise);
    }

    #[test]
    fn iso_output_reclassifies_to_same_date() {
        let date = parse_date("Oct 14, 2025").expect("date should parse");
        let iso = date.to_string();
        assert_eq!(iso, "2025-10-14");
        assert_eq!(classify(&iso, BALLS), Kind::Date(date));
    }

    #[test]
    fn classifies_session_codes() {
        assert_eq!(classify("M", BALLS), Kind::Session(Session::Midday));
        assert_eq!(classify(" e: ", BALLS), Kind::Session(Session::Evening));
        assert_eq!(classify("E:", BALLS), Kind::Session(Session::Evening));
        assert_eq!(classify("N", BALLS), Kind::Noise);
        assert_eq!(classify("ME", BALLS), Kind::Noise);
    }

    #[test]
    fn values_strip_separator_artifacts_and_respect_domain() {
        assert_eq!(classify("7", BALLS), Kind::Value(7));
        assert_eq!(classify("-19", BALLS), Kind::Value(19));
        assert_eq!(classify("28-", BALLS), Kind::Value(28));
        assert_eq!(classify("07", BALLS), Kind::Value(7));
        assert_eq!(classify("0", BALLS), Kind::Noise);
        assert_eq!(classify("46", BALLS), Kind::Noise);
        assert_eq!(classify("0", ValueDomain::DIGIT), Kind::Value(0));
        assert_eq!(classify("12", ValueDomain::DIGIT), Kind::Noise);
        assert_eq!(classify("80", ValueDomain::new(1, 80)), Kind::Value(80));
    }

    #[test]
    fn boilerplate_is_noise() {
        for text in ["Winning Numbers", "Page 3 of 12", "-", "", "$1,000", "1 2"] {
            assert_eq!(classify(text, BALLS), Kind::Noise, "text {text:?}");
        }
    }

    #[test]
    fn classifies_tags() {
        assert_eq!(classify("FB", ValueDomain::DIGIT), Kind::Tag);
        assert_eq!(classify("fireball", ValueDomain::DIGIT), Kind::Tag);
        assert_eq!(classify("FB:8", ValueDomain::DIGIT), Kind::Tag);
    }

    #[test]
    fn splits_fused_tag_into_tag_and_value_cells() {
        let tokens = vec![
            Token::new(1, "FB8", 150.0, 101.0),
            Token::new(1, "Results", 10.0, 20.0),
            Token::new(1, "4", f32::NAN, 101.0),
        ];
        let cells = classify_page(&tokens, ValueDomain::DIGIT);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].kind, Kind::Tag);
        assert_eq!(cells[1].kind, Kind::Value(8));
        assert!((cells[1].x - (150.0 + FUSED_VALUE_OFFSET)).abs() < f32::EPSILON);
        assert!((cells[1].y - 101.0).abs() < f32::EPSILON);
    }

    #[test]
    fn impossible_date_keeps_its_slot_as_a_malformed_cell() {
        let tokens = vec![
            Token::new(1, "13/45/25", 10.0, 100.0),
            Token::new(1, "Smarch 3, 2025", 10.0, 112.0),
        ];
        let cells = classify_page(&tokens, ValueDomain::DIGIT);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].kind, Kind::Noise);
        assert!(cells[0].malformed_date);
        assert_eq!(cells[0].label(), KindLabel::Date);
    }
}
