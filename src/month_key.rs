use chrono::{DateTime, Datelike, Local, NaiveDate};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Calendar month identifier rendered as `YYYY-MM`.
///
/// Ordering is chronological, so a `BTreeMap<MonthKey, _>` iterates oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` unless `month` is 1..=12 and `year` fits in four digits.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn from_date<D: Datelike>(date: &D) -> Option<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Parses only the canonical `YYYY-MM` form.
    pub fn parse_canonical(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return None;
        }
        let year = parse_digits(text.get(0..4)?)?;
        let month = parse_digits(text.get(5..7)?)?;
        Self::new(year as i32, month)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_canonical(s.trim())
            .ok_or_else(|| format!("Invalid month key '{}'. Expected YYYY-MM", s))
    }
}

impl TryFrom<NaiveDate> for MonthKey {
    type Error = String;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        Self::from_date(&date)
            .ok_or_else(|| format!("Year {} does not fit a YYYY-MM month key", date.year()))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for MonthKey {
    fn schema_name() -> String {
        "MonthKey".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        let mut schema = String::json_schema(gen).into_object();
        schema.string().pattern = Some(r"^\d{4}-\d{2}$".to_string());
        Schema::Object(schema)
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Normalizes a date or month string against the local calendar year.
pub fn normalize_month_key(input: &str) -> Option<MonthKey> {
    MonthKeyParser::new(current_year()).parse(input)
}

/// Turns the date spellings found in ledgers and vendor feeds into a [`MonthKey`].
///
/// Grammars are tried in order and the first match wins:
///
/// 1. `YYYY-MM`
/// 2. month name and year, e.g. `Apr-24`, `april-2024`
/// 3. `YYYY-MM-DD`, optionally followed by a time
/// 4. `M/D/YYYY` or `M-D-YYYY`; the day is never validated
/// 5. a handful of free-form layouts (`June 17, 2025`, `17 Jun 2025`, RFC 2822, ...)
///
/// Anything else yields `None`. The output always re-parses to itself through
/// grammar 1.
#[derive(Debug, Clone, Copy)]
pub struct MonthKeyParser {
    current_year: i32,
}

impl MonthKeyParser {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn parse(&self, input: &str) -> Option<MonthKey> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        MonthKey::parse_canonical(text)
            .or_else(|| self.parse_month_name(text))
            .or_else(|| parse_iso_date(text))
            .or_else(|| parse_numeric_date(text))
            .or_else(|| parse_free_form(text))
    }

    pub fn parse_opt(&self, input: Option<&str>) -> Option<MonthKey> {
        input.and_then(|text| self.parse(text))
    }

    fn parse_month_name(&self, text: &str) -> Option<MonthKey> {
        let (name, year_part) = text.split_once('-')?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let month = month_from_name(name)?;
        let year = match year_part.len() {
            2 => self.expand_two_digit_year(parse_digits(year_part)? as i32),
            4 => parse_digits(year_part)? as i32,
            _ => return None,
        };
        MonthKey::new(year, month)
    }

    /// `yy` at or below the current two-digit year lands in the 2000s,
    /// anything above it in the 1900s.
    pub fn expand_two_digit_year(&self, yy: i32) -> i32 {
        let current_yy = self.current_year.rem_euclid(100);
        if yy <= current_yy {
            2000 + yy
        } else {
            1900 + yy
        }
    }
}

fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn month_from_name(name: &str) -> Option<u32> {
    const NAMES: [&str; 12] = [
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

    let lower = name.to_ascii_lowercase();
    NAMES
        .iter()
        .position(|full| *full == lower || (lower.len() == 3 && full.starts_with(&lower)))
        .map(|idx| idx as u32 + 1)
}

fn parse_iso_date(text: &str) -> Option<MonthKey> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if bytes.len() > 10 && bytes[10] != b'T' && bytes[10] != b' ' {
        return None;
    }

    let year = parse_digits(text.get(0..4)?)?;
    let month = parse_digits(text.get(5..7)?)?;
    parse_digits(text.get(8..10)?)?;
    MonthKey::new(year as i32, month)
}

fn parse_numeric_date(text: &str) -> Option<MonthKey> {
    let parts: Vec<&str> = text.split(['/', '-']).collect();
    if parts.len() != 3 {
        return None;
    }
    let (month, day, year) = (parts[0], parts[1], parts[2]);
    if !(1..=2).contains(&month.len()) || !(1..=2).contains(&day.len()) || year.len() != 4 {
        return None;
    }
    parse_digits(day)?;
    MonthKey::new(parse_digits(year)? as i32, parse_digits(month)?)
}

fn parse_free_form(text: &str) -> Option<MonthKey> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return MonthKey::from_date(&dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return MonthKey::from_date(&dt.date_naive());
    }

    const DATE_FORMATS: [&str; 7] = [
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%d.%m.%Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%d %B %Y",
        "%d %b %Y",
    ];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return MonthKey::from_date(&date);
        }
    }

    // Month and year only, e.g. "June 2025".
    let with_day = format!("1 {}", text);
    for format in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, format) {
            return MonthKey::from_date(&date);
        }
    }

    None
}
