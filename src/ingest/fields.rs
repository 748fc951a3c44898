use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid ISO date regex"));

static DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<start_month>\d{2})/(?P<start_day>\d{2})",
        r"-(?P<end_month>\d{2})/(?P<end_day>\d{2})",
        r"(?:\s+(?P<year>\d{4}))?$",
    ))
    .expect("valid day range regex")
});

/// How `calendar_month` values are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    /// Only `YYYY-MM-DD`.
    Strict,
    /// `YYYY-MM-DD`, or a `MM/DD-MM/DD[ YYYY]` range collapsed to its start day.
    Range { default_year: Option<i32> },
}

impl DateMode {
    pub fn new(convert_calendar_range: bool, default_year: Option<i32>) -> Self {
        if convert_calendar_range {
            DateMode::Range { default_year }
        } else {
            DateMode::Strict
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("calendar_month {0:?} does not match format YYYY-MM-DD")]
    NotIsoDate(String),
    #[error("Unrecognized calendar_month format: {0:?}")]
    UnrecognizedDate(String),
    #[error(
        "Missing year in calendar_month value: {0:?}. \
         Please use 'MM/DD-MM/DD YYYY' or provide a default year."
    )]
    MissingYear(String),
    #[error("calendar_month {0:?} is not a valid date")]
    InvalidDate(String),
    #[error("Invalid integer for {field}: {raw:?}")]
    InvalidInteger { field: String, raw: String },
    #[error("Missing value for {0}")]
    MissingValue(String),
}

pub fn parse_calendar_month(raw: &str, mode: DateMode) -> Result<NaiveDate, FieldError> {
    match mode {
        DateMode::Strict => {
            parse_iso_date(raw)?.ok_or_else(|| FieldError::NotIsoDate(raw.to_string()))
        }
        DateMode::Range { default_year } => parse_date_range(raw, default_year),
    }
}

/// `Ok(None)` when the shape is not `YYYY-MM-DD`, an error when the shape
/// matches but the date does not exist.
fn parse_iso_date(raw: &str) -> Result<Option<NaiveDate>, FieldError> {
    let Some(caps) = ISO_DATE.captures(raw) else {
        return Ok(None);
    };

    let year: i32 = caps[1].parse().map_err(|_| FieldError::InvalidDate(raw.to_string()))?;
    let month: u32 = caps[2].parse().map_err(|_| FieldError::InvalidDate(raw.to_string()))?;
    let day: u32 = caps[3].parse().map_err(|_| FieldError::InvalidDate(raw.to_string()))?;

    calendar_date(raw, year, month, day).map(Some)
}

/// Year 0 and earlier are not calendar months anyone reports on.
fn calendar_date(raw: &str, year: i32, month: u32, day: u32) -> Result<NaiveDate, FieldError> {
    if year < 1 {
        return Err(FieldError::InvalidDate(raw.to_string()));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| FieldError::InvalidDate(raw.to_string()))
}

fn parse_date_range(raw: &str, default_year: Option<i32>) -> Result<NaiveDate, FieldError> {
    let raw = raw.trim();

    if let Ok(Some(date)) = parse_iso_date(raw) {
        return Ok(date);
    }

    let caps = DAY_RANGE
        .captures(raw)
        .ok_or_else(|| FieldError::UnrecognizedDate(raw.to_string()))?;

    let year = match caps.name("year") {
        Some(year) => year
            .as_str()
            .parse::<i32>()
            .map_err(|_| FieldError::InvalidDate(raw.to_string()))?,
        None => default_year.ok_or_else(|| FieldError::MissingYear(raw.to_string()))?,
    };

    // End of the range is only validated by shape.
    let month: u32 = caps["start_month"]
        .parse()
        .map_err(|_| FieldError::InvalidDate(raw.to_string()))?;
    let day: u32 = caps["start_day"]
        .parse()
        .map_err(|_| FieldError::InvalidDate(raw.to_string()))?;

    calendar_date(raw, year, month, day)
}

/// Parse a counter that may carry thousands separators (`"1,313"`).
/// Blank values count as zero.
pub fn parse_int_field(raw: &str, field: &str) -> Result<i64, FieldError> {
    let value = raw.trim().replace(',', "");
    if value.is_empty() {
        return Ok(0);
    }

    value.parse::<i64>().map_err(|_| FieldError::InvalidInteger {
        field: field.to_string(),
        raw: raw.to_string(),
    })
}
