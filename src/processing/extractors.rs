// Pattern tables and small extractors shared by the field parser and the
// binary field analyzer. Digits are matched as ASCII 0-9 only.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
}

lazy_static! {
    // D-M-YYYY or D/M/YYYY, as printed on the card
    pub static ref DMY_DATE_PATTERN: Regex = compile(r"([0-9]{1,2})[-/]([0-9]{1,2})[-/]([0-9]{4})");
    // YYYYMMDD starting with 19 or 20
    pub static ref COMPACT_DATE_PATTERN: Regex = compile(r"((?:19|20)[0-9]{2})([0-9]{2})([0-9]{2})");
    pub static ref DIGIT_RUN_PATTERN: Regex = compile(r"[0-9]{4,}");
    pub static ref HEX_RUN_PATTERN: Regex = compile(r"[0-9A-Fa-f]{4,}");
    pub static ref BASE64_PATTERN: Regex = compile(r"^[A-Za-z0-9+/]+={0,2}$");
    static ref LEADING_NON_DIGITS: Regex = compile(r"^[^0-9]*");
}

/// A calendar-plausible date found in free text.
#[derive(Debug, Clone, PartialEq)]
pub struct DateMatch {
    pub text: String,
    pub start: usize,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateMatch {
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

/// year in [1900, 2100], month in [1, 12], day in [1, 31]
pub fn is_plausible_date(year: i32, month: u32, day: u32) -> bool {
    (1900..=2100).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Both date layouts, plausible ones only, ordered by position.
pub fn find_dates(text: &str) -> Vec<DateMatch> {
    let mut dates = Vec::new();

    for caps in DMY_DATE_PATTERN.captures_iter(text) {
        let (Ok(day), Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>(), caps[3].parse::<i32>())
        else {
            continue;
        };
        if is_plausible_date(year, month, day) {
            let whole = caps.get(0).map_or((0, ""), |m| (m.start(), m.as_str()));
            dates.push(DateMatch { text: whole.1.to_string(), start: whole.0, year, month, day });
        }
    }

    for caps in COMPACT_DATE_PATTERN.captures_iter(text) {
        let (Ok(year), Ok(month), Ok(day)) = (caps[1].parse::<i32>(), caps[2].parse::<u32>(), caps[3].parse::<u32>())
        else {
            continue;
        };
        if is_plausible_date(year, month, day) {
            let whole = caps.get(0).map_or((0, ""), |m| (m.start(), m.as_str()));
            dates.push(DateMatch { text: whole.1.to_string(), start: whole.0, year, month, day });
        }
    }

    dates.sort_by_key(|d| d.start);
    dates
}

/// Split "place D-M-YYYY" into (place, date). The place is the leading run
/// of non-digits; the date is the first D-M-YYYY match. Either may be empty.
pub fn split_birth_info(info: &str) -> (String, String) {
    let place = LEADING_NON_DIGITS
        .find(info)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let date = DMY_DATE_PATTERN
        .find(info)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    (place, date)
}

/// Parse a D-M-YYYY / D/M/YYYY string into a calendar date.
pub fn parse_dmy(date: &str) -> Option<NaiveDate> {
    let caps = DMY_DATE_PATTERN.captures(date)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
