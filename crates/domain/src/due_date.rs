use crate::errors::DateFormatError;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Exact shape of a due date on the wire. Anything else is rejected.
static WIRE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})Z$").unwrap());

/// strftime form of [`WIRE_PATTERN`], used when emitting timestamps.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A due date, tagged by where the value came from. The variant is fixed
/// at the boundary where data enters the process: everything deserialized
/// from JSON is `Wire`, everything built on this machine is `Local`.
/// Downstream code matches on the tag instead of re-inspecting the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueDate {
    /// Raw timestamp string exactly as the backing store sent it.
    Wire(String),
    /// A date/time constructed locally (defaults and datepicker edits).
    Local(NaiveDateTime),
}

impl DueDate {
    /// Default due date for new todos: local now + 24 hours.
    pub fn tomorrow() -> Self {
        DueDate::Local(Local::now().naive_local() + Duration::hours(24))
    }

    /// Resolve to a calendar date/time.
    ///
    /// Wire strings are read as local-clock calendar fields; the trailing
    /// `Z` designator carries no offset meaning here. Strings that do not
    /// match the wire pattern, or that name an impossible date, fail with
    /// [`DateFormatError`].
    pub fn normalize(&self) -> Result<NaiveDateTime, DateFormatError> {
        match self {
            DueDate::Wire(raw) => {
                let caps = WIRE_PATTERN
                    .captures(raw)
                    .ok_or_else(|| DateFormatError::Unrecognized(raw.clone()))?;
                let year: i32 = field(&caps, 1, raw)?;
                let month: u32 = field(&caps, 2, raw)?;
                let day: u32 = field(&caps, 3, raw)?;
                let hour: u32 = field(&caps, 4, raw)?;
                let minute: u32 = field(&caps, 5, raw)?;
                let second: u32 = field(&caps, 6, raw)?;

                NaiveDate::from_ymd_opt(year, month, day)
                    .and_then(|date| date.and_hms_opt(hour, minute, second))
                    .ok_or_else(|| DateFormatError::InvalidDate(raw.clone()))
            }
            DueDate::Local(value) => Ok(*value),
        }
    }

    /// Display form, e.g. `June 5`.
    pub fn format_display(&self) -> Result<String, DateFormatError> {
        let value = self.normalize()?;
        Ok(value.format("%B %-d").to_string())
    }

    /// Datepicker form, e.g. `6/5/2023` (unpadded month and day).
    pub fn format_for_datepicker(&self) -> Result<String, DateFormatError> {
        let value = self.normalize()?;
        Ok(value.format("%-m/%-d/%Y").to_string())
    }

    /// Parse a committed datepicker value (`M/D/YYYY`) at local midnight.
    pub fn from_datepicker_input(input: &str) -> Result<Self, DateFormatError> {
        let parts: Vec<&str> = input.split('/').collect();
        if parts.len() != 3 {
            return Err(DateFormatError::Unrecognized(input.to_string()));
        }
        let month: u32 = part(parts[0], input)?;
        let day: u32 = part(parts[1], input)?;
        let year: i32 = part(parts[2], input)?;

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(DueDate::Local)
            .ok_or_else(|| DateFormatError::InvalidDate(input.to_string()))
    }

    /// The string to put on the wire for this value.
    pub fn as_wire_string(&self) -> String {
        match self {
            DueDate::Wire(raw) => raw.clone(),
            DueDate::Local(value) => value.format(WIRE_FORMAT).to_string(),
        }
    }
}

/// Whether a string already has the wire timestamp shape.
pub fn is_wire_timestamp(value: &str) -> bool {
    WIRE_PATTERN.is_match(value)
}

fn field<T: std::str::FromStr>(
    caps: &regex::Captures<'_>,
    index: usize,
    raw: &str,
) -> Result<T, DateFormatError> {
    caps[index]
        .parse()
        .map_err(|_| DateFormatError::Unrecognized(raw.to_string()))
}

fn part<T: std::str::FromStr>(piece: &str, input: &str) -> Result<T, DateFormatError> {
    piece
        .trim()
        .parse()
        .map_err(|_| DateFormatError::Unrecognized(input.to_string()))
}

impl Serialize for DueDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_wire_string())
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The tag is decided here, once: incoming JSON strings are Wire.
        let raw = String::deserialize(deserializer)?;
        Ok(DueDate::Wire(raw))
    }
}
