//! Export request model and validation

use super::config::EXPORT_DIR_NAME;
use super::format::{CandleTime, DateFormat, DateTimeFormat, FieldSeparator, TimeFormat};
use super::ExportError;
use crate::{DateInterval, Granularity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Date format used by the endpoint and by request files (`dd.mm.yyyy`)
pub const DOTTED_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse a `dd.mm.yyyy` date
pub fn parse_dotted_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), DOTTED_DATE_FORMAT)
        .map_err(|e| format!("Invalid date '{input}' (expected dd.mm.yyyy): {e}"))
}

/// One export, as handed to the orchestrator
///
/// Field names on the wire match the original request files so existing
/// JSON exports keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Instrument ticker code (e.g., "SBER")
    pub code: String,
    /// Numeric instrument identifier, kept as a string as the endpoint expects
    pub em: String,
    /// Data granularity
    pub period: Granularity,
    /// First day of an explicit range
    #[serde(default, with = "dotted_date_opt", skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    /// Last day of an explicit range
    #[serde(default, with = "dotted_date_opt", skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    /// Calendar year, used when no explicit range is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Date column format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datf: Option<DateFormat>,
    /// Date-time format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtf: Option<DateTimeFormat>,
    /// Time column format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmf: Option<TimeFormat>,
    /// Candle timestamp reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msor: Option<CandleTime>,
    /// Field separator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sep: Option<FieldSeparator>,
    /// Market identifier; zero means unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<u32>,
    /// Contract name reported in the file; defaults to the code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cn: Option<String>,
    /// File name prefix requested from the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Root directory; exports land under `{output_dir}/out`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Merge multi-segment downloads into one file
    #[serde(default)]
    pub merge: bool,
    /// Accepted for compatibility with request files; not acted on
    #[serde(default)]
    pub merge_all: bool,
    /// Accepted for compatibility with request files; not acted on
    #[serde(default)]
    pub fallback: bool,
    /// Plan and log requests without any network or file I/O
    #[serde(default)]
    pub dry_run: bool,
}

impl ExportRequest {
    /// Create a request with no date selection and default options
    pub fn new(code: impl Into<String>, em: impl Into<String>, period: Granularity) -> Self {
        Self {
            code: code.into(),
            em: em.into(),
            period,
            from: None,
            to: None,
            year: None,
            datf: None,
            dtf: None,
            tmf: None,
            msor: None,
            sep: None,
            market: None,
            cn: None,
            file_name: None,
            output_dir: None,
            merge: false,
            merge_all: false,
            fallback: false,
            dry_run: false,
        }
    }

    /// Create a request covering a calendar year
    pub fn for_year(
        code: impl Into<String>,
        em: impl Into<String>,
        period: Granularity,
        year: i32,
    ) -> Self {
        let mut request = Self::new(code, em, period);
        request.year = Some(year);
        request
    }

    /// Create a request covering an explicit inclusive date range
    pub fn for_range(
        code: impl Into<String>,
        em: impl Into<String>,
        period: Granularity,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Self {
        let mut request = Self::new(code, em, period);
        request.from = Some(from);
        request.to = Some(to);
        request
    }

    /// Validate request parameters
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.code.trim().is_empty() {
            return Err(ExportError::InvalidRequest(
                "instrument code cannot be empty".to_string(),
            ));
        }

        let em = self.em.trim();
        if em.is_empty() {
            return Err(ExportError::InvalidRequest(
                "instrument id cannot be empty".to_string(),
            ));
        }
        if !em.chars().all(|c| c.is_ascii_digit()) {
            return Err(ExportError::InvalidRequest(format!(
                "instrument id must be numeric, got '{em}'"
            )));
        }

        self.resolve_interval().map(|_| ())
    }

    /// Resolve the effective date interval from either the explicit range or the year
    pub fn resolve_interval(&self) -> Result<DateInterval, ExportError> {
        match (self.from, self.to, self.year) {
            (Some(from), Some(to), None) => {
                DateInterval::new(from, to).map_err(ExportError::InvalidRequest)
            }
            (None, None, Some(year)) => DateInterval::calendar_year(year)
                .ok_or_else(|| ExportError::InvalidRequest(format!("year {year} is out of range"))),
            (None, None, None) => Err(ExportError::InvalidRequest(
                "either from/to dates or year must be specified".to_string(),
            )),
            (Some(_), Some(_), Some(_)) => Err(ExportError::InvalidRequest(
                "specify either from/to dates or year, not both".to_string(),
            )),
            _ => Err(ExportError::InvalidRequest(
                "from and to dates must be specified together".to_string(),
            )),
        }
    }

    /// Root directory all segment paths are derived from
    pub fn export_root(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(EXPORT_DIR_NAME)
    }

    /// Contract name sent as `cn`
    pub fn contract_name(&self) -> &str {
        match self.cn.as_deref() {
            Some(cn) if !cn.is_empty() => cn,
            _ => &self.code,
        }
    }
}

mod dotted_date_opt {
    use super::{parse_dotted_date, DOTTED_DATE_FORMAT};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(DOTTED_DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse_dotted_date(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}
