//! Request descriptors for the export endpoint
//!
//! The endpoint takes a flat, positional-looking parameter list. Parameter
//! order and the literal `market=undefined` placeholder match what the
//! endpoint's own web form sends.

use super::{FetchError, FetchResult};
use crate::export::config::EXPORT_BASE_URL;
use crate::export::request::DOTTED_DATE_FORMAT;
use crate::export::{ExportRequest, Segment};
use chrono::{Datelike, NaiveDate};
use reqwest::Url;

/// Placeholder sent when no market is known
pub const UNKNOWN_MARKET: &str = "undefined";

const REDACTED: &str = "***";

/// Target resource plus ordered query parameters for one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Export resource URL, without query
    pub resource: String,
    /// Query parameters in send order
    pub params: Vec<(&'static str, String)>,
}

impl RequestDescriptor {
    /// Map a request and one of its segments to endpoint parameters
    ///
    /// `include_header` asks the endpoint for a column header row and should
    /// be `true` only for the first segment of a run.
    pub fn build(
        request: &ExportRequest,
        segment: &Segment,
        token: &str,
        include_header: bool,
    ) -> Self {
        let start = segment.interval.start();
        let end = segment.interval.end();

        let file_name = match request.file_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => segment.stem().to_string(),
        };
        let market = match request.market {
            Some(market) if market != 0 => market.to_string(),
            _ => UNKNOWN_MARKET.to_string(),
        };

        let params = vec![
            ("apply", "0".to_string()),
            ("p", request.period.code().to_string()),
            ("e", "txt".to_string()),
            ("dtf", request.dtf.unwrap_or_default().code().to_string()),
            ("tmf", request.tmf.unwrap_or_default().code().to_string()),
            ("MSOR", request.msor.unwrap_or_default().code().to_string()),
            ("mstimever", "on".to_string()),
            ("sep", request.sep.unwrap_or_default().code().to_string()),
            ("sep2", "1".to_string()),
            ("datf", request.datf.unwrap_or_default().code().to_string()),
            ("at", if include_header { "1" } else { "0" }.to_string()),
            ("from", dotted(start)),
            ("to", dotted(end)),
            ("em", request.em.clone()),
            ("code", request.code.clone()),
            ("f", file_name),
            ("cn", request.contract_name().to_string()),
            ("market", market),
            ("yf", start.year().to_string()),
            ("yt", end.year().to_string()),
            ("df", start.day().to_string()),
            ("dt", end.day().to_string()),
            // zero-based months
            ("mf", start.month0().to_string()),
            ("mt", end.month0().to_string()),
            ("token", token.to_string()),
        ];

        Self {
            resource: EXPORT_BASE_URL.to_string(),
            params,
        }
    }

    /// Send to a different resource (tests, mirrors)
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Value of the first parameter named `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Full request URL
    pub fn url(&self) -> FetchResult<Url> {
        Url::parse_with_params(&self.resource, &self.params).map_err(|e| {
            FetchError::FatalFailure(format!("invalid export resource '{}': {e}", self.resource))
        })
    }

    /// Full request URL with the token value masked, for logs
    pub fn redacted_url(&self) -> FetchResult<Url> {
        let params = self.params.iter().map(|(key, value)| {
            if *key == "token" {
                (*key, REDACTED)
            } else {
                (*key, value.as_str())
            }
        });
        Url::parse_with_params(&self.resource, params).map_err(|e| {
            FetchError::FatalFailure(format!("invalid export resource '{}': {e}", self.resource))
        })
    }

    /// Short description for logs (`SBER 01.01.2023-31.12.2023`)
    pub fn describe(&self) -> String {
        format!(
            "{} {}-{}",
            self.param("code").unwrap_or_default(),
            self.param("from").unwrap_or_default(),
            self.param("to").unwrap_or_default()
        )
    }
}

fn dotted(date: NaiveDate) -> String {
    date.format(DOTTED_DATE_FORMAT).to_string()
}
