// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Salesforce link, id and name helpers.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Maximum length of an opportunity name accepted by Salesforce.
pub const MAX_OPP_NAME_LENGTH: usize = 120;

/// Lightning links: `.../lightning/r/Opportunity/<id>/view`.
/// Classic links end with the record id: `https://x.my.salesforce.com/<id>`.
static SF_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/lightning/r/[A-Za-z_]+/|salesforce\.com/)([a-zA-Z0-9]{15}(?:[a-zA-Z0-9]{3})?)(?:/view)?/?(?:[?#].*)?$")
        .expect("valid regex")
});

/// Parse a Salesforce timestamp such as `2023-06-01T00:21:58.000+0000`.
pub fn parse_salesforce_offset_date_time(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z").map(|dt| dt.with_timezone(&Utc))
}

/// Parse a Salesforce date field (`yyyy-MM-dd`).
pub fn parse_salesforce_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
}

/// Extract the record id from a lightning or classic Salesforce url.
/// Returns `None` when the url is not a Salesforce record link.
pub fn extract_id_from_sf_url(url: &str) -> Option<String> {
    SF_ID_PATTERN
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Lightning url of the opportunity with the given id.
pub fn sf_opp_id_to_link(lightning_base: &str, id: &str) -> String {
    record_url(lightning_base, "Opportunity", id)
}

/// Lightning url of the contact with the given id.
pub fn contact_url(lightning_base: &str, id: &str) -> String {
    record_url(lightning_base, "Contact", id)
}

fn record_url(lightning_base: &str, object: &str, id: &str) -> String {
    format!(
        "{}/lightning/r/{}/{}/view",
        lightning_base.trim_end_matches('/'),
        object,
        id
    )
}

/// External id linking a candidate opportunity to its candidate and job.
pub fn make_external_id(candidate_number: &str, job_sf_id: &str) -> String {
    format!("{}-{}", candidate_number, job_sf_id)
}

/// Name of a candidate opportunity: `<first>(<number>)-<job>`, truncated to
/// fit [`MAX_OPP_NAME_LENGTH`].
pub fn generate_candidate_opp_name(
    first_name: Option<&str>,
    candidate_number: &str,
    job_name: Option<&str>,
) -> String {
    let name = format!(
        "{}({})-{}",
        first_name.unwrap_or_default(),
        candidate_number,
        job_name.unwrap_or_default()
    );
    if name.chars().count() > MAX_OPP_NAME_LENGTH {
        let truncated: String = name.chars().take(MAX_OPP_NAME_LENGTH - 3).collect();
        format!("{}...", truncated)
    } else {
        name
    }
}

/// Quote a value for use in a SOQL string literal.
pub fn soql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
