//! Diagnostic build tag reported by the version endpoints

use chrono::NaiveDate;

use crate::config::ServiceConfig;

/// Build the version tag for the given start date.
///
/// Format: `{date}-{competition}-topic{topic_id}-app-{token}-{timeframe}`
/// Example: `2026-10-19-competition19-topic65-app-btc-8h`
pub fn version_tag(service: &ServiceConfig, date: NaiveDate) -> String {
    format!(
        "{}-{}-topic{}-app-{}-{}",
        date.format("%Y-%m-%d"),
        service.competition,
        service.topic_id,
        service.token.to_lowercase(),
        service.timeframe
    )
}

/// Version tag stamped with today's UTC date
pub fn current_version_tag(service: &ServiceConfig) -> String {
    version_tag(service, chrono::Utc::now().date_naive())
}
