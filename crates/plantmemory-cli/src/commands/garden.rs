use plantmemory_core::{Config, JournalEntry, JournalService};

use super::{open_service, print_json, CliResult};

pub async fn garden(service: &JournalService, year: Option<i32>) -> CliResult {
    let year = year.unwrap_or_else(|| service.current_year());
    print_json(&service.garden(year).await?)
}

/// One widget refresh: the year's entries if a year is given, otherwise the
/// most recent ones. Failures are logged and leave an empty list; the next
/// refresh cycle tries again.
pub async fn widget(config: Option<&Config>, year: Option<i32>) {
    let entries = match config {
        Some(config) => load_widget_entries(config, year).await.unwrap_or_else(|e| {
            if e.is_transient() {
                tracing::info!(error = %e, "widget refresh deferred to next cycle");
            } else {
                tracing::warn!(error = %e, "widget refresh failed");
            }
            Vec::new()
        }),
        None => {
            tracing::warn!("widget refresh skipped: configuration unavailable");
            Vec::new()
        }
    };
    if let Err(e) = print_json(&entries) {
        tracing::warn!(error = %e, "widget output failed");
    }
}

async fn load_widget_entries(
    config: &Config,
    year: Option<i32>,
) -> plantmemory_core::Result<Vec<JournalEntry>> {
    let service = open_service(config)?;
    match year {
        Some(year) => {
            service
                .entries_for_year(year, config.widget.year_limit)
                .await
        }
        None => service.recent_entries(config.widget.recent_limit).await,
    }
}
