use plantmemory_core::JournalService;

use super::{print_json, CliResult};

pub async fn years(service: &JournalService) -> CliResult {
    print_json(&service.distinct_years().await?)
}

pub async fn stats(service: &JournalService) -> CliResult {
    let count = service.entry_count().await?;
    let first = service.first_entry_timestamp().await?;
    print_json(&serde_json::json!({
        "entry_count": count,
        "first_entry_timestamp": first,
        "days_of_growth": service.days_of_growth(first),
        "current_year": service.current_year(),
    }))
}
