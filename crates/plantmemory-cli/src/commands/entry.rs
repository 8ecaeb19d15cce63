use plantmemory_core::calendar::parse_date_key;
use plantmemory_core::{CoreError, IconType, JournalService};

use super::{print_json, CliResult};

/// Local noon of a `YYYY-MM-DD` day.
fn day_timestamp(service: &JournalService, key: &str) -> Result<i64, CoreError> {
    let date = parse_date_key(key)?;
    Ok(service.zone().local_noon(date))
}

pub async fn save(
    service: &JournalService,
    text: &str,
    icon: Option<&str>,
    date: Option<&str>,
) -> CliResult {
    let icon_type = match icon {
        Some(name) => name.parse::<IconType>()?,
        None => IconType::default(),
    };
    let timestamp = match date {
        Some(key) => Some(service.clamp_to_today(day_timestamp(service, key)?)),
        None => None,
    };

    let id = service
        .create_or_update_for_date(text, icon_type, timestamp)
        .await?;
    let entry = service
        .get_by_id(id)
        .await?
        .ok_or(CoreError::NotFound { id })?;
    print_json(&entry)
}

pub async fn show(service: &JournalService, date: &str) -> CliResult {
    let timestamp = day_timestamp(service, date)?;
    print_json(&service.get_entry_by_date(timestamp).await?)
}

pub async fn get(service: &JournalService, id: i64) -> CliResult {
    let entry = service
        .get_by_id(id)
        .await?
        .ok_or(CoreError::NotFound { id })?;
    print_json(&entry)
}

pub async fn delete(service: &JournalService, id: i64) -> CliResult {
    let deleted = service.delete_by_id(id).await?;
    print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
}

pub async fn list(service: &JournalService, year: Option<i32>, desc: bool) -> CliResult {
    let mut entries = match year {
        Some(year) => service.entries_for_year(year, u32::MAX).await?,
        None => service.all_entries().await?,
    };
    if !desc {
        entries.reverse();
    }
    print_json(&entries)
}

pub async fn recent(service: &JournalService, limit: u32) -> CliResult {
    print_json(&service.recent_entries(limit).await?)
}
