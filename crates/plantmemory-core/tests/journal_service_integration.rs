//! Integration tests for the journal service: upsert, reads, live views.

use std::sync::Arc;
use std::time::Duration;

use plantmemory_core::calendar::DAY_MILLIS;
use plantmemory_core::{
    CoreError, EntryStore, FixedClock, IconType, JournalService, LocalZone, RandomCosmetics,
    ScriptedCosmetics, ValidationError,
};

// 2025-01-10T12:00:00Z
const T: i64 = 1_736_510_400_000;
const HOUR: i64 = 3_600_000;

fn utc_store() -> Arc<EntryStore> {
    Arc::new(EntryStore::open_memory(LocalZone::utc()).unwrap())
}

fn service_at(now: i64) -> (JournalService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let svc = JournalService::with_parts(utc_store(), clock.clone(), RandomCosmetics::seeded(1));
    (svc, clock)
}

async fn quiet<T: Send + 'static>(live: &mut plantmemory_core::LiveQuery<T>) -> bool {
    tokio::time::timeout(Duration::from_millis(50), live.next())
        .await
        .is_err()
}

#[tokio::test]
async fn test_same_day_save_overwrites_and_keeps_original_timestamp() {
    let clock = Arc::new(FixedClock::new(T + 2 * HOUR));
    let svc = JournalService::with_parts(
        utc_store(),
        clock,
        ScriptedCosmetics::new([4, 8], [0.3, 0.6]),
    );

    let a = svc
        .create_or_update_for_date("hello", IconType::Simple, Some(T))
        .await
        .unwrap();
    let b = svc
        .create_or_update_for_date("goodbye", IconType::Cactus, Some(T + HOUR))
        .await
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(svc.entry_count().await.unwrap(), 1);
    let entry = svc.get_entry_by_date(T).await.unwrap().unwrap();
    assert_eq!(entry.id, a);
    assert_eq!(entry.text, "goodbye");
    assert_eq!(entry.icon_type, IconType::Cactus);
    assert_eq!(entry.timestamp, T);
    assert_eq!(entry.icon_variant, 8);
    assert_eq!((entry.grid_x, entry.grid_y), (0.3, 0.6));
}

#[tokio::test]
async fn test_distinct_years_and_count_across_two_years() {
    let (svc, _) = service_at(T + 30 * DAY_MILLIS);
    let in_2024 = [T - 100 * DAY_MILLIS, T - 50 * DAY_MILLIS, T - 20 * DAY_MILLIS];
    let in_2025 = [T, T + 5 * DAY_MILLIS];
    for ts in in_2024.iter().chain(in_2025.iter()) {
        svc.create_or_update_for_date("memory", IconType::Fern, Some(*ts))
            .await
            .unwrap();
    }

    assert_eq!(svc.distinct_years().await.unwrap(), vec![2025, 2024]);
    assert_eq!(svc.entry_count().await.unwrap(), 5);
    assert_eq!(svc.entries_for_year(2024, 100).await.unwrap().len(), 3);
    assert_eq!(svc.entries_for_year(2024, 2).await.unwrap().len(), 2);
    assert!(svc.entries_for_year(2019, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_current_year_listed_even_without_entries() {
    let (svc, _) = service_at(T);
    svc.create_or_update_for_date("old", IconType::Acorn, Some(T - 400 * DAY_MILLIS))
        .await
        .unwrap();
    assert_eq!(svc.distinct_years().await.unwrap(), vec![2025, 2023]);
    assert!(svc.entries_for_year(2025, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_days_of_growth_tracks_clock() {
    let (svc, clock) = service_at(T);
    assert_eq!(svc.days_of_growth(svc.first_entry_timestamp().await.unwrap()), 0);

    svc.create_or_update_for_date("seed", IconType::Seedling, None)
        .await
        .unwrap();
    let first = svc.first_entry_timestamp().await.unwrap();
    assert_eq!(first, Some(T));
    assert_eq!(svc.days_of_growth(first), 1);

    for expected in 2..=5 {
        clock.advance(DAY_MILLIS);
        assert_eq!(svc.days_of_growth(first), expected);
    }
}

#[tokio::test]
async fn test_delete_reaches_snapshots_and_subscribers() {
    let (svc, _) = service_at(T);
    let mut all = svc.observe_all_entries();
    let mut count = svc.observe_entry_count();
    assert!(all.next().await.unwrap().is_empty());
    assert_eq!(count.next().await.unwrap(), 0);

    for day in 0..3 {
        svc.create_or_update_for_date("x", IconType::Star, Some(T - day * DAY_MILLIS))
            .await
            .unwrap();
    }
    assert_eq!(all.next().await.unwrap().len(), 3);
    assert_eq!(count.next().await.unwrap(), 3);

    let victim = svc.get_entry_by_date(T - DAY_MILLIS).await.unwrap().unwrap();
    assert!(svc.delete(&victim).await.unwrap());

    let after = all.next().await.unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|e| e.id != victim.id));
    assert_eq!(count.next().await.unwrap(), 2);
    assert!(svc.recent_entries(10).await.unwrap().iter().all(|e| e.id != victim.id));

    // Deleting again is a silent no-op that wakes nobody.
    assert!(!svc.delete(&victim).await.unwrap());
    assert!(quiet(&mut count).await);
}

#[tokio::test]
async fn test_year_subscription_only_sees_its_year() {
    let (svc, _) = service_at(T);
    let mut year_2024 = svc.observe_entries_for_year(2024);
    assert!(year_2024.next().await.unwrap().is_empty());

    svc.create_or_update_for_date("december", IconType::Moon, Some(T - 20 * DAY_MILLIS))
        .await
        .unwrap();
    let emitted = year_2024.next().await.unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].text, "december");
}

#[tokio::test]
async fn test_live_years_and_growth() {
    let (svc, _) = service_at(T);
    let mut years = svc.observe_distinct_years();
    let mut growth = svc.observe_days_of_growth();
    let mut first = svc.observe_first_entry_timestamp();
    assert_eq!(years.next().await.unwrap(), vec![2025]);
    assert_eq!(growth.next().await.unwrap(), 0);
    assert_eq!(first.next().await.unwrap(), None);

    let ts = T - 400 * DAY_MILLIS;
    svc.create_or_update_for_date("early", IconType::Pinecone, Some(ts))
        .await
        .unwrap();
    assert_eq!(years.next().await.unwrap(), vec![2025, 2023]);
    assert_eq!(growth.next().await.unwrap(), 401);
    assert_eq!(first.next().await.unwrap(), Some(ts));
}

#[tokio::test]
async fn test_garden_view_follows_writes() {
    let (svc, _) = service_at(T);
    let mut garden = svc.observe_garden(2025);
    let empty = garden.next().await.unwrap();
    assert!(empty.days.is_empty());
    assert_eq!(empty.available_years, vec![2025]);

    svc.create_or_update_for_date("jan 9", IconType::Bee, Some(T - DAY_MILLIS))
        .await
        .unwrap();
    let view = garden.next().await.unwrap();
    assert_eq!(view.days.len(), 1);
    assert_eq!(view.days[0].date_key, "2025-01-09");
    assert_eq!(view.days[0].day_label, "thursday, 01.09");
    assert_eq!(view.days_of_growth, 2);

    let snapshot = svc.garden(2025).await.unwrap();
    assert_eq!(snapshot, view);
}

#[tokio::test]
async fn test_year_after_delete_falls_back_to_current() {
    let (svc, _) = service_at(T);
    let id = svc
        .create_or_update_for_date("old", IconType::Shell, Some(T - 400 * DAY_MILLIS))
        .await
        .unwrap();
    let entry = svc.get_by_id(id).await.unwrap().unwrap();
    svc.delete(&entry).await.unwrap();
    assert_eq!(svc.year_after_delete(&entry, 2023), 2025);
    assert_eq!(svc.year_after_delete(&entry, 2024), 2024);
}

#[tokio::test]
async fn test_blank_text_is_validation_error() {
    let (svc, _) = service_at(T);
    let err = svc
        .create_or_update_for_date("", IconType::Heart, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::BlankText)));
    assert_eq!(svc.entry_count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_day_saves_leave_one_entry() {
    let (svc, _) = service_at(T);
    let mut handles = Vec::new();
    for i in 0..16 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.create_or_update_for_date(&format!("writer {i}"), IconType::Bird, Some(T + i))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(svc.entry_count().await.unwrap(), 1);
    let entry = svc.get_entry_by_date(T).await.unwrap().unwrap();
    assert!(entry.text.starts_with("writer "));
}

#[tokio::test]
async fn test_write_completes_after_caller_is_dropped() {
    let (svc, _) = service_at(T);
    let mut changes = svc.store().subscribe_changes();

    let save = svc.create_or_update_for_date("kept", IconType::Tulip, None);
    // Poll once, then abandon the future.
    let _ = tokio::time::timeout(Duration::ZERO, save).await;

    tokio::time::timeout(Duration::from_secs(5), changes.changed())
        .await
        .expect("write never committed")
        .unwrap();
    assert_eq!(svc.entry_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plant_memory.db");
    let zone = LocalZone::utc();

    let id = {
        let store = Arc::new(EntryStore::open(&path, zone).unwrap());
        let svc = JournalService::with_parts(
            store,
            Arc::new(FixedClock::new(T)),
            ScriptedCosmetics::new([6], [0.5, 0.5]),
        );
        svc.create_or_update_for_date("persisted", IconType::Apple, None)
            .await
            .unwrap()
    };

    let store = EntryStore::open(&path, zone).unwrap();
    let entry = store.get_by_local_date("2025-01-10").unwrap().unwrap();
    assert_eq!(entry.id, id);
    assert_eq!(entry.text, "persisted");
    assert_eq!(entry.icon_variant, 6);
    assert_eq!(store.path(), Some(path.as_path()));
}

#[tokio::test]
async fn test_zone_decides_which_day_an_instant_belongs_to() {
    // 23:30 UTC on Jan 10 is Jan 11 in UTC+1.
    let late = T + 11 * HOUR + 30 * 60_000;
    let east = Arc::new(EntryStore::open_memory(LocalZone::from_offset_minutes(60).unwrap()).unwrap());
    let svc = JournalService::with_parts(east, Arc::new(FixedClock::new(late)), RandomCosmetics::seeded(3));

    svc.create_or_update_for_date("late", IconType::Cloud, Some(late))
        .await
        .unwrap();
    assert_eq!(svc.date_key_of(late), "2025-01-11");
    assert!(svc.store().get_by_local_date("2025-01-11").unwrap().is_some());
    assert!(svc.store().get_by_local_date("2025-01-10").unwrap().is_none());

    // An earlier save that evening in UTC+1 is a different day.
    svc.create_or_update_for_date("evening", IconType::Cloud, Some(T + 8 * HOUR))
        .await
        .unwrap();
    assert_eq!(svc.entry_count().await.unwrap(), 2);
}
