// [libs/infra/db/tests/repository_test.rs]
use chrono::{TimeZone, Utc};
use mtracker_domain_models::{BotRunUpdate, Status};
use mtracker_infra_db::repositories::{bot_repository, proxy_repository, task_repository, tracker_repository};
use mtracker_infra_db::TursoClient;
use serde_json::json;

async fn memory_client() -> TursoClient {
    TursoClient::connect(":memory:", None).await.unwrap()
}

#[tokio::test]
async fn ingest_then_fetch_pending_round_trips_a_new_bot() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker = tracker_repository::create(&transaction, "demofam", &json!({"type": "demofam"}), "hash-a", now)
        .await
        .unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "pl", now).await.unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(bot.status, Status::New);

    let pending = bot_repository::fetch_pending(&connection, now).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, bot.id);
}

#[tokio::test]
async fn no_matching_proxy_marks_bot_failing_and_recomputes_tracker() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker = tracker_repository::create(&transaction, "demofam", &json!({}), "hash-b", now).await.unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "zz", now).await.unwrap();
    transaction.commit().await.unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker_status = bot_repository::mark_failing_no_proxy(&transaction, bot.id, tracker.id, now).await.unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(tracker_status, Status::Failing);
    let refreshed = bot_repository::get(&connection, bot.id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, Status::Failing);
    assert_eq!(refreshed.last_error, "No matching proxy found");
    assert_eq!(refreshed.next_execution, now + chrono::Duration::hours(24));
}

#[tokio::test]
async fn update_after_run_clears_spree_on_success_and_propagates_tracker_status() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker = tracker_repository::create(&transaction, "demofam", &json!({}), "hash-c", now).await.unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "us", now).await.unwrap();
    transaction.commit().await.unwrap();

    let update = BotRunUpdate {
        status: Status::Working,
        state: Some(json!({"seq": 7})),
        failing_spree: 0,
        last_error: String::new(),
        next_execution: now + chrono::Duration::hours(12),
    };

    let transaction = connection.transaction().await.unwrap();
    let tracker_status = bot_repository::update_after_run(&transaction, bot.id, tracker.id, &update).await.unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(tracker_status, Status::Working);
    let refreshed = bot_repository::get(&connection, bot.id).await.unwrap().unwrap();
    assert_eq!(refreshed.state, json!({"seq": 7}));
    assert_eq!(refreshed.failing_spree, 0);

    let refreshed_tracker = tracker_repository::get(&connection, tracker.id).await.unwrap().unwrap();
    assert_eq!(refreshed_tracker.status, Status::Working);
}

#[tokio::test]
async fn task_lifecycle_and_reaper_sweep() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let long_ago = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker = tracker_repository::create(&transaction, "demofam", &json!({}), "hash-d", long_ago).await.unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "de", long_ago).await.unwrap();
    let task = task_repository::create(&transaction, bot.id, None, long_ago).await.unwrap();
    bot_repository::set_inprogress(&transaction, bot.id).await.unwrap();
    transaction.commit().await.unwrap();

    let stuck = task_repository::sweep_timed_out(&connection, now).await.unwrap();
    assert_eq!(stuck, vec![(task.id, bot.id)]);

    let transaction = connection.transaction().await.unwrap();
    task_repository::update_after_run(&transaction, task.id, Status::Crashed, now).await.unwrap();
    bot_repository::mark_crashed(&transaction, bot.id, tracker.id, "task_timeout_exceeded").await.unwrap();
    transaction.commit().await.unwrap();

    let refreshed_task = task_repository::get(&connection, task.id).await.unwrap().unwrap();
    assert_eq!(refreshed_task.status, Status::Crashed);
    assert!(refreshed_task.finished_at.is_some());
}

#[tokio::test]
async fn proxy_synchronize_inserts_and_deletes_by_natural_key() {
    use mtracker_domain_models::Proxy;

    let client = memory_client().await;
    let connection = client.get_connection().unwrap();

    let transaction = connection.transaction().await.unwrap();
    let seed = vec![Proxy { id: 0, host: "1.1.1.1".into(), port: 1080, country: "pl".into(), username: None, password: None }];
    proxy_repository::synchronize(&transaction, &seed).await.unwrap();
    transaction.commit().await.unwrap();

    let transaction = connection.transaction().await.unwrap();
    let fresh = vec![Proxy { id: 0, host: "2.2.2.2".into(), port: 1080, country: "de".into(), username: None, password: None }];
    let diff = proxy_repository::synchronize(&transaction, &fresh).await.unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.deleted.len(), 1);

    let all = proxy_repository::list_all(&connection).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].country, "de");
}
