// [apps/scheduler/tests/scheduler_test.rs]
use chrono::{TimeZone, Utc};
use mtracker_infra_broker::{InMemoryBroker, JobBroker};
use mtracker_infra_db::repositories::{bot_repository, proxy_repository, tracker_repository};
use mtracker_infra_db::TursoClient;
use mtracker_domain_models::{Proxy, Status};
use mtracker_scheduler::scheduler::run_bot_task;
use serde_json::json;

async fn memory_client() -> TursoClient {
    TursoClient::connect(":memory:", None).await.unwrap()
}

#[tokio::test]
async fn run_bot_task_enqueues_an_execute_job_with_the_stamped_config_hash() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker =
        tracker_repository::create(&transaction, "demofam", &json!({"type": "demofam"}), "hash-x", now).await.unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "pl", now).await.unwrap();
    proxy_repository::synchronize(
        &transaction,
        &[Proxy { id: 0, host: "1.1.1.1".into(), port: 1080, country: "pl".into(), username: None, password: None }],
    )
    .await
    .unwrap();
    transaction.commit().await.unwrap();

    let broker = InMemoryBroker::new();
    run_bot_task(&client, &broker, bot.id, 900).await.unwrap();

    let job = broker.dequeue_execute().await.unwrap().expect("job enqueued");
    assert_eq!(job.bot_id, bot.id);
    assert_eq!(job.tracker_id, tracker.id);
    assert_eq!(job.static_config["_id"], "hash-x");
    assert_eq!(job.proxy_url, "socks5h://1.1.1.1:1080");

    let refreshed = bot_repository::get(&connection, bot.id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, Status::InProgress);
}

#[tokio::test]
async fn run_bot_task_marks_bot_failing_when_no_proxy_matches_its_country() {
    let client = memory_client().await;
    let connection = client.get_connection().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let transaction = connection.transaction().await.unwrap();
    let tracker = tracker_repository::create(&transaction, "demofam", &json!({}), "hash-y", now).await.unwrap();
    let bot = bot_repository::create(&transaction, tracker.id, "zz", now).await.unwrap();
    transaction.commit().await.unwrap();

    let broker = InMemoryBroker::new();
    run_bot_task(&client, &broker, bot.id, 900).await.unwrap();

    assert!(broker.dequeue_execute().await.unwrap().is_none());
    let refreshed = bot_repository::get(&connection, bot.id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, Status::Failing);
}

#[tokio::test]
async fn run_bot_task_is_a_no_op_when_the_bot_has_already_vanished() {
    let client = memory_client().await;
    let broker = InMemoryBroker::new();

    run_bot_task(&client, &broker, 999, 900).await.unwrap();
    assert!(broker.dequeue_execute().await.unwrap().is_none());
}
