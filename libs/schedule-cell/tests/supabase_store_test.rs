use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveTime;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::{ScheduleBlock, ScheduleError, ScheduleStore, SupabaseScheduleStore};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn store_for(server: &MockServer) -> SupabaseScheduleStore {
    SupabaseScheduleStore::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
}

#[tokio::test]
async fn test_list_blocks_for_day_parses_rows() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let block_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("day_of_week", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::schedule_block_row(
                &block_id.to_string(),
                &doctor_id.to_string(),
                3,
                time(8, 0),
                time(12, 0),
                15
            )
        ])))
        .mount(&server)
        .await;

    let blocks = store_for(&server).await.list_blocks_for_day(doctor_id, 3).await.unwrap();

    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, block_id);
    assert_eq!(blocks[0].start_time, time(8, 0));
    assert_eq!(blocks[0].slot_duration_minutes, 15);
}

#[tokio::test]
async fn test_insert_returns_representation() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let block = ScheduleBlock::new(doctor_id, 1, time(9, 0), time(11, 0), 30);

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::schedule_block_row(
                &block.id.to_string(),
                &doctor_id.to_string(),
                1,
                time(9, 0),
                time(11, 0),
                30
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let created = store_for(&server).await.insert_block(block.clone()).await.unwrap();
    assert_eq!(created.id, block.id);
}

#[tokio::test]
async fn test_delete_of_missing_row_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store: Arc<dyn ScheduleStore> = Arc::new(store_for(&server).await);
    assert_matches!(store.delete_block(Uuid::new_v4()).await, Err(ScheduleError::NotFound));
}

#[tokio::test]
async fn test_server_error_maps_to_database_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = store_for(&server).await.list_blocks(Uuid::new_v4()).await;
    assert_matches!(result, Err(ScheduleError::DatabaseError(_)));
}
