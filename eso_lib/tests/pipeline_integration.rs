use chrono::{DateTime, NaiveDate, Utc};
use eso_lib::eso_api::Error as ApiError;
use eso_lib::{
    CycleState, EsoConfig, EsoError, MemorySessionStore, MemorySink, PartialConfig,
    RefreshPipeline, Scheduler, Series, Session, SessionStore, StatisticsSink,
};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn config(mock_server: &MockServer) -> EsoConfig {
    PartialConfig {
        username: Some("jonas@example.lt".into()),
        password: Some("slaptas".into()),
        selector: Some("Trakai".into()),
        base_url: Some(mock_server.uri()),
        ..PartialConfig::default()
    }
    .build()
    .unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn cached_session(mock_server: &MockServer) -> MemorySessionStore {
    let store = MemorySessionStore::new();
    let session = Session::new(Url::parse(&mock_server.uri()).unwrap());
    session.add_cookie("SSESS9f2c=cached-token; Path=/");
    store.set(session);
    store
}

/// Accepts `accept` series, then refuses every further one.
#[derive(Default)]
struct RefusingSink {
    accept: usize,
    received: Vec<String>,
}

impl StatisticsSink for RefusingSink {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError> {
        if self.received.len() >= self.accept {
            return Err(EsoError::Sink(format!(
                "recorder full, dropping {}",
                series.metadata.statistic_id
            )));
        }
        self.received.push(series.metadata.statistic_id.clone());
        Ok(())
    }
}

async fn mount_login(mock_server: &MockServer, status: u16, expected_logins: u64) {
    Mock::given(method("GET"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("login.html")))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_string_contains("login_type=1"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("set-cookie", "SSESS9f2c=fresh-token; Path=/; HttpOnly"),
        )
        .expect(expected_logins)
        .mount(mock_server)
        .await;
}

async fn mount_portal(mock_server: &MockServer, report_fixture: &str) {
    Mock::given(method("GET"))
        .and(path("/consumption"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(load_fixture("consumption.html")),
        )
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/consumption"))
        .and(query_param("ajax_form", "1"))
        .and(body_string_contains("objects%5B%5D=4098765"))
        .and(body_string_contains("next_button_value=2024-01-02+00%3A00"))
        .and(body_string_contains("form_token=tKz3V0w9mQ"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture(report_fixture)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn end_to_end_publishes_production_and_consumption() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report.json").await;

    let mut pipeline = RefreshPipeline::new(
        &config(&mock_server),
        MemorySessionStore::new(),
        MemorySink::new(),
    );
    let report = pipeline.refresh_on(today()).await.unwrap();

    assert!(report.fresh_login);
    assert_eq!(pipeline.state(), CycleState::Published);
    assert!(pipeline.sessions().get().is_some());

    let sink = pipeline.sink();
    assert_eq!(sink.len(), 2);

    let production = sink.get("eso:eso_electricity_production").unwrap();
    let sums: Vec<f64> = production.points.iter().map(|p| p.sum).collect();
    assert_eq!(sums, vec![1.0, 3.0]);
    assert_eq!(production.points[0].start, utc("2023-12-31T22:00:00Z"));

    let consumption = sink.get("eso:eso_electricity_consumption").unwrap();
    let sums: Vec<f64> = consumption.points.iter().map(|p| p.sum).collect();
    assert_eq!(sums, vec![0.5, 0.5]);
    assert_eq!(consumption.points[1].state, None);
    assert_eq!(consumption.metadata.unit_of_measurement, "kWh");

    let summaries = report.summaries();
    assert_eq!(summaries[0].statistic_id, "eso:eso_electricity_production");
    assert_eq!(summaries[0].total, 3.0);
}

#[tokio::test]
async fn session_is_reused_across_cycles() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report.json").await;

    let mut pipeline = RefreshPipeline::new(
        &config(&mock_server),
        MemorySessionStore::new(),
        MemorySink::new(),
    );
    let first = pipeline.refresh_on(today()).await.unwrap();
    let second = pipeline.refresh_on(today()).await.unwrap();

    assert!(first.fresh_login);
    assert!(!second.fresh_login);
    assert_eq!(pipeline.sink().publications(), 4);
    assert_eq!(pipeline.sink().len(), 2);
}

#[tokio::test]
async fn rejected_login_fails_cycle_without_session() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 401, 1).await;

    let mut pipeline = RefreshPipeline::new(
        &config(&mock_server),
        MemorySessionStore::new(),
        MemorySink::new(),
    );
    let result = pipeline.refresh_on(today()).await;

    assert!(matches!(
        result,
        Err(EsoError::Api(ApiError::Auth { status: 401 }))
    ));
    assert_eq!(pipeline.state(), CycleState::Failed);
    assert!(pipeline.sessions().get().is_none());
    assert!(pipeline.sink().is_empty());
}

#[tokio::test]
async fn stale_session_is_replaced_once() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;

    // An expired session gets the login page instead of the consumption form.
    Mock::given(method("GET"))
        .and(path("/consumption"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("login.html")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    mount_portal(&mock_server, "report.json").await;

    let store = cached_session(&mock_server);
    let mut pipeline = RefreshPipeline::new(&config(&mock_server), store, MemorySink::new());
    let report = pipeline.refresh_on(today()).await.unwrap();

    assert!(report.fresh_login);
    assert_eq!(pipeline.sink().len(), 2);
}

#[tokio::test]
async fn malformed_dataset_keeps_cached_session() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 0).await;
    mount_portal(&mock_server, "report_malformed.json").await;

    let mut pipeline = RefreshPipeline::new(
        &config(&mock_server),
        cached_session(&mock_server),
        MemorySink::new(),
    );
    let result = pipeline.refresh_on(today()).await;

    assert!(matches!(result, Err(EsoError::Api(ApiError::Parse(_)))));
    assert_eq!(pipeline.state(), CycleState::Failed);
    assert!(pipeline.sessions().get().is_some());
    assert!(pipeline.sink().is_empty());
}

#[tokio::test]
async fn sink_failure_stops_publication() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report.json").await;

    let sink = RefusingSink {
        accept: 1,
        ..RefusingSink::default()
    };
    let mut pipeline = RefreshPipeline::new(&config(&mock_server), MemorySessionStore::new(), sink);
    let result = pipeline.refresh_on(today()).await;

    assert!(matches!(result, Err(EsoError::Sink(_))));
    assert_eq!(pipeline.state(), CycleState::Failed);
    assert_eq!(
        pipeline.sink().received,
        vec!["eso:eso_electricity_production".to_string()]
    );
}

#[tokio::test]
async fn missing_object_is_not_retried() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report.json").await;

    let mut config = config(&mock_server);
    config.selector = "Klaipėda".into();
    let mut pipeline = RefreshPipeline::new(&config, MemorySessionStore::new(), MemorySink::new());
    let result = pipeline.refresh_on(today()).await;

    assert!(matches!(
        result,
        Err(EsoError::Api(ApiError::SelectorNotFound { .. }))
    ));
}

#[tokio::test]
async fn colliding_labels_publish_nothing() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report_unknown_labels.json").await;

    let mut pipeline = RefreshPipeline::new(
        &config(&mock_server),
        MemorySessionStore::new(),
        MemorySink::new(),
    );
    let result = pipeline.refresh_on(today()).await;

    assert!(matches!(result, Err(EsoError::LabelCollision { .. })));
    assert!(pipeline.sink().is_empty());
}

#[tokio::test]
async fn scheduler_marks_entity_unavailable_on_failure() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 500, 1).await;

    let config = config(&mock_server);
    let mut pipeline = RefreshPipeline::new(&config, MemorySessionStore::new(), MemorySink::new());
    let mut scheduler = Scheduler::new(&config.name, config.scan_interval());

    assert!(scheduler.tick(&mut pipeline).await.is_err());
    let state = scheduler.state();
    assert!(!state.available);
    assert!(state.last_update_success.is_none());
    assert!(state.last_error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn scheduler_stops_when_first_cycle_fails() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 403, 1).await;

    let config = config(&mock_server);
    let mut pipeline = RefreshPipeline::new(&config, MemorySessionStore::new(), MemorySink::new());
    let mut scheduler = Scheduler::new(&config.name, config.scan_interval());

    let result = scheduler
        .run_until(&mut pipeline, std::future::pending::<()>())
        .await;
    assert!(matches!(result, Err(EsoError::Api(ApiError::Auth { status: 403 }))));
}

#[tokio::test]
async fn scheduler_records_successful_cycle() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server, 200, 1).await;
    mount_portal(&mock_server, "report.json").await;

    let config = config(&mock_server);
    let mut pipeline = RefreshPipeline::new(&config, MemorySessionStore::new(), MemorySink::new());
    let mut scheduler = Scheduler::new(&config.name, config.scan_interval());

    // `tick` refreshes for the real current date, so accept any report body.
    Mock::given(method("POST"))
        .and(path("/consumption"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("report.json")))
        .mount(&mock_server)
        .await;

    scheduler.tick(&mut pipeline).await.unwrap();
    let state = scheduler.state();
    assert!(state.available);
    assert_eq!(state.name, "ESO");
    assert_eq!(state.series.len(), 2);
}
