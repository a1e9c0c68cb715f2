//! Device-driver facade tests
//!
//! Every message the scheduler can receive, driven through the mock robot.

use robodriver::testing::{MockConfig, MockResponse, MockTransport};
use robodriver::{CONNECTION_FAILED, DeviceDriver, EngineConfig, NO_CONNECTION, OperationMatch};
use robodriver_protocol::{FINISHED_SUCCESSFULLY, IN_PROGRESS};

const ROBOT: &str = "127.0.0.30";

async fn open(mock: &MockTransport, config: EngineConfig) -> DeviceDriver {
    let mut driver = DeviceDriver::with_connector(config, mock.connector());
    assert_eq!(driver.open_connection(ROBOT).await, "");
    driver
}

#[tokio::test]
async fn test_open_connection_refused() {
    let mock = MockTransport::with_config(MockConfig {
        refuse_connections: true,
        ..Default::default()
    });
    let mut driver = DeviceDriver::with_connector(EngineConfig::default(), mock.connector());

    assert_eq!(driver.open_connection(ROBOT).await, CONNECTION_FAILED);
    assert_eq!(driver.initialise().await, NO_CONNECTION);
}

#[tokio::test]
async fn test_initialise_returns_process_id() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(driver.initialise().await, "1");
    assert_eq!(mock.sent_commands(), vec!["home%"]);
}

#[tokio::test(start_paused = true)]
async fn test_initialise_without_reply() {
    let mock = MockTransport::new();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(driver.initialise().await, "-1");
}

#[tokio::test]
async fn test_invalid_operation() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(
        driver.execute_operation("Dance", &["x"], &["1"]).await,
        "Invalid Requested Operation! op:dance"
    );
    assert!(mock.sent_commands().is_empty());
}

#[tokio::test]
async fn test_exact_operation_match_rejects_embedded_names() {
    let mock = MockTransport::idle_robot();
    let config = EngineConfig::default().with_operation_match(OperationMatch::Exact);
    let mut driver = open(&mock, config).await;

    assert_eq!(
        driver
            .execute_operation("mytransferop", &["a", "b"], &["1", "2"])
            .await,
        "Invalid Requested Operation! op:mytransferop"
    );
}

#[tokio::test]
async fn test_invalid_parameter_count() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(
        driver
            .execute_operation(
                "pick",
                &["Destination Location", "Source Location"],
                &["5", "12"]
            )
            .await,
        "Invalid Number of Parameters! op: pick pnames: Destination Location, Source Location pvalues:5, 12"
    );
}

#[tokio::test]
async fn test_embedded_name_passes_lookup_but_not_arity() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(
        driver
            .execute_operation("mytransferop", &["a", "b"], &["1", "2"])
            .await,
        "Invalid Number of Parameters! op: mytransferop pnames: a, b pvalues:1, 2"
    );
}

#[tokio::test]
async fn test_robot_busy() {
    let mock = MockTransport::new().with_responder(|command| {
        if command.starts_with("status%") {
            MockResponse::Reply(IN_PROGRESS.to_string())
        } else {
            MockResponse::Reply("3".to_string())
        }
    });
    let mut driver = open(&mock, EngineConfig::default()).await;
    assert_eq!(driver.initialise().await, "3");

    assert_eq!(
        driver
            .execute_operation("place", &["Destination Location"], &["5"])
            .await,
        "Robot is not available! Currently processing \"3\""
    );
    assert_eq!(mock.sent_commands(), vec!["home%", "status%3"]);
}

#[tokio::test]
async fn test_operation_runs_when_available() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;
    driver.initialise().await;

    let reply = driver
        .execute_operation("PICK", &["Destination Location"], &["5"])
        .await;

    assert_eq!(reply, "2");
    assert_eq!(
        mock.sent_commands(),
        vec!["home%", "status%1", "pick%Destination Location5"]
    );
    assert_eq!(
        driver.engine().map(|e| e.current_process_id().get()),
        Some(2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_operation_without_reply_returns_empty() {
    let mock = MockTransport::new().with_responder(|command| {
        if command.starts_with("status%") {
            MockResponse::Reply(FINISHED_SUCCESSFULLY.to_string())
        } else {
            MockResponse::Silent
        }
    });
    let mut driver = open(&mock, EngineConfig::default()).await;

    let reply = driver
        .execute_operation("transfer", &["Source Location", "Destination Location"], &["1", "2"])
        .await;

    assert_eq!(reply, "");
    assert_eq!(mock.sent_commands().len(), 4);
}

#[tokio::test]
async fn test_abort_then_reopen() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    assert_eq!(driver.abort(), "");
    assert!(driver.engine().is_none());
    assert_eq!(mock.dispose_count(), 1);
    assert_eq!(mock.subscriber_count(), 0);

    assert_eq!(driver.abort(), NO_CONNECTION);
    assert_eq!(driver.initialise().await, NO_CONNECTION);
    assert_eq!(
        driver.execute_operation("pick", &["x"], &["1"]).await,
        NO_CONNECTION
    );

    assert_eq!(driver.open_connection(ROBOT).await, "");
    assert_eq!(driver.initialise().await, "2");
}

#[tokio::test]
async fn test_peer_close_means_no_connection() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;

    mock.simulate_peer_close();

    assert_eq!(driver.initialise().await, NO_CONNECTION);
    assert_eq!(driver.abort(), NO_CONNECTION);
}

#[tokio::test]
async fn test_scheduler_sequence() {
    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;
    assert_eq!(driver.initialise().await, "1");

    let plan = [
        ("pick", vec!["Destination Location"], vec!["5"]),
        ("transfer", vec!["Destination Location", "Source Location"], vec!["5", "12"]),
        ("place", vec!["Destination Location"], vec!["12"]),
    ];

    for (operation, names, values) in &plan {
        let reply = driver.execute_operation(operation, names, values).await;
        assert!(reply.parse::<i32>().is_ok(), "{operation} answered {reply:?}");
    }

    let sent = mock.sent_commands();
    assert_eq!(sent.len(), 1 + 2 * plan.len());
    assert_eq!(sent.last().map(String::as_str), Some("place%Destination Location12"));
}

#[tokio::test]
async fn test_scheduler_plan_with_fixed_parameters() {
    const NAMES: [&str; 2] = ["Destination Location", "Source Location"];
    const VALUES: [&str; 2] = ["5", "12"];
    let too_many = |operation: &str| {
        format!(
            "Invalid Number of Parameters! op: {operation} pnames: Destination Location, Source Location pvalues:5, 12"
        )
    };
    let not_schedulable = "Invalid Requested Operation! op:home".to_string();

    let mock = MockTransport::idle_robot();
    let mut driver = open(&mock, EngineConfig::default()).await;
    assert_eq!(driver.initialise().await, "1");

    let plan = [
        ("pick", too_many("pick")),
        ("home", not_schedulable.clone()),
        ("transfer", "2".to_string()),
        ("pick", too_many("pick")),
        ("home", not_schedulable),
        ("place", too_many("place")),
        ("transfer", "3".to_string()),
        ("transfer", "4".to_string()),
        ("transfer", "5".to_string()),
        ("transfer", "6".to_string()),
        ("pick", too_many("pick")),
    ];
    for (operation, expected) in &plan {
        assert_eq!(
            &driver.execute_operation(operation, &NAMES, &VALUES).await,
            expected,
            "{operation}"
        );
    }

    let sent = mock.sent_commands();
    assert_eq!(sent.len(), 1 + 2 * 5);
    assert_eq!(sent[2], "transfer%Destination Location5Source Location12");

    // The next cycle reconnects and homes again
    assert_eq!(driver.abort(), "");
    assert_eq!(driver.open_connection(ROBOT).await, "");
    assert_eq!(driver.initialise().await, "7");
}
