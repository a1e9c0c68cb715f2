//! Integration tests for the command engine against the mock transport

use robodriver::testing::{MockConfig, MockResponse, MockTransport};
use robodriver::{
    CommandEngine, EngineConfig, EngineError, ProcessId, Rendezvous, RobotConnectionState,
    SendOptions,
};
use robodriver_protocol::STATUS_PHRASES;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;

async fn connected_engine(mock: &MockTransport, config: EngineConfig) -> CommandEngine {
    let engine = CommandEngine::with_connector(config, mock.connector());
    assert!(engine.connect("127.0.0.30").await);
    engine
}

#[tokio::test(start_paused = true)]
async fn test_set_automation_ready_records_process_id() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("12\r\n".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    assert_eq!(engine.set_automation_ready().await, ProcessId::new(12));
    assert_eq!(engine.current_process_id(), ProcessId::new(12));
    assert_eq!(mock.sent_commands(), vec!["home%"]);
}

#[tokio::test(start_paused = true)]
async fn test_set_automation_ready_without_reply() {
    let mock = MockTransport::new();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    assert_eq!(engine.set_automation_ready().await, ProcessId::NONE);
    assert_eq!(engine.current_process_id(), ProcessId::NONE);
    assert_eq!(mock.sent_commands().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_numeric_reply_yields_no_process_id() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("ok".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let reply = engine
        .execute_command("pick", &["Destination Location"], &["5"])
        .await;
    assert_eq!(reply, Ok("ok".to_string()));
    assert!(engine.current_process_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_execute_command_encodes_parameters() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("4".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let reply = engine
        .execute_command(
            "transfer",
            &["Source Location", "Destination Location"],
            &["1", "2"],
        )
        .await;

    assert_eq!(reply, Ok("4".to_string()));
    assert_eq!(engine.current_process_id(), ProcessId::new(4));
    assert_eq!(
        mock.sent_commands(),
        vec!["transfer%Source Location1Destination Location2"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_execute_command_rejects_unpaired_parameters() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let result = engine
        .execute_command("transfer", &["Source Location"], &["1", "2"])
        .await;

    assert!(matches!(result, Err(EngineError::InvalidParameters(_))));
    assert!(mock.sent_commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_execute_command_rejects_unknown_operation() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let result = engine.execute_command("dance", &["x"], &["1"]).await;

    assert_eq!(result, Err(EngineError::InvalidOperation("dance".to_string())));
    assert!(mock.sent_commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_status_reassembles_fragments() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Fragments(vec![
        "process 3: ".to_string(),
        "Terminated With Error".to_string(),
    ]));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let status = engine.get_robot_status(ProcessId::new(3)).await;
    assert_eq!(status, Ok("process 3:Terminated With Error".to_string()));
    assert_eq!(mock.sent_commands(), vec!["status%3"]);
}

#[tokio::test(start_paused = true)]
async fn test_status_retries_until_expected_phrase() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("garbage".to_string()));
    mock.enqueue_response(MockResponse::Reply("In Progress".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let options = SendOptions::new(Duration::from_millis(2000))
        .with_attempts(3)
        .expecting(&STATUS_PHRASES);
    let reply = assert_ok!(engine.send_with_retry("status%1", &options).await);

    assert_eq!(reply.text, "In Progress");
    assert_eq!(reply.attempts, 2);
    assert_eq!(mock.sent_commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_matches_on_third_attempt() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Silent);
    mock.enqueue_response(MockResponse::Reply("junk".to_string()));
    mock.enqueue_response(MockResponse::Reply("Finished Successfully".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let options = SendOptions::new(Duration::from_millis(2000))
        .with_attempts(3)
        .expecting(&STATUS_PHRASES);
    let reply = assert_ok!(engine.send_with_retry("status%1", &options).await);

    assert_eq!(reply.text, "Finished Successfully");
    assert_eq!(reply.attempts, 3);
    assert_eq!(mock.sent_commands().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_split_process_id_is_reassembled() {
    let mock = MockTransport::with_config(MockConfig {
        response_delay: Some(Duration::from_millis(10)),
        ..Default::default()
    });
    mock.enqueue_response(MockResponse::Fragments(vec![
        "1".to_string(),
        "2".to_string(),
    ]));
    mock.enqueue_response(MockResponse::Reply("Finished Successfully".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let reply = engine
        .execute_command("pick", &["Destination Location"], &["5"])
        .await;
    assert_eq!(reply, Ok("12".to_string()));
    assert_eq!(engine.current_process_id(), ProcessId::new(12));

    // Nothing from the split reply leaks into the next one
    assert_eq!(
        engine.get_robot_status(ProcessId::new(12)).await,
        Ok("Finished Successfully".to_string())
    );
    assert_eq!(mock.sent_commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unfiltered_reply_collects_whole_window() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("7".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    let start = Instant::now();

    assert_eq!(engine.set_automation_ready().await, ProcessId::new(7));
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(mock.sent_commands().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_attempts_time_out() {
    let mock = MockTransport::new();
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    let start = Instant::now();

    let result = engine.get_robot_status(ProcessId::new(1)).await;

    assert_eq!(
        result,
        Err(EngineError::Timeout {
            attempts: 3,
            last_reply: String::new(),
        })
    );
    assert_eq!(mock.sent_commands().len(), 3);
    // Bounded by window x attempts
    assert!(start.elapsed() >= Duration::from_millis(6000));
    assert!(start.elapsed() < Duration::from_millis(6500));
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_reply_is_reported() {
    let mock = MockTransport::new().with_responder(|_| MockResponse::Reply("Idle".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let result = engine.get_robot_status(ProcessId::new(1)).await;
    assert_eq!(
        result,
        Err(EngineError::Timeout {
            attempts: 3,
            last_reply: "Idle".to_string(),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_backs_off_and_retries() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::FailSend);
    mock.enqueue_response(MockResponse::Reply("8".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    let start = Instant::now();

    let reply = engine.execute_command("place", &["Destination Location"], &["5"]).await;

    assert_eq!(reply, Ok("8".to_string()));
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_connection_lost_while_sending() {
    let mock = MockTransport::new();
    let handle = mock.clone();
    let mock = mock.with_responder(move |_| {
        handle.simulate_peer_close();
        MockResponse::FailSend
    });
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    let result = engine.execute_command("pick", &["x"], &["1"]).await;

    assert!(matches!(result, Err(EngineError::Transport(_))));
    assert_eq!(mock.sent_commands().len(), 1);
    assert_eq!(engine.connection_state(), RobotConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_send_requires_connection() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    mock.simulate_peer_close();

    assert!(!engine.is_connected());
    assert_eq!(
        engine.execute_command("pick", &["x"], &["1"]).await,
        Err(EngineError::NotConnected)
    );
    assert!(mock.sent_commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_robot_availability() {
    let mock = MockTransport::new();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    mock.enqueue_response(MockResponse::Reply("Finished Successfully".to_string()));
    assert!(engine.is_robot_available(ProcessId::new(1)).await);

    mock.enqueue_response(MockResponse::Reply("Terminated With Error".to_string()));
    assert!(engine.is_robot_available(ProcessId::new(1)).await);

    mock.enqueue_response(MockResponse::Reply("In Progress".to_string()));
    assert!(!engine.is_robot_available(ProcessId::new(1)).await);

    // Silent robot: every attempt times out
    assert!(!engine.is_robot_available(ProcessId::new(1)).await);
}

#[tokio::test(start_paused = true)]
async fn test_signaled_wait_returns_early() {
    let mock = MockTransport::with_config(MockConfig {
        response_delay: Some(Duration::from_millis(20)),
        ..Default::default()
    });
    mock.enqueue_response(MockResponse::Reply("In Progress".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    let start = Instant::now();

    assert_ok!(engine.get_robot_status(ProcessId::new(1)).await);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_fixed_sleep_waits_whole_window() {
    let mock = MockTransport::new();
    mock.enqueue_response(MockResponse::Reply("In Progress".to_string()));
    let config = EngineConfig::default().with_rendezvous(Rendezvous::FixedSleep);
    let engine = connected_engine(&mock, config).await;
    let start = Instant::now();

    assert_eq!(
        engine.get_robot_status(ProcessId::new(1)).await,
        Ok("In Progress".to_string())
    );
    assert!(start.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_reply_lands_in_later_attempt() {
    // Reply arrives after the first 100 ms window has closed
    let mock = MockTransport::with_config(MockConfig {
        response_delay: Some(Duration::from_millis(150)),
        ..Default::default()
    });
    mock.enqueue_response(MockResponse::Reply("9".to_string()));
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    assert_eq!(engine.set_automation_ready().await, ProcessId::new(9));
    assert_eq!(mock.sent_commands().len(), 2);
}

#[tokio::test]
async fn test_connection_state_follows_events() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    assert_eq!(engine.connection_state(), RobotConnectionState::Connected);

    mock.simulate_peer_close();
    assert_eq!(engine.connection_state(), RobotConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_refused() {
    let mock = MockTransport::with_config(MockConfig {
        refuse_connections: true,
        ..Default::default()
    });
    let engine = CommandEngine::with_connector(EngineConfig::default(), mock.connector());

    assert!(!engine.connect("127.0.0.30").await);
    assert!(!engine.is_connected());
}

#[tokio::test]
async fn test_close_releases_transport() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;
    assert_eq!(mock.subscriber_count(), 2);

    engine.close();

    assert_eq!(mock.subscriber_count(), 0);
    assert_eq!(mock.dispose_count(), 1);
    assert!(!engine.is_connected());
    assert!(!engine.is_disposed());

    // The engine can connect again after close
    assert!(engine.connect("127.0.0.30").await);
    assert_eq!(mock.subscriber_count(), 2);
}

#[tokio::test]
async fn test_reconnect_replaces_transport() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    assert!(engine.connect("127.0.0.30").await);

    assert_eq!(mock.dispose_count(), 1);
    assert_eq!(mock.connect_count(), 2);
    assert_eq!(mock.subscriber_count(), 2);
}

#[tokio::test]
async fn test_dispose_is_idempotent_and_runs_on_drop() {
    let mock = MockTransport::idle_robot();
    let engine = connected_engine(&mock, EngineConfig::default()).await;

    engine.dispose();
    engine.dispose();
    assert!(engine.is_disposed());
    assert_eq!(mock.dispose_count(), 1);
    assert!(!engine.connect("127.0.0.30").await);
    drop(engine);
    assert_eq!(mock.dispose_count(), 1);

    let engine = connected_engine(&mock, EngineConfig::default()).await;
    drop(engine);
    assert_eq!(mock.dispose_count(), 2);
    assert_eq!(mock.subscriber_count(), 0);
}
