// Integration tests for the HTTP control surface
//
// Each test binds the router to an ephemeral port with scripted
// collaborators behind it and drives the endpoints with a real client.

use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use echonote::audio::{AudioFrame, MockAudioBackend, MockBackendFactory};
use echonote::clock::ManualClock;
use echonote::session::{SessionController, SessionSettings};
use echonote::stt::MockTranscription;
use echonote::summarize::MockSummarizer;
use echonote::{create_router, AppState};
use serde_json::Value;

/// Starts the service on an ephemeral port and returns its base URL.
async fn spawn_service(
    factory: MockBackendFactory,
    transcription: MockTranscription,
) -> Result<String> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    let settings = SessionSettings {
        chunk_seconds: 1,
        ..SessionSettings::default()
    };
    let controller = SessionController::new(
        settings,
        Arc::new(factory),
        Arc::new(transcription),
        Arc::new(MockSummarizer::new()),
        Arc::new(clock),
    );

    let router = create_router(AppState::new(Arc::new(controller)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    Ok(base)
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let base = spawn_service(MockBackendFactory::new(), MockTranscription::new()).await?;

    let response = reqwest::get(format!("{}/health", base)).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_full_session_lifecycle_over_http() -> Result<()> {
    // Setup: 2 seconds of audio transcribing to two segments
    let factory = MockBackendFactory::new()
        .with_backend(MockAudioBackend::new().with_silence(2, 16_000, 1));
    let transcription = MockTranscription::new().with_text("hello").with_text("world");
    let base = spawn_service(factory, transcription).await?;
    let client = reqwest::Client::new();

    // Start a session
    let response = client.post(format!("{}/session/start", base)).send().await?;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await?;
    assert_eq!(status["state"], "recording");
    assert!(status["session_id"]
        .as_str()
        .unwrap()
        .starts_with("session-"));

    // Status reports the live session
    let status: Value = client
        .get(format!("{}/session/status", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(status["state"], "recording");

    // Graceful stop drains both chunks
    let response = client.post(format!("{}/session/stop", base)).send().await?;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await?;
    assert_eq!(status["state"], "stopped");
    assert_eq!(status["chunks_captured"], 2);
    assert_eq!(status["segment_count"], 2);

    // Transcript is served oldest first
    let transcript: Value = client
        .get(format!("{}/session/transcript", base))
        .send()
        .await?
        .json()
        .await?;
    let segments = transcript.as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["id"], 0);
    assert_eq!(segments[0]["text"], "hello");
    assert_eq!(segments[1]["text"], "world");

    // Grouping works on the stopped session
    let groups: Value = client
        .get(format!("{}/session/groups?window_minutes=5", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(groups["window_minutes"], 5);
    assert_eq!(groups["failed_batches"], 0);
    let windows = groups["windows"].as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["segments"].as_array().unwrap().len(), 2);
    assert_eq!(windows[0]["summary"], "recap 0-1");

    // Reset wipes everything and returns to idle
    let response = client.post(format!("{}/session/reset", base)).send().await?;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await?;
    assert_eq!(status["state"], "idle");
    assert_eq!(status["segment_count"], 0);

    let transcript: Value = client
        .get(format!("{}/session/transcript", base))
        .send()
        .await?
        .json()
        .await?;
    assert!(transcript.as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_double_start_returns_conflict() -> Result<()> {
    let factory = MockBackendFactory::new()
        .with_backend(MockAudioBackend::new().hold_open());
    let base = spawn_service(factory, MockTranscription::new()).await?;
    let client = reqwest::Client::new();

    client.post(format!("{}/session/start", base)).send().await?;
    let response = client.post(format!("{}/session/start", base)).send().await?;

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "A recording session is already active");

    Ok(())
}

#[tokio::test]
async fn test_stop_without_session_returns_conflict() -> Result<()> {
    let base = spawn_service(MockBackendFactory::new(), MockTranscription::new()).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/session/stop", base))
        .send()
        .await?;

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "No recording session is active");

    Ok(())
}

#[tokio::test]
async fn test_hard_stop_over_http_discards_partial_audio() -> Result<()> {
    // Setup: half a chunk buffered, source held open
    let factory = MockBackendFactory::new().with_backend(
        MockAudioBackend::new()
            .with_frames(vec![AudioFrame {
                samples: vec![0i16; 8_000],
                sample_rate: 16_000,
                channels: 1,
            }])
            .hold_open(),
    );
    let transcription = MockTranscription::new().with_text("never stored");
    let base = spawn_service(factory, transcription).await?;
    let client = reqwest::Client::new();

    client.post(format!("{}/session/start", base)).send().await?;
    let response = client
        .post(format!("{}/session/stop", base))
        .json(&serde_json::json!({ "hard": true }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await?;
    assert_eq!(status["state"], "stopped");

    // Give the detached loop time to observe the abandon flag
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    let transcript: Value = client
        .get(format!("{}/session/transcript", base))
        .send()
        .await?
        .json()
        .await?;
    assert!(transcript.as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_window_width_returns_bad_request() -> Result<()> {
    let base = spawn_service(MockBackendFactory::new(), MockTranscription::new()).await?;

    let response = reqwest::get(format!("{}/session/groups?window_minutes=45", base)).await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(
        body["error"],
        "Invalid window width: 45 minutes (must be 1-30)"
    );

    Ok(())
}

#[tokio::test]
async fn test_groups_uses_configured_width_when_query_omitted() -> Result<()> {
    let base = spawn_service(MockBackendFactory::new(), MockTranscription::new()).await?;

    let groups: Value = reqwest::get(format!("{}/session/groups", base))
        .await?
        .json()
        .await?;

    assert_eq!(groups["window_minutes"], 5);
    assert!(groups["windows"].as_array().unwrap().is_empty());

    Ok(())
}
