//! Integration tests for the reqwest transport using wiremock.

use serde_json::json;
use std::sync::Arc;
use study_stream::{
    ApiError, GenerateFromTextParams, GenerateHandler, ParseEvent, StaticToken, StreamState,
    StudyClient, Usage,
};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> StudyClient {
    StudyClient::new(format!("{}/api", server.uri()))
        .with_credentials(Arc::new(StaticToken::new("tok")))
}

#[derive(Default)]
struct Recorder {
    chunks: Vec<String>,
    done: Option<(String, Option<Usage>)>,
    error: Option<ApiError>,
}

impl GenerateHandler for Recorder {
    fn on_chunk(&mut self, text: &str) {
        self.chunks.push(text.to_string());
    }

    fn on_done(&mut self, exercise_id: &str, usage: Option<Usage>) {
        self.done = Some((exercise_id.to_string(), usage));
    }

    fn on_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }
}

#[tokio::test]
async fn parse_stream_dispatches_events() {
    let server = MockServer::start().await;
    let body = "event: status\ndata: {\"docId\":\"d1\",\"status\":\"parsing\"}\n\n\
                event: progress\ndata: {\"stage\":\"summarize\"}\n\n\
                event: result\ndata: {\"docId\":\"d1\",\"status\":\"done\",\"parsed\":{\"course\":\"Physics\"}}\n\n";

    Mock::given(method("POST"))
        .and(path("/api/docs/d1/parse"))
        .and(header("accept", "text/event-stream"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = client(&server).start_parse("d1", tx, None);
    let state = session.subscribe();
    session.done().await.expect("parse succeeds");

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(*state.borrow(), StreamState::Closed);
    assert_eq!(
        events,
        vec![
            ParseEvent::Status(json!({"docId": "d1", "status": "parsing"})),
            ParseEvent::Progress(json!({"stage": "summarize"})),
            ParseEvent::Result(json!({"docId": "d1", "status": "done", "parsed": {"course": "Physics"}})),
            ParseEvent::Closed,
        ]
    );
}

#[tokio::test]
async fn parse_stream_rejects_on_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/docs/missing/parse"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let err = client(&server)
        .start_parse("missing", tx, None)
        .done()
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(rx.recv().await, Some(ParseEvent::Closed));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn generate_streams_text_and_control_tail() {
    let server = MockServer::start().await;
    let body = "1. Which force keeps planets in orbit?\nA) Gravity\n\
                {\"exerciseId\":\"ex42\",\"usage\":{\"inputTokens\":120,\"outputTokens\":80,\"totalTokens\":200}}\n";

    Mock::given(method("POST"))
        .and(path("/api/exercises/generate-from-text"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({
            "content": "Newton's laws",
            "title": "Mechanics",
            "questionType": "single_choice",
            "difficulty": "easy",
            "count": 1,
            "keyPoints": ["gravity"],
            "analysis": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let params = GenerateFromTextParams::new("Newton's laws", "single_choice", "easy", 1)
        .with_title("Mechanics")
        .with_key_points(vec!["gravity".to_string()]);
    let mut recorder = Recorder::default();
    client(&server).generate_from_text(&params, &mut recorder).await;

    assert!(recorder.error.is_none());
    assert_eq!(recorder.chunks.concat(), body);
    assert_eq!(
        recorder.done,
        Some(("ex42".to_string(), Some(Usage::new(120, 80, 200))))
    );
}

#[tokio::test]
async fn generate_reports_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/exercises/generate-from-text"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "quota exceeded"})),
        )
        .mount(&server)
        .await;

    let params = GenerateFromTextParams::new("text", "true_false", "hard", 3);
    let mut recorder = Recorder::default();
    client(&server).generate_from_text(&params, &mut recorder).await;

    let error = recorder.error.expect("error reported");
    assert_eq!(error.to_string(), "quota exceeded");
    assert_eq!(error.status(), Some(429));
    assert!(recorder.chunks.is_empty());
    assert!(recorder.done.is_none());
}

#[tokio::test]
async fn generate_reports_connection_failure() {
    // Port 1 is reserved and nothing listens there
    let uri = "http://127.0.0.1:1/api";

    let client = StudyClient::new(uri);
    let mut recorder = Recorder::default();
    client
        .generate_from_text(
            &GenerateFromTextParams::new("text", "fill_blank", "easy", 1),
            &mut recorder,
        )
        .await;

    assert!(matches!(recorder.error, Some(ApiError::Http(_))));
    assert!(recorder.done.is_none());
}
