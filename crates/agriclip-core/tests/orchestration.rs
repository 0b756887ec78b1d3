//! End-to-end tests of the controller against a mocked AgriClip backend.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agriclip_core::{
    AssistantController, ClassificationResult, CoreConfig, CoreError, CoreEvent, Domain,
    PollPolicy, Role, UploadContext, UploadFile,
};

fn fast_policy(max_attempts: Option<u32>) -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_millis(10),
        interval: Duration::from_millis(10),
        max_attempts,
    }
}

fn controller(server: &MockServer) -> (AssistantController, UnboundedReceiver<CoreEvent>) {
    let mut config = CoreConfig::new(server.uri());
    config.chat_poll = fast_policy(Some(12));
    config.classify_poll = fast_policy(None);
    let (controller, rx) = AssistantController::new(config);
    controller.set_auth_token("test-token");
    (controller, rx)
}

fn image() -> UploadFile {
    UploadFile {
        name: "cow.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        bytes: vec![0u8; 2048],
    }
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn ack() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/upload/image"))
        .respond_with(ok(json!({ "uploadId": "u1", "filename": "cow-123.jpg" })))
        .mount(server)
        .await;
}

async fn mount_send_message(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/chat/message"))
        .respond_with(ok(json!({ "sessionId": "s1" })))
        .mount(server)
        .await;
}

async fn mount_classify_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/model/classify"))
        .respond_with(ack())
        .mount(server)
        .await;
}

fn wire_assistant(id: &str, text: &str) -> Value {
    json!({
        "_id": id,
        "messageType": "ai",
        "content": { "text": text, "attachments": [] },
        "createdAt": "2025-03-01T10:00:00Z",
    })
}

fn drain(rx: &mut UnboundedReceiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn upload_and_await_domain(controller: &AssistantController) {
    controller
        .upload(image(), UploadContext::CropAnalysis)
        .await
        .unwrap();
    assert!(controller.is_awaiting_domain());
}

#[tokio::test]
async fn test_upload_classify_completed_replaces_placeholder() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;
    mount_classify_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ok(json!({ "status": "processing" })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ok(json!({
            "status": "completed",
            "classification": {
                "diseaseDetected": true,
                "diseaseName": "Mastitis",
                "confidence": 82.0,
                "recommendations": ["Isolate the animal", "Consult a veterinarian"],
            },
            "report": "Likely Mastitis (82% confidence). Isolate the animal and consult a veterinarian.",
        })))
        .mount(&server)
        .await;

    let (controller, mut rx) = controller(&server);
    let record = controller
        .upload(image(), UploadContext::CropAnalysis)
        .await
        .unwrap();
    assert_eq!(record.upload_id, "u1");
    assert_eq!(record.url, "/uploads/cow-123.jpg");
    assert!(controller.is_awaiting_domain());

    controller.classify(Domain::Livestock).await.unwrap();
    assert!(!controller.is_awaiting_domain());

    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].role, Role::User);
    assert_eq!(snapshot[0].attachments[0].url, "/uploads/cow-123.jpg");
    assert!(snapshot[1].text.contains("Analyzing your livestock image"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2, "terminal update must replace, not append");
    assert!(snapshot[1].text.contains("Likely Mastitis"));
    assert_eq!(snapshot[1].domain, Some(Domain::Livestock));
    match snapshot[1].classification.as_ref().unwrap() {
        ClassificationResult::Livestock {
            disease_name,
            confidence,
            ..
        } => {
            assert_eq!(disease_name, "Mastitis");
            assert_eq!(*confidence, 82.0);
        }
        other => panic!("expected a livestock result, got {other:?}"),
    }

    let events = drain(&mut rx);
    assert!(events.contains(&CoreEvent::UploadProgress(100)));
    assert!(events.contains(&CoreEvent::AwaitingDomainChoice {
        upload_id: "u1".to_string()
    }));
}

#[tokio::test]
async fn test_failed_classification_surfaces_error_entry() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;
    mount_classify_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ok(json!({ "status": "failed", "error": "image too blurry" })))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    upload_and_await_domain(&controller).await;
    controller.classify(Domain::Plant).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[1].text.contains("Analysis failed: image too blurry"));
    assert!(snapshot[1].classification.is_none());
}

#[tokio::test]
async fn test_status_poll_error_is_terminal() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;
    mount_classify_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    upload_and_await_domain(&controller).await;
    controller.classify(Domain::Fish).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = controller.log_snapshot();
    assert!(snapshot[1].text.contains("Analysis error"));

    // The poller gave up on the first failure; no retries afterwards.
    let polls_so_far = status_poll_count(&server).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(status_poll_count(&server).await, polls_so_far);
}

async fn status_poll_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path().ends_with("/status"))
        .count()
}

#[tokio::test]
async fn test_unauthorized_status_poll_stops_without_error_entry() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;
    mount_classify_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (controller, mut rx) = controller(&server);
    upload_and_await_domain(&controller).await;
    controller.classify(Domain::Plant).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain(&mut rx).contains(&CoreEvent::LoggedOut));

    // The placeholder stays; no "Analysis error" entry is written.
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[1].text.contains("Analyzing your crop image"));

    // And the loop stopped after the unauthorized poll.
    assert_eq!(status_poll_count(&server).await, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(status_poll_count(&server).await, 1);
}

#[tokio::test]
async fn test_classification_polling_is_unbounded_until_cancelled() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;
    mount_classify_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model/classify/u1/status"))
        .respond_with(ok(json!({ "status": "processing" })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/session/s1"))
        .respond_with(ack())
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    upload_and_await_domain(&controller).await;
    controller.classify(Domain::Plant).await.unwrap();

    // Far past the chat poller's 12-attempt budget; this loop has none.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(status_poll_count(&server).await > 12);

    controller.clear_chat().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_cancel = status_poll_count(&server).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(status_poll_count(&server).await, after_cancel);

    // The conversation was reset, so the placeholder is gone for good.
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].text.contains("Chat cleared"));
}

#[tokio::test]
async fn test_assistant_reply_appended_once_and_stale_ids_skipped() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .respond_with(ok(json!({
            "messages": [wire_assistant("a1", "Yellow leaves usually mean nitrogen deficiency.")],
        })))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .respond_with(ok(json!({
            "messages": [
                wire_assistant("a1", "Yellow leaves usually mean nitrogen deficiency."),
                wire_assistant("a2", "Compost or a balanced NPK fertilizer both work."),
            ],
        })))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    controller
        .send_text("why are my tomato leaves yellow?")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].id, "a1");

    // The second exchange sees a1 again in the history. It is already in
    // the log, so the poller keeps waiting until a2 shows up.
    controller.send_text("what should I feed them?").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = controller.log_snapshot();
    let ids: Vec<&str> = snapshot.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(snapshot.len(), 4);
    assert_eq!(ids.iter().filter(|id| **id == "a1").count(), 1);
    assert_eq!(snapshot[3].id, "a2");
}

#[tokio::test]
async fn test_chat_poll_budget_exhaustion_is_silent() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .respond_with(ok(json!({ "messages": [] })))
        .mount(&server)
        .await;

    let mut config = CoreConfig::new(server.uri());
    config.chat_poll = fast_policy(Some(3));
    let (controller, mut rx) = AssistantController::new(config);
    controller.set_auth_token("test-token");

    controller.send_text("anyone there?").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // No error entry; just the user's own message.
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].role, Role::User);

    let typing: Vec<bool> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            CoreEvent::Typing(on) => Some(on),
            _ => None,
        })
        .collect();
    assert_eq!(typing, vec![true, false]);

    let history_polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path().starts_with("/api/chat/history"))
        .count();
    assert_eq!(history_polls, 3);
}

#[tokio::test]
async fn test_unauthorized_upload_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/image"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (controller, mut rx) = controller(&server);
    let err = controller
        .upload(image(), UploadContext::CropAnalysis)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AuthExpired));
    assert!(drain(&mut rx).contains(&CoreEvent::LoggedOut));

    // The token is gone, so the next call fails before reaching the wire.
    let requests_before = server.received_requests().await.unwrap().len();
    let err = controller.send_text("hello?").await.unwrap_err();
    assert!(matches!(err, CoreError::AuthExpired));
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
}

#[tokio::test]
async fn test_session_id_adopted_once_and_reused() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .respond_with(ok(json!({
            "messages": [wire_assistant("a1", "Hello!")],
        })))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    assert!(controller.session_id().is_none());
    controller.send_text("first").await.unwrap();
    assert_eq!(controller.session_id().as_deref(), Some("s1"));
    tokio::time::sleep(Duration::from_millis(40)).await;
    controller.send_text("second").await.unwrap();

    let bodies: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/api/chat/message")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].get("sessionId").is_none());
    assert_eq!(bodies[1]["sessionId"], "s1");
    assert_eq!(bodies[1]["messageType"], "user");
}

#[tokio::test]
async fn test_second_upload_rejected_while_domain_choice_pending() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_send_message(&server).await;

    let (controller, _rx) = controller(&server);
    upload_and_await_domain(&controller).await;
    let requests_before = server.received_requests().await.unwrap().len();

    let err = controller
        .upload(image(), UploadContext::CropAnalysis)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ClassificationPending));
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);

    // Cancelling frees the slot for a fresh upload.
    controller.cancel_domain_selection();
    assert!(!controller.is_awaiting_domain());
    controller
        .upload(image(), UploadContext::ChatAttachment)
        .await
        .unwrap();
    assert!(controller.is_awaiting_domain());
}

#[tokio::test]
async fn test_invalid_uploads_fail_before_any_request() {
    let server = MockServer::start().await;
    let (controller, _rx) = controller(&server);

    let mut pdf = image();
    pdf.mime_type = "application/pdf".to_string();
    let err = controller
        .upload(pdf, UploadContext::CropAnalysis)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    let mut huge = image();
    huge.bytes = vec![0u8; 11 * 1024 * 1024];
    let err = controller
        .upload(huge, UploadContext::CropAnalysis)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    let err = controller.send_text("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_loads_latest_session_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ok(json!({ "sessions": [{ "_id": "s9" }, { "_id": "s3" }] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s9"))
        .respond_with(ok(json!({
            "messages": [
                {
                    "_id": "m1",
                    "messageType": "user",
                    "content": { "text": "my cow is limping", "attachments": [] },
                    "createdAt": "2025-03-01T09:00:00Z",
                },
                wire_assistant("m2", "Can you upload a photo of the hoof?"),
            ],
        })))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    controller.resume_latest_session().await.unwrap();

    assert_eq!(controller.session_id().as_deref(), Some("s9"));
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].role, Role::User);
    assert_eq!(snapshot[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_resume_without_sessions_seeds_welcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ok(json!({ "sessions": [] })))
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    controller.resume_latest_session().await.unwrap();

    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].text.contains("AgriClip AI assistant"));
    assert!(controller.session_id().is_none());
}

#[tokio::test]
async fn test_resume_swallows_transport_errors_and_seeds_welcome() {
    // No mocks mounted at all: wiremock answers 404, which surfaces as a
    // server rejection and falls back to a fresh conversation.
    let server = MockServer::start().await;
    let (controller, _rx) = controller(&server);

    controller.resume_latest_session().await.unwrap();
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].text.contains("AgriClip AI assistant"));
}

#[tokio::test]
async fn test_clear_chat_deletes_session_and_resets_log() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .respond_with(ok(json!({ "messages": [wire_assistant("a1", "Hi!")] })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/session/s1"))
        .respond_with(ack())
        .expect(1)
        .mount(&server)
        .await;

    let (controller, _rx) = controller(&server);
    controller.send_text("hello").await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(controller.log_snapshot().len(), 2);

    controller.clear_chat().await.unwrap();
    assert!(controller.session_id().is_none());
    let snapshot = controller.log_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].text.contains("Chat cleared"));

    // The token survives a clear; a new conversation can start right away.
    controller.send_text("fresh start").await.unwrap();
    assert_eq!(controller.session_id().as_deref(), Some("s1"));
}
