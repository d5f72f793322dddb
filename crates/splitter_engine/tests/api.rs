use std::time::Duration;

use pretty_assertions::assert_eq;
use splitter_engine::{
    ApiSettings, FailureKind, MetricReading, ReqwestApi, SeparationApi, WireStatus,
};
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api", server.uri()),
        ..ApiSettings::default()
    })
    .expect("valid base url")
}

#[tokio::test]
async fn upload_sends_multipart_file_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "0f8e2c1a-1111",
            "filename": "song.mp3",
            "status": "uploaded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("song.mp3");
    std::fs::write(&file, b"ID3fake-audio").unwrap();

    let receipt = client_for(&server)
        .upload(&file, "song.mp3")
        .await
        .expect("upload ok");
    assert_eq!(receipt.job_id, "0f8e2c1a-1111");
    assert_eq!(receipt.filename.as_deref(), Some("song.mp3"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"song.mp3\""));
    assert!(body.contains("ID3fake-audio"));
}

#[tokio::test]
async fn upload_of_missing_file_fails_before_any_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let err = client_for(&server)
        .upload(&dir.path().join("gone.wav"), "gone.wav")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Io);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn api_error_field_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/separate/abc"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "Job already processed or in progress"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).start_separation("abc").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.to_string(), "Job already processed or in progress");
}

#[tokio::test]
async fn separation_ack_accepts_any_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/separate/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .start_separation("abc")
        .await
        .expect("ack");
}

#[tokio::test]
async fn status_decodes_completed_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "abc",
            "status": "completed",
            "progress": 1.0,
            "filename": "song.mp3",
            "stems": {"vocals": "/out/abc/vocals.wav", "bass": "/out/abc/bass.wav"},
            "quality_metrics": {"Signal-to-Noise Ratio": 12.3456},
            "error": ""
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).status("abc").await.expect("status");
    assert_eq!(status.status, WireStatus::Completed);
    assert_eq!(status.progress, 1.0);
    assert_eq!(status.stems.len(), 2);
    assert_eq!(
        status.quality_metrics["Signal-to-Noise Ratio"],
        MetricReading::Number(12.3456)
    );
    assert_eq!(status.error.as_deref(), Some(""));
}

#[tokio::test]
async fn status_flattens_per_stem_metric_objects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "progress": 1.0,
            "stems": {"vocals": "/out/j1/vocals.wav"},
            "quality_metrics": {
                "vocals": {
                    "energy_ratio": 0.4,
                    "spectral_centroid": 1820.25,
                    "rms_energy": 0.05
                },
                "bleed": "minimal"
            }
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).status("j1").await.expect("status");
    assert_eq!(status.status, WireStatus::Completed);
    let names: Vec<&str> = status.quality_metrics.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "bleed",
            "vocals.energy_ratio",
            "vocals.rms_energy",
            "vocals.spectral_centroid"
        ]
    );
    assert_eq!(
        status.quality_metrics["vocals.energy_ratio"],
        MetricReading::Number(0.4)
    );
    assert_eq!(
        status.quality_metrics["bleed"],
        MetricReading::Text("minimal".to_string())
    );
}

#[tokio::test]
async fn status_tolerates_minimal_and_unknown_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "queued", "progress": 0.0})),
        )
        .mount(&server)
        .await;

    let status = client_for(&server).status("abc").await.expect("status");
    assert_eq!(status.status, WireStatus::Unknown);
    assert!(status.stems.is_empty());
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).status("abc").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn jobs_listing_keeps_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobs": [
                {"job_id": "a", "filename": "one.mp3", "status": "completed", "progress": 1.0},
                {"job_id": "b", "filename": "", "status": "processing", "progress": 0.5},
                {"job_id": "c", "status": "uploaded", "progress": 0.0}
            ]
        })))
        .mount(&server)
        .await;

    let jobs = client_for(&server).jobs().await.expect("jobs");
    let ids: Vec<_> = jobs.iter().map(|job| job.job_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(jobs[2].filename, None);
    assert_eq!(jobs[1].status, WireStatus::Processing);
}

#[tokio::test]
async fn health_reports_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "healthy",
            "model_loaded": true,
            "device": "cpu"
        })))
        .mount(&server)
        .await;

    let health = client_for(&server).health().await.expect("health");
    assert_eq!(health.status, "healthy");
    assert_eq!(health.device, "cpu");
}

#[tokio::test]
async fn download_streams_stem_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/abc/vocals"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"RIFFdata".to_vec(), "audio/wav"))
        .mount(&server)
        .await;

    let audio = client_for(&server)
        .download("abc", "vocals")
        .await
        .expect("download");
    assert_eq!(&audio[..], b"RIFFdata");
}

#[tokio::test]
async fn download_of_unknown_stem_reports_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/abc/kazoo"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Stem not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).download("abc", "kazoo").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.message, "Stem not found");
}

#[tokio::test]
async fn configured_timeout_turns_hung_request_into_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({"status": "healthy", "device": "cpu"})),
        )
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api", server.uri()),
        request_timeout: Some(Duration::from_millis(50)),
        ..ApiSettings::default()
    })
    .unwrap();
    let err = api.health().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    // Nothing listens on a port whose listener was just closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let base = format!("http://127.0.0.1:{port}/api");

    let api = ReqwestApi::new(ApiSettings {
        base_url: base,
        ..ApiSettings::default()
    })
    .unwrap();
    let err = api.jobs().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
}
