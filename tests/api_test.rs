use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;
use transcription_client::{
    paginate, ApiClient, ApiError, Config, LoginRedirect, OutputFormat, PreviewFormat, Session,
    TaskListParams, TranscriptionRequest, UserListParams,
};

/// Counts how often the client asked for a new login.
#[derive(Default)]
struct CountingRedirect(AtomicUsize);

impl CountingRedirect {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for CountingRedirect {
    fn redirect_to_login(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn task_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "original_filename": format!("recording-{}.mp3", id),
        "file_size": 2048,
        "output_format": "txt",
        "status": status,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

fn ok(data: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": "", "data": data }))
}

fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

async fn list_tasks(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: u32 = query.get("page_size").and_then(|p| p.parse().ok()).unwrap_or(20);

    let all: Vec<serde_json::Value> = (1..=45).map(|id| task_json(id, "completed")).collect();
    let tasks = paginate(&all, page, page_size).to_vec();
    ok(json!({ "tasks": tasks, "total": all.len(), "page": page, "page_size": page_size }))
}

async fn create_task(body: web::Bytes) -> HttpResponse {
    let body = String::from_utf8_lossy(&body);
    let expected = [
        r#"name="file"; filename="talk.mp3""#,
        r#"name="language""#,
        r#"name="output_format""#,
        "srt",
        "fake audio",
    ];
    if expected.iter().all(|part| body.contains(part)) {
        ok(task_json(7, "pending"))
    } else {
        HttpResponse::BadRequest().json(json!({ "success": false, "message": "bad upload" }))
    }
}

async fn get_task(req: HttpRequest, path: web::Path<i64>) -> HttpResponse {
    match bearer(&req).as_deref() {
        Some("fresh") => ok(task_json(path.into_inner(), "processing")),
        _ => HttpResponse::Unauthorized().json(json!({ "success": false, "message": "expired" })),
    }
}

async fn preview(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    match query.get("format").map(String::as_str) {
        Some("json") => HttpResponse::Ok().json(json!({ "segments": [{ "text": "hi" }] })),
        _ => ok(json!({ "text": "hello world" })),
    }
}

async fn login(body: web::Json<serde_json::Value>) -> HttpResponse {
    if body["password"] == "secret" {
        ok(json!({ "access_token": "fresh" }))
    } else {
        HttpResponse::Ok().json(json!({ "success": false, "message": "wrong password" }))
    }
}

async fn topup() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": false, "message": "invalid code", "code": "INVALID" }))
}

async fn engines() -> HttpResponse {
    ok(serde_json::Value::Null)
}

async fn users() -> HttpResponse {
    ok(json!({ "tasks": null, "total": 0, "page": 1, "page_size": 20 }))
}

async fn languages() -> HttpResponse {
    ok(json!({ "zh": "Chinese", "en": "English" }))
}

async fn formats() -> HttpResponse {
    ok(json!({ "audio": ["mp3", "wav"], "video": ["mp4"], "all": ["mp3", "wav", "mp4"] }))
}

async fn test_engine(path: web::Path<i64>) -> HttpResponse {
    match path.into_inner() {
        1 => HttpResponse::Ok().json(json!({
            "success": false,
            "message": "engine test failed: connection refused",
            "data": {
                "status": "failed",
                "error": "connection refused",
                "test_time": 1729000000,
                "auto_disabled": true
            }
        })),
        _ => ok(json!({ "status": "success", "test_time": 1729000100 })),
    }
}

async fn download(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    let format = query.get("format").map(String::as_str).unwrap_or("json");
    HttpResponse::Ok().body(format!("FORMAT={}", format))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/user/login", web::post().to(login))
            .route("/user/topup", web::post().to(topup))
            .route("/user/self/transcription/tasks", web::get().to(list_tasks))
            .route("/user/self/transcription/tasks", web::post().to(create_task))
            .route("/user/self/transcription/tasks/{id}", web::get().to(get_task))
            .route("/user/self/transcription/tasks/{id}/preview", web::get().to(preview))
            .route("/user/self/transcription/tasks/{id}/download", web::get().to(download))
            .route("/transcription/engines", web::get().to(engines))
            .route("/transcription/engines/{id}/test", web::post().to(test_engine))
            .route("/transcription/languages", web::get().to(languages))
            .route("/transcription/formats", web::get().to(formats))
            .route("/users", web::get().to(users)),
    );
}

fn spawn_backend() -> String {
    let server = HttpServer::new(|| App::new().configure(routes))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}/api", addr)
}

fn client_with(session: Session) -> (ApiClient, Arc<CountingRedirect>) {
    let redirect = Arc::new(CountingRedirect::default());
    let client = ApiClient::new(Config::with_url(spawn_backend()), Arc::new(session))
        .unwrap()
        .with_redirect(redirect.clone());
    (client, redirect)
}

#[actix_web::test]
async fn test_unauthorized_clears_session_and_redirects_once() {
    let (client, redirect) = client_with(Session::with_token("stale"));

    let (first, second) = tokio::join!(client.get_task(1), client.get_task(2));
    assert!(first.is_err());
    assert!(second.is_err());
    assert!(client.get_task(3).await.is_err());

    assert_eq!(redirect.count(), 1);
    assert!(client.session().token().is_none());

    let err = first.unwrap_err();
    let api_error = err.downcast_ref::<ApiError>().unwrap();
    assert!(api_error.is_unauthorized());
}

#[actix_web::test]
async fn test_login_stores_token_and_rearms_redirect() {
    let (client, redirect) = client_with(Session::in_memory());

    assert!(client.get_task(1).await.is_err());
    assert_eq!(redirect.count(), 1);

    assert!(client.login("alice", "secret").await.unwrap());
    assert_eq!(client.session().token().as_deref(), Some("fresh"));

    let task = client.get_task(5).await.unwrap();
    assert_eq!(task.id, 5);

    client.session().clear().unwrap();
    assert!(client.get_task(5).await.is_err());
    assert_eq!(redirect.count(), 2);
}

#[actix_web::test]
async fn test_rejected_login_surfaces_server_message() {
    let (client, _) = client_with(Session::in_memory());

    let err = client.login("alice", "nope").await.unwrap_err();
    assert!(format!("{:#}", err).contains("wrong password"));
    assert!(client.session().token().is_none());
}

#[actix_web::test]
async fn test_failed_envelope_keeps_message_and_code() {
    let (client, _) = client_with(Session::with_token("fresh"));

    let err = client.redeem_code("XXXX").await.unwrap_err();
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Rejected { message, code }) => {
            assert_eq!(message, "invalid code");
            assert_eq!(code.as_deref(), Some("INVALID"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.downcast_ref::<ApiError>().and_then(|e| e.code()), Some("INVALID"));
}

#[actix_web::test]
async fn test_second_page_of_tasks() {
    let (client, _) = client_with(Session::with_token("fresh"));

    let params = TaskListParams {
        page: Some(2),
        page_size: Some(20),
        ..Default::default()
    };
    let page = client.list_tasks(&params).await.unwrap();

    assert_eq!(page.items().len(), 20);
    assert_eq!(page.items()[0].id, 21);
    assert_eq!(page.total, 45);
    assert_eq!(page.total_pages(), 3);
}

#[actix_web::test]
async fn test_upload_sends_file_and_options() {
    let (client, _) = client_with(Session::with_token("fresh"));
    let dir = tempdir().unwrap();
    let file = dir.path().join("talk.mp3");
    std::fs::write(&file, "fake audio").unwrap();

    let mut request = TranscriptionRequest::new(&file);
    request.language = Some("en".to_string());
    request.output_format = Some(OutputFormat::Srt);

    let task = client.create_task(&request).await.unwrap();
    assert_eq!(task.id, 7);
}

#[actix_web::test]
async fn test_upload_rejects_unsupported_file_locally() {
    let (client, _) = client_with(Session::with_token("fresh"));
    let dir = tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "text").unwrap();

    let err = client
        .create_task(&TranscriptionRequest::new(&file))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[actix_web::test]
async fn test_preview_text_and_json() {
    let (client, _) = client_with(Session::with_token("fresh"));

    let text = client.preview_result(3, PreviewFormat::Text).await.unwrap();
    assert_eq!(text, "hello world");

    let raw = client.preview_result(3, PreviewFormat::Json).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["segments"][0]["text"], "hi");
}

#[actix_web::test]
async fn test_null_lists_decode_as_empty() {
    let (client, _) = client_with(Session::with_token("fresh"));

    assert!(client.list_engines().await.unwrap().is_empty());

    let users = client.list_users(&UserListParams::default()).await.unwrap();
    assert!(users.items().is_empty());
    assert_eq!(users.total_pages(), 1);
}

#[actix_web::test]
async fn test_language_and_format_maps() {
    let (client, _) = client_with(Session::in_memory());

    let languages = client.supported_languages().await.unwrap();
    let codes: Vec<&str> = languages.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["en", "zh"]);

    let formats = client.supported_formats().await.unwrap();
    let extensions: Vec<&str> = formats.iter().map(|f| f.extension.as_str()).collect();
    assert_eq!(extensions, vec!["mp3", "wav", "mp4"]);
}

#[actix_web::test]
async fn test_saved_result_uses_task_format() {
    let (client, _) = client_with(Session::with_token("fresh"));
    let dir = tempdir().unwrap();

    let task = client.get_task(9).await.unwrap();
    assert_eq!(task.output_format, OutputFormat::Txt);

    let path = client.save_result(&task, None, dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("recording-9.mp3.txt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "FORMAT=txt");

    let path = client.save_result(&task, Some("srt"), dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("recording-9.mp3.srt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "FORMAT=srt");
}

#[actix_web::test]
async fn test_engine_test_reports_auto_disable() {
    let (client, _) = client_with(Session::with_token("fresh"));

    let failed = client.test_engine(1).await.unwrap();
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error.as_deref(), Some("connection refused"));
    assert_eq!(failed.auto_disabled, Some(true));
    assert_eq!(failed.tested_at().unwrap().timestamp(), 1729000000);

    let passed = client.test_engine(2).await.unwrap();
    assert!(passed.error.is_none());
    assert_eq!(passed.test_time, 1729000100);
}

#[actix_web::test]
async fn test_upload_rejects_oversized_file_locally() {
    let mut config = Config::with_url(spawn_backend());
    config.max_upload_size = 4;
    let client = ApiClient::new(config, Arc::new(Session::with_token("fresh"))).unwrap();

    let dir = tempdir().unwrap();
    let file = dir.path().join("talk.mp3");
    std::fs::write(&file, "fake audio").unwrap();

    let err = client
        .create_task(&TranscriptionRequest::new(&file))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "File is too large (10 Bytes), the limit is 4 Bytes");
}
