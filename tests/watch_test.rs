use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use transcription_client::{
    interrupt_signal, ApiClient, Config, Session, TaskObserver, TaskStatus, TranscriptionTask,
};

const ZERO: AtomicUsize = AtomicUsize::new(0);
static POLLS: [AtomicUsize; 8] = [ZERO; 8];
static CANCELS: [AtomicUsize; 8] = [ZERO; 8];

fn polls(id: i64) -> usize {
    POLLS[id as usize].fetch_add(1, Ordering::SeqCst)
}

fn cancels(id: usize) -> usize {
    CANCELS[id].load(Ordering::SeqCst)
}

#[derive(Default)]
struct Recorder {
    seen: Vec<(TaskStatus, u8)>,
    finished: Option<TaskStatus>,
}

impl TaskObserver for Recorder {
    fn on_update(&mut self, task: &TranscriptionTask) {
        self.seen.push((task.status, task.progress));
    }

    fn on_finish(&mut self, task: &TranscriptionTask) {
        self.finished = Some(task.status);
    }
}

fn envelope(data: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": "", "data": data }))
}

fn task(id: i64, filename: &str, status: &str) -> serde_json::Value {
    json!({ "id": id, "original_filename": filename, "status": status })
}

async fn get_task(path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    let body = match id {
        1 => {
            let (status, progress) = match polls(id) {
                0 => ("processing", 40),
                _ => ("completed", 100),
            };
            let mut body = task(id, "standup.wav", status);
            body["progress"] = json!(progress);
            body["result_text"] = json!("done");
            body
        }
        2 => {
            let mut body = task(id, "broken.wav", "failed");
            body["error_code"] = json!("TRANSCRIPTION_FAILED");
            body
        }
        4 => match polls(id) {
            0 => task(id, "queued.wav", "pending"),
            _ => task(id, "queued.wav", "completed"),
        },
        _ => task(id, "queued.wav", "pending"),
    };
    envelope(body)
}

async fn cancel(path: web::Path<i64>) -> HttpResponse {
    CANCELS[path.into_inner() as usize].fetch_add(1, Ordering::SeqCst);
    envelope(serde_json::Value::Null)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/user/self/transcription/tasks")
            .route("/{id}", web::get().to(get_task))
            .route("/{id}/cancel", web::put().to(cancel)),
    );
}

fn client() -> ApiClient {
    let server = HttpServer::new(|| App::new().configure(routes))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    let mut config = Config::with_url(format!("http://{}/api", addr));
    config.poll_interval_secs = 1;
    ApiClient::new(config, Arc::new(Session::with_token("token"))).unwrap()
}

#[actix_web::test]
async fn test_watch_reaches_completed() {
    let client = client();
    let mut recorder = Recorder::default();

    let task = client
        .watch_task_until(1, &mut recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result_text.as_deref(), Some("done"));
    assert_eq!(
        recorder.seen,
        vec![(TaskStatus::Processing, 40), (TaskStatus::Completed, 100)]
    );
    assert_eq!(recorder.finished, Some(TaskStatus::Completed));
}

#[actix_web::test]
async fn test_watch_reports_failure_reason() {
    let client = client();
    let mut recorder = Recorder::default();

    let err = client
        .watch_task_until(2, &mut recorder, std::future::pending())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Transcription failed"));
    assert_eq!(recorder.finished, Some(TaskStatus::Failed));
}

#[actix_web::test]
async fn test_stopping_a_watch_cancels_the_task() {
    let client = client();
    let mut recorder = Recorder::default();

    let stop = tokio::time::sleep(std::time::Duration::from_millis(1500));
    let err = client
        .watch_task_until(3, &mut recorder, stop)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cancelled by user"));
    assert_eq!(cancels(3), 1);
    assert!(recorder.finished.is_none());
    assert!(recorder.seen.iter().all(|(status, _)| *status == TaskStatus::Pending));
}

#[actix_web::test]
async fn test_unavailable_interrupt_never_cancels() {
    let client = client();
    let mut recorder = Recorder::default();

    let stop = interrupt_signal(async {
        Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler"))
    });
    let task = client.watch_task_until(4, &mut recorder, stop).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(cancels(4), 0);
    assert_eq!(recorder.seen.len(), 2);
}
