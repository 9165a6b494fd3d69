//! TCP listener for the line protocol.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use flowwatch_core::CoreError;
use flowwatch_types::FeedStatus;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{App, TCP_FEED};
use crate::protocol::{camera_source, offer_body, Request, Response, TOPICS};

/// Lines queued for one connection before writers wait.
const OUTBOUND_CAPACITY: usize = 256;

/// Accept connections until the task is cancelled.
pub async fn serve(listener: TcpListener, app: Arc<App>) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "line protocol listening");
    app.feeds.set_status(TCP_FEED, FeedStatus::Active);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let app = app.clone();
        tokio::spawn(async move {
            debug!(%peer, "connection opened");
            match handle_connection(stream, app).await {
                Ok(()) => debug!(%peer, "connection closed"),
                Err(e) => debug!(%peer, error = %e, "connection closed with error"),
            }
        });
    }
}

/// Serve one connection: one response line per request line, plus broadcast
/// lines for every subscribed topic.
pub async fn handle_connection<S>(stream: S, app: Arc<App>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    let mut subscribed = BTreeSet::new();
    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    let mut result = Ok(());

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                result = Err(e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<Request>(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request");
                if send(&tx, &Response::error(format!("invalid request: {e}")))
                    .await
                    .is_err()
                {
                    break;
                }
                continue;
            }
        };

        if let Request::Subscribe { topic } = request {
            if !TOPICS.contains(&topic.as_str()) {
                if send(&tx, &Response::error(format!("unknown topic: {topic}")))
                    .await
                    .is_err()
                {
                    break;
                }
                continue;
            }
            if !subscribed.insert(topic.clone()) {
                if send(&tx, &Response::empty()).await.is_err() {
                    break;
                }
                continue;
            }

            let mut subscription = app.broadcaster.subscribe(&topic);
            if send(&tx, &Response::empty()).await.is_err() {
                break;
            }
            let out = tx.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(message) = subscription.recv().await {
                    let Ok(line) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if out.send(line).await.is_err() {
                        break;
                    }
                }
            }));
            debug!(%topic, "connection subscribed");
            continue;
        }

        let response = handle_request(&app, request).await;
        if send(&tx, &response).await.is_err() {
            break;
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
    drop(tx);
    match writer_task.await {
        Ok(Err(e)) if result.is_ok() => result = Err(e),
        _ => {}
    }
    result
}

/// Execute a single request against the engine.
///
/// `subscribe` needs a connection to deliver to and is answered with an
/// error here.
pub async fn handle_request(app: &App, request: Request) -> Response {
    match request {
        Request::KpiEvent(payload) => respond(app.kpi.apply_payload(&payload)),
        Request::Environment(payload) => respond(app.environment.apply(&payload)),
        Request::EventlogAppend(input) => respond(app.event_log.append(input)),
        Request::CameraOffer { camera, body } => camera_offer(app, &camera, &body).await,
        Request::KpiSummary => respond(app.kpi.snapshot_summary()),
        Request::EnvironmentCurrent => Response::ok(app.environment.current()),
        Request::EventlogSearch(query) => {
            respond(app.event_log.search(&query.filter(), query.page, query.size))
        }
        Request::SystemStatus => Response::ok(app.status.get_status()),
        Request::FeedStatus => Response::ok(app.feeds.snapshot()),
        Request::Subscribe { .. } => Response::error("subscribe requires a connection"),
    }
}

async fn camera_offer(app: &App, camera: &str, body: &serde_json::Value) -> Response {
    let Some(source) = camera_source(camera) else {
        return Response::error(format!("unknown camera: {camera}"));
    };

    match app.cameras.forward(source, offer_body(body)).await {
        Ok(answer) => {
            let data = serde_json::json!({ "status": answer.status, "body": answer.body });
            if answer.is_success() {
                Response::ok(data)
            } else {
                Response {
                    ok: false,
                    data: Some(data),
                    error: Some(format!("device answered {}", answer.status)),
                }
            }
        }
        Err(e) => Response::error(format!("camera call failed: {e}")),
    }
}

fn respond<T: Serialize>(result: Result<T, CoreError>) -> Response {
    match result {
        Ok(value) => Response::ok(value),
        Err(e) => Response::error(e.to_string()),
    }
}

async fn send(tx: &mpsc::Sender<String>, response: &Response) -> Result<(), ()> {
    let line = serde_json::to_string(response).map_err(|_| ())?;
    tx.send(line).await.map_err(|_| ())
}
