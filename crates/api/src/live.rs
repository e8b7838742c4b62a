use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use threadline_realtime::bus::Subscription;
use tokio::sync::oneshot;

use crate::{ApiError, ApiState};

/// Streams comments created on a post as JSON text frames.
///
/// The listener is registered before the upgrade completes, so every comment
/// created after the handshake reaches the client. It is removed once the
/// socket closes.
pub(crate) async fn live_comments(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
    ws: WebSocketUpgrade,
) -> Response {
    let post_id = match path {
        Ok(Path(post_id)) => post_id,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    let (closed, on_closed) = oneshot::channel::<()>();
    let subscription = match state
        .comments
        .subscribe(post_id, async move {
            let _ = on_closed.await;
        })
        .await
    {
        Ok(subscription) => subscription,
        Err(error) => return ApiError::from(error).into_response(),
    };

    ws.on_upgrade(move |socket| serve_live(socket, subscription, closed))
        .into_response()
}

async fn serve_live(socket: WebSocket, mut subscription: Subscription, closed: oneshot::Sender<()>) {
    let post_id = subscription.post_id();
    tracing::debug!(post_id, "live comment feed opened");
    let (mut sink, mut incoming) = socket.split();

    loop {
        tokio::select! {
            comment = subscription.next() => {
                let Some(comment) = comment else {
                    break;
                };
                let text = match serde_json::to_string(&comment) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(post_id, error = %error, "failed to encode comment");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = closed.send(());
    tracing::debug!(post_id, "live comment feed closed");
}
