use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use log::*;
use realtime::message::{KEEPALIVE_PING, KEEPALIVE_PONG};
use tokio::sync::mpsc;

/// WebSocket handler that establishes the long-lived live channel.
/// One connection per authenticated user; a second handshake for the same
/// user takes over and the registry closes the first.
///
/// The `AuthenticatedUser` extractor runs before the upgrade completes, so
/// an anonymous handshake is rejected with 401 and never becomes a socket.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    debug!("Establishing WebSocket connection for user {}", user.id);

    ws.on_upgrade(move |socket| handle_socket(socket, user.id, app_state))
}

async fn handle_socket(socket: WebSocket, user_id: domain::Id, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let pong_tx = tx.clone();

    let recipient_id = user_id.to_string();
    let connection_id = app_state
        .realtime_manager
        .register_connection(recipient_id.clone(), tx);

    // Outbound: everything the registry queues, including its close frames.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Inbound: keepalive probes and the client's close. Domain actions
    // arrive over HTTP, so any other inbound frame is ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if text == KEEPALIVE_PING {
                        let _ = pong_tx.send(Message::Text(KEEPALIVE_PONG.to_string()));
                    } else {
                        debug!("Ignoring inbound text frame ({} bytes)", text.len());
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!("WebSocket connection closed for user {user_id}, cleaning up");
    app_state
        .realtime_manager
        .unregister_connection(&recipient_id, &connection_id);
}
