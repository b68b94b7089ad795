use crate::observer::Observer;
use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use log::*;
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

pub const KEEPALIVE_PING: &str = "ping";
pub const KEEPALIVE_PONG: &str = "pong";

/// Close codes that end the session for good: normal closure, going away,
/// policy violation, and the application-reserved range from 4000 up
/// (takeover, server shutdown). Anything else abnormal gets a reconnect.
fn close_is_final(code: CloseCode) -> bool {
    let code: u16 = code.into();
    matches!(code, 1000 | 1001 | 1008) || code >= 4000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
    /// Terminal: the reconnect budget is spent. Only an explicit `connect`
    /// leaves this state.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed delay between reconnect attempts
    pub delay: Duration,
    /// Automatic attempts before giving up
    pub max_attempts: u32,
    /// Interval for the literal "ping" keepalive probe while open
    pub keepalive_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_attempts: 5,
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct Target {
    url: String,
    session_cookie: Option<String>,
}

enum CloseReason {
    /// Server said goodbye with a final code, or we disconnected ourselves.
    Final,
    /// Transport error or abnormal close; candidate for reconnection.
    Abnormal,
}

struct Inner {
    state: TransportState,
    observers: Vec<Arc<dyn Observer>>,
    attempts: u32,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reconnect_timer: Option<JoinHandle<()>>,
    target: Option<Target>,
    /// Bumped by every explicit connect/disconnect. Async tasks capture the
    /// generation they were spawned under and become no-ops once it moves
    /// on, which is what makes the cancellation invariants checkable.
    generation: u64,
}

/// Owns the single WebSocket connection of a client session: the state
/// machine over {Disconnected, Connecting, Open, Reconnecting, Failed},
/// the observer fan-out set, the keepalive probe, and the one outstanding
/// reconnect timer.
pub struct TransportManager {
    inner: Mutex<Inner>,
    config: ReconnectConfig,
    state_tx: watch::Sender<TransportState>,
    state_rx: watch::Receiver<TransportState>,
    // Handed to spawned connection/timer tasks; a dropped manager simply
    // stops producing new tasks.
    weak_self: Weak<TransportManager>,
}

impl TransportManager {
    pub fn new(config: ReconnectConfig) -> Arc<Self> {
        let (state_tx, state_rx) = watch::channel(TransportState::Disconnected);
        Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(Inner {
                state: TransportState::Disconnected,
                observers: Vec::new(),
                attempts: 0,
                outbound: None,
                reconnect_timer: None,
                target: None,
                generation: 0,
            }),
            config,
            state_tx,
            state_rx,
            weak_self: weak_self.clone(),
        })
    }

    pub fn state(&self) -> TransportState {
        *self.state_rx.borrow()
    }

    /// A watch channel mirroring every state transition, for callers that
    /// want to await a particular state instead of polling.
    pub fn state_changes(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    pub async fn wait_for_state(&self, target: TransportState, timeout: Duration) -> Result<()> {
        let mut rx = self.state_rx.clone();
        tokio::time::timeout(timeout, async move {
            loop {
                if *rx.borrow_and_update() == target {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .map_err(|_| anyhow!("timeout waiting for transport state {target:?}"))
    }

    /// Add an observer to the fan-out set. Idempotent: subscribing the same
    /// observer twice keeps a single entry.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        let mut inner = self.lock();
        if !inner.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            inner.observers.push(observer);
        }
    }

    /// Remove an observer; a no-op if it was never subscribed.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer>) {
        let mut inner = self.lock();
        inner.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Queue a text frame for the server. Only valid while Open; otherwise
    /// a logged no-op.
    pub fn send(&self, text: impl Into<String>) {
        let inner = self.lock();
        match (&inner.state, &inner.outbound) {
            (TransportState::Open, Some(outbound)) => {
                let _ = outbound.send(Message::Text(text.into()));
            }
            _ => warn!("send() while transport not open; dropping message"),
        }
    }

    /// Open the transport. Single-flight: calling while already Connecting
    /// or Open joins the in-flight attempt instead of opening a second
    /// transport (observe the shared outcome via `wait_for_state`). From
    /// Reconnecting or Failed this is the explicit fresh start that resets
    /// the attempt budget.
    pub fn connect(&self, url: impl Into<String>, session_cookie: Option<String>) {
        let generation = {
            let mut inner = self.lock();
            if matches!(
                inner.state,
                TransportState::Connecting | TransportState::Open
            ) {
                debug!("connect() while already {:?}; joining in-flight transport", inner.state);
                return;
            }
            if let Some(timer) = inner.reconnect_timer.take() {
                timer.abort();
            }
            inner.generation += 1;
            inner.attempts = 0;
            inner.target = Some(Target {
                url: url.into(),
                session_cookie,
            });
            self.set_state(&mut inner, TransportState::Connecting);
            inner.generation
        };

        self.spawn_attempt(generation);
    }

    /// Terminal, user-intentional exit: cancels any pending reconnect,
    /// closes the socket with a normal code, clears the observer set.
    /// Safe to call from any state.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(outbound) = inner.outbound.take() {
            let _ = outbound.send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            })));
        }
        inner.observers.clear();
        inner.attempts = 0;
        self.set_state(&mut inner, TransportState::Disconnected);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("transport state poisoned")
    }

    fn set_state(&self, inner: &mut Inner, state: TransportState) {
        if inner.state != state {
            trace!("transport state {:?} -> {state:?}", inner.state);
            inner.state = state;
            let _ = self.state_tx.send(state);
        }
    }

    fn spawn_attempt(&self, generation: u64) {
        let Some(manager) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            manager.run_connection(generation).await;
        });
    }

    async fn run_connection(self: Arc<Self>, generation: u64) {
        let target = match self.lock().target.clone() {
            Some(target) => target,
            None => return,
        };

        let request = match build_request(&target) {
            Ok(request) => request,
            Err(e) => {
                error!("Invalid WebSocket target {}: {e}", target.url);
                self.finish(generation, CloseReason::Abnormal);
                return;
            }
        };

        match connect_async(request).await {
            Ok((socket, _response)) => self.drive_socket(generation, socket).await,
            Err(e) => {
                warn!("WebSocket connect to {} failed: {e}", target.url);
                self.finish(generation, CloseReason::Abnormal);
            }
        }
    }

    async fn drive_socket<S>(
        &self,
        generation: u64,
        socket: tokio_tungstenite::WebSocketStream<S>,
    ) where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                // disconnect() or a newer connect() won the race; this
                // socket was never announced, so just drop it.
                return;
            }
            inner.outbound = Some(outbound_tx.clone());
            inner.attempts = 0;
            self.set_state(&mut inner, TransportState::Open);
        }

        let keepalive = spawn_keepalive(outbound_tx, self.config.keepalive_interval);

        let reason = loop {
            tokio::select! {
                outbound = outbound_rx.recv() => match outbound {
                    Some(message) => {
                        let closing = matches!(message, Message::Close(_));
                        if sink.send(message).await.is_err() {
                            break CloseReason::Abnormal;
                        }
                        if closing {
                            break CloseReason::Final;
                        }
                    }
                    // Sender side dropped by disconnect()
                    None => break CloseReason::Final,
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.fan_out(&text),
                    Some(Ok(Message::Close(frame))) => {
                        let is_final = frame
                            .as_ref()
                            .map(|f| close_is_final(f.code))
                            .unwrap_or(false);
                        if let Some(frame) = frame {
                            debug!(
                                "Server closed connection: code={:?} reason={}",
                                frame.code, frame.reason
                            );
                        }
                        break if is_final { CloseReason::Final } else { CloseReason::Abnormal };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket transport error: {e}");
                        break CloseReason::Abnormal;
                    }
                    None => break CloseReason::Abnormal,
                },
            }
        };

        keepalive.abort();
        self.finish(generation, reason);
    }

    /// Parse an inbound frame and deliver it to every observer in
    /// registration order. One faulty observer cannot block the others;
    /// its error is logged and dropped.
    fn fan_out(&self, text: &str) {
        if text == KEEPALIVE_PONG {
            return;
        }

        let payload: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Dropping non-JSON frame from server: {e}");
                return;
            }
        };

        let observers = self.lock().observers.clone();
        for observer in observers {
            if let Err(e) = observer.update(&payload) {
                warn!("Observer {} rejected payload: {e}", observer.name());
            }
        }
    }

    /// Common tail of every connection attempt: either the session is over
    /// (Final) or the bounded reconnect loop takes it from here.
    fn finish(&self, generation: u64, reason: CloseReason) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        inner.outbound = None;

        match reason {
            CloseReason::Final => {
                self.set_state(&mut inner, TransportState::Disconnected);
            }
            CloseReason::Abnormal => {
                if inner.attempts >= self.config.max_attempts {
                    warn!(
                        "Giving up after {} reconnect attempts; explicit connect required",
                        inner.attempts
                    );
                    inner.observers.clear();
                    self.set_state(&mut inner, TransportState::Failed);
                    return;
                }

                inner.attempts += 1;
                self.set_state(&mut inner, TransportState::Reconnecting);

                // Only one reconnect timer may be outstanding.
                if let Some(previous) = inner.reconnect_timer.take() {
                    previous.abort();
                }
                let Some(manager) = self.weak_self.upgrade() else {
                    return;
                };
                let delay = self.config.delay;
                inner.reconnect_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    manager.retry(generation);
                }));
            }
        }
    }

    fn retry(&self, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.generation != generation || inner.state != TransportState::Reconnecting {
                return;
            }
            self.set_state(&mut inner, TransportState::Connecting);
        }
        self.spawn_attempt(generation);
    }
}

fn build_request(
    target: &Target,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
    let mut request = target.url.as_str().into_client_request()?;
    if let Some(cookie) = &target.session_cookie {
        request
            .headers_mut()
            .insert("Cookie", HeaderValue::from_str(cookie)?);
    }
    Ok(request)
}

fn spawn_keepalive(
    outbound: mpsc::UnboundedSender<Message>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; the probe only needs to
        // fire after a full idle interval.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if outbound.send(Message::Text(KEEPALIVE_PING.to_string())).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{ChatObserver, NEW_CHAT_MESSAGE};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn quick_config() -> ReconnectConfig {
        ReconnectConfig {
            delay: Duration::from_millis(50),
            max_attempts: 2,
            keepalive_interval: Duration::from_secs(60),
        }
    }

    async fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn reconnect_attempts_are_bounded_and_failed_is_terminal() {
        let manager = TransportManager::new(quick_config());
        let observer = ChatObserver::new(|_| {});
        manager.subscribe(observer);

        // Nothing listens on this port; every attempt is refused.
        manager.connect("ws://127.0.0.1:9", None);
        manager
            .wait_for_state(TransportState::Failed, Duration::from_secs(5))
            .await
            .unwrap();

        // Terminal: no further attempts, observer set cleared.
        assert_eq!(manager.observer_count(), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.state(), TransportState::Failed);
    }

    #[tokio::test]
    async fn disconnect_is_safe_from_any_state_and_clears_observers() {
        let manager = TransportManager::new(quick_config());

        // From Disconnected: a no-op that stays Disconnected.
        manager.disconnect();
        assert_eq!(manager.state(), TransportState::Disconnected);

        // From Reconnecting: cancels the pending timer.
        manager.subscribe(ChatObserver::new(|_| {}));
        manager.connect("ws://127.0.0.1:9", None);
        manager
            .wait_for_state(TransportState::Reconnecting, Duration::from_secs(5))
            .await
            .unwrap();
        manager.disconnect();

        assert_eq!(manager.state(), TransportState::Disconnected);
        assert_eq!(manager.observer_count(), 0);

        // The aborted timer never resurrects the connection.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn inbound_frames_fan_out_to_observers() {
        let (listener, url) = local_listener().await;
        let manager = TransportManager::new(quick_config());

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        manager.subscribe(ChatObserver::new(move |message| {
            sink.lock().unwrap().push(message.clone());
        }));

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            let frame = json!({
                "type": NEW_CHAT_MESSAGE,
                "message": {"id": "m1", "sender_id": "u1", "body": "over the wire"}
            });
            socket
                .send(Message::Text(frame.to_string()))
                .await
                .unwrap();
            // Hold the connection open until the client has seen the frame.
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        manager.connect(url, None);
        manager
            .wait_for_state(TransportState::Open, Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["body"], "over the wire");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_is_single_flight() {
        let (listener, url) = local_listener().await;
        let manager = TransportManager::new(quick_config());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _socket = accept_async(stream).await.unwrap();

            // A second connect() must not open a second transport.
            let second = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
            assert!(second.is_err(), "second transport was opened");
        });

        manager.connect(url.clone(), None);
        manager.connect(url, None);
        manager
            .wait_for_state(TransportState::Open, Duration::from_secs(5))
            .await
            .unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn keepalive_probe_is_sent_while_open() {
        let (listener, url) = local_listener().await;
        let manager = TransportManager::new(ReconnectConfig {
            keepalive_interval: Duration::from_millis(50),
            ..quick_config()
        });

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) if text == KEEPALIVE_PING => {
                        socket
                            .send(Message::Text(KEEPALIVE_PONG.to_string()))
                            .await
                            .unwrap();
                        return;
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("expected ping, got {other:?}"),
                }
            }
        });

        manager.connect(url, None);
        manager
            .wait_for_state(TransportState::Open, Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server never received a ping")
            .unwrap();

        // The pong reply was swallowed by the transport rather than being
        // treated as a fault.
        assert_ne!(manager.state(), TransportState::Failed);
    }

    #[tokio::test]
    async fn final_close_code_does_not_trigger_reconnect() {
        let (listener, url) = local_listener().await;
        let manager = TransportManager::new(quick_config());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            socket
                .send(Message::Close(Some(CloseFrame {
                    // Application-reserved range: treated as final.
                    code: CloseCode::from(4001),
                    reason: "server shutting down".into(),
                })))
                .await
                .unwrap();

            // The client must not dial again.
            let second = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
            assert!(second.is_err(), "client reconnected after a final close");
        });

        manager.connect(url, None);
        manager
            .wait_for_state(TransportState::Open, Duration::from_secs(5))
            .await
            .unwrap();
        manager
            .wait_for_state(TransportState::Disconnected, Duration::from_secs(5))
            .await
            .unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn send_while_not_open_is_a_logged_noop() {
        let manager = TransportManager::new(quick_config());
        manager.send("into the void");
        assert_eq!(manager.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn subscribe_is_idempotent_and_unsubscribe_tolerates_absence() {
        let manager = TransportManager::new(quick_config());
        let observer = ChatObserver::new(|_| {});
        let stranger = ChatObserver::new(|_| {});

        manager.subscribe(observer.clone());
        manager.subscribe(observer.clone());
        assert_eq!(manager.observer_count(), 1);

        let stranger: Arc<dyn Observer> = stranger;
        manager.unsubscribe(&stranger);
        assert_eq!(manager.observer_count(), 1);

        let observer: Arc<dyn Observer> = observer;
        manager.unsubscribe(&observer);
        assert_eq!(manager.observer_count(), 0);
    }
}
