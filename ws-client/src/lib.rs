//! Client-side subscription layer for Agora's live channel.
//!
//! `TransportManager` owns one physical WebSocket connection, the
//! reconnect/backoff state machine, and the observer fan-out set.
//! Observers are pure payload-to-state translators; swapping the transport
//! never touches them. The `ws-test-client` binary drives both against a
//! running server for end-to-end scenarios.

pub mod observer;
pub mod transport;

pub use observer::{ChatObserver, NotificationObserver, Observer};
pub use transport::{ReconnectConfig, TransportManager, TransportState};
