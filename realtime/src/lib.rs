//! WebSocket delivery infrastructure for real-time updates.
//!
//! This crate is the server half of Agora's live channel: it owns the map
//! from authenticated users to their WebSocket connections and the
//! listeners that turn domain events into pushed frames.
//!
//! # Architecture
//!
//! - **One connection per user**: registering a second connection for the
//!   same user is a takeover; the superseded connection is force-closed so
//!   it can never double-deliver.
//! - **Best-effort, at-most-once**: a push to an offline or closed
//!   connection is dropped and logged, never queued or retried. The durable
//!   notification row is the source of truth; the push is a convenience.
//! - **Strictly additive**: no operation in this crate returns an error to
//!   its caller. Delivery outcomes are values (`DeliveryOutcome`) that
//!   callers discard deliberately. A failed push can never fail the domain
//!   operation that triggered it.
//!
//! # Message Flow
//!
//! 1. Browser opens `/ws`; the web layer authenticates the session and
//!    registers the connection here
//! 2. A domain service commits a durable write and publishes a
//!    `DomainEvent`
//! 3. A listener in this crate resolves the recipients, records anything
//!    durable it owns (the comment listener inserts the notification row
//!    inside its own transaction), and only then pushes
//! 4. `ConnectionRegistry` serializes the payload and hands it to the
//!    connection's outbound channel; the socket task owns the actual write
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry, ConnectionHandle, close codes
//! - `manager`: facade the rest of the system talks to
//! - `message`: the discriminated wire payload and keepalive literals
//! - `comment_listener`: transactional notify-on-comment flow
//! - `chat_listener`: direct-message push

pub mod chat_listener;
pub mod comment_listener;
pub mod connection;
pub mod manager;
pub mod message;

pub use manager::Manager;
