//! WebSocket endpoint for real-time updates.
//!
//! The handler authenticates via the same session cookie as the rest of
//! the API, registers the connection with the realtime manager, and pumps
//! frames until either side closes.

pub(crate) mod handler;
