//! Networking: REST client, query cache and push channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls through the keyed `cache`, `push` fans push
//! events out to scoped subscriptions, `push_socket` owns the websocket
//! lifecycle, and `types` defines the wire schema.

pub mod api;
pub mod cache;
pub mod error;
pub mod push;
pub mod push_socket;
pub mod types;

pub use api::ApiClient;
pub use error::ApiError;
pub use push::{PushHub, Subscription};
pub use push_socket::{ChannelAuthorizer, PushConnection, PushError};
