//! Client core for the maternity-care and shuttle-booking portal.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal talks to an external REST API and a push channel. This crate
//! owns everything between those transports and whatever renders the UI:
//! wizard state machines (`state`), form schemas (`validation`), and the
//! networking layer (`net`) with its query cache and scoped subscriptions.
//!
//! Nothing here renders markup; front-ends read state and call transitions.

pub mod config;
pub mod net;
pub mod state;
pub mod validation;

pub use config::PortalConfig;
