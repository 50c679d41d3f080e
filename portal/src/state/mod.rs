//! Client-side state: wizards, schedule rules, table queries and chat.
//!
//! Wizard transitions take `&self` and return the next state, so a refused
//! transition leaves the caller's state untouched.

pub mod booking;
pub mod chat;
pub mod kiosk;
pub mod schedule;
pub mod table;
