//! An asynchronous client for the Asterisk Manager Interface (AMI).
//!
//! The client maintains a persistent, authenticated TCP session to an Asterisk server, submits
//! *actions* and correlates their responses, and delivers unsolicited *events* to
//! user-registered handlers. See [`Client`] for the main entry point.

#![deny(clippy::nursery, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::future_not_send
)]

pub mod action;
pub mod callback;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod id_generator;
pub mod packet;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod subscription;
pub mod transport;

pub use action::Repeat;
pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;
pub use packet::{HeaderValue, Packet};
