//! GharFix chat widget
//!
//! A floating chat widget modelled as a headless component: it keeps a
//! conversation id in durable storage, posts user text to a chat endpoint
//! and renders the reply, including the redirect-to-WhatsApp convention.
//!
//! # Architecture
//!
//! - **Widget**: state machine, message exchange and control surface
//! - **DOM model**: retained element tree rendered to escaped HTML
//! - **Seams**: storage, endpoint and link opening are traits the host supplies
//! - **Host server**: Axum app embedding one widget behind an HTTP control surface
//!
//! # Modules
//!
//! - [`widget`]: [`ChatWidget`] and its builder
//! - [`view`] / [`dom`]: widget DOM construction and rendering
//! - [`protocol`] / [`transport`]: wire contract and HTTP endpoint
//! - [`storage`] / [`conversation`]: persisted state
//! - [`events`] / [`scheduler`]: listener list and cancellable timers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod conversation;
pub mod dom;
pub mod error;
pub mod events;
pub mod links;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod transport;
pub mod view;
pub mod widget;

pub use config::WidgetConfig;
pub use error::{ExchangeError, WidgetError};
pub use widget::{ChatWidget, ExchangeOutcome};
