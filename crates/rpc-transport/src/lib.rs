// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Message delivery abstraction for `iframe-rpc` (§6 "Transport
//! contract"), plus a fake in-process paired channel for tests (§2 "Test
//! scaffolding").
//!
//! This crate never interprets envelope contents — it only moves them
//! between peers and tracks who sent what from where.

pub mod fake;
pub mod message;
pub mod transport;

pub use fake::{FakeChannel, FakeTransport};
pub use message::{MessageEvent, OriginPolicy, PeerId};
pub use transport::Transport;
