//! gemserve - minimal Gemini server
//!
//! Core library for the Gemini protocol handler, content resolution and
//! TLS listener.

pub mod config;
pub mod gemini;
pub mod logging;
pub mod resolver;
pub mod server;
