//! Middleware module
//!
//! Contains HTTP middleware layers

pub mod logging;
