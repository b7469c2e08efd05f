//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the operations the RPC layer
//!   consumes.
//! - Keep transport layers decoupled from storage details.

pub mod user_service;
