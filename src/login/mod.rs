//! Login orchestration
//!
//! Sequences the GitHub exchanges, token issuance and user reconciliation
//! into a single call.

pub mod error;
pub mod service;

pub use error::LoginError;
pub use service::{LoginResult, LoginService, LoginStage};
