//! Shared domain core for the Garment Production Management backend
//!
//! Pure stock and workflow rules used by the HTTP backend and by the
//! WASM previews. Nothing in this crate touches the database.

pub mod error;
pub mod history;
pub mod ledger;
pub mod models;
pub mod reservation;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
