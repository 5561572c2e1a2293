//! Domain models for stock, production batches, routings and inspections

pub mod batch;
pub mod conference;
pub mod movement;
pub mod roll;
pub mod routing;

pub use batch::*;
pub use conference::*;
pub use movement::*;
pub use roll::*;
pub use routing::*;
