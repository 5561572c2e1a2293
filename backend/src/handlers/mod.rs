//! HTTP handlers

pub mod batch;
pub mod conference;
pub mod health;
pub mod movement;
pub mod roll;
pub mod routing;

pub use batch::*;
pub use conference::*;
pub use health::*;
pub use movement::*;
pub use roll::*;
pub use routing::*;
