//! Business logic services for the production platform

pub mod batch;
pub mod batch_response;
pub mod conference;
pub mod ledger;
pub mod lookup;
pub mod movement;
pub mod reservation;
pub mod roll;
pub mod routing;

pub use batch::BatchService;
pub use conference::ConferenceService;
pub use movement::MovementService;
pub use roll::RollService;
pub use routing::RoutingService;
