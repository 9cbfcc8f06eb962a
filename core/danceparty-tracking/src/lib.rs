//! Protocol actions of the console tracking service.
//!
//! [`TrackingService`] implements `login`, `track` and `activatekey` over a
//! [`TrackingStore`](danceparty_store::TrackingStore). Every outcome,
//! including every failure, becomes a [`WireResponse`](danceparty_wire::WireResponse)
//! carrying a `return_code`.

mod error;
mod request;
mod service;

pub use error::{TrackingError, TrackingResult};
pub use request::{leading_int, Action, TrackingRequest};
pub use service::{ConsoleAuth, LoginGrant, TagEvent, TrackingService};
