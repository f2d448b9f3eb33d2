//! Assignment launch orchestration.
//!
//! # States
//!
//! ```text
//! loading --content URL resolved--> showing content
//!    |                                   |
//!    +--fetch failed--> error dialog <---+ (groups fetch failed)
//!                         |    ^
//!                retry()  |    | still failing
//!                         v    |
//!                 [popup] -> both fetches
//! ```
//!
//! The iframe only waits for the content URL. The groups fetch settles on
//! its own and can raise the error dialog afterwards. A failed grading
//! submission ends the session in `error-reporting-submission`, which offers
//! no retry.

mod controller;
mod error_state;
mod rpc;
mod view;

pub use controller::{LaunchController, LaunchState};
pub use error_state::{LaunchErrorCode, LaunchErrorState};
pub use rpc::{AnnotationActivity, AnnotationEventType, BroadcastClientRpc, ClientRpc};
pub use view::{ErrorDialog, LaunchView, RetryAction};
