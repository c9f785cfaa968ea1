pub mod clock;
pub(crate) mod error_handler;
pub mod misc;
pub mod time;
pub(crate) mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error_handler::{AppError, ErrorResponse};
pub use misc::*;
pub use time::*;
pub(crate) use validation::ValidatedBody;
