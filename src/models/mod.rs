use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod device;
pub mod otp;
pub mod payment;
pub mod profile;
pub mod request_schema;
pub mod response_schema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenericResponse {
    pub success: bool,
    pub message: String,
}

pub use device::*;
pub use otp::*;
pub use payment::*;
pub use profile::*;
pub use request_schema::*;
pub use response_schema::*;
