use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{devices::RegistryError, otp::OtpError, payment::FlowError};

/// Body of every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequestErr(String),
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    AnyError(#[from] anyhow::Error),
}

fn otp_status(err: &OtpError) -> StatusCode {
    match err {
        OtpError::NotFound | OtpError::AlreadyUsed => StatusCode::NOT_FOUND,
        OtpError::Expired => StatusCode::GONE,
        OtpError::AttemptsExhausted => StatusCode::TOO_MANY_REQUESTS,
        OtpError::InvalidCode { .. } => StatusCode::BAD_REQUEST,
        OtpError::DuplicateActiveOtp => StatusCode::CONFLICT,
        OtpError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequestErr(_) => StatusCode::BAD_REQUEST,
            Self::Otp(err) => otp_status(err),
            Self::Flow(err) => match err {
                FlowError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
                FlowError::InvalidState { .. } => StatusCode::CONFLICT,
                FlowError::RetailerMismatch { .. } => StatusCode::BAD_REQUEST,
                FlowError::Otp(err) => otp_status(err),
                FlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Registry(_) | Self::AnyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequestErr(_) => "BAD_REQUEST",
            Self::Otp(err) => err.kind(),
            Self::Flow(err) => err.kind(),
            Self::Registry(_) | Self::AnyError(_) => "INTERNAL",
        }
    }

    fn attempts_left(&self) -> Option<u32> {
        match self {
            Self::Otp(OtpError::InvalidCode { attempts_left })
            | Self::Flow(FlowError::Otp(OtpError::InvalidCode { attempts_left })) => {
                Some(*attempts_left)
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Something went wrong: {:?}", self);
            "Something went wrong".to_owned()
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), self.kind(), self);
            self.to_string()
        };
        let response = ErrorResponse {
            success: false,
            kind: self.kind().to_owned(),
            message,
            attempts_left: self.attempts_left(),
        };
        (status, Json(response)).into_response()
    }
}
