use axum::{
    async_trait,
    extract::FromRequest,
    http::Request,
    Json, RequestExt,
};
use validator::Validate;

use super::AppError;

pub struct ValidatedBody<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for ValidatedBody<T>
where
    B: Send + 'static,
    S: Send + Sync,
    T: Validate + 'static,
    Json<T>: FromRequest<(), B>,
{
    type Rejection = AppError;

    async fn from_request(req: Request<B>, _state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = req.extract::<Json<T>, _>().await.map_err(|_| {
            let msg = "Invalid JSON body".to_owned();
            tracing::debug!("{msg}");
            AppError::BadRequestErr(msg)
        })?;
        data.validate()
            .map_err(|err| AppError::BadRequestErr(err.to_string()))?;
        Ok(Self(data))
    }
}
