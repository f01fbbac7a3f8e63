//! JSON body extractor whose rejections use the API error envelope.

use std::future::Future;

use axum::{
    Json,
    extract::{FromRequest, OptionalFromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Like [`Json`], but a body that cannot be decoded is an [`AppError::BadRequest`].
///
/// As an `Option<ApiJson<T>>` a request without a JSON content type yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

fn bad_request(rejection: &JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let json = <Json<T> as FromRequest<S>>::from_request(req, state);
        async move {
            match json.await {
                Ok(Json(value)) => Ok(Self(value)),
                Err(rejection) => Err(bad_request(&rejection)),
            }
        }
    }
}

impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl Future<Output = Result<Option<Self>, Self::Rejection>> + Send {
        let json = <Json<T> as OptionalFromRequest<S>>::from_request(req, state);
        async move {
            match json.await {
                Ok(value) => Ok(value.map(|Json(value)| Self(value))),
                Err(rejection) => Err(bad_request(&rejection)),
            }
        }
    }
}
