//! JSON body extractor that runs a validation schema before deserializing.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::application::validation::{Schema, validate};

use super::error::ApiError;

/// A request payload with a declarative validation schema.
pub trait Validated: DeserializeOwned {
    const SCHEMA: Schema;
}

/// Every schema violation is reported at once as `400 Validation failed`.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: Validated,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(request, state)
            .await
            .map_err(|rejection| {
                ApiError::new(rejection.status(), "Invalid JSON body")
                    .with_diagnostic(rejection.body_text())
            })?;

        validate(T::SCHEMA, &value).map_err(ApiError::validation)?;

        serde_json::from_value(value)
            .map(ValidJson)
            .map_err(|err| ApiError::validation(vec![err.to_string()]))
    }
}
