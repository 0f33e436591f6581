/// Request extractors
///
/// - [`ValidatedJson`]: JSON body, whitespace-trimmed and checked with
///   `validator` before the handler runs
/// - [`parse_id`]: positive integer path ids
/// - [`double_option`]: PATCH fields where `null` means "clear"
///
/// Failures reject with [`ApiError`], so they use the standard envelope
/// instead of Axum's plain-text rejections.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Normalizes user input before validation
pub trait Trim {
    /// Trims surrounding whitespace from string fields
    fn trim(self) -> Self;
}

/// Trims an optional string, leaving `None` alone
pub fn trim_opt(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

/// Deserializes a field that distinguishes absent from `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// JSON body that has been trimmed and validated
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Trim,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        let value = value.trim();
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Parses a path segment as a row id
///
/// Ids are BIGSERIAL, so anything that is not a positive integer cannot
/// name a row.
pub fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!("Invalid {} id: {}", what, raw))),
    }
}
