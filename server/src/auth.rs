// Caller identity

use axum::http::HeaderMap;

use agrocoop_core::ids::UserId;

use crate::{error::AppError, observability::record_authenticated_identity};

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const LEGACY_USER_ID_HEADER: &str = "userid";

/// Reads the opaque caller id placed on the request by the upstream
/// identity provider.
pub(crate) fn authenticate(headers: &HeaderMap) -> Result<UserId, AppError> {
    let user_id = [USER_ID_HEADER, LEGACY_USER_ID_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(UserId::from)
        .ok_or_else(|| AppError::unauthorized("A user id header is required."))?;

    record_authenticated_identity(&user_id);
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn reads_primary_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" user-1 "));
        assert_eq!(authenticate(&headers).expect("user").as_str(), "user-1");
    }

    #[test]
    fn falls_back_to_legacy_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        headers.insert(LEGACY_USER_ID_HEADER, HeaderValue::from_static("user-2"));
        assert_eq!(authenticate(&headers).expect("user").as_str(), "user-2");
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let err = authenticate(&HeaderMap::new()).expect_err("no identity");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
