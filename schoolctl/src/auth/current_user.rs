use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// Returns `None` when there is no header or no token after the scheme, which callers treat as
/// "not authenticated" rather than "bad token".
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        // Any other scheme still counts as a presented credential
        return Some(value.trim());
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = bearer_token(parts) else {
            trace!("No bearer token presented");
            return Err(Error::Unauthenticated { message: None });
        };

        let user = session::verify_session_token(token, &state.config)?;
        debug!(user_id = user.id, role = ?user.role, "Authenticated request");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/students");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts_with(Some("bearer   abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))), Some("Basic dXNlcjpwYXNz"));
    }
}
