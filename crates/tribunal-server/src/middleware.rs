use axum::{body::Body, http::Request, http::StatusCode, middleware::Next, response::Response};

/// The participant on whose behalf a command is issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityContext(pub String);

/// Header carrying the invoking participant's id.
pub const PARTICIPANT_HEADER: &str = "X-Participant-Id";

/// Middleware to identify callers via `X-Participant-Id` or `Authorization: Bearer`.
///
/// # Security Note
///
/// Commands arrive through the platform bridge, which is trusted to forward
/// the id of the participant who invoked them. The "Bearer" token IS the
/// participant id; nothing is verified beyond it being present and
/// non-empty.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let participant = if let Some(val) = req.headers().get(PARTICIPANT_HEADER) {
        val.to_str()
            .map_err(|_| StatusCode::UNAUTHORIZED)?
            .trim()
            .to_string()
    } else if let Some(val) = req.headers().get("Authorization") {
        let val_str = val.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
        if let Some(token) = val_str.strip_prefix("Bearer ") {
            token.trim().to_string()
        } else {
            return Err(StatusCode::UNAUTHORIZED);
        }
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if participant.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(IdentityContext(participant));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(IdentityContext(id)): Extension<IdentityContext>) -> String {
        id
    }

    fn router() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn(auth_middleware))
    }

    async fn call(header: Option<(&str, &str)>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn accepts_participant_header() {
        let (status, body) = call(Some((PARTICIPANT_HEADER, "alice"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn accepts_bearer_token() {
        let (status, body) = call(Some(("Authorization", "Bearer bob"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob");
    }

    #[tokio::test]
    async fn rejects_missing_or_blank_identity() {
        assert_eq!(call(None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(Some((PARTICIPANT_HEADER, "  "))).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            call(Some(("Authorization", "Basic abc"))).await.0,
            StatusCode::UNAUTHORIZED
        );
    }
}
