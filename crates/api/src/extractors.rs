//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use prepvault_core::LogContext;
use prepvault_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// Admin-or-superadmin extractor.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))?;

        if user.role.is_admin() {
            Ok(Self(user))
        } else {
            Err((StatusCode::FORBIDDEN, "Not authorized as admin"))
        }
    }
}

/// Superadmin-only extractor.
#[derive(Debug, Clone)]
pub struct SuperAdminUser(pub user::Model);

impl<S> FromRequestParts<S> for SuperAdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))?;

        if user.role == user::Role::SuperAdmin {
            Ok(Self(user))
        } else {
            Err((StatusCode::FORBIDDEN, "Not authorized as superadmin"))
        }
    }
}

/// Request provenance for the activity log.
#[derive(Debug, Clone)]
pub struct ClientContext(pub LogContext);

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        // Prefer proxy-forwarded addresses
        let ip = header_str("x-forwarded-for")
            .and_then(|xff| xff.split(',').next().map(|s| s.trim().to_string()))
            .or_else(|| header_str("x-real-ip"));

        Ok(Self(LogContext {
            ip,
            user_agent: header_str("user-agent"),
            method: Some(parts.method.to_string()),
            path: Some(parts.uri.path().to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_client_context_prefers_forwarded_for() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/questions")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.1")
            .header("user-agent", "test-agent")
            .body(())
            .expect("request");
        let (mut parts, ()) = request.into_parts();

        let ClientContext(ctx) = ClientContext::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");

        assert_eq!(ctx.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(ctx.method.as_deref(), Some("POST"));
        assert_eq!(ctx.path.as_deref(), Some("/api/questions"));
        assert_eq!(ctx.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_client_context_without_headers() {
        let request = Request::builder()
            .method("GET")
            .uri("/api/companies")
            .body(())
            .expect("request");
        let (mut parts, ()) = request.into_parts();

        let ClientContext(ctx) = ClientContext::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");

        assert_eq!(ctx.ip, None);
        assert_eq!(ctx.method.as_deref(), Some("GET"));
    }
}
