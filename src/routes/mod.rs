//! Router assembly.

mod admin;
mod backup;
mod common;

pub use admin::admin_routes;
pub use backup::backup_routes;
pub use common::common_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Default cap on request bodies.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Every route, with a request body limit applied.
pub fn app_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(backup_routes(state.clone()))
        .merge(admin_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::extractors::{ACTOR_ROLE_HEADER, ACTOR_UUID_HEADER};
    use crate::test::Fixture;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use testresult::TestResult;
    use tower::ServiceExt;

    fn request(method: &str, uri: &str, actor: Option<(uuid::Uuid, Role)>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((uuid, role)) = actor {
            builder = builder
                .header(ACTOR_UUID_HEADER, uuid.to_string())
                .header(ACTOR_ROLE_HEADER, role.as_str());
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> TestResult<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn health_needs_no_actor() -> TestResult {
        let fx = Fixture::new();
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);

        let response = app.oneshot(request("GET", "/health", None)).await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn missing_actor_headers_are_unauthorized() -> TestResult {
        let fx = Fixture::new();
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);
        let uri = format!("/projects/{}/backups", fx.project.uuid);

        let response = app.oneshot(request("GET", &uri, None)).await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json(response).await?;
        assert_eq!(body["error"]["code"], "unauthenticated");
        Ok(())
    }

    #[tokio::test]
    async fn create_returns_creating_backup_in_envelope() -> TestResult {
        let fx = Fixture::new();
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);
        let uri = format!("/projects/{}/backups", fx.project.uuid);

        let response = app
            .oneshot(request("POST", &uri, Some((fx.owner.uuid, fx.owner.role))))
            .await?;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await?;
        assert_eq!(body["data"]["status"], "creating");
        assert_eq!(body["data"]["projectUuid"], fx.project.uuid.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn viewer_create_is_forbidden_with_message() -> TestResult {
        let fx = Fixture::new();
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);
        let uri = format!("/projects/{}/backups", fx.project.uuid);

        let response = app
            .oneshot(request("POST", &uri, Some((fx.owner.uuid, Role::Viewer))))
            .await?;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json(response).await?;
        assert_eq!(body["error"]["message"], "You don't have permission to create a backup");
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_accepted_then_conflicts() -> TestResult {
        let fx = Fixture::new();
        let backup = fx.store.insert(fx.project.uuid, crate::backup::BackupStatus::Created);
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);
        let uri = format!("/backups/{}", backup.uuid);
        let actor = Some((fx.owner.uuid, fx.owner.role));

        let first = app.clone().oneshot(request("DELETE", &uri, actor)).await?;
        let second = app.oneshot(request("DELETE", &uri, actor)).await?;

        assert_eq!(first.status(), StatusCode::ACCEPTED);
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_backup_is_not_found() -> TestResult {
        let fx = Fixture::new();
        let app = app_routes(fx.app_state(), DEFAULT_BODY_LIMIT);
        let uri = format!("/backups/{}", uuid::Uuid::new_v4());

        let response = app
            .oneshot(request("GET", &uri, Some((fx.owner.uuid, fx.owner.role))))
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
