pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::engine::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/skills/compare", post(handlers::handle_compare))
        .route("/api/v1/analyses", post(handlers::handle_run_analysis))
        .route(
            "/api/v1/analyses/:company",
            delete(handlers::handle_cleanup),
        )
        .route(
            "/api/v1/analyses/:company/latest",
            get(handlers::handle_get_latest),
        )
        .route(
            "/api/v1/analyses/:company/versions",
            get(handlers::handle_list_versions),
        )
        .route(
            "/api/v1/analyses/:company/pointers/:cv_type",
            get(handlers::handle_get_pointer).put(handlers::handle_set_pointer),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::engine::AtsEngine;
    use crate::matching::SkillSet;
    use crate::scoring::ScoringPolicy;
    use crate::store::{FsBackend, MemoryIndex, VersionedResultStore};
    use crate::testing::{component_json, Reply, ScriptedCapability, StaticExtractor};

    fn app(root: &std::path::Path) -> Router {
        let store = VersionedResultStore::new(
            Arc::new(MemoryIndex::new()),
            Arc::new(FsBackend::new(root)),
        );
        let extractor = StaticExtractor::new(
            SkillSet::from_raw(["rust", "docker"], ["mentoring"], ["payments"]),
            SkillSet::from_raw(["rust", "kafka"], ["mentoring"], ["payments", "insurance"]),
        );
        let engine = AtsEngine::new(
            Arc::new(extractor),
            Arc::new(ScriptedCapability::new(Reply::Text(component_json(72.0)))),
            ScoringPolicy::default(),
            Arc::new(store),
            Duration::from_secs(30),
        );
        build_router(AppState {
            engine: Arc::new(engine),
            index_backend: "memory",
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_policy_version() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(&app(dir.path()), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scoring_policy"], "2024.1");
    }

    #[tokio::test]
    async fn test_compare_returns_counts() {
        let dir = tempfile::tempdir().unwrap();
        let request = json!({
            "cv_skills": {"technical": ["rust", "k8s"], "soft": [], "domain": []},
            "jd_skills": {"technical": ["rust", "kubernetes", "go"], "soft": ["mentoring"]}
        });

        let (status, body) =
            send(&app(dir.path()), "POST", "/api/v1/skills/compare", Some(request)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["match_summary"]["total_jd_requirements"], 4);
        assert_eq!(body["match_summary"]["total_matches"], 2);
        assert_eq!(body["match_summary"]["match_percentage"], 50.0);
    }

    #[tokio::test]
    async fn test_compare_rejects_unnormalized_terms() {
        let dir = tempfile::tempdir().unwrap();
        let request = json!({
            "cv_skills": {"technical": ["Rust "]},
            "jd_skills": {"technical": ["rust"]}
        });

        let (status, body) =
            send(&app(dir.path()), "POST", "/api/v1/skills/compare", Some(request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analysis_round_trip_through_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let user = Uuid::new_v4();

        let (status, run) = send(
            &app,
            "POST",
            "/api/v1/analyses",
            Some(json!({
                "user_id": user,
                "company": "Acme Corp",
                "cv_text": "Rust engineer, five years.",
                "jd_text": "Senior Rust engineer.",
                "source_file_id": "cv_2024.pdf"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(run["company"], "acme-corp");
        assert_eq!(run["result"]["validation_passed"], true);

        let (status, latest) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses/acme-corp/latest?user_id={user}&kind=ats_calculation"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["entry_id"], run["entries"]["ats_calculation"]);
        assert_eq!(latest["source_file_id"], "cv_2024.pdf");

        let (status, versions) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses/acme-corp/versions?user_id={user}&kind=recommendation"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(versions["versions"].as_array().unwrap().len(), 1);

        let (status, cleanup) = send(
            &app,
            "DELETE",
            &format!("/api/v1/analyses/acme-corp?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleanup["removed"], 4);
    }

    #[tokio::test]
    async fn test_latest_for_unknown_company_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!(
            "/api/v1/analyses/initech/latest?user_id={}&kind=comparison",
            Uuid::new_v4()
        );

        let (status, body) = send(&app(dir.path()), "GET", &uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_blank_cv_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = json!({
            "user_id": Uuid::new_v4(),
            "company": "Acme",
            "cv_text": "  ",
            "jd_text": "Senior Rust engineer."
        });

        let (status, _) = send(&app(dir.path()), "POST", "/api/v1/analyses", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pointer_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let user = Uuid::new_v4();
        let uri = "/api/v1/analyses/acme/pointers/tailored";

        for file_id in ["cv_v1.pdf", "cv_v2.pdf"] {
            let (status, _) = send(
                &app,
                "PUT",
                uri,
                Some(json!({"user_id": user, "file_id": file_id})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, pointer) = send(&app, "GET", &format!("{uri}?user_id={user}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pointer["file_id"], "cv_v2.pdf");
        assert_eq!(pointer["cv_type"], "tailored");
    }
}
