use crate::config::{ServerConfig, SolverConfig};
use crate::data::{Catalog, Domain, SchedulingInput};
use crate::error::ErrorKind;
use crate::report::{self, Timetable};
use crate::solver;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Applied when a request does not set its own time limit.
    pub default_time_limit_secs: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    #[serde(flatten)]
    pub input: SchedulingInput,
    #[serde(default)]
    pub catalog: Option<Catalog>,
    #[serde(default)]
    pub config: Option<SolverConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    Optimal,
    Feasible,
    InvalidInput,
    Infeasible,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timetable: Option<Timetable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SolveResponse {
    fn failure(status: ResponseStatus, message: String) -> Self {
        Self {
            status,
            timetable: None,
            message: Some(message),
        }
    }
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> (StatusCode, Json<SolveResponse>) {
    let catalog = request.catalog.unwrap_or_default();
    let mut config = request.config.unwrap_or_default();
    if config.time_limit_secs.is_none() {
        config.time_limit_secs = state.default_time_limit_secs;
    }

    let domain = match Domain::new(&request.input, catalog) {
        Ok(domain) => domain,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SolveResponse::failure(ResponseStatus::InvalidInput, e.to_string())),
            );
        }
    };

    let solved = tokio::task::spawn_blocking(move || {
        let result = solver::solve(&domain, &config).into_result();
        result.map(|solution| report::project(&solution, &domain))
    })
    .await;

    match solved {
        Ok(Ok(timetable)) => {
            let status = if timetable.optimal {
                ResponseStatus::Optimal
            } else {
                ResponseStatus::Feasible
            };
            (
                StatusCode::OK,
                Json(SolveResponse {
                    status,
                    timetable: Some(timetable),
                    message: None,
                }),
            )
        }
        Ok(Err(e)) => {
            let (code, status) = match e.kind() {
                ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, ResponseStatus::InvalidInput),
                ErrorKind::Infeasible => {
                    (StatusCode::UNPROCESSABLE_ENTITY, ResponseStatus::Infeasible)
                }
                ErrorKind::Error => (StatusCode::INTERNAL_SERVER_ERROR, ResponseStatus::Error),
            };
            (code, Json(SolveResponse::failure(status, e.to_string())))
        }
        Err(e) => {
            error!("Solver task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SolveResponse::failure(
                    ResponseStatus::Error,
                    "solver failed, try again".to_string(),
                )),
            )
        }
    }
}

async fn catalog_handler() -> Json<Catalog> {
    Json(Catalog::standard())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/v1/timetable/catalog", get(catalog_handler))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(AppState {
        default_time_limit_secs: config.default_time_limit_secs,
    });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn post_solve(body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/timetable/solve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(AppState::default()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn solves_a_feasible_request() {
        let (status, body) = post_solve(json!({
            "courses": [{"name": "Algebra", "requiredMinutes": 100}],
            "teachers": [{"name": "Ruiz", "course": "Algebra", "preferredSlot": 3}]
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "optimal");
        assert_eq!(body["timetable"]["courses"][0]["assignedMinutes"], 100);
        assert_eq!(body["timetable"]["teachers"][0]["satisfied"], true);
        assert_eq!(body["timetable"]["roomGrids"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn rejects_misaligned_duration() {
        let (status, body) = post_solve(json!({
            "courses": [{"name": "Algebra", "requiredMinutes": 120}]
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "invalidInput");
        assert!(body.get("timetable").is_none());
    }

    #[tokio::test]
    async fn reports_infeasible_without_schedule() {
        let (status, body) = post_solve(json!({
            "courses": [{"name": "Algebra", "requiredMinutes": 5000}]
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "infeasible");
        assert!(body.get("timetable").is_none());
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("cannot be satisfied")
        );
    }

    #[tokio::test]
    async fn honours_custom_catalog_and_config() {
        let (status, body) = post_solve(json!({
            "courses": [
                {"name": "A", "requiredMinutes": 100},
                {"name": "B", "requiredMinutes": 100}
            ],
            "catalog": {
                "rooms": ["X", "Y"],
                "days": ["Mon"],
                "slots": [
                    {"ordinal": 1, "start": "08:00", "end": "08:50"},
                    {"ordinal": 2, "start": "09:00", "end": "09:50"}
                ]
            },
            "config": {"exclusivity": "roomOnly"}
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timetable"]["grid"]["days"], json!(["Mon"]));
    }

    #[tokio::test]
    async fn serves_the_standard_catalog() {
        let request = Request::builder()
            .uri("/v1/timetable/catalog")
            .body(Body::empty())
            .unwrap();
        let response = router(AppState::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let catalog: Catalog = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(catalog, Catalog::standard());
    }
}
