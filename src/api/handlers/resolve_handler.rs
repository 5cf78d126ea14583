use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    api::{app_state::AppState, dto::resolve_dto::ResolveResponse},
    error::AppError,
    models::DialogTurn,
};

pub async fn resolve_turn(
    State(state): State<AppState>,
    payload: Result<Json<DialogTurn>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let turn = match payload {
        Ok(Json(turn)) => turn,
        Err(rejection) => {
            warn!("Resolve request {} rejected: {}", request_id, rejection);
            return AppError::Validation(rejection.body_text())
                .into_response_with_request_id(&request_id);
        }
    };
    debug!(
        "Resolve request {} with {} intents, {} entities",
        request_id,
        turn.intents.len(),
        turn.entities.len()
    );

    let start_time = std::time::Instant::now();

    match state.resolution_service.resolve(&turn).await {
        Ok(bundle) => Json(ResolveResponse {
            request_id,
            took_ms: start_time.elapsed().as_millis() as u64,
            bundle,
        })
        .into_response(),
        Err(e) => {
            warn!("Resolve request {} failed: {}", request_id, e);
            e.into_response_with_request_id(&request_id)
        }
    }
}
