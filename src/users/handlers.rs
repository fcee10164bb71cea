use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    errors::RestError,
    state::AppState,
    users::dto::{LoginRequest, PublicUser, User},
};

const PUBLIC_HEADER: &str = "x-public";

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create))
        .route("/users/login", post(login))
        .route("/users/:user_id", get(get_user))
}

fn parse_user_id(raw: &str) -> Result<i64, RestError> {
    raw.parse::<i64>()
        .map_err(|_| RestError::bad_request("user id should be a number"))
}

fn is_public(headers: &HeaderMap) -> bool {
    headers
        .get(PUBLIC_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RestError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!(error = %rejection, "rejected request body");
        RestError::bad_request("invalid json body")
    })
}

#[instrument(skip(state, headers, payload))]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<User>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), RestError> {
    let user = json_body(payload)?;
    let created = state.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created.marshall(is_public(&headers)))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUser>, RestError> {
    let user_id = parse_user_id(&user_id)?;
    let user = state.users.get_user(user_id).await?;
    // No caller identity is available yet, so the full view is returned.
    Ok(Json(user.marshall(false)))
}

#[instrument(skip(state, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, RestError> {
    let request = json_body(payload)?;
    let user = state.users.login_user(request).await?;
    Ok(Json(user.marshall(is_public(&headers))))
}
