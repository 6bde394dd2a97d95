use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    debts::{
        dto::{AggregationsBody, CreateDebtRequest, DebtBody, DebtListBody, ListQuery, UpdateDebtRequest},
        services,
    },
    error::Error,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/debts", get(list_debts).post(create_debt))
        .route("/debts/aggregations/summary", get(get_aggregations))
        .route("/debts/export/json", get(export_json))
        .route("/debts/export/csv", get(export_csv))
        .route("/debts/:id", get(get_debt).put(update_debt).delete(delete_debt))
        .route("/debts/:id/mark-paid", patch(mark_paid))
}

#[instrument(skip(state))]
async fn list_debts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<DebtListBody>, Error> {
    let debts = services::list_debts(&state, user_id, query.is_paid).await?;
    Ok(Json(DebtListBody { debts }))
}

#[instrument(skip(state, payload))]
async fn create_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateDebtRequest>,
) -> Result<(StatusCode, Json<DebtBody>), Error> {
    let debt = services::create_debt(&state, user_id, payload).await?;
    info!(user_id = %user_id, debt_id = %debt.id, "debt created");
    Ok((StatusCode::CREATED, Json(DebtBody { debt })))
}

#[instrument(skip(state))]
async fn get_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtBody>, Error> {
    let debt = services::get_debt(&state, user_id, id).await?;
    Ok(Json(DebtBody { debt }))
}

#[instrument(skip(state, payload))]
async fn update_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDebtRequest>,
) -> Result<Json<DebtBody>, Error> {
    let debt = services::update_debt(&state, user_id, id, payload)
        .await
        .map_err(Error::absent_as_bad_request)?;
    info!(user_id = %user_id, debt_id = %debt.id, "debt updated");
    Ok(Json(DebtBody { debt }))
}

#[instrument(skip(state))]
async fn mark_paid(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtBody>, Error> {
    let debt = services::mark_debt_paid(&state, user_id, id).await?;
    info!(user_id = %user_id, debt_id = %debt.id, "debt marked as paid");
    Ok(Json(DebtBody { debt }))
}

#[instrument(skip(state))]
async fn delete_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtBody>, Error> {
    let debt = services::delete_debt(&state, user_id, id)
        .await
        .map_err(Error::absent_as_bad_request)?;
    info!(user_id = %user_id, debt_id = %debt.id, "debt deleted");
    Ok(Json(DebtBody { debt }))
}

#[instrument(skip(state))]
async fn get_aggregations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AggregationsBody>, Error> {
    let aggregations = services::aggregations(&state, user_id).await?;
    Ok(Json(AggregationsBody { aggregations }))
}

#[instrument(skip(state))]
async fn export_json(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, Error> {
    let debts = services::export_rows(&state, user_id).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=debts.json"),
    );
    Ok((headers, Json(debts)))
}

#[instrument(skip(state))]
async fn export_csv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, Error> {
    let debts = services::export_rows(&state, user_id).await?;
    let csv = services::debts_to_csv(&debts)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=debts.csv"),
    );
    Ok((headers, csv))
}
