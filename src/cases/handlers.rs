use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::{ensure_owner, CurrentUser},
    error::{ApiError, ApiResult},
    salesforce::{sf_record_id, Case},
    state::AppState,
};

use super::dto::{CaseCreateResponse, CaseListResponse, CreateCaseRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customer/:customer_id/cases", get(list_cases))
        .route("/customer/:customer_id/cases", post(create_case))
}

#[instrument(skip(state, current_user))]
pub async fn list_cases(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<CaseListResponse>> {
    ensure_owner(
        &current_user,
        &customer_id,
        "You can only access your own cases",
    )?;

    let cases = state.salesforce.get_cases(&customer_id).await?;
    Ok(Json(CaseListResponse { cases }))
}

#[instrument(skip(state, current_user, payload))]
pub async fn create_case(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(customer_id): Path<String>,
    Json(payload): Json<CreateCaseRequest>,
) -> ApiResult<(StatusCode, Json<CaseCreateResponse>)> {
    ensure_owner(
        &current_user,
        &customer_id,
        "You can only create cases for yourself",
    )?;

    if payload.subject.trim().is_empty() {
        warn!(%customer_id, "case with blank subject rejected");
        return Err(ApiError::BadRequest(
            "Subject is required and cannot be empty".into(),
        ));
    }

    let case = Case {
        case_id: sf_record_id("500"),
        customer_id: customer_id.clone(),
        subject: payload.subject,
        description: payload.description,
        case_type: Some("Customer Request".into()),
        status: "New".into(),
        created_date: OffsetDateTime::now_utc(),
    };
    state.salesforce.append_case(&customer_id, &case).await?;

    info!(%customer_id, case_id = %case.case_id, "case created");
    Ok((
        StatusCode::CREATED,
        Json(CaseCreateResponse {
            case_id: case.case_id,
            message: "Case created successfully".into(),
            status: case.status,
        }),
    ))
}
