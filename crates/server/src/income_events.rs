//! Income event API endpoints.

use api_types::income_event::{
    IncomeEventNew, IncomeEventQuery, IncomeEventReceive, IncomeEventUpdate, IncomeEventView,
    IncomeEventsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Caller, Frequency, IncomeStatus, Money};

use crate::{ServerError, parse_id, server::ServerState};

pub(crate) fn map_income_event(income: engine::IncomeEvent) -> IncomeEventView {
    IncomeEventView {
        id: income.id,
        name: income.name,
        amount: income.amount.to_major(),
        scheduled_date: income.scheduled_date,
        actual_date: income.actual_date,
        frequency: income.frequency.as_str().to_string(),
        status: income.status.as_str().to_string(),
        allocated_amount: income.allocated_amount.to_major(),
        remaining_amount: income.remaining_amount.to_major(),
        notes: income.notes,
        created_at: income.created_at,
    }
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): WithRejection<Query<IncomeEventQuery>, ServerError>,
) -> Result<Json<IncomeEventsResponse>, ServerError> {
    let filter = engine::IncomeEventFilter {
        from: query.from,
        to: query.to,
        status: query
            .status
            .as_deref()
            .map(IncomeStatus::try_from)
            .transpose()?,
    };
    let income_events = state
        .engine
        .list_income_events(&caller, &filter)
        .await?
        .into_iter()
        .map(map_income_event)
        .collect();

    Ok(Json(IncomeEventsResponse { income_events }))
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<IncomeEventNew>, ServerError>,
) -> Result<(StatusCode, Json<IncomeEventView>), ServerError> {
    let new = engine::IncomeEventNew {
        name: payload.name,
        amount: Money::from_major(payload.amount)?,
        scheduled_date: payload.scheduled_date,
        frequency: payload
            .frequency
            .as_deref()
            .map(Frequency::try_from)
            .transpose()?
            .unwrap_or(Frequency::Once),
        notes: payload.notes,
    };
    let income = state.engine.create_income_event(&caller, new).await?;

    Ok((StatusCode::CREATED, Json(map_income_event(income))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<IncomeEventView>, ServerError> {
    let id = parse_id(&id, "income event")?;
    let income = state.engine.income_event(&caller, id).await?;
    Ok(Json(map_income_event(income)))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<IncomeEventUpdate>, ServerError>,
) -> Result<Json<IncomeEventView>, ServerError> {
    let id = parse_id(&id, "income event")?;
    let update = engine::IncomeEventUpdate {
        name: payload.name,
        amount: payload.amount.map(Money::from_major).transpose()?,
        scheduled_date: payload.scheduled_date,
        frequency: payload
            .frequency
            .as_deref()
            .map(Frequency::try_from)
            .transpose()?,
        notes: payload.notes,
    };
    let income = state.engine.update_income_event(&caller, id, update).await?;
    Ok(Json(map_income_event(income)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = parse_id(&id, "income event")?;
    state.engine.delete_income_event(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn receive(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<IncomeEventReceive>, ServerError>,
) -> Result<Json<IncomeEventView>, ServerError> {
    let id = parse_id(&id, "income event")?;
    let income = state
        .engine
        .receive_income_event(&caller, id, payload.actual_date)
        .await?;
    Ok(Json(map_income_event(income)))
}

pub async fn cancel(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<IncomeEventView>, ServerError> {
    let id = parse_id(&id, "income event")?;
    let income = state.engine.cancel_income_event(&caller, id).await?;
    Ok(Json(map_income_event(income)))
}
