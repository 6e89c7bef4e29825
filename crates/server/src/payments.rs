//! Payment API endpoints.

use api_types::payment::{PaymentNew, PaymentQuery, PaymentStatusUpdate, PaymentView, PaymentsResponse};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Caller, Money, PaymentStatus, PaymentType};

use crate::{ServerError, parse_id, server::ServerState};

fn map_payment(payment: engine::Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        payee: payment.payee,
        amount: payment.amount.to_major(),
        due_date: payment.due_date,
        paid_date: payment.paid_date,
        payment_type: payment.payment_type.as_str().to_string(),
        status: payment.status.as_str().to_string(),
        spending_category_id: payment.spending_category_id,
        notes: payment.notes,
        created_at: payment.created_at,
    }
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): WithRejection<Query<PaymentQuery>, ServerError>,
) -> Result<Json<PaymentsResponse>, ServerError> {
    let filter = engine::PaymentFilter {
        from: query.from,
        to: query.to,
        status: query
            .status
            .as_deref()
            .map(PaymentStatus::try_from)
            .transpose()?,
    };
    let payments = state
        .engine
        .list_payments(&caller, &filter)
        .await?
        .into_iter()
        .map(map_payment)
        .collect();

    Ok(Json(PaymentsResponse { payments }))
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<PaymentNew>, ServerError>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let new = engine::PaymentNew {
        payee: payload.payee,
        amount: Money::from_major(payload.amount)?,
        due_date: payload.due_date,
        payment_type: payload
            .payment_type
            .as_deref()
            .map(PaymentType::try_from)
            .transpose()?
            .unwrap_or(PaymentType::Once),
        spending_category_id: payload
            .spending_category_id
            .as_deref()
            .map(|id| parse_id(id, "spending category"))
            .transpose()?,
        notes: payload.notes,
    };
    let payment = state.engine.create_payment(&caller, new).await?;

    Ok((StatusCode::CREATED, Json(map_payment(payment))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentView>, ServerError> {
    let id = parse_id(&id, "payment")?;
    let payment = state.engine.payment(&caller, id).await?;
    Ok(Json(map_payment(payment)))
}

pub async fn update_status(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<PaymentStatusUpdate>, ServerError>,
) -> Result<Json<PaymentView>, ServerError> {
    let id = parse_id(&id, "payment")?;
    let status = PaymentStatus::try_from(payload.status.as_str())?;
    let payment = state
        .engine
        .update_payment_status(&caller, id, status, payload.paid_date)
        .await?;
    Ok(Json(map_payment(payment)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = parse_id(&id, "payment")?;
    state.engine.delete_payment(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
