//! Payment attribution API endpoints.

use api_types::attribution::{
    AttributionCreated, AttributionNew, AttributionView, AttributionsResponse,
    AutoAttributeRequest, AutoAttributeResponse, PaymentSummaryView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{AttributionType, AutoAttributeStrategy, Caller, Money};

use crate::{ServerError, income_events::map_income_event, parse_id, server::ServerState};

fn map_attribution(attribution: engine::PaymentAttribution) -> AttributionView {
    AttributionView {
        id: attribution.id,
        payment_id: attribution.payment_id,
        income_event_id: attribution.income_event_id,
        amount: attribution.amount.to_major(),
        attribution_type: attribution.attribution_type.as_str().to_string(),
        created_by: attribution.created_by,
        created_at: attribution.created_at,
    }
}

fn map_summary(summary: engine::PaymentSummary) -> PaymentSummaryView {
    PaymentSummaryView {
        payment_amount: summary.payment_amount.to_major(),
        total_attributed: summary.total_attributed.to_major(),
        remaining_amount: summary.remaining_amount.to_major(),
        fully_attributed: summary.fully_attributed,
        state: summary.state.as_str().to_string(),
    }
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
) -> Result<Json<AttributionsResponse>, ServerError> {
    let payment_id = parse_id(&payment_id, "payment")?;
    let attributions = state
        .engine
        .list_attributions(&caller, payment_id)
        .await?
        .into_iter()
        .map(map_attribution)
        .collect();
    let summary = state.engine.payment_summary(&caller, payment_id).await?;

    Ok(Json(AttributionsResponse {
        attributions,
        payment_summary: map_summary(summary),
    }))
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<AttributionNew>, ServerError>,
) -> Result<(StatusCode, Json<AttributionCreated>), ServerError> {
    let payment_id = parse_id(&payment_id, "payment")?;
    let income_event_id = parse_id(&payload.income_event_id, "income event")?;
    let attribution_type = payload
        .attribution_type
        .as_deref()
        .map(AttributionType::try_from)
        .transpose()?
        .unwrap_or(AttributionType::Manual);

    let created = state
        .engine
        .create_attribution(
            &caller,
            payment_id,
            income_event_id,
            Money::from_major(payload.amount)?,
            attribution_type,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AttributionCreated {
            message: "Attribution created".to_string(),
            attribution: map_attribution(created.attribution),
            updated_income_event: map_income_event(created.income_event),
            payment_summary: map_summary(created.summary),
        }),
    ))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path((payment_id, attribution_id)): Path<(String, String)>,
) -> Result<Json<PaymentSummaryView>, ServerError> {
    let payment_id = parse_id(&payment_id, "payment")?;
    let attribution_id = parse_id(&attribution_id, "attribution")?;
    let summary = state
        .engine
        .delete_attribution(&caller, payment_id, attribution_id)
        .await?;

    Ok(Json(map_summary(summary)))
}

pub async fn auto_attribute(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<AutoAttributeRequest>, ServerError>,
) -> Result<Json<AutoAttributeResponse>, ServerError> {
    let payment_id = parse_id(&payment_id, "payment")?;
    let strategy = payload
        .strategy
        .as_deref()
        .map(AutoAttributeStrategy::try_from)
        .transpose()?
        .unwrap_or_default();
    let preferred = payload
        .preferred_income_event_ids
        .map(|ids| {
            ids.iter()
                .map(|id| parse_id(id, "income event"))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let outcome = state
        .engine
        .auto_attribute(&caller, payment_id, strategy, preferred)
        .await?;
    let message = if outcome.remaining_amount.is_zero() {
        format!("Payment fully attributed using {} strategy", strategy.as_str())
    } else {
        format!(
            "Payment partially attributed using {} strategy, {} remaining",
            strategy.as_str(),
            outcome.remaining_amount
        )
    };

    Ok(Json(AutoAttributeResponse {
        message,
        attributions: outcome
            .attributions
            .into_iter()
            .map(map_attribution)
            .collect(),
        total_attributed: outcome.total_attributed.to_major(),
        remaining_amount: outcome.remaining_amount.to_major(),
        payment_summary: map_summary(outcome.summary),
    }))
}
