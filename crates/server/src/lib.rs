use api_types::error::ErrorBody;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::EngineError;
use uuid::Uuid;

pub use server::{router, run_with_listener, spawn_with_listener};

mod allocations;
mod attributions;
mod categories;
mod income_events;
mod payments;
mod reports;
mod server;

pub mod types {
    pub mod income_event {
        pub use api_types::income_event::{
            IncomeEventNew, IncomeEventReceive, IncomeEventUpdate, IncomeEventView,
            IncomeEventsResponse,
        };
    }

    pub mod category {
        pub use api_types::category::{
            BudgetCategoriesResponse, BudgetCategoryNew, BudgetCategoryUpdate, BudgetCategoryView,
            SpendingCategoriesResponse, SpendingCategoryNew, SpendingCategoryView,
        };
    }

    pub mod allocation {
        pub use api_types::allocation::{
            AllocationUpdate, AllocationView, AllocationsResponse, CustomAllocation,
            GenerateAllocations, TemplatesResponse,
        };
    }

    pub mod payment {
        pub use api_types::payment::{PaymentNew, PaymentStatusUpdate, PaymentView, PaymentsResponse};
    }

    pub mod attribution {
        pub use api_types::attribution::{
            AttributionCreated, AttributionNew, AttributionsResponse, AutoAttributeRequest,
            AutoAttributeResponse, PaymentSummaryView,
        };
    }

    pub mod report {
        pub use api_types::report::{BudgetPerformance, CashFlowReport, SavingsRate, SpendingReport};
    }

    pub use api_types::error::ErrorBody;
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Malformed request that never reached the engine.
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::AllocationsAlreadyExist(_)
        | EngineError::AttributionAlreadyExists { .. } => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidId(_)
        | EngineError::InvalidRequest(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidPercentage(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidRole(_)
        | EngineError::InsufficientIncomeRemaining { .. }
        | EngineError::AttributionExceedsPayment { .. }
        | EngineError::InsufficientAvailableIncome(_) => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

fn body_for_engine_error(err: EngineError, status: StatusCode) -> ErrorBody {
    let mut body = ErrorBody {
        error: err.code().to_string(),
        code: Some(status.as_u16()),
        ..Default::default()
    };
    match &err {
        EngineError::InsufficientIncomeRemaining {
            available,
            requested,
        } => {
            body.available_amount = Some(available.to_major());
            body.requested_amount = Some(requested.to_major());
        }
        EngineError::AttributionExceedsPayment {
            payment_amount,
            currently_attributed,
            available,
            requested,
        } => {
            body.payment_amount = Some(payment_amount.to_major());
            body.currently_attributed = Some(currently_attributed.to_major());
            body.available_amount = Some(available.to_major());
            body.requested_amount = Some(requested.to_major());
        }
        _ => {}
    }
    body.message = message_for_engine_error(err);
    body
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => {
                let status = status_for_engine_error(&err);
                (status, body_for_engine_error(err, status))
            }
            ServerError::Generic(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_request".to_string(),
                    message,
                    code: Some(StatusCode::BAD_REQUEST.as_u16()),
                    ..Default::default()
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

/// Parses an identifier taken from a path segment or a request body.
pub(crate) fn parse_id(raw: &str, label: &str) -> Result<Uuid, ServerError> {
    Ok(engine::parse_uuid(raw, label)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Money;
    use http_body_util::BodyExt;

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn engine_unauthorized_maps_to_401() {
        let res =
            ServerError::from(EngineError::Unauthorized("token".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicts_map_to_409() {
        for err in [
            EngineError::ExistingKey("x".to_string()),
            EngineError::AllocationsAlreadyExist("x".to_string()),
            EngineError::AttributionAlreadyExists {
                payment_id: "p".to_string(),
                income_event_id: "i".to_string(),
            },
        ] {
            assert_eq!(ServerError::from(err).into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn validation_and_malformed_ids_map_to_400() {
        for err in [
            EngineError::InvalidId("x".to_string()),
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidPercentage("x".to_string()),
            EngineError::InsufficientAvailableIncome("x".to_string()),
        ] {
            assert_eq!(ServerError::from(err).into_response().status(), StatusCode::BAD_REQUEST);
        }
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ledger_violations_carry_amounts() {
        let res = ServerError::from(EngineError::AttributionExceedsPayment {
            payment_amount: Money::new(120_000),
            currently_attributed: Money::new(100_000),
            available: Money::new(20_000),
            requested: Money::new(50_000),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = body_json(res).await;
        assert_eq!(body["error"], "attribution_exceeds_payment_amount");
        assert_eq!(body["code"], 400);
        assert_eq!(body["availableAmount"], 200.0);
        assert_eq!(body["requestedAmount"], 500.0);
        assert_eq!(body["paymentAmount"], 1200.0);
        assert_eq!(body["currentlyAttributed"], 1000.0);
    }

    #[tokio::test]
    async fn database_errors_are_masked() {
        let res = ServerError::from(EngineError::Database(sea_orm::DbErr::Custom(
            "disk on fire".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body["message"], "internal server error");
        assert!(body.get("availableAmount").is_none());
    }
}
