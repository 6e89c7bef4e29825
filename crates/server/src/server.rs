use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{ServerError, allocations, attributions, categories, income_events, payments, reports};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves the bearer token into an [`engine::Caller`] request extension.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(EngineError::Unauthorized("missing bearer token".to_string()).into());
    };

    let caller = state.engine.authenticate(bearer.token()).await?;
    tracing::debug!(member = %caller.username, "request authenticated");

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route(
            "/api/income-events",
            get(income_events::list).post(income_events::create),
        )
        .route(
            "/api/income-events/{id}",
            get(income_events::get)
                .put(income_events::update)
                .delete(income_events::delete),
        )
        .route("/api/income-events/{id}/receive", post(income_events::receive))
        .route("/api/income-events/{id}/cancel", post(income_events::cancel))
        .route(
            "/api/budget-categories",
            get(categories::list_budget).post(categories::create_budget),
        )
        .route(
            "/api/budget-categories/{id}",
            put(categories::update_budget).delete(categories::deactivate_budget),
        )
        .route(
            "/api/spending-categories",
            get(categories::list_spending).post(categories::create_spending),
        )
        .route("/api/budget-allocations/templates", get(allocations::templates))
        .route(
            "/api/budget-allocations/{id}",
            get(allocations::list)
                .put(allocations::update)
                .delete(allocations::delete),
        )
        .route(
            "/api/budget-allocations/{id}/generate",
            post(allocations::generate),
        )
        .route("/api/payments", get(payments::list).post(payments::create))
        .route(
            "/api/payments/{id}",
            get(payments::get).delete(payments::delete),
        )
        .route("/api/payments/{id}/status", put(payments::update_status))
        .route(
            "/api/payments/{id}/attributions",
            get(attributions::list).post(attributions::create),
        )
        .route(
            "/api/payments/{id}/attributions/{attribution_id}",
            axum::routing::delete(attributions::delete),
        )
        .route(
            "/api/payments/{id}/auto-attribute",
            post(attributions::auto_attribute),
        )
        .route("/api/reports/cash-flow", get(reports::cash_flow))
        .route("/api/reports/spending", get(reports::spending))
        .route("/api/reports/savings-rate", get(reports::savings_rate))
        .route(
            "/api/reports/budget-performance",
            get(reports::budget_performance),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
