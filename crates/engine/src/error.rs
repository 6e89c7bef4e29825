//! The module contains the errors the engine can throw.
//!
//! Most variants carry a human readable message. The business-rule
//! violations of the attribution ledger carry the numbers the caller needs
//! to correct the request:
//!
//! - [`InsufficientIncomeRemaining`] when an income event cannot fund the
//!   requested amount.
//! - [`AttributionExceedsPayment`] when a payment would be over-attributed.
//!
//!  [`InsufficientIncomeRemaining`]: EngineError::InsufficientIncomeRemaining
//!  [`AttributionExceedsPayment`]: EngineError::AttributionExceedsPayment
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Allocations already exist for income event {0}")]
    AllocationsAlreadyExist(String),
    #[error("Attribution already exists for payment {payment_id} and income event {income_event_id}")]
    AttributionAlreadyExists {
        payment_id: String,
        income_event_id: String,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid percentage: {0}")]
    InvalidPercentage(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Insufficient income remaining: available {available}, requested {requested}")]
    InsufficientIncomeRemaining { available: Money, requested: Money },
    #[error(
        "Attribution exceeds payment amount: payment {payment_amount}, attributed {currently_attributed}, available {available}, requested {requested}"
    )]
    AttributionExceedsPayment {
        payment_amount: Money,
        currently_attributed: Money,
        available: Money,
        requested: Money,
    },
    #[error("Insufficient available income: {0}")]
    InsufficientAvailableIncome(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::AllocationsAlreadyExist(a), Self::AllocationsAlreadyExist(b)) => a == b,
            (
                Self::AttributionAlreadyExists {
                    payment_id: p1,
                    income_event_id: i1,
                },
                Self::AttributionAlreadyExists {
                    payment_id: p2,
                    income_event_id: i2,
                },
            ) => p1 == p2 && i1 == i2,
            (Self::InvalidRequest(a), Self::InvalidRequest(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidPercentage(a), Self::InvalidPercentage(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (
                Self::InsufficientIncomeRemaining {
                    available: a1,
                    requested: r1,
                },
                Self::InsufficientIncomeRemaining {
                    available: a2,
                    requested: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (
                Self::AttributionExceedsPayment {
                    payment_amount: p1,
                    currently_attributed: c1,
                    available: a1,
                    requested: r1,
                },
                Self::AttributionExceedsPayment {
                    payment_amount: p2,
                    currently_attributed: c2,
                    available: a2,
                    requested: r2,
                },
            ) => p1 == p2 && c1 == c2 && a1 == a2 && r1 == r2,
            (Self::InsufficientAvailableIncome(a), Self::InsufficientAvailableIncome(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl EngineError {
    /// Stable machine readable token for the error class.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::KeyNotFound(_) => "not_found",
            Self::InvalidId(_) => "invalid_id",
            Self::ExistingKey(_) => "conflict",
            Self::AllocationsAlreadyExist(_) => "allocations_already_exist",
            Self::AttributionAlreadyExists { .. } => "attribution_already_exists",
            Self::InvalidRequest(_)
            | Self::InvalidAmount(_)
            | Self::InvalidPercentage(_)
            | Self::InvalidName(_)
            | Self::InvalidRole(_) => "invalid_request",
            Self::InsufficientIncomeRemaining { .. } => "insufficient_income_remaining",
            Self::AttributionExceedsPayment { .. } => "attribution_exceeds_payment_amount",
            Self::InsufficientAvailableIncome(_) => "insufficient_available_income",
            Self::Database(_) => "internal_error",
        }
    }
}
