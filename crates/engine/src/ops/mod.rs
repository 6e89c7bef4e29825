use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use uuid::Uuid;

use crate::{EngineError, MemberRole, ResultEngine};

mod access;
mod allocations;
mod attributions;
mod categories;
mod families;
mod income_events;
mod ledger;
mod payments;
mod reports;

pub use allocations::{AllocationSource, AllocationUpdate, GeneratedAllocations};
pub use attributions::{
    AttributionCreated, AttributionState, AutoAttributeStrategy, AutoAttribution, PaymentSummary,
};
pub use categories::{BudgetCategoryNew, BudgetCategoryUpdate};
pub use income_events::{IncomeEventFilter, IncomeEventNew, IncomeEventUpdate};
pub use payments::{PaymentFilter, PaymentNew};
pub use reports::{
    BudgetPerformanceLine, BudgetPerformanceReport, CashFlowMonth, CashFlowReport, DateRange,
    SavingsRate, SpendingLine, SpendingReport,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// An early `?` inside the block drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The authenticated member on whose behalf an operation runs.
///
/// Every family-scoped operation takes a `Caller`; the family id it carries
/// is the tenancy boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub member_id: Uuid,
    pub family_id: Uuid,
    pub username: String,
    pub role: MemberRole,
}

impl Caller {
    pub(crate) fn require_write(&self) -> ResultEngine<()> {
        if !self.role.can_write() {
            return Err(EngineError::Forbidden(format!(
                "member '{}' has read-only access",
                self.username
            )));
        }
        Ok(())
    }

    pub(crate) fn require_admin(&self) -> ResultEngine<()> {
        if self.role != MemberRole::Admin {
            return Err(EngineError::Forbidden(format!(
                "member '{}' is not a family admin",
                self.username
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// `true` when the database rejected a write because of a unique index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
