pub use budget_allocations::BudgetAllocation;
pub use budget_categories::BudgetCategory;
pub use distribute::distribute_with_remainder;
pub use error::EngineError;
pub use families::Family;
pub use income_events::{Frequency, IncomeEvent, IncomeStatus};
pub use members::{Member, MemberRole};
pub use money::Money;
pub use ops::{
    AllocationSource, AllocationUpdate, AttributionCreated, AttributionState,
    AutoAttributeStrategy, AutoAttribution, BudgetCategoryNew, BudgetCategoryUpdate,
    BudgetPerformanceLine, BudgetPerformanceReport, Caller, CashFlowMonth, CashFlowReport,
    DateRange, Engine, EngineBuilder, GeneratedAllocations, IncomeEventFilter, IncomeEventNew,
    IncomeEventUpdate, PaymentFilter, PaymentNew, PaymentSummary, SavingsRate, SpendingLine,
    SpendingReport,
};
pub use payment_attributions::{AttributionType, PaymentAttribution, SYSTEM_CREATOR};
pub use payments::{Payment, PaymentStatus, PaymentType};
pub use percentage::Percentage;
pub use spending_categories::SpendingCategory;
pub use templates::{ALLOCATION_TEMPLATES, AllocationTemplate, TemplateShares, find_template};
pub use util::parse_uuid;

mod api_tokens;
mod budget_allocations;
mod budget_categories;
mod distribute;
mod error;
mod families;
mod income_events;
mod members;
mod money;
mod ops;
mod payment_attributions;
mod payments;
mod percentage;
mod spending_categories;
mod templates;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
