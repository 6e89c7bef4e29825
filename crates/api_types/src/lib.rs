//! Wire types of the HTTP API.
//!
//! JSON field names are camelCase. Money is a number in major units
//! (`12.34`), percentages are numbers between 0 and 100. Identifiers in
//! request bodies are strings so that malformed ones can be reported with a
//! precise message.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod income_event {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventNew {
        pub name: String,
        pub amount: f64,
        pub scheduled_date: NaiveDate,
        /// `once` (default), `weekly`, `biweekly`, `monthly`, `quarterly`, `annual`.
        pub frequency: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventUpdate {
        pub name: Option<String>,
        pub amount: Option<f64>,
        pub scheduled_date: Option<NaiveDate>,
        pub frequency: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventReceive {
        pub actual_date: Option<NaiveDate>,
    }

    /// Query string of `GET /api/income-events`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventQuery {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventView {
        pub id: Uuid,
        pub name: String,
        pub amount: f64,
        pub scheduled_date: NaiveDate,
        pub actual_date: Option<NaiveDate>,
        pub frequency: String,
        pub status: String,
        pub allocated_amount: f64,
        pub remaining_amount: f64,
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeEventsResponse {
        pub income_events: Vec<IncomeEventView>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetCategoryNew {
        pub name: String,
        pub target_percentage: f64,
        /// `#RRGGBB`
        pub color: Option<String>,
        pub sort_order: Option<i32>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetCategoryUpdate {
        pub name: Option<String>,
        pub target_percentage: Option<f64>,
        pub color: Option<String>,
        pub sort_order: Option<i32>,
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetCategoryQuery {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetCategoryView {
        pub id: Uuid,
        pub name: String,
        pub target_percentage: f64,
        pub color: String,
        pub sort_order: i32,
        pub is_active: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetCategoriesResponse {
        pub categories: Vec<BudgetCategoryView>,
        /// Sum of the active targets.
        pub total_target_percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpendingCategoryNew {
        pub name: String,
        pub budget_category_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpendingCategoryView {
        pub id: Uuid,
        pub name: String,
        pub budget_category_id: Option<Uuid>,
        pub is_active: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpendingCategoriesResponse {
        pub categories: Vec<SpendingCategoryView>,
    }
}

pub mod allocation {
    use super::*;

    /// Exactly one of `template_id` and `custom_allocations` must be set.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerateAllocations {
        pub template_id: Option<String>,
        pub custom_allocations: Option<Vec<CustomAllocation>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CustomAllocation {
        pub budget_category_id: String,
        pub percentage: f64,
    }

    /// Exactly one of `amount` and `percentage` must be set.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationUpdate {
        pub amount: Option<f64>,
        pub percentage: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationView {
        pub id: Uuid,
        pub income_event_id: Uuid,
        pub budget_category_id: Uuid,
        pub amount: f64,
        pub percentage: f64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationsResponse {
        pub allocations: Vec<AllocationView>,
        pub total_amount: f64,
        pub total_percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationsDeleted {
        pub deleted: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplateShare {
        pub category_name: String,
        pub percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationTemplateView {
        pub id: String,
        pub name: String,
        pub description: String,
        /// Empty for templates that split evenly across active categories.
        pub allocations: Vec<TemplateShare>,
        pub even_split: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplatesResponse {
        pub templates: Vec<AllocationTemplateView>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentNew {
        pub payee: String,
        pub amount: f64,
        pub due_date: NaiveDate,
        /// `once` (default) or `recurring`.
        pub payment_type: Option<String>,
        pub spending_category_id: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentStatusUpdate {
        /// `paid` or `cancelled`.
        pub status: String,
        pub paid_date: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentQuery {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentView {
        pub id: Uuid,
        pub payee: String,
        pub amount: f64,
        pub due_date: NaiveDate,
        pub paid_date: Option<NaiveDate>,
        pub payment_type: String,
        pub status: String,
        pub spending_category_id: Option<Uuid>,
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentsResponse {
        pub payments: Vec<PaymentView>,
    }
}

pub mod attribution {
    use super::*;
    use crate::income_event::IncomeEventView;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttributionNew {
        pub income_event_id: String,
        pub amount: f64,
        /// `manual` (default) or `automatic`.
        pub attribution_type: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AutoAttributeRequest {
        /// `default`, `earliest_income`, `latest_income` or `proportional`.
        pub strategy: Option<String>,
        pub preferred_income_event_ids: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttributionView {
        pub id: Uuid,
        pub payment_id: Uuid,
        pub income_event_id: Uuid,
        pub amount: f64,
        pub attribution_type: String,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentSummaryView {
        pub payment_amount: f64,
        pub total_attributed: f64,
        pub remaining_amount: f64,
        pub fully_attributed: bool,
        /// `unattributed`, `partially_attributed` or `fully_attributed`.
        pub state: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttributionCreated {
        pub message: String,
        pub attribution: AttributionView,
        pub updated_income_event: IncomeEventView,
        pub payment_summary: PaymentSummaryView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AutoAttributeResponse {
        pub message: String,
        pub attributions: Vec<AttributionView>,
        pub total_attributed: f64,
        pub remaining_amount: f64,
        pub payment_summary: PaymentSummaryView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttributionsResponse {
        pub attributions: Vec<AttributionView>,
        pub payment_summary: PaymentSummaryView,
    }
}

pub mod report {
    use super::*;

    /// Inclusive date range of every report endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportQuery {
        pub from: NaiveDate,
        pub to: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CashFlowMonth {
        pub month: String,
        pub income: f64,
        pub expenses: f64,
        pub net: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CashFlowReport {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub months: Vec<CashFlowMonth>,
        pub total_income: f64,
        pub total_expenses: f64,
        pub net: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpendingLine {
        pub spending_category_id: Option<Uuid>,
        pub name: String,
        pub total: f64,
        pub percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpendingReport {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub total: f64,
        pub categories: Vec<SpendingLine>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SavingsRate {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub income: f64,
        pub expenses: f64,
        pub savings: f64,
        pub savings_rate: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetPerformanceLine {
        pub budget_category_id: Uuid,
        pub name: String,
        pub target_percentage: f64,
        pub allocated: f64,
        pub spent: f64,
        pub variance: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetPerformance {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub categories: Vec<BudgetPerformanceLine>,
        pub total_allocated: f64,
        pub total_spent: f64,
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    ///
    /// The amount fields are only present for ledger rule violations.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ErrorBody {
        pub error: String,
        pub message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub available_amount: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub requested_amount: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub payment_amount: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub currently_attributed: Option<f64>,
    }
}
