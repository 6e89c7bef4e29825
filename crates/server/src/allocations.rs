//! Budget allocation API endpoints.

use api_types::allocation::{
    AllocationTemplateView, AllocationUpdate, AllocationView, AllocationsDeleted,
    AllocationsResponse, GenerateAllocations, TemplateShare, TemplatesResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{ALLOCATION_TEMPLATES, AllocationSource, Caller, Money, Percentage, TemplateShares};

use crate::{ServerError, parse_id, server::ServerState};

fn map_allocation(allocation: engine::BudgetAllocation) -> AllocationView {
    AllocationView {
        id: allocation.id,
        income_event_id: allocation.income_event_id,
        budget_category_id: allocation.budget_category_id,
        amount: allocation.amount.to_major(),
        percentage: allocation.percentage.to_percent(),
        created_at: allocation.created_at,
    }
}

fn map_allocations(allocations: Vec<engine::BudgetAllocation>) -> AllocationsResponse {
    let total_amount: Money = allocations.iter().map(|a| a.amount).sum();
    let total_percentage: Percentage = allocations.iter().map(|a| a.percentage).sum();
    AllocationsResponse {
        allocations: allocations.into_iter().map(map_allocation).collect(),
        total_amount: total_amount.to_major(),
        total_percentage: total_percentage.to_percent(),
    }
}

fn allocation_source(payload: GenerateAllocations) -> Result<AllocationSource, ServerError> {
    match (payload.template_id, payload.custom_allocations) {
        (Some(template_id), None) => Ok(AllocationSource::Template(template_id)),
        (None, Some(custom)) => {
            let pairs = custom
                .into_iter()
                .map(|entry| {
                    Ok((
                        parse_id(&entry.budget_category_id, "budget category")?,
                        Percentage::from_percent(entry.percentage)?,
                    ))
                })
                .collect::<Result<Vec<_>, ServerError>>()?;
            Ok(AllocationSource::Custom(pairs))
        }
        (Some(_), Some(_)) => Err(ServerError::Generic(
            "provide either templateId or customAllocations, not both".to_string(),
        )),
        (None, None) => Err(ServerError::Generic(
            "templateId or customAllocations required".to_string(),
        )),
    }
}

pub async fn templates() -> Json<TemplatesResponse> {
    let templates = ALLOCATION_TEMPLATES
        .iter()
        .map(|template| AllocationTemplateView {
            id: template.id.to_string(),
            name: template.name.to_string(),
            description: template.description.to_string(),
            allocations: template
                .fixed_shares()
                .unwrap_or_default()
                .into_iter()
                .map(|(name, percentage)| TemplateShare {
                    category_name: name.to_string(),
                    percentage: percentage.to_percent(),
                })
                .collect(),
            even_split: template.shares == TemplateShares::EvenSplit,
        })
        .collect();

    Json(TemplatesResponse { templates })
}

/// Lists the allocations of one income event.
pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(income_event_id): Path<String>,
) -> Result<Json<AllocationsResponse>, ServerError> {
    let income_event_id = parse_id(&income_event_id, "income event")?;
    let allocations = state
        .engine
        .list_allocations(&caller, income_event_id)
        .await?;

    Ok(Json(map_allocations(allocations)))
}

pub async fn generate(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(income_event_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<GenerateAllocations>, ServerError>,
) -> Result<(StatusCode, Json<AllocationsResponse>), ServerError> {
    let income_event_id = parse_id(&income_event_id, "income event")?;
    let source = allocation_source(payload)?;
    let generated = state
        .engine
        .generate_allocations(&caller, income_event_id, source)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AllocationsResponse {
            allocations: generated
                .allocations
                .into_iter()
                .map(map_allocation)
                .collect(),
            total_amount: generated.total_amount.to_major(),
            total_percentage: generated.total_percentage.to_percent(),
        }),
    ))
}

/// Edits one allocation, addressed by its own id.
pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(allocation_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<AllocationUpdate>, ServerError>,
) -> Result<Json<AllocationView>, ServerError> {
    let allocation_id = parse_id(&allocation_id, "allocation")?;
    let update = match (payload.amount, payload.percentage) {
        (Some(amount), None) => engine::AllocationUpdate::Amount(Money::from_major(amount)?),
        (None, Some(percentage)) => {
            engine::AllocationUpdate::Percentage(Percentage::from_percent(percentage)?)
        }
        _ => {
            return Err(ServerError::Generic(
                "provide exactly one of amount or percentage".to_string(),
            ));
        }
    };
    let allocation = state
        .engine
        .update_allocation(&caller, allocation_id, update)
        .await?;

    Ok(Json(map_allocation(allocation)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(income_event_id): Path<String>,
) -> Result<Json<AllocationsDeleted>, ServerError> {
    let income_event_id = parse_id(&income_event_id, "income event")?;
    let deleted = state
        .engine
        .delete_allocations(&caller, income_event_id)
        .await?;

    Ok(Json(AllocationsDeleted { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_types::allocation::CustomAllocation;

    #[test]
    fn source_requires_exactly_one_input() {
        assert!(matches!(
            allocation_source(GenerateAllocations::default()),
            Err(ServerError::Generic(_))
        ));
        assert!(matches!(
            allocation_source(GenerateAllocations {
                template_id: Some("even_split".to_string()),
                custom_allocations: Some(Vec::new()),
            }),
            Err(ServerError::Generic(_))
        ));
        assert_eq!(
            allocation_source(GenerateAllocations {
                template_id: Some("even_split".to_string()),
                custom_allocations: None,
            })
            .unwrap_or(AllocationSource::Custom(Vec::new())),
            AllocationSource::Template("even_split".to_string())
        );
    }

    #[test]
    fn custom_ids_are_validated() {
        let payload = GenerateAllocations {
            template_id: None,
            custom_allocations: Some(vec![CustomAllocation {
                budget_category_id: "not-a-uuid".to_string(),
                percentage: 50.0,
            }]),
        };
        assert!(matches!(
            allocation_source(payload),
            Err(ServerError::Engine(engine::EngineError::InvalidId(_)))
        ));
    }
}
