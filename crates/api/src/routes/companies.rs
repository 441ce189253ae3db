//! Company onboarding and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Address, CompanyId};
use domain::{Company, DomainError};
use ledger_store::LedgerStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterCompanyRequest {
    pub name: String,
    pub address: Address,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: CompanyId,
    pub name: String,
    pub address: Address,
    pub is_active: bool,
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<&Company> for CompanyResponse {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id(),
            name: company.name().to_string(),
            address: company.address().clone(),
            is_active: company.is_active(),
            registered_at: company.registered_at(),
        }
    }
}

/// POST /companies: onboard a company under its address.
#[tracing::instrument(skip(state, req), fields(address = %req.address))]
pub async fn register<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>), ApiError> {
    let company = state.registry.register(&req.name, &req.address).await?;
    Ok((StatusCode::CREATED, Json(CompanyResponse::from(&company))))
}

/// GET /companies/{address}: look up a company by address.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(address): Path<String>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company = state.registry.require(&Address::new(address)).await?;
    Ok(Json(CompanyResponse::from(&company)))
}

/// GET /companies/id/{id}: look up a company by its integer id.
#[tracing::instrument(skip(state))]
pub async fn get_by_id<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company = state
        .registry
        .lookup_by_id(CompanyId::new(id))
        .await?
        .ok_or_else(|| DomainError::CompanyNotFound {
            company: format!("#{id}"),
        })?;
    Ok(Json(CompanyResponse::from(&company)))
}

/// POST /companies/{address}/deactivate: deactivate a company.
#[tracing::instrument(skip(state))]
pub async fn deactivate<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(address): Path<String>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company = state.registry.deactivate(&Address::new(address)).await?;
    Ok(Json(CompanyResponse::from(&company)))
}
