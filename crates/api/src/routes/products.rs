//! Product minting, manufacturing and traceability endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Address, Money, ProductId};
use domain::{ComponentEdge, ComponentSpec, NewProduct, Product};
use ledger_store::LedgerStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub creator: Address,
    #[serde(flatten)]
    pub product: NewProduct,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufactureRequest {
    pub creator: Address,
    #[serde(flatten)]
    pub product: NewProduct,
    pub components: Vec<ComponentSpec>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_hash: String,
    pub quantity: u64,
    pub price_per_unit: Money,
    pub is_manufactured: bool,
    pub components: Vec<ComponentEdge>,
    pub original_creator: Address,
    pub current_owner: Option<Address>,
    pub ownership_history: Vec<Address>,
    pub created_time: Option<DateTime<Utc>>,
    pub derived_from: Option<ProductId>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id(),
            name: product.name().to_string(),
            description: product.description().to_string(),
            image_hash: product.image_hash().to_string(),
            quantity: product.quantity(),
            price_per_unit: product.price_per_unit(),
            is_manufactured: product.is_manufactured(),
            components: product.components().to_vec(),
            original_creator: product.original_creator().clone(),
            current_owner: product.current_owner().cloned(),
            ownership_history: product.ownership_history().to_vec(),
            created_time: product.created_time(),
            derived_from: product.derived_from(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityResponse {
    pub product_id: ProductId,
    pub ancestors: Vec<Address>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub product_id: ProductId,
    pub components: Vec<ComponentEdge>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescendantsResponse {
    pub product_id: ProductId,
    pub descendants: Vec<ProductId>,
}

// -- Handlers --

/// POST /products: mint a raw product.
#[tracing::instrument(skip(state, req), fields(creator = %req.creator))]
pub async fn mint<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MintRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.products.mint(req.product, &req.creator).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// POST /products/manufacture: build a product from existing components.
#[tracing::instrument(skip(state, req), fields(creator = %req.creator))]
pub async fn manufacture<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ManufactureRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .products
        .manufacture(req.product, req.components, &req.creator)
        .await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.products.require(ProductId::new(id)).await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// GET /products/{id}/traceability: every identity that contributed to the product.
#[tracing::instrument(skip(state))]
pub async fn traceability<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<TraceabilityResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let ancestors = state.trace.ancestors(product_id).await?;
    Ok(Json(TraceabilityResponse {
        product_id,
        ancestors,
    }))
}

/// GET /products/{id}/tree: direct composition edges.
#[tracing::instrument(skip(state))]
pub async fn tree<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<TreeResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let components = state.trace.composition_tree(product_id).await?;
    Ok(Json(TreeResponse {
        product_id,
        components,
    }))
}

/// GET /products/{id}/descendants: products built from or split off this one.
#[tracing::instrument(skip(state))]
pub async fn descendants<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<DescendantsResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let descendants = state.trace.descendants(product_id).await?;
    Ok(Json(DescendantsResponse {
        product_id,
        descendants,
    }))
}
