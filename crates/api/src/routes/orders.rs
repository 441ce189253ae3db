//! Order placement, delivery milestone and deadline endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Address, Money, OrderId, ProductId};
use domain::{DeliveryEvent, Order, OrderStatus, OrderType};
use ledger_store::LedgerStore;
use lifecycle::{DeadlineExceeded, EventOutcome, NewOrder, OrderSubject};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::companies::CompanyResponse;
use crate::routes::products::ProductResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub buyer: Address,
    pub seller: Address,
    pub order_type: OrderType,

    /// The product sold, or the product a partial quantity is split from.
    pub product_id: u64,

    /// Required for partial orders; a full order sells the whole product.
    pub quantity: Option<u64>,
    pub unit_price: Money,
    #[serde(default)]
    pub notes: String,
    pub approval_deadline: DateTime<Utc>,
    pub payment_deadline: DateTime<Utc>,
    pub listing_id: Option<String>,
}

impl CreateOrderRequest {
    fn into_new_order(self) -> Result<NewOrder, ApiError> {
        let product_id = ProductId::new(self.product_id);
        let subject = match (self.order_type, self.quantity) {
            (OrderType::FullProduct, _) => OrderSubject::FullProduct { product_id },
            (OrderType::PartialQuantity, Some(quantity)) => OrderSubject::PartialQuantity {
                original_product_id: product_id,
                quantity,
            },
            (OrderType::PartialQuantity, None) => {
                return Err(ApiError::BadRequest(
                    "quantity is required for partial_quantity orders".to_string(),
                ));
            }
        };

        Ok(NewOrder {
            buyer: self.buyer,
            seller: self.seller,
            subject,
            unit_price: self.unit_price,
            notes: self.notes,
            approval_deadline: self.approval_deadline,
            payment_deadline: self.payment_deadline,
            listing_id: self.listing_id,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    pub status: String,
    #[serde(default)]
    pub description: String,
    pub updated_by: Address,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub buyer: Address,
    pub seller: Address,
    pub product_id: ProductId,
    pub quantity: u64,
    pub unit_price: Money,
    pub total_price: Money,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub progress: u8,
    pub created_at: Option<DateTime<Utc>>,
    pub approval_deadline: Option<DateTime<Utc>>,
    pub payment_deadline: Option<DateTime<Utc>>,
    pub notes: String,
    pub delivery_events: Vec<DeliveryEvent>,
    pub is_partial_transfer: bool,
    pub original_product_id: Option<ProductId>,
    pub listing_id: Option<String>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            buyer: order.buyer().clone(),
            seller: order.seller().clone(),
            product_id: order.product_id(),
            quantity: order.quantity(),
            unit_price: order.unit_price(),
            total_price: order.total_price(),
            order_type: order.order_type(),
            status: order.status(),
            progress: order.status().progress(),
            created_at: order.created_at(),
            approval_deadline: order.approval_deadline(),
            payment_deadline: order.payment_deadline(),
            notes: order.notes().to_string(),
            delivery_events: order.delivery_events().to_vec(),
            is_partial_transfer: order.is_partial_transfer(),
            original_product_id: order.original_product_id(),
            listing_id: order.listing_id().map(String::from),
        }
    }
}

/// Result of recording an event or checking deadlines.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    /// `recorded`, `expired` or `unchanged`.
    pub outcome: &'static str,
    pub order: OrderResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_exceeded: Option<DeadlineExceeded>,
}

impl From<EventOutcome> for OutcomeResponse {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Recorded(order) => Self {
                outcome: "recorded",
                order: OrderResponse::from(&order),
                deadline_exceeded: None,
            },
            EventOutcome::Expired(exceeded, order) => Self {
                outcome: "expired",
                order: OrderResponse::from(&order),
                deadline_exceeded: Some(exceeded),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailsResponse {
    pub order: OrderResponse,
    pub product: Option<ProductResponse>,
    pub buyer: Option<CompanyResponse>,
    pub seller: Option<CompanyResponse>,
}

// -- Handlers --

/// POST /orders: place an order.
#[tracing::instrument(skip(state, req), fields(buyer = %req.buyer, seller = %req.seller))]
pub async fn create<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.lifecycle.create_order(req.into_new_order()?).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.lifecycle.get_order(OrderId::new(id)).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/{id}/history: delivery milestones, oldest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<DeliveryEvent>>, ApiError> {
    let history = state
        .lifecycle
        .get_delivery_history(OrderId::new(id))
        .await?;
    Ok(Json(history))
}

/// GET /orders/{id}/details: the order with its product and parties.
#[tracing::instrument(skip(state))]
pub async fn details<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let details = state.lifecycle.order_details(OrderId::new(id)).await?;
    Ok(Json(OrderDetailsResponse {
        order: OrderResponse::from(&details.order),
        product: details.product.as_ref().map(ProductResponse::from),
        buyer: details.buyer.as_ref().map(CompanyResponse::from),
        seller: details.seller.as_ref().map(CompanyResponse::from),
    }))
}

/// POST /orders/{id}/events: record the next delivery milestone.
#[tracing::instrument(skip(state, req), fields(status = %req.status, updated_by = %req.updated_by))]
pub async fn record_event<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
    Json(req): Json<RecordEventRequest>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let status: OrderStatus = req.status.parse().map_err(ApiError::BadRequest)?;
    let outcome = state
        .lifecycle
        .record_event(OrderId::new(id), status, &req.description, &req.updated_by)
        .await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// POST /orders/{id}/deadlines: expire the order if a deadline has passed.
#[tracing::instrument(skip(state))]
pub async fn check_deadlines<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<u64>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let order_id = OrderId::new(id);
    match state.lifecycle.check_deadlines(order_id).await? {
        Some(outcome) => Ok(Json(OutcomeResponse::from(outcome))),
        None => {
            let order = state.lifecycle.get_order(order_id).await?;
            Ok(Json(OutcomeResponse {
                outcome: "unchanged",
                order: OrderResponse::from(&order),
                deadline_exceeded: None,
            }))
        }
    }
}
