//! Routes for placing orders and following them through delivery.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    db::models::apporder::{AppOrder, AppOrderSearchParameters, AppOrderStatus},
    middleware::session::session_middleware,
    services::{
        orders::{
            self,
            errors::{OrderPlacementError, OrderRetrievalError, OrderUpdateError},
            AppOrderWithItems,
        },
        sessions::{
            AdministratorSession, CustomerSession, GenericAuthenticatedSession, SessionTrait as _,
        },
    },
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router(state: &AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/", post(place_order))
        .route("/{order_id}/cancel", post(cancel_order))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<CustomerSession>,
        ));
    let administrator = Router::new()
        .route("/{order_id}/status", put(update_status))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ));
    let authenticated = Router::new()
        .route("/", get(search_orders))
        .route("/{order_id}", get(retrieve_order))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<GenericAuthenticatedSession>,
        ));
    customer.merge(administrator).merge(authenticated)
}

async fn place_order(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
    Json(body): Json<orders::OrderRequest>,
) -> Result<(StatusCode, Json<AppOrderWithItems>), HttpError> {
    Ok((
        StatusCode::CREATED,
        Json(orders::place_order(session.user_id(), body, &state.db).await?),
    ))
}

#[derive(Deserialize)]
struct OrderSearchQuery {
    status: Option<AppOrderStatus>,
}

#[derive(Serialize)]
struct OrderSearchResponse {
    orders: Vec<AppOrder>,
}

/// Customers see their own orders; administrators see everyone's.
async fn search_orders(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Query(query): Query<OrderSearchQuery>,
) -> Result<Json<OrderSearchResponse>, HttpError> {
    let params = AppOrderSearchParameters {
        user_id: (!session.is_admin()).then(|| session.user_id()),
        status: query.status,
    };
    Ok(Json(OrderSearchResponse {
        orders: orders::search_orders(params, &state.db).await?,
    }))
}

async fn retrieve_order(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<AppOrderWithItems>, HttpError> {
    let customer = (!session.is_admin()).then(|| session.user_id());
    Ok(Json(
        orders::retrieve_order(order_id, customer, &state.db)
            .await
            .inspect_err(|err| {
                if matches!(err, OrderRetrievalError::Forbidden(_)) {
                    warn!(user_id = %session.user_id(), %order_id, "Customer attempted to view another order");
                }
            })?,
    ))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<AppOrder>, HttpError> {
    Ok(Json(
        orders::cancel_order(session.user_id(), order_id, &state.db).await?,
    ))
}

async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<orders::StatusUpdate>,
) -> Result<Json<AppOrder>, HttpError> {
    Ok(Json(
        orders::update_status(order_id, body, &state.db).await?,
    ))
}

impl From<OrderPlacementError> for HttpError {
    fn from(error: OrderPlacementError) -> Self {
        match error {
            OrderPlacementError::DatabaseError(err) => err.into(),
            OrderPlacementError::UserNonExistent(_) => StatusCode::UNAUTHORIZED.into(),
            err @ (OrderPlacementError::CartEmpty
            | OrderPlacementError::AddressMissing
            | OrderPlacementError::CostTooLarge) => {
                Self::new(StatusCode::BAD_REQUEST, Some(err.to_string()))
            }
            err @ OrderPlacementError::ItemUnavailable(..) => {
                Self::new(StatusCode::CONFLICT, Some(err.to_string()))
            }
        }
    }
}

impl From<OrderRetrievalError> for HttpError {
    fn from(error: OrderRetrievalError) -> Self {
        match error {
            OrderRetrievalError::DatabaseError(err) => err.into(),
            OrderRetrievalError::NonExistent(_) => {
                Self::with_message(StatusCode::NOT_FOUND, "Order not found")
            }
            OrderRetrievalError::Forbidden(_) => StatusCode::FORBIDDEN.into(),
        }
    }
}

impl From<OrderUpdateError> for HttpError {
    fn from(error: OrderUpdateError) -> Self {
        match error {
            OrderUpdateError::DatabaseError(err) => err.into(),
            OrderUpdateError::NonExistent(_) => {
                Self::with_message(StatusCode::NOT_FOUND, "Order not found")
            }
            OrderUpdateError::Forbidden(_) => StatusCode::FORBIDDEN.into(),
            err @ OrderUpdateError::InvalidTransition(..) => {
                Self::new(StatusCode::CONFLICT, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cart_is_a_bad_request() {
        let err = HttpError::from(OrderPlacementError::CartEmpty);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_items_conflict() {
        let err = HttpError::from(OrderPlacementError::ItemUnavailable(
            Uuid::new_v4(),
            String::from("Paneer Tikka"),
        ));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn foreign_orders_are_forbidden() {
        let err = HttpError::from(OrderRetrievalError::Forbidden(Uuid::new_v4()));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_transitions_conflict() {
        let err = HttpError::from(OrderUpdateError::InvalidTransition(
            AppOrderStatus::Delivered,
            AppOrderStatus::Cancelled,
        ));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
