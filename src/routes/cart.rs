//! Routes under /cart for managing a customer's cart.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    constants::orders::MAX_LINE_QUANTITY,
    middleware::session::session_middleware,
    services::{
        cart::{
            self,
            errors::{CartUpdateError, CartViewError, CostTooLarge},
            CartSummary,
        },
        sessions::{CustomerSession, SessionTrait as _},
    },
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route(
            "/items/{menu_item_id}",
            put(set_quantity).delete(remove_item),
        )
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<CustomerSession>,
        ))
}

async fn view_cart(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
) -> Result<Json<CartSummary>, HttpError> {
    Ok(Json(cart::view_cart(session.user_id(), &state.db).await?))
}

async fn add_item(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
    Json(body): Json<cart::AddCartItem>,
) -> Result<Json<CartSummary>, HttpError> {
    Ok(Json(
        cart::add_item(session.user_id(), body, &state.db).await?,
    ))
}

#[derive(Deserialize)]
struct QuantityRequest {
    quantity: u32,
}

async fn set_quantity(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
    Path(menu_item_id): Path<Uuid>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<CartSummary>, HttpError> {
    Ok(Json(
        cart::set_quantity(session.user_id(), menu_item_id, body.quantity, &state.db).await?,
    ))
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<CartSummary>, HttpError> {
    Ok(Json(
        cart::remove_item(session.user_id(), menu_item_id, &state.db).await?,
    ))
}

async fn clear_cart(
    State(state): State<AppState>,
    Extension(session): Extension<CustomerSession>,
) -> Result<Json<CartSummary>, HttpError> {
    cart::clear_cart(session.user_id(), &state.db).await?;
    Ok(Json(cart::view_cart(session.user_id(), &state.db).await?))
}

impl From<CostTooLarge> for HttpError {
    fn from(err: CostTooLarge) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(err.to_string()))
    }
}

impl From<CartViewError> for HttpError {
    fn from(error: CartViewError) -> Self {
        match error {
            CartViewError::DatabaseError(err) => err.into(),
            CartViewError::CostTooLarge(err) => err.into(),
        }
    }
}

impl From<CartUpdateError> for HttpError {
    fn from(error: CartUpdateError) -> Self {
        match error {
            CartUpdateError::DatabaseError(err) => err.into(),
            CartUpdateError::CostTooLarge(err) => err.into(),
            CartUpdateError::ItemNonExistent(id) => {
                warn!(menu_item_id = %id, "Attempted to add an unknown menu item to a cart");
                Self::with_message(StatusCode::NOT_FOUND, "Menu item not found")
            }
            CartUpdateError::NotInCart(_) => {
                Self::with_message(StatusCode::NOT_FOUND, "Menu item is not in the cart")
            }
            err @ CartUpdateError::ItemUnavailable(_) => {
                Self::new(StatusCode::CONFLICT, Some(err.to_string()))
            }
            CartUpdateError::QuantityTooLarge => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(format!(
                    "At most {MAX_LINE_QUANTITY} of an item can be in the cart"
                )),
            ),
            err @ CartUpdateError::QuantityZero => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(
            HttpError::from(CartUpdateError::ItemNonExistent(id)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(CartUpdateError::ItemUnavailable(id)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(CartUpdateError::QuantityTooLarge).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            HttpError::from(CartUpdateError::CostTooLarge(CostTooLarge)).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
