//! Routes under /services and /menu: browsing the catalog, and managing it.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::{
    db::models::{
        menu_item::{MenuItem, MenuSearchParameters},
        service::{Service, ServiceInsert},
    },
    middleware::session::{optional_session_middleware, session_middleware},
    services::{
        catalog::{self, errors::CatalogUpdateError, ServiceWithMenu},
        sessions::{AdministratorSession, GenericAuthenticatedSession},
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Whether the (optional) session may see unlisted catalog entries.
fn sees_unlisted(session: Option<&GenericAuthenticatedSession>) -> bool {
    session.is_some_and(GenericAuthenticatedSession::is_admin)
}

/// Create a router for the /services route.
pub fn create_services_router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_services))
        .route("/{service_id}", get(retrieve_service))
        .layer(from_fn_with_state(state.clone(), optional_session_middleware));
    let administrator = Router::new()
        .route("/", post(create_service))
        .route("/{service_id}", put(update_service).delete(delete_service))
        .route("/{service_id}/menu", post(create_menu_item))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ));
    public.merge(administrator)
}

/// Create a router for the /menu route.
pub fn create_menu_router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(search_menu))
        .route("/{menu_item_id}", get(retrieve_menu_item))
        .layer(from_fn_with_state(state.clone(), optional_session_middleware));
    let administrator = Router::new()
        .route(
            "/{menu_item_id}",
            put(update_menu_item).delete(delete_menu_item),
        )
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ));
    public.merge(administrator)
}

#[derive(Serialize)]
struct ServiceListResponse {
    services: Vec<Service>,
}

async fn list_services(
    State(state): State<AppState>,
    Extension(session): Extension<Option<GenericAuthenticatedSession>>,
) -> Result<Json<ServiceListResponse>, HttpError> {
    Ok(Json(ServiceListResponse {
        services: catalog::list_services(sees_unlisted(session.as_ref()), &state.db).await?,
    }))
}

async fn retrieve_service(
    State(state): State<AppState>,
    Extension(session): Extension<Option<GenericAuthenticatedSession>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ServiceWithMenu>, HttpError> {
    Ok(Json(
        catalog::retrieve_service(service_id, sees_unlisted(session.as_ref()), &state.db)
            .await?
            .ok_or_else(|| HttpError::with_message(StatusCode::NOT_FOUND, "Service not found"))?,
    ))
}

#[derive(Serialize)]
struct MenuSearchResponse {
    items: Vec<MenuItem>,
}

async fn search_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Option<GenericAuthenticatedSession>>,
    Query(params): Query<MenuSearchParameters>,
) -> Result<Json<MenuSearchResponse>, HttpError> {
    Ok(Json(MenuSearchResponse {
        items: catalog::search_menu(&params, sees_unlisted(session.as_ref()), &state.db).await?,
    }))
}

async fn retrieve_menu_item(
    State(state): State<AppState>,
    Extension(session): Extension<Option<GenericAuthenticatedSession>>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<MenuItem>, HttpError> {
    Ok(Json(
        catalog::retrieve_menu_item(menu_item_id, sees_unlisted(session.as_ref()), &state.db)
            .await?
            .ok_or_else(|| HttpError::with_message(StatusCode::NOT_FOUND, "Menu item not found"))?,
    ))
}

async fn create_service(
    State(state): State<AppState>,
    Json(body): Json<ServiceInsert>,
) -> Result<(StatusCode, Json<Service>), HttpError> {
    Ok((
        StatusCode::CREATED,
        Json(catalog::create_service(body, &state.db).await?),
    ))
}

async fn update_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<catalog::ServiceUpdate>,
) -> Result<Json<Service>, HttpError> {
    Ok(Json(
        catalog::update_service(service_id, body, &state.db).await?,
    ))
}

async fn delete_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, HttpError> {
    catalog::delete_service(service_id, &state.db).await?;
    Ok(Json(json!({"message": "Service deleted"})))
}

async fn create_menu_item(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<catalog::NewMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), HttpError> {
    Ok((
        StatusCode::CREATED,
        Json(catalog::create_menu_item(service_id, body, &state.db).await?),
    ))
}

async fn update_menu_item(
    State(state): State<AppState>,
    Path(menu_item_id): Path<Uuid>,
    Json(body): Json<catalog::MenuItemUpdate>,
) -> Result<Json<MenuItem>, HttpError> {
    Ok(Json(
        catalog::update_menu_item(menu_item_id, body, &state.db).await?,
    ))
}

async fn delete_menu_item(
    State(state): State<AppState>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<Value>, HttpError> {
    catalog::delete_menu_item(menu_item_id, &state.db).await?;
    Ok(Json(json!({"message": "Menu item deleted"})))
}

impl From<CatalogUpdateError> for HttpError {
    fn from(error: CatalogUpdateError) -> Self {
        match error {
            CatalogUpdateError::DatabaseError(err) => err.into(),
            CatalogUpdateError::NonExistent(id) => {
                warn!(%id, "Attempted to modify a catalog entry which does not exist");
                Self::with_message(StatusCode::NOT_FOUND, "Catalog entry not found")
            }
            err @ (CatalogUpdateError::NameMissing | CatalogUpdateError::InvalidDiscount(_)) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_visitors_see_listed_only() {
        assert!(!sees_unlisted(None));
    }

    #[test]
    fn catalog_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(CatalogUpdateError::InvalidDiscount(150)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            HttpError::from(CatalogUpdateError::NonExistent(Uuid::new_v4())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
