use {
    super::{
        auth::AdminUser,
        errors::ApiError,
        extract::{JsonBody, PathParam, QueryParams},
    },
    crate::{
        AppState,
        domain::order::{AdminOrderDetail, OrderFilter, OrderPage},
        services::admin_orders,
    },
    axum::{Json, extract::State},
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn list_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<ListOrdersQuery>,
) -> Result<Json<OrderPage>, ApiError> {
    let filter = OrderFilter::new(query.page, query.limit, query.status.as_deref(), query.search)?;
    Ok(Json(admin_orders::list_orders(&state.pool, &filter).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<AdminOrderDetail>, ApiError> {
    Ok(Json(admin_orders::get_order(&state.pool, id).await?))
}

#[tracing::instrument(name = "admin_update_order", skip_all, fields(order_id = %id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateStatusRequest>,
) -> Result<Json<AdminOrderDetail>, ApiError> {
    let actor = format!("admin:{}", admin.id);
    let order = admin_orders::update_status(&state.pool, id, &body.status, &actor).await?;
    Ok(Json(order))
}
