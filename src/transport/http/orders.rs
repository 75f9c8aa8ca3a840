use {
    super::{auth::CurrentUser, errors::ApiError, extract::JsonBody},
    crate::{
        AppState,
        domain::{
            error::PipelineError,
            money::MoneyAmount,
            order::{NewOrder, NewOrderItem, Order},
        },
        services::checkout,
    },
    axum::{Json, extract::State},
    rust_decimal::Decimal,
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub total_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

impl CreateOrderRequest {
    fn into_order(self, user_id: Uuid) -> Result<NewOrder, PipelineError> {
        let items = self
            .items
            .into_iter()
            .map(|i| -> Result<NewOrderItem, PipelineError> {
                Ok(NewOrderItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: MoneyAmount::new(i.price)?,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let total = self.total_amount.map(MoneyAmount::new).transpose()?;
        NewOrder::new(user_id, items, total)
    }
}

#[tracing::instrument(name = "create_order", skip_all)]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = body.into_order(user.id)?;
    let order = checkout::create_order(&state.pool, &user, order).await?;
    Ok(Json(order))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(checkout::list_orders(&state.pool, &user).await?))
}
