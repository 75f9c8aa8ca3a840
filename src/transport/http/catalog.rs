use {
    super::{auth::AdminUser, errors::ApiError, extract::JsonBody},
    crate::{
        AppState,
        domain::{
            catalog::{Category, NewCategory, NewProduct, Product},
            money::MoneyAmount,
        },
        services::catalog,
    },
    axum::{Json, extract::State, http::StatusCode},
    rust_decimal::Decimal,
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub stock: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(catalog::list_categories(&state.pool).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    JsonBody(body): JsonBody<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = NewCategory::new(body.name)?;
    let category = catalog::create_category(&state.pool, category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(catalog::list_products(&state.pool).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    JsonBody(body): JsonBody<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let price = body.price.map(MoneyAmount::new).transpose()?;
    let product = NewProduct::new(
        body.name,
        body.description,
        price,
        body.category_id,
        body.stock,
        body.images,
    )?;
    let product = catalog::create_product(&state.pool, product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}
