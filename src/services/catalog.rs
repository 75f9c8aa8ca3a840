use {
    crate::{
        domain::{
            catalog::{Category, NewCategory, NewProduct, Product},
            error::PipelineError,
        },
        infra::postgres::catalog_repo,
    },
    sqlx::PgPool,
};

pub async fn create_category(pool: &PgPool, category: NewCategory) -> Result<Category, PipelineError> {
    catalog_repo::insert_category(pool, &category)
        .await?
        .ok_or_else(|| {
            PipelineError::Conflict(format!("category {} already exists", category.name))
        })
}

pub async fn create_product(pool: &PgPool, product: NewProduct) -> Result<Product, PipelineError> {
    if !catalog_repo::category_exists(pool, product.category_id).await? {
        return Err(PipelineError::NotFound("Category not found".into()));
    }
    let product = catalog_repo::insert_product(pool, &product).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    Ok(product)
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, PipelineError> {
    catalog_repo::list_categories(pool).await
}

pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>, PipelineError> {
    catalog_repo::list_products(pool).await
}
