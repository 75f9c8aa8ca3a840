use {
    crate::domain::{
        catalog::{Category, NewCategory, NewProduct, Product},
        error::PipelineError,
        money::MoneyAmount,
    },
    chrono::{DateTime, Utc},
    rust_decimal::Decimal,
    uuid::Uuid,
};

struct CategoryRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    category_id: Uuid,
    category_name: String,
    stock: i32,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = PipelineError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: MoneyAmount::new(row.price)?,
            category_id: row.category_id,
            category_name: row.category_name,
            stock: row.stock,
            images: row.images,
            created_at: row.created_at,
        })
    }
}

pub async fn list_categories(pool: &sqlx::PgPool) -> Result<Vec<Category>, PipelineError> {
    let rows = sqlx::query_as!(
        CategoryRow,
        "SELECT id, name, created_at FROM categories ORDER BY name ASC"
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Category::from).collect())
}

/// Returns `None` when a category with the same name already exists.
pub async fn insert_category(
    pool: &sqlx::PgPool,
    category: &NewCategory,
) -> Result<Option<Category>, PipelineError> {
    let row = sqlx::query_as!(
        CategoryRow,
        r#"
        INSERT INTO categories (id, name) VALUES ($1, $2)
        ON CONFLICT (name) DO NOTHING
        RETURNING id, name, created_at
        "#,
        category.id,
        &category.name,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Category::from))
}

pub async fn category_exists(pool: &sqlx::PgPool, id: Uuid) -> Result<bool, PipelineError> {
    let exists = sqlx::query_scalar!(
        r#"SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1) AS "exists!""#,
        id,
    )
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn insert_product(
    pool: &sqlx::PgPool,
    product: &NewProduct,
) -> Result<Product, PipelineError> {
    let row = sqlx::query_as!(
        ProductRow,
        r#"
        WITH inserted AS (
            INSERT INTO products (id, name, description, price, category_id, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
        )
        SELECT p.id AS "id!", p.name AS "name!", p.description, p.price AS "price!",
               p.category_id AS "category_id!", c.name AS "category_name!",
               p.stock AS "stock!", p.images AS "images!", p.created_at AS "created_at!"
        FROM inserted p
        JOIN categories c ON c.id = p.category_id
        "#,
        product.id,
        &product.name,
        product.description.as_deref(),
        product.price.value(),
        product.category_id,
        product.stock,
        &product.images[..],
    )
    .fetch_one(pool)
    .await?;
    Product::try_from(row)
}

pub async fn list_products(pool: &sqlx::PgPool) -> Result<Vec<Product>, PipelineError> {
    sqlx::query_as!(
        ProductRow,
        r#"
        SELECT p.id, p.name, p.description, p.price, p.category_id,
               c.name AS "category_name!", p.stock, p.images, p.created_at
        FROM products p
        JOIN categories c ON c.id = p.category_id
        ORDER BY p.created_at DESC
        "#
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Product::try_from)
    .collect()
}

/// Products among `ids`, row-locked in id order so concurrent checkouts
/// queue instead of deadlocking.
pub async fn find_products_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ids: &[Uuid],
) -> Result<Vec<Product>, PipelineError> {
    sqlx::query_as!(
        ProductRow,
        r#"
        SELECT p.id, p.name, p.description, p.price, p.category_id,
               c.name AS "category_name!", p.stock, p.images, p.created_at
        FROM products p
        JOIN categories c ON c.id = p.category_id
        WHERE p.id = ANY($1)
        ORDER BY p.id
        FOR UPDATE OF p
        "#,
        ids,
    )
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(Product::try_from)
    .collect()
}

pub async fn decrement_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), PipelineError> {
    sqlx::query!(
        "UPDATE products SET stock = stock - $2 WHERE id = $1",
        product_id,
        quantity,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
