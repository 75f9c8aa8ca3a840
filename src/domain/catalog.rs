use {
    super::error::PipelineError,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: MoneyAmount,
    pub category_id: Uuid,
    pub category_name: String,
    pub stock: i32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub id: Uuid,
    pub name: String,
}

impl NewCategory {
    pub fn new(name: Option<String>) -> Result<Self, PipelineError> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PipelineError::Validation("Name is required".into()))?;
        Ok(Self {
            id: Uuid::now_v7(),
            name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: MoneyAmount,
    pub category_id: Uuid,
    pub stock: i32,
    pub images: Vec<String>,
}

impl NewProduct {
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        price: Option<MoneyAmount>,
        category_id: Option<Uuid>,
        stock: Option<i32>,
        images: Vec<String>,
    ) -> Result<Self, PipelineError> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PipelineError::Validation("Name is required".into()))?;
        let price = price
            .filter(|p| !p.is_zero())
            .ok_or_else(|| PipelineError::Validation("Price is required".into()))?;
        let category_id = category_id
            .ok_or_else(|| PipelineError::Validation("Category ID is required".into()))?;
        if images.is_empty() {
            return Err(PipelineError::Validation(
                "At least one image is required".into(),
            ));
        }
        let stock = stock.unwrap_or(0);
        if stock < 0 {
            return Err(PipelineError::Validation(format!(
                "stock cannot be negative, got: {stock}"
            )));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            name,
            description,
            price,
            category_id,
            stock,
            images,
        })
    }
}
