use {
    super::error::PipelineError,
    super::money::MoneyAmount,
    super::payment::{Payment, PaymentMethod, PaymentStatus},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Canceled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
        }
    }

    /// FAILED is only ever written by the payment callback.
    pub fn settable_by_admin(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" => Ok(Self::Canceled),
            "REFUNDED" => Ok(Self::Refunded),
            "FAILED" => Ok(Self::Failed),
            other => Err(PipelineError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Line item as requested at checkout. The price is the unit price the
/// customer saw and is stored as-is.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: MoneyAmount,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    id: Uuid,
    user_id: Uuid,
    items: Vec<NewOrderItem>,
    total_amount: MoneyAmount,
}

impl NewOrder {
    pub fn new(
        user_id: Uuid,
        items: Vec<NewOrderItem>,
        total_amount: Option<MoneyAmount>,
    ) -> Result<Self, PipelineError> {
        let total_amount = match total_amount {
            Some(total) if !items.is_empty() && !total.is_zero() => total,
            _ => {
                return Err(PipelineError::Validation(
                    "Items and total amount are required".into(),
                ));
            }
        };

        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(PipelineError::Validation(format!(
                "quantity must be at least 1 for product {}",
                item.product_id
            )));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            items,
            total_amount,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> MoneyAmount {
        self.total_amount
    }

    /// Distinct product ids referenced by the order.
    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: MoneyAmount,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: MoneyAmount,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: String,
}

/// Row of the admin order listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderSummary {
    pub id: Uuid,
    pub total_amount: MoneyAmount,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
    pub payment: Option<PaymentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderItem {
    pub id: Uuid,
    pub quantity: i32,
    pub price: MoneyAmount,
    pub product: ProductSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    pub id: Uuid,
    pub total_amount: MoneyAmount,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    pub items: Vec<AdminOrderItem>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub page: u32,
    pub limit: u32,
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
}

impl OrderFilter {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(
        page: Option<u32>,
        limit: Option<u32>,
        status: Option<&str>,
        search: Option<String>,
    ) -> Result<Self, PipelineError> {
        let status = match status {
            None | Some("ALL") | Some("") => None,
            Some(s) => Some(OrderStatus::try_from(s)?),
        };
        Ok(Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
            status,
            search: search.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<AdminOrderSummary>,
    pub total_orders: i64,
    pub total_pages: i64,
    pub current_page: u32,
}

impl OrderPage {
    pub fn new(orders: Vec<AdminOrderSummary>, total_orders: i64, filter: &OrderFilter) -> Self {
        let limit = i64::from(filter.limit);
        Self {
            orders,
            total_orders,
            total_pages: (total_orders + limit - 1) / limit,
            current_page: filter.page,
        }
    }
}
