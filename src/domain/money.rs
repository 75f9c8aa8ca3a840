use {
    super::error::PipelineError,
    rust_decimal::{Decimal, RoundingStrategy},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Non-negative fixed-point amount in rupees with at most two decimal places,
/// bounded by what a NUMERIC(12, 2) column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    /// Largest storable amount, 9 999 999 999.99.
    pub const MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    pub fn new(value: Decimal) -> Result<Self, PipelineError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {value}"
            )));
        }
        if value.normalize().scale() > 2 {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount has more than 2 decimal places: {value}"
            )));
        }
        if value > Self::MAX {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount exceeds {}, got: {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Amount as sent to and signed for the gateway: whole rupees, halves
    /// rounded away from zero.
    pub fn gateway_amount(&self) -> String {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string()
    }
}

impl TryFrom<Decimal> for MoneyAmount {
    type Error = PipelineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MoneyAmount> for Decimal {
    fn from(amount: MoneyAmount) -> Decimal {
        amount.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
