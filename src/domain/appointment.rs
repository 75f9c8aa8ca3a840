use {
    super::error::PipelineError,
    super::money::MoneyAmount,
    super::order::UserSummary,
    chrono::{DateTime, NaiveDate, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Bookable start times, half-hourly through the working day.
pub const TIME_SLOTS: [&str; 17] = [
    "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM", "12:00 PM", "12:30 PM",
    "1:00 PM", "1:30 PM", "2:00 PM", "2:30 PM", "3:00 PM", "3:30 PM", "4:00 PM", "4:30 PM",
    "5:00 PM",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// PENDING → CONFIRMED → IN_PROGRESS → COMPLETED, and any open
    /// appointment may be cancelled. COMPLETED and CANCELLED are terminal.
    pub fn can_transition_to(&self, to: &AppointmentStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Confirmed)
                | (Self::Confirmed, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Pending | Self::Confirmed | Self::InProgress, Self::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AppointmentStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(PipelineError::Validation(format!(
                "unknown appointment status: {other}"
            ))),
        }
    }
}

/// A wash package customers can book, e.g. "Premium Wash".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WashService {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: MoneyAmount,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWashService {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: MoneyAmount,
    pub duration_minutes: i32,
}

impl NewWashService {
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        price: Option<MoneyAmount>,
        duration_minutes: Option<i32>,
    ) -> Result<Self, PipelineError> {
        let name = required_text(name, "Name is required")?;
        let price = price
            .filter(|p| !p.is_zero())
            .ok_or_else(|| PipelineError::Validation("Price is required".into()))?;
        let duration_minutes = duration_minutes
            .filter(|d| *d > 0)
            .ok_or_else(|| PipelineError::Validation("Duration is required".into()))?;
        Ok(Self {
            id: Uuid::now_v7(),
            name,
            description: description.filter(|d| !d.trim().is_empty()),
            price,
            duration_minutes,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Make and model, e.g. "Tesla Model 3".
    pub name: String,
    pub color: Option<String>,
    pub license_plate: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub license_plate: String,
}

impl NewVehicle {
    pub fn new(
        user_id: Uuid,
        name: Option<String>,
        color: Option<String>,
        license_plate: Option<String>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            name: required_text(name, "Name is required")?,
            color: color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            license_plate: required_text(license_plate, "License plate is required")?
                .to_uppercase(),
        })
    }
}

/// A validated booking request for the calling user.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub vehicle_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub notes: String,
}

impl NewAppointment {
    /// `date` accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose UTC day
    /// is used. Days before `today` cannot be booked.
    pub fn new(
        user_id: Uuid,
        service_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        date: Option<&str>,
        time_slot: Option<&str>,
        notes: Option<String>,
        today: NaiveDate,
    ) -> Result<Self, PipelineError> {
        let date = date.map(str::trim).filter(|d| !d.is_empty());
        let time_slot = time_slot.map(str::trim).filter(|t| !t.is_empty());
        let (Some(service_id), Some(vehicle_id), Some(date), Some(time_slot)) =
            (service_id, vehicle_id, date, time_slot)
        else {
            return Err(PipelineError::Validation("Missing required fields".into()));
        };

        let date = parse_date(date)?;
        if date < today {
            return Err(PipelineError::Validation(format!(
                "cannot book a date in the past: {date}"
            )));
        }
        if !TIME_SLOTS.contains(&time_slot) {
            return Err(PipelineError::Validation(format!(
                "unknown time slot: {time_slot}"
            )));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            service_id,
            vehicle_id,
            date,
            time_slot: time_slot.to_string(),
            notes: notes.map(|n| n.trim().to_string()).unwrap_or_default(),
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| PipelineError::Validation(format!("invalid date: {raw}")))
}

fn required_text(value: Option<String>, message: &str) -> Result<String, PipelineError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PipelineError::Validation(message.into()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub price: MoneyAmount,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub license_plate: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub status: AppointmentStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub service: ServiceSummary,
    pub vehicle: VehicleSummary,
}

/// Row of the admin bookings listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub user: UserSummary,
}

#[derive(Debug, Clone)]
pub struct AppointmentFilter {
    pub page: u32,
    pub limit: u32,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(
        page: Option<u32>,
        limit: Option<u32>,
        status: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let status = match status {
            None | Some("ALL") | Some("") => None,
            Some(s) => Some(AppointmentStatus::try_from(s)?),
        };
        let date = date
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(parse_date)
            .transpose()?;
        Ok(Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
            status,
            date,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPage {
    pub appointments: Vec<AdminAppointment>,
    pub total_appointments: i64,
    pub total_pages: i64,
    pub current_page: u32,
}

impl AppointmentPage {
    pub fn new(
        appointments: Vec<AdminAppointment>,
        total_appointments: i64,
        filter: &AppointmentFilter,
    ) -> Self {
        let limit = i64::from(filter.limit);
        Self {
            appointments,
            total_appointments,
            total_pages: (total_appointments + limit - 1) / limit,
            current_page: filter.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    fn book(
        date: Option<&str>,
        time_slot: Option<&str>,
    ) -> Result<NewAppointment, PipelineError> {
        NewAppointment::new(
            Uuid::now_v7(),
            Some(Uuid::now_v7()),
            Some(Uuid::now_v7()),
            date,
            time_slot,
            Some("  extra attention to wheels ".into()),
            today(),
        )
    }

    #[test]
    fn booking_requires_every_field() {
        let err = NewAppointment::new(
            Uuid::now_v7(),
            None,
            Some(Uuid::now_v7()),
            Some("2025-06-21"),
            Some("9:00 AM"),
            None,
            today(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "validation: Missing required fields");
        assert!(book(None, Some("9:00 AM")).is_err());
        assert!(book(Some("2025-06-21"), Some("  ")).is_err());
    }

    #[test]
    fn booking_date_and_slot_are_checked() {
        let ok = book(Some("2025-06-20"), Some("5:00 PM")).unwrap();
        assert_eq!(ok.date, today());
        assert_eq!(ok.notes, "extra attention to wheels");

        let from_timestamp = book(Some("2025-06-21T10:30:00.000Z"), Some("10:30 AM")).unwrap();
        assert_eq!(from_timestamp.date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());

        assert!(book(Some("2025-06-19"), Some("9:00 AM")).is_err());
        assert!(book(Some("21/06/2025"), Some("9:00 AM")).is_err());
        assert!(book(Some("2025-06-21"), Some("5:30 PM")).is_err());
    }

    #[test]
    fn status_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(&Confirmed));
        assert!(Confirmed.can_transition_to(&InProgress));
        assert!(InProgress.can_transition_to(&Completed));
        assert!(Pending.can_transition_to(&Cancelled));
        assert!(InProgress.can_transition_to(&Cancelled));

        assert!(!Pending.can_transition_to(&Completed));
        assert!(!Completed.can_transition_to(&Cancelled));
        assert!(!Cancelled.can_transition_to(&Pending));
        assert!(!Confirmed.can_transition_to(&Confirmed));
    }

    #[test]
    fn vehicle_plate_is_normalized() {
        let v = NewVehicle::new(
            Uuid::now_v7(),
            Some("Honda Accord".into()),
            Some(" ".into()),
            Some(" xyz789 ".into()),
        )
        .unwrap();
        assert_eq!(v.license_plate, "XYZ789");
        assert_eq!(v.color, None);
        assert!(NewVehicle::new(Uuid::now_v7(), Some("Civic".into()), None, None).is_err());
    }

    #[test]
    fn filter_parses_status_and_date() {
        let f = AppointmentFilter::new(Some(2), Some(500), Some("IN_PROGRESS"), Some("2025-06-20"))
            .unwrap();
        assert_eq!(f.status, Some(AppointmentStatus::InProgress));
        assert_eq!(f.date, Some(today()));
        assert_eq!(f.offset(), 100);

        let f = AppointmentFilter::new(None, None, Some("ALL"), Some("")).unwrap();
        assert_eq!((f.status, f.date, f.limit), (None, None, 10));

        assert!(AppointmentFilter::new(None, None, Some("scheduled"), None).is_err());
    }
}
