use {
    crate::domain::{
        appointment::{
            AdminAppointment, Appointment, AppointmentFilter, AppointmentStatus, NewAppointment,
            NewVehicle, NewWashService, ServiceSummary, Vehicle, VehicleSummary, WashService,
        },
        error::PipelineError,
        money::MoneyAmount,
        order::UserSummary,
    },
    chrono::{DateTime, NaiveDate, Utc},
    rust_decimal::Decimal,
    sqlx::{Postgres, QueryBuilder},
    uuid::Uuid,
};

struct ServiceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    duration_minutes: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for WashService {
    type Error = PipelineError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        Ok(WashService {
            id: row.id,
            name: row.name,
            description: row.description,
            price: MoneyAmount::new(row.price)?,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
        })
    }
}

struct VehicleRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    color: Option<String>,
    license_plate: String,
    created_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            color: row.color,
            license_plate: row.license_plate,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    time_slot: String,
    status: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    service_id: Uuid,
    service_name: String,
    service_price: Decimal,
    service_duration: i32,
    vehicle_id: Uuid,
    vehicle_name: String,
    vehicle_color: Option<String>,
    vehicle_plate: String,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = PipelineError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            time_slot: row.time_slot,
            status: AppointmentStatus::try_from(row.status.as_str())?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            service: ServiceSummary {
                id: row.service_id,
                name: row.service_name,
                price: MoneyAmount::new(row.service_price)?,
                duration_minutes: row.service_duration,
            },
            vehicle: VehicleSummary {
                id: row.vehicle_id,
                name: row.vehicle_name,
                color: row.vehicle_color,
                license_plate: row.vehicle_plate,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdminAppointmentRow {
    #[sqlx(flatten)]
    appointment: AppointmentRow,
    user_name: String,
    user_email: String,
}

/// Appointment fields a status change reads under lock.
#[derive(Debug, Clone, Copy)]
pub struct AppointmentHeader {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: AppointmentStatus,
}

const ADMIN_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.date, a.time_slot, a.status, a.notes, a.created_at, a.updated_at,
           s.id AS service_id, s.name AS service_name, s.price AS service_price,
           s.duration_minutes AS service_duration,
           v.id AS vehicle_id, v.name AS vehicle_name, v.color AS vehicle_color,
           v.license_plate AS vehicle_plate,
           u.name AS user_name, u.email AS user_email
    FROM appointments a
    JOIN services s ON s.id = a.service_id
    JOIN vehicles v ON v.id = a.vehicle_id
    JOIN users u ON u.id = a.user_id
"#;

// ── Services ───────────────────────────────────────────────────────────────

/// Returns `None` when a service with the same name already exists.
pub async fn insert_service(
    pool: &sqlx::PgPool,
    service: &NewWashService,
) -> Result<Option<WashService>, PipelineError> {
    sqlx::query_as!(
        ServiceRow,
        r#"
        INSERT INTO services (id, name, description, price, duration_minutes)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO NOTHING
        RETURNING id, name, description, price, duration_minutes, created_at
        "#,
        service.id,
        &service.name,
        service.description.as_deref(),
        service.price.value(),
        service.duration_minutes,
    )
    .fetch_optional(pool)
    .await?
    .map(WashService::try_from)
    .transpose()
}

pub async fn list_services(pool: &sqlx::PgPool) -> Result<Vec<WashService>, PipelineError> {
    sqlx::query_as!(
        ServiceRow,
        r#"
        SELECT id, name, description, price, duration_minutes, created_at
        FROM services
        ORDER BY price ASC, name ASC
        "#
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(WashService::try_from)
    .collect()
}

pub async fn service_exists(pool: &sqlx::PgPool, id: Uuid) -> Result<bool, PipelineError> {
    let exists = sqlx::query_scalar!(
        r#"SELECT EXISTS(SELECT 1 FROM services WHERE id = $1) AS "exists!""#,
        id,
    )
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

// ── Vehicles ───────────────────────────────────────────────────────────────

pub async fn insert_vehicle(
    pool: &sqlx::PgPool,
    vehicle: &NewVehicle,
) -> Result<Vehicle, PipelineError> {
    let row = sqlx::query_as!(
        VehicleRow,
        r#"
        INSERT INTO vehicles (id, user_id, name, color, license_plate)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, name, color, license_plate, created_at
        "#,
        vehicle.id,
        vehicle.user_id,
        &vehicle.name,
        vehicle.color.as_deref(),
        &vehicle.license_plate,
    )
    .fetch_one(pool)
    .await?;
    Ok(Vehicle::from(row))
}

pub async fn list_vehicles(pool: &sqlx::PgPool, user_id: Uuid) -> Result<Vec<Vehicle>, PipelineError> {
    let rows = sqlx::query_as!(
        VehicleRow,
        r#"
        SELECT id, user_id, name, color, license_plate, created_at
        FROM vehicles
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#,
        user_id,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Vehicle::from).collect())
}

pub async fn vehicle_belongs_to(
    pool: &sqlx::PgPool,
    vehicle_id: Uuid,
    user_id: Uuid,
) -> Result<bool, PipelineError> {
    let owned = sqlx::query_scalar!(
        r#"SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1 AND user_id = $2) AS "owned!""#,
        vehicle_id,
        user_id,
    )
    .fetch_one(pool)
    .await?;
    Ok(owned)
}

// ── Appointments ───────────────────────────────────────────────────────────

pub async fn insert_appointment(
    pool: &sqlx::PgPool,
    appointment: &NewAppointment,
) -> Result<(), PipelineError> {
    sqlx::query!(
        r#"
        INSERT INTO appointments (id, user_id, service_id, vehicle_id, date, time_slot, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
        appointment.id,
        appointment.user_id,
        appointment.service_id,
        appointment.vehicle_id,
        appointment.date,
        &appointment.time_slot,
        AppointmentStatus::Pending.as_str(),
        &appointment.notes,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_appointment(
    pool: &sqlx::PgPool,
    id: Uuid,
) -> Result<Option<Appointment>, PipelineError> {
    sqlx::query_as!(
        AppointmentRow,
        r#"
        SELECT a.id, a.user_id, a.date, a.time_slot, a.status, a.notes,
               a.created_at, a.updated_at,
               s.id AS service_id, s.name AS service_name, s.price AS service_price,
               s.duration_minutes AS service_duration,
               v.id AS vehicle_id, v.name AS vehicle_name, v.color AS vehicle_color,
               v.license_plate AS vehicle_plate
        FROM appointments a
        JOIN services s ON s.id = a.service_id
        JOIN vehicles v ON v.id = a.vehicle_id
        WHERE a.id = $1
        "#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .map(Appointment::try_from)
    .transpose()
}

/// The user's appointments with service and vehicle, latest day first.
pub async fn list_for_user(
    pool: &sqlx::PgPool,
    user_id: Uuid,
) -> Result<Vec<Appointment>, PipelineError> {
    sqlx::query_as!(
        AppointmentRow,
        r#"
        SELECT a.id, a.user_id, a.date, a.time_slot, a.status, a.notes,
               a.created_at, a.updated_at,
               s.id AS service_id, s.name AS service_name, s.price AS service_price,
               s.duration_minutes AS service_duration,
               v.id AS vehicle_id, v.name AS vehicle_name, v.color AS vehicle_color,
               v.license_plate AS vehicle_plate
        FROM appointments a
        JOIN services s ON s.id = a.service_id
        JOIN vehicles v ON v.id = a.vehicle_id
        WHERE a.user_id = $1
        ORDER BY a.date DESC, a.created_at DESC
        "#,
        user_id,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Appointment::try_from)
    .collect()
}

fn push_admin_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AppointmentFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status.as_str());
    }
    if let Some(date) = filter.date {
        qb.push(" AND a.date = ").push_bind(date);
    }
}

/// One page of the admin bookings listing plus the total match count.
pub async fn list_admin(
    pool: &sqlx::PgPool,
    filter: &AppointmentFilter,
) -> Result<(Vec<AdminAppointment>, i64), PipelineError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM appointments a");
    push_admin_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Postgres>::new(ADMIN_SELECT);
    push_admin_filter(&mut page, filter);
    page.push(" ORDER BY a.date DESC, a.created_at DESC LIMIT ")
        .push_bind(i64::from(filter.limit))
        .push(" OFFSET ")
        .push_bind(filter.offset());
    let rows: Vec<AdminAppointmentRow> = page.build_query_as().fetch_all(pool).await?;

    let appointments = rows
        .into_iter()
        .map(|row| {
            let appointment = Appointment::try_from(row.appointment)?;
            let user = UserSummary {
                id: appointment.user_id,
                name: row.user_name,
                email: row.user_email,
                phone: None,
            };
            Ok(AdminAppointment { appointment, user })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok((appointments, total))
}

pub async fn find_header_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<AppointmentHeader>, PipelineError> {
    let Some(row) = sqlx::query!(
        "SELECT id, user_id, status FROM appointments WHERE id = $1 FOR UPDATE",
        id,
    )
    .fetch_optional(&mut **tx)
    .await?
    else {
        return Ok(None);
    };
    Ok(Some(AppointmentHeader {
        id: row.id,
        user_id: row.user_id,
        status: AppointmentStatus::try_from(row.status.as_str())?,
    }))
}

pub async fn set_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<(), PipelineError> {
    sqlx::query!(
        "UPDATE appointments SET status = $2, updated_at = now() WHERE id = $1",
        id,
        status.as_str(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_filter_binds_only_what_is_set() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM appointments a");
        push_admin_filter(&mut qb, &AppointmentFilter::new(None, None, None, None).unwrap());
        assert_eq!(qb.sql(), "SELECT 1 FROM appointments a WHERE TRUE");

        let filter =
            AppointmentFilter::new(None, None, Some("CONFIRMED"), Some("2025-06-20")).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM appointments a");
        push_admin_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM appointments a WHERE TRUE AND a.status = $1 AND a.date = $2"
        );
    }
}
