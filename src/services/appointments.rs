use {
    crate::{
        domain::{
            appointment::{
                Appointment, AppointmentFilter, AppointmentPage, AppointmentStatus,
                NewAppointment, NewVehicle, NewWashService, Vehicle, WashService,
            },
            audit::NewAuditEntry,
            error::PipelineError,
            user::User,
        },
        infra::postgres::{appointment_repo, audit_repo::insert_audit_entry},
    },
    sqlx::PgPool,
    uuid::Uuid,
};

pub async fn create_service(
    pool: &PgPool,
    service: NewWashService,
) -> Result<WashService, PipelineError> {
    let created = appointment_repo::insert_service(pool, &service)
        .await?
        .ok_or_else(|| {
            PipelineError::Conflict(format!("service {} already exists", service.name))
        })?;
    tracing::info!(service_id = %created.id, name = %created.name, "service created");
    Ok(created)
}

pub async fn list_services(pool: &PgPool) -> Result<Vec<WashService>, PipelineError> {
    appointment_repo::list_services(pool).await
}

pub async fn add_vehicle(pool: &PgPool, vehicle: NewVehicle) -> Result<Vehicle, PipelineError> {
    appointment_repo::insert_vehicle(pool, &vehicle).await
}

pub async fn list_vehicles(pool: &PgPool, user: &User) -> Result<Vec<Vehicle>, PipelineError> {
    appointment_repo::list_vehicles(pool, user.id).await
}

/// Book a PENDING appointment for the caller. The service must exist and
/// the vehicle must be one of the caller's own.
pub async fn book(
    pool: &PgPool,
    user: &User,
    appointment: NewAppointment,
) -> Result<Appointment, PipelineError> {
    if appointment.user_id != user.id {
        return Err(PipelineError::Unauthorized("Unauthorized".into()));
    }
    if !appointment_repo::service_exists(pool, appointment.service_id).await? {
        return Err(PipelineError::NotFound("Service not found".into()));
    }
    if !appointment_repo::vehicle_belongs_to(pool, appointment.vehicle_id, user.id).await? {
        return Err(PipelineError::NotFound("Vehicle not found".into()));
    }

    appointment_repo::insert_appointment(pool, &appointment).await?;
    tracing::info!(
        appointment_id = %appointment.id,
        user_id = %user.id,
        date = %appointment.date,
        time_slot = %appointment.time_slot,
        "appointment booked"
    );
    get_appointment(pool, appointment.id).await
}

pub async fn list_for_user(pool: &PgPool, user: &User) -> Result<Vec<Appointment>, PipelineError> {
    appointment_repo::list_for_user(pool, user.id).await
}

pub async fn list_appointments(
    pool: &PgPool,
    filter: &AppointmentFilter,
) -> Result<AppointmentPage, PipelineError> {
    let (appointments, total) = appointment_repo::list_admin(pool, filter).await?;
    Ok(AppointmentPage::new(appointments, total, filter))
}

async fn get_appointment(pool: &PgPool, id: Uuid) -> Result<Appointment, PipelineError> {
    appointment_repo::get_appointment(pool, id)
        .await?
        .ok_or_else(|| PipelineError::NotFound("Appointment not found".into()))
}

/// Administrative status change along the appointment lifecycle.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    actor: &str,
) -> Result<Appointment, PipelineError> {
    let status = AppointmentStatus::try_from(status)
        .map_err(|_| PipelineError::Validation("Invalid appointment status".into()))?;
    transition(pool, id, status, None, actor).await
}

/// The caller cancels one of their own open appointments.
pub async fn cancel(pool: &PgPool, user: &User, id: Uuid) -> Result<Appointment, PipelineError> {
    let actor = format!("user:{}", user.id);
    transition(pool, id, AppointmentStatus::Cancelled, Some(user.id), &actor).await
}

async fn transition(
    pool: &PgPool,
    id: Uuid,
    status: AppointmentStatus,
    owner: Option<Uuid>,
    actor: &str,
) -> Result<Appointment, PipelineError> {
    let mut tx = pool.begin().await?;

    sqlx::query!("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    let current = appointment_repo::find_header_for_update(&mut tx, id)
        .await?
        .filter(|a| owner.is_none_or(|user_id| a.user_id == user_id))
        .ok_or_else(|| PipelineError::NotFound("Appointment not found".into()))?;

    if !current.status.can_transition_to(&status) {
        return Err(PipelineError::Conflict(format!(
            "appointment is {} and cannot become {status}",
            current.status
        )));
    }

    appointment_repo::set_status(&mut tx, id, status).await?;
    let audit = NewAuditEntry::new(
        "appointment",
        id,
        "status_changed",
        actor,
        serde_json::json!({
            "old_status": current.status.as_str(),
            "new_status": status.as_str(),
        }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = %id, from = %current.status, to = %status, "appointment status updated");

    get_appointment(pool, id).await
}
