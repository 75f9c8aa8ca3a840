use {
    super::{
        auth::{AdminUser, CurrentUser},
        errors::ApiError,
        extract::{JsonBody, PathParam, QueryParams},
    },
    crate::{
        AppState,
        domain::{
            appointment::{
                Appointment, AppointmentFilter, AppointmentPage, NewAppointment, NewVehicle,
                NewWashService, Vehicle, WashService,
            },
            money::MoneyAmount,
        },
        services::appointments,
    },
    axum::{Json, extract::State, http::StatusCode},
    chrono::Utc,
    rust_decimal::Decimal,
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub service_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: String,
}

pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<WashService>>, ApiError> {
    Ok(Json(appointments::list_services(&state.pool).await?))
}

pub async fn create_service(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    JsonBody(body): JsonBody<CreateServiceRequest>,
) -> Result<(StatusCode, Json<WashService>), ApiError> {
    let price = body.price.map(MoneyAmount::new).transpose()?;
    let service = NewWashService::new(body.name, body.description, price, body.duration_minutes)?;
    let service = appointments::create_service(&state.pool, service).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    Ok(Json(appointments::list_vehicles(&state.pool, &user).await?))
}

pub async fn add_vehicle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let vehicle = NewVehicle::new(user.id, body.name, body.color, body.license_plate)?;
    let vehicle = appointments::add_vehicle(&state.pool, vehicle).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

#[tracing::instrument(name = "book_appointment", skip_all)]
pub async fn book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = NewAppointment::new(
        user.id,
        body.service_id,
        body.vehicle_id,
        body.date.as_deref(),
        body.time_slot.as_deref(),
        body.notes,
        Utc::now().date_naive(),
    )?;
    let appointment = appointments::book(&state.pool, &user, appointment).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(appointments::list_for_user(&state.pool, &user).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(appointments::cancel(&state.pool, &user, id).await?))
}

pub async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<ListAppointmentsQuery>,
) -> Result<Json<AppointmentPage>, ApiError> {
    let filter = AppointmentFilter::new(
        query.page,
        query.limit,
        query.status.as_deref(),
        query.date.as_deref(),
    )?;
    Ok(Json(appointments::list_appointments(&state.pool, &filter).await?))
}

#[tracing::instrument(name = "admin_update_appointment", skip_all, fields(appointment_id = %id))]
pub async fn admin_update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateAppointmentStatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let actor = format!("admin:{}", admin.id);
    let appointment = appointments::update_status(&state.pool, id, &body.status, &actor).await?;
    Ok(Json(appointment))
}
