//! eCRF HTTP routes
//!
//! Thin handlers over [`EcrfService`]; all behaviour lives in the service.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::errors::ApiResult;
use super::export_stream::archive_body;
use crate::records::{Record, RecordData};
use crate::schema::{FormSchema, Template, TemplateSummary};
use crate::service::EcrfService;
use crate::study::{BindFormRequest, Study, StudyDefinition, StudyForm};

pub type SharedService = Arc<EcrfService>;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudyRequest {
    pub study_id: String,
    #[serde(default)]
    pub visits: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct StudiesListResponse {
    pub studies: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundFormResponse {
    pub study_form_id: String,
    pub study_id: String,
    #[serde(flatten)]
    pub form: StudyForm,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted_id: String,
    /// False when the record did not exist
    pub removed: bool,
}

// ==================
// Routes
// ==================

pub fn ecrf_routes(service: SharedService) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        // Templates
        .route("/api/forms", get(list_templates_handler))
        .route("/api/forms/:id", get(get_template_handler))
        .route("/api/forms/:id/schema", get(get_template_schema_handler))
        // Studies
        .route("/api/studies", get(list_studies_handler).post(create_study_handler))
        .route("/api/studies/:study_id/forms", post(bind_form_handler))
        .route("/api/studies/:study_id/definition", get(definition_handler))
        .route("/api/studies/:study_id/forms/:form_id", get(study_form_handler))
        // Records
        .route(
            "/api/studies/:study_id/forms/:form_id/records",
            get(list_records_handler).post(create_record_handler),
        )
        .route(
            "/api/studies/:study_id/forms/:form_id/records/:record_id",
            get(get_record_handler)
                .put(update_record_handler)
                .delete(delete_record_handler),
        )
        // Export
        .route("/api/studies/:study_id/export", get(export_handler))
        .with_state(service)
}

// ==================
// Health
// ==================

async fn root_handler() -> &'static str {
    "eCRF API running"
}

async fn health_handler(State(service): State<SharedService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "templates": service.registry().len(),
        "studies": service.list_studies().len(),
    }))
}

// ==================
// Template Handlers
// ==================

async fn list_templates_handler(State(service): State<SharedService>) -> Json<Vec<TemplateSummary>> {
    Json(service.list_templates())
}

async fn get_template_handler(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> ApiResult<Json<Template>> {
    Ok(Json(service.get_template(&id)?))
}

async fn get_template_schema_handler(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> ApiResult<Json<FormSchema>> {
    Ok(Json(service.get_template_schema(&id)?))
}

// ==================
// Study Handlers
// ==================

async fn list_studies_handler(State(service): State<SharedService>) -> Json<StudiesListResponse> {
    let studies = service.list_studies();
    Json(StudiesListResponse {
        total: studies.len(),
        studies,
    })
}

async fn create_study_handler(
    State(service): State<SharedService>,
    Json(request): Json<CreateStudyRequest>,
) -> (StatusCode, Json<Study>) {
    let study = service.create_study(&request.study_id, request.visits);
    (StatusCode::CREATED, Json(study))
}

async fn bind_form_handler(
    State(service): State<SharedService>,
    Path(study_id): Path<String>,
    Json(request): Json<BindFormRequest>,
) -> ApiResult<(StatusCode, Json<BoundFormResponse>)> {
    let form = service.bind_form(&study_id, request)?;
    Ok((
        StatusCode::CREATED,
        Json(BoundFormResponse {
            study_form_id: form.id.clone(),
            study_id,
            form,
        }),
    ))
}

async fn definition_handler(
    State(service): State<SharedService>,
    Path(study_id): Path<String>,
) -> ApiResult<Json<StudyDefinition>> {
    Ok(Json(service.get_definition(&study_id)?))
}

async fn study_form_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id)): Path<(String, String)>,
) -> ApiResult<Json<StudyForm>> {
    Ok(Json(service.get_study_form(&study_id, &form_id)?))
}

// ==================
// Record Handlers
// ==================

async fn list_records_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Record>>> {
    Ok(Json(service.list_records(&study_id, &form_id)?))
}

async fn create_record_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id)): Path<(String, String)>,
    Json(data): Json<RecordData>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let record = service.submit_record(&study_id, &form_id, data)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id, record_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Record>> {
    Ok(Json(service.get_record(&study_id, &form_id, &record_id)?))
}

async fn update_record_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id, record_id)): Path<(String, String, String)>,
    Json(data): Json<RecordData>,
) -> ApiResult<Json<Record>> {
    Ok(Json(service.edit_record(&study_id, &form_id, &record_id, data)?))
}

async fn delete_record_handler(
    State(service): State<SharedService>,
    Path((study_id, form_id, record_id)): Path<(String, String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let removed = service.delete_record(&study_id, &form_id, &record_id)?;
    Ok(Json(DeleteResponse {
        ok: true,
        deleted_id: record_id,
        removed,
    }))
}

// ==================
// Export Handler
// ==================

async fn export_handler(
    State(service): State<SharedService>,
    Path(study_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let plan = service.export_study(&study_id)?;
    let disposition = format!("attachment; filename=\"{}\"", plan.suggested_filename());

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive_body(plan),
    ))
}
