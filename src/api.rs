use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::spawn;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    app_state::{AppState, Status},
    extract, generate,
    models::{
        payload_schema, DocumentOrigin, DocumentType, MockConfig, ProjectStatus, ProviderFlag,
        Stage,
    },
    workflow::{self, StartError},
};

// --- Payloads de la API ---

#[derive(Deserialize)]
pub struct CreateProjectPayload {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
pub struct UpdateProjectPayload {
    name: Option<String>,
    description: Option<String>,
    status: Option<ProjectStatus>,
}

#[derive(Deserialize)]
pub struct UpdateDocumentPayload {
    content: String,
}

#[derive(Deserialize)]
pub struct ProviderPayload {
    provider: String,
}

#[derive(Deserialize)]
pub struct MockPayload {
    latency_ms: u64,
    success_rate: f32,
}

#[derive(Deserialize)]
pub struct DocumentsQuery {
    stage: Option<String>,
    doc_type: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": message.into() })),
    )
}

fn internal_error(e: anyhow::Error) -> ApiError {
    error!("Error interno: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Proyectos
        .route("/api/projects", get(list_projects_handler).post(create_project_handler))
        .route(
            "/api/projects/:id",
            get(get_project_handler)
                .put(update_project_handler)
                .delete(delete_project_handler),
        )
        .route("/api/projects/:id/documents", get(list_documents_handler))
        // Documentos
        .route("/api/documents", post(upload_document_handler))
        .route(
            "/api/documents/:id",
            get(get_document_handler)
                .put(update_document_handler)
                .delete(delete_document_handler),
        )
        // Generación y flujo de trabajo
        .route("/api/projects/:id/generate/:doc_type", post(generate_handler))
        .route("/api/projects/:id/workflow", get(workflow_handler))
        .route(
            "/api/projects/:id/workflow/validate/:doc_type",
            get(validate_handler),
        )
        .route("/api/document-types", get(document_types_handler))
        // Configuración del proveedor
        .route("/api/config", get(config_handler))
        .route("/api/config/provider", put(set_provider_handler))
        .route("/api/config/mock", put(set_mock_handler))
        // Sondas y apagado
        .route("/api/status", get(status_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers de proyectos ---

#[axum::debug_handler]
async fn create_project_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(bad_request("El nombre del proyecto es obligatorio."));
    }
    let project = state
        .store
        .create_project(payload.name, payload.description)
        .map_err(internal_error)?;
    info!("Proyecto creado: {} ({})", project.name, project.id);
    Ok((StatusCode::CREATED, Json(project)))
}

#[axum::debug_handler]
async fn list_projects_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.list_projects())
}

#[axum::debug_handler]
async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_project(id)
        .map(Json)
        .ok_or_else(|| not_found("El proyecto no existe."))
}

#[axum::debug_handler]
async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .store
        .update_project(id, payload.name, payload.description, payload.status)
        .map_err(|e| bad_request(e.to_string()))?;
    updated
        .map(Json)
        .ok_or_else(|| not_found("El proyecto no existe."))
}

#[axum::debug_handler]
async fn delete_project_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.store.delete_project(id).map_err(internal_error)?;
    if !deleted {
        return Err(not_found("El proyecto no existe."));
    }
    generate::invalidate_workflow(&state, id);
    info!("Proyecto {id} eliminado junto con sus documentos.");
    Ok(StatusCode::NO_CONTENT)
}

// --- Handlers de documentos ---

#[axum::debug_handler]
async fn list_documents_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_project(id).is_none() {
        return Err(not_found("El proyecto no existe."));
    }
    let stage = match &query.stage {
        Some(raw) => Some(
            Stage::parse(raw).ok_or_else(|| bad_request(format!("Etapa desconocida: {raw}")))?,
        ),
        None => None,
    };
    let doc_type = match &query.doc_type {
        Some(raw) => Some(
            DocumentType::parse(raw)
                .ok_or_else(|| bad_request(format!("Tipo de documento desconocido: {raw}")))?,
        ),
        None => None,
    };
    Ok(Json(state.store.documents_for_project(id, stage, doc_type)))
}

/// Subida multipart con campos `project_id`, `stage`, `doc_type` y `file`.
#[axum::debug_handler]
async fn upload_document_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut project_id: Option<Uuid> = None;
    let mut stage: Option<Stage> = None;
    let mut doc_type: Option<DocumentType> = None;
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Formulario multipart inválido: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| bad_request(e.to_string()))?;
                project_id = Some(
                    raw.parse()
                        .map_err(|_| bad_request("project_id no es un UUID válido."))?,
                );
            }
            "stage" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| bad_request(e.to_string()))?;
                stage = Some(
                    Stage::parse(&raw)
                        .ok_or_else(|| bad_request(format!("Etapa desconocida: {raw}")))?,
                );
            }
            "doc_type" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| bad_request(e.to_string()))?;
                doc_type = Some(DocumentType::parse(&raw).ok_or_else(|| {
                    bad_request(format!("Tipo de documento desconocido: {raw}"))
                })?);
            }
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(format!("No se pudo leer el fichero: {e}")))?
                        .to_vec(),
                );
            }
            otro => {
                return Err(bad_request(format!("Campo inesperado en el formulario: {otro}")));
            }
        }
    }

    let project_id = project_id.ok_or_else(|| bad_request("Falta el campo project_id."))?;
    let stage = stage.ok_or_else(|| bad_request("Falta el campo stage."))?;
    let doc_type = doc_type.ok_or_else(|| bad_request("Falta el campo doc_type."))?;
    let filename = filename.ok_or_else(|| bad_request("Falta el fichero a subir."))?;
    let bytes = bytes.ok_or_else(|| bad_request("Falta el fichero a subir."))?;

    if doc_type.stage() != stage {
        return Err(bad_request(format!(
            "El tipo {} pertenece a la etapa {}, no a {}.",
            doc_type.as_str(),
            doc_type.stage().as_str(),
            stage.as_str()
        )));
    }
    if state.store.get_project(project_id).is_none() {
        return Err(not_found("El proyecto no existe."));
    }

    let content = extract::extract_text(&filename, &bytes)
        .map_err(|e| bad_request(e.to_string()))?;
    let size_bytes = bytes.len() as u64;
    let document = state
        .store
        .insert_document(
            project_id,
            filename.clone(),
            extract::mime_for(&filename),
            stage,
            doc_type,
            content,
            size_bytes,
            DocumentOrigin::Subido,
        )
        .map_err(internal_error)?;

    // El nuevo documento puede desbloquear otros tipos: se reconciliará en
    // la próxima consulta del flujo de trabajo.
    generate::invalidate_workflow(&state, project_id);
    info!(
        "Documento '{}' subido al proyecto {} ({})",
        document.name,
        project_id,
        doc_type.as_str()
    );
    Ok((StatusCode::CREATED, Json(document)))
}

#[axum::debug_handler]
async fn get_document_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_document(id)
        .map(Json)
        .ok_or_else(|| not_found("El documento no existe."))
}

#[axum::debug_handler]
async fn update_document_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .store
        .update_document_content(id, payload.content)
        .map_err(internal_error)?;
    updated
        .map(Json)
        .ok_or_else(|| not_found("El documento no existe."))
}

#[axum::debug_handler]
async fn delete_document_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.store.delete_document(id).map_err(internal_error)?;
    let Some(document) = removed else {
        return Err(not_found("El documento no existe."));
    };
    // El tipo borrado puede volver a NOT_STARTED y bloquear a sus dependientes.
    generate::invalidate_workflow(&state, document.project_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Generación y flujo de trabajo ---

#[axum::debug_handler]
async fn generate_handler(
    State(state): State<AppState>,
    Path((id, doc_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let doc_type = DocumentType::parse(&doc_type)
        .ok_or_else(|| bad_request(format!("Tipo de documento desconocido: {doc_type}")))?;
    let Some(project) = state.store.get_project(id) else {
        return Err(not_found("El proyecto no existe."));
    };

    match generate::try_start(&state, id, doc_type) {
        Ok(()) => {}
        Err(StartError::MissingRequirements(missing)) => {
            let err = StartError::MissingRequirements(missing.clone());
            return Err((
                StatusCode::CONFLICT,
                Json(json!({ "error": err.to_string(), "missing": missing })),
            ));
        }
        Err(err @ StartError::AlreadyInProgress(_)) => {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({ "error": err.to_string() })),
            ));
        }
    }

    spawn(generate::run_generation(state.clone(), project, doc_type));

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": format!("Generación de {} iniciada.", doc_type.as_str()),
        })),
    ))
}

#[axum::debug_handler]
async fn workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_project(id).is_none() {
        return Err(not_found("El proyecto no existe."));
    }
    let wf = generate::workflow_snapshot(&state, id);
    Ok(Json(json!({
        "project_id": id,
        "in_progress": wf.in_progress(),
        "types": wf.summary(),
    })))
}

#[axum::debug_handler]
async fn validate_handler(
    State(state): State<AppState>,
    Path((id, doc_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let doc_type = DocumentType::parse(&doc_type)
        .ok_or_else(|| bad_request(format!("Tipo de documento desconocido: {doc_type}")))?;
    if state.store.get_project(id).is_none() {
        return Err(not_found("El proyecto no existe."));
    }
    let wf = generate::workflow_snapshot(&state, id);
    Ok(Json(json!({
        "doc_type": doc_type,
        "can_generate": workflow::can_generate(doc_type, wf.states()),
        "missing": workflow::missing_requirements(doc_type, wf.states()),
    })))
}

/// Catálogo de tipos: etapa, título, prerrequisitos y esquema del artefacto.
#[axum::debug_handler]
async fn document_types_handler() -> impl IntoResponse {
    let types: Vec<serde_json::Value> = DocumentType::ALL
        .into_iter()
        .map(|t| {
            json!({
                "doc_type": t,
                "stage": t.stage(),
                "title": t.title(),
                "requirements": workflow::requirements(t),
                "schema": payload_schema(t),
            })
        })
        .collect();
    Json(types)
}

// --- Configuración del proveedor ---

#[axum::debug_handler]
async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.settings())
}

#[axum::debug_handler]
async fn set_provider_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProviderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = ProviderFlag::parse(&payload.provider).ok_or_else(|| {
        bad_request(format!(
            "Proveedor desconocido: {} (se esperaba 'real' o 'mock').",
            payload.provider
        ))
    })?;
    let settings = state.store.set_provider(provider).map_err(internal_error)?;
    info!("Proveedor de IA cambiado a '{}'", payload.provider.to_lowercase());
    Ok(Json(settings))
}

#[axum::debug_handler]
async fn set_mock_handler(
    State(state): State<AppState>,
    Json(payload): Json<MockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .store
        .set_mock_config(MockConfig {
            latency_ms: payload.latency_ms,
            success_rate: payload.success_rate,
        })
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(settings))
}

// --- Sondas, estado y apagado ---

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(state.status.lock().unwrap().clone())
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let settings = state.store.settings();
    Json(json!({
        "status": "ok",
        "provider": settings.provider,
        "projects": state.store.list_projects().len(),
    }))
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}
