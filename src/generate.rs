//! Orquestación de la generación de artefactos: valida los prerrequisitos
//! con la máquina de estados, despacha al proveedor activo y persiste el
//! documento resultante.

use tracing::{error, info};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    models::{Document, DocumentOrigin, DocumentType, Project},
    provider::{create_generator, ContextDocument, GenerationRequest},
    workflow::{self, ProjectWorkflow, StartError},
};

/// Instantánea del flujo de trabajo de un proyecto, reconciliándola desde
/// los documentos persistidos la primera vez que se consulta.
pub fn workflow_snapshot(state: &AppState, project_id: Uuid) -> ProjectWorkflow {
    let mut map = state.workflows.lock().unwrap();
    map.entry(project_id)
        .or_insert_with(|| reconcile(state, project_id))
        .clone()
}

/// Descarta el estado cacheado de un proyecto para que la próxima consulta
/// lo reconcilie desde el almacén. Se invoca tras subir o borrar documentos.
pub fn invalidate_workflow(state: &AppState, project_id: Uuid) {
    state.workflows.lock().unwrap().remove(&project_id);
}

fn reconcile(state: &AppState, project_id: Uuid) -> ProjectWorkflow {
    let docs = state.store.documents_for_project(project_id, None, None);
    ProjectWorkflow::from_documents(docs.iter())
}

/// Intenta reservar el hueco de generación del proyecto para `doc_type`.
pub fn try_start(
    state: &AppState,
    project_id: Uuid,
    doc_type: DocumentType,
) -> Result<(), StartError> {
    let mut map = state.workflows.lock().unwrap();
    let wf = map
        .entry(project_id)
        .or_insert_with(|| reconcile(state, project_id));
    wf.start(doc_type)
}

/// Ejecuta una generación ya arrancada (el hueco debe estar reservado con
/// `try_start`). Actualiza el estado global de progreso, despacha al
/// proveedor seleccionado y deja el resultado en el almacén y en la máquina
/// de estados. Devuelve el documento creado si la generación tuvo éxito.
pub async fn run_generation(
    state: AppState,
    project: Project,
    doc_type: DocumentType,
) -> Option<Document> {
    let titulo = doc_type.title();
    {
        let mut status = state.status.lock().unwrap();
        status.is_busy = true;
        status.message = format!("Generando {titulo}...");
        status.progress = 0.1;
    }

    let request = build_request(&state, project.clone(), doc_type);
    let settings = state.store.settings();
    let generator = create_generator(&settings, &state.llm);

    {
        let mut status = state.status.lock().unwrap();
        status.message = format!(
            "Esperando la respuesta del proveedor '{}' para {titulo}...",
            generator.name()
        );
        status.progress = 0.5;
    }

    let outcome = match generator.generate(&request).await {
        Ok(payload) => {
            let markdown = payload.render_markdown();
            let size = markdown.len() as u64;
            let stored = state.store.insert_document(
                project.id,
                format!("{titulo}.md"),
                Some("text/markdown".to_string()),
                doc_type.stage(),
                doc_type,
                markdown,
                size,
                DocumentOrigin::Generado,
            );
            match stored {
                Ok(document) => {
                    mark_complete(&state, project.id, doc_type);
                    info!(
                        "Generado {} para el proyecto '{}' con el proveedor '{}'",
                        doc_type.as_str(),
                        project.name,
                        generator.name()
                    );
                    Ok(document)
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(document) => {
            let mut status = state.status.lock().unwrap();
            status.is_busy = false;
            status.message = format!("{titulo} generado correctamente.");
            status.progress = 0.0;
            Some(document)
        }
        Err(e) => {
            error!(
                "Error generando {} para el proyecto {}: {e}",
                doc_type.as_str(),
                project.id
            );
            mark_failed(&state, project.id, doc_type, e.to_string());
            let mut status = state.status.lock().unwrap();
            status.is_busy = false;
            status.message = format!("Error generando {titulo}: {e}");
            status.progress = 0.0;
            None
        }
    }
}

/// Reúne el último documento completado de cada prerrequisito como contexto.
fn build_request(state: &AppState, project: Project, doc_type: DocumentType) -> GenerationRequest {
    let mut context_documents = Vec::new();
    for req in workflow::requirements(doc_type) {
        let docs = state
            .store
            .documents_for_project(project.id, None, Some(*req));
        if let Some(doc) = docs.into_iter().max_by_key(|d| d.created_at) {
            context_documents.push(ContextDocument {
                doc_type: doc.doc_type,
                name: doc.name,
                content: doc.content,
            });
        }
    }
    GenerationRequest {
        project,
        doc_type,
        context_documents,
    }
}

fn mark_complete(state: &AppState, project_id: Uuid, doc_type: DocumentType) {
    let mut map = state.workflows.lock().unwrap();
    if let Some(wf) = map.get_mut(&project_id) {
        wf.complete(doc_type);
    }
}

fn mark_failed(state: &AppState, project_id: Uuid, doc_type: DocumentType, message: String) {
    let mut map = state.workflows.lock().unwrap();
    if let Some(wf) = map.get_mut(&project_id) {
        wf.fail(doc_type, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::LlmManager;
    use crate::models::{GenerationState, MockConfig, ProviderFlag, Stage};
    use crate::store::Store;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    fn estado_de_prueba(mock: MockConfig) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            server_addr: "127.0.0.1:0".to_string(),
            data_dir: dir.path().to_path_buf(),
            default_provider: ProviderFlag::Mock,
            llm_chat_model: "gpt-4o-mini".to_string(),
            mock,
        };
        let store = Store::open(dir.path(), ProviderFlag::Mock, mock).unwrap();
        let (tx, _rx) = oneshot::channel();
        let state = AppState {
            config: config.clone(),
            store: Arc::new(store),
            llm: LlmManager::from_config(&config),
            workflows: Arc::new(Mutex::new(HashMap::new())),
            status: Arc::new(Mutex::new(crate::app_state::Status::default())),
            shutdown_sender: Arc::new(Mutex::new(Some(tx))),
        };
        (dir, state)
    }

    fn mock_instantaneo(success_rate: f32) -> MockConfig {
        MockConfig {
            latency_ms: 0,
            success_rate,
        }
    }

    #[tokio::test]
    async fn genera_cliente_y_desbloquea_relevamiento() {
        let (_dir, state) = estado_de_prueba(mock_instantaneo(1.0));
        let project = state
            .store
            .create_project("Archivo Digital".to_string(), String::new())
            .unwrap();

        // INFORME bloqueado de entrada.
        let err = try_start(&state, project.id, DocumentType::Informe).unwrap_err();
        assert!(matches!(err, StartError::MissingRequirements(_)));

        try_start(&state, project.id, DocumentType::Cliente).unwrap();
        let doc = run_generation(state.clone(), project.clone(), DocumentType::Cliente)
            .await
            .unwrap();
        assert_eq!(doc.doc_type, DocumentType::Cliente);
        assert_eq!(doc.stage, Stage::Preliminar);
        assert_eq!(doc.origin, DocumentOrigin::Generado);

        let wf = workflow_snapshot(&state, project.id);
        assert_eq!(wf.state(DocumentType::Cliente), GenerationState::Completed);

        // CLIENTE completado desbloquea RELEVAMIENTO.
        try_start(&state, project.id, DocumentType::Relevamiento).unwrap();
        run_generation(state.clone(), project.clone(), DocumentType::Relevamiento)
            .await
            .unwrap();
        assert_eq!(
            state.store.documents_for_project(project.id, None, None).len(),
            2
        );
    }

    #[tokio::test]
    async fn un_fallo_conserva_el_error_y_permite_reintentar() {
        let (_dir, state) = estado_de_prueba(mock_instantaneo(1.0));
        let project = state
            .store
            .create_project("Mesa de Ayuda".to_string(), String::new())
            .unwrap();

        try_start(&state, project.id, DocumentType::Cliente).unwrap();
        run_generation(state.clone(), project.clone(), DocumentType::Cliente)
            .await
            .unwrap();

        // Inyección de errores: el mock pasa a fallar siempre.
        state.store.set_mock_config(mock_instantaneo(0.0)).unwrap();
        try_start(&state, project.id, DocumentType::Relevamiento).unwrap();
        let resultado =
            run_generation(state.clone(), project.clone(), DocumentType::Relevamiento).await;
        assert!(resultado.is_none());

        let wf = workflow_snapshot(&state, project.id);
        assert_eq!(
            wf.state(DocumentType::Relevamiento),
            GenerationState::Error
        );
        assert!(wf.last_error(DocumentType::Relevamiento).is_some());
        // El fallo no toca los demás estados.
        assert_eq!(wf.state(DocumentType::Cliente), GenerationState::Completed);

        // Reintento manual: ERROR → IN_PROGRESS → COMPLETED.
        state.store.set_mock_config(mock_instantaneo(1.0)).unwrap();
        try_start(&state, project.id, DocumentType::Relevamiento).unwrap();
        run_generation(state.clone(), project.clone(), DocumentType::Relevamiento)
            .await
            .unwrap();
        let wf = workflow_snapshot(&state, project.id);
        assert_eq!(
            wf.state(DocumentType::Relevamiento),
            GenerationState::Completed
        );
    }

    #[tokio::test]
    async fn el_hueco_unico_rechaza_generaciones_solapadas() {
        let (_dir, state) = estado_de_prueba(mock_instantaneo(1.0));
        let project = state
            .store
            .create_project("Portal".to_string(), String::new())
            .unwrap();

        try_start(&state, project.id, DocumentType::Cliente).unwrap();
        let err = try_start(&state, project.id, DocumentType::Cliente).unwrap_err();
        assert_eq!(err, StartError::AlreadyInProgress(DocumentType::Cliente));
    }

    #[tokio::test]
    async fn la_subida_manual_tambien_completa_el_estado() {
        let (_dir, state) = estado_de_prueba(mock_instantaneo(1.0));
        let project = state
            .store
            .create_project("CRM".to_string(), String::new())
            .unwrap();

        state
            .store
            .insert_document(
                project.id,
                "entrevista.txt".to_string(),
                Some("text/plain".to_string()),
                Stage::Preliminar,
                DocumentType::Cliente,
                "Notas de la entrevista".to_string(),
                22,
                DocumentOrigin::Subido,
            )
            .unwrap();
        invalidate_workflow(&state, project.id);

        let wf = workflow_snapshot(&state, project.id);
        assert_eq!(wf.state(DocumentType::Cliente), GenerationState::Completed);
        assert!(workflow::can_generate(
            DocumentType::Relevamiento,
            wf.states()
        ));
    }
}
