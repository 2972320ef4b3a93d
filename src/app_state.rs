use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{config::AppConfig, llm::LlmManager, store::Store, workflow::ProjectWorkflow};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub llm: LlmManager,
    /// Estado de generación por proyecto, reconciliado bajo demanda desde
    /// los documentos persistidos.
    pub workflows: Arc<Mutex<HashMap<Uuid, ProjectWorkflow>>>,
    pub status: Arc<Mutex<Status>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub progress: f32, // Valor entre 0.0 y 1.0
}
