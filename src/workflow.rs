//! Registro de prerrequisitos y máquina de estados de generación.
//!
//! Única fuente de verdad para decidir qué tipos de documento pueden
//! generarse en un proyecto: todos los puntos de la API consultan este
//! módulo en lugar de duplicar la validación.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Document, DocumentType, GenerationState, Stage};

/// Tipos de documento que deben estar COMPLETED antes de poder generar `t`.
pub fn requirements(t: DocumentType) -> &'static [DocumentType] {
    use DocumentType::*;
    match t {
        Cliente => &[],
        Relevamiento => &[Cliente],
        Informe => &[Cliente, Relevamiento],
        Objetivos => &[Cliente, Relevamiento],
        HistoriasUsuario => &[Cliente, Objetivos],
        DiagramasFlujo => &[Cliente, Relevamiento],
        Sprints => &[Cliente, HistoriasUsuario],
        Der => &[Cliente, Objetivos],
        CasosUso => &[Cliente, Objetivos],
    }
}

/// Mapa de estado de generación por tipo de documento.
pub type StateMap = HashMap<DocumentType, GenerationState>;

fn state_of(states: &StateMap, t: DocumentType) -> GenerationState {
    states.get(&t).copied().unwrap_or_default()
}

/// `true` si todos los prerrequisitos de `t` están COMPLETED.
pub fn can_generate(t: DocumentType, states: &StateMap) -> bool {
    requirements(t)
        .iter()
        .all(|req| state_of(states, *req) == GenerationState::Completed)
}

/// Prerrequisitos de `t` aún no completados, en el orden del registro.
pub fn missing_requirements(t: DocumentType, states: &StateMap) -> Vec<DocumentType> {
    requirements(t)
        .iter()
        .copied()
        .filter(|req| state_of(states, *req) != GenerationState::Completed)
        .collect()
}

/// Motivo por el que no puede arrancar una generación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// Faltan prerrequisitos por completar.
    MissingRequirements(Vec<DocumentType>),
    /// Ya hay otra generación en curso en el proyecto.
    AlreadyInProgress(DocumentType),
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::MissingRequirements(missing) => {
                let names: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
                write!(f, "Faltan prerrequisitos por completar: {}", names.join(", "))
            }
            StartError::AlreadyInProgress(t) => {
                write!(f, "Ya hay una generación en curso ({})", t.as_str())
            }
        }
    }
}

/// Estado de generación de un proyecto completo: un estado por tipo de
/// documento más el último error registrado de cada tipo.
#[derive(Debug, Clone, Default)]
pub struct ProjectWorkflow {
    states: StateMap,
    errors: HashMap<DocumentType, String>,
}

/// Fila del tablero de flujo de trabajo de un proyecto.
#[derive(Debug, Clone, Serialize)]
pub struct TypeStatus {
    pub doc_type: DocumentType,
    pub stage: Stage,
    pub state: GenerationState,
    pub available: bool,
    pub missing: Vec<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProjectWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruye el estado a partir de los documentos existentes del
    /// proyecto: cada tipo con al menos un documento queda COMPLETED y el
    /// resto en NOT_STARTED.
    pub fn from_documents<'a, I>(docs: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut wf = Self::new();
        for doc in docs {
            wf.states.insert(doc.doc_type, GenerationState::Completed);
        }
        wf
    }

    pub fn state(&self, t: DocumentType) -> GenerationState {
        state_of(&self.states, t)
    }

    pub fn states(&self) -> &StateMap {
        &self.states
    }

    /// Tipo con una generación en curso, si lo hay.
    pub fn in_progress(&self) -> Option<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .find(|t| self.state(*t) == GenerationState::InProgress)
    }

    pub fn last_error(&self, t: DocumentType) -> Option<&str> {
        self.errors.get(&t).map(String::as_str)
    }

    /// Intenta arrancar la generación de `t`. Solo se permite si sus
    /// prerrequisitos están completados y no hay otra generación en curso.
    pub fn start(&mut self, t: DocumentType) -> Result<(), StartError> {
        if let Some(busy) = self.in_progress() {
            return Err(StartError::AlreadyInProgress(busy));
        }
        let missing = missing_requirements(t, &self.states);
        if !missing.is_empty() {
            return Err(StartError::MissingRequirements(missing));
        }
        self.states.insert(t, GenerationState::InProgress);
        Ok(())
    }

    /// Marca `t` como COMPLETED. Idempotente: completar dos veces deja el
    /// mapa igual que completar una sola vez.
    pub fn complete(&mut self, t: DocumentType) {
        self.states.insert(t, GenerationState::Completed);
        self.errors.remove(&t);
    }

    /// Marca `t` como ERROR conservando el mensaje para mostrarlo. No
    /// altera el estado de ningún otro tipo.
    pub fn fail(&mut self, t: DocumentType, message: String) {
        self.states.insert(t, GenerationState::Error);
        self.errors.insert(t, message);
    }

    /// Tablero completo: estado, disponibilidad y faltantes de cada tipo.
    pub fn summary(&self) -> Vec<TypeStatus> {
        DocumentType::ALL
            .into_iter()
            .map(|t| {
                let missing = missing_requirements(t, &self.states);
                TypeStatus {
                    doc_type: t,
                    stage: t.stage(),
                    state: self.state(t),
                    available: missing.is_empty(),
                    missing,
                    error: self.errors.get(&t).cloned(),
                }
            })
            .collect()
    }
}
