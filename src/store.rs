//! Persistencia de proyectos, documentos y ajustes en ficheros JSON dentro
//! del directorio de datos configurado. Cada colección se guarda como un
//! array JSON (`projects.json`, `documents.json`) y los ajustes del
//! proveedor en `settings.json`; toda mutación escribe a disco.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Document, DocumentOrigin, DocumentType, MockConfig, Project, ProjectStatus, ProviderFlag,
    Stage,
};

const PROJECTS_FILE: &str = "projects.json";
const DOCUMENTS_FILE: &str = "documents.json";
const SETTINGS_FILE: &str = "settings.json";

/// Ajustes persistidos: proveedor activo y configuración del mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub provider: ProviderFlag,
    pub mock: MockConfig,
}

#[derive(Debug, Default)]
struct StoreData {
    projects: Vec<Project>,
    documents: Vec<Document>,
}

/// Resumen de proyecto con el recuento de documentos derivado.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub document_count: usize,
}

/// Almacén de datos de la aplicación.
pub struct Store {
    data_dir: PathBuf,
    data: Mutex<StoreData>,
    settings: Mutex<Settings>,
}

impl Store {
    /// Abre (o inicializa) el almacén en `data_dir`. Si los ficheros no
    /// existen arranca con colecciones vacías y los ajustes por defecto.
    pub fn open(data_dir: &Path, default_provider: ProviderFlag, mock: MockConfig) -> Result<Self> {
        fs::create_dir_all(data_dir).with_context(|| {
            format!("No se pudo crear el directorio de datos {}", data_dir.display())
        })?;

        let projects = read_collection(&data_dir.join(PROJECTS_FILE))?;
        let documents = read_collection(&data_dir.join(DOCUMENTS_FILE))?;
        let settings = match read_optional(&data_dir.join(SETTINGS_FILE))? {
            Some(settings) => settings,
            None => Settings {
                provider: default_provider,
                mock,
            },
        };

        info!(
            "Almacén abierto en {} ({} proyectos, {} documentos)",
            data_dir.display(),
            projects.len(),
            documents.len()
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            data: Mutex::new(StoreData { projects, documents }),
            settings: Mutex::new(settings),
        })
    }

    // ---------------------------------------------------------------------
    // PROYECTOS
    // ---------------------------------------------------------------------

    pub fn create_project(&self, name: String, description: String) -> Result<Project> {
        if name.trim().is_empty() {
            return Err(anyhow!("El nombre del proyecto no puede estar vacío"));
        }
        let project = Project::new(name.trim().to_string(), description);
        let mut data = self.data.lock().unwrap();
        data.projects.push(project.clone());
        self.persist_projects(&data)?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Vec<ProjectSummary> {
        let data = self.data.lock().unwrap();
        data.projects
            .iter()
            .map(|p| ProjectSummary {
                project: p.clone(),
                document_count: data
                    .documents
                    .iter()
                    .filter(|d| d.project_id == p.id)
                    .count(),
            })
            .collect()
    }

    pub fn get_project(&self, id: Uuid) -> Option<Project> {
        let data = self.data.lock().unwrap();
        data.projects.iter().find(|p| p.id == id).cloned()
    }

    pub fn update_project(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        status: Option<ProjectStatus>,
    ) -> Result<Option<Project>> {
        let mut data = self.data.lock().unwrap();
        let Some(project) = data.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(anyhow!("El nombre del proyecto no puede estar vacío"));
            }
            project.name = name.trim().to_string();
        }
        if let Some(description) = description {
            project.description = description;
        }
        if let Some(status) = status {
            project.status = status;
        }
        project.updated_at = Utc::now();
        let updated = project.clone();
        self.persist_projects(&data)?;
        Ok(Some(updated))
    }

    /// Elimina un proyecto y, en cascada, todos sus documentos.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let before = data.projects.len();
        data.projects.retain(|p| p.id != id);
        if data.projects.len() == before {
            return Ok(false);
        }
        data.documents.retain(|d| d.project_id != id);
        self.persist_projects(&data)?;
        self.persist_documents(&data)?;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // DOCUMENTOS
    // ---------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn insert_document(
        &self,
        project_id: Uuid,
        name: String,
        mime_type: Option<String>,
        stage: Stage,
        doc_type: DocumentType,
        content: String,
        size_bytes: u64,
        origin: DocumentOrigin,
    ) -> Result<Document> {
        let mut data = self.data.lock().unwrap();
        if !data.projects.iter().any(|p| p.id == project_id) {
            return Err(anyhow!("El proyecto {project_id} no existe"));
        }
        let document = Document {
            id: Uuid::new_v4(),
            project_id,
            name,
            mime_type,
            stage,
            doc_type,
            content,
            size_bytes,
            origin,
            created_at: Utc::now(),
        };
        data.documents.push(document.clone());
        if let Some(project) = data.projects.iter_mut().find(|p| p.id == project_id) {
            project.updated_at = Utc::now();
        }
        self.persist_documents(&data)?;
        self.persist_projects(&data)?;
        Ok(document)
    }

    pub fn documents_for_project(
        &self,
        project_id: Uuid,
        stage: Option<Stage>,
        doc_type: Option<DocumentType>,
    ) -> Vec<Document> {
        let data = self.data.lock().unwrap();
        data.documents
            .iter()
            .filter(|d| d.project_id == project_id)
            .filter(|d| stage.map_or(true, |s| d.stage == s))
            .filter(|d| doc_type.map_or(true, |t| d.doc_type == t))
            .cloned()
            .collect()
    }

    pub fn get_document(&self, id: Uuid) -> Option<Document> {
        let data = self.data.lock().unwrap();
        data.documents.iter().find(|d| d.id == id).cloned()
    }

    pub fn update_document_content(&self, id: Uuid, content: String) -> Result<Option<Document>> {
        let mut data = self.data.lock().unwrap();
        let Some(document) = data.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        document.size_bytes = content.len() as u64;
        document.content = content;
        let updated = document.clone();
        self.persist_documents(&data)?;
        Ok(Some(updated))
    }

    pub fn delete_document(&self, id: Uuid) -> Result<Option<Document>> {
        let mut data = self.data.lock().unwrap();
        let Some(pos) = data.documents.iter().position(|d| d.id == id) else {
            return Ok(None);
        };
        let removed = data.documents.remove(pos);
        self.persist_documents(&data)?;
        Ok(Some(removed))
    }

    // ---------------------------------------------------------------------
    // AJUSTES (proveedor activo + mock)
    // ---------------------------------------------------------------------

    pub fn settings(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    pub fn set_provider(&self, provider: ProviderFlag) -> Result<Settings> {
        let mut settings = self.settings.lock().unwrap();
        settings.provider = provider;
        self.persist_settings(&settings)?;
        Ok(settings.clone())
    }

    pub fn set_mock_config(&self, mock: MockConfig) -> Result<Settings> {
        if !(0.0..=1.0).contains(&mock.success_rate) {
            return Err(anyhow!("La tasa de éxito debe estar entre 0.0 y 1.0"));
        }
        let mut settings = self.settings.lock().unwrap();
        settings.mock = mock;
        self.persist_settings(&settings)?;
        Ok(settings.clone())
    }

    // ---------------------------------------------------------------------
    // Escritura a disco
    // ---------------------------------------------------------------------

    fn persist_projects(&self, data: &StoreData) -> Result<()> {
        write_json(&self.data_dir.join(PROJECTS_FILE), &data.projects)
    }

    fn persist_documents(&self, data: &StoreData) -> Result<()> {
        write_json(&self.data_dir.join(DOCUMENTS_FILE), &data.documents)
    }

    fn persist_settings(&self, settings: &Settings) -> Result<()> {
        write_json(&self.data_dir.join(SETTINGS_FILE), settings)
    }
}

fn read_collection<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    Ok(read_optional(path)?.unwrap_or_default())
}

fn read_optional<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("No se pudo leer {}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("JSON inválido en {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("No se pudo escribir {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_temporal() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), ProviderFlag::Mock, MockConfig::default()).unwrap();
        (dir, store)
    }

    #[test]
    fn crud_de_proyectos_con_cascada() {
        let (_dir, store) = store_temporal();

        let p = store
            .create_project("CRM Inmobiliaria".to_string(), "Piloto interno".to_string())
            .unwrap();
        assert_eq!(store.list_projects().len(), 1);

        store
            .insert_document(
                p.id,
                "entrevista.txt".to_string(),
                Some("text/plain".to_string()),
                Stage::Preliminar,
                DocumentType::Cliente,
                "Notas de la entrevista".to_string(),
                22,
                DocumentOrigin::Subido,
            )
            .unwrap();
        assert_eq!(store.list_projects()[0].document_count, 1);

        assert!(store.delete_project(p.id).unwrap());
        assert!(store.documents_for_project(p.id, None, None).is_empty());
        assert!(!store.delete_project(p.id).unwrap());
    }

    #[test]
    fn documentos_se_filtran_por_etapa_y_tipo() {
        let (_dir, store) = store_temporal();
        let p = store
            .create_project("Portal".to_string(), String::new())
            .unwrap();

        for (doc_type, name) in [
            (DocumentType::Cliente, "cliente.md"),
            (DocumentType::Relevamiento, "relevamiento.md"),
            (DocumentType::Objetivos, "objetivos.md"),
        ] {
            store
                .insert_document(
                    p.id,
                    name.to_string(),
                    Some("text/markdown".to_string()),
                    doc_type.stage(),
                    doc_type,
                    String::new(),
                    0,
                    DocumentOrigin::Generado,
                )
                .unwrap();
        }

        assert_eq!(store.documents_for_project(p.id, None, None).len(), 3);
        assert_eq!(
            store
                .documents_for_project(p.id, Some(Stage::Preliminar), None)
                .len(),
            2
        );
        assert_eq!(
            store
                .documents_for_project(p.id, None, Some(DocumentType::Objetivos))
                .len(),
            1
        );
    }

    #[test]
    fn los_datos_sobreviven_a_una_reapertura() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store =
                Store::open(dir.path(), ProviderFlag::Mock, MockConfig::default()).unwrap();
            let p = store
                .create_project("Persistente".to_string(), String::new())
                .unwrap();
            store.set_provider(ProviderFlag::Real).unwrap();
            p.id
        };

        let reabierto =
            Store::open(dir.path(), ProviderFlag::Mock, MockConfig::default()).unwrap();
        assert!(reabierto.get_project(id).is_some());
        // El flag persistido gana sobre el valor por defecto.
        assert_eq!(reabierto.settings().provider, ProviderFlag::Real);
    }

    #[test]
    fn la_tasa_de_exito_se_valida() {
        let (_dir, store) = store_temporal();
        let err = store.set_mock_config(MockConfig {
            latency_ms: 0,
            success_rate: 1.5,
        });
        assert!(err.is_err());
    }

    #[test]
    fn insertar_documento_en_proyecto_inexistente_falla() {
        let (_dir, store) = store_temporal();
        let err = store.insert_document(
            Uuid::new_v4(),
            "suelto.txt".to_string(),
            None,
            Stage::Preliminar,
            DocumentType::Cliente,
            String::new(),
            0,
            DocumentOrigin::Subido,
        );
        assert!(err.is_err());
    }
}
