//! Contrato compartido de los proveedores de generación (real y mock).
//!
//! La selección se inyecta desde el estado de la aplicación leyendo el flag
//! persistido en el almacén en el momento de despachar cada petición; el
//! código que llama es agnóstico a la implementación activa.

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::LlmManager;
use crate::mock::MockGenerator;
use crate::models::{DocumentType, GeneratedPayload, Project, ProviderFlag};
use crate::store::Settings;

/// Documento ya completado que se pasa como contexto de la generación.
#[derive(Debug, Clone)]
pub struct ContextDocument {
    pub doc_type: DocumentType,
    pub name: String,
    pub content: String,
}

/// Petición de generación de un artefacto.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub project: Project,
    pub doc_type: DocumentType,
    pub context_documents: Vec<ContextDocument>,
}

/// Un proveedor capaz de generar artefactos de documentación.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Nombre del proveedor, para logging y la API de configuración.
    fn name(&self) -> &'static str;

    /// Genera el artefacto pedido. Ambas implementaciones devuelven las
    /// mismas formas de `GeneratedPayload`.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPayload>;
}

/// Construye el proveedor activo según los ajustes persistidos.
pub fn create_generator(settings: &Settings, llm: &LlmManager) -> Box<dyn DocumentGenerator> {
    match settings.provider {
        ProviderFlag::Real => Box::new(llm.clone()),
        ProviderFlag::Mock => Box::new(MockGenerator::new(settings.mock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockConfig;

    #[test]
    fn la_fabrica_respeta_el_flag_persistido() {
        let llm = LlmManager::new("gpt-4o-mini".to_string());

        let mock = create_generator(
            &Settings {
                provider: ProviderFlag::Mock,
                mock: MockConfig::default(),
            },
            &llm,
        );
        assert_eq!(mock.name(), "mock");

        let real = create_generator(
            &Settings {
                provider: ProviderFlag::Real,
                mock: MockConfig::default(),
            },
            &llm,
        );
        assert_eq!(real.name(), "openai");
    }
}
