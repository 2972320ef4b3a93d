//! Proveedor real de generación sobre Rig (OpenAI). Cada tipo de artefacto
//! tiene su propio prompt de sistema que exige un único objeto JSON con las
//! claves del contrato; la respuesta se limpia y se parsea al payload tipado.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::{DocumentType, GeneratedPayload};
use crate::provider::{DocumentGenerator, GenerationRequest};

/// Gestor del LLM para la generación de artefactos.
#[derive(Debug, Clone)]
pub struct LlmManager {
    chat_model: String,
}

impl LlmManager {
    pub fn new(chat_model: String) -> Self {
        Self { chat_model }
    }

    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.llm_chat_model.clone())
    }

    fn model_name(&self) -> &str {
        if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        }
    }

    async fn generate_with_openai(&self, request: &GenerationRequest) -> Result<GeneratedPayload> {
        use rig::client::CompletionClient as _;
        use rig::providers::openai;

        let client = openai::Client::from_env();
        let preamble = system_prompt_for(request.doc_type);
        let user_prompt = build_user_prompt(request);

        let agent = client
            .agent(self.model_name())
            .preamble(&preamble)
            .build();

        let response = agent.prompt(user_prompt.as_str()).await?;
        parse_payload(request.doc_type, &response)
    }
}

#[async_trait]
impl DocumentGenerator for LlmManager {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPayload> {
        self.generate_with_openai(request).await
    }
}

const PREAMBLE_COMUN: &str = "\
Eres un analista funcional senior que redacta documentación de proyectos de software.
Respondes siempre en español.
La salida DEBE ser un único objeto JSON válido, sin explicaciones ni texto adicional.";

/// Prompt de sistema por tipo de artefacto, con las claves exigidas.
fn system_prompt_for(doc_type: DocumentType) -> String {
    let esquema = match doc_type {
        DocumentType::Cliente => {
            r#"Extrae el perfil del cliente a partir de los documentos suministrados.
Claves del objeto: "nombre", "industria", "contacto", "resumen" (strings) y "necesidades" (lista de strings)."#
        }
        DocumentType::Relevamiento => {
            r#"Redacta el informe de relevamiento de requisitos del proyecto.
Claves del objeto: "resumen" (string), "requisitos_funcionales", "requisitos_no_funcionales", "supuestos" y "riesgos" (listas de strings)."#
        }
        DocumentType::Informe => {
            r#"Redacta el resumen ejecutivo del proyecto.
Claves del objeto: "titulo", "introduccion", "alcance", "conclusiones" (strings) y "recomendaciones" (lista de strings)."#
        }
        DocumentType::Objetivos => {
            r#"Define los objetivos del proyecto.
Claves del objeto: "objetivo_general" (string) y "objetivos_especificos" (lista de strings)."#
        }
        DocumentType::HistoriasUsuario => {
            r#"Redacta las historias de usuario del proyecto.
Claves del objeto: "historias" (lista de objetos con "como", "quiero", "para", "prioridad" (strings) y "criterios_aceptacion" (lista de strings)). La prioridad es ALTA, MEDIA o BAJA."#
        }
        DocumentType::DiagramasFlujo => {
            r#"Modela los flujos principales del sistema como diagramas Mermaid (flowchart TD).
Claves del objeto: "descripcion" (string) y "diagramas" (lista de objetos con "titulo" y "mermaid")."#
        }
        DocumentType::Sprints => {
            r#"Planifica los sprints del proyecto a partir de las historias de usuario.
Claves del objeto: "sprints" (lista de objetos con "numero" (entero), "objetivo" (string), "duracion_semanas" (entero) e "historias" (lista de strings))."#
        }
        DocumentType::Der => {
            r#"Modela el diagrama entidad-relación del sistema en sintaxis Mermaid (erDiagram).
Claves del objeto: "descripcion" y "mermaid" (strings)."#
        }
        DocumentType::CasosUso => {
            r#"Redacta los casos de uso del sistema.
Claves del objeto: "actores" (lista de strings) y "casos" (lista de objetos con "nombre", "actor", "descripcion" (strings) y "flujo_principal" (lista de strings))."#
        }
    };
    format!("{PREAMBLE_COMUN}\n\n{esquema}")
}

/// Concatena los metadatos del proyecto y los documentos de contexto
/// (los prerrequisitos ya completados) en un único prompt de usuario.
fn build_user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Proyecto: {}\nDescripción: {}\n",
        request.project.name, request.project.description
    );
    if request.context_documents.is_empty() {
        prompt.push_str("\nNo hay documentos previos; trabaja solo con los metadatos del proyecto.\n");
    } else {
        prompt.push_str("\nDocumentos ya disponibles del proyecto:\n");
        for doc in &request.context_documents {
            prompt.push_str(&format!(
                "\n--- [{}] {} ---\n{}\n",
                doc.doc_type.as_str(),
                doc.name,
                doc.content
            ));
        }
    }
    prompt.push_str(&format!(
        "\nGenera el artefacto {} siguiendo el esquema indicado.",
        request.doc_type.as_str()
    ));
    prompt
}

/// Limpia la respuesta del LLM (fences de código incluidos) y la parsea al
/// payload tipado del artefacto pedido. Un JSON malformado es un error: un
/// artefacto generado debe cumplir el contrato.
pub fn parse_payload(doc_type: DocumentType, response: &str) -> Result<GeneratedPayload> {
    let json_response = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed = match doc_type {
        DocumentType::Cliente => {
            serde_json::from_str(json_response).map(GeneratedPayload::Cliente)
        }
        DocumentType::Relevamiento => {
            serde_json::from_str(json_response).map(GeneratedPayload::Relevamiento)
        }
        DocumentType::Informe => {
            serde_json::from_str(json_response).map(GeneratedPayload::Informe)
        }
        DocumentType::Objetivos => {
            serde_json::from_str(json_response).map(GeneratedPayload::Objetivos)
        }
        DocumentType::HistoriasUsuario => {
            serde_json::from_str(json_response).map(GeneratedPayload::HistoriasUsuario)
        }
        DocumentType::DiagramasFlujo => {
            serde_json::from_str(json_response).map(GeneratedPayload::DiagramasFlujo)
        }
        DocumentType::Sprints => {
            serde_json::from_str(json_response).map(GeneratedPayload::Sprints)
        }
        DocumentType::Der => serde_json::from_str(json_response).map(GeneratedPayload::Der),
        DocumentType::CasosUso => {
            serde_json::from_str(json_response).map(GeneratedPayload::CasosUso)
        }
    };

    parsed.map_err(|e| {
        warn!(
            "No se pudo parsear la respuesta del LLM para {}: {}. Respuesta: '{}'",
            doc_type.as_str(),
            e,
            response
        );
        anyhow!("La respuesta del proveedor para {} no cumple el contrato: {e}", doc_type.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use crate::provider::ContextDocument;

    #[test]
    fn parse_acepta_json_con_fences() {
        let respuesta = r#"```json
{"objetivo_general": "Digitalizar el archivo", "objetivos_especificos": ["Carga de documentos", "Búsqueda"]}
```"#;
        let payload = parse_payload(DocumentType::Objetivos, respuesta).unwrap();
        assert_eq!(payload.doc_type(), DocumentType::Objetivos);
    }

    #[test]
    fn parse_rechaza_json_que_no_cumple_el_contrato() {
        let respuesta = r#"{"resumen": "Sin listas"}"#;
        assert!(parse_payload(DocumentType::Relevamiento, respuesta).is_err());
    }

    #[test]
    fn el_prompt_incluye_el_contexto_de_prerrequisitos() {
        let request = GenerationRequest {
            project: Project::new("Mesa de Ayuda".to_string(), "Tickets internos".to_string()),
            doc_type: DocumentType::Relevamiento,
            context_documents: vec![ContextDocument {
                doc_type: DocumentType::Cliente,
                name: "Perfil del Cliente.md".to_string(),
                content: "Cliente: Soporte SA".to_string(),
            }],
        };
        let prompt = build_user_prompt(&request);
        assert!(prompt.contains("Mesa de Ayuda"));
        assert!(prompt.contains("[CLIENTE]"));
        assert!(prompt.contains("Cliente: Soporte SA"));
        assert!(prompt.contains("RELEVAMIENTO"));
    }

    #[test]
    fn cada_tipo_tiene_prompt_propio() {
        for t in DocumentType::ALL {
            let prompt = system_prompt_for(t);
            assert!(prompt.contains("JSON"), "el prompt de {t} debe exigir JSON");
        }
    }
}
