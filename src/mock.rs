//! Proveedor mock para desarrollo sin backend de IA: construye los
//! artefactos a partir de plantillas deterministas, simula la latencia de
//! red y permite inyectar errores mediante una tasa de éxito configurable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::models::{
    CasoUso, CasosUso, Diagrama, DiagramaEntidadRelacion, DiagramasFlujo, DocumentType,
    GeneratedPayload, HistoriaUsuario, HistoriasUsuario, InformeRelevamiento, MockConfig,
    ObjetivosProyecto, PerfilCliente, PlanSprints, ResumenEjecutivo, Sprint,
};
use crate::provider::{DocumentGenerator, GenerationRequest};

/// Generador mock con latencia y tasa de éxito configurables.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    config: MockConfig,
}

impl MockGenerator {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DocumentGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPayload> {
        if self.config.latency_ms > 0 {
            sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        // Inyección de errores: con tasa 1.0 nunca falla, con 0.0 siempre.
        let tirada: f32 = rand::thread_rng().gen();
        if tirada >= self.config.success_rate {
            return Err(anyhow!(
                "Fallo simulado del proveedor mock (tasa de éxito {})",
                self.config.success_rate
            ));
        }

        Ok(build_payload(request))
    }
}

/// Construye el artefacto de plantilla para el tipo pedido, derivando el
/// contenido del nombre del proyecto y de los documentos de contexto.
fn build_payload(request: &GenerationRequest) -> GeneratedPayload {
    let proyecto = &request.project.name;
    let fuentes: Vec<String> = request
        .context_documents
        .iter()
        .map(|d| d.name.clone())
        .collect();

    match request.doc_type {
        DocumentType::Cliente => GeneratedPayload::Cliente(PerfilCliente {
            nombre: format!("Cliente de {proyecto}"),
            industria: "Servicios".to_string(),
            contacto: "contacto@cliente.example".to_string(),
            resumen: format!(
                "Perfil de ejemplo construido por el proveedor mock para el proyecto {proyecto}."
            ),
            necesidades: vec![
                "Centralizar la documentación del proyecto".to_string(),
                "Reducir el trabajo manual de redacción".to_string(),
            ],
        }),
        DocumentType::Relevamiento => GeneratedPayload::Relevamiento(InformeRelevamiento {
            resumen: format!(
                "Relevamiento de {proyecto} elaborado a partir de: {}.",
                if fuentes.is_empty() {
                    "los metadatos del proyecto".to_string()
                } else {
                    fuentes.join(", ")
                }
            ),
            requisitos_funcionales: vec![
                "Alta, edición y baja de proyectos".to_string(),
                "Carga de documentos por etapa y tipo".to_string(),
                "Generación de artefactos con IA".to_string(),
            ],
            requisitos_no_funcionales: vec![
                "Interfaz web en español".to_string(),
                "Respuesta de la API en menos de un segundo".to_string(),
            ],
            supuestos: vec!["El cliente dispone de los documentos fuente".to_string()],
            riesgos: vec!["Alcance poco definido en la etapa preliminar".to_string()],
        }),
        DocumentType::Informe => GeneratedPayload::Informe(ResumenEjecutivo {
            titulo: format!("Resumen Ejecutivo — {proyecto}"),
            introduccion: format!(
                "Este informe resume el estado del relevamiento del proyecto {proyecto}."
            ),
            alcance: "Etapa preliminar y análisis funcional inicial.".to_string(),
            conclusiones: "La información relevada es suficiente para avanzar al análisis."
                .to_string(),
            recomendaciones: vec![
                "Validar los requisitos con el cliente".to_string(),
                "Priorizar el backlog antes de planificar sprints".to_string(),
            ],
        }),
        DocumentType::Objetivos => GeneratedPayload::Objetivos(ObjetivosProyecto {
            objetivo_general: format!(
                "Entregar el sistema {proyecto} cubriendo las necesidades relevadas."
            ),
            objetivos_especificos: vec![
                "Definir el modelo de datos".to_string(),
                "Implementar la gestión documental".to_string(),
                "Automatizar la generación de artefactos".to_string(),
            ],
        }),
        DocumentType::HistoriasUsuario => GeneratedPayload::HistoriasUsuario(HistoriasUsuario {
            historias: vec![
                HistoriaUsuario {
                    como: "analista".to_string(),
                    quiero: "subir documentos del cliente".to_string(),
                    para: "mantener el relevamiento centralizado".to_string(),
                    criterios_aceptacion: vec![
                        "Acepta PDF y texto plano".to_string(),
                        "El documento queda asociado a su etapa".to_string(),
                    ],
                    prioridad: "ALTA".to_string(),
                },
                HistoriaUsuario {
                    como: "jefe de proyecto".to_string(),
                    quiero: "generar el plan de sprints".to_string(),
                    para: "planificar el equipo".to_string(),
                    criterios_aceptacion: vec![
                        "Requiere historias de usuario completadas".to_string()
                    ],
                    prioridad: "MEDIA".to_string(),
                },
            ],
        }),
        DocumentType::DiagramasFlujo => GeneratedPayload::DiagramasFlujo(DiagramasFlujo {
            descripcion: format!("Flujos principales del sistema {proyecto}."),
            diagramas: vec![Diagrama {
                titulo: "Carga y generación de documentos".to_string(),
                mermaid: "flowchart TD\n  A[Subir documento] --> B{Prerrequisitos completos?}\n  B -- Si --> C[Generar artefacto]\n  B -- No --> D[Mostrar faltantes]".to_string(),
            }],
        }),
        DocumentType::Sprints => GeneratedPayload::Sprints(PlanSprints {
            sprints: vec![
                Sprint {
                    numero: 1,
                    objetivo: "Gestión de proyectos y documentos".to_string(),
                    duracion_semanas: 2,
                    historias: vec!["Subir documentos del cliente".to_string()],
                },
                Sprint {
                    numero: 2,
                    objetivo: "Generación de artefactos por IA".to_string(),
                    duracion_semanas: 2,
                    historias: vec!["Generar el plan de sprints".to_string()],
                },
            ],
        }),
        DocumentType::Der => GeneratedPayload::Der(DiagramaEntidadRelacion {
            descripcion: format!("Modelo de datos inicial de {proyecto}."),
            mermaid: "erDiagram\n  PROYECTO ||--o{ DOCUMENTO : contiene\n  DOCUMENTO }o--|| TIPO_DOCUMENTO : es_de".to_string(),
        }),
        DocumentType::CasosUso => GeneratedPayload::CasosUso(CasosUso {
            actores: vec!["Analista".to_string(), "Jefe de proyecto".to_string()],
            casos: vec![CasoUso {
                nombre: "Generar artefacto".to_string(),
                actor: "Analista".to_string(),
                descripcion: "El analista solicita la generación de un artefacto por IA."
                    .to_string(),
                flujo_principal: vec![
                    "Selecciona el tipo de documento".to_string(),
                    "El sistema valida los prerrequisitos".to_string(),
                    "El proveedor genera el artefacto".to_string(),
                    "El documento queda guardado en el proyecto".to_string(),
                ],
            }],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use crate::provider::ContextDocument;

    fn request(doc_type: DocumentType) -> GenerationRequest {
        GenerationRequest {
            project: Project::new("Archivo Digital".to_string(), String::new()),
            doc_type,
            context_documents: vec![ContextDocument {
                doc_type: DocumentType::Cliente,
                name: "Perfil del Cliente.md".to_string(),
                content: "Cliente de prueba".to_string(),
            }],
        }
    }

    fn mock(success_rate: f32) -> MockGenerator {
        MockGenerator::new(MockConfig {
            latency_ms: 0,
            success_rate,
        })
    }

    #[tokio::test]
    async fn con_tasa_uno_nunca_falla_y_devuelve_el_tipo_pedido() {
        let generator = mock(1.0);
        for t in DocumentType::ALL {
            let payload = generator.generate(&request(t)).await.unwrap();
            assert_eq!(payload.doc_type(), t);
        }
    }

    #[tokio::test]
    async fn con_tasa_cero_siempre_falla() {
        let generator = mock(0.0);
        for _ in 0..10 {
            assert!(generator
                .generate(&request(DocumentType::Cliente))
                .await
                .is_err());
        }
    }

    #[tokio::test]
    async fn el_payload_cumple_el_mismo_contrato_que_el_proveedor_real() {
        // Mismo esquema de consumo: serializar el payload del mock y
        // re-parsearlo con el parser del proveedor real, tipo a tipo.
        let generator = mock(1.0);
        for t in DocumentType::ALL {
            let payload = generator.generate(&request(t)).await.unwrap();
            let value = serde_json::to_value(&payload).unwrap();

            // El objeto interno (sin la etiqueta) debe parsear con el
            // contrato que exige el proveedor real.
            let mut interno = value.clone();
            interno.as_object_mut().unwrap().remove("tipo");
            let reparsed =
                crate::llm::parse_payload(t, &serde_json::to_string(&interno).unwrap()).unwrap();
            assert_eq!(reparsed.doc_type(), t);
        }
    }
}
