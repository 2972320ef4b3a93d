//! Modelos de dominio (proyectos, documentos y artefactos generados por IA).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Etapa del ciclo de vida a la que pertenece un documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Preliminar,
    Analisis,
    Diseno,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preliminar => "PRELIMINAR",
            Stage::Analisis => "ANALISIS",
            Stage::Diseno => "DISENO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRELIMINAR" => Some(Stage::Preliminar),
            "ANALISIS" => Some(Stage::Analisis),
            "DISENO" => Some(Stage::Diseno),
            _ => None,
        }
    }
}

/// Tipo de documento. Cada tipo pertenece a una etapa fija y puede
/// generarse por IA cuando sus prerrequisitos están completados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Cliente,
    Relevamiento,
    Informe,
    Objetivos,
    HistoriasUsuario,
    DiagramasFlujo,
    Sprints,
    Der,
    CasosUso,
}

impl DocumentType {
    /// Todos los tipos, en el orden canónico del flujo de trabajo.
    pub const ALL: [DocumentType; 9] = [
        DocumentType::Cliente,
        DocumentType::Relevamiento,
        DocumentType::Informe,
        DocumentType::Objetivos,
        DocumentType::HistoriasUsuario,
        DocumentType::DiagramasFlujo,
        DocumentType::Sprints,
        DocumentType::Der,
        DocumentType::CasosUso,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cliente => "CLIENTE",
            DocumentType::Relevamiento => "RELEVAMIENTO",
            DocumentType::Informe => "INFORME",
            DocumentType::Objetivos => "OBJETIVOS",
            DocumentType::HistoriasUsuario => "HISTORIAS_USUARIO",
            DocumentType::DiagramasFlujo => "DIAGRAMAS_FLUJO",
            DocumentType::Sprints => "SPRINTS",
            DocumentType::Der => "DER",
            DocumentType::CasosUso => "CASOS_USO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CLIENTE" => Some(DocumentType::Cliente),
            "RELEVAMIENTO" => Some(DocumentType::Relevamiento),
            "INFORME" => Some(DocumentType::Informe),
            "OBJETIVOS" => Some(DocumentType::Objetivos),
            "HISTORIAS_USUARIO" => Some(DocumentType::HistoriasUsuario),
            "DIAGRAMAS_FLUJO" => Some(DocumentType::DiagramasFlujo),
            "SPRINTS" => Some(DocumentType::Sprints),
            "DER" => Some(DocumentType::Der),
            "CASOS_USO" => Some(DocumentType::CasosUso),
            _ => None,
        }
    }

    /// Etapa fija a la que pertenece cada tipo.
    pub fn stage(&self) -> Stage {
        match self {
            DocumentType::Cliente | DocumentType::Relevamiento | DocumentType::Informe => {
                Stage::Preliminar
            }
            DocumentType::Objetivos
            | DocumentType::HistoriasUsuario
            | DocumentType::DiagramasFlujo
            | DocumentType::CasosUso => Stage::Analisis,
            DocumentType::Sprints | DocumentType::Der => Stage::Diseno,
        }
    }

    /// Título legible del artefacto, usado al guardar documentos generados.
    pub fn title(&self) -> &'static str {
        match self {
            DocumentType::Cliente => "Perfil del Cliente",
            DocumentType::Relevamiento => "Informe de Relevamiento",
            DocumentType::Informe => "Resumen Ejecutivo",
            DocumentType::Objetivos => "Objetivos del Proyecto",
            DocumentType::HistoriasUsuario => "Historias de Usuario",
            DocumentType::DiagramasFlujo => "Diagramas de Flujo",
            DocumentType::Sprints => "Plan de Sprints",
            DocumentType::Der => "Diagrama Entidad-Relación",
            DocumentType::CasosUso => "Casos de Uso",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado del ciclo de vida de un proyecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Activo,
    Archivado,
}

/// Proyecto de software cuyos documentos gestiona la aplicación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: ProjectStatus::Activo,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Origen de un documento: subido por el usuario o generado por IA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentOrigin {
    Subido,
    Generado,
}

/// Documento perteneciente a un proyecto, con su texto extraído o generado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub mime_type: Option<String>,
    pub stage: Stage,
    pub doc_type: DocumentType,
    pub content: String,
    pub size_bytes: u64,
    pub origin: DocumentOrigin,
    pub created_at: DateTime<Utc>,
}

/// Estado de generación de un tipo de documento dentro de un proyecto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Error,
}

// --- Selección de proveedor y configuración del mock ---

/// Proveedor de generación activo: backend de IA real o mock local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFlag {
    Real,
    Mock,
}

impl ProviderFlag {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "real" => Some(ProviderFlag::Real),
            "mock" => Some(ProviderFlag::Mock),
            _ => None,
        }
    }
}

/// Parámetros del proveedor mock: latencia simulada y tasa de éxito
/// para la inyección de errores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MockConfig {
    pub latency_ms: u64,
    pub success_rate: f32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: 800,
            success_rate: 1.0,
        }
    }
}

// --- Artefactos generados (contrato compartido entre proveedores) ---

/// Historia de usuario individual dentro del artefacto HISTORIAS_USUARIO.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoriaUsuario {
    pub como: String,
    pub quiero: String,
    pub para: String,
    pub criterios_aceptacion: Vec<String>,
    pub prioridad: String,
}

/// Sprint individual dentro del plan de sprints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sprint {
    pub numero: u32,
    pub objetivo: String,
    pub duracion_semanas: u32,
    pub historias: Vec<String>,
}

/// Diagrama individual (título + fuente Mermaid).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Diagrama {
    pub titulo: String,
    pub mermaid: String,
}

/// Caso de uso individual.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CasoUso {
    pub nombre: String,
    pub actor: String,
    pub descripcion: String,
    pub flujo_principal: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PerfilCliente {
    pub nombre: String,
    pub industria: String,
    pub contacto: String,
    pub resumen: String,
    pub necesidades: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InformeRelevamiento {
    pub resumen: String,
    pub requisitos_funcionales: Vec<String>,
    pub requisitos_no_funcionales: Vec<String>,
    pub supuestos: Vec<String>,
    pub riesgos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResumenEjecutivo {
    pub titulo: String,
    pub introduccion: String,
    pub alcance: String,
    pub conclusiones: String,
    pub recomendaciones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObjetivosProyecto {
    pub objetivo_general: String,
    pub objetivos_especificos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoriasUsuario {
    pub historias: Vec<HistoriaUsuario>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramasFlujo {
    pub descripcion: String,
    pub diagramas: Vec<Diagrama>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanSprints {
    pub sprints: Vec<Sprint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramaEntidadRelacion {
    pub descripcion: String,
    pub mermaid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CasosUso {
    pub actores: Vec<String>,
    pub casos: Vec<CasoUso>,
}

/// Unión etiquetada con el artefacto generado para cada tipo de documento.
/// Ambos proveedores (real y mock) devuelven exactamente estas formas, de modo
/// que el contrato queda verificado en tiempo de compilación.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tipo")]
pub enum GeneratedPayload {
    #[serde(rename = "CLIENTE")]
    Cliente(PerfilCliente),
    #[serde(rename = "RELEVAMIENTO")]
    Relevamiento(InformeRelevamiento),
    #[serde(rename = "INFORME")]
    Informe(ResumenEjecutivo),
    #[serde(rename = "OBJETIVOS")]
    Objetivos(ObjetivosProyecto),
    #[serde(rename = "HISTORIAS_USUARIO")]
    HistoriasUsuario(HistoriasUsuario),
    #[serde(rename = "DIAGRAMAS_FLUJO")]
    DiagramasFlujo(DiagramasFlujo),
    #[serde(rename = "SPRINTS")]
    Sprints(PlanSprints),
    #[serde(rename = "DER")]
    Der(DiagramaEntidadRelacion),
    #[serde(rename = "CASOS_USO")]
    CasosUso(CasosUso),
}

impl GeneratedPayload {
    /// Tipo de documento al que corresponde el artefacto.
    pub fn doc_type(&self) -> DocumentType {
        match self {
            GeneratedPayload::Cliente(_) => DocumentType::Cliente,
            GeneratedPayload::Relevamiento(_) => DocumentType::Relevamiento,
            GeneratedPayload::Informe(_) => DocumentType::Informe,
            GeneratedPayload::Objetivos(_) => DocumentType::Objetivos,
            GeneratedPayload::HistoriasUsuario(_) => DocumentType::HistoriasUsuario,
            GeneratedPayload::DiagramasFlujo(_) => DocumentType::DiagramasFlujo,
            GeneratedPayload::Sprints(_) => DocumentType::Sprints,
            GeneratedPayload::Der(_) => DocumentType::Der,
            GeneratedPayload::CasosUso(_) => DocumentType::CasosUso,
        }
    }

    /// Renderiza el artefacto como Markdown para guardarlo como documento.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        match self {
            GeneratedPayload::Cliente(p) => {
                out.push_str(&format!("# Perfil del Cliente: {}\n\n", p.nombre));
                out.push_str(&format!("**Industria:** {}\n\n", p.industria));
                out.push_str(&format!("**Contacto:** {}\n\n", p.contacto));
                out.push_str(&format!("{}\n\n## Necesidades\n\n", p.resumen));
                for n in &p.necesidades {
                    out.push_str(&format!("- {}\n", n));
                }
            }
            GeneratedPayload::Relevamiento(p) => {
                out.push_str("# Informe de Relevamiento\n\n");
                out.push_str(&format!("{}\n\n## Requisitos Funcionales\n\n", p.resumen));
                for r in &p.requisitos_funcionales {
                    out.push_str(&format!("- {}\n", r));
                }
                out.push_str("\n## Requisitos No Funcionales\n\n");
                for r in &p.requisitos_no_funcionales {
                    out.push_str(&format!("- {}\n", r));
                }
                out.push_str("\n## Supuestos\n\n");
                for s in &p.supuestos {
                    out.push_str(&format!("- {}\n", s));
                }
                out.push_str("\n## Riesgos\n\n");
                for r in &p.riesgos {
                    out.push_str(&format!("- {}\n", r));
                }
            }
            GeneratedPayload::Informe(p) => {
                out.push_str(&format!("# {}\n\n", p.titulo));
                out.push_str(&format!("## Introducción\n\n{}\n\n", p.introduccion));
                out.push_str(&format!("## Alcance\n\n{}\n\n", p.alcance));
                out.push_str(&format!("## Conclusiones\n\n{}\n\n", p.conclusiones));
                out.push_str("## Recomendaciones\n\n");
                for r in &p.recomendaciones {
                    out.push_str(&format!("- {}\n", r));
                }
            }
            GeneratedPayload::Objetivos(p) => {
                out.push_str("# Objetivos del Proyecto\n\n");
                out.push_str(&format!("**Objetivo general:** {}\n\n", p.objetivo_general));
                out.push_str("## Objetivos específicos\n\n");
                for o in &p.objetivos_especificos {
                    out.push_str(&format!("- {}\n", o));
                }
            }
            GeneratedPayload::HistoriasUsuario(p) => {
                out.push_str("# Historias de Usuario\n\n");
                for (i, h) in p.historias.iter().enumerate() {
                    out.push_str(&format!(
                        "## HU-{:02} ({})\n\nComo {}, quiero {}, para {}.\n\n",
                        i + 1,
                        h.prioridad,
                        h.como,
                        h.quiero,
                        h.para
                    ));
                    out.push_str("Criterios de aceptación:\n\n");
                    for c in &h.criterios_aceptacion {
                        out.push_str(&format!("- {}\n", c));
                    }
                    out.push('\n');
                }
            }
            GeneratedPayload::DiagramasFlujo(p) => {
                out.push_str("# Diagramas de Flujo\n\n");
                out.push_str(&format!("{}\n\n", p.descripcion));
                for d in &p.diagramas {
                    out.push_str(&format!(
                        "## {}\n\n```mermaid\n{}\n```\n\n",
                        d.titulo, d.mermaid
                    ));
                }
            }
            GeneratedPayload::Sprints(p) => {
                out.push_str("# Plan de Sprints\n\n");
                for s in &p.sprints {
                    out.push_str(&format!(
                        "## Sprint {} ({} semanas)\n\n{}\n\n",
                        s.numero, s.duracion_semanas, s.objetivo
                    ));
                    for h in &s.historias {
                        out.push_str(&format!("- {}\n", h));
                    }
                    out.push('\n');
                }
            }
            GeneratedPayload::Der(p) => {
                out.push_str("# Diagrama Entidad-Relación\n\n");
                out.push_str(&format!(
                    "{}\n\n```mermaid\n{}\n```\n",
                    p.descripcion, p.mermaid
                ));
            }
            GeneratedPayload::CasosUso(p) => {
                out.push_str("# Casos de Uso\n\n");
                out.push_str(&format!("**Actores:** {}\n\n", p.actores.join(", ")));
                for c in &p.casos {
                    out.push_str(&format!(
                        "## {} ({})\n\n{}\n\n",
                        c.nombre, c.actor, c.descripcion
                    ));
                    out.push_str("Flujo principal:\n\n");
                    for (i, paso) in c.flujo_principal.iter().enumerate() {
                        out.push_str(&format!("{}. {}\n", i + 1, paso));
                    }
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Esquema JSON del artefacto asociado a cada tipo de documento, para que
/// el frontend (y las pruebas de contrato) puedan inspeccionar la forma
/// esperada sin duplicarla.
pub fn payload_schema(t: DocumentType) -> serde_json::Value {
    let schema = match t {
        DocumentType::Cliente => schemars::schema_for!(PerfilCliente),
        DocumentType::Relevamiento => schemars::schema_for!(InformeRelevamiento),
        DocumentType::Informe => schemars::schema_for!(ResumenEjecutivo),
        DocumentType::Objetivos => schemars::schema_for!(ObjetivosProyecto),
        DocumentType::HistoriasUsuario => schemars::schema_for!(HistoriasUsuario),
        DocumentType::DiagramasFlujo => schemars::schema_for!(DiagramasFlujo),
        DocumentType::Sprints => schemars::schema_for!(PlanSprints),
        DocumentType::Der => schemars::schema_for!(DiagramaEntidadRelacion),
        DocumentType::CasosUso => schemars::schema_for!(CasosUso),
    };
    serde_json::to_value(schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_de_etapas_y_tipos() {
        assert_eq!(Stage::parse("preliminar"), Some(Stage::Preliminar));
        assert_eq!(Stage::parse("DISENO"), Some(Stage::Diseno));
        assert_eq!(Stage::parse("produccion"), None);

        assert_eq!(DocumentType::parse("CLIENTE"), Some(DocumentType::Cliente));
        assert_eq!(
            DocumentType::parse("historias_usuario"),
            Some(DocumentType::HistoriasUsuario)
        );
        assert_eq!(DocumentType::parse("FACTURAS"), None);

        for t in DocumentType::ALL {
            assert_eq!(DocumentType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn cada_tipo_tiene_etapa_fija() {
        assert_eq!(DocumentType::Cliente.stage(), Stage::Preliminar);
        assert_eq!(DocumentType::Objetivos.stage(), Stage::Analisis);
        assert_eq!(DocumentType::Der.stage(), Stage::Diseno);
    }

    #[test]
    fn payload_serializa_con_etiqueta_de_tipo() {
        let payload = GeneratedPayload::Objetivos(ObjetivosProyecto {
            objetivo_general: "Digitalizar la gestión documental".to_string(),
            objetivos_especificos: vec!["Centralizar los documentos".to_string()],
        });
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["tipo"], "OBJETIVOS");

        let roundtrip: GeneratedPayload = serde_json::from_value(value).unwrap();
        assert_eq!(roundtrip.doc_type(), DocumentType::Objetivos);
    }

    #[test]
    fn render_markdown_incluye_secciones() {
        let payload = GeneratedPayload::Der(DiagramaEntidadRelacion {
            descripcion: "Modelo de datos inicial".to_string(),
            mermaid: "erDiagram\n  PROYECTO ||--o{ DOCUMENTO : contiene".to_string(),
        });
        let md = payload.render_markdown();
        assert!(md.contains("# Diagrama Entidad-Relación"));
        assert!(md.contains("```mermaid"));
    }
}
