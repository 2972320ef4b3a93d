//! Carga y gestión de configuración de la aplicación (servidor + IA).

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::models::{MockConfig, ProviderFlag};

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub data_dir: PathBuf,

    /// Proveedor por defecto; solo se usa para sembrar `settings.json`
    /// la primera vez, después manda el valor persistido.
    pub default_provider: ProviderFlag,
    pub llm_chat_model: String,
    pub mock: MockConfig,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3344".to_string());

        let data_dir = match env::var("DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("docgen_ia"),
        };

        let provider_str = env::var("AI_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let default_provider = ProviderFlag::parse(&provider_str)
            .ok_or_else(|| anyhow!("Proveedor de IA no soportado: {provider_str}"))?;

        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let mock_latency_ms = match env::var("MOCK_LATENCY_MS") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow!("MOCK_LATENCY_MS debe ser un entero de milisegundos"))?,
            Err(_) => MockConfig::default().latency_ms,
        };
        let mock_success_rate = match env::var("MOCK_SUCCESS_RATE") {
            Ok(v) => {
                let rate: f32 = v
                    .parse()
                    .map_err(|_| anyhow!("MOCK_SUCCESS_RATE debe ser un número entre 0.0 y 1.0"))?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(anyhow!("MOCK_SUCCESS_RATE debe estar entre 0.0 y 1.0"));
                }
                rate
            }
            Err(_) => MockConfig::default().success_rate,
        };

        Ok(Self {
            server_addr,
            data_dir,
            default_provider,
            llm_chat_model,
            mock: MockConfig {
                latency_ms: mock_latency_ms,
                success_rate: mock_success_rate,
            },
        })
    }
}
