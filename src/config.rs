//! Configuração do roundtrip carregada a partir de `roundtrip.toml`.
//!
//! A struct [`RoundtripConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ROUNDTRIP_URL` e `ROUNDTRIP_PASSWORD` têm
//! precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poller::PollSettings;
use crate::remote::{FolderMetadata, ImportOptions, SearchFilter};
use crate::workflow::FolderMapping;

pub const DEFAULT_CONFIG_FILE: &str = "roundtrip.toml";

/// Configuração de nível superior carregada de `roundtrip.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundtripConfig {
    /// URL base do servidor (sem barra final).
    pub server_url: String,
    pub username: String,
    pub password: String,

    /// Pasta onde a importação deposita os recursos a verificar.
    pub source_folder: String,
    /// Pasta que recebe as cópias.
    pub destination_folder: String,
    pub destination_label: String,

    /// Tipo de recurso pesquisado e usado no media type das chamadas.
    pub resource_type: String,

    /// Diretório local com os arquivos a importar.
    pub artifacts_dir: PathBuf,
    pub include_access_events: bool,

    /// Intervalo entre consultas de estado da importação, em milissegundos.
    pub poll_interval_ms: u64,
    /// Prazo máximo por importação; ausente significa esperar indefinidamente.
    pub poll_timeout_ms: Option<u64>,
    pub max_transport_retries: u32,

    /// Número de verificações simultâneas. 1 mantém a execução sequencial.
    pub concurrency: usize,
    /// Se verdadeiro, uma importação que termina em `failed` aborta a execução.
    pub fail_on_import_failure: bool,
    /// Remove as pastas de origem e destino ao final.
    pub cleanup: bool,
}

impl Default for RoundtripConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/jasperserver-pro".to_string(),
            username: "superuser".to_string(),
            password: "superuser".to_string(),
            source_folder: "/temp/exportResources".to_string(),
            destination_folder: "/temp/DomainsRestCopies".to_string(),
            destination_label: "DomainsRestCopies".to_string(),
            resource_type: "semanticLayerDataSource".to_string(),
            artifacts_dir: PathBuf::from("imports/domains"),
            include_access_events: true,
            poll_interval_ms: 100,
            poll_timeout_ms: None,
            max_transport_retries: 3,
            concurrency: 1,
            fail_on_import_failure: false,
            cleanup: true,
        }
    }
}

impl RoundtripConfig {
    /// Carrega `roundtrip.toml` do diretório atual, ou os defaults se não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<RoundtripConfig>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROUNDTRIP_URL").filter(|v| !v.is_empty()) {
            self.server_url = url;
        }
        if let Some(password) = lookup("ROUNDTRIP_PASSWORD").filter(|v| !v.is_empty()) {
            self.password = password;
        }
    }

    pub fn folder_mapping(&self) -> FolderMapping {
        FolderMapping::new(&self.source_folder, &self.destination_folder)
    }

    pub fn destination_metadata(&self) -> FolderMetadata {
        FolderMetadata {
            label: self.destination_label.clone(),
            description: "Test folder".to_string(),
            version: 0,
        }
    }

    pub fn search_filter(&self) -> SearchFilter {
        SearchFilter {
            folder_uri: self.source_folder.clone(),
            resource_type: Some(self.resource_type.clone()),
            recursive: true,
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            include_access_events: self.include_access_events,
            update: false,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self.poll_timeout_ms.map(Duration::from_millis),
            max_transport_retries: self.max_transport_retries,
        }
    }
}
