use anyhow::{bail, Context};
use packrip_core::{CollectionStore, LedgerStore, ServiceConfig, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DB_FILE: &str = "packrip.db";
const CONFIG_FILE: &str = "packrip.json";

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("packrip")
}

/// Resolved service config plus the stores every command works against.
pub struct CliContext {
    pub data_dir: PathBuf,
    pub service: ServiceConfig,
    pub configs: Arc<CollectionStore>,
    pub ledger: Arc<LedgerStore>,
}

impl CliContext {
    pub async fn load(
        data_dir: PathBuf,
        config_path: Option<PathBuf>,
        channel: Option<String>,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut service = load_service_config(&data_dir, config_path.as_deref()).await?;
        service.apply_env();
        if let Some(channel) = channel {
            service.channel_id = channel;
        }

        let storage = Arc::new(Storage::new(&data_dir.join(DB_FILE)).await?);
        tracing::debug!("Using data directory {}", data_dir.display());

        Ok(Self {
            data_dir,
            service,
            configs: Arc::new(CollectionStore::new(storage.clone())),
            ledger: Arc::new(LedgerStore::new(storage)),
        })
    }

    pub fn channel_id(&self) -> anyhow::Result<&str> {
        if self.service.channel_id.is_empty() {
            bail!("No channel selected. Pass --channel or set PACKRIP_CHANNEL_ID");
        }
        Ok(&self.service.channel_id)
    }
}

async fn load_service_config(
    data_dir: &Path,
    explicit: Option<&Path>,
) -> anyhow::Result<ServiceConfig> {
    if let Some(path) = explicit {
        return ServiceConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let path = data_dir.join(CONFIG_FILE);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return ServiceConfig::load(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    Ok(ServiceConfig::default())
}
