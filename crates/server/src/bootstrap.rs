use std::sync::Arc;

use slashspot_core::config::{AppConfig, ConfigError};
#[cfg(test)]
use slashspot_core::config::LoadOptions;
use slashspot_core::{DateClock, Registry, RegistryError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<Registry>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("spot store could not be opened: {0}")]
    StoreOpen(#[source] RegistryError),
}

/// Config load plus store open in one step. `main` loads config itself so
/// logging is up before the store opens.
#[cfg(test)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    bootstrap_with_clock(config, DateClock::system()).await
}

pub async fn bootstrap_with_clock(
    config: AppConfig,
    clock: DateClock,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        data_dir = %config.storage.data_dir.display(),
        "starting application bootstrap"
    );

    let registry =
        Registry::open(config.storage.data_dir.clone(), config.storage.data_file.clone(), clock)
            .map_err(BootstrapError::StoreOpen)?;
    info!(
        event_name = "system.bootstrap.store_opened",
        correlation_id = "bootstrap",
        path = %registry.file_path().display(),
        "spot store opened"
    );

    Ok(Application { config, registry: Arc::new(registry) })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use slashspot_core::config::{ConfigOverrides, LoadOptions};
    use slashspot_core::ErrorKind;
    use tempfile::TempDir;

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn options(dir: &TempDir, signing_secret: Option<&str>) -> LoadOptions {
        LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            overrides: ConfigOverrides {
                data_dir: Some(dir.path().join("data")),
                data_file: Some("spots.json".to_string()),
                signing_secret: signing_secret.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_signing_secret() {
        let dir = TempDir::new().expect("tempdir");

        let result = bootstrap(options(&dir, None)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.signing_secret"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_creates_the_data_dir_and_an_empty_store() {
        let dir = TempDir::new().expect("tempdir");

        let app = bootstrap(options(&dir, Some("s3cret"))).await.expect("bootstrap");

        let path = dir.path().join("data").join("spots.json");
        assert_eq!(app.registry.file_path(), path.as_path());
        assert_eq!(fs::read_to_string(&path).expect("store file").trim(), "{}");
    }

    #[tokio::test]
    async fn bootstrap_refuses_a_corrupt_store() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("data")).expect("data dir");
        fs::write(dir.path().join("data").join("spots.json"), "not json").expect("corrupt");

        let result = bootstrap(options(&dir, Some("s3cret"))).await;

        match result {
            Err(BootstrapError::StoreOpen(error)) => {
                assert_eq!(error.kind(), ErrorKind::StoreCorrupt)
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("corrupt store should not bootstrap"),
        }
    }
}
