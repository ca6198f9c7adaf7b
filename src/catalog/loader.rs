use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::errors::CatalogError;

pub const MENU_FILE: &str = "menu.json";
pub const FIELDS_FILE: &str = "fields.json";

/// Where the taxonomy and templates documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    Directory(PathBuf),
    Remote {
        taxonomy_url: String,
        templates_url: String,
    },
}

impl CatalogSource {
    /// Remote URLs win over a directory; with neither the demo catalog is used.
    pub fn from_config(config: &Config) -> Self {
        match (&config.taxonomy_url, &config.templates_url) {
            (Some(taxonomy_url), Some(templates_url)) => CatalogSource::Remote {
                taxonomy_url: taxonomy_url.clone(),
                templates_url: templates_url.clone(),
            },
            _ => match &config.catalog_dir {
                Some(dir) => CatalogSource::Directory(dir.clone()),
                None => CatalogSource::Builtin,
            },
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::Builtin => f.write_str("built-in demo catalog"),
            CatalogSource::Directory(dir) => write!(f, "{}", dir.display()),
            CatalogSource::Remote { taxonomy_url, .. } => f.write_str(taxonomy_url),
        }
    }
}

/// Lifecycle of the catalog as seen by the shell.
#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Ready(Arc<Catalog>),
    Failed(String),
}

impl LoadState {
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        match self {
            LoadState::Ready(catalog) => Some(Arc::clone(catalog)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }
}

/// Fetches both catalog documents once; failures become [`LoadState::Failed`].
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    source: CatalogSource,
    timeout: Duration,
}

impl CatalogLoader {
    pub fn new(source: CatalogSource, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CatalogSource::from_config(config),
            Duration::from_millis(config.catalog_timeout_ms),
        )
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn load(&self) -> LoadState {
        match self.fetch() {
            Ok(catalog) => {
                info!(source = %self.source, summary = %catalog, "catalog loaded");
                LoadState::Ready(Arc::new(catalog))
            }
            Err(err) => {
                warn!(source = %self.source, error = %err, "catalog load failed");
                LoadState::Failed(err.to_string())
            }
        }
    }

    pub fn fetch(&self) -> Result<Catalog, CatalogError> {
        match &self.source {
            CatalogSource::Builtin => Catalog::builtin(),
            CatalogSource::Directory(dir) => {
                let menu = read_document(&dir.join(MENU_FILE))?;
                let fields = read_document(&dir.join(FIELDS_FILE))?;
                Catalog::from_json(&menu, &fields)
            }
            CatalogSource::Remote {
                taxonomy_url,
                templates_url,
            } => {
                let agent = ureq::AgentBuilder::new()
                    .timeout_connect(self.timeout)
                    .timeout_read(self.timeout)
                    .build();
                let menu = get_document(&agent, taxonomy_url)?;
                let fields = get_document(&agent, templates_url)?;
                Catalog::from_json(&menu, &fields)
            }
        }
    }
}

/// Writes a catalog as a directory source that [`CatalogLoader`] can read.
pub fn write_directory(catalog: &Catalog, dir: &Path) -> Result<(), CatalogError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(MENU_FILE), catalog.menu_json()?)?;
    fs::write(dir.join(FIELDS_FILE), catalog.fields_json()?)?;
    Ok(())
}

fn read_document(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|err| {
        CatalogError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    })
}

fn get_document(agent: &ureq::Agent, url: &str) -> Result<String, CatalogError> {
    match agent.get(url).call() {
        Ok(response) => response
            .into_string()
            .map_err(|err| CatalogError::Transport(err.to_string())),
        Err(ureq::Error::Status(code, _)) => Err(CatalogError::Http(code)),
        Err(ureq::Error::Transport(err)) => Err(CatalogError::Transport(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_source_round_trips_written_catalog() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        write_directory(&catalog, temp.path()).unwrap();

        let loader = CatalogLoader::new(
            CatalogSource::Directory(temp.path().to_path_buf()),
            Duration::from_secs(1),
        );
        let loaded = loader.load().catalog().expect("catalog should load");
        assert_eq!(loaded.taxonomy(), catalog.taxonomy());
    }

    #[test]
    fn missing_directory_is_a_failed_state() {
        let temp = tempfile::tempdir().unwrap();
        let loader = CatalogLoader::new(
            CatalogSource::Directory(temp.path().join("absent")),
            Duration::from_secs(1),
        );
        match loader.load() {
            LoadState::Failed(message) => assert!(message.contains("menu.json")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn remote_urls_take_precedence() {
        let config = Config {
            catalog_dir: Some(PathBuf::from("/tmp/catalog")),
            taxonomy_url: Some("http://localhost/menu".into()),
            templates_url: Some("http://localhost/fields".into()),
            ..Config::default()
        };
        assert!(matches!(
            CatalogSource::from_config(&config),
            CatalogSource::Remote { .. }
        ));
    }
}
