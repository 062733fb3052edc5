//! Store selection shared by every subcommand.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use foodpoi_core::PoiIndex;
use log::info;

use crate::{ARG_DATABASE, ARG_ELASTICSEARCH_URL, CliError};

/// Database used when no store option is given.
pub(crate) const DEFAULT_DATABASE: &str = "foodpoi.db";

/// Index name used when `--index` is not given.
pub(crate) const DEFAULT_INDEX: &str = "foodpoi";

/// Resolved store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreConfig {
    /// SQLite database file.
    Sqlite { path: Utf8PathBuf },
    /// Elasticsearch cluster and index.
    Elasticsearch { base_url: String, index: String },
}

impl StoreConfig {
    /// Pick a backend from the store options of a subcommand.
    pub(crate) fn resolve(
        database: Option<Utf8PathBuf>,
        elasticsearch_url: Option<String>,
        index: Option<String>,
    ) -> Result<Self, CliError> {
        match (database, elasticsearch_url) {
            (Some(_), Some(_)) => Err(CliError::ConflictingStores {
                first: ARG_DATABASE,
                second: ARG_ELASTICSEARCH_URL,
            }),
            (None, Some(base_url)) => Ok(Self::Elasticsearch {
                base_url,
                index: index.unwrap_or_else(|| DEFAULT_INDEX.to_owned()),
            }),
            (database, None) => Ok(Self::Sqlite {
                path: database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            }),
        }
    }

    /// Open the store, creating the database or index when `create` is set.
    pub(crate) async fn open(&self, create: bool) -> Result<Arc<dyn PoiIndex>, CliError> {
        match self {
            Self::Sqlite { path } => open_sqlite(path, create),
            Self::Elasticsearch { base_url, index } => {
                open_elasticsearch(base_url, index, create).await
            }
        }
    }
}

#[cfg(feature = "store-sqlite")]
fn open_sqlite(path: &Utf8Path, create: bool) -> Result<Arc<dyn PoiIndex>, CliError> {
    if create {
        foodpoi_fs::ensure_parent_dir(path).map_err(|source| CliError::PrepareDatabase {
            path: path.to_path_buf(),
            source,
        })?;
    } else {
        crate::require_file(path, ARG_DATABASE)?;
    }
    let index = foodpoi_core::SqlitePoiIndex::open(path.as_std_path())?;
    info!("opened SQLite index at {path}");
    Ok(Arc::new(index))
}

#[cfg(not(feature = "store-sqlite"))]
fn open_sqlite(_path: &Utf8Path, _create: bool) -> Result<Arc<dyn PoiIndex>, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "opening a SQLite database",
    })
}

#[cfg(feature = "store-elasticsearch")]
async fn open_elasticsearch(
    base_url: &str,
    index: &str,
    create: bool,
) -> Result<Arc<dyn PoiIndex>, CliError> {
    use foodpoi_data::elasticsearch::{ElasticsearchConfig, ElasticsearchPoiIndex};

    let config = ElasticsearchConfig::new(base_url).with_index(index);
    let store = ElasticsearchPoiIndex::with_config(config)?;
    if create {
        let created = store
            .ensure_index()
            .await
            .map_err(|source| CliError::PrepareIndex {
                index: index.to_owned(),
                source,
            })?;
        if created {
            info!("created Elasticsearch index {index}");
        }
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "store-elasticsearch"))]
#[expect(clippy::unused_async, reason = "signature matches the enabled variant")]
async fn open_elasticsearch(
    _base_url: &str,
    _index: &str,
    _create: bool,
) -> Result<Arc<dyn PoiIndex>, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-elasticsearch",
        action: "connecting to Elasticsearch",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_to_local_sqlite() {
        let config = StoreConfig::resolve(None, None, None).expect("resolve");
        assert_eq!(
            config,
            StoreConfig::Sqlite {
                path: Utf8PathBuf::from(DEFAULT_DATABASE)
            }
        );
    }

    #[rstest]
    #[case(None, DEFAULT_INDEX)]
    #[case(Some("restaurants"), "restaurants")]
    fn elasticsearch_url_selects_cluster(#[case] index: Option<&str>, #[case] expected: &str) {
        let config = StoreConfig::resolve(
            None,
            Some("http://localhost:9200".to_owned()),
            index.map(str::to_owned),
        )
        .expect("resolve");
        assert_eq!(
            config,
            StoreConfig::Elasticsearch {
                base_url: "http://localhost:9200".to_owned(),
                index: expected.to_owned(),
            }
        );
    }

    #[rstest]
    fn both_backends_conflict() {
        let err = StoreConfig::resolve(
            Some(Utf8PathBuf::from("pois.db")),
            Some("http://localhost:9200".to_owned()),
            None,
        )
        .expect_err("conflicting stores");
        assert!(matches!(err, CliError::ConflictingStores { .. }));
    }
}
