//! Static catalog of preloadable data sources and search-query templates.
//!
//! Loaded once at startup from YAML and never mutated afterwards. The import
//! pipeline only reads data source definitions from it; query views are
//! served as-is to read paths.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::request::PreloadRequest;

/// Placeholder substituted with the bound index's name.
pub const INDEX_NAME_PLACEHOLDER: &str = "{dbIndexName}";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error reading catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },

    #[error("query view references unknown {kind} '{id}'")]
    DanglingReference { kind: &'static str, id: String },

    #[error("unknown data source '{0}'")]
    UnknownDataSource(String),
}

/// A dataset that can be preloaded into the default store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDefinition {
    pub id: String,
    pub upload_path: String,
    pub upload_type: Option<String>,
    pub key_prefix: Option<String>,
    pub id_field: Option<String>,
    pub js_function_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub id: String,
    pub name: String,
}

/// A parameterized search-query template bound to an (index, data source) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryViewData {
    pub query: String,
    pub db_index_id: String,
    pub data_source_id: String,
}

/// Query view with its index placeholder resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedQueryView {
    pub query: String,
    pub db_index_id: String,
    pub db_index_name: String,
    pub data_source_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub data_sources: Vec<DataSourceDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub query_views: Vec<QueryViewData>,
}

impl Catalog {
    /// Load the catalog from disk. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            warn!("Catalog file {} not found, starting with an empty catalog", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&content)?;
        info!(
            "Loaded catalog from {}: {} data sources, {} indexes, {} query views",
            path.display(),
            catalog.data_sources.len(),
            catalog.indexes.len(),
            catalog.query_views.len()
        );
        Ok(catalog)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut sources = HashSet::new();
        for ds in &self.data_sources {
            if !sources.insert(ds.id.as_str()) {
                return Err(CatalogError::Duplicate { kind: "data source", id: ds.id.clone() });
            }
        }
        let mut indexes = HashSet::new();
        for idx in &self.indexes {
            if !indexes.insert(idx.id.as_str()) {
                return Err(CatalogError::Duplicate { kind: "index", id: idx.id.clone() });
            }
        }
        for view in &self.query_views {
            if !indexes.contains(view.db_index_id.as_str()) {
                return Err(CatalogError::DanglingReference {
                    kind: "index",
                    id: view.db_index_id.clone(),
                });
            }
            if !sources.contains(view.data_source_id.as_str()) {
                return Err(CatalogError::DanglingReference {
                    kind: "data source",
                    id: view.data_source_id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn data_source(&self, id: &str) -> Option<&DataSourceDefinition> {
        self.data_sources.iter().find(|ds| ds.id == id)
    }

    /// Resolve a preload request to catalog entries, in catalog order for
    /// `isAll` and request order otherwise. Duplicate ids are collapsed.
    pub fn select(&self, request: &PreloadRequest) -> Result<Vec<&DataSourceDefinition>, CatalogError> {
        if request.is_all() {
            return Ok(self.data_sources.iter().collect());
        }
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(request.ids.len());
        for id in &request.ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let ds = self
                .data_source(id)
                .ok_or_else(|| CatalogError::UnknownDataSource(id.clone()))?;
            selected.push(ds);
        }
        Ok(selected)
    }

    /// All query views with `{dbIndexName}` substituted.
    pub fn resolved_query_views(&self) -> Vec<ResolvedQueryView> {
        self.query_views
            .iter()
            .filter_map(|view| {
                let index = self.indexes.iter().find(|i| i.id == view.db_index_id)?;
                Some(ResolvedQueryView {
                    query: view.query.replace(INDEX_NAME_PLACEHOLDER, &index.name),
                    db_index_id: view.db_index_id.clone(),
                    db_index_name: index.name.clone(),
                    data_source_id: view.data_source_id.clone(),
                })
            })
            .collect()
    }
}
