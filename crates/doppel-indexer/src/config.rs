//! [`IndexerConfig`] and the registry it describes.
//!
//! ```toml
//! store_path = "~/.local/share/doppel/doppel.db"
//!
//! [dedup]
//! indexer_threads = 8
//! ignore_withdrawn = true
//!
//! [[signatures]]
//! kind = "doi"
//! resource_type = 2
//! field = "dc.identifier.doi"
//!
//! [[signatures]]
//! kind = "metadata"
//! resource_type = 2
//! signature_type = "title"
//! field = "dc.title"
//! ignore_prefix = "the "
//!
//! [[plugins]]
//! kind = "withdrawn"
//! resource_type = 2
//! ```

use std::path::PathBuf;

use doppel_core::{
  config::DedupConfig,
  plugin::{LocationPlugin, MetadataPlugin, WithdrawnPlugin},
  registry::Registry,
  resource::ResourceType,
  signature::{IdentifierSignature, MetadataSignature},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
  /// SQLite file holding resources, decisions and (by default) the index.
  pub store_path: PathBuf,
  /// Keep the dedup index in a separate SQLite file.
  #[serde(default)]
  pub index_path: Option<PathBuf>,
  #[serde(default)]
  pub dedup:      DedupConfig,
  #[serde(default)]
  pub signatures: Vec<SignatureSpec>,
  #[serde(default)]
  pub plugins:    Vec<PluginSpec>,
}

/// One `[[signatures]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignatureSpec {
  Metadata {
    resource_type:  ResourceType,
    signature_type: String,
    field:          String,
    #[serde(default)]
    ignore_prefix:  Option<String>,
  },
  Identifier {
    resource_type:  ResourceType,
    signature_type: String,
    field:          String,
    #[serde(default)]
    strip_prefixes: Vec<String>,
  },
  Doi {
    resource_type: ResourceType,
    field:         String,
  },
}

/// One `[[plugins]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginSpec {
  Withdrawn { resource_type: ResourceType },
  Location { resource_type: ResourceType },
  Metadata {
    resource_type: ResourceType,
    field:         String,
    target:        String,
  },
}

impl IndexerConfig {
  pub fn registry(&self) -> Registry {
    let mut builder = Registry::builder();

    for spec in &self.signatures {
      builder = match spec.clone() {
        SignatureSpec::Metadata { resource_type, signature_type, field, ignore_prefix } => {
          let mut algorithm =
            MetadataSignature::new(resource_type, signature_type, field);
          if let Some(prefix) = ignore_prefix {
            algorithm = algorithm.ignoring_prefix(prefix);
          }
          builder.signature(algorithm)
        }
        SignatureSpec::Identifier {
          resource_type,
          signature_type,
          field,
          strip_prefixes,
        } => {
          let algorithm = strip_prefixes.into_iter().fold(
            IdentifierSignature::new(resource_type, signature_type, field),
            IdentifierSignature::stripping,
          );
          builder.signature(algorithm)
        }
        SignatureSpec::Doi { resource_type, field } => {
          builder.signature(IdentifierSignature::doi(resource_type, field))
        }
      };
    }

    for spec in &self.plugins {
      builder = match spec.clone() {
        PluginSpec::Withdrawn { resource_type } => {
          builder.plugin(resource_type, WithdrawnPlugin)
        }
        PluginSpec::Location { resource_type } => {
          builder.plugin(resource_type, LocationPlugin)
        }
        PluginSpec::Metadata { resource_type, field, target } => {
          builder.plugin(resource_type, MetadataPlugin::new(field, target))
        }
      };
    }

    builder.build()
  }
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> IndexerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_config_uses_defaults() {
    let cfg = parse(r#"store_path = "doppel.db""#);
    assert_eq!(cfg.store_path, PathBuf::from("doppel.db"));
    assert!(cfg.index_path.is_none());
    assert_eq!(cfg.dedup.indexer_threads, 5);
    assert!(cfg.dedup.validate_connection);
    assert!(cfg.registry().resource_types().is_empty());
  }

  #[test]
  fn registry_is_built_from_the_tables() {
    let cfg = parse(
      r#"
      store_path = "doppel.db"

      [dedup]
      indexer_threads = 2
      ignore_withdrawn = true

      [[signatures]]
      kind = "doi"
      resource_type = 2
      field = "dc.identifier.doi"

      [[signatures]]
      kind = "metadata"
      resource_type = 2
      signature_type = "title"
      field = "dc.title"

      [[signatures]]
      kind = "identifier"
      resource_type = 9
      signature_type = "orcid"
      field = "person.identifier.orcid"
      strip_prefixes = ["https://orcid.org/"]

      [[plugins]]
      kind = "withdrawn"
      resource_type = 2

      [[plugins]]
      kind = "metadata"
      resource_type = 2
      field = "dc.date.issued"
      target = "year"
      "#,
    );
    assert_eq!(cfg.dedup.indexer_threads, 2);
    assert!(cfg.dedup.ignore_withdrawn);

    let registry = cfg.registry();
    assert_eq!(registry.resource_types(), [
      ResourceType::ITEM,
      ResourceType::PERSON
    ]);
    assert_eq!(registry.signatures_for(ResourceType::ITEM).len(), 2);
    assert_eq!(registry.plugins_for(ResourceType::ITEM).len(), 2);
    assert!(registry.plugins_for(ResourceType::PERSON).is_empty());
  }
}
