//! The plugin registry, built once at startup and shared by reference.

use std::{collections::HashMap, sync::Arc};

use crate::{
  plugin::IndexPlugin,
  resource::ResourceType,
  signature::SignatureAlgorithm,
};

/// Signature algorithms and index plugins, keyed by resource type.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  signatures: HashMap<ResourceType, Vec<Arc<dyn SignatureAlgorithm>>>,
  plugins:    HashMap<ResourceType, Vec<Arc<dyn IndexPlugin>>>,
}

impl Registry {
  pub fn builder() -> RegistryBuilder { RegistryBuilder::default() }

  pub fn signatures_for(
    &self,
    resource_type: ResourceType,
  ) -> &[Arc<dyn SignatureAlgorithm>] {
    self
      .signatures
      .get(&resource_type)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn plugins_for(&self, resource_type: ResourceType) -> &[Arc<dyn IndexPlugin>] {
    self
      .plugins
      .get(&resource_type)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// Resource types with at least one signature algorithm, ascending.
  pub fn resource_types(&self) -> Vec<ResourceType> {
    let mut types: Vec<ResourceType> = self.signatures.keys().copied().collect();
    types.sort();
    types
  }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
  registry: Registry,
}

impl RegistryBuilder {
  /// Register an algorithm under the type it declares.
  pub fn signature(mut self, algorithm: impl SignatureAlgorithm + 'static) -> Self {
    self
      .registry
      .signatures
      .entry(algorithm.resource_type())
      .or_default()
      .push(Arc::new(algorithm));
    self
  }

  pub fn plugin(
    mut self,
    resource_type: ResourceType,
    plugin: impl IndexPlugin + 'static,
  ) -> Self {
    self
      .registry
      .plugins
      .entry(resource_type)
      .or_default()
      .push(Arc::new(plugin));
    self
  }

  pub fn build(self) -> Registry { self.registry }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    plugin::WithdrawnPlugin,
    signature::{IdentifierSignature, MetadataSignature},
  };

  #[test]
  fn lookups_are_scoped_by_type() {
    let registry = Registry::builder()
      .signature(MetadataSignature::new(ResourceType::ITEM, "title", "dc.title"))
      .signature(IdentifierSignature::doi(ResourceType::ITEM, "dc.identifier.doi"))
      .signature(IdentifierSignature::new(
        ResourceType::PERSON,
        "orcid",
        "person.orcid",
      ))
      .plugin(ResourceType::ITEM, WithdrawnPlugin)
      .build();

    assert_eq!(registry.signatures_for(ResourceType::ITEM).len(), 2);
    assert_eq!(registry.signatures_for(ResourceType::PERSON).len(), 1);
    assert!(registry.signatures_for(ResourceType::PROJECT).is_empty());
    assert_eq!(registry.plugins_for(ResourceType::ITEM).len(), 1);
    assert!(registry.plugins_for(ResourceType::PERSON).is_empty());
    assert_eq!(
      registry.resource_types(),
      [ResourceType::ITEM, ResourceType::PERSON]
    );
  }
}
