//! Signature extraction.
//!
//! A signature is a fingerprint string derived from a resource's content.
//! Algorithms are scoped to one resource type and tagged with a signature
//! type; their outputs are grouped under `<signature_type>_signature`.
//! Signatures are recomputed on every index pass and never cached.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resource::{Resource, ResourceType};

/// Suffix shared by every signature field name.
pub const SIGNATURE_SUFFIX: &str = "_signature";

/// The index field that holds values of `signature_type`.
pub fn field_name(signature_type: &str) -> String {
  format!("{signature_type}{SIGNATURE_SUFFIX}")
}

// ─── Algorithm trait ─────────────────────────────────────────────────────────

/// A pluggable fingerprint algorithm.
///
/// Implementations must be pure functions of the resource: no side effects
/// and no index access.
pub trait SignatureAlgorithm: Send + Sync + fmt::Debug {
  /// The only resource type this algorithm is invoked for.
  fn resource_type(&self) -> ResourceType;

  /// Label such as `title`, `doi` or `orcid`.
  fn signature_type(&self) -> &str;

  /// Zero or more signature values. Empty strings are discarded by the
  /// caller.
  fn signatures(&self, resource: &Resource) -> Vec<String>;
}

// ─── SignatureSet ────────────────────────────────────────────────────────────

/// Signature values grouped by field name.
///
/// Values contributed to the same field by several algorithms are
/// concatenated, not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureSet(BTreeMap<String, Vec<String>>);

impl SignatureSet {
  pub fn new() -> Self { Self::default() }

  /// Run every algorithm that applies to the resource's type.
  pub fn compute(
    algorithms: &[Arc<dyn SignatureAlgorithm>],
    resource: &Resource,
  ) -> Self {
    let mut set = Self::new();
    for algorithm in algorithms
      .iter()
      .filter(|a| a.resource_type() == resource.resource_type)
    {
      let field = field_name(algorithm.signature_type());
      for value in algorithm.signatures(resource) {
        set.push(&field, value);
      }
    }
    set
  }

  /// Append a value under `field`. Empty values are ignored.
  pub fn push(&mut self, field: &str, value: impl Into<String>) {
    let value = value.into();
    if value.is_empty() {
      return;
    }
    self.0.entry(field.to_owned()).or_default().push(value);
  }

  pub fn is_empty(&self) -> bool { self.0.values().all(Vec::is_empty) }

  pub fn get(&self, field: &str) -> &[String] {
    self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
  }

  /// The boolean OR filter over every populated field, e.g.
  /// `doi_signature:("10.1/x") OR title_signature:("ab" OR "cd")`.
  ///
  /// Returns `None` for an empty set.
  pub fn to_filter(&self) -> Option<String> {
    let parts: Vec<String> = self
      .0
      .iter()
      .filter(|(_, values)| !values.is_empty())
      .map(|(field, values)| {
        let terms: Vec<String> = values.iter().map(|v| quote(v)).collect();
        format!("{field}:({})", terms.join(" OR "))
      })
      .collect();
    (!parts.is_empty()).then(|| parts.join(" OR "))
  }

  /// Keep only the fields present on both sides, and within them only the
  /// values of `other` that also appear in `self`.
  pub fn intersect(&self, other: &SignatureSet) -> SignatureSet {
    let mut shared = SignatureSet::new();
    for (field, theirs) in other.iter() {
      let ours = self.get(field);
      if ours.is_empty() {
        continue;
      }
      for value in theirs.iter().filter(|v| ours.contains(*v)) {
        shared.push(field, value.clone());
      }
    }
    shared
  }
}

impl FromIterator<(String, String)> for SignatureSet {
  fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
    let mut set = Self::new();
    for (field, value) in iter {
      set.push(&field, value);
    }
    set
  }
}

/// Quote a term for the Solr-style rendering.
fn quote(value: &str) -> String {
  format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

// ─── Built-in algorithms ─────────────────────────────────────────────────────

/// Hashes a normalised metadata value, so that titles differing only in
/// case, punctuation or whitespace collide.
///
/// Normalisation: trim, lowercase, strip `ignore_prefix` if present, keep
/// alphanumeric characters only. The signature is the lowercase hex SHA-256
/// of the result.
#[derive(Debug, Clone)]
pub struct MetadataSignature {
  resource_type:  ResourceType,
  signature_type: String,
  field:          String,
  ignore_prefix:  Option<String>,
}

impl MetadataSignature {
  pub fn new(
    resource_type: ResourceType,
    signature_type: impl Into<String>,
    field: impl Into<String>,
  ) -> Self {
    Self {
      resource_type,
      signature_type: signature_type.into(),
      field: field.into(),
      ignore_prefix: None,
    }
  }

  /// Ignore a leading prefix such as an article ("the ").
  pub fn ignoring_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.ignore_prefix = Some(prefix.into().to_lowercase());
    self
  }

  fn normalize(&self, value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let stripped = self
      .ignore_prefix
      .as_deref()
      .and_then(|prefix| lowered.strip_prefix(prefix))
      .unwrap_or(lowered.as_str());
    let normalized: String =
      stripped.chars().filter(|c| c.is_alphanumeric()).collect();
    (!normalized.is_empty()).then_some(normalized)
  }
}

impl SignatureAlgorithm for MetadataSignature {
  fn resource_type(&self) -> ResourceType { self.resource_type }

  fn signature_type(&self) -> &str { &self.signature_type }

  fn signatures(&self, resource: &Resource) -> Vec<String> {
    resource
      .values(&self.field)
      .iter()
      .filter_map(|v| self.normalize(v))
      .map(|n| hex::encode(Sha256::digest(n.as_bytes())))
      .collect()
  }
}

/// Uses a normalised identifier (DOI, ORCID, ISBN …) verbatim.
///
/// Normalisation: trim, lowercase, remove the first matching prefix from
/// `strip_prefixes` (e.g. `https://doi.org/`).
#[derive(Debug, Clone)]
pub struct IdentifierSignature {
  resource_type:  ResourceType,
  signature_type: String,
  field:          String,
  strip_prefixes: Vec<String>,
}

impl IdentifierSignature {
  pub fn new(
    resource_type: ResourceType,
    signature_type: impl Into<String>,
    field: impl Into<String>,
  ) -> Self {
    Self {
      resource_type,
      signature_type: signature_type.into(),
      field: field.into(),
      strip_prefixes: Vec::new(),
    }
  }

  pub fn stripping(mut self, prefix: impl Into<String>) -> Self {
    self.strip_prefixes.push(prefix.into().to_lowercase());
    self
  }

  /// An identifier signature preconfigured for DOIs.
  pub fn doi(resource_type: ResourceType, field: impl Into<String>) -> Self {
    Self::new(resource_type, "doi", field)
      .stripping("https://doi.org/")
      .stripping("http://doi.org/")
      .stripping("https://dx.doi.org/")
      .stripping("http://dx.doi.org/")
      .stripping("doi:")
  }

  fn normalize(&self, value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let stripped = self
      .strip_prefixes
      .iter()
      .find_map(|prefix| lowered.strip_prefix(prefix.as_str()))
      .unwrap_or(lowered.as_str())
      .trim();
    (!stripped.is_empty()).then(|| stripped.to_owned())
  }
}

impl SignatureAlgorithm for IdentifierSignature {
  fn resource_type(&self) -> ResourceType { self.resource_type }

  fn signature_type(&self) -> &str { &self.signature_type }

  fn signatures(&self, resource: &Resource) -> Vec<String> {
    resource
      .values(&self.field)
      .iter()
      .filter_map(|v| self.normalize(v))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn set(pairs: &[(&str, &str)]) -> SignatureSet {
    pairs
      .iter()
      .map(|(f, v)| (f.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn compute_only_runs_algorithms_for_the_resource_type() {
    let algorithms: Vec<Arc<dyn SignatureAlgorithm>> = vec![
      Arc::new(IdentifierSignature::doi(ResourceType::ITEM, "dc.identifier.doi")),
      Arc::new(IdentifierSignature::new(
        ResourceType::PERSON,
        "orcid",
        "person.orcid",
      )),
    ];
    let item = Resource::new(1, ResourceType::ITEM)
      .with_value("dc.identifier.doi", "https://doi.org/10.1/X")
      .with_value("person.orcid", "0000-0001");

    let sigs = SignatureSet::compute(&algorithms, &item);
    assert_eq!(sigs.get("doi_signature"), ["10.1/x".to_string()]);
    assert!(sigs.get("orcid_signature").is_empty());
  }

  #[test]
  fn outputs_for_the_same_field_are_concatenated() {
    let algorithms: Vec<Arc<dyn SignatureAlgorithm>> = vec![
      Arc::new(IdentifierSignature::new(ResourceType::ITEM, "id", "a")),
      Arc::new(IdentifierSignature::new(ResourceType::ITEM, "id", "b")),
    ];
    let item = Resource::new(1, ResourceType::ITEM)
      .with_value("a", "x")
      .with_value("b", "x");
    let sigs = SignatureSet::compute(&algorithms, &item);
    assert_eq!(sigs.get("id_signature"), ["x".to_string(), "x".to_string()]);
  }

  #[test]
  fn blank_values_produce_an_empty_set() {
    let algorithms: Vec<Arc<dyn SignatureAlgorithm>> = vec![Arc::new(
      MetadataSignature::new(ResourceType::ITEM, "title", "dc.title"),
    )];
    let item = Resource::new(1, ResourceType::ITEM).with_value("dc.title", " .,; ");
    let sigs = SignatureSet::compute(&algorithms, &item);
    assert!(sigs.is_empty());
    assert_eq!(sigs.to_filter(), None);
  }

  #[test]
  fn metadata_signature_ignores_case_and_punctuation() {
    let algo = MetadataSignature::new(ResourceType::ITEM, "title", "dc.title")
      .ignoring_prefix("The ");
    let a = Resource::new(1, ResourceType::ITEM)
      .with_value("dc.title", "The Origin of Species!");
    let b = Resource::new(2, ResourceType::ITEM)
      .with_value("dc.title", "origin of  species");
    assert_eq!(algo.signatures(&a), algo.signatures(&b));
    assert_eq!(algo.signatures(&a)[0].len(), 64);
  }

  #[test]
  fn filter_joins_fields_and_values_with_or() {
    let sigs = set(&[
      ("title_signature", "ab"),
      ("doi_signature", "10.1/x"),
      ("title_signature", "cd"),
    ]);
    assert_eq!(
      sigs.to_filter().unwrap(),
      "doi_signature:(\"10.1/x\") OR title_signature:(\"ab\" OR \"cd\")"
    );
  }

  #[test]
  fn intersection_keeps_only_shared_values() {
    let a = set(&[("title_signature", "x"), ("title_signature", "y")]);
    let b = set(&[
      ("title_signature", "y"),
      ("title_signature", "z"),
      ("doi_signature", "10.1/x"),
    ]);
    let shared = a.intersect(&b);
    assert_eq!(shared.get("title_signature"), ["y".to_string()]);
    let fields: Vec<&str> = shared.iter().map(|(field, _)| field).collect();
    assert_eq!(fields, ["title_signature"]);
  }

  #[test]
  fn intersection_without_overlap_is_empty() {
    let a = set(&[("title_signature", "x")]);
    let b = set(&[("title_signature", "z")]);
    assert!(a.intersect(&b).is_empty());
  }
}
