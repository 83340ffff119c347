//! Index queries.
//!
//! A query is a conjunction of typed [`Clause`]s. Backends translate the
//! clauses into their own query language; the [`fmt::Display`] rendering is
//! the Solr-style string used in log lines.

use std::fmt;

use crate::{
  flag::DedupFlag,
  record::{
    FLAG_FIELD, PairKey, RESOURCE_ID_FIELD, RESOURCE_IDS_FIELD,
    RESOURCE_TYPE_FIELD, WITHDRAWN_FIELD,
  },
  resource::ResourceType,
  signature::SignatureSet,
};

// ─── Clause ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
  ResourceType(ResourceType),
  Flag(DedupFlag),
  /// The record's flag is one of these. An empty list matches nothing.
  FlagIn(Vec<DedupFlag>),
  /// Exact pair key.
  Pair(PairKey),
  /// Anything but this pair key.
  NotPair(PairKey),
  /// The pair contains this resource id.
  Member(i32),
  /// Some signature field shares at least one value with the set. An empty
  /// set matches nothing.
  SignatureOverlap(SignatureSet),
  /// The signature field is populated.
  HasSignature(String),
  Withdrawn(bool),
}

impl fmt::Display for Clause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ResourceType(t) => write!(f, "{RESOURCE_TYPE_FIELD}:{t}"),
      Self::Flag(flag) => write!(f, "{FLAG_FIELD}:{flag}"),
      Self::FlagIn(flags) => {
        let flags: Vec<&str> = flags.iter().map(|fl| fl.description()).collect();
        write!(f, "{FLAG_FIELD}:({})", flags.join(" OR "))
      }
      Self::Pair(pair) => write!(f, "{RESOURCE_ID_FIELD}:\"{pair}\""),
      Self::NotPair(pair) => write!(f, "-{RESOURCE_ID_FIELD}:\"{pair}\""),
      Self::Member(id) => write!(f, "{RESOURCE_IDS_FIELD}:{id}"),
      Self::SignatureOverlap(set) => match set.to_filter() {
        Some(filter) => write!(f, "({filter})"),
        None => f.write_str("-*:*"),
      },
      Self::HasSignature(field) => write!(f, "{field}:*"),
      Self::Withdrawn(w) => write!(f, "{WITHDRAWN_FIELD}:{w}"),
    }
  }
}

// ─── IndexQuery ──────────────────────────────────────────────────────────────

/// A conjunction of clauses; the empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexQuery {
  pub clauses: Vec<Clause>,
  pub limit:   Option<usize>,
}

impl IndexQuery {
  /// Matches everything.
  pub fn all() -> Self { Self::default() }

  pub fn and(mut self, clause: Clause) -> Self {
    self.clauses.push(clause);
    self
  }

  /// Add filter clauses on top of a base query.
  pub fn filtered(mut self, filters: impl IntoIterator<Item = Clause>) -> Self {
    self.clauses.extend(filters);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }
}

impl fmt::Display for IndexQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.clauses.is_empty() {
      return f.write_str("*:*");
    }
    for (i, clause) in self.clauses.iter().enumerate() {
      if i > 0 {
        f.write_str(" AND ")?;
      }
      write!(f, "{clause}")?;
    }
    Ok(())
  }
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// Point lookup of every record of a pair.
pub fn by_pair(pair: PairKey) -> IndexQuery { IndexQuery::all().and(Clause::Pair(pair)) }

/// The FAKE record of a resource.
pub fn fake_of(resource_type: ResourceType, id: i32) -> IndexQuery {
  IndexQuery::all()
    .and(Clause::ResourceType(resource_type))
    .and(Clause::Flag(DedupFlag::Fake))
    .and(Clause::Pair(PairKey::of_self(id)))
}

/// Every MATCH record that references a resource.
pub fn matches_of(resource_type: ResourceType, id: i32) -> IndexQuery {
  IndexQuery::all()
    .and(Clause::ResourceType(resource_type))
    .and(Clause::Flag(DedupFlag::Match))
    .and(Clause::Member(id))
}

/// FAKE records of other resources of the same type that share a signature
/// value with `signatures`.
pub fn candidates(
  resource_type: ResourceType,
  id: i32,
  signatures: &SignatureSet,
) -> IndexQuery {
  IndexQuery::all()
    .and(Clause::ResourceType(resource_type))
    .and(Clause::Flag(DedupFlag::Fake))
    .and(Clause::SignatureOverlap(signatures.clone()))
    .and(Clause::NotPair(PairKey::of_self(id)))
}

/// Every record that references a resource.
pub fn of_resource(resource_type: ResourceType, id: i32) -> IndexQuery {
  IndexQuery::all()
    .and(Clause::Member(id))
    .and(Clause::ResourceType(resource_type))
}

/// Every record of a type.
pub fn of_type(resource_type: ResourceType) -> IndexQuery {
  IndexQuery::all().and(Clause::ResourceType(resource_type))
}

/// Connection probe: an item FAKE lookup that is cheap whether or not it
/// matches anything.
pub fn probe() -> IndexQuery {
  IndexQuery::all()
    .and(Clause::ResourceType(ResourceType::ITEM))
    .and(Clause::Pair(PairKey::of_self(1)))
    .limit(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_query_renders_match_all() {
    assert_eq!(IndexQuery::all().to_string(), "*:*");
  }

  #[test]
  fn fake_lookup_rendering() {
    assert_eq!(
      fake_of(ResourceType::ITEM, 10).to_string(),
      "dedup.resourcetype:2 AND dedup.flag:fake AND dedup.id:\"10-10\""
    );
  }

  #[test]
  fn match_cleanup_rendering() {
    assert_eq!(
      matches_of(ResourceType::PERSON, 4).to_string(),
      "dedup.resourcetype:9 AND dedup.flag:match AND dedup.ids:4"
    );
  }

  #[test]
  fn candidate_search_excludes_self_pair() {
    let sigs: SignatureSet =
      [("doi_signature".to_string(), "10.1/x".to_string())]
        .into_iter()
        .collect();
    let q = candidates(ResourceType::ITEM, 10, &sigs);
    assert!(q.clauses.contains(&Clause::NotPair(PairKey::of_self(10))));
    assert_eq!(
      q.to_string(),
      "dedup.resourcetype:2 AND dedup.flag:fake AND \
       (doi_signature:(\"10.1/x\")) AND -dedup.id:\"10-10\""
    );
  }

  #[test]
  fn filters_extend_the_base_query() {
    let q = of_type(ResourceType::ITEM)
      .filtered([Clause::FlagIn(vec![DedupFlag::Match, DedupFlag::VerifyWs])]);
    assert_eq!(
      q.to_string(),
      "dedup.resourcetype:2 AND dedup.flag:(match OR verify_ws)"
    );
  }
}
