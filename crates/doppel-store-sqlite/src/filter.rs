//! Translation of [`IndexQuery`] clauses into SQL over `dedup_records r`.

use doppel_core::query::{Clause, IndexQuery};
use rusqlite::types::Value;

const SIGNATURE_EXISTS: &str =
  "EXISTS (SELECT 1 FROM dedup_signatures s WHERE s.unique_id = r.unique_id";

/// A `WHERE ...` fragment (possibly empty) and its positional parameters.
#[derive(Debug, Default)]
pub struct Filter {
  pub sql:    String,
  pub params: Vec<Value>,
}

impl Filter {
  pub fn from_query(query: &IndexQuery) -> Self {
    let mut params = Vec::new();
    let conds: Vec<String> = query
      .clauses
      .iter()
      .map(|c| condition(c, &mut params))
      .collect();

    let sql = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    Self { sql, params }
  }
}

/// `SELECT` of the matching unique ids, in key order.
pub fn select_ids(query: &IndexQuery) -> Filter {
  let Filter { sql, params } = Filter::from_query(query);
  let limit = query
    .limit
    .map(|n| format!(" LIMIT {n}"))
    .unwrap_or_default();
  Filter {
    sql: format!("SELECT r.unique_id FROM dedup_records r {sql} ORDER BY r.unique_id{limit}"),
    params,
  }
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn condition(clause: &Clause, params: &mut Vec<Value>) -> String {
  match clause {
    Clause::ResourceType(t) => {
      params.push(Value::Integer(t.code().into()));
      "r.resource_type = ?".into()
    }
    Clause::Flag(flag) => {
      params.push(Value::Text(flag.description().into()));
      "r.flag = ?".into()
    }
    Clause::FlagIn(flags) if flags.is_empty() => "0".into(),
    Clause::FlagIn(flags) => {
      params.extend(flags.iter().map(|f| Value::Text(f.description().into())));
      format!("r.flag IN ({})", placeholders(flags.len()))
    }
    Clause::Pair(pair) => {
      params.push(Value::Integer(pair.low().into()));
      params.push(Value::Integer(pair.high().into()));
      "(r.low_id = ? AND r.high_id = ?)".into()
    }
    Clause::NotPair(pair) => {
      params.push(Value::Integer(pair.low().into()));
      params.push(Value::Integer(pair.high().into()));
      "NOT (r.low_id = ? AND r.high_id = ?)".into()
    }
    Clause::Member(id) => {
      params.push(Value::Integer((*id).into()));
      params.push(Value::Integer((*id).into()));
      "(r.low_id = ? OR r.high_id = ?)".into()
    }
    Clause::SignatureOverlap(set) => {
      let mut alternatives = Vec::new();
      for (field, values) in set.iter().filter(|(_, v)| !v.is_empty()) {
        params.push(Value::Text(field.to_owned()));
        params.extend(values.iter().map(|v| Value::Text(v.clone())));
        alternatives.push(format!(
          "(s.field = ? AND s.value IN ({}))",
          placeholders(values.len())
        ));
      }
      if alternatives.is_empty() {
        return "0".into();
      }
      format!("{SIGNATURE_EXISTS} AND ({}))", alternatives.join(" OR "))
    }
    Clause::HasSignature(field) => {
      params.push(Value::Text(field.clone()));
      format!("{SIGNATURE_EXISTS} AND s.field = ?)")
    }
    Clause::Withdrawn(w) => {
      params.push(Value::Integer((*w).into()));
      "r.withdrawn = ?".into()
    }
  }
}

#[cfg(test)]
mod tests {
  use doppel_core::{
    flag::DedupFlag,
    query,
    resource::ResourceType,
    signature::SignatureSet,
  };

  use super::*;

  #[test]
  fn empty_query_has_no_where() {
    let f = Filter::from_query(&IndexQuery::all());
    assert!(f.sql.is_empty());
    assert!(f.params.is_empty());
  }

  #[test]
  fn fake_lookup() {
    let f = Filter::from_query(&query::fake_of(ResourceType::ITEM, 7));
    assert_eq!(
      f.sql,
      "WHERE r.resource_type = ? AND r.flag = ? AND (r.low_id = ? AND r.high_id = ?)"
    );
    assert_eq!(f.params, vec![
      Value::Integer(2),
      Value::Text("fake".into()),
      Value::Integer(7),
      Value::Integer(7),
    ]);
  }

  #[test]
  fn overlap_becomes_an_exists_subquery() {
    let sigs: SignatureSet = [
      ("title_signature".to_owned(), "a".to_owned()),
      ("title_signature".to_owned(), "b".to_owned()),
      ("doi_signature".to_owned(), "x".to_owned()),
    ]
    .into_iter()
    .collect();
    let f = Filter::from_query(&IndexQuery::all().and(Clause::SignatureOverlap(sigs)));
    assert_eq!(
      f.sql,
      "WHERE EXISTS (SELECT 1 FROM dedup_signatures s WHERE s.unique_id = r.unique_id \
       AND ((s.field = ? AND s.value IN (?)) OR (s.field = ? AND s.value IN (?, ?))))"
    );
    assert_eq!(f.params.len(), 5);
  }

  #[test]
  fn empty_sets_match_nothing() {
    let q = IndexQuery::all()
      .and(Clause::SignatureOverlap(SignatureSet::new()))
      .and(Clause::FlagIn(Vec::new()));
    assert_eq!(Filter::from_query(&q).sql, "WHERE 0 AND 0");
  }

  #[test]
  fn limit_follows_the_ordering() {
    let q = IndexQuery::all().and(Clause::Flag(DedupFlag::Match)).limit(3);
    assert_eq!(
      select_ids(&q).sql,
      "SELECT r.unique_id FROM dedup_records r WHERE r.flag = ? ORDER BY r.unique_id LIMIT 3"
    );
  }
}
