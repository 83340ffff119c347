//! [`SqliteStore`] — the SQLite implementation of the dedup index, the
//! decision store and the resource lookup.

use std::path::{Path, PathBuf};

use rusqlite::OptionalExtension as _;
use tracing::debug;

use doppel_core::{
  decision::{DecisionRow, DecisionStore},
  index::{DedupIndex, IndexConnector},
  query::IndexQuery,
  record::{DedupRecord, PairKey},
  resource::{Resource, ResourceLookup, ResourceType},
  signature::SignatureSet,
};

use crate::{
  Result,
  encode::{
    RawDecision, RawRecord, RawResource, encode_dt, encode_fields, encode_list,
  },
  filter::{self, Filter},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Doppel store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a throwaway in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Resources ─────────────────────────────────────────────────────────────

  /// Insert or replace a resource in the `resources` table.
  pub async fn put_resource(&self, resource: &Resource) -> Result<()> {
    let id            = resource.id;
    let resource_type = resource.resource_type.code();
    let withdrawn     = resource.withdrawn;
    let last_modified = resource.last_modified.map(encode_dt);
    let metadata      = encode_fields(&resource.metadata)?;
    let locations     = encode_list(&resource.locations)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO resources (
             resource_id, resource_type, withdrawn, last_modified,
             metadata, locations
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id,
            resource_type,
            withdrawn,
            last_modified,
            metadata,
            locations,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delete a resource; returns whether it existed.
  pub async fn remove_resource(
    &self,
    id: i32,
    resource_type: ResourceType,
  ) -> Result<bool> {
    let code = resource_type.code();
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM resources WHERE resource_id = ?1 AND resource_type = ?2",
          rusqlite::params![id, code],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }
}

// ─── DedupIndex impl ─────────────────────────────────────────────────────────

impl DedupIndex for SqliteStore {
  type Error = crate::Error;

  async fn add(&self, record: DedupRecord) -> Result<()> {
    let unique_id     = record.unique_id();
    let resource_id   = record.resource_id();
    let low_id        = record.pair.low();
    let high_id       = record.pair.high();
    let resource_type = record.resource_type.code();
    let flag          = record.flag.description();
    let note          = record.note.clone();
    let withdrawn     = record.withdrawn;
    let extra         = encode_fields(&record.extra)?;
    let last_indexed  = encode_dt(record.last_indexed);
    let signatures: Vec<(String, i64, String)> = record
      .signatures
      .iter()
      .flat_map(|(field, values)| {
        values
          .iter()
          .enumerate()
          .map(move |(n, v)| (field.to_owned(), n as i64, v.clone()))
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM dedup_signatures WHERE unique_id = ?1",
          rusqlite::params![unique_id],
        )?;
        tx.execute(
          "INSERT OR REPLACE INTO dedup_records (
             unique_id, resource_id, low_id, high_id, resource_type,
             flag, note, withdrawn, extra, last_indexed
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            unique_id,
            resource_id,
            low_id,
            high_id,
            resource_type,
            flag,
            note,
            withdrawn,
            extra,
            last_indexed,
          ],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO dedup_signatures (unique_id, field, position, value)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (field, position, value) in &signatures {
            stmt.execute(rusqlite::params![unique_id, field, position, value])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query(&self, query: &IndexQuery) -> Result<Vec<DedupRecord>> {
    let Filter { sql, params } = filter::select_ids(query);

    let raws: Vec<(RawRecord, Vec<(String, String)>)> = self
      .conn
      .call(move |conn| {
        let ids = {
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };

        let mut record_stmt = conn.prepare(&format!(
          "SELECT {} FROM dedup_records r WHERE r.unique_id = ?1",
          RawRecord::COLUMNS
        ))?;
        let mut signature_stmt = conn.prepare(
          "SELECT field, value FROM dedup_signatures
           WHERE unique_id = ?1
           ORDER BY field, position",
        )?;

        let mut rows = Vec::with_capacity(ids.len());
        for id in &ids {
          let raw = record_stmt.query_row([id], RawRecord::from_row)?;
          let signatures = signature_stmt
            .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.push((raw, signatures));
        }
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, signatures)| {
        raw.into_record(signatures.into_iter().collect::<SignatureSet>())
      })
      .collect()
  }

  async fn delete(&self, query: &IndexQuery) -> Result<usize> {
    let Filter { sql, params } = filter::select_ids(query);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = {
          let mut stmt = tx.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };
        for id in &ids {
          tx.execute("DELETE FROM dedup_signatures WHERE unique_id = ?1", [id])?;
          tx.execute("DELETE FROM dedup_records WHERE unique_id = ?1", [id])?;
        }
        tx.commit()?;
        Ok(ids.len())
      })
      .await?;
    Ok(deleted)
  }

  async fn commit(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn optimize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("PRAGMA optimize; VACUUM;")?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DecisionStore impl ──────────────────────────────────────────────────────

impl DecisionStore for SqliteStore {
  type Error = crate::Error;

  async fn decisions_for(&self, id: i32) -> Result<Vec<DecisionRow>> {
    let raws: Vec<RawDecision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM dedup_reject
           WHERE first_item_id = ?1 OR second_item_id = ?1
           ORDER BY first_item_id, second_item_id, resource_type_id",
          RawDecision::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id], RawDecision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDecision::into_row).collect()
  }

  async fn decision(
    &self,
    pair: PairKey,
    resource_type: ResourceType,
  ) -> Result<Option<DecisionRow>> {
    let (low, high, code) = (pair.low(), pair.high(), resource_type.code());
    let raw: Option<RawDecision> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            &format!(
              "SELECT {} FROM dedup_reject
               WHERE first_item_id = ?1
                 AND second_item_id = ?2
                 AND resource_type_id = ?3",
              RawDecision::COLUMNS
            ),
            rusqlite::params![low, high, code],
            RawDecision::from_row,
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    raw.map(RawDecision::into_row).transpose()
  }

  async fn save_decision(&self, row: DecisionRow) -> Result<()> {
    let updated_at = encode_dt(row.updated_at);
    debug!(pair = %row.pair, "saving decision row");

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO dedup_reject (
             first_item_id, second_item_id, resource_type_id,
             submitter_decision, workflow_decision, admin_decision,
             note, reader_note, fake, tofix, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            row.pair.low(),
            row.pair.high(),
            row.resource_type.code(),
            row.submitter_decision,
            row.workflow_decision,
            row.admin_decision,
            row.note,
            row.reader_note,
            row.not_duplicate,
            row.to_fix,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ResourceLookup impl ─────────────────────────────────────────────────────

impl ResourceLookup for SqliteStore {
  type Error = crate::Error;

  async fn find(
    &self,
    id: i32,
    resource_type: ResourceType,
  ) -> Result<Option<Resource>> {
    let code = resource_type.code();
    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT resource_id, resource_type, withdrawn, last_modified,
                    metadata, locations
             FROM resources
             WHERE resource_id = ?1 AND resource_type = ?2",
            rusqlite::params![id, code],
            |row| {
              Ok(RawResource {
                resource_id:   row.get(0)?,
                resource_type: row.get(1)?,
                withdrawn:     row.get(2)?,
                last_modified: row.get(3)?,
                metadata:      row.get(4)?,
                locations:     row.get(5)?,
              })
            },
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    raw.map(RawResource::into_resource).transpose()
  }

  async fn all_ids(&self, resource_type: ResourceType) -> Result<Vec<i32>> {
    let code = resource_type.code();
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT resource_id FROM resources
           WHERE resource_type = ?1
           ORDER BY resource_id",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![code], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i32>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }
}

// ─── Connector ───────────────────────────────────────────────────────────────

/// Opens the dedup index on first use.
#[derive(Clone)]
pub struct SqliteConnector {
  target: Target,
}

#[derive(Clone)]
enum Target {
  Path(PathBuf),
  Store(SqliteStore),
}

impl SqliteConnector {
  /// Connect by opening the database file at `path`.
  pub fn path(path: impl Into<PathBuf>) -> Self {
    Self { target: Target::Path(path.into()) }
  }

  /// Hand out an already-open store, e.g. the one that also holds the
  /// decisions and resources.
  pub fn store(store: SqliteStore) -> Self {
    Self { target: Target::Store(store) }
  }
}

impl IndexConnector for SqliteConnector {
  type Index = SqliteStore;
  type Error = crate::Error;

  async fn connect(&self) -> Result<SqliteStore> {
    match &self.target {
      Target::Path(path) => SqliteStore::open(path).await,
      Target::Store(store) => Ok(store.clone()),
    }
  }
}
