//! [`DedupService`] — the matching engine.
//!
//! Reindexing a resource runs, in order:
//!
//! 1. compute its signatures (nothing else happens if there are none);
//! 2. replay every stored decision that references it;
//! 3. replace its FAKE record;
//! 4. delete its MATCH records;
//! 5. search the FAKE records of other resources of the same type that share
//!    a signature value, and write one MATCH record per candidate carrying
//!    only the shared values.
//!
//! Index failures are logged and end the current step; they never abort a
//! batch. Decision-store failures propagate.

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  sync::Arc,
  time::Instant,
};

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, trace, warn};

use crate::{
  Error, Result,
  bulk::{BulkReport, Phase, RebuildReport, run_pool, split_ids},
  config::DedupConfig,
  decision::{DecisionRow, DecisionStore},
  flag::{DedupFlag, ReviewStage},
  index::{DedupIndex, IndexConnector},
  query::{self, Clause, IndexQuery},
  record::{DedupRecord, PairKey},
  registry::Registry,
  resource::{Resource, ResourceLookup, ResourceType},
  session::Session,
  signature::{self, SignatureSet},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What [`DedupService::index_content`] did with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
  /// FAKE record rewritten; `matches` MATCH records written.
  Indexed { matches: usize },
  /// No extractor produced a value; nothing was written.
  NoSignatures,
  /// Not forced and unchanged since its FAKE record was written.
  UpToDate,
  /// The resource no longer exists; its records were removed.
  Missing,
  /// The index could not be reached; nothing was written.
  Unavailable,
}

/// A candidate duplicate shown to a reviewer.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate {
  pub id:         i32,
  /// `Match`, or `VerifyWs` when a submitter asked for verification.
  pub flag:       DedupFlag,
  pub note:       Option<String>,
  pub signatures: SignatureSet,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The dedup engine, generic over its index, decision store and resource
/// lookup.
///
/// Cloning is cheap; clones share the index connection.
pub struct DedupService<C: IndexConnector, D, L> {
  connector: Arc<C>,
  index:     Arc<OnceCell<C::Index>>,
  decisions: Arc<D>,
  lookup:    Arc<L>,
  registry:  Arc<Registry>,
  config:    Arc<DedupConfig>,
}

impl<C: IndexConnector, D, L> Clone for DedupService<C, D, L> {
  fn clone(&self) -> Self {
    Self {
      connector: Arc::clone(&self.connector),
      index:     Arc::clone(&self.index),
      decisions: Arc::clone(&self.decisions),
      lookup:    Arc::clone(&self.lookup),
      registry:  Arc::clone(&self.registry),
      config:    Arc::clone(&self.config),
    }
  }
}

impl<C, D, L> DedupService<C, D, L>
where
  C: IndexConnector + 'static,
  D: DecisionStore + 'static,
  L: ResourceLookup + 'static,
{
  pub fn new(
    connector: C,
    decisions: D,
    lookup: L,
    registry: Registry,
    config: DedupConfig,
  ) -> Self {
    Self {
      connector: Arc::new(connector),
      index:     Arc::new(OnceCell::new()),
      decisions: Arc::new(decisions),
      lookup:    Arc::new(lookup),
      registry:  Arc::new(registry),
      config:    Arc::new(config),
    }
  }

  pub fn registry(&self) -> &Registry { &self.registry }

  pub fn config(&self) -> &DedupConfig { &self.config }

  pub fn decisions(&self) -> &D { &self.decisions }

  pub fn lookup(&self) -> &L { &self.lookup }

  // ── Connection ────────────────────────────────────────────────────────────

  /// The shared index, connecting on first use. `None` means this call is a
  /// no-op; the next call tries to connect again.
  async fn index(&self) -> Option<&C::Index> {
    match self.index.get_or_try_init(|| self.connect()).await {
      Ok(index) => Some(index),
      Err(e) => {
        error!(error = %e, "dedup index unavailable");
        None
      }
    }
  }

  async fn connect(&self) -> Result<C::Index> {
    let index = self.connector.connect().await.map_err(Error::index)?;
    if self.config.validate_connection {
      index.query(&query::probe()).await.map_err(Error::index)?;
    }
    info!("connected to dedup index");
    Ok(index)
  }

  // ── Single resource ───────────────────────────────────────────────────────

  /// The signatures of a resource under the registered algorithms.
  pub fn signatures(&self, resource: &Resource) -> SignatureSet {
    SignatureSet::compute(
      self.registry.signatures_for(resource.resource_type),
      resource,
    )
  }

  /// Reindex one resource.
  ///
  /// Unless `force` is set, a resource whose `last_modified` is not newer
  /// than its FAKE record is left alone.
  pub async fn index_content(
    &self,
    session: &mut Session,
    resource: &Resource,
    force: bool,
  ) -> Result<IndexOutcome> {
    let signatures = self.signatures(resource);
    if signatures.is_empty() {
      debug!(
        id = resource.id,
        kind = resource.resource_type.label(),
        "no signatures, dropping derived records"
      );
      if let Some(index) = self.index().await {
        self.drop_derived(index, resource.resource_type, resource.id).await;
      }
      return Ok(IndexOutcome::NoSignatures);
    }
    let Some(index) = self.index().await else {
      return Ok(IndexOutcome::Unavailable);
    };
    if !force && self.is_up_to_date(index, resource).await {
      return Ok(IndexOutcome::UpToDate);
    }

    session.remember(resource);
    self.replay_decisions(resource.id).await?;

    let (id, kind) = (resource.id, resource.resource_type);
    self.delete_where(index, &query::fake_of(kind, id)).await;
    let fake = DedupRecord::new(id, id, DedupFlag::Fake, kind)
      .with_signatures(signatures.clone());
    self.write(session, index, fake).await;

    self.delete_where(index, &query::matches_of(kind, id)).await;
    let matches = self.write_matches(session, index, resource, &signatures).await;
    Ok(IndexOutcome::Indexed { matches })
  }

  /// Resolve `id` and reindex it, or unindex it if it no longer exists.
  pub async fn index_resource(
    &self,
    id: i32,
    resource_type: ResourceType,
    force: bool,
  ) -> Result<IndexOutcome> {
    let mut session = Session::open();
    let resolved = session
      .resolve(self.lookup.as_ref(), id, resource_type)
      .await
      .map_err(Error::lookup)?;
    match resolved {
      Some(resource) => self.index_content(&mut session, &resource, force).await,
      None => {
        self.un_index(id, resource_type).await;
        Ok(IndexOutcome::Missing)
      }
    }
  }

  /// Remove every record that references the resource.
  pub async fn un_index_content(&self, resource: &Resource) -> usize {
    self.un_index(resource.id, resource.resource_type).await
  }

  /// Remove every record of `resource_type` whose pair contains `id`.
  pub async fn un_index(&self, id: i32, resource_type: ResourceType) -> usize {
    let Some(index) = self.index().await else {
      return 0;
    };
    self
      .delete_where(index, &query::of_resource(resource_type, id))
      .await
  }

  async fn is_up_to_date(&self, index: &C::Index, resource: &Resource) -> bool {
    let Some(modified) = resource.last_modified else {
      return false;
    };
    let fake = query::fake_of(resource.resource_type, resource.id);
    match index.query(&fake).await {
      Ok(records) => records.iter().any(|r| r.last_indexed >= modified),
      Err(e) => {
        warn!(id = resource.id, error = %e, "could not read FAKE record");
        false
      }
    }
  }

  // ── Decisions ─────────────────────────────────────────────────────────────

  /// Re-emit every stored decision that references `id`.
  async fn replay_decisions(&self, id: i32) -> Result<usize> {
    let rows = self
      .decisions
      .decisions_for(id)
      .await
      .map_err(Error::decisions)?;

    let mut written = 0;
    for row in &rows {
      for decision in row.stage_decisions() {
        match DedupFlag::from_decision(decision.value) {
          Ok(flag) => {
            let (low, high) = (row.pair.low(), row.pair.high());
            if self
              .build_reject(low, high, row.resource_type, flag, decision.note)
              .await
            {
              written += 1;
            }
          }
          Err(e) => warn!(
            pair = %row.pair,
            stage = %decision.stage,
            error = %e,
            "skipping stored decision"
          ),
        }
      }
    }
    Ok(written)
  }

  /// Write a decision record for a pair. Returns whether it was written.
  pub async fn build_reject(
    &self,
    first_id: i32,
    second_id: i32,
    resource_type: ResourceType,
    flag: DedupFlag,
    note: Option<&str>,
  ) -> bool {
    let Some(index) = self.index().await else {
      return false;
    };
    let record =
      DedupRecord::new(first_id, second_id, flag, resource_type).with_note(note);
    self.put(index, record).await
  }

  // ── Matching ──────────────────────────────────────────────────────────────

  async fn write_matches(
    &self,
    session: &mut Session,
    index: &C::Index,
    resource: &Resource,
    signatures: &SignatureSet,
  ) -> usize {
    let candidates =
      query::candidates(resource.resource_type, resource.id, signatures);
    debug!(query = %candidates, "searching candidates");
    let found = match index.query(&candidates).await {
      Ok(found) => found,
      Err(e) => {
        error!(id = resource.id, error = %e, "candidate search failed");
        return 0;
      }
    };

    let mut written = 0;
    for candidate in found {
      // FAKE records are self pairs; the single member is the candidate.
      let other = candidate.pair.low();
      if candidate.flag != DedupFlag::Fake
        || !candidate.pair.is_self()
        || other == resource.id
      {
        continue;
      }
      if candidate.resource_type != resource.resource_type {
        warn!(
          id = resource.id,
          other,
          "candidate of another resource type, skipping"
        );
        continue;
      }

      let shared = signatures.intersect(&candidate.signatures);
      let pair = PairKey::new(resource.id, other);
      if shared.is_empty() && !self.config.write_empty_matches {
        debug!(pair = %pair, "no shared signature values, match skipped");
        continue;
      }
      let record =
        DedupRecord::new(resource.id, other, DedupFlag::Match, resource.resource_type)
          .with_signatures(shared);
      if self.write(session, index, record).await {
        written += 1;
      }
    }
    written
  }

  /// Run the registered plugins over the record, then write it.
  async fn write(
    &self,
    session: &mut Session,
    index: &C::Index,
    mut record: DedupRecord,
  ) -> bool {
    let plugins = self.registry.plugins_for(record.resource_type);
    if !plugins.is_empty() {
      let mut members = Vec::new();
      for id in record.pair.members() {
        match session
          .resolve(self.lookup.as_ref(), id, record.resource_type)
          .await
        {
          Ok(Some(resource)) => members.push(resource),
          Ok(None) => {}
          Err(e) => warn!(id, error = %e, "could not resolve pair member"),
        }
      }
      let members: Vec<&Resource> = members.iter().collect();
      for plugin in plugins {
        trace!(plugin = plugin.name(), pair = %record.pair, "enriching record");
        plugin.enrich(&members, &mut record);
      }
    }
    self.put(index, record).await
  }

  async fn put(&self, index: &C::Index, record: DedupRecord) -> bool {
    let (flag, pair) = (record.flag, record.pair);
    match index.add(record).await {
      Ok(()) => {
        info!(flag = %flag, pair = %pair, "wrote dedup record");
        true
      }
      Err(e) => {
        error!(flag = %flag, pair = %pair, error = %e, "failed to write dedup record");
        false
      }
    }
  }

  async fn delete_where(&self, index: &C::Index, query: &IndexQuery) -> usize {
    match index.delete(query).await {
      Ok(n) => {
        debug!(query = %query, deleted = n, "deleted dedup records");
        n
      }
      Err(e) => {
        error!(query = %query, error = %e, "delete failed");
        0
      }
    }
  }

  // ── Bulk maintenance ──────────────────────────────────────────────────────

  /// The well-known types, then any other type with registered algorithms.
  fn resource_types(&self) -> Vec<ResourceType> {
    let mut types = ResourceType::WELL_KNOWN.to_vec();
    for kind in self.registry.resource_types() {
      if !types.contains(&kind) {
        types.push(kind);
      }
    }
    types
  }

  /// Rebuild the index for every resource type.
  pub async fn update_index(&self, force: bool) {
    for kind in self.resource_types() {
      match self.update_index_type(force, kind).await {
        Ok(report) => info!(
          kind = kind.label(),
          seeded = report.seeded.processed,
          matched = report.matched.processed,
          failed = report.seeded.failed + report.matched.failed,
          "dedup rebuild finished"
        ),
        Err(e) => error!(kind = kind.label(), error = %e, "dedup rebuild failed"),
      }
    }
  }

  /// Rebuild the index for one resource type. With `force`, every record of
  /// the type is deleted first.
  pub async fn update_index_type(
    &self,
    force: bool,
    resource_type: ResourceType,
  ) -> Result<RebuildReport> {
    if force {
      self.clean_index_type(true, resource_type).await;
    }
    if self.registry.signatures_for(resource_type).is_empty() {
      debug!(kind = resource_type.label(), "no signature algorithms registered");
      return Ok(RebuildReport::default());
    }
    let ids = self
      .lookup
      .all_ids(resource_type)
      .await
      .map_err(Error::lookup)?;
    info!(
      kind = resource_type.label(),
      resources = ids.len(),
      "rebuilding dedup index"
    );
    Ok(self.index_ids(&ids, resource_type).await)
  }

  /// Index a list of ids in two passes: FAKE and decision records for every
  /// id, then MATCH records for every id. Each pass is spread over
  /// `indexer_threads` workers and committed when it completes.
  pub async fn index_ids(
    &self,
    ids: &[i32],
    resource_type: ResourceType,
  ) -> RebuildReport {
    if ids.is_empty() {
      return RebuildReport::default();
    }
    let seeded = self.run_phase(Phase::Seed, ids, resource_type).await;
    self.commit().await;
    let matched = self.run_phase(Phase::Match, ids, resource_type).await;
    self.commit().await;
    RebuildReport { seeded, matched }
  }

  async fn run_phase(
    &self,
    phase: Phase,
    ids: &[i32],
    resource_type: ResourceType,
  ) -> BulkReport {
    let chunks = split_ids(ids, self.config.indexer_threads);
    run_pool(chunks, |worker, chunk| {
      let service = self.clone();
      async move {
        service
          .index_chunk(worker, phase, resource_type, chunk)
          .await
      }
    })
    .await
  }

  async fn index_chunk(
    &self,
    worker: usize,
    phase: Phase,
    resource_type: ResourceType,
    ids: Vec<i32>,
  ) -> BulkReport {
    let mut session = Session::open();
    let mut report = BulkReport::default();
    let total = ids.len();
    for (n, id) in ids.into_iter().enumerate() {
      match self.index_phase(&mut session, phase, id, resource_type).await {
        Ok(true) => report.processed += 1,
        Ok(false) => report.skipped += 1,
        Err(e) => {
          error!(worker, id, error = %e, "failed to index resource");
          report.failed += 1;
        }
      }
      session.clear();
      debug!(worker, ?phase, "{}/{}", n + 1, total);
    }
    report
  }

  /// Remove the FAKE and MATCH records of `id`. Decision records stay.
  async fn drop_derived(&self, index: &C::Index, kind: ResourceType, id: i32) {
    self.delete_where(index, &query::fake_of(kind, id)).await;
    self.delete_where(index, &query::matches_of(kind, id)).await;
  }

  /// One resource, one pass. `Ok(false)` means there was nothing to do.
  async fn index_phase(
    &self,
    session: &mut Session,
    phase: Phase,
    id: i32,
    resource_type: ResourceType,
  ) -> Result<bool> {
    let Some(resource) = session
      .resolve(self.lookup.as_ref(), id, resource_type)
      .await
      .map_err(Error::lookup)?
    else {
      return Ok(false);
    };
    let signatures = self.signatures(&resource);
    if signatures.is_empty() {
      if phase == Phase::Seed
        && let Some(index) = self.index().await
      {
        self.drop_derived(index, resource_type, id).await;
      }
      return Ok(false);
    }
    let index = self.index().await.ok_or(Error::IndexUnavailable)?;

    match phase {
      Phase::Seed => {
        self.replay_decisions(id).await?;
        let fake = DedupRecord::new(id, id, DedupFlag::Fake, resource_type)
          .with_signatures(signatures);
        self.write(session, index, fake).await;
      }
      Phase::Match => {
        self
          .delete_where(index, &query::matches_of(resource_type, id))
          .await;
        self
          .write_matches(session, index, &resource, &signatures)
          .await;
      }
    }
    Ok(true)
  }

  /// Consistency sweep over every resource type, or with `force`, delete
  /// every record. Returns the number of records removed.
  pub async fn clean_index(&self, force: bool) -> usize {
    if force {
      let Some(index) = self.index().await else {
        return 0;
      };
      return self.delete_where(index, &IndexQuery::all()).await;
    }
    let mut removed = 0;
    for kind in self.resource_types() {
      removed += self.clean_index_type(false, kind).await;
    }
    removed
  }

  /// Remove records that reference resources of `resource_type` which no
  /// longer resolve (or, with `ignore_withdrawn`, are withdrawn). With
  /// `force`, delete every record of the type.
  pub async fn clean_index_type(
    &self,
    force: bool,
    resource_type: ResourceType,
  ) -> usize {
    let Some(index) = self.index().await else {
      return 0;
    };
    let of_type = query::of_type(resource_type);
    if force {
      return self.delete_where(index, &of_type).await;
    }

    let records = match index.query(&of_type).await {
      Ok(records) => records,
      Err(e) => {
        error!(kind = resource_type.label(), error = %e, "sweep query failed");
        return 0;
      }
    };
    let ids: BTreeSet<i32> =
      records.iter().flat_map(|r| r.pair.members()).collect();

    let mut session = Session::open();
    let mut removed = 0;
    for id in ids {
      match session.resolve(self.lookup.as_ref(), id, resource_type).await {
        Ok(Some(resource)) if self.config.ignore_withdrawn && resource.withdrawn => {
          info!(id, kind = resource_type.label(), "deleting records of withdrawn resource");
          removed += self.un_index(id, resource_type).await;
        }
        Ok(Some(_)) => {}
        Ok(None) => {
          info!(id, kind = resource_type.label(), "deleting records of missing resource");
          removed += self.un_index(id, resource_type).await;
        }
        Err(e) => error!(id, error = %e, "could not resolve resource during sweep"),
      }
    }
    removed
  }

  pub async fn commit(&self) {
    let Some(index) = self.index().await else {
      return;
    };
    if let Err(e) = index.commit().await {
      error!(error = %e, "commit failed");
    }
  }

  pub async fn optimize(&self) {
    let Some(index) = self.index().await else {
      return;
    };
    let started = Instant::now();
    info!("dedup index optimize started");
    match index.optimize().await {
      Ok(()) => info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dedup index optimize finished"
      ),
      Err(e) => error!(error = %e, "optimize failed"),
    }
  }

  // ── Read access ───────────────────────────────────────────────────────────

  pub async fn search(&self, query: &IndexQuery) -> Result<Vec<DedupRecord>> {
    let index = self.index().await.ok_or(Error::IndexUnavailable)?;
    debug!(query = %query, "dedup search");
    index.query(query).await.map_err(Error::index)
  }

  /// [`search`](Self::search) with extra filter clauses.
  pub async fn find(
    &self,
    query: IndexQuery,
    filters: Vec<Clause>,
  ) -> Result<Vec<DedupRecord>> {
    self.search(&query.filtered(filters)).await
  }

  /// Candidate duplicates of `id` as a reviewer at `stage` sees them: MATCH
  /// records (and submitter verify requests at the workflow stage) minus
  /// pairs already decided for that stage.
  pub async fn duplicates_of(
    &self,
    id: i32,
    resource_type: ResourceType,
    stage: ReviewStage,
  ) -> Result<Vec<DuplicateCandidate>> {
    let mut listed = query::of_resource(resource_type, id)
      .and(Clause::FlagIn(stage.candidate_flags()));
    if self.config.ignore_withdrawn {
      listed = listed.and(Clause::Withdrawn(false));
    }
    let listed = self.search(&listed).await?;

    let hiding = query::of_resource(resource_type, id)
      .and(Clause::FlagIn(stage.hiding_flags()));
    let hidden: HashSet<PairKey> = self
      .search(&hiding)
      .await?
      .into_iter()
      .map(|r| r.pair)
      .collect();

    let mut found: BTreeMap<i32, DuplicateCandidate> = BTreeMap::new();
    let mut verify_notes: BTreeMap<i32, Option<String>> = BTreeMap::new();
    for record in listed {
      if hidden.contains(&record.pair) {
        continue;
      }
      let Some(other) = record.pair.other(id) else {
        continue;
      };
      match record.flag {
        DedupFlag::Match => {
          found.insert(other, DuplicateCandidate {
            id:         other,
            flag:       DedupFlag::Match,
            note:       None,
            signatures: record.signatures,
          });
        }
        DedupFlag::VerifyWs => {
          verify_notes.insert(other, record.note);
        }
        _ => {}
      }
    }
    for (other, note) in verify_notes {
      if let Some(candidate) = found.get_mut(&other) {
        candidate.flag = DedupFlag::VerifyWs;
        candidate.note = note;
      }
    }
    Ok(found.into_values().collect())
  }

  // ── Adjudication ──────────────────────────────────────────────────────────

  /// Store a decision row and mirror it into the index. Returns `false` for
  /// a self pair.
  async fn decide(
    &self,
    pair: PairKey,
    resource_type: ResourceType,
    stage: ReviewStage,
    flag: DedupFlag,
    note: Option<&str>,
    update: impl FnOnce(&mut DecisionRow) + Send,
  ) -> Result<bool> {
    if pair.is_self() {
      return Ok(false);
    }
    let mut row = self
      .decisions
      .decision(pair, resource_type)
      .await
      .map_err(Error::decisions)?
      .unwrap_or_else(|| DecisionRow::new(pair, resource_type));
    row.set_decision(stage, flag);
    row.updated_at = Utc::now();
    update(&mut row);
    self
      .decisions
      .save_decision(row)
      .await
      .map_err(Error::decisions)?;
    info!(pair = %pair, flag = %flag, "recorded decision");

    self
      .build_reject(pair.low(), pair.high(), resource_type, flag, note)
      .await;
    Ok(true)
  }

  /// An administrator rejects the pair as a duplicate.
  pub async fn reject_admin(
    &self,
    first_id: i32,
    second_id: i32,
    resource_type: ResourceType,
  ) -> Result<bool> {
    self
      .decide(
        PairKey::new(first_id, second_id),
        resource_type,
        ReviewStage::Admin,
        DedupFlag::RejectAdmin,
        None,
        |_| {},
      )
      .await
  }

  /// Admin-reject every MATCH of `id` that matched on `signature_type`.
  /// Returns the number of pairs rejected.
  pub async fn reject_admin_signature(
    &self,
    id: i32,
    signature_type: &str,
    resource_type: ResourceType,
  ) -> Result<usize> {
    let field = signature::field_name(signature_type);
    let matches = self
      .find(query::matches_of(resource_type, id), vec![Clause::HasSignature(
        field,
      )])
      .await?;

    let mut rejected = 0;
    for record in matches {
      if let Some(other) = record.pair.other(id)
        && self.reject_admin(id, other, resource_type).await?
      {
        rejected += 1;
      }
    }
    Ok(rejected)
  }

  /// A reviewer rejects the pair at `stage`.
  pub async fn reject(
    &self,
    first_id: i32,
    second_id: i32,
    resource_type: ResourceType,
    stage: ReviewStage,
    not_duplicate: bool,
    note: Option<&str>,
  ) -> Result<bool> {
    let stored = note.map(str::to_owned);
    self
      .decide(
        PairKey::new(first_id, second_id),
        resource_type,
        stage,
        stage.reject_flag(),
        note,
        move |row| {
          row.note = stored;
          row.not_duplicate = not_duplicate;
        },
      )
      .await
  }

  /// A reviewer asks for the pair to be verified at `stage`.
  pub async fn verify(
    &self,
    first_id: i32,
    second_id: i32,
    resource_type: ResourceType,
    stage: ReviewStage,
    to_fix: bool,
    note: Option<&str>,
  ) -> Result<bool> {
    let flag = stage.verify_flag().ok_or(Error::NoVerifyAtStage(stage))?;
    let stored = note.map(str::to_owned);
    self
      .decide(
        PairKey::new(first_id, second_id),
        resource_type,
        stage,
        flag,
        note,
        move |row| {
          row.reader_note = stored;
          row.to_fix = to_fix;
        },
      )
      .await
  }
}
