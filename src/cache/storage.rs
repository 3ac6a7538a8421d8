//! Local store trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use super::traits::{CachedRecord, Cacheable};
use crate::catalog::{CastMember, CatalogItem};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cache database error: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("failed to (de)serialize cached record: {0}")]
  Serde(#[from] serde_json::Error),
  #[error("failed to prepare cache directory: {0}")]
  Io(#[from] std::io::Error),
  #[error("cache lock poisoned")]
  LockPoisoned,
  #[error("invalid timestamp in cache: {0}")]
  Timestamp(i64),
}

/// What changed in the store, broadcast to observers after each visible write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
  /// Catalog records with these ids were inserted or changed
  Items(Vec<i64>),
  /// Cast records of this anime were inserted or changed
  Cast(i64),
  /// Everything was deleted
  Cleared,
}

impl StoreChange {
  pub fn touches_item(&self, id: i64) -> bool {
    match self {
      StoreChange::Items(ids) => ids.contains(&id),
      StoreChange::Cast(_) => false,
      StoreChange::Cleared => true,
    }
  }

  pub fn touches_cast(&self, anime_id: i64) -> bool {
    match self {
      StoreChange::Items(_) => false,
      StoreChange::Cast(id) => *id == anime_id,
      StoreChange::Cleared => true,
    }
  }
}

/// Trait for local store backends.
///
/// All writes are upserts keyed by primary identity: last write wins, no
/// field-level merging. A write whose payload is identical to what is stored
/// refreshes `last_updated` but is not reported to observers.
pub trait LocalStore: Send + Sync + 'static {
  /// Point lookup of a catalog record.
  fn get_item(&self, id: i64) -> Result<Option<CachedRecord<CatalogItem>>, StoreError>;

  /// Range scan ordered by rank, then popularity (unknown values first).
  fn page_items(
    &self,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError>;

  /// Case-insensitive substring match on primary and English titles.
  fn search_items(&self, query: &str) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError>;

  fn count_items(&self) -> Result<usize, StoreError>;

  /// Returns whether observers were notified (payload changed).
  fn upsert_item(&self, item: &CatalogItem, at: DateTime<Utc>) -> Result<bool, StoreError>;

  /// Returns how many records actually changed.
  fn upsert_items(&self, items: &[CatalogItem], at: DateTime<Utc>) -> Result<usize, StoreError>;

  /// Catalog records last written strictly before `cutoff`.
  fn stale_items(&self, cutoff: DateTime<Utc>)
    -> Result<Vec<CachedRecord<CatalogItem>>, StoreError>;

  /// Cast of one anime, ordered by role then name.
  fn cast_for(&self, anime_id: i64) -> Result<Vec<CachedRecord<CastMember>>, StoreError>;

  /// Returns how many records actually changed.
  fn upsert_cast(&self, cast: &[CastMember], at: DateTime<Utc>) -> Result<usize, StoreError>;

  /// Anime ids owning at least one cast record older than `cutoff`.
  fn stale_cast_owners(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, StoreError>;

  fn count_cast(&self) -> Result<usize, StoreError>;

  /// Bulk delete of every record.
  fn clear(&self) -> Result<(), StoreError>;

  /// Feed of visible changes.
  fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// SQLite-based local store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  changes: broadcast::Sender<StoreChange>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_items (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    title_english TEXT,
    rank INTEGER,
    popularity INTEGER,
    data BLOB NOT NULL,
    payload_hash TEXT NOT NULL,
    last_updated INTEGER NOT NULL,
    offline_available INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_catalog_items_rank
    ON catalog_items(rank, popularity);

CREATE INDEX IF NOT EXISTS idx_catalog_items_updated
    ON catalog_items(last_updated);

CREATE TABLE IF NOT EXISTS cast_members (
    anime_id INTEGER NOT NULL,
    character_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    data BLOB NOT NULL,
    payload_hash TEXT NOT NULL,
    last_updated INTEGER NOT NULL,
    offline_available INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (anime_id, character_id)
);

CREATE INDEX IF NOT EXISTS idx_cast_members_updated
    ON cast_members(last_updated);
"#;

const ITEM_COLUMNS: &str = "data, last_updated, offline_available";

/// SQLite sorts NULL before any value, so unranked titles lead.
const CATALOG_ORDER: &str = "ORDER BY rank ASC, popularity ASC, id ASC";

/// Change-feed capacity; slow observers see `Lagged` and re-read.
const CHANGE_CAPACITY: usize = 256;

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    debug!("opening cache database at {}", path.display());
    Self::with_connection(Connection::open(path)?)
  }

  /// Private in-memory store, gone when dropped.
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(CACHE_SCHEMA)?;
    let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
    Ok(Self {
      conn: Mutex::new(conn),
      changes,
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::LockPoisoned)
  }

  fn notify(&self, change: StoreChange) {
    // No receivers is fine
    let _ = self.changes.send(change);
  }

  fn query_items<P: rusqlite::Params>(
    &self,
    sql: &str,
    params: P,
  ) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(sql)?;
    let records = stmt
      .query_map(params, raw_record)?
      .map(|r| r.map_err(StoreError::from).and_then(decode_record))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
  }
}

/// Row columns as stored, before payload decoding.
struct RawRecord {
  data: Vec<u8>,
  last_updated: i64,
  offline_available: bool,
}

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    data: row.get(0)?,
    last_updated: row.get(1)?,
    offline_available: row.get(2)?,
  })
}

fn decode_record<T: Cacheable>(raw: RawRecord) -> Result<CachedRecord<T>, StoreError> {
  Ok(CachedRecord {
    value: serde_json::from_slice(&raw.data)?,
    last_updated: from_millis(raw.last_updated)?,
    offline_available: raw.offline_available,
  })
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
  DateTime::from_timestamp_millis(ms).ok_or(StoreError::Timestamp(ms))
}

/// Escape LIKE wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
  let mut escaped = String::with_capacity(query.len() + 2);
  escaped.push('%');
  for c in query.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

/// Upsert one catalog record inside an open connection or transaction.
///
/// Returns whether the payload changed.
fn write_item(conn: &Connection, item: &CatalogItem, at: i64) -> Result<bool, StoreError> {
  let (data, digest) = item.to_payload()?;

  let existing: Option<String> = conn
    .query_row(
      "SELECT payload_hash FROM catalog_items WHERE id = ?",
      params![item.id],
      |row| row.get(0),
    )
    .optional()?;

  if existing.as_deref() == Some(digest.as_str()) {
    conn.execute(
      "UPDATE catalog_items SET last_updated = ?, offline_available = 1 WHERE id = ?",
      params![at, item.id],
    )?;
    return Ok(false);
  }

  conn.execute(
    "INSERT OR REPLACE INTO catalog_items
       (id, title, title_english, rank, popularity, data, payload_hash, last_updated, offline_available)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
    params![
      item.id,
      item.title,
      item.title_english,
      item.rank,
      item.popularity,
      data,
      digest,
      at
    ],
  )?;
  Ok(true)
}

fn write_cast_member(conn: &Connection, member: &CastMember, at: i64) -> Result<bool, StoreError> {
  let (data, digest) = member.to_payload()?;

  let existing: Option<String> = conn
    .query_row(
      "SELECT payload_hash FROM cast_members WHERE anime_id = ? AND character_id = ?",
      params![member.anime_id, member.character_id],
      |row| row.get(0),
    )
    .optional()?;

  if existing.as_deref() == Some(digest.as_str()) {
    conn.execute(
      "UPDATE cast_members SET last_updated = ?, offline_available = 1
       WHERE anime_id = ? AND character_id = ?",
      params![at, member.anime_id, member.character_id],
    )?;
    return Ok(false);
  }

  conn.execute(
    "INSERT OR REPLACE INTO cast_members
       (anime_id, character_id, name, role, data, payload_hash, last_updated, offline_available)
     VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
    params![
      member.anime_id,
      member.character_id,
      member.name,
      member.role,
      data,
      digest,
      at
    ],
  )?;
  Ok(true)
}

impl LocalStore for SqliteStore {
  fn get_item(&self, id: i64) -> Result<Option<CachedRecord<CatalogItem>>, StoreError> {
    let sql = format!("SELECT {} FROM catalog_items WHERE id = ?", ITEM_COLUMNS);
    Ok(self.query_items(&sql, params![id])?.into_iter().next())
  }

  fn page_items(
    &self,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError> {
    let sql = format!(
      "SELECT {} FROM catalog_items {} LIMIT ? OFFSET ?",
      ITEM_COLUMNS, CATALOG_ORDER
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    self.query_items(&sql, params![limit, offset])
  }

  fn search_items(&self, query: &str) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError> {
    // LIKE is case-insensitive for ASCII; lower() on both sides covers the rest
    // of what SQLite knows how to fold.
    let sql = format!(
      "SELECT {} FROM catalog_items
       WHERE lower(title) LIKE lower(?1) ESCAPE '\\'
          OR lower(title_english) LIKE lower(?1) ESCAPE '\\'
       {}",
      ITEM_COLUMNS, CATALOG_ORDER
    );
    self.query_items(&sql, params![like_pattern(query.trim())])
  }

  fn count_items(&self) -> Result<usize, StoreError> {
    let conn = self.lock()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_items", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
  }

  fn upsert_item(&self, item: &CatalogItem, at: DateTime<Utc>) -> Result<bool, StoreError> {
    let changed = {
      let conn = self.lock()?;
      write_item(&conn, item, at.timestamp_millis())?
    };

    if changed {
      debug!(
        entity = CatalogItem::entity_type(),
        key = item.cache_key(),
        "stored changed record"
      );
      self.notify(StoreChange::Items(vec![item.id]));
    }
    Ok(changed)
  }

  fn upsert_items(&self, items: &[CatalogItem], at: DateTime<Utc>) -> Result<usize, StoreError> {
    let at = at.timestamp_millis();
    let changed_ids = {
      let mut conn = self.lock()?;
      let tx = conn.transaction()?;
      let mut changed = Vec::new();
      for item in items {
        if write_item(&tx, item, at)? {
          changed.push(item.id);
        }
      }
      tx.commit()?;
      changed
    };

    let count = changed_ids.len();
    if !changed_ids.is_empty() {
      self.notify(StoreChange::Items(changed_ids));
    }
    Ok(count)
  }

  fn stale_items(
    &self,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<CachedRecord<CatalogItem>>, StoreError> {
    let sql = format!(
      "SELECT {} FROM catalog_items WHERE last_updated < ? ORDER BY last_updated ASC",
      ITEM_COLUMNS
    );
    self.query_items(&sql, params![cutoff.timestamp_millis()])
  }

  fn cast_for(&self, anime_id: i64) -> Result<Vec<CachedRecord<CastMember>>, StoreError> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT data, last_updated, offline_available FROM cast_members
       WHERE anime_id = ?
       ORDER BY role ASC, name ASC, character_id ASC",
    )?;
    let records = stmt
      .query_map(params![anime_id], raw_record)?
      .map(|r| r.map_err(StoreError::from).and_then(decode_record))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
  }

  fn upsert_cast(&self, cast: &[CastMember], at: DateTime<Utc>) -> Result<usize, StoreError> {
    let at = at.timestamp_millis();
    let mut touched_owners: Vec<i64> = Vec::new();
    let mut count = 0;
    {
      let mut conn = self.lock()?;
      let tx = conn.transaction()?;
      for member in cast {
        if write_cast_member(&tx, member, at)? {
          count += 1;
          if !touched_owners.contains(&member.anime_id) {
            touched_owners.push(member.anime_id);
          }
        }
      }
      tx.commit()?;
    }

    for anime_id in touched_owners {
      self.notify(StoreChange::Cast(anime_id));
    }
    Ok(count)
  }

  fn stale_cast_owners(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, StoreError> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT DISTINCT anime_id FROM cast_members WHERE last_updated < ? ORDER BY anime_id",
    )?;
    let owners = stmt
      .query_map(params![cutoff.timestamp_millis()], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(owners)
  }

  fn count_cast(&self) -> Result<usize, StoreError> {
    let conn = self.lock()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cast_members", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
  }

  fn clear(&self) -> Result<(), StoreError> {
    {
      let conn = self.lock()?;
      conn.execute_batch("DELETE FROM cast_members; DELETE FROM catalog_items;")?;
    }
    self.notify(StoreChange::Cleared);
    Ok(())
  }

  fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
    self.changes.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn item(id: i64, title: &str, rank: Option<u32>, popularity: Option<u32>) -> CatalogItem {
    let mut item = CatalogItem::new(id, title);
    item.rank = rank;
    item.popularity = popularity;
    item
  }

  fn member(anime_id: i64, character_id: i64, name: &str, role: &str) -> CastMember {
    CastMember {
      anime_id,
      character_id,
      name: name.to_string(),
      url: String::new(),
      images: Default::default(),
      role: role.to_string(),
      voice_actors: Vec::new(),
    }
  }

  fn ids(records: &[CachedRecord<CatalogItem>]) -> Vec<i64> {
    records.iter().map(|r| r.value.id).collect()
  }

  #[test]
  fn test_upsert_and_get() {
    let store = SqliteStore::open_in_memory().unwrap();
    let at = Utc::now();
    let mut cowboy = item(1, "Cowboy Bebop", Some(40), Some(39));
    cowboy.score = Some(8.75);

    assert!(store.upsert_item(&cowboy, at).unwrap());
    let record = store.get_item(1).unwrap().unwrap();
    assert_eq!(record.value, cowboy);
    assert_eq!(record.last_updated.timestamp_millis(), at.timestamp_millis());
    assert!(record.offline_available);

    assert!(store.get_item(2).unwrap().is_none());
  }

  #[test]
  fn test_overwrite_replaces_whole_record() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut first = item(1, "Cowboy Bebop", Some(40), None);
    first.synopsis = Some("Space bounty hunters".to_string());
    store.upsert_item(&first, Utc::now()).unwrap();

    let second = item(1, "Cowboy Bebop", Some(41), None);
    store.upsert_item(&second, Utc::now()).unwrap();

    let record = store.get_item(1).unwrap().unwrap();
    assert_eq!(record.value.rank, Some(41));
    assert_eq!(record.value.synopsis, None);
  }

  #[test]
  fn test_identical_write_is_silent_but_refreshes_timestamp() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut rx = store.subscribe();
    let cowboy = item(1, "Cowboy Bebop", Some(40), None);
    let earlier = Utc::now() - Duration::hours(2);

    assert!(store.upsert_item(&cowboy, earlier).unwrap());
    assert_eq!(rx.try_recv().unwrap(), StoreChange::Items(vec![1]));

    let later = Utc::now();
    assert!(!store.upsert_item(&cowboy, later).unwrap());
    assert!(rx.try_recv().is_err());

    let record = store.get_item(1).unwrap().unwrap();
    assert_eq!(record.last_updated.timestamp_millis(), later.timestamp_millis());
  }

  #[test]
  fn test_page_items_ordering() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .upsert_items(
        &[
          item(1, "Unranked", None, Some(1)),
          item(2, "Second", Some(2), Some(10)),
          item(3, "First", Some(1), Some(50)),
          item(4, "Tied rank, less popular", Some(2), Some(20)),
        ],
        Utc::now(),
      )
      .unwrap();

    let all = store.page_items(10, 0).unwrap();
    assert_eq!(ids(&all), vec![1, 3, 2, 4]);

    let second_page = store.page_items(2, 2).unwrap();
    assert_eq!(ids(&second_page), vec![2, 4]);

    assert!(store.page_items(2, 10).unwrap().is_empty());
  }

  #[test]
  fn test_unranked_title_sorts_before_ranked() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .upsert_items(
        &[item(1, "Ranked", Some(1), Some(1)), item(2, "Unranked", None, None)],
        Utc::now(),
      )
      .unwrap();

    assert_eq!(ids(&store.page_items(10, 0).unwrap()), vec![2, 1]);
    assert_eq!(ids(&store.search_items("ranked").unwrap()), vec![2, 1]);
  }

  #[test]
  fn test_upsert_items_reports_changed_only() {
    let store = SqliteStore::open_in_memory().unwrap();
    let batch = vec![item(1, "A", Some(1), None), item(2, "B", Some(2), None)];
    assert_eq!(store.upsert_items(&batch, Utc::now()).unwrap(), 2);

    let mut rx = store.subscribe();
    let batch = vec![item(1, "A", Some(1), None), item(2, "B (edited)", Some(2), None)];
    assert_eq!(store.upsert_items(&batch, Utc::now()).unwrap(), 1);
    assert_eq!(rx.try_recv().unwrap(), StoreChange::Items(vec![2]));
    assert_eq!(store.count_items().unwrap(), 2);
  }

  #[test]
  fn test_search_titles_case_insensitive() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut aot = item(1, "Shingeki no Kyojin", Some(2), None);
    aot.title_english = Some("Attack on Titan".to_string());
    store
      .upsert_items(
        &[
          aot,
          item(2, "Titan no Kiseki", Some(1), None),
          item(3, "Cowboy Bebop", Some(3), None),
        ],
        Utc::now(),
      )
      .unwrap();

    assert_eq!(ids(&store.search_items("TITAN").unwrap()), vec![2, 1]);
    assert_eq!(ids(&store.search_items("kyojin").unwrap()), vec![1]);
    assert!(store.search_items("naruto").unwrap().is_empty());
    assert_eq!(store.search_items("").unwrap().len(), 3);
  }

  #[test]
  fn test_search_wildcards_are_literal() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .upsert_items(
        &[item(1, "100% Pascal-sensei", None, None), item(2, "Pascal", None, None)],
        Utc::now(),
      )
      .unwrap();

    assert_eq!(ids(&store.search_items("100%").unwrap()), vec![1]);
    assert!(store.search_items("_ascal").unwrap().is_empty());
  }

  #[test]
  fn test_stale_items_strictly_older() {
    let store = SqliteStore::open_in_memory().unwrap();
    let cutoff = Utc::now() - Duration::hours(1);
    store
      .upsert_item(&item(1, "Old", None, None), cutoff - Duration::seconds(1))
      .unwrap();
    store.upsert_item(&item(2, "Exact", None, None), cutoff).unwrap();
    store
      .upsert_item(&item(3, "Fresh", None, None), Utc::now())
      .unwrap();

    assert_eq!(ids(&store.stale_items(cutoff).unwrap()), vec![1]);
  }

  #[test]
  fn test_cast_keyed_by_anime_and_character() {
    let store = SqliteStore::open_in_memory().unwrap();
    let at = Utc::now();
    store
      .upsert_cast(
        &[
          member(10, 1, "Spike", "Main"),
          member(10, 2, "Ein", "Supporting"),
          member(10, 3, "Faye", "Main"),
          // Same character id under another anime is a separate record
          member(11, 1, "Spike", "Supporting"),
        ],
        at,
      )
      .unwrap();

    let cast: Vec<String> = store
      .cast_for(10)
      .unwrap()
      .into_iter()
      .map(|r| r.value.name)
      .collect();
    assert_eq!(cast, vec!["Faye", "Spike", "Ein"]);
    assert_eq!(store.cast_for(11).unwrap().len(), 1);
    assert_eq!(store.count_cast().unwrap(), 4);
  }

  #[test]
  fn test_stale_cast_owners() {
    let store = SqliteStore::open_in_memory().unwrap();
    let cutoff = Utc::now() - Duration::hours(1);
    store
      .upsert_cast(&[member(10, 1, "Spike", "Main")], cutoff - Duration::minutes(5))
      .unwrap();
    store
      .upsert_cast(&[member(10, 2, "Jet", "Main")], cutoff - Duration::minutes(1))
      .unwrap();
    store
      .upsert_cast(&[member(11, 1, "Spike", "Main")], Utc::now())
      .unwrap();

    assert_eq!(store.stale_cast_owners(cutoff).unwrap(), vec![10]);
  }

  #[test]
  fn test_cast_change_notifies_owner() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut rx = store.subscribe();
    store
      .upsert_cast(&[member(10, 1, "Spike", "Main")], Utc::now())
      .unwrap();
    let change = rx.try_recv().unwrap();
    assert!(change.touches_cast(10));
    assert!(!change.touches_cast(11));
    assert!(!change.touches_item(10));
  }

  #[test]
  fn test_clear() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .upsert_item(&item(1, "A", None, None), Utc::now())
      .unwrap();
    store
      .upsert_cast(&[member(1, 1, "Spike", "Main")], Utc::now())
      .unwrap();

    let mut rx = store.subscribe();
    store.clear().unwrap();
    assert_eq!(rx.try_recv().unwrap(), StoreChange::Cleared);
    assert_eq!(store.count_items().unwrap(), 0);
    assert_eq!(store.count_cast().unwrap(), 0);
  }

  #[test]
  fn test_open_on_disk_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");
    {
      let store = SqliteStore::open(&path).unwrap();
      store
        .upsert_item(&item(5, "Persisted", Some(1), None), Utc::now())
        .unwrap();
    }
    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.get_item(5).unwrap().unwrap().value.title, "Persisted");
  }

  #[test]
  fn test_like_pattern() {
    assert_eq!(like_pattern("abc"), "%abc%");
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }
}
