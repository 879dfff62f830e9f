// Catalog import and pool seeding.
//
// The item catalog is a CSV of draftable players. Seeding copies it into a
// draft's available pool exactly once: concurrent seed requests for the
// same draft coalesce onto a single in-flight future, and re-seeding an
// already-populated draft is a no-op.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::draft::item::{Category, PlayerCard};
use crate::draft::state::DraftState;
use crate::store::{Store, NS_DRAFT};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// One catalog row. Extra columns are ignored so the catalog file can carry
/// scouting fields the core does not use.
#[derive(Debug, Deserialize)]
struct RawCatalogRow {
    id: String,
    name: String,
    position: String,
    rank: u32,
    age: u32,
    #[serde(default)]
    college: String,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Parse catalog rows from any reader. Malformed rows are skipped with a
/// warning rather than aborting the whole import.
fn load_catalog_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerCard>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut cards = Vec::new();
    for result in reader.deserialize::<RawCatalogRow>() {
        match result {
            Ok(raw) => {
                let Some(category) = Category::from_str_cat(raw.position.trim()) else {
                    warn!(
                        "skipping catalog row '{}': unknown position '{}'",
                        raw.name.trim(),
                        raw.position
                    );
                    continue;
                };
                if raw.rank == 0 {
                    warn!("skipping catalog row '{}': rank must be >= 1", raw.name.trim());
                    continue;
                }
                cards.push(PlayerCard {
                    id: raw.id.trim().to_string(),
                    name: raw.name.trim().to_string(),
                    category,
                    rank: raw.rank,
                    age: raw.age,
                    college: raw.college.trim().to_string(),
                });
            }
            Err(e) => {
                warn!("skipping malformed catalog row: {}", e);
            }
        }
    }
    Ok(cards)
}

/// Load the catalog CSV at `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<PlayerCard>, CatalogError> {
    let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_catalog_from_reader(file).map_err(|source| CatalogError::Csv {
        path: path.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Single-flight seeder
// ---------------------------------------------------------------------------

/// Seed futures must be cloneable to be shared, so the error travels as a
/// string and is rehydrated into anyhow at the call site.
type SeedResult = Result<usize, String>;
type SeedFuture = Shared<BoxFuture<'static, SeedResult>>;

/// Populates a draft's available pool from the catalog file.
///
/// Seeding is idempotent per draft: a draft whose pool is already populated
/// (or that has committed picks) is left untouched. Concurrent calls for the
/// same draft id share one in-flight future instead of racing duplicate
/// imports.
pub struct CatalogSeeder {
    store: Arc<dyn Store>,
    catalog_path: PathBuf,
    in_flight: Mutex<HashMap<String, SeedFuture>>,
    imports: Arc<AtomicUsize>,
}

impl CatalogSeeder {
    pub fn new(store: Arc<dyn Store>, catalog_path: PathBuf) -> Self {
        CatalogSeeder {
            store,
            catalog_path,
            in_flight: Mutex::new(HashMap::new()),
            imports: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed the pool for `draft_id`. Returns the pool size after seeding.
    ///
    /// All concurrent callers for the same draft id await the same outcome;
    /// exactly one catalog import runs.
    pub async fn seed(&self, draft_id: &str) -> Result<usize> {
        let fut = {
            let mut in_flight = self.in_flight.lock().expect("seeder mutex poisoned");
            match in_flight.get(draft_id) {
                Some(existing) => existing.clone(),
                None => {
                    let store = Arc::clone(&self.store);
                    let path = self.catalog_path.clone();
                    let imports = Arc::clone(&self.imports);
                    let id = draft_id.to_string();
                    let fut = seed_inner(store, path, imports, id).boxed().shared();
                    in_flight.insert(draft_id.to_string(), fut.clone());
                    fut
                }
            }
        };

        let result = fut.await;
        self.in_flight
            .lock()
            .expect("seeder mutex poisoned")
            .remove(draft_id);
        result.map_err(|e| anyhow!(e))
    }

    /// How many catalog imports have actually run. Coalesced and already-
    /// seeded calls do not count.
    pub fn imports_performed(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }
}

async fn seed_inner(
    store: Arc<dyn Store>,
    path: PathBuf,
    imports: Arc<AtomicUsize>,
    draft_id: String,
) -> SeedResult {
    let value = store
        .get(NS_DRAFT, &draft_id)
        .map_err(|e| format!("failed to read draft state: {e}"))?
        .ok_or_else(|| format!("no draft with id {draft_id}"))?;
    let mut state: DraftState = serde_json::from_value(value)
        .map_err(|e| format!("failed to decode draft state: {e}"))?;

    // At-most-once: a populated pool or any committed pick means seeding
    // already happened for this draft.
    if !state.pool.is_empty() || !state.picks.is_empty() {
        info!(
            "draft {} already seeded ({} cards in pool), skipping import",
            draft_id,
            state.pool.len()
        );
        return Ok(state.pool.len());
    }

    let cards = load_catalog(&path).map_err(|e| e.to_string())?;
    imports.fetch_add(1, Ordering::SeqCst);
    info!("seeding draft {} with {} catalog cards", draft_id, cards.len());

    state.seed_pool(cards);
    let pool_size = state.pool.len();
    let state_value =
        serde_json::to_value(&state).map_err(|e| format!("failed to encode draft state: {e}"))?;
    store
        .put(NS_DRAFT, &draft_id, &state_value)
        .map_err(|e| format!("failed to persist seeded state: {e}"))?;

    Ok(pool_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    const SAMPLE_CSV: &str = "\
id,name,position,rank,age,college
qb-01,Mason Reeves,QB,1,21,Oregon
rb-01,Deshawn Carter,RB,2,22,Alabama
wr-01,Tyler Brooks,WR,3,21,Ohio State
te-01,Sam Okafor,TE,4,23,Iowa
";

    #[test]
    fn loads_all_well_formed_rows() {
        let cards = load_catalog_from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].id, "qb-01");
        assert_eq!(cards[0].category, Category::Quarterback);
        assert_eq!(cards[0].rank, 1);
        assert_eq!(cards[3].college, "Iowa");
    }

    #[test]
    fn position_is_case_insensitive() {
        let csv_data = "\
id,name,position,rank,age,college
wr-09,Lowercase Guy,wr,9,22,Baylor
";
        let cards = load_catalog_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].category, Category::WideReceiver);
    }

    #[test]
    fn unknown_position_skipped() {
        let csv_data = "\
id,name,position,rank,age,college
k-01,Place Kicker,K,50,25,LSU
wr-01,Real Pick,WR,3,21,Ohio State
";
        let cards = load_catalog_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "wr-01");
    }

    #[test]
    fn zero_rank_skipped() {
        let csv_data = "\
id,name,position,rank,age,college
wr-00,Bad Rank,WR,0,21,Ohio State
";
        let cards = load_catalog_from_reader(csv_data.as_bytes()).unwrap();
        assert!(cards.is_empty());
    }

    #[test]
    fn malformed_row_skipped_not_fatal() {
        let csv_data = "\
id,name,position,rank,age,college
wr-01,Good Row,WR,3,21,Ohio State
rb-01,Bad Row,RB,not_a_number,22,Alabama
te-01,Another Good Row,TE,8,23,Iowa
";
        let cards = load_catalog_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].id, "te-01");
    }

    #[test]
    fn extra_columns_ignored() {
        let csv_data = "\
id,name,position,rank,age,college,forty_time,notes
wr-01,Extra Cols,WR,3,21,Ohio State,4.38,burner
";
        let cards = load_catalog_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Extra Cols");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog(Path::new("/nonexistent/catalog.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    // -- Seeder --

    fn write_temp_catalog(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "catalog_test_{}_{}.csv",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, SAMPLE_CSV).unwrap();
        path
    }

    fn store_with_draft(draft_id: &str) -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        let state = DraftState::new(
            draft_id,
            vec![("Seat 0".into(), "human".into()), ("Seat 1".into(), "value-hawk".into())],
            2,
        );
        store
            .put(NS_DRAFT, draft_id, &serde_json::to_value(&state).unwrap())
            .unwrap();
        store
    }

    #[tokio::test]
    async fn seed_populates_pool() {
        let store = store_with_draft("draft_seed");
        let path = write_temp_catalog("populate");
        let seeder = CatalogSeeder::new(store.clone(), path.clone());

        let seeded = seeder.seed("draft_seed").await.unwrap();
        assert_eq!(seeded, 4);

        let state: DraftState =
            serde_json::from_value(store.get(NS_DRAFT, "draft_seed").unwrap().unwrap()).unwrap();
        assert_eq!(state.pool.len(), 4);
        // Pool is rank-sorted.
        assert_eq!(state.pool[0].rank, 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn reseed_is_a_no_op() {
        let store = store_with_draft("draft_reseed");
        let path = write_temp_catalog("reseed");
        let seeder = CatalogSeeder::new(store, path.clone());

        seeder.seed("draft_reseed").await.unwrap();
        let second = seeder.seed("draft_reseed").await.unwrap();

        assert_eq!(second, 4);
        assert_eq!(seeder.imports_performed(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_seeds_share_one_import() {
        let store = store_with_draft("draft_race");
        let path = write_temp_catalog("race");
        let seeder = Arc::new(CatalogSeeder::new(store, path.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let seeder = Arc::clone(&seeder);
            handles.push(tokio::spawn(async move { seeder.seed("draft_race").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 4);
        }

        assert_eq!(seeder.imports_performed(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn seed_unknown_draft_errors() {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        let path = write_temp_catalog("unknown");
        let seeder = CatalogSeeder::new(store, path.clone());

        let err = seeder.seed("draft_missing").await.unwrap_err();
        assert!(err.to_string().contains("no draft"));

        let _ = std::fs::remove_file(&path);
    }
}
