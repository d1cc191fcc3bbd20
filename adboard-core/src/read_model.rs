//! Performance read model.
//!
//! This module provides:
//! - [`load_recent`] - One-shot fetch-and-join of recent performance rows
//! - [`LoadState`] - Explicit three-state view result
//! - [`PerformanceView`] - Per-view state holder with stale-fetch discard
//!
//! Each view load issues a fresh fetch and constructs its own result; no
//! shared state is mutated in place, so concurrent loads cannot corrupt
//! each other. "Still loading", "loaded with zero rows", and "failed to
//! load" are three distinct states, never collapsed into booleans that can
//! desynchronize.

use parking_lot::Mutex;

use crate::mapping::ProductNames;
use crate::model::EnrichedRecord;
use crate::store::{ReportStore, StoreError};

/// Default number of recent rows shown on the dashboard.
pub const DEFAULT_LIMIT: u32 = 20;

/// Load the most recent performance rows, joined and enriched.
///
/// Rows arrive ordered by report date descending. Each row's product name
/// is resolved through `names` (falling back to the raw code) and its
/// cost-per-outcome is computed under the zero guard. An empty result set
/// is a valid outcome, not an error.
pub async fn load_recent(
    store: &dyn ReportStore,
    names: &ProductNames,
    limit: u32,
) -> Result<Vec<EnrichedRecord>, StoreError> {
    let records = store.recent_performance(limit).await?;
    tracing::debug!(count = records.len(), "performance rows loaded");

    Ok(records
        .into_iter()
        .map(|record| {
            let name = names.resolve(record.product_code.as_str()).to_string();
            EnrichedRecord::from_record(record, name)
        })
        .collect())
}

/// The explicit three-state result of a view load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// A fetch is in flight.
    Loading,

    /// The fetch completed; zero rows is a valid loaded state.
    Loaded(Vec<EnrichedRecord>),

    /// The fetch failed; the message preserves the underlying error.
    Failed(String),
}

impl LoadState {
    /// Whether a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Ticket identifying one fetch against the view that started it.
///
/// Completing with a superseded ticket is a no-op; the result is dropped
/// instead of being applied to stale view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

struct ViewInner {
    state: LoadState,
    generation: u64,
}

/// Holds the tri-state result for one dashboard view.
///
/// A view that navigates away and back simply begins a new load; any
/// late completion from the superseded fetch is discarded by generation.
///
/// # Example
///
/// ```
/// use adboard_core::read_model::{LoadState, PerformanceView};
///
/// let view = PerformanceView::new();
/// let ticket = view.begin();
/// assert!(view.state().is_loading());
/// view.complete(ticket, Ok(Vec::new()));
/// assert_eq!(view.state(), LoadState::Loaded(Vec::new()));
/// ```
pub struct PerformanceView {
    inner: Mutex<ViewInner>,
}

impl PerformanceView {
    /// Create a view with no fetch in flight.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ViewInner {
                state: LoadState::Loaded(Vec::new()),
                generation: 0,
            }),
        }
    }

    /// Begin a new fetch, superseding any fetch still in flight.
    pub fn begin(&self) -> LoadTicket {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = LoadState::Loading;
        LoadTicket(inner.generation)
    }

    /// Apply a fetch result if its ticket is still current.
    ///
    /// Returns `true` if the result was applied, `false` if it arrived
    /// late and was discarded.
    pub fn complete(
        &self,
        ticket: LoadTicket,
        result: Result<Vec<EnrichedRecord>, StoreError>,
    ) -> bool {
        let mut inner = self.inner.lock();
        if ticket.0 != inner.generation {
            tracing::debug!(
                ticket = ticket.0,
                current = inner.generation,
                "discarding stale fetch result"
            );
            return false;
        }
        inner.state = match result {
            Ok(records) => LoadState::Loaded(records),
            Err(e) => LoadState::Failed(e.to_string()),
        };
        true
    }

    /// Snapshot the current view state.
    pub fn state(&self) -> LoadState {
        self.inner.lock().state.clone()
    }

    /// Run one full refresh cycle against the store.
    ///
    /// The mapping table is reloaded on every refresh so name edits show
    /// up on the next view load without process restarts.
    pub async fn refresh(&self, store: &dyn ReportStore, limit: u32) -> LoadState {
        let ticket = self.begin();

        let result = match ProductNames::load(store).await {
            Ok(names) => load_recent(store, &names, limit).await,
            Err(e) => Err(e),
        };

        self.complete(ticket, result);
        self.state()
    }
}

impl Default for PerformanceView {
    fn default() -> Self {
        Self::new()
    }
}
