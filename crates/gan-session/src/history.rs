//! C6 Memory-Efficient History (§4.6): owns the in-memory iteration list,
//! compresses cold iterations, trims the hot set, and evicts whole sessions
//! under global memory pressure.
//!
//! Compression follows `ThirdKeyAI-Symbiont`'s context manager
//! (`runtime/src/context/manager.rs`): `flate2` gzip at the default level,
//! base64-encoded for storage inside the session's JSON document.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::Mutex;
use tracing::warn;

use gan_core::{GanError, Iteration};

use crate::manager::SessionStore;
use crate::state::{CompressedIteration, SessionState};

const B64: base64::engine::general_purpose::GeneralPurpose =
    base64::engine::general_purpose::STANDARD;

/// Knobs for C6, sourced from §6.6's `maxMemoryUsageBytes`,
/// `maxIterationsInMemory`, `compressionAgeMillis`, `compressionThresholdBytes`.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub max_iterations_in_memory: usize,
    pub compression_age: Duration,
    pub compression_threshold_bytes: u64,
    pub max_memory_usage_bytes: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_iterations_in_memory: 50,
            compression_age: Duration::from_secs(300),
            compression_threshold_bytes: 1024,
            max_memory_usage_bytes: 100 * 1024 * 1024,
        }
    }
}

/// A lock-free-readable snapshot of C6's bookkeeping, per §4.6's "Stats".
#[derive(Debug, Clone, Default)]
pub struct HistoryStats {
    pub total_bytes: u64,
    pub active_sessions: u64,
    pub compressed_iterations: u64,
    pub bytes_saved: u64,
    pub average_ratio: f64,
    pub bytes_per_session: u64,
}

#[derive(Default)]
struct Counters {
    compressed_iterations: AtomicU64,
    sum_original: AtomicU64,
    sum_compressed: AtomicU64,
}

/// Owns the compression/trim/eviction pass over a session's iteration list.
/// Per-session footprints are tracked in memory so [`MemoryHistory::emergency_cleanup`]
/// can rank sessions by size without re-reading every file from disk.
pub struct MemoryHistory {
    config: HistoryConfig,
    counters: Counters,
    footprints: Mutex<HashMap<String, u64>>,
}

impl MemoryHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
            footprints: Mutex::new(HashMap::new()),
        }
    }

    /// `append(sessionId, iteration)`: adds to the hot list, then runs the
    /// optimization pass. Operates on an already-loaded [`SessionState`];
    /// persistence is the caller's (C8's, via C5) responsibility.
    pub async fn append(&self, state: &mut SessionState, iteration: Iteration) {
        state.iterations.push(iteration);
        state.recompute_current_loop();
        self.optimize(state);
        self.track_footprint(state).await;
    }

    /// `optimize(sessionId)`: compress aged/large hot iterations, trim the
    /// hot set to `maxIterationsInMemory`, recompute memory stats.
    pub fn optimize(&self, state: &mut SessionState) {
        let now = Utc::now();
        let mut still_hot = Vec::with_capacity(state.iterations.len());
        for it in state.iterations.drain(..) {
            let age = now.signed_duration_since(it.timestamp);
            let age = age.to_std().unwrap_or(Duration::ZERO);
            let size = canonical_size(&it);
            if age >= self.config.compression_age && size >= self.config.compression_threshold_bytes
            {
                self.compress_into(state, it);
            } else {
                still_hot.push(it);
            }
        }
        state.iterations = still_hot;

        if state.iterations.len() > self.config.max_iterations_in_memory {
            state.iterations.sort_by_key(|it| it.thought_number);
            let overflow = state.iterations.len() - self.config.max_iterations_in_memory;
            let trimmed: Vec<Iteration> = state.iterations.drain(..overflow).collect();
            for it in trimmed {
                self.compress_into(state, it);
            }
        }
    }

    fn compress_into(&self, state: &mut SessionState, iteration: Iteration) {
        let thought_number = iteration.thought_number;
        match compress(&iteration) {
            Ok(blob) => {
                self.counters
                    .compressed_iterations
                    .fetch_add(1, Ordering::Relaxed);
                self.counters
                    .sum_original
                    .fetch_add(blob.original_size, Ordering::Relaxed);
                self.counters
                    .sum_compressed
                    .fetch_add(blob.compressed_size, Ordering::Relaxed);
                state.cold.insert(thought_number, blob);
            }
            Err(e) => {
                warn!(thought_number, error = %e, "failed to compress iteration; keeping hot");
                state.iterations.push(iteration);
            }
        }
    }

    /// `materialize(sessionId) → SessionState`: returns a copy of `state`
    /// with every cold iteration decompressed back into the hot list, for
    /// read paths that need the full history. A blob that fails to
    /// decompress is demoted to "lost": it is dropped and a warning logged,
    /// rather than failing the whole read.
    pub fn materialize(&self, state: &SessionState) -> SessionState {
        let mut materialized = state.clone();
        for (&thought_number, blob) in &state.cold {
            match decompress(blob) {
                Ok(it) => materialized.iterations.push(it),
                Err(e) => {
                    warn!(thought_number, error = %e, "cold iteration lost: decompression failed");
                }
            }
        }
        materialized.iterations.sort_by_key(|it| it.thought_number);
        materialized
    }

    async fn track_footprint(&self, state: &SessionState) {
        let bytes = estimate_footprint(state);
        self.footprints
            .lock()
            .await
            .insert(state.id.clone(), bytes);
    }

    pub async fn forget(&self, session_id: &str) {
        self.footprints.lock().await.remove(session_id);
    }

    /// `emergencyCleanup()`: when tracked bytes exceed `maxMemoryUsageBytes`,
    /// delete whole sessions (largest first) until below 80% of the limit.
    /// Returns the ids deleted.
    pub async fn emergency_cleanup(&self, store: &SessionStore) -> Result<Vec<String>, GanError> {
        let mut footprints: Vec<(String, u64)> = {
            let guard = self.footprints.lock().await;
            guard.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };
        let mut total: u64 = footprints.iter().map(|(_, b)| b).sum();
        if total <= self.config.max_memory_usage_bytes {
            return Ok(Vec::new());
        }

        footprints.sort_by(|a, b| b.1.cmp(&a.1));
        let target = (self.config.max_memory_usage_bytes as f64 * 0.8) as u64;
        let mut deleted = Vec::new();
        for (id, bytes) in footprints {
            if total <= target {
                break;
            }
            store.delete(&id)?;
            self.footprints.lock().await.remove(&id);
            total = total.saturating_sub(bytes);
            deleted.push(id);
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> HistoryStats {
        let footprints = self.footprints.lock().await;
        let total_bytes: u64 = footprints.values().sum();
        let active_sessions = footprints.len() as u64;
        let compressed_iterations = self.counters.compressed_iterations.load(Ordering::Relaxed);
        let sum_original = self.counters.sum_original.load(Ordering::Relaxed);
        let sum_compressed = self.counters.sum_compressed.load(Ordering::Relaxed);
        let bytes_saved = sum_original.saturating_sub(sum_compressed);
        let average_ratio = if sum_original > 0 {
            sum_compressed as f64 / sum_original as f64
        } else {
            0.0
        };
        HistoryStats {
            total_bytes,
            active_sessions,
            compressed_iterations,
            bytes_saved,
            average_ratio,
            bytes_per_session: total_bytes.checked_div(active_sessions.max(1)).unwrap_or(0),
        }
    }
}

fn canonical_size(iteration: &Iteration) -> u64 {
    serde_json::to_vec(iteration).map(|v| v.len() as u64).unwrap_or(0)
}

fn estimate_footprint(state: &SessionState) -> u64 {
    let hot: u64 = state.iterations.iter().map(canonical_size).sum();
    let cold: u64 = state
        .cold
        .values()
        .map(|b| b.compressed_size)
        .sum();
    hot + cold
}

/// Serialize `iteration` canonically (`serde_json::to_vec`, stable field
/// order via derive), gzip it, and base64-encode for JSON storage.
fn compress(iteration: &Iteration) -> Result<CompressedIteration, GanError> {
    let canonical = serde_json::to_vec(iteration)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&canonical)?;
    let compressed = encoder.finish()?;
    Ok(CompressedIteration {
        original_size: canonical.len() as u64,
        compressed_size: compressed.len() as u64,
        compressed_at: Utc::now(),
        blob_base64: B64.encode(compressed),
    })
}

/// Inverse of [`compress`]. A decode/decompress/parse failure is reported
/// as a distinct [`GanError::Serde`] so the caller can demote-and-warn
/// rather than crash the read (§4.6).
fn decompress(blob: &CompressedIteration) -> Result<Iteration, GanError> {
    let compressed = B64
        .decode(&blob.blob_base64)
        .map_err(|e| GanError::Serde(e.to_string()))?;
    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut canonical = Vec::new();
    decoder.read_to_end(&mut canonical)?;
    let iteration = serde_json::from_slice(&canonical)?;
    Ok(iteration)
}
