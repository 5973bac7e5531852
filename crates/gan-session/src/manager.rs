//! C5 Session Store (§4.5): load/save/validate/repair per-session state
//! files, id generation, sweeping.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::warn;

use gan_core::GanError;

use crate::state::SessionState;

/// Result of loading a session: the (possibly repaired) state plus any
/// human-readable warnings the caller should surface (§4.5's recovery
/// policy and §9's propagation policy: "C5 repair happens during load and
/// is transparent to C8 (warnings only)").
pub struct LoadResult {
    pub state: SessionState,
    pub warnings: Vec<String>,
    pub created_fresh: bool,
}

/// One file per session, named `<sessionId>.json`, under `dir` (§4.5, §6.5).
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, GanError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// `load(id) → SessionState?`, with in-place repair/migration per §4.5.
    /// A missing file is not an error: it yields a fresh default session
    /// (`sessionNotFound` is `n/a` recoverable per §7).
    pub fn load(&self, id: &str) -> Result<LoadResult, GanError> {
        let path = self.path_for(id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadResult {
                    state: SessionState::new(id),
                    warnings: Vec::new(),
                    created_fresh: true,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<SessionState>(&raw) {
            Ok(mut state) => {
                let mut warnings = Vec::new();
                let expected = {
                    let hot_max = state.iterations.iter().map(|it| it.thought_number).max();
                    let cold_max = state.cold.keys().copied().max();
                    hot_max.into_iter().chain(cold_max).max().unwrap_or(0)
                };
                if state.current_loop < expected {
                    warnings.push(format!(
                        "dataInconsistency: currentLoop {} < max iteration {}, repaired",
                        state.current_loop, expected
                    ));
                    state.current_loop = expected;
                }
                Ok(LoadResult {
                    state,
                    warnings,
                    created_fresh: false,
                })
            }
            Err(e) => {
                warn!(id, error = %e, "session file failed strict parse, attempting repair");
                self.repair(id, &raw)
            }
        }
    }

    /// Field-level repair for `missingFields`/`formatMismatch`/`partialData`
    /// malformed documents (§4.5). A document that is not even valid JSON
    /// is unrecoverable and yields a fresh default session.
    fn repair(&self, id: &str, raw: &str) -> Result<LoadResult, GanError> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => {
                warn!(id, "session file is not valid JSON; resetting to a fresh session");
                return Ok(LoadResult {
                    state: SessionState::new(id),
                    warnings: vec!["notFound: session file unreadable, reset".to_string()],
                    created_fresh: true,
                });
            }
        };

        let mut state = SessionState::new(id);
        let mut warnings = Vec::new();
        let Some(obj) = value.as_object() else {
            warnings.push("formatMismatch: session document is not a JSON object, reset".into());
            let repaired = LoadResult {
                state,
                warnings,
                created_fresh: false,
            };
            self.save(&repaired.state)?;
            return Ok(repaired);
        };

        if let Some(s) = obj.get("id").and_then(|v| v.as_str()) {
            state.id = s.to_string();
        } else {
            warnings.push("missingFields: id missing, defaulted".into());
        }
        state.loop_id = obj.get("loop_id").and_then(|v| v.as_str()).map(String::from);
        if let Some(cfg) = obj.get("config") {
            match serde_json::from_value(cfg.clone()) {
                Ok(cfg) => state.config = cfg,
                Err(_) => warnings.push("formatMismatch: config malformed, defaulted".into()),
            }
        }

        state.history = coerce_array(obj.get("history"), &mut warnings, "history");
        state.iterations = coerce_array(obj.get("iterations"), &mut warnings, "iterations");

        if let Some(cold) = obj.get("cold").and_then(|v| v.as_object()) {
            for (k, v) in cold {
                if let (Ok(key), Ok(blob)) = (k.parse::<u32>(), serde_json::from_value(v.clone()))
                {
                    state.cold.insert(key, blob);
                } else {
                    warnings.push(format!("partialData: cold iteration {k} dropped"));
                }
            }
        }

        state.is_complete = obj
            .get("is_complete")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        state.completion_reason = obj
            .get("completion_reason")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        state.judge_context_id = obj
            .get("judge_context_id")
            .and_then(|v| v.as_str())
            .map(String::from);
        state.judge_context_active = state.judge_context_id.is_some();

        state.recompute_current_loop();
        warnings.push(format!(
            "dataInconsistency: currentLoop recomputed to {}",
            state.current_loop
        ));

        self.save(&state)?;
        Ok(LoadResult {
            state,
            warnings,
            created_fresh: false,
        })
    }

    /// Atomic save: write `<id>.json.tmp`, then rename (§4.5).
    pub fn save(&self, state: &SessionState) -> Result<(), GanError> {
        let final_path = self.path_for(&state.id);
        let tmp_path = self.dir.join(format!("{}.json.tmp", state.id));
        let body = serde_json::to_vec_pretty(state)?;
        std::fs::write(&tmp_path, &body)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), GanError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_all(&self) -> Result<Vec<String>, GanError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }

    /// Delete files older than `max_age`, and files that fail validation and
    /// cannot be recovered.
    pub fn sweep(&self, max_age: Duration) -> Result<usize, GanError> {
        let mut swept = 0;
        for id in self.list_all()? {
            let path = self.path_for(&id);
            let modified = std::fs::metadata(&path).and_then(|m| m.modified());
            let is_old = modified
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .is_some_and(|age| age > max_age);
            if is_old {
                self.delete(&id)?;
                swept += 1;
                continue;
            }
            if self.load(&id).is_err() {
                self.delete(&id)?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

fn coerce_array<T: serde::de::DeserializeOwned>(
    value: Option<&serde_json::Value>,
    warnings: &mut Vec<String>,
    field: &str,
) -> Vec<T> {
    let Some(value) = value else {
        warnings.push(format!("missingFields: {field} missing, defaulted to []"));
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        warnings.push(format!(
            "formatMismatch: {field} is not an array, coerced to []"
        ));
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(parsed) => out.push(parsed),
            Err(_) => warnings.push(format!("partialData: {field}[{i}] dropped, malformed")),
        }
    }
    out
}

/// Deterministic hash of `cwd || user || salt`, truncated to 16 hex chars.
/// A caller-supplied `branchId` is used verbatim instead (§4.5).
pub fn generate_id(cwd: &str, user: &str, salt: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cwd.as_bytes());
    hasher.update(b"\0");
    hasher.update(user.as_bytes());
    hasher.update(b"\0");
    hasher.update(salt.to_le_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_id_is_deterministic_and_16_hex_chars() {
        let a = generate_id("/repo", "alice", 1);
        let b = generate_id("/repo", "alice", 1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_id_differs_on_salt() {
        let a = generate_id("/repo", "alice", 1);
        let b = generate_id("/repo", "alice", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn load_missing_session_creates_fresh_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let result = store.load("nope").unwrap();
        assert!(result.created_fresh);
        assert_eq!(result.state.current_loop, 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let mut state = SessionState::new("s1");
        state.config.task = "audit the diff".into();
        store.save(&state).unwrap();

        let loaded = store.load("s1").unwrap();
        assert!(!loaded.created_fresh);
        assert_eq!(loaded.state.config.task, "audit the diff");
    }

    #[test]
    fn save_uses_atomic_rename_leaving_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save(&SessionState::new("s1")).unwrap();
        assert!(!dir.path().join("s1.json.tmp").exists());
        assert!(dir.path().join("s1.json").exists());
    }

    #[test]
    fn repairs_iterations_field_that_is_a_string() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("corrupt.json"),
            r#"{"id":"corrupt","iterations":"oops","history":[],"current_loop":5}"#,
        )
        .unwrap();

        let result = store.load("corrupt").unwrap();
        assert!(result.state.iterations.is_empty());
        assert_eq!(result.state.current_loop, 0);
        assert!(!result.warnings.is_empty());

        // Repair is saved back to disk.
        let reloaded = store.load("corrupt").unwrap();
        assert!(reloaded.state.iterations.is_empty());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.delete("never-existed").unwrap();
        store.save(&SessionState::new("s1")).unwrap();
        store.delete("s1").unwrap();
        store.delete("s1").unwrap();
    }

    #[test]
    fn list_all_reports_saved_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save(&SessionState::new("s1")).unwrap();
        store.save(&SessionState::new("s2")).unwrap();
        let mut ids = store.list_all().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn sweep_deletes_files_older_than_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save(&SessionState::new("old")).unwrap();
        // Age it artificially by setting mtime in the past is not portable
        // without extra deps; instead sweep with a zero max_age, which any
        // just-written file already exceeds by the time sweep runs... no it
        // won't. Use Duration::ZERO to force eviction regardless of age.
        let swept = store.sweep(Duration::ZERO).unwrap();
        assert_eq!(swept, 1);
        assert!(store.load("old").unwrap().created_fresh);
    }
}
