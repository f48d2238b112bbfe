// Pattern store - loads, compiles and queries one line-oriented entry list.
//
// Used twice: once as the block-list, once as the allow-list. Queries read
// an immutable snapshot through a cheap handle clone and never block;
// mutations (reload/append/remove) serialize on an internal async mutex,
// rebuild the snapshot off to the side, and publish it in one swap.
//
// Persistence sits behind the `PatternSource` port so the core stays
// testable without touching the filesystem.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::pattern_models::{
    compile_line, PatternError, PatternMatch, PatternOptions, PatternSnapshot, ReloadOutcome,
};
use crate::core::normalize::Normalizer;

// ============================================================================
// SOURCE TRAIT (PORT)
// ============================================================================

/// Line-oriented backing source for a pattern store.
///
/// Implementations must make writes durable before returning; the store
/// reloads from the source immediately after every mutation.
#[async_trait]
pub trait PatternSource: Send + Sync {
    /// Read every line of the source, creating it first if it is missing.
    async fn read_lines(&self) -> Result<Vec<String>, PatternError>;

    /// Append one entry line at the end of the source.
    async fn append_line(&self, line: &str) -> Result<(), PatternError>;

    /// Replace the whole source with the given lines.
    async fn write_lines(&self, lines: &[String]) -> Result<(), PatternError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PatternStore<S: PatternSource> {
    /// Store name used in log lines ("blocklist" / "allowlist").
    name: &'static str,
    source: S,
    normalizer: Arc<Normalizer>,
    auto_variants: bool,
    snapshot: RwLock<Arc<PatternSnapshot>>,
    /// At most one mutation in flight per store.
    mutation: Mutex<()>,
}

impl<S: PatternSource> PatternStore<S> {
    /// Create an empty store. Call [`reload`](Self::reload) to load entries
    /// from the source.
    pub fn new(
        name: &'static str,
        source: S,
        normalizer: Arc<Normalizer>,
        options: PatternOptions,
    ) -> Self {
        Self {
            name,
            source,
            normalizer,
            auto_variants: options.auto_variants,
            snapshot: RwLock::new(Arc::new(PatternSnapshot::empty())),
            mutation: Mutex::new(()),
        }
    }

    /// The current consistent view of the store. Holding the returned `Arc`
    /// pins that view; later reloads publish new snapshots without touching
    /// it.
    pub fn snapshot(&self) -> Arc<PatternSnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn publish(&self, snapshot: PatternSnapshot) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);
    }

    /// Re-read the backing source and atomically publish a fresh snapshot.
    /// On a read failure the previous snapshot stays in place.
    pub async fn reload(&self) -> Result<ReloadOutcome, PatternError> {
        let _guard = self.mutation.lock().await;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> Result<ReloadOutcome, PatternError> {
        let lines = match self.source.read_lines().await {
            Ok(lines) => lines,
            Err(err) => {
                tracing::error!(store = self.name, "Failed to read pattern source: {err}");
                return Err(err);
            }
        };

        let mut next = PatternSnapshot::empty();
        let mut skipped = 0usize;
        for (index, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            next.insert_raw(line);
            let compiled = compile_line(line, &self.normalizer, self.auto_variants);
            if let Some(err) = compiled.regex_error {
                skipped += 1;
                tracing::warn!(
                    store = self.name,
                    line = index + 1,
                    "Skipping regex form of entry: {err}"
                );
            }
            if let Some(entry) = compiled.entry {
                next.push(entry);
            }
        }

        let outcome = ReloadOutcome {
            literal_count: next.literal_count(),
            regex_count: next.regex_count(),
            skipped_lines: skipped,
            safe_mode: next.is_empty(),
        };
        if outcome.safe_mode {
            tracing::warn!(
                store = self.name,
                "No usable entries loaded; store is in safe mode and matches nothing"
            );
        } else {
            tracing::info!(
                store = self.name,
                literals = outcome.literal_count,
                regexes = outcome.regex_count,
                "Loaded pattern entries"
            );
        }
        self.publish(next);
        Ok(outcome)
    }

    /// Block-list query against already-normalized input.
    pub fn find_match(&self, normalized: &str) -> Option<PatternMatch> {
        self.snapshot().find_match(normalized)
    }

    /// Allow-list query; see [`PatternSnapshot::find_exempt_match`].
    pub fn find_exempt_match(&self, normalized: &str, original: &str) -> Option<String> {
        self.snapshot().find_exempt_match(normalized, original)
    }

    /// Exact-match membership test against the raw line set.
    pub fn contains_raw(&self, value: &str) -> bool {
        self.snapshot().contains_raw(value)
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Append a new entry and reload. `Ok(false)` for blank input or a raw
    /// duplicate; the duplicate check and the write happen under the same
    /// mutation lock.
    pub async fn append(&self, value: &str) -> Result<bool, PatternError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        let _guard = self.mutation.lock().await;
        if self.snapshot().contains_raw(trimmed) {
            return Ok(false);
        }
        if let Err(err) = self.source.append_line(trimmed).await {
            tracing::error!(store = self.name, "Failed to append pattern entry: {err}");
            return Err(err);
        }
        self.reload_locked().await?;
        Ok(true)
    }

    /// Remove the first line whose trimmed text equals `value`, rewrite the
    /// source and reload. `Ok(false)` when no such line exists.
    pub async fn remove(&self, value: &str) -> Result<bool, PatternError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        let _guard = self.mutation.lock().await;
        let lines = match self.source.read_lines().await {
            Ok(lines) => lines,
            Err(err) => {
                tracing::error!(store = self.name, "Failed to read pattern source: {err}");
                return Err(err);
            }
        };

        let mut removed = false;
        let mut updated = Vec::with_capacity(lines.len());
        for line in lines {
            if !removed && line.trim() == trimmed {
                removed = true;
                continue;
            }
            updated.push(line);
        }
        if !removed {
            return Ok(false);
        }

        if let Err(err) = self.source.write_lines(&updated).await {
            tracing::error!(store = self.name, "Failed to rewrite pattern source: {err}");
            return Err(err);
        }
        self.reload_locked().await?;
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{NormalizeConfig, Normalizer};
    use crate::core::patterns::pattern_models::MatchOrigin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Shared-vector source so tests can swap the backing lines wholesale
    /// and simulate read failures.
    struct SharedSource {
        lines: Arc<StdMutex<Vec<String>>>,
        fail_reads: Arc<AtomicBool>,
    }

    impl SharedSource {
        fn new(lines: &[&str]) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let shared = Arc::new(StdMutex::new(
                lines.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
            ));
            let fail = Arc::new(AtomicBool::new(false));
            (
                Self {
                    lines: Arc::clone(&shared),
                    fail_reads: Arc::clone(&fail),
                },
                shared,
                fail,
            )
        }
    }

    #[async_trait]
    impl PatternSource for SharedSource {
        async fn read_lines(&self) -> Result<Vec<String>, PatternError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(PatternError::Source("simulated read failure".to_string()));
            }
            Ok(self.lines.lock().expect("test lines lock").clone())
        }

        async fn append_line(&self, line: &str) -> Result<(), PatternError> {
            self.lines
                .lock()
                .expect("test lines lock")
                .push(line.to_string());
            Ok(())
        }

        async fn write_lines(&self, lines: &[String]) -> Result<(), PatternError> {
            *self.lines.lock().expect("test lines lock") = lines.to_vec();
            Ok(())
        }
    }

    fn store_with(lines: &[&str]) -> PatternStore<SharedSource> {
        let (source, _, _) = SharedSource::new(lines);
        PatternStore::new(
            "blocklist",
            source,
            Arc::new(Normalizer::new(NormalizeConfig::default())),
            PatternOptions::default(),
        )
    }

    #[tokio::test]
    async fn reload_skips_comments_and_blank_lines() {
        let store = store_with(&["# header comment", "", "badword", "  ", "^evil.*$"]);
        let outcome = store.reload().await.expect("reload");
        assert_eq!(outcome.literal_count, 1);
        // both "badword" and "^evil.*$" compile as regexes
        assert_eq!(outcome.regex_count, 2);
        assert!(!outcome.safe_mode);
    }

    #[tokio::test]
    async fn literal_entries_win_over_regex_entries() {
        let store = store_with(&["badword", "b.dword"]);
        store.reload().await.expect("reload");
        let hit = store.find_match("say badword now").expect("match");
        assert_eq!(hit.origin, MatchOrigin::Literal);
        assert_eq!(hit.raw, "badword");
    }

    #[tokio::test]
    async fn regex_entries_match_when_no_literal_hits() {
        let store = store_with(&["^evil\\d+$"]);
        store.reload().await.expect("reload");
        let hit = store.find_match("evil42").expect("match");
        assert_eq!(hit.origin, MatchOrigin::Regex);
        assert_eq!(hit.matched, "evil42");
    }

    #[tokio::test]
    async fn invalid_regex_line_keeps_the_rest_of_the_store() {
        let store = store_with(&["bad[", "badword"]);
        let outcome = store.reload().await.expect("reload");
        assert_eq!(outcome.skipped_lines, 1);
        assert!(store.find_match("badword").is_some());
        // the broken line still counts as a raw entry
        assert!(store.contains_raw("bad["));
    }

    #[tokio::test]
    async fn empty_store_reports_safe_mode_and_never_matches() {
        let store = store_with(&["# only comments here"]);
        let outcome = store.reload().await.expect("reload");
        assert!(outcome.safe_mode);
        assert!(store.is_empty());
        assert!(store.find_match("anything at all").is_none());
    }

    #[tokio::test]
    async fn read_failure_keeps_the_last_good_snapshot() {
        let (source, _, fail) = SharedSource::new(&["badword"]);
        let store = PatternStore::new(
            "blocklist",
            source,
            Arc::new(Normalizer::new(NormalizeConfig::default())),
            PatternOptions::default(),
        );
        store.reload().await.expect("initial reload");
        assert!(store.find_match("badword").is_some());

        fail.store(true, Ordering::SeqCst);
        assert!(store.reload().await.is_err());
        // queries still serve the previous snapshot
        assert!(store.find_match("badword").is_some());
    }

    #[tokio::test]
    async fn append_rejects_duplicates_and_blanks() {
        let store = store_with(&[]);
        store.reload().await.expect("reload");

        assert!(store.append("word").await.expect("append"));
        assert!(store.contains_raw("word"));
        assert!(!store.append("word").await.expect("append duplicate"));
        assert!(!store.append("   ").await.expect("append blank"));
        assert!(store.find_match("word").is_some());
    }

    #[tokio::test]
    async fn remove_deletes_exactly_one_line_and_reloads() {
        let store = store_with(&["word", "other"]);
        store.reload().await.expect("reload");
        assert!(store.find_match("word").is_some());

        assert!(store.remove("word").await.expect("remove"));
        assert!(store.find_match("here is word again").is_none());
        assert!(store.find_match("other").is_some());
        assert!(!store.remove("word").await.expect("remove missing"));
    }

    #[tokio::test]
    async fn allowlist_regex_checks_original_then_normalized() {
        let normalizer = Arc::new(Normalizer::new(NormalizeConfig::default()));
        let (source, _, _) = SharedSource::new(&["^cafe$"]);
        let store = PatternStore::new(
            "allowlist",
            source,
            Arc::clone(&normalizer),
            PatternOptions::default(),
        );
        store.reload().await.expect("reload");

        // the raw text does not match the anchored regex, the normalized
        // form does
        let normalized = normalizer.normalize("Café");
        assert_eq!(normalized, "cafe");
        assert_eq!(
            store.find_exempt_match(&normalized, "Café"),
            Some("^cafe$".to_string())
        );

        // original form matches directly
        assert_eq!(
            store.find_exempt_match("cafe", "cafe"),
            Some("^cafe$".to_string())
        );
    }

    #[tokio::test]
    async fn allowlist_literals_check_the_normalized_form() {
        let normalizer = Arc::new(Normalizer::new(NormalizeConfig::default()));
        let (source, _, _) = SharedSource::new(&["goodword"]);
        let store = PatternStore::new(
            "allowlist",
            source,
            Arc::clone(&normalizer),
            PatternOptions::default(),
        );
        store.reload().await.expect("reload");

        let original = "this g00dw0rd stays";
        let normalized = normalizer.normalize(original);
        assert_eq!(
            store.find_exempt_match(&normalized, original),
            Some("goodword".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_observe_a_half_published_snapshot() {
        let (source, shared, _) = SharedSource::new(&["alpha", "beta"]);
        let store = Arc::new(PatternStore::new(
            "blocklist",
            source,
            Arc::new(Normalizer::new(NormalizeConfig::default())),
            PatternOptions::default(),
        ));
        store.reload().await.expect("initial reload");

        let writer = {
            let store = Arc::clone(&store);
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                for round in 0..50 {
                    let next: Vec<String> = if round % 2 == 0 {
                        Vec::new()
                    } else {
                        vec!["alpha".to_string(), "beta".to_string()]
                    };
                    *shared.lock().expect("test lines lock") = next;
                    store.reload().await.expect("reload");
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        // one snapshot = one consistent view: the two
                        // entries are always present together or not at all
                        let snapshot = store.snapshot();
                        assert_eq!(
                            snapshot.contains_raw("alpha"),
                            snapshot.contains_raw("beta"),
                        );
                        assert!(snapshot.literal_count() == 0 || snapshot.literal_count() == 2);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.expect("writer task");
        for reader in readers {
            reader.await.expect("reader task");
        }
    }

    #[tokio::test]
    async fn concurrent_appends_serialize_without_losing_entries() {
        let store = Arc::new(store_with(&[]));
        store.reload().await.expect("reload");

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.append(&format!("entry{i}")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.expect("append task").expect("append"));
        }
        for i in 0..8 {
            assert!(store.contains_raw(&format!("entry{i}")));
        }
    }
}
