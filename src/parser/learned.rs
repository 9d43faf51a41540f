//! Disk-persisted prompts that the LLM fallback once parsed
//! successfully. Consulting this store before re-invoking the LLM
//! keeps repeat prompt shapes free.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::model::intent::{
    CONFIDENCE_LEARNED_EXACT, CONFIDENCE_LEARNED_TEMPLATE, ParsedIntent,
};

/// One persisted parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub prompt: String,
    pub normalized: String,
    pub result: ParsedIntent,
}

/// Append-only store backed by a single JSON file. Loading is lazy and
/// idempotent; a truncated or corrupt file logs a warning and restarts
/// empty rather than failing the request.
pub struct LearnedStore {
    path: PathBuf,
    // None until the first query touches disk.
    inner: Mutex<Option<Vec<LearnedPattern>>>,
}

// ── Normalization ───────────────────────────────────────────────────

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("normalize regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex"));
static BASE58_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[1-9A-HJ-NP-Za-km-z]{32,44}").expect("base58 regex"));

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace every number and base58 run with placeholders, yielding a
/// shape key that matches across amounts and addresses.
fn template_key(prompt: &str) -> String {
    let addressed = BASE58_RUN.replace_all(prompt, "__ADDR__");
    NUMBER.replace_all(&addressed, "__NUM__").into_owned()
}

fn first_number(prompt: &str) -> Option<f64> {
    NUMBER.find(prompt).and_then(|m| m.as_str().parse().ok())
}

// ── Store ───────────────────────────────────────────────────────────

impl LearnedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LearnedStore {
            path: path.into(),
            inner: Mutex::new(None),
        }
    }

    /// Default on-disk location.
    pub fn default_path() -> PathBuf {
        Path::new("data").join("learned-intents.json")
    }

    /// Look up a prompt. Exact normalized matches win over template
    /// matches; template hits get the query's first number spliced
    /// into their first numeric parameter.
    pub fn lookup(&self, prompt: &str) -> Option<ParsedIntent> {
        let mut guard = self.inner.lock().ok()?;
        let patterns = Self::loaded(&mut guard, &self.path);

        let normalized = normalize(prompt);
        if let Some(hit) = patterns.iter().find(|p| p.normalized == normalized) {
            let mut result = hit.result.clone();
            result.confidence = CONFIDENCE_LEARNED_EXACT;
            return Some(result);
        }

        let query_key = template_key(&normalized);
        let hit = patterns
            .iter()
            .find(|p| template_key(&p.normalized) == query_key)?;
        let mut result = hit.result.clone();
        if let Some(n) = first_number(prompt) {
            splice_first_numeric(&mut result, n);
        }
        result.confidence = CONFIDENCE_LEARNED_TEMPLATE;
        Some(result)
    }

    /// Record a successful parse. A record with the same normalized
    /// key is already equivalent, so saving again is a no-op.
    pub fn save(&self, prompt: &str, result: &ParsedIntent) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("learned store lock poisoned"))?;
        let patterns = Self::loaded(&mut guard, &self.path);

        let normalized = normalize(prompt);
        if patterns.iter().any(|p| p.normalized == normalized) {
            return Ok(());
        }

        patterns.push(LearnedPattern {
            prompt: prompt.to_string(),
            normalized,
            result: result.clone(),
        });

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data dir {}", parent.display()))?;
        }

        // Write atomically: write to tmp then rename, so a crash never
        // leaves a half-written file behind.
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&*patterns)?;
        std::fs::write(&tmp, &json)
            .with_context(|| format!("writing learned store tmp {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming learned store to {}", self.path.display()))?;
        Ok(())
    }

    /// Number of records currently held (loads on first use).
    pub fn len(&self) -> usize {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(_) => return 0,
        };
        Self::loaded(&mut guard, &self.path).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn loaded<'a>(
        guard: &'a mut Option<Vec<LearnedPattern>>,
        path: &Path,
    ) -> &'a mut Vec<LearnedPattern> {
        if guard.is_none() {
            *guard = Some(Self::load_from_disk(path));
        }
        guard.as_mut().expect("just populated")
    }

    fn load_from_disk(path: &Path) -> Vec<LearnedPattern> {
        if !path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(patterns) => patterns,
                Err(e) => {
                    warn!("learned store at {} is unreadable ({e}); starting empty", path.display());
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("could not read learned store {}: {e}", path.display());
                Vec::new()
            }
        }
    }
}

/// Replace the first numeric parameter with a fresh value. `amount` is
/// preferred when present; otherwise the first numeric entry wins.
fn splice_first_numeric(result: &mut ParsedIntent, value: f64) {
    if let Some(slot) = result.params.get_mut("amount").filter(|v| v.is_number()) {
        *slot = json!(value);
        return;
    }
    for (_, slot) in result.params.iter_mut() {
        if slot.is_number() {
            *slot = json!(value);
            return;
        }
    }
}
