//! Documentation search contract and a local keyword-scored corpus
//!
//! The assistant only depends on [`DocumentSearch`]. Vector stores, PDF
//! chunking and index persistence live behind that trait; [`LocalCorpus`]
//! is the small in-process implementation the binary ships with.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// One retrieved documentation passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    #[serde(default)]
    pub page: Option<u32>,
    pub source: String,
    /// Relevance in [0, 1] when the backend provides one
    #[serde(default)]
    pub score: Option<f32>,
}

#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Ranked passages for `query`, best first. An empty result is a valid
    /// "not found"; errors are reserved for backend failures.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>>;

    /// Whether the index holds any documents at all
    async fn is_indexed(&self) -> bool {
        true
    }

    /// Number of indexed passages, when known
    async fn document_count(&self) -> Option<usize> {
        None
    }
}

/// Render passages as the numbered context block given to the model
pub fn build_context(passages: &[Passage]) -> String {
    let mut context = String::new();
    for (i, p) in passages.iter().enumerate() {
        let page = p
            .page
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        context.push_str(&format!(
            "[Source {} - Page {}]\n{}\n\n",
            i + 1,
            page,
            p.text.trim()
        ));
    }
    context
}

/// In-memory corpus loaded from a JSONL file, scored by query-term overlap
#[derive(Debug, Default, Clone)]
pub struct LocalCorpus {
    passages: Vec<Passage>,
    terms: Vec<HashSet<String>>,
}

impl LocalCorpus {
    pub fn new(passages: Vec<Passage>) -> Self {
        let terms = passages.iter().map(|p| tokenize(&p.text)).collect();
        Self { passages, terms }
    }

    /// Load passages from a JSONL file. Blank lines are skipped; a malformed
    /// line is an error naming its line number.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AssistantError::Retrieval {
            message: format!("failed to read corpus {}: {}", path.display(), e),
        })?;
        let mut passages = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let passage: Passage =
                serde_json::from_str(line).map_err(|e| AssistantError::Retrieval {
                    message: format!("{}:{}: {}", path.display(), idx + 1, e),
                })?;
            passages.push(passage);
        }
        tracing::info!(
            "Loaded {} documentation passages from {}",
            passages.len(),
            path.display()
        );
        Ok(Self::new(passages))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl DocumentSearch for LocalCorpus {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let mut scored: Vec<(f32, usize)> = self
            .terms
            .iter()
            .enumerate()
            .filter_map(|(idx, doc_terms)| {
                let hits = query_terms.intersection(doc_terms).count();
                (hits > 0).then(|| (hits as f32 / query_terms.len() as f32, idx))
            })
            .collect();

        // Ties keep corpus order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, idx)| {
                let mut p = self.passages[idx].clone();
                p.score = Some(score.clamp(0.0, 1.0));
                p
            })
            .collect())
    }

    async fn is_indexed(&self) -> bool {
        !self.passages.is_empty()
    }

    async fn document_count(&self) -> Option<usize> {
        Some(self.passages.len())
    }
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "what", "does", "how", "this", "that", "from", "into", "are",
    "can", "you", "use", "show", "about",
];

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}
