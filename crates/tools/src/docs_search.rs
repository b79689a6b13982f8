//! Internal documentation search.
//!
//! The tool talks to a [`DocumentIndex`]. Production deployments plug a
//! vector store in behind that trait; [`KeywordIndex`] is the in-process
//! implementation built from a directory of markdown files.

use async_trait::async_trait;
use genaiops_core::error::ToolError;
use genaiops_core::tool::{parse_arguments, Tool};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;

/// One indexed piece of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub title: String,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
}

/// A chunk with its similarity to the query (higher is closer).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f64,
}

/// Similarity search over documentation chunks.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `k` chunks, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ToolError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split text into overlapping chunks, preferring paragraph breaks.
pub fn chunk_document(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            let window: String = chars[start..end].iter().collect();
            if let Some(pos) = window.rfind("\n\n") {
                let pos_chars = window[..pos].chars().count();
                if pos_chars > chunk_size / 2 {
                    end = start + pos_chars;
                }
            }
        }
        let chunk: String = chars[start..end].iter().collect();
        chunks.push(chunk.trim().to_string());
        if end == chars.len() {
            break;
        }
        // Next chunk re-reads the tail of this one.
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// First `# ` heading, or a title derived from the file name.
pub fn extract_title(content: &str, filename: &str) -> String {
    if let Some(heading) = content.lines().find_map(|l| l.strip_prefix("# ")) {
        return heading.trim().to_string();
    }
    filename
        .trim_end_matches(".md")
        .trim_end_matches(".txt")
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().chain(c.flat_map(|ch| ch.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// In-memory index scoring chunks by query-term overlap.
#[derive(Default)]
pub struct KeywordIndex {
    entries: Vec<(DocumentChunk, HashSet<String>)>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk and index one document.
    pub fn add_document(&mut self, source: &str, content: &str) {
        let title = extract_title(content, source);
        for (chunk_index, text) in chunk_document(content, CHUNK_SIZE, CHUNK_OVERLAP)
            .into_iter()
            .enumerate()
        {
            let chunk_terms = terms(&text);
            self.entries.push((
                DocumentChunk {
                    title: title.clone(),
                    source: source.to_string(),
                    chunk_index,
                    content: text,
                },
                chunk_terms,
            ));
        }
    }

    /// Index every markdown (`*.md`) or plain-text (`*.txt`) file in a
    /// directory, in file-name order.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "md" || ext == "txt"))
            .collect();
        paths.sort();

        let mut index = Self::new();
        for path in &paths {
            let content = std::fs::read_to_string(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            index.add_document(&name, &content);
        }
        info!(dir = %dir.display(), files = paths.len(), chunks = index.entries.len(), "Documentation indexed");
        Ok(index)
    }
}

#[async_trait]
impl DocumentIndex for KeywordIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ToolError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .filter_map(|(chunk, chunk_terms)| {
                let hits = query_terms.intersection(chunk_terms).count();
                (hits > 0).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score: hits as f64 / query_terms.len() as f64,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        debug!(query, results = scored.len(), "Keyword search");
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct InternalDocsSearch {
    index: Arc<dyn DocumentIndex>,
}

impl InternalDocsSearch {
    pub fn new(index: Arc<dyn DocumentIndex>) -> Self {
        Self { index }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    3
}

#[async_trait]
impl Tool for InternalDocsSearch {
    fn name(&self) -> &str {
        "internal_docs_search"
    }

    fn description(&self) -> &str {
        "Search internal DevOps documentation for deployment guides, setup instructions, troubleshooting tips, and best practices. Returns relevant documentation excerpts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query describing what information you need (e.g., 'How to deploy NeMo Retriever', 'GPU optimization tips')"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of documentation sections to return (default: 3)",
                    "default": 3
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: SearchArgs = parse_arguments(arguments)?;

        let results = self
            .index
            .search(&args.query, args.top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: format!("Documentation search failed: {e}"),
            })?;

        if results.is_empty() {
            return Ok(serde_json::json!({
                "query": args.query,
                "documents": [],
                "message": "No relevant documentation found for this query.",
            }));
        }

        let documents: Vec<serde_json::Value> = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                serde_json::json!({
                    "rank": i + 1,
                    "title": r.chunk.title,
                    "content": r.chunk.content,
                    "source": r.chunk.source,
                    "relevance_score": (r.score * 1000.0).round() / 1000.0,
                })
            })
            .collect();

        Ok(serde_json::json!({
            "query": args.query,
            "num_results": documents.len(),
            "documents": documents,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> KeywordIndex {
        let mut index = KeywordIndex::new();
        index.add_document(
            "nemo_retriever_deployment.md",
            "# Deploying NeMo Retriever\n\nPull the container, set the NGC API key in the environment and start the service on a GPU node.",
        );
        index.add_document(
            "gpu_optimization.md",
            "Enable TensorRT engines and batch requests to improve GPU utilization.",
        );
        index
    }

    #[test]
    fn short_documents_are_one_chunk() {
        assert_eq!(chunk_document("hello", 1000, 200), vec!["hello"]);
    }

    #[test]
    fn long_documents_overlap() {
        let text = "a".repeat(2500);
        let chunks = chunk_document(&text, 1000, 200);
        // starts at 0, 800, 1600; the third reaches the end
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[2].len(), 900);
    }

    #[test]
    fn no_chunk_after_the_text_ends() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_document(&text, 1000, 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], text[800..1800]);
        assert_eq!(chunks[2], text[1600..]);
    }

    #[test]
    fn chunks_break_at_late_paragraphs() {
        let text = format!("{}\n\n{}", "x".repeat(700), "y".repeat(900));
        let chunks = chunk_document(&text, 1000, 200);
        assert_eq!(chunks[0], "x".repeat(700));
        // the next chunk overlaps the break instead of skipping past it
        assert!(chunks[1].starts_with(&"x".repeat(200)));
        assert!(chunks.last().unwrap().ends_with('y'));
    }

    #[test]
    fn title_from_heading_or_filename() {
        assert_eq!(extract_title("intro\n# Triton Setup\n", "x.md"), "Triton Setup");
        assert_eq!(extract_title("no heading", "gpu_optimization_tips.md"), "Gpu Optimization Tips");
    }

    #[tokio::test]
    async fn search_ranks_by_overlap() {
        let tool = InternalDocsSearch::new(Arc::new(sample_index()));
        let data = tool
            .execute(serde_json::json!({"query": "How to deploy NeMo Retriever on a GPU"}))
            .await
            .unwrap();
        let docs = data["documents"].as_array().unwrap();
        assert_eq!(data["num_results"], 2);
        assert_eq!(docs[0]["rank"], 1);
        assert_eq!(docs[0]["title"], "Deploying NeMo Retriever");
        assert_eq!(docs[0]["source"], "nemo_retriever_deployment.md");
        assert!(docs[0]["relevance_score"].as_f64().unwrap() > docs[1]["relevance_score"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn top_k_limits_results() {
        let tool = InternalDocsSearch::new(Arc::new(sample_index()));
        let data = tool
            .execute(serde_json::json!({"query": "GPU", "top_k": 1}))
            .await
            .unwrap();
        assert_eq!(data["documents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_match_is_success_with_message() {
        let tool = InternalDocsSearch::new(Arc::new(sample_index()));
        let data = tool
            .execute(serde_json::json!({"query": "cafeteria menu"}))
            .await
            .unwrap();
        assert_eq!(data["documents"].as_array().unwrap().len(), 0);
        assert_eq!(data["message"], "No relevant documentation found for this query.");
    }

    #[tokio::test]
    async fn from_dir_reads_markdown_and_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A\n\nTriton inference").unwrap();
        std::fs::write(dir.path().join("nim_setup_notes.txt"), "Deploying NIM containers").unwrap();
        std::fs::write(dir.path().join("logo.png"), "not text").unwrap();
        let index = KeywordIndex::from_dir(dir.path()).unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.search("deploying containers", 1).await.unwrap();
        assert_eq!(hits[0].chunk.source, "nim_setup_notes.txt");
        assert_eq!(hits[0].chunk.title, "Nim Setup Notes");
    }
}
