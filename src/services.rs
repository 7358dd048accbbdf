//! External collaborator traits: the Code Graph Service, the Filesystem
//! Service, and the LLM Session. The core never depends on a concrete
//! implementation of any of these — only on the trait object, constructed
//! once and handed to the orchestrator by value as a [`Services`] bundle.
//! This replaces the original's global mutable singletons (service
//! container, SDK client, skill registry) per SPEC_FULL.md §9.

use crate::error::{FsError, GraphError, LlmError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One row returned by a graph query.
#[derive(Debug, Clone, Default)]
pub struct GraphNode {
    pub name: String,
    pub labels: Vec<String>,
    pub file_path: Option<String>,
    pub qualified_name: Option<String>,
}

/// Result of a single Cypher-like query.
#[derive(Debug, Clone, Default)]
pub struct GraphQueryResult {
    pub nodes: Vec<GraphNode>,
}

/// Read-only view over a code-entity graph (classes, modules, functions,
/// and the edges between them). All writes are forbidden by contract —
/// there is deliberately no mutating method on this trait.
#[async_trait]
pub trait CodeGraphService: Send + Sync {
    async fn query(&self, cypher_like: &str) -> Result<GraphQueryResult, GraphError>;
}

/// Read/search access over a source tree, rooted at a configured
/// workspace root. Implementations must reject paths that escape that
/// root.
#[async_trait]
pub trait FilesystemService: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<String, FsError>;
    async fn search_files(&self, glob: &str) -> Result<Vec<String>, FsError>;
    async fn exists(&self, path: &str) -> bool;
}

/// A single completion call against an LLM session.
#[async_trait]
pub trait LlmSession: Send + Sync {
    async fn send_and_wait(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

/// The three external collaborators, bundled by `Arc` so orchestrator
/// instances can share them cheaply without any module-level mutable
/// state.
#[derive(Clone)]
pub struct Services {
    pub graph: Arc<dyn CodeGraphService>,
    pub filesystem: Arc<dyn FilesystemService>,
    pub llm: Arc<dyn LlmSession>,
}

impl Services {
    pub fn new(
        graph: Arc<dyn CodeGraphService>,
        filesystem: Arc<dyn FilesystemService>,
        llm: Arc<dyn LlmSession>,
    ) -> Self {
        Self { graph, filesystem, llm }
    }
}
