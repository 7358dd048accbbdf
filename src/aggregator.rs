//! Context Aggregator: builds an [`AggregatedContext`] from the Code Graph
//! Service and Filesystem Service, enforcing the token budget by
//! compression when needed. Grounded in `aggregator.py`'s
//! `ContextAggregator.build_context`.

use crate::config::AggregatorConfig;
use crate::services::Services;
use crate::types::{AggregatedContext, ComponentInfo, KeyFile, SchemaInfo};
use tracing::{debug, info, warn};

const TRUNCATE_SENTINEL: &str = "\u{2026}[truncated]\u{2026}";
const TRUNCATE_HEAD_TAIL: usize = 500;

/// One (step_code, detail) progress event, matching the stable
/// enumeration in SPEC_FULL.md §6.
pub type ProgressFn<'a> = dyn Fn(&str, &str) + Send + Sync + 'a;

pub struct ContextAggregator {
    services: Services,
    config: AggregatorConfig,
}

impl ContextAggregator {
    pub fn new(services: Services, config: AggregatorConfig) -> Self {
        Self { services, config }
    }

    /// Build an [`AggregatedContext`], compressing it under the token
    /// budget when necessary. Every external call degrades to an empty
    /// sub-result on failure; nothing here ever returns `Err`.
    pub async fn build_context(
        &self,
        request: &str,
        hinted_components: &[String],
        include_similar: bool,
        progress: &ProgressFn<'_>,
    ) -> AggregatedContext {
        progress("context", "Starting context aggregation...");

        progress("neo4j", "Querying code graph for architecture context...");
        let (components, schema) = self.discover_components(hinted_components).await;
        progress("neo4j", &format!("Found {} components", components.len()));

        progress("filesystem", "Reading source files for implementation context...");
        let (key_files, discovered_configs) = self.probe_filesystem(&components).await;
        progress("filesystem", &format!("Analyzed {} key files", key_files.len()));

        let similar_features = if include_similar {
            progress("neo4j", "Searching for similar features in codebase...");
            let found = self.find_similar_features(request).await;
            if !found.is_empty() {
                progress("neo4j", &format!("Found {} similar features", found.len()));
            }
            found
        } else {
            Vec::new()
        };

        let mut context = AggregatedContext {
            request: request.to_string(),
            components,
            key_files,
            schema,
            similar_features,
            discovered_configs,
            estimated_tokens: 0,
        };
        context.estimated_tokens = context.estimate_tokens();

        if context.estimated_tokens > self.config.max_context_tokens {
            warn!(
                tokens = context.estimated_tokens,
                budget = self.config.max_context_tokens,
                "context exceeds token budget, compressing"
            );
            context = compress(context, self.config.max_context_tokens);
        }

        info!(tokens = context.estimated_tokens, "context built");
        context
    }

    async fn discover_components(
        &self,
        hinted_components: &[String],
    ) -> (Vec<ComponentInfo>, SchemaInfo) {
        let mut components = Vec::new();

        if hinted_components.is_empty() {
            match self
                .services
                .graph
                .query("MATCH (c:Service) RETURN c.name as name, c.type as type, c.path as path LIMIT 20")
                .await
            {
                Ok(result) => {
                    for node in result.nodes {
                        components.push(ComponentInfo {
                            name: node.name,
                            kind: node.labels.first().cloned().unwrap_or_else(|| "service".to_string()),
                            path: node.file_path.unwrap_or_default(),
                            dependencies: Vec::new(),
                            dependents: Vec::new(),
                        });
                    }
                }
                Err(e) => debug!(error = %e, "component discovery query failed"),
            }
        } else {
            for name in hinted_components {
                let query = format!(
                    "MATCH (n) WHERE n.name CONTAINS '{name}' RETURN n.name as name, labels(n) as labels, n.filePath as filePath"
                );
                match self.services.graph.query(&query).await {
                    Ok(result) if !result.nodes.is_empty() => {
                        let node = &result.nodes[0];
                        components.push(ComponentInfo {
                            name: name.clone(),
                            kind: node.labels.first().cloned().unwrap_or_else(|| "service".to_string()),
                            path: node.file_path.clone().unwrap_or_else(|| format!("/services/{name}")),
                            dependencies: Vec::new(),
                            dependents: Vec::new(),
                        });
                    }
                    _ => components.push(ComponentInfo {
                        name: name.clone(),
                        kind: "service".to_string(),
                        path: format!("/services/{name}"),
                        dependencies: Vec::new(),
                        dependents: Vec::new(),
                    }),
                }
            }
        }

        let schema = self.discover_schema().await;
        (components, schema)
    }

    async fn discover_schema(&self) -> SchemaInfo {
        match self
            .services
            .graph
            .query("CALL db.labels() YIELD label RETURN label")
            .await
        {
            Ok(result) => {
                let node_labels = result
                    .nodes
                    .iter()
                    .flat_map(|n| n.labels.clone())
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                SchemaInfo { node_labels, relationship_types: Vec::new() }
            }
            Err(e) => {
                debug!(error = %e, "schema discovery query failed");
                SchemaInfo::default()
            }
        }
    }

    async fn probe_filesystem(&self, components: &[ComponentInfo]) -> (Vec<KeyFile>, Vec<String>) {
        let mut key_files = Vec::new();

        for component in components.iter().take(self.config.max_components_probed) {
            let patterns = [
                format!("**/{}/**/*.rs", component.name),
                format!("**/{}/**/*.py", component.name),
                format!("**/{}/**/*.ts", component.name),
                format!("**/services/{}/**/*", component.name),
            ];

            let mut found_for_component = 0usize;
            for pattern in &patterns {
                if found_for_component >= self.config.max_files_per_component {
                    break;
                }
                let files = match self.services.filesystem.search_files(pattern).await {
                    Ok(files) => files,
                    Err(e) => {
                        debug!(error = %e, pattern, "search_files failed");
                        continue;
                    }
                };

                for path in files.into_iter().take(self.config.max_files_per_component - found_for_component) {
                    match self.services.filesystem.read_file(&path).await {
                        Ok(content) => {
                            let truncated: String =
                                content.chars().take(self.config.file_byte_cap).collect();
                            key_files.push(KeyFile {
                                path,
                                truncated_content: truncated,
                                relevance: 0.8,
                            });
                            found_for_component += 1;
                        }
                        Err(e) => debug!(error = %e, path, "read_file failed"),
                    }
                }
            }
        }

        let config_patterns = ["**/config/*.toml", "**/config/*.yaml", "**/config/*.json", "**/.env.example"];
        let mut discovered_configs = Vec::new();
        for pattern in config_patterns {
            if let Ok(files) = self.services.filesystem.search_files(pattern).await {
                discovered_configs.extend(files.into_iter().take(2));
            }
        }

        (key_files, discovered_configs)
    }

    async fn find_similar_features(&self, request: &str) -> Vec<String> {
        let query = format!(
            "MATCH (f:Feature) WHERE f.description CONTAINS '{}' RETURN f.name as name LIMIT 5",
            request.replace('\'', "")
        );
        match self.services.graph.query(&query).await {
            Ok(result) => result.nodes.into_iter().map(|n| n.name).filter(|n| !n.is_empty()).collect(),
            Err(e) => {
                debug!(error = %e, "similar-features query failed");
                Vec::new()
            }
        }
    }
}

/// The four-step compression pipeline from SPEC_FULL.md §4.2, run in
/// order and idempotent: truncate large files, trim components to the
/// discovery-order top 10, trim files to the relevance-sorted top 10, and
/// finally trim similar features to 3 if still over budget.
pub fn compress(mut context: AggregatedContext, max_tokens: usize) -> AggregatedContext {
    for file in context.key_files.iter_mut() {
        if file.truncated_content.chars().count() > 1000 {
            let chars: Vec<char> = file.truncated_content.chars().collect();
            let head: String = chars[..TRUNCATE_HEAD_TAIL].iter().collect();
            let tail: String = chars[chars.len() - TRUNCATE_HEAD_TAIL..].iter().collect();
            file.truncated_content = format!("{head}{TRUNCATE_SENTINEL}{tail}");
        }
    }

    if context.components.len() > 10 {
        context.components.truncate(10);
    }

    if context.key_files.len() > 10 {
        context
            .key_files
            .sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
        context.key_files.truncate(10);
    }

    context.estimated_tokens = context.estimate_tokens();
    if context.estimated_tokens > max_tokens && context.similar_features.len() > 3 {
        context.similar_features.truncate(3);
    }

    context.estimated_tokens = context.estimate_tokens();
    context
}
