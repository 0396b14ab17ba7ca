//! Neo4j connection management and the shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query};

use inventory_core::config::Neo4jSettings;
use inventory_core::InventoryError;

use crate::cypher::CypherQuery;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("No {what} with element id {element_id}")]
    NotFound { what: String, element_id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<GraphError> for InventoryError {
    fn from(err: GraphError) -> Self {
        InventoryError::backend(crate::backend::NAME, err)
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&Neo4jSettings::default())
    }
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Run a statement produced by the Cypher builders and collect its rows.
    pub async fn fetch(&self, statement: CypherQuery) -> Result<Vec<neo4rs::Row>, GraphError> {
        tracing::trace!(cypher = %statement.text, "Executing statement");
        self.query_rows(statement.into_query()).await
    }
}

/// Read a column from a row, reporting the column name on failure.
pub(crate) fn column<'r, T>(row: &'r neo4rs::Row, name: &str) -> Result<T, GraphError>
where
    T: serde::Deserialize<'r>,
{
    row.get::<T>(name)
        .map_err(|e| GraphError::Serialization(format!("Failed to read column '{name}': {e}")))
}
