//! Neo4j connection management and the scoped session gateway.

use futures::future::BoxFuture;
use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn};

use kgrag_core::config::Neo4jSettings;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[source] neo4rs::Error),

    #[error("Unsupported store capability: {0}")]
    Capability(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<neo4rs::Error> for GraphError {
    /// Classify a driver error by the Neo4j status it carries.
    fn from(err: neo4rs::Error) -> Self {
        let message = err.to_string();
        match ErrorClass::of(&message) {
            ErrorClass::MissingProcedure => Self::Capability(message),
            ErrorClass::ConstraintViolation => Self::Constraint(message),
            ErrorClass::Other => Self::Query(err),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ErrorClass {
    MissingProcedure,
    ConstraintViolation,
    Other,
}

impl ErrorClass {
    fn of(message: &str) -> Self {
        if message.contains("Procedure.ProcedureNotFound")
            || message.contains("no procedure with the name")
        {
            Self::MissingProcedure
        } else if message.contains("Schema.ConstraintValidationFailed")
            || message.contains("already exists with label")
        {
            Self::ConstraintViolation
        } else {
            Self::Other
        }
    }
}

impl GraphError {
    /// Whether the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_))
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
/// This is the single point of access for all knowledge graph operations.
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

    /// Run `op` inside a scoped session.
    ///
    /// The session is committed when `op` succeeds and rolled back when it
    /// fails. Dropping the returned future drops the open transaction, which
    /// hands the connection back to the pool. Failure to acquire a session is
    /// reported as [`GraphError::Connection`] and is not retried.
    pub async fn with_session<T, F>(&self, op: F) -> Result<T, GraphError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut GraphSession) -> BoxFuture<'s, Result<T, GraphError>>,
    {
        let txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        let mut session = GraphSession { txn };

        match op(&mut session).await {
            Ok(value) => {
                session.txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = session.txn.rollback().await {
                    tracing::warn!(error = %rollback, "Session rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Execute a single write statement in its own session.
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.with_session(move |session| Box::pin(async move { session.run(query).await }))
            .await
    }

    /// Execute a single read statement in its own session and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        self.with_session(move |session| Box::pin(async move { session.rows(query).await }))
            .await
    }

    /// Execute a single read statement and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>, GraphError> {
        Ok(self.query_rows(query).await?.into_iter().next())
    }

    /// Check that a session can be opened and a trivial statement answered.
    pub async fn verify_connectivity(&self) -> Result<(), GraphError> {
        self.query_rows(neo4rs::query("RETURN 1 AS ok"))
            .await
            .map_err(|e| match e {
                GraphError::Connection(_) => e,
                other => GraphError::Connection(other.to_string()),
            })?;
        tracing::debug!("Neo4j connectivity verified");
        Ok(())
    }
}

/// An open, transaction-scoped session handed to [`GraphClient::with_session`].
pub struct GraphSession {
    txn: Txn,
}

impl GraphSession {
    /// Execute a write-only statement (CREATE, MERGE, DELETE, SET).
    pub async fn run(&mut self, query: Query) -> Result<(), GraphError> {
        self.txn.run(query).await?;
        Ok(())
    }

    /// Execute a read statement and collect all rows.
    pub async fn rows(&mut self, query: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.txn.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read statement and return the first row, if any.
    pub async fn one(&mut self, query: Query) -> Result<Option<Row>, GraphError> {
        Ok(self.rows(query).await?.into_iter().next())
    }
}
