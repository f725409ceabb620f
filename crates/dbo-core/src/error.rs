use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse DSN: {0}")]
    DsnParse(String),

    #[error("Explain plan error: {0}")]
    ExplainPlan(String),

    #[error("Query '{query}' failed: {source}")]
    QueryFailed {
        query: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use dbo_core::Error;
    /// let err = Error::config_error("collect_interval_secs must be greater than zero");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating DSN parse errors
    ///
    /// # Example
    /// ```
    /// use dbo_core::Error;
    /// let err = Error::dsn_error("missing database name segment");
    /// ```
    pub fn dsn_error(msg: impl Into<String>) -> Self {
        Error::DsnParse(msg.into())
    }

    /// Helper for creating explain plan errors
    pub fn explain_plan_error(msg: impl Into<String>) -> Self {
        Error::ExplainPlan(msg.into())
    }

    /// Wraps a driver error together with the catalog query that produced it
    pub fn query_failed(
        query: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::QueryFailed {
            query: query.into(),
            source: source.into(),
        }
    }

    /// Helper for creating general errors with a message
    ///
    /// # Example
    /// ```
    /// use dbo_core::Error;
    /// let err = Error::message("Something went wrong");
    /// ```
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }
}
