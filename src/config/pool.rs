//! Pool configuration structures.

use serde::{Deserialize, Serialize};

/// Default job queue capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Default prefix for pool thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "dynapool";

/// Which worker `remove_worker` stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Stop the most recently added worker.
    #[default]
    Lifo,
    /// Stop the oldest worker.
    Fifo,
}

impl std::str::FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifo" => Ok(Self::Lifo),
            "fifo" => Ok(Self::Fifo),
            other => Err(format!("unknown eviction policy `{other}` (expected lifo or fifo)")),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Capacity of the job queue; producers block once it is full.
    pub buffer_size: usize,
    /// Workers requested from the manager right after creation.
    #[serde(default)]
    pub initial_workers: usize,
    /// Which worker a removal request stops.
    #[serde(default)]
    pub eviction: EvictionPolicy,
    /// Prefix for the manager and worker thread names.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Stack size for worker threads; platform default when `None`.
    #[serde(default)]
    pub thread_stack_size: Option<usize>,
}

fn default_thread_name_prefix() -> String {
    DEFAULT_THREAD_NAME_PREFIX.to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl PoolConfig {
    /// Configuration with the given queue capacity and defaults elsewhere.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            initial_workers: 0,
            eviction: EvictionPolicy::default(),
            thread_name_prefix: default_thread_name_prefix(),
            thread_stack_size: None,
        }
    }

    /// Set the job queue capacity.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the number of workers started with the pool.
    #[must_use]
    pub const fn with_initial_workers(mut self, initial_workers: usize) -> Self {
        self.initial_workers = initial_workers;
        self
    }

    /// Set the eviction policy for worker removal.
    #[must_use]
    pub const fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = Some(size);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than 0".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message if the JSON is malformed or the values are invalid.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `DYNAPOOL_*` environment variables.
    ///
    /// Recognized variables: `DYNAPOOL_BUFFER_SIZE`, `DYNAPOOL_INITIAL_WORKERS`,
    /// `DYNAPOOL_EVICTION` (`lifo`/`fifo`), `DYNAPOOL_THREAD_NAME_PREFIX` and
    /// `DYNAPOOL_THREAD_STACK_SIZE`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or the
    /// validation failure.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(value) = lookup("DYNAPOOL_BUFFER_SIZE") {
            cfg.buffer_size = parse_var("DYNAPOOL_BUFFER_SIZE", &value)?;
        }
        if let Some(value) = lookup("DYNAPOOL_INITIAL_WORKERS") {
            cfg.initial_workers = parse_var("DYNAPOOL_INITIAL_WORKERS", &value)?;
        }
        if let Some(value) = lookup("DYNAPOOL_EVICTION") {
            cfg.eviction = parse_var("DYNAPOOL_EVICTION", &value)?;
        }
        if let Some(value) = lookup("DYNAPOOL_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = value;
        }
        if let Some(value) = lookup("DYNAPOOL_THREAD_STACK_SIZE") {
            cfg.thread_stack_size = Some(parse_var("DYNAPOOL_THREAD_STACK_SIZE", &value)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}: cannot parse `{value}`: {e}"))
}
