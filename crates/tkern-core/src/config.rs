//! Tensor store configuration.

use tracing::warn;

/// Environment variable holding the store's byte budget.
pub const MAX_BYTES_ENV: &str = "TKERN_MAX_BYTES";

/// Limits applied by a [`crate::TensorStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on live element bytes. `None` means unbounded.
    pub max_bytes: Option<usize>,
}

impl StoreConfig {
    pub fn unbounded() -> Self {
        Self { max_bytes: None }
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
        }
    }

    /// Build a config from `TKERN_MAX_BYTES`.
    ///
    /// Unset or unparsable values leave the store unbounded.
    pub fn from_env() -> Self {
        Self::from_var(std::env::var(MAX_BYTES_ENV).ok().as_deref())
    }

    fn from_var(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::unbounded();
        };
        match raw.trim().parse::<usize>() {
            Ok(max_bytes) => Self::with_max_bytes(max_bytes),
            Err(err) => {
                warn!(value = raw, %err, "ignoring invalid TKERN_MAX_BYTES");
                Self::unbounded()
            }
        }
    }
}
