//! Error type shared by the cache, its backing stores and the hydrators.

use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = OrderCacheError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum OrderCacheError {
    /// Type and region IDs must both be strictly positive. Reported before any I/O takes place.
    #[error("invalid type/region pair: type {type_id}, region {region_id}")]
    InvalidArgument { type_id: i64, region_id: i64 },

    /// Hydration was required but there is nothing to hydrate from.
    #[error("can't hydrate a missing cache entry: no hydration source")]
    NoHydrationSource,

    /// The type or the region is not known to the hydration source's catalog.
    #[error("type {type_id} or region {region_id} is not fetchable from this source")]
    UnfetchableItem { type_id: i64, region_id: i64 },

    /// The region is not known to the hydration source's catalog.
    #[error("region {region_id} is not fetchable from this source")]
    UnfetchableRegion { region_id: i64 },

    // Wrapping variants render the inner error themselves and have no `source()`.
    /// Transport or protocol failure of the backing store. A cache miss is not an error.
    #[error("backing store: {0}")]
    Store(BoxError),

    #[error("failed to decode cached entry: {0}")]
    Decode(postcard::Error),

    #[error("failed to encode cache entry: {0}")]
    Encode(postcard::Error),

    /// Upstream failure of a hydration source, passed through as is.
    #[error("hydration source: {0}")]
    Source(BoxError),

    #[error("hydration didn't complete within {0:?}")]
    Timeout(Duration),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[cfg(feature = "sqlite")]
    #[error("order store: {0}")]
    Database(sea_orm::DbErr),
}

impl From<fieldx::error::FieldXError> for OrderCacheError {
    fn from(err: fieldx::error::FieldXError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sea_orm::DbErr> for OrderCacheError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err)
    }
}

impl OrderCacheError {
    pub fn store<E: Into<BoxError>>(err: E) -> Self {
        Self::Store(err.into())
    }

    pub fn source<E: Into<BoxError>>(err: E) -> Self {
        Self::Source(err.into())
    }

    /// `true` for the errors caused by the caller's input rather than by a failing collaborator.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::UnfetchableItem { .. } | Self::UnfetchableRegion { .. }
        )
    }
}
