use std::fmt::Display;

/// Backing store key of the orders for a single type in a single region.
///
/// Renders as `<namespace>/<schema version>/<type ID>/<region ID>`, e.g. `ecorder/liveorders/2/34/10000002`. The schema
/// version must change whenever the encoding of [`CacheEntry`](crate::entry::CacheEntry) does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace:      String,
    schema_version: u32,
    type_id:        i64,
    region_id:      i64,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>, schema_version: u32, type_id: i64, region_id: i64) -> Self {
        Self {
            namespace: namespace.into(),
            schema_version,
            type_id,
            region_id,
        }
    }

    pub fn type_id(&self) -> i64 {
        self.type_id
    }

    pub fn region_id(&self) -> i64 {
        self.region_id
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace.trim_end_matches('/'),
            self.schema_version,
            self.type_id,
            self.region_id
        )
    }
}
