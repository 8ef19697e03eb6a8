use std::time::Duration;

use moka::future::Cache as MokaCache;
use shared::Property;

/// In-memory read cache for property records. Listings are read on every
/// search, booking and availability request but change rarely.
#[derive(Clone)]
pub struct Cache {
    pub properties: MokaCache<i64, Property>,
}

impl Cache {
    pub fn new(max_capacity: u64, ttl_seconds: u64) -> Self {
        Self {
            properties: MokaCache::builder()
                .max_capacity(max_capacity)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .time_to_idle(Duration::from_secs(60))
                .build(),
        }
    }

    pub async fn get_property(&self, property_id: i64) -> Option<Property> {
        self.properties.get(&property_id).await
    }

    pub async fn set_property(&self, property: Property) {
        self.properties.insert(property.id, property).await;
    }

    pub async fn invalidate_property(&self, property_id: i64) {
        self.properties.invalidate(&property_id).await;
    }

    pub async fn get_stats(&self) -> CacheStats {
        CacheStats {
            property_entries: self.properties.entry_count(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub property_entries: u64,
}
