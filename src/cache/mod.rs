//! Cache Module
//!
//! Cache identifiers and cache configuration structures used by the
//! cache-management operations on [`crate::Client`].

mod configuration;

pub use configuration::{
    atomicity_mode, cache_mode, index_type, partition_loss_policy, rebalance_mode,
    write_synchronization_mode, CacheConfiguration, CacheConfigurationRefs,
    CacheKeyConfiguration, FieldNameAlias, IndexField, QueryEntity, QueryField, QueryIndex,
};

/// Cache id sent on the wire: Java `String.hashCode` of the cache name
///
/// Computed over UTF-16 code units with wrapping 32-bit arithmetic.
pub fn cache_id(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}
