//! Cache configuration
//!
//! [`CacheConfiguration`] is what the server returns for a cache, decoded in
//! the server's fixed field order. [`CacheConfigurationRefs`] is what the
//! client sends when creating a cache: only the properties that are set, each
//! preceded by its property code.
//!
//! ## Create-with-configuration body
//! ```text
//! ┌──────────┬───────────┬───────────────────┬───────────────────┬─────┐
//! │ Len (4)  │ Count (2) │ Code (2) + value  │ Code (2) + value  │ ... │
//! └──────────┴───────────┴───────────────────┴───────────────────┴─────┘
//! ```
//! `Len` counts every byte after itself.

use crate::error::{IgniteError, Result};
use crate::protocol::{BinaryReader, BinaryWriter};

/// `CacheMode` values
pub mod cache_mode {
    pub const LOCAL: i32 = 0;
    pub const REPLICATED: i32 = 1;
    pub const PARTITIONED: i32 = 2;
}

/// `CacheAtomicityMode` values
pub mod atomicity_mode {
    pub const TRANSACTIONAL: i32 = 0;
    pub const ATOMIC: i32 = 1;
}

/// `CacheWriteSynchronizationMode` values
pub mod write_synchronization_mode {
    pub const FULL_SYNC: i32 = 0;
    pub const FULL_ASYNC: i32 = 1;
    pub const PRIMARY_SYNC: i32 = 2;
}

/// `CacheRebalanceMode` values
pub mod rebalance_mode {
    pub const SYNC: i32 = 0;
    pub const ASYNC: i32 = 1;
    pub const NONE: i32 = 2;
}

/// `PartitionLossPolicy` values
pub mod partition_loss_policy {
    pub const READ_ONLY_SAFE: i32 = 0;
    pub const READ_ONLY_ALL: i32 = 1;
    pub const READ_WRITE_SAFE: i32 = 2;
    pub const READ_WRITE_ALL: i32 = 3;
    pub const IGNORE: i32 = 4;
}

/// `QueryIndexType` values
pub mod index_type {
    pub const SORTED: u8 = 0;
    pub const FULLTEXT: u8 = 1;
    pub const GEOSPATIAL: u8 = 2;
}

/// Property codes for create-with-configuration
mod property {
    pub const NAME: i16 = 0;
    pub const CACHE_MODE: i16 = 1;
    pub const ATOMICITY_MODE: i16 = 2;
    pub const BACKUPS: i16 = 3;
    pub const WRITE_SYNCHRONIZATION_MODE: i16 = 4;
    pub const COPY_ON_READ: i16 = 5;
    pub const READ_FROM_BACKUP: i16 = 6;
    pub const DATA_REGION_NAME: i16 = 100;
    pub const IS_ONHEAP_CACHE_ENABLED: i16 = 101;
    pub const QUERY_ENTITIES: i16 = 200;
    pub const QUERY_PARALLELISM: i16 = 201;
    pub const QUERY_DETAIL_METRICS_SIZE: i16 = 202;
    pub const SQL_SCHEMA: i16 = 203;
    pub const SQL_INDEX_INLINE_MAX_SIZE: i16 = 204;
    pub const SQL_ESCAPE_ALL: i16 = 205;
    pub const MAX_QUERY_ITERATORS: i16 = 206;
    pub const REBALANCE_MODE: i16 = 300;
    pub const REBALANCE_DELAY: i16 = 301;
    pub const REBALANCE_TIMEOUT: i16 = 302;
    pub const REBALANCE_BATCH_SIZE: i16 = 303;
    pub const REBALANCE_BATCHES_PREFETCH_COUNT: i16 = 304;
    pub const REBALANCE_ORDER: i16 = 305;
    pub const REBALANCE_THROTTLE: i16 = 306;
    pub const GROUP_NAME: i16 = 400;
    pub const CACHE_KEY_CONFIGURATION: i16 = 401;
    pub const DEFAULT_LOCK_TIMEOUT: i16 = 402;
    pub const MAX_CONCURRENT_ASYNC_OPERATIONS: i16 = 403;
    pub const PARTITION_LOSS_POLICY: i16 = 404;
    pub const EAGER_TTL: i16 = 405;
    pub const STATISTICS_ENABLED: i16 = 406;
}

// =============================================================================
// Nested Structures
// =============================================================================

/// Affinity key mapping for one type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeyConfiguration {
    pub type_name: String,
    pub affinity_key_field_name: String,
}

/// A field exposed to SQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryField {
    pub name: String,
    pub type_name: String,
    pub is_key_field: bool,
    pub is_notnull_constraint_field: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameAlias {
    pub name: String,
    pub alias: String,
}

/// One column of an index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexField {
    pub name: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryIndex {
    pub index_name: String,
    /// See [`index_type`]
    pub index_type: u8,
    pub inline_size: i32,
    pub fields: Vec<IndexField>,
}

/// SQL table definition attached to a cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryEntity {
    pub key_type_name: String,
    pub value_type_name: String,
    pub table_name: String,
    pub key_field_name: String,
    pub value_field_name: String,
    pub query_fields: Vec<QueryField>,
    pub field_name_aliases: Vec<FieldNameAlias>,
    pub query_indexes: Vec<QueryIndex>,
}

/// Read an i32-counted list
fn read_list<T>(
    r: &mut BinaryReader,
    what: &str,
    mut read: impl FnMut(&mut BinaryReader) -> Result<T>,
) -> Result<Vec<T>> {
    let count = r.read_count(1, what)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read(r)?);
    }
    Ok(out)
}

/// Write an i32-counted list
fn write_list<T>(
    w: &mut BinaryWriter,
    items: &[T],
    mut write: impl FnMut(&mut BinaryWriter, &T) -> Result<()>,
) -> Result<()> {
    w.write_count(items.len())?;
    for item in items {
        write(w, item)?;
    }
    Ok(())
}

impl CacheKeyConfiguration {
    fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            type_name: r.read_ostring()?,
            affinity_key_field_name: r.read_ostring()?,
        })
    }

    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_ostring(&self.type_name)?;
        w.write_ostring(&self.affinity_key_field_name)
    }
}

impl QueryEntity {
    fn read(r: &mut BinaryReader) -> Result<Self> {
        let key_type_name = r.read_ostring()?;
        let value_type_name = r.read_ostring()?;
        let table_name = r.read_ostring()?;
        let key_field_name = r.read_ostring()?;
        let value_field_name = r.read_ostring()?;

        let query_fields = read_list(r, "query field count", |r| {
            Ok(QueryField {
                name: r.read_ostring()?,
                type_name: r.read_ostring()?,
                is_key_field: r.read_bool()?,
                is_notnull_constraint_field: r.read_bool()?,
            })
        })?;

        let field_name_aliases = read_list(r, "field alias count", |r| {
            Ok(FieldNameAlias {
                name: r.read_ostring()?,
                alias: r.read_ostring()?,
            })
        })?;

        let query_indexes = read_list(r, "query index count", |r| {
            let index_name = r.read_ostring()?;
            let index_type = r.read_byte()?;
            let inline_size = r.read_int()?;
            let fields = read_list(r, "index field count", |r| {
                Ok(IndexField {
                    name: r.read_ostring()?,
                    descending: r.read_bool()?,
                })
            })?;
            Ok(QueryIndex {
                index_name,
                index_type,
                inline_size,
                fields,
            })
        })?;

        Ok(Self {
            key_type_name,
            value_type_name,
            table_name,
            key_field_name,
            value_field_name,
            query_fields,
            field_name_aliases,
            query_indexes,
        })
    }

    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_ostring(&self.key_type_name)?;
        w.write_ostring(&self.value_type_name)?;
        w.write_ostring(&self.table_name)?;
        w.write_ostring(&self.key_field_name)?;
        w.write_ostring(&self.value_field_name)?;

        write_list(w, &self.query_fields, |w, f| {
            w.write_ostring(&f.name)?;
            w.write_ostring(&f.type_name)?;
            w.write_bool(f.is_key_field);
            w.write_bool(f.is_notnull_constraint_field);
            Ok(())
        })?;

        write_list(w, &self.field_name_aliases, |w, a| {
            w.write_ostring(&a.name)?;
            w.write_ostring(&a.alias)
        })?;

        write_list(w, &self.query_indexes, |w, index| {
            w.write_ostring(&index.index_name)?;
            w.write_byte(index.index_type);
            w.write_int(index.inline_size);
            write_list(w, &index.fields, |w, f| {
                w.write_ostring(&f.name)?;
                w.write_bool(f.descending);
                Ok(())
            })
        })
    }
}

// =============================================================================
// Server-side Configuration
// =============================================================================

/// Full configuration of an existing cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfiguration {
    pub atomicity_mode: i32,
    pub backups: i32,
    pub cache_mode: i32,
    pub copy_on_read: bool,
    pub data_region_name: String,
    pub eager_ttl: bool,
    pub statistics_enabled: bool,
    pub group_name: String,
    pub default_lock_timeout: i64,
    pub max_concurrent_async_operations: i32,
    pub max_query_iterators: i32,
    pub name: String,
    pub is_onheap_cache_enabled: bool,
    pub partition_loss_policy: i32,
    pub query_detail_metrics_size: i32,
    pub query_parallelism: i32,
    pub read_from_backup: bool,
    pub rebalance_batch_size: i32,
    pub rebalance_batches_prefetch_count: i64,
    pub rebalance_delay: i64,
    pub rebalance_mode: i32,
    pub rebalance_order: i32,
    pub rebalance_throttle: i64,
    pub rebalance_timeout: i64,
    pub sql_escape_all: bool,
    pub sql_index_inline_max_size: i32,
    pub sql_schema: String,
    pub write_synchronization_mode: i32,
    pub cache_key_configurations: Vec<CacheKeyConfiguration>,
    pub query_entities: Vec<QueryEntity>,
}

impl CacheConfiguration {
    /// Decode a length-prefixed configuration block
    pub fn read_from(r: &mut BinaryReader) -> Result<Self> {
        let len = r.read_int()?;
        if len < 0 || len as usize > r.remaining() {
            return Err(IgniteError::Decode(format!(
                "cache configuration length {} does not fit remaining {} bytes",
                len,
                r.remaining()
            )));
        }

        Ok(Self {
            atomicity_mode: r.read_int()?,
            backups: r.read_int()?,
            cache_mode: r.read_int()?,
            copy_on_read: r.read_bool()?,
            data_region_name: r.read_ostring()?,
            eager_ttl: r.read_bool()?,
            statistics_enabled: r.read_bool()?,
            group_name: r.read_ostring()?,
            default_lock_timeout: r.read_long()?,
            max_concurrent_async_operations: r.read_int()?,
            max_query_iterators: r.read_int()?,
            name: r.read_ostring()?,
            is_onheap_cache_enabled: r.read_bool()?,
            partition_loss_policy: r.read_int()?,
            query_detail_metrics_size: r.read_int()?,
            query_parallelism: r.read_int()?,
            read_from_backup: r.read_bool()?,
            rebalance_batch_size: r.read_int()?,
            rebalance_batches_prefetch_count: r.read_long()?,
            rebalance_delay: r.read_long()?,
            rebalance_mode: r.read_int()?,
            rebalance_order: r.read_int()?,
            rebalance_throttle: r.read_long()?,
            rebalance_timeout: r.read_long()?,
            sql_escape_all: r.read_bool()?,
            sql_index_inline_max_size: r.read_int()?,
            sql_schema: r.read_ostring()?,
            write_synchronization_mode: r.read_int()?,
            cache_key_configurations: read_list(
                r,
                "cache key configuration count",
                CacheKeyConfiguration::read,
            )?,
            query_entities: read_list(r, "query entity count", QueryEntity::read)?,
        })
    }
}

// =============================================================================
// Client-side Configuration
// =============================================================================

/// Properties to set when creating a cache; unset properties keep server defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfigurationRefs {
    pub name: Option<String>,
    pub cache_mode: Option<i32>,
    pub atomicity_mode: Option<i32>,
    pub backups: Option<i32>,
    pub write_synchronization_mode: Option<i32>,
    pub copy_on_read: Option<bool>,
    pub read_from_backup: Option<bool>,
    pub data_region_name: Option<String>,
    pub is_onheap_cache_enabled: Option<bool>,
    pub query_entities: Option<Vec<QueryEntity>>,
    pub query_parallelism: Option<i32>,
    pub query_detail_metrics_size: Option<i32>,
    pub sql_schema: Option<String>,
    pub sql_index_inline_max_size: Option<i32>,
    pub sql_escape_all: Option<bool>,
    pub max_query_iterators: Option<i32>,
    pub rebalance_mode: Option<i32>,
    pub rebalance_delay: Option<i64>,
    pub rebalance_timeout: Option<i64>,
    pub rebalance_batch_size: Option<i32>,
    pub rebalance_batches_prefetch_count: Option<i64>,
    pub rebalance_order: Option<i32>,
    pub rebalance_throttle: Option<i64>,
    pub group_name: Option<String>,
    pub cache_key_configurations: Option<Vec<CacheKeyConfiguration>>,
    pub default_lock_timeout: Option<i64>,
    pub max_concurrent_async_operations: Option<i32>,
    pub partition_loss_policy: Option<i32>,
    pub eager_ttl: Option<bool>,
    pub statistics_enabled: Option<bool>,
}

/// Accumulates `code + value` pairs for the properties that are set
struct PropertyWriter {
    out: BinaryWriter,
    count: i16,
}

impl PropertyWriter {
    fn put<T>(
        &mut self,
        code: i16,
        value: &Option<T>,
        write: impl FnOnce(&mut BinaryWriter, &T) -> Result<()>,
    ) -> Result<()> {
        if let Some(value) = value {
            self.out.write_short(code);
            write(&mut self.out, value)?;
            self.count += 1;
        }
        Ok(())
    }

    fn int(&mut self, code: i16, value: &Option<i32>) -> Result<()> {
        self.put(code, value, |w, v| {
            w.write_int(*v);
            Ok(())
        })
    }

    fn long(&mut self, code: i16, value: &Option<i64>) -> Result<()> {
        self.put(code, value, |w, v| {
            w.write_long(*v);
            Ok(())
        })
    }

    fn bool(&mut self, code: i16, value: &Option<bool>) -> Result<()> {
        self.put(code, value, |w, v| {
            w.write_bool(*v);
            Ok(())
        })
    }

    fn string(&mut self, code: i16, value: &Option<String>) -> Result<()> {
        self.put(code, value, |w, v| w.write_ostring(v))
    }
}

impl CacheConfigurationRefs {
    /// Configuration with only the cache name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Serialize as a create-with-configuration body
    pub fn write_to(&self, out: &mut BinaryWriter) -> Result<()> {
        if self.name.as_deref().map_or(true, str::is_empty) {
            return Err(IgniteError::Encode(
                "cache configuration requires a name".to_string(),
            ));
        }

        let mut props = PropertyWriter {
            out: BinaryWriter::new(),
            count: 0,
        };

        props.string(property::NAME, &self.name)?;
        props.int(property::CACHE_MODE, &self.cache_mode)?;
        props.int(property::ATOMICITY_MODE, &self.atomicity_mode)?;
        props.int(property::BACKUPS, &self.backups)?;
        props.int(property::WRITE_SYNCHRONIZATION_MODE, &self.write_synchronization_mode)?;
        props.bool(property::COPY_ON_READ, &self.copy_on_read)?;
        props.bool(property::READ_FROM_BACKUP, &self.read_from_backup)?;
        props.string(property::DATA_REGION_NAME, &self.data_region_name)?;
        props.bool(property::IS_ONHEAP_CACHE_ENABLED, &self.is_onheap_cache_enabled)?;
        props.put(property::QUERY_ENTITIES, &self.query_entities, |w, v| {
            write_list(w, v, |w, e| e.write(w))
        })?;
        props.int(property::QUERY_PARALLELISM, &self.query_parallelism)?;
        props.int(property::QUERY_DETAIL_METRICS_SIZE, &self.query_detail_metrics_size)?;
        props.string(property::SQL_SCHEMA, &self.sql_schema)?;
        props.int(property::SQL_INDEX_INLINE_MAX_SIZE, &self.sql_index_inline_max_size)?;
        props.bool(property::SQL_ESCAPE_ALL, &self.sql_escape_all)?;
        props.int(property::MAX_QUERY_ITERATORS, &self.max_query_iterators)?;
        props.int(property::REBALANCE_MODE, &self.rebalance_mode)?;
        props.long(property::REBALANCE_DELAY, &self.rebalance_delay)?;
        props.long(property::REBALANCE_TIMEOUT, &self.rebalance_timeout)?;
        props.int(property::REBALANCE_BATCH_SIZE, &self.rebalance_batch_size)?;
        props.long(
            property::REBALANCE_BATCHES_PREFETCH_COUNT,
            &self.rebalance_batches_prefetch_count,
        )?;
        props.int(property::REBALANCE_ORDER, &self.rebalance_order)?;
        props.long(property::REBALANCE_THROTTLE, &self.rebalance_throttle)?;
        props.string(property::GROUP_NAME, &self.group_name)?;
        props.put(
            property::CACHE_KEY_CONFIGURATION,
            &self.cache_key_configurations,
            |w, v| write_list(w, v, |w, k| k.write(w)),
        )?;
        props.long(property::DEFAULT_LOCK_TIMEOUT, &self.default_lock_timeout)?;
        props.int(
            property::MAX_CONCURRENT_ASYNC_OPERATIONS,
            &self.max_concurrent_async_operations,
        )?;
        props.int(property::PARTITION_LOSS_POLICY, &self.partition_loss_policy)?;
        props.bool(property::EAGER_TTL, &self.eager_ttl)?;
        props.bool(property::STATISTICS_ENABLED, &self.statistics_enabled)?;

        // Length covers the count and every property after it
        let len = i32::try_from(2 + props.out.len()).map_err(|_| {
            IgniteError::Encode("cache configuration too large".to_string())
        })?;
        out.write_int(len);
        out.write_short(props.count);
        out.write_raw(props.out.as_slice());
        Ok(())
    }
}
