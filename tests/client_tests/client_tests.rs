//! Tests for Client
//!
//! These tests verify:
//! - Cache id hashing
//! - Cache management (create, list, destroy, configuration)
//! - Key-value operations (get, put, get all, put all)
//! - Server errors surfacing without breaking the connection
//!
//! A single-connection fake cluster on loopback answers the operations.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use ignite_client::cache::{
    atomicity_mode, cache_id, cache_mode, CacheConfigurationRefs, CacheKeyConfiguration,
};
use ignite_client::protocol::{encode_frame, BinaryReader, BinaryWriter, Value};
use ignite_client::{Client, ClientConfig, IgniteError, LeakHook};

// =============================================================================
// Fake Cluster
// =============================================================================

const STATUS_FAILED: i32 = 1;

#[derive(Default)]
struct Cluster {
    /// Cache name → backups
    caches: BTreeMap<String, i32>,

    /// (cache id, encoded key) → encoded value
    entries: HashMap<(i32, Vec<u8>), Vec<u8>>,

    last_request_id: i64,
}

fn read_payload(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).ok()?;
    let mut payload = vec![0u8; i32::from_le_bytes(prefix) as usize];
    stream.read_exact(&mut payload).ok()?;
    Some(payload)
}

fn write_payload(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(&encode_frame(payload).unwrap()).unwrap();
}

/// Re-encode the next object so it can be used as a map key
fn next_object(r: &mut BinaryReader) -> Vec<u8> {
    let value = r.read_object().unwrap();
    let mut w = BinaryWriter::new();
    w.write_object(&value).unwrap();
    w.as_slice().to_vec()
}

impl Cluster {
    fn serve(mut self, mut stream: TcpStream) {
        read_payload(&mut stream).unwrap();
        write_payload(&mut stream, &[1]);

        while let Some(payload) = read_payload(&mut stream) {
            let mut r = BinaryReader::new(payload);
            let opcode = r.read_short().unwrap();
            let request_id = r.read_long().unwrap();

            let result = if request_id <= self.last_request_id {
                Err(format!("request id {} reused", request_id))
            } else {
                self.last_request_id = request_id;
                self.handle(opcode, &mut r)
            };

            let mut w = BinaryWriter::new();
            w.write_long(request_id);
            match result {
                Ok(body) => {
                    w.write_int(0);
                    w.write_raw(&body);
                }
                Err(message) => {
                    w.write_int(STATUS_FAILED);
                    w.write_ostring(&message).unwrap();
                }
            }
            write_payload(&mut stream, w.as_slice());
        }
    }

    fn cache_name(&self, id: i32) -> Result<String, String> {
        self.caches
            .keys()
            .find(|name| cache_id(name) == id)
            .cloned()
            .ok_or_else(|| format!("Cache does not exist [cacheId={}]", id))
    }

    fn create(&mut self, name: String, backups: i32, fail_if_exists: bool) -> Result<(), String> {
        if self.caches.contains_key(&name) {
            if fail_if_exists {
                return Err(format!("Cache already exists [name={}]", name));
            }
            return Ok(());
        }
        self.caches.insert(name, backups);
        Ok(())
    }

    fn handle(&mut self, opcode: i16, r: &mut BinaryReader) -> Result<Vec<u8>, String> {
        let mut out = BinaryWriter::new();
        match opcode {
            // get
            1000 => {
                let id = r.read_int().unwrap();
                self.cache_name(id)?;
                r.read_byte().unwrap();
                let key = next_object(r);
                match self.entries.get(&(id, key)) {
                    Some(value) => out.write_raw(value),
                    None => out.write_null(),
                }
            }
            // put
            1001 => {
                let id = r.read_int().unwrap();
                self.cache_name(id)?;
                r.read_byte().unwrap();
                let key = next_object(r);
                let value = next_object(r);
                self.entries.insert((id, key), value);
            }
            // get all
            1003 => {
                let id = r.read_int().unwrap();
                self.cache_name(id)?;
                r.read_byte().unwrap();
                let count = r.read_int().unwrap();
                let mut found = Vec::new();
                for _ in 0..count {
                    let key = next_object(r);
                    if let Some(value) = self.entries.get(&(id, key.clone())) {
                        found.push((key, value.clone()));
                    }
                }
                out.write_int(found.len() as i32);
                for (key, value) in found {
                    out.write_raw(&key);
                    out.write_raw(&value);
                }
            }
            // put all
            1004 => {
                let id = r.read_int().unwrap();
                self.cache_name(id)?;
                r.read_byte().unwrap();
                let count = r.read_int().unwrap();
                for _ in 0..count {
                    let key = next_object(r);
                    let value = next_object(r);
                    self.entries.insert((id, key), value);
                }
            }
            // names
            1050 => {
                out.write_int(self.caches.len() as i32);
                for name in self.caches.keys() {
                    out.write_ostring(name).unwrap();
                }
            }
            1051 => self.create(r.read_ostring().unwrap(), 0, true)?,
            1052 => self.create(r.read_ostring().unwrap(), 0, false)?,
            // create with configuration
            1053 | 1054 => {
                let len = r.read_int().unwrap() as usize;
                assert_eq!(len, r.remaining());
                let count = r.read_short().unwrap();
                let mut name = String::new();
                let mut backups = 0;
                for _ in 0..count {
                    match r.read_short().unwrap() {
                        0 => name = r.read_ostring().unwrap(),
                        1 | 2 => {
                            r.read_int().unwrap();
                        }
                        3 => backups = r.read_int().unwrap(),
                        401 => {
                            let keys = r.read_int().unwrap();
                            for _ in 0..keys * 2 {
                                r.read_ostring().unwrap();
                            }
                        }
                        code => return Err(format!("unsupported property {}", code)),
                    }
                }
                self.create(name, backups, opcode == 1053)?;
            }
            // configuration
            1055 => {
                let name = self.cache_name(r.read_int().unwrap())?;
                let backups = self.caches[&name];
                let body = configuration_body(&name, backups);
                out.write_int(body.len() as i32);
                out.write_raw(&body);
            }
            // destroy
            1056 => {
                let id = r.read_int().unwrap();
                let name = self.cache_name(id)?;
                self.caches.remove(&name);
                self.entries.retain(|(cache, _), _| *cache != id);
            }
            other => return Err(format!("unknown opcode {}", other)),
        }
        Ok(out.as_slice().to_vec())
    }
}

/// Configuration fields in server order, without the length prefix
fn configuration_body(name: &str, backups: i32) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_int(atomicity_mode::ATOMIC);
    w.write_int(backups);
    w.write_int(cache_mode::PARTITIONED);
    w.write_bool(true); // copy on read
    w.write_null(); // data region
    w.write_bool(false); // eager ttl
    w.write_bool(false); // statistics
    w.write_ostring("group").unwrap();
    w.write_long(0); // default lock timeout
    w.write_int(500); // max async ops
    w.write_int(1024); // max query iterators
    w.write_ostring(name).unwrap();
    w.write_bool(false); // on-heap
    w.write_int(4); // partition loss policy
    w.write_int(0); // query detail metrics size
    w.write_int(1); // query parallelism
    w.write_bool(true); // read from backup
    w.write_int(512 * 1024); // rebalance batch size
    w.write_long(2); // rebalance batches prefetch count
    w.write_long(0); // rebalance delay
    w.write_int(1); // rebalance mode
    w.write_int(0); // rebalance order
    w.write_long(0); // rebalance throttle
    w.write_long(10_000); // rebalance timeout
    w.write_bool(false); // sql escape all
    w.write_int(-1); // sql index inline max size
    w.write_null(); // sql schema
    w.write_int(2); // write synchronization mode
    w.write_int(1); // cache key configurations
    w.write_ostring("Person").unwrap();
    w.write_ostring("orgId").unwrap();
    w.write_int(0); // query entities
    w.as_slice().to_vec()
}

fn start() -> (Client, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        Cluster::default().serve(stream);
    });

    let config = ClientConfig::builder()
        .network("tcp4")
        .host("127.0.0.1")
        .port(port)
        .read_timeout_ms(5000)
        .leak_hook(LeakHook::silent())
        .build();
    (Client::connect(config).unwrap(), server)
}

fn finish(client: Client, server: JoinHandle<()>) {
    client.close().unwrap();
    assert!(!client.connected());
    server.join().unwrap();
}

// =============================================================================
// Cache Id Tests
// =============================================================================

#[test]
fn test_cache_id_is_java_hash_code() {
    assert_eq!(cache_id("myCache"), 1482644790);
    assert_eq!(cache_id("TestCache1"), -1049814975);
    assert_eq!(cache_id("кэш"), 1075029);
}

// =============================================================================
// Cache Management Tests
// =============================================================================

#[test]
fn test_create_list_destroy() {
    let (client, server) = start();

    client.cache_create_with_name("b").unwrap();
    client.cache_get_or_create_with_name("a").unwrap();
    client.cache_get_or_create_with_name("a").unwrap();
    assert_eq!(client.cache_get_names().unwrap(), vec!["a", "b"]);

    client.cache_destroy("a").unwrap();
    assert_eq!(client.cache_get_names().unwrap(), vec!["b"]);

    finish(client, server);
}

#[test]
fn test_create_existing_cache_fails() {
    let (client, server) = start();

    client.cache_create_with_name("dup").unwrap();
    let err = client.cache_create_with_name("dup").unwrap_err();
    match err {
        IgniteError::Server { status, message } => {
            assert_eq!(status, STATUS_FAILED);
            assert!(message.contains("already exists"), "{}", message);
        }
        other => panic!("Expected server error, got {:?}", other),
    }

    // The failed operation does not poison the connection
    assert!(client.connected());
    assert_eq!(client.cache_get_names().unwrap(), vec!["dup"]);

    finish(client, server);
}

#[test]
fn test_destroy_missing_cache_fails() {
    let (client, server) = start();

    let err = client.cache_destroy("missing").unwrap_err();
    assert!(matches!(err, IgniteError::Server { .. }));

    finish(client, server);
}

#[test]
fn test_create_with_configuration() {
    let (client, server) = start();

    let mut refs = CacheConfigurationRefs::new("configured");
    refs.backups = Some(2);
    refs.cache_mode = Some(cache_mode::PARTITIONED);
    refs.cache_key_configurations = Some(vec![CacheKeyConfiguration {
        type_name: "Person".to_string(),
        affinity_key_field_name: "orgId".to_string(),
    }]);
    client.cache_create_with_configuration(&refs).unwrap();
    client.cache_get_or_create_with_configuration(&refs).unwrap();

    let err = client.cache_create_with_configuration(&refs).unwrap_err();
    assert!(matches!(err, IgniteError::Server { .. }));

    let config = client.cache_get_configuration("configured", 0).unwrap();
    assert_eq!(config.name, "configured");
    assert_eq!(config.backups, 2);
    assert_eq!(config.atomicity_mode, atomicity_mode::ATOMIC);
    assert_eq!(config.cache_mode, cache_mode::PARTITIONED);
    assert!(config.copy_on_read);
    assert_eq!(config.data_region_name, "");
    assert_eq!(config.group_name, "group");
    assert_eq!(config.max_query_iterators, 1024);
    assert_eq!(config.rebalance_timeout, 10_000);
    assert_eq!(config.sql_index_inline_max_size, -1);
    assert_eq!(config.write_synchronization_mode, 2);
    assert_eq!(
        config.cache_key_configurations,
        vec![CacheKeyConfiguration {
            type_name: "Person".to_string(),
            affinity_key_field_name: "orgId".to_string(),
        }]
    );
    assert!(config.query_entities.is_empty());

    finish(client, server);
}

#[test]
fn test_configuration_without_name_is_not_sent() {
    let (client, server) = start();

    let err = client
        .cache_create_with_configuration(&CacheConfigurationRefs::default())
        .unwrap_err();
    assert!(matches!(err, IgniteError::Encode(_)));

    // Nothing reached the server; the connection is still usable
    client.cache_create_with_name("after").unwrap();
    assert_eq!(client.cache_get_names().unwrap(), vec!["after"]);

    finish(client, server);
}

// =============================================================================
// Key-Value Tests
// =============================================================================

#[test]
fn test_put_get() {
    let (client, server) = start();
    client.cache_create_with_name("kv").unwrap();

    client
        .cache_put("kv", false, &Value::Int(1), &Value::from("one"))
        .unwrap();
    client
        .cache_put("kv", false, &Value::from("key"), &Value::Long(42))
        .unwrap();

    assert_eq!(
        client.cache_get("kv", false, &Value::Int(1)).unwrap(),
        Value::from("one")
    );
    assert_eq!(
        client.cache_get("kv", false, &Value::from("key")).unwrap(),
        Value::Long(42)
    );
    // Same numeric value, different type: a different key
    assert_eq!(
        client.cache_get("kv", false, &Value::Long(1)).unwrap(),
        Value::Null
    );

    finish(client, server);
}

#[test]
fn test_put_overwrites() {
    let (client, server) = start();
    client.cache_create_with_name("kv").unwrap();

    client.cache_put("kv", false, &Value::Int(1), &Value::Int(10)).unwrap();
    client.cache_put("kv", false, &Value::Int(1), &Value::Int(20)).unwrap();
    assert_eq!(
        client.cache_get("kv", false, &Value::Int(1)).unwrap(),
        Value::Int(20)
    );

    finish(client, server);
}

#[test]
fn test_put_all_get_all() {
    let (client, server) = start();
    client.cache_create_with_name("bulk").unwrap();

    let pairs: Vec<(Value, Value)> = (1..=3)
        .map(|i| (Value::Int(i), Value::StringArray(vec![Some(i.to_string()), None])))
        .collect();
    client.cache_put_all("bulk", false, &pairs).unwrap();

    let keys = vec![Value::Int(1), Value::Int(3), Value::Int(4)];
    let found = client.cache_get_all("bulk", false, &keys).unwrap();
    assert_eq!(found, vec![pairs[0].clone(), pairs[2].clone()]);

    assert!(client.cache_get_all("bulk", false, &[]).unwrap().is_empty());

    finish(client, server);
}

#[test]
fn test_operation_on_missing_cache_fails() {
    let (client, server) = start();

    let err = client
        .cache_get("nope", false, &Value::Int(1))
        .unwrap_err();
    match err {
        IgniteError::Server { message, .. } => {
            assert!(message.contains(&cache_id("nope").to_string()), "{}", message)
        }
        other => panic!("Expected server error, got {:?}", other),
    }

    finish(client, server);
}

#[test]
fn test_destroy_removes_entries() {
    let (client, server) = start();

    client.cache_create_with_name("tmp").unwrap();
    client.cache_put("tmp", true, &Value::Int(1), &Value::Bool(true)).unwrap();
    client.cache_destroy("tmp").unwrap();
    client.cache_create_with_name("tmp").unwrap();

    assert_eq!(
        client.cache_get("tmp", true, &Value::Int(1)).unwrap(),
        Value::Null
    );

    finish(client, server);
}
