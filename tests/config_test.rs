//! Tests for configuration validation and loading

use std::collections::HashMap;

use dynapool::config::{EvictionPolicy, PoolConfig, DEFAULT_BUFFER_SIZE, DEFAULT_THREAD_NAME_PREFIX};
use dynapool::core::{DynamicPool, PoolError, WorkerId};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_default_config() {
    let config = PoolConfig::default();
    assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    assert_eq!(config.initial_workers, 0);
    assert_eq!(config.eviction, EvictionPolicy::Lifo);
    assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_buffer_invalid() {
    assert!(PoolConfig::new(0).validate().is_err());
    assert!(PoolConfig::new(1).validate().is_ok());
}

#[test]
fn test_empty_prefix_and_zero_stack_invalid() {
    assert!(PoolConfig::new(4).with_thread_name_prefix("").validate().is_err());
    assert!(PoolConfig::new(4).with_thread_stack_size(0).validate().is_err());
    assert!(PoolConfig::new(4).with_thread_stack_size(256 * 1024).validate().is_ok());
}

#[test]
fn test_from_json_with_defaults() {
    let config = PoolConfig::from_json_str(r#"{ "buffer_size": 10 }"#).unwrap();
    assert_eq!(config, PoolConfig::new(10));
}

#[test]
fn test_from_json_full() {
    let json = r#"{
        "buffer_size": 64,
        "initial_workers": 4,
        "eviction": "fifo",
        "thread_name_prefix": "jobs",
        "thread_stack_size": 1048576
    }"#;
    let config = PoolConfig::from_json_str(json).unwrap();
    assert_eq!(config.buffer_size, 64);
    assert_eq!(config.initial_workers, 4);
    assert_eq!(config.eviction, EvictionPolicy::Fifo);
    assert_eq!(config.thread_name_prefix, "jobs");
    assert_eq!(config.thread_stack_size, Some(1_048_576));
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(PoolConfig::from_json_str(r#"{ "buffer_size": 0 }"#).is_err());
    assert!(PoolConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_from_lookup() {
    let config = PoolConfig::from_lookup(lookup(&[
        ("DYNAPOOL_BUFFER_SIZE", "16"),
        ("DYNAPOOL_INITIAL_WORKERS", " 2 "),
        ("DYNAPOOL_EVICTION", "FIFO"),
    ]))
    .unwrap();
    assert_eq!(config.buffer_size, 16);
    assert_eq!(config.initial_workers, 2);
    assert_eq!(config.eviction, EvictionPolicy::Fifo);
}

#[test]
fn test_from_lookup_reports_bad_variable() {
    let err = PoolConfig::from_lookup(lookup(&[("DYNAPOOL_BUFFER_SIZE", "lots")])).unwrap_err();
    assert!(err.contains("DYNAPOOL_BUFFER_SIZE"));

    let err = PoolConfig::from_lookup(lookup(&[("DYNAPOOL_EVICTION", "random")])).unwrap_err();
    assert!(err.contains("unknown eviction policy"));

    assert!(PoolConfig::from_lookup(lookup(&[("DYNAPOOL_BUFFER_SIZE", "0")])).is_err());
}

#[test]
fn test_invalid_config_rejected_by_pool() {
    let result = DynamicPool::<u32>::with_config(PoolConfig::new(0), |_: WorkerId, _: u32| {});
    match result {
        Err(PoolError::InvalidConfig(msg)) => assert!(msg.contains("buffer_size")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn test_config_round_trips_through_pool() {
    let config = PoolConfig::new(5).with_thread_name_prefix("ingest");
    let pool = DynamicPool::<u32>::with_config(config.clone(), |_: WorkerId, _: u32| {}).unwrap();
    assert_eq!(pool.config(), &config);
    pool.shutdown();
}
