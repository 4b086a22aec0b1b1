//! Conformance test suite for `MemoryDatastore`.
//!
//! Each test function corresponds to a single conformance check, providing
//! fine-grained failure reporting. The `run_all` test exercises the full
//! suite against one shared datastore.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use inferadb_common_datastore::{MemoryDatastore, conformance};

// ============================================================================
// CRUD (6 tests)
// ============================================================================

#[tokio::test]
async fn crud_get_missing_is_not_found() {
    conformance::crud_get_missing_is_not_found(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn crud_has_missing_is_false() {
    conformance::crud_has_missing_is_false(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn crud_put_then_get_returns_value() {
    conformance::crud_put_then_get_returns_value(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn crud_put_overwrites_existing() {
    conformance::crud_put_overwrites_existing(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn crud_delete_is_idempotent() {
    conformance::crud_delete_is_idempotent(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn crud_normalized_keys_are_equal() {
    conformance::crud_normalized_keys_are_equal(&MemoryDatastore::new()).await;
}

// ============================================================================
// Query (5 tests)
// ============================================================================

#[tokio::test]
async fn query_prefix_selects_namespace() {
    conformance::query_prefix_selects_namespace(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn query_filters_are_anded() {
    conformance::query_filters_are_anded(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn query_order_is_applied() {
    conformance::query_order_is_applied(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn query_offset_and_limit_page() {
    conformance::query_offset_and_limit_page(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn query_keys_only_strips_values() {
    conformance::query_keys_only_strips_values(&MemoryDatastore::new()).await;
}

// ============================================================================
// Bulk (4 tests)
// ============================================================================

#[tokio::test]
async fn bulk_put_many_yields_in_order() {
    conformance::bulk_put_many_yields_in_order(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn bulk_get_many_fails_on_missing() {
    conformance::bulk_get_many_fails_on_missing(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn bulk_delete_many_removes_keys() {
    conformance::bulk_delete_many_removes_keys(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn bulk_abort_keeps_completed_items() {
    conformance::bulk_abort_keeps_completed_items(&MemoryDatastore::new()).await;
}

// ============================================================================
// Batch (3 tests)
// ============================================================================

#[tokio::test]
async fn batch_last_operation_wins() {
    conformance::batch_last_operation_wins(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn batch_recommit_fails_without_effect() {
    conformance::batch_recommit_fails_without_effect(&MemoryDatastore::new()).await;
}

#[tokio::test]
async fn batch_abort_before_commit() {
    conformance::batch_abort_before_commit(&MemoryDatastore::new()).await;
}

// ============================================================================
// Concurrent (2 tests)
// ============================================================================

#[tokio::test]
async fn concurrent_puts_to_different_keys() {
    conformance::concurrent_puts_to_different_keys(Arc::new(MemoryDatastore::new())).await;
}

#[tokio::test]
async fn concurrent_reads_return_consistent_value() {
    conformance::concurrent_reads_return_consistent_value(Arc::new(MemoryDatastore::new())).await;
}

// ============================================================================
// Full suite
// ============================================================================

#[tokio::test]
async fn run_all() {
    conformance::run_all(Arc::new(MemoryDatastore::new())).await;
}
