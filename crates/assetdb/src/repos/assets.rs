//! Asset repository.

use crate::error::AssetDbResult;
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{Asset, AssetMetadata, NewAsset};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use uuid::Uuid;

/// A boxed stream of payload bytes for the data-only read projection.
pub type PayloadStream = Pin<Box<dyn Stream<Item = AssetDbResult<Bytes>> + Send>>;

/// Chunk size for streamed payload reads.
const PAYLOAD_CHUNK: usize = 256 * 1024;

/// Wrap a fully fetched payload as a chunked stream.
pub(crate) fn payload_stream(data: Vec<u8>) -> PayloadStream {
    let data = Bytes::from(data);
    let chunks: Vec<AssetDbResult<Bytes>> = (0..data.len())
        .step_by(PAYLOAD_CHUNK)
        .map(|start| {
            let end = (start + PAYLOAD_CHUNK).min(data.len());
            Ok(data.slice(start..end))
        })
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

/// Repository for deduplicated asset operations.
///
/// Implementations hold no in-process shared mutable state; every operation
/// acquires its own connection scope from the backing pool and all
/// cross-caller coordination is delegated to the database's key-uniqueness
/// guarantees.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Check whether an identifier exists.
    ///
    /// A hit refreshes the reference row's access time when it has gone
    /// stale (best-effort, never affects the result).
    async fn exists(&self, id: Uuid) -> AssetDbResult<bool>;

    /// Check a set of identifiers in a single query.
    ///
    /// The result contains an entry for every requested identifier,
    /// defaulting to `false`. Found identifiers are individually evaluated
    /// for the staleness refresh, like [`exists`](Self::exists).
    async fn exists_batch(&self, ids: &[Uuid]) -> AssetDbResult<HashMap<Uuid, bool>>;

    /// Fetch a full asset: reference metadata joined with its shared
    /// payload. Refreshes a stale access time as a side effect.
    async fn get(&self, id: Uuid) -> AssetDbResult<Option<Asset>>;

    /// Fetch reference metadata only. Not counted as an access.
    async fn get_metadata(&self, id: Uuid) -> AssetDbResult<Option<AssetMetadata>>;

    /// Fetch the payload only, streamed in chunks. Not counted as an
    /// access.
    async fn get_payload(&self, id: Uuid) -> AssetDbResult<Option<PayloadStream>>;

    /// Store an asset durably.
    ///
    /// Physical bytes are deduplicated: the content row for the payload's
    /// digest and type is created only if absent and never overwritten,
    /// while a new reference row is inserted for every call. Both writes
    /// happen in one transaction; any failure maps to
    /// [`AssetDbError::StoreFailed`](crate::AssetDbError::StoreFailed)
    /// carrying the identifier, and nothing is persisted for it.
    async fn store(&self, asset: NewAsset) -> AssetDbResult<()>;

    /// Delete a reference row, but only if its flags are non-zero (zero
    /// flags mark the asset protected). Deleting a protected or absent
    /// identifier is a silent no-op. The shared content row is never
    /// touched.
    async fn delete(&self, id: Uuid) -> AssetDbResult<()>;
}
