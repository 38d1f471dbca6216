//! The `ucos` reverse index: enough per-unspent-output information (address,
//! value) to debit the correct balance on spend, or restore it on revert,
//! without re-fetching chain data.

use chainidx_core::{Address, Currency, ProjectionError};
use chainidx_datastore::{Datastore, KeySchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UcosRecord {
    pub address: Address,
    pub value: Currency,
}

pub(crate) async fn get<D: Datastore>(
    store: &D,
    keys: &KeySchema,
    id_hex: &str,
) -> Result<Option<UcosRecord>, ProjectionError> {
    let raw = store
        .hash_get(&keys.ucos(), id_hex)
        .await
        .map_err(ProjectionError::Transient)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| ProjectionError::Codec(e.into())))
        .transpose()
}

pub(crate) async fn set<D: Datastore>(
    store: &D,
    keys: &KeySchema,
    id_hex: &str,
    record: &UcosRecord,
) -> Result<(), ProjectionError> {
    let json = serde_json::to_string(record).map_err(|e| ProjectionError::Codec(e.into()))?;
    store
        .hash_set(&keys.ucos(), id_hex, json)
        .await
        .map_err(ProjectionError::Transient)
}

pub(crate) async fn del<D: Datastore>(
    store: &D,
    keys: &KeySchema,
    id_hex: &str,
) -> Result<(), ProjectionError> {
    store
        .hash_del(&keys.ucos(), id_hex)
        .await
        .map_err(ProjectionError::Transient)
}
