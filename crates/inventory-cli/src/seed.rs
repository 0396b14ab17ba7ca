//! Seed files: a JSON array of `create` arguments applied in order.
//!
//! ```json
//! [
//!   {"kind": "t", "id": "acme"},
//!   {"kind": "e", "parent": "/t;acme", "id": "prod"},
//!   {"kind": "rt", "parent": "/t;acme", "id": "host", "type_version": "1"}
//! ]
//! ```

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use inventory_core::InventoryError;
use inventory_engine::{Backend, Inventory};

use crate::commands::{create, CreateArgs};

pub fn load(path: &Path) -> anyhow::Result<Vec<CreateArgs>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed seed file {}", path.display()))
}

/// Create every entry, skipping the ones that already exist.
///
/// Returns the number of entities actually created.
pub async fn apply<B: Backend>(
    inventory: &Inventory<B>,
    entries: &[CreateArgs],
) -> anyhow::Result<usize> {
    let mut created = 0;
    for entry in entries {
        match create(inventory, entry).await {
            Ok(entity) => {
                debug!(path = %entity.path(), "Seeded");
                created += 1;
            }
            Err(e) if matches!(
                e.downcast_ref::<InventoryError>(),
                Some(InventoryError::EntityAlreadyExists { .. })
            ) =>
            {
                debug!(id = %entry.id, "Seed entry already present");
            }
            Err(e) => return Err(e.context(format!("seeding {} '{}'", entry.kind, entry.id))),
        }
    }
    info!(created, total = entries.len(), "Seed applied");
    Ok(created)
}
