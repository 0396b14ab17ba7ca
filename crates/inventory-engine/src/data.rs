//! Access to the structured data behind data entities.

use inventory_core::{
    DataView, EntityKind, InventoryError, Page, Pager, RelativePath, Result, StructuredData,
};

use crate::backend::Backend;
use crate::context::TraversalContext;
use crate::fetch::{effective_pager, entity_field, resolve_one, Multiple, Single};
use crate::kinds::Data;

fn require_data_path(path: &RelativePath) -> Result<()> {
    if !path.is_data_path() {
        return Err(InventoryError::InvalidPath(format!(
            "'{path}' is not a data path: only key and index segments are allowed"
        )));
    }
    Ok(())
}

impl<B: Backend> Single<B, Data> {
    /// The full tree at `path` inside this entity's data.
    pub async fn data(&self, path: &RelativePath) -> Result<StructuredData> {
        self.load(path, DataView::Deep).await
    }

    /// The value at `path` with nested containers left empty.
    pub async fn flat_data(&self, path: &RelativePath) -> Result<StructuredData> {
        self.load(path, DataView::Shallow).await
    }

    async fn load(&self, path: &RelativePath, view: DataView) -> Result<StructuredData> {
        require_data_path(path)?;
        let ctx = self.context();
        let element = resolve_one(ctx, EntityKind::DataEntity).await?;
        match ctx.backend().descend_to_data(&element, path).await? {
            Some(node) => ctx.backend().convert_data(&node, view).await,
            None => Err(not_found(ctx, path)),
        }
    }
}

impl<B: Backend> Multiple<B, Data> {
    /// The tree at `path` in each matching entity's data. Entities where the
    /// path does not resolve are left out.
    pub async fn data(&self, path: &RelativePath, pager: &Pager) -> Result<Page<StructuredData>> {
        self.load(path, pager, DataView::Deep).await
    }

    pub async fn flat_data(
        &self,
        path: &RelativePath,
        pager: &Pager,
    ) -> Result<Page<StructuredData>> {
        self.load(path, pager, DataView::Shallow).await
    }

    async fn load(
        &self,
        path: &RelativePath,
        pager: &Pager,
        view: DataView,
    ) -> Result<Page<StructuredData>> {
        require_data_path(path)?;
        let ctx = self.context();
        let backend = ctx.backend();
        let pager = effective_pager(ctx, pager);

        let mut owners = Vec::new();
        for element in backend.resolve(ctx.path()).await? {
            let entity = backend.convert(&element, EntityKind::DataEntity).await?;
            owners.push((entity, element));
        }
        pager.sort(&mut owners, |(entity, _), field| entity_field(entity, field));

        let mut values = Vec::new();
        for (_, element) in &owners {
            if let Some(node) = backend.descend_to_data(element, path).await? {
                values.push(backend.convert_data(&node, view).await?);
            }
        }
        Ok(pager.slice(values))
    }
}

fn not_found<B: Backend>(ctx: &TraversalContext<B>, path: &RelativePath) -> InventoryError {
    InventoryError::EntityNotFound {
        kind: EntityKind::DataEntity,
        filters: format!("{} @ {path}", ctx.path()),
    }
}
