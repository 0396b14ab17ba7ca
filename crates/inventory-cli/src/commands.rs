//! Subcommands and their execution against any backend.

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};

use inventory_core::{
    BasicBlueprint, CanonicalPath, DataEntityBlueprint, DataEntityUpdate, DataRole, Direction,
    Entity, EntityKind, InventoryEntity, InventoryError, MetricBlueprint, MetricTypeBlueprint,
    Pager, Properties, RelativePath, ResourceBlueprint, ResourceTypeBlueprint, StructuredData,
};
use inventory_engine::{
    Backend, Data, Environments, Feeds, Inventory, Metrics, ReadWrite, ResourceTypes, Resources,
    Tenants,
};

/// Arguments of `create`, also the shape of one seed-file entry.
#[derive(Debug, Clone, Args, Deserialize)]
pub struct CreateArgs {
    /// Kind of the new entity: a path code (`e`) or a name (`Environment`).
    pub kind: String,

    /// Canonical path of the parent, or `-` for a tenant.
    #[serde(default = "no_parent")]
    pub parent: String,

    /// Id of the new entity, unique among its siblings.
    pub id: String,

    /// Canonical path of the resource type (resources only).
    #[arg(long)]
    #[serde(default)]
    pub resource_type: Option<String>,

    /// Canonical path of the metric type (metrics only).
    #[arg(long)]
    #[serde(default)]
    pub metric_type: Option<String>,

    /// Unit of a metric type.
    #[arg(long)]
    #[serde(default)]
    pub unit: Option<String>,

    /// Version of a resource type.
    #[arg(long)]
    #[serde(default)]
    pub type_version: Option<String>,

    /// Properties as a JSON object.
    #[arg(long, value_parser = parse_properties)]
    #[serde(default)]
    pub props: Option<Properties>,
}

fn no_parent() -> String {
    "-".to_string()
}

fn parse_properties(raw: &str) -> Result<Properties, String> {
    serde_json::from_str(raw).map_err(|e| format!("properties must be a JSON object: {e}"))
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create an entity under a parent.
    Create(CreateArgs),

    /// Show the entity at a canonical path.
    Get { path: String },

    /// List the children of a given kind (`-` lists tenants).
    List { path: String, kind: String },

    /// Delete an entity and everything it contains.
    Delete { path: String },

    /// Attach (or replace) structured data on a resource or resource type.
    SetData {
        owner: String,
        role: String,
        json: String,
    },

    /// Read structured data from a data entity.
    Data {
        path: String,

        /// Data path below the entity, e.g. `k;ports/i;0`.
        #[arg(long, default_value = ".")]
        relative: String,

        /// Stop at the first level of nesting.
        #[arg(long)]
        flat: bool,
    },

    /// List relationships of an entity.
    Relationships {
        path: String,

        #[arg(long, default_value = "outgoing")]
        direction: String,

        /// Only relationships with this label.
        #[arg(long)]
        named: Option<String>,
    },

    /// Make a resource own a metric.
    Associate { resource: String, metric: String },
}

fn canonical(raw: &str) -> anyhow::Result<CanonicalPath> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not a canonical path"))
}

/// Run one command and return its JSON output.
pub async fn execute<B: Backend>(inventory: &Inventory<B>, command: &Command) -> anyhow::Result<Value> {
    match command {
        Command::Create(args) => Ok(serde_json::to_value(create(inventory, args).await?)?),
        Command::Get { path } => {
            let entity = inventory.entity_at(&canonical(path)?).await?;
            Ok(serde_json::to_value(entity)?)
        }
        Command::List { path, kind } => {
            let kind: EntityKind = kind.parse()?;
            let entities = list(inventory, path, kind).await?;
            Ok(serde_json::to_value(entities)?)
        }
        Command::Delete { path } => {
            inventory.delete_at(&canonical(path)?).await?;
            Ok(json!({ "deleted": path }))
        }
        Command::SetData { owner, role, json } => {
            let value: Value = serde_json::from_str(json).context("data must be valid JSON")?;
            let entity = set_data(inventory, &canonical(owner)?, role.parse::<DataRole>()?, value.into()).await?;
            Ok(serde_json::to_value(entity)?)
        }
        Command::Data {
            path,
            relative,
            flat,
        } => {
            let data = inventory.inspect::<Data>(&canonical(path)?)?;
            let relative: RelativePath = relative.parse()?;
            let value = if *flat {
                data.flat_data(&relative).await?
            } else {
                data.data(&relative).await?
            };
            Ok(Value::from(value))
        }
        Command::Relationships {
            path,
            direction,
            named,
        } => {
            let direction: Direction = direction.parse()?;
            let mut relationships = inventory.relationships_of(&canonical(path)?, direction);
            if let Some(label) = named {
                relationships = relationships.named(label.clone());
            }
            let page = relationships
                .get_all(Vec::new())?
                .entities(&Pager::unlimited())
                .await?;
            Ok(serde_json::to_value(page.items)?)
        }
        Command::Associate { resource, metric } => {
            let relationship = inventory
                .inspect::<Resources>(&canonical(resource)?)?
                .metrics()
                .associate(&canonical(metric)?)
                .await?;
            Ok(serde_json::to_value(relationship)?)
        }
    }
}

/// Create the entity described by `args` and return it as stored.
pub async fn create<B: Backend>(inventory: &Inventory<B>, args: &CreateArgs) -> anyhow::Result<Entity> {
    let kind: EntityKind = args.kind.parse()?;
    let properties = args.props.clone().unwrap_or_default();
    let parent = match args.parent.as_str() {
        "-" | "" => None,
        raw => Some(canonical(raw)?),
    };
    let basic = BasicBlueprint {
        id: args.id.clone(),
        properties: properties.clone(),
    };

    let entity = match (kind, parent) {
        (EntityKind::Tenant, None) => inventory
            .tenants()
            .create(&basic)
            .await?
            .entity()
            .await?
            .into_entity(),
        (EntityKind::Tenant, Some(parent)) => bail!("tenants have no parent, got {parent}"),
        (EntityKind::DataEntity, _) => bail!("data entities are created with set-data"),
        (kind, None) => bail!("{kind} needs a parent path"),
        (EntityKind::Environment, Some(parent)) => inventory
            .inspect::<Tenants>(&parent)?
            .environments()
            .create(&basic)
            .await?
            .entity()
            .await?
            .into_entity(),
        (EntityKind::Feed, Some(parent)) => inventory
            .inspect::<Environments>(&parent)?
            .feeds()
            .create(&basic)
            .await?
            .entity()
            .await?
            .into_entity(),
        (EntityKind::ResourceType, Some(parent)) => {
            let blueprint = ResourceTypeBlueprint {
                id: args.id.clone(),
                version: args.type_version.clone(),
                properties,
            };
            inventory
                .inspect::<Tenants>(&parent)?
                .resource_types()
                .create(&blueprint)
                .await?
                .entity()
                .await?
                .into_entity()
        }
        (EntityKind::MetricType, Some(parent)) => {
            let Some(unit) = &args.unit else {
                bail!("metric types need --unit");
            };
            let mut blueprint = MetricTypeBlueprint::new(args.id.clone(), unit.clone());
            blueprint.properties = properties;
            inventory
                .inspect::<Tenants>(&parent)?
                .metric_types()
                .create(&blueprint)
                .await?
                .entity()
                .await?
                .into_entity()
        }
        (EntityKind::Resource, Some(parent)) => {
            let Some(type_path) = &args.resource_type else {
                bail!("resources need --resource-type");
            };
            let mut blueprint = ResourceBlueprint::new(args.id.clone(), canonical(type_path)?);
            blueprint.properties = properties;
            resources_under(inventory, &parent)?
                .create(&blueprint)
                .await?
                .entity()
                .await?
                .into_entity()
        }
        (EntityKind::Metric, Some(parent)) => {
            let Some(type_path) = &args.metric_type else {
                bail!("metrics need --metric-type");
            };
            let mut blueprint = MetricBlueprint::new(args.id.clone(), canonical(type_path)?);
            blueprint.properties = properties;
            metrics_under(inventory, &parent)?
                .create(&blueprint)
                .await?
                .entity()
                .await?
                .into_entity()
        }
    };
    Ok(entity)
}

fn resources_under<B: Backend>(
    inventory: &Inventory<B>,
    parent: &CanonicalPath,
) -> anyhow::Result<ReadWrite<B, Resources>> {
    match parent.kind() {
        EntityKind::Environment => Ok(inventory.inspect::<Environments>(parent)?.resources()),
        EntityKind::Feed => Ok(inventory.inspect::<Feeds>(parent)?.resources()),
        other => bail!("resources cannot live under a {other}"),
    }
}

fn metrics_under<B: Backend>(
    inventory: &Inventory<B>,
    parent: &CanonicalPath,
) -> anyhow::Result<ReadWrite<B, Metrics>> {
    match parent.kind() {
        EntityKind::Environment => Ok(inventory.inspect::<Environments>(parent)?.metrics()),
        EntityKind::Feed => Ok(inventory.inspect::<Feeds>(parent)?.metrics()),
        other => bail!("metrics cannot live under a {other}"),
    }
}

async fn list<B: Backend>(
    inventory: &Inventory<B>,
    path: &str,
    kind: EntityKind,
) -> anyhow::Result<Vec<Entity>> {
    if path == "-" {
        if kind != EntityKind::Tenant {
            bail!("only tenants live at the top level");
        }
        let tenants = inventory.tenants().get_all().all().await?;
        return Ok(tenants.into_iter().map(InventoryEntity::into_entity).collect());
    }

    let children = inventory.children_of(&canonical(path)?).await?;
    Ok(children.into_iter().filter(|e| e.kind() == kind).collect())
}

/// Create the data entity for `role`, or replace its value if it already exists.
async fn set_data<B: Backend>(
    inventory: &Inventory<B>,
    owner: &CanonicalPath,
    role: DataRole,
    value: StructuredData,
) -> anyhow::Result<Entity> {
    let data: ReadWrite<B, Data> = match owner.kind() {
        EntityKind::Resource => inventory.inspect::<Resources>(owner)?.data(),
        EntityKind::ResourceType => inventory.inspect::<ResourceTypes>(owner)?.data(),
        other => bail!("a {other} cannot carry data"),
    };

    match data.create(&DataEntityBlueprint::new(role, value.clone())).await {
        Ok(created) => Ok(created.entity().await?.into_entity()),
        Err(InventoryError::EntityAlreadyExists { .. }) => {
            data.update(role.name(), &DataEntityUpdate { value }).await?;
            Ok(data.get(role.name()).entity().await?.into_entity())
        }
        Err(e) => Err(e.into()),
    }
}
