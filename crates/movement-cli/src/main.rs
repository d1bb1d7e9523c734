//! Operator console for movements
//!
//! Inspects and cancels movements on the hosted data service, lists catalog
//! entries, and can drive a complete wizard run against an in-memory store.

mod demo;

use anyhow::{bail, Context};
use clap::{Arg, ArgMatches, Command};
use movement_core::{
    CachedCatalog, MovementConfig, MovementRepository, MovementWizard, ResourceCatalog,
    RestCatalog, RestClient, RestMovementRepository, SessionContext,
};
use movement_types::*;
use serde_json::json;
use std::sync::Arc;

struct Services {
    repo: Arc<dyn MovementRepository>,
    catalog: Arc<dyn ResourceCatalog>,
    ctx: SessionContext,
}

fn connect(config_path: &str) -> anyhow::Result<Services> {
    let config = MovementConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    log::info!("Loaded configuration from {}", config_path);

    let client = Arc::new(RestClient::new(config.data_service.clone())?);
    let rest_catalog = Arc::new(RestCatalog::new(client.clone()));
    let catalog: Arc<dyn ResourceCatalog> = if config.catalog.cache_enabled {
        Arc::new(CachedCatalog::new(rest_catalog))
    } else {
        rest_catalog
    };

    Ok(Services {
        repo: Arc::new(RestMovementRepository::new(client)),
        catalog,
        ctx: config.session_context(),
    })
}

async fn show(services: Services, id: &str) -> anyhow::Result<()> {
    let id = MovementId::new(id);
    let wizard = MovementWizard::open(services.repo, services.catalog, services.ctx, Some(&id)).await?;

    let summary = json!({
        "id": id,
        "step": wizard.step().number(),
        "step_label": wizard.step().label(),
        "estado": wizard.state(),
        "read_only": wizard.is_read_only(),
        "movement": wizard.movement(),
        "employees": wizard.assignments().employees(),
        "equipment": wizard.assignments().equipment(),
        "tasks": wizard.ledger().entries_for_commit(),
        "ratings": wizard.ratings().ratings(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cancel(services: Services, id: &str) -> anyhow::Result<()> {
    let id = MovementId::new(id);
    let mut wizard = MovementWizard::open(services.repo, services.catalog, services.ctx, Some(&id)).await?;
    wizard.cancel().await?;
    println!("Movement {} cancelled", id);
    Ok(())
}

async fn catalog(services: Services, matches: &ArgMatches) -> anyhow::Result<()> {
    let catalog = services.catalog;
    let ctx = &services.ctx;
    let filter = matches.get_one::<String>("filter").map(String::as_str);

    let listing = match matches.get_one::<String>("entity").map(String::as_str) {
        Some("clients") => serde_json::to_value(catalog.clients(ctx).await?)?,
        Some("quotes") => {
            let client = filter.map(ClientId::new);
            serde_json::to_value(catalog.approved_quotes(ctx, client.as_ref()).await?)?
        }
        Some("business-units") => serde_json::to_value(catalog.business_units(ctx).await?)?,
        Some("types") => {
            let Some(unit) = filter else {
                bail!("types requires --filter <business unit id>");
            };
            serde_json::to_value(catalog.movement_types(ctx, &BusinessUnitId::new(unit)).await?)?
        }
        Some("subtypes") => {
            let Some(movement_type) = filter else {
                bail!("subtypes requires --filter <movement type id>");
            };
            serde_json::to_value(catalog.movement_subtypes(ctx, &MovementTypeId::new(movement_type)).await?)?
        }
        Some("employees") => serde_json::to_value(catalog.active_employees(ctx).await?)?,
        Some("equipment") => serde_json::to_value(catalog.active_equipment(ctx).await?)?,
        other => bail!("Unknown catalog entity: {:?}", other),
    };
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let matches = Command::new("movement-cli")
        .version("1.0.0")
        .about("Movement lifecycle operator console")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config/movements.json")
                .global(true)
        )
        .subcommand(
            Command::new("show")
                .about("Resume a movement and print where its wizard stands")
                .arg(Arg::new("id").required(true).value_name("MOVEMENT_ID"))
        )
        .subcommand(
            Command::new("cancel")
                .about("Cancel a movement that is not yet completed")
                .arg(Arg::new("id").required(true).value_name("MOVEMENT_ID"))
        )
        .subcommand(
            Command::new("catalog")
                .about("List catalog entries")
                .arg(
                    Arg::new("entity")
                        .required(true)
                        .value_parser([
                            "clients",
                            "quotes",
                            "business-units",
                            "types",
                            "subtypes",
                            "employees",
                            "equipment",
                        ])
                )
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .value_name("ID")
                        .help("Client id for quotes, business unit for types, type for subtypes")
                )
        )
        .subcommand(
            Command::new("demo")
                .about("Run a movement through every step against an in-memory store")
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/movements.json");

    match matches.subcommand() {
        Some(("show", sub)) => {
            let id = sub.get_one::<String>("id").context("movement id is required")?;
            show(connect(config_path)?, id).await
        }
        Some(("cancel", sub)) => {
            let id = sub.get_one::<String>("id").context("movement id is required")?;
            cancel(connect(config_path)?, id).await
        }
        Some(("catalog", sub)) => catalog(connect(config_path)?, sub).await,
        Some(("demo", _)) => demo::run().await,
        _ => bail!("No command given"),
    }
}
