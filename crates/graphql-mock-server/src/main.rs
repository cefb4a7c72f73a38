use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use graphql_mock_server::{mock::MockedSchema, schema::load_schema, server::Server};
use runtime::Config;
use tracing::{error, info};

mod runtime;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the mock server
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = STYLES,
    about = "GraphQL Mock Server - serve mock data for every field of a GraphQL schema",
)]
struct Args {
    /// Path to the config file
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = match Args::parse().config {
        Some(config_path) => runtime::read_config(config_path)?,
        None => runtime::read_config_from_env()?,
    };

    let _guard = config.logging.setup()?;

    info!(
        "GraphQL Mock Server v{} // Licensed under MIT",
        std::env!("CARGO_PKG_VERSION")
    );

    run(config).await.inspect_err(|error| {
        error!("{error}");
    })
}

async fn run(config: Config) -> anyhow::Result<()> {
    let document = load_schema(&config.schema)?;
    let schema = MockedSchema::new(&document, config.mocks.options()?)?;

    Server::builder()
        .schema(Arc::new(schema))
        .address(config.address)
        .port(config.port)
        .path(config.path)
        .graphiql(config.graphiql)
        .cors(config.cors)
        .health_check(config.health_check)
        .build()
        .start()
        .await?;

    Ok(())
}
