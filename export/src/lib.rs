// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Preprint metadata export and DOI deposit service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::info;
use pubexport_core::clocks::SystemClock;
use pubexport_core::db::Db;
use pubexport_core::db::postgres::{PostgresDb, PostgresOptions};
use pubexport_core::rest::BaseUrls;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod agency;
use agency::{AgencyRegistry, CrossrefAgency, CrossrefOptions, DataciteAgency, DataciteOptions};
pub mod cli;
use cli::{Cli, Command};
pub mod db;
pub mod driver;
use driver::{DbNotifier, Driver, ExportOptions, PreprintObserver};
pub mod filter;
use filter::FilterRegistry;
pub mod messages;
pub mod model;
mod rest;
use rest::app;

/// Instantiates the driver and all of its dependencies from the configuration in the environment.
///
/// Returns the database alongside the driver so that the caller can close it once done.
async fn connect() -> Result<(Arc<dyn Db + Send + Sync>, Driver), Box<dyn Error>> {
    let db_opts = PostgresOptions::from_env("PGSQL_PROD")?;
    let db: Arc<dyn Db + Send + Sync> = Arc::from(PostgresDb::connect(db_opts)?);
    db::init_schema(&mut db.ex().await?).await?;

    let clock = Arc::from(SystemClock::default());

    let mut agencies = AgencyRegistry::default();
    agencies.register(Arc::from(CrossrefAgency::new(CrossrefOptions::from_env("CROSSREF")?)));
    agencies.register(Arc::from(DataciteAgency::new(DataciteOptions::from_env("DATACITE")?)));

    let driver = Driver::new(
        db.clone(),
        clock.clone(),
        FilterRegistry::with_defaults(),
        agencies,
        Arc::from(DbNotifier::new(db.clone(), clock)),
        Arc::from(PreprintObserver::default()),
        Arc::from(BaseUrls::from_env("PUBEXPORT")?),
        ExportOptions::from_env("PUBEXPORT")?,
    );
    Ok((db, driver))
}

/// Serves the REST API backed by `driver` on `bind_addr` until the server fails.
async fn serve(bind_addr: SocketAddr, driver: Driver) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app(driver)).await?;
    Ok(())
}

/// Runs the program as requested by the parsed command line `cli`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let (db, driver) = connect().await?;

    let result = match cli.command {
        Command::Serve { bind } => serve(bind, driver).await,
        command => {
            let cwd = std::env::current_dir()?;
            let mut stdout = std::io::stdout();
            Ok(cli::run_command(driver, &cli.plugin, command, &cwd, &mut stdout).await?)
        }
    };

    db.close().await;
    result
}
