/******************************************************************************
 * TABLECRUD MAIN ENTRY POINT
 *
 * Loads the table configuration, connects the storage gateway and serves one
 * CRUD routing table per configured table, plus the `GET /` liveness probe.
 ******************************************************************************/

use actix_cors::Cors;
use actix_web::{ middleware::Logger, App, HttpServer };
use anyhow::{ Context, Result };
use clap::Parser;

use tablecrud::server::{ self, StoreKind, TablesConfig };
use tablecrud::utils::logging;

/// Generic CRUD HTTP service over relational tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8888)]
    port: u16,

    /// JSON file describing the tables to expose (defaults to the Users table)
    #[arg(long, env = "TABLES_CONFIG")]
    tables: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, default_value = "postgres")]
    store: StoreKind,
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let tables_config = match &cli.tables {
        Some(path) => TablesConfig::load_from_file(path)?,
        None => TablesConfig::users_default(),
    };

    let gateway = server::create_gateway(cli.store).await?;
    let tables = server::build_tables(&tables_config, gateway)?;

    logging::log_activity(
        "server",
        "Server is running",
        Some(&format!("http://{}:{}", cli.host, cli.port))
    );

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(|cfg| server::configure_app(cfg, &tables))
    })
        .bind((cli.host.as_str(), cli.port))
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?
        .run().await
        .context("HTTP server failed");

    if let Err(e) = &result {
        logging::log_error("server", "Server stopped", e);
    }

    result
}
