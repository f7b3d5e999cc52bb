use crate::echo::echo_controllers;
use crate::error::BuildError;
use crate::middleware::TracingMiddleware;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, RouterOptions};
use crate::spec::load_spec;
use crate::validator::print_issues;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for specrouter
#[derive(Parser)]
#[command(name = "specrouter")]
#[command(about = "Swagger 2.0 driven request router", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a document and print its route table
    Check {
        /// Path to the Swagger document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Serve a document with echo controllers
    Serve {
        /// Path to the Swagger document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Address and port to bind the server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
}

/// Parse process arguments and run the selected command.
pub fn run_cli() -> anyhow::Result<()> {
    execute(Cli::parse())
}

pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check { spec } => {
            let service = build_echo_service(&spec, RouterOptions::default())?;
            print!("{}", format_route_table(&service));
            Ok(())
        }
        Commands::Serve { spec, addr } => {
            let config = RuntimeConfig::from_env();
            may::config().set_stack_size(config.stack_size);
            let options = RouterOptions::default()
                .with_pre(TracingMiddleware)
                .with_body_limit(config.body_limit);
            let service = build_echo_service(&spec, options)?;
            let handle = HttpServer(service)
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(
                addr = %addr,
                stack_size = config.stack_size,
                body_limit = config.body_limit,
                "Server listening"
            );
            handle
                .join()
                .map_err(|e| anyhow!("server stopped unexpectedly: {e:?}"))
        }
    }
}

fn build_echo_service(spec: &Path, options: RouterOptions) -> anyhow::Result<AppService> {
    let doc = load_spec(spec)?;
    let controllers = echo_controllers(&doc);
    AppService::build(&doc, &controllers, options).map_err(|err| {
        if let BuildError::InvalidSpec(issues) = &err {
            print_issues(issues);
        }
        anyhow::Error::new(err).context(format!("cannot build routes for {}", spec.display()))
    })
}

/// One line per route: `METHOD  /base/path  operationId`.
#[must_use]
pub fn format_route_table(service: &AppService) -> String {
    let mut out = String::new();
    let base = service.base_path().trim_end_matches('/');
    for route in service.routes() {
        out.push_str(&format!(
            "{:<7} {}{}  {}\n",
            route.method.as_str(),
            base,
            route.spec_path,
            route.handler_name.as_deref().unwrap_or("-"),
        ));
    }
    out
}
