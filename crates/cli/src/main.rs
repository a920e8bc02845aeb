//! `health-relay` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`   : run migrations, resume unfinished runs, start the webhook server.
//! - `migrate` : run pending database migrations.
//! - `check`   : print the sibling cross-check outcome for a service.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use engine::{
    AlertDispatcher, AlertWorkflow, HealthSnapshotChecker, RetryPolicy, RoutingTable, SqlRunStore,
    WorkflowConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use upstream::{cloudflare, pagerduty, HealthCheckSource};

#[derive(Parser)]
#[command(
    name = "health-relay",
    about = "Relays health-check notifications to the incident backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the webhook server.
    Serve(ServeArgs),
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
    /// Evaluate whether every other check of a service is healthy.
    Check {
        /// Service name, e.g. `scandal`.
        service: String,
        /// Check to leave out of the evaluation, e.g. `scandal-web`.
        #[arg(long, default_value = "")]
        exclude: String,
        #[command(flatten)]
        zone: ZoneArgs,
    },
}

const DEFAULT_DATABASE_URL: &str = "sqlite://health-relay.db?mode=rwc";

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "BIND", default_value = "0.0.0.0:8080")]
    bind: String,
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
    /// Shared secret expected in the `cf-webhook-auth` header.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: String,
    #[arg(long, default_value = pagerduty::DEFAULT_EVENTS_URL)]
    pagerduty_url: String,
    /// `service=key`; may be repeated. Adds to `KEY_<service>` variables.
    #[arg(long = "routing-key", value_name = "SERVICE=KEY")]
    routing_keys: Vec<String>,
    #[command(flatten)]
    zone: ZoneArgs,
}

#[derive(Args)]
struct ZoneArgs {
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    cf_api_token: Option<String>,
    #[arg(long, env = "CF_ZONE_ID")]
    cf_zone_id: Option<String>,
    #[arg(long, default_value = cloudflare::DEFAULT_API_URL)]
    cloudflare_url: String,
}

impl ZoneArgs {
    /// The zone listing, when both credentials are present.
    fn source(&self) -> anyhow::Result<Option<Arc<dyn HealthCheckSource>>> {
        match (&self.cf_api_token, &self.cf_zone_id) {
            (Some(token), Some(zone)) => {
                let source = cloudflare::CloudflareHealthChecks::new(&self.cloudflare_url, zone, token.as_str())
                    .context("building health-check client")?;
                Ok(Some(Arc::new(source)))
            }
            _ => Ok(None),
        }
    }

    fn checker(&self) -> anyhow::Result<HealthSnapshotChecker> {
        Ok(match self.source()? {
            Some(source) => HealthSnapshotChecker::new(source, RetryPolicy::cross_check()),
            None => HealthSnapshotChecker::disabled(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Migrate { database_url } => {
            info!("Running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
            Ok(())
        }
        Command::Check { service, exclude, zone } => {
            let Some(source) = zone.source()? else {
                bail!("--cf-api-token and --cf-zone-id are required for check");
            };

            let checks = source.list_checks().await.context("listing health checks")?;
            for check in checks.iter().filter(|c| engine::split_check_name(&c.name).service == service) {
                let marker = if check.name == exclude { " (excluded)" } else { "" };
                println!("{:<32} {}{marker}", check.name, check.status);
            }

            let outcome = engine::checker::evaluate(&checks, &service, &exclude);
            println!("{service}: {outcome:?}");
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut routing = RoutingTable::from_env_vars(std::env::vars());
    for assignment in &args.routing_keys {
        routing
            .insert_assignment(assignment)
            .map_err(anyhow::Error::msg)
            .context("invalid --routing-key")?;
    }
    if routing.is_empty() {
        warn!("no routing keys configured; every notification will be rejected");
    } else {
        info!(services = ?routing.services(), "routing table loaded");
    }

    let checker = args.zone.checker()?;
    if !checker.is_enabled() {
        warn!("zone credentials not set; healthy notifications will not resolve incidents");
    }

    let pool = db::pool::create_pool(&args.database_url, 10)
        .await
        .context("failed to connect to database")?;
    db::pool::run_migrations(&pool).await.context("migration failed")?;

    let sink = pagerduty::PagerDutyEvents::new(args.pagerduty_url.as_str()).context("building events client")?;
    let workflow = Arc::new(AlertWorkflow::new(
        checker,
        AlertDispatcher::new(Arc::new(sink)),
        Arc::new(SqlRunStore::new(pool)),
        WorkflowConfig::default(),
    ));

    let resumed = workflow.resume_unfinished().await.context("resuming unfinished runs")?;
    if resumed > 0 {
        info!("resumed {resumed} unfinished run(s)");
    }

    info!("Starting webhook server on {}", args.bind);
    api::serve(&args.bind, api::AppState::new(workflow, routing, args.webhook_secret))
        .await
        .context("server error")
}
