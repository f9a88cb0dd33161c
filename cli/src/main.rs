//! ExpenseGrove rates CLI
//!
//! Lists exchange rates, converts amounts and runs the refresh loop against
//! the rates API.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expensegrove_common::{AppSettings, SettingsSource, SharedSettings};
use expensegrove_fx::{
    ConverterForm, ExchangeRateService, FxConfig, Notice, SortConfig, SortDirection, SortKey,
};

mod render;

/// ExpenseGrove exchange rates CLI
#[derive(Parser, Debug)]
#[command(name = "rates")]
#[command(about = "List exchange rates and convert between currencies")]
struct Args {
    /// Base URL of the rates API (overrides EXCHANGE_RATES_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for the rates API (overrides EXCHANGE_RATES_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Display currency
    #[arg(long)]
    currency: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every rate with an amount converted into each currency
    List {
        /// Amount to convert
        #[arg(long, default_value = "100", allow_hyphen_values = true)]
        amount: String,

        /// Source currency (defaults to the display currency)
        #[arg(long)]
        from: Option<String>,

        /// Filter by code or name
        #[arg(long, default_value = "")]
        search: String,

        /// Sort column: code, name, rate or converted
        #[arg(long, default_value = "code")]
        sort: SortKey,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Convert an amount between two currencies
    Convert {
        #[arg(allow_hyphen_values = true)]
        amount: String,
        from: String,
        to: String,
    },

    /// Keep rates fresh and print notices until Ctrl+C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = FxConfig::from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(token) = args.token {
        config.api_token = Some(token);
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let settings = args.currency.map(|currency| {
        Arc::new(SharedSettings::with_settings(AppSettings {
            currency,
            ..Default::default()
        })) as Arc<dyn SettingsSource>
    });

    let service = ExchangeRateService::from_config(config, settings)?;
    let notices = service.subscribe();
    service.start().await;

    let result = match args.command {
        Command::List {
            amount,
            from,
            search,
            sort,
            desc,
        } => {
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            list(&service, amount, from, &search, SortConfig::new(sort, direction)).await
        }
        Command::Convert { amount, from, to } => convert(&service, amount, from, to).await,
        Command::Watch => watch(&service, notices).await,
    };

    service.shutdown().await;
    result
}

async fn list(
    service: &ExchangeRateService,
    amount: String,
    from: Option<String>,
    search: &str,
    sort: SortConfig,
) -> anyhow::Result<()> {
    let from = from.unwrap_or_else(|| service.display_currency());
    let form = ConverterForm {
        amount,
        from: from.clone(),
        to: from,
    };
    let request = form.validate()?;

    let table = service.rates_table(request.from, request.amount).await;
    if table.rows().is_empty() {
        warn!("No exchange rates available");
    }

    render::print_table(service, &table, search, sort);
    render::print_preview(service, &table);
    Ok(())
}

async fn convert(
    service: &ExchangeRateService,
    amount: String,
    from: String,
    to: String,
) -> anyhow::Result<()> {
    let form = ConverterForm { amount, from, to };
    let outcome = service.converter().submit(&form).await?;

    println!("{}", outcome.summary);
    println!(
        "{}",
        service.format(outcome.conversion.result, Some(outcome.conversion.to.code()))
    );
    if outcome.is_approximate() {
        eprintln!("Using approximate conversion. Please try again later.");
    }
    Ok(())
}

async fn watch(
    service: &ExchangeRateService,
    mut notices: broadcast::Receiver<Notice>,
) -> anyhow::Result<()> {
    info!(
        rates = service.rates().len(),
        interval_secs = service.config().refresh_interval.as_secs(),
        "Watching exchange rates"
    );

    let mut seen_generation = service.store().generation();
    let mut poll = tokio::time::interval(std::time::Duration::from_secs(1));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Shutdown signal received");
                break;
            }
            notice = notices.recv() => match notice {
                Ok(notice) => println!("{}", serde_json::to_string(&notice)?),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Dropped notices"),
                Err(RecvError::Closed) => break,
            },
            _ = poll.tick() => {
                let generation = service.store().generation();
                if generation != seen_generation {
                    seen_generation = generation;
                    render::print_refresh(service);
                }
            }
        }
    }

    Ok(())
}
