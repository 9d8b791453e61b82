use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use dairy_forecast::{
    config::{self, AppConfig},
    db,
    errors::ServiceError,
    ml::{ForecastRecord, ModelKind, ModelOrder},
    services::{ForecastReport, ForecastRequest, ForecastingService, RecordSaleRequest},
};
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ServiceError>() {
            Some(service_error) => {
                eprintln!("error: {}", service_error.user_message());
                debug!(error = ?service_error, "command failed");
                ExitCode::from(service_error.exit_code())
            }
            None => {
                eprintln!("error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Forecast(args) => handle_forecast(&context, args, cli.json).await,
        Commands::History(args) => handle_history(&context, args, cli.json).await,
        Commands::Products => handle_products(&context, cli.json).await,
        Commands::Record(args) => handle_record(&context, args, cli.json).await,
    }
}

#[derive(Parser)]
#[command(
    name = "dairy-forecast",
    about = "Forecast daily SKU demand from recorded dairy sales",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model to a SKU's sales and save the forecast
    Forecast(ForecastArgs),
    /// Show saved forecasts
    History(HistoryArgs),
    /// List SKUs with recorded sales
    Products,
    /// Record a sale
    Record(RecordArgs),
}

#[derive(Args)]
struct ForecastArgs {
    #[arg(long, help = "SKU to forecast")]
    sku: String,
    #[arg(long, help = "Days to forecast (defaults to the configured horizon)")]
    days: Option<u32>,
    #[arg(long, help = "Last day of training data, YYYY-MM-DD (defaults to today)")]
    as_of: Option<NaiveDate>,
    #[arg(long, help = "Model family: arima or additive")]
    model: Option<ModelKind>,
    #[arg(long, help = "ARIMA order as p,d,q")]
    order: Option<ModelOrder>,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(long, help = "Only show forecasts for this SKU")]
    sku: Option<String>,
    #[arg(long, default_value_t = 10, help = "Maximum records to show")]
    limit: u64,
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long, help = "SKU sold")]
    sku: String,
    #[arg(long, help = "Sale date, YYYY-MM-DD")]
    date: NaiveDate,
    #[arg(long, help = "Quantity sold")]
    quantity: f64,
}

struct CliContext {
    config: AppConfig,
    db: Arc<db::DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool).await?;
        }

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn forecasting_service(&self) -> ForecastingService {
        ForecastingService::from_connection(self.db.clone(), self.config.forecast.clone())
    }
}

async fn handle_forecast(context: &CliContext, args: ForecastArgs, json: bool) -> Result<()> {
    let mut settings = context.config.forecast.clone();
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(order) = args.order {
        settings.model_order = order;
    }
    settings
        .validate_all()
        .map_err(ServiceError::from)
        .context("invalid forecast options")?;

    let service = ForecastingService::from_connection(context.db.clone(), settings);
    let request = ForecastRequest {
        product_id: args.sku,
        horizon_days: args.days,
        as_of: args.as_of,
    };
    let report = service.run_forecast(request).await?;

    if json {
        print_json(&report)?;
    } else {
        render_report(&report);
    }
    Ok(())
}

async fn handle_history(context: &CliContext, args: HistoryArgs, json: bool) -> Result<()> {
    let service = context.forecasting_service();
    let records = match &args.sku {
        Some(sku) => service.latest_history(sku, args.limit).await?,
        None => service.recent_history(args.limit).await?,
    };

    if json {
        print_json(&records)?;
    } else if records.is_empty() {
        println!("No forecasts saved yet");
    } else {
        for record in &records {
            render_record_summary(record);
        }
    }
    Ok(())
}

async fn handle_products(context: &CliContext, json: bool) -> Result<()> {
    let products = context.forecasting_service().products().await?;
    if json {
        print_json(&products)?;
    } else if products.is_empty() {
        println!("No sales recorded yet");
    } else {
        for sku in &products {
            println!("- {}", sku);
        }
    }
    Ok(())
}

async fn handle_record(context: &CliContext, args: RecordArgs, json: bool) -> Result<()> {
    let request = RecordSaleRequest {
        product_id: args.sku,
        date: args.date,
        quantity: args.quantity,
    };
    context
        .forecasting_service()
        .record_sale(request.clone())
        .await?;

    if json {
        print_json(&request)?;
    } else {
        println!(
            "Recorded {} x {} on {}",
            request.quantity, request.product_id, request.date
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_record_summary(record: &ForecastRecord) {
    let fallback = if record.fallback_used { " (fallback)" } else { "" };
    println!(
        "- {} • {} • {}{} • {} days • total {:.1}",
        record.generated_at.format("%Y-%m-%d %H:%M"),
        record.product_id,
        record.model,
        fallback,
        record.horizon_days,
        record.total_predicted()
    );
}

fn render_report(report: &ForecastReport) {
    let record = &report.record;
    println!(
        "Forecast {} for {} using {}{}",
        record.id,
        record.product_id,
        record.model,
        if record.fallback_used {
            " (naive fallback)"
        } else {
            ""
        }
    );
    println!(
        "Trained on {} days ({} to {})",
        report.training_days, report.training_start, report.training_end
    );
    println!("{:<12} {:>10} {:>10} {:>10}", "date", "predicted", "lower", "upper");
    for point in &record.predictions {
        println!(
            "{:<12} {:>10.1} {:>10.1} {:>10.1}",
            point.date, point.predicted_quantity, point.lower_bound, point.upper_bound
        );
    }
    println!("Total predicted: {:.1}", record.total_predicted());

    for alert in &report.alerts {
        println!(
            "ALERT {} on {}: {:.1} above threshold {:.1}",
            alert.product_id, alert.date, alert.predicted_quantity, alert.threshold
        );
    }
}
