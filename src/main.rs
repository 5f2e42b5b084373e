use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use liquidation_wizard::config::Config;
use liquidation_wizard::confirmer::{ConfirmOutcome, DryRunExecutor, LiquidationExecutor};
use liquidation_wizard::error::Error;
use liquidation_wizard::events::EventBus;
use liquidation_wizard::helpers::{format_health_factor, format_ratio_percent, format_token_amount, format_usd};
use liquidation_wizard::logger::{init_logger, run_logger};
use liquidation_wizard::oracle::{PriceSource, StaticPriceTable};
use liquidation_wizard::risk::RiskScale;
use liquidation_wizard::sizing::{IncompleteReason, SizingStatus};
use liquidation_wizard::types::Position;
use liquidation_wizard::wizard::LiquidationWizard;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "liquidation-wizard")]
#[command(about = "Size and confirm a liquidation against an under-collateralized position")]
struct Args {
    /// Position JSON file
    #[arg(long)]
    position: PathBuf,

    /// Collateral asset to seize
    #[arg(long)]
    collateral: String,

    /// Repayment amount in USD
    #[arg(long)]
    repay: String,

    /// Skip the confirmation prompt
    #[arg(long, short, default_value = "false")]
    yes: bool,

    /// Make the dry-run executor reject
    #[arg(long, default_value = "false")]
    fail: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_logger(&config)?;
    config.validate().context("Invalid configuration")?;

    let args = Args::parse();

    let prices: Arc<dyn PriceSource> = match &config.price_table_json {
        Some(path) => Arc::new(StaticPriceTable::from_json_file(path)?),
        None => Arc::new(StaticPriceTable::with_defaults()),
    };

    let position = load_position(&args.position)?;
    let risk_scale = RiskScale::from_config(&config);
    println!(
        "Position {}: health {} ({}), LTV {}",
        position.wallet_address,
        format_health_factor(position.health_factor),
        risk_scale.band(position.health_factor).label(),
        format_ratio_percent(position.ltv())
    );
    println!("{}", risk_scale.marker_label(position.health_factor));

    let event_bus = EventBus::new(config.event_bus_buffer_size);
    let logger_handle = tokio::spawn(run_logger(event_bus.subscribe()));

    let mut wizard = LiquidationWizard::new(position, prices, &config, event_bus.clone());

    // Step One
    let sizing = wizard.sizing_mut()?;
    sizing.select_collateral(args.collateral.as_str());
    let status = sizing.set_repay_amount(args.repay.as_str());
    println!(
        "Max repayable: {} (close factor of debt, capped at collateral value)",
        format_usd(sizing.max_repayable())
    );

    match &status {
        SizingStatus::Ready(quote) => {
            println!("Collateral Price:      {}", format_usd(quote.price));
            println!("Liquidation Bonus:     {}", format_usd(quote.bonus));
            println!(
                "Collateral to Receive: {}",
                format_token_amount(quote.collateral_amount, &quote.collateral_token)
            );
            println!("New LTV:               {}", format_ratio_percent(quote.projected_ltv));
            if quote.exceeds_max {
                println!("⚠️  Repay amount is above the max repayable amount");
            }
        }
        SizingStatus::PriceUnavailable { symbol } => {
            return Err(anyhow::anyhow!("No price available for {}", symbol));
        }
        SizingStatus::Incomplete(IncompleteReason::UnknownCollateral(symbol)) => {
            return Err(anyhow::anyhow!("{} is not posted as collateral by this position", symbol));
        }
        SizingStatus::Incomplete(reason) => {
            return Err(anyhow::anyhow!("Sizing incomplete: {:?}", reason));
        }
    }

    if !config.dry_run {
        return Err(anyhow::anyhow!(
            "DRY_RUN=false needs a live executor; this binary only ships the dry-run executor"
        ));
    }

    let fail = args.fail;
    wizard.continue_to_confirm(|params| -> Arc<dyn LiquidationExecutor> {
        let executor = DryRunExecutor::new(params.clone());
        if fail {
            Arc::new(executor.failing("simulated execution failure"))
        } else {
            Arc::new(executor)
        }
    })?;

    // Step Two
    if let Some(confirmer) = wizard.confirmer() {
        println!();
        println!("{}", confirmer.summary());
        println!("This action cannot be undone");
    }

    let mut question = "Confirm liquidation?";
    let mut last_failure = None;
    loop {
        if !args.yes && !prompt_yes(question).await? {
            wizard.cancel()?;
            println!("Cancelled");
            break;
        }

        match wizard.confirm().await {
            Ok(ConfirmOutcome::Succeeded) => {
                println!("✅ Liquidation executed");
                break;
            }
            Ok(ConfirmOutcome::Ignored) => continue,
            Err(Error::Execution(reason)) => {
                println!("❌ Execution failed: {}", reason);
                if args.yes {
                    last_failure = Some(reason);
                    break;
                }
                question = "Retry?";
            }
            Err(e) => return Err(e.into()),
        }
    }

    drop(wizard);
    drop(event_bus);
    let metrics = logger_handle.await.context("Logger task failed")?;
    log::debug!("Final session metrics: {:?}", metrics);

    match last_failure {
        Some(reason) => Err(anyhow::anyhow!("Liquidation failed: {}", reason)),
        None => Ok(()),
    }
}

fn load_position(path: &Path) -> Result<Position> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read position file: {}", path.display()))?;
    let position: Position = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse position JSON: {}", path.display()))?;
    log::info!(
        "✅ Position loaded: {} ({} collateral assets, {} borrowed assets)",
        position.wallet_address,
        position.collateral_assets.len(),
        position.borrowed_assets.len()
    );
    Ok(position)
}

async fn prompt_yes(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{} [y/N] ", question).as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation")?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
