use crate::core::config::Config;
use crate::core::events::WizardEvent;
use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::broadcast;

/// Install the global logger: stdout always, plus a daily file when
/// `LOG_DIR` is configured.
pub fn init_logger(config: &Config) -> Result<()> {
    let level = log::LevelFilter::from_str(&config.log_level)
        .with_context(|| format!("Invalid LOG_LEVEL value: {}", config.log_level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir))?;
        let log_file_path = Path::new(dir).join(format!(
            "liquidation-wizard-{}.log",
            chrono::Utc::now().format("%Y-%m-%d")
        ));
        dispatch = dispatch.chain(
            fern::log_file(&log_file_path)
                .with_context(|| format!("Failed to open log file {}", log_file_path.display()))?,
        );
    }

    dispatch.apply().context("Failed to initialize logger")?;
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionMetrics {
    pub params_finalized: u64,
    pub executions_started: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub cancelled: u64,
    pub total_bonus_usd: f64,
}

impl SessionMetrics {
    pub fn record(&mut self, event: &WizardEvent) {
        match event {
            WizardEvent::ParamsFinalized { .. } => self.params_finalized += 1,
            WizardEvent::ExecutionStarted { .. } => self.executions_started += 1,
            WizardEvent::ExecutionSucceeded { params, .. } => {
                self.executions_succeeded += 1;
                self.total_bonus_usd += params.liquidation_bonus();
            }
            WizardEvent::ExecutionFailed { .. } => self.executions_failed += 1,
            WizardEvent::Cancelled { .. } => self.cancelled += 1,
        }
    }

    fn log_summary(&self) {
        log::info!(
            "📊 Session: finalized={}, started={}, succeeded={}, failed={}, cancelled={}, bonus=${:.2}",
            self.params_finalized,
            self.executions_started,
            self.executions_succeeded,
            self.executions_failed,
            self.cancelled,
            self.total_bonus_usd
        );
    }
}

/// Consume wizard events until the bus closes and return the session totals.
pub async fn run_logger(mut receiver: broadcast::Receiver<WizardEvent>) -> SessionMetrics {
    let mut metrics = SessionMetrics::default();

    loop {
        match receiver.recv().await {
            Ok(event) => {
                metrics.record(&event);
                match &event {
                    WizardEvent::ParamsFinalized { wallet_address, params } => {
                        log::debug!(
                            "Params finalized: account={}, repay=${:.2} {}, seize={:.4} {}",
                            wallet_address,
                            params.repay_amount_usd(),
                            params.repay_token(),
                            params.collateral_amount(),
                            params.collateral_token()
                        );
                    }
                    WizardEvent::ExecutionStarted { wallet_address, .. } => {
                        log::debug!("Execution started: account={}", wallet_address);
                    }
                    WizardEvent::ExecutionSucceeded { wallet_address, params } => {
                        log::info!(
                            "✅ Liquidation succeeded: account={}, bonus=${:.2}",
                            wallet_address,
                            params.liquidation_bonus()
                        );
                        metrics.log_summary();
                    }
                    WizardEvent::ExecutionFailed { wallet_address, error } => {
                        log::warn!(
                            "❌ Liquidation failed: account={}, error={}",
                            wallet_address,
                            error
                        );
                        metrics.log_summary();
                    }
                    WizardEvent::Cancelled { wallet_address } => {
                        log::info!("Liquidation cancelled: account={}", wallet_address);
                        metrics.log_summary();
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("⚠️  Logger lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                log::debug!("Event bus closed, logger shutting down");
                break;
            }
        }
    }

    metrics.log_summary();
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventBus;
    use crate::core::types::LiquidationParams;

    #[tokio::test]
    async fn test_run_logger_counts_events() {
        let bus = EventBus::new(16);
        let handle = tokio::spawn(run_logger(bus.subscribe()));

        let params = LiquidationParams::new(400.0, "USDC".into(), "ETH".into(), 0.21, 20.0);
        let wallet = "0xabc".to_string();
        bus.publish(WizardEvent::ParamsFinalized {
            wallet_address: wallet.clone(),
            params: params.clone(),
        });
        bus.publish(WizardEvent::ExecutionStarted {
            wallet_address: wallet.clone(),
            params: params.clone(),
        });
        bus.publish(WizardEvent::ExecutionFailed {
            wallet_address: wallet.clone(),
            error: "reverted".to_string(),
        });
        bus.publish(WizardEvent::ExecutionSucceeded {
            wallet_address: wallet,
            params,
        });
        drop(bus);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.params_finalized, 1);
        assert_eq!(metrics.executions_started, 1);
        assert_eq!(metrics.executions_failed, 1);
        assert_eq!(metrics.executions_succeeded, 1);
        assert_eq!(metrics.cancelled, 0);
        assert!((metrics.total_bonus_usd - 20.0).abs() < 1e-9);
    }
}
