use crate::core::error::{Error, Result};
use crate::core::events::{EventBus, WizardEvent};
use crate::core::types::{LiquidationParams, Position};
use crate::engine::executing_guard::{ExecutionFlag, ExecutionState};
use crate::strategy::risk::{projected_health_factor, RiskBand, RiskScale};
use crate::utils::helpers::{format_health_factor, format_token_amount, format_usd, shorten_address};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The liquidation call supplied by the caller. Timeouts and retries, if
/// any, belong to the implementation; the confirmer calls it once per Confirm.
#[async_trait]
pub trait LiquidationExecutor: Send + Sync {
    async fn execute(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Succeeded,
    /// Confirm arrived while an execution was already in flight; nothing was sent.
    Ignored,
}

/// Step Two of the wizard.
pub struct ExecutionConfirmer {
    position: Arc<Position>,
    params: LiquidationParams,
    executor: Arc<dyn LiquidationExecutor>,
    flag: ExecutionFlag,
    health_factor_scaling: f64,
    risk_scale: RiskScale,
    event_bus: Option<EventBus>,
}

impl ExecutionConfirmer {
    pub fn new(
        position: Arc<Position>,
        params: LiquidationParams,
        executor: Arc<dyn LiquidationExecutor>,
        health_factor_scaling: f64,
    ) -> Self {
        ExecutionConfirmer {
            position,
            params,
            executor,
            flag: ExecutionFlag::new(),
            health_factor_scaling,
            risk_scale: RiskScale::default(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_risk_scale(mut self, risk_scale: RiskScale) -> Self {
        self.risk_scale = risk_scale;
        self
    }

    pub fn params(&self) -> &LiquidationParams {
        &self.params
    }

    pub fn state(&self) -> ExecutionState {
        self.flag.state()
    }

    pub fn is_executing(&self) -> bool {
        self.flag.state() == ExecutionState::Executing
    }

    pub fn can_confirm(&self) -> bool {
        self.flag.state().is_actionable()
    }

    pub fn can_cancel(&self) -> bool {
        self.flag.state().is_actionable()
    }

    pub fn projected_health_factor(&self) -> f64 {
        projected_health_factor(&self.position, &self.params, self.health_factor_scaling)
    }

    pub fn summary(&self) -> LiquidationSummary {
        LiquidationSummary {
            target_position: shorten_address(&self.position.wallet_address),
            debt_repayment: format!(
                "{} {}",
                format_usd(self.params.repay_amount_usd()),
                self.params.repay_token()
            ),
            collateral_to_receive: format_token_amount(
                self.params.collateral_amount(),
                self.params.collateral_token(),
            ),
            liquidation_bonus: format_usd(self.params.liquidation_bonus()),
            current_health: format_health_factor(self.position.health_factor),
            projected_health: format_health_factor(self.projected_health_factor()),
            current_risk: self.risk_scale.band(self.position.health_factor),
        }
    }

    /// Run the executor once.
    ///
    /// The state is `Executing` for exactly the duration of the call. On
    /// failure the state becomes `Failed` (Confirm and Cancel usable again)
    /// and the executor's error is returned as `Error::Execution`.
    pub async fn confirm(&self) -> Result<ConfirmOutcome> {
        let guard = match self.flag.try_acquire() {
            Ok(guard) => guard,
            Err(Error::Busy) => {
                log::debug!(
                    "Confirm ignored for {}: execution already in flight",
                    self.position.wallet_address
                );
                return Ok(ConfirmOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        log::info!(
            "🚀 Executing liquidation: position={} repay=${:.2} {} collateral={:.4} {}",
            self.position.wallet_address,
            self.params.repay_amount_usd(),
            self.params.repay_token(),
            self.params.collateral_amount(),
            self.params.collateral_token()
        );
        self.publish(WizardEvent::ExecutionStarted {
            wallet_address: self.position.wallet_address.clone(),
            params: self.params.clone(),
        });

        match self.executor.execute().await {
            Ok(()) => {
                guard.succeed();
                log::info!("✅ Liquidation executed for {}", self.position.wallet_address);
                self.publish(WizardEvent::ExecutionSucceeded {
                    wallet_address: self.position.wallet_address.clone(),
                    params: self.params.clone(),
                });
                Ok(ConfirmOutcome::Succeeded)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                guard.fail(reason.clone());
                log::error!(
                    "❌ Liquidation failed for {}: {}",
                    self.position.wallet_address,
                    reason
                );
                self.publish(WizardEvent::ExecutionFailed {
                    wallet_address: self.position.wallet_address.clone(),
                    error: reason.clone(),
                });
                Err(Error::Execution(reason))
            }
        }
    }

    /// Cancel is refused mid-flight and after success.
    pub fn cancel(&self) -> Result<()> {
        match self.flag.state() {
            ExecutionState::Executing => Err(Error::Busy),
            ExecutionState::Succeeded => Err(Error::AlreadyCompleted),
            ExecutionState::Idle | ExecutionState::Failed { .. } => {
                log::info!("Liquidation cancelled for {}", self.position.wallet_address);
                self.publish(WizardEvent::Cancelled {
                    wallet_address: self.position.wallet_address.clone(),
                });
                Ok(())
            }
        }
    }

    fn publish(&self, event: WizardEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Human-readable confirmation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationSummary {
    pub target_position: String,
    pub debt_repayment: String,
    pub collateral_to_receive: String,
    pub liquidation_bonus: String,
    pub current_health: String,
    pub projected_health: String,
    pub current_risk: RiskBand,
}

impl fmt::Display for LiquidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target Position:       {}", self.target_position)?;
        writeln!(f, "Debt Repayment:        {}", self.debt_repayment)?;
        writeln!(f, "Collateral to Receive: {}", self.collateral_to_receive)?;
        writeln!(f, "Liquidation Bonus:     {}", self.liquidation_bonus)?;
        writeln!(
            f,
            "Current Health:        {} ({})",
            self.current_health,
            self.current_risk.label()
        )?;
        write!(f, "After Liquidation:     {}", self.projected_health)
    }
}

/// Executor that only logs the liquidation it would send.
pub struct DryRunExecutor {
    params: LiquidationParams,
    latency: Duration,
    fail_with: Option<String>,
}

impl DryRunExecutor {
    pub fn new(params: LiquidationParams) -> Self {
        DryRunExecutor {
            params,
            latency: Duration::from_millis(250),
            fail_with: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every execution reject with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.fail_with = Some(reason.into());
        self
    }
}

#[async_trait]
impl LiquidationExecutor for DryRunExecutor {
    async fn execute(&self) -> anyhow::Result<()> {
        log::info!(
            "DRY RUN: would repay ${:.2} {} and seize {:.6} {}",
            self.params.repay_amount_usd(),
            self.params.repay_token(),
            self.params.collateral_amount(),
            self.params.collateral_token()
        );
        tokio::time::sleep(self.latency).await;
        match &self.fail_with {
            Some(reason) => Err(anyhow::anyhow!("{}", reason)),
            None => Ok(()),
        }
    }
}
