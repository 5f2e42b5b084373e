use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::events::{EventBus, WizardEvent};
use crate::core::types::{LiquidationParams, Position};
use crate::engine::confirmer::{ConfirmOutcome, ExecutionConfirmer, LiquidationExecutor};
use crate::oracle::PriceSource;
use crate::strategy::risk::RiskScale;
use crate::strategy::sizing::{SizingCalculator, SizingSettings};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Sizing,
    Confirming,
    Completed,
    Cancelled,
}

/// Drives one liquidation from sizing through confirmation.
///
/// The finalized `LiquidationParams` live inside the confirmer and are
/// dropped when the wizard goes back to sizing or is cancelled.
pub struct LiquidationWizard {
    position: Arc<Position>,
    sizing: SizingCalculator,
    confirmer: Option<ExecutionConfirmer>,
    step: WizardStep,
    health_factor_scaling: f64,
    risk_scale: RiskScale,
    event_bus: EventBus,
}

impl LiquidationWizard {
    pub fn new(
        position: Position,
        prices: Arc<dyn PriceSource>,
        config: &Config,
        event_bus: EventBus,
    ) -> Self {
        let position = Arc::new(position);
        LiquidationWizard {
            sizing: SizingCalculator::new(Arc::clone(&position), prices, SizingSettings::from(config)),
            position,
            confirmer: None,
            step: WizardStep::Sizing,
            health_factor_scaling: config.health_factor_scaling,
            risk_scale: RiskScale::from_config(config),
            event_bus,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn sizing(&self) -> &SizingCalculator {
        &self.sizing
    }

    /// Inputs can only change while sizing.
    pub fn sizing_mut(&mut self) -> Result<&mut SizingCalculator> {
        self.expect_step(WizardStep::Sizing)?;
        Ok(&mut self.sizing)
    }

    pub fn confirmer(&self) -> Option<&ExecutionConfirmer> {
        self.confirmer.as_ref()
    }

    /// Step One "Continue". `make_executor` receives the finalized params and
    /// returns the call Step Two will run on Confirm.
    pub fn continue_to_confirm<F>(&mut self, make_executor: F) -> Result<&LiquidationParams>
    where
        F: FnOnce(&LiquidationParams) -> Arc<dyn LiquidationExecutor>,
    {
        self.expect_step(WizardStep::Sizing)?;
        let params = self.sizing.finalize()?;
        let executor = make_executor(&params);

        self.event_bus.publish(WizardEvent::ParamsFinalized {
            wallet_address: self.position.wallet_address.clone(),
            params: params.clone(),
        });

        let confirmer = ExecutionConfirmer::new(
            Arc::clone(&self.position),
            params,
            executor,
            self.health_factor_scaling,
        )
        .with_risk_scale(self.risk_scale)
        .with_event_bus(self.event_bus.clone());

        self.step = WizardStep::Confirming;
        Ok(self.confirmer.insert(confirmer).params())
    }

    /// Leave Step Two without executing, keeping the Step One inputs.
    pub fn back_to_sizing(&mut self) -> Result<()> {
        self.expect_step(WizardStep::Confirming)?;
        if let Some(confirmer) = &self.confirmer {
            if !confirmer.can_cancel() {
                return Err(Error::Busy);
            }
        }
        self.confirmer = None;
        self.step = WizardStep::Sizing;
        Ok(())
    }

    pub async fn confirm(&mut self) -> Result<ConfirmOutcome> {
        self.expect_step(WizardStep::Confirming)?;
        let confirmer = self
            .confirmer
            .as_ref()
            .ok_or_else(|| Error::InvalidStep("confirming without finalized params".to_string()))?;

        let outcome = confirmer.confirm().await?;
        if outcome == ConfirmOutcome::Succeeded {
            self.step = WizardStep::Completed;
        }
        Ok(outcome)
    }

    pub fn cancel(&mut self) -> Result<()> {
        match self.step {
            WizardStep::Sizing => {
                log::info!("Liquidation wizard cancelled for {}", self.position.wallet_address);
                self.event_bus.publish(WizardEvent::Cancelled {
                    wallet_address: self.position.wallet_address.clone(),
                });
            }
            WizardStep::Confirming => {
                if let Some(confirmer) = &self.confirmer {
                    confirmer.cancel()?;
                }
                self.confirmer = None;
            }
            WizardStep::Completed | WizardStep::Cancelled => {
                return Err(Error::InvalidStep(format!("cannot cancel from {:?}", self.step)));
            }
        }
        self.step = WizardStep::Cancelled;
        Ok(())
    }

    fn expect_step(&self, expected: WizardStep) -> Result<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(Error::InvalidStep(format!(
                "expected {:?}, wizard is at {:?}",
                expected, self.step
            )))
        }
    }
}
