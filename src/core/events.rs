use super::types::LiquidationParams;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum WizardEvent {
    // Step One
    ParamsFinalized {
        wallet_address: String,
        params: LiquidationParams,
    },

    // Step Two
    ExecutionStarted {
        wallet_address: String,
        params: LiquidationParams,
    },
    ExecutionSucceeded {
        wallet_address: String,
        params: LiquidationParams,
    },
    ExecutionFailed {
        wallet_address: String,
        error: String,
    },

    Cancelled {
        wallet_address: String,
    },
}

/// Event bus shared by the wizard and the session logger.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WizardEvent>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        EventBus { sender }
    }

    /// Returns the number of receivers that saw the event. Zero subscribers is fine.
    pub fn publish(&self, event: WizardEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::trace!("EventBus: no subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.sender.subscribe()
    }
}
