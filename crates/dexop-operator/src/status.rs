//! Trade status reporting on the operator topic.

use dexop_bus::{DynMessageBus, OPERATOR_TOPIC};
use dexop_core::{OperatorMessage, Order, Trade};
use tracing::debug;

use crate::error::OperatorResult;

/// Publishes [`OperatorMessage`]s for downstream consumers.
#[derive(Clone)]
pub struct StatusPublisher {
    bus: DynMessageBus,
    topic: String,
}

impl StatusPublisher {
    pub fn new(bus: DynMessageBus) -> Self {
        Self {
            bus,
            topic: OPERATOR_TOPIC.to_string(),
        }
    }

    pub async fn publish(&self, message: &OperatorMessage) -> OperatorResult<()> {
        let payload = message.to_json()?;
        self.bus.publish(&self.topic, payload).await?;
        debug!(
            message_type = %message.message_type,
            trade_hash = %message.trade.hash,
            "Published operator message"
        );
        Ok(())
    }

    pub async fn trade_sent(&self, order: &Order, trade: &Trade) -> OperatorResult<()> {
        self.publish(&OperatorMessage::sent(order.clone(), trade.clone()))
            .await
    }

    pub async fn trade_success(&self, order: &Order, trade: &Trade) -> OperatorResult<()> {
        self.publish(&OperatorMessage::success(order.clone(), trade.clone()))
            .await
    }

    pub async fn trade_error(&self, order: &Order, trade: &Trade, err_id: u8) -> OperatorResult<()> {
        self.publish(&OperatorMessage::error(order.clone(), trade.clone(), err_id))
            .await
    }
}

impl std::fmt::Debug for StatusPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPublisher")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
