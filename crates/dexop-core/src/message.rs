//! Status envelopes published on the operator topic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreResult;
use crate::order::Order;
use crate::trade::Trade;

/// Settlement events reported for a trade.
///
/// Every trade that reaches the chain produces `TradeSent` first, then
/// exactly one of `TradeSuccess` or `TradeError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorMessageType {
    #[serde(rename = "TRADE_SENT_MESSAGE")]
    TradeSent,
    #[serde(rename = "TRADE_SUCCESS_MESSAGE")]
    TradeSuccess,
    #[serde(rename = "TRADE_ERROR_MESSAGE")]
    TradeError,
}

impl OperatorMessageType {
    /// Whether this event ends the trade's lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::TradeSent)
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TradeSent => "sent",
            Self::TradeSuccess => "success",
            Self::TradeError => "error",
        }
    }
}

impl fmt::Display for OperatorMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TradeSent => write!(f, "TRADE_SENT_MESSAGE"),
            Self::TradeSuccess => write!(f, "TRADE_SUCCESS_MESSAGE"),
            Self::TradeError => write!(f, "TRADE_ERROR_MESSAGE"),
        }
    }
}

/// Status envelope.
///
/// `err_id` carries the exchange contract's `LogError` code on
/// `TradeError` and is `0` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMessage {
    #[serde(rename = "messageType")]
    pub message_type: OperatorMessageType,
    pub order: Order,
    pub trade: Trade,
    #[serde(rename = "errID", default)]
    pub err_id: u8,
}

impl OperatorMessage {
    pub fn sent(order: Order, trade: Trade) -> Self {
        Self {
            message_type: OperatorMessageType::TradeSent,
            order,
            trade,
            err_id: 0,
        }
    }

    pub fn success(order: Order, trade: Trade) -> Self {
        Self {
            message_type: OperatorMessageType::TradeSuccess,
            order,
            trade,
            err_id: 0,
        }
    }

    pub fn error(order: Order, trade: Trade, err_id: u8) -> Self {
        Self {
            message_type: OperatorMessageType::TradeError,
            order,
            trade,
            err_id,
        }
    }

    pub fn to_json(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(payload: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
