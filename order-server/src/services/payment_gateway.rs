//! Payment gateway seam for card and QR payments
//!
//! The order core never moves money itself. It asks a [`PaymentGateway`] to
//! charge, and only a successful charge drives settlement of an order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::order::PaymentMethod;
use thiserror::Error;

/// One charge for one order
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub order_id: String,
    pub table_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

/// Proof of a successful charge
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReceipt {
    /// Gateway-side reference, needed for a refund
    pub reference: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError>;

    /// Undo a charge whose order could not be settled
    async fn refund(&self, receipt: &ChargeReceipt) -> Result<(), GatewayError>;
}

/// Card/QR payments taken on a standalone terminal
///
/// The cashier confirms the terminal approved the payment before settling,
/// so every charge succeeds here.
#[derive(Debug, Default, Clone)]
pub struct ManualTerminalGateway;

#[async_trait]
impl PaymentGateway for ManualTerminalGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        tracing::info!(
            order_id = %request.order_id,
            amount = %request.amount,
            method = %request.method,
            "Charge recorded from external terminal"
        );
        Ok(ChargeReceipt {
            reference: format!("manual-{}", uuid::Uuid::new_v4()),
            amount: request.amount,
        })
    }

    async fn refund(&self, receipt: &ChargeReceipt) -> Result<(), GatewayError> {
        tracing::warn!(
            reference = %receipt.reference,
            amount = %receipt.amount,
            "Refund must be issued on the external terminal"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_gateway_approves() {
        let gateway = ManualTerminalGateway;
        let receipt = gateway
            .charge(&ChargeRequest {
                order_id: "o-1".into(),
                table_id: "5".into(),
                amount: Decimal::from(18),
                method: PaymentMethod::Card,
            })
            .await
            .unwrap();
        assert_eq!(receipt.amount, Decimal::from(18));
        assert!(receipt.reference.starts_with("manual-"));
        gateway.refund(&receipt).await.unwrap();
    }
}
