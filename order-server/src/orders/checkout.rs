//! Checkout Merger
//!
//! A bill is the union of one table's unpaid `readyForCheckout` orders. It
//! is recomputed from storage on every read and has no identity of its own.
//!
//! # Settlement
//!
//! ```text
//! settle_bill(table, request)
//!     ├─ 1. Recompute the bill (refuse if it changed under the cashier)
//!     ├─ 2. Price it: discount, final total, cash change
//!     ├─ 3. For each constituent order
//!     │      ├─ card/QR: charge its share through the gateway
//!     │      └─ settle() (refund the charge if settle fails)
//!     └─ 4. Any failure → PartialSettlement with settled and failed ids
//! ```
//!
//! Settled orders stay paid after a partial failure. The failed ones are
//! still `readyForCheckout`, so the bill stays visible with exactly the
//! orders that remain unpaid.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::error::{AppError, ErrorCode};
use shared::order::{
    Bill, BillQuote, FailedSettlement, Order, PaymentMethod, SettleBillRequest, SettlementReceipt,
};
use std::sync::Arc;
use thiserror::Error;

use super::manager::{ManagerError, OrdersManager};
use crate::services::{ChargeReceipt, ChargeRequest, PaymentGateway};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No payable bill for table {0}")]
    BillNotFound(String),

    #[error("Bill for table {table_id} changed, refresh and retry")]
    BillChanged {
        table_id: String,
        expected: Vec<String>,
        current: Vec<String>,
    },

    #[error("Tendered {tendered} is less than the total {final_total}")]
    InsufficientTender {
        tendered: Decimal,
        final_total: Decimal,
    },

    #[error("Bill for table {table_id} only partly settled: {} failed", .failed.len())]
    PartialSettlement {
        table_id: String,
        settled: Vec<String>,
        failed: Vec<FailedSettlement>,
    },

    #[error("Payment failed for order {order_id}: {reason}")]
    Gateway { order_id: String, reason: String },

    #[error(transparent)]
    Manager(#[from] ManagerError),
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(msg) => AppError::validation(msg),
            CheckoutError::BillNotFound(table_id) => AppError::with_message(
                ErrorCode::BillNotFound,
                format!("No payable bill for table {}", table_id),
            )
            .with_detail("table_id", table_id),
            CheckoutError::BillChanged {
                table_id,
                expected,
                current,
            } => AppError::conflict(format!(
                "Bill for table {} changed, refresh and retry",
                table_id
            ))
            .with_detail("table_id", table_id)
            .with_detail("expected_order_ids", expected)
            .with_detail("current_order_ids", current),
            CheckoutError::InsufficientTender {
                tendered,
                final_total,
            } => AppError::new(ErrorCode::PaymentInsufficientAmount)
                .with_detail("tendered_amount", tendered.to_string())
                .with_detail("final_total", final_total.to_string()),
            CheckoutError::PartialSettlement {
                table_id,
                settled,
                failed,
            } => {
                let failed_ids: Vec<String> = failed.iter().map(|f| f.order_id.clone()).collect();
                AppError::with_message(
                    ErrorCode::PartialSettlementFailure,
                    format!(
                        "Bill for table {}: {} of {} orders failed to settle",
                        table_id,
                        failed.len(),
                        failed.len() + settled.len()
                    ),
                )
                .with_detail("table_id", table_id)
                .with_detail("failed_order_ids", failed_ids)
                .with_detail("settled_order_ids", settled)
                .with_detail(
                    "failures",
                    serde_json::to_value(&failed).unwrap_or_default(),
                )
            }
            CheckoutError::Gateway { order_id, reason } => {
                AppError::with_message(ErrorCode::PaymentFailed, reason)
                    .with_detail("failed_order_ids", vec![order_id])
            }
            CheckoutError::Manager(e) => e.into(),
        }
    }
}

/// Round half-up to cents
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `max(0, subtotal × (1 − percent / 100))`, rounded to cents
///
/// A negative percent is rejected; above 100 clamps to zero.
pub fn apply_discount(subtotal: Decimal, percent: Decimal) -> CheckoutResult<Decimal> {
    if percent < Decimal::ZERO {
        return Err(CheckoutError::Validation(
            "discountPercent must not be negative".into(),
        ));
    }
    let percent = percent.min(Decimal::ONE_HUNDRED);
    let factor = Decimal::ONE - percent / Decimal::ONE_HUNDRED;
    Ok(round_money((subtotal * factor).max(Decimal::ZERO)))
}

/// Split `final_total` over the orders in proportion to their subtotals
///
/// Shares are rounded to cents and the last order absorbs the remainder,
/// so the shares always add up to `final_total`.
pub fn split_shares(orders: &[Order], subtotal: Decimal, final_total: Decimal) -> Vec<Decimal> {
    let mut shares = Vec::with_capacity(orders.len());
    let mut allotted = Decimal::ZERO;
    for (index, order) in orders.iter().enumerate() {
        let share = if index + 1 == orders.len() {
            final_total - allotted
        } else if subtotal.is_zero() {
            Decimal::ZERO
        } else {
            round_money(order.subtotal() * final_total / subtotal)
        };
        allotted += share;
        shares.push(share);
    }
    shares
}

/// Merge one table's payment-ready orders (oldest first)
pub fn merge_bill(table_id: &str, orders: &[Order]) -> Option<Bill> {
    if orders.is_empty() {
        return None;
    }
    Some(Bill {
        table_id: table_id.to_string(),
        order_ids: orders.iter().map(|o| o.id.clone()).collect(),
        order_numbers: orders.iter().map(|o| o.order_number.clone()).collect(),
        items: orders.iter().flat_map(|o| o.items.iter().cloned()).collect(),
        subtotal: orders.iter().map(Order::subtotal).sum(),
    })
}

/// Group by table, keeping the first-seen table order
fn group_by_table(orders: Vec<Order>) -> Vec<(String, Vec<Order>)> {
    let mut groups: Vec<(String, Vec<Order>)> = Vec::new();
    for order in orders {
        match groups.iter_mut().find(|(t, _)| *t == order.table_id) {
            Some((_, group)) => group.push(order),
            None => groups.push((order.table_id.clone(), vec![order])),
        }
    }
    groups
}

/// Checkout Merger
#[derive(Clone)]
pub struct CheckoutMerger {
    manager: Arc<OrdersManager>,
    gateway: Arc<dyn PaymentGateway>,
}

impl std::fmt::Debug for CheckoutMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutMerger")
            .field("manager", &self.manager)
            .field("gateway", &"<PaymentGateway>")
            .finish()
    }
}

impl CheckoutMerger {
    pub fn new(manager: Arc<OrdersManager>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { manager, gateway }
    }

    /// Current bill for a table, if it has payment-ready orders
    pub fn get_bill(&self, table_id: &str) -> CheckoutResult<Option<Bill>> {
        let orders = self.manager.payment_ready_orders(Some(table_id))?;
        Ok(merge_bill(table_id, &orders))
    }

    /// Every table with a non-empty bill, by oldest order
    pub fn list_bills(&self) -> CheckoutResult<Vec<Bill>> {
        let orders = self.manager.payment_ready_orders(None)?;
        Ok(group_by_table(orders)
            .into_iter()
            .filter_map(|(table_id, group)| merge_bill(&table_id, &group))
            .collect())
    }

    /// Price the current bill without settling it
    pub fn quote(&self, table_id: &str, request: &SettleBillRequest) -> CheckoutResult<BillQuote> {
        let (bill, _) = self.current_bill(table_id, request)?;
        let final_total = apply_discount(bill.subtotal, request.discount_percent)?;
        let change = self.cash_change(request, final_total)?;
        Ok(BillQuote {
            table_id: bill.table_id,
            order_ids: bill.order_ids,
            subtotal: bill.subtotal,
            discount_percent: request.discount_percent,
            discount_amount: bill.subtotal - final_total,
            final_total,
            change,
        })
    }

    /// Settle every order of the table's bill
    ///
    /// Succeeds only when every constituent order ends up paid. Otherwise
    /// returns [`CheckoutError::PartialSettlement`] naming the orders that
    /// settled and the ones that did not.
    pub async fn settle_bill(
        &self,
        table_id: &str,
        request: &SettleBillRequest,
    ) -> CheckoutResult<SettlementReceipt> {
        // Validate before touching anything
        let (bill, orders) = self.current_bill(table_id, request)?;
        let final_total = apply_discount(bill.subtotal, request.discount_percent)?;
        let change = self.cash_change(request, final_total)?;

        let shares = split_shares(&orders, bill.subtotal, final_total);
        let method = request.payment_method;

        let mut settled = Vec::with_capacity(orders.len());
        let mut failed = Vec::new();
        let mut gateway_failures = 0usize;

        for (order, share) in orders.iter().zip(shares) {
            let charge = if method.needs_gateway() {
                let charge_request = ChargeRequest {
                    order_id: order.id.clone(),
                    table_id: order.table_id.clone(),
                    amount: share,
                    method,
                };
                match self.gateway.charge(&charge_request).await {
                    Ok(receipt) => Some(receipt),
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "Charge failed");
                        gateway_failures += 1;
                        failed.push(FailedSettlement {
                            order_id: order.id.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                None
            };

            match self.manager.settle(&order.id, method) {
                Ok(outcome) => {
                    if outcome.already_paid
                        && let Some(receipt) = &charge
                    {
                        // Someone else settled it meanwhile
                        self.refund(&order.id, receipt).await;
                    }
                    settled.push(order.id.clone());
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Settle failed");
                    if let Some(receipt) = &charge {
                        self.refund(&order.id, receipt).await;
                    }
                    failed.push(FailedSettlement {
                        order_id: order.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !failed.is_empty() {
            // A one-order bill has nothing partial about it
            if orders.len() == 1 && gateway_failures == 1 {
                let FailedSettlement { order_id, reason } = failed.remove(0);
                return Err(CheckoutError::Gateway { order_id, reason });
            }
            let failed_ids: Vec<&str> = failed.iter().map(|f| f.order_id.as_str()).collect();
            tracing::error!(
                target: "operator",
                table_id = %table_id,
                settled = ?settled,
                failed = ?failed_ids,
                "Bill only partly settled"
            );
            return Err(CheckoutError::PartialSettlement {
                table_id: table_id.to_string(),
                settled,
                failed,
            });
        }

        tracing::info!(
            table_id = %table_id,
            orders = settled.len(),
            method = %method,
            final_total = %final_total,
            "Bill settled"
        );
        Ok(SettlementReceipt {
            table_id: table_id.to_string(),
            settled_order_ids: settled,
            payment_method: method,
            subtotal: bill.subtotal,
            final_total,
            change,
        })
    }

    /// Current bill and its orders, checked against the orders the cashier saw
    fn current_bill(
        &self,
        table_id: &str,
        request: &SettleBillRequest,
    ) -> CheckoutResult<(Bill, Vec<Order>)> {
        if request.discount_percent < Decimal::ZERO {
            return Err(CheckoutError::Validation(
                "discountPercent must not be negative".into(),
            ));
        }
        let orders = self.manager.payment_ready_orders(Some(table_id))?;
        let bill = merge_bill(table_id, &orders)
            .ok_or_else(|| CheckoutError::BillNotFound(table_id.to_string()))?;

        if let Some(expected) = &request.expected_order_ids {
            let mut want = expected.clone();
            let mut have = bill.order_ids.clone();
            want.sort();
            have.sort();
            if want != have {
                return Err(CheckoutError::BillChanged {
                    table_id: table_id.to_string(),
                    expected: expected.clone(),
                    current: bill.order_ids,
                });
            }
        }
        Ok((bill, orders))
    }

    /// Change for cash; `None` for card/QR
    fn cash_change(
        &self,
        request: &SettleBillRequest,
        final_total: Decimal,
    ) -> CheckoutResult<Option<Decimal>> {
        if request.payment_method != PaymentMethod::Cash {
            return Ok(None);
        }
        let tendered = request.tendered_amount.ok_or_else(|| {
            CheckoutError::Validation("tenderedAmount is required for cash".into())
        })?;
        if tendered < final_total {
            return Err(CheckoutError::InsufficientTender {
                tendered,
                final_total,
            });
        }
        Ok(Some(round_money(tendered - final_total)))
    }

    async fn refund(&self, order_id: &str, receipt: &ChargeReceipt) {
        if let Err(e) = self.gateway.refund(receipt).await {
            tracing::error!(
                target: "operator",
                order_id = %order_id,
                reference = %receipt.reference,
                amount = %receipt.amount,
                error = %e,
                "Refund failed, reverse the charge manually"
            );
        }
    }
}
