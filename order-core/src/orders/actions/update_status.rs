//! UpdateStatus command handler
//!
//! Moves an order through the status machine. Cancellation additionally
//! returns the order's stock, records the reason and flips a paid order to
//! refunded, all in the caller's transaction.

use crate::orders::traits::{CommandContext, CommandHandler, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus, PaymentStatus};
use shared::util::now_millis;
use std::collections::BTreeMap;

/// UpdateStatus action
#[derive(Debug, Clone)]
pub struct UpdateStatusAction {
    pub order_id: String,
    pub new_status: OrderStatus,
    pub reason: Option<String>,
}

impl CommandHandler for UpdateStatusAction {
    fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Vec<OrderEvent>, OrderError> {
        let mut order = ctx.load_order(&self.order_id)?;
        let from = order.status;

        // Terminal states reject everything, including repeats of themselves
        if from.is_terminal() {
            return Err(OrderError::TerminalState(self.order_id.clone(), from));
        }
        if !from.can_transition_to(self.new_status) {
            return Err(OrderError::InvalidTransition {
                from,
                to: self.new_status,
            });
        }

        let mut events = Vec::new();

        if self.new_status == OrderStatus::Cancelled {
            // Return stock per product, lines for the same product merged.
            // A product delisted since placement simply gets its row back.
            let mut released: BTreeMap<String, u32> = BTreeMap::new();
            for line in &order.lines {
                *released.entry(line.product_id.clone()).or_default() += line.quantity;
            }
            for (product_id, quantity) in released {
                let current = match ctx.stock_level(&product_id) {
                    Ok(count) => count,
                    Err(OrderError::ProductNotFound(_)) => 0,
                    Err(err) => return Err(err),
                };
                ctx.put_stock(&product_id, current.saturating_add(quantity))?;
                events.push(OrderEvent::new(
                    order.id.clone(),
                    OrderEventType::StockReleased,
                    EventPayload::StockReleased {
                        product_id,
                        quantity,
                    },
                ));
            }

            order.cancel_reason = self.reason.clone();
            if order.payment_status == PaymentStatus::Paid {
                order.payment_status = PaymentStatus::Refunded;
            }
        }

        order.status = self.new_status;
        order.updated_at = now_millis();
        ctx.save_order(&order)?;

        events.push(OrderEvent::new(
            order.id.clone(),
            OrderEventType::OrderStatusChanged,
            EventPayload::OrderStatusChanged {
                from,
                to: self.new_status,
                reason: self.reason.clone(),
            },
        ));

        Ok(events)
    }
}
