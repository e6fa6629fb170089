//! Order status rules.
//!
//! Staff work from a permissive table: any non-terminal order may be moved to
//! any other status in [`OrderStatus::ALL`], backwards included. Completed and
//! cancelled orders never change again. Customers may only cancel their own
//! order while it is still pending.

use shared::{BakeryError, BakeryResult, OrderStatus, Role};

pub const ACCEPT_NOTE: &str = "Order accepted by staff";
pub const DECLINE_NOTE: &str = "Order declined by staff";
pub const CUSTOMER_CANCEL_NOTE: &str = "Cancelled by customer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// `pending -> preparing`, staff only.
    Accept,
    /// `pending -> cancelled`, staff only.
    Decline,
    /// Free-form status change from the staff dropdown.
    Set(OrderStatus),
    /// `pending -> cancelled` on the customer's own order.
    CustomerCancel,
}

impl TransitionKind {
    pub fn target(&self) -> OrderStatus {
        match self {
            TransitionKind::Accept => OrderStatus::Preparing,
            TransitionKind::Decline | TransitionKind::CustomerCancel => OrderStatus::Cancelled,
            TransitionKind::Set(status) => *status,
        }
    }

    pub fn default_note(&self, role: Role) -> String {
        match self {
            TransitionKind::Accept => ACCEPT_NOTE.to_string(),
            TransitionKind::Decline => DECLINE_NOTE.to_string(),
            TransitionKind::CustomerCancel => CUSTOMER_CANCEL_NOTE.to_string(),
            TransitionKind::Set(_) => format!("Status changed by {}", role),
        }
    }
}

/// Returns the status the order moves to, or why it may not.
pub fn check_transition(
    current: OrderStatus,
    kind: TransitionKind,
    role: Role,
) -> BakeryResult<OrderStatus> {
    if current.is_terminal() {
        return Err(BakeryError::invalid_transition(format!(
            "order is already {}",
            current
        )));
    }

    let target = kind.target();
    match kind {
        TransitionKind::CustomerCancel => {
            if role != Role::Customer {
                return Err(BakeryError::invalid_transition(format!(
                    "{} accounts decline orders instead of cancelling them",
                    role
                )));
            }
            require_pending(current, "cancelled")?;
        }
        TransitionKind::Accept | TransitionKind::Decline => {
            require_staff(role)?;
            let done = if kind == TransitionKind::Accept { "accepted" } else { "declined" };
            require_pending(current, done)?;
        }
        TransitionKind::Set(_) => {
            require_staff(role)?;
            if target == current {
                return Err(BakeryError::invalid_transition(format!(
                    "order is already {}",
                    current
                )));
            }
        }
    }
    Ok(target)
}

fn require_pending(current: OrderStatus, done: &str) -> BakeryResult<()> {
    if current != OrderStatus::Pending {
        return Err(BakeryError::invalid_transition(format!(
            "only pending orders can be {}, this one is {}",
            done,
            current
        )));
    }
    Ok(())
}

fn require_staff(role: Role) -> BakeryResult<()> {
    if !role.is_staff() {
        return Err(BakeryError::invalid_transition(format!(
            "{} accounts may only cancel pending orders",
            role
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_immutable() {
        for current in [OrderStatus::Completed, OrderStatus::Cancelled] {
            for target in OrderStatus::ALL {
                let result = check_transition(current, TransitionKind::Set(target), Role::Admin);
                assert!(matches!(result, Err(BakeryError::InvalidTransition(_))));
            }
            assert!(check_transition(current, TransitionKind::CustomerCancel, Role::Customer).is_err());
        }
    }

    #[test]
    fn test_staff_may_move_backwards() {
        // The dropdown does not enforce forward-only moves.
        let target = check_transition(
            OrderStatus::Ready,
            TransitionKind::Set(OrderStatus::Preparing),
            Role::Staff,
        )
        .unwrap();
        assert_eq!(target, OrderStatus::Preparing);

        let target = check_transition(
            OrderStatus::Preparing,
            TransitionKind::Set(OrderStatus::Pending),
            Role::Admin,
        )
        .unwrap();
        assert_eq!(target, OrderStatus::Pending);
    }

    #[test]
    fn test_setting_the_same_status_is_rejected() {
        let result = check_transition(
            OrderStatus::Ready,
            TransitionKind::Set(OrderStatus::Ready),
            Role::Staff,
        );
        assert!(matches!(result, Err(BakeryError::InvalidTransition(_))));
    }

    #[test]
    fn test_accept_and_decline_need_pending_and_staff() {
        assert_eq!(
            check_transition(OrderStatus::Pending, TransitionKind::Accept, Role::Staff).unwrap(),
            OrderStatus::Preparing
        );
        assert_eq!(
            check_transition(OrderStatus::Pending, TransitionKind::Decline, Role::Staff).unwrap(),
            OrderStatus::Cancelled
        );
        assert!(check_transition(OrderStatus::Preparing, TransitionKind::Accept, Role::Staff).is_err());
        assert!(check_transition(OrderStatus::Ready, TransitionKind::Decline, Role::Admin).is_err());
        assert!(check_transition(OrderStatus::Pending, TransitionKind::Accept, Role::Customer).is_err());
    }

    #[test]
    fn test_customer_cancel_only_while_pending() {
        assert_eq!(
            check_transition(OrderStatus::Pending, TransitionKind::CustomerCancel, Role::Customer)
                .unwrap(),
            OrderStatus::Cancelled
        );
        for current in [OrderStatus::Preparing, OrderStatus::Ready] {
            let result = check_transition(current, TransitionKind::CustomerCancel, Role::Customer);
            assert!(matches!(result, Err(BakeryError::InvalidTransition(_))));
        }
    }

    #[test]
    fn test_staff_cannot_take_the_customer_cancel_path() {
        for role in [Role::Staff, Role::Admin] {
            let result = check_transition(OrderStatus::Pending, TransitionKind::CustomerCancel, role);
            assert!(matches!(result, Err(BakeryError::InvalidTransition(_))));
        }
    }

    #[test]
    fn test_customers_cannot_drive_the_dropdown() {
        let result = check_transition(
            OrderStatus::Pending,
            TransitionKind::Set(OrderStatus::Cancelled),
            Role::Customer,
        );
        assert!(matches!(result, Err(BakeryError::InvalidTransition(_))));
    }

    #[test]
    fn test_default_notes() {
        assert_eq!(TransitionKind::Accept.default_note(Role::Staff), ACCEPT_NOTE);
        assert_eq!(
            TransitionKind::Set(OrderStatus::Ready).default_note(Role::Admin),
            "Status changed by admin"
        );
    }
}
