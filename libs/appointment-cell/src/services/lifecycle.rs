// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_utils::actor::{Action, Actor};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, PaymentStatus};

/// Status and payment state machines plus the mutation legality table.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Setting the current status again is accepted as a no-op.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if current_status == new_status {
            return Ok(());
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::invalid_state(
                Action::Edit,
                format!("status cannot change from {} to {}", current_status, new_status),
            ));
        }

        debug!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Scheduled, AppointmentStatus::Cancelled],
            AppointmentStatus::Scheduled => vec![AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn validate_payment_transition(
        &self,
        current: PaymentStatus,
        new: PaymentStatus,
    ) -> Result<(), AppointmentError> {
        let allowed = current == new
            || matches!(
                (current, new),
                (PaymentStatus::Unpaid, PaymentStatus::Partial)
                    | (PaymentStatus::Unpaid, PaymentStatus::Paid)
                    | (PaymentStatus::Partial, PaymentStatus::Paid)
                    | (PaymentStatus::Paid, PaymentStatus::Refunded)
            );

        if !allowed {
            warn!("Invalid payment transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::invalid_state(
                Action::Edit,
                format!("payment status cannot change from {} to {}", current, new),
            ));
        }
        Ok(())
    }

    /// Whether `actor` may apply `action` to `appointment` in its current state.
    ///
    /// Privileged actors always pass. The state machines still apply to them.
    pub fn check_mutation(
        &self,
        appointment: &Appointment,
        action: Action,
        actor: &Actor,
    ) -> Result<(), AppointmentError> {
        if actor.privileged {
            debug!("Privileged {} bypasses {} rules for {}", actor.user_id, action, appointment.id);
            return Ok(());
        }

        let refusal = match action {
            Action::Edit | Action::Reschedule if appointment.payment_status == PaymentStatus::Paid => {
                Some("appointment is already paid")
            }
            Action::Cancel if !appointment.is_active() => Some("appointment is already cancelled"),
            Action::Delete => {
                let removable = appointment.status == AppointmentStatus::Cancelled
                    || (appointment.status == AppointmentStatus::Pending
                        && appointment.payment_status == PaymentStatus::Unpaid);
                (!removable).then_some("only cancelled or unpaid pending appointments can be deleted")
            }
            _ => None,
        };

        match refusal {
            Some(reason) => {
                warn!(
                    "Refused {} of appointment {} by {} ({})",
                    action,
                    appointment.id,
                    actor.role(),
                    reason
                );
                Err(AppointmentError::invalid_state(action, reason))
            }
            None => Ok(()),
        }
    }
}
