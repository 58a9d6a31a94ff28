//! Client confirmation flow model.
//!
//! The browser drives Stripe's confirmation UI; this state machine is the
//! server-side model of that lifecycle. Its load-bearing rule: confirmation
//! never starts unless both the payment form and a client secret are
//! present, and an invoice-flow success is not complete until the
//! reconciliation call has landed.

/// Which payment flow the session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFlow {
    /// Invoice payment: success must be reconciled before completion
    Invoice,
    /// One-off project payment: only the webhook path records anything
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Gathering the payment form and the client secret
    Collecting,
    /// Confirmation submitted to the processor
    Confirming,
    /// Confirmed; waiting on the reconciliation call (invoice flow only)
    AwaitingReconciliation,
    Completed,
    /// Confirmation failed; the processor message is shown and retry is allowed
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    flow: PaymentFlow,
    form_mounted: bool,
    client_secret: Option<String>,
    state: CheckoutState,
}

impl CheckoutSession {
    pub fn new(flow: PaymentFlow) -> Self {
        Self {
            flow,
            form_mounted: false,
            client_secret: None,
            state: CheckoutState::Collecting,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn flow(&self) -> PaymentFlow {
        self.flow
    }

    pub fn mount_form(&mut self) {
        self.form_mounted = true;
    }

    pub fn set_client_secret(&mut self, client_secret: impl Into<String>) {
        self.client_secret = Some(client_secret.into());
    }

    /// Confirmation may only start from Collecting with both the form and a
    /// client secret available.
    pub fn can_confirm(&self) -> bool {
        matches!(self.state, CheckoutState::Collecting)
            && self.form_mounted
            && self.client_secret.is_some()
    }

    /// Submit confirmation. Returns false (and stays put) when the guard is
    /// not satisfied.
    pub fn begin_confirmation(&mut self) -> bool {
        if !self.can_confirm() {
            return false;
        }
        self.state = CheckoutState::Confirming;
        true
    }

    /// Processor reported a confirmation failure.
    pub fn confirmation_failed(&mut self, message: impl Into<String>) {
        if matches!(self.state, CheckoutState::Confirming) {
            self.state = CheckoutState::Failed {
                message: message.into(),
            };
        }
    }

    /// Return a failed session to Collecting. Form and secret are kept, so a
    /// retry can confirm immediately.
    pub fn retry(&mut self) {
        if matches!(self.state, CheckoutState::Failed { .. }) {
            self.state = CheckoutState::Collecting;
        }
    }

    /// Processor reported confirmation success.
    pub fn confirmation_succeeded(&mut self) {
        if !matches!(self.state, CheckoutState::Confirming) {
            return;
        }
        self.state = match self.flow {
            PaymentFlow::Invoice => CheckoutState::AwaitingReconciliation,
            PaymentFlow::Project => CheckoutState::Completed,
        };
    }

    /// The reconciliation call for an invoice-flow success has landed.
    pub fn reconciliation_completed(&mut self) {
        if matches!(self.state, CheckoutState::AwaitingReconciliation) {
            self.state = CheckoutState::Completed;
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, CheckoutState::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_is_a_noop_without_form_and_secret() {
        let mut session = CheckoutSession::new(PaymentFlow::Invoice);
        assert!(!session.begin_confirmation());
        assert_eq!(session.state(), &CheckoutState::Collecting);

        session.mount_form();
        assert!(!session.begin_confirmation());
        assert_eq!(session.state(), &CheckoutState::Collecting);

        session.set_client_secret("pi_1_secret_abc");
        assert!(session.begin_confirmation());
        assert_eq!(session.state(), &CheckoutState::Confirming);
    }

    #[test]
    fn secret_alone_is_not_enough() {
        let mut session = CheckoutSession::new(PaymentFlow::Project);
        session.set_client_secret("pi_1_secret_abc");
        assert!(!session.can_confirm());
    }

    #[test]
    fn invoice_flow_requires_reconciliation_before_completion() {
        let mut session = CheckoutSession::new(PaymentFlow::Invoice);
        session.mount_form();
        session.set_client_secret("pi_1_secret_abc");
        assert!(session.begin_confirmation());

        session.confirmation_succeeded();
        assert_eq!(session.state(), &CheckoutState::AwaitingReconciliation);
        assert!(!session.is_complete());

        session.reconciliation_completed();
        assert!(session.is_complete());
    }

    #[test]
    fn project_flow_completes_without_reconciliation() {
        let mut session = CheckoutSession::new(PaymentFlow::Project);
        session.mount_form();
        session.set_client_secret("pi_2_secret_def");
        assert!(session.begin_confirmation());

        session.confirmation_succeeded();
        assert!(session.is_complete());
    }

    #[test]
    fn failure_surfaces_message_and_allows_retry() {
        let mut session = CheckoutSession::new(PaymentFlow::Invoice);
        session.mount_form();
        session.set_client_secret("pi_3_secret_ghi");
        assert!(session.begin_confirmation());

        session.confirmation_failed("Your card was declined.");
        assert_eq!(
            session.state(),
            &CheckoutState::Failed {
                message: "Your card was declined.".to_string()
            }
        );

        session.retry();
        // Form and secret survive the retry, so confirmation is immediately available.
        assert!(session.can_confirm());
    }

    #[test]
    fn double_confirmation_is_ignored() {
        let mut session = CheckoutSession::new(PaymentFlow::Project);
        session.mount_form();
        session.set_client_secret("pi_4_secret_jkl");
        assert!(session.begin_confirmation());
        assert!(!session.begin_confirmation());
    }
}
