//! # Checkout Sequencer
//!
//! Drives one sale from cart to completed order.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──► OrderCreating ──(fail)──────────────────────────► Failed      │
//! │                │                                                        │
//! │                ├──(cash)──► FiscalSending ──(ok)────► Completed         │
//! │                │                 │                                      │
//! │                │                 └──(fail/skip)──► CompletedWithWarning │
//! │                │                                                        │
//! │                └──(card/online)──► AwaitingPaymentGatewayResult         │
//! │                                         │                               │
//! │                                         ├──(verified)──► FiscalSending  │
//! │                                         │                               │
//! │                                         └──(fail/dismiss)──►            │
//! │                                              CompensatingDelete ► Failed│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Steps run strictly one after another; each remote call is made once.
//! - A fiscal receipt is only sent for an order that persisted and, for
//!   online payments, was verified.
//! - A payment failure deletes the created order exactly once. If that
//!   delete fails it is logged and the payment error is still returned.
//! - A fiscal failure never unwinds the order.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use kasa_core::validation::{validate_customer_name, validate_phone};
use kasa_core::{CoreError, Order, PaymentMethod};

use crate::config::{KasaConfig, StoreSettings};
use crate::error::{CheckoutError, CheckoutResult, RemoteError, RemoteResult};
use crate::receipt::{FiscalStatus, Receipt};
use crate::remote::{
    FiscalDevice, FiscalReceiptRequest, FiscalService, GatewayOrderRequest, GatewaySession,
    NewOrder, OrderService, PaymentGateway, PaymentPrompt, PaymentVerification, PromptOutcome,
};
use crate::session::CheckoutSession;

// =============================================================================
// Checkout State
// =============================================================================

/// Where a checkout currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    OrderCreating,
    FiscalSending,
    AwaitingPaymentGatewayResult,
    CompensatingDelete,
    Completed,
    CompletedWithWarning,
    Failed,
}

impl CheckoutState {
    /// Returns true once the checkout has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Completed | CheckoutState::CompletedWithWarning | CheckoutState::Failed
        )
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutState::Idle => "idle",
            CheckoutState::OrderCreating => "order_creating",
            CheckoutState::FiscalSending => "fiscal_sending",
            CheckoutState::AwaitingPaymentGatewayResult => "awaiting_payment_gateway_result",
            CheckoutState::CompensatingDelete => "compensating_delete",
            CheckoutState::Completed => "completed",
            CheckoutState::CompletedWithWarning => "completed_with_warning",
            CheckoutState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Request / Outcome
// =============================================================================

/// What the cashier submits at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    pub fn new(
        customer_name: impl Into<String>,
        phone: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        CheckoutRequest {
            customer_name: customer_name.into(),
            phone: phone.into(),
            payment_method,
        }
    }
}

/// A completed sale.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub receipt: Receipt,
    /// `Completed` or `CompletedWithWarning`.
    pub state: CheckoutState,
}

impl CheckoutOutcome {
    pub fn warning(&self) -> Option<&str> {
        self.receipt.warning.as_deref()
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// The remote services a sequencer drives.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderService>,
    pub fiscal: Arc<dyn FiscalService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub prompt: Arc<dyn PaymentPrompt>,
}

impl Collaborators {
    /// Uses one backend for orders, fiscal and payments.
    pub fn from_backend<B>(backend: Arc<B>, prompt: Arc<dyn PaymentPrompt>) -> Self
    where
        B: OrderService + FiscalService + PaymentGateway + 'static,
    {
        Collaborators {
            orders: backend.clone(),
            fiscal: backend.clone(),
            payments: backend,
            prompt,
        }
    }
}

// =============================================================================
// Sequencer
// =============================================================================

/// Runs checkouts, one at a time.
pub struct CheckoutSequencer {
    collaborators: Collaborators,
    store: StoreSettings,
    state: CheckoutState,
    history: Vec<CheckoutState>,
}

impl CheckoutSequencer {
    pub fn new(collaborators: Collaborators, store: StoreSettings) -> Self {
        CheckoutSequencer {
            collaborators,
            store,
            state: CheckoutState::Idle,
            history: vec![CheckoutState::Idle],
        }
    }

    pub fn from_config(collaborators: Collaborators, config: &KasaConfig) -> Self {
        Self::new(collaborators, config.store.clone())
    }

    /// Current state.
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Every state the last checkout passed through, starting at `Idle`.
    pub fn history(&self) -> &[CheckoutState] {
        &self.history
    }

    pub fn store(&self) -> &StoreSettings {
        &self.store
    }

    /// Fiscal devices the cashier can pick from.
    pub async fn fiscal_devices(&self) -> RemoteResult<Vec<FiscalDevice>> {
        self.collaborators.fiscal.list_devices().await
    }

    fn transition(&mut self, next: CheckoutState) {
        info!(from = %self.state, to = %next, "Checkout state");
        self.state = next;
        self.history.push(next);
    }

    fn reset(&mut self) {
        self.state = CheckoutState::Idle;
        self.history.clear();
        self.history.push(CheckoutState::Idle);
    }

    /// Runs a checkout for the session's cart.
    ///
    /// On success the cart is cleared. On failure it is left as it was so
    /// the cashier can retry.
    pub async fn checkout(
        &mut self,
        session: &mut CheckoutSession,
        request: CheckoutRequest,
    ) -> CheckoutResult<CheckoutOutcome> {
        self.reset();
        let reference = Uuid::new_v4().to_string();
        debug!(
            reference = %reference,
            method = %request.payment_method,
            lines = session.cart().len(),
            "Checkout requested"
        );

        let phone = match Self::preflight(session, &request) {
            Ok(phone) => phone,
            Err(err) => {
                warn!(reference = %reference, error = %err, "Checkout rejected");
                self.transition(CheckoutState::Failed);
                return Err(err);
            }
        };

        // Order
        self.transition(CheckoutState::OrderCreating);
        let new_order = NewOrder::from_cart(
            session.cart(),
            reference.as_str(),
            request.customer_name.trim(),
            phone,
            request.payment_method,
        );
        let order = match self.collaborators.orders.create_order(&new_order).await {
            Ok(order) => order,
            Err(err) => {
                error!(reference = %reference, error = %err, "Order creation failed");
                self.transition(CheckoutState::Failed);
                return Err(CheckoutError::OrderCreationFailed(err));
            }
        };
        info!(reference = %reference, order_id = %order.id, total = %order.grand_total, "Order created");

        // Payment
        match request.payment_method {
            PaymentMethod::Cash => {}
            PaymentMethod::CardOnline => {
                self.transition(CheckoutState::AwaitingPaymentGatewayResult);
                if let Err(err) = self.collect_payment(&order).await {
                    warn!(order_id = %order.id, error = %err, "Payment failed");
                    self.transition(CheckoutState::CompensatingDelete);
                    self.compensate(&order.id).await;
                    self.transition(CheckoutState::Failed);
                    return Err(err);
                }
                info!(order_id = %order.id, "Payment verified");
            }
        }

        // Fiscal receipt
        self.transition(CheckoutState::FiscalSending);
        let fiscal = self.send_fiscal(session, &order).await;
        let final_state = if fiscal.is_sent() {
            CheckoutState::Completed
        } else {
            CheckoutState::CompletedWithWarning
        };

        let receipt = Receipt::new(&order, fiscal, &self.store, session.cart().default_vat_rate());
        session.finish_sale();
        self.transition(final_state);
        info!(order_id = %order.id, state = %final_state, "Checkout finished");

        Ok(CheckoutOutcome {
            order,
            receipt,
            state: final_state,
        })
    }

    /// Local checks that must pass before anything is sent.
    ///
    /// Returns the phone number in compact form.
    fn preflight(session: &CheckoutSession, request: &CheckoutRequest) -> CheckoutResult<String> {
        if session.cart().is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validate_customer_name(&request.customer_name)?;
        Ok(validate_phone(&request.phone)?)
    }

    /// Opens a gateway order, shows the payment window and verifies the result.
    async fn collect_payment(&self, order: &Order) -> CheckoutResult<()> {
        let order_id = order.id.clone();
        let amount = order.grand_total.to_minor_units().ok_or_else(|| {
            CheckoutError::PaymentSetupFailed {
                order_id: order_id.clone(),
                source: RemoteError::InvalidRequest(format!(
                    "amount {} is out of range",
                    order.grand_total
                )),
            }
        })?;

        let gateway_order = self
            .collaborators
            .payments
            .create_gateway_order(&GatewayOrderRequest {
                amount,
                currency: self.store.currency.clone(),
            })
            .await
            .map_err(|source| CheckoutError::PaymentSetupFailed {
                order_id: order_id.clone(),
                source,
            })?;
        debug!(order_id = %order_id, gateway_order_id = %gateway_order.id, amount, "Gateway order opened");

        let gateway_order_id = gateway_order.id.clone();
        let session = GatewaySession {
            gateway_order,
            order_id: order_id.clone(),
            store_name: self.store.name.clone(),
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            amount: order.grand_total,
        };

        let (payment_id, signature) = match self.collaborators.prompt.present(&session).await {
            PromptOutcome::Authorized {
                payment_id,
                signature,
            } => (payment_id, signature),
            PromptOutcome::Dismissed => return Err(CheckoutError::PaymentCancelled { order_id }),
            PromptOutcome::Failed { reason } => {
                return Err(CheckoutError::PaymentFailed { order_id, reason })
            }
        };

        let confirmation = self
            .collaborators
            .payments
            .verify_payment(&PaymentVerification {
                gateway_order_id,
                payment_id,
                signature,
                order_id: order_id.clone(),
            })
            .await
            .map_err(|source| CheckoutError::PaymentVerificationFailed {
                order_id: order_id.clone(),
                source,
            })?;

        if !confirmation.verified {
            return Err(CheckoutError::PaymentFailed {
                order_id,
                reason: confirmation
                    .message
                    .unwrap_or_else(|| "payment was not confirmed".to_string()),
            });
        }

        Ok(())
    }

    /// Deletes an order whose payment failed. Failures are only logged.
    async fn compensate(&self, order_id: &str) {
        match self.collaborators.orders.delete_order(order_id).await {
            Ok(()) => info!(order_id = %order_id, "Unpaid order deleted"),
            Err(err) => error!(
                order_id = %order_id,
                error = %err,
                "Failed to delete unpaid order; it must be removed manually"
            ),
        }
    }

    /// Sends the fiscal receipt to the session's device.
    async fn send_fiscal(&self, session: &mut CheckoutSession, order: &Order) -> FiscalStatus {
        let device_id = match session.fiscal_device() {
            Some(device) => device.to_string(),
            None => {
                warn!(order_id = %order.id, "No fiscal device selected, receipt not sent");
                return FiscalStatus::Skipped;
            }
        };

        let request = FiscalReceiptRequest::for_order(
            order,
            device_id.as_str(),
            session.cashier(),
            session.cart().default_vat_rate(),
        );

        match self.collaborators.fiscal.send_receipt(&request).await {
            Ok(ack) => {
                info!(
                    order_id = %order.id,
                    device_id = %device_id,
                    receipt_number = ?ack.receipt_number,
                    "Fiscal receipt sent"
                );
                session.select_fiscal_device(Some(device_id.clone()));
                FiscalStatus::Sent {
                    device_id,
                    receipt_number: ack.receipt_number,
                }
            }
            Err(err) => {
                warn!(order_id = %order.id, device_id = %device_id, error = %err, "Fiscal receipt failed");
                FiscalStatus::Failed {
                    device_id,
                    reason: err.to_string(),
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutSettings;
    use crate::remote::{FiscalAck, GatewayOrder, PaymentConfirmation};
    use async_trait::async_trait;
    use kasa_core::{CatalogItem, Money, OrderStatus, VatRate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CreateOrder(String),
        DeleteOrder(String),
        SendReceipt { order_id: String, device_id: String },
        CreateGatewayOrder { amount: i64, currency: String },
        Verify { order_id: String, payment_id: String },
        Prompt(String),
    }

    #[derive(Default)]
    struct FakeBackend {
        fail_create: bool,
        fail_delete: bool,
        fail_fiscal: bool,
        fail_gateway: bool,
        fail_verify: bool,
        reject_verify: bool,
        /// Echo a grand total no gateway amount can hold.
        oversized_total: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeBackend {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn deletes(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::DeleteOrder(id) => Some(id),
                    _ => None,
                })
                .collect()
        }

        fn sent_receipts(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::SendReceipt { .. }))
                .count()
        }
    }

    fn api_error(status: u16, message: &str) -> RemoteError {
        RemoteError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl OrderService for FakeBackend {
        async fn create_order(&self, order: &NewOrder) -> RemoteResult<Order> {
            self.record(Call::CreateOrder(order.client_reference.clone()));
            if self.fail_create {
                return Err(api_error(500, "database unavailable"));
            }
            Ok(Order {
                id: "ord-1".into(),
                customer_name: order.customer_name.clone(),
                phone: order.phone.clone(),
                items: order.items.clone(),
                subtotal: order.subtotal,
                tax: order.tax,
                grand_total: if self.oversized_total {
                    Money::new(Decimal::MAX)
                } else {
                    order.grand_total
                },
                payment_method: order.payment_method,
                status: OrderStatus::Pending,
                created_at: None,
            })
        }

        async fn delete_order(&self, order_id: &str) -> RemoteResult<()> {
            self.record(Call::DeleteOrder(order_id.to_string()));
            if self.fail_delete {
                return Err(RemoteError::Network("connection reset".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FiscalService for FakeBackend {
        async fn list_devices(&self) -> RemoteResult<Vec<FiscalDevice>> {
            Ok(vec![FiscalDevice {
                id: "FP-01".into(),
                name: "Front counter".into(),
            }])
        }

        async fn send_receipt(&self, receipt: &FiscalReceiptRequest) -> RemoteResult<FiscalAck> {
            self.record(Call::SendReceipt {
                order_id: receipt.order_id.clone(),
                device_id: receipt.device_id.clone(),
            });
            if self.fail_fiscal {
                return Err(api_error(502, "device offline"));
            }
            Ok(FiscalAck {
                receipt_number: Some("0042".into()),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeBackend {
        async fn create_gateway_order(
            &self,
            request: &GatewayOrderRequest,
        ) -> RemoteResult<GatewayOrder> {
            self.record(Call::CreateGatewayOrder {
                amount: request.amount,
                currency: request.currency.clone(),
            });
            if self.fail_gateway {
                return Err(api_error(503, "gateway down"));
            }
            Ok(GatewayOrder {
                id: "gw-1".into(),
                amount: request.amount,
                currency: request.currency.clone(),
                key: None,
            })
        }

        async fn verify_payment(
            &self,
            verification: &PaymentVerification,
        ) -> RemoteResult<PaymentConfirmation> {
            self.record(Call::Verify {
                order_id: verification.order_id.clone(),
                payment_id: verification.payment_id.clone(),
            });
            if self.fail_verify {
                return Err(RemoteError::Network("timed out".into()));
            }
            Ok(PaymentConfirmation {
                verified: !self.reject_verify,
                message: self.reject_verify.then(|| "signature mismatch".to_string()),
            })
        }
    }

    struct FakePrompt {
        outcome: PromptOutcome,
        backend: Arc<FakeBackend>,
    }

    #[async_trait]
    impl PaymentPrompt for FakePrompt {
        async fn present(&self, session: &GatewaySession) -> PromptOutcome {
            self.backend
                .record(Call::Prompt(session.gateway_order.id.clone()));
            self.outcome.clone()
        }
    }

    fn init_logs() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("kasa_checkout=debug"))
            .with_test_writer()
            .try_init();
    }

    fn authorized() -> PromptOutcome {
        PromptOutcome::Authorized {
            payment_id: "pay-1".into(),
            signature: "sig".into(),
        }
    }

    fn sequencer(backend: &Arc<FakeBackend>, outcome: PromptOutcome) -> CheckoutSequencer {
        init_logs();
        let prompt = Arc::new(FakePrompt {
            outcome,
            backend: backend.clone(),
        });
        CheckoutSequencer::new(
            Collaborators::from_backend(backend.clone(), prompt),
            StoreSettings::default(),
        )
    }

    /// Cart worth 7.308: bread 2.50 × 2 at the default 20%, tea 1.20 at 9%.
    fn session() -> CheckoutSession {
        let mut session = CheckoutSession::new(&CheckoutSettings {
            fiscal_device: Some("FP-01".into()),
            ..CheckoutSettings::default()
        });
        let bread = CatalogItem::new("bread", "Bread", Money::new(dec!(2.50)));
        let tea = CatalogItem::new("tea", "Tea", Money::new(dec!(1.20)))
            .with_vat_rate(VatRate::from_bps(900));
        let cart = session.cart_mut();
        cart.add(&bread).unwrap();
        cart.add(&bread).unwrap();
        cart.add(&tea).unwrap();
        session
    }

    fn cash() -> CheckoutRequest {
        CheckoutRequest::new("Ana", "050 123 4567", PaymentMethod::Cash)
    }

    fn online() -> CheckoutRequest {
        CheckoutRequest::new("Ana", "050 123 4567", PaymentMethod::CardOnline)
    }

    #[tokio::test]
    async fn test_cash_checkout_completes() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let outcome = seq.checkout(&mut session, cash()).await.unwrap();

        assert_eq!(outcome.state, CheckoutState::Completed);
        assert_eq!(seq.state(), CheckoutState::Completed);
        assert_eq!(
            seq.history(),
            &[
                CheckoutState::Idle,
                CheckoutState::OrderCreating,
                CheckoutState::FiscalSending,
                CheckoutState::Completed,
            ]
        );
        assert_eq!(outcome.order.phone, "0501234567");
        assert_eq!(outcome.order.grand_total.amount(), dec!(7.308));
        assert!(outcome.warning().is_none());
        assert!(session.cart().is_empty());
        assert_eq!(session.fiscal_device(), Some("FP-01"));

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::CreateOrder(_)));
        assert_eq!(
            calls[1],
            Call::SendReceipt {
                order_id: "ord-1".into(),
                device_id: "FP-01".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fiscal_failure_completes_with_warning_without_delete() {
        let backend = Arc::new(FakeBackend {
            fail_fiscal: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let outcome = seq.checkout(&mut session, cash()).await.unwrap();

        assert_eq!(outcome.state, CheckoutState::CompletedWithWarning);
        assert!(outcome.warning().unwrap().contains("device offline"));
        assert!(backend.deletes().is_empty());
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_no_fiscal_device_skips_receipt() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();
        session.select_fiscal_device(None);

        let outcome = seq.checkout(&mut session, cash()).await.unwrap();

        assert_eq!(outcome.state, CheckoutState::CompletedWithWarning);
        assert_eq!(outcome.receipt.fiscal, FiscalStatus::Skipped);
        assert_eq!(backend.sent_receipts(), 0);
    }

    #[tokio::test]
    async fn test_online_checkout_verifies_before_fiscal() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let outcome = seq.checkout(&mut session, online()).await.unwrap();

        assert_eq!(outcome.state, CheckoutState::Completed);
        assert_eq!(
            seq.history(),
            &[
                CheckoutState::Idle,
                CheckoutState::OrderCreating,
                CheckoutState::AwaitingPaymentGatewayResult,
                CheckoutState::FiscalSending,
                CheckoutState::Completed,
            ]
        );

        let calls = backend.calls();
        assert_eq!(calls.len(), 5);
        // 7.308 rounds to 7.31
        assert_eq!(
            calls[1],
            Call::CreateGatewayOrder {
                amount: 731,
                currency: "EUR".into()
            }
        );
        assert_eq!(calls[2], Call::Prompt("gw-1".into()));
        assert_eq!(
            calls[3],
            Call::Verify {
                order_id: "ord-1".into(),
                payment_id: "pay-1".into()
            }
        );
        assert!(matches!(calls[4], Call::SendReceipt { .. }));
        assert!(backend.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_dismissed_payment_deletes_order_once() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, PromptOutcome::Dismissed);
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentCancelled { ref order_id } if order_id == "ord-1"));
        assert_eq!(backend.deletes(), vec!["ord-1".to_string()]);
        assert_eq!(backend.sent_receipts(), 0);
        assert_eq!(seq.state(), CheckoutState::Failed);
        assert_eq!(
            seq.history(),
            &[
                CheckoutState::Idle,
                CheckoutState::OrderCreating,
                CheckoutState::AwaitingPaymentGatewayResult,
                CheckoutState::CompensatingDelete,
                CheckoutState::Failed,
            ]
        );
        // Cart survives for a retry
        assert_eq!(session.cart().len(), 2);
    }

    #[tokio::test]
    async fn test_unpayable_total_deletes_order() {
        let backend = Arc::new(FakeBackend {
            oversized_total: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        match err {
            CheckoutError::PaymentSetupFailed { order_id, source } => {
                assert_eq!(order_id, "ord-1");
                assert!(matches!(source, RemoteError::InvalidRequest(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.deletes(), vec!["ord-1".to_string()]);
        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::CreateGatewayOrder { .. })));
        assert_eq!(seq.state(), CheckoutState::Failed);
    }

    #[tokio::test]
    async fn test_gateway_failure_deletes_order() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(
            &backend,
            PromptOutcome::Failed {
                reason: "card declined".into(),
            },
        );
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        match err {
            CheckoutError::PaymentFailed { order_id, reason } => {
                assert_eq!(order_id, "ord-1");
                assert_eq!(reason, "card declined");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_still_reports_payment_error() {
        let backend = Arc::new(FakeBackend {
            fail_delete: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, PromptOutcome::Dismissed);
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentCancelled { .. }));
        assert_eq!(backend.deletes().len(), 1);
        assert_eq!(seq.state(), CheckoutState::Failed);
    }

    #[tokio::test]
    async fn test_gateway_order_failure_deletes_order() {
        let backend = Arc::new(FakeBackend {
            fail_gateway: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentSetupFailed { .. }));
        assert_eq!(backend.deletes(), vec!["ord-1".to_string()]);
        // The prompt is never shown
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Prompt(_))));
    }

    #[tokio::test]
    async fn test_verification_failures_delete_order() {
        for backend in [
            FakeBackend {
                fail_verify: true,
                ..FakeBackend::default()
            },
            FakeBackend {
                reject_verify: true,
                ..FakeBackend::default()
            },
        ] {
            let backend = Arc::new(backend);
            let mut seq = sequencer(&backend, authorized());
            let mut session = session();

            let err = seq.checkout(&mut session, online()).await.unwrap_err();

            assert!(matches!(
                err,
                CheckoutError::PaymentVerificationFailed { .. } | CheckoutError::PaymentFailed { .. }
            ));
            assert_eq!(backend.deletes(), vec!["ord-1".to_string()]);
            assert_eq!(backend.sent_receipts(), 0);
        }
    }

    #[tokio::test]
    async fn test_order_creation_failure_needs_no_compensation() {
        let backend = Arc::new(FakeBackend {
            fail_create: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let err = seq.checkout(&mut session, online()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::OrderCreationFailed(_)));
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(seq.state(), CheckoutState::Failed);
        assert_eq!(session.cart().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_calls() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, authorized());
        let mut session = CheckoutSession::new(&CheckoutSettings::default());

        let err = seq.checkout(&mut session, cash()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(CoreError::EmptyCart)));
        assert!(backend.calls().is_empty());
        assert_eq!(seq.state(), CheckoutState::Failed);
    }

    #[tokio::test]
    async fn test_invalid_customer_data_makes_no_calls() {
        let backend = Arc::new(FakeBackend::default());
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let blank_name = CheckoutRequest::new("  ", "0501234567", PaymentMethod::Cash);
        assert!(seq.checkout(&mut session, blank_name).await.unwrap_err().is_validation());

        let bad_phone = CheckoutRequest::new("Ana", "call me", PaymentMethod::Cash);
        assert!(seq.checkout(&mut session, bad_phone).await.unwrap_err().is_validation());

        assert!(backend.calls().is_empty());
        assert_eq!(session.cart().len(), 2);
    }

    #[tokio::test]
    async fn test_each_attempt_gets_new_reference() {
        let backend = Arc::new(FakeBackend {
            fail_create: true,
            ..FakeBackend::default()
        });
        let mut seq = sequencer(&backend, authorized());
        let mut session = session();

        let _ = seq.checkout(&mut session, cash()).await;
        let _ = seq.checkout(&mut session, cash()).await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn test_fiscal_devices() {
        let backend = Arc::new(FakeBackend::default());
        let seq = sequencer(&backend, authorized());

        let devices = seq.fiscal_devices().await.unwrap();
        assert_eq!(devices[0].id, "FP-01");
    }
}
