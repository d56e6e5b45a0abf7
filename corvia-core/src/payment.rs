use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayIntentStatus {
    RequiresPaymentMethod,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Failed,
}

/// The provider's view of a single attempted charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub amount: i64,
    pub currency: String,
    pub status: GatewayIntentStatus,
    pub client_secret: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub type GatewayResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// External payment provider. Treated as untrusted, possibly slow and
/// possibly duplicate-delivering; callers bound every call with a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment intent with the provider
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: serde_json::Value,
    ) -> GatewayResult<GatewayIntent>;

    /// Retrieve the provider's authoritative intent status
    async fn retrieve_intent(&self, intent_id: &str) -> GatewayResult<GatewayIntent>;

    /// Request a full or partial refund against a settled intent
    async fn create_refund(&self, intent_id: &str, amount: i64) -> GatewayResult<String>;
}

/// In-memory gateway used in tests and local development. Intents start in
/// `RequiresPaymentMethod`; tests drive them to a terminal status with
/// `settle` / `decline` before confirming.
pub struct MockGateway {
    intents: Mutex<HashMap<String, GatewayIntent>>,
    refunds: Mutex<Vec<(String, i64)>>,
    outage: std::sync::atomic::AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            intents: Mutex::new(HashMap::new()),
            refunds: Mutex::new(Vec::new()),
            outage: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Simulate the provider being unreachable
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, std::sync::atomic::Ordering::SeqCst);
    }

    /// Drive an intent to `Succeeded`, as a cardholder completing payment would
    pub fn settle(&self, intent_id: &str) {
        if let Some(intent) = self.intents.lock().expect("mock gateway lock").get_mut(intent_id) {
            intent.status = GatewayIntentStatus::Succeeded;
        }
    }

    /// Drive an intent to `Failed`
    pub fn decline(&self, intent_id: &str) {
        if let Some(intent) = self.intents.lock().expect("mock gateway lock").get_mut(intent_id) {
            intent.status = GatewayIntentStatus::Failed;
        }
    }

    /// Refund requests the mock has accepted, in order
    pub fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().expect("mock gateway lock").clone()
    }

    fn check_outage(&self) -> GatewayResult<()> {
        if self.outage.load(std::sync::atomic::Ordering::SeqCst) {
            return Err("gateway unreachable".into());
        }
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: serde_json::Value,
    ) -> GatewayResult<GatewayIntent> {
        self.check_outage()?;
        let intent = GatewayIntent {
            id: format!("pi_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
            status: GatewayIntentStatus::RequiresPaymentMethod,
            client_secret: Some(format!("secret_{}", Uuid::new_v4().simple())),
            metadata,
            created_at: Utc::now(),
        };
        self.intents
            .lock()
            .expect("mock gateway lock")
            .insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> GatewayResult<GatewayIntent> {
        self.check_outage()?;
        self.intents
            .lock()
            .expect("mock gateway lock")
            .get(intent_id)
            .cloned()
            .ok_or_else(|| format!("no such intent: {intent_id}").into())
    }

    async fn create_refund(&self, intent_id: &str, amount: i64) -> GatewayResult<String> {
        self.check_outage()?;
        if !self.intents.lock().expect("mock gateway lock").contains_key(intent_id) {
            return Err(format!("no such intent: {intent_id}").into());
        }
        self.refunds
            .lock()
            .expect("mock gateway lock")
            .push((intent_id.to_string(), amount));
        Ok(format!("re_{}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_intent_roundtrip() {
        let gateway = MockGateway::new();
        let intent = gateway
            .create_intent(4500, "USD", serde_json::json!({"booking": "CV1A2B3C"}))
            .await
            .unwrap();
        assert_eq!(intent.status, GatewayIntentStatus::RequiresPaymentMethod);

        gateway.settle(&intent.id);
        let fetched = gateway.retrieve_intent(&intent.id).await.unwrap();
        assert_eq!(fetched.status, GatewayIntentStatus::Succeeded);
        assert_eq!(fetched.amount, 4500);
    }

    #[tokio::test]
    async fn test_mock_outage() {
        let gateway = MockGateway::new();
        gateway.set_outage(true);
        assert!(gateway
            .create_intent(100, "USD", serde_json::json!({}))
            .await
            .is_err());

        gateway.set_outage(false);
        assert!(gateway
            .create_intent(100, "USD", serde_json::json!({}))
            .await
            .is_ok());
    }
}
