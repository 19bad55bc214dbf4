use crate::config::RazorpayConfig;
use crate::error::{AppError, AppResult};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    pub async fn create_order(&self, amount_minor: i64, receipt: &str) -> AppResult<GatewayOrder> {
        let url = format!("{}/orders", self.config.base_url);

        let body = CreateOrderRequest {
            amount: amount_minor,
            currency: &self.config.currency,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let order: GatewayOrder = response.json().await?;
            Ok(order)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to create gateway order: {error_text}"
            )))
        }
    }

    /// Checkout signature check: HMAC-SHA256 over `"{order_id}|{payment_id}"`
    /// keyed with the secret, hex-encoded. Compared in constant time.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.signature_for(order_id, payment_id);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    fn signature_for(&self, order_id: &str, payment_id: &str) -> String {
        let payload = format!("{order_id}|{payment_id}");
        hmac_sha256_hex(self.config.key_secret.as_bytes(), payload.as_bytes())
    }
}

pub(crate) fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RazorpayConfig;

    fn client() -> RazorpayClient {
        RazorpayClient::new(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "test_secret".to_string(),
            base_url: "https://api.razorpay.com/v1".to_string(),
            currency: "INR".to_string(),
        })
    }

    // RFC 4231 test vectors for HMAC-SHA256.
    #[test]
    fn test_hmac_sha256_rfc4231_case_1() {
        let key = [0x0bu8; 20];
        let out = hmac_sha256_hex(&key, b"Hi There");
        assert_eq!(
            out,
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn test_hmac_sha256_rfc4231_case_2() {
        let out = hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            out,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_signature_accepts_own_signature() {
        let c = client();
        let sig = c.signature_for("order_abc123", "pay_xyz789");
        assert!(c.verify_signature("order_abc123", "pay_xyz789", &sig));
    }

    #[test]
    fn test_verify_signature_rejects_tampering() {
        let c = client();
        let sig = c.signature_for("order_abc123", "pay_xyz789");
        assert!(!c.verify_signature("order_abc123", "pay_other", &sig));
        assert!(!c.verify_signature("order_other", "pay_xyz789", &sig));
        assert!(!c.verify_signature("order_abc123", "pay_xyz789", "deadbeef"));
        assert!(!c.verify_signature("order_abc123", "pay_xyz789", ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
