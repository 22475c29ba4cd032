//! x402 protocol types.
//!
//! Wire shapes for the Solana "exact" scheme: the payment requirement a
//! server returns with HTTP 402, and the payment proof a client sends back
//! in the `X-PAYMENT` header.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{X402Error, X402Result};

/// x402 protocol version.
pub const X402_VERSION: u32 = 1;

/// HTTP header name for payment requirements (server → client).
pub const HEADER_PAYMENT_REQUIRED: &str = "X-PAYMENT-REQUIRED";

/// HTTP header name for the payment proof (client → server).
pub const HEADER_PAYMENT: &str = "X-PAYMENT";

/// HTTP header name for the receipt on a paid response (server → client).
pub const HEADER_PAYMENT_RECEIPT: &str = "X-PAYMENT-RECEIPT";

/// Challenge header carrying the terms as `key="value"` pairs.
pub const HEADER_WWW_AUTHENTICATE: &str = "WWW-Authenticate";

/// The only payment scheme: pay exactly the quoted amount.
pub const SCHEME_EXACT: &str = "exact";

/// Network name used when none is configured.
pub const DEFAULT_NETWORK: &str = "solana-mainnet";

/// Seconds a payment proof stays fresh unless the rule says otherwise.
pub const DEFAULT_DEADLINE_SECONDS: u64 = 60;

// =============================================================================
// Payment Requirement (402 Response)
// =============================================================================

/// Payment terms returned with a 402 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Payment scheme, always "exact".
    pub scheme: String,

    /// Network name, e.g. "solana-mainnet".
    pub network: String,

    /// Amount in lamports or raw token units, as a decimal string.
    pub max_amount_required: String,

    /// The requested path.
    pub resource: String,

    /// Human-readable description.
    pub description: String,

    /// Address to pay.
    pub pay_to: String,

    /// How long a proof stays fresh.
    pub required_deadline_seconds: u64,

    /// Token details for non-native payments; `{}` for SOL.
    #[serde(default)]
    pub extra: PaymentExtra,
}

/// Token details attached to a USDC-priced requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

// =============================================================================
// Payment Proof (Client → Server)
// =============================================================================

/// The proof inside an `X-PAYMENT` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// Base58 transaction signature.
    pub signature: String,

    /// Paying address.
    pub payer: String,

    /// Self-reported amount, as a decimal string.
    pub amount: String,

    /// Mint for token payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,

    /// Unix seconds when the payment was made.
    pub timestamp: i64,
}

/// The full `X-PAYMENT` header value before encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEnvelope {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: PaymentProof,
}

impl PaymentEnvelope {
    /// Wrap a proof for `network`.
    pub fn exact(network: impl Into<String>, payload: PaymentProof) -> Self {
        Self {
            x402_version: X402_VERSION,
            scheme: SCHEME_EXACT.to_string(),
            network: network.into(),
            payload,
        }
    }

    /// Encode as a header value: base64 of the JSON.
    pub fn to_header(&self) -> X402Result<String> {
        let json = serde_json::to_vec(self).map_err(|e| X402Error::MalformedPayload {
            reason: e.to_string(),
        })?;
        Ok(BASE64.encode(json))
    }
}

/// Decode an `X-PAYMENT` header: base64 JSON, falling back to raw JSON.
pub fn decode_payment_header(header: &str) -> X402Result<Value> {
    let trimmed = header.trim();
    if let Ok(bytes) = BASE64.decode(trimmed) {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            return Ok(value);
        }
    }
    serde_json::from_str(trimmed).map_err(|_| X402Error::UndecodableHeader)
}

/// Fields read from a decoded payment header.
///
/// Lenient: the proof is `payload` when present, otherwise the document
/// itself; amounts and timestamps may be numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofFields {
    pub signature: String,
    pub payer: String,
    pub amount: u64,
    pub token_mint: Option<String>,
    pub timestamp: Option<i64>,
    pub pay_to: Option<String>,
}

impl ProofFields {
    pub fn from_value(data: &Value) -> X402Result<Self> {
        let payload = match data.get("payload") {
            Some(p) if p.is_object() => p,
            _ => data,
        };
        let signature = payload
            .get("signature")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(X402Error::MissingSignature)?
            .to_string();

        let amount = match payload.get("amount") {
            None | Some(Value::Null) => 0,
            Some(v) => as_u64(v).ok_or_else(|| X402Error::MalformedPayload {
                reason: format!("invalid amount: {}", v),
            })?,
        };
        let timestamp = payload
            .get("timestamp")
            .and_then(|v| as_u64(v).map(|t| t as i64))
            .filter(|t| *t != 0);

        Ok(Self {
            signature,
            payer: str_field(payload, "payer").unwrap_or_default(),
            amount,
            token_mint: str_field(payload, "token_mint"),
            timestamp,
            pay_to: str_field(payload, "pay_to"),
        })
    }
}

/// Receipt attached to a paid response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub signature: String,
    pub status: String,
}

impl PaymentReceipt {
    pub fn accepted(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            status: "accepted".to_string(),
        }
    }
}

/// Read a non-negative integer given as a JSON number or decimal string.
pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proof() -> PaymentProof {
        PaymentProof {
            signature: "5sig".into(),
            payer: "payer".into(),
            amount: "1000".into(),
            token_mint: None,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_envelope_header_shape() {
        let header = PaymentEnvelope::exact("solana-devnet", proof()).to_header().unwrap();
        let value = decode_payment_header(&header).unwrap();
        assert_eq!(value["x402Version"], 1);
        assert_eq!(value["scheme"], "exact");
        assert_eq!(value["network"], "solana-devnet");
        assert_eq!(value["payload"]["amount"], "1000");
        assert!(value["payload"].get("token_mint").is_none());
    }

    #[test]
    fn test_decode_raw_json_fallback() {
        let value = decode_payment_header(r#"{"signature": "abc", "amount": 5}"#).unwrap();
        let fields = ProofFields::from_value(&value).unwrap();
        assert_eq!(fields.signature, "abc");
        assert_eq!(fields.amount, 5);
        assert_eq!(fields.payer, "");
        assert_eq!(fields.timestamp, None);

        assert!(matches!(
            decode_payment_header("not json at all"),
            Err(X402Error::UndecodableHeader)
        ));
    }

    #[test]
    fn test_proof_fields_require_signature() {
        let err = ProofFields::from_value(&json!({"payload": {"amount": "10"}})).unwrap_err();
        assert!(matches!(err, X402Error::MissingSignature));

        let err = ProofFields::from_value(&json!({"signature": "s", "amount": "ten"})).unwrap_err();
        assert!(matches!(err, X402Error::MalformedPayload { .. }));
    }

    #[test]
    fn test_requirement_extra_serializes_empty() {
        let req = PaymentRequirement {
            scheme: SCHEME_EXACT.into(),
            network: DEFAULT_NETWORK.into(),
            max_amount_required: "1000".into(),
            resource: "/data".into(),
            description: String::new(),
            pay_to: "pay".into(),
            required_deadline_seconds: 60,
            extra: PaymentExtra::default(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["extra"], json!({}));
        assert_eq!(value["max_amount_required"], "1000");
    }
}
