//! Auto-paying x402 HTTP client.
//!
//! [`X402Client`] sends a request; when the server answers 402 it reads the
//! payment requirement, checks the caller's caps and the per-domain spending
//! limits, pays through a [`PaymentSender`], and retries with an
//! `X-PAYMENT` proof.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agentwallet_types::Clock;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{X402Error, X402Result};
use crate::pricing::{usdc_to_raw, USDC_MINT};
use crate::types::{
    as_u64, PaymentEnvelope, PaymentExtra, PaymentProof, PaymentRequirement, DEFAULT_DEADLINE_SECONDS,
    DEFAULT_NETWORK, HEADER_PAYMENT, HEADER_PAYMENT_REQUIRED, HEADER_WWW_AUTHENTICATE, SCHEME_EXACT,
};

/// An outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header, replacing any existing value case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Whether the body is sent for this method.
    fn sends_body(&self) -> bool {
        matches!(self.method.to_ascii_uppercase().as_str(), "POST" | "PUT" | "PATCH")
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First header value named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Sends HTTP requests for the client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> X402Result<HttpResponse>;
}

/// [`HttpTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> X402Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> X402Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| X402Error::Http(format!("invalid method {}: {}", request.method, e)))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let (true, Some(body)) = (request.sends_body(), &request.body) {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, headers, body })
    }
}

/// A payment the client wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    pub pay_to: String,
    /// Lamports, or raw token units when `token_mint` is set.
    pub amount: u64,
    pub token_mint: Option<String>,
    /// URL being paid for.
    pub resource: String,
    pub network: String,
}

/// Makes on-chain payments on behalf of the client.
#[async_trait]
pub trait PaymentSender: Send + Sync {
    async fn send_payment(&self, order: &PaymentOrder) -> X402Result<PaymentProof>;
}

/// Per-domain spending limits. Both caps are optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_request_lamports: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_lamports: Option<u64>,
}

/// One payment made by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub id: Uuid,
    pub domain: String,
    pub url: String,
    pub amount: u64,
    pub signature: String,
    pub token_mint: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Totals reported by [`X402Client::summary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub total: u64,
    pub count: usize,
    pub history: Vec<SpendRecord>,
}

/// Per-domain spend by UTC day, plus full history.
#[derive(Debug, Default)]
pub struct SpendingTracker {
    daily: HashMap<(String, NaiveDate), u64>,
    history: Vec<SpendRecord>,
}

impl SpendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: SpendRecord) {
        let day = record.timestamp.date_naive();
        let spent = self.daily.entry((record.domain.clone(), day)).or_insert(0);
        *spent = spent.saturating_add(record.amount);
        self.history.push(record);
    }

    pub fn daily_spend(&self, domain: &str, day: NaiveDate) -> u64 {
        self.daily.get(&(domain.to_string(), day)).copied().unwrap_or(0)
    }

    pub fn total_spend(&self) -> u64 {
        self.history.iter().fold(0u64, |sum, r| sum.saturating_add(r.amount))
    }

    pub fn history(&self) -> &[SpendRecord] {
        &self.history
    }

    /// Check `amount` against `limit` for `domain` on `day`.
    ///
    /// Returns the denial reason when a cap would be exceeded.
    pub fn check_limit(&self, domain: &str, amount: u64, limit: &SpendingLimit, day: NaiveDate) -> Result<(), String> {
        if let Some(max) = limit.max_per_request_lamports {
            if amount > max {
                return Err(format!(
                    "Payment {} lamports exceeds per-request limit of {} lamports for {}",
                    amount, max, domain
                ));
            }
        }
        if let Some(max) = limit.max_daily_lamports {
            let projected = self.daily_spend(domain, day).saturating_add(amount);
            if projected > max {
                return Err(format!(
                    "Daily spend would be {} lamports, exceeding limit of {} for {}",
                    projected, max, domain
                ));
            }
        }
        Ok(())
    }
}

/// Caller-supplied caps for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentCaps {
    /// Cap on native SOL payments.
    pub max_amount_lamports: Option<u64>,
    /// Cap on USDC payments, in whole USDC.
    pub max_amount_usdc: Option<f64>,
}

/// Final response plus what the client paid to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub payment_made: bool,
    pub payment_signature: Option<String>,
    pub payment_amount: Option<u64>,
    /// Why a 402 was not paid, when a limit denied it.
    pub error: Option<String>,
}

impl ClientResponse {
    fn unpaid(response: HttpResponse, error: Option<String>) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            payment_made: false,
            payment_signature: None,
            payment_amount: None,
            error,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// A payment made for one 402.
struct MadePayment {
    signature: String,
    amount: u64,
    /// `X-PAYMENT` value for the retry.
    header: String,
}

/// HTTP client that pays for 402 responses.
pub struct X402Client {
    transport: Arc<dyn HttpTransport>,
    sender: Arc<dyn PaymentSender>,
    clock: Arc<dyn Clock>,
    auto_pay: bool,
    max_retries: u32,
    /// Limits by host; `*` is the fallback.
    limits: HashMap<String, SpendingLimit>,
    tracker: Mutex<SpendingTracker>,
}

impl X402Client {
    pub fn new(transport: Arc<dyn HttpTransport>, sender: Arc<dyn PaymentSender>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            sender,
            clock,
            auto_pay: true,
            max_retries: 1,
            limits: HashMap::new(),
            tracker: Mutex::new(SpendingTracker::new()),
        }
    }

    pub fn with_auto_pay(mut self, auto_pay: bool) -> Self {
        self.auto_pay = auto_pay;
        self
    }

    /// Number of paid retries per request.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Spending limit for `domain`, or for every other domain with `*`.
    pub fn with_limit(mut self, domain: impl Into<String>, limit: SpendingLimit) -> Self {
        self.limits.insert(domain.into(), limit);
        self
    }

    pub fn with_limits(mut self, limits: HashMap<String, SpendingLimit>) -> Self {
        self.limits.extend(limits);
        self
    }

    fn limit_for(&self, domain: &str) -> SpendingLimit {
        self.limits
            .get(domain)
            .or_else(|| self.limits.get("*"))
            .copied()
            .unwrap_or_default()
    }

    /// Send `request`, paying for it if the server asks and the limits allow.
    ///
    /// Transport failures are errors; everything else (unacceptable terms,
    /// denied limits, failed payments) returns the server's 402 as is. A
    /// limit denial is reported in `error`. Once a payment went out the
    /// response reports the first one, even if a later retry is not paid.
    pub async fn request(&self, mut request: HttpRequest, caps: PaymentCaps) -> X402Result<ClientResponse> {
        let mut response = self.transport.send(&request).await?;
        if response.status != 402 || !self.auto_pay {
            return Ok(ClientResponse::unpaid(response, None));
        }

        let domain = domain_of(&request.url)?;
        let mut paid: Option<(String, u64)> = None;
        let mut error = None;
        let mut attempts = 0;

        while response.status == 402 && attempts < self.max_retries {
            attempts += 1;
            let requirement = match parse_payment_requirements(&response) {
                Some(r) => r,
                None => {
                    warn!(url = %request.url, "402 without payment requirements");
                    break;
                }
            };

            let payment = match self.pay(&request.url, &domain, &requirement, caps).await {
                Ok(Some(payment)) => payment,
                Ok(None) => break,
                Err(denied) => {
                    error = Some(denied.to_string());
                    break;
                }
            };

            request.set_header(HEADER_PAYMENT, payment.header);
            paid.get_or_insert((payment.signature, payment.amount));
            response = self.transport.send(&request).await?;
        }

        let mut result = ClientResponse::unpaid(response, error);
        if let Some((signature, amount)) = paid {
            result.payment_made = true;
            result.payment_signature = Some(signature);
            result.payment_amount = Some(amount);
        }
        Ok(result)
    }

    /// Pay for one requirement.
    ///
    /// `Ok(None)` means the terms are unusable or the payment failed;
    /// `Err` is always [`X402Error::SpendingLimit`], whether a local limit
    /// or the sender's own policy denied it.
    async fn pay(
        &self,
        url: &str,
        domain: &str,
        requirement: &PaymentRequirement,
        caps: PaymentCaps,
    ) -> X402Result<Option<MadePayment>> {
        let amount = requirement.max_amount_required.trim().parse::<u64>().unwrap_or(0);
        if amount == 0 {
            warn!(url, amount = %requirement.max_amount_required, "Unusable payment amount");
            return Ok(None);
        }
        let token_mint = requirement.extra.token_mint.clone();
        let is_usdc = token_mint.as_deref() == Some(USDC_MINT);

        if let (None, Some(max)) = (&token_mint, caps.max_amount_lamports) {
            if amount > max {
                warn!(url, requested = amount, limit = max, "Payment exceeds caller limit");
                return Err(X402Error::SpendingLimit(format!(
                    "Payment {} lamports exceeds caller limit of {}",
                    amount, max
                )));
            }
        }
        if let (true, Some(max)) = (is_usdc, caps.max_amount_usdc) {
            let max_raw = usdc_to_raw(max);
            if amount > max_raw {
                warn!(url, requested = amount, limit = max_raw, "USDC payment exceeds caller limit");
                return Err(X402Error::SpendingLimit(format!(
                    "Payment {} USDC units exceeds caller limit of {}",
                    amount, max_raw
                )));
            }
        }

        // Held until the spend is recorded so concurrent requests see it.
        let mut tracker = self.tracker.lock().await;
        let now = self.clock.now();
        if let Err(reason) = tracker.check_limit(domain, amount, &self.limit_for(domain), now.date_naive()) {
            warn!(url, reason = %reason, "x402 spending limit exceeded");
            return Err(X402Error::SpendingLimit(reason));
        }

        if requirement.pay_to.is_empty() {
            error!(url, "402 requirement has no pay_to");
            return Ok(None);
        }

        let order = PaymentOrder {
            pay_to: requirement.pay_to.clone(),
            amount,
            token_mint: token_mint.clone(),
            resource: url.to_string(),
            network: requirement.network.clone(),
        };
        let proof = match self.sender.send_payment(&order).await {
            Ok(proof) => proof,
            Err(denied @ X402Error::SpendingLimit(_)) => {
                warn!(url, reason = %denied, "x402 payment denied by sender policy");
                return Err(denied);
            }
            Err(e) => {
                error!(url, error = %e, "x402 payment failed");
                return Ok(None);
            }
        };

        info!(url, domain, amount, signature = %proof.signature, "x402 payment made");
        tracker.record(SpendRecord {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            url: url.to_string(),
            amount,
            signature: proof.signature.clone(),
            token_mint,
            timestamp: now,
        });

        let header = match PaymentEnvelope::exact(requirement.network.clone(), proof.clone()).to_header() {
            Ok(h) => h,
            Err(e) => {
                error!(url, error = %e, "Cannot encode payment proof");
                return Ok(None);
            }
        };
        Ok(Some(MadePayment {
            signature: proof.signature,
            amount,
            header,
        }))
    }

    /// Everything the client has paid so far.
    pub async fn summary(&self) -> SpendingSummary {
        let tracker = self.tracker.lock().await;
        SpendingSummary {
            total: tracker.total_spend(),
            count: tracker.history().len(),
            history: tracker.history().to_vec(),
        }
    }

    /// Today's spend for `domain`.
    pub async fn daily_spend(&self, domain: &str) -> u64 {
        let today = self.clock.now().date_naive();
        self.tracker.lock().await.daily_spend(domain, today)
    }
}

impl std::fmt::Debug for X402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Client")
            .field("auto_pay", &self.auto_pay)
            .field("max_retries", &self.max_retries)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

fn domain_of(url: &str) -> X402Result<String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| X402Error::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(parsed.host_str().unwrap_or("unknown").to_string())
}

/// Extract the payment requirement from a 402 response.
///
/// Looks at, in order: the `X-PAYMENT-REQUIRED` header (JSON, then base64
/// JSON), the JSON body (`x402`, a bare requirement, or `accepts[0]`), and
/// the `WWW-Authenticate` `x402` parameters.
pub fn parse_payment_requirements(response: &HttpResponse) -> Option<PaymentRequirement> {
    if let Some(header) = response.header(HEADER_PAYMENT_REQUIRED) {
        let decoded = serde_json::from_str::<Value>(header).ok().or_else(|| {
            BASE64
                .decode(header.trim())
                .ok()
                .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        });
        if let Some(req) = decoded.as_ref().and_then(requirement_from_value) {
            return Some(req);
        }
    }

    if let Some(body) = response.json().filter(Value::is_object) {
        if let Some(x402) = body.get("x402") {
            return requirement_from_value(x402);
        }
        if body.get("pay_to").is_some() && body.get("max_amount_required").is_some() {
            return requirement_from_value(&body);
        }
        if let Some(first) = body.get("accepts").and_then(Value::as_array).and_then(|a| a.first()) {
            return requirement_from_value(first);
        }
    }

    let www = response.header(HEADER_WWW_AUTHENTICATE)?;
    if !www.to_ascii_lowercase().contains("x402") {
        return None;
    }
    let params = parse_auth_params(www);
    let pay_to = params.get("pay_to")?;
    debug!(pay_to = %pay_to, "Requirement from WWW-Authenticate");
    Some(PaymentRequirement {
        scheme: SCHEME_EXACT.to_string(),
        network: params.get("network").cloned().unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        max_amount_required: params.get("amount").cloned().unwrap_or_else(|| "0".to_string()),
        resource: String::new(),
        description: String::new(),
        pay_to: pay_to.clone(),
        required_deadline_seconds: DEFAULT_DEADLINE_SECONDS,
        extra: PaymentExtra::default(),
    })
}

/// `key="value"` pairs from an auth header, keys lowercased.
fn parse_auth_params(header: &str) -> HashMap<String, String> {
    header
        .split(',')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| {
            // The first pair carries the scheme: `x402 pay_to`.
            let key = k.trim().rsplit(' ').next().unwrap_or("").to_ascii_lowercase();
            (key, v.trim().trim_matches('"').to_string())
        })
        .collect()
}

/// Lenient requirement read: amounts may be numbers, missing fields default.
fn requirement_from_value(value: &Value) -> Option<PaymentRequirement> {
    let obj = value.as_object()?;
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    let amount = match obj.get("max_amount_required") {
        Some(Value::String(s)) => s.clone(),
        Some(v) => as_u64(v).map(|n| n.to_string()).unwrap_or_else(|| "0".to_string()),
        None => "0".to_string(),
    };
    let extra = obj
        .get("extra")
        .and_then(|e| serde_json::from_value::<PaymentExtra>(e.clone()).ok())
        .unwrap_or_default();
    Some(PaymentRequirement {
        scheme: text("scheme").unwrap_or_else(|| SCHEME_EXACT.to_string()),
        network: text("network").unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        max_amount_required: amount,
        resource: text("resource").unwrap_or_default(),
        description: text("description").unwrap_or_default(),
        pay_to: text("pay_to").unwrap_or_default(),
        required_deadline_seconds: obj
            .get("required_deadline_seconds")
            .and_then(as_u64)
            .unwrap_or(DEFAULT_DEADLINE_SECONDS),
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response_402(headers: Vec<(&str, &str)>, body: &str) -> HttpResponse {
        HttpResponse {
            status: 402,
            headers: headers.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_header_json_and_base64() {
        let json = r#"{"scheme":"exact","network":"solana-devnet","max_amount_required":"500","pay_to":"abc"}"#;
        let req = parse_payment_requirements(&response_402(vec![("x-payment-required", json)], "")).unwrap();
        assert_eq!(req.pay_to, "abc");
        assert_eq!(req.max_amount_required, "500");
        assert_eq!(req.network, "solana-devnet");

        let encoded = BASE64.encode(json);
        let req = parse_payment_requirements(&response_402(vec![("X-PAYMENT-REQUIRED", &encoded)], "")).unwrap();
        assert_eq!(req.pay_to, "abc");
    }

    #[test]
    fn test_parse_body_forms() {
        let nested = r#"{"error":"Payment Required","x402":{"pay_to":"a","max_amount_required":7}}"#;
        assert_eq!(parse_payment_requirements(&response_402(vec![], nested)).unwrap().max_amount_required, "7");

        let bare = r#"{"pay_to":"b","max_amount_required":"9"}"#;
        assert_eq!(parse_payment_requirements(&response_402(vec![], bare)).unwrap().pay_to, "b");

        let accepts = r#"{"accepts":[{"pay_to":"c","max_amount_required":"1"},{"pay_to":"d"}]}"#;
        assert_eq!(parse_payment_requirements(&response_402(vec![], accepts)).unwrap().pay_to, "c");
    }

    #[test]
    fn test_parse_www_authenticate() {
        let www = r#"x402 pay_to="payee", amount="1500", network="solana-devnet""#;
        let req = parse_payment_requirements(&response_402(vec![("WWW-Authenticate", www)], "not json")).unwrap();
        assert_eq!(req.pay_to, "payee");
        assert_eq!(req.max_amount_required, "1500");
        assert_eq!(req.network, "solana-devnet");

        let basic = r#"Basic realm="x""#;
        assert!(parse_payment_requirements(&response_402(vec![("WWW-Authenticate", basic)], "")).is_none());
    }

    #[test]
    fn test_header_wins_over_body() {
        let header = r#"{"pay_to":"from-header","max_amount_required":"1"}"#;
        let body = r#"{"x402":{"pay_to":"from-body","max_amount_required":"1"}}"#;
        let req = parse_payment_requirements(&response_402(vec![("X-PAYMENT-REQUIRED", header)], body)).unwrap();
        assert_eq!(req.pay_to, "from-header");
    }

    #[test]
    fn test_tracker_limits() {
        let day = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let mut tracker = SpendingTracker::new();
        let limit = SpendingLimit {
            max_per_request_lamports: Some(1_000),
            max_daily_lamports: Some(1_500),
        };
        assert!(tracker.check_limit("api.example.com", 1_001, &limit, day.date_naive()).is_err());
        assert!(tracker.check_limit("api.example.com", 1_000, &limit, day.date_naive()).is_ok());

        tracker.record(SpendRecord {
            id: Uuid::new_v4(),
            domain: "api.example.com".into(),
            url: "https://api.example.com/x".into(),
            amount: 1_000,
            signature: "sig".into(),
            token_mint: None,
            timestamp: day,
        });
        let err = tracker.check_limit("api.example.com", 600, &limit, day.date_naive()).unwrap_err();
        assert!(err.contains("1600"));
        assert!(tracker.check_limit("other.com", 600, &limit, day.date_naive()).is_ok());

        let tomorrow = (day + chrono::Duration::days(1)).date_naive();
        assert!(tracker.check_limit("api.example.com", 600, &limit, tomorrow).is_ok());
        assert_eq!(tracker.total_spend(), 1_000);
    }

    #[test]
    fn test_request_headers_replace() {
        let mut req = HttpRequest::new("GET", "https://x").with_header("x-payment", "old");
        req.set_header("X-PAYMENT", "new");
        assert_eq!(req.headers, vec![("X-PAYMENT".to_string(), "new".to_string())]);
        assert!(!req.sends_body());
        assert!(HttpRequest::new("post", "https://x").sends_body());
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://api.example.com:8443/path").unwrap(), "api.example.com");
        assert!(matches!(domain_of("not a url"), Err(X402Error::InvalidUrl { .. })));
    }
}
