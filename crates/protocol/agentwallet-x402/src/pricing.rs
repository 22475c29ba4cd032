//! Pricing rules and route matching.
//!
//! A rule prices one route pattern for one HTTP method (or `*`). When
//! several rules match a request the most specific wins:
//!
//! | Pattern kind            | Score |
//! |-------------------------|-------|
//! | exact path              | 3     |
//! | `^`-prefixed regex      | 2     |
//! | glob (`*`, `?`, `[..]`) | 1     |
//!
//! plus one when the rule names a concrete method. Ties go to the rule
//! configured first.

use agentwallet_types::constants::USDC_DECIMALS;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};
use crate::types::{
    PaymentExtra, PaymentRequirement, DEFAULT_DEADLINE_SECONDS, DEFAULT_NETWORK, SCHEME_EXACT,
};

/// Mainnet USDC mint, quoted in requirements for USDC-priced routes.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// A pricing rule as configured by an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRuleConfig {
    pub route_pattern: String,
    #[serde(default = "wildcard_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_lamports: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usdc: Option<f64>,
    #[serde(default)]
    pub description: String,
    /// Recipient; falls back to the configuration's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_to: Option<String>,
    #[serde(default = "default_deadline")]
    pub max_deadline_seconds: u64,
}

fn wildcard_method() -> String {
    "*".to_string()
}

fn default_deadline() -> u64 {
    DEFAULT_DEADLINE_SECONDS
}

impl PricingRuleConfig {
    /// A rule charging `lamports` for any method on `pattern`.
    pub fn lamports(pattern: impl Into<String>, lamports: u64) -> Self {
        Self {
            route_pattern: pattern.into(),
            method: wildcard_method(),
            price_lamports: Some(lamports),
            price_usdc: None,
            description: String::new(),
            pay_to: None,
            max_deadline_seconds: DEFAULT_DEADLINE_SECONDS,
        }
    }

    /// A rule charging `usdc` (whole dollars) for any method on `pattern`.
    pub fn usdc(pattern: impl Into<String>, usdc: f64) -> Self {
        Self {
            price_lamports: None,
            price_usdc: Some(usdc),
            ..Self::lamports(pattern, 0)
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_pay_to(mut self, pay_to: impl Into<String>) -> Self {
        self.pay_to = Some(pay_to.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How a rule's pattern matches paths.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
    Exact(String),
    Regex(Regex),
    Glob(Regex),
}

impl RouteMatcher {
    /// Compile a pattern: `^`-prefixed patterns are regexes, patterns with
    /// glob metacharacters are globs, anything else matches exactly.
    pub fn compile(pattern: &str) -> X402Result<Self> {
        let invalid = |e: regex::Error| X402Error::InvalidRoute {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        };
        if pattern.starts_with('^') {
            return Regex::new(pattern).map(Self::Regex).map_err(invalid);
        }
        if pattern.contains(['*', '?', '[']) {
            return Regex::new(&glob_to_regex(pattern)).map(Self::Glob).map_err(invalid);
        }
        Ok(Self::Exact(pattern.to_string()))
    }

    /// Path specificity score if `path` matches.
    pub fn score(&self, path: &str) -> Option<u8> {
        match self {
            Self::Exact(p) => (p == path).then_some(3),
            Self::Regex(re) => re.is_match(path).then_some(2),
            Self::Glob(re) => re.is_match(path).then_some(1),
        }
    }
}

/// Translate a shell glob into an anchored regex.
///
/// `*` matches any run of characters (including `/`), `?` any single
/// character, and `[...]` a character class, negated with a leading `!`. An
/// unterminated `[` is literal.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match chars[i + 1..].iter().skip(1).position(|&c| c == ']') {
                Some(offset) => {
                    let end = i + 2 + offset;
                    let mut class: String = chars[i + 1..end].iter().collect();
                    if let Some(rest) = class.strip_prefix('!') {
                        class = format!("^{}", rest);
                    }
                    out.push('[');
                    out.push_str(&class.replace('\\', "\\\\"));
                    out.push(']');
                    i = end;
                }
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

/// A compiled pricing rule.
#[derive(Debug, Clone)]
pub struct PricingRule {
    pub route_pattern: String,
    /// Uppercased method, or `*`.
    pub method: String,
    pub price_lamports: Option<u64>,
    pub price_usdc: Option<f64>,
    pub description: String,
    pub pay_to: String,
    pub max_deadline_seconds: u64,
    matcher: RouteMatcher,
}

impl PricingRule {
    fn compile(config: &PricingRuleConfig, default_pay_to: Option<&str>) -> X402Result<Self> {
        if config.price_lamports.unwrap_or(0) == 0 && config.price_usdc.unwrap_or(0.0) <= 0.0 {
            return Err(X402Error::MissingPrice {
                pattern: config.route_pattern.clone(),
            });
        }
        Ok(Self {
            route_pattern: config.route_pattern.clone(),
            method: config.method.trim().to_ascii_uppercase(),
            price_lamports: config.price_lamports,
            price_usdc: config.price_usdc,
            description: config.description.clone(),
            pay_to: config
                .pay_to
                .clone()
                .or_else(|| default_pay_to.map(str::to_string))
                .unwrap_or_default(),
            max_deadline_seconds: config.max_deadline_seconds,
            matcher: RouteMatcher::compile(&config.route_pattern)?,
        })
    }

    /// Specificity of this rule for a request, if it applies.
    pub fn score(&self, method: &str, path: &str) -> Option<u8> {
        let method_bonus = if self.method == "*" {
            0
        } else if self.method.eq_ignore_ascii_case(method) {
            1
        } else {
            return None;
        };
        self.matcher.score(path).map(|s| s + method_bonus)
    }

    /// Whether the price is in USDC. Lamport prices take precedence.
    pub fn is_usdc(&self) -> bool {
        self.price_lamports.unwrap_or(0) == 0 && self.price_usdc.is_some()
    }

    /// Price in the smallest unit of the quoted asset.
    pub fn amount(&self) -> u64 {
        match (self.price_lamports, self.price_usdc) {
            (Some(lamports), _) if lamports > 0 => lamports,
            (_, Some(usdc)) => usdc_to_raw(usdc),
            _ => 0,
        }
    }

    /// The 402 requirement for a request to `resource`.
    pub fn requirement(&self, network: &str, resource: &str) -> PaymentRequirement {
        let extra = if self.is_usdc() {
            PaymentExtra {
                token_mint: Some(USDC_MINT.to_string()),
                token_symbol: Some("USDC".to_string()),
                decimals: Some(USDC_DECIMALS),
            }
        } else {
            PaymentExtra::default()
        };
        PaymentRequirement {
            scheme: SCHEME_EXACT.to_string(),
            network: network.to_string(),
            max_amount_required: self.amount().to_string(),
            resource: resource.to_string(),
            description: self.description.clone(),
            pay_to: self.pay_to.clone(),
            required_deadline_seconds: self.max_deadline_seconds,
            extra,
        }
    }
}

/// Whole USDC to raw units (6 decimals), rounded to the nearest unit.
pub fn usdc_to_raw(usdc: f64) -> u64 {
    if !usdc.is_finite() || usdc <= 0.0 {
        return 0;
    }
    (usdc * 10f64.powi(USDC_DECIMALS as i32)).round() as u64
}

/// The paywall's pricing table.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub enabled: bool,
    pub network: String,
    pub default_pay_to: Option<String>,
    rules: Vec<PricingRule>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network: DEFAULT_NETWORK.to_string(),
            default_pay_to: None,
            rules: Vec::new(),
        }
    }
}

impl PricingConfig {
    /// Compile a pricing table. Fails on the first invalid rule.
    pub fn new(
        rules: &[PricingRuleConfig],
        enabled: bool,
        network: impl Into<String>,
        default_pay_to: Option<String>,
    ) -> X402Result<Self> {
        let rules = rules
            .iter()
            .map(|r| PricingRule::compile(r, default_pay_to.as_deref()))
            .collect::<X402Result<Vec<_>>>()?;
        Ok(Self {
            enabled,
            network: network.into(),
            default_pay_to,
            rules,
        })
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    /// The most specific rule for a request, if the paywall is enabled.
    pub fn match_route(&self, method: &str, path: &str) -> Option<&PricingRule> {
        if !self.enabled {
            return None;
        }
        let mut best: Option<(u8, &PricingRule)> = None;
        for rule in &self.rules {
            if let Some(score) = rule.score(method, path) {
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, rule));
                }
            }
        }
        best.map(|(_, rule)| rule)
    }
}
