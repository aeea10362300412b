//! Circuit-breaker policy content
//!
//! These types describe *what* a data-plane client should do once a rule
//! is released to it: which callers a rule matches, which destinations it
//! guards, and when to open/recover the breaker. The governance layer
//! stores and copies them verbatim; it never evaluates them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a [`MatchString`] value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Exact,
    Regex,
}

/// A string matcher used for labels and methods
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchString {
    #[serde(default, rename = "type")]
    pub kind: MatchKind,
    pub value: String,
}

impl MatchString {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Exact,
            value: value.into(),
        }
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Regex,
            value: value.into(),
        }
    }
}

/// Caller-side matcher of a [`CbRule`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceMatcher {
    /// Caller service, `*` for any
    #[serde(default)]
    pub service: Option<String>,

    /// Caller namespace, `*` for any
    #[serde(default)]
    pub namespace: Option<String>,

    /// Request label matchers
    #[serde(default)]
    pub labels: BTreeMap<String, MatchString>,
}

/// Granularity at which the breaker trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceLevel {
    Subset,
    #[default]
    Instance,
}

/// Where breaker statistics are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Global,
    #[default]
    Local,
}

/// Which calls an open breaker affects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationScope {
    All,
    #[default]
    Current,
}

/// Error-rate trigger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorRateConfig {
    pub enable: bool,
    /// Minimum requests in the window before the rate is evaluated
    pub request_volume_threshold: u32,
    /// Error percentage (1-100) at which the breaker opens
    pub error_rate_to_open: u32,
}

/// Consecutive-failure trigger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsecutiveErrorConfig {
    pub enable: bool,
    pub consecutive_error_to_open: u32,
}

/// Slow-call trigger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlowRateConfig {
    pub enable: bool,
    /// Calls slower than this are counted as slow
    pub max_rt_ms: u64,
    /// Slow-call percentage (1-100) at which the breaker opens
    pub slow_rate_to_open: u32,
}

/// Trigger conditions of a destination
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CbPolicy {
    #[serde(default)]
    pub error_rate: Option<ErrorRateConfig>,
    #[serde(default)]
    pub consecutive: Option<ConsecutiveErrorConfig>,
    #[serde(default)]
    pub slow_rate: Option<SlowRateConfig>,
}

/// When outlier detection runs against a tripped destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierDetectWhen {
    #[default]
    Never,
    OnRecover,
    Always,
}

/// Half-open / recovery behaviour
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecoverConfig {
    pub sleep_window_secs: u64,
    #[serde(default)]
    pub outlier_detect_when: OutlierDetectWhen,
}

/// Callee-side target of a [`CbRule`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DestinationSet {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub method: Option<MatchString>,
    #[serde(default)]
    pub resource: ResourceLevel,
    #[serde(default, rename = "type")]
    pub kind: DestinationKind,
    #[serde(default)]
    pub scope: DestinationScope,
    #[serde(default)]
    pub policy: CbPolicy,
    #[serde(default)]
    pub recover: RecoverConfig,
}

/// One match + policy pair of an inbound or outbound rule list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CbRule {
    #[serde(default)]
    pub sources: Vec<SourceMatcher>,
    #[serde(default)]
    pub destinations: Vec<DestinationSet>,
}
