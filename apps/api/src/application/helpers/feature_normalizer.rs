//! Turns a plan's stored `features` JSON into a [`FeatureBag`].
//!
//! Total: any input yields a bag. Missing or malformed entries fall back to
//! the default bag field by field, and flags are only enabled by a JSON `true`.

use ledgerline_types::{FeatureBag, FeatureKey, UNLIMITED};
use serde_json::Value;
use strum::IntoEnumIterator;
use uuid::Uuid;

const MAX_JSON_LOG_LEN: usize = 200;

const LIMIT_KEYS: [&str; 2] = ["maxTransactions", "maxAccounts"];

pub fn normalize_features(raw: &Value, plan_id: Uuid) -> FeatureBag {
    let defaults = FeatureBag::default();

    // SQL NULL: plan has no features configured, no warning
    if raw.is_null() {
        return defaults;
    }

    let Some(obj) = raw.as_object() else {
        tracing::warn!(
            plan_id = %plan_id,
            raw_json = %truncate(raw),
            "Plan features are not a JSON object, using default features"
        );
        return defaults;
    };

    let mut bag = defaults;
    for key in FeatureKey::iter() {
        match obj.get(key.as_ref()) {
            None | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => bag = bag.with_flag(key, true),
            Some(other) => {
                tracing::warn!(
                    plan_id = %plan_id,
                    feature = %key,
                    value = %other,
                    "Non-boolean feature flag treated as disabled"
                );
            }
        }
    }

    bag.max_transactions = normalize_limit(
        obj.get("maxTransactions"),
        defaults.max_transactions,
        "maxTransactions",
        plan_id,
    );
    bag.max_accounts = normalize_limit(
        obj.get("maxAccounts"),
        defaults.max_accounts,
        "maxAccounts",
        plan_id,
    );

    let unknown: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !LIMIT_KEYS.contains(k) && k.parse::<FeatureKey>().is_err())
        .collect();
    if !unknown.is_empty() {
        tracing::debug!(plan_id = %plan_id, keys = ?unknown, "Ignoring unknown plan feature keys");
    }

    bag
}

/// Accepts a non-negative integer or `-1`. Anything else becomes `default`.
fn normalize_limit(value: Option<&Value>, default: i64, field: &str, plan_id: Uuid) -> i64 {
    let Some(value) = value else {
        return default;
    };
    match value.as_i64() {
        Some(n) if n >= 0 || n == UNLIMITED => n,
        _ => {
            tracing::warn!(
                plan_id = %plan_id,
                field = field,
                value = %value,
                "Invalid plan limit, using default"
            );
            default
        }
    }
}

fn truncate(json: &Value) -> String {
    let raw_str = json.to_string();
    if raw_str.len() > MAX_JSON_LOG_LEN {
        let mut end = MAX_JSON_LOG_LEN;
        while !raw_str.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw_str[..end])
    } else {
        raw_str
    }
}
