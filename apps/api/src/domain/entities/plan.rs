use chrono::{DateTime, Utc};
use ledgerline_types::FeatureBag;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plan row as read from the store, before its feature bag is validated.
#[derive(Debug, Clone)]
pub struct RawPlan {
    pub id: Uuid,
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub features: serde_json::Value,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id_monthly: Option<String>,
    pub stripe_price_id_yearly: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A plan definition with a canonical feature bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    /// Price in minor units.
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub features: FeatureBag,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id_monthly: Option<String>,
    pub stripe_price_id_yearly: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn from_raw(raw: RawPlan, features: FeatureBag) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            price_monthly: raw.price_monthly,
            price_yearly: raw.price_yearly,
            features,
            stripe_product_id: raw.stripe_product_id,
            stripe_price_id_monthly: raw.stripe_price_id_monthly,
            stripe_price_id_yearly: raw.stripe_price_id_yearly,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}
