use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Limit value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Canonical feature flags and numeric limits attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBag {
    pub has_investments: bool,
    pub has_household: bool,
    pub has_advanced_reports: bool,
    pub has_csv_import: bool,
    pub has_csv_export: bool,
    pub has_debts: bool,
    pub has_goals: bool,
    pub has_bank_integration: bool,
    /// Monthly transaction cap, `-1` for unlimited.
    pub max_transactions: i64,
    /// Account cap, `-1` for unlimited.
    pub max_accounts: i64,
}

impl FeatureBag {
    pub const DEFAULT_MAX_TRANSACTIONS: i64 = 50;
    pub const DEFAULT_MAX_ACCOUNTS: i64 = 2;

    pub fn has(&self, key: FeatureKey) -> bool {
        match key {
            FeatureKey::HasInvestments => self.has_investments,
            FeatureKey::HasHousehold => self.has_household,
            FeatureKey::HasAdvancedReports => self.has_advanced_reports,
            FeatureKey::HasCsvImport => self.has_csv_import,
            FeatureKey::HasCsvExport => self.has_csv_export,
            FeatureKey::HasDebts => self.has_debts,
            FeatureKey::HasGoals => self.has_goals,
            FeatureKey::HasBankIntegration => self.has_bank_integration,
        }
    }

    pub(crate) fn flag_mut(&mut self, key: FeatureKey) -> &mut bool {
        match key {
            FeatureKey::HasInvestments => &mut self.has_investments,
            FeatureKey::HasHousehold => &mut self.has_household,
            FeatureKey::HasAdvancedReports => &mut self.has_advanced_reports,
            FeatureKey::HasCsvImport => &mut self.has_csv_import,
            FeatureKey::HasCsvExport => &mut self.has_csv_export,
            FeatureKey::HasDebts => &mut self.has_debts,
            FeatureKey::HasGoals => &mut self.has_goals,
            FeatureKey::HasBankIntegration => &mut self.has_bank_integration,
        }
    }

    /// Returns a copy with the given flag set.
    pub fn with_flag(mut self, key: FeatureKey, enabled: bool) -> Self {
        *self.flag_mut(key) = enabled;
        self
    }
}

/// The free-tier bag: every flag off, small nonzero limits.
impl Default for FeatureBag {
    fn default() -> Self {
        Self {
            has_investments: false,
            has_household: false,
            has_advanced_reports: false,
            has_csv_import: false,
            has_csv_export: false,
            has_debts: false,
            has_goals: false,
            has_bank_integration: false,
            max_transactions: Self::DEFAULT_MAX_TRANSACTIONS,
            max_accounts: Self::DEFAULT_MAX_ACCOUNTS,
        }
    }
}

/// Boolean feature flags, named by their wire key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FeatureKey {
    HasInvestments,
    HasHousehold,
    HasAdvancedReports,
    HasCsvImport,
    HasCsvExport,
    HasDebts,
    HasGoals,
    HasBankIntegration,
}
