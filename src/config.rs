//! Pipeline thresholds and budgets.
//!
//! Every threshold the workflow engine and lifecycle poller consult lives in
//! [`PipelineConfig`]. Values are bounds-checked on every change and after
//! deserialisation, so a config that exists is a config that is valid.

use crate::deal::domain::TaxRate;
use crate::task::domain::AgentRole;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TAX_RATE_BASIS_POINTS: u32 = 2_400;

/// Invalid configuration value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting is outside its accepted range.
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// Offers could never be drafted within the round budget.
    #[error(
        "min_replies_before_offer ({min_replies}) exceeds max_negotiation_rounds ({max_rounds})"
    )]
    OfferGateBeyondRoundBudget {
        /// Configured reply gate.
        min_replies: u32,
        /// Configured round budget.
        max_rounds: u32,
    },

    /// Unclaimed tasks must be detected before crashed ones.
    #[error(
        "pending_task_timeout_minutes ({pending}) must be below \
         processing_task_timeout_minutes ({processing})"
    )]
    PendingTimeoutNotBelowProcessing {
        /// Pending timeout in minutes.
        pending: u32,
        /// Processing timeout in minutes.
        processing: u32,
    },

    /// The role cannot be auto-retried.
    #[error("role {0} performs non-idempotent work and cannot be auto-retried")]
    NonIdempotentRole(AgentRole),
}

/// Thresholds for negotiation, follow-ups, reopening and task recovery.
///
/// # Examples
///
/// ```
/// use mercator::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.max_negotiation_rounds(), 5);
///
/// let patient = config.with_stale_days(14).expect("14 days is within bounds");
/// assert_eq!(patient.stale_days(), 14);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPipelineConfig", into = "RawPipelineConfig")]
pub struct PipelineConfig {
    max_negotiation_rounds: u32,
    min_replies_before_offer: u32,
    tax_rate: TaxRate,
    stale_days: u32,
    max_follow_up_attempts: u32,
    reopen_days: u32,
    satisfaction_days: u32,
    research_interval_hours: u32,
    research_run_timeout_hours: u32,
    pending_task_timeout_minutes: u32,
    processing_task_timeout_minutes: u32,
    idempotent_roles: Vec<AgentRole>,
    max_task_recoveries: u32,
    early_stage_nudges: bool,
    poll_interval_seconds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_negotiation_rounds: 5,
            min_replies_before_offer: 2,
            tax_rate: TaxRate::saturating_from_basis_points(DEFAULT_TAX_RATE_BASIS_POINTS),
            stale_days: 7,
            max_follow_up_attempts: 3,
            reopen_days: 90,
            satisfaction_days: 30,
            research_interval_hours: 22,
            research_run_timeout_hours: 6,
            pending_task_timeout_minutes: 5,
            processing_task_timeout_minutes: 10,
            idempotent_roles: vec![AgentRole::Notification],
            max_task_recoveries: 3,
            early_stage_nudges: false,
            poll_interval_seconds: 60,
        }
    }
}

macro_rules! bounded_setter {
    ($(#[$doc:meta])* $setter:ident, $field:ident, $min:expr, $max:expr) => {
        $(#[$doc])*
        ///
        /// # Errors
        ///
        /// Returns [`ConfigError`] when the value is out of range or breaks a
        /// cross-field constraint.
        pub fn $setter(mut self, value: u32) -> Result<Self, ConfigError> {
            check_range(stringify!($field), value, $min, $max)?;
            self.$field = value;
            self.validate()?;
            Ok(self)
        }
    };
}

impl PipelineConfig {
    bounded_setter!(
        /// Sets the negotiation round budget.
        with_max_negotiation_rounds, max_negotiation_rounds, 1, 20
    );
    bounded_setter!(
        /// Sets how many replies must be processed before pricing may be disclosed.
        with_min_replies_before_offer, min_replies_before_offer, 0, 20
    );
    bounded_setter!(
        /// Sets the days without activity before an offer counts as stale.
        with_stale_days, stale_days, 1, 90
    );
    bounded_setter!(
        /// Sets the follow-up budget per deal.
        with_max_follow_up_attempts, max_follow_up_attempts, 1, 10
    );
    bounded_setter!(
        /// Sets the days after losing a deal before it is reopened.
        with_reopen_days, reopen_days, 1, 730
    );
    bounded_setter!(
        /// Sets the days after winning a deal before the satisfaction check.
        with_satisfaction_days, satisfaction_days, 1, 365
    );
    bounded_setter!(
        /// Sets the minimum spacing between research runs.
        with_research_interval_hours, research_interval_hours, 1, 24
    );
    bounded_setter!(
        /// Sets how long a running research run blocks new runs.
        with_research_run_timeout_hours, research_run_timeout_hours, 1, 24
    );
    bounded_setter!(
        /// Sets the age at which an unclaimed task is stale.
        with_pending_task_timeout_minutes, pending_task_timeout_minutes, 1, 1440
    );
    bounded_setter!(
        /// Sets the age at which a processing task is presumed crashed.
        with_processing_task_timeout_minutes, processing_task_timeout_minutes, 1, 1440
    );
    bounded_setter!(
        /// Sets how many times one task lineage may be auto-retried.
        with_max_task_recoveries, max_task_recoveries, 0, 10
    );
    bounded_setter!(
        /// Sets the poller interval.
        with_poll_interval_seconds, poll_interval_seconds, 5, 3600
    );

    /// Sets the tax rate applied to offers.
    #[must_use]
    pub const fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Replaces the roles whose stale tasks are retried automatically.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonIdempotentRole`] when the list contains
    /// [`AgentRole::Accounting`].
    pub fn with_idempotent_roles(
        mut self,
        roles: impl IntoIterator<Item = AgentRole>,
    ) -> Result<Self, ConfigError> {
        let mut collected: Vec<AgentRole> = roles.into_iter().collect();
        collected.sort();
        collected.dedup();
        self.idempotent_roles = collected;
        self.validate()?;
        Ok(self)
    }

    /// Enables or disables nudges for quiet early-stage deals.
    #[must_use]
    pub const fn with_early_stage_nudges(mut self, enabled: bool) -> Self {
        self.early_stage_nudges = enabled;
        self
    }

    /// Checks every bound and cross-field constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_negotiation_rounds", self.max_negotiation_rounds, 1, 20)?;
        check_range("stale_days", self.stale_days, 1, 90)?;
        check_range("max_follow_up_attempts", self.max_follow_up_attempts, 1, 10)?;
        check_range("reopen_days", self.reopen_days, 1, 730)?;
        check_range("satisfaction_days", self.satisfaction_days, 1, 365)?;
        check_range("research_interval_hours", self.research_interval_hours, 1, 24)?;
        check_range("research_run_timeout_hours", self.research_run_timeout_hours, 1, 24)?;
        check_range("pending_task_timeout_minutes", self.pending_task_timeout_minutes, 1, 1440)?;
        check_range(
            "processing_task_timeout_minutes",
            self.processing_task_timeout_minutes,
            1,
            1440,
        )?;
        check_range("max_task_recoveries", self.max_task_recoveries, 0, 10)?;
        check_range("poll_interval_seconds", self.poll_interval_seconds, 5, 3600)?;

        if self.min_replies_before_offer > self.max_negotiation_rounds {
            return Err(ConfigError::OfferGateBeyondRoundBudget {
                min_replies: self.min_replies_before_offer,
                max_rounds: self.max_negotiation_rounds,
            });
        }
        if self.pending_task_timeout_minutes >= self.processing_task_timeout_minutes {
            return Err(ConfigError::PendingTimeoutNotBelowProcessing {
                pending: self.pending_task_timeout_minutes,
                processing: self.processing_task_timeout_minutes,
            });
        }
        if self.idempotent_roles.contains(&AgentRole::Accounting) {
            return Err(ConfigError::NonIdempotentRole(AgentRole::Accounting));
        }
        Ok(())
    }

    /// Returns the negotiation round budget.
    #[must_use]
    pub const fn max_negotiation_rounds(&self) -> u32 {
        self.max_negotiation_rounds
    }

    /// Returns the reply gate for pricing disclosure.
    #[must_use]
    pub const fn min_replies_before_offer(&self) -> u32 {
        self.min_replies_before_offer
    }

    /// Returns the tax rate.
    #[must_use]
    pub const fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Returns the stale threshold in days.
    #[must_use]
    pub const fn stale_days(&self) -> u32 {
        self.stale_days
    }

    /// Returns the follow-up budget.
    #[must_use]
    pub const fn max_follow_up_attempts(&self) -> u32 {
        self.max_follow_up_attempts
    }

    /// Returns the reopening delay in days.
    #[must_use]
    pub const fn reopen_days(&self) -> u32 {
        self.reopen_days
    }

    /// Returns the satisfaction delay in days.
    #[must_use]
    pub const fn satisfaction_days(&self) -> u32 {
        self.satisfaction_days
    }

    /// Returns the auto-retry budget per task lineage.
    #[must_use]
    pub const fn max_task_recoveries(&self) -> u32 {
        self.max_task_recoveries
    }

    /// Returns whether early-stage nudges are enabled.
    #[must_use]
    pub const fn early_stage_nudges(&self) -> bool {
        self.early_stage_nudges
    }

    /// Returns whether stale tasks for `role` may be retried automatically.
    #[must_use]
    pub fn is_idempotent(&self, role: AgentRole) -> bool {
        self.idempotent_roles.contains(&role)
    }

    /// Returns the roles whose stale tasks are retried automatically.
    #[must_use]
    pub fn idempotent_roles(&self) -> &[AgentRole] {
        &self.idempotent_roles
    }

    /// Returns the offer staleness threshold.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::days(i64::from(self.stale_days))
    }

    /// Returns the early-stage silence threshold (twice the stale threshold).
    #[must_use]
    pub fn silence_after(&self) -> Duration {
        Duration::days(i64::from(self.stale_days).saturating_mul(2))
    }

    /// Returns the reopening delay.
    #[must_use]
    pub fn reopen_after(&self) -> Duration {
        Duration::days(i64::from(self.reopen_days))
    }

    /// Returns the satisfaction delay.
    #[must_use]
    pub fn satisfaction_after(&self) -> Duration {
        Duration::days(i64::from(self.satisfaction_days))
    }

    /// Returns the minimum spacing between research runs.
    #[must_use]
    pub fn research_interval(&self) -> Duration {
        Duration::hours(i64::from(self.research_interval_hours))
    }

    /// Returns how long a running research run blocks new runs.
    #[must_use]
    pub fn research_run_timeout(&self) -> Duration {
        Duration::hours(i64::from(self.research_run_timeout_hours))
    }

    /// Returns the age at which an unclaimed task is stale.
    #[must_use]
    pub fn pending_task_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.pending_task_timeout_minutes))
    }

    /// Returns the age at which a processing task is presumed crashed.
    #[must_use]
    pub fn processing_task_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.processing_task_timeout_minutes))
    }

    /// Returns the poller interval.
    #[must_use]
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.poll_interval_seconds))
    }
}

const fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field,
        value,
        min,
        max,
    })
}

/// Serialised form; every field falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPipelineConfig {
    max_negotiation_rounds: u32,
    min_replies_before_offer: u32,
    tax_rate: TaxRate,
    stale_days: u32,
    max_follow_up_attempts: u32,
    reopen_days: u32,
    satisfaction_days: u32,
    research_interval_hours: u32,
    research_run_timeout_hours: u32,
    pending_task_timeout_minutes: u32,
    processing_task_timeout_minutes: u32,
    idempotent_roles: Vec<AgentRole>,
    max_task_recoveries: u32,
    early_stage_nudges: bool,
    poll_interval_seconds: u32,
}

impl Default for RawPipelineConfig {
    fn default() -> Self {
        PipelineConfig::default().into()
    }
}

impl From<PipelineConfig> for RawPipelineConfig {
    fn from(config: PipelineConfig) -> Self {
        Self {
            max_negotiation_rounds: config.max_negotiation_rounds,
            min_replies_before_offer: config.min_replies_before_offer,
            tax_rate: config.tax_rate,
            stale_days: config.stale_days,
            max_follow_up_attempts: config.max_follow_up_attempts,
            reopen_days: config.reopen_days,
            satisfaction_days: config.satisfaction_days,
            research_interval_hours: config.research_interval_hours,
            research_run_timeout_hours: config.research_run_timeout_hours,
            pending_task_timeout_minutes: config.pending_task_timeout_minutes,
            processing_task_timeout_minutes: config.processing_task_timeout_minutes,
            idempotent_roles: config.idempotent_roles,
            max_task_recoveries: config.max_task_recoveries,
            early_stage_nudges: config.early_stage_nudges,
            poll_interval_seconds: config.poll_interval_seconds,
        }
    }
}

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPipelineConfig) -> Result<Self, Self::Error> {
        let config = Self {
            max_negotiation_rounds: raw.max_negotiation_rounds,
            min_replies_before_offer: raw.min_replies_before_offer,
            tax_rate: raw.tax_rate,
            stale_days: raw.stale_days,
            max_follow_up_attempts: raw.max_follow_up_attempts,
            reopen_days: raw.reopen_days,
            satisfaction_days: raw.satisfaction_days,
            research_interval_hours: raw.research_interval_hours,
            research_run_timeout_hours: raw.research_run_timeout_hours,
            pending_task_timeout_minutes: raw.pending_task_timeout_minutes,
            processing_task_timeout_minutes: raw.processing_task_timeout_minutes,
            idempotent_roles: raw.idempotent_roles,
            max_task_recoveries: raw.max_task_recoveries,
            early_stage_nudges: raw.early_stage_nudges,
            poll_interval_seconds: raw.poll_interval_seconds,
        };
        config.validate()?;
        Ok(config)
    }
}
