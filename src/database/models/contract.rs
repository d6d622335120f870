use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::tenant::TenantStatus;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

string_enum! {
    /// Lease lifecycle. `Ended` and `Terminated` are terminal unless a
    /// terminated lease is explicitly restarted.
    ContractStatus {
        Draft => "draft",
        Available => "available",
        Active => "active",
        EndingSoon => "ending_soon",
        Ended => "ended",
        Terminated => "terminated",
    }
}

impl ContractStatus {
    /// Statuses that hold a listing: at most one contract per listing may be in one of these.
    pub const OPEN: [ContractStatus; 4] = [
        ContractStatus::Draft,
        ContractStatus::Available,
        ContractStatus::Active,
        ContractStatus::EndingSoon,
    ];

    /// Statuses that hold a tenant: at most one contract per tenant may be in one of these.
    pub const ACTIVE_LIKE: [ContractStatus; 2] = [ContractStatus::Active, ContractStatus::EndingSoon];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }

    pub fn is_active_like(self) -> bool {
        Self::ACTIVE_LIKE.contains(&self)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ContractStatus::Ended | ContractStatus::Terminated)
    }

    /// Tenant status mirrored from a linked contract.
    pub fn tenant_status(self) -> TenantStatus {
        match self {
            ContractStatus::Active => TenantStatus::Active,
            ContractStatus::EndingSoon => TenantStatus::EndingSoon,
            ContractStatus::Ended | ContractStatus::Terminated => TenantStatus::Ended,
            ContractStatus::Draft | ContractStatus::Available => TenantStatus::Available,
        }
    }
}

impl Default for ContractStatus {
    fn default() -> Self {
        ContractStatus::Draft
    }
}

string_enum! {
    PaymentFrequency {
        Weekly => "weekly",
        Fortnightly => "fortnightly",
        Monthly => "monthly",
    }
}

impl PaymentFrequency {
    /// Billing cycle length in days; months are approximated as 30 days.
    pub fn cycle_days(self) -> i64 {
        match self {
            PaymentFrequency::Weekly => 7,
            PaymentFrequency::Fortnightly => 14,
            PaymentFrequency::Monthly => 30,
        }
    }
}

impl Default for PaymentFrequency {
    fn default() -> Self {
        PaymentFrequency::Weekly
    }
}

string_enum! {
    DocumentType {
        Contract => "contract",
        Inspection => "inspection",
        Addendum => "addendum",
        Notice => "notice",
        Receipt => "receipt",
        Other => "other",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub name: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractTerms {
    pub pets_allowed: bool,
    pub smoking_allowed: bool,
    pub parking_spaces: i32,
    pub special_conditions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub signed_date: Option<DateTime<Utc>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub notice_period_days: i32,
    pub weekly_rent: Decimal,
    pub bond_amount: Decimal,
    pub bond_paid: bool,
    pub payment_frequency: PaymentFrequency,
    pub bills_included: bool,
    pub status: ContractStatus,
    pub termination_reason: Option<String>,
    pub termination_date: Option<DateTime<Utc>>,
    pub documents: Vec<ContractDocument>,
    pub terms: ContractTerms,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Whole days left on the lease, rounded up. Zero for anything not active-like,
    /// and never negative.
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.status.is_active_like() {
            return 0;
        }
        let millis = (self.end_date - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }

    pub fn days_remaining(&self) -> i64 {
        self.days_remaining_at(Utc::now())
    }

    pub fn is_ending_soon_at(&self, now: DateTime<Utc>, threshold_days: i64) -> bool {
        let days = self.days_remaining_at(now);
        days > 0 && days <= threshold_days
    }

    /// Save-time status recomputation. An active lease inside the threshold becomes
    /// `ending_soon`; an active-like lease with no days left becomes `ended`.
    /// Returns the new status when it changed.
    pub fn refresh_status_at(&mut self, now: DateTime<Utc>, threshold_days: i64) -> Option<ContractStatus> {
        if !self.status.is_active_like() {
            return None;
        }
        let days = self.days_remaining_at(now);
        let next = if days <= 0 {
            ContractStatus::Ended
        } else if days <= threshold_days && self.status == ContractStatus::Active {
            ContractStatus::EndingSoon
        } else {
            return None;
        };
        if next.is_closed() && self.termination_date.is_none() {
            self.termination_date = Some(now);
        }
        self.status = next;
        Some(next)
    }

    /// Lease length, used when rolling a contract over into a renewal draft.
    pub fn term_length(&self) -> Duration {
        self.end_date - self.start_date
    }

    /// Days until the next rent payment falls due, counted in whole billing
    /// cycles from the lease start.
    pub fn days_until_next_payment_at(&self, now: DateTime<Utc>) -> i64 {
        let cycle = self.payment_frequency.cycle_days();
        let since_start = (now - self.start_date).num_days();
        cycle - since_start.rem_euclid(cycle)
    }

    /// Applies the contract-local half of a transition plan.
    pub fn apply_plan(&mut self, plan: &TransitionPlan, now: DateTime<Utc>) {
        self.status = plan.to;
        match plan.termination {
            TerminationEffect::Keep => {}
            TerminationEffect::Stamp => {
                self.termination_date = Some(now);
            }
            TerminationEffect::Clear => {
                self.termination_date = None;
                self.termination_reason = None;
            }
        }
    }
}

/// Cross-record side effect of a contract status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEffect {
    /// Nothing outside the contract changes.
    None,
    /// Listing becomes reserved for the tenant; tenant points back at the contract.
    Link,
    /// Listing returns to published; tenant is detached and marked ended.
    Release,
    /// Tenant status follows the contract between active and ending_soon.
    Mirror,
}

impl LinkEffect {
    /// Reconciles the planned effect with where the save-time refresh left the contract.
    pub fn settle(self, stored: ContractStatus, saved: ContractStatus) -> LinkEffect {
        match self {
            LinkEffect::Link if saved.is_closed() => LinkEffect::None,
            LinkEffect::Link | LinkEffect::Release => self,
            LinkEffect::None | LinkEffect::Mirror => {
                if stored.is_active_like() && saved.is_closed() {
                    LinkEffect::Release
                } else if stored.is_active_like() && saved.is_active_like() && stored != saved {
                    LinkEffect::Mirror
                } else {
                    LinkEffect::None
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationEffect {
    Keep,
    Stamp,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: ContractStatus,
    pub to: ContractStatus,
    pub links: LinkEffect,
    pub termination: TerminationEffect,
    /// The contract leaves a closed status and must re-check listing and tenant conflicts.
    pub reopens: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A tenant must be assigned before the contract can be activated")]
    TenantRequired,
    #[error("Only terminated contracts can be restarted")]
    NotTerminated,
    #[error("Contract is already {0}")]
    AlreadyClosed(ContractStatus),
    #[error("Contract is {0} and cannot change status; only terminated contracts can be restarted")]
    Closed(ContractStatus),
    #[error("Only an active contract can become ending_soon")]
    NotActive,
}

impl TransitionPlan {
    /// Validates a requested status change and describes its consequences.
    /// Performs no writes.
    pub fn plan(from: ContractStatus, to: ContractStatus, has_tenant: bool) -> Result<Self, TransitionError> {
        use ContractStatus::*;

        let mut plan = TransitionPlan {
            from,
            to,
            links: LinkEffect::None,
            termination: TerminationEffect::Keep,
            reopens: from.is_closed() && to.is_open(),
        };

        if from == to {
            plan.reopens = false;
            return Ok(plan);
        }

        match (from, to) {
            (Terminated, Active) => {
                plan.termination = TerminationEffect::Clear;
                if has_tenant {
                    plan.links = LinkEffect::Link;
                }
            }
            (Ended | Terminated, _) => return Err(TransitionError::Closed(from)),
            (Draft | Available, Active) => {
                if !has_tenant {
                    return Err(TransitionError::TenantRequired);
                }
                plan.links = LinkEffect::Link;
            }
            (Active, EndingSoon) | (EndingSoon, Active) => {
                plan.links = LinkEffect::Mirror;
            }
            // ending_soon only comes from an active lease running down
            (_, EndingSoon) => return Err(TransitionError::NotActive),
            (Active | EndingSoon, Ended | Terminated) => {
                plan.links = LinkEffect::Release;
                plan.termination = TerminationEffect::Stamp;
            }
            (_, Ended | Terminated) => {
                plan.termination = TerminationEffect::Stamp;
            }
            _ => {}
        }

        Ok(plan)
    }

    /// Restart is only defined from `terminated`.
    pub fn restart(from: ContractStatus, has_tenant: bool) -> Result<Self, TransitionError> {
        if from != ContractStatus::Terminated {
            return Err(TransitionError::NotTerminated);
        }
        Self::plan(from, ContractStatus::Active, has_tenant)
    }

    /// Early termination from any open status.
    pub fn terminate(from: ContractStatus) -> Result<Self, TransitionError> {
        if from.is_closed() {
            return Err(TransitionError::AlreadyClosed(from));
        }
        Self::plan(from, ContractStatus::Terminated, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(status: ContractStatus, end_in: Duration) -> Contract {
        let now = Utc::now();
        Contract {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            owner_id: Uuid::new_v4(),
            signed_date: Some(now),
            start_date: now - Duration::days(180),
            end_date: now + end_in,
            notice_period_days: 14,
            weekly_rent: Decimal::new(350, 0),
            bond_amount: Decimal::new(1400, 0),
            bond_paid: false,
            payment_frequency: PaymentFrequency::Weekly,
            bills_included: true,
            status,
            termination_reason: None,
            termination_date: None,
            documents: vec![],
            terms: ContractTerms::default(),
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn days_remaining_rounds_up_and_floors_at_zero() {
        let c = contract(ContractStatus::Active, Duration::days(10));
        let days = c.days_remaining_at(Utc::now());
        assert!((9..=10).contains(&days), "got {}", days);

        let c = contract(ContractStatus::Active, Duration::hours(5));
        assert_eq!(c.days_remaining_at(Utc::now()), 1);

        let c = contract(ContractStatus::Active, -Duration::days(3));
        assert_eq!(c.days_remaining_at(Utc::now()), 0);
    }

    #[test]
    fn days_remaining_is_zero_outside_active_states() {
        for status in [ContractStatus::Draft, ContractStatus::Available, ContractStatus::Terminated] {
            let c = contract(status, Duration::days(90));
            assert_eq!(c.days_remaining_at(Utc::now()), 0);
        }
        let c = contract(ContractStatus::EndingSoon, Duration::days(12));
        assert!(c.days_remaining_at(Utc::now()) > 0);
    }

    #[test]
    fn refresh_downgrades_active_inside_threshold() {
        let mut c = contract(ContractStatus::Active, Duration::days(10));
        assert_eq!(c.refresh_status_at(Utc::now(), 30), Some(ContractStatus::EndingSoon));
        assert_eq!(c.status, ContractStatus::EndingSoon);
        assert!(c.termination_date.is_none());
    }

    #[test]
    fn refresh_leaves_long_leases_alone() {
        let mut c = contract(ContractStatus::Active, Duration::days(120));
        assert_eq!(c.refresh_status_at(Utc::now(), 30), None);
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn refresh_ends_expired_leases() {
        let mut c = contract(ContractStatus::EndingSoon, -Duration::days(1));
        assert_eq!(c.refresh_status_at(Utc::now(), 30), Some(ContractStatus::Ended));
        assert!(c.termination_date.is_some());

        let mut draft = contract(ContractStatus::Draft, -Duration::days(1));
        assert_eq!(draft.refresh_status_at(Utc::now(), 30), None);
    }

    #[test]
    fn activation_requires_tenant() {
        let err = TransitionPlan::plan(ContractStatus::Draft, ContractStatus::Active, false).unwrap_err();
        assert_eq!(err, TransitionError::TenantRequired);

        let plan = TransitionPlan::plan(ContractStatus::Available, ContractStatus::Active, true).unwrap();
        assert_eq!(plan.links, LinkEffect::Link);
        assert!(!plan.reopens);
    }

    #[test]
    fn closing_an_active_lease_releases_links() {
        let plan = TransitionPlan::plan(ContractStatus::Active, ContractStatus::Terminated, true).unwrap();
        assert_eq!(plan.links, LinkEffect::Release);
        assert_eq!(plan.termination, TerminationEffect::Stamp);

        let plan = TransitionPlan::plan(ContractStatus::EndingSoon, ContractStatus::Ended, true).unwrap();
        assert_eq!(plan.links, LinkEffect::Release);
    }

    #[test]
    fn draft_to_available_touches_nothing_else() {
        let plan = TransitionPlan::plan(ContractStatus::Draft, ContractStatus::Available, false).unwrap();
        assert_eq!(plan.links, LinkEffect::None);
        assert_eq!(plan.termination, TerminationEffect::Keep);
    }

    #[test]
    fn every_status_pair_has_a_defined_outcome() {
        use ContractStatus::*;
        use LinkEffect::{Link, Mirror, None as Keep, Release};

        let closed = |from| Err(TransitionError::Closed(from));
        // Rows: from. Columns: to, in ALL order. A tenant is assigned.
        let table: [(ContractStatus, [Result<LinkEffect, TransitionError>; 6]); 6] = [
            (Draft, [Ok(Keep), Ok(Keep), Ok(Link), Err(TransitionError::NotActive), Ok(Keep), Ok(Keep)]),
            (Available, [Ok(Keep), Ok(Keep), Ok(Link), Err(TransitionError::NotActive), Ok(Keep), Ok(Keep)]),
            (Active, [Ok(Keep), Ok(Keep), Ok(Keep), Ok(Mirror), Ok(Release), Ok(Release)]),
            (EndingSoon, [Ok(Keep), Ok(Keep), Ok(Mirror), Ok(Keep), Ok(Release), Ok(Release)]),
            (Ended, [closed(Ended), closed(Ended), closed(Ended), closed(Ended), Ok(Keep), closed(Ended)]),
            (Terminated, [
                closed(Terminated),
                closed(Terminated),
                Ok(Link),
                closed(Terminated),
                closed(Terminated),
                Ok(Keep),
            ]),
        ];

        assert_eq!(ContractStatus::ALL.len(), 6);
        for (from, row) in table {
            for (to, expected) in ContractStatus::ALL.iter().zip(row) {
                let got = TransitionPlan::plan(from, *to, true).map(|p| p.links);
                assert_eq!(got, expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn nothing_reaches_an_active_like_status_without_a_tenant() {
        use ContractStatus::*;
        for from in ContractStatus::ALL.iter().copied() {
            for to in [Active, EndingSoon] {
                let Ok(plan) = TransitionPlan::plan(from, to, false) else {
                    continue;
                };
                // Staying put or moving within active-like states keeps whatever link exists
                let allowed = from == to
                    || (from.is_active_like() && to.is_active_like())
                    || (from == Terminated && to == Active);
                assert!(allowed, "{} -> {} accepted without a tenant", from, to);
                assert_ne!(plan.links, LinkEffect::Link);
            }
        }
    }

    #[test]
    fn closed_contracts_cannot_reopen_except_by_restart() {
        assert_eq!(
            TransitionPlan::plan(ContractStatus::Ended, ContractStatus::Active, true).unwrap_err(),
            TransitionError::Closed(ContractStatus::Ended)
        );
        assert_eq!(
            TransitionPlan::plan(ContractStatus::Terminated, ContractStatus::Draft, false).unwrap_err(),
            TransitionError::Closed(ContractStatus::Terminated)
        );
        assert_eq!(
            TransitionPlan::plan(ContractStatus::Draft, ContractStatus::EndingSoon, true).unwrap_err(),
            TransitionError::NotActive
        );
    }

    #[test]
    fn restart_only_from_terminated() {
        assert_eq!(
            TransitionPlan::restart(ContractStatus::Ended, true).unwrap_err(),
            TransitionError::NotTerminated
        );
        let plan = TransitionPlan::restart(ContractStatus::Terminated, true).unwrap();
        assert_eq!(plan.termination, TerminationEffect::Clear);
        assert_eq!(plan.links, LinkEffect::Link);
        assert!(plan.reopens);

        let plan = TransitionPlan::restart(ContractStatus::Terminated, false).unwrap();
        assert_eq!(plan.links, LinkEffect::None);
    }

    #[test]
    fn terminate_rejects_closed_contracts() {
        assert!(matches!(
            TransitionPlan::terminate(ContractStatus::Ended),
            Err(TransitionError::AlreadyClosed(ContractStatus::Ended))
        ));
        let plan = TransitionPlan::terminate(ContractStatus::Draft).unwrap();
        assert_eq!(plan.links, LinkEffect::None);
        assert_eq!(plan.termination, TerminationEffect::Stamp);
    }

    #[test]
    fn apply_plan_clears_termination_on_restart() {
        let mut c = contract(ContractStatus::Terminated, Duration::days(90));
        c.termination_reason = Some("Moved out".into());
        c.termination_date = Some(Utc::now());
        let plan = TransitionPlan::restart(c.status, true).unwrap();
        c.apply_plan(&plan, Utc::now());
        assert_eq!(c.status, ContractStatus::Active);
        assert!(c.termination_reason.is_none());
        assert!(c.termination_date.is_none());
    }

    #[test]
    fn settle_accounts_for_refresh_outcome() {
        // activation that the refresh immediately expired never links
        assert_eq!(LinkEffect::Link.settle(ContractStatus::Draft, ContractStatus::Ended), LinkEffect::None);
        // a plain field edit that pushed an active lease into its final month
        assert_eq!(LinkEffect::None.settle(ContractStatus::Active, ContractStatus::EndingSoon), LinkEffect::Mirror);
        // a field edit that expired an active lease
        assert_eq!(LinkEffect::None.settle(ContractStatus::Active, ContractStatus::Ended), LinkEffect::Release);
        assert_eq!(LinkEffect::None.settle(ContractStatus::Draft, ContractStatus::Draft), LinkEffect::None);
    }

    #[test]
    fn next_payment_follows_frequency() {
        let now = Utc::now();
        let mut c = contract(ContractStatus::Active, Duration::days(90));
        c.start_date = now - Duration::days(10);
        assert_eq!(c.days_until_next_payment_at(now), 4);
        c.payment_frequency = PaymentFrequency::Fortnightly;
        assert_eq!(c.days_until_next_payment_at(now), 4);
        c.payment_frequency = PaymentFrequency::Monthly;
        assert_eq!(c.days_until_next_payment_at(now), 20);
    }
}
