//! Record-set reconciliation
//!
//! Decides, for one record, the smallest mutation that makes the remote
//! record set carry the desired address, then brings the TTL in line.
//!
//! ## Decision table
//!
//! | remote set                         | preserve | action                 |
//! |------------------------------------|----------|------------------------|
//! | absent                             | any      | create `[desired]`     |
//! | contains desired, 1 value          | any      | unchanged              |
//! | contains desired, >1 values        | true     | unchanged              |
//! | contains desired, >1 values        | false    | replace with `[desired]` |
//! | lacks desired, >1 values           | true     | append desired         |
//! | anything else                      | any      | replace with `[desired]` |
//!
//! The presence check runs before the preserve/size gate, so a non-preserving
//! run over a multi-value set that already holds the desired value still
//! collapses it with a replace call.
//!
//! Every row except "create" is followed by TTL reconciliation against the
//! TTL reported by the last call made for the record.

use crate::config::RecordType;
use crate::error::Result;
use crate::retry::RetryExecutor;
use crate::traits::{RRSet, Zone, ZoneProvider};
use std::fmt;
use tracing::{debug, info};

/// Value mutation applied to a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// The set did not exist and was created
    Created,
    /// The set already carried the desired value
    Unchanged,
    /// The desired value was added next to the existing ones
    Appended,
    /// The set's values were replaced by the desired value
    Replaced,
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordAction::Created => "created",
            RecordAction::Unchanged => "unchanged",
            RecordAction::Appended => "appended",
            RecordAction::Replaced => "replaced",
        })
    }
}

/// TTL change applied after the value step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlChange {
    /// TTL before the change (`None` = unset)
    pub from: Option<u32>,
    /// TTL after the change
    pub to: u32,
}

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Value mutation
    pub action: RecordAction,
    /// Values held before the mutation (empty when the set was created)
    pub previous_values: Vec<String>,
    /// TTL change, if one was issued
    pub ttl_change: Option<TtlChange>,
}

/// Applies the decision table for one record at a time
pub struct Reconciler<'a> {
    provider: &'a dyn ZoneProvider,
    retry: &'a RetryExecutor,
    preserve_existing: bool,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler
    ///
    /// # Parameters
    ///
    /// - `provider`: zone API
    /// - `retry`: executor wrapping every remote call
    /// - `preserve_existing`: keep extra values of multi-value sets
    pub fn new(
        provider: &'a dyn ZoneProvider,
        retry: &'a RetryExecutor,
        preserve_existing: bool,
    ) -> Self {
        Self {
            provider,
            retry,
            preserve_existing,
        }
    }

    /// Reconcile one (zone, name, type) record set towards `desired`
    ///
    /// `ttl = None` leaves the TTL unmanaged. Any failing call aborts this
    /// record and is returned as-is.
    pub async fn reconcile(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        desired: &str,
        ttl: Option<u32>,
    ) -> Result<ReconcileOutcome> {
        let current = self
            .retry
            .execute("get rrset", |attempt| {
                debug!(zone = %zone.name, record = name, record_type = %record_type, attempt, "API request: get rrset");
                self.provider.get_rrset(zone, name, record_type)
            })
            .await?;

        let values = vec![desired.to_string()];

        let Some(rrset) = current else {
            info!(zone = %zone.name, record = name, record_type = %record_type, ip = desired, ttl = ?ttl, "Record missing; will create");
            self.retry
                .execute("create rrset", |attempt| {
                    debug!(zone = %zone.name, record = name, record_type = %record_type, attempt, "API request: create rrset");
                    self.provider
                        .create_rrset(zone, name, record_type, ttl, &values)
                })
                .await?;
            info!(zone = %zone.name, record = name, ip = desired, "Record created");
            return Ok(ReconcileOutcome {
                action: RecordAction::Created,
                previous_values: Vec::new(),
                ttl_change: None,
            });
        };

        let previous_values: Vec<String> =
            rrset.trimmed_values().into_iter().map(String::from).collect();
        let multi_value = rrset.values.len() > 1;

        if rrset.contains(desired) && (self.preserve_existing || !multi_value) {
            info!(zone = %zone.name, record = name, ip = desired, "Record already up to date");
            let ttl_change = self.ensure_ttl(zone, &rrset, ttl).await?;
            return Ok(ReconcileOutcome {
                action: RecordAction::Unchanged,
                previous_values,
                ttl_change,
            });
        }

        let (action, updated) = if self.preserve_existing && multi_value {
            info!(
                zone = %zone.name,
                record = name,
                record_type = %record_type,
                ip = desired,
                ttl = ?ttl,
                current_values = ?previous_values,
                "Record will append"
            );
            let updated = self
                .retry
                .execute("add rrset records", |attempt| {
                    debug!(zone = %zone.name, record = name, attempt, "API request: add rrset records");
                    self.provider.add_records(&rrset, &values, ttl)
                })
                .await?;
            info!(zone = %zone.name, record = name, ip = desired, "Record appended");
            (RecordAction::Appended, updated)
        } else {
            info!(
                zone = %zone.name,
                record = name,
                record_type = %record_type,
                ip = desired,
                current_values = ?previous_values,
                "Record will update"
            );
            let updated = self
                .retry
                .execute("set rrset records", |attempt| {
                    debug!(zone = %zone.name, record = name, attempt, "API request: set rrset records");
                    self.provider.set_records(&rrset, &values)
                })
                .await?;
            info!(zone = %zone.name, record = name, ip = desired, preserve = self.preserve_existing, "Record updated");
            (RecordAction::Replaced, updated)
        };

        let ttl_change = self.ensure_ttl(zone, &updated, ttl).await?;
        Ok(ReconcileOutcome {
            action,
            previous_values,
            ttl_change,
        })
    }

    async fn ensure_ttl(
        &self,
        zone: &Zone,
        rrset: &RRSet,
        ttl: Option<u32>,
    ) -> Result<Option<TtlChange>> {
        let Some(target) = ttl else {
            return Ok(None);
        };
        if rrset.ttl == Some(target) {
            return Ok(None);
        }

        info!(zone = %zone.name, record = %rrset.name, current_ttl = ?rrset.ttl, target_ttl = target, "Record TTL will change");
        self.retry
            .execute("change rrset ttl", |attempt| {
                debug!(zone = %zone.name, record = %rrset.name, ttl = target, attempt, "API request: change rrset ttl");
                self.provider.change_ttl(rrset, target)
            })
            .await?;
        info!(zone = %zone.name, record = %rrset.name, ttl = target, "Record TTL updated");

        Ok(Some(TtlChange {
            from: rrset.ttl,
            to: target,
        }))
    }
}
