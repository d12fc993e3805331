//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Running one sync cycle immediately, then one per interval
//! - Resolving the public address once per provider URL per cycle
//! - Reconciling every configured record against the remote zone
//! - Containing failures at the record, then zone, level
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!            │  Scheduler   │  run(): immediate cycle, then interval ticks
//!            └──────────────┘
//!                    │
//!                    ▼
//!            ┌──────────────┐
//!            │ run_once()   │  zones → records, sequential
//!            └──────────────┘
//!          ┌─────────┴──────────┐
//!          ▼                    ▼
//! ┌─────────────┐      ┌──────────────┐
//! │ IpResolver  │      │  Reconciler  │
//! └─────────────┘      └──────────────┘
//!          │                    │
//!          └─────────┬──────────┘
//!                    ▼
//!            ┌──────────────┐        ┌─────────────┐
//!            │RetryExecutor │──────▶ │ZoneProvider │
//!            └──────────────┘        └─────────────┘
//! ```
//!
//! ## Cycle Flow (per zone, in configured order)
//!
//! 1. Resolve the address (cached per provider URL for this cycle only)
//! 2. Normalize it for the zone's record type
//! 3. Look up the zone
//! 4. Reconcile each record with its effective TTL
//!
//! A failure at step 1-3 fails every record of the zone; a failure at step 4
//! fails that record only. Cancellation aborts the cycle and is not counted
//! as a failure.

mod outcome;

pub use outcome::{FailureStage, ItemFailure, RecordResult, SyncOutcome};

use crate::address;
use crate::config::{DdnsConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::reconcile::{RecordAction, Reconciler};
use crate::retry::RetryExecutor;
use crate::traits::{IpResolver, ZoneProvider};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Scheduler started
    Started {
        provider: &'static str,
        zones_count: usize,
        records_count: usize,
        interval: Duration,
    },

    /// A sync cycle started
    CycleStarted {
        cycle: u64,
    },

    /// The public address for a zone is known
    IpResolved {
        zone: String,
        provider_url: String,
        ip: IpAddr,
        cached: bool,
    },

    /// A record is about to be reconciled
    RecordChecked {
        zone: String,
        record: String,
        ip: IpAddr,
        ttl: Option<u32>,
    },

    /// Record set created
    RecordCreated {
        zone: String,
        record: String,
        ip: IpAddr,
    },

    /// Record set already carried the address
    RecordUnchanged {
        zone: String,
        record: String,
        ip: IpAddr,
    },

    /// Address added next to existing values
    RecordAppended {
        zone: String,
        record: String,
        ip: IpAddr,
        previous_values: Vec<String>,
    },

    /// Values replaced by the address
    RecordUpdated {
        zone: String,
        record: String,
        ip: IpAddr,
        previous_values: Vec<String>,
    },

    /// Record set TTL changed
    TtlChanged {
        zone: String,
        record: String,
        from: Option<u32>,
        to: u32,
    },

    /// A record could not be reconciled
    ItemFailed {
        zone: String,
        record: String,
        stage: FailureStage,
        error: String,
    },

    /// A sync cycle finished
    CycleCompleted {
        cycle: u64,
        succeeded: usize,
        failed: usize,
    },

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, no cycle run yet
    Idle,
    /// Cycles are being scheduled
    Running,
    /// Stopped by cancellation (terminal)
    Stopped,
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`], passing a cancellation token
/// 3. Cancel the token to stop; `run()` returns once the in-flight cycle
///    has unwound
///
/// [`DdnsEngine::run_once()`] runs a single cycle without the scheduler.
///
/// ## Threading
///
/// One cycle at a time; zones and records are processed sequentially, so
/// exactly one remote call is in flight.
pub struct DdnsEngine {
    /// Public address lookups
    resolver: Box<dyn IpResolver>,

    /// Zone API
    provider: Box<dyn ZoneProvider>,

    /// Immutable configuration
    config: DdnsConfig,

    /// Cycle counter
    cycles: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,

    /// Scheduler state publisher
    state_tx: watch::Sender<SchedulerState>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: IP resolver implementation
    /// - `provider`: zone provider implementation
    /// - `config`: DDNS configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn ZoneProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        let engine = Self {
            resolver,
            provider,
            config,
            cycles: AtomicU64::new(0),
            event_tx: tx,
            state_tx,
        };

        Ok((engine, rx))
    }

    /// Configuration the engine runs with
    pub fn config(&self) -> &DdnsConfig {
        &self.config
    }

    /// Subscribe to scheduler state changes
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Run the scheduler until `shutdown` is cancelled
    ///
    /// The first cycle starts immediately; later cycles start on every
    /// interval tick. Ticks missed while a slow cycle runs are skipped.
    /// Cycle failures are logged and never stop the loop.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.state_tx.send_replace(SchedulerState::Running);
        self.emit_event(EngineEvent::Started {
            provider: self.provider.provider_name(),
            zones_count: self.config.zones.len(),
            records_count: self.config.record_count(),
            interval: self.config.interval,
        });
        info!(
            zone_provider = self.provider.provider_name(),
            zones = self.config.zones.len(),
            records = self.config.record_count(),
            interval = ?self.config.interval,
            preserve_records = self.config.preserve_records,
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_once(&shutdown).await {
                Ok(outcome) if outcome.is_success() => {}
                Ok(outcome) => {
                    warn!(failed = outcome.failed(), succeeded = outcome.succeeded(), "Sync completed with errors");
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => error!(error = %e, "Sync failed"),
            }
        }

        info!("Shutdown signal received");
        self.state_tx.send_replace(SchedulerState::Stopped);
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        Ok(())
    }

    /// Run one sync cycle over every configured zone and record
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: the cycle ran to completion; individual records
    ///   may still have failed
    /// - `Err(Error::Cancelled)`: `cancel` fired and the cycle was abandoned
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SyncOutcome> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit_event(EngineEvent::CycleStarted { cycle });
        debug!(cycle, "Sync cycle started");

        let retry = RetryExecutor::new(&self.config.retry, self.config.request_timeout, cancel.clone());
        let reconciler = Reconciler::new(self.provider.as_ref(), &retry, self.config.preserve_records);

        // Lives for this cycle only: the public address may change between cycles.
        let mut ip_cache: HashMap<&str, IpAddr> = HashMap::new();
        let mut outcome = SyncOutcome::default();

        for zone_cfg in &self.config.zones {
            let url = zone_cfg.ip_provider_url.as_str();

            let (fetched, cached) = match ip_cache.get(url) {
                Some(ip) => (*ip, true),
                None => {
                    info!(zone = %zone_cfg.name, provider = url, record_type = %zone_cfg.record_type, "Fetching current IP");
                    let resolver = self.resolver.as_ref();
                    match retry.execute("fetch ip", |_| resolver.resolve(url)).await {
                        Ok(ip) => {
                            info!(zone = %zone_cfg.name, provider = url, ip = %ip, "Fetched current IP");
                            ip_cache.insert(url, ip);
                            (ip, false)
                        }
                        Err(e) if e.is_cancelled() => return Err(e),
                        Err(e) => {
                            error!(zone = %zone_cfg.name, provider = url, error = %e, "IP fetch failed");
                            self.fail_zone(&mut outcome, zone_cfg, FailureStage::IpFetch, e);
                            continue;
                        }
                    }
                }
            };

            self.emit_event(EngineEvent::IpResolved {
                zone: zone_cfg.name.clone(),
                provider_url: url.to_string(),
                ip: fetched,
                cached,
            });

            let ip = match address::normalize(zone_cfg.record_type, fetched) {
                Ok(ip) => ip,
                Err(e) => {
                    error!(zone = %zone_cfg.name, record_type = %zone_cfg.record_type, error = %e, "IP validation failed");
                    self.fail_zone(&mut outcome, zone_cfg, FailureStage::IpValidation, e);
                    continue;
                }
            };
            let value = ip.to_string();
            debug!(zone = %zone_cfg.name, record_type = %zone_cfg.record_type, ip = %value, "Normalized IP");

            info!(zone = %zone_cfg.name, "Looking up zone");
            let provider = self.provider.as_ref();
            let zone_name = zone_cfg.name.as_str();
            let zone = match retry
                .execute("get zone", |attempt| async move {
                    debug!(zone = zone_name, attempt, "API request: get zone");
                    provider
                        .find_zone(zone_name)
                        .await?
                        .ok_or_else(|| Error::not_found(format!("zone {zone_name}")))
                })
                .await
            {
                Ok(zone) => zone,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!(zone = %zone_cfg.name, error = %e, "Zone lookup failed");
                    self.fail_zone(&mut outcome, zone_cfg, FailureStage::ZoneLookup, e);
                    continue;
                }
            };
            debug!(zone = %zone.name, zone_id = %zone.id, "Zone resolved");

            for record in &zone_cfg.records {
                let ttl = zone_cfg.ttl_for(record);
                info!(zone = %zone_cfg.name, record = %record.name, record_type = %zone_cfg.record_type, ip = %value, ttl = ?ttl, "Checking record");
                self.emit_event(EngineEvent::RecordChecked {
                    zone: zone_cfg.name.clone(),
                    record: record.name.clone(),
                    ip,
                    ttl,
                });

                match reconciler
                    .reconcile(&zone, &record.name, zone_cfg.record_type, &value, ttl)
                    .await
                {
                    Ok(result) => {
                        let zone_name = zone_cfg.name.clone();
                        let record_name = record.name.clone();
                        self.emit_event(match result.action {
                            RecordAction::Created => EngineEvent::RecordCreated {
                                zone: zone_name.clone(),
                                record: record_name.clone(),
                                ip,
                            },
                            RecordAction::Unchanged => EngineEvent::RecordUnchanged {
                                zone: zone_name.clone(),
                                record: record_name.clone(),
                                ip,
                            },
                            RecordAction::Appended => EngineEvent::RecordAppended {
                                zone: zone_name.clone(),
                                record: record_name.clone(),
                                ip,
                                previous_values: result.previous_values.clone(),
                            },
                            RecordAction::Replaced => EngineEvent::RecordUpdated {
                                zone: zone_name.clone(),
                                record: record_name.clone(),
                                ip,
                                previous_values: result.previous_values.clone(),
                            },
                        });
                        if let Some(change) = result.ttl_change {
                            self.emit_event(EngineEvent::TtlChanged {
                                zone: zone_name.clone(),
                                record: record_name.clone(),
                                from: change.from,
                                to: change.to,
                            });
                        }
                        outcome.results.push(RecordResult {
                            zone: zone_name,
                            record: record_name,
                            action: result.action,
                            ttl_change: result.ttl_change,
                        });
                    }
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        error!(
                            zone = %zone_cfg.name,
                            record = %record.name,
                            zone_provider = self.provider.provider_name(),
                            error = %e,
                            "Record update failed"
                        );
                        self.record_failure(
                            &mut outcome,
                            &zone_cfg.name,
                            &record.name,
                            FailureStage::Record,
                            Arc::new(e),
                        );
                    }
                }
            }
        }

        info!(cycle, succeeded = outcome.succeeded(), failed = outcome.failed(), "Sync cycle completed");
        self.emit_event(EngineEvent::CycleCompleted {
            cycle,
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
        });

        Ok(outcome)
    }

    /// Mark every record of a zone as failed at `stage`
    fn fail_zone(
        &self,
        outcome: &mut SyncOutcome,
        zone_cfg: &ZoneConfig,
        stage: FailureStage,
        error: Error,
    ) {
        let error = Arc::new(error);
        for record in &zone_cfg.records {
            self.record_failure(outcome, &zone_cfg.name, &record.name, stage, error.clone());
        }
    }

    fn record_failure(
        &self,
        outcome: &mut SyncOutcome,
        zone: &str,
        record: &str,
        stage: FailureStage,
        error: Arc<Error>,
    ) {
        self.emit_event(EngineEvent::ItemFailed {
            zone: zone.to_string(),
            record: record.to_string(),
            stage,
            error: error.to_string(),
        });
        outcome.failures.push(ItemFailure {
            zone: zone.to_string(),
            record: record.to_string(),
            stage,
            error,
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider draining engine events faster.");
            }
            // Nobody is listening; events are optional.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
