// # ddns-core
//
// Core library for the Hetzner DDNS daemon.
//
// ## Architecture Overview
//
// This library provides the reconciliation engine for dynamic DNS updates:
// - **IpResolver**: Trait for looking up the current public address
// - **ZoneProvider**: Trait for reading and mutating remote record sets
// - **RetryExecutor**: The single retry/backoff mechanism for remote calls
// - **Reconciler**: Decides create / append / replace / no-op per record
// - **DdnsEngine**: Runs sync cycles over every zone on a fixed interval
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from API clients
// 2. **Library-First**: All core functionality can be used as a library
// 3. **Contained Failures**: A record's failure never stops its siblings
// 4. **Stateless Cycles**: Every cycle re-reads remote state, nothing persists
// 5. **Cooperative Cancellation**: One token stops waits, retries and the scheduler

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod retry;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, RecordConfig, RecordType, RetryConfig, ZoneConfig};
pub use engine::{DdnsEngine, EngineEvent, SchedulerState, SyncOutcome};
pub use error::{Error, Result};
pub use reconcile::{ReconcileOutcome, Reconciler, RecordAction};
pub use retry::{Backoff, RetryExecutor};
pub use traits::{IpResolver, RRSet, Zone, ZoneProvider};
pub use tokio_util::sync::CancellationToken;
