//! # worklink
//!
//! A resilient client for work-tracking platforms: work items, WIQL
//! queries, boards, iterations, pull requests, repositories, teams and
//! wikis behind one typed interface.
//!
//! ## Overview
//!
//! Every operation runs through the same resilience pipeline: a token
//! bucket rate limiter, then a circuit breaker wrapping a bounded retry
//! loop, with one telemetry record per logical call. Two transports back
//! the client: an SDK-style transport with partial capability coverage
//! (preferred for its cheaper wire contract) and a full-coverage HTTP
//! transport. When the SDK transport cannot serve an operation, the call
//! transparently falls back to a lazily-created HTTP transport.
//!
//! ## Key Features
//!
//! - **Unified Client**: [`WorkLinkClient`] is the single entry point;
//!   facades per domain area share one resilience stack
//! - **Transport Fallback**: startup fallback when the preferred transport
//!   fails its handshake, plus per-operation fallback on capability gaps
//! - **Resilience**: token-bucket rate limiting, exponential-backoff retry
//!   with jitter, and a three-state circuit breaker via the [`resilience`]
//!   module
//! - **Telemetry**: bounded in-memory outcome log with p95/p99 latency
//!   aggregates via the [`telemetry`] module
//! - **Cooperative Cancellation**: [`WorkLinkClient::shutdown`] unblocks
//!   every rate-limit and backoff suspension point
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worklink::{ClientConfig, WorkLinkClient};
//!
//! #[tokio::main]
//! async fn main() -> worklink::Result<()> {
//!     let config = ClientConfig::new("fabrikam", "fleet", "pat-token");
//!     let client = WorkLinkClient::connect(config).await?;
//!
//!     let item = client.work_items().get(42, None).await?;
//!     println!("{:?}", item.fields.get("System.Title"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`WorkLinkClient`] and [`ClientBuilder`] |
//! | [`api`] | Per-domain operation facades |
//! | [`provider`] | Transport abstraction and fallback protocol |
//! | [`resilience`] | Rate limiter, retry policy, circuit breaker |
//! | [`telemetry`] | Bounded outcome log and aggregate metrics |
//! | [`config`] | Connection settings |
//! | [`error`] | Structured error kinds |
//! | [`types`] | Wire entities and payloads |

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resilience;
pub mod telemetry;
pub mod types;
pub mod validation;

pub(crate) mod transport;

pub use client::{ClientBuilder, ClientHealth, WorkLinkClient};
pub use config::ClientConfig;
pub use error::{Error, ErrorContext};
pub use provider::{FallbackResolver, Provider, ProviderHandle, ProviderHealth, ProviderKind};
pub use resilience::{
    CircuitBreakerConfig, CircuitState, RateLimiterConfig, RetryConfig,
};
pub use telemetry::{RequestOutcome, TelemetryConfig, TelemetryMetrics};

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
