//! Operation facades. Each facade owns a clone of the shared resilience
//! stack and routes every provider call through the same pipeline:
//! rate limit, then circuit breaker wrapping the retry policy, with one
//! telemetry record per logical call.

pub mod boards;
pub mod iterations;
pub mod pull_requests;
pub mod repositories;
pub mod teams;
pub mod wiki;
pub mod wiql;
pub mod work_items;

pub use boards::BoardsApi;
pub use iterations::IterationsApi;
pub use pull_requests::PullRequestsApi;
pub use repositories::RepositoriesApi;
pub use teams::TeamsApi;
pub use wiki::WikiApi;
pub use wiql::WiqlApi;
pub use work_items::WorkItemsApi;

use crate::provider::{FallbackResolver, Provider, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::telemetry::RequestOutcome;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Run one operation through the full resilience pipeline.
///
/// If the primary transport reports the operation as unsupported and a
/// fallback resolver is wired, the secondary transport is resolved lazily
/// and the whole pipeline is re-issued against it exactly once. Telemetry
/// sees a single outcome, tagged with the transport that actually served
/// the call.
pub(crate) async fn call<T, F, Fut>(
    stack: &ResilienceStack,
    primary: &ProviderHandle,
    fallback: Option<&FallbackResolver>,
    operation: &'static str,
    target: &str,
    f: F,
) -> Result<T>
where
    F: Fn(Arc<dyn Provider>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let correlation = Uuid::new_v4();
    debug!(operation, target, transport = %primary.kind(), %correlation, "dispatching");

    let started = Instant::now();
    let mut transport = primary.kind();
    let mut fallback_used = false;

    let mut result = run_pipeline(stack, primary.provider().clone(), &f).await;

    if let (Err(err), Some(resolver)) = (&result, fallback) {
        if err.is_unsupported() {
            warn!(
                operation,
                transport = %transport,
                %correlation,
                "operation not covered by primary transport, switching to fallback"
            );
            match resolver.resolve().await {
                Ok(handle) => {
                    transport = handle.kind();
                    fallback_used = true;
                    result = run_pipeline(stack, handle.provider().clone(), &f).await;
                }
                Err(resolve_err) => {
                    error!(operation, error = %resolve_err, %correlation, "fallback transport unavailable");
                    result = Err(resolve_err);
                }
            }
        }
    }

    match &result {
        Ok(_) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            info!(
                operation,
                target,
                transport = %transport,
                duration_ms,
                fallback_used,
                %correlation,
                "call completed"
            );
            stack.telemetry.record_request(RequestOutcome {
                operation: operation.to_string(),
                succeeded: true,
                duration_ms,
                transport: transport.as_str().to_string(),
                fallback_used,
            });
        }
        Err(err) => {
            error!(operation, target, transport = %transport, error = %err, %correlation, "call failed");
            stack.telemetry.record_error(err, operation, transport);
        }
    }

    result
}

/// Rate limit, then circuit breaker around the retry loop. The breaker
/// judges the retry loop's final outcome, not individual attempts.
async fn run_pipeline<T, F, Fut>(
    stack: &ResilienceStack,
    provider: Arc<dyn Provider>,
    f: &F,
) -> Result<T>
where
    F: Fn(Arc<dyn Provider>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let cancel = stack.cancel_token();
    stack.rate_limiter.acquire(cancel).await?;
    stack
        .circuit_breaker
        .execute(|| stack.retry.execute(cancel, || f(provider.clone())))
        .await
}
