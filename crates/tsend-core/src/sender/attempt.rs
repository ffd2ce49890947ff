//! A single attempt: encode the batch and run the blocking transport call.

use std::sync::Arc;

use crate::batch::Batch;
use crate::envelope::{Envelope, EnvelopeError};
use crate::transport::{Response, Transport, TransportError};

/// Builds the request and performs the exchange on the blocking pool.
///
/// Encoding errors are returned separately: they are not a transport
/// outcome and must not be classified or retried.
pub(super) async fn perform(
    envelope: &Envelope,
    transport: &Arc<dyn Transport>,
    batch: &Batch,
) -> Result<Result<Response, TransportError>, EnvelopeError> {
    let request = envelope.request_for(batch)?;
    let transport = Arc::clone(transport);
    let joined = tokio::task::spawn_blocking(move || transport.send(&request)).await;
    Ok(match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(batch_id = %batch.id(), "transport task failed: {}", e);
            Err(TransportError::Other(format!("transport task failed: {e}")))
        }
    })
}
