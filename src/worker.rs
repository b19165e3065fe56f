//! Background region generation.
//!
//! Requests go to a dispatcher task over a channel; each one is generated on
//! tokio's blocking pool and the result comes back on a second channel,
//! carrying the requested bounds so callers can match out-of-order
//! completions.

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::config::TerrainParams;
use crate::generator::{generate_region, GeneratedRegion, RegionRequest};
use crate::seeds::TerrainSeeds;

/// Client side of the generation worker.
pub struct GeneratorHandle {
    requests: UnboundedSender<RegionRequest>,
    responses: UnboundedReceiver<GeneratedRegion>,
}

impl GeneratorHandle {
    /// Start the dispatcher on `runtime`.
    pub fn spawn(runtime: &Handle, params: TerrainParams, seeds: TerrainSeeds) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<RegionRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        runtime.spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let bounds = request.bounds;
                let params = params.clone();
                let result = tokio::task::spawn_blocking(move || {
                    generate_region(&request, &params, &seeds)
                })
                .await;

                let region = match result {
                    Ok(region) => region,
                    Err(e) => {
                        log::warn!("Generation of {} failed: {}", bounds, e);
                        GeneratedRegion::empty(bounds)
                    }
                };

                if response_tx.send(region).is_err() {
                    log::debug!("Generator handle dropped, stopping dispatcher");
                    break;
                }
            }
        });

        Self {
            requests: request_tx,
            responses: response_rx,
        }
    }

    /// Queue a region. Returns `false` if the dispatcher has stopped.
    pub fn submit(&self, request: RegionRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    /// A finished region, if one is ready.
    pub fn try_recv(&mut self) -> Option<GeneratedRegion> {
        match self.responses.try_recv() {
            Ok(region) => Some(region),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Generator dispatcher is gone");
                None
            }
        }
    }

    /// Wait for the next finished region.
    pub async fn recv(&mut self) -> Option<GeneratedRegion> {
        self.responses.recv().await
    }
}
