use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::error::{MosaicError, Result};
use crate::frame::{Channel, ChannelMosaic, ChannelSplit};
use crate::grid::CommonGrid;

use super::channel::ChannelWorker;
use super::types::{ChannelResults, ProgressReporter};

type ChannelMessage = (Channel, Result<ChannelMosaic>);

/// Run `worker` for red, green and blue on three named threads and collect the results.
///
/// A single deadline of `timeout` is measured from dispatch. If any channel
/// has not reported by then, or a worker fails or panics, the whole run fails.
/// Workers still running at that point are left detached.
pub fn dispatch_channels(
    mut split: ChannelSplit,
    grid: Arc<CommonGrid>,
    worker: Arc<dyn ChannelWorker>,
    timeout: Duration,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<ChannelResults> {
    let (tx, rx) = mpsc::channel::<ChannelMessage>();
    let dispatched = Instant::now();
    let deadline = dispatched + timeout;

    for channel in Channel::ALL {
        let inputs = split.take(channel);
        let tx = tx.clone();
        let grid = Arc::clone(&grid);
        let worker = Arc::clone(&worker);
        let reporter = Arc::clone(&reporter);

        debug!(%channel, frames = inputs.len(), "Dispatching channel");
        thread::Builder::new()
            .name(format!("mosaic-{}", channel.stem()))
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    worker.run(channel, inputs, &grid, reporter.as_ref())
                }));
                let result = outcome.unwrap_or_else(|payload| {
                    Err(MosaicError::ChannelFailed {
                        channel,
                        reason: format!("worker panicked: {}", panic_message(payload.as_ref())),
                    })
                });
                // The coordinator may have given up already.
                let _ = tx.send((channel, result));
            })
            .map_err(|e| MosaicError::ChannelFailed {
                channel,
                reason: format!("could not spawn worker thread: {e}"),
            })?;
    }
    drop(tx);

    let mut slots: [Option<ChannelMosaic>; 3] = [None, None, None];
    let mut pending = Channel::ALL.len();
    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((channel, Ok(mosaic))) => {
                info!(
                    %channel,
                    elapsed_ms = dispatched.elapsed().as_millis() as u64,
                    "Channel finished"
                );
                slots[channel.band_index()] = Some(mosaic);
                pending -= 1;
            }
            Ok((channel, Err(e))) => {
                error!(%channel, error = %e, "Channel failed");
                return Err(match e {
                    tagged @ (MosaicError::ChannelFailed { .. }
                    | MosaicError::ChannelError { .. }) => tagged,
                    other => MosaicError::ChannelError {
                        channel,
                        source: Box::new(other),
                    },
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                let channel = first_missing(&slots);
                error!(%channel, ?timeout, "Channel deadline exceeded");
                return Err(MosaicError::ChannelTimeout { channel, timeout });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(MosaicError::ChannelFailed {
                    channel: first_missing(&slots),
                    reason: "worker exited without reporting a result".into(),
                });
            }
        }
    }

    ChannelResults::from_slots(slots)
}

fn first_missing(slots: &[Option<ChannelMosaic>; 3]) -> Channel {
    Channel::ALL
        .into_iter()
        .find(|c| slots[c.band_index()].is_none())
        .unwrap_or(Channel::Red)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
