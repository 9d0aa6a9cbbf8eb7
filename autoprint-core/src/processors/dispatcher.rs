//! Dispatcher processor.
//!
//! The Dispatcher is responsible for:
//! - Receiving `DispatchRequest`s from the admission controller
//! - Fanning each request out to the printer, chat and wheel sinks
//! - Isolating sinks from each other: every sink runs in its own task with
//!   its own timeout, so a hung or panicking sink cannot stall the others
//! - Publishing a `PipelineNotice` for every sink outcome
//!
//! Automatic dispatch honours the pause switch (`printing_enabled`); manual
//! dispatch does not.

use std::sync::Arc;

use autoprint_sdk::objects::{DispatchSummary, SinkKind, SinkOutcome};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::config::{ConfigStore, PipelineSettings};
use crate::events::{DispatchRequest, DispatchRequestReceiver, NoticeSender, PipelineNotice};
use crate::processors::sinks::{ChatSink, LabelJob, PrinterSink, WheelSink};

pub struct Dispatcher {
    printer: Arc<PrinterSink>,
    chat: Arc<ChatSink>,
    wheel: Arc<WheelSink>,
    settings: ConfigStore<PipelineSettings>,
    notices: NoticeSender,
}

impl Dispatcher {
    pub fn new(
        printer: PrinterSink,
        chat: ChatSink,
        wheel: WheelSink,
        settings: ConfigStore<PipelineSettings>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            printer: Arc::new(printer),
            chat: Arc::new(chat),
            wheel: Arc::new(wheel),
            settings,
            notices,
        }
    }

    /// Run the Dispatcher.
    ///
    /// Each request is dispatched on its own task so a slow sink never delays
    /// the next win. On shutdown the request channel is closed and every
    /// request still queued is dispatched before the in-flight tasks are
    /// awaited.
    pub async fn run(
        self: Arc<Self>,
        mut dispatch_rx: DispatchRequestReceiver,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Dispatcher started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }

                Some(req) = dispatch_rx.recv() => {
                    debug!(winner = %req.winner, item = %req.item, "Received DispatchRequest");
                    let this = Arc::clone(&self);
                    in_flight.spawn(async move {
                        this.dispatch(req).await;
                    });
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Dispatch task failed");
                    }
                }

                else => {
                    info!("DispatchRequest channel closed");
                    break;
                }
            }
        }

        // Wins still queued are already recorded; they must reach the sinks.
        dispatch_rx.close();
        let mut queued = 0usize;
        while let Some(req) = dispatch_rx.recv().await {
            queued += 1;
            let this = Arc::clone(&self);
            in_flight.spawn(async move {
                this.dispatch(req).await;
            });
        }
        if queued > 0 {
            info!(queued, "Dispatched requests queued at shutdown");
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatch task failed");
            }
        }
        info!("Dispatcher shutdown complete");
    }

    /// Dispatch one win to every sink and wait for all of them.
    pub async fn dispatch(&self, req: DispatchRequest) -> DispatchSummary {
        let settings = self.settings.snapshot().await;

        if !req.is_manual() && !settings.printing_enabled {
            info!(winner = %req.winner, item = %req.item, "Dispatch skipped, printing paused");
            let paused = SinkOutcome::skipped("printing paused");
            let summary = DispatchSummary {
                printer: paused.clone(),
                chat: paused.clone(),
                wheel: paused,
            };
            self.publish(&req, &summary);
            return summary;
        }

        let req = Arc::new(req);
        let settings = Arc::new(settings);

        let printer = {
            let sink = Arc::clone(&self.printer);
            let job = LabelJob {
                winner: req.winner.clone(),
                item: req.item.clone(),
                price: req.price.clone(),
            };
            tokio::spawn(async move { sink.deliver(job).await })
        };
        let chat = {
            let sink = Arc::clone(&self.chat);
            let (req, settings) = (Arc::clone(&req), Arc::clone(&settings));
            tokio::spawn(async move { sink.deliver(&req, &settings).await })
        };
        let wheel = {
            let sink = Arc::clone(&self.wheel);
            let (req, settings) = (Arc::clone(&req), Arc::clone(&settings));
            tokio::spawn(async move { sink.deliver(&req, &settings).await })
        };

        let (printer, chat, wheel) = tokio::join!(printer, chat, wheel);
        let summary = DispatchSummary {
            printer: joined(SinkKind::Printer, printer),
            chat: joined(SinkKind::Chat, chat),
            wheel: joined(SinkKind::Wheel, wheel),
        };
        self.publish(&req, &summary);
        summary
    }

    /// Print the fixed test label.
    pub async fn test_print(&self) -> SinkOutcome {
        let outcome = self.printer.test_print().await;
        let job = LabelJob::test_job();
        self.notices.publish(PipelineNotice::Sink {
            sink: SinkKind::Printer,
            outcome: outcome.clone(),
            winner: job.winner,
            item: job.item,
        });
        outcome
    }

    fn publish(&self, req: &DispatchRequest, summary: &DispatchSummary) {
        for (sink, outcome) in [
            (SinkKind::Printer, &summary.printer),
            (SinkKind::Chat, &summary.chat),
            (SinkKind::Wheel, &summary.wheel),
        ] {
            self.notices.publish(PipelineNotice::Sink {
                sink,
                outcome: outcome.clone(),
                winner: req.winner.clone(),
                item: req.item.clone(),
            });
        }
    }
}

fn joined(sink: SinkKind, result: Result<SinkOutcome, JoinError>) -> SinkOutcome {
    result.unwrap_or_else(|e| {
        error!(%sink, error = %e, "Sink task failed");
        SinkOutcome::failed(e)
    })
}
