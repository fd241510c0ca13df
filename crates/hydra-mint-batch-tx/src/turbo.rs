/*!
# Two-Phase Turbo Driver

Takes build and sign latency off the confirmation path of a long mint run.

1. **Build phase**: build, sign and identify every batch up front, threading
   the predicted checkpoint forward exactly as the chained pipeline does. The
   first failure ends the phase; the successful prefix is kept.
2. **Submit phase**: submit the prefix strictly in order, each batch awaiting
   the Head's verdict, stopping at the first batch that is not accepted.

Only valid because every batch's input is known before its predecessor is
confirmed. Never use it where inputs come from a live coin query.
*/

use crate::{
    error::PipelineError,
    pipeline::{submit_batch, BuiltBatch, ChainedMintPipeline, Checkpoint, MintReport, MintRun},
};
use hydra_mint_client::HeadClient;
use tracing::{error, info};

/// Result of the build phase: the successful prefix and why it ended early
#[derive(Debug)]
pub struct BuildPhase {
    pub batches: Vec<BuiltBatch>,
    pub stop: Option<PipelineError>,
}

pub struct TurboDriver<'a> {
    pipeline: &'a ChainedMintPipeline,
}

impl<'a> TurboDriver<'a> {
    pub fn new(pipeline: &'a ChainedMintPipeline) -> Self {
        Self { pipeline }
    }

    /// Build every remaining batch starting from `start`, without submitting
    pub async fn build_all(&self, run: &MintRun, start: &Checkpoint) -> BuildPhase {
        let adopted = run.batch_ranges().and_then(|ranges| {
            let checkpoint = start.resuming(run, ranges.len() as u64)?;
            Ok((ranges, checkpoint))
        });
        let (ranges, mut predicted) = match adopted {
            Ok(adopted) => adopted,
            Err(e) => {
                error!("Build phase refused to start: {}", e);
                return BuildPhase {
                    batches: Vec::new(),
                    stop: Some(e),
                };
            }
        };

        let mut batches = Vec::new();
        while let Some(range) = ranges.get(predicted.next_batch as usize) {
            match self
                .pipeline
                .build_batch(&predicted, &run.prefix, range.clone())
                .await
            {
                Ok(built) => {
                    predicted = built.next.clone();
                    batches.push(built);
                }
                Err(e) => {
                    error!(
                        "Build phase stopped after {} batch(es): {}",
                        batches.len(),
                        e
                    );
                    return BuildPhase {
                        batches,
                        stop: Some(e),
                    };
                }
            }
        }

        info!("Build phase complete: {} batch(es) signed", batches.len());
        BuildPhase {
            batches,
            stop: None,
        }
    }

    /// Submit built batches in order, stopping at the first one not accepted
    pub async fn submit_all(
        &self,
        client: &mut HeadClient,
        batches: &[BuiltBatch],
        total_batches: u64,
        start: Checkpoint,
    ) -> MintReport {
        let mut report = MintReport::new(total_batches, Some(start));

        for built in batches {
            if let Err(e) = submit_batch(client, built).await {
                error!("Submit phase stopped at batch {}: {}", built.index + 1, e);
                report.stop = Some(e);
                return report;
            }
            report.completed_batches += 1;
            report.checkpoint = Some(built.next.clone());
            self.pipeline.persist(&built.next);
        }
        report
    }

    /// Build everything from `start`, then submit the successful prefix
    pub async fn run_from(
        &self,
        client: &mut HeadClient,
        run: &MintRun,
        start: Checkpoint,
    ) -> MintReport {
        let total = run
            .batch_ranges()
            .map(|ranges| ranges.len() as u64)
            .unwrap_or(0);
        let phase = self.build_all(run, &start).await;

        let mut report = self
            .submit_all(client, &phase.batches, total, start)
            .await;
        if report.stop.is_none() {
            report.stop = phase.stop;
        }
        report
    }

    /// Fund from the Head's highest-value asset-free coin, then run both phases
    pub async fn run(&self, client: &mut HeadClient, run: &MintRun) -> MintReport {
        let total = match run.batch_ranges() {
            Ok(ranges) => ranges.len() as u64,
            Err(e) => return MintReport::stopped(0, None, e),
        };
        match self.pipeline.select_fuel(client).await {
            Ok(start) => self.run_from(client, run, start.for_run(run)).await,
            Err(e) => {
                error!("Cannot start turbo mint run: {}", e);
                MintReport::stopped(total, None, e)
            }
        }
    }
}
