use log::{debug, info, warn};

use crate::error::NoData;
use crate::http::HttpClient;
use crate::metric_collector::{MetricCollector, PublishReport};
use crate::tigo::Tigo;

#[derive(Debug)]
pub enum CycleOutcome {
    NoData(NoData),
    /// One report per output channel, in channel order.
    Published(Vec<PublishReport>),
}

/// One poll of the router followed by a publish to every channel.
///
/// Never fails: whatever goes wrong is logged and the next cycle starts from
/// scratch.
pub fn run_cycle<C: HttpClient>(
    tigo: &mut Tigo<C>,
    channels: &mut [&mut dyn MetricCollector],
) -> CycleOutcome {
    debug!("Triggering data poll and publish...");
    let result = match tigo.poll() {
        Ok(result) => result,
        Err(reason) => {
            match &reason {
                NoData::Fetch(e) => warn!("No data to publish: {e}"),
                NoData::Extract(e) => debug!("No data to publish: {e}"),
            }
            return CycleOutcome::NoData(reason);
        }
    };

    let reports: Vec<_> = channels
        .iter_mut()
        .map(|channel| channel.publish(&result))
        .collect();
    for report in &reports {
        let summary = format!(
            "{} devices, {} discovery, {} states, {} without reading, {} failed",
            report.devices, report.discovery, report.states, report.absent, report.failed
        );
        if report.interrupted {
            warn!("Cycle cut short: {summary}");
        } else {
            info!("Published {summary}");
        }
    }
    CycleOutcome::Published(reports)
}
