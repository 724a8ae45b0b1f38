//! The poll loop tying a playback source to the publisher.

use presence_core::presence::{ActivitySink, PlaybackSource, PresencePublisher};

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use tokio::time::{MissedTickBehavior, interval};

/// Poll `source` every `poll_interval` and feed each snapshot to `publisher`
/// until `shutdown` resolves. The first poll happens immediately.
///
/// Returns the number of polls performed.
pub async fn run<P, S, F>(
    source: &mut P,
    publisher: &mut PresencePublisher<S>,
    poll_interval: Duration,
    shutdown: F,
) -> u64
where
    P: PlaybackSource,
    S: ActivitySink,
    F: Future<Output = ()>,
{
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("Polling playback every {}s", poll_interval.as_secs());

    let mut polls = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested, stopping poll loop");
                break;
            }
            _ = ticker.tick() => {
                polls += 1;
                let snapshot = source.poll().await;
                if let Some(outcome) = publisher.sync(snapshot.as_ref()).await {
                    debug!("Poll {polls}: {outcome:?}");
                }
            }
        }
    }

    polls
}
