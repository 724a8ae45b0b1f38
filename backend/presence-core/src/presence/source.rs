use models::PlaybackSnapshot;

use std::future::Future;

/// Supplies the current playback snapshot on demand.
///
/// `None` means nothing is playing. Implementations should return quickly;
/// the caller polls on a fixed interval.
pub trait PlaybackSource: Send {
    fn poll(&mut self) -> impl Future<Output = Option<PlaybackSnapshot>> + Send;
}
