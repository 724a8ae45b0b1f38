use crate::ipc::{PresenceClient, SendOutcome};

use models::ActivityPayload;

use std::future::Future;

/// Where activity updates go.
///
/// [`PresenceClient`] is the production sink; tests record calls instead.
pub trait ActivitySink: Send + Sync {
    fn send_activity(&self, activity: ActivityPayload) -> impl Future<Output = SendOutcome> + Send;

    fn clear_activity(&self) -> impl Future<Output = SendOutcome> + Send;
}

impl ActivitySink for PresenceClient {
    async fn send_activity(&self, activity: ActivityPayload) -> SendOutcome {
        PresenceClient::send_activity(self, activity).await
    }

    async fn clear_activity(&self) -> SendOutcome {
        PresenceClient::clear_activity(self).await
    }
}
