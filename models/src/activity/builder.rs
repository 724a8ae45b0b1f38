use crate::activity::{ActivityAssets, ActivityPayload, ActivityTimestamps, truncate_field};
use crate::error::model_error::ModelError;

use common::ErrorLocation;

use std::panic::Location;

/// Builder for creating validated ActivityPayload instances.
///
/// Text fields are truncated to the chat client's limit on build, so every
/// payload that exists is already safe to put on the wire.
#[derive(Debug, Default)]
pub struct ActivityPayloadBuilder {
    details: Option<String>,
    state: Option<String>,
    end_timestamp: Option<i64>,
}

impl ActivityPayloadBuilder {
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Unix seconds at which the current item ends. `None` hides the timer.
    pub fn with_end_timestamp(mut self, end: Option<i64>) -> Self {
        self.end_timestamp = end;
        self
    }

    /// Build the ActivityPayload with validation.
    #[track_caller]
    pub fn build(self) -> Result<ActivityPayload, ModelError> {
        let details = self.details.ok_or_else(|| ModelError::Validation {
            message: String::from("Details are required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if details.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Details cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let state = self.state.ok_or_else(|| ModelError::Validation {
            message: String::from("State is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let timestamps = match self.end_timestamp {
            Some(end) if end <= 0 => {
                return Err(ModelError::Validation {
                    message: format!("End timestamp must be positive, got {end}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Some(end) => Some(ActivityTimestamps { end }),
            None => None,
        };

        Ok(ActivityPayload {
            details: truncate_field(&details),
            state: truncate_field(&state),
            assets: ActivityAssets::default(),
            timestamps,
        })
    }
}
