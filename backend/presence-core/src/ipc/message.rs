//! JSON bodies carried inside frames.

use crate::error::protocol::ProtocolError;
use crate::ipc::frame::{Frame, Opcode};

use models::ActivityPayload;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const PROTOCOL_VERSION: u32 = 1;
pub const CMD_SET_ACTIVITY: &str = "SET_ACTIVITY";
pub const EVT_READY: &str = "READY";
pub const EVT_ERROR: &str = "ERROR";

/// Error code the daemon uses when updates arrive too fast.
///
/// Observed behaviour rather than a documented contract, and the only code
/// given special treatment.
pub const RATE_LIMIT_ERROR_CODE: i64 = 4000;

/// Body of the opening Handshake frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    pub client_id: String,
    pub v: u32,
}

impl Handshake {
    pub fn new(client_id: u64) -> Self {
        Self {
            client_id: client_id.to_string(),
            v: PROTOCOL_VERSION,
        }
    }
}

/// `SET_ACTIVITY` command. `activity: None` serializes as `null` and clears.
#[derive(Debug, Clone, Serialize)]
pub struct SetActivity<'a> {
    cmd: &'static str,
    args: SetActivityArgs<'a>,
    nonce: String,
}

#[derive(Debug, Clone, Serialize)]
struct SetActivityArgs<'a> {
    pid: u32,
    activity: Option<&'a ActivityPayload>,
}

impl<'a> SetActivity<'a> {
    pub fn new(pid: u32, activity: Option<&'a ActivityPayload>) -> Self {
        Self {
            cmd: CMD_SET_ACTIVITY,
            args: SetActivityArgs { pid, activity },
            nonce: Uuid::new_v4().to_string(),
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Any JSON body the daemon sends back on a Frame opcode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub evt: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl Response {
    pub fn is_ready(&self) -> bool {
        self.evt.as_deref() == Some(EVT_READY)
    }

    pub fn is_error(&self) -> bool {
        self.evt.as_deref() == Some(EVT_ERROR)
    }

    pub fn error_code(&self) -> Option<i64> {
        self.data.as_ref()?.get("code")?.as_i64()
    }

    pub fn error_message(&self) -> String {
        self.data
            .as_ref()
            .and_then(|data| data.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string()
    }

    /// True when the echoed activity came back without its large image, which
    /// means the art asset is not registered for this application.
    pub fn activity_missing_large_image(&self) -> bool {
        let Some(assets) = self
            .data
            .as_ref()
            .and_then(|data| data.get("activity"))
            .and_then(|activity| activity.get("assets"))
        else {
            return false;
        };

        assets.is_null() || assets.get("large_image").is_none()
    }
}

/// Body of a Close frame sent by the daemon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseReason {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CloseReason {
    /// Best-effort description of a Close frame for logs.
    pub fn describe(frame: &Frame) -> String {
        match frame.parse_json::<CloseReason>() {
            Ok(reason) => format!(
                "code {} ({})",
                reason.code.map_or_else(|| String::from("?"), |c| c.to_string()),
                reason.message.as_deref().unwrap_or("no message")
            ),
            Err(_) => frame.payload_lossy(),
        }
    }
}

/// How the daemon answered a `SET_ACTIVITY` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    Accepted { missing_large_image: bool },
    RateLimited,
    Rejected { code: Option<i64>, message: String },
}

impl Acknowledgement {
    /// Classify the frame read after a command.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PeerClosed`] for a Close frame, otherwise
    /// [`ProtocolError::UnexpectedOpcode`] or [`ProtocolError::Json`] when the
    /// reply cannot be understood.
    #[track_caller]
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.opcode {
            Opcode::Frame => {}
            Opcode::Close => {
                return Err(ProtocolError::peer_closed(CloseReason::describe(frame)));
            }
            other => return Err(ProtocolError::unexpected_opcode("FRAME", other)),
        }

        let response: Response = frame.parse_json()?;

        if response.is_error() {
            let code = response.error_code();
            if code == Some(RATE_LIMIT_ERROR_CODE) {
                return Ok(Acknowledgement::RateLimited);
            }
            return Ok(Acknowledgement::Rejected {
                code,
                message: response.error_message(),
            });
        }

        Ok(Acknowledgement::Accepted {
            missing_large_image: response.activity_missing_large_image(),
        })
    }
}
