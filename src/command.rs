//! Authenticated JSON command endpoint payloads and the processor seam.
//!
//! No command semantics are defined yet: the default processor logs the
//! request fields and answers with the caller's user id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::AppResult;
use crate::identity::User;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CommandRequest {
    pub command: String,
    /// Any other keys sent alongside `command`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandReply {
    pub result: String,
}

pub trait CommandProcessor: Send + Sync {
    fn process(&self, user: &User, req: &CommandRequest) -> AppResult<CommandReply>;
}

/// Logs the request and replies `userid is <id>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoUserId;

impl CommandProcessor for EchoUserId {
    fn process(&self, user: &User, req: &CommandRequest) -> AppResult<CommandReply> {
        info!(user_id = %user.id, "command request received");
        info!(field = "command", "data");
        for key in req.fields.keys() {
            info!(field = %key, "data");
        }
        info!(command = %req.command, "command");
        Ok(CommandReply { result: format!("userid is {}", user.id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;

    #[test]
    fn extra_fields_are_collected() {
        let req: CommandRequest = serde_json::from_str(r#"{"command":"ping","payload":{"a":1},"n":2}"#).unwrap();
        assert_eq!(req.command, "ping");
        assert_eq!(req.fields.len(), 2);
        assert_eq!(req.fields["n"], 2);
    }

    #[test]
    fn missing_command_fails_to_parse() {
        assert!(serde_json::from_str::<CommandRequest>(r#"{"payload":1}"#).is_err());
    }

    #[test]
    fn echo_replies_with_user_id() {
        let user = User::with_id(UserId::from("42"), "alice");
        let req = CommandRequest { command: "ping".into(), fields: Map::new() };
        let reply = EchoUserId.process(&user, &req).unwrap();
        assert_eq!(reply.result, "userid is 42");
    }
}
