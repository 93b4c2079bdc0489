//! Named revert reasons shared between the vault contracts and the scenario
//! harness, plus extraction of those reasons from RPC failures.

use std::fmt;

use alloy::sol_types::{Revert, SolError};
use alloy::transports::{RpcError, TransportErrorKind};
use serde::{Deserialize, Serialize};

const NOT_OWNER: &str = "Ownable: caller is not the owner";
const ALREADY_REGISTERED: &str = "ALREADY_REGISTERED";
const EXCEED_TOTAL_DEPOSIT: &str = "EXCEED_TOTAL_DEPOSIT";

/// Failure reasons the vault system reports through `Error(string)` reverts.
///
/// Reasons outside the known set are carried verbatim in `Other` and never
/// compare equal to a named variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertReason {
    NotOwner,
    AlreadyRegistered,
    ExceedTotalDeposit,
    Other(String),
}

impl RevertReason {
    /// Map a raw reason string onto the closed set.
    pub fn from_reason(reason: &str) -> Self {
        match reason.trim() {
            NOT_OWNER => RevertReason::NotOwner,
            ALREADY_REGISTERED => RevertReason::AlreadyRegistered,
            EXCEED_TOTAL_DEPOSIT => RevertReason::ExceedTotalDeposit,
            other => RevertReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RevertReason::NotOwner => NOT_OWNER,
            RevertReason::AlreadyRegistered => ALREADY_REGISTERED,
            RevertReason::ExceedTotalDeposit => EXCEED_TOTAL_DEPOSIT,
            RevertReason::Other(reason) => reason,
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode ABI-encoded `Error(string)` revert data.
pub fn decode_revert_data(data: &[u8]) -> Option<RevertReason> {
    Revert::abi_decode(data)
        .ok()
        .map(|revert| RevertReason::from_reason(&revert.reason))
}

/// Pull a reason out of a node's error message.
///
/// Anvil reports `execution reverted: <reason>`, Hardhat reports
/// `... reverted with reason string '<reason>'`.
pub fn reason_from_message(message: &str) -> Option<RevertReason> {
    if let Some((_, rest)) = message.split_once("reverted with reason string '") {
        let reason = rest.strip_suffix('\'').unwrap_or(rest);
        return Some(RevertReason::from_reason(reason));
    }
    if let Some((_, rest)) = message.split_once("execution reverted: ") {
        return Some(RevertReason::from_reason(rest));
    }
    None
}

/// Extract the revert reason from a failed RPC request, preferring the
/// returned revert data over the message text.
pub fn reason_from_rpc_error(err: &RpcError<TransportErrorKind>) -> Option<RevertReason> {
    let payload = err.as_error_resp()?;
    if let Some(data) = payload.as_revert_data() {
        if let Some(reason) = decode_revert_data(&data) {
            return Some(reason);
        }
    }
    reason_from_message(&payload.message)
}
