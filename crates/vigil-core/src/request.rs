//! The outbound request an agent is attempting.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::AgentId;

/// HTTP-style request method, encoded as a single byte in the columnar
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl RequestMethod {
    /// Single-byte encoding for columnar storage and canonical hashing.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Get => 0,
            Self::Post => 1,
            Self::Put => 2,
            Self::Delete => 3,
            Self::Patch => 4,
            Self::Head => 5,
            Self::Options => 6,
        }
    }

    /// Decode from the columnar byte form.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Get),
            1 => Some(Self::Post),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::Patch),
            5 => Some(Self::Head),
            6 => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// An outbound request as seen by the interceptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    /// The agent issuing the request.
    pub agent_id: AgentId,
    /// Target domain, e.g. `api.example.com`.
    pub domain: String,
    /// Request method.
    pub method: RequestMethod,
    /// Request path.
    pub path: String,
    /// Source address of the agent process.
    pub source_ip: String,
}

impl AccessRequest {
    /// Create a GET request with default source address.
    #[must_use]
    pub fn get(agent_id: AgentId, domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(agent_id, domain, RequestMethod::Get, path)
    }

    /// Create a request with an explicit method.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        domain: impl Into<String>,
        method: RequestMethod,
        path: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            domain: domain.into(),
            method,
            path: path.into(),
            source_ip: "0.0.0.0".to_string(),
        }
    }

    /// Set the source address (builder style).
    #[must_use]
    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = ip.into();
        self
    }
}
