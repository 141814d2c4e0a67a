//! Verification codes
//!
//! Two independent channels, each with its own 6-digit numeric code.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Verification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Phone => "phone",
        }
    }

    /// Request field carrying this channel's code
    pub fn code_field(&self) -> &'static str {
        match self {
            Channel::Email => "emailCode",
            Channel::Phone => "phoneCode",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(Channel::Email),
            "phone" => Ok(Channel::Phone),
            other => Err(Error::validation("channel", format!("unknown channel '{}'", other))),
        }
    }
}

/// Generate a zero-padded 6-digit code
pub fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", value)
}

/// Compare a submitted code with the stored one without early exit
pub fn codes_match(submitted: &str, stored: &str) -> bool {
    let submitted = submitted.trim().as_bytes();
    let stored = stored.as_bytes();
    if submitted.len() != stored.len() {
        return false;
    }
    submitted
        .iter()
        .zip(stored)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
