//! Submission and review state machines
//!
//! Each status is a closed enum with an explicit transition table. A
//! transition not listed in the table is rejected even when both ends are
//! valid states.
//!
//! ```text
//! Submission:  Under Review ──► Accepted
//!                   └─────────► Rejected
//!
//! Review:      Pending ──► Completed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Paper submission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "Under Review")]
    UnderReview,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub const INITIAL: SubmissionStatus = SubmissionStatus::UnderReview;

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::UnderReview => "Under Review",
            SubmissionStatus::Accepted => "Accepted",
            SubmissionStatus::Rejected => "Rejected",
        }
    }

    /// States reachable from `self` in one step
    pub fn successors(&self) -> &'static [SubmissionStatus] {
        match self {
            SubmissionStatus::UnderReview => {
                &[SubmissionStatus::Accepted, SubmissionStatus::Rejected]
            }
            SubmissionStatus::Accepted | SubmissionStatus::Rejected => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    /// Check `self → next` against the transition table
    pub fn transition_to(self, next: SubmissionStatus) -> Result<SubmissionStatus> {
        if self.successors().contains(&next) {
            Ok(next)
        } else {
            Err(invalid_transition(self.as_str(), next.as_str()))
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Under Review" => Ok(SubmissionStatus::UnderReview),
            "Accepted" => Ok(SubmissionStatus::Accepted),
            "Rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(Error::validation("status", format!("unknown status '{}'", other))),
        }
    }
}

/// Review assignment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Completed,
}

impl ReviewStatus {
    pub const INITIAL: ReviewStatus = ReviewStatus::Pending;

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "Pending",
            ReviewStatus::Completed => "Completed",
        }
    }

    pub fn successors(&self) -> &'static [ReviewStatus] {
        match self {
            ReviewStatus::Pending => &[ReviewStatus::Completed],
            ReviewStatus::Completed => &[],
        }
    }

    pub fn transition_to(self, next: ReviewStatus) -> Result<ReviewStatus> {
        if self.successors().contains(&next) {
            Ok(next)
        } else {
            Err(invalid_transition(self.as_str(), next.as_str()))
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(ReviewStatus::Pending),
            "Completed" => Ok(ReviewStatus::Completed),
            other => Err(Error::validation("status", format!("unknown status '{}'", other))),
        }
    }
}

fn invalid_transition(from: &str, to: &str) -> Error {
    Error::validation("status", format!("cannot move from '{}' to '{}'", from, to))
}

/// Reviewer score, an integer in 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score(u8);

impl Score {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(Error::validation(
                "score",
                format!("score must be an integer between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        i64::from(self.0)
    }
}
