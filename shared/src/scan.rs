//! Scan flow state machine.
//!
//! The flow always leaves the user with an actionable result: a validated
//! automatic diagnosis, or a manual pick from the disease reference
//! collection when the automated path fails.
//!
//! ```text
//! Idle -> Requesting -> Succeeded
//!                    -> Failed -> FallbackOffered -> ResolvedByUser
//! ```
//!
//! Every submission carries a token minted by the caller, and responses
//! repeat the token of the submission they answer. An answer that outlives
//! its submission (the photo was swapped, the scan resubmitted) is dropped
//! instead of landing on a scan it no longer belongs to.

use serde::{Deserialize, Serialize};

use crate::{AnalysisResult, DiseaseReference};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ScanPhase {
    Idle,
    Requesting {
        token: u32,
    },
    Succeeded(AnalysisResult),
    Failed {
        reason: String,
    },
    FallbackOffered {
        reason: String,
        candidates: Vec<DiseaseReference>,
    },
    ResolvedByUser(AnalysisResult),
}

impl ScanPhase {
    /// True while an analysis request is in flight; the submit trigger is
    /// disabled for the duration.
    pub fn in_flight(&self) -> bool {
        matches!(self, ScanPhase::Requesting { .. })
    }

    /// The result to display, if the flow has produced one.
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            ScanPhase::Succeeded(result) | ScanPhase::ResolvedByUser(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    /// User pressed analyze; the token identifies this submission.
    Submit { token: u32 },
    /// Analysis request returned a validated result.
    Completed { token: u32, result: AnalysisResult },
    /// Analysis request failed (network, upstream, or validation).
    Errored { token: u32, reason: String },
    /// Fallback candidates arrived from the reference collection.
    CandidatesLoaded(Vec<DiseaseReference>),
    /// User picked a fallback candidate.
    CandidatePicked(DiseaseReference),
    /// User started over with a new photo.
    Reset,
}

/// Advance the scan flow by one event. Events that are not legal in the
/// current phase leave it unchanged. A response only lands if its token
/// matches the in-flight submission; a new submit replaces the token, so
/// the superseded request's answer arrives dead.
pub fn advance(phase: ScanPhase, event: ScanEvent) -> ScanPhase {
    match (phase, event) {
        (_, ScanEvent::Reset) => ScanPhase::Idle,
        (_, ScanEvent::Submit { token }) => ScanPhase::Requesting { token },
        (
            ScanPhase::Requesting { token },
            ScanEvent::Completed {
                token: answered,
                result,
            },
        ) if answered == token => ScanPhase::Succeeded(result),
        (
            ScanPhase::Requesting { token },
            ScanEvent::Errored {
                token: answered,
                reason,
            },
        ) if answered == token => ScanPhase::Failed { reason },
        (ScanPhase::Failed { reason }, ScanEvent::CandidatesLoaded(candidates)) => {
            ScanPhase::FallbackOffered { reason, candidates }
        }
        (ScanPhase::FallbackOffered { .. }, ScanEvent::CandidatePicked(reference)) => {
            ScanPhase::ResolvedByUser(reference.manual_result())
        }
        (phase, _) => phase,
    }
}
