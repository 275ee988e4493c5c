/*!
 * Validation Engine
 *
 * Checks a flag word for unknown bits and for enable/disable conflicts.
 * The same checks run on the raw request and, again, on the merged module
 * output; only the error they map to differs. Reporting is left to the
 * caller so both channels receive the exact same message.
 */

use super::flags::{has_conflict, is_known, FlagSet};
use crate::core::errors::{InvariantViolation, PolicyError, PolicyResult};

/// Which invariant `flags` breaks, if any. Unknown bits are checked first.
#[inline]
#[must_use]
pub fn check(flags: FlagSet) -> Option<InvariantViolation> {
    if !is_known(flags) {
        Some(InvariantViolation::UnknownFlags)
    } else if has_conflict(flags) {
        Some(InvariantViolation::ConflictingFlags)
    } else {
        None
    }
}

/// Validate the raw requested mode before any feature module runs
pub fn validate_request(mode: FlagSet) -> PolicyResult<()> {
    match check(mode) {
        None => Ok(()),
        Some(InvariantViolation::UnknownFlags) => Err(PolicyError::MalformedRequest {
            flags: mode.bits(),
        }),
        Some(InvariantViolation::ConflictingFlags) => Err(PolicyError::ConflictingRequest {
            flags: mode.bits(),
        }),
    }
}

/// Re-validate the merged module output. A failure here is a module defect.
pub fn validate_result(flags: FlagSet) -> PolicyResult<()> {
    match check(flags) {
        None => Ok(()),
        Some(violation) => Err(PolicyError::PostMergeInvariantViolation {
            flags: flags.bits(),
            violation,
        }),
    }
}
