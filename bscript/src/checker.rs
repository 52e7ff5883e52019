use crate::{ScriptError, SigVersion};

/// Capability interface supplying the transaction-dependent checks the
/// engine cannot perform on its own: locktime and sequence comparison
/// and actual signature verification against a sighash. A
/// transaction-backed implementation computes the version-dependent
/// sighash preimage and calls out to curve verification; both live
/// outside this crate.
pub trait SignatureChecker {
    fn check_lock_time(&self, lock_time: u32) -> Result<(), ScriptError>;
    fn check_sequence(&self, sequence: u32) -> Result<(), ScriptError>;
    /// Returns whether `sig` (hash type byte still appended) verifies
    /// `subscript` under `pub_key`. An `Err` aborts evaluation; a clean
    /// mismatch is `Ok(false)`.
    fn check_signature(&self, sig: &[u8], pub_key: &[u8], subscript: &[u8], sig_version: SigVersion)
        -> Result<bool, ScriptError>;
}

/// Accepts every constraint and signature. Used for evaluating scripts
/// that are not bound to a transaction, mainly in tests.
#[derive(Default)]
pub struct NoopChecker;

impl SignatureChecker for NoopChecker {
    fn check_lock_time(&self, _lock_time: u32) -> Result<(), ScriptError> {
        Ok(())
    }

    fn check_sequence(&self, _sequence: u32) -> Result<(), ScriptError> {
        Ok(())
    }

    fn check_signature(
        &self,
        _sig: &[u8],
        _pub_key: &[u8],
        _subscript: &[u8],
        _sig_version: SigVersion,
    ) -> Result<bool, ScriptError> {
        Ok(true)
    }
}
