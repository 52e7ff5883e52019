//! Deterministic script engine for Bitcoin-style transaction scripts.
//!
//! Scripts run on a stack machine with a bounded instruction set. The
//! engine owns parsing, opcode dispatch and the structural rules
//! (limits, conditional nesting, minimal-encoding policies); everything
//! that depends on the surrounding transaction, which is locktime and
//! sequence comparison and actual signature verification, is delegated
//! through the [`checker::SignatureChecker`] trait. [`verify_script`]
//! drives the full protocol over a signature script, a public key
//! script, an optional witness stack and the pay-to-script-hash
//! indirection.

use itertools::Itertools;
use log::trace;

use crate::checker::SignatureChecker;
use crate::data_stack::{DataStack, Stack};
use crate::opcodes::{codes, deserialize_next_opcode, OpCodeImplementation, OpCond};
use crate::script_builder::ScriptBuilder;
use crate::script_class::{is_pay_to_script_hash, is_push_only, parse_witness_program};

pub use bscript_errors::ScriptError;

pub mod checker;
mod data_stack;
pub mod opcodes;
pub mod script_builder;
pub mod script_class;
pub mod sig_encoding;
pub mod standard;

/// Longest script allowed to execute, in serialized bytes.
pub const MAX_SCRIPT_SIZE: usize = 1000;
/// Largest stack element, applied to pushes and to concatenation.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Combined bound on the data and alt stack depths.
pub const MAX_STACK_SIZE: usize = 1000;
/// Executed non-push opcodes allowed per script. Multisig adds its key
/// count on top.
pub const MAX_OPS_PER_SCRIPT: i32 = 201;
/// Key count bound for OpCheckMultiSig.
pub const MAX_PUB_KEYS_PER_MULTISIG: i64 = 20;

/// Locktime and sequence operands may use one byte more than regular
/// arithmetic so the full u32 range stays reachable.
pub(crate) const LOCK_TIME_NUM_LEN: usize = 5;

/// Bit 31 of a sequence operand turns OpCheckSequenceVerify into a
/// no-op.
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;

/// Which signature-hashing scheme the script under evaluation is bound
/// to. It selects the subscript handling in the signature opcodes:
/// `Base` scripts delete signature pushes from the subscript before
/// verification, the other versions never do.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SigVersion {
    /// Pre-witness scripts and the scripts inside pay-to-script-hash.
    Base,
    /// Version 0 witness program scripts.
    WitnessV0,
    /// Fork-id signature hashing; the fork id bit becomes a defined
    /// hash type.
    ForkId,
}

bitflags::bitflags! {
    /// Validation policies layered on top of the consensus execution
    /// rules. Each flag only ever makes validation stricter.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct VerifyFlags: u32 {
        /// Evaluate pay-to-script-hash outputs by running the pushed
        /// redeem script.
        const P2SH = 1 << 0;
        /// Reject signatures that are not strict DER and hash types
        /// outside the defined set.
        const STRICT_ENCODING = 1 << 1;
        /// Reject signatures that are not strict DER.
        const DER_SIGNATURES = 1 << 2;
        /// Reject signatures with an S value above half the group
        /// order.
        const LOW_S = 1 << 3;
        /// Require the unused OpCheckMultiSig dummy element to be
        /// empty.
        const NULL_DUMMY = 1 << 4;
        /// Require the signature script to consist of pushes only.
        const SIG_PUSH_ONLY = 1 << 5;
        /// Require minimal encodings for pushes and numeric operands.
        const MINIMAL_DATA = 1 << 6;
        /// Fail on the upgradable no-op opcodes instead of ignoring
        /// them.
        const DISCOURAGE_UPGRADABLE_NOPS = 1 << 7;
        /// Require exactly one element to remain after evaluation.
        const CLEAN_STACK = 1 << 8;
        /// Enable OpCheckLockTimeVerify.
        const CHECK_LOCK_TIME_VERIFY = 1 << 9;
        /// Enable OpCheckSequenceVerify.
        const CHECK_SEQUENCE_VERIFY = 1 << 10;
        /// Evaluate witness programs.
        const WITNESS = 1 << 11;
        /// Fail on witness program versions this engine does not
        /// understand instead of treating them as anyone-can-spend.
        const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM = 1 << 12;
        /// Require OpIf/OpNotIf operands to be empty or exactly [1].
        const MINIMAL_IF = 1 << 13;
        /// Require failed signature checks to consume empty signatures.
        const NULL_FAIL = 1 << 14;
        /// Only accept compressed public keys.
        const COMPRESSED_PUBKEY_TYPE = 1 << 15;
        /// Accept (and require) the fork id bit in hash types.
        const SIGHASH_FORK_ID = 1 << 16;
        /// Execute the redefined string and arithmetic opcodes instead
        /// of failing on the historically disabled values.
        const SKIP_DISABLED_OPCODES = 1 << 17;
        /// Record a [`TraceEntry`] per executed opcode.
        const ENABLE_TRACE = 1 << 18;
    }
}

/// Snapshot taken after an opcode executed, recorded under
/// [`VerifyFlags::ENABLE_TRACE`].
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// The opcode byte that executed.
    pub opcode: u8,
    /// Offset of the byte following the opcode's serialization.
    pub pc: usize,
    /// The data stack after execution, bottom first.
    pub stack: Vec<Vec<u8>>,
}

/// The virtual machine executing a single script at a time. State that
/// must persist between the signature script and the public key script
/// (the data stack) survives [`ScriptEngine::eval_script`] calls;
/// everything positional is reset per script.
pub struct ScriptEngine<'a, C: SignatureChecker> {
    pub(crate) dstack: Stack,
    pub(crate) astack: Stack,
    pub(crate) cond_stack: Vec<OpCond>,
    pub(crate) flags: VerifyFlags,
    checker: &'a C,
    sig_version: SigVersion,

    // Per-script evaluation state.
    script: Vec<u8>,
    pc: usize,
    code_separator: usize,
    num_ops: i32,
    trace: Vec<TraceEntry>,
}

impl<'a, C: SignatureChecker> ScriptEngine<'a, C> {
    pub fn new(flags: VerifyFlags, checker: &'a C, sig_version: SigVersion) -> Self {
        Self {
            dstack: vec![],
            astack: vec![],
            cond_stack: vec![],
            flags,
            checker,
            sig_version,
            script: vec![],
            pc: 0,
            code_separator: 0,
            num_ops: 0,
            trace: vec![],
        }
    }

    /// The data stack, bottom first.
    pub fn stack(&self) -> &[Vec<u8>] {
        &self.dstack
    }

    /// Entries recorded under [`VerifyFlags::ENABLE_TRACE`], across all
    /// scripts this engine evaluated.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Deserializes and executes `script` against the current data
    /// stack. The alt stack is dropped at the end, so nothing can leak
    /// from one script into the next through it.
    pub fn eval_script(&mut self, script: &[u8]) -> Result<(), ScriptError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize(script.len(), MAX_SCRIPT_SIZE));
        }
        self.script = script.to_vec();
        self.pc = 0;
        self.code_separator = 0;
        self.num_ops = 0;
        self.cond_stack.clear();

        for step in script.iter().batching(|it| deserialize_next_opcode(it)) {
            let opcode = step?;
            // The signature opcodes slice the subscript out of
            // self.script, so pc must point past the current opcode
            // before it runs.
            self.pc += opcode.serialized_len();
            self.execute_opcode(opcode.as_ref())?;

            let combined_size = self.dstack.len() + self.astack.len();
            if combined_size > MAX_STACK_SIZE {
                return Err(ScriptError::StackSizeExceeded(combined_size, MAX_STACK_SIZE));
            }
        }

        if !self.cond_stack.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        self.astack.clear();
        Ok(())
    }

    /// `Ok` iff evaluation left a truthy element on top of the stack.
    pub fn check_eval_success(&self) -> Result<(), ScriptError> {
        match self.dstack.last() {
            Some(top) if data_stack::as_bool(top) => Ok(()),
            _ => Err(ScriptError::EvalFalse),
        }
    }

    pub(crate) fn execute_opcode(&mut self, opcode: &dyn OpCodeImplementation<C>) -> Result<(), ScriptError> {
        // Non-push opcodes count toward the operation limit whether or
        // not they execute.
        if !opcode.is_push_opcode() {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(ScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
            }
        } else if opcode.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooBig(opcode.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }

        // Disabled and illegal opcodes fail the script even inside an
        // unexecuted branch.
        if opcode.is_disabled() && !self.flags.contains(VerifyFlags::SKIP_DISABLED_OPCODES) {
            return Err(ScriptError::OpcodeDisabled(format!("{opcode:?}")));
        }
        if opcode.always_illegal() {
            return Err(ScriptError::OpcodeReserved(format!("{opcode:?}")));
        }

        if self.is_executing() || opcode.is_conditional() {
            if self.require_minimal() && opcode.value() > 0 && opcode.value() <= codes::OpPushData4 {
                opcode.check_minimal_data_push()?;
            }
            opcode.execute(self)?;

            if self.flags.contains(VerifyFlags::ENABLE_TRACE) {
                let entry = TraceEntry { opcode: opcode.value(), pc: self.pc, stack: self.dstack.clone() };
                trace!("executed {:#04x} at {}, stack depth {}", entry.opcode, entry.pc, entry.stack.len());
                self.trace.push(entry);
            }
        }
        Ok(())
    }

    /// Execution is live unless some conditional frame turned it off.
    /// Frames below a dead one are always Skip, so the top frame is
    /// authoritative.
    pub(crate) fn is_executing(&self) -> bool {
        self.cond_stack.last().map(|cond| *cond == OpCond::True).unwrap_or(true)
    }

    pub(crate) fn require_minimal(&self) -> bool {
        self.flags.contains(VerifyFlags::MINIMAL_DATA)
    }

    /// Marks the subscript boundary right after the current opcode.
    pub(crate) fn set_code_separator(&mut self) {
        self.code_separator = self.pc;
    }

    /// The script from the last code separator onward, which is what
    /// signatures commit to.
    fn sub_script(&self) -> &[u8] {
        &self.script[self.code_separator..]
    }

    /// The subscript handed to the checker. Base scripts additionally
    /// remove every canonical push of the signatures being verified,
    /// since those pushes cannot have been part of the signed data.
    fn sub_script_for_signatures(&self, sigs: &[&[u8]]) -> Vec<u8> {
        let mut subscript = self.sub_script().to_vec();
        if self.sig_version == SigVersion::Base {
            for sig in sigs {
                let mut push = ScriptBuilder::new();
                if push.add_data(sig).is_ok() {
                    subscript = find_and_delete(&subscript, push.script());
                }
            }
        }
        subscript
    }

    pub(crate) fn op_check_sig(&mut self) -> Result<(), ScriptError> {
        let [sig, pub_key] = self.dstack.pop_raw()?;
        if sig.is_empty() {
            self.dstack.push_bool(false);
            return Ok(());
        }

        sig_encoding::check_signature_encoding(&sig, self.flags, self.sig_version)?;
        sig_encoding::check_pub_key_encoding(&pub_key, self.flags)?;

        let subscript = self.sub_script_for_signatures(&[&sig]);
        let valid = self.checker.check_signature(&sig, &pub_key, &subscript, self.sig_version)?;
        if !valid && self.flags.contains(VerifyFlags::NULL_FAIL) {
            return Err(ScriptError::NullFail);
        }
        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_check_multisig(&mut self) -> Result<(), ScriptError> {
        let [num_keys] = self.dstack.pop_numbers(self.require_minimal())?;
        if num_keys < 1 || num_keys > MAX_PUB_KEYS_PER_MULTISIG {
            return Err(ScriptError::InvalidPubKeyCount(format!(
                "{num_keys} keys, expected between 1 and {MAX_PUB_KEYS_PER_MULTISIG}"
            )));
        }
        self.num_ops += num_keys as i32;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(ScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
        }

        let num_keys = num_keys as usize;
        if self.dstack.len() < num_keys {
            return Err(ScriptError::InvalidStackOperation(num_keys, self.dstack.len()));
        }
        let keys = self.dstack.split_off(self.dstack.len() - num_keys);

        let [num_sigs] = self.dstack.pop_numbers(self.require_minimal())?;
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(ScriptError::InvalidSignatureCount(format!(
                "{num_sigs} signatures, expected between 0 and {num_keys}"
            )));
        }
        let num_sigs = num_sigs as usize;
        if self.dstack.len() < num_sigs {
            return Err(ScriptError::InvalidStackOperation(num_sigs, self.dstack.len()));
        }
        let sigs = self.dstack.split_off(self.dstack.len() - num_sigs);

        // Historical quirk: one extra element is consumed and ignored.
        let [dummy] = self.dstack.pop_raw()?;
        if self.flags.contains(VerifyFlags::NULL_DUMMY) && !dummy.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }

        let sig_slices: Vec<&[u8]> = sigs.iter().map(|sig| sig.as_slice()).collect();
        let subscript = self.sub_script_for_signatures(&sig_slices);

        // Signatures must appear in the same relative order as their
        // keys, so a single forward pass over both lists suffices. The
        // check fails as soon as fewer keys remain than signatures.
        let mut success = true;
        let mut key_idx = 0;
        let mut sig_idx = 0;
        while success && sig_idx < sigs.len() {
            let sig = &sigs[sig_idx];
            let key = &keys[key_idx];
            sig_encoding::check_signature_encoding(sig, self.flags, self.sig_version)?;
            sig_encoding::check_pub_key_encoding(key, self.flags)?;

            let valid = if sig.is_empty() {
                false
            } else {
                self.checker.check_signature(sig, key, &subscript, self.sig_version)?
            };
            if valid {
                sig_idx += 1;
            }
            key_idx += 1;
            success = sigs.len() - sig_idx <= keys.len() - key_idx;
        }

        if !success && self.flags.contains(VerifyFlags::NULL_FAIL) && sigs.iter().any(|sig| !sig.is_empty()) {
            return Err(ScriptError::NullFail);
        }
        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_check_lock_time_verify(&mut self) -> Result<(), ScriptError> {
        if !self.flags.contains(VerifyFlags::CHECK_LOCK_TIME_VERIFY) {
            if self.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                return Err(ScriptError::DiscourageUpgradableNops);
            }
            return Ok(());
        }

        let lock_time = self.dstack.pop_number_limited(self.require_minimal(), LOCK_TIME_NUM_LEN)?;
        if lock_time < 0 {
            return Err(ScriptError::NegativeLockTime(lock_time));
        }
        if lock_time > u32::MAX as i64 {
            return Err(ScriptError::UnsatisfiedLockTime(format!("lock time {lock_time} exceeds the 32-bit range")));
        }
        self.checker
            .check_lock_time(lock_time as u32)
            .map_err(|_| ScriptError::UnsatisfiedLockTime(format!("lock time {lock_time} not satisfied")))
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), ScriptError> {
        if !self.flags.contains(VerifyFlags::CHECK_SEQUENCE_VERIFY) {
            if self.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                return Err(ScriptError::DiscourageUpgradableNops);
            }
            return Ok(());
        }

        let sequence = self.dstack.pop_number_limited(self.require_minimal(), LOCK_TIME_NUM_LEN)?;
        if sequence < 0 {
            return Err(ScriptError::NegativeLockTime(sequence));
        }
        // The disable bit makes the constraint vacuous without
        // consulting the checker, keeping the opcode usable as a no-op
        // in outputs that opt out of relative locks.
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }
        if sequence > u32::MAX as i64 {
            return Err(ScriptError::UnsatisfiedLockTime(format!("sequence {sequence} exceeds the 32-bit range")));
        }
        self.checker
            .check_sequence(sequence as u32)
            .map_err(|_| ScriptError::UnsatisfiedLockTime(format!("sequence {sequence} not satisfied")))
    }
}

/// Removes every non-overlapping occurrence of `needle` from
/// `haystack`. Scanning resumes right after each match, so a deleted
/// occurrence never combines with the surrounding bytes into a new one.
fn find_and_delete(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return haystack.to_vec();
    }
    let mut result = Vec::with_capacity(haystack.len());
    let mut pos = 0;
    while pos < haystack.len() {
        if haystack.len() - pos >= needle.len() && haystack[pos..pos + needle.len()] == *needle {
            pos += needle.len();
        } else {
            result.push(haystack[pos]);
            pos += 1;
        }
    }
    result
}

/// Runs the full verification protocol over one input:
///
/// 1. optional push-only policy on the signature script,
/// 2. the signature script, then the public key script, on one shared
///    stack,
/// 3. witness program dispatch when the public key script is one,
/// 4. the pay-to-script-hash indirection, including witness programs
///    nested inside it,
/// 5. the clean-stack and leftover-witness policies.
pub fn verify_script<C: SignatureChecker>(
    script_sig: &[u8],
    script_pubkey: &[u8],
    witness: &[Vec<u8>],
    flags: VerifyFlags,
    checker: &C,
    sig_version: SigVersion,
) -> Result<(), ScriptError> {
    if flags.contains(VerifyFlags::SIG_PUSH_ONLY) && !is_push_only(script_sig) {
        return Err(ScriptError::SignatureScriptNotPushOnly);
    }

    let mut vm = ScriptEngine::new(flags, checker, sig_version);
    vm.eval_script(script_sig)?;
    // The pay-to-script-hash path re-runs from the stack as the
    // signature script left it.
    let saved_stack = flags.contains(VerifyFlags::P2SH).then(|| vm.dstack.clone());
    vm.eval_script(script_pubkey)?;
    vm.check_eval_success()?;

    let mut had_witness = false;
    let mut clean_stack = flags.contains(VerifyFlags::CLEAN_STACK);

    if flags.contains(VerifyFlags::WITNESS) {
        if let Some((version, program)) = parse_witness_program(script_pubkey) {
            had_witness = true;
            // A native witness output carries all its input data in the
            // witness; any signature script content is malleable.
            if !script_sig.is_empty() {
                return Err(ScriptError::WitnessMalleated);
            }
            verify_witness_program(version, program, witness, flags, checker)?;
            clean_stack = false;
        }
    }

    if flags.contains(VerifyFlags::P2SH) && is_pay_to_script_hash(script_pubkey) {
        // The hash comparison already ran as part of the public key
        // script; a non-push signature script could smuggle the redeem
        // script onto the stack through computation, which would make
        // it malleable.
        if !is_push_only(script_sig) {
            return Err(ScriptError::SignatureScriptNotPushOnly);
        }
        if let Some(saved) = saved_stack {
            vm.dstack = saved;
        }
        let [redeem_script] = vm.dstack.pop_raw()?;
        vm.eval_script(&redeem_script)?;
        vm.check_eval_success()?;

        if flags.contains(VerifyFlags::WITNESS) {
            if let Some((version, program)) = parse_witness_program(&redeem_script) {
                had_witness = true;
                // The signature script must be exactly the canonical
                // push of the witness-program script, nothing more.
                let mut expected = ScriptBuilder::new();
                expected.add_data(&redeem_script).map_err(|_| ScriptError::WitnessMalleatedP2sh)?;
                if script_sig != expected.script() {
                    return Err(ScriptError::WitnessMalleatedP2sh);
                }
                verify_witness_program(version, program, witness, flags, checker)?;
                clean_stack = false;
            }
        }
    }

    if clean_stack && vm.dstack.len() != 1 {
        return Err(ScriptError::CleanStack(vm.dstack.len() - 1));
    }

    if flags.contains(VerifyFlags::WITNESS) && !had_witness && !witness.is_empty() {
        return Err(ScriptError::WitnessUnexpected);
    }

    Ok(())
}

/// Evaluates a version 0 witness program against the witness stack.
/// Unknown versions succeed vacuously so they stay available for future
/// soft forks, unless the discouragement policy is active.
fn verify_witness_program<C: SignatureChecker>(
    version: u8,
    program: &[u8],
    witness: &[Vec<u8>],
    flags: VerifyFlags,
    checker: &C,
) -> Result<(), ScriptError> {
    if version != 0 {
        if flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
            return Err(ScriptError::DiscourageUpgradableWitnessProgram);
        }
        return Ok(());
    }

    let (script, stack): (Vec<u8>, Stack) = match program.len() {
        // A 20-byte program is a key hash; the script is the implied
        // pay-to-pubkey-hash template and the witness must be exactly
        // signature and key.
        20 => {
            if witness.len() != 2 {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (standard::pay_to_pubkey_hash(program), witness.to_vec())
        }
        // A 32-byte program commits to the script itself, carried as
        // the last witness element.
        32 => {
            let (witness_script, rest) = witness.split_last().ok_or(ScriptError::WitnessProgramEmpty)?;
            if standard::double_sha256(witness_script) != *program {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (witness_script.clone(), rest.to_vec())
        }
        wrong_length => return Err(ScriptError::WitnessProgramWrongLength(wrong_length)),
    };

    for item in stack.iter() {
        if item.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooBig(item.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }
    }

    let mut vm = ScriptEngine::new(flags, checker, SigVersion::WitnessV0);
    vm.dstack = stack;
    vm.eval_script(&script)?;

    // Witness evaluation is always clean stack.
    if vm.dstack.len() != 1 {
        return Err(ScriptError::CleanStack(vm.dstack.len().saturating_sub(1)));
    }
    vm.check_eval_success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::NoopChecker;
    use crate::opcodes::codes::*;
    use crate::sig_encoding::SIG_HASH_ALL;

    /// Toy signature scheme: a signature is its public key with a
    /// trailing hash type byte.
    struct MatchingChecker;

    impl SignatureChecker for MatchingChecker {
        fn check_lock_time(&self, _lock_time: u32) -> Result<(), ScriptError> {
            Ok(())
        }

        fn check_sequence(&self, _sequence: u32) -> Result<(), ScriptError> {
            Ok(())
        }

        fn check_signature(
            &self,
            sig: &[u8],
            pub_key: &[u8],
            _subscript: &[u8],
            _sig_version: SigVersion,
        ) -> Result<bool, ScriptError> {
            Ok(sig.len() > 1 && &sig[..sig.len() - 1] == pub_key)
        }
    }

    /// Accepts lock times and sequences up to fixed bounds.
    struct LockBoundChecker {
        lock_time: u32,
        sequence: u32,
    }

    impl SignatureChecker for LockBoundChecker {
        fn check_lock_time(&self, lock_time: u32) -> Result<(), ScriptError> {
            match lock_time <= self.lock_time {
                true => Ok(()),
                false => Err(ScriptError::UnsatisfiedLockTime(format!("{lock_time}"))),
            }
        }

        fn check_sequence(&self, sequence: u32) -> Result<(), ScriptError> {
            match sequence <= self.sequence {
                true => Ok(()),
                false => Err(ScriptError::UnsatisfiedLockTime(format!("{sequence}"))),
            }
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

    fn eval_stack(script: &[u8], flags: VerifyFlags) -> Result<Stack, ScriptError> {
        let checker = NoopChecker;
        let mut vm = ScriptEngine::new(flags, &checker, SigVersion::Base);
        vm.eval_script(script)?;
        Ok(vm.dstack)
    }

    fn eval_result(script: &[u8], flags: VerifyFlags) -> Result<(), ScriptError> {
        let checker = NoopChecker;
        let mut vm = ScriptEngine::new(flags, &checker, SigVersion::Base);
        vm.eval_script(script)?;
        vm.check_eval_success()
    }

    /// A canonical push of `data` as its own script fragment.
    fn push(data: &[u8]) -> Vec<u8> {
        let mut builder = ScriptBuilder::new();
        builder.add_data(data).expect("test pushes are small");
        builder.drain()
    }

    #[test]
    fn test_conditionals() {
        struct TestCase {
            name: &'static str,
            script: &'static [u8],
            expected: Result<(), ScriptError>,
        }

        let tests = vec![
            TestCase { name: "1 IF 1 ENDIF", script: &[0x51, 0x63, 0x51, 0x68], expected: Ok(()) },
            TestCase {
                name: "1 IF 0 ENDIF",
                script: &[0x51, 0x63, 0x00, 0x68],
                expected: Err(ScriptError::EvalFalse),
            },
            TestCase { name: "0 IF 0 ELSE 1 ENDIF", script: &[0x00, 0x63, 0x00, 0x67, 0x51, 0x68], expected: Ok(()) },
            TestCase {
                name: "1 IF 1 ELSE 0 ENDIF",
                script: &[0x51, 0x63, 0x51, 0x67, 0x00, 0x68],
                expected: Ok(()),
            },
            TestCase { name: "1 NOTIF 0 ELSE 1 ENDIF", script: &[0x51, 0x64, 0x00, 0x67, 0x51, 0x68], expected: Ok(()) },
            TestCase {
                name: "0 NOTIF 1 ENDIF",
                script: &[0x00, 0x64, 0x51, 0x68],
                expected: Ok(()),
            },
            // The inner branch of a dead outer branch never touches the
            // stack, so the trailing 1 is all that remains.
            TestCase {
                name: "0 IF 1 IF 0 ENDIF ENDIF 1",
                script: &[0x00, 0x63, 0x51, 0x63, 0x00, 0x68, 0x68, 0x51],
                expected: Ok(()),
            },
            // A second ELSE flips execution back on.
            TestCase {
                name: "0 IF 0 ELSE 1 ELSE 0 ENDIF",
                script: &[0x00, 0x63, 0x00, 0x67, 0x51, 0x67, 0x00, 0x68],
                expected: Ok(()),
            },
            TestCase {
                name: "1 IF 0 ELSE 1 ELSE 0 ENDIF",
                script: &[0x51, 0x63, 0x00, 0x67, 0x51, 0x67, 0x00, 0x68],
                expected: Err(ScriptError::EvalFalse),
            },
            TestCase {
                name: "1 IF (unterminated)",
                script: &[0x51, 0x63],
                expected: Err(ScriptError::UnbalancedConditional),
            },
            TestCase { name: "bare ELSE", script: &[0x51, 0x67], expected: Err(ScriptError::UnbalancedConditional) },
            TestCase { name: "bare ENDIF", script: &[0x51, 0x68], expected: Err(ScriptError::UnbalancedConditional) },
            TestCase {
                name: "IF with empty stack",
                script: &[0x63, 0x68],
                expected: Err(ScriptError::InvalidStackOperation(1, 0)),
            },
        ];

        for test in tests {
            assert_eq!(eval_result(test.script, VerifyFlags::empty()), test.expected, "case {} failed", test.name);
        }
    }

    #[test]
    fn test_minimal_if() {
        // [0x02] is truthy but not the canonical true operand.
        let script = [push(&[0x02]), vec![OpIf, OpTrue, OpEndIf]].concat();
        assert_eq!(eval_result(&script, VerifyFlags::empty()), Ok(()));
        assert_eq!(eval_result(&script, VerifyFlags::MINIMAL_IF), Err(ScriptError::MinimalIf));

        let script = [push(&[0x01]), vec![OpIf, OpTrue, OpEndIf]].concat();
        assert_eq!(eval_result(&script, VerifyFlags::MINIMAL_IF), Ok(()));
        let script = [vec![OpFalse], vec![OpIf, OpTrue, OpElse, OpTrue, OpEndIf]].concat();
        assert_eq!(eval_result(&script, VerifyFlags::MINIMAL_IF), Ok(()));
    }

    #[test]
    fn test_verify_and_return() {
        assert_eq!(eval_result(&[OpTrue, OpVerify, OpTrue], VerifyFlags::empty()), Ok(()));
        assert_eq!(eval_result(&[OpFalse, OpVerify], VerifyFlags::empty()), Err(ScriptError::VerifyError));
        assert_eq!(eval_result(&[OpTrue, OpReturn], VerifyFlags::empty()), Err(ScriptError::EarlyReturn));
        // OpReturn in a dead branch still fails, matching its use as a
        // data-carrier marker.
        assert_eq!(
            eval_result(&[OpFalse, OpIf, OpReturn, OpEndIf, OpTrue], VerifyFlags::empty()),
            Ok(()),
        );
    }

    #[test]
    fn test_arithmetic_scripts() {
        struct TestCase {
            name: &'static str,
            script: Vec<u8>,
            expected: Result<(), ScriptError>,
        }

        let tests = vec![
            TestCase { name: "2 3 ADD 5 EQUAL", script: vec![Op2, Op3, OpAdd, Op5, OpEqual], expected: Ok(()) },
            TestCase {
                name: "3 2 SUB 1 EQUAL",
                script: vec![Op3, Op2, OpSub, OpTrue, OpEqual],
                expected: Ok(()),
            },
            TestCase {
                name: "2 3 SUB -1 EQUAL",
                script: vec![Op2, Op3, OpSub, Op1Negate, OpEqual],
                expected: Ok(()),
            },
            TestCase { name: "5 ABS", script: vec![Op5, OpAbs, Op5, OpEqual], expected: Ok(()) },
            TestCase {
                name: "-1 ABS 1 EQUAL",
                script: vec![Op1Negate, OpAbs, OpTrue, OpEqual],
                expected: Ok(()),
            },
            TestCase { name: "5 NEGATE -5 ADD 0 EQUAL", script: vec![Op5, OpNegate, Op5, OpAdd, OpFalse, OpEqual], expected: Ok(()) },
            TestCase { name: "2 3 MIN 2 EQUAL", script: vec![Op2, Op3, OpMin, Op2, OpEqual], expected: Ok(()) },
            TestCase { name: "2 3 MAX 3 EQUAL", script: vec![Op2, Op3, OpMax, Op3, OpEqual], expected: Ok(()) },
            TestCase { name: "2 LESSTHAN 3", script: vec![Op2, Op3, OpLessThan], expected: Ok(()) },
            TestCase { name: "3 2 LESSTHAN", script: vec![Op3, Op2, OpLessThan], expected: Err(ScriptError::EvalFalse) },
            TestCase { name: "3 3 NUMEQUAL", script: vec![Op3, Op3, OpNumEqual], expected: Ok(()) },
            TestCase {
                name: "3 2 NUMEQUALVERIFY",
                script: vec![Op3, Op2, OpNumEqualVerify, OpTrue],
                expected: Err(ScriptError::VerifyError),
            },
            TestCase { name: "1 1 BOOLAND", script: vec![OpTrue, OpTrue, OpBoolAnd], expected: Ok(()) },
            TestCase { name: "0 1 BOOLAND", script: vec![OpFalse, OpTrue, OpBoolAnd], expected: Err(ScriptError::EvalFalse) },
            TestCase { name: "0 1 BOOLOR", script: vec![OpFalse, OpTrue, OpBoolOr], expected: Ok(()) },
            TestCase { name: "0 NOT", script: vec![OpFalse, OpNot], expected: Ok(()) },
            TestCase { name: "5 0NOTEQUAL", script: vec![Op5, Op0NotEqual], expected: Ok(()) },
            TestCase { name: "1ADD/1SUB roundtrip", script: vec![Op5, Op1Add, Op1Sub, Op5, OpEqual], expected: Ok(()) },
            // 2 <= 2 < 5
            TestCase { name: "2 WITHIN [2,5)", script: vec![Op2, Op2, Op5, OpWithin], expected: Ok(()) },
            TestCase { name: "5 WITHIN [2,5)", script: vec![Op5, Op2, Op5, OpWithin], expected: Err(ScriptError::EvalFalse) },
        ];

        for test in tests {
            assert_eq!(eval_result(&test.script, VerifyFlags::empty()), test.expected, "case {} failed", test.name);
        }

        // Results decode to the expected numbers, not merely to truthy
        // values.
        assert_eq!(eval_stack(&[OpTrue, Op2, OpAdd], VerifyFlags::empty()), Ok(vec![vec![3]]));
        assert_eq!(eval_stack(&[OpTrue, Op2, OpAdd, Op4, OpAdd], VerifyFlags::empty()), Ok(vec![vec![7]]));
        assert_eq!(eval_stack(&[OpTrue, Op2, OpSub], VerifyFlags::empty()), Ok(vec![vec![0x81]]));
    }

    #[test]
    fn test_redefined_opcodes() {
        struct TestCase {
            name: &'static str,
            script: Vec<u8>,
            expected: Result<(), ScriptError>,
        }

        let tests = vec![
            TestCase {
                name: "CAT",
                script: [push(&[0xab]), push(&[0xcd]), vec![OpCat], push(&[0xab, 0xcd]), vec![OpEqual]].concat(),
                expected: Ok(()),
            },
            TestCase {
                name: "CAT overflow",
                script: {
                    let mut builder = ScriptBuilder::new();
                    builder.add_data(&[0x01; 520]).unwrap();
                    builder.add_data(&[0x01]).unwrap();
                    builder.add_op(OpCat).unwrap();
                    builder.drain()
                },
                expected: Err(ScriptError::ElementTooBig(521, MAX_SCRIPT_ELEMENT_SIZE)),
            },
            TestCase {
                name: "AND",
                script: [push(&[0xf0]), push(&[0x3c]), vec![OpAnd], push(&[0x30]), vec![OpEqual]].concat(),
                expected: Ok(()),
            },
            TestCase {
                name: "OR",
                script: [push(&[0xf0]), push(&[0x3c]), vec![OpOr], push(&[0xfc]), vec![OpEqual]].concat(),
                expected: Ok(()),
            },
            TestCase {
                name: "XOR",
                script: [push(&[0xf0]), push(&[0x3c]), vec![OpXor], push(&[0xcc]), vec![OpEqual]].concat(),
                expected: Ok(()),
            },
            TestCase {
                name: "AND operand size mismatch",
                script: [push(&[0xf0, 0x0f]), push(&[0x3c]), vec![OpAnd]].concat(),
                expected: Err(ScriptError::OperandSize(2, 1)),
            },
            TestCase {
                name: "INVERT",
                script: [push(&[0xf0, 0x0f]), vec![OpInvert], push(&[0x0f, 0xf0]), vec![OpEqual]].concat(),
                expected: Ok(()),
            },
            TestCase { name: "12 4 DIV 3 EQUAL", script: vec![Op12, Op4, OpDiv, Op3, OpEqual], expected: Ok(()) },
            TestCase { name: "12 5 MOD 2 EQUAL", script: vec![Op12, Op5, OpMod, Op2, OpEqual], expected: Ok(()) },
            TestCase { name: "3 4 MUL 12 EQUAL", script: vec![Op3, Op4, OpMul, Op12, OpEqual], expected: Ok(()) },
            TestCase { name: "DIV by zero", script: vec![Op12, OpFalse, OpDiv], expected: Err(ScriptError::DivideByZero) },
            TestCase { name: "MOD by zero", script: vec![Op12, OpFalse, OpMod], expected: Err(ScriptError::ModuloByZero) },
            // The unredefined values stay dead even under the override.
            TestCase {
                name: "SUBSTR stays disabled",
                script: [push(&[0xab]), vec![OpSubStr]].concat(),
                expected: Err(ScriptError::OpcodeDisabled("OpSubStr".to_string())),
            },
        ];

        for test in tests {
            let result = eval_result(&test.script, VerifyFlags::SKIP_DISABLED_OPCODES);
            match (&result, &test.expected) {
                // Disabled-opcode messages carry debug formatting;
                // compare variants only.
                (Err(ScriptError::OpcodeDisabled(_)), Err(ScriptError::OpcodeDisabled(_))) => {}
                _ => assert_eq!(result, test.expected, "case {} failed", test.name),
            }
            // Without the override every one of these scripts dies on
            // the disabled opcode.
            match eval_result(&test.script, VerifyFlags::empty()) {
                Err(ScriptError::OpcodeDisabled(_)) => {}
                other => panic!("case {} without the override: expected disabled, got {other:?}", test.name),
            }
        }
    }

    #[test]
    fn test_stack_manipulation() {
        struct TestCase {
            name: &'static str,
            script: Vec<u8>,
            expected_stack: Stack,
        }

        let tests = vec![
            TestCase { name: "1 2 SWAP", script: vec![OpTrue, Op2, OpSwap], expected_stack: vec![vec![2], vec![1]] },
            TestCase { name: "1 DUP", script: vec![OpTrue, OpDup], expected_stack: vec![vec![1], vec![1]] },
            TestCase { name: "1 2 DROP", script: vec![OpTrue, Op2, OpDrop], expected_stack: vec![vec![1]] },
            TestCase {
                name: "1 2 OVER",
                script: vec![OpTrue, Op2, OpOver],
                expected_stack: vec![vec![1], vec![2], vec![1]],
            },
            TestCase {
                name: "1 2 3 ROT",
                script: vec![OpTrue, Op2, Op3, OpRot],
                expected_stack: vec![vec![2], vec![3], vec![1]],
            },
            TestCase { name: "1 2 NIP", script: vec![OpTrue, Op2, OpNip], expected_stack: vec![vec![2]] },
            TestCase {
                name: "1 2 TUCK",
                script: vec![OpTrue, Op2, OpTuck],
                expected_stack: vec![vec![2], vec![1], vec![2]],
            },
            TestCase {
                name: "1 2 3 2 PICK",
                script: vec![OpTrue, Op2, Op3, Op2, OpPick],
                expected_stack: vec![vec![1], vec![2], vec![3], vec![1]],
            },
            TestCase {
                name: "1 2 3 2 ROLL",
                script: vec![OpTrue, Op2, Op3, Op2, OpRoll],
                expected_stack: vec![vec![2], vec![3], vec![1]],
            },
            TestCase { name: "1 2 DEPTH", script: vec![OpTrue, Op2, OpDepth], expected_stack: vec![vec![1], vec![2], vec![2]] },
            TestCase { name: "0 IFDUP", script: vec![OpFalse, OpIfDup], expected_stack: vec![vec![]] },
            TestCase { name: "1 IFDUP", script: vec![OpTrue, OpIfDup], expected_stack: vec![vec![1], vec![1]] },
            TestCase {
                name: "alt stack roundtrip",
                script: vec![OpTrue, OpToAltStack, Op2, OpFromAltStack],
                expected_stack: vec![vec![2], vec![1]],
            },
            TestCase { name: "SIZE", script: [push(&[0xab, 0xcd]), vec![OpSize]].concat(), expected_stack: vec![vec![0xab, 0xcd], vec![2]] },
            TestCase { name: "2DUP", script: vec![OpTrue, Op2, Op2Dup], expected_stack: vec![vec![1], vec![2], vec![1], vec![2]] },
            TestCase { name: "2DROP", script: vec![OpTrue, Op2, Op3, Op2Drop], expected_stack: vec![vec![1]] },
        ];

        for test in tests {
            assert_eq!(
                eval_stack(&test.script, VerifyFlags::empty()),
                Ok(test.expected_stack),
                "case {} failed",
                test.name
            );
        }
    }

    #[test]
    fn test_hash_opcodes() {
        // Digests of the empty input, from independent tooling.
        struct TestCase {
            opcode: u8,
            expected: &'static str,
        }

        let tests = vec![
            TestCase { opcode: OpSha256, expected: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855" },
            TestCase { opcode: OpSha1, expected: "da39a3ee5e6b4b0d3255bfef95601890afd80709" },
            TestCase { opcode: OpRipemd160, expected: "9c1185a5c5e9fc54612808977ee8f548b2258d31" },
            TestCase { opcode: OpHash160, expected: "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb" },
            TestCase { opcode: OpHash256, expected: "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456" },
        ];

        for test in tests {
            let script = vec![OpFalse, test.opcode];
            assert_eq!(
                eval_stack(&script, VerifyFlags::empty()),
                Ok(vec![hex::decode(test.expected).unwrap()]),
                "opcode {:#04x} failed",
                test.opcode
            );
        }
    }

    #[test]
    fn test_minimal_data_policy() {
        // A direct-bytes value encoded through OpPushData1.
        let script = vec![OpPushData1, 0x02, 0xab, 0xcd];
        assert!(eval_result(&script, VerifyFlags::empty()).is_ok());
        match eval_result(&script, VerifyFlags::MINIMAL_DATA) {
            Err(ScriptError::NotMinimalData(_)) => {}
            other => panic!("expected a minimal-data error, got {other:?}"),
        }

        // A padded numeric operand.
        let script = [push(&[0x01, 0x00]), vec![OpTrue, OpAdd]].concat();
        assert!(eval_result(&script, VerifyFlags::empty()).is_ok());
        match eval_result(&script, VerifyFlags::MINIMAL_DATA) {
            Err(ScriptError::NotMinimalData(_)) => {}
            other => panic!("expected a minimal-data error, got {other:?}"),
        }
    }

    #[test]
    fn test_script_size_limit() {
        let script = vec![OpTrue; MAX_SCRIPT_SIZE];
        assert!(eval_result(&script, VerifyFlags::empty()).is_ok());
        let script = vec![OpTrue; MAX_SCRIPT_SIZE + 1];
        assert_eq!(
            eval_result(&script, VerifyFlags::empty()),
            Err(ScriptError::ScriptSize(MAX_SCRIPT_SIZE + 1, MAX_SCRIPT_SIZE))
        );
    }

    #[test]
    fn test_operation_limit() {
        // Pushes are free; executed non-push opcodes are counted.
        let mut script = vec![OpTrue];
        script.extend(vec![OpNop; MAX_OPS_PER_SCRIPT as usize]);
        assert!(eval_result(&script, VerifyFlags::empty()).is_ok());

        script.push(OpNop);
        assert_eq!(
            eval_result(&script, VerifyFlags::empty()),
            Err(ScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT))
        );

        // Opcodes in dead branches count too.
        let mut script = vec![OpFalse, OpIf];
        script.extend(vec![OpNop; MAX_OPS_PER_SCRIPT as usize]);
        script.extend([OpEndIf, OpTrue]);
        assert_eq!(
            eval_result(&script, VerifyFlags::empty()),
            Err(ScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT))
        );
    }

    #[test]
    fn test_element_size_limit() {
        let mut builder = ScriptBuilder::new();
        builder.add_data_unchecked(&[0x01; MAX_SCRIPT_ELEMENT_SIZE + 1]);
        assert_eq!(
            eval_result(builder.script(), VerifyFlags::empty()),
            Err(ScriptError::ElementTooBig(MAX_SCRIPT_ELEMENT_SIZE + 1, MAX_SCRIPT_ELEMENT_SIZE))
        );
    }

    #[test]
    fn test_stack_size_limit() {
        let checker = NoopChecker;
        let mut vm = ScriptEngine::new(VerifyFlags::empty(), &checker, SigVersion::Base);
        vm.eval_script(&vec![OpTrue; 10]).unwrap();
        assert_eq!(
            vm.eval_script(&vec![OpTrue; MAX_SCRIPT_SIZE]),
            Err(ScriptError::StackSizeExceeded(MAX_STACK_SIZE + 1, MAX_STACK_SIZE))
        );
    }

    #[test]
    fn test_find_and_delete() {
        struct TestCase {
            name: &'static str,
            haystack: &'static [u8],
            needle: &'static [u8],
            expected: &'static [u8],
        }

        let tests = vec![
            TestCase { name: "no match", haystack: &[1, 2, 3], needle: &[4], expected: &[1, 2, 3] },
            TestCase { name: "single match", haystack: &[1, 2, 3], needle: &[2], expected: &[1, 3] },
            TestCase { name: "match at end", haystack: &[1, 2, 3, 4], needle: &[3, 4], expected: &[1, 2] },
            TestCase { name: "repeated", haystack: &[7, 7, 7, 1], needle: &[7], expected: &[1] },
            TestCase { name: "empty needle", haystack: &[1, 2], needle: &[], expected: &[1, 2] },
            TestCase { name: "needle longer", haystack: &[1], needle: &[1, 2], expected: &[1] },
            // The partial match in the tail must be preserved.
            TestCase { name: "partial tail", haystack: &[1, 2, 1], needle: &[1, 2], expected: &[1] },
            TestCase { name: "no recombination", haystack: &[1, 1, 2, 2], needle: &[1, 2], expected: &[1, 2] },
        ];

        for test in tests {
            assert_eq!(find_and_delete(test.haystack, test.needle), test.expected, "case {} failed", test.name);
        }
    }

    #[test]
    fn test_check_sig() {
        let pub_key = vec![0x0a, 0x0b];
        let sig = [pub_key.as_slice(), &[SIG_HASH_ALL]].concat();
        let script_pubkey = [push(&pub_key), vec![OpCheckSig]].concat();
        let script_sig = push(&sig);

        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Ok(())
        );

        let mut bad_sig = sig.clone();
        bad_sig[0] ^= 0xff;
        assert_eq!(
            verify_script(&push(&bad_sig), &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );
        assert_eq!(
            verify_script(
                &push(&bad_sig),
                &script_pubkey,
                &[],
                VerifyFlags::NULL_FAIL,
                &MatchingChecker,
                SigVersion::Base
            ),
            Err(ScriptError::NullFail)
        );
        // An empty signature is an honest failure, never a NULL_FAIL
        // violation.
        assert_eq!(
            verify_script(&push(&[]), &script_pubkey, &[], VerifyFlags::NULL_FAIL, &MatchingChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );
    }

    #[test]
    fn test_check_multisig() {
        let keys: Vec<Vec<u8>> = vec![vec![0x0a], vec![0x0b], vec![0x0c]];
        let key_slices: Vec<&[u8]> = keys.iter().map(|key| key.as_slice()).collect();
        let sig = |key: &[u8]| [key, &[SIG_HASH_ALL]].concat();
        let script_pubkey = standard::multisig_script(2, &key_slices).unwrap();

        // 2-of-3 with signatures in key order.
        let script_sig = [push(&[]), push(&sig(&keys[0])), push(&sig(&keys[2]))].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Ok(())
        );

        // The same signatures out of order never match.
        let script_sig = [push(&[]), push(&sig(&keys[2])), push(&sig(&keys[0]))].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );

        // 3-of-3: every signature is individually valid, but only the
        // key-ordered arrangement verifies.
        let script_pubkey3 = standard::multisig_script(3, &key_slices).unwrap();
        let ordered = [push(&[]), push(&sig(&keys[0])), push(&sig(&keys[1])), push(&sig(&keys[2]))].concat();
        assert_eq!(
            verify_script(&ordered, &script_pubkey3, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Ok(())
        );
        let shuffled = [push(&[]), push(&sig(&keys[1])), push(&sig(&keys[0])), push(&sig(&keys[2]))].concat();
        assert_eq!(
            verify_script(&shuffled, &script_pubkey3, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );

        // The dummy element must be empty under NULL_DUMMY.
        let script_sig = [push(&[0x01]), push(&sig(&keys[0])), push(&sig(&keys[1]))].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::NULL_DUMMY, &MatchingChecker, SigVersion::Base),
            Err(ScriptError::SigNullDummy)
        );
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Ok(())
        );

        // Zero signatures always succeed, consuming only the dummy.
        let script_pubkey = standard::multisig_script(0, &key_slices).unwrap();
        assert_eq!(
            verify_script(&push(&[]), &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base),
            Ok(())
        );
    }

    #[test]
    fn test_multisig_counts() {
        // 21 keys overflow the key bound.
        let keys: Vec<Vec<u8>> = (0u8..21).map(|byte| vec![byte]).collect();
        let key_slices: Vec<&[u8]> = keys.iter().map(|key| key.as_slice()).collect();
        let script_pubkey = standard::multisig_script(1, &key_slices).unwrap();
        let script_sig = [push(&[]), push(&[0x00, SIG_HASH_ALL])].concat();
        match verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &MatchingChecker, SigVersion::Base) {
            Err(ScriptError::InvalidPubKeyCount(_)) => {}
            other => panic!("expected a pubkey count error, got {other:?}"),
        }

        // Zero keys are rejected outright.
        let script = vec![OpFalse, OpFalse, OpFalse, OpCheckMultiSig];
        match eval_result(&script, VerifyFlags::empty()) {
            Err(ScriptError::InvalidPubKeyCount(_)) => {}
            other => panic!("expected a pubkey count error, got {other:?}"),
        }

        // More signatures than keys are rejected.
        let script =
            [vec![OpFalse, OpFalse, OpFalse, Op2], push(&[0x0a]), vec![OpTrue, OpCheckMultiSig]].concat();
        match eval_result(&script, VerifyFlags::empty()) {
            Err(ScriptError::InvalidSignatureCount(_)) => {}
            other => panic!("expected a signature count error, got {other:?}"),
        }
    }

    #[test]
    fn test_p2sh() {
        // Redeem script: <x> 42 EQUAL.
        let redeem_script = [push(&[0x2a]), vec![OpEqual]].concat();
        let script_pubkey = standard::pay_to_script_hash(&redeem_script);
        let script_sig = [push(&[0x2a]), push(&redeem_script)].concat();

        let flags = VerifyFlags::P2SH;
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], flags, &NoopChecker, SigVersion::Base),
            Ok(())
        );
        // Clean stack holds: the redeem script consumed its input.
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], flags | VerifyFlags::CLEAN_STACK, &NoopChecker, SigVersion::Base),
            Ok(())
        );

        // Without the flag the output is just a hash comparison, which
        // the pushed redeem script satisfies on its own.
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &NoopChecker, SigVersion::Base),
            Ok(())
        );

        // Wrong unlocking value: the hash still matches, the redeem
        // script itself fails.
        let script_sig = [push(&[0x2b]), push(&redeem_script)].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );

        // Corrupted redeem script: the hash comparison fails first.
        let mut bad_redeem = redeem_script.clone();
        bad_redeem[1] ^= 0x01;
        let script_sig = [push(&[0x2a]), push(&bad_redeem)].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );

        // A non-push signature script is malleable and rejected.
        let script_sig = [push(&[0x2a]), push(&redeem_script), vec![OpNop]].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::SignatureScriptNotPushOnly)
        );
    }

    #[test]
    fn test_sig_push_only() {
        let script_pubkey = vec![OpTrue];
        let script_sig = vec![OpTrue, OpDup, OpDrop];
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &NoopChecker, SigVersion::Base),
            Ok(())
        );
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::SIG_PUSH_ONLY, &NoopChecker, SigVersion::Base),
            Err(ScriptError::SignatureScriptNotPushOnly)
        );
    }

    #[test]
    fn test_clean_stack() {
        let script_sig = vec![Op2];
        let script_pubkey = vec![OpTrue];
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::empty(), &NoopChecker, SigVersion::Base),
            Ok(())
        );
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::CLEAN_STACK, &NoopChecker, SigVersion::Base),
            Err(ScriptError::CleanStack(1))
        );
    }

    #[test]
    fn test_lock_time_verify() {
        let checker = LockBoundChecker { lock_time: 100, sequence: 50 };
        let flags = VerifyFlags::CHECK_LOCK_TIME_VERIFY;
        let script = |value: i64| {
            let mut builder = ScriptBuilder::new();
            builder.add_i64(value).unwrap();
            builder.add_op(OpCheckLockTimeVerify).unwrap();
            builder.add_op(OpTrue).unwrap();
            builder.drain()
        };

        let eval = |script: &[u8], flags: VerifyFlags| {
            let mut vm = ScriptEngine::new(flags, &checker, SigVersion::Base);
            vm.eval_script(script)?;
            vm.check_eval_success()
        };

        assert_eq!(eval(&script(99), flags), Ok(()));
        assert_eq!(eval(&script(100), flags), Ok(()));
        match eval(&script(101), flags) {
            Err(ScriptError::UnsatisfiedLockTime(_)) => {}
            other => panic!("expected an unsatisfied lock time, got {other:?}"),
        }
        assert_eq!(eval(&script(-1), flags), Err(ScriptError::NegativeLockTime(-1)));
        // Five-byte operands are accepted but anything beyond u32 can
        // never be satisfied.
        match eval(&script(1 << 33), flags) {
            Err(ScriptError::UnsatisfiedLockTime(_)) => {}
            other => panic!("expected an unsatisfied lock time, got {other:?}"),
        }

        // Inactive: a pure no-op, the operand stays on the stack.
        let checker2 = NoopChecker;
        let mut vm = ScriptEngine::new(VerifyFlags::empty(), &checker2, SigVersion::Base);
        vm.eval_script(&script(101)).unwrap();
        assert_eq!(vm.stack(), &[vec![101u8], vec![1]]);

        // Inactive but discouraged.
        assert_eq!(
            eval(&script(99), VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS),
            Err(ScriptError::DiscourageUpgradableNops)
        );
    }

    #[test]
    fn test_sequence_verify() {
        let checker = LockBoundChecker { lock_time: 100, sequence: 50 };
        let flags = VerifyFlags::CHECK_SEQUENCE_VERIFY;
        let script = |value: i64| {
            let mut builder = ScriptBuilder::new();
            builder.add_i64(value).unwrap();
            builder.add_op(OpCheckSequenceVerify).unwrap();
            builder.add_op(OpTrue).unwrap();
            builder.drain()
        };

        let eval = |script: &[u8], flags: VerifyFlags| {
            let mut vm = ScriptEngine::new(flags, &checker, SigVersion::Base);
            vm.eval_script(script)?;
            vm.check_eval_success()
        };

        assert_eq!(eval(&script(50), flags), Ok(()));
        match eval(&script(51), flags) {
            Err(ScriptError::UnsatisfiedLockTime(_)) => {}
            other => panic!("expected an unsatisfied sequence, got {other:?}"),
        }
        assert_eq!(eval(&script(-1), flags), Err(ScriptError::NegativeLockTime(-1)));
        // The disable bit short-circuits before the checker, which
        // would reject this value.
        assert_eq!(eval(&script((1 << 31) | 51), flags), Ok(()));
    }

    #[test]
    fn test_witness_key_hash() {
        let pub_key = vec![0x0a, 0x0b, 0x0c];
        let sig = [pub_key.as_slice(), &[SIG_HASH_ALL]].concat();
        let program = standard::hash160(&pub_key);
        let script_pubkey = standard::pay_to_witness(0, &program).unwrap();
        let witness = vec![sig.clone(), pub_key.clone()];
        let flags = VerifyFlags::WITNESS;

        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, flags, &MatchingChecker, SigVersion::Base),
            Ok(())
        );

        // The implied script requires exactly signature and key.
        assert_eq!(
            verify_script(&[], &script_pubkey, &[pub_key.clone()], flags, &MatchingChecker, SigVersion::Base),
            Err(ScriptError::WitnessProgramMismatch)
        );

        // A wrong key fails the hash binding inside the implied script.
        let witness = vec![sig.clone(), vec![0x0d]];
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, flags, &MatchingChecker, SigVersion::Base),
            Err(ScriptError::VerifyError)
        );

        // Signature script content on a native witness output is
        // malleation.
        let witness = vec![sig, pub_key];
        assert_eq!(
            verify_script(&[OpTrue, OpDrop], &script_pubkey, &witness, flags, &MatchingChecker, SigVersion::Base),
            Err(ScriptError::WitnessMalleated)
        );
    }

    #[test]
    fn test_witness_script_hash() {
        let witness_script = [push(&[0x2a]), vec![OpEqual]].concat();
        let program = standard::double_sha256(&witness_script);
        let script_pubkey = standard::pay_to_witness(0, &program).unwrap();
        let flags = VerifyFlags::WITNESS;

        let witness = vec![vec![0x2a], witness_script.clone()];
        assert_eq!(verify_script(&[], &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base), Ok(()));

        // Wrong input leaves false on top.
        let witness = vec![vec![0x2b], witness_script.clone()];
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::EvalFalse)
        );

        // A corrupted witness script breaks the hash binding.
        let mut bad_script = witness_script.clone();
        bad_script[1] ^= 0x01;
        let witness = vec![vec![0x2a], bad_script];
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::WitnessProgramMismatch)
        );

        // An empty witness cannot even name the script.
        assert_eq!(
            verify_script(&[], &script_pubkey, &[], flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::WitnessProgramEmpty)
        );

        // Witness evaluation is always clean stack.
        let witness = vec![vec![0x2a], vec![0x2a], witness_script];
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::CleanStack(1))
        );
    }

    #[test]
    fn test_witness_versions() {
        let script_pubkey = standard::pay_to_witness(1, &[0xab; 20]).unwrap();
        // Unknown versions are anyone-can-spend for forward
        // compatibility. The output itself still has to evaluate to
        // true, which a witness-program shaped script does: version
        // byte and program are both pushes.
        assert_eq!(
            verify_script(&[], &script_pubkey, &[vec![0x01]], VerifyFlags::WITNESS, &NoopChecker, SigVersion::Base),
            Ok(())
        );
        assert_eq!(
            verify_script(
                &[],
                &script_pubkey,
                &[vec![0x01]],
                VerifyFlags::WITNESS | VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
                &NoopChecker,
                SigVersion::Base
            ),
            Err(ScriptError::DiscourageUpgradableWitnessProgram)
        );

        // Wrong v0 program lengths are invalid outright.
        let script_pubkey = standard::pay_to_witness(0, &[0xab; 25]).unwrap();
        assert_eq!(
            verify_script(&[], &script_pubkey, &[vec![0x01]], VerifyFlags::WITNESS, &NoopChecker, SigVersion::Base),
            Err(ScriptError::WitnessProgramWrongLength(25))
        );
    }

    #[test]
    fn test_witness_unexpected() {
        // A witness alongside a non-witness output is an error, but
        // only when witness validation is active.
        let script_pubkey = vec![OpTrue];
        let witness = vec![vec![0x01]];
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, VerifyFlags::WITNESS, &NoopChecker, SigVersion::Base),
            Err(ScriptError::WitnessUnexpected)
        );
        assert_eq!(
            verify_script(&[], &script_pubkey, &witness, VerifyFlags::empty(), &NoopChecker, SigVersion::Base),
            Ok(())
        );
    }

    #[test]
    fn test_p2sh_wrapped_witness() {
        let witness_script = [push(&[0x2a]), vec![OpEqual]].concat();
        let program = standard::double_sha256(&witness_script);
        let redeem_script = standard::pay_to_witness(0, &program).unwrap();
        let script_pubkey = standard::pay_to_script_hash(&redeem_script);
        let script_sig = push(&redeem_script);
        let witness = vec![vec![0x2a], witness_script];
        let flags = VerifyFlags::P2SH | VerifyFlags::WITNESS;

        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Ok(())
        );

        // Anything beyond the single canonical push is malleation.
        let script_sig = [push(&[]), vec![OpDrop], push(&redeem_script)].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::SignatureScriptNotPushOnly)
        );
        let script_sig = [push(&[]), push(&redeem_script)].concat();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &witness, flags, &NoopChecker, SigVersion::Base),
            Err(ScriptError::WitnessMalleatedP2sh)
        );
    }

    #[test]
    fn test_code_separator_subscript() {
        // The checker sees only the script after the last separator,
        // with the signature push removed.
        struct SubscriptChecker {
            expected: Vec<u8>,
        }

        impl SignatureChecker for SubscriptChecker {
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
                subscript: &[u8],
                _sig_version: SigVersion,
            ) -> Result<bool, ScriptError> {
                Ok(subscript == self.expected)
            }
        }

        let sig = vec![0x01, SIG_HASH_ALL];
        let pub_key = vec![0x0a];
        // <sig> <key> NOP CODESEPARATOR <sig-again> DROP CHECKSIG
        let script = [
            push(&sig),
            push(&pub_key),
            vec![OpNop, OpCodeSeparator],
            push(&sig),
            vec![OpDrop, OpCheckSig],
        ]
        .concat();

        // Expected subscript: everything after the separator, with the
        // canonical signature pushes deleted.
        let expected = [vec![OpDrop, OpCheckSig]].concat();
        let checker = SubscriptChecker { expected };
        let mut vm = ScriptEngine::new(VerifyFlags::empty(), &checker, SigVersion::Base);
        vm.eval_script(&script).unwrap();
        assert_eq!(vm.check_eval_success(), Ok(()));

        // Under witness and fork-id hashing the signature pushes stay
        // in place.
        for sig_version in [SigVersion::WitnessV0, SigVersion::ForkId] {
            let expected = [push(&sig), vec![OpDrop, OpCheckSig]].concat();
            let checker = SubscriptChecker { expected };
            let mut vm = ScriptEngine::new(VerifyFlags::empty(), &checker, sig_version);
            vm.eval_script(&script).unwrap();
            assert_eq!(vm.check_eval_success(), Ok(()), "no filtering expected under {sig_version:?}");
        }
    }

    #[test]
    fn test_trace() {
        let checker = NoopChecker;
        let mut vm = ScriptEngine::new(VerifyFlags::ENABLE_TRACE, &checker, SigVersion::Base);
        vm.eval_script(&[Op2, Op3, OpAdd]).unwrap();

        let trace = vm.trace();
        assert_eq!(trace.iter().map(|entry| entry.opcode).collect::<Vec<_>>(), vec![Op2, Op3, OpAdd]);
        assert_eq!(trace[2].stack, vec![vec![5]]);
        assert_eq!(trace[2].pc, 3);

        // Skipped opcodes are not recorded.
        let mut vm = ScriptEngine::new(VerifyFlags::ENABLE_TRACE, &checker, SigVersion::Base);
        vm.eval_script(&[OpFalse, OpIf, Op2, OpEndIf]).unwrap();
        let opcodes: Vec<u8> = vm.trace().iter().map(|entry| entry.opcode).collect();
        assert_eq!(opcodes, vec![OpFalse, OpIf, OpEndIf]);
    }

    #[test]
    fn test_reserialize() {
        // Deserializing and reserializing a script must reproduce it
        // byte for byte.
        let script = [
            vec![OpFalse, OpTrue, Op16, Op1Negate],
            push(&[0xab; 3]),
            vec![OpPushData1, 0x02, 0x01, 0x02],
            vec![OpPushData2, 0x01, 0x00, 0xee],
            vec![OpDup, OpHash160, OpEqualVerify, OpCheckSig, OpIf, OpElse, OpEndIf],
        ]
        .concat();

        let reserialized: Vec<u8> = script
            .iter()
            .batching(|it| deserialize_next_opcode::<_, NoopChecker>(it))
            .flat_map(|opcode| opcode.expect("the script is well formed").serialize())
            .collect();
        assert_eq!(reserialized, script);
    }

    #[test]
    fn test_unknown_opcode_fails_anywhere() {
        // Unknown values fail at decode time, even inside a dead
        // branch.
        let script = vec![OpFalse, OpIf, 0xba, OpEndIf, OpTrue];
        match eval_result(&script, VerifyFlags::empty()) {
            Err(ScriptError::InvalidOpcode(_)) => {}
            other => panic!("expected an invalid opcode error, got {other:?}"),
        }
    }
}
