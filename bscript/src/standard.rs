//! Construction of the standard output script templates.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::opcodes::codes;
use crate::script_builder::{ScriptBuilder, ScriptBuilderError, ScriptBuilderResult};

/// SHA-256 followed by RIPEMD-160, the short hash used by the
/// pay-to-pubkey-hash and pay-to-script-hash templates.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Double SHA-256, the binding hash of 32-byte witness programs.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// `OpDup OpHash160 <20-byte hash> OpEqualVerify OpCheckSig`. The
/// template is fixed size, so it is assembled directly.
pub fn pay_to_pubkey_hash(pubkey_hash: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(codes::OpDup);
    script.push(codes::OpHash160);
    script.push(codes::OpData20);
    script.extend_from_slice(pubkey_hash);
    script.push(codes::OpEqualVerify);
    script.push(codes::OpCheckSig);
    script
}

/// `OpHash160 <hash160(redeem_script)> OpEqual`.
pub fn pay_to_script_hash(redeem_script: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.push(codes::OpHash160);
    script.push(codes::OpData20);
    script.extend_from_slice(&hash160(redeem_script));
    script.push(codes::OpEqual);
    script
}

/// `<m> <key 1> .. <key n> <n> OpCheckMultiSig` for an m-of-n policy.
pub fn multisig_script(required: usize, pub_keys: &[&[u8]]) -> ScriptBuilderResult<Vec<u8>> {
    if required > pub_keys.len() {
        return Err(ScriptBuilderError::IntegerRejected(required as i64));
    }
    let mut builder = ScriptBuilder::new();
    builder.add_i64(required as i64)?;
    for pub_key in pub_keys {
        builder.add_data(pub_key)?;
    }
    builder.add_i64(pub_keys.len() as i64)?;
    builder.add_op(codes::OpCheckMultiSig)?;
    Ok(builder.drain())
}

/// `<version> <program>` where the version is a small-integer opcode.
/// Callers are expected to pass a program of 2 to 40 bytes, matching
/// what [`crate::script_class::parse_witness_program`] recognizes.
pub fn pay_to_witness(version: u8, program: &[u8]) -> ScriptBuilderResult<Vec<u8>> {
    let mut builder = ScriptBuilder::new();
    builder.add_i64(version as i64)?;
    builder.add_data(program)?;
    Ok(builder.drain())
}
