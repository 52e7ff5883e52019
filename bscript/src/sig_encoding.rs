use crate::{ScriptError, SigVersion, VerifyFlags};

pub const SIG_HASH_ALL: u8 = 0x01;
pub const SIG_HASH_NONE: u8 = 0x02;
pub const SIG_HASH_SINGLE: u8 = 0x03;
pub const SIG_HASH_FORK_ID: u8 = 0x40;
pub const SIG_HASH_ANYONE_CAN_PAY: u8 = 0x80;

/// Half the secp256k1 group order, big-endian. An S value above this
/// bound has a canonical mirror below it, which is what the low-S
/// policy demands.
const HALF_GROUP_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x5d, 0x57, 0x6e,
    0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Structural DER check per the consensus rules. `sig` still carries
/// the trailing hash type byte.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    // Layout: 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [hashtype]
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 {
        return false;
    }
    if sig[1] as usize != sig.len() - 3 {
        return false;
    }
    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != sig.len() {
        return false;
    }
    if sig[2] != 0x02 {
        return false;
    }
    if len_r == 0 {
        return false;
    }
    if sig[4] & 0x80 != 0 {
        return false;
    }
    // A leading zero is only allowed to clear a would-be sign bit.
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }
    if sig[len_r + 4] != 0x02 {
        return false;
    }
    if len_s == 0 {
        return false;
    }
    if sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }
    true
}

/// Low-S check. Assumes (and re-verifies) structural DER validity.
pub fn is_low_der_signature(sig: &[u8]) -> bool {
    if !is_valid_signature_encoding(sig) {
        return false;
    }
    let len_r = sig[3] as usize;
    let len_s = sig[5 + len_r] as usize;
    let s = &sig[6 + len_r..6 + len_r + len_s];

    let stripped = match s.iter().position(|&b| b != 0) {
        Some(first) => &s[first..],
        None => return true,
    };
    match stripped.len().cmp(&HALF_GROUP_ORDER.len()) {
        core::cmp::Ordering::Greater => false,
        core::cmp::Ordering::Less => true,
        core::cmp::Ordering::Equal => stripped <= &HALF_GROUP_ORDER[..],
    }
}

/// Membership test for the trailing sighash-type byte: base type must
/// be ALL, NONE or SINGLE after masking the modifier bits that are
/// admissible in the given context.
pub fn is_defined_hash_type(hash_type: u8, allow_fork_id: bool) -> bool {
    let mut base = hash_type & !SIG_HASH_ANYONE_CAN_PAY;
    if allow_fork_id {
        base &= !SIG_HASH_FORK_ID;
    }
    (SIG_HASH_ALL..=SIG_HASH_SINGLE).contains(&base)
}

pub fn is_compressed_pub_key(pub_key: &[u8]) -> bool {
    pub_key.len() == 33 && (pub_key[0] == 0x02 || pub_key[0] == 0x03)
}

pub fn is_uncompressed_pub_key(pub_key: &[u8]) -> bool {
    pub_key.len() == 65 && pub_key[0] == 0x04
}

pub fn check_pub_key_encoding(pub_key: &[u8], flags: VerifyFlags) -> Result<(), ScriptError> {
    if flags.contains(VerifyFlags::COMPRESSED_PUBKEY_TYPE) && !is_compressed_pub_key(pub_key) {
        return Err(ScriptError::PubKeyFormat);
    }
    if flags.contains(VerifyFlags::STRICT_ENCODING)
        && !(is_compressed_pub_key(pub_key) || is_uncompressed_pub_key(pub_key))
    {
        return Err(ScriptError::PubKeyFormat);
    }
    Ok(())
}

/// Flag-driven composite used by the signature opcodes. An empty
/// signature always passes; it simply fails verification later.
pub fn check_signature_encoding(sig: &[u8], flags: VerifyFlags, sig_version: SigVersion) -> Result<(), ScriptError> {
    if sig.is_empty() {
        return Ok(());
    }
    if flags.intersects(VerifyFlags::DER_SIGNATURES | VerifyFlags::LOW_S | VerifyFlags::STRICT_ENCODING)
        && !is_valid_signature_encoding(sig)
    {
        return Err(ScriptError::SigDer(format!("signature of {} bytes is not canonical DER", sig.len())));
    }
    if flags.contains(VerifyFlags::LOW_S) && !is_low_der_signature(sig) {
        return Err(ScriptError::SigHighS);
    }
    if flags.contains(VerifyFlags::STRICT_ENCODING) {
        let hash_type = sig[sig.len() - 1];
        let allow_fork_id = sig_version == SigVersion::ForkId || flags.contains(VerifyFlags::SIGHASH_FORK_ID);
        if !is_defined_hash_type(hash_type, allow_fork_id) {
            return Err(ScriptError::InvalidSigHashType(hash_type));
        }
    }
    Ok(())
}
