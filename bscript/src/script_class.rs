use crate::checker::NoopChecker;
use crate::opcodes::{codes, deserialize_next_opcode};
use itertools::Itertools;

/// Recognizes the canonical pay-to-script-hash template:
/// `OpHash160 <20-byte hash> OpEqual`, exactly 23 bytes.
pub fn is_pay_to_script_hash(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == codes::OpHash160 && script[1] == codes::OpData20 && script[22] == codes::OpEqual
}

/// Extracts (version, program) from a witness-program shaped script:
/// one version push (OpFalse or OpTrue..Op16), one length byte and a
/// 2..=40 byte program.
pub fn parse_witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        codes::OpFalse => 0,
        value @ codes::OpTrue..=codes::Op16 => value - codes::OpTrue + 1,
        _ => return None,
    };
    if script[1] as usize + 2 != script.len() {
        return None;
    }
    Some((version, &script[2..]))
}

/// True when every decoded opcode is a push of some form. Malformed
/// scripts are not push only.
pub fn is_push_only(script: &[u8]) -> bool {
    script
        .iter()
        .batching(|it| deserialize_next_opcode::<_, NoopChecker>(it))
        .all(|opcode| opcode.map(|opcode| opcode.is_push_opcode()).unwrap_or(false))
}
