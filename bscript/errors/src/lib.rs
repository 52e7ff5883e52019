use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum ScriptError {
    #[error("invalid push size encoding: {0:02x?}")]
    MalformedPushSize(Vec<u8>),
    #[error("opcode requires {0} bytes, but script only has {1} remaining")]
    MalformedPush(usize, usize),
    #[error("combined stack size {0} > max allowed {1}")]
    StackSizeExceeded(usize, usize),
    #[error("attempt to execute invalid opcode {0}")]
    InvalidOpcode(String),
    #[error("attempt to execute reserved opcode {0}")]
    OpcodeReserved(String),
    #[error("attempt to execute disabled opcode {0}")]
    OpcodeDisabled(String),
    #[error("attempt to read from empty stack")]
    EmptyStack,
    #[error("stack contains {0} unexpected items")]
    CleanStack(usize),
    #[error("false stack entry at end of script execution")]
    EvalFalse,
    #[error("script returned early")]
    EarlyReturn,
    #[error("script ran, but verification failed")]
    VerifyError,
    #[error("encountered invalid state while running script: {0}")]
    InvalidState(String),
    #[error("exceeded max operation limit of {0}")]
    TooManyOperations(i32),
    #[error("element size {0} exceeds max allowed size {1}")]
    ElementTooBig(usize, usize),
    #[error("push encoding is not minimal: {0}")]
    NotMinimalData(String),
    #[error("operand for conditional is not minimally encoded")]
    MinimalIf,
    #[error("number too big: {0}")]
    NumberTooBig(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("bitwise operand sizes differ: {0} vs {1}")]
    OperandSize(usize, usize),
    #[error("negative lock time {0}")]
    NegativeLockTime(i64),
    #[error("unsatisfied lock time: {0}")]
    UnsatisfiedLockTime(String),
    #[error("not all signatures empty on failed checkmultisig")]
    NullFail,
    #[error("multisig dummy argument is not empty")]
    SigNullDummy,
    #[error("invalid signature count: {0}")]
    InvalidSignatureCount(String),
    #[error("invalid pubkey count: {0}")]
    InvalidPubKeyCount(String),
    #[error("invalid hash type {0:#04x}")]
    InvalidSigHashType(u8),
    #[error("malformed DER signature: {0}")]
    SigDer(String),
    #[error("signature S value is unnecessarily high")]
    SigHighS,
    #[error("unsupported public key type")]
    PubKeyFormat,
    #[error("signature script is not push only")]
    SignatureScriptNotPushOnly,
    #[error("end of script reached in conditional execution")]
    UnbalancedConditional,
    #[error("opcode requires at least {0} items, but stack has only {1}")]
    InvalidStackOperation(usize, usize),
    #[error("script of size {0} exceeded maximum allowed size of {1}")]
    ScriptSize(usize, usize),
    #[error("upgradable NOPs are discouraged")]
    DiscourageUpgradableNops,
    #[error("upgradable witness programs are discouraged")]
    DiscourageUpgradableWitnessProgram,
    #[error("witness program has incorrect length {0}")]
    WitnessProgramWrongLength(usize),
    #[error("witness program hash mismatch")]
    WitnessProgramMismatch,
    #[error("witness program was passed an empty witness")]
    WitnessProgramEmpty,
    #[error("witness requires an empty signature script")]
    WitnessMalleated,
    #[error("witness requires the signature script to be a single push of the redeem script")]
    WitnessMalleatedP2sh,
    #[error("unexpected witness data")]
    WitnessUnexpected,
}
