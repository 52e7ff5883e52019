#[macro_use]
mod macros;

use crate::{
    checker::SignatureChecker,
    data_stack::{self, DataStack},
    ScriptEngine, ScriptError, VerifyFlags, MAX_SCRIPT_ELEMENT_SIZE,
};
use core::fmt::Debug;
use core::mem::size_of;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Largest opcode value that carries no cost toward the operation limit.
/// Everything at or below this value is a push of some form.
pub(crate) const NO_COST_OPCODE: u8 = 0x60;

/// Largest value a "small integer" constant opcode can push.
pub const OP_SMALL_INT_MAX_VAL: u8 = 16;
/// Direct push-bytes opcode range.
pub const OP_DATA_MIN_VAL: u8 = 0x01;
pub const OP_DATA_MAX_VAL: u8 = 0x4b;
/// Single-byte encoding of -1, pushed canonically with Op1Negate.
pub const OP_1_NEGATE_VAL: u8 = 0x81;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum OpCond {
    False,
    True,
    Skip,
}

impl OpCond {
    pub fn negate(&self) -> OpCond {
        match self {
            OpCond::False => OpCond::True,
            OpCond::True => OpCond::False,
            OpCond::Skip => OpCond::Skip,
        }
    }
}

pub(crate) type OpCodeResult = Result<(), ScriptError>;

#[derive(Debug)]
pub(crate) struct OpCode<const CODE: u8> {
    data: Vec<u8>,
}

pub trait OpCodeMetadata: Debug {
    /// The numeric value of the opcode byte.
    fn value(&self) -> u8;
    /// Inline data length.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn get_data(&self) -> &[u8];
    /// Legacy string/bit/arithmetic opcodes that fail unconditionally
    /// unless the engine is told to keep them enabled.
    fn is_disabled(&self) -> bool;
    /// Opcodes that terminate the script even inside a skipped branch.
    fn always_illegal(&self) -> bool;
    /// Pushes of any form, exempt from the operation count.
    fn is_push_opcode(&self) -> bool;
    /// Conditional-flow opcodes, processed even when skipping.
    fn is_conditional(&self) -> bool;
    fn check_minimal_data_push(&self) -> Result<(), ScriptError>;
}

pub trait OpCodeExecution<C: SignatureChecker> {
    fn empty() -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError>
    where
        Self: Sized;
    #[allow(clippy::new_ret_no_self)]
    fn new(data: Vec<u8>) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError>
    where
        Self: Sized;
    fn execute(&self, vm: &mut ScriptEngine<'_, C>) -> OpCodeResult;
}

pub trait OpcodeSerialization {
    fn serialize(&self) -> Vec<u8>;
    /// Total encoded length, opcode byte and length prefix included.
    fn serialized_len(&self) -> usize;
    fn deserialize<'i, I: Iterator<Item = &'i u8>, C: SignatureChecker>(
        it: &mut I,
    ) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError>
    where
        Self: Sized;
}

pub trait OpCodeImplementation<C: SignatureChecker>: OpCodeExecution<C> + OpCodeMetadata + OpcodeSerialization {}

impl<const CODE: u8> OpCodeMetadata for OpCode<CODE> {
    fn value(&self) -> u8 {
        CODE
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get_data(&self) -> &[u8] {
        &self.data
    }

    fn is_disabled(&self) -> bool {
        matches!(
            CODE,
            codes::OpCat
                | codes::OpSubStr
                | codes::OpLeft
                | codes::OpRight
                | codes::OpInvert
                | codes::OpAnd
                | codes::OpOr
                | codes::OpXor
                | codes::Op2Mul
                | codes::Op2Div
                | codes::OpMul
                | codes::OpDiv
                | codes::OpMod
                | codes::OpLShift
                | codes::OpRShift
        )
    }

    fn always_illegal(&self) -> bool {
        matches!(CODE, codes::OpVerIf | codes::OpVerNotIf)
    }

    fn is_push_opcode(&self) -> bool {
        CODE <= NO_COST_OPCODE
    }

    fn is_conditional(&self) -> bool {
        matches!(CODE, codes::OpIf | codes::OpNotIf | codes::OpElse | codes::OpEndIf)
    }

    fn check_minimal_data_push(&self) -> Result<(), ScriptError> {
        let data_len = self.len();
        let opcode = self.value();

        if data_len == 0 {
            if opcode != codes::OpFalse {
                return Err(ScriptError::NotMinimalData(format!(
                    "zero length data push is encoded with opcode {self:?} instead of OpFalse"
                )));
            }
        } else if data_len == 1 && (1..=16).contains(&self.data[0]) {
            if opcode != codes::OpTrue + self.data[0] - 1 {
                return Err(ScriptError::NotMinimalData(format!(
                    "data push of the value {} encoded with opcode {self:?} instead of Op{}",
                    self.data[0], self.data[0]
                )));
            }
        } else if data_len == 1 && self.data[0] == 0x81 {
            if opcode != codes::Op1Negate {
                return Err(ScriptError::NotMinimalData(format!(
                    "data push of the value -1 encoded with opcode {self:?} instead of Op1Negate"
                )));
            }
        } else if data_len <= 75 {
            if opcode as usize != data_len {
                return Err(ScriptError::NotMinimalData(format!(
                    "data push of {data_len} bytes encoded with opcode {self:?} instead of OpData{data_len}"
                )));
            }
        } else if data_len <= 255 {
            if opcode != codes::OpPushData1 {
                return Err(ScriptError::NotMinimalData(format!(
                    "data push of {data_len} bytes encoded with opcode {self:?} instead of OpPushData1"
                )));
            }
        } else if data_len <= 65535 && opcode != codes::OpPushData2 {
            return Err(ScriptError::NotMinimalData(format!(
                "data push of {data_len} bytes encoded with opcode {self:?} instead of OpPushData2"
            )));
        }
        Ok(())
    }
}

pub(crate) fn deserialize_next_opcode<'i, I: Iterator<Item = &'i u8>, C: SignatureChecker>(
    it: &mut I,
) -> Option<Result<Box<dyn OpCodeImplementation<C>>, ScriptError>> {
    it.next().map(|opcode_num| deserialize_opcode(*opcode_num, it))
}

#[inline]
fn push_data<C: SignatureChecker>(data: Vec<u8>, vm: &mut ScriptEngine<'_, C>) -> OpCodeResult {
    vm.dstack.push(data);
    Ok(())
}

#[inline]
fn push_number<C: SignatureChecker>(number: i64, vm: &mut ScriptEngine<'_, C>) -> OpCodeResult {
    vm.dstack.push_number(number);
    Ok(())
}

opcode_list! {
    // Pushes
    opcode OpFalse<0x00, 1>(self, vm) push_data(vec![], vm)
    opcode OpData1<0x01, 2>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData2<0x02, 3>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData3<0x03, 4>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData4<0x04, 5>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData5<0x05, 6>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData6<0x06, 7>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData7<0x07, 8>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData8<0x08, 9>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData9<0x09, 10>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData10<0x0a, 11>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData11<0x0b, 12>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData12<0x0c, 13>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData13<0x0d, 14>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData14<0x0e, 15>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData15<0x0f, 16>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData16<0x10, 17>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData17<0x11, 18>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData18<0x12, 19>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData19<0x13, 20>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData20<0x14, 21>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData21<0x15, 22>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData22<0x16, 23>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData23<0x17, 24>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData24<0x18, 25>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData25<0x19, 26>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData26<0x1a, 27>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData27<0x1b, 28>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData28<0x1c, 29>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData29<0x1d, 30>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData30<0x1e, 31>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData31<0x1f, 32>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData32<0x20, 33>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData33<0x21, 34>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData34<0x22, 35>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData35<0x23, 36>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData36<0x24, 37>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData37<0x25, 38>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData38<0x26, 39>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData39<0x27, 40>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData40<0x28, 41>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData41<0x29, 42>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData42<0x2a, 43>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData43<0x2b, 44>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData44<0x2c, 45>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData45<0x2d, 46>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData46<0x2e, 47>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData47<0x2f, 48>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData48<0x30, 49>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData49<0x31, 50>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData50<0x32, 51>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData51<0x33, 52>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData52<0x34, 53>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData53<0x35, 54>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData54<0x36, 55>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData55<0x37, 56>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData56<0x38, 57>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData57<0x39, 58>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData58<0x3a, 59>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData59<0x3b, 60>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData60<0x3c, 61>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData61<0x3d, 62>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData62<0x3e, 63>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData63<0x3f, 64>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData64<0x40, 65>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData65<0x41, 66>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData66<0x42, 67>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData67<0x43, 68>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData68<0x44, 69>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData69<0x45, 70>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData70<0x46, 71>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData71<0x47, 72>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData72<0x48, 73>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData73<0x49, 74>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData74<0x4a, 75>(self, vm) push_data(self.data.clone(), vm)
    opcode OpData75<0x4b, 76>(self, vm) push_data(self.data.clone(), vm)
    opcode OpPushData1<0x4c, u8>(self, vm) push_data(self.data.clone(), vm)
    opcode OpPushData2<0x4d, u16>(self, vm) push_data(self.data.clone(), vm)
    opcode OpPushData4<0x4e, u32>(self, vm) push_data(self.data.clone(), vm)
    opcode Op1Negate<0x4f, 1>(self, vm) push_number(-1, vm)

    opcode OpReserved<0x50, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))

    opcode OpTrue<0x51, 1>(self, vm) push_number(1, vm)
    opcode Op2<0x52, 1>(self, vm) push_number(2, vm)
    opcode Op3<0x53, 1>(self, vm) push_number(3, vm)
    opcode Op4<0x54, 1>(self, vm) push_number(4, vm)
    opcode Op5<0x55, 1>(self, vm) push_number(5, vm)
    opcode Op6<0x56, 1>(self, vm) push_number(6, vm)
    opcode Op7<0x57, 1>(self, vm) push_number(7, vm)
    opcode Op8<0x58, 1>(self, vm) push_number(8, vm)
    opcode Op9<0x59, 1>(self, vm) push_number(9, vm)
    opcode Op10<0x5a, 1>(self, vm) push_number(10, vm)
    opcode Op11<0x5b, 1>(self, vm) push_number(11, vm)
    opcode Op12<0x5c, 1>(self, vm) push_number(12, vm)
    opcode Op13<0x5d, 1>(self, vm) push_number(13, vm)
    opcode Op14<0x5e, 1>(self, vm) push_number(14, vm)
    opcode Op15<0x5f, 1>(self, vm) push_number(15, vm)
    opcode Op16<0x60, 1>(self, vm) push_number(16, vm)

    // Flow control
    opcode OpNop<0x61, 1>(self, vm) Ok(())
    opcode OpVer<0x62, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))
    opcode OpIf<0x63, 1>(self, vm) {
        let mut cond = OpCond::Skip;
        if vm.is_executing() {
            let [cond_buf] = vm.dstack.pop_raw()?;
            if vm.flags.contains(VerifyFlags::MINIMAL_IF)
                && !(cond_buf.is_empty() || (cond_buf.len() == 1 && cond_buf[0] == 1))
            {
                return Err(ScriptError::MinimalIf);
            }
            cond = match data_stack::as_bool(&cond_buf) {
                true => OpCond::True,
                false => OpCond::False,
            };
        }
        vm.cond_stack.push(cond);
        Ok(())
    }
    opcode OpNotIf<0x64, 1>(self, vm) {
        let mut cond = OpCond::Skip;
        if vm.is_executing() {
            let [cond_buf] = vm.dstack.pop_raw()?;
            if vm.flags.contains(VerifyFlags::MINIMAL_IF)
                && !(cond_buf.is_empty() || (cond_buf.len() == 1 && cond_buf[0] == 1))
            {
                return Err(ScriptError::MinimalIf);
            }
            cond = match data_stack::as_bool(&cond_buf) {
                true => OpCond::False,
                false => OpCond::True,
            };
        }
        vm.cond_stack.push(cond);
        Ok(())
    }
    opcode OpVerIf<0x65, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))
    opcode OpVerNotIf<0x66, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))
    opcode OpElse<0x67, 1>(self, vm) {
        match vm.cond_stack.last_mut() {
            Some(cond) => {
                *cond = cond.negate();
                Ok(())
            }
            None => Err(ScriptError::UnbalancedConditional),
        }
    }
    opcode OpEndIf<0x68, 1>(self, vm) {
        match vm.cond_stack.pop() {
            Some(_) => Ok(()),
            None => Err(ScriptError::UnbalancedConditional),
        }
    }
    opcode OpVerify<0x69, 1>(self, vm) {
        match vm.dstack.pop_bool()? {
            true => Ok(()),
            false => Err(ScriptError::VerifyError),
        }
    }
    opcode OpReturn<0x6a, 1>(self, vm) Err(ScriptError::EarlyReturn)

    // Stack manipulation
    opcode OpToAltStack<0x6b, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.astack.push(item);
        Ok(())
    }
    opcode OpFromAltStack<0x6c, 1>(self, vm) {
        match vm.astack.pop() {
            Some(item) => {
                vm.dstack.push(item);
                Ok(())
            }
            None => Err(ScriptError::EmptyStack),
        }
    }
    opcode Op2Drop<0x6d, 1>(self, vm) vm.dstack.drop_items::<2>()
    opcode Op2Dup<0x6e, 1>(self, vm) vm.dstack.dup_items::<2>()
    opcode Op3Dup<0x6f, 1>(self, vm) vm.dstack.dup_items::<3>()
    opcode Op2Over<0x70, 1>(self, vm) vm.dstack.over_items::<2>()
    opcode Op2Rot<0x71, 1>(self, vm) vm.dstack.rot_items::<2>()
    opcode Op2Swap<0x72, 1>(self, vm) vm.dstack.swap_items::<2>()
    opcode OpIfDup<0x73, 1>(self, vm) {
        let [item] = vm.dstack.peek_raw()?;
        if data_stack::as_bool(&item) {
            vm.dstack.push(item);
        }
        Ok(())
    }
    opcode OpDepth<0x74, 1>(self, vm) push_number(vm.dstack.len() as i64, vm)
    opcode OpDrop<0x75, 1>(self, vm) vm.dstack.drop_items::<1>()
    opcode OpDup<0x76, 1>(self, vm) vm.dstack.dup_items::<1>()
    opcode OpNip<0x77, 1>(self, vm) {
        match vm.dstack.len() >= 2 {
            true => {
                let at = vm.dstack.len() - 2;
                vm.dstack.remove(at);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(2, vm.dstack.len())),
        }
    }
    opcode OpOver<0x78, 1>(self, vm) vm.dstack.over_items::<1>()
    opcode OpPick<0x79, 1>(self, vm) {
        let [loc] = vm.dstack.pop_numbers(vm.require_minimal())?;
        if loc < 0 || loc as usize >= vm.dstack.len() {
            return Err(ScriptError::InvalidState(format!("pick at an invalid location: {loc}")));
        }
        let item = vm.dstack[vm.dstack.len() - 1 - (loc as usize)].clone();
        vm.dstack.push(item);
        Ok(())
    }
    opcode OpRoll<0x7a, 1>(self, vm) {
        let [loc] = vm.dstack.pop_numbers(vm.require_minimal())?;
        if loc < 0 || loc as usize >= vm.dstack.len() {
            return Err(ScriptError::InvalidState(format!("roll at an invalid location: {loc}")));
        }
        let at = vm.dstack.len() - 1 - (loc as usize);
        let item = vm.dstack.remove(at);
        vm.dstack.push(item);
        Ok(())
    }
    opcode OpRot<0x7b, 1>(self, vm) vm.dstack.rot_items::<1>()
    opcode OpSwap<0x7c, 1>(self, vm) vm.dstack.swap_items::<1>()
    opcode OpTuck<0x7d, 1>(self, vm) {
        match vm.dstack.len() >= 2 {
            true => {
                let [item] = vm.dstack.peek_raw()?;
                let at = vm.dstack.len() - 2;
                vm.dstack.insert(at, item);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(2, vm.dstack.len())),
        }
    }

    // Splice
    opcode OpCat<0x7e, 1>(self, vm) {
        let [first, second] = vm.dstack.pop_raw()?;
        let mut joined = first;
        joined.extend_from_slice(&second);
        if joined.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooBig(joined.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }
        vm.dstack.push(joined);
        Ok(())
    }
    opcode OpSubStr<0x7f, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpLeft<0x80, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpRight<0x81, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpSize<0x82, 1>(self, vm) {
        let [item] = vm.dstack.peek_raw()?;
        push_number(item.len() as i64, vm)
    }

    // Bitwise
    opcode OpInvert<0x83, 1>(self, vm) {
        let [mut item] = vm.dstack.pop_raw()?;
        for byte in item.iter_mut() {
            *byte = !*byte;
        }
        vm.dstack.push(item);
        Ok(())
    }
    opcode OpAnd<0x84, 1>(self, vm) {
        let [mut first, second] = vm.dstack.pop_raw()?;
        if first.len() != second.len() {
            return Err(ScriptError::OperandSize(first.len(), second.len()));
        }
        for (a, b) in first.iter_mut().zip(second.iter()) {
            *a &= *b;
        }
        vm.dstack.push(first);
        Ok(())
    }
    opcode OpOr<0x85, 1>(self, vm) {
        let [mut first, second] = vm.dstack.pop_raw()?;
        if first.len() != second.len() {
            return Err(ScriptError::OperandSize(first.len(), second.len()));
        }
        for (a, b) in first.iter_mut().zip(second.iter()) {
            *a |= *b;
        }
        vm.dstack.push(first);
        Ok(())
    }
    opcode OpXor<0x86, 1>(self, vm) {
        let [mut first, second] = vm.dstack.pop_raw()?;
        if first.len() != second.len() {
            return Err(ScriptError::OperandSize(first.len(), second.len()));
        }
        for (a, b) in first.iter_mut().zip(second.iter()) {
            *a ^= *b;
        }
        vm.dstack.push(first);
        Ok(())
    }
    opcode OpEqual<0x87, 1>(self, vm) {
        let [first, second] = vm.dstack.pop_raw()?;
        vm.dstack.push_bool(first == second);
        Ok(())
    }
    opcode OpEqualVerify<0x88, 1>(self, vm) {
        OpEqual { data: self.data.clone() }.execute(vm)?;
        match vm.dstack.pop_bool()? {
            true => Ok(()),
            false => Err(ScriptError::VerifyError),
        }
    }
    opcode OpReserved1<0x89, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))
    opcode OpReserved2<0x8a, 1>(self, vm) Err(ScriptError::OpcodeReserved(format!("{self:?}")))

    // Numeric
    opcode Op1Add<0x8b, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(value + 1, vm)
    }
    opcode Op1Sub<0x8c, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(value - 1, vm)
    }
    opcode Op2Mul<0x8d, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode Op2Div<0x8e, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpNegate<0x8f, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(-value, vm)
    }
    opcode OpAbs<0x90, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(value.abs(), vm)
    }
    opcode OpNot<0x91, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((value == 0) as i64, vm)
    }
    opcode Op0NotEqual<0x92, 1>(self, vm) {
        let [value] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((value != 0) as i64, vm)
    }
    opcode OpAdd<0x93, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(a + b, vm)
    }
    opcode OpSub<0x94, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(a - b, vm)
    }
    opcode OpMul<0x95, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(a * b, vm)
    }
    opcode OpDiv<0x96, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        if b == 0 {
            return Err(ScriptError::DivideByZero);
        }
        push_number(a / b, vm)
    }
    opcode OpMod<0x97, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        if b == 0 {
            return Err(ScriptError::ModuloByZero);
        }
        push_number(a % b, vm)
    }
    opcode OpLShift<0x98, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpRShift<0x99, 1>(self, vm) Err(ScriptError::OpcodeDisabled(format!("{self:?}")))
    opcode OpBoolAnd<0x9a, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(((a != 0) && (b != 0)) as i64, vm)
    }
    opcode OpBoolOr<0x9b, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(((a != 0) || (b != 0)) as i64, vm)
    }
    opcode OpNumEqual<0x9c, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a == b) as i64, vm)
    }
    opcode OpNumEqualVerify<0x9d, 1>(self, vm) {
        OpNumEqual { data: self.data.clone() }.execute(vm)?;
        match vm.dstack.pop_bool()? {
            true => Ok(()),
            false => Err(ScriptError::VerifyError),
        }
    }
    opcode OpNumNotEqual<0x9e, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a != b) as i64, vm)
    }
    opcode OpLessThan<0x9f, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a < b) as i64, vm)
    }
    opcode OpGreaterThan<0xa0, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a > b) as i64, vm)
    }
    opcode OpLessThanOrEqual<0xa1, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a <= b) as i64, vm)
    }
    opcode OpGreaterThanOrEqual<0xa2, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((a >= b) as i64, vm)
    }
    opcode OpMin<0xa3, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(a.min(b), vm)
    }
    opcode OpMax<0xa4, 1>(self, vm) {
        let [a, b] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number(a.max(b), vm)
    }
    opcode OpWithin<0xa5, 1>(self, vm) {
        let [x, lower, upper] = vm.dstack.pop_numbers(vm.require_minimal())?;
        push_number((lower <= x && x < upper) as i64, vm)
    }

    // Crypto
    opcode OpRipemd160<0xa6, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.dstack.push(Ripemd160::digest(&item).to_vec());
        Ok(())
    }
    opcode OpSha1<0xa7, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.dstack.push(Sha1::digest(&item).to_vec());
        Ok(())
    }
    opcode OpSha256<0xa8, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.dstack.push(Sha256::digest(&item).to_vec());
        Ok(())
    }
    opcode OpHash160<0xa9, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.dstack.push(Ripemd160::digest(Sha256::digest(&item)).to_vec());
        Ok(())
    }
    opcode OpHash256<0xaa, 1>(self, vm) {
        let [item] = vm.dstack.pop_raw()?;
        vm.dstack.push(Sha256::digest(Sha256::digest(&item)).to_vec());
        Ok(())
    }
    opcode OpCodeSeparator<0xab, 1>(self, vm) {
        vm.set_code_separator();
        Ok(())
    }
    opcode OpCheckSig<0xac, 1>(self, vm) vm.op_check_sig()
    opcode OpCheckSigVerify<0xad, 1>(self, vm) {
        OpCheckSig { data: self.data.clone() }.execute(vm)?;
        match vm.dstack.pop_bool()? {
            true => Ok(()),
            false => Err(ScriptError::VerifyError),
        }
    }
    opcode OpCheckMultiSig<0xae, 1>(self, vm) vm.op_check_multisig()
    opcode OpCheckMultiSigVerify<0xaf, 1>(self, vm) {
        OpCheckMultiSig { data: self.data.clone() }.execute(vm)?;
        match vm.dstack.pop_bool()? {
            true => Ok(()),
            false => Err(ScriptError::VerifyError),
        }
    }

    // Upgradable no-ops
    opcode OpNop1<0xb0, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpCheckLockTimeVerify<0xb1, 1>(self, vm) vm.op_check_lock_time_verify()
    opcode OpCheckSequenceVerify<0xb2, 1>(self, vm) vm.op_check_sequence_verify()
    opcode OpNop4<0xb3, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop5<0xb4, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop6<0xb5, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop7<0xb6, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop8<0xb7, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop9<0xb8, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
    opcode OpNop10<0xb9, 1>(self, vm) {
        match vm.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            true => Err(ScriptError::DiscourageUpgradableNops),
            false => Ok(()),
        }
    }
}
