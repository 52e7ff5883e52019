use crate::ScriptError;
use core::iter;

pub(crate) const DEFAULT_SCRIPT_NUM_LEN: usize = 4;

pub(crate) type Stack = Vec<Vec<u8>>;

pub(crate) trait DataStack {
    fn pop_numbers<const SIZE: usize>(&mut self, require_minimal: bool) -> Result<[i64; SIZE], ScriptError>;
    fn pop_number_limited(&mut self, require_minimal: bool, max_len: usize) -> Result<i64, ScriptError>;
    fn pop_bool(&mut self) -> Result<bool, ScriptError>;
    fn peek_bool(&self) -> Result<bool, ScriptError>;
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[Vec<u8>; SIZE], ScriptError>;
    fn peek_raw<const SIZE: usize>(&self) -> Result<[Vec<u8>; SIZE], ScriptError>;
    fn push_number(&mut self, number: i64);
    fn push_bool(&mut self, value: bool);
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
}

pub(crate) fn check_minimal_data_encoding(v: &[u8]) -> Result<(), ScriptError> {
    if v.is_empty() {
        return Ok(());
    }

    // If the most-significant-byte - excluding the sign bit - is zero
    // then the encoding is not minimal. Note how this test also rejects
    // the negative-zero encoding, [0x80].
    if v[v.len() - 1] & 0x7f == 0 {
        // One exception: if there's more than one byte and the most
        // significant bit of the second-most-significant-byte is set it
        // would conflict with the sign bit. An example of this case is
        // +-255, which encode to 0xff00 and 0xff80 respectively
        // (big-endian).
        if v.len() == 1 || v[v.len() - 2] & 0x80 == 0 {
            return Err(ScriptError::NotMinimalData(format!("numeric value encoded as {v:x?} is not minimally encoded")));
        }
    }

    Ok(())
}

/// Decodes the sign-magnitude little-endian number encoding. Zero is
/// the empty vector; the sign lives in the high bit of the last byte.
pub(crate) fn deserialize_number(v: &[u8], require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
    if v.len() > max_len {
        return Err(ScriptError::NumberTooBig(format!(
            "numeric value encoded as {:x?} is {} bytes which exceeds the max allowed of {}",
            v,
            v.len(),
            max_len
        )));
    }
    if v.is_empty() {
        return Ok(0);
    }
    if require_minimal {
        check_minimal_data_encoding(v)?;
    }
    let msb = v[v.len() - 1];
    let sign = 1 - 2 * ((msb >> 7) as i64);
    let first_byte = (msb & 0x7f) as i64;
    Ok(v[..v.len() - 1].iter().rev().map(|v| *v as i64).fold(first_byte, |accum, item| (accum << 8) + item) * sign)
}

/// Produces the shortest sign-magnitude little-endian encoding. An extra
/// zero byte is appended when the top magnitude bit would otherwise be
/// mistaken for the sign bit.
pub(crate) fn serialize_number(from: i64) -> Vec<u8> {
    let sign = from.signum();
    let mut positive = from.unsigned_abs();
    let mut last_saturated = false;
    let mut number_vec: Vec<u8> = iter::from_fn(move || {
        if positive == 0 {
            if last_saturated {
                last_saturated = false;
                Some(0)
            } else {
                None
            }
        } else {
            let value = positive & 0xff;
            last_saturated = (value & 0x80) != 0;
            positive >>= 8;
            Some(value as u8)
        }
    })
    .collect();
    if sign == -1 {
        match number_vec.last_mut() {
            Some(num) => *num |= 0x80,
            _ => unreachable!(),
        }
    }
    number_vec
}

/// Boolean coercion: false iff all bytes are zero, with negative zero
/// (sign bit alone in the last byte) also counting as false.
pub(crate) fn as_bool(v: &[u8]) -> bool {
    if v.is_empty() {
        return false;
    }
    v[v.len() - 1] & 0x7f != 0x0 || v[..v.len() - 1].iter().any(|&b| b != 0x0)
}

pub(crate) fn serialize_bool(from: bool) -> Vec<u8> {
    match from {
        true => vec![1],
        false => vec![],
    }
}

impl DataStack for Stack {
    #[inline]
    fn pop_numbers<const SIZE: usize>(&mut self, require_minimal: bool) -> Result<[i64; SIZE], ScriptError> {
        if self.len() < SIZE {
            return Err(ScriptError::InvalidStackOperation(SIZE, self.len()));
        }
        Ok(<[i64; SIZE]>::try_from(
            self.split_off(self.len() - SIZE)
                .iter()
                .map(|v| deserialize_number(v, require_minimal, DEFAULT_SCRIPT_NUM_LEN))
                .collect::<Result<Vec<i64>, _>>()?,
        )
        .expect("Already exact item"))
    }

    #[inline]
    fn pop_number_limited(&mut self, require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
        let [raw] = self.pop_raw::<1>()?;
        deserialize_number(&raw, require_minimal, max_len)
    }

    #[inline]
    fn pop_bool(&mut self) -> Result<bool, ScriptError> {
        let [raw] = self.pop_raw::<1>()?;
        Ok(as_bool(&raw))
    }

    #[inline]
    fn peek_bool(&self) -> Result<bool, ScriptError> {
        let [raw] = self.peek_raw::<1>()?;
        Ok(as_bool(&raw))
    }

    #[inline]
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[Vec<u8>; SIZE], ScriptError> {
        if self.len() < SIZE {
            return Err(ScriptError::InvalidStackOperation(SIZE, self.len()));
        }
        Ok(<[Vec<u8>; SIZE]>::try_from(self.split_off(self.len() - SIZE)).expect("Already exact item"))
    }

    #[inline]
    fn peek_raw<const SIZE: usize>(&self) -> Result<[Vec<u8>; SIZE], ScriptError> {
        if self.len() < SIZE {
            return Err(ScriptError::InvalidStackOperation(SIZE, self.len()));
        }
        Ok(<[Vec<u8>; SIZE]>::try_from(self[self.len() - SIZE..].to_vec()).expect("Already exact item"))
    }

    #[inline]
    fn push_number(&mut self, number: i64) {
        self.push(serialize_number(number));
    }

    #[inline]
    fn push_bool(&mut self, value: bool) {
        self.push(serialize_bool(value));
    }

    #[inline]
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= SIZE {
            true => {
                self.truncate(self.len() - SIZE);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(SIZE, self.len())),
        }
    }

    #[inline]
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= SIZE {
            true => {
                self.extend_from_within(self.len() - SIZE..);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(SIZE, self.len())),
        }
    }

    #[inline]
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 2 * SIZE {
            true => {
                self.extend_from_within(self.len() - 2 * SIZE..self.len() - SIZE);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(2 * SIZE, self.len())),
        }
    }

    #[inline]
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 3 * SIZE {
            true => {
                let drained = self.drain(self.len() - 3 * SIZE..self.len() - 2 * SIZE).collect::<Vec<Vec<u8>>>();
                self.extend(drained);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(3 * SIZE, self.len())),
        }
    }

    #[inline]
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 2 * SIZE {
            true => {
                let drained = self.drain(self.len() - 2 * SIZE..self.len() - SIZE).collect::<Vec<Vec<u8>>>();
                self.extend(drained);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation(2 * SIZE, self.len())),
        }
    }
}
