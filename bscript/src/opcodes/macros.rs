macro_rules! opcode_serde {
    ($type:ty) => {
        fn serialize(&self) -> Vec<u8> {
            let length = self.data.len() as $type;
            core::iter::once(self.value()).chain(length.to_le_bytes().into_iter()).chain(self.data.iter().copied()).collect()
        }

        fn deserialize<'i, I: Iterator<Item = &'i u8>, C: SignatureChecker>(
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError> {
            let length_bytes: Vec<u8> = it.take(size_of::<$type>()).copied().collect();
            if length_bytes.len() != size_of::<$type>() {
                return Err(ScriptError::MalformedPushSize(length_bytes));
            }
            let length = <$type>::from_le_bytes(length_bytes.try_into().expect("size is checked above")) as usize;
            let data: Vec<u8> = it.take(length).copied().collect();
            if data.len() != length {
                return Err(ScriptError::MalformedPush(length, data.len()));
            }
            Self::new(data)
        }
    };
    ($length:literal) => {
        fn serialize(&self) -> Vec<u8> {
            core::iter::once(self.value()).chain(self.data.iter().copied()).collect()
        }

        fn deserialize<'i, I: Iterator<Item = &'i u8>, C: SignatureChecker>(
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError> {
            // Static length includes the opcode byte itself.
            let data: Vec<u8> = it.take($length - 1).copied().collect();
            if data.len() != $length - 1 {
                return Err(ScriptError::MalformedPush($length - 1, data.len()));
            }
            Self::new(data)
        }
    };
}

macro_rules! opcode_data_len {
    ($type:ty) => {
        fn validate_data(data: &[u8]) -> Result<(), ScriptError> {
            match u64::try_from(<$type>::MAX).expect("fits in u64") >= data.len() as u64 {
                true => Ok(()),
                false => Err(ScriptError::MalformedPushSize(data.len().to_le_bytes().to_vec())),
            }
        }

        fn self_serialized_len(&self) -> usize {
            1 + size_of::<$type>() + self.data.len()
        }
    };
    ($length:literal) => {
        fn validate_data(data: &[u8]) -> Result<(), ScriptError> {
            match data.len() == $length - 1 {
                true => Ok(()),
                false => Err(ScriptError::MalformedPush($length - 1, data.len())),
            }
        }

        fn self_serialized_len(&self) -> usize {
            $length
        }
    };
}

macro_rules! opcode {
    ($name:ident, $num:literal, $length:tt, $self:ident, $vm:ident, $code:expr) => {
        pub(crate) type $name = OpCode<$num>;

        impl $name {
            opcode_data_len!($length);
        }

        impl<C: SignatureChecker> OpCodeExecution<C> for $name {
            fn empty() -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError>
            where
                Self: Sized,
            {
                Self::new(vec![])
            }

            fn new(data: Vec<u8>) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError>
            where
                Self: Sized,
            {
                Self::validate_data(&data)?;
                Ok(Box::new(Self { data }))
            }

            #[allow(unused_variables)]
            fn execute(&$self, $vm: &mut ScriptEngine<C>) -> OpCodeResult {
                $code
            }
        }

        impl OpcodeSerialization for $name {
            opcode_serde!($length);

            fn serialized_len(&self) -> usize {
                self.self_serialized_len()
            }
        }

        impl<C: SignatureChecker> OpCodeImplementation<C> for $name {}
    };
}

macro_rules! opcode_list {
    ( $(opcode $name:ident<$num:literal, $length:tt>($self:ident, $vm:ident) $code:expr)* ) => {
        /// Raw opcode values keyed by mnemonic.
        pub mod codes {
            $(
                #[allow(non_upper_case_globals)]
                #[allow(dead_code)]
                pub const $name: u8 = $num;
            )*
        }

        $(
            opcode!($name, $num, $length, $self, $vm, $code);
        )*

        fn deserialize_opcode<'i, I: Iterator<Item = &'i u8>, C: SignatureChecker>(
            opcode_num: u8,
            it: &mut I,
        ) -> Result<Box<dyn OpCodeImplementation<C>>, ScriptError> {
            match opcode_num {
                $(
                    $num => <$name as OpcodeSerialization>::deserialize(it),
                )*
                _ => Err(ScriptError::InvalidOpcode(format!("{opcode_num:#04x}"))),
            }
        }
    };
}
