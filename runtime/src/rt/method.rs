use crate::classfile::{AccessFlags, CodeAttribute, ExceptionTableEntry};
use crate::descriptor::{param_slot_count, ParamKinds};
use crate::error::JvmError;
use crate::keys::{ClassId, MethodKey, Symbol};

pub struct CodeBody {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Box<[u8]>,
    pub exception_table: Vec<ExceptionTableEntry>,
}

impl From<CodeAttribute> for CodeBody {
    fn from(attr: CodeAttribute) -> Self {
        CodeBody {
            max_stack: attr.max_stack,
            max_locals: attr.max_locals,
            code: attr.code.into_boxed_slice(),
            exception_table: attr.exception_table,
        }
    }
}

pub enum MethodBody {
    Interpreted(CodeBody),
    Native,
    Abstract,
}

pub struct Method {
    class_id: ClassId,
    pub name: Symbol,
    pub desc: Symbol,
    flags: AccessFlags,
    /// Parameter widths parsed from the descriptor at link time. The
    /// receiver is not included; invoke sites add it exactly once.
    pub params: ParamKinds,
    body: MethodBody,
}

impl Method {
    pub fn new(
        class_id: ClassId,
        name: Symbol,
        desc: Symbol,
        flags: AccessFlags,
        params: ParamKinds,
        code: Option<CodeAttribute>,
    ) -> Self {
        let body = if flags.is_native() {
            MethodBody::Native
        } else if flags.is_abstract() {
            MethodBody::Abstract
        } else {
            match code {
                Some(attr) => MethodBody::Interpreted(attr.into()),
                // A non-native, non-abstract method without code cannot be
                // invoked; treat it like an abstract body.
                None => MethodBody::Abstract,
            }
        };
        Method {
            class_id,
            name,
            desc,
            flags,
            params,
            body,
        }
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn key(&self) -> MethodKey {
        MethodKey {
            name: self.name,
            desc: self.desc,
        }
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    pub fn is_native(&self) -> bool {
        self.flags.is_native()
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.is_abstract()
    }

    /// Values popped off the caller's operand stack on invocation
    /// (receiver included for non-static methods).
    pub fn arg_value_count(&self) -> usize {
        let receiver = if self.is_static() { 0 } else { 1 };
        self.params.len() + receiver
    }

    /// Local-variable slots the arguments occupy in the callee frame, with
    /// wide doublings and the receiver.
    pub fn arg_slot_count(&self) -> usize {
        let receiver = if self.is_static() { 0 } else { 1 };
        param_slot_count(&self.params) + receiver
    }

    pub fn code_body(&self) -> Result<&CodeBody, JvmError> {
        match &self.body {
            MethodBody::Interpreted(body) => Ok(body),
            MethodBody::Native => Err(JvmError::Internal(
                "native method has no bytecode".to_string(),
            )),
            MethodBody::Abstract => Err(JvmError::Internal(
                "abstract method has no bytecode".to_string(),
            )),
        }
    }

    pub fn code(&self) -> Result<&[u8], JvmError> {
        Ok(&self.code_body()?.code)
    }

    pub fn exception_table(&self) -> Result<&[ExceptionTableEntry], JvmError> {
        Ok(&self.code_body()?.exception_table)
    }

    /// (max_stack, max_locals) for frame construction.
    pub fn frame_attributes(&self) -> Result<(u16, u16), JvmError> {
        let body = self.code_body()?;
        Ok((body.max_stack, body.max_locals))
    }
}
