use num_enum::TryFromPrimitive;

pub mod parser;

pub const JAVA_MAGIC: u32 = 0xCAFEBABE;

/// Access and property modifiers, shared by classes, fields and methods.
pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub fn is_public(self) -> bool {
        self.0 & ACC_PUBLIC != 0
    }

    pub fn is_static(self) -> bool {
        self.0 & ACC_STATIC != 0
    }

    pub fn is_final(self) -> bool {
        self.0 & ACC_FINAL != 0
    }

    pub fn is_native(self) -> bool {
        self.0 & ACC_NATIVE != 0
    }

    pub fn is_interface(self) -> bool {
        self.0 & ACC_INTERFACE != 0
    }

    pub fn is_abstract(self) -> bool {
        self.0 & ACC_ABSTRACT != 0
    }
}

/// Constant-pool tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    InvokeDynamic = 18,
}

/// One parsed constant-pool slot. Index 0 and the second slot of every
/// long/double are `Unused`: valid indices but never addressable.
#[derive(Debug, Clone, PartialEq)]
pub enum RawConstant {
    Unused,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_idx: u16 },
    String { utf8_idx: u16 },
    FieldRef { class_idx: u16, nat_idx: u16 },
    MethodRef { class_idx: u16, nat_idx: u16 },
    InterfaceMethodRef { class_idx: u16, nat_idx: u16 },
    NameAndType { name_idx: u16, desc_idx: u16 },
    MethodHandle { ref_kind: u8, ref_idx: u16 },
    MethodType { desc_idx: u16 },
    InvokeDynamic { bootstrap_idx: u16, nat_idx: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Constant-pool index of the caught class; 0 catches anything.
    pub catch_type: u16,
}

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    /// Order is match order.
    pub exception_table: Vec<ExceptionTableEntry>,
    /// Inner attributes beyond the exception table are counted but skipped.
    pub attr_count: u16,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: AccessFlags,
    pub name_idx: u16,
    pub desc_idx: u16,
    /// Pool index recorded by a ConstantValue attribute.
    pub constant_value: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: AccessFlags,
    pub name_idx: u16,
    pub desc_idx: u16,
    pub code: Option<CodeAttribute>,
}

/// In-memory image of a parsed `.class` file. Purely structural; linking
/// into the runtime class model happens in `rt`.
#[derive(Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: Vec<RawConstant>,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    /// Utf8 lookup against the raw pool, used while attributes are parsed
    /// and by linking.
    pub fn utf8(&self, idx: u16) -> Option<&str> {
        match self.constant_pool.get(idx as usize) {
            Some(RawConstant::Utf8(s)) => Some(s),
            _ => None,
        }
    }

    pub fn class_name(&self, class_idx: u16) -> Option<&str> {
        match self.constant_pool.get(class_idx as usize) {
            Some(RawConstant::Class { name_idx }) => self.utf8(*name_idx),
            _ => None,
        }
    }

    pub fn this_class_name(&self) -> Option<&str> {
        self.class_name(self.this_class)
    }

    /// `None` for java/lang/Object (super index 0).
    pub fn super_class_name(&self) -> Option<&str> {
        if self.super_class == 0 {
            return None;
        }
        self.class_name(self.super_class)
    }
}
