use crate::classfile::AccessFlags;
use crate::keys::{ClassId, FieldKey};
use crate::vm::Value;
use std::sync::RwLock;

/// One slot of an instance's field layout. Layouts place the most elder
/// class's fields first, so the slot index of an inherited field is the
/// same in every subclass.
#[derive(Debug, Clone, Copy)]
pub struct LayoutField {
    pub key: FieldKey,
    pub flags: AccessFlags,
    pub declaring_class: ClassId,
    /// Zero value for the field's descriptor, used when instances are
    /// allocated.
    pub default: Value,
}

/// Static field with its storage slot. `constant_value` is the pool index
/// recorded by a ConstantValue attribute; prep materializes it.
#[derive(Debug)]
pub struct StaticField {
    pub key: FieldKey,
    pub flags: AccessFlags,
    pub constant_value: Option<u16>,
    pub value: RwLock<Value>,
}

impl StaticField {
    pub fn get(&self) -> Value {
        *self.value.read().unwrap()
    }

    pub fn set(&self, value: Value) {
        *self.value.write().unwrap() = value;
    }
}
