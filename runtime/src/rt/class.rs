use crate::classfile::AccessFlags;
use crate::error::JvmError;
use crate::keys::{ClassId, FieldKey, MethodId, MethodKey, Symbol};
use crate::rt::constant_pool::{RuntimeConstant, RuntimeConstantPool};
use crate::rt::field::{LayoutField, StaticField};
use crate::vm::Value;
use lasso::ThreadedRodeo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a loaded class.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassStatus {
    None = 0,
    Loaded = 1,
    Prepped = 2,
    Initializing = 3,
    Inited = 4,
}

impl From<u8> for ClassStatus {
    fn from(v: u8) -> Self {
        match v {
            0 => ClassStatus::None,
            1 => ClassStatus::Loaded,
            2 => ClassStatus::Prepped,
            3 => ClassStatus::Initializing,
            4 => ClassStatus::Inited,
            _ => unreachable!(),
        }
    }
}

/// A linked runtime class. Created by the registry from a parsed class
/// file; lives for the rest of the process. The constant pool memoizes
/// resolution in place; static storage is the parallel array of value
/// slots behind `static_fields`.
pub struct JavaClass {
    pub name: Symbol,
    pub flags: AccessFlags,
    pub super_id: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub cp: RuntimeConstantPool,
    /// Declared methods in class-file order.
    pub methods: Vec<MethodId>,
    method_index: HashMap<MethodKey, MethodId>,
    clinit: Option<MethodId>,
    status: AtomicU8,
    /// Instance field layout including inherited fields, most elder class
    /// first. The slot index of a field here is the offset cached by
    /// instance-field resolution.
    instance_layout: Vec<LayoutField>,
    static_fields: Vec<StaticField>,
    static_index: HashMap<FieldKey, usize>,
}

impl JavaClass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: Symbol,
        flags: AccessFlags,
        super_id: Option<ClassId>,
        interfaces: Vec<ClassId>,
        cp: RuntimeConstantPool,
        methods: Vec<MethodId>,
        method_index: HashMap<MethodKey, MethodId>,
        clinit: Option<MethodId>,
        instance_layout: Vec<LayoutField>,
        static_fields: Vec<StaticField>,
    ) -> Self {
        let static_index = static_fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.key, i))
            .collect();
        JavaClass {
            name,
            flags,
            super_id,
            interfaces,
            cp,
            methods,
            method_index,
            clinit,
            status: AtomicU8::new(ClassStatus::Loaded as u8),
            instance_layout,
            static_fields,
            static_index,
        }
    }

    pub fn status(&self) -> ClassStatus {
        self.status.load(Ordering::Acquire).into()
    }

    pub fn set_status(&self, status: ClassStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn is_initialized_or_initializing(&self) -> bool {
        matches!(
            self.status(),
            ClassStatus::Inited | ClassStatus::Initializing
        )
    }

    pub fn is_interface(&self) -> bool {
        self.flags.is_interface()
    }

    pub fn clinit(&self) -> Option<MethodId> {
        self.clinit
    }

    pub fn find_declared_method(&self, key: &MethodKey) -> Option<MethodId> {
        self.method_index.get(key).copied()
    }

    // Instance layout

    pub fn field_count(&self) -> usize {
        self.instance_layout.len()
    }

    pub fn instance_layout(&self) -> &[LayoutField] {
        &self.instance_layout
    }

    pub fn layout_field(&self, offset: usize) -> Result<&LayoutField, JvmError> {
        self.instance_layout
            .get(offset)
            .ok_or(JvmError::Internal(format!(
                "field offset {} out of range",
                offset
            )))
    }

    /// Linear search through the layout; the matched index is the offset
    /// cached into the constant pool by instance-field resolution.
    pub fn find_layout_offset(&self, key: &FieldKey) -> Option<usize> {
        self.instance_layout.iter().position(|f| f.key == *key)
    }

    /// Zeroed field slots for a fresh instance, one per layout entry.
    pub fn instance_field_defaults(&self) -> Vec<Value> {
        self.instance_layout.iter().map(|f| f.default).collect()
    }

    // Static storage

    pub fn static_fields(&self) -> &[StaticField] {
        &self.static_fields
    }

    pub fn find_static_slot(&self, key: &FieldKey) -> Option<usize> {
        self.static_index.get(key).copied()
    }

    pub fn static_field(&self, slot: usize) -> Result<&StaticField, JvmError> {
        self.static_fields
            .get(slot)
            .ok_or(JvmError::Internal(format!(
                "static slot {} out of range",
                slot
            )))
    }

    /// Prep: every static field already owns its storage slot; this
    /// materializes ConstantValue initial values from the pool
    /// (int/float/long/double; integers arrive sign-extended, wide values
    /// recombined from their halves by the reader). String constants need
    /// the heap and are materialized by initialization instead.
    pub fn prep_class(&self) -> Result<(), JvmError> {
        for field in &self.static_fields {
            let Some(idx) = field.constant_value else {
                continue;
            };
            match self.cp.entry(idx)? {
                RuntimeConstant::Integer(v) => field.set(Value::Integer(*v)),
                RuntimeConstant::Float(v) => field.set(Value::Float(*v)),
                RuntimeConstant::Long(v) => field.set(Value::Long(*v)),
                RuntimeConstant::Double(v) => field.set(Value::Double(*v)),
                RuntimeConstant::String(_) => {}
                _ => {
                    return Err(JvmError::ClassFormat(format!(
                        "invalid ConstantValue pool entry at index {}",
                        idx
                    )))
                }
            }
        }
        self.set_status(ClassStatus::Prepped);
        Ok(())
    }

    /// Static String constants left behind by prep: `(slot, string sym)`.
    pub fn pending_string_consts(
        &self,
        interner: &ThreadedRodeo,
    ) -> Result<Vec<(usize, Symbol)>, JvmError> {
        let mut pending = Vec::new();
        for (slot, field) in self.static_fields.iter().enumerate() {
            let Some(idx) = field.constant_value else {
                continue;
            };
            if let RuntimeConstant::String(_) = self.cp.entry(idx)? {
                pending.push((slot, self.cp.get_string_sym(idx, interner)?));
            }
        }
        Ok(pending)
    }
}
