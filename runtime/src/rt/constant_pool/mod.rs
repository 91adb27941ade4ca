use crate::classfile::RawConstant;
use crate::error::JvmError;
use crate::keys::{ClassId, FieldKey, MethodId, MethodKey, Symbol};
use lasso::ThreadedRodeo;
use once_cell::sync::OnceCell;

/// The runtime view of a class's constant pool. Slots start symbolic and
/// memoize their resolution in place: every entry that can be resolved
/// carries `OnceCell`s that cache the interned name or the direct runtime
/// reference, so callers can always tell symbolic from resolved and
/// repeated lookups cost nothing. This replaces the original's
/// stolen-high-bit pointer tagging with typed slots.
pub struct RuntimeConstantPool {
    entries: Vec<RuntimeConstant>,
}

pub struct Utf8Entry {
    pub value: Box<str>,
    sym: OnceCell<Symbol>,
}

pub struct ClassEntry {
    pub name_idx: u16,
    name_sym: OnceCell<Symbol>,
    resolved: OnceCell<ClassId>,
}

pub struct StringEntry {
    pub utf8_idx: u16,
    sym: OnceCell<Symbol>,
}

pub struct FieldRefEntry {
    pub class_idx: u16,
    pub nat_idx: u16,
    resolved: OnceCell<FieldResolution>,
}

pub struct MethodRefEntry {
    pub class_idx: u16,
    pub nat_idx: u16,
    resolved: OnceCell<MethodId>,
}

pub struct NameAndTypeEntry {
    pub name_idx: u16,
    pub desc_idx: u16,
    name_sym: OnceCell<Symbol>,
    desc_sym: OnceCell<Symbol>,
}

/// A resolved field reference: either the offset into an instance's field
/// array (layout fixed at link time), or a direct handle to a class's
/// static storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldResolution {
    Instance { offset: usize, key: FieldKey },
    Static { class_id: ClassId, slot: usize },
}

pub enum RuntimeConstant {
    Unused,
    Utf8(Utf8Entry),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassEntry),
    String(StringEntry),
    Field(FieldRefEntry),
    Method(MethodRefEntry),
    InterfaceMethod(MethodRefEntry),
    NameAndType(NameAndTypeEntry),
    MethodHandle { ref_kind: u8, ref_idx: u16 },
    MethodType { desc_idx: u16 },
    InvokeDynamic { bootstrap_idx: u16, nat_idx: u16 },
}

/// Fully symbolic view of a field or method ref: owning class name plus
/// name-and-type, everything interned.
#[derive(Debug, Clone, Copy)]
pub struct FieldRefView {
    pub class_sym: Symbol,
    pub key: FieldKey,
}

#[derive(Debug, Clone, Copy)]
pub struct MethodRefView {
    pub class_sym: Symbol,
    pub key: MethodKey,
}

impl RuntimeConstantPool {
    pub fn new(raw: Vec<RawConstant>) -> Self {
        let entries = raw
            .into_iter()
            .map(|entry| match entry {
                RawConstant::Unused => RuntimeConstant::Unused,
                RawConstant::Utf8(s) => RuntimeConstant::Utf8(Utf8Entry {
                    value: s.into_boxed_str(),
                    sym: OnceCell::new(),
                }),
                RawConstant::Integer(v) => RuntimeConstant::Integer(v),
                RawConstant::Float(v) => RuntimeConstant::Float(v),
                RawConstant::Long(v) => RuntimeConstant::Long(v),
                RawConstant::Double(v) => RuntimeConstant::Double(v),
                RawConstant::Class { name_idx } => RuntimeConstant::Class(ClassEntry {
                    name_idx,
                    name_sym: OnceCell::new(),
                    resolved: OnceCell::new(),
                }),
                RawConstant::String { utf8_idx } => RuntimeConstant::String(StringEntry {
                    utf8_idx,
                    sym: OnceCell::new(),
                }),
                RawConstant::FieldRef { class_idx, nat_idx } => {
                    RuntimeConstant::Field(FieldRefEntry {
                        class_idx,
                        nat_idx,
                        resolved: OnceCell::new(),
                    })
                }
                RawConstant::MethodRef { class_idx, nat_idx } => {
                    RuntimeConstant::Method(MethodRefEntry {
                        class_idx,
                        nat_idx,
                        resolved: OnceCell::new(),
                    })
                }
                RawConstant::InterfaceMethodRef { class_idx, nat_idx } => {
                    RuntimeConstant::InterfaceMethod(MethodRefEntry {
                        class_idx,
                        nat_idx,
                        resolved: OnceCell::new(),
                    })
                }
                RawConstant::NameAndType { name_idx, desc_idx } => {
                    RuntimeConstant::NameAndType(NameAndTypeEntry {
                        name_idx,
                        desc_idx,
                        name_sym: OnceCell::new(),
                        desc_sym: OnceCell::new(),
                    })
                }
                RawConstant::MethodHandle { ref_kind, ref_idx } => {
                    RuntimeConstant::MethodHandle { ref_kind, ref_idx }
                }
                RawConstant::MethodType { desc_idx } => RuntimeConstant::MethodType { desc_idx },
                RawConstant::InvokeDynamic {
                    bootstrap_idx,
                    nat_idx,
                } => RuntimeConstant::InvokeDynamic {
                    bootstrap_idx,
                    nat_idx,
                },
            })
            .collect();
        Self { entries }
    }

    /// Valid indices are `1 <= idx < count`, excluding the dead second half
    /// of a long/double.
    pub fn entry(&self, idx: u16) -> Result<&RuntimeConstant, JvmError> {
        match self.entries.get(idx as usize) {
            Some(RuntimeConstant::Unused) | None => {
                Err(JvmError::InvalidConstantPoolIndex(idx))
            }
            Some(entry) => Ok(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_utf8_sym(&self, idx: u16, interner: &ThreadedRodeo) -> Result<Symbol, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Utf8(entry) => Ok(*entry
                .sym
                .get_or_init(|| interner.get_or_intern(&*entry.value))),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Utf8",
            }),
        }
    }

    pub fn get_class_sym(&self, idx: u16, interner: &ThreadedRodeo) -> Result<Symbol, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Class(entry) => entry
                .name_sym
                .get_or_try_init(|| self.get_utf8_sym(entry.name_idx, interner))
                .copied(),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Class",
            }),
        }
    }

    pub fn get_string_sym(&self, idx: u16, interner: &ThreadedRodeo) -> Result<Symbol, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::String(entry) => entry
                .sym
                .get_or_try_init(|| self.get_utf8_sym(entry.utf8_idx, interner))
                .copied(),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "String",
            }),
        }
    }

    fn get_nat(
        &self,
        idx: u16,
        interner: &ThreadedRodeo,
    ) -> Result<(Symbol, Symbol), JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::NameAndType(entry) => {
                let name = *entry
                    .name_sym
                    .get_or_try_init(|| self.get_utf8_sym(entry.name_idx, interner))?;
                let desc = *entry
                    .desc_sym
                    .get_or_try_init(|| self.get_utf8_sym(entry.desc_idx, interner))?;
                Ok((name, desc))
            }
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "NameAndType",
            }),
        }
    }

    fn field_entry(&self, idx: u16) -> Result<&FieldRefEntry, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Field(entry) => Ok(entry),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Fieldref",
            }),
        }
    }

    fn method_entry(&self, idx: u16) -> Result<&MethodRefEntry, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Method(entry) | RuntimeConstant::InterfaceMethod(entry) => Ok(entry),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Methodref",
            }),
        }
    }

    pub fn get_field_view(
        &self,
        idx: u16,
        interner: &ThreadedRodeo,
    ) -> Result<FieldRefView, JvmError> {
        let entry = self.field_entry(idx)?;
        let class_sym = self.get_class_sym(entry.class_idx, interner)?;
        let (name, desc) = self.get_nat(entry.nat_idx, interner)?;
        Ok(FieldRefView {
            class_sym,
            key: FieldKey { name, desc },
        })
    }

    pub fn get_method_view(
        &self,
        idx: u16,
        interner: &ThreadedRodeo,
    ) -> Result<MethodRefView, JvmError> {
        let entry = self.method_entry(idx)?;
        let class_sym = self.get_class_sym(entry.class_idx, interner)?;
        let (name, desc) = self.get_nat(entry.nat_idx, interner)?;
        Ok(MethodRefView {
            class_sym,
            key: MethodKey { name, desc },
        })
    }

    // Resolution memoization. `cache_*` ignores a second writer: the value a
    // resolver computes for a given slot is always the same.

    pub fn resolved_class(&self, idx: u16) -> Result<Option<ClassId>, JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Class(entry) => Ok(entry.resolved.get().copied()),
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Class",
            }),
        }
    }

    pub fn cache_resolved_class(&self, idx: u16, class_id: ClassId) -> Result<(), JvmError> {
        match self.entry(idx)? {
            RuntimeConstant::Class(entry) => {
                let _ = entry.resolved.set(class_id);
                Ok(())
            }
            _ => Err(JvmError::ConstantPoolTypeMismatch {
                index: idx,
                expected: "Class",
            }),
        }
    }

    pub fn resolved_field(&self, idx: u16) -> Result<Option<FieldResolution>, JvmError> {
        Ok(self.field_entry(idx)?.resolved.get().copied())
    }

    pub fn cache_resolved_field(
        &self,
        idx: u16,
        resolution: FieldResolution,
    ) -> Result<(), JvmError> {
        let _ = self.field_entry(idx)?.resolved.set(resolution);
        Ok(())
    }

    pub fn resolved_method(&self, idx: u16) -> Result<Option<MethodId>, JvmError> {
        Ok(self.method_entry(idx)?.resolved.get().copied())
    }

    pub fn cache_resolved_method(&self, idx: u16, method_id: MethodId) -> Result<(), JvmError> {
        let _ = self.method_entry(idx)?.resolved.set(method_id);
        Ok(())
    }
}
