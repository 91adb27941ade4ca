use crate::error::JvmError;
use crate::keys::FullyQualifiedMethodKey;
use crate::thread::JavaThreadState;
use crate::vm::{Value, VirtualMachine};
use lasso::ThreadedRodeo;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A native method binding. Arguments arrive exactly as they sat on the
/// caller's operand stack (receiver first for instance methods); a
/// `Some` result is pushed back onto the caller's stack. No frame is ever
/// pushed for a native call.
pub type NativeMethod =
    fn(&VirtualMachine, &mut JavaThreadState, &[Value]) -> Result<Option<Value>, JvmError>;

pub struct NativeRegistry {
    bindings: HashMap<FullyQualifiedMethodKey, NativeMethod>,
}

impl NativeRegistry {
    pub fn with_builtins(interner: &ThreadedRodeo) -> Self {
        let mut registry = NativeRegistry {
            bindings: HashMap::new(),
        };
        registry.register(
            FullyQualifiedMethodKey::new(
                interner.get_or_intern("java/lang/Object"),
                interner.get_or_intern("hashCode"),
                interner.get_or_intern("()I"),
            ),
            object_hash_code,
        );
        registry.register(
            FullyQualifiedMethodKey::new(
                interner.get_or_intern("java/lang/System"),
                interner.get_or_intern("currentTimeMillis"),
                interner.get_or_intern("()J"),
            ),
            system_current_time_millis,
        );
        registry
    }

    pub fn register(&mut self, key: FullyQualifiedMethodKey, binding: NativeMethod) {
        self.bindings.insert(key, binding);
    }

    pub fn get(&self, key: &FullyQualifiedMethodKey) -> Option<&NativeMethod> {
        self.bindings.get(key)
    }
}

fn object_hash_code(
    _vm: &VirtualMachine,
    _thread: &mut JavaThreadState,
    args: &[Value],
) -> Result<Option<Value>, JvmError> {
    let receiver = args
        .first()
        .ok_or(JvmError::UnexpectedType("hashCode without a receiver"))?;
    let r = receiver.as_obj_ref()?;
    Ok(Some(Value::Integer(r.addr as i32)))
}

fn system_current_time_millis(
    _vm: &VirtualMachine,
    _thread: &mut JavaThreadState,
    _args: &[Value],
) -> Result<Option<Value>, JvmError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(Some(Value::Long(millis)))
}
