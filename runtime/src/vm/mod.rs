use crate::error::{JavaExceptionFromVm, JvmError};
use crate::gc::GcState;
use crate::heap::method_area::MethodArea;
use crate::heap::{ArrayType, Heap, ObjRef};
use crate::interpreter::Interpreter;
use crate::keys::{ClassId, FieldKey, MethodId};
use crate::native::NativeRegistry;
use crate::rt::constant_pool::FieldResolution;
use crate::thread::JavaThreadState;
use crate::vm::bootstrap_registry::BootstrapRegistry;
use crate::{build_exception, debug_log, VmConfig};
use lasso::ThreadedRodeo;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing_log::log::error;

pub mod bootstrap_registry;
pub mod stack;

/// Stack operand, local variable, argument and static field values all
/// share this representation. A long or double takes one stack slot but
/// two local slots (see `vm::stack`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(ObjRef),
    Null,
}

impl Value {
    pub fn as_obj_ref(&self) -> Result<ObjRef, JvmError> {
        match self {
            Value::Ref(r) => Ok(*r),
            Value::Null => Err(build_exception!(NullPointerException)),
            _ => Err(JvmError::UnexpectedType("value is not a reference")),
        }
    }

    pub fn as_nullable_obj_ref(&self) -> Result<Option<ObjRef>, JvmError> {
        match self {
            Value::Ref(r) => Ok(Some(*r)),
            Value::Null => Ok(None),
            _ => Err(JvmError::UnexpectedType("value is not a reference")),
        }
    }

    pub fn as_int(&self) -> Result<i32, JvmError> {
        match self {
            Value::Integer(v) => Ok(*v),
            _ => Err(JvmError::UnexpectedType("value is not an int")),
        }
    }

    pub fn as_long(&self) -> Result<i64, JvmError> {
        match self {
            Value::Long(v) => Ok(*v),
            _ => Err(JvmError::UnexpectedType("value is not a long")),
        }
    }
}

/// Process-wide VM context: the class registry, the managed heap, the GC
/// state and the native registry, each behind its own lock. Everything is
/// passed this value explicitly; there are no globals.
pub struct VirtualMachine {
    method_area: RwLock<MethodArea>,
    heap: RwLock<Heap>,
    gc: RwLock<GcState>,
    pub native_registry: NativeRegistry,
    pub br: Arc<BootstrapRegistry>,
    interner: Arc<ThreadedRodeo>,
    pub config: VmConfig,
}

impl VirtualMachine {
    pub fn new(config: VmConfig) -> Self {
        let interner = Arc::new(ThreadedRodeo::default());
        let (method_area, br) = MethodArea::init(&config, interner.clone());
        let heap = Heap::new(config.heap_size_mb);
        let gc = GcState::new(config.trace_gc, config.gc_interval_ms);
        let native_registry = NativeRegistry::with_builtins(&interner);
        VirtualMachine {
            method_area: RwLock::new(method_area),
            heap: RwLock::new(heap),
            gc: RwLock::new(gc),
            native_registry,
            br,
            interner,
            config,
        }
    }

    pub fn interner(&self) -> &ThreadedRodeo {
        &self.interner
    }

    pub fn method_area_read(&self) -> RwLockReadGuard<'_, MethodArea> {
        self.method_area.read().unwrap()
    }

    pub fn method_area_write(&self) -> RwLockWriteGuard<'_, MethodArea> {
        self.method_area.write().unwrap()
    }

    pub fn heap_read(&self) -> RwLockReadGuard<'_, Heap> {
        self.heap.read().unwrap()
    }

    pub fn heap_write(&self) -> RwLockWriteGuard<'_, Heap> {
        self.heap.write().unwrap()
    }

    pub fn gc_read(&self) -> RwLockReadGuard<'_, GcState> {
        self.gc.read().unwrap()
    }

    pub fn gc_write(&self) -> RwLockWriteGuard<'_, GcState> {
        self.gc.write().unwrap()
    }

    // Allocation wrappers. The interpreter must use these: every reference
    // they return is also recorded in the GC's reference table as Present.

    pub fn gc_obj_alloc(&self, class_id: ClassId) -> Result<ObjRef, JvmError> {
        let defaults = self
            .method_area_read()
            .get_class(&class_id)
            .instance_field_defaults();
        let r = self.heap_write().alloc_instance(class_id, defaults)?;
        self.gc_write().insert_ref(r);
        Ok(r)
    }

    pub fn gc_array_alloc(
        &self,
        elem: ArrayType,
        count: i32,
        class_id: Option<ClassId>,
    ) -> Result<ObjRef, JvmError> {
        let r = self.heap_write().alloc_array(elem, count, class_id)?;
        self.gc_write().insert_ref(r);
        Ok(r)
    }

    /// Allocates a `java/lang/String` instance whose first reference field
    /// points to a char array holding the given text.
    pub fn gc_str_obj_alloc(&self, s: &str) -> Result<ObjRef, JvmError> {
        let string_class_id = self
            .method_area_write()
            .get_class_id_or_load(self.br.java_lang_string_sym)?;
        if self.method_area_read().get_class(&string_class_id).field_count() == 0 {
            return Err(JvmError::ClassFormat(
                "java/lang/String has no value field".to_string(),
            ));
        }

        let units: Vec<u16> = s.encode_utf16().collect();
        let chars = self.gc_array_alloc(ArrayType::Char, units.len() as i32, None)?;
        {
            let mut heap = self.heap_write();
            let arr = heap.get_mut(chars)?;
            for (i, unit) in units.iter().enumerate() {
                arr.fields[i] = Value::Integer(*unit as i32);
            }
        }

        let string_ref = self.gc_obj_alloc(string_class_id)?;
        self.heap_write().get_mut(string_ref)?.fields[0] = Value::Ref(chars);
        Ok(string_ref)
    }

    /// Opportunistic collection between opcodes; no locks may be held by
    /// the caller.
    pub fn maybe_collect(&self, thread: &JavaThreadState) {
        if !self.gc_read().should_collect() {
            return;
        }
        let mut gc = self.gc_write();
        let mut heap = self.heap_write();
        let method_area = self.method_area_read();
        crate::gc::collect(&mut gc, &mut heap, &method_area, thread);
    }

    // Constant-pool resolution, memoized into the owning class's pool.

    pub fn resolve_class(&self, cur_class_id: ClassId, cp_idx: u16) -> Result<ClassId, JvmError> {
        let name = {
            let ma = self.method_area_read();
            let cp = &ma.get_class(&cur_class_id).cp;
            if let Some(id) = cp.resolved_class(cp_idx)? {
                return Ok(id);
            }
            cp.get_class_sym(cp_idx, self.interner())?
        };
        let class_id = self.method_area_write().get_class_id_or_load(name)?;
        self.method_area_read()
            .get_class(&cur_class_id)
            .cp
            .cache_resolved_class(cp_idx, class_id)?;
        Ok(class_id)
    }

    pub fn resolve_method(&self, cur_class_id: ClassId, cp_idx: u16) -> Result<MethodId, JvmError> {
        let view = {
            let ma = self.method_area_read();
            let cp = &ma.get_class(&cur_class_id).cp;
            if let Some(id) = cp.resolved_method(cp_idx)? {
                return Ok(id);
            }
            cp.get_method_view(cp_idx, self.interner())?
        };
        let target_id = self.method_area_write().get_class_id_or_load(view.class_sym)?;
        let ma = self.method_area_read();
        let method_id = ma.find_method(target_id, &view.key).ok_or_else(|| {
            build_exception!(
                NoSuchMethodError,
                "{}.{}{}",
                self.interner.resolve(&view.class_sym),
                self.interner.resolve(&view.key.name),
                self.interner.resolve(&view.key.desc)
            )
        })?;
        ma.get_class(&cur_class_id)
            .cp
            .cache_resolved_method(cp_idx, method_id)?;
        Ok(method_id)
    }

    /// Static-field resolution caches a direct handle to the declaring
    /// class's storage slot.
    pub fn resolve_static_field(
        &self,
        cur_class_id: ClassId,
        cp_idx: u16,
    ) -> Result<(ClassId, usize), JvmError> {
        let view = {
            let ma = self.method_area_read();
            let cp = &ma.get_class(&cur_class_id).cp;
            match cp.resolved_field(cp_idx)? {
                Some(FieldResolution::Static { class_id, slot }) => return Ok((class_id, slot)),
                Some(FieldResolution::Instance { .. }) => {
                    return Err(build_exception!(
                        IncompatibleClassChangeError,
                        "static access to an instance field"
                    ))
                }
                None => cp.get_field_view(cp_idx, self.interner())?,
            }
        };
        let target_id = self.method_area_write().get_class_id_or_load(view.class_sym)?;
        let ma = self.method_area_read();
        let (class_id, slot) = ma.find_static_field(target_id, &view.key).ok_or_else(|| {
            build_exception!(
                NoSuchFieldError,
                "{}.{}",
                self.interner.resolve(&view.class_sym),
                self.interner.resolve(&view.key.name)
            )
        })?;
        ma.get_class(&cur_class_id)
            .cp
            .cache_resolved_field(cp_idx, FieldResolution::Static { class_id, slot })?;
        Ok((class_id, slot))
    }

    /// Instance-field resolution caches the offset into the object's field
    /// array; the layout was fixed when the receiver's class was linked.
    pub fn resolve_instance_field(
        &self,
        cur_class_id: ClassId,
        cp_idx: u16,
        obj_class_id: ClassId,
    ) -> Result<(usize, FieldKey), JvmError> {
        let view = {
            let ma = self.method_area_read();
            let cp = &ma.get_class(&cur_class_id).cp;
            match cp.resolved_field(cp_idx)? {
                Some(FieldResolution::Instance { offset, key }) => return Ok((offset, key)),
                Some(FieldResolution::Static { .. }) => {
                    return Err(build_exception!(
                        IncompatibleClassChangeError,
                        "instance access to a static field"
                    ))
                }
                None => cp.get_field_view(cp_idx, self.interner())?,
            }
        };
        let target_id = self.method_area_write().get_class_id_or_load(view.class_sym)?;
        let ma = self.method_area_read();
        let offset = match ma.get_class(&obj_class_id).find_layout_offset(&view.key) {
            Some(offset) => offset,
            None => {
                // A fieldref that names a static field must fail with
                // IncompatibleClassChangeError, not NoSuchFieldError.
                if ma.find_static_field(target_id, &view.key).is_some() {
                    return Err(build_exception!(
                        IncompatibleClassChangeError,
                        "instance access to a static field"
                    ));
                }
                return Err(build_exception!(
                    NoSuchFieldError,
                    "{}.{}",
                    self.interner.resolve(&view.class_sym),
                    self.interner.resolve(&view.key.name)
                ));
            }
        };
        ma.get_class(&cur_class_id)
            .cp
            .cache_resolved_field(
                cp_idx,
                FieldResolution::Instance {
                    offset,
                    key: view.key,
                },
            )?;
        Ok((offset, view.key))
    }

    /// Materializes a runtime-raised exception: load and initialize its
    /// class, allocate an instance, run the no-arg constructor, then store
    /// the message (if any) into the first field as a String.
    pub fn materialize_exception(
        &self,
        thread: &mut JavaThreadState,
        ex: JavaExceptionFromVm,
    ) -> Result<ObjRef, JvmError> {
        let class_sym = self.interner.get_or_intern(ex.kind.class_name());
        let class_id = self.method_area_write().get_class_id_or_load(class_sym)?;
        Interpreter::ensure_initialized(thread, class_id, self)?;

        let eref = self.gc_obj_alloc(class_id)?;
        let ctor = self
            .method_area_read()
            .find_method(class_id, &self.br.no_arg_constructor_mk);
        if let Some(ctor) = ctor {
            Interpreter::invoke_instance_method(thread, ctor, vec![Value::Ref(eref)], self)?;
        }

        if let Some(message) = &ex.message {
            if self.method_area_read().get_class(&class_id).field_count() > 0 {
                let sref = self.gc_str_obj_alloc(message)?;
                self.heap_write().get_mut(eref)?.fields[0] = Value::Ref(sref);
            }
        }
        Ok(eref)
    }

    /// Reads the message out of an exception object: first field is the
    /// String, whose first field is the char array.
    pub fn get_exception_message(&self, eref: ObjRef) -> Option<String> {
        let heap = self.heap_read();
        let obj = heap.get(eref).ok()?;
        let str_ref = match obj.fields.first()? {
            Value::Ref(r) => *r,
            _ => return None,
        };
        let str_obj = heap.get(str_ref).ok()?;
        let arr_ref = match str_obj.fields.first()? {
            Value::Ref(r) => *r,
            _ => return None,
        };
        let arr = heap.get(arr_ref).ok()?;
        let units: Vec<u16> = arr
            .fields
            .iter()
            .map(|v| match v {
                Value::Integer(c) => *c as u16,
                _ => 0,
            })
            .collect();
        Some(String::from_utf16_lossy(&units))
    }

    fn exception_class_name(&self, eref: ObjRef) -> String {
        let class_id = match self.heap_read().get_class_id(eref) {
            Ok(id) => id,
            Err(_) => return "<unknown>".to_string(),
        };
        let ma = self.method_area_read();
        self.interner.resolve(&ma.get_class(&class_id).name).to_string()
    }

    /// Builds the user-visible report for an exception that unwound past
    /// the base frame.
    pub fn uncaught_exception_report(
        &self,
        thread: &JavaThreadState,
        eref: ObjRef,
    ) -> String {
        let exception_name = self.exception_class_name(eref);
        let base_name = {
            let ma = self.method_area_read();
            self.interner
                .resolve(&ma.get_class(&thread.base_class).name)
                .to_string()
        };
        let mut report = format!(
            "Exception in thread {} {} at {}",
            thread.name, exception_name, base_name
        );
        if let Some(message) = self.get_exception_message(eref) {
            report.push('\n');
            report.push_str(&message);
        }
        report
    }

    /// Bootstrap and run `main(String[])` of the configured class on a
    /// fresh "main" thread. An uncaught Java exception terminates the
    /// thread; the report is printed and the error returned so the process
    /// can exit non-zero.
    pub fn run_main(&self, args: &[String]) -> Result<(), JvmError> {
        let main_class_sym = self.interner.get_or_intern(&self.config.main_class);
        let base_class_id = self
            .method_area_write()
            .get_class_id_or_load(main_class_sym)
            .map_err(|e| match e {
                JvmError::JavaException(_) => {
                    JvmError::MainClassNotFound(self.config.main_class.clone())
                }
                other => other,
            })?;

        let mut thread =
            JavaThreadState::new("main", base_class_id, self.config.frame_stack_size);

        // The base object is allocated before any user bytecode runs; it
        // anchors the root set.
        let base_ref = self.gc_obj_alloc(base_class_id)?;
        self.gc_write().register_base_roots(base_ref);
        debug_log!("GC initialized with base object {:?}", base_ref);

        let jargv = self.gc_array_alloc(ArrayType::Ref, args.len() as i32, None)?;
        for (i, arg) in args.iter().enumerate() {
            let s = self.gc_str_obj_alloc(arg)?;
            self.heap_write()
                .write_array_element(jargv, i as i32, Value::Ref(s))?;
        }

        let main_id = self
            .method_area_read()
            .find_method(base_class_id, &self.br.main_mk)
            .ok_or_else(|| JvmError::MainClassNotFound(self.config.main_class.clone()))?;

        match Interpreter::invoke_static_method(&mut thread, main_id, vec![Value::Ref(jargv)], self)
        {
            Ok(_) => Ok(()),
            Err(JvmError::JavaExceptionThrown(eref)) => {
                let report = self.uncaught_exception_report(&thread, eref);
                error!("{}", report);
                eprintln!("{}", report);
                Err(JvmError::JavaExceptionThrown(eref))
            }
            Err(JvmError::JavaException(ex)) => {
                // The exception could not even be materialized; report the
                // kind directly.
                let report = format!(
                    "Exception in thread {} {}",
                    thread.name,
                    JvmError::JavaException(ex.clone())
                );
                error!("{}", report);
                eprintln!("{}", report);
                Err(JvmError::JavaException(ex))
            }
            Err(other) => Err(other),
        }
    }
}
