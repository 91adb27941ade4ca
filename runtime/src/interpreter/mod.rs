use crate::classfile::ExceptionTableEntry;
use crate::error::JvmError;
use crate::heap::ObjRef;
use crate::interpreter::handlers::*;
use crate::interpreter::instruction::Instruction;
use crate::keys::{ClassId, FullyQualifiedMethodKey, MethodId};
use crate::rt::ClassStatus;
use crate::thread::JavaThreadState;
use crate::vm::stack::JavaFrame;
use crate::vm::{Value, VirtualMachine};
use smallvec::SmallVec;
use std::ops::ControlFlow;
use tracing_log::log::{error, trace};

pub mod instruction;

mod handlers;

type ArgValues = SmallVec<[Value; 8]>;

pub struct Interpreter;

impl Interpreter {
    /// Dispatches one decoded instruction. `Break` carries a return value
    /// out of the current frame; `Continue` keeps the loop going. After a
    /// non-branch instruction the pc advances by the instruction size;
    /// branch handlers have already set it.
    fn interpret_instruction(
        thread: &mut JavaThreadState,
        instruction: Instruction,
        vm: &VirtualMachine,
    ) -> Result<ControlFlow<Option<Value>>, JvmError> {
        let is_branch = instruction.is_branch();
        let instr_size = instruction.byte_size();
        trace!("executing {:?}", instruction);

        match instruction {
            Instruction::Nop => {}
            Instruction::AconstNull => handle_aconst_null(thread)?,
            Instruction::IconstM1 => handle_iconst(thread, -1)?,
            Instruction::Iconst0 => handle_iconst(thread, 0)?,
            Instruction::Iconst1 => handle_iconst(thread, 1)?,
            Instruction::Iconst2 => handle_iconst(thread, 2)?,
            Instruction::Iconst3 => handle_iconst(thread, 3)?,
            Instruction::Iconst4 => handle_iconst(thread, 4)?,
            Instruction::Iconst5 => handle_iconst(thread, 5)?,
            Instruction::Lconst0 => handle_lconst(thread, 0)?,
            Instruction::Lconst1 => handle_lconst(thread, 1)?,
            Instruction::Fconst0 => handle_fconst(thread, 0.0)?,
            Instruction::Fconst1 => handle_fconst(thread, 1.0)?,
            Instruction::Fconst2 => handle_fconst(thread, 2.0)?,
            Instruction::Dconst0 => handle_dconst(thread, 0.0)?,
            Instruction::Dconst1 => handle_dconst(thread, 1.0)?,
            Instruction::Bipush(value) => handle_bipush(thread, value)?,
            Instruction::Sipush(value) => handle_sipush(thread, value)?,
            Instruction::Ldc(idx) | Instruction::LdcW(idx) => handle_ldc(thread, vm, idx)?,
            Instruction::Ldc2W(idx) => handle_ldc2w(thread, vm, idx)?,
            Instruction::Iload(idx) => handle_iload(thread, idx)?,
            Instruction::Lload(idx) => handle_lload(thread, idx)?,
            Instruction::Fload(idx) => handle_fload(thread, idx)?,
            Instruction::Dload(idx) => handle_dload(thread, idx)?,
            Instruction::Aload(idx) => handle_aload(thread, idx)?,
            Instruction::Iload0 => handle_iload(thread, 0)?,
            Instruction::Iload1 => handle_iload(thread, 1)?,
            Instruction::Iload2 => handle_iload(thread, 2)?,
            Instruction::Iload3 => handle_iload(thread, 3)?,
            Instruction::Lload0 => handle_lload(thread, 0)?,
            Instruction::Lload1 => handle_lload(thread, 1)?,
            Instruction::Lload2 => handle_lload(thread, 2)?,
            Instruction::Lload3 => handle_lload(thread, 3)?,
            Instruction::Fload0 => handle_fload(thread, 0)?,
            Instruction::Fload1 => handle_fload(thread, 1)?,
            Instruction::Fload2 => handle_fload(thread, 2)?,
            Instruction::Fload3 => handle_fload(thread, 3)?,
            Instruction::Dload0 => handle_dload(thread, 0)?,
            Instruction::Dload1 => handle_dload(thread, 1)?,
            Instruction::Dload2 => handle_dload(thread, 2)?,
            Instruction::Dload3 => handle_dload(thread, 3)?,
            Instruction::Aload0 => handle_aload(thread, 0)?,
            Instruction::Aload1 => handle_aload(thread, 1)?,
            Instruction::Aload2 => handle_aload(thread, 2)?,
            Instruction::Aload3 => handle_aload(thread, 3)?,
            Instruction::Iaload
            | Instruction::Laload
            | Instruction::Faload
            | Instruction::Daload
            | Instruction::Aaload
            | Instruction::Baload
            | Instruction::Caload
            | Instruction::Saload => handle_array_load(thread, vm)?,
            Instruction::Istore(idx) => handle_istore(thread, idx)?,
            Instruction::Lstore(idx) => handle_lstore(thread, idx)?,
            Instruction::Fstore(idx) => handle_fstore(thread, idx)?,
            Instruction::Dstore(idx) => handle_dstore(thread, idx)?,
            Instruction::Astore(idx) => handle_astore(thread, idx)?,
            Instruction::Istore0 => handle_istore(thread, 0)?,
            Instruction::Istore1 => handle_istore(thread, 1)?,
            Instruction::Istore2 => handle_istore(thread, 2)?,
            Instruction::Istore3 => handle_istore(thread, 3)?,
            Instruction::Lstore0 => handle_lstore(thread, 0)?,
            Instruction::Lstore1 => handle_lstore(thread, 1)?,
            Instruction::Lstore2 => handle_lstore(thread, 2)?,
            Instruction::Lstore3 => handle_lstore(thread, 3)?,
            Instruction::Fstore0 => handle_fstore(thread, 0)?,
            Instruction::Fstore1 => handle_fstore(thread, 1)?,
            Instruction::Fstore2 => handle_fstore(thread, 2)?,
            Instruction::Fstore3 => handle_fstore(thread, 3)?,
            Instruction::Dstore0 => handle_dstore(thread, 0)?,
            Instruction::Dstore1 => handle_dstore(thread, 1)?,
            Instruction::Dstore2 => handle_dstore(thread, 2)?,
            Instruction::Dstore3 => handle_dstore(thread, 3)?,
            Instruction::Astore0 => handle_astore(thread, 0)?,
            Instruction::Astore1 => handle_astore(thread, 1)?,
            Instruction::Astore2 => handle_astore(thread, 2)?,
            Instruction::Astore3 => handle_astore(thread, 3)?,
            Instruction::Iastore => handle_iastore(thread, vm)?,
            Instruction::Lastore => handle_lastore(thread, vm)?,
            Instruction::Fastore => handle_fastore(thread, vm)?,
            Instruction::Dastore => handle_dastore(thread, vm)?,
            Instruction::Aastore => handle_aastore(thread, vm)?,
            Instruction::Bastore => handle_bastore(thread, vm)?,
            Instruction::Castore => handle_castore(thread, vm)?,
            Instruction::Sastore => handle_sastore(thread, vm)?,
            Instruction::Pop => handle_pop(thread)?,
            Instruction::Pop2 => handle_pop2(thread)?,
            Instruction::Dup => handle_dup(thread)?,
            Instruction::DupX1 => handle_dup_x1(thread)?,
            Instruction::Dup2 => handle_dup2(thread)?,
            Instruction::Swap => handle_swap(thread)?,
            Instruction::Iadd => handle_iadd(thread)?,
            Instruction::Ladd => handle_ladd(thread)?,
            Instruction::Fadd => handle_fadd(thread)?,
            Instruction::Dadd => handle_dadd(thread)?,
            Instruction::Isub => handle_isub(thread)?,
            Instruction::Lsub => handle_lsub(thread)?,
            Instruction::Fsub => handle_fsub(thread)?,
            Instruction::Dsub => handle_dsub(thread)?,
            Instruction::Imul => handle_imul(thread)?,
            Instruction::Lmul => handle_lmul(thread)?,
            Instruction::Fmul => handle_fmul(thread)?,
            Instruction::Dmul => handle_dmul(thread)?,
            Instruction::Idiv => handle_idiv(thread)?,
            Instruction::Ldiv => handle_ldiv(thread)?,
            Instruction::Fdiv => handle_fdiv(thread)?,
            Instruction::Ddiv => handle_ddiv(thread)?,
            Instruction::Irem => handle_irem(thread)?,
            Instruction::Lrem => handle_lrem(thread)?,
            Instruction::Frem => handle_frem(thread)?,
            Instruction::Drem => handle_drem(thread)?,
            Instruction::Ineg => handle_ineg(thread)?,
            Instruction::Lneg => handle_lneg(thread)?,
            Instruction::Fneg => handle_fneg(thread)?,
            Instruction::Dneg => handle_dneg(thread)?,
            Instruction::Ishl => handle_ishl(thread)?,
            Instruction::Lshl => handle_lshl(thread)?,
            Instruction::Ishr => handle_ishr(thread)?,
            Instruction::Lshr => handle_lshr(thread)?,
            Instruction::Iushr => handle_iushr(thread)?,
            Instruction::Lushr => handle_lushr(thread)?,
            Instruction::Iand => handle_iand(thread)?,
            Instruction::Land => handle_land(thread)?,
            Instruction::Ior => handle_ior(thread)?,
            Instruction::Lor => handle_lor(thread)?,
            Instruction::Ixor => handle_ixor(thread)?,
            Instruction::Lxor => handle_lxor(thread)?,
            Instruction::Iinc(idx, constant) => handle_iinc(thread, idx, constant)?,
            Instruction::I2l => handle_i2l(thread)?,
            Instruction::I2f => handle_i2f(thread)?,
            Instruction::I2d => handle_i2d(thread)?,
            Instruction::L2i => handle_l2i(thread)?,
            Instruction::L2f => handle_l2f(thread)?,
            Instruction::L2d => handle_l2d(thread)?,
            Instruction::F2i => handle_f2i(thread)?,
            Instruction::F2l => handle_f2l(thread)?,
            Instruction::F2d => handle_f2d(thread)?,
            Instruction::D2i => handle_d2i(thread)?,
            Instruction::D2l => handle_d2l(thread)?,
            Instruction::D2f => handle_d2f(thread)?,
            Instruction::I2b => handle_i2b(thread)?,
            Instruction::I2c => handle_i2c(thread)?,
            Instruction::I2s => handle_i2s(thread)?,
            Instruction::Lcmp => handle_lcmp(thread)?,
            Instruction::Fcmpl => handle_fcmpl(thread)?,
            Instruction::Fcmpg => handle_fcmpg(thread)?,
            Instruction::Dcmpl => handle_dcmpl(thread)?,
            Instruction::Dcmpg => handle_dcmpg(thread)?,
            Instruction::IfEq(offset) => handle_ifeq(thread, offset, instr_size)?,
            Instruction::IfNe(offset) => handle_ifne(thread, offset, instr_size)?,
            Instruction::IfLt(offset) => handle_iflt(thread, offset, instr_size)?,
            Instruction::IfGe(offset) => handle_ifge(thread, offset, instr_size)?,
            Instruction::IfGt(offset) => handle_ifgt(thread, offset, instr_size)?,
            Instruction::IfLe(offset) => handle_ifle(thread, offset, instr_size)?,
            Instruction::IfIcmpeq(offset) => handle_ificmpeq(thread, offset, instr_size)?,
            Instruction::IfIcmpne(offset) => handle_ificmpne(thread, offset, instr_size)?,
            Instruction::IfIcmplt(offset) => handle_ificmplt(thread, offset, instr_size)?,
            Instruction::IfIcmpge(offset) => handle_ificmpge(thread, offset, instr_size)?,
            Instruction::IfIcmpgt(offset) => handle_ificmpgt(thread, offset, instr_size)?,
            Instruction::IfIcmple(offset) => handle_ificmple(thread, offset, instr_size)?,
            Instruction::IfAcmpEq(offset) => handle_ifacmpeq(thread, offset, instr_size)?,
            Instruction::IfAcmpNe(offset) => handle_ifacmpne(thread, offset, instr_size)?,
            Instruction::Ifnull(offset) => handle_ifnull(thread, offset, instr_size)?,
            Instruction::Ifnonnull(offset) => handle_ifnonnull(thread, offset, instr_size)?,
            Instruction::Goto(offset) => handle_goto(thread, offset)?,
            Instruction::GotoW(offset) => handle_goto_w(thread, offset)?,
            Instruction::TableSwitch(ref data) => handle_tableswitch(thread, data)?,
            Instruction::Lookupswitch(ref data) => handle_lookupswitch(thread, data)?,
            Instruction::Getstatic(idx) => handle_getstatic(thread, vm, idx)?,
            Instruction::Putstatic(idx) => handle_putstatic(thread, vm, idx)?,
            Instruction::Getfield(idx) => handle_getfield(thread, vm, idx)?,
            Instruction::Putfield(idx) => handle_putfield(thread, vm, idx)?,
            Instruction::InvokeVirtual(idx) => Self::handle_invokevirtual(thread, vm, idx)?,
            Instruction::InvokeSpecial(idx) => Self::handle_invokespecial(thread, vm, idx)?,
            Instruction::InvokeStatic(idx) => Self::handle_invokestatic(thread, vm, idx)?,
            Instruction::New(idx) => handle_new(thread, vm, idx)?,
            Instruction::Newarray(array_type) => handle_newarray(thread, vm, array_type)?,
            Instruction::Anewarray(idx) => handle_anewarray(thread, vm, idx)?,
            Instruction::ArrayLength => handle_arraylength(thread, vm)?,
            Instruction::Athrow => handle_athrow(thread)?,
            Instruction::Checkcast(idx) => handle_checkcast(thread, vm, idx)?,
            Instruction::Instanceof(idx) => handle_instanceof(thread, vm, idx)?,
            Instruction::Monitorenter => handle_monitorenter(thread)?,
            Instruction::Monitorexit => handle_monitorexit(thread)?,
            Instruction::Return => return Ok(ControlFlow::Break(None)),
            Instruction::Ireturn
            | Instruction::Lreturn
            | Instruction::Freturn
            | Instruction::Dreturn
            | Instruction::Areturn => {
                let ret = thread.stack.pop_operand()?;
                return Ok(ControlFlow::Break(Some(ret)));
            }
        }

        if !is_branch {
            thread.stack.cur_frame_mut()?.pc += instr_size;
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Runs the current frame to completion. A thrown exception is
    /// materialized if needed, then matched against this method's handler
    /// table; a miss pops the frame and rethrows to the caller's loop, so
    /// unwinding walks the chain iteratively. Between opcodes the GC gets
    /// a chance to run.
    fn interpret_method(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        loop {
            let instruction = {
                let ma = vm.method_area_read();
                let code = ma.get_method(&method_id).code()?;
                let pc = thread.stack.pc()?;
                Instruction::new_at(code, pc)?
            };

            match Self::interpret_instruction(thread, instruction, vm) {
                Ok(ControlFlow::Break(res)) => return Ok(res),
                Ok(ControlFlow::Continue(())) => {
                    vm.maybe_collect(thread);
                }
                Err(e) => {
                    let exception_ref = match e {
                        JvmError::JavaException(ex) => vm.materialize_exception(thread, ex)?,
                        JvmError::JavaExceptionThrown(r) => r,
                        other => return Err(other),
                    };
                    if !Self::find_exception_handler(vm, &method_id, exception_ref, thread)? {
                        thread.stack.pop_frame()?;
                        return Err(JvmError::JavaExceptionThrown(exception_ref));
                    }
                }
            }
        }
    }

    fn pc_in_range(pc: usize, entry: &ExceptionTableEntry) -> bool {
        pc >= entry.start_pc as usize && pc < entry.end_pc as usize
    }

    /// catch_type 0 catches anything; otherwise the thrown class or one of
    /// its superclasses must name the entry's catch class.
    fn is_exception_caught(
        vm: &VirtualMachine,
        entry: &ExceptionTableEntry,
        method_id: &MethodId,
        exception_ref: ObjRef,
    ) -> Result<bool, JvmError> {
        if entry.catch_type == 0 {
            return Ok(true);
        }
        let exception_class_id = vm.heap_read().get_class_id(exception_ref)?;
        let ma = vm.method_area_read();
        let cur_class_id = ma.get_method(method_id).class_id();
        let catch_sym = ma
            .get_class(&cur_class_id)
            .cp
            .get_class_sym(entry.catch_type, vm.interner())?;
        Ok(ma.instance_of(exception_class_id, catch_sym))
    }

    /// Scans this frame's exception table in order. On a match the
    /// exception ref is pushed and the pc moved to the handler.
    fn find_exception_handler(
        vm: &VirtualMachine,
        method_id: &MethodId,
        exception_ref: ObjRef,
        thread: &mut JavaThreadState,
    ) -> Result<bool, JvmError> {
        let pc = thread.stack.pc()?;
        let entries: Vec<ExceptionTableEntry> = vm
            .method_area_read()
            .get_method(method_id)
            .exception_table()?
            .to_vec();

        for entry in entries {
            if !Self::pc_in_range(pc, &entry) {
                continue;
            }
            if Self::is_exception_caught(vm, &entry, method_id, exception_ref)? {
                thread.stack.push_operand(Value::Ref(exception_ref))?;
                thread.stack.cur_frame_mut()?.pc = entry.handler_pc as usize;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Pops the callee's arguments (receiver included for instance calls)
    /// off the caller's operand stack, in push order.
    fn prepare_method_args(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        vm: &VirtualMachine,
    ) -> Result<ArgValues, JvmError> {
        let count = vm.method_area_read().get_method(&method_id).arg_value_count();
        let mut args = ArgValues::with_capacity(count);
        for _ in 0..count {
            args.push(thread.stack.pop_operand()?);
        }
        args.reverse();
        Ok(args)
    }

    /// Natives run on the caller's operand stack; no frame is pushed.
    fn invoke_native_method(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: &[Value],
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        let key = {
            let ma = vm.method_area_read();
            let method = ma.get_method(&method_id);
            let class_name = ma.get_class(&method.class_id()).name;
            FullyQualifiedMethodKey::new(class_name, method.name, method.desc)
        };
        let native = *vm.native_registry.get(&key).ok_or_else(|| {
            let ma = vm.method_area_read();
            let method = ma.get_method(&method_id);
            JvmError::UnsatisfiedLink(format!(
                "{}.{}{}",
                vm.interner().resolve(&key.class),
                vm.interner().resolve(&method.name),
                vm.interner().resolve(&method.desc)
            ))
        })?;
        native(vm, thread, args)
    }

    fn invoke_java_method(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: &[Value],
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        let (max_stack, max_locals, class_id, is_static, params) = {
            let ma = vm.method_area_read();
            let method = ma.get_method(&method_id);
            let (max_stack, max_locals) = method.frame_attributes()?;
            if (max_locals as usize) < method.arg_slot_count() {
                return Err(JvmError::ClassFormat(format!(
                    "method declares {} locals but its arguments need {}",
                    max_locals,
                    method.arg_slot_count()
                )));
            }
            (
                max_stack,
                max_locals,
                method.class_id(),
                method.is_static(),
                method.params.clone(),
            )
        };
        let mut frame = JavaFrame::new(method_id, class_id, max_stack, max_locals);
        frame.store_args(args, &params, is_static)?;
        thread.stack.push_frame(frame)?;

        let method_ret = Self::interpret_method(thread, method_id, vm);
        if let Err(e) = &method_ret {
            if matches!(e, JvmError::JavaExceptionThrown(_)) {
                trace!("exception unwinding through method {:?}", method_id);
            } else {
                error!("method {:?} failed: {}", method_id, e);
            }
        }
        // On Err the frame was already popped by the unwind path.
        let method_ret = method_ret?;
        thread.stack.pop_frame()?;
        Ok(method_ret)
    }

    fn invoke_method_core(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: &[Value],
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        let is_native = vm.method_area_read().get_method(&method_id).is_native();
        if is_native {
            Self::invoke_native_method(thread, method_id, args, vm)
        } else {
            Self::invoke_java_method(thread, method_id, args, vm)
        }
    }

    /// Invoke and push a non-void result onto the caller's operand stack.
    fn invoke_method_internal(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: &[Value],
        vm: &VirtualMachine,
    ) -> Result<(), JvmError> {
        if let Some(ret) = Self::invoke_method_core(thread, method_id, args, vm)? {
            thread.stack.push_operand(ret)?;
        }
        Ok(())
    }

    // The three invocation opcodes share argument marshalling but not
    // method selection.

    fn handle_invokestatic(
        thread: &mut JavaThreadState,
        vm: &VirtualMachine,
        idx: u16,
    ) -> Result<(), JvmError> {
        let cur_class_id = thread.stack.cur_frame()?.class_id;
        let method_id = vm.resolve_method(cur_class_id, idx)?;
        let class_id = vm.method_area_read().get_method(&method_id).class_id();
        Self::ensure_initialized(thread, class_id, vm)?;
        let args = Self::prepare_method_args(thread, method_id, vm)?;
        Self::invoke_method_internal(thread, method_id, &args, vm)
    }

    /// invokespecial uses the resolved method directly; no override walk.
    fn handle_invokespecial(
        thread: &mut JavaThreadState,
        vm: &VirtualMachine,
        idx: u16,
    ) -> Result<(), JvmError> {
        let cur_class_id = thread.stack.cur_frame()?.class_id;
        let method_id = vm.resolve_method(cur_class_id, idx)?;
        let args = Self::prepare_method_args(thread, method_id, vm)?;
        Self::invoke_method_internal(thread, method_id, &args, vm)
    }

    /// invokevirtual selects an override from the receiver's actual class,
    /// falling back to the resolved method.
    fn handle_invokevirtual(
        thread: &mut JavaThreadState,
        vm: &VirtualMachine,
        idx: u16,
    ) -> Result<(), JvmError> {
        let cur_class_id = thread.stack.cur_frame()?.class_id;
        let resolved_id = vm.resolve_method(cur_class_id, idx)?;
        let (key, arg_count) = {
            let ma = vm.method_area_read();
            let method = ma.get_method(&resolved_id);
            (method.key(), method.arg_value_count())
        };
        if arg_count == 0 {
            return Err(JvmError::UnexpectedType(
                "invokevirtual of a static method",
            ));
        }

        let receiver = *thread.stack.peek_operand_at(arg_count - 1)?;
        let receiver_ref = receiver.as_obj_ref()?;
        let receiver_class_id = vm.heap_read().get_class_id(receiver_ref)?;
        let target_id = vm
            .method_area_read()
            .find_virtual_method(receiver_class_id, &key)
            .unwrap_or(resolved_id);

        let args = Self::prepare_method_args(thread, target_id, vm)?;
        Self::invoke_method_internal(thread, target_id, &args, vm)
    }

    /// Runs `<clinit>` (superclasses first) before a class's first active
    /// use, and materializes static String constants that prep left
    /// pending. Interfaces initialize only if they declare `<clinit>`.
    pub fn ensure_initialized(
        thread: &mut JavaThreadState,
        class_id: ClassId,
        vm: &VirtualMachine,
    ) -> Result<(), JvmError> {
        {
            let ma = vm.method_area_read();
            let class = ma.get_class(&class_id);
            if class.is_initialized_or_initializing() {
                return Ok(());
            }
            class.set_status(ClassStatus::Initializing);
        }

        let super_id = vm.method_area_read().get_class(&class_id).super_id;
        if let Some(super_id) = super_id {
            Self::ensure_initialized(thread, super_id, vm)?;
        }

        let interfaces = vm.method_area_read().get_class(&class_id).interfaces.clone();
        for iface in interfaces {
            let needs_init = vm.method_area_read().get_class(&iface).clinit().is_some();
            if needs_init {
                Self::ensure_initialized(thread, iface, vm)?;
            }
        }

        let pending = vm
            .method_area_read()
            .get_class(&class_id)
            .pending_string_consts(vm.interner())?;
        for (slot, sym) in pending {
            let text = vm.interner().resolve(&sym).to_string();
            let sref = vm.gc_str_obj_alloc(&text)?;
            vm.method_area_read()
                .get_class(&class_id)
                .static_field(slot)?
                .set(Value::Ref(sref));
        }

        let clinit = vm.method_area_read().get_class(&class_id).clinit();
        if let Some(clinit) = clinit {
            Self::invoke_method_core(thread, clinit, &[], vm)?;
        }

        vm.method_area_read()
            .get_class(&class_id)
            .set_status(ClassStatus::Inited);
        Ok(())
    }

    /// Public entry for instance calls made by the runtime itself
    /// (constructors of materialized exceptions).
    pub fn invoke_instance_method(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: Vec<Value>,
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        Self::invoke_method_core(thread, method_id, &args, vm)
    }

    /// Public entry for static calls made by the runtime itself (`main`,
    /// tests). Initializes the declaring class first and returns the
    /// method's result instead of pushing it.
    pub fn invoke_static_method(
        thread: &mut JavaThreadState,
        method_id: MethodId,
        args: Vec<Value>,
        vm: &VirtualMachine,
    ) -> Result<Option<Value>, JvmError> {
        let class_id = vm.method_area_read().get_method(&method_id).class_id();
        Self::ensure_initialized(thread, class_id, vm)?;
        Self::invoke_method_core(thread, method_id, &args, vm)
    }
}
