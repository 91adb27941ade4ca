use crate::build_exception;
use crate::error::JvmError;
use crate::heap::ArrayType;
use crate::interpreter::instruction::{LookupSwitchData, TableSwitchData};
use crate::interpreter::Interpreter;
use crate::rt::constant_pool::RuntimeConstant;
use crate::thread::JavaThreadState;
use crate::throw_exception;
use crate::vm::{Value, VirtualMachine};
use std::cmp::Ordering;

fn branch16(bci: usize, off: i16) -> usize {
    ((bci as isize) + (off as isize)) as usize
}

fn branch32(bci: usize, off: i32) -> usize {
    ((bci as isize) + (off as isize)) as usize
}

// Constants

#[inline]
pub(super) fn handle_aconst_null(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Null)
}

#[inline]
pub(super) fn handle_iconst(thread: &mut JavaThreadState, n: i32) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Integer(n))
}

#[inline]
pub(super) fn handle_lconst(thread: &mut JavaThreadState, n: i64) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Long(n))
}

#[inline]
pub(super) fn handle_fconst(thread: &mut JavaThreadState, n: f32) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Float(n))
}

#[inline]
pub(super) fn handle_dconst(thread: &mut JavaThreadState, n: f64) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Double(n))
}

#[inline]
pub(super) fn handle_bipush(thread: &mut JavaThreadState, value: i8) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Integer(value as i32))
}

#[inline]
pub(super) fn handle_sipush(thread: &mut JavaThreadState, value: i16) -> Result<(), JvmError> {
    thread.stack.push_operand(Value::Integer(value as i32))
}

/// ldc / ldc_w: int, float and String constants.
pub(super) fn handle_ldc(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    enum Loaded {
        Value(Value),
        Str(crate::keys::Symbol),
    }
    let loaded = {
        let ma = vm.method_area_read();
        let cp = &ma.get_class(&cur_class_id).cp;
        match cp.entry(idx)? {
            RuntimeConstant::Integer(v) => Loaded::Value(Value::Integer(*v)),
            RuntimeConstant::Float(v) => Loaded::Value(Value::Float(*v)),
            RuntimeConstant::String(_) => Loaded::Str(cp.get_string_sym(idx, vm.interner())?),
            _ => {
                return Err(JvmError::Internal(format!(
                    "unsupported ldc constant at pool index {}",
                    idx
                )))
            }
        }
    };
    let value = match loaded {
        Loaded::Value(v) => v,
        Loaded::Str(sym) => {
            let text = vm.interner().resolve(&sym).to_string();
            Value::Ref(vm.gc_str_obj_alloc(&text)?)
        }
    };
    thread.stack.push_operand(value)
}

/// ldc2_w: long and double constants.
pub(super) fn handle_ldc2w(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let value = {
        let ma = vm.method_area_read();
        let cp = &ma.get_class(&cur_class_id).cp;
        match cp.entry(idx)? {
            RuntimeConstant::Long(v) => Value::Long(*v),
            RuntimeConstant::Double(v) => Value::Double(*v),
            _ => {
                return Err(JvmError::Internal(format!(
                    "unsupported ldc2_w constant at pool index {}",
                    idx
                )))
            }
        }
    };
    thread.stack.push_operand(value)
}

// Locals

#[inline]
pub(super) fn handle_iload(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = *thread.stack.get_local(idx as u16)?;
    thread.stack.push_operand(value)
}

#[inline]
pub(super) fn handle_fload(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = *thread.stack.get_local(idx as u16)?;
    thread.stack.push_operand(value)
}

#[inline]
pub(super) fn handle_aload(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = *thread.stack.get_local(idx as u16)?;
    thread.stack.push_operand(value)
}

#[inline]
pub(super) fn handle_lload(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let bits = thread.stack.cur_frame()?.get_local_wide_bits(idx as u16)?;
    thread.stack.push_operand(Value::Long(bits))
}

#[inline]
pub(super) fn handle_dload(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let bits = thread.stack.cur_frame()?.get_local_wide_bits(idx as u16)?;
    thread
        .stack
        .push_operand(Value::Double(f64::from_bits(bits as u64)))
}

#[inline]
pub(super) fn handle_istore(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = thread.stack.pop_operand()?;
    thread.stack.set_local(idx as u16, value)
}

#[inline]
pub(super) fn handle_fstore(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = thread.stack.pop_operand()?;
    thread.stack.set_local(idx as u16, value)
}

#[inline]
pub(super) fn handle_astore(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = thread.stack.pop_nullable_ref()?;
    thread.stack.set_local(idx as u16, value)
}

#[inline]
pub(super) fn handle_lstore(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let bits = thread.stack.pop_long_val()?;
    thread
        .stack
        .cur_frame_mut()?
        .set_local_wide_bits(idx as u16, bits)
}

#[inline]
pub(super) fn handle_dstore(thread: &mut JavaThreadState, idx: u8) -> Result<(), JvmError> {
    let value = thread.stack.pop_double_val()?;
    thread
        .stack
        .cur_frame_mut()?
        .set_local_wide_bits(idx as u16, value.to_bits() as i64)
}

#[inline]
pub(super) fn handle_iinc(
    thread: &mut JavaThreadState,
    idx: u8,
    constant: i8,
) -> Result<(), JvmError> {
    let value = thread.stack.get_local(idx as u16)?.as_int()?;
    thread
        .stack
        .set_local(idx as u16, Value::Integer(value.wrapping_add(constant as i32)))
}

// Array loads and stores. The null check happens when the reference is
// popped; the bounds check happens in the heap.

#[inline]
pub(super) fn handle_array_load(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    let value = vm.heap_read().read_array_element(array_ref, index)?;
    thread.stack.push_operand(value)
}

#[inline]
pub(super) fn handle_iastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let value = thread.stack.pop_int_val()?;
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    vm.heap_write()
        .write_array_element(array_ref, index, Value::Integer(value))
}

#[inline]
pub(super) fn handle_bastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    handle_iastore(thread, vm)
}

#[inline]
pub(super) fn handle_castore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    handle_iastore(thread, vm)
}

#[inline]
pub(super) fn handle_sastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    handle_iastore(thread, vm)
}

#[inline]
pub(super) fn handle_lastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let value = thread.stack.pop_long_val()?;
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    vm.heap_write()
        .write_array_element(array_ref, index, Value::Long(value))
}

#[inline]
pub(super) fn handle_fastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let value = thread.stack.pop_float_val()?;
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    vm.heap_write()
        .write_array_element(array_ref, index, Value::Float(value))
}

#[inline]
pub(super) fn handle_dastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let value = thread.stack.pop_double_val()?;
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    vm.heap_write()
        .write_array_element(array_ref, index, Value::Double(value))
}

#[inline]
pub(super) fn handle_aastore(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let value = thread.stack.pop_nullable_ref()?;
    let index = thread.stack.pop_int_val()?;
    let array_ref = thread.stack.pop_obj_val()?;
    vm.heap_write().write_array_element(array_ref, index, value)
}

// Operand-stack manipulation

#[inline]
pub(super) fn handle_pop(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    thread.stack.pop_operand()?;
    Ok(())
}

/// pop2 drops one category-2 value or two category-1 values.
#[inline]
pub(super) fn handle_pop2(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    match thread.stack.pop_operand()? {
        Value::Long(_) | Value::Double(_) => Ok(()),
        _ => {
            thread.stack.pop_operand()?;
            Ok(())
        }
    }
}

#[inline]
pub(super) fn handle_dup(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let value = *thread.stack.peek_operand()?;
    thread.stack.push_operand(value)
}

#[inline]
pub(super) fn handle_dup_x1(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let value1 = thread.stack.pop_operand()?;
    let value2 = thread.stack.pop_operand()?;
    thread.stack.push_operand(value1)?;
    thread.stack.push_operand(value2)?;
    thread.stack.push_operand(value1)
}

/// dup2 duplicates one category-2 value or the top two category-1 values.
#[inline]
pub(super) fn handle_dup2(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    match thread.stack.peek_operand()? {
        Value::Long(_) | Value::Double(_) => {
            let value = *thread.stack.peek_operand()?;
            thread.stack.push_operand(value)
        }
        _ => {
            let value1 = *thread.stack.peek_operand()?;
            let value2 = *thread.stack.peek_operand_at(1)?;
            thread.stack.push_operand(value2)?;
            thread.stack.push_operand(value1)
        }
    }
}

#[inline]
pub(super) fn handle_swap(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let value1 = thread.stack.pop_operand()?;
    let value2 = thread.stack.pop_operand()?;
    thread.stack.push_operand(value1)?;
    thread.stack.push_operand(value2)
}

// Integer arithmetic

#[inline]
pub(super) fn handle_iadd(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1.wrapping_add(v2)))
}

#[inline]
pub(super) fn handle_isub(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1.wrapping_sub(v2)))
}

#[inline]
pub(super) fn handle_imul(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1.wrapping_mul(v2)))
}

#[inline]
pub(super) fn handle_idiv(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    if v2 == 0 {
        return throw_exception!(ArithmeticException, "/ by zero");
    }
    thread.stack.push_operand(Value::Integer(v1.wrapping_div(v2)))
}

#[inline]
pub(super) fn handle_irem(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    if v2 == 0 {
        return throw_exception!(ArithmeticException, "/ by zero");
    }
    thread.stack.push_operand(Value::Integer(v1.wrapping_rem(v2)))
}

#[inline]
pub(super) fn handle_ineg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v.wrapping_neg()))
}

#[inline]
pub(super) fn handle_ishl(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1.wrapping_shl(v2 as u32 & 0x1f)))
}

#[inline]
pub(super) fn handle_ishr(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1.wrapping_shr(v2 as u32 & 0x1f)))
}

#[inline]
pub(super) fn handle_iushr(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread
        .stack
        .push_operand(Value::Integer(((v1 as u32) >> (v2 as u32 & 0x1f)) as i32))
}

#[inline]
pub(super) fn handle_iand(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1 & v2))
}

#[inline]
pub(super) fn handle_ior(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1 | v2))
}

#[inline]
pub(super) fn handle_ixor(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v1 ^ v2))
}

// Long arithmetic

#[inline]
pub(super) fn handle_ladd(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1.wrapping_add(v2)))
}

#[inline]
pub(super) fn handle_lsub(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1.wrapping_sub(v2)))
}

#[inline]
pub(super) fn handle_lmul(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1.wrapping_mul(v2)))
}

#[inline]
pub(super) fn handle_ldiv(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    if v2 == 0 {
        return throw_exception!(ArithmeticException, "/ by zero");
    }
    thread.stack.push_operand(Value::Long(v1.wrapping_div(v2)))
}

#[inline]
pub(super) fn handle_lrem(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    if v2 == 0 {
        return throw_exception!(ArithmeticException, "/ by zero");
    }
    thread.stack.push_operand(Value::Long(v1.wrapping_rem(v2)))
}

#[inline]
pub(super) fn handle_lneg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v.wrapping_neg()))
}

#[inline]
pub(super) fn handle_lshl(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1.wrapping_shl(v2 as u32 & 0x3f)))
}

#[inline]
pub(super) fn handle_lshr(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1.wrapping_shr(v2 as u32 & 0x3f)))
}

#[inline]
pub(super) fn handle_lushr(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread
        .stack
        .push_operand(Value::Long(((v1 as u64) >> (v2 as u32 & 0x3f)) as i64))
}

#[inline]
pub(super) fn handle_land(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1 & v2))
}

#[inline]
pub(super) fn handle_lor(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1 | v2))
}

#[inline]
pub(super) fn handle_lxor(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Long(v1 ^ v2))
}

// Float/double arithmetic

#[inline]
pub(super) fn handle_fadd(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(v1 + v2))
}

#[inline]
pub(super) fn handle_fsub(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(v1 - v2))
}

#[inline]
pub(super) fn handle_fmul(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(v1 * v2))
}

#[inline]
pub(super) fn handle_fdiv(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(v1 / v2))
}

#[inline]
pub(super) fn handle_frem(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(v1 % v2))
}

#[inline]
pub(super) fn handle_fneg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Float(-v))
}

#[inline]
pub(super) fn handle_dadd(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(v1 + v2))
}

#[inline]
pub(super) fn handle_dsub(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(v1 - v2))
}

#[inline]
pub(super) fn handle_dmul(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(v1 * v2))
}

#[inline]
pub(super) fn handle_ddiv(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(v1 / v2))
}

#[inline]
pub(super) fn handle_drem(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(v1 % v2))
}

#[inline]
pub(super) fn handle_dneg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Double(-v))
}

// Conversions

#[inline]
pub(super) fn handle_i2l(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Long(v as i64))
}

#[inline]
pub(super) fn handle_i2f(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Float(v as f32))
}

#[inline]
pub(super) fn handle_i2d(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Double(v as f64))
}

#[inline]
pub(super) fn handle_l2i(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Integer(v as i32))
}

#[inline]
pub(super) fn handle_l2f(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Float(v as f32))
}

#[inline]
pub(super) fn handle_l2d(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_long_val()?;
    thread.stack.push_operand(Value::Double(v as f64))
}

#[inline]
pub(super) fn handle_f2i(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Integer(v as i32))
}

#[inline]
pub(super) fn handle_f2l(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Long(v as i64))
}

#[inline]
pub(super) fn handle_f2d(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Double(v as f64))
}

#[inline]
pub(super) fn handle_d2i(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Integer(v as i32))
}

#[inline]
pub(super) fn handle_d2l(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Long(v as i64))
}

#[inline]
pub(super) fn handle_d2f(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Float(v as f32))
}

#[inline]
pub(super) fn handle_i2b(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v as i8 as i32))
}

#[inline]
pub(super) fn handle_i2c(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v as u16 as i32))
}

#[inline]
pub(super) fn handle_i2s(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    thread.stack.push_operand(Value::Integer(v as i16 as i32))
}

// Comparisons

#[inline]
pub(super) fn handle_lcmp(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_long_val()?;
    let v1 = thread.stack.pop_long_val()?;
    let res = match v1.cmp(&v2) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    thread.stack.push_operand(Value::Integer(res))
}

fn float_cmp(v1: f32, v2: f32, nan_result: i32) -> i32 {
    match v1.partial_cmp(&v2) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => nan_result,
    }
}

fn double_cmp(v1: f64, v2: f64, nan_result: i32) -> i32 {
    match v1.partial_cmp(&v2) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => nan_result,
    }
}

#[inline]
pub(super) fn handle_fcmpl(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Integer(float_cmp(v1, v2, -1)))
}

#[inline]
pub(super) fn handle_fcmpg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_float_val()?;
    let v1 = thread.stack.pop_float_val()?;
    thread.stack.push_operand(Value::Integer(float_cmp(v1, v2, 1)))
}

#[inline]
pub(super) fn handle_dcmpl(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Integer(double_cmp(v1, v2, -1)))
}

#[inline]
pub(super) fn handle_dcmpg(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_double_val()?;
    let v1 = thread.stack.pop_double_val()?;
    thread.stack.push_operand(Value::Integer(double_cmp(v1, v2, 1)))
}

// Branches. Taken: the signed offset is added to the pre-advance pc. Not
// taken: the pc falls through by the instruction size.

fn take_if(
    thread: &mut JavaThreadState,
    taken: bool,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let frame = thread.stack.cur_frame_mut()?;
    frame.pc = if taken {
        branch16(frame.pc, offset)
    } else {
        frame.pc + instr_size
    };
    Ok(())
}

#[inline]
pub(super) fn handle_ifeq(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v == 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifne(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v != 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_iflt(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v < 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifge(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v >= 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifgt(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v > 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifle(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_int_val()?;
    take_if(thread, v <= 0, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmpeq(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 == v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmpne(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 != v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmplt(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 < v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmpge(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 >= v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmpgt(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 > v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ificmple(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_int_val()?;
    let v1 = thread.stack.pop_int_val()?;
    take_if(thread, v1 <= v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifacmpeq(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_nullable_ref()?;
    let v1 = thread.stack.pop_nullable_ref()?;
    take_if(thread, v1 == v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifacmpne(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v2 = thread.stack.pop_nullable_ref()?;
    let v1 = thread.stack.pop_nullable_ref()?;
    take_if(thread, v1 != v2, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifnull(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_nullable_ref()?;
    take_if(thread, v == Value::Null, offset, instr_size)
}

#[inline]
pub(super) fn handle_ifnonnull(
    thread: &mut JavaThreadState,
    offset: i16,
    instr_size: usize,
) -> Result<(), JvmError> {
    let v = thread.stack.pop_nullable_ref()?;
    take_if(thread, v != Value::Null, offset, instr_size)
}

#[inline]
pub(super) fn handle_goto(thread: &mut JavaThreadState, offset: i16) -> Result<(), JvmError> {
    let frame = thread.stack.cur_frame_mut()?;
    frame.pc = branch16(frame.pc, offset);
    Ok(())
}

#[inline]
pub(super) fn handle_goto_w(thread: &mut JavaThreadState, offset: i32) -> Result<(), JvmError> {
    let frame = thread.stack.cur_frame_mut()?;
    frame.pc = branch32(frame.pc, offset);
    Ok(())
}

pub(super) fn handle_tableswitch(
    thread: &mut JavaThreadState,
    data: &TableSwitchData,
) -> Result<(), JvmError> {
    let key = thread.stack.pop_int_val()?;
    let offset = if key < data.low || key > data.high {
        data.default_offset
    } else {
        data.offsets[(key - data.low) as usize]
    };
    let frame = thread.stack.cur_frame_mut()?;
    frame.pc = branch32(frame.pc, offset);
    Ok(())
}

pub(super) fn handle_lookupswitch(
    thread: &mut JavaThreadState,
    data: &LookupSwitchData,
) -> Result<(), JvmError> {
    let key = thread.stack.pop_int_val()?;
    let offset = data
        .pairs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, off)| *off)
        .unwrap_or(data.default_offset);
    let frame = thread.stack.cur_frame_mut()?;
    frame.pc = branch32(frame.pc, offset);
    Ok(())
}

// Fields

pub(super) fn handle_getstatic(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let (class_id, slot) = vm.resolve_static_field(cur_class_id, idx)?;
    Interpreter::ensure_initialized(thread, class_id, vm)?;
    let value = vm
        .method_area_read()
        .get_class(&class_id)
        .static_field(slot)?
        .get();
    thread.stack.push_operand(value)
}

pub(super) fn handle_putstatic(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let (class_id, slot) = vm.resolve_static_field(cur_class_id, idx)?;
    Interpreter::ensure_initialized(thread, class_id, vm)?;
    let value = thread.stack.pop_operand()?;
    vm.method_area_read()
        .get_class(&class_id)
        .static_field(slot)?
        .set(value);
    Ok(())
}

pub(super) fn handle_getfield(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let oref = thread.stack.pop_obj_val()?;
    let obj_class_id = vm.heap_read().get_class_id(oref)?;
    let (offset, key) = vm.resolve_instance_field(cur_class_id, idx, obj_class_id)?;
    check_resolved_offset(vm, obj_class_id, offset, key)?;
    let value = *vm
        .heap_read()
        .get(oref)?
        .fields
        .get(offset)
        .ok_or(JvmError::UnexpectedType("field offset beyond object"))?;
    thread.stack.push_operand(value)
}

pub(super) fn handle_putfield(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let value = thread.stack.pop_operand()?;
    let oref = thread.stack.pop_obj_val()?;
    let obj_class_id = vm.heap_read().get_class_id(oref)?;
    let (offset, key) = vm.resolve_instance_field(cur_class_id, idx, obj_class_id)?;
    check_resolved_offset(vm, obj_class_id, offset, key)?;
    let mut heap = vm.heap_write();
    let obj = heap.get_mut(oref)?;
    let slot = obj
        .fields
        .get_mut(offset)
        .ok_or(JvmError::UnexpectedType("field offset beyond object"))?;
    *slot = value;
    Ok(())
}

/// A resolved offset must still name the same field in this object's
/// layout, and that field must not be static.
fn check_resolved_offset(
    vm: &VirtualMachine,
    obj_class_id: crate::keys::ClassId,
    offset: usize,
    key: crate::keys::FieldKey,
) -> Result<(), JvmError> {
    let ma = vm.method_area_read();
    let field = ma.get_class(&obj_class_id).layout_field(offset)?;
    if field.key != key || field.flags.is_static() {
        return Err(build_exception!(
            IncompatibleClassChangeError,
            "field {} resolved against an incompatible layout",
            vm.interner().resolve(&key.name)
        ));
    }
    Ok(())
}

// Objects and arrays

pub(super) fn handle_new(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let class_id = vm.resolve_class(cur_class_id, idx)?;
    Interpreter::ensure_initialized(thread, class_id, vm)?;
    let r = vm.gc_obj_alloc(class_id)?;
    thread.stack.push_operand(Value::Ref(r))
}

pub(super) fn handle_newarray(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    array_type: ArrayType,
) -> Result<(), JvmError> {
    let count = thread.stack.pop_int_val()?;
    if count < 0 {
        return throw_exception!(NegativeArraySizeException, "{}", count);
    }
    let r = vm.gc_array_alloc(array_type, count, None)?;
    thread.stack.push_operand(Value::Ref(r))
}

pub(super) fn handle_anewarray(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let element_class_id = vm.resolve_class(cur_class_id, idx)?;
    let count = thread.stack.pop_int_val()?;
    if count < 0 {
        return throw_exception!(NegativeArraySizeException, "{}", count);
    }
    let r = vm.gc_array_alloc(ArrayType::Ref, count, Some(element_class_id))?;
    thread.stack.push_operand(Value::Ref(r))
}

pub(super) fn handle_arraylength(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
) -> Result<(), JvmError> {
    let array_ref = thread.stack.pop_obj_val()?;
    let length = vm.heap_read().get_array_length(array_ref)?;
    thread.stack.push_operand(Value::Integer(length))
}

#[inline]
pub(super) fn handle_athrow(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    let exception_ref = thread.stack.pop_obj_val()?;
    Err(JvmError::JavaExceptionThrown(exception_ref))
}

/// checkcast leaves the reference on the stack. A null reference always
/// passes; otherwise the receiver's class must be the target class or one
/// of its subtypes.
pub(super) fn handle_checkcast(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let target_sym = {
        let ma = vm.method_area_read();
        ma.get_class(&cur_class_id)
            .cp
            .get_class_sym(idx, vm.interner())?
    };
    let receiver = *thread.stack.peek_operand()?;
    match receiver {
        Value::Null => Ok(()),
        Value::Ref(r) => {
            let obj_class_id = vm.heap_read().get_class_id(r)?;
            let ma = vm.method_area_read();
            if ma.instance_of(obj_class_id, target_sym) {
                return Ok(());
            }
            throw_exception!(
                ClassCastException,
                "class {} cannot be cast to class {}",
                vm.interner().resolve(&ma.get_class(&obj_class_id).name),
                vm.interner().resolve(&target_sym)
            )
        }
        _ => Err(JvmError::UnexpectedType("checkcast of a non-reference")),
    }
}

pub(super) fn handle_instanceof(
    thread: &mut JavaThreadState,
    vm: &VirtualMachine,
    idx: u16,
) -> Result<(), JvmError> {
    let cur_class_id = thread.stack.cur_frame()?.class_id;
    let target_sym = {
        let ma = vm.method_area_read();
        ma.get_class(&cur_class_id)
            .cp
            .get_class_sym(idx, vm.interner())?
    };
    let result = match thread.stack.pop_nullable_ref()? {
        Value::Null => 0,
        Value::Ref(r) => {
            let obj_class_id = vm.heap_read().get_class_id(r)?;
            i32::from(vm.method_area_read().instance_of(obj_class_id, target_sym))
        }
        _ => unreachable!(),
    };
    thread.stack.push_operand(Value::Integer(result))
}

/// Dummy monitors: synchronization is a no-op in this VM.
#[inline]
pub(super) fn handle_monitorenter(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    thread.stack.pop_operand()?;
    Ok(())
}

#[inline]
pub(super) fn handle_monitorexit(thread: &mut JavaThreadState) -> Result<(), JvmError> {
    thread.stack.pop_operand()?;
    Ok(())
}
