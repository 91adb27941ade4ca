use crate::classfile::{
    AccessFlags, ClassFile, CodeAttribute, ConstantTag, ExceptionTableEntry, FieldInfo,
    MethodInfo, RawConstant, JAVA_MAGIC,
};
use crate::error::JvmError;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Strictly serial, top-down reader over a `.class` byte image. Any
/// truncation or malformed structure aborts with `ClassFormat`; no partial
/// classes are ever produced.
struct ClassReader<'a> {
    data: &'a [u8],
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn truncated() -> JvmError {
        JvmError::ClassFormat("truncated class file".to_string())
    }

    fn u1(&mut self) -> Result<u8, JvmError> {
        self.data.read_u8().map_err(|_| Self::truncated())
    }

    fn u2(&mut self) -> Result<u16, JvmError> {
        self.data
            .read_u16::<BigEndian>()
            .map_err(|_| Self::truncated())
    }

    fn u4(&mut self) -> Result<u32, JvmError> {
        self.data
            .read_u32::<BigEndian>()
            .map_err(|_| Self::truncated())
    }

    fn bytes(&mut self, len: usize) -> Result<Vec<u8>, JvmError> {
        let mut buf = vec![0u8; len];
        self.data
            .read_exact(&mut buf)
            .map_err(|_| Self::truncated())?;
        Ok(buf)
    }

    fn skip(&mut self, len: usize) -> Result<(), JvmError> {
        if self.data.len() < len {
            return Err(Self::truncated());
        }
        self.data = &self.data[len..];
        Ok(())
    }
}

pub fn parse_class_file(data: &[u8]) -> Result<ClassFile, JvmError> {
    let mut r = ClassReader::new(data);

    let magic = r.u4()?;
    if magic != JAVA_MAGIC {
        return Err(JvmError::ClassFormat(format!("bad magic: {:#010x}", magic)));
    }

    let minor_version = r.u2()?;
    let major_version = r.u2()?;

    let const_pool_count = r.u2()?;
    let constant_pool = parse_const_pool(&mut r, const_pool_count)?;

    let access_flags = AccessFlags(r.u2()?);
    let this_class = r.u2()?;
    let super_class = r.u2()?;

    let interfaces_count = r.u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(r.u2()?);
    }

    let fields_count = r.u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        fields.push(parse_field(&mut r, &constant_pool)?);
    }

    let methods_count = r.u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(parse_method(&mut r, &constant_pool)?);
    }

    // Class-level attributes carry nothing the runtime needs; skip them.
    let attr_count = r.u2()?;
    for _ in 0..attr_count {
        let _name_idx = r.u2()?;
        let len = r.u4()?;
        r.skip(len as usize)?;
    }

    Ok(ClassFile {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
    })
}

/// The pool count is one-based; long/double entries consume two slots, the
/// second of which is a dead placeholder.
fn parse_const_pool(r: &mut ClassReader, count: u16) -> Result<Vec<RawConstant>, JvmError> {
    let mut pool = Vec::with_capacity(count as usize);
    pool.push(RawConstant::Unused);

    let mut i = 1u16;
    while i < count {
        let entry = parse_const_pool_entry(r)?;
        let wide = matches!(entry, RawConstant::Long(_) | RawConstant::Double(_));
        pool.push(entry);
        i += 1;
        if wide {
            pool.push(RawConstant::Unused);
            i += 1;
        }
    }

    Ok(pool)
}

fn parse_const_pool_entry(r: &mut ClassReader) -> Result<RawConstant, JvmError> {
    let tag_byte = r.u1()?;
    let tag = ConstantTag::try_from(tag_byte)
        .map_err(|_| JvmError::ClassFormat(format!("invalid constant tag: {}", tag_byte)))?;

    let entry = match tag {
        ConstantTag::Utf8 => {
            let len = r.u2()? as usize;
            let bytes = r.bytes(len)?;
            let s = String::from_utf8(bytes)
                .map_err(|_| JvmError::ClassFormat("invalid UTF-8 constant".to_string()))?;
            RawConstant::Utf8(s)
        }
        ConstantTag::Integer => RawConstant::Integer(r.u4()? as i32),
        ConstantTag::Float => RawConstant::Float(f32::from_bits(r.u4()?)),
        ConstantTag::Long => {
            let hi = r.u4()? as u64;
            let lo = r.u4()? as u64;
            RawConstant::Long(((hi << 32) | lo) as i64)
        }
        ConstantTag::Double => {
            let hi = r.u4()? as u64;
            let lo = r.u4()? as u64;
            RawConstant::Double(f64::from_bits((hi << 32) | lo))
        }
        ConstantTag::Class => RawConstant::Class { name_idx: r.u2()? },
        ConstantTag::String => RawConstant::String { utf8_idx: r.u2()? },
        ConstantTag::FieldRef => RawConstant::FieldRef {
            class_idx: r.u2()?,
            nat_idx: r.u2()?,
        },
        ConstantTag::MethodRef => RawConstant::MethodRef {
            class_idx: r.u2()?,
            nat_idx: r.u2()?,
        },
        ConstantTag::InterfaceMethodRef => RawConstant::InterfaceMethodRef {
            class_idx: r.u2()?,
            nat_idx: r.u2()?,
        },
        ConstantTag::NameAndType => RawConstant::NameAndType {
            name_idx: r.u2()?,
            desc_idx: r.u2()?,
        },
        ConstantTag::MethodHandle => RawConstant::MethodHandle {
            ref_kind: r.u1()?,
            ref_idx: r.u2()?,
        },
        ConstantTag::MethodType => RawConstant::MethodType { desc_idx: r.u2()? },
        ConstantTag::InvokeDynamic => RawConstant::InvokeDynamic {
            bootstrap_idx: r.u2()?,
            nat_idx: r.u2()?,
        },
    };

    Ok(entry)
}

fn pool_utf8(pool: &[RawConstant], idx: u16) -> Result<&str, JvmError> {
    match pool.get(idx as usize) {
        Some(RawConstant::Utf8(s)) => Ok(s),
        _ => Err(JvmError::ClassFormat(format!(
            "attribute name index {} is not a Utf8 constant",
            idx
        ))),
    }
}

fn parse_field(r: &mut ClassReader, pool: &[RawConstant]) -> Result<FieldInfo, JvmError> {
    let access_flags = AccessFlags(r.u2()?);
    let name_idx = r.u2()?;
    let desc_idx = r.u2()?;
    let attr_count = r.u2()?;

    let mut constant_value = None;
    for _ in 0..attr_count {
        let attr_name_idx = r.u2()?;
        let len = r.u4()?;
        if pool_utf8(pool, attr_name_idx)? == "ConstantValue" {
            if len != 2 {
                return Err(JvmError::ClassFormat(
                    "ConstantValue attribute must be two bytes".to_string(),
                ));
            }
            constant_value = Some(r.u2()?);
        } else {
            r.skip(len as usize)?;
        }
    }

    Ok(FieldInfo {
        access_flags,
        name_idx,
        desc_idx,
        constant_value,
    })
}

fn parse_method(r: &mut ClassReader, pool: &[RawConstant]) -> Result<MethodInfo, JvmError> {
    let access_flags = AccessFlags(r.u2()?);
    let name_idx = r.u2()?;
    let desc_idx = r.u2()?;
    let attr_count = r.u2()?;

    let mut code = None;
    for _ in 0..attr_count {
        let attr_name_idx = r.u2()?;
        let len = r.u4()?;
        if pool_utf8(pool, attr_name_idx)? == "Code" {
            code = Some(parse_code_attr(r)?);
        } else {
            r.skip(len as usize)?;
        }
    }

    Ok(MethodInfo {
        access_flags,
        name_idx,
        desc_idx,
        code,
    })
}

fn parse_code_attr(r: &mut ClassReader) -> Result<CodeAttribute, JvmError> {
    let max_stack = r.u2()?;
    let max_locals = r.u2()?;
    let code_len = r.u4()? as usize;
    let code = r.bytes(code_len)?;

    let excp_table_len = r.u2()?;
    let mut exception_table = Vec::with_capacity(excp_table_len as usize);
    for _ in 0..excp_table_len {
        exception_table.push(ExceptionTableEntry {
            start_pc: r.u2()?,
            end_pc: r.u2()?,
            handler_pc: r.u2()?,
            catch_type: r.u2()?,
        });
    }

    // Inner attributes (LineNumberTable and friends) are skipped.
    let attr_count = r.u2()?;
    for _ in 0..attr_count {
        let _name_idx = r.u2()?;
        let len = r.u4()?;
        r.skip(len as usize)?;
    }

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attr_count,
    })
}
