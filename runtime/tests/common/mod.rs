//! Test support: assembles real `.class` byte images and lays them out on
//! a throwaway classpath, so tests drive the full
//! load -> link -> init -> interpret pipeline.

use hawkbeans_runtime::{VirtualMachine, VmConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;

pub struct ClassFileBuilder {
    pool_bytes: Vec<u8>,
    pool_count: u16,
    access_flags: u16,
    this_idx: u16,
    super_idx: u16,
    fields: Vec<u8>,
    fields_count: u16,
    methods: Vec<u8>,
    methods_count: u16,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
}

impl ClassFileBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut b = ClassFileBuilder {
            pool_bytes: Vec::new(),
            pool_count: 1,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_idx: 0,
            super_idx: 0,
            fields: Vec::new(),
            fields_count: 0,
            methods: Vec::new(),
            methods_count: 0,
            utf8_cache: HashMap::new(),
            class_cache: HashMap::new(),
        };
        b.this_idx = b.class_const(name);
        b.super_idx = match super_name {
            Some(s) => b.class_const(s),
            None => 0,
        };
        b
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(idx) = self.utf8_cache.get(s) {
            return *idx;
        }
        let idx = self.pool_count;
        self.pool_bytes.push(1);
        self.pool_bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.pool_bytes.extend_from_slice(s.as_bytes());
        self.pool_count += 1;
        self.utf8_cache.insert(s.to_string(), idx);
        idx
    }

    pub fn class_const(&mut self, name: &str) -> u16 {
        if let Some(idx) = self.class_cache.get(name) {
            return *idx;
        }
        let name_idx = self.utf8(name);
        let idx = self.pool_count;
        self.pool_bytes.push(7);
        self.pool_bytes.extend_from_slice(&name_idx.to_be_bytes());
        self.pool_count += 1;
        self.class_cache.insert(name.to_string(), idx);
        idx
    }

    pub fn int_const(&mut self, v: i32) -> u16 {
        let idx = self.pool_count;
        self.pool_bytes.push(3);
        self.pool_bytes.extend_from_slice(&v.to_be_bytes());
        self.pool_count += 1;
        idx
    }

    /// Occupies two pool slots.
    pub fn long_const(&mut self, v: i64) -> u16 {
        let idx = self.pool_count;
        self.pool_bytes.push(5);
        self.pool_bytes
            .extend_from_slice(&((v as u64 >> 32) as u32).to_be_bytes());
        self.pool_bytes
            .extend_from_slice(&(v as u64 as u32).to_be_bytes());
        self.pool_count += 2;
        idx
    }

    pub fn string_const(&mut self, s: &str) -> u16 {
        let utf8_idx = self.utf8(s);
        let idx = self.pool_count;
        self.pool_bytes.push(8);
        self.pool_bytes.extend_from_slice(&utf8_idx.to_be_bytes());
        self.pool_count += 1;
        idx
    }

    fn name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(desc);
        let idx = self.pool_count;
        self.pool_bytes.push(12);
        self.pool_bytes.extend_from_slice(&name_idx.to_be_bytes());
        self.pool_bytes.extend_from_slice(&desc_idx.to_be_bytes());
        self.pool_count += 1;
        idx
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, desc: &str) -> u16 {
        let class_idx = self.class_const(class);
        let nat_idx = self.name_and_type(name, desc);
        let idx = self.pool_count;
        self.pool_bytes.push(tag);
        self.pool_bytes.extend_from_slice(&class_idx.to_be_bytes());
        self.pool_bytes.extend_from_slice(&nat_idx.to_be_bytes());
        self.pool_count += 1;
        idx
    }

    pub fn field_ref(&mut self, class: &str, name: &str, desc: &str) -> u16 {
        self.member_ref(9, class, name, desc)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, desc: &str) -> u16 {
        self.member_ref(10, class, name, desc)
    }

    pub fn add_field(&mut self, flags: u16, name: &str, desc: &str) {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(desc);
        self.fields.extend_from_slice(&flags.to_be_bytes());
        self.fields.extend_from_slice(&name_idx.to_be_bytes());
        self.fields.extend_from_slice(&desc_idx.to_be_bytes());
        self.fields.extend_from_slice(&0u16.to_be_bytes());
        self.fields_count += 1;
    }

    pub fn add_const_field(&mut self, flags: u16, name: &str, desc: &str, const_idx: u16) {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(desc);
        let attr_name_idx = self.utf8("ConstantValue");
        self.fields.extend_from_slice(&flags.to_be_bytes());
        self.fields.extend_from_slice(&name_idx.to_be_bytes());
        self.fields.extend_from_slice(&desc_idx.to_be_bytes());
        self.fields.extend_from_slice(&1u16.to_be_bytes());
        self.fields.extend_from_slice(&attr_name_idx.to_be_bytes());
        self.fields.extend_from_slice(&2u32.to_be_bytes());
        self.fields.extend_from_slice(&const_idx.to_be_bytes());
        self.fields_count += 1;
    }

    pub fn add_method(
        &mut self,
        flags: u16,
        name: &str,
        desc: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) {
        self.add_method_with_table(flags, name, desc, max_stack, max_locals, code, &[]);
    }

    /// `table` entries are `(start_pc, end_pc, handler_pc, catch_type)`.
    pub fn add_method_with_table(
        &mut self,
        flags: u16,
        name: &str,
        desc: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        table: &[(u16, u16, u16, u16)],
    ) {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(desc);
        let code_attr_name_idx = self.utf8("Code");

        self.methods.extend_from_slice(&flags.to_be_bytes());
        self.methods.extend_from_slice(&name_idx.to_be_bytes());
        self.methods.extend_from_slice(&desc_idx.to_be_bytes());
        self.methods.extend_from_slice(&1u16.to_be_bytes());

        let attr_len = 2 + 2 + 4 + code.len() + 2 + 8 * table.len() + 2;
        self.methods.extend_from_slice(&code_attr_name_idx.to_be_bytes());
        self.methods.extend_from_slice(&(attr_len as u32).to_be_bytes());
        self.methods.extend_from_slice(&max_stack.to_be_bytes());
        self.methods.extend_from_slice(&max_locals.to_be_bytes());
        self.methods.extend_from_slice(&(code.len() as u32).to_be_bytes());
        self.methods.extend_from_slice(code);
        self.methods.extend_from_slice(&(table.len() as u16).to_be_bytes());
        for (start, end, handler, catch_type) in table {
            self.methods.extend_from_slice(&start.to_be_bytes());
            self.methods.extend_from_slice(&end.to_be_bytes());
            self.methods.extend_from_slice(&handler.to_be_bytes());
            self.methods.extend_from_slice(&catch_type.to_be_bytes());
        }
        self.methods.extend_from_slice(&0u16.to_be_bytes());

        self.methods_count += 1;
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&self.pool_count.to_be_bytes());
        out.extend_from_slice(&self.pool_bytes);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_idx.to_be_bytes());
        out.extend_from_slice(&self.super_idx.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        out.extend_from_slice(&self.fields_count.to_be_bytes());
        out.extend_from_slice(&self.fields);
        out.extend_from_slice(&self.methods_count.to_be_bytes());
        out.extend_from_slice(&self.methods);
        out.extend_from_slice(&0u16.to_be_bytes()); // class attributes
        out
    }
}

static NEXT_CLASSPATH: AtomicUsize = AtomicUsize::new(0);

/// A throwaway classpath directory, removed on drop.
pub struct TestClasspath {
    dir: PathBuf,
}

impl TestClasspath {
    pub fn new() -> Self {
        let n = NEXT_CLASSPATH.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "hawkbeans-test-{}-{}",
            std::process::id(),
            n
        ));
        std::fs::create_dir_all(&dir).unwrap();
        TestClasspath { dir }
    }

    pub fn write_class(&self, name: &str, bytes: &[u8]) {
        let path = self.dir.join(format!("{}.class", name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    pub fn path(&self) -> String {
        self.dir.to_string_lossy().to_string()
    }
}

impl Drop for TestClasspath {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

const RETURN_VOID: &[u8] = &[0xb1];

fn object_class() -> Vec<u8> {
    let mut b = ClassFileBuilder::new("java/lang/Object", None);
    b.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, RETURN_VOID);
    b.build()
}

fn string_class() -> Vec<u8> {
    let mut b = ClassFileBuilder::new("java/lang/String", Some("java/lang/Object"));
    b.add_field(ACC_PUBLIC, "value", "[C");
    b.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, RETURN_VOID);
    // iconst_0; ireturn
    b.add_method(ACC_PUBLIC, "length", "()I", 1, 1, &[0x03, 0xac]);
    b.build()
}

fn throwable_like(name: &str) -> Vec<u8> {
    let mut b = ClassFileBuilder::new(name, Some("java/lang/Object"));
    b.add_field(ACC_PUBLIC, "message", "Ljava/lang/String;");
    b.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, RETURN_VOID);
    b.build()
}

/// Object, String and the exception classes the runtime may raise.
pub fn write_prelude(cp: &TestClasspath) {
    cp.write_class("java/lang/Object", &object_class());
    cp.write_class("java/lang/String", &string_class());
    for name in [
        "java/lang/NullPointerException",
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/NegativeArraySizeException",
        "java/lang/OutOfMemoryError",
        "java/lang/ClassNotFoundException",
        "java/lang/ArithmeticException",
        "java/lang/IncompatibleClassChangeError",
        "java/lang/ClassCastException",
        "java/lang/NoSuchFieldError",
        "java/lang/NoSuchMethodError",
    ] {
        cp.write_class(name, &throwable_like(name));
    }
}

pub fn vm_on(cp: &TestClasspath) -> VirtualMachine {
    VirtualMachine::new(VmConfig::for_tests(vec![cp.path()]))
}
