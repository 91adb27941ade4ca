//! End-to-end scenarios over assembled class files: every image here goes
//! through the reader, the registry, linking, initialization and the
//! interpreter, exactly as a class loaded from disk would.

mod common;

use common::{vm_on, write_prelude, ClassFileBuilder, TestClasspath, ACC_PUBLIC, ACC_STATIC};
use hawkbeans_runtime::error::JavaExceptionKind;
use hawkbeans_runtime::heap::ObjRef;
use hawkbeans_runtime::interpreter::Interpreter;
use hawkbeans_runtime::keys::{ClassId, MethodId, MethodKey};
use hawkbeans_runtime::thread::JavaThreadState;
use hawkbeans_runtime::vm::Value;
use hawkbeans_runtime::{JvmError, VirtualMachine, VmConfig};

fn load(vm: &VirtualMachine, name: &str) -> ClassId {
    let sym = vm.interner().get_or_intern(name);
    vm.method_area_write().get_class_id_or_load(sym).unwrap()
}

fn method(vm: &VirtualMachine, class_id: ClassId, name: &str, desc: &str) -> MethodId {
    let key = MethodKey {
        name: vm.interner().get_or_intern(name),
        desc: vm.interner().get_or_intern(desc),
    };
    vm.method_area_read()
        .find_method(class_id, &key)
        .unwrap_or_else(|| panic!("method {} {} not found", name, desc))
}

fn thread_on(class_id: ClassId) -> JavaThreadState {
    JavaThreadState::new("main", class_id, 64)
}

fn read_java_string(vm: &VirtualMachine, string_ref: ObjRef) -> String {
    let heap = vm.heap_read();
    let string_obj = heap.get(string_ref).unwrap();
    let arr_ref = match string_obj.fields[0] {
        Value::Ref(r) => r,
        other => panic!("String.value is {:?}", other),
    };
    let arr = heap.get(arr_ref).unwrap();
    let units: Vec<u16> = arr
        .fields
        .iter()
        .map(|v| match v {
            Value::Integer(c) => *c as u16,
            other => panic!("char slot is {:?}", other),
        })
        .collect();
    String::from_utf16(&units).unwrap()
}

fn exception_class_name(vm: &VirtualMachine, eref: ObjRef) -> String {
    let class_id = vm.heap_read().get_class_id(eref).unwrap();
    let ma = vm.method_area_read();
    vm.interner().resolve(&ma.get_class(&class_id).name).to_string()
}

#[test]
fn static_add_returns_five() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    // iload_0; iload_1; iadd; ireturn
    b.add_method(ACC_PUBLIC | ACC_STATIC, "add", "(II)I", 2, 2, &[0x1a, 0x1b, 0x60, 0xac]);
    cp.write_class("Main", &b.build());

    let vm = vm_on(&cp);
    let main_sym = vm.interner().get_or_intern("Main");
    assert!(!vm.method_area_read().is_loaded(main_sym));
    let class_id = load(&vm, "Main");
    assert_eq!(vm.method_area_read().get_class_id(main_sym), Some(class_id));
    let add = method(&vm, class_id, "add", "(II)I");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(
        &mut thread,
        add,
        vec![Value::Integer(2), Value::Integer(3)],
        &vm,
    )
    .unwrap();
    assert_eq!(ret, Some(Value::Integer(5)));
    assert!(thread.stack.is_empty());
}

#[test]
fn long_arguments_round_trip_through_wide_locals() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    // lload_0; lload_2; ladd; lreturn
    b.add_method(ACC_PUBLIC | ACC_STATIC, "lsum", "(JJ)J", 4, 4, &[0x1e, 0x20, 0x61, 0xad]);
    cp.write_class("Main", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let lsum = method(&vm, class_id, "lsum", "(JJ)J");
    let mut thread = thread_on(class_id);

    let pattern = 0x1234_5678_9abc_def0_u64 as i64;
    let ret = Interpreter::invoke_static_method(
        &mut thread,
        lsum,
        vec![Value::Long(pattern), Value::Long(0)],
        &vm,
    )
    .unwrap();
    assert_eq!(ret, Some(Value::Long(pattern)));

    let ret = Interpreter::invoke_static_method(
        &mut thread,
        lsum,
        vec![Value::Long(10_000_000_000), Value::Long(5)],
        &vm,
    )
    .unwrap();
    assert_eq!(ret, Some(Value::Long(10_000_000_005)));
}

#[test]
fn array_store_out_of_bounds_terminates_with_index_in_message() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    // iconst_3; newarray int; iconst_5; iconst_1; iastore; return
    b.add_method(
        ACC_PUBLIC | ACC_STATIC,
        "main",
        "([Ljava/lang/String;)V",
        3,
        1,
        &[0x06, 0xbc, 0x0a, 0x08, 0x04, 0x4f, 0xb1],
    );
    cp.write_class("Main", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let main = method(&vm, class_id, "main", "([Ljava/lang/String;)V");
    let mut thread = thread_on(class_id);

    let err = Interpreter::invoke_static_method(&mut thread, main, vec![Value::Null], &vm)
        .unwrap_err();
    let eref = match err {
        JvmError::JavaExceptionThrown(r) => r,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(
        exception_class_name(&vm, eref),
        "java/lang/ArrayIndexOutOfBoundsException"
    );
    let message = vm.get_exception_message(eref).unwrap();
    assert!(message.contains('5'), "message was {:?}", message);

    let report = vm.uncaught_exception_report(&thread, eref);
    assert!(report.starts_with(
        "Exception in thread main java/lang/ArrayIndexOutOfBoundsException at Main"
    ));
}

#[test]
fn null_receiver_raises_npe() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let length_ref = b.method_ref("java/lang/String", "length", "()I");
    let mut code = vec![0x01]; // aconst_null
    code.push(0xb6); // invokevirtual
    code.extend_from_slice(&length_ref.to_be_bytes());
    code.push(0x57); // pop
    code.push(0xb1); // return
    b.add_method(ACC_PUBLIC | ACC_STATIC, "test", "()V", 1, 0, &code);
    cp.write_class("Main", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let test = method(&vm, class_id, "test", "()V");
    let mut thread = thread_on(class_id);

    let err = Interpreter::invoke_static_method(&mut thread, test, vec![], &vm).unwrap_err();
    let eref = match err {
        JvmError::JavaExceptionThrown(r) => r,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(
        exception_class_name(&vm, eref),
        "java/lang/NullPointerException"
    );
}

#[test]
fn virtual_dispatch_runs_the_override() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut a = ClassFileBuilder::new("A", Some("java/lang/Object"));
    a.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, &[0xb1]);
    // iconst_1; ireturn
    a.add_method(ACC_PUBLIC, "foo", "()I", 1, 1, &[0x04, 0xac]);
    cp.write_class("A", &a.build());

    let mut bb = ClassFileBuilder::new("B", Some("A"));
    // iconst_2; ireturn
    bb.add_method(ACC_PUBLIC, "foo", "()I", 1, 1, &[0x05, 0xac]);
    cp.write_class("B", &bb.build());

    let mut m = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let b_class = m.class_const("B");
    let b_init = m.method_ref("B", "<init>", "()V");
    let a_foo = m.method_ref("A", "foo", "()I");
    let mut code = vec![0xbb]; // new B
    code.extend_from_slice(&b_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial B.<init> (resolves through A)
    code.extend_from_slice(&b_init.to_be_bytes());
    code.push(0xb6); // invokevirtual A.foo
    code.extend_from_slice(&a_foo.to_be_bytes());
    code.push(0xac); // ireturn
    m.add_method(ACC_PUBLIC | ACC_STATIC, "test", "()I", 2, 0, &code);
    cp.write_class("Main", &m.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let test = method(&vm, class_id, "test", "()I");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, test, vec![], &vm).unwrap();
    assert_eq!(ret, Some(Value::Integer(2)));
}

#[test]
fn checkcast_passes_subtypes_and_null() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut a = ClassFileBuilder::new("A", Some("java/lang/Object"));
    a.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, &[0xb1]);
    cp.write_class("A", &a.build());
    cp.write_class("B", &ClassFileBuilder::new("B", Some("A")).build());

    let mut m = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let b_class = m.class_const("B");
    let a_class = m.class_const("A");
    let b_init = m.method_ref("B", "<init>", "()V");
    let mut code = vec![0xbb]; // new B
    code.extend_from_slice(&b_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial B.<init> (resolves through A)
    code.extend_from_slice(&b_init.to_be_bytes());
    code.push(0xc0); // checkcast A: a B is an A
    code.extend_from_slice(&a_class.to_be_bytes());
    code.push(0x57); // pop
    code.push(0x01); // aconst_null
    code.push(0xc0); // checkcast A: null always passes
    code.extend_from_slice(&a_class.to_be_bytes());
    code.push(0x57); // pop
    code.push(0xb1); // return
    m.add_method(ACC_PUBLIC | ACC_STATIC, "test", "()V", 2, 0, &code);
    cp.write_class("Main", &m.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let test = method(&vm, class_id, "test", "()V");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, test, vec![], &vm).unwrap();
    assert_eq!(ret, None);
}

#[test]
fn failed_checkcast_raises_class_cast_exception() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut a = ClassFileBuilder::new("A", Some("java/lang/Object"));
    a.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, &[0xb1]);
    cp.write_class("A", &a.build());
    cp.write_class("B", &ClassFileBuilder::new("B", Some("A")).build());

    let mut m = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let a_class = m.class_const("A");
    let b_class = m.class_const("B");
    let a_init = m.method_ref("A", "<init>", "()V");
    let mut code = vec![0xbb]; // new A
    code.extend_from_slice(&a_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial A.<init>
    code.extend_from_slice(&a_init.to_be_bytes());
    code.push(0xc0); // checkcast B: an A is not a B
    code.extend_from_slice(&b_class.to_be_bytes());
    code.push(0x57); // pop
    code.push(0xb1); // return
    m.add_method(ACC_PUBLIC | ACC_STATIC, "bad", "()V", 2, 0, &code);
    cp.write_class("Main", &m.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let bad = method(&vm, class_id, "bad", "()V");
    let mut thread = thread_on(class_id);

    let err = Interpreter::invoke_static_method(&mut thread, bad, vec![], &vm).unwrap_err();
    let eref = match err {
        JvmError::JavaExceptionThrown(r) => r,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(
        exception_class_name(&vm, eref),
        "java/lang/ClassCastException"
    );
    let message = vm.get_exception_message(eref).unwrap();
    assert!(
        message.contains('A') && message.contains('B'),
        "message was {:?}",
        message
    );
}

#[test]
fn static_int_constant_visible_after_init() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Konst", Some("java/lang/Object"));
    let k_value = b.int_const(0x1234abcd);
    b.add_const_field(ACC_PUBLIC | ACC_STATIC | 0x0010, "K", "I", k_value);
    let k_ref = b.field_ref("Konst", "K", "I");
    let mut code = vec![0xb2]; // getstatic K
    code.extend_from_slice(&k_ref.to_be_bytes());
    code.push(0xac); // ireturn
    b.add_method(ACC_PUBLIC | ACC_STATIC, "get", "()I", 1, 0, &code);
    cp.write_class("Konst", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Konst");
    let get = method(&vm, class_id, "get", "()I");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, get, vec![], &vm).unwrap();
    assert_eq!(ret, Some(Value::Integer(0x1234abcd)));
}

#[test]
fn static_string_constant_materialized_on_init() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Konst", Some("java/lang/Object"));
    let greeting = b.string_const("hi");
    b.add_const_field(
        ACC_PUBLIC | ACC_STATIC | 0x0010,
        "GREETING",
        "Ljava/lang/String;",
        greeting,
    );
    let g_ref = b.field_ref("Konst", "GREETING", "Ljava/lang/String;");
    let mut code = vec![0xb2]; // getstatic GREETING
    code.extend_from_slice(&g_ref.to_be_bytes());
    code.push(0xb0); // areturn
    b.add_method(
        ACC_PUBLIC | ACC_STATIC,
        "get",
        "()Ljava/lang/String;",
        1,
        0,
        &code,
    );
    cp.write_class("Konst", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Konst");
    let get = method(&vm, class_id, "get", "()Ljava/lang/String;");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, get, vec![], &vm).unwrap();
    let string_ref = match ret {
        Some(Value::Ref(r)) => r,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(read_java_string(&vm, string_ref), "hi");
}

#[test]
fn ldc2w_loads_a_two_slot_long_constant() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Konst", Some("java/lang/Object"));
    let l_value = b.long_const(0x1122_3344_5566_7788);
    let mut code = vec![0x14]; // ldc2_w
    code.extend_from_slice(&l_value.to_be_bytes());
    code.push(0xad); // lreturn
    b.add_method(ACC_PUBLIC | ACC_STATIC, "get", "()J", 2, 0, &code);
    cp.write_class("Konst", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Konst");
    let get = method(&vm, class_id, "get", "()J");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, get, vec![], &vm).unwrap();
    assert_eq!(ret, Some(Value::Long(0x1122_3344_5566_7788)));
}

#[test]
fn arithmetic_exception_is_caught_at_handler_pc() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let catch_class = b.class_const("java/lang/ArithmeticException");
    // 0: iconst_1; 1: iconst_0; 2: idiv; 3: ireturn
    // 4: astore_1; 5: iconst_m1; 6: ireturn    <- handler
    let code = [0x04, 0x03, 0x6c, 0xac, 0x4c, 0x02, 0xac];
    b.add_method_with_table(
        ACC_PUBLIC | ACC_STATIC,
        "div",
        "()I",
        2,
        2,
        &code,
        &[(0, 4, 4, catch_class)],
    );
    cp.write_class("Main", &b.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let div = method(&vm, class_id, "div", "()I");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, div, vec![], &vm).unwrap();
    assert_eq!(ret, Some(Value::Integer(-1)));
}

#[test]
fn fields_resolve_through_inherited_layout() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut sup = ClassFileBuilder::new("Sup", Some("java/lang/Object"));
    sup.add_field(ACC_PUBLIC, "x", "I");
    sup.add_method(ACC_PUBLIC, "<init>", "()V", 0, 1, &[0xb1]);
    cp.write_class("Sup", &sup.build());

    let mut sub = ClassFileBuilder::new("Sub", Some("Sup"));
    sub.add_field(ACC_PUBLIC, "y", "I");
    cp.write_class("Sub", &sub.build());

    let mut m = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let sub_class = m.class_const("Sub");
    let sub_init = m.method_ref("Sub", "<init>", "()V");
    let x_ref = m.field_ref("Sub", "x", "I");
    let mut code = vec![0xbb]; // new Sub
    code.extend_from_slice(&sub_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial Sub.<init>
    code.extend_from_slice(&sub_init.to_be_bytes());
    code.push(0x4b); // astore_0
    code.push(0x2a); // aload_0
    code.extend_from_slice(&[0x10, 0x2a]); // bipush 42
    code.push(0xb5); // putfield x
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(0x2a); // aload_0
    code.push(0xb4); // getfield x
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(0xac); // ireturn
    m.add_method(ACC_PUBLIC | ACC_STATIC, "test", "()I", 2, 1, &code);
    cp.write_class("Main", &m.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let test = method(&vm, class_id, "test", "()I");
    let mut thread = thread_on(class_id);

    let ret = Interpreter::invoke_static_method(&mut thread, test, vec![], &vm).unwrap();
    assert_eq!(ret, Some(Value::Integer(42)));
}

#[test]
fn stale_field_resolution_is_rejected_against_a_different_layout() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    // P and Q both carry one int field at offset 0, under different names.
    let mut p = ClassFileBuilder::new("P", Some("java/lang/Object"));
    p.add_field(ACC_PUBLIC, "x", "I");
    cp.write_class("P", &p.build());
    let mut q = ClassFileBuilder::new("Q", Some("java/lang/Object"));
    q.add_field(ACC_PUBLIC, "y", "I");
    cp.write_class("Q", &q.build());

    // The same fieldref P.x first resolves against a P (caching offset 0),
    // then gets replayed against a Q, whose layout holds y at that offset.
    let mut m = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    let p_class = m.class_const("P");
    let q_class = m.class_const("Q");
    let p_init = m.method_ref("P", "<init>", "()V");
    let q_init = m.method_ref("Q", "<init>", "()V");
    let x_ref = m.field_ref("P", "x", "I");
    let mut code = vec![0xbb]; // new P
    code.extend_from_slice(&p_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial P.<init>
    code.extend_from_slice(&p_init.to_be_bytes());
    code.push(0xb4); // getfield P.x: resolves and caches the offset
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(0x57); // pop
    code.push(0xbb); // new Q
    code.extend_from_slice(&q_class.to_be_bytes());
    code.push(0x59); // dup
    code.push(0xb7); // invokespecial Q.<init>
    code.extend_from_slice(&q_init.to_be_bytes());
    code.push(0xb4); // getfield P.x against the Q: layout mismatch
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(0xac); // ireturn (never reached)
    m.add_method(ACC_PUBLIC | ACC_STATIC, "test", "()I", 2, 0, &code);
    cp.write_class("Main", &m.build());

    let vm = vm_on(&cp);
    let class_id = load(&vm, "Main");
    let test = method(&vm, class_id, "test", "()I");
    let mut thread = thread_on(class_id);

    let err = Interpreter::invoke_static_method(&mut thread, test, vec![], &vm).unwrap_err();
    let eref = match err {
        JvmError::JavaExceptionThrown(r) => r,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(
        exception_class_name(&vm, eref),
        "java/lang/IncompatibleClassChangeError"
    );
    let message = vm.get_exception_message(eref).unwrap();
    assert!(message.contains('x'), "message was {:?}", message);
}

#[test]
fn gc_collects_dropped_objects_under_tight_pacing() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let mut b = ClassFileBuilder::new("Main", Some("java/lang/Object"));
    // 0: iconst_0; 1: istore_0
    // 2: iload_0; 3: sipush 20000; 6: if_icmpge -> 20
    // 9: bipush 8; 11: newarray int; 13: pop
    // 14: iinc 0 1; 17: goto -> 2
    // 20: return
    let code = [
        0x03, 0x3b, 0x1a, 0x11, 0x4e, 0x20, 0xa2, 0x00, 0x0e, 0x10, 0x08, 0xbc, 0x0a, 0x57,
        0x84, 0x00, 0x01, 0xa7, 0xff, 0xf1, 0xb1,
    ];
    b.add_method(ACC_PUBLIC | ACC_STATIC, "churn", "()V", 2, 1, &code);
    cp.write_class("Main", &b.build());

    let mut config = VmConfig::for_tests(vec![cp.path()]);
    config.gc_interval_ms = 1;
    config.heap_size_mb = 4;
    let vm = VirtualMachine::new(config);

    let class_id = load(&vm, "Main");
    let churn = method(&vm, class_id, "churn", "()V");
    let mut thread = thread_on(class_id);

    Interpreter::invoke_static_method(&mut thread, churn, vec![], &vm).unwrap();

    assert!(
        vm.gc_read().total_collected() > 0,
        "no GC cycle reclaimed anything"
    );
}

#[test]
fn missing_class_surfaces_class_not_found() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    let vm = vm_on(&cp);
    let sym = vm.interner().get_or_intern("DoesNotExist");
    let err = vm.method_area_write().get_class_id_or_load(sym).unwrap_err();
    assert!(!vm.method_area_read().is_loaded(sym));
    match err {
        JvmError::JavaException(ex) => {
            assert_eq!(ex.kind, JavaExceptionKind::ClassNotFoundException);
            assert!(ex.message.unwrap().contains("DoesNotExist"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn every_live_reference_is_present_after_collection() {
    let cp = TestClasspath::new();
    write_prelude(&cp);

    // Allocate a linked structure reachable from a static field, then let
    // the registry-wide root scan keep it alive through a forced cycle.
    let mut b = ClassFileBuilder::new("Holder", Some("java/lang/Object"));
    b.add_field(ACC_PUBLIC | ACC_STATIC, "KEEP", "[I");
    let keep_ref = b.field_ref("Holder", "KEEP", "[I");
    // bipush 16; newarray int; putstatic KEEP; return
    let mut code = vec![0x10, 0x10, 0xbc, 0x0a, 0xb3];
    code.extend_from_slice(&keep_ref.to_be_bytes());
    code.push(0xb1);
    b.add_method(ACC_PUBLIC | ACC_STATIC, "fill", "()V", 1, 0, &code);
    cp.write_class("Holder", &b.build());

    let mut config = VmConfig::for_tests(vec![cp.path()]);
    config.gc_interval_ms = 1;
    let vm = VirtualMachine::new(config);

    let class_id = load(&vm, "Holder");
    let fill = method(&vm, class_id, "fill", "()V");
    let mut thread = thread_on(class_id);
    Interpreter::invoke_static_method(&mut thread, fill, vec![], &vm).unwrap();

    // Force a cycle and check the static survivor is still mapped.
    std::thread::sleep(std::time::Duration::from_millis(2));
    vm.maybe_collect(&thread);

    let keep = {
        let ma = vm.method_area_read();
        let class = ma.get_class(&class_id);
        let slot = class
            .find_static_slot(&hawkbeans_runtime::keys::FieldKey {
                name: vm.interner().get_or_intern("KEEP"),
                desc: vm.interner().get_or_intern("[I"),
            })
            .unwrap();
        class.static_field(slot).unwrap().get()
    };
    let keep_ref = match keep {
        Value::Ref(r) => r,
        other => panic!("KEEP is {:?}", other),
    };
    assert!(vm.heap_read().is_mapped(keep_ref));
    assert_eq!(
        vm.gc_read().state_of(keep_ref),
        Some(hawkbeans_runtime::gc::RefState::Present)
    );
}
