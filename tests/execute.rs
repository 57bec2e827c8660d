mod common;

use classvm::jvm::class_file::Constant;
use classvm::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use classvm::runtime::{Error, Settings};
use common::*;

fn object_class(name: &str) -> TestClass {
    TestClass::new(name, Some("java/lang/Object"))
}

#[test]
fn prints_hi() {
    let mut class = object_class("Hello");
    let mut code = class.system_out();
    let hi = class.constants().get_string("hi");
    code.extend([0x12, hi.0 .0 as u8]);
    code.extend(class.println("(Ljava/lang/String;)V"));
    code.push(0xb1);
    class.main(code);

    let (result, output) = run(&[&class]);
    result.unwrap();
    assert_eq!(output, "hi\n");
}

#[test]
fn multiplies() {
    let mut class = object_class("Multiply");
    let mut code = class.system_out();
    code.extend([0x05, 0x06, 0x68]);
    code.extend(class.println("(I)V"));
    code.push(0xb1);
    class.main(code);

    let (result, output) = run(&[&class]);
    result.unwrap();
    assert_eq!(output, "6\n");
}

#[test]
fn array_index_out_of_bounds() {
    let mut class = object_class("OutOfBounds");
    class.main(vec![0x05, 0xbc, 10, 0x08, 0x2e, 0x57, 0xb1]);

    let (result, output) = run(&[&class]);
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        Error::ArrayIndexOutOfBounds {
            index: 5,
            length: 2
        }
    ));
    assert_eq!(err.status_code(), 13);
    assert_eq!(output, "");
}

#[test]
fn integer_division_by_zero() {
    let mut class = object_class("DivideByZero");
    class.main(vec![0x04, 0x03, 0x6c, 0x57, 0xb1]);

    let (result, _) = run(&[&class]);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::ArithmeticException));
    assert_eq!(err.status_code(), 19);
}

#[test]
fn output_before_a_fault_is_kept() {
    let mut class = object_class("Partial");
    let mut code = class.system_out();
    code.push(0x04);
    code.extend(class.println("(I)V"));
    code.extend([0x01, 0xbf]);
    class.main(code);

    let (result, output) = run(&[&class]);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Unimplemented("athrow")));
    assert_eq!(err.status_code(), 20);
    assert_eq!(output, "1\n");
}

#[test]
fn static_initializer_runs_once() {
    let mut class = object_class("Counter");
    let initial = class.constants().get_or_push(Constant::Integer(41));
    class.field_with_value(FieldAccessFlags::STATIC, "count", "I", Some(initial));
    let count = class.field_ref("Counter", "count", "I");

    let clinit = vec![0xb2, count[0], count[1], 0x04, 0x60, 0xb3, count[0], count[1], 0xb1];
    class.method(MethodAccessFlags::STATIC, "<clinit>", "()V", 0, clinit);

    let mut code = class.system_out();
    code.extend([0xb2, count[0], count[1]]);
    code.extend(class.println("(I)V"));
    code.push(0xb1);
    class.main(code);

    let dir = TempDir::new().unwrap();
    class.write_to(&dir);
    let (mut vm, captured) = vm_in(&dir);
    vm.run_main("Counter").unwrap();
    vm.run_main("Counter").unwrap();
    assert_eq!(captured.text(), "42\n42\n");

    let id = vm.class_id("Counter").unwrap();
    vm.initialize_class(id).unwrap();
    assert!(vm.class(id).initialized);
    assert_eq!(vm.class(id).statics[0].as_int(), 42);
}

#[test]
fn failed_static_initializer_is_not_retried() {
    let mut class = object_class("Fragile");
    let clinit = vec![0x04, 0x03, 0x6c, 0x57, 0xb1];
    class.method(MethodAccessFlags::STATIC, "<clinit>", "()V", 0, clinit);
    class.main(vec![0xb1]);

    let dir = TempDir::new().unwrap();
    class.write_to(&dir);
    let (mut vm, _) = vm_in(&dir);
    let result = vm.run_main("Fragile");
    assert!(matches!(result, Err(Error::ArithmeticException)));

    let id = vm.class_id("Fragile").unwrap();
    assert!(vm.class(id).initialized);
    vm.initialize_class(id).unwrap();
    vm.run_main("Fragile").unwrap();
}

#[test]
fn switches() {
    let mut class = object_class("Switches");

    let mut table = vec![0x1a, 0xaa, 0, 0];
    for word in [36, 1, 3, 27, 30, 33] {
        table.extend_from_slice(&i32::to_be_bytes(word));
    }
    table.extend([0x10, 10, 0xac, 0x10, 20, 0xac, 0x10, 30, 0xac, 0x02, 0xac]);
    class.static_method("table", "(I)I", 1, table);

    let mut lookup = vec![0x1a, 0xab, 0, 0];
    for word in [33, 2, -5, 27, 100, 30] {
        lookup.extend_from_slice(&i32::to_be_bytes(word));
    }
    lookup.extend([0x10, 1, 0xac, 0x10, 2, 0xac, 0x03, 0xac]);
    class.static_method("lookup", "(I)I", 1, lookup);

    let table = class.method_ref("Switches", "table", "(I)I");
    let lookup = class.method_ref("Switches", "lookup", "(I)I");
    let mut code = vec![];
    for (method, key) in [
        (table, 0),
        (table, 1),
        (table, 2),
        (table, 3),
        (table, 4),
        (lookup, -5),
        (lookup, 100),
        (lookup, 7),
    ] {
        code.extend(class.system_out());
        code.extend([0x10, key as i8 as u8, 0xb8, method[0], method[1]]);
        code.extend(class.println("(I)V"));
    }
    code.push(0xb1);
    class.main(code);

    let (result, output) = run(&[&class]);
    result.unwrap();
    assert_eq!(output, "-1\n10\n20\n30\n-1\n1\n2\n0\n");
}

#[test]
fn float_comparisons_with_nan() {
    let mut class = object_class("NaNs");
    let nan = class.constants().get_or_push(Constant::Float(f32::NAN));
    let one = class.constants().get_or_push(Constant::Float(1.0));

    let mut code = vec![];
    for (lhs, rhs, opcode) in [(nan, 0x0b, 0x95), (nan, 0x0b, 0x96), (one, 0x0d, 0x95)] {
        code.extend(class.system_out());
        code.extend([0x12, lhs.0 as u8, rhs, opcode]);
        code.extend(class.println("(I)V"));
    }
    code.push(0xb1);
    class.main(code);

    // `fcmpl` and `fcmpg` of NaN against 0.0, then `fcmpl` of 1.0 against 2.0
    let (result, output) = run(&[&class]);
    result.unwrap();
    assert_eq!(output, "-1\n1\n-1\n");
}

#[test]
fn instance_fields() {
    let mut point = object_class("Point");
    point.field(FieldAccessFlags::PUBLIC, "x", "I");
    point.field(FieldAccessFlags::PUBLIC, "y", "J");
    point.default_constructor("java/lang/Object");

    let mut main = object_class("Fields");
    let class = main.class("Point");
    let init = main.method_ref("Point", "<init>", "()V");
    let x = main.field_ref("Point", "x", "I");
    let y = main.field_ref("Point", "y", "J");
    let big = main.constants().get_or_push(Constant::Long(1 << 40));
    let big = big.0.to_be_bytes();

    let mut code = vec![0xbb, class[0], class[1], 0x59, 0xb7, init[0], init[1], 0x4c];
    code.extend([0x2b, 0x10, 7, 0xb5, x[0], x[1]]);
    code.extend([0x2b, 0x14, big[0], big[1], 0xb5, y[0], y[1]]);
    code.extend(main.system_out());
    code.extend([0x2b, 0xb4, x[0], x[1]]);
    code.extend(main.println("(I)V"));
    code.extend(main.system_out());
    code.extend([0x2b, 0xb4, y[0], y[1]]);
    code.extend(main.println("(J)V"));
    code.push(0xb1);
    main.static_method("main", "([Ljava/lang/String;)V", 2, code);

    let (result, output) = run(&[&main, &point]);
    result.unwrap();
    assert_eq!(output, "7\n1099511627776\n");
}

fn hierarchy(leaf_flags: ClassAccessFlags) -> [TestClass; 4] {
    let mut base = object_class("Base");
    base.default_constructor("java/lang/Object");
    base.method(MethodAccessFlags::PUBLIC, "sound", "()I", 1, vec![0x04, 0xac]);

    let mut mid = TestClass::new("Mid", Some("Base"));
    mid.default_constructor("Base");
    mid.method(MethodAccessFlags::PUBLIC, "sound", "()I", 1, vec![0x05, 0xac]);

    let mut leaf = TestClass::new("Leaf", Some("Mid"));
    leaf.file.access_flags = leaf_flags;
    leaf.default_constructor("Mid");
    leaf.method(MethodAccessFlags::PUBLIC, "sound", "()I", 1, vec![0x06, 0xac]);
    let base_sound = leaf.method_ref("Base", "sound", "()I");
    leaf.method(
        MethodAccessFlags::PUBLIC,
        "superSound",
        "()I",
        1,
        vec![0x2a, 0xb7, base_sound[0], base_sound[1], 0xac],
    );

    let mut main = object_class("Dispatch");
    let class = main.class("Leaf");
    let init = main.method_ref("Leaf", "<init>", "()V");
    let sound = main.method_ref("Base", "sound", "()I");
    let super_sound = main.method_ref("Leaf", "superSound", "()I");
    let mut code = vec![0xbb, class[0], class[1], 0x59, 0xb7, init[0], init[1], 0x4c];
    for method in [sound, super_sound] {
        code.extend(main.system_out());
        code.extend([0x2b, 0xb6, method[0], method[1]]);
        code.extend(main.println("(I)V"));
    }
    code.push(0xb1);
    main.static_method("main", "([Ljava/lang/String;)V", 2, code);

    [main, base, mid, leaf]
}

#[test]
fn virtual_dispatch_and_super_calls() {
    let [main, base, mid, leaf] = hierarchy(ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER);
    let (result, output) = run(&[&main, &base, &mid, &leaf]);
    result.unwrap();
    assert_eq!(output, "3\n2\n");
}

#[test]
fn special_calls_without_super_flag() {
    let [main, base, mid, leaf] = hierarchy(ClassAccessFlags::PUBLIC);
    let (result, output) = run(&[&main, &base, &mid, &leaf]);
    result.unwrap();
    assert_eq!(output, "3\n1\n");
}

#[test]
fn missing_method() {
    let mut class = object_class("Caller");
    let missing = class.method_ref("Caller", "missing", "()V");
    class.main(vec![0xb8, missing[0], missing[1], 0xb1]);

    let (result, _) = run(&[&class]);
    let err = result.unwrap_err();
    assert!(matches!(&err, Error::MethodResolutionFailed { name, .. } if name == "missing"));
    assert_eq!(err.status_code(), 4);
}

#[test]
fn missing_main() {
    let class = object_class("NoMain");
    let (result, _) = run(&[&class]);
    let err = result.unwrap_err();
    assert!(matches!(&err, Error::MainMethodNotFound(name) if name == "NoMain"));
    assert_eq!(err.status_code(), 8);
}

#[test]
fn unbounded_recursion() {
    let mut class = object_class("Recurse");
    let recurse = class.method_ref("Recurse", "recurse", "()V");
    class.method(
        MethodAccessFlags::STATIC,
        "recurse",
        "()V",
        0,
        vec![0xb8, recurse[0], recurse[1], 0xb1],
    );
    class.main(vec![0xb8, recurse[0], recurse[1], 0xb1]);

    let dir = TempDir::new().unwrap();
    class.write_to(&dir);
    let mut settings = Settings::with_class_path(dir.path());
    settings.max_call_depth = 16;
    let (mut vm, _) = vm_with(settings);

    let err = vm.run_main("Recurse").unwrap_err();
    assert!(matches!(err, Error::StackOverflow(16)));
    assert_eq!(err.status_code(), 21);
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn step_limit() {
    let mut class = object_class("Spin");
    class.main(vec![0x00, 0xa7, 0xff, 0xff]);

    let dir = TempDir::new().unwrap();
    class.write_to(&dir);
    let mut settings = Settings::with_class_path(dir.path());
    settings.max_steps = Some(100);
    let (mut vm, _) = vm_with(settings);

    let err = vm.run_main("Spin").unwrap_err();
    assert!(matches!(err, Error::StepLimitExceeded(100)));
    assert_eq!(err.status_code(), 22);
    assert_eq!(vm.steps(), 101);
}
