//! Helpers for building class files on disk and running them

#![allow(dead_code)]

use classvm::jvm::class_file::{
    Attribute, ClassFile, Code, ConstantIndex, ConstantPool, ConstantValue, Field, Method,
};
use classvm::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags, Version};
use classvm::runtime::{Error, Settings, Vm};
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
pub use tempfile::TempDir;

/// Class under construction
pub struct TestClass {
    pub file: ClassFile,
}

impl TestClass {
    /// Public class with `ACC_SUPER` set
    pub fn new(name: &str, super_name: Option<&str>) -> TestClass {
        let mut constants = ConstantPool::new();
        let this_class = constants.get_class(name);
        let super_class = super_name.map(|super_name| constants.get_class(super_name));
        TestClass {
            file: ClassFile {
                version: Version::JAVA8,
                constants,
                access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
                this_class,
                super_class,
                interfaces: vec![],
                fields: vec![],
                methods: vec![],
                attributes: vec![],
                static_field_count: 0,
                instance_field_count: 0,
            },
        }
    }

    pub fn constants(&mut self) -> &mut ConstantPool {
        &mut self.file.constants
    }

    /// Index of a `Class` constant, as the two bytes following an opcode
    pub fn class(&mut self, name: &str) -> [u8; 2] {
        let index = self.constants().get_class(name);
        index.0 .0.to_be_bytes()
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> [u8; 2] {
        let index = self.constants().get_field_ref(class, name, descriptor);
        index.0 .0.to_be_bytes()
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> [u8; 2] {
        let index = self.constants().get_method_ref(class, name, descriptor, false);
        index.0 .0.to_be_bytes()
    }

    /// `getstatic java/lang/System.out` followed by whatever pushes the argument
    pub fn system_out(&mut self) -> Vec<u8> {
        let out = self.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
        vec![0xb2, out[0], out[1]]
    }

    /// `invokevirtual java/io/PrintStream.println` with the given descriptor
    pub fn println(&mut self, descriptor: &str) -> Vec<u8> {
        let println = self.method_ref("java/io/PrintStream", "println", descriptor);
        vec![0xb6, println[0], println[1]]
    }

    pub fn field(&mut self, flags: FieldAccessFlags, name: &str, descriptor: &str) {
        self.field_with_value(flags, name, descriptor, None);
    }

    pub fn field_with_value(
        &mut self,
        flags: FieldAccessFlags,
        name: &str,
        descriptor: &str,
        value: Option<ConstantIndex>,
    ) {
        let name_index = self.constants().get_utf8(name);
        let descriptor_index = self.constants().get_utf8(descriptor);
        let attributes = value
            .map(|value| Attribute::new(self.constants(), ConstantValue(value)))
            .into_iter()
            .collect();
        self.file.fields.push(Field {
            access_flags: flags,
            name_index,
            descriptor_index,
            attributes,
            offset: 0,
        });
    }

    pub fn method(
        &mut self,
        flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        max_locals: u16,
        code: Vec<u8>,
    ) {
        let name_index = self.constants().get_utf8(name);
        let descriptor_index = self.constants().get_utf8(descriptor);
        let code = Code {
            max_stack: 16,
            max_locals,
            code_array: code,
            exception_table: vec![],
            attributes: vec![],
        };
        let attributes = vec![Attribute::new(self.constants(), code)];
        self.file.methods.push(Method {
            access_flags: flags,
            name_index,
            descriptor_index,
            attributes,
        });
    }

    pub fn static_method(&mut self, name: &str, descriptor: &str, max_locals: u16, code: Vec<u8>) {
        let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        self.method(flags, name, descriptor, max_locals, code);
    }

    /// `public static void main(String[])`, with no locals beyond `args`
    pub fn main(&mut self, code: Vec<u8>) {
        self.static_method("main", "([Ljava/lang/String;)V", 1, code);
    }

    /// `<init>()V` which only calls the super class constructor
    pub fn default_constructor(&mut self, super_name: &str) {
        let init = self.method_ref(super_name, "<init>", "()V");
        self.method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "()V",
            1,
            vec![0x2a, 0xb7, init[0], init[1], 0xb1],
        );
    }

    pub fn write_to(&self, dir: &TempDir) -> PathBuf {
        let path = dir.path().join(format!("{}.class", self.file.name()));
        self.file
            .save_to_path(&path, true)
            .expect("class file should be writable");
        path
    }
}

/// Shared buffer collecting program output
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output should be UTF-8")
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// VM searching `dir`, with its output captured
pub fn vm_in(dir: &TempDir) -> (Vm, Captured) {
    vm_with(Settings::with_class_path(dir.path()))
}

pub fn vm_with(settings: Settings) -> (Vm, Captured) {
    let captured = Captured::default();
    let vm = Vm::with_output(settings, Box::new(captured.clone()));
    (vm, captured)
}

/// Write the classes, then run `main` of the first one
pub fn run(classes: &[&TestClass]) -> (Result<(), Error>, String) {
    let dir = TempDir::new().expect("temporary directory should be creatable");
    for class in classes {
        class.write_to(&dir);
    }
    let (mut vm, captured) = vm_in(&dir);
    let result = vm.run_main(classes[0].file.name());
    (result, captured.text())
}
