use super::{ClassId, Error, Heap, LoadedClass, Operand, OperandStack, Settings};
use crate::jvm::names::{Name, UnqualifiedName};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

/// Descriptor of the entry point run by `Vm::run_main`
pub const MAIN_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// One execution session
///
/// The VM owns everything it creates: loaded classes, heap objects, and the frames of running
/// methods. All of it is released when the VM is dropped.
pub struct Vm {
    pub settings: Settings,
    pub heap: Heap,
    pub(crate) classes: Vec<LoadedClass>,
    pub(crate) class_ids: HashMap<String, ClassId>,

    /// Classes in the middle of being linked (to detect circular super classes)
    pub(crate) resolving: HashSet<String>,

    /// Methods currently running, innermost last
    pub(crate) call_stack: Vec<(ClassId, usize)>,
    pub(crate) steps: u64,
    output: Box<dyn Write>,
}

impl Vm {
    /// VM writing program output to stdout
    pub fn new(settings: Settings) -> Vm {
        Vm::with_output(settings, Box::new(io::stdout()))
    }

    /// VM writing program output to the given writer
    pub fn with_output(settings: Settings, output: Box<dyn Write>) -> Vm {
        Vm {
            settings,
            heap: Heap::new(),
            classes: vec![],
            class_ids: HashMap::new(),
            resolving: HashSet::new(),
            call_stack: vec![],
            steps: 0,
            output,
        }
    }

    /// Writer receiving program output
    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    /// Number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Resolve and initialize a class, then run its `public static void main(String[])`
    ///
    /// The `args` array is passed as `null`.
    pub fn run_main(&mut self, class_name: &str) -> Result<(), Error> {
        let class = match self.resolve_class(class_name) {
            Ok(Some(class)) => class,
            Ok(None) => {
                let cause = Error::ClassResolutionFailed(class_name.to_owned());
                return Err(Error::MainClassResolutionFailed(Box::new(cause)));
            }
            Err(err) => return Err(Error::MainClassResolutionFailed(Box::new(err))),
        };
        self.initialize_class(class)?;

        let file = &self.class(class).file;
        let main = file
            .methods
            .iter()
            .position(|method| {
                method.is_static()
                    && method.name(&file.constants) == UnqualifiedName::MAIN.as_str()
                    && method.descriptor(&file.constants) == MAIN_DESCRIPTOR
            })
            .ok_or_else(|| Error::MainMethodNotFound(class_name.to_owned()))?;

        log::debug!("running {}.main", class_name);
        let mut arguments = OperandStack::new();
        arguments.push(Operand::NULL);
        let result = self.invoke(class, main, &mut arguments);
        self.output.flush()?;
        result
    }
}
