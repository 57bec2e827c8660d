use std::path::PathBuf;

/// Knobs for a `Vm`
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory searched for class files after the working directory
    pub class_path: Option<PathBuf>,

    /// Whether `java/lang/Object`, `java/lang/String`, `java/lang/System`, and
    /// `java/io/PrintStream` are provided by the VM instead of being loaded from class files
    ///
    /// This is also what makes `System.out.println` and `System.currentTimeMillis` available.
    pub simulate_system_classes: bool,

    /// Maximum number of nested method invocations
    pub max_call_depth: usize,

    /// Maximum number of instructions executed over the whole session (unlimited if `None`)
    pub max_steps: Option<u64>,
}

impl Settings {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

    /// Settings with everything at its default, searching the given class path
    pub fn with_class_path(class_path: impl Into<PathBuf>) -> Settings {
        Settings {
            class_path: Some(class_path.into()),
            ..Settings::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            class_path: None,
            simulate_system_classes: true,
            max_call_depth: Settings::DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
        }
    }
}
