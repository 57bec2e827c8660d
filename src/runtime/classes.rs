use super::{Error, Operand, OperandStack, Vm};
use crate::jvm::class_file::{ClassFile, Constant, Field, Method};
use crate::jvm::names::{BinaryName, Name, UnqualifiedName};
use crate::jvm::ClassAccessFlags;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Index of a class in the registry of a `Vm`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassId(pub(crate) usize);

/// Class which has been loaded and linked into a `Vm`
#[derive(Debug)]
pub struct LoadedClass {
    pub file: Rc<ClassFile>,

    /// `None` for `java/lang/Object` and for subclasses of a simulated class
    pub super_class: Option<ClassId>,

    /// Static storage, allocated when the class is initialized
    pub statics: Vec<Operand>,
    pub initialized: bool,
}

/// Classes which the VM provides instead of loading, when simulation is on
pub const SIMULATED_CLASSES: [BinaryName; 4] = [
    BinaryName::OBJECT,
    BinaryName::STRING,
    BinaryName::SYSTEM,
    BinaryName::PRINTSTREAM,
];

impl Vm {
    pub fn class(&self, id: ClassId) -> &LoadedClass {
        &self.classes[id.0]
    }

    /// Look up an already loaded class
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_ids.get(name).copied()
    }

    pub fn loaded_class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn is_simulated(&self, name: &str) -> bool {
        self.settings.simulate_system_classes
            && SIMULATED_CLASSES.iter().any(|class| class.as_str() == name)
    }

    /// Find, load, and link a class by its binary name
    ///
    /// Returns `None` for classes that have no class file: simulated classes, and arrays of
    /// primitives. Arrays of classes resolve their element class. On failure, nothing is
    /// registered for the class.
    pub fn resolve_class(&mut self, name: &str) -> Result<Option<ClassId>, Error> {
        if self.is_simulated(name) {
            return Ok(None);
        }
        if let Some(element) = name.strip_prefix('[') {
            if element.starts_with('[') {
                return self.resolve_class(element);
            }
            return match element.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
                Some(class_name) => self.resolve_class(class_name),
                None if element.len() == 1 => Ok(None),
                None => Err(Error::ClassResolutionFailed(name.to_owned())),
            };
        }
        if let Some(id) = self.class_id(name) {
            return Ok(Some(id));
        }

        let path = self
            .find_class_file(name)
            .ok_or_else(|| Error::ClassResolutionFailed(name.to_owned()))?;
        self.load_class_file(path).map(Some)
    }

    /// Candidate locations, in order: the working directory, then the class path
    fn find_class_file(&self, name: &str) -> Option<PathBuf> {
        let file_name = format!("{}.class", name);
        let local = PathBuf::from(&file_name);
        let on_class_path = self.settings.class_path.as_ref().map(|dir| dir.join(&file_name));
        std::iter::once(local)
            .chain(on_class_path)
            .find(|path| path.is_file())
    }

    /// Load a class from a specific file, then link it as `resolve_class` would
    pub fn load_class_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ClassId, Error> {
        let path = path.as_ref();
        let file = ClassFile::from_path(path).map_err(|error| Error::ClassLoad {
            name: path.display().to_string(),
            error,
        })?;
        if !file.name_matches_path(path) {
            log::warn!(
                "class {} was loaded from {}, which doesn't match its name",
                file.name(),
                path.display()
            );
        }
        if let Some(id) = self.class_id(file.name()) {
            return Ok(id);
        }
        log::debug!("loaded {} from {}", file.name(), path.display());

        let name = file.name().to_owned();
        if !self.resolving.insert(name.clone()) {
            return Err(Error::ClassResolutionFailed(name));
        }
        let linked = self.link(file);
        self.resolving.remove(&name);
        linked
    }

    /// Resolve the super class and interfaces, lay out fields after those of the super class,
    /// and register the class
    fn link(&mut self, mut file: ClassFile) -> Result<ClassId, Error> {
        let super_class = match file.super_class_name() {
            Some(super_name) => {
                let super_name = super_name.to_owned();
                self.resolve_class(&super_name)?
            }
            None => None,
        };

        if let Some(super_class) = super_class {
            let inherited = self.class(super_class).file.instance_field_count;
            for field in file.fields.iter_mut().filter(|field| !field.is_static()) {
                field.offset += inherited;
            }
            file.instance_field_count += inherited;
        }

        let interfaces: Vec<String> = file.interface_names().map(str::to_owned).collect();
        for interface in interfaces {
            self.resolve_class(&interface)?;
        }

        let id = ClassId(self.classes.len());
        self.class_ids.insert(file.name().to_owned(), id);
        self.classes.push(LoadedClass {
            file: Rc::new(file),
            super_class,
            statics: vec![],
            initialized: false,
        });
        Ok(id)
    }

    /// Initialize a class (and its super classes) if that hasn't happened yet
    ///
    /// Static storage is allocated, `ConstantValue` attributes are applied to static fields,
    /// then `<clinit>` runs.
    ///
    /// The class is marked before any of that, so `<clinit>` can use its own class. If
    /// `<clinit>` fails the mark stays, and the class is never initialized again.
    pub fn initialize_class(&mut self, id: ClassId) -> Result<(), Error> {
        if self.class(id).initialized {
            return Ok(());
        }
        self.classes[id.0].initialized = true;
        if let Some(super_class) = self.class(id).super_class {
            self.initialize_class(super_class)?;
        }

        let file = Rc::clone(&self.class(id).file);
        log::debug!("initializing {}", file.name());

        let mut statics = Vec::new();
        statics.try_reserve_exact(file.static_field_count)?;
        statics.resize(file.static_field_count, Operand::default());
        for field in file.fields.iter().filter(|field| field.is_static()) {
            self.apply_constant_value(&file, field, &mut statics)?;
        }
        self.classes[id.0].statics = statics;

        let clinit = file.methods.iter().position(|method| {
            method.is_static()
                && method.name(&file.constants) == UnqualifiedName::CLINIT.as_str()
                && method.descriptor(&file.constants) == "()V"
        });
        if let Some(clinit) = clinit {
            self.invoke(id, clinit, &mut OperandStack::new())?;
        }
        Ok(())
    }

    fn apply_constant_value(
        &mut self,
        file: &ClassFile,
        field: &Field,
        statics: &mut [Operand],
    ) -> Result<(), Error> {
        let index = match field.constant_value() {
            Some(value) => value.0,
            None => return Ok(()),
        };
        let words = match file.constants.get(index) {
            Some(Constant::Integer(value)) => vec![Operand::int(*value)],
            Some(Constant::Float(value)) => vec![Operand::float(*value)],
            Some(Constant::Long(value)) => Operand::long(*value).to_vec(),
            Some(Constant::Double(value)) => Operand::double(*value).to_vec(),
            Some(Constant::String(utf8)) => {
                let text = file.constants.utf8(*utf8).unwrap_or_default();
                vec![Operand::reference(self.heap.new_string(text)?)]
            }
            _ => return Err(Error::InvalidConstant(index.0)),
        };
        let slots = statics
            .get_mut(field.offset..field.offset + words.len())
            .ok_or(Error::InvalidConstant(index.0))?;
        slots.copy_from_slice(&words);
        Ok(())
    }

    /// Class and its super classes, starting with the class itself
    pub fn superclass_chain(&self, start: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(start), move |id| self.class(*id).super_class)
    }

    /// Whether `ancestor` is a super class of `class` (and not `class` itself)
    pub fn is_proper_superclass(&self, ancestor: ClassId, class: ClassId) -> bool {
        self.superclass_chain(class).skip(1).any(|id| id == ancestor)
    }

    /// Search for a method in a class and then its super classes
    ///
    /// Returns the declaring class along with the index of the method in it.
    pub fn find_method(&self, start: ClassId, name: &str, descriptor: &str) -> Option<(ClassId, usize)> {
        self.superclass_chain(start).find_map(|id| {
            let file = &self.class(id).file;
            file.methods
                .iter()
                .position(|method: &Method| {
                    method.name(&file.constants) == name
                        && method.descriptor(&file.constants) == descriptor
                })
                .map(|index| (id, index))
        })
    }

    /// Search for a field in a class and then its super classes
    ///
    /// Returns the declaring class along with the field.
    pub fn find_field(&self, start: ClassId, name: &str, descriptor: &str) -> Option<(ClassId, &Field)> {
        self.superclass_chain(start).find_map(|id| {
            self.class(id)
                .file
                .find_field(name, descriptor)
                .map(|field| (id, field))
        })
    }

    pub(crate) fn has_super_flag(&self, id: ClassId) -> bool {
        self.class(id)
            .file
            .access_flags
            .contains(ClassAccessFlags::SUPER)
    }
}
