use super::{ClassId, Error, Handle, Operand, Value};
use crate::jvm::descriptors::{BaseType, ParseDescriptor};

/// Object on the heap
#[derive(Clone, PartialEq, Debug)]
pub enum Object {
    /// Immutable `java.lang.String`
    String(String),

    /// Instance of a class (`None` for instances of a simulated class)
    Instance {
        class: Option<ClassId>,
        fields: Vec<Operand>,
    },

    PrimitiveArray(PrimitiveArray),

    /// Array of references, along with the element class name (eg. `java/lang/String` or `[I`)
    ObjectArray {
        element: String,
        elements: Vec<Handle>,
    },
}

#[derive(Clone, PartialEq, Debug)]
pub enum PrimitiveArray {
    Boolean(Vec<i8>),
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl PrimitiveArray {
    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Boolean(elements) | PrimitiveArray::Byte(elements) => elements.len(),
            PrimitiveArray::Char(elements) => elements.len(),
            PrimitiveArray::Short(elements) => elements.len(),
            PrimitiveArray::Int(elements) => elements.len(),
            PrimitiveArray::Long(elements) => elements.len(),
            PrimitiveArray::Float(elements) => elements.len(),
            PrimitiveArray::Double(elements) => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element kinds distinguished by the array load and store instructions
///
/// `Byte` covers both `byte[]` and `boolean[]`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    Byte,
    Char,
    Short,
}

/// Objects allocated during a VM session
///
/// Nothing is ever collected: every object lives until the heap is dropped.
#[derive(Default, Debug)]
pub struct Heap {
    objects: Vec<Object>,
}

/// Zero-filled vector, reporting allocation failure instead of aborting
fn filled<T: Clone>(count: usize, value: T) -> Result<Vec<T>, Error> {
    let mut elements = Vec::new();
    elements.try_reserve_exact(count)?;
    elements.resize(count, value);
    Ok(elements)
}

fn array_length(count: i32) -> Result<usize, Error> {
    usize::try_from(count).map_err(|_| Error::NegativeArraySize(count))
}

fn check_index(index: i32, length: usize) -> Result<usize, Error> {
    usize::try_from(index)
        .ok()
        .filter(|idx| *idx < length)
        .ok_or(Error::ArrayIndexOutOfBounds { index, length })
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn alloc(&mut self, object: Object) -> Result<Handle, Error> {
        let handle = u32::try_from(self.objects.len() + 1).map_err(|_| Error::OutOfMemory)?;
        self.objects.try_reserve(1)?;
        self.objects.push(object);
        Ok(Handle(handle))
    }

    pub fn get(&self, handle: Handle) -> Result<&Object, Error> {
        if handle.is_null() {
            return Err(Error::NullPointer);
        }
        self.objects
            .get(handle.0 as usize - 1)
            .ok_or(Error::InvalidReference(handle.0))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Object, Error> {
        if handle.is_null() {
            return Err(Error::NullPointer);
        }
        self.objects
            .get_mut(handle.0 as usize - 1)
            .ok_or(Error::InvalidReference(handle.0))
    }

    pub fn new_string(&mut self, text: impl Into<String>) -> Result<Handle, Error> {
        self.alloc(Object::String(text.into()))
    }

    /// Text of a string object (`None` if the object isn't a string)
    pub fn string(&self, handle: Handle) -> Result<Option<&str>, Error> {
        match self.get(handle)? {
            Object::String(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    pub fn new_instance(&mut self, class: Option<ClassId>, slots: usize) -> Result<Handle, Error> {
        let fields = filled(slots, Operand::default())?;
        self.alloc(Object::Instance { class, fields })
    }

    /// Instance slots of a class instance
    pub fn fields_mut(&mut self, handle: Handle) -> Result<&mut Vec<Operand>, Error> {
        match self.get_mut(handle)? {
            Object::Instance { fields, .. } => Ok(fields),
            _ => Err(Error::InvalidReference(handle.0)),
        }
    }

    /// Runtime class of an instance (`None` for anything else)
    pub fn class_of(&self, handle: Handle) -> Result<Option<ClassId>, Error> {
        match self.get(handle)? {
            Object::Instance { class, .. } => Ok(*class),
            _ => Ok(None),
        }
    }

    /// Allocate a zeroed array for `newarray`
    pub fn new_primitive_array(&mut self, base_type: BaseType, count: i32) -> Result<Handle, Error> {
        let len = array_length(count)?;
        let array = match base_type {
            BaseType::Boolean => PrimitiveArray::Boolean(filled(len, 0)?),
            BaseType::Byte => PrimitiveArray::Byte(filled(len, 0)?),
            BaseType::Char => PrimitiveArray::Char(filled(len, 0)?),
            BaseType::Short => PrimitiveArray::Short(filled(len, 0)?),
            BaseType::Int => PrimitiveArray::Int(filled(len, 0)?),
            BaseType::Long => PrimitiveArray::Long(filled(len, 0)?),
            BaseType::Float => PrimitiveArray::Float(filled(len, 0.0)?),
            BaseType::Double => PrimitiveArray::Double(filled(len, 0.0)?),
        };
        self.alloc(Object::PrimitiveArray(array))
    }

    /// Allocate an array of `null` references
    pub fn new_object_array(&mut self, element: &str, count: i32) -> Result<Handle, Error> {
        let elements = filled(array_length(count)?, Handle::NULL)?;
        self.alloc(Object::ObjectArray {
            element: element.to_owned(),
            elements,
        })
    }

    /// Allocate the outer `counts.len()` dimensions of the array type `name` (eg. `[[I`)
    pub fn new_multi_array(&mut self, name: &str, counts: &[i32]) -> Result<Handle, Error> {
        let element = name.strip_prefix('[').ok_or(Error::InvalidArrayDimensions)?;
        let (&count, inner_counts) = counts.split_first().ok_or(Error::InvalidArrayDimensions)?;
        if let Some(&negative) = counts.iter().find(|count| **count < 0) {
            return Err(Error::NegativeArraySize(negative));
        }

        if !inner_counts.is_empty() {
            let outer = self.new_object_array(element, count)?;
            for idx in 0..count as usize {
                let inner = self.new_multi_array(element, inner_counts)?;
                if let Object::ObjectArray { elements, .. } = self.get_mut(outer)? {
                    elements[idx] = inner;
                }
            }
            return Ok(outer);
        }

        match element.strip_prefix('L').and_then(|rest| rest.strip_suffix(';')) {
            Some(class_name) => self.new_object_array(class_name, count),
            None if element.starts_with('[') => self.new_object_array(element, count),
            None => {
                let base_type = BaseType::parse(element).map_err(|_| Error::InvalidArrayType)?;
                self.new_primitive_array(base_type, count)
            }
        }
    }

    pub fn array_length(&self, handle: Handle) -> Result<usize, Error> {
        match self.get(handle)? {
            Object::PrimitiveArray(array) => Ok(array.len()),
            Object::ObjectArray { elements, .. } => Ok(elements.len()),
            _ => Err(Error::InvalidArrayType),
        }
    }

    /// Read an element, checking that the array has the expected kind
    pub fn array_load(&self, handle: Handle, index: i32, kind: ArrayKind) -> Result<Value, Error> {
        let value = match (self.get(handle)?, kind) {
            (Object::PrimitiveArray(PrimitiveArray::Int(elements)), ArrayKind::Int) => {
                Value::Int(elements[check_index(index, elements.len())?])
            }
            (Object::PrimitiveArray(PrimitiveArray::Long(elements)), ArrayKind::Long) => {
                Value::Long(elements[check_index(index, elements.len())?])
            }
            (Object::PrimitiveArray(PrimitiveArray::Float(elements)), ArrayKind::Float) => {
                Value::Float(elements[check_index(index, elements.len())?])
            }
            (Object::PrimitiveArray(PrimitiveArray::Double(elements)), ArrayKind::Double) => {
                Value::Double(elements[check_index(index, elements.len())?])
            }
            (
                Object::PrimitiveArray(PrimitiveArray::Byte(elements) | PrimitiveArray::Boolean(elements)),
                ArrayKind::Byte,
            ) => Value::Int(elements[check_index(index, elements.len())?] as i32),
            (Object::PrimitiveArray(PrimitiveArray::Char(elements)), ArrayKind::Char) => {
                Value::Int(elements[check_index(index, elements.len())?] as i32)
            }
            (Object::PrimitiveArray(PrimitiveArray::Short(elements)), ArrayKind::Short) => {
                Value::Int(elements[check_index(index, elements.len())?] as i32)
            }
            (Object::ObjectArray { elements, .. }, ArrayKind::Reference) => {
                Value::Reference(elements[check_index(index, elements.len())?])
            }
            _ => return Err(Error::InvalidArrayType),
        };
        Ok(value)
    }

    /// Write an element, checking that the array has the expected kind
    ///
    /// `int` values are narrowed for `byte`, `char`, `short`, and `boolean` arrays.
    pub fn array_store(
        &mut self,
        handle: Handle,
        index: i32,
        kind: ArrayKind,
        value: Value,
    ) -> Result<(), Error> {
        let array = self.get_mut(handle)?;
        match (array, kind, value) {
            (Object::PrimitiveArray(PrimitiveArray::Int(elements)), ArrayKind::Int, Value::Int(v)) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v;
            }
            (Object::PrimitiveArray(PrimitiveArray::Long(elements)), ArrayKind::Long, Value::Long(v)) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v;
            }
            (
                Object::PrimitiveArray(PrimitiveArray::Float(elements)),
                ArrayKind::Float,
                Value::Float(v),
            ) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v;
            }
            (
                Object::PrimitiveArray(PrimitiveArray::Double(elements)),
                ArrayKind::Double,
                Value::Double(v),
            ) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v;
            }
            (Object::PrimitiveArray(PrimitiveArray::Byte(elements)), ArrayKind::Byte, Value::Int(v)) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v as i8;
            }
            (
                Object::PrimitiveArray(PrimitiveArray::Boolean(elements)),
                ArrayKind::Byte,
                Value::Int(v),
            ) => {
                let i = check_index(index, elements.len())?;
                elements[i] = (v & 1) as i8;
            }
            (Object::PrimitiveArray(PrimitiveArray::Char(elements)), ArrayKind::Char, Value::Int(v)) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v as u16;
            }
            (
                Object::PrimitiveArray(PrimitiveArray::Short(elements)),
                ArrayKind::Short,
                Value::Int(v),
            ) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v as i16;
            }
            (Object::ObjectArray { elements, .. }, ArrayKind::Reference, Value::Reference(v)) => {
                let i = check_index(index, elements.len())?;
                elements[i] = v;
            }
            _ => return Err(Error::InvalidArrayType),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn handles_start_at_one() {
        let mut heap = Heap::new();
        let first = heap.new_string("a").unwrap();
        let second = heap.new_instance(None, 3).unwrap();
        assert_eq!(first, Handle(1));
        assert_eq!(second, Handle(2));
        assert_eq!(heap.string(first).unwrap(), Some("a"));
        assert_eq!(heap.string(second).unwrap(), None);
        assert_eq!(heap.fields_mut(second).unwrap().len(), 3);
        assert!(matches!(heap.get(Handle::NULL), Err(Error::NullPointer)));
        assert!(matches!(heap.get(Handle(3)), Err(Error::InvalidReference(3))));
    }

    #[test]
    fn primitive_arrays() {
        let mut heap = Heap::new();
        let ints = heap.new_primitive_array(BaseType::Int, 3).unwrap();
        assert_eq!(heap.array_length(ints).unwrap(), 3);
        heap.array_store(ints, 2, ArrayKind::Int, Value::Int(42)).unwrap();
        assert_eq!(heap.array_load(ints, 2, ArrayKind::Int).unwrap(), Value::Int(42));
        assert!(matches!(
            heap.array_load(ints, 3, ArrayKind::Int),
            Err(Error::ArrayIndexOutOfBounds {
                index: 3,
                length: 3
            })
        ));
        assert!(matches!(
            heap.array_load(ints, -1, ArrayKind::Int),
            Err(Error::ArrayIndexOutOfBounds { index: -1, .. })
        ));
        assert!(matches!(
            heap.array_load(ints, 0, ArrayKind::Long),
            Err(Error::InvalidArrayType)
        ));

        assert!(matches!(
            heap.array_store(ints, 0, ArrayKind::Short, Value::Int(1)),
            Err(Error::InvalidArrayType)
        ));

        let bytes = heap.new_primitive_array(BaseType::Byte, 1).unwrap();
        heap.array_store(bytes, 0, ArrayKind::Byte, Value::Int(0x1FF)).unwrap();
        assert_eq!(heap.array_load(bytes, 0, ArrayKind::Byte).unwrap(), Value::Int(-1));

        let booleans = heap.new_primitive_array(BaseType::Boolean, 1).unwrap();
        heap.array_store(booleans, 0, ArrayKind::Byte, Value::Int(3)).unwrap();
        assert_eq!(heap.array_load(booleans, 0, ArrayKind::Byte).unwrap(), Value::Int(1));

        let chars = heap.new_primitive_array(BaseType::Char, 1).unwrap();
        heap.array_store(chars, 0, ArrayKind::Char, Value::Int(-1)).unwrap();
        assert_eq!(heap.array_load(chars, 0, ArrayKind::Char).unwrap(), Value::Int(0xFFFF));

        assert!(matches!(heap.new_primitive_array(BaseType::Int, -1), Err(Error::NegativeArraySize(-1))));
    }

    #[test]
    fn multi_arrays() {
        let mut heap = Heap::new();
        let grid = heap.new_multi_array("[[I", &[2, 3]).unwrap();
        assert_eq!(heap.array_length(grid).unwrap(), 2);
        let row = match heap.array_load(grid, 1, ArrayKind::Reference).unwrap() {
            Value::Reference(row) => row,
            other => panic!("unexpected element {:?}", other),
        };
        assert_eq!(heap.array_length(row).unwrap(), 3);
        assert_eq!(heap.array_load(row, 2, ArrayKind::Int).unwrap(), Value::Int(0));

        // Only the outer dimension is allocated
        let partial = heap.new_multi_array("[[Ljava/lang/String;", &[4]).unwrap();
        match heap.get(partial).unwrap() {
            Object::ObjectArray { element, elements } => {
                assert_eq!(element, "[Ljava/lang/String;");
                assert!(elements.iter().all(|handle| handle.is_null()));
            }
            other => panic!("unexpected object {:?}", other),
        }

        let strings = heap.new_multi_array("[Ljava/lang/String;", &[1]).unwrap();
        assert!(matches!(
            heap.get(strings).unwrap(),
            Object::ObjectArray { element, .. } if element == "java/lang/String"
        ));

        assert!(matches!(
            heap.new_multi_array("[[I", &[]),
            Err(Error::InvalidArrayDimensions)
        ));
        assert!(matches!(
            heap.new_multi_array("I", &[1]),
            Err(Error::InvalidArrayDimensions)
        ));
        assert!(matches!(
            heap.new_multi_array("[[I", &[1, -2]),
            Err(Error::NegativeArraySize(-2))
        ));
    }
}
