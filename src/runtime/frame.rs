use super::{ClassId, Error, Operand, OperandStack};
use crate::jvm::class_file::Code;

/// Activation record of a method being interpreted
///
/// The bytecode is borrowed from the class file of the method, which the caller keeps alive for
/// as long as the frame runs.
#[derive(Debug)]
pub struct Frame<'c> {
    /// Class declaring the method
    pub class: ClassId,

    /// Offset of the next instruction in `code`
    pub pc: usize,
    pub code: &'c [u8],
    pub locals: Vec<Operand>,
    pub stack: OperandStack,
}

impl<'c> Frame<'c> {
    /// Frame with `max_locals` zeroed locals, the first of which are set to `arguments`
    pub fn new(class: ClassId, code: &'c Code, arguments: Vec<Operand>) -> Result<Frame<'c>, Error> {
        let max_locals = code.max_locals as usize;
        if arguments.len() > max_locals {
            return Err(Error::InvalidLocal(arguments.len() - 1));
        }
        let mut locals = arguments;
        locals.resize(max_locals, Operand::default());

        Ok(Frame {
            class,
            pc: 0,
            code: &code.code_array,
            locals,
            stack: OperandStack::with_capacity(code.max_stack as usize),
        })
    }

    pub fn load(&self, index: u16) -> Result<Operand, Error> {
        self.locals
            .get(index as usize)
            .copied()
            .ok_or(Error::InvalidLocal(index as usize))
    }

    /// Load the two words of a `long` or `double`
    pub fn load_wide(&self, index: u16) -> Result<[Operand; 2], Error> {
        Ok([self.load(index)?, self.load(index.wrapping_add(1))?])
    }

    pub fn store(&mut self, index: u16, operand: Operand) -> Result<(), Error> {
        let slot = self
            .locals
            .get_mut(index as usize)
            .ok_or(Error::InvalidLocal(index as usize))?;
        *slot = operand;
        Ok(())
    }

    pub fn store_wide(&mut self, index: u16, high: Operand, low: Operand) -> Result<(), Error> {
        if index as usize + 1 >= self.locals.len() {
            return Err(Error::InvalidLocal(index as usize + 1));
        }
        self.locals[index as usize] = high;
        self.locals[index as usize + 1] = low;
        Ok(())
    }

    /// Move to the end of the code, so that the method stops
    pub fn finish(&mut self) {
        self.pc = self.code.len();
    }

    pub fn is_finished(&self) -> bool {
        self.pc >= self.code.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn code(max_locals: u16) -> Code {
        Code {
            max_stack: 2,
            max_locals,
            code_array: vec![0x00, 0xB1],
            exception_table: vec![],
            attributes: vec![],
        }
    }

    #[test]
    fn arguments_fill_first_locals() {
        let code = code(4);
        let frame = Frame::new(ClassId(0), &code, vec![Operand::int(7), Operand::int(8)]).unwrap();
        assert_eq!(frame.locals.len(), 4);
        assert_eq!(frame.load(1).unwrap(), Operand::int(8));
        assert_eq!(frame.load(3).unwrap(), Operand::int(0));
        assert!(matches!(frame.load(4), Err(Error::InvalidLocal(4))));

        let too_many = vec![Operand::NULL; 5];
        assert!(Frame::new(ClassId(0), &code, too_many).is_err());
    }

    #[test]
    fn wide_locals() {
        let code = code(3);
        let mut frame = Frame::new(ClassId(0), &code, vec![]).unwrap();
        let [high, low] = Operand::long(1 << 40);
        frame.store_wide(1, high, low).unwrap();
        assert_eq!(frame.load_wide(1).unwrap(), [high, low]);
        assert!(frame.store_wide(2, high, low).is_err());

        assert!(!frame.is_finished());
        frame.finish();
        assert!(frame.is_finished());
    }
}
