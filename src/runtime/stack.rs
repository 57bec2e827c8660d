use super::{Error, Handle, Operand, Value};

/// Operand stack of a frame
///
/// Nothing is type checked: the typed accessors just reinterpret the bits of the words they pop.
#[derive(Clone, Default, Debug)]
pub struct OperandStack(Vec<Operand>);

impl OperandStack {
    pub fn new() -> OperandStack {
        OperandStack(vec![])
    }

    pub fn with_capacity(capacity: usize) -> OperandStack {
        OperandStack(Vec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, operand: Operand) {
        self.0.push(operand);
    }

    pub fn pop(&mut self) -> Result<Operand, Error> {
        self.0.pop().ok_or(Error::StackUnderflow)
    }

    /// Word `depth` positions below the top (`0` is the top)
    pub fn peek(&self, depth: usize) -> Result<Operand, Error> {
        self.0
            .len()
            .checked_sub(depth + 1)
            .map(|idx| self.0[idx])
            .ok_or(Error::StackUnderflow)
    }

    /// Pop the top `count` words, keeping them in stack order (deepest first)
    pub fn pop_words(&mut self, count: usize) -> Result<Vec<Operand>, Error> {
        let start = self.0.len().checked_sub(count).ok_or(Error::StackUnderflow)?;
        Ok(self.0.split_off(start))
    }

    pub fn push_words(&mut self, words: &[Operand]) {
        self.0.extend_from_slice(words);
    }

    pub fn push_value(&mut self, value: Value) {
        self.push_words(&value.words());
    }

    pub fn push_int(&mut self, value: i32) {
        self.push(Operand::int(value));
    }

    pub fn push_float(&mut self, value: f32) {
        self.push(Operand::float(value));
    }

    pub fn push_long(&mut self, value: i64) {
        self.push_words(&Operand::long(value));
    }

    pub fn push_double(&mut self, value: f64) {
        self.push_words(&Operand::double(value));
    }

    pub fn push_reference(&mut self, handle: Handle) {
        self.push(Operand::reference(handle));
    }

    pub fn pop_int(&mut self) -> Result<i32, Error> {
        self.pop().map(Operand::as_int)
    }

    pub fn pop_float(&mut self) -> Result<f32, Error> {
        self.pop().map(Operand::as_float)
    }

    /// Pops the low word then the high word
    pub fn pop_long(&mut self) -> Result<i64, Error> {
        self.pop_wide().map(|bits| bits as i64)
    }

    pub fn pop_double(&mut self) -> Result<f64, Error> {
        self.pop_wide().map(f64::from_bits)
    }

    fn pop_wide(&mut self) -> Result<u64, Error> {
        let low = self.pop()?;
        let high = self.pop()?;
        Ok(Operand::join(high, low))
    }

    pub fn pop_reference(&mut self) -> Result<Handle, Error> {
        self.pop().map(Operand::as_handle)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_round_trips() {
        let mut stack = OperandStack::new();
        stack.push_int(-5);
        stack.push_long(i64::MIN + 3);
        stack.push_double(-0.25);
        stack.push_float(2.5);
        stack.push_reference(Handle(9));
        assert_eq!(stack.len(), 7);

        assert_eq!(stack.pop_reference().unwrap(), Handle(9));
        assert_eq!(stack.pop_float().unwrap(), 2.5);
        assert_eq!(stack.pop_double().unwrap(), -0.25);
        assert_eq!(stack.pop_long().unwrap(), i64::MIN + 3);
        assert_eq!(stack.pop_int().unwrap(), -5);
        assert!(matches!(stack.pop(), Err(Error::StackUnderflow)));
    }

    #[test]
    fn words_in_order() {
        let mut stack = OperandStack::new();
        for i in 1..=4 {
            stack.push_int(i);
        }
        assert_eq!(stack.peek(0).unwrap(), Operand::int(4));
        assert_eq!(stack.peek(3).unwrap(), Operand::int(1));
        assert!(stack.peek(4).is_err());

        let words = stack.pop_words(3).unwrap();
        assert_eq!(words, vec![Operand::int(2), Operand::int(3), Operand::int(4)]);
        assert_eq!(stack.len(), 1);
        assert!(matches!(stack.pop_words(2), Err(Error::StackUnderflow)));
        assert_eq!(stack.len(), 1);
    }
}
