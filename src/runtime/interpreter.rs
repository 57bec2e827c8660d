use super::bytecode::{decode, Instruction, InvokeType, ShiftType};
use super::natives;
use super::{ArrayKind, ClassId, Error, Frame, Handle, Operand, OperandKind, OperandStack, Value, Vm};
use crate::jvm::class_file::{ClassFile, Constant, ConstantIndex, MemberRef};
use crate::jvm::descriptors::parse_method_descriptor;
use crate::jvm::names::{Name, UnqualifiedName};
use crate::jvm::MethodAccessFlags;
use std::rc::Rc;

fn method_resolution_failed(member: &MemberRef) -> Error {
    Error::MethodResolutionFailed {
        class: member.class_name.to_owned(),
        name: member.name.to_owned(),
        descriptor: member.descriptor.to_owned(),
    }
}

fn field_resolution_failed(member: &MemberRef) -> Error {
    Error::FieldResolutionFailed {
        class: member.class_name.to_owned(),
        name: member.name.to_owned(),
        descriptor: member.descriptor.to_owned(),
    }
}

/// Number of words taken by a value of the type in a field descriptor
fn descriptor_width(descriptor: &str) -> usize {
    match descriptor.as_bytes().first() {
        Some(b'J' | b'D') => 2,
        _ => 1,
    }
}

fn int_binary(
    stack: &mut OperandStack,
    op: impl FnOnce(i32, i32) -> Result<i32, Error>,
) -> Result<(), Error> {
    let rhs = stack.pop_int()?;
    let lhs = stack.pop_int()?;
    stack.push_int(op(lhs, rhs)?);
    Ok(())
}

fn long_binary(
    stack: &mut OperandStack,
    op: impl FnOnce(i64, i64) -> Result<i64, Error>,
) -> Result<(), Error> {
    let rhs = stack.pop_long()?;
    let lhs = stack.pop_long()?;
    stack.push_long(op(lhs, rhs)?);
    Ok(())
}

fn float_binary(stack: &mut OperandStack, op: impl FnOnce(f32, f32) -> f32) -> Result<(), Error> {
    let rhs = stack.pop_float()?;
    let lhs = stack.pop_float()?;
    stack.push_float(op(lhs, rhs));
    Ok(())
}

fn double_binary(stack: &mut OperandStack, op: impl FnOnce(f64, f64) -> f64) -> Result<(), Error> {
    let rhs = stack.pop_double()?;
    let lhs = stack.pop_double()?;
    stack.push_double(op(lhs, rhs));
    Ok(())
}

/// Copy the top `count` words beneath the `depth` words under them (covers all `dup` forms)
fn dup_words(stack: &mut OperandStack, count: usize, depth: usize) -> Result<(), Error> {
    let words = stack.pop_words(count + depth)?;
    stack.push_words(&words[depth..]);
    stack.push_words(&words);
    Ok(())
}

fn checked_div<T: Copy + PartialEq + Default>(
    rhs: T,
    op: impl FnOnce(T) -> T,
) -> Result<T, Error> {
    if rhs == T::default() {
        Err(Error::ArithmeticException)
    } else {
        Ok(op(rhs))
    }
}

fn pop_array_value(stack: &mut OperandStack, kind: ArrayKind) -> Result<Value, Error> {
    Ok(match kind {
        ArrayKind::Long => Value::Long(stack.pop_long()?),
        ArrayKind::Float => Value::Float(stack.pop_float()?),
        ArrayKind::Double => Value::Double(stack.pop_double()?),
        ArrayKind::Reference => Value::Reference(stack.pop_reference()?),
        ArrayKind::Int | ArrayKind::Byte | ArrayKind::Char | ArrayKind::Short => {
            Value::Int(stack.pop_int()?)
        }
    })
}

impl Vm {
    /// Run a method, popping its arguments from `caller` and pushing its result back there
    ///
    /// Native methods run directly against `caller`.
    pub fn invoke(
        &mut self,
        class: ClassId,
        method_index: usize,
        caller: &mut OperandStack,
    ) -> Result<(), Error> {
        let file = Rc::clone(&self.class(class).file);
        let method = &file.methods[method_index];
        let name = method.name(&file.constants);
        let descriptor = method.descriptor(&file.constants);
        let unresolved = || Error::MethodResolutionFailed {
            class: file.name().to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        };

        if method.access_flags.contains(MethodAccessFlags::NATIVE) {
            let native = natives::lookup(file.name(), name, descriptor).ok_or_else(unresolved)?;
            return native(self, caller, descriptor);
        }
        let code = method.code().ok_or_else(unresolved)?;
        let parameter_words = parse_method_descriptor(descriptor)
            .map_err(|_| unresolved())?
            .parameter_length(!method.is_static());

        if self.call_stack.len() >= self.settings.max_call_depth {
            return Err(Error::StackOverflow(self.call_stack.len()));
        }
        let arguments = caller.pop_words(parameter_words)?;
        let mut frame = Frame::new(class, code, arguments)?;

        log::trace!("entering {}.{}{}", file.name(), name, descriptor);
        self.call_stack.push((class, method_index));
        let result = self.execute(&mut frame, &file);
        self.call_stack.pop();

        caller.push_words(&result?);
        Ok(())
    }

    /// Run instructions until the method returns, producing the returned words
    fn execute(&mut self, frame: &mut Frame<'_>, file: &ClassFile) -> Result<Vec<Operand>, Error> {
        while !frame.is_finished() {
            self.steps += 1;
            if let Some(max_steps) = self.settings.max_steps {
                if self.steps > max_steps {
                    return Err(Error::StepLimitExceeded(max_steps));
                }
            }

            let (instruction, next_pc) = decode(frame.code, frame.pc)?;
            log::trace!("{}@{}: {:?}", file.name(), frame.pc, instruction);
            let pc = frame.pc;
            frame.pc = next_pc;
            if let Some(returned) = self.step(frame, file, pc, instruction)? {
                frame.finish();
                return Ok(returned);
            }
        }
        Ok(vec![])
    }

    /// Execute one instruction, whose successor is already in `frame.pc`
    ///
    /// Returns the words to hand back to the caller when the instruction is a return.
    fn step(
        &mut self,
        frame: &mut Frame<'_>,
        file: &ClassFile,
        pc: usize,
        instruction: Instruction,
    ) -> Result<Option<Vec<Operand>>, Error> {
        use Instruction::*;

        let stack = &mut frame.stack;
        match instruction {
            Nop => (),
            AConstNull => stack.push(Operand::NULL),
            IConst(value) => stack.push_int(value),
            LConst(value) => stack.push_long(value),
            FConst(value) => stack.push_float(value),
            DConst(value) => stack.push_double(value),
            BiPush(value) => stack.push_int(value as i32),
            SiPush(value) => stack.push_int(value as i32),
            Ldc(index) => {
                let value = self.load_constant(file, index, false)?;
                frame.stack.push_value(value);
            }
            Ldc2(index) => {
                let value = self.load_constant(file, index, true)?;
                frame.stack.push_value(value);
            }

            ILoad(index) | FLoad(index) | ALoad(index) => {
                let word = frame.load(index)?;
                frame.stack.push(word);
            }
            LLoad(index) | DLoad(index) => {
                let words = frame.load_wide(index)?;
                frame.stack.push_words(&words);
            }
            IStore(index) | FStore(index) | AStore(index) => {
                let word = stack.pop()?;
                frame.store(index, word)?;
            }
            LStore(index) | DStore(index) => {
                let low = stack.pop()?;
                let high = stack.pop()?;
                frame.store_wide(index, high, low)?;
            }
            ArrayLoad(kind) => {
                let index = stack.pop_int()?;
                let array = stack.pop_reference()?;
                stack.push_value(self.heap.array_load(array, index, kind)?);
            }
            ArrayStore(kind) => {
                let value = pop_array_value(stack, kind)?;
                let index = stack.pop_int()?;
                let array = stack.pop_reference()?;
                self.heap.array_store(array, index, kind, value)?;
            }

            Pop => {
                stack.pop()?;
            }
            Pop2 => {
                stack.pop_words(2)?;
            }
            Dup => dup_words(stack, 1, 0)?,
            DupX1 => dup_words(stack, 1, 1)?,
            DupX2 => dup_words(stack, 1, 2)?,
            Dup2 => dup_words(stack, 2, 0)?,
            Dup2X1 => dup_words(stack, 2, 1)?,
            Dup2X2 => dup_words(stack, 2, 2)?,
            Swap => {
                let top = stack.pop()?;
                let below = stack.pop()?;
                stack.push(top);
                stack.push(below);
            }

            IAdd => int_binary(stack, |a, b| Ok(a.wrapping_add(b)))?,
            LAdd => long_binary(stack, |a, b| Ok(a.wrapping_add(b)))?,
            FAdd => float_binary(stack, |a, b| a + b)?,
            DAdd => double_binary(stack, |a, b| a + b)?,
            ISub => int_binary(stack, |a, b| Ok(a.wrapping_sub(b)))?,
            LSub => long_binary(stack, |a, b| Ok(a.wrapping_sub(b)))?,
            FSub => float_binary(stack, |a, b| a - b)?,
            DSub => double_binary(stack, |a, b| a - b)?,
            IMul => int_binary(stack, |a, b| Ok(a.wrapping_mul(b)))?,
            LMul => long_binary(stack, |a, b| Ok(a.wrapping_mul(b)))?,
            FMul => float_binary(stack, |a, b| a * b)?,
            DMul => double_binary(stack, |a, b| a * b)?,
            IDiv => int_binary(stack, |a, b| checked_div(b, |b| a.wrapping_div(b)))?,
            LDiv => long_binary(stack, |a, b| checked_div(b, |b| a.wrapping_div(b)))?,
            FDiv => float_binary(stack, |a, b| a / b)?,
            DDiv => double_binary(stack, |a, b| a / b)?,
            IRem => int_binary(stack, |a, b| checked_div(b, |b| a.wrapping_rem(b)))?,
            LRem => long_binary(stack, |a, b| checked_div(b, |b| a.wrapping_rem(b)))?,
            FRem => float_binary(stack, |a, b| a % b)?,
            DRem => double_binary(stack, |a, b| a % b)?,
            INeg => {
                let value = stack.pop_int()?;
                stack.push_int(value.wrapping_neg());
            }
            LNeg => {
                let value = stack.pop_long()?;
                stack.push_long(value.wrapping_neg());
            }
            FNeg => {
                let value = stack.pop_float()?;
                stack.push_float(-value);
            }
            DNeg => {
                let value = stack.pop_double()?;
                stack.push_double(-value);
            }
            ISh(shift) => {
                let amount = (stack.pop_int()? & 0x1F) as u32;
                let value = stack.pop_int()?;
                stack.push_int(match shift {
                    ShiftType::Left => value << amount,
                    ShiftType::ArithmeticRight => value >> amount,
                    ShiftType::LogicalRight => ((value as u32) >> amount) as i32,
                });
            }
            LSh(shift) => {
                let amount = (stack.pop_int()? & 0x3F) as u32;
                let value = stack.pop_long()?;
                stack.push_long(match shift {
                    ShiftType::Left => value << amount,
                    ShiftType::ArithmeticRight => value >> amount,
                    ShiftType::LogicalRight => ((value as u64) >> amount) as i64,
                });
            }
            IAnd => int_binary(stack, |a, b| Ok(a & b))?,
            LAnd => long_binary(stack, |a, b| Ok(a & b))?,
            IOr => int_binary(stack, |a, b| Ok(a | b))?,
            LOr => long_binary(stack, |a, b| Ok(a | b))?,
            IXor => int_binary(stack, |a, b| Ok(a ^ b))?,
            LXor => long_binary(stack, |a, b| Ok(a ^ b))?,
            IInc(index, delta) => {
                let value = frame.load(index)?.as_int().wrapping_add(delta as i32);
                frame.store(index, Operand::int(value))?;
            }

            I2L => {
                let value = stack.pop_int()?;
                stack.push_long(value as i64);
            }
            I2F => {
                let value = stack.pop_int()?;
                stack.push_float(value as f32);
            }
            I2D => {
                let value = stack.pop_int()?;
                stack.push_double(value as f64);
            }
            L2I => {
                let value = stack.pop_long()?;
                stack.push_int(value as i32);
            }
            L2F => {
                let value = stack.pop_long()?;
                stack.push_float(value as f32);
            }
            L2D => {
                let value = stack.pop_long()?;
                stack.push_double(value as f64);
            }
            F2I => {
                let value = stack.pop_float()?;
                stack.push_int(value as i32);
            }
            F2L => {
                let value = stack.pop_float()?;
                stack.push_long(value as i64);
            }
            F2D => {
                let value = stack.pop_float()?;
                stack.push_double(value as f64);
            }
            D2I => {
                let value = stack.pop_double()?;
                stack.push_int(value as i32);
            }
            D2L => {
                let value = stack.pop_double()?;
                stack.push_long(value as i64);
            }
            D2F => {
                let value = stack.pop_double()?;
                stack.push_float(value as f32);
            }
            I2B => {
                let value = stack.pop_int()?;
                stack.push_int(value as i8 as i32);
            }
            I2C => {
                let value = stack.pop_int()?;
                stack.push_int(value as u16 as i32);
            }
            I2S => {
                let value = stack.pop_int()?;
                stack.push_int(value as i16 as i32);
            }

            LCmp => {
                let rhs = stack.pop_long()?;
                let lhs = stack.pop_long()?;
                stack.push_int(lhs.cmp(&rhs) as i32);
            }
            FCmp(mode) => {
                let rhs = stack.pop_float()?;
                let lhs = stack.pop_float()?;
                stack.push_int(mode.result(lhs.partial_cmp(&rhs)));
            }
            DCmp(mode) => {
                let rhs = stack.pop_double()?;
                let lhs = stack.pop_double()?;
                stack.push_int(mode.result(lhs.partial_cmp(&rhs)));
            }

            If(comparison, target) => {
                if comparison.holds(stack.pop_int()?, 0) {
                    frame.pc = target;
                }
            }
            IfICmp(comparison, target) => {
                let rhs = stack.pop_int()?;
                let lhs = stack.pop_int()?;
                if comparison.holds(lhs, rhs) {
                    frame.pc = target;
                }
            }
            IfACmp(comparison, target) => {
                let rhs = stack.pop_reference()?;
                let lhs = stack.pop_reference()?;
                if comparison.holds(lhs, rhs) {
                    frame.pc = target;
                }
            }
            IfNull(comparison, target) => {
                if comparison.holds(stack.pop_reference()?, Handle::NULL) {
                    frame.pc = target;
                }
            }
            Goto(target) => frame.pc = target,
            Jsr(target) => {
                stack.push(Operand::return_address(frame.pc as u32));
                frame.pc = target;
            }
            Ret(index) => {
                let address = frame.load(index)?;
                let target = address.value as usize;
                if address.kind != OperandKind::ReturnAddress || target >= frame.code.len() {
                    return Err(Error::InvalidBranchTarget {
                        pc,
                        target: address.value as i64,
                    });
                }
                frame.pc = target;
            }
            TableSwitch {
                default,
                low,
                targets,
            } => {
                let key = stack.pop_int()? as i64 - low as i64;
                frame.pc = usize::try_from(key)
                    .ok()
                    .and_then(|idx| targets.get(idx).copied())
                    .unwrap_or(default);
            }
            LookupSwitch { default, targets } => {
                let key = stack.pop_int()?;
                frame.pc = targets
                    .iter()
                    .find(|(candidate, _)| *candidate == key)
                    .map_or(default, |(_, target)| *target);
            }

            IReturn | FReturn | AReturn => return Ok(Some(vec![stack.pop()?])),
            LReturn | DReturn => return Ok(Some(stack.pop_words(2)?)),
            Return => return Ok(Some(vec![])),

            GetStatic(index) => self.get_static(frame, file, index)?,
            PutStatic(index) => self.put_static(frame, file, index)?,
            GetField(index) => self.get_field(frame, file, index)?,
            PutField(index) => self.put_field(frame, file, index)?,
            Invoke(invoke_type, index) => self.invoke_member(frame, file, invoke_type, index)?,
            InvokeDynamic(_) => return Err(Error::Unimplemented("invokedynamic")),

            New(index) => {
                let class_name = file
                    .constants
                    .class_name(ConstantIndex(index))
                    .ok_or(Error::InvalidConstant(index))?;
                let object = match self.resolve_class(class_name)? {
                    Some(class) => {
                        self.initialize_class(class)?;
                        let slots = self.class(class).file.instance_field_count;
                        self.heap.new_instance(Some(class), slots)?
                    }
                    None if class_name == crate::jvm::BinaryName::STRING.as_str() => {
                        self.heap.new_string("")?
                    }
                    None => self.heap.new_instance(None, 0)?,
                };
                frame.stack.push_reference(object);
            }
            NewArray(base_type) => {
                let count = stack.pop_int()?;
                let array = self.heap.new_primitive_array(base_type, count)?;
                frame.stack.push_reference(array);
            }
            ANewArray(index) => {
                let class_name = file
                    .constants
                    .class_name(ConstantIndex(index))
                    .ok_or(Error::InvalidConstant(index))?;
                let count = stack.pop_int()?;
                self.resolve_class(class_name)?;
                let array = self.heap.new_object_array(class_name, count)?;
                frame.stack.push_reference(array);
            }
            MultiANewArray(index, dimensions) => {
                let class_name = file
                    .constants
                    .class_name(ConstantIndex(index))
                    .ok_or(Error::InvalidConstant(index))?;
                let counts: Vec<i32> = stack
                    .pop_words(dimensions as usize)?
                    .into_iter()
                    .map(Operand::as_int)
                    .collect();
                self.resolve_class(class_name)?;
                let array = self.heap.new_multi_array(class_name, &counts)?;
                frame.stack.push_reference(array);
            }
            ArrayLength => {
                let array = stack.pop_reference()?;
                let length = self.heap.array_length(array)?;
                frame.stack.push_int(length as i32);
            }

            AThrow => return Err(Error::Unimplemented("athrow")),
            CheckCast(_) => return Err(Error::Unimplemented("checkcast")),
            InstanceOf(_) => return Err(Error::Unimplemented("instanceof")),
            MonitorEnter | MonitorExit => {
                stack.pop_reference()?;
            }
        }
        Ok(None)
    }

    /// Value of an `ldc` (or `ldc2_w` when `wide` is set) constant
    fn load_constant(&mut self, file: &ClassFile, index: u16, wide: bool) -> Result<Value, Error> {
        let value = match (file.constants.get(ConstantIndex(index)), wide) {
            (Some(Constant::Integer(value)), false) => Value::Int(*value),
            (Some(Constant::Float(value)), false) => Value::Float(*value),
            (Some(Constant::String(utf8)), false) => {
                let text = file.constants.utf8(*utf8).unwrap_or_default();
                Value::Reference(self.heap.new_string(text)?)
            }
            (Some(Constant::Class(name)), false) => {
                let name = file.constants.utf8(*name).unwrap_or_default();
                let instance = match self.resolve_class(name)? {
                    Some(class) => {
                        let slots = self.class(class).file.instance_field_count;
                        self.heap.new_instance(Some(class), slots)?
                    }
                    None => Handle::NULL,
                };
                Value::Reference(instance)
            }
            (Some(Constant::Long(value)), true) => Value::Long(*value),
            (Some(Constant::Double(value)), true) => Value::Double(*value),
            _ => return Err(Error::InvalidConstant(index)),
        };
        Ok(value)
    }

    /// Find the declaring class and slot of a static field, initializing the class
    fn resolve_static_field(&mut self, member: &MemberRef) -> Result<(ClassId, usize), Error> {
        let class = self
            .resolve_class(member.class_name)?
            .ok_or_else(|| field_resolution_failed(member))?;
        self.initialize_class(class)?;
        let (owner, offset) = self
            .find_field(class, member.name, member.descriptor)
            .filter(|(_, field)| field.is_static())
            .map(|(owner, field)| (owner, field.offset))
            .ok_or_else(|| field_resolution_failed(member))?;
        self.initialize_class(owner)?;
        Ok((owner, offset))
    }

    /// Find the slot of an instance field
    fn resolve_instance_field(&mut self, member: &MemberRef) -> Result<usize, Error> {
        let class = self
            .resolve_class(member.class_name)?
            .ok_or_else(|| field_resolution_failed(member))?;
        self.find_field(class, member.name, member.descriptor)
            .filter(|(_, field)| !field.is_static())
            .map(|(_, field)| field.offset)
            .ok_or_else(|| field_resolution_failed(member))
    }

    fn get_static(&mut self, frame: &mut Frame<'_>, file: &ClassFile, index: u16) -> Result<(), Error> {
        let member = file
            .constants
            .member_ref(ConstantIndex(index))
            .ok_or(Error::InvalidConstant(index))?;

        // Placeholder for `System.out` and friends
        if self.is_simulated(member.class_name)
            && member.class_name == crate::jvm::BinaryName::SYSTEM.as_str()
        {
            frame.stack.push(Operand::NULL);
            return Ok(());
        }

        let (owner, offset) = self.resolve_static_field(&member)?;
        let width = descriptor_width(member.descriptor);
        let words = self
            .class(owner)
            .statics
            .get(offset..offset + width)
            .ok_or_else(|| field_resolution_failed(&member))?;
        frame.stack.push_words(words);
        Ok(())
    }

    fn put_static(&mut self, frame: &mut Frame<'_>, file: &ClassFile, index: u16) -> Result<(), Error> {
        let member = file
            .constants
            .member_ref(ConstantIndex(index))
            .ok_or(Error::InvalidConstant(index))?;
        let (owner, offset) = self.resolve_static_field(&member)?;
        let words = frame.stack.pop_words(descriptor_width(member.descriptor))?;
        let slots = self.classes[owner.0]
            .statics
            .get_mut(offset..offset + words.len())
            .ok_or_else(|| field_resolution_failed(&member))?;
        slots.copy_from_slice(&words);
        Ok(())
    }

    fn get_field(&mut self, frame: &mut Frame<'_>, file: &ClassFile, index: u16) -> Result<(), Error> {
        let member = file
            .constants
            .member_ref(ConstantIndex(index))
            .ok_or(Error::InvalidConstant(index))?;
        let offset = self.resolve_instance_field(&member)?;
        let width = descriptor_width(member.descriptor);
        let object = frame.stack.pop_reference()?;
        let words = self
            .heap
            .fields_mut(object)?
            .get(offset..offset + width)
            .ok_or_else(|| field_resolution_failed(&member))?;
        frame.stack.push_words(words);
        Ok(())
    }

    fn put_field(&mut self, frame: &mut Frame<'_>, file: &ClassFile, index: u16) -> Result<(), Error> {
        let member = file
            .constants
            .member_ref(ConstantIndex(index))
            .ok_or(Error::InvalidConstant(index))?;
        let offset = self.resolve_instance_field(&member)?;
        let words = frame.stack.pop_words(descriptor_width(member.descriptor))?;
        let object = frame.stack.pop_reference()?;
        let slots = self
            .heap
            .fields_mut(object)?
            .get_mut(offset..offset + words.len())
            .ok_or_else(|| field_resolution_failed(&member))?;
        slots.copy_from_slice(&words);
        Ok(())
    }

    /// Execute one of the `invoke*` instructions (except `invokedynamic`)
    fn invoke_member(
        &mut self,
        frame: &mut Frame<'_>,
        file: &ClassFile,
        invoke_type: InvokeType,
        index: u16,
    ) -> Result<(), Error> {
        let member = file
            .constants
            .member_ref(ConstantIndex(index))
            .ok_or(Error::InvalidConstant(index))?;
        let argument_words = parse_method_descriptor(member.descriptor)
            .map_err(|_| Error::InvalidConstant(index))?
            .parameter_length(false);

        let simulate = self.settings.simulate_system_classes;
        if simulate && matches!(invoke_type, InvokeType::Virtual | InvokeType::Static) {
            if let Some(native) = natives::lookup(member.class_name, member.name, member.descriptor) {
                return native(self, &mut frame.stack, member.descriptor);
            }
        }

        let (owner, method_index) = match invoke_type {
            InvokeType::Static => {
                let class = self
                    .resolve_class(member.class_name)?
                    .ok_or_else(|| method_resolution_failed(&member))?;
                self.initialize_class(class)?;
                let (owner, method_index) = self
                    .find_method(class, member.name, member.descriptor)
                    .ok_or_else(|| method_resolution_failed(&member))?;
                if !self.class(owner).file.methods[method_index].is_static() {
                    return Err(method_resolution_failed(&member));
                }
                (owner, method_index)
            }

            InvokeType::Virtual | InvokeType::Interface(_) => {
                if let InvokeType::Interface(count) = invoke_type {
                    if count as usize != argument_words + 1 {
                        log::warn!(
                            "invokeinterface of {}.{} declares {} argument words instead of {}",
                            member.class_name,
                            member.name,
                            count,
                            argument_words + 1
                        );
                    }
                }
                let receiver = frame.stack.peek(argument_words)?.as_handle();
                if receiver.is_null() {
                    return Err(Error::NullPointer);
                }
                let start = match self.heap.class_of(receiver)? {
                    Some(class) => class,
                    None => self
                        .resolve_class(member.class_name)?
                        .ok_or_else(|| method_resolution_failed(&member))?,
                };
                let (owner, method_index) = self
                    .find_method(start, member.name, member.descriptor)
                    .ok_or_else(|| method_resolution_failed(&member))?;

                if let InvokeType::Interface(_) = invoke_type {
                    let flags = self.class(owner).file.methods[method_index].access_flags;
                    if !flags.contains(MethodAccessFlags::PUBLIC)
                        || flags.contains(MethodAccessFlags::ABSTRACT)
                    {
                        return Err(method_resolution_failed(&member));
                    }
                }
                (owner, method_index)
            }

            InvokeType::Special => {
                let is_init = member.name == UnqualifiedName::INIT.as_str();
                let referenced = match self.resolve_class(member.class_name)? {
                    Some(class) => class,
                    None if is_init => {
                        frame.stack.pop_words(argument_words + 1)?;
                        return Ok(());
                    }
                    None => return Err(method_resolution_failed(&member)),
                };
                if frame.stack.peek(argument_words)?.as_handle().is_null() {
                    return Err(Error::NullPointer);
                }

                let current = frame.class;
                let start = if !is_init
                    && self.has_super_flag(current)
                    && self.is_proper_superclass(referenced, current)
                {
                    self.class(current).super_class
                } else {
                    Some(referenced)
                };
                start
                    .and_then(|start| self.find_method(start, member.name, member.descriptor))
                    .ok_or_else(|| method_resolution_failed(&member))?
            }
        };

        self.invoke(owner, method_index, &mut frame.stack)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stack_of(values: &[i32]) -> OperandStack {
        let mut stack = OperandStack::new();
        for value in values {
            stack.push_int(*value);
        }
        stack
    }

    fn ints(stack: &mut OperandStack) -> Vec<i32> {
        let words = stack.pop_words(stack.len()).unwrap();
        words.into_iter().map(Operand::as_int).collect()
    }

    #[test]
    fn dup_family() {
        let cases: [(usize, usize, &[i32]); 6] = [
            (1, 0, &[1, 2, 3, 3]),
            (1, 1, &[1, 3, 2, 3]),
            (1, 2, &[3, 1, 2, 3]),
            (2, 0, &[1, 2, 3, 2, 3]),
            (2, 1, &[2, 3, 1, 2, 3]),
            (2, 2, &[]),
        ];
        for (count, depth, expected) in cases {
            let mut stack = stack_of(&[1, 2, 3]);
            let result = dup_words(&mut stack, count, depth);
            if expected.is_empty() {
                assert!(matches!(result, Err(Error::StackUnderflow)));
            } else {
                result.unwrap();
                assert_eq!(ints(&mut stack), expected);
            }
        }
    }

    #[test]
    fn arithmetic_helpers() {
        let mut stack = stack_of(&[i32::MAX, 1]);
        int_binary(&mut stack, |a, b| Ok(a.wrapping_add(b))).unwrap();
        assert_eq!(stack.pop_int().unwrap(), i32::MIN);

        let mut stack = stack_of(&[7, 0]);
        let result = int_binary(&mut stack, |a, b| checked_div(b, |b| a.wrapping_div(b)));
        assert!(matches!(result, Err(Error::ArithmeticException)));

        let mut stack = stack_of(&[i32::MIN, -1]);
        int_binary(&mut stack, |a, b| checked_div(b, |b| a.wrapping_div(b))).unwrap();
        assert_eq!(stack.pop_int().unwrap(), i32::MIN);

        let mut stack = OperandStack::new();
        stack.push_long(-9);
        stack.push_long(4);
        long_binary(&mut stack, |a, b| checked_div(b, |b| a.wrapping_rem(b))).unwrap();
        assert_eq!(stack.pop_long().unwrap(), -1);
        assert!(stack.is_empty());
    }

    #[test]
    fn array_values_by_kind() {
        let mut stack = OperandStack::new();
        stack.push_double(2.5);
        stack.push_int(-3);
        assert_eq!(pop_array_value(&mut stack, ArrayKind::Char).unwrap(), Value::Int(-3));
        assert_eq!(pop_array_value(&mut stack, ArrayKind::Double).unwrap(), Value::Double(2.5));
        assert!(matches!(
            pop_array_value(&mut stack, ArrayKind::Reference),
            Err(Error::StackUnderflow)
        ));
    }

    #[test]
    fn field_widths() {
        assert_eq!(descriptor_width("J"), 2);
        assert_eq!(descriptor_width("D"), 2);
        assert_eq!(descriptor_width("[J"), 1);
        assert_eq!(descriptor_width("Ljava/lang/String;"), 1);
    }
}
