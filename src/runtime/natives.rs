//! Methods implemented by the VM itself

use super::{Error, OperandStack, Vm};
use crate::jvm::names::{BinaryName, Name, UnqualifiedName};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Native method, operating directly on the caller's operand stack
///
/// The last argument is the method descriptor the call site used.
pub type NativeMethod = fn(&mut Vm, &mut OperandStack, &str) -> Result<(), Error>;

/// Find the native implementation of a method
pub fn lookup(class: &str, name: &str, descriptor: &str) -> Option<NativeMethod> {
    if class == BinaryName::PRINTSTREAM.as_str() && name == UnqualifiedName::PRINTLN.as_str() {
        Some(println)
    } else if class == BinaryName::SYSTEM.as_str()
        && name == UnqualifiedName::CURRENTTIMEMILLIS.as_str()
        && descriptor == "()J"
    {
        Some(current_time_millis)
    } else {
        None
    }
}

/// `PrintStream.println`, for every overload
///
/// The argument is formatted based on the first character of the parameter list. The receiver
/// (whatever `getstatic System.out` pushed) is popped last.
fn println(vm: &mut Vm, stack: &mut OperandStack, descriptor: &str) -> Result<(), Error> {
    let parameter = descriptor.strip_prefix('(').and_then(|rest| rest.chars().next());
    let text = match parameter {
        Some(')') => String::new(),
        Some('Z') => (stack.pop_int()? != 0).to_string(),
        Some('B' | 'S' | 'I') => stack.pop_int()?.to_string(),
        Some('C') => {
            let unit = stack.pop_int()? as u16;
            char::decode_utf16([unit])
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect::<String>()
        }
        Some('J') => stack.pop_long()?.to_string(),
        Some('F') => fixed(stack.pop_float()? as f64),
        Some('D') => fixed(stack.pop_double()?),
        Some('L') => {
            let handle = stack.pop_reference()?;
            if handle.is_null() {
                "null".to_string()
            } else {
                match vm.heap.string(handle)? {
                    Some(text) => text.to_owned(),
                    None => handle.to_string(),
                }
            }
        }
        Some('[') => format!("0x{:X}", stack.pop_reference()?.0),
        _ => {
            return Err(Error::MethodResolutionFailed {
                class: BinaryName::PRINTSTREAM.as_str().to_owned(),
                name: UnqualifiedName::PRINTLN.as_str().to_owned(),
                descriptor: descriptor.to_owned(),
            })
        }
    };
    stack.pop()?;
    writeln!(vm.output(), "{}", text)?;
    Ok(())
}

/// Six fractional digits, with the lowercase `nan` that C's `%f` prints
fn fixed(value: f64) -> String {
    if value.is_nan() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        format!("{}nan", sign)
    } else {
        format!("{:.6}", value)
    }
}

/// `System.currentTimeMillis`
fn current_time_millis(_vm: &mut Vm, stack: &mut OperandStack, _descriptor: &str) -> Result<(), Error> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64);
    stack.push_long(millis);
    Ok(())
}
