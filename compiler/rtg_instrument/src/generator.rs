//! Checked lazily-produced sequences.
//!
//! [`CheckedSequence`] wraps the body of a sequence returned by a wrapped
//! function. It is a three-phase state machine:
//!
//! ```text
//! Fresh --resume--> Suspended --resume--> ... --> Finished
//!          check produced value    check sent value, then produced value
//! ```
//!
//! The value a fresh sequence is started with is never checked; the final
//! value is checked when a synchronous sequence completes.

use rtg_types::{GeneratorObj, LazySequence, RuntimeError, Step, Value};

use crate::call::CallChecker;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Fresh,
    Suspended,
    Finished,
}

/// A sequence body with checks on every phase transition.
pub struct CheckedSequence {
    inner: Box<dyn LazySequence>,
    checker: CallChecker,
    phase: Phase,
}

impl CheckedSequence {
    pub fn new(inner: Box<dyn LazySequence>, checker: CallChecker) -> Self {
        CheckedSequence {
            inner,
            checker,
            phase: Phase::Fresh,
        }
    }
}

impl LazySequence for CheckedSequence {
    fn resume(&mut self, sent: Value) -> Result<Step, RuntimeError> {
        let sent = match self.phase {
            Phase::Fresh => sent,
            Phase::Suspended => self.checker.check_send(sent)?,
            Phase::Finished => return Ok(Step::Complete(Value::None)),
        };
        let step = self.inner.resume(sent);
        match step {
            Ok(Step::Yielded(value)) => {
                self.phase = Phase::Suspended;
                Ok(Step::Yielded(self.checker.check_yield(value)?))
            }
            Ok(Step::Complete(value)) => {
                self.phase = Phase::Finished;
                Ok(Step::Complete(self.checker.check_return(value)?))
            }
            Err(err) => {
                self.phase = Phase::Finished;
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        self.phase = Phase::Finished;
        self.inner.close();
    }
}

/// Re-wrap a generator object so its phases are checked.
///
/// Values that are not generators, and generators that already finished,
/// are returned unchanged.
pub fn check_lazy_value(value: Value, checker: CallChecker) -> Value {
    let Value::Generator(generator) = &value else {
        return value;
    };
    let Some(body) = generator.take_body() else {
        return value;
    };
    tracing::trace!(function = checker.func_name(), "wrapping lazily-produced sequence");
    Value::generator(GeneratorObj::new(
        generator.name,
        generator.qualname,
        generator.kind,
        Box::new(CheckedSequence::new(body, checker)),
    ))
}
