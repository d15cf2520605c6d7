//! Lazily-produced sequences (generators and async generators).
//!
//! A sequence is resumed with a value and either produces the next element
//! or completes with a final result. The host supplies the body as a
//! [`LazySequence`]; wrappers that check each phase are also
//! `LazySequence`s around an inner one.

use parking_lot::Mutex;
use rtg_ir::{LazyKind, Name};

use super::Value;
use crate::errors::RuntimeError;

/// Outcome of one resumption.
#[derive(Clone, Debug)]
pub enum Step {
    /// The sequence produced a value and is suspended.
    Yielded(Value),
    /// The sequence finished with a final value.
    Complete(Value),
}

/// A resumable sequence body.
pub trait LazySequence: Send {
    /// Resume with `sent` (`None` for plain iteration).
    fn resume(&mut self, sent: Value) -> Result<Step, RuntimeError>;

    /// Abandon the sequence before it completes.
    fn close(&mut self) {}
}

enum State {
    Suspended(Box<dyn LazySequence>),
    Finished,
}

/// A generator object.
pub struct GeneratorObj {
    pub name: Name,
    pub qualname: Name,
    pub kind: LazyKind,
    state: Mutex<State>,
}

impl GeneratorObj {
    pub fn new(name: Name, qualname: Name, kind: LazyKind, body: Box<dyn LazySequence>) -> Self {
        GeneratorObj {
            name,
            qualname,
            kind,
            state: Mutex::new(State::Suspended(body)),
        }
    }

    /// Resume the sequence with `value`.
    ///
    /// Once the sequence completed or failed, every further resumption
    /// completes with `None`. Re-entering a running sequence is an error.
    pub fn send(&self, value: Value) -> Result<Step, RuntimeError> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(RuntimeError::new("generator already executing"));
        };
        let State::Suspended(body) = &mut *state else {
            return Ok(Step::Complete(Value::None));
        };
        let step = body.resume(value);
        if !matches!(step, Ok(Step::Yielded(_))) {
            *state = State::Finished;
        }
        step
    }

    /// Resume without a value.
    pub fn next(&self) -> Result<Step, RuntimeError> {
        self.send(Value::None)
    }

    /// Abandon the sequence. Closing a running sequence is an error.
    pub fn close(&self) -> Result<(), RuntimeError> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(RuntimeError::new("generator already executing"));
        };
        if let State::Suspended(body) = &mut *state {
            body.close();
        }
        *state = State::Finished;
        Ok(())
    }

    /// A running sequence is not finished.
    pub fn is_finished(&self) -> bool {
        self.state
            .try_lock()
            .is_some_and(|state| matches!(*state, State::Finished))
    }

    /// Take the body out, leaving the object finished.
    ///
    /// Used by wrappers that re-wrap an existing generator object.
    /// A running sequence keeps its body.
    pub fn take_body(&self) -> Option<Box<dyn LazySequence>> {
        let mut state = self.state.try_lock()?;
        match std::mem::replace(&mut *state, State::Finished) {
            State::Suspended(body) => Some(body),
            State::Finished => None,
        }
    }
}
