//! Lazily-produced sequences with an interpreted body.
//!
//! The body runs on its own thread and trades control with the consumer
//! over two rendezvous channels: the body sends each produced value (or its
//! final outcome) and then blocks until the consumer resumes it with the
//! sent value. Closing the sequence drops the consumer's ends; the body's
//! next hand-off then fails and the body unwinds.

use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};
use rtg_ir::{Name, StmtRange};
use rtg_types::{LazySequence, RuntimeError, RuntimeResult, Step, Value};

use super::{Flow, Interpreter};
use crate::errors::sequence_closed;

type Outcome = Result<Step, RuntimeError>;

/// The body side of the hand-off.
pub(super) struct YieldPort {
    produced: Sender<Outcome>,
    resumed: Receiver<Value>,
}

impl YieldPort {
    /// Hand `value` to the consumer and wait for the value it resumes with.
    pub(super) fn yield_value(&self, value: Value) -> RuntimeResult {
        self.produced
            .send(Ok(Step::Yielded(value)))
            .map_err(|_| sequence_closed())?;
        self.resumed.recv().map_err(|_| sequence_closed())
    }
}

enum State {
    /// Not started; the body has not run at all.
    Pending {
        interp: Box<Interpreter>,
        body: StmtRange,
    },
    Running {
        resume: Sender<Value>,
        produced: Receiver<Outcome>,
    },
    Finished,
}

/// Sequence body executing one call of a generator function.
pub(super) struct ThreadedSequence {
    qualname: Name,
    state: State,
}

impl ThreadedSequence {
    pub(super) fn new(qualname: Name, interp: Interpreter, body: StmtRange) -> Self {
        ThreadedSequence {
            qualname,
            state: State::Pending {
                interp: Box::new(interp),
                body,
            },
        }
    }

    fn start(&mut self, mut interp: Box<Interpreter>, body: StmtRange) -> Outcome {
        let (resume, resumed) = bounded(0);
        let (outcome, produced) = bounded(0);
        interp.yields = Some(YieldPort {
            produced: outcome.clone(),
            resumed,
        });
        let qualname = self.qualname;
        thread::Builder::new()
            .name(format!("rtguard-seq-{qualname}"))
            .spawn(move || {
                let result = match interp.exec_block(body) {
                    Ok(Flow::Return(value)) => Ok(Step::Complete(value)),
                    Ok(Flow::Normal) => Ok(Step::Complete(Value::None)),
                    Err(err) => Err(err),
                };
                if outcome.send(result).is_err() {
                    tracing::trace!(sequence = %qualname, "consumer closed before completion");
                }
            })
            .map_err(|err| {
                RuntimeError::new(format!("cannot start sequence {qualname}: {err}"))
            })?;
        self.state = State::Running { resume, produced };
        self.receive()
    }

    fn receive(&mut self) -> Outcome {
        let State::Running { produced, .. } = &self.state else {
            return Ok(Step::Complete(Value::None));
        };
        let outcome = produced.recv().unwrap_or_else(|_| {
            Err(RuntimeError::new(format!(
                "sequence {} stopped without a result",
                self.qualname
            )))
        });
        if !matches!(outcome, Ok(Step::Yielded(_))) {
            self.state = State::Finished;
        }
        outcome
    }
}

impl LazySequence for ThreadedSequence {
    fn resume(&mut self, sent: Value) -> Outcome {
        match std::mem::replace(&mut self.state, State::Finished) {
            State::Pending { interp, body } => {
                if !matches!(sent, Value::None) {
                    self.state = State::Pending { interp, body };
                    return Err(RuntimeError::new(
                        "can't send non-None value to a just-started generator",
                    ));
                }
                self.start(interp, body)
            }
            State::Running { resume, produced } => {
                if resume.send(sent).is_err() {
                    return Err(sequence_closed());
                }
                self.state = State::Running { resume, produced };
                self.receive()
            }
            State::Finished => Ok(Step::Complete(Value::None)),
        }
    }

    fn close(&mut self) {
        tracing::trace!(sequence = %self.qualname, "closing sequence");
        self.state = State::Finished;
    }
}
