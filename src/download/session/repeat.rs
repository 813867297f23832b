//! The `repeat_while` loop combinator.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Runs `step` on the state for as long as `predicate` holds, then resolves
/// to the final state. The first error ends the loop.
///
/// Each iteration is driven from the combinator's own `poll`, one step
/// future at a time, so long loops do not nest continuations.
pub fn repeat_while<R, E, P, F, Fut>(predicate: P, step: F, start: R) -> RepeatWhile<R, P, F, Fut>
where
    P: FnMut(&R) -> bool,
    F: FnMut(R) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    RepeatWhile {
        predicate,
        step,
        state: Some(start),
        pending: None,
    }
}

/// Future for the [`repeat_while`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct RepeatWhile<R, P, F, Fut> {
    predicate: P,
    step: F,
    state: Option<R>,
    pending: Option<Pin<Box<Fut>>>,
}

// The step future is boxed and nothing else is pinned structurally.
impl<R, P, F, Fut> Unpin for RepeatWhile<R, P, F, Fut> {}

impl<R, P, F, Fut> fmt::Debug for RepeatWhile<R, P, F, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatWhile")
            .field("in_step", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl<R, E, P, F, Fut> Future for RepeatWhile<R, P, F, Fut>
where
    P: FnMut(&R) -> bool,
    F: FnMut(R) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    type Output = Result<R, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        loop {
            if let Some(pending) = this.pending.as_mut() {
                let outcome = ready!(pending.as_mut().poll(cx));
                this.pending = None;
                match outcome {
                    Ok(next) => this.state = Some(next),
                    Err(e) => return Poll::Ready(Err(e)),
                }
            }

            let Some(state) = this.state.take() else {
                panic!("RepeatWhile polled after completion");
            };
            if !(this.predicate)(&state) {
                return Poll::Ready(Ok(state));
            }
            this.pending = Some(Box::pin((this.step)(state)));
        }
    }
}
