//! The reducer seam wrapped by the rehydrator.

/// A function computing the next state from the current one and an action.
///
/// `None` marks an uninitialized store: the reducer is expected to fall
/// back to its own initial state.
pub trait Reducer<S, A> {
	fn reduce(&self, state: Option<S>, action: &A) -> S;
}

impl<S, A, F> Reducer<S, A> for F
where
	F: Fn(Option<S>, &A) -> S,
{
	fn reduce(&self, state: Option<S>, action: &A) -> S {
		self(state, action)
	}
}
