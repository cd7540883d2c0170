#![forbid(unsafe_code)]

//! Values tagged with success or failure, for `LiveStateData`.

/// A value or the error that prevented producing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateValue<V, E> {
    Success(V),
    Failure(E),
}

impl<V, E> StateValue<V, E> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The value, if this is a success.
    #[must_use]
    pub fn success(&self) -> Option<&V> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The error, if this is a failure.
    #[must_use]
    pub fn failure(&self) -> Option<&E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> StateValue<U, E> {
        match self {
            Self::Success(value) => StateValue::Success(f(value)),
            Self::Failure(err) => StateValue::Failure(err),
        }
    }

    #[must_use]
    pub fn into_result(self) -> Result<V, E> {
        self.into()
    }
}

impl<V, E> From<Result<V, E>> for StateValue<V, E> {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

impl<V, E> From<StateValue<V, E>> for Result<V, E> {
    fn from(state: StateValue<V, E>) -> Self {
        match state {
            StateValue::Success(value) => Ok(value),
            StateValue::Failure(err) => Err(err),
        }
    }
}
