use std::fmt;
use std::sync::Arc;

type Predicate<T> = dyn Fn(&T) -> bool + Send + Sync;

/// A named predicate over a resource snapshot.
///
/// The name shows up in timeout errors, so it should read like the state
/// being waited for ("has conditions [Ready=True]"), not like a function name.
pub struct Criterion<T> {
    name: String,
    predicate: Arc<Predicate<T>>,
}

impl<T> Criterion<T> {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn matches(&self, snapshot: &T) -> bool {
        (self.predicate)(snapshot)
    }

    /// Evaluate a part of a larger snapshot with this criterion.
    pub fn on<U, F>(self, prefix: &str, project: F) -> Criterion<U>
    where
        T: 'static,
        F: Fn(&U) -> &T + Send + Sync + 'static,
    {
        let predicate = self.predicate;
        Criterion {
            name: format!("{prefix} {}", self.name),
            predicate: Arc::new(move |snapshot: &U| predicate(project(snapshot))),
        }
    }
}

/// Negate a criterion
pub fn not<T: 'static>(criterion: Criterion<T>) -> Criterion<T> {
    let predicate = criterion.predicate;
    Criterion {
        name: format!("not({})", criterion.name),
        predicate: Arc::new(move |snapshot: &T| !predicate(snapshot)),
    }
}

/// Index of the first criterion the snapshot fails, if any.
pub(crate) fn first_failing<T>(criteria: &[Criterion<T>], snapshot: &T) -> Option<usize> {
    criteria.iter().position(|c| !c.matches(snapshot))
}

impl<T> Clone for Criterion<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Criterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criterion").field("name", &self.name).finish()
    }
}
