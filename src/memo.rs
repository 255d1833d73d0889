use alloc::sync::Arc;
use core::fmt;

/// Compares an `Arc` by pointer identity instead of by value.
///
/// Use it as a memo dependency for values that are replaced (not mutated) on change, such as
/// the visible node sequence: a new instance always counts as a change, even with equal
/// content.
pub struct ByRef<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> ByRef<T> {
    pub fn new(value: &Arc<T>) -> Self {
        Self(Arc::clone(value))
    }
}

impl<T: ?Sized> Clone for ByRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for ByRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> fmt::Debug for ByRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByRef({:p})", Arc::as_ptr(&self.0))
    }
}

pub type MemoOnChange<R> = Arc<dyn Fn(&R) + Send + Sync>;

/// A dependency-tracked cache for one derived value.
///
/// `get` recomputes only when the new dependency tuple differs (by `PartialEq`) from the one
/// the cached result was computed from.
pub struct Memo<D, R> {
    key: &'static str,
    deps: Option<D>,
    result: Option<R>,
    on_change: Option<MemoOnChange<R>>,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    debug: bool,
}

impl<D: PartialEq, R: Clone> Memo<D, R> {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            deps: None,
            result: None,
            on_change: None,
            debug: false,
        }
    }

    /// Seeds the cache so that a first `get`/`update` with `deps` counts as unchanged.
    pub fn with_initial(mut self, deps: D, result: R) -> Self {
        self.deps = Some(deps);
        self.result = Some(result);
        self
    }

    pub fn with_on_change(mut self, on_change: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    /// Logs each recomputation (requires the `tracing` feature).
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn get(&mut self, deps: D, compute: impl FnOnce(&D) -> R) -> R {
        if let (Some(prev), Some(result)) = (&self.deps, &self.result) {
            if *prev == deps {
                return result.clone();
            }
        }

        #[cfg(feature = "tracing")]
        let started = self.debug.then(std::time::Instant::now);

        let result = compute(&deps);

        #[cfg(feature = "tracing")]
        if let Some(started) = started {
            vdebug!(
                key = self.key,
                elapsed_us = started.elapsed().as_micros() as u64,
                "memo recomputed"
            );
        }

        self.deps = Some(deps);
        self.result = Some(result.clone());
        if let Some(cb) = &self.on_change {
            cb(&result);
        }
        result
    }

    /// Records `deps` and reports whether they differ from the previous ones.
    ///
    /// For memos that only gate a side effect (their result is `()`).
    pub fn update(&mut self, deps: D) -> bool
    where
        R: Default,
    {
        let mut changed = false;
        self.get(deps, |_| {
            changed = true;
            R::default()
        });
        changed
    }

    /// Forgets the cached result; the next `get` recomputes.
    pub fn invalidate(&mut self) {
        self.deps = None;
        self.result = None;
    }
}

impl<D, R> fmt::Debug for Memo<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("key", &self.key)
            .field("cached", &self.result.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds a memoized getter from a dependency function and a compute function.
///
/// Each call evaluates `compute_deps`; `compute` runs only when the dependencies changed
/// since the previous call.
///
/// ```
/// use tree_virtualizer::memo;
///
/// let mut calls = 0;
/// let input = 2;
/// let mut square = memo(|| input, |&x: &i32| { calls += 1; x * x });
/// assert_eq!(square(), 4);
/// assert_eq!(square(), 4);
/// drop(square);
/// assert_eq!(calls, 1);
/// ```
pub fn memo<D, R>(
    mut compute_deps: impl FnMut() -> D,
    mut compute: impl FnMut(&D) -> R,
) -> impl FnMut() -> R
where
    D: PartialEq,
    R: Clone,
{
    let mut cache = Memo::new("memo");
    move || cache.get(compute_deps(), |deps| compute(deps))
}
