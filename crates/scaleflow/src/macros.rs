//! Macros for composing steps.

/// Compose steps left to right without spelling out the `Vec`.
///
/// `compose![a, b, c]` is `compose_async(vec![a, b, c])`, so `a` is applied
/// first. With enhancers this reads as the order in which they wrap the base
/// factory.
///
/// # Example
///
/// ```ignore
/// use scaleflow_core::{apply_middleware, apply_plugin, compose, create_core, Options};
///
/// let core = create_core(
///     Options::new(),
///     Some(compose![apply_plugin([attach_x]), apply_middleware([logger])]),
/// );
/// ```
#[macro_export]
macro_rules! compose {
    ($($step:expr),* $(,)?) => {
        $crate::compose_async(::std::vec![$($step),*])
    };
}
