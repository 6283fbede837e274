/// Declares variables named after their bindings, grouped by kind.
///
/// ```
/// use ilp_lowering::{variables, VariableKind};
///
/// variables! {
///     binary: b1, b2;
///     integer: count;
///     real: ratio;
/// }
/// assert_eq!(b2.name(), "b2");
/// assert_eq!(count.kind(), VariableKind::Integer);
/// assert_eq!(ratio.kind(), VariableKind::Real);
/// ```
#[macro_export]
macro_rules! variables {
    () => {};
    ($kind:ident : $($name:ident),+ ; $($rest:tt)*) => {
        $(let $name = $crate::Variable::$kind(stringify!($name));)+
        $crate::variables!($($rest)*);
    };
}
