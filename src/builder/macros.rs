//! Macros for ergonomic state machine construction.

/// Declare unit states that implement [`State`](crate::State) for any owner.
///
/// Each state gets `Debug`, `Default`, `Clone` and `Copy`. The persisted id is
/// the state's name unless a label is given with `= "label"`.
///
/// # Example
///
/// ```
/// use tickfsm::{declare_states, State, StateId};
///
/// declare_states! {
///     pub Idle,
///     pub Walk = "walking",
/// }
///
/// assert_eq!(<Idle as State<()>>::id(), StateId::new("Idle"));
/// assert_eq!(<Walk as State<()>>::id(), StateId::new("walking"));
/// ```
#[macro_export]
macro_rules! declare_states {
    (@label $name:ident) => {
        $crate::StateId::new(stringify!($name))
    };
    (@label $name:ident, $label:literal) => {
        $crate::StateId::new($label)
    };
    (
        $(
            $(#[$meta:meta])*
            $vis:vis $name:ident $(= $label:literal)?
        ),* $(,)?
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Default, Clone, Copy)]
            $vis struct $name;

            impl<O> $crate::State<O> for $name {
                fn id() -> $crate::StateId {
                    $crate::declare_states!(@label $name $(, $label)?)
                }
            }
        )*
    };
}
