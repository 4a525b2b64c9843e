//! Macros for declaring machine states.

/// Declare a set of [`StateName`](crate::core::StateName) constants.
///
/// Each constant's name doubles as the state's display name, so log lines
/// and error messages match the identifiers used in the definition.
///
/// # Example
///
/// ```
/// use multifsm::state_names;
///
/// state_names! {
///     pub WAITING,
///     /// Retrying after a timeout.
///     RETRYING,
/// }
///
/// assert_eq!(WAITING.as_str(), "WAITING");
/// assert_eq!(RETRYING.to_string(), "RETRYING");
/// ```
#[macro_export]
macro_rules! state_names {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis $name:ident
        ),* $(,)?
    ) => {
        $(
            $(#[$meta])*
            #[allow(dead_code)]
            $vis const $name: $crate::core::StateName = $crate::core::StateName::new(stringify!($name));
        )*
    };
}
