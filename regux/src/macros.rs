/// Builds a [`MappedState`](crate::MappedState) from `key => value` pairs.
///
/// ```
/// use regux::{mapped_state, Value};
///
/// let mapped = mapped_state! {
///     "title" => "inbox",
///     "unread" => 3,
/// };
/// assert_eq!(mapped.get("unread"), Some(&Value::Int(3)));
/// ```
#[macro_export]
macro_rules! mapped_state {
    () => {
        $crate::MappedState::new()
    };

    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut mapped = $crate::MappedState::new();
        $(
            mapped.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        mapped
    }};
}
