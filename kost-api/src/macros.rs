//! Macros for reducing boilerplate in the API crate.

/// Implement `FromRef<AppState>` for a cloneable field of the state.
///
/// # Example
/// ```ignore
/// impl_from_ref!(Arc<AvailabilityService>, service);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<AvailabilityService> {
///     fn from_ref(state: &AppState) -> Self {
///         state.service.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
