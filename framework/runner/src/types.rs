/// Recommended error type for your sweep `main` function and any hooks that you write. This type
/// is compatible with the [crate::definition::HookResult] type so you can use `?` to propagate
/// errors.
pub type SweepResult<T> = anyhow::Result<T>;
