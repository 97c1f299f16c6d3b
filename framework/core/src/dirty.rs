/// Returned by the pre-flight check when jobs from an earlier sweep are still active in the shared
/// namespace.
///
/// Launching on top of them would let two sweeps compete for the same external resources, so the
/// sweep is aborted before anything is materialized or launched.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display(
    "There are {active} active job(s) already running in namespace '{namespace}'. Stop them before starting a new sweep"
)]
pub struct DirtyEnvironmentError {
    pub namespace: String,
    pub active: usize,
}

impl DirtyEnvironmentError {
    pub fn new(namespace: impl Into<String>, active: usize) -> Self {
        Self {
            namespace: namespace.into(),
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_namespace_and_count() {
        let err = DirtyEnvironmentError::new("kuiper_pings", 2);
        assert_eq!(
            err.to_string(),
            "There are 2 active job(s) already running in namespace 'kuiper_pings'. Stop them before starting a new sweep"
        );
    }
}
