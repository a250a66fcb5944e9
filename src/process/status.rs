//! Progress status reporting from a running script to the host.

/// Receives human-readable progress updates.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn set_status(&self, status: &str) {
        self(status)
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn set_status(&self, _status: &str) {}
}
