use tokio::task::JoinHandle;

/// Aborts the wrapped task when dropped.
///
/// Sessions and cursors own their timers and in-flight attempts through this, so
/// replacing or dropping the owner cancels the work.
#[derive(Debug)]
pub(crate) struct AbortOnDrop(JoinHandle<()>);

impl AbortOnDrop {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
