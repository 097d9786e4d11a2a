use tokio::task::JoinHandle;

/// Background work bound to the live link.
///
/// The manager runs one event reader per link here. A lost link or an explicit disconnect
/// calls [`abort_all`](Self::abort_all), so no reader outlives the link it was reading.
#[derive(Default)]
pub struct TaskManager {
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` and keeps its handle. Handles of readers that already finished
    /// are dropped first.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(future));
    }

    /// Aborts every tracked reader. A reader calling this on itself finishes its
    /// current synchronous section first.
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Number of readers still tracked
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|handle| !handle.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
