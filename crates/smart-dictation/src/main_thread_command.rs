/// Requests from the runtime thread to the main-thread event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainThreadCommand {
    /// Dictation loops finished; exit cleanly.
    Shutdown,
    /// The runtime could not start; exit with an error.
    Fatal,
}
