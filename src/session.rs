//! The bundle of capabilities a command body runs against.

use crate::ports::{CodeHost, Console, SettingsStore, VersionControl};
use std::rc::Rc;

/// Everything a workflow command needs to touch the outside world.
///
/// Built once by the composition root in `main` with real adapters; tests
/// build one over fakes. Shared `Rc` handles because the whole process is
/// single-threaded and tests keep a handle for assertions.
pub struct Session {
    pub git: Rc<dyn VersionControl>,
    pub host: Rc<dyn CodeHost>,
    pub settings: Rc<dyn SettingsStore>,
    pub console: Rc<dyn Console>,
}
