use std::path::Path;

use dirscope_core::nav::Opener;

/// Opens files with the desktop's default application.
///
/// The child is detached so a slow or blocking viewer never holds up the
/// event loop.
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, path: &Path) {
        match open::that_detached(path) {
            Ok(()) => tracing::info!("opened {}", path.display()),
            Err(e) => tracing::warn!("failed to open {}: {e}", path.display()),
        }
    }
}
