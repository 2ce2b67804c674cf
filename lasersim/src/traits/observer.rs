use auto_impl::auto_impl;

use crate::scan::ScanResult;

/// Notified once per committed scan, and when the published scan is withdrawn.
#[auto_impl(Box, Arc)]
pub trait ScanObserver: Send + Sync {
    fn on_scan(&self, scan: &ScanResult);

    fn on_invalidate(&self) {}
}
