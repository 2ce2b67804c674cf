use auto_impl::auto_impl;

use crate::pose::Pose;

/// Resolves poses given in a body's local frame into the global frame.
#[auto_impl(&, Box, Arc)]
pub trait PoseProvider {
    fn local_to_global(&self, local: &Pose) -> Pose;

    /// Global pose of the body's own origin.
    fn global_pose(&self) -> Pose {
        self.local_to_global(&Pose::default())
    }
}
