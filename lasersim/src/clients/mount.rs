use std::sync::{Arc, RwLock};

use crate::{
    pose::{local_to_global, Pose},
    traits::PoseProvider,
};

/// Parent body that never moves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedMount(pub Pose);

impl PoseProvider for FixedMount {
    fn local_to_global(&self, local: &Pose) -> Pose {
        local_to_global(&self.0, local)
    }
}

/// Parent body whose global pose is updated from elsewhere, e.g. by the
/// physics step driving a robot.
#[derive(Debug, Clone, Default)]
pub struct SharedMount {
    pose: Arc<RwLock<Pose>>,
}

impl SharedMount {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose: Arc::new(RwLock::new(pose)),
        }
    }

    pub fn set(&self, pose: Pose) {
        *self.pose.write().unwrap() = pose;
    }

    pub fn get(&self) -> Pose {
        *self.pose.read().unwrap()
    }
}

impl PoseProvider for SharedMount {
    fn local_to_global(&self, local: &Pose) -> Pose {
        local_to_global(&self.get(), local)
    }
}
