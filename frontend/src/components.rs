//! Yew components, one per scene, plus the root that sequences them.
//!
//! Scene components own the timed script for their scene: it is started in
//! a mount effect on a fresh [`TaskScope`](crate::timeline::TaskScope) and
//! cancelled by the effect's cleanup, so nothing fires after unmount.

pub mod ask;
pub mod captions;
pub mod celebration;
pub mod entry;
pub mod experience;

pub use experience::ExperienceRoot;

use yew::prelude::*;

use crate::timeline::SchedulerHandle;

/// Scheduler from the surrounding context, or the browser's if none.
#[hook]
fn use_scheduler() -> SchedulerHandle {
    use_context::<SchedulerHandle>().unwrap_or_else(SchedulerHandle::browser)
}
