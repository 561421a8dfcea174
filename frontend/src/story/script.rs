//! Per-scene choreography.
//!
//! Each script owns a [`TaskScope`](crate::timeline::TaskScope) handed to
//! it by the scene component and reports view snapshots through a
//! listener. The component cancels the scope on unmount, after which a
//! script never calls back again.

pub mod ask;
pub mod captions;
pub mod finale;

pub use ask::{AskScript, AskView};
pub use captions::{CaptionSequence, CaptionStyle, CaptionTiming, CaptionView, ContinueMode};
pub use finale::{FinaleScript, FinaleSettings, FinaleView};

use std::rc::Rc;

pub type Listener<V> = Rc<dyn Fn(&V)>;
