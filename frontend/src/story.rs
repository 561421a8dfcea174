//! The interactive core: which scene is showing, how text is revealed, how
//! the reluctant "No" control behaves, and the closing confetti.

pub mod celebration;
pub mod evasion;
pub mod reveal;
pub mod script;
pub mod sequencer;
