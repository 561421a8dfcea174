use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use yew::Reducible;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    Entry,
    BuildUp,
    Tease,
    Ask,
    Celebration,
    /// Kept for parity with older flows; nothing advances into it.
    Rejected,
}

impl Scene {
    /// The designated next step on the linear path.
    pub fn successor(self) -> Option<Scene> {
        match self {
            Scene::Entry => Some(Scene::BuildUp),
            Scene::BuildUp => Some(Scene::Tease),
            Scene::Tease => Some(Scene::Ask),
            Scene::Ask => Some(Scene::Celebration),
            Scene::Celebration | Scene::Rejected => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Scene::Celebration | Scene::Rejected)
    }

    fn ordinal(self) -> u8 {
        match self {
            Scene::Entry => 0,
            Scene::BuildUp => 1,
            Scene::Tease => 2,
            Scene::Ask => 3,
            Scene::Celebration => 4,
            Scene::Rejected => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Scene, to: Scene },
    Ignored { current: Scene, requested: Scene },
}

/// Holds the one current scene of a session.
///
/// `advance` does not check the linear path: each scene only ever asks for
/// its own successor. It does refuse to leave a terminal scene and to
/// re-enter a scene that was already shown.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSequencer {
    current: Scene,
    visited: u8,
}

impl Default for SceneSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneSequencer {
    pub fn new() -> Self {
        Self {
            current: Scene::Entry,
            visited: 1 << Scene::Entry.ordinal(),
        }
    }

    pub fn current(&self) -> Scene {
        self.current
    }

    pub fn has_visited(&self, scene: Scene) -> bool {
        self.visited & (1 << scene.ordinal()) != 0
    }

    pub fn advance(&mut self, next: Scene) -> Transition {
        if self.current.is_terminal() || self.has_visited(next) {
            warn!(current = ?self.current, requested = ?next, "ignoring scene transition");
            return Transition::Ignored {
                current: self.current,
                requested: next,
            };
        }

        let from = self.current;
        self.current = next;
        self.visited |= 1 << next.ordinal();
        info!(?from, to = ?next, "scene transition");
        Transition::Moved { from, to: next }
    }
}

impl Reducible for SceneSequencer {
    type Action = Scene;

    fn reduce(self: Rc<Self>, next: Scene) -> Rc<Self> {
        let mut sequencer = (*self).clone();
        match sequencer.advance(next) {
            Transition::Moved { .. } => Rc::new(sequencer),
            Transition::Ignored { .. } => self,
        }
    }
}
