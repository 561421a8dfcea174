use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Listener;
use crate::error::CelebrationError;
use crate::story::celebration::{CelebrationEpisode, CelebrationTrigger, ParticleShape};
use crate::timeline::TaskScope;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinaleSettings {
    pub palette: Vec<String>,
    pub shapes: Vec<ParticleShape>,
    pub piece_count: i64,
    pub burst_ms: i64,
    pub interval_ms: i64,
    pub message_delay_ms: u32,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct FinaleView {
    pub confetti: CelebrationEpisode,
    pub show_message: bool,
}

/// Terminal scene: confetti right away and on repeat, the message shortly
/// after.
#[derive(Clone)]
pub struct FinaleScript {
    scope: TaskScope,
    view: Rc<RefCell<FinaleView>>,
}

impl FinaleScript {
    pub fn start(
        scope: &TaskScope,
        settings: &FinaleSettings,
        rng: StdRng,
        listener: impl Fn(&FinaleView) + 'static,
    ) -> Result<Self, CelebrationError> {
        let listener: Listener<FinaleView> = Rc::new(listener);
        let script = Self {
            scope: scope.child(),
            view: Rc::new(RefCell::new(FinaleView::default())),
        };

        let trigger = CelebrationTrigger::new(
            &script.scope,
            settings.palette.clone(),
            settings.shapes.clone(),
            rng,
        );
        {
            let script = script.clone();
            let listener = listener.clone();
            trigger.on_change(move |episode| {
                let episode = episode.clone();
                script.publish(&listener, |view| view.confetti = episode);
            });
        }

        trigger.trigger_repeating(settings.piece_count, settings.burst_ms, settings.interval_ms)?;

        let reveal = script.clone();
        if script
            .scope
            .spawn_after(settings.message_delay_ms, move || {
                reveal.publish(&listener, |view| view.show_message = true);
            })
            .is_none()
        {
            warn!("finale started in a cancelled scope");
        }
        Ok(script)
    }

    #[cfg(test)]
    pub fn view(&self) -> FinaleView {
        self.view.borrow().clone()
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }

    fn publish(&self, listener: &Listener<FinaleView>, change: impl FnOnce(&mut FinaleView)) {
        if self.scope.is_cancelled() {
            return;
        }
        let view = {
            let mut view = self.view.borrow_mut();
            change(&mut view);
            view.clone()
        };
        listener(&view);
    }
}
