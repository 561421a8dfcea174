//! Confetti bursts for the final scene.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CelebrationError;
use crate::timeline::TaskScope;

/// Gap between two bursts so the falling animation restarts from the top.
pub const BURST_GAP_MS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleShape {
    Circle,
    Square,
    Heart,
    Star,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub id: u32,
    /// Horizontal start, percent of the viewport width.
    pub x_percent: f64,
    pub color: String,
    pub shape: ParticleShape,
    pub size_px: f64,
    pub delay_s: f64,
    pub fall_s: f64,
    pub rotation_deg: f64,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct CelebrationEpisode {
    pub active: bool,
    pub pieces: Vec<Particle>,
    pub started_at_ms: u64,
}

impl CelebrationEpisode {
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }
}

type Listener = Rc<dyn Fn(&CelebrationEpisode)>;

struct TriggerInner {
    palette: Vec<String>,
    shapes: Vec<ParticleShape>,
    rng: StdRng,
    episode: CelebrationEpisode,
    /// Scope of the burst currently on screen.
    burst: Option<TaskScope>,
    listener: Option<Listener>,
}

/// Spawns bounded-duration confetti episodes. Only one episode is visible
/// at a time; a new trigger replaces the previous one.
#[derive(Clone)]
pub struct CelebrationTrigger {
    scope: TaskScope,
    inner: Rc<RefCell<TriggerInner>>,
}

fn checked(name: &'static str, value: i64) -> Result<u32, CelebrationError> {
    u32::try_from(value).map_err(|_| CelebrationError::InvalidParameter { name, value })
}

fn checked_positive(name: &'static str, value: i64) -> Result<u32, CelebrationError> {
    match checked(name, value)? {
        0 => Err(CelebrationError::InvalidParameter { name, value }),
        v => Ok(v),
    }
}

impl CelebrationTrigger {
    pub fn new(
        scope: &TaskScope,
        palette: Vec<String>,
        shapes: Vec<ParticleShape>,
        rng: StdRng,
    ) -> Self {
        let palette = if palette.is_empty() {
            vec!["hsl(350, 80%, 60%)".to_string()]
        } else {
            palette
        };
        let shapes = if shapes.is_empty() { vec![ParticleShape::Circle] } else { shapes };
        Self {
            scope: scope.child(),
            inner: Rc::new(RefCell::new(TriggerInner {
                palette,
                shapes,
                rng,
                episode: CelebrationEpisode::default(),
                burst: None,
                listener: None,
            })),
        }
    }

    /// Called with the episode every time pieces appear or clear.
    pub fn on_change(&self, listener: impl Fn(&CelebrationEpisode) + 'static) {
        self.inner.borrow_mut().listener = Some(Rc::new(listener));
    }

    pub fn episode(&self) -> CelebrationEpisode {
        self.inner.borrow().episode.clone()
    }

    /// Shows `piece_count` pieces and clears them after `duration_ms`.
    pub fn trigger(
        &self,
        piece_count: i64,
        duration_ms: i64,
    ) -> Result<EpisodeHandle, CelebrationError> {
        let count = checked("piece_count", piece_count)?;
        let duration = checked_positive("duration_ms", duration_ms)?;
        Ok(self.start_burst(count, duration))
    }

    /// Fires a burst now and again every `interval_ms`, with a short gap
    /// before each new burst.
    pub fn trigger_repeating(
        &self,
        piece_count: i64,
        burst_duration_ms: i64,
        interval_ms: i64,
    ) -> Result<RepeatHandle, CelebrationError> {
        let count = checked("piece_count", piece_count)?;
        let duration = checked_positive("burst_duration_ms", burst_duration_ms)?;
        let interval = checked_positive("interval_ms", interval_ms)?;
        if interval <= BURST_GAP_MS {
            return Err(CelebrationError::InvalidParameter {
                name: "interval_ms",
                value: interval_ms,
            });
        }

        let repeat = RepeatHandle {
            scope: self.scope.child(),
            trigger: self.clone(),
        };
        self.start_burst(count, duration);
        repeat.schedule_next(count, duration, interval);
        Ok(repeat)
    }

    /// Removes all pieces now and stops the pending clear.
    pub fn clear(&self) {
        let burst = self.inner.borrow_mut().burst.take();
        if let Some(burst) = burst {
            burst.cancel();
        }
        self.set_cleared();
    }

    /// Stops everything this trigger started.
    pub fn cancel(&self) {
        self.scope.cancel();
        self.set_cleared();
    }

    fn start_burst(&self, count: u32, duration_ms: u32) -> EpisodeHandle {
        let burst = self.scope.child();
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if let Some(previous) = inner.burst.replace(burst.clone()) {
                previous.cancel();
            }
            let pieces = (0..count).map(|id| inner.particle(id)).collect();
            inner.episode = CelebrationEpisode {
                active: true,
                pieces,
                started_at_ms: self.scope.now_ms(),
            };
            inner.episode.clone()
        };
        debug!(pieces = count, duration_ms, "confetti burst");
        self.notify(&snapshot);

        let trigger = self.clone();
        let ending = burst.clone();
        burst.spawn_after(duration_ms, move || {
            if !ending.is_cancelled() {
                trigger.set_cleared();
            }
        });

        EpisodeHandle {
            scope: burst,
            trigger: self.clone(),
        }
    }

    fn set_cleared(&self) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if !inner.episode.active {
                return;
            }
            inner.episode.active = false;
            inner.episode.pieces.clear();
            inner.episode.clone()
        };
        debug!("confetti cleared");
        self.notify(&snapshot);
    }

    fn notify(&self, episode: &CelebrationEpisode) {
        let listener = self.inner.borrow().listener.clone();
        if let Some(listener) = listener {
            listener(episode);
        }
    }
}

impl TriggerInner {
    fn particle(&mut self, id: u32) -> Particle {
        let color = self.palette[self.rng.gen_range(0..self.palette.len())].clone();
        let shape = self.shapes[self.rng.gen_range(0..self.shapes.len())];
        Particle {
            id,
            x_percent: self.rng.gen_range(0.0..100.0),
            color,
            shape,
            size_px: self.rng.gen_range(8.0..16.0),
            delay_s: self.rng.gen_range(0.0..0.5),
            fall_s: self.rng.gen_range(2.0..4.0),
            rotation_deg: self.rng.gen_range(0.0..360.0),
        }
    }
}

/// One burst. Cancelling clears its pieces immediately.
pub struct EpisodeHandle {
    scope: TaskScope,
    trigger: CelebrationTrigger,
}

impl EpisodeHandle {
    pub fn cancel(&self) {
        if self.scope.is_cancelled() {
            return;
        }
        self.scope.cancel();
        let current = self
            .trigger
            .inner
            .borrow()
            .burst
            .as_ref()
            .is_some_and(|burst| burst.is_cancelled());
        if current {
            self.trigger.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.scope.is_cancelled() && self.trigger.inner.borrow().episode.active
    }
}

/// Repeating bursts. Cancelling stops future bursts and clears the screen.
pub struct RepeatHandle {
    scope: TaskScope,
    trigger: CelebrationTrigger,
}

impl RepeatHandle {
    pub fn cancel(&self) {
        if self.scope.is_cancelled() {
            return;
        }
        self.scope.cancel();
        self.trigger.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }

    fn schedule_next(&self, count: u32, duration_ms: u32, interval_ms: u32) {
        let trigger = self.trigger.clone();
        let scope = self.scope.clone();
        let spawned = self.scope.spawn_after(interval_ms, move || {
            trigger.clear();
            let restart = trigger.clone();
            scope.spawn_after(BURST_GAP_MS, move || {
                restart.start_burst(count, duration_ms);
            });
            RepeatHandle {
                scope: scope.clone(),
                trigger: trigger.clone(),
            }
            .schedule_next(count, duration_ms, interval_ms);
        });
        if spawned.is_none() {
            warn!("repeat scope already cancelled, no further bursts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::VirtualClock;
    use rand::SeedableRng;
    use std::cell::Cell;

    fn trigger(clock: &Rc<VirtualClock>) -> (TaskScope, CelebrationTrigger) {
        let scope = TaskScope::new(clock.clone());
        let trigger = CelebrationTrigger::new(
            &scope,
            vec!["red".into(), "gold".into(), "white".into()],
            vec![ParticleShape::Heart, ParticleShape::Circle],
            StdRng::seed_from_u64(42),
        );
        (scope, trigger)
    }

    #[test]
    fn burst_clears_after_duration() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);

        let handle = t.trigger(50, 4000).unwrap();
        let episode = t.episode();
        assert!(episode.active);
        assert_eq!(episode.piece_count(), 50);
        assert!(handle.is_active());

        clock.advance_to(3999);
        assert!(t.episode().active);
        clock.advance_to(4001);
        assert!(!t.episode().active);
        assert_eq!(t.episode().piece_count(), 0);
        assert!(!handle.is_active());
    }

    #[test]
    fn particles_stay_within_bounds() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);
        t.trigger(200, 1000).unwrap();

        for p in t.episode().pieces {
            assert!((0.0..100.0).contains(&p.x_percent));
            assert!((2.0..4.0).contains(&p.fall_s));
            assert!((0.0..360.0).contains(&p.rotation_deg));
            assert!(["red", "gold", "white"].contains(&p.color.as_str()));
            assert!(matches!(p.shape, ParticleShape::Heart | ParticleShape::Circle));
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);

        assert_eq!(
            t.trigger(-1, 4000).err(),
            Some(CelebrationError::InvalidParameter { name: "piece_count", value: -1 })
        );
        assert!(t.trigger(10, 0).is_err());
        assert!(t.trigger(10, -5).is_err());
        assert!(t.trigger_repeating(10, 1000, 100).is_err());
        assert!(t.trigger_repeating(10, -1, 3000).is_err());
        assert!(!t.episode().active);
    }

    #[test]
    fn zero_pieces_is_an_empty_episode() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);
        t.trigger(0, 100).unwrap();
        assert!(t.episode().active);
        assert_eq!(t.episode().piece_count(), 0);
    }

    #[test]
    fn repeating_bursts_restart_after_gap() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);
        let bursts = Rc::new(Cell::new(0));
        let seen = bursts.clone();
        t.on_change(move |e| {
            if e.active {
                seen.set(seen.get() + 1);
            }
        });

        let repeat = t.trigger_repeating(80, 4500, 3000).unwrap();
        assert_eq!(bursts.get(), 1);

        clock.advance_to(3000);
        assert!(!t.episode().active);
        clock.advance_to(3100);
        assert!(t.episode().active);
        assert_eq!(t.episode().started_at_ms, 3100);
        assert_eq!(bursts.get(), 2);

        clock.advance_to(6100);
        assert_eq!(bursts.get(), 3);

        repeat.cancel();
        assert!(!t.episode().active);
        clock.advance_to(30_000);
        assert_eq!(bursts.get(), 3);
        assert!(!t.episode().active);
    }

    #[test]
    fn cancelling_owner_scope_stops_repeats() {
        let clock = VirtualClock::new();
        let (scope, t) = trigger(&clock);
        let repeat = t.trigger_repeating(10, 500, 1000).unwrap();

        scope.cancel();
        clock.advance_to(10_000);

        assert!(repeat.is_cancelled());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn new_trigger_replaces_previous_episode() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);
        t.trigger(5, 1000).unwrap();
        clock.advance_to(800);
        t.trigger(7, 1000).unwrap();

        clock.advance_to(1001);
        assert!(t.episode().active);
        assert_eq!(t.episode().piece_count(), 7);
        clock.advance_to(1800);
        assert!(!t.episode().active);
    }

    #[test]
    fn episode_handle_cancel_clears_now() {
        let clock = VirtualClock::new();
        let (_scope, t) = trigger(&clock);
        let handle = t.trigger(5, 1000).unwrap();
        handle.cancel();
        handle.cancel();
        assert!(!t.episode().active);
        assert_eq!(clock.pending(), 0);
    }
}
