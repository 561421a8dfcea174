//! The reluctant "No" control.
//!
//! Everything visible about the control is a function of how many times it
//! has been rejected. The only randomness is positional and rotational
//! jitter, drawn from an injected generator so tests can pin it.
//!
//! Phases by rejection count (defaults):
//!
//! | count            | phase         | behavior                                   |
//! |------------------|---------------|--------------------------------------------|
//! | 0                | `Resting`     | at origin, full size                       |
//! | 1..=3            | `RunningAway` | jumps within a radius that grows per count |
//! | 4..=5            | `Spinning`    | full turn per count, smaller jumps         |
//! | 6..threshold     | `Pleading`    | stays put, only the text changes           |
//! | >= threshold     | `Converted`   | back at origin, full size, acts as "Yes"   |

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Ordered phrases for the control, indexed by rejection count.
/// Never empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TextLadder(Vec<String>);

impl TextLadder {
    pub fn new(entries: Vec<String>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyTextLadder);
        }
        Ok(Self(entries))
    }

    pub fn single(entry: impl Into<String>) -> Self {
        Self(vec![entry.into()])
    }

    /// Clamps to the last entry.
    pub fn at(&self, count: u32) -> &str {
        let last = self.0.len() - 1;
        let index = usize::try_from(count).map_or(last, |c| c.min(last));
        &self.0[index]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for TextLadder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<String>::deserialize(deserializer)?;
        TextLadder::new(entries).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvasionPhase {
    Resting,
    RunningAway,
    Spinning,
    Pleading,
    Converted,
}

/// Knobs shaping the chase. Defaults follow the shipped experiences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvasionTuning {
    /// Last count of the running-away phase.
    pub run_away_until: u32,
    /// Last count of the spinning phase.
    pub spin_until: u32,
    /// Largest jump, reached at `run_away_until`.
    pub run_radius: (f64, f64),
    pub spin_radius: (f64, f64),
    pub scale_step: f64,
    pub scale_floor: f64,
    /// Random wobble while pleading, in degrees either way.
    pub wobble_degrees: f64,
    /// Counts above this flash the transient evading state.
    pub evade_after: u32,
    pub evade_flash_ms: u32,
    pub yes_growth: f64,
    pub yes_max_scale: f64,
    pub max_strike_marks: u32,
}

impl Default for EvasionTuning {
    fn default() -> Self {
        Self {
            run_away_until: 3,
            spin_until: 5,
            run_radius: (200.0, 100.0),
            spin_radius: (75.0, 40.0),
            scale_step: 0.08,
            scale_floor: 0.4,
            wobble_degrees: 15.0,
            evade_after: 2,
            evade_flash_ms: 300,
            yes_growth: 0.12,
            yes_max_scale: 2.0,
            max_strike_marks: 5,
        }
    }
}

/// Upper bound for jump radii. Keeps the jitter range finite.
pub const MAX_RADIUS_PX: f64 = 2000.0;

impl EvasionTuning {
    /// Rejects knobs that would break the chase, such as a scale curve that
    /// grows again or a jump radius the jitter cannot sample.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius_ok = |r: f64| r.is_finite() && (0.0..=MAX_RADIUS_PX).contains(&r);
        let radii = [self.run_radius.0, self.run_radius.1, self.spin_radius.0, self.spin_radius.1];
        if !radii.into_iter().all(radius_ok) {
            return Err(ConfigError::InvalidTuning("radii must be within 0..=2000"));
        }
        if !(self.wobble_degrees.is_finite() && (0.0..=360.0).contains(&self.wobble_degrees)) {
            return Err(ConfigError::InvalidTuning("wobble_degrees must be within 0..=360"));
        }
        if !(self.scale_step.is_finite() && self.scale_step >= 0.0) {
            return Err(ConfigError::InvalidTuning("scale_step must be non-negative"));
        }
        if !(self.scale_floor > 0.0 && self.scale_floor <= 1.0) {
            return Err(ConfigError::InvalidTuning("scale_floor must be within (0, 1]"));
        }
        if !(self.yes_growth.is_finite() && self.yes_growth >= 0.0) {
            return Err(ConfigError::InvalidTuning("yes_growth must be non-negative"));
        }
        if !(self.yes_max_scale.is_finite() && self.yes_max_scale >= 1.0) {
            return Err(ConfigError::InvalidTuning("yes_max_scale must be at least 1"));
        }
        if self.run_away_until > self.spin_until {
            return Err(ConfigError::InvalidTuning("run_away_until must not exceed spin_until"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ORIGIN: Offset = Offset { x: 0.0, y: 0.0 };
}

/// Everything the view needs to draw the No control.
#[derive(Clone, Debug, PartialEq)]
pub struct NoButtonLook {
    pub display_text: String,
    pub offset: Offset,
    pub rotation_degrees: f64,
    pub scale: f64,
    pub phase: EvasionPhase,
    pub is_converted: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InteractionState {
    rejection_count: u32,
    pub is_transiently_evading: bool,
    look: NoButtonLook,
}

impl InteractionState {
    pub fn rejection_count(&self) -> u32 {
        self.rejection_count
    }

    pub fn look(&self) -> &NoButtonLook {
        &self.look
    }

    pub fn is_converted(&self) -> bool {
        self.look.is_converted
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoGesture {
    Hover,
    Press,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    /// The control dodged; the counter moved up by one.
    Rejected { count: u32 },
    /// The converted control was pressed. Treat as "Yes".
    Accepted,
    /// A hover on an already converted control. Nothing changes.
    Ignored,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvasionPolicy {
    ladder: TextLadder,
    conversion_threshold: u32,
    tuning: EvasionTuning,
}

impl EvasionPolicy {
    pub fn new(ladder: TextLadder, conversion_threshold: u32, tuning: EvasionTuning) -> Self {
        Self {
            ladder,
            conversion_threshold,
            tuning,
        }
    }

    pub fn tuning(&self) -> &EvasionTuning {
        &self.tuning
    }

    pub fn conversion_threshold(&self) -> u32 {
        self.conversion_threshold
    }

    pub fn is_converted(&self, count: u32) -> bool {
        count >= self.conversion_threshold
    }

    pub fn phase(&self, count: u32) -> EvasionPhase {
        let t = &self.tuning;
        if self.is_converted(count) {
            EvasionPhase::Converted
        } else if count == 0 {
            EvasionPhase::Resting
        } else if count <= t.run_away_until {
            EvasionPhase::RunningAway
        } else if count <= t.spin_until {
            EvasionPhase::Spinning
        } else {
            EvasionPhase::Pleading
        }
    }

    /// Shrinking reluctance: non-increasing in `count`, constant at the
    /// floor once reached. Conversion does not change this curve; the
    /// converted look uses full size instead.
    pub fn scale(&self, count: u32) -> f64 {
        let t = &self.tuning;
        (1.0 - f64::from(count) * t.scale_step).max(t.scale_floor)
    }

    /// Rotation before jitter. Accumulates one turn per spinning count and
    /// holds it afterwards until conversion.
    pub fn base_rotation(&self, count: u32) -> f64 {
        if self.is_converted(count) {
            return 0.0;
        }
        let t = &self.tuning;
        let turns = count.min(t.spin_until).saturating_sub(t.run_away_until);
        f64::from(turns) * 360.0
    }

    pub fn display_text(&self, count: u32) -> &str {
        self.ladder.at(count)
    }

    /// Growth of the "Yes" control as the No control gets rejected.
    pub fn yes_scale(&self, count: u32) -> f64 {
        let t = &self.tuning;
        (1.0 + f64::from(count) * t.yes_growth).min(t.yes_max_scale)
    }

    pub fn strike_marks(&self, count: u32) -> u32 {
        let t = &self.tuning;
        if self.is_converted(count) || count > t.max_strike_marks {
            0
        } else {
            count
        }
    }

    pub fn initial_state(&self) -> InteractionState {
        InteractionState {
            rejection_count: 0,
            is_transiently_evading: false,
            look: self.resting_look(),
        }
    }

    fn resting_look(&self) -> NoButtonLook {
        NoButtonLook {
            display_text: self.display_text(0).to_string(),
            offset: Offset::ORIGIN,
            rotation_degrees: 0.0,
            scale: self.scale(0),
            phase: self.phase(0),
            is_converted: self.is_converted(0),
        }
    }

    /// Look at `count`. `previous` supplies the resting position for
    /// phases that stop moving.
    pub fn describe<R: Rng + ?Sized>(
        &self,
        count: u32,
        previous: &NoButtonLook,
        rng: &mut R,
    ) -> NoButtonLook {
        let t = &self.tuning;
        let phase = self.phase(count);
        let (offset, rotation_degrees, scale) = match phase {
            EvasionPhase::Resting => (Offset::ORIGIN, 0.0, self.scale(count)),
            EvasionPhase::RunningAway => {
                let reach = f64::from(count) / f64::from(t.run_away_until.max(1));
                let radius = (t.run_radius.0 * reach, t.run_radius.1 * reach);
                (jitter(rng, radius), 0.0, self.scale(count))
            }
            EvasionPhase::Spinning => {
                (jitter(rng, t.spin_radius), self.base_rotation(count), self.scale(count))
            }
            EvasionPhase::Pleading => {
                let wobble = symmetric(rng, t.wobble_degrees);
                (previous.offset, self.base_rotation(count) + wobble, self.scale(count))
            }
            EvasionPhase::Converted => (Offset::ORIGIN, 0.0, 1.0),
        };

        NoButtonLook {
            display_text: self.display_text(count).to_string(),
            offset,
            rotation_degrees,
            scale,
            phase,
            is_converted: phase == EvasionPhase::Converted,
        }
    }

    /// Applies one gesture on the No control.
    ///
    /// Once converted, a press is an acceptance and the counter stays put;
    /// a hover is ignored so the converted control has to be clicked on
    /// purpose. Otherwise the counter moves up by one and the look is
    /// recomputed with fresh jitter.
    pub fn on_interact<R: Rng + ?Sized>(
        &self,
        state: &mut InteractionState,
        gesture: NoGesture,
        rng: &mut R,
    ) -> Interaction {
        if state.is_converted() {
            return match gesture {
                NoGesture::Press => {
                    info!(count = state.rejection_count, "converted control pressed");
                    Interaction::Accepted
                }
                NoGesture::Hover => Interaction::Ignored,
            };
        }

        let count = state.rejection_count.saturating_add(1);
        state.look = self.describe(count, &state.look, rng);
        state.rejection_count = count;
        state.is_transiently_evading = count > self.tuning.evade_after && !state.look.is_converted;

        if state.look.is_converted {
            info!(count, "no control converted");
        } else {
            debug!(count, phase = ?state.look.phase, "no control rejected");
        }
        Interaction::Rejected { count }
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, reach: f64) -> f64 {
    if reach <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-reach..=reach)
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, (rx, ry): (f64, f64)) -> Offset {
    Offset {
        x: symmetric(rng, rx),
        y: symmetric(rng, ry),
    }
}
