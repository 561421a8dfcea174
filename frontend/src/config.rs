//! Experience configuration.
//!
//! Settings are layered: the flavor preset supplies every default, an
//! optional JSON block embedded in the page overrides it, and URL query
//! parameters override both. [`ExperienceConfig::resolve`] validates the
//! result into an immutable [`Experience`].

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::story::celebration::ParticleShape;
use crate::story::evasion::{EvasionPolicy, EvasionTuning, TextLadder};
use crate::story::reveal::{Granularity, RevealSpec};
use crate::story::script::{CaptionStyle, CaptionTiming, ContinueMode, FinaleSettings};

pub const DEFAULT_RECIPIENT: &str = "My Love";
pub const DEFAULT_SENDER: &str = "Your Secret Admirer";
pub const DEFAULT_CONVERSION_THRESHOLD: u32 = 8;

/// Id of the `<script type="application/json">` block read at startup.
pub const CONFIG_ELEMENT_ID: &str = "experience-config";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Doodle,
    Paper,
    Minimal,
}

impl FromStr for Flavor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doodle" => Ok(Flavor::Doodle),
            "paper" => Ok(Flavor::Paper),
            "minimal" => Ok(Flavor::Minimal),
            other => Err(ConfigError::UnknownFlavor(other.to_string())),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flavor::Doodle => "doodle",
            Flavor::Paper => "paper",
            Flavor::Minimal => "minimal",
        };
        f.write_str(name)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const TEASE: &[&str] = &[
    "So...",
    "I've been thinking...",
    "And I really need to ask you something...",
    "Something that's been on my mind...",
    "For a while now... 💭",
];

const SHY_LADDER: &[&str] = &[
    "Maybe later...",
    "Hmm...",
    "Let me think",
    "Uhh...",
    "Well...",
    "I guess...",
    "OK fine...",
    "You win!",
    "YES! 💖",
];

const CHEEKY_LADDER: &[&str] = &[
    "No 😅",
    "Nope 🙈",
    "Still no? 😢",
    "Really? 💔",
    "Aw cmon! 🥺",
    "Pweease? 🐶",
    "Last chance!",
    "FINE. Yes.",
    "💕 Yes 💕",
];

const CRAYON_PALETTE: &[&str] = &[
    "hsl(350, 70%, 65%)",
    "hsl(15, 80%, 65%)",
    "hsl(45, 90%, 65%)",
    "hsl(280, 40%, 75%)",
    "hsl(350, 80%, 60%)",
    "hsl(0, 0%, 100%)",
];

const BLUSH_PALETTE: &[&str] = &[
    "hsl(350, 80%, 55%)",
    "hsl(340, 65%, 70%)",
    "hsl(350, 50%, 85%)",
    "hsl(45, 90%, 60%)",
    "hsl(15, 60%, 85%)",
];

/// Everything a flavor decides before any user overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct FlavorPreset {
    pub build_up: Vec<String>,
    pub build_up_timing: CaptionTiming,
    pub build_up_mode: ContinueMode,
    pub tease: Vec<String>,
    pub tease_timing: CaptionTiming,
    pub question_granularity: Granularity,
    pub question_unit_delay_ms: u32,
    pub question_start_delay_ms: u32,
    pub text_ladder: Vec<String>,
    pub taunts: Vec<String>,
    pub headline: String,
    pub finale: FinaleSettings,
}

impl Flavor {
    pub fn preset(self) -> FlavorPreset {
        let typed = |granularity| CaptionTiming {
            style: CaptionStyle::Typed {
                unit_delay_ms: 100,
                granularity,
            },
            pause_ms: 2000,
            prompt_pause_ms: 1000,
        };
        let held = CaptionTiming {
            style: CaptionStyle::Held,
            pause_ms: 1800,
            prompt_pause_ms: 1500,
        };
        let finale = |palette: &[&str], shapes: Vec<ParticleShape>, piece_count, burst_ms| {
            FinaleSettings {
                palette: strings(palette),
                shapes,
                piece_count,
                burst_ms,
                interval_ms: 3000,
                message_delay_ms: 500,
            }
        };

        match self {
            Flavor::Doodle => FlavorPreset {
                build_up: strings(&[
                    "Every moment with you feels like magic ✨",
                    "You make my heart skip a beat 💓",
                    "I can't imagine my life without you...",
                ]),
                build_up_timing: typed(Granularity::Character),
                build_up_mode: ContinueMode::Prompt,
                tease: strings(TEASE),
                tease_timing: held,
                question_granularity: Granularity::Character,
                question_unit_delay_ms: 75,
                question_start_delay_ms: 800,
                text_ladder: strings(SHY_LADDER),
                taunts: strings(&[
                    "Hehe, not that easy! 😜",
                    "Are you suuure?",
                    "Think again! 💭",
                    "Really?? 🥺",
                    "But whyyy",
                    "Pleeeease?",
                    "I'll be sad... 😢",
                    "One more chance!",
                    "Pretty please? 🙏",
                    "I know you want to say yes!",
                    "Fine... click me 😏",
                ]),
                headline: "Yay! 🎉".to_string(),
                finale: finale(
                    CRAYON_PALETTE,
                    vec![
                        ParticleShape::Heart,
                        ParticleShape::Circle,
                        ParticleShape::Square,
                        ParticleShape::Star,
                    ],
                    80,
                    4500,
                ),
            },
            Flavor::Paper => FlavorPreset {
                build_up: strings(&[
                    "Every moment with you feels like magic ✨",
                    "Your smile lights up my whole world 🌟",
                    "I think about you all the time...",
                    "And I have something really important to ask you...",
                ]),
                build_up_timing: typed(Granularity::Character),
                build_up_mode: ContinueMode::Auto,
                tease: strings(TEASE),
                tease_timing: held,
                question_granularity: Granularity::Character,
                question_unit_delay_ms: 75,
                question_start_delay_ms: 800,
                text_ladder: strings(CHEEKY_LADDER),
                taunts: strings(&[
                    "Are you sure? 🥺",
                    "Really really sure? 😢",
                    "The button is getting smaller... 👀",
                    "Please reconsider... 💔",
                    "I'll give you cookies! 🍪",
                    "Pretty pretty please? 🙏",
                    "Look how big the Yes button is! →",
                    "You're breaking my heart! 😭",
                    "One more chance? 💝",
                    "Okay okay... check the No button 👀",
                ]),
                headline: "You made me the happiest person! 💕".to_string(),
                finale: finale(
                    BLUSH_PALETTE,
                    vec![ParticleShape::Heart, ParticleShape::Circle, ParticleShape::Star],
                    50,
                    4000,
                ),
            },
            Flavor::Minimal => FlavorPreset {
                build_up: strings(&[
                    "Every moment with you feels like magic ✨",
                    "I think about you all the time...",
                ]),
                build_up_timing: typed(Granularity::Word),
                build_up_mode: ContinueMode::Auto,
                tease: strings(&TEASE[..2]),
                tease_timing: held,
                question_granularity: Granularity::Word,
                question_unit_delay_ms: 75,
                question_start_delay_ms: 800,
                text_ladder: strings(CHEEKY_LADDER),
                taunts: strings(&["Are you sure?", "Really?", "Think again.", "One more chance?"]),
                headline: "Yay! 💕".to_string(),
                finale: finale(
                    BLUSH_PALETTE,
                    vec![ParticleShape::Heart, ParticleShape::Circle],
                    50,
                    4000,
                ),
            },
        }
    }
}

/// Raw, unvalidated settings. Every field is optional; absent fields fall
/// back to the flavor preset when resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub conversion_threshold: Option<i64>,
    pub text_ladder: Option<Vec<String>>,
    pub flavor: Option<String>,
    pub taunts: Option<Vec<String>>,
    pub nickname: Option<String>,
    pub custom_message: Option<String>,
    pub evasion: Option<EvasionTuning>,
}

/// Resolved settings handed to the experience root.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub flavor: Flavor,
    pub recipient: String,
    pub sender: String,
    pub build_up: Vec<String>,
    pub build_up_timing: CaptionTiming,
    pub build_up_mode: ContinueMode,
    pub tease: Vec<String>,
    pub tease_timing: CaptionTiming,
    pub question: RevealSpec,
    pub policy: Rc<EvasionPolicy>,
    pub taunts: Vec<String>,
    pub headline: String,
    pub message: String,
    pub finale: FinaleSettings,
}

impl Experience {
    pub fn title(&self) -> String {
        format!("For {} 💝", self.recipient)
    }
}

impl ExperienceConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `to`, `from`, `flavor` and `threshold` from a query string,
    /// with or without the leading `?`. Other keys are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut config = Self::default();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = match urlencoding::decode(&raw.replace('+', " ")) {
                Ok(value) => value.into_owned(),
                Err(e) => {
                    warn!("Skipping undecodable query parameter {}: {}", key, e);
                    continue;
                }
            };
            match key {
                "to" => config.recipient_name = Some(value),
                "from" => config.sender_name = Some(value),
                "flavor" => config.flavor = Some(value),
                "threshold" => match value.trim().parse::<i64>() {
                    Ok(n) => config.conversion_threshold = Some(n),
                    Err(_) => warn!("Ignoring non-numeric threshold {:?}", value),
                },
                _ => {}
            }
        }
        config
    }

    /// Fields present in `other` win.
    pub fn merge(self, other: ExperienceConfig) -> Self {
        Self {
            recipient_name: other.recipient_name.or(self.recipient_name),
            sender_name: other.sender_name.or(self.sender_name),
            conversion_threshold: other.conversion_threshold.or(self.conversion_threshold),
            text_ladder: other.text_ladder.or(self.text_ladder),
            flavor: other.flavor.or(self.flavor),
            taunts: other.taunts.or(self.taunts),
            nickname: other.nickname.or(self.nickname),
            custom_message: other.custom_message.or(self.custom_message),
            evasion: other.evasion.or(self.evasion),
        }
    }

    /// Embedded JSON block merged with the page's query string. A broken
    /// JSON block is logged and skipped.
    pub fn from_page() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };

        let embedded = window
            .document()
            .and_then(|document| document.get_element_by_id(CONFIG_ELEMENT_ID))
            .and_then(|element| element.text_content())
            .filter(|text| !text.trim().is_empty());
        let base = match embedded.map(|json| Self::from_json(&json)) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                warn!("Ignoring embedded config: {}", e);
                Self::default()
            }
            None => Self::default(),
        };

        let query = window.location().search().unwrap_or_default();
        base.merge(Self::from_query(&query))
    }

    pub fn flavor(&self) -> Result<Option<Flavor>, ConfigError> {
        self.flavor.as_deref().map(Flavor::from_str).transpose()
    }

    fn checked_threshold(&self) -> Result<Option<u32>, ConfigError> {
        match self.conversion_threshold {
            None => Ok(None),
            Some(n) => match u32::try_from(n) {
                Ok(t) if t >= 1 => Ok(Some(t)),
                _ => Err(ConfigError::InvalidThreshold(n)),
            },
        }
    }

    /// Validates and fills in defaults. `route_flavor` wins over the
    /// configured flavor. Invalid fields log a warning and use the preset.
    pub fn resolve(&self, route_flavor: Option<Flavor>) -> Experience {
        let flavor = route_flavor.unwrap_or_else(|| {
            self.flavor().unwrap_or_else(|e| {
                warn!("{}, using {}", e, Flavor::default());
                None
            })
            .unwrap_or_default()
        });
        let preset = flavor.preset();

        let recipient =
            non_blank(&self.recipient_name).unwrap_or_else(|| DEFAULT_RECIPIENT.to_string());
        let sender = non_blank(&self.sender_name).unwrap_or_else(|| DEFAULT_SENDER.to_string());
        let addressee = non_blank(&self.nickname).unwrap_or_else(|| recipient.clone());

        let threshold = self.checked_threshold().unwrap_or_else(|e| {
            warn!("{}, using {}", e, DEFAULT_CONVERSION_THRESHOLD);
            None
        });
        let threshold = threshold.unwrap_or(DEFAULT_CONVERSION_THRESHOLD);

        let ladder = self
            .text_ladder
            .clone()
            .map(TextLadder::new)
            .transpose()
            .unwrap_or_else(|e| {
                warn!("{}, using the {} ladder", e, flavor);
                None
            });
        let ladder = match ladder {
            Some(ladder) => ladder,
            None => {
                TextLadder::new(preset.text_ladder).unwrap_or_else(|_| TextLadder::single("Yes"))
            }
        };

        let tuning = match self.evasion.clone() {
            Some(tuning) => match tuning.validate() {
                Ok(()) => tuning,
                Err(e) => {
                    warn!("{}, using default tuning", e);
                    EvasionTuning::default()
                }
            },
            None => EvasionTuning::default(),
        };
        let policy = EvasionPolicy::new(ladder, threshold, tuning);
        debug!(%flavor, threshold = policy.conversion_threshold(), "experience resolved");

        let question_text = format!("{}, will you be my Valentine?", addressee);
        let question = RevealSpec {
            text: question_text,
            unit_delay_ms: preset.question_unit_delay_ms,
            start_delay_ms: preset.question_start_delay_ms,
            granularity: preset.question_granularity,
        };

        let message = non_blank(&self.custom_message).unwrap_or_else(|| match flavor {
            Flavor::Doodle => format!("{} said YES!", addressee),
            Flavor::Paper | Flavor::Minimal => format!("I knew you'd say yes, {}! 🥰", addressee),
        });

        Experience {
            flavor,
            recipient,
            sender,
            build_up: preset.build_up,
            build_up_timing: preset.build_up_timing,
            build_up_mode: preset.build_up_mode,
            tease: preset.tease,
            tease_timing: preset.tease_timing,
            question,
            policy: Rc::new(policy),
            taunts: self.taunts.clone().unwrap_or(preset.taunts),
            headline: preset.headline,
            message,
            finale: preset.finale,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
