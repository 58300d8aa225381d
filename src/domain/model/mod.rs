// Domain models - Core types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// Whether a mark opens or closes a broadcast section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkClass {
    Start,
    Stop,
}

impl MarkClass {
    /// The other class
    pub fn opposite(self) -> Self {
        match self {
            MarkClass::Start => MarkClass::Stop,
            MarkClass::Stop => MarkClass::Start,
        }
    }
}

impl fmt::Display for MarkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkClass::Start => write!(f, "start"),
            MarkClass::Stop => write!(f, "stop"),
        }
    }
}

/// Trust rank of the source that produced a mark, weakest first.
///
/// When two nearby marks of the same class disagree, the one with the
/// higher strength survives. Picture heuristics (black screen, logo,
/// borders, aspect ratio) rank below audio channel changes and broadcaster
/// VPS signalling; recording boundaries and marks moved by a refinement
/// pass rank above every detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strength {
    /// Synthesized by the engine when no detector fired
    Assumed,
    BlackScreen,
    Logo,
    VBorder,
    HBorder,
    Aspect,
    Channel,
    Vps,
    Recording,
    /// Repositioned by a refinement pass
    Moved,
}

impl Strength {
    /// Upper-case tag used in the marks file
    pub fn tag(&self) -> &'static str {
        match self {
            Strength::Assumed => "ASSUMED",
            Strength::BlackScreen => "BLACK",
            Strength::Logo => "LOGO",
            Strength::VBorder => "VBORDER",
            Strength::HBorder => "HBORDER",
            Strength::Aspect => "ASPECT",
            Strength::Channel => "CHANNEL",
            Strength::Vps => "VPS",
            Strength::Recording => "RECORDING",
            Strength::Moved => "MOVED",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let strength = match tag {
            "ASSUMED" => Strength::Assumed,
            "BLACK" => Strength::BlackScreen,
            "LOGO" => Strength::Logo,
            "VBORDER" => Strength::VBorder,
            "HBORDER" => Strength::HBorder,
            "ASPECT" => Strength::Aspect,
            "CHANNEL" => Strength::Channel,
            "VPS" => Strength::Vps,
            "RECORDING" => Strength::Recording,
            "MOVED" => Strength::Moved,
            _ => return None,
        };
        Some(strength)
    }
}

/// Mark type: detector strength plus start/stop class.
///
/// Ordering compares strength first, so a start sorts before the stop of the
/// same detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkType {
    pub strength: Strength,
    pub class: MarkClass,
}

impl MarkType {
    pub const ASSUMED_START: MarkType = MarkType::new(Strength::Assumed, MarkClass::Start);
    pub const ASSUMED_STOP: MarkType = MarkType::new(Strength::Assumed, MarkClass::Stop);
    /// First frame after a black screen
    pub const BLACK_START: MarkType = MarkType::new(Strength::BlackScreen, MarkClass::Start);
    /// First frame of a black screen
    pub const BLACK_STOP: MarkType = MarkType::new(Strength::BlackScreen, MarkClass::Stop);
    pub const LOGO_START: MarkType = MarkType::new(Strength::Logo, MarkClass::Start);
    pub const LOGO_STOP: MarkType = MarkType::new(Strength::Logo, MarkClass::Stop);
    pub const VBORDER_START: MarkType = MarkType::new(Strength::VBorder, MarkClass::Start);
    pub const VBORDER_STOP: MarkType = MarkType::new(Strength::VBorder, MarkClass::Stop);
    pub const HBORDER_START: MarkType = MarkType::new(Strength::HBorder, MarkClass::Start);
    pub const HBORDER_STOP: MarkType = MarkType::new(Strength::HBorder, MarkClass::Stop);
    pub const ASPECT_START: MarkType = MarkType::new(Strength::Aspect, MarkClass::Start);
    pub const ASPECT_STOP: MarkType = MarkType::new(Strength::Aspect, MarkClass::Stop);
    pub const CHANNEL_START: MarkType = MarkType::new(Strength::Channel, MarkClass::Start);
    pub const CHANNEL_STOP: MarkType = MarkType::new(Strength::Channel, MarkClass::Stop);
    pub const VPS_START: MarkType = MarkType::new(Strength::Vps, MarkClass::Start);
    pub const VPS_STOP: MarkType = MarkType::new(Strength::Vps, MarkClass::Stop);
    pub const RECORDING_START: MarkType = MarkType::new(Strength::Recording, MarkClass::Start);
    pub const RECORDING_STOP: MarkType = MarkType::new(Strength::Recording, MarkClass::Stop);

    /// Create a mark type
    pub const fn new(strength: Strength, class: MarkClass) -> Self {
        Self { strength, class }
    }

    /// Type given to a mark after a refinement pass repositioned it
    pub const fn moved(class: MarkClass) -> Self {
        Self::new(Strength::Moved, class)
    }

    pub fn is_start(&self) -> bool {
        self.class == MarkClass::Start
    }

    pub fn is_stop(&self) -> bool {
        self.class == MarkClass::Stop
    }

    /// Code written to the marks file, e.g. `LOGOSTART`
    pub fn code(&self) -> String {
        let class = match self.class {
            MarkClass::Start => "START",
            MarkClass::Stop => "STOP",
        };
        format!("{}{}", self.strength.tag(), class)
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for MarkType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let (tag, class) = if let Some(tag) = upper.strip_suffix("START") {
            (tag, MarkClass::Start)
        } else if let Some(tag) = upper.strip_suffix("STOP") {
            (tag, MarkClass::Stop)
        } else {
            return Err(DomainError::InvalidFormat(format!("Unknown mark type: {}", s)));
        };
        Strength::from_tag(tag)
            .map(|strength| MarkType::new(strength, class))
            .ok_or_else(|| DomainError::InvalidFormat(format!("Unknown mark type: {}", s)))
    }
}

impl TryFrom<String> for MarkType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MarkType> for String {
    fn from(mark_type: MarkType) -> Self {
        mark_type.code()
    }
}

/// Selects marks by exact type, by detector, by class, or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkFilter {
    Type(MarkType),
    Strength(Strength),
    Class(MarkClass),
    Any,
}

impl MarkFilter {
    /// Check whether a mark type passes this filter
    pub fn matches(&self, mark_type: MarkType) -> bool {
        match self {
            MarkFilter::Type(t) => *t == mark_type,
            MarkFilter::Strength(s) => *s == mark_type.strength,
            MarkFilter::Class(c) => *c == mark_type.class,
            MarkFilter::Any => true,
        }
    }
}

impl From<MarkType> for MarkFilter {
    fn from(mark_type: MarkType) -> Self {
        MarkFilter::Type(mark_type)
    }
}

impl From<Strength> for MarkFilter {
    fn from(strength: Strength) -> Self {
        MarkFilter::Strength(strength)
    }
}

impl From<MarkClass> for MarkFilter {
    fn from(class: MarkClass) -> Self {
        MarkFilter::Class(class)
    }
}

/// A typed, positioned boundary candidate or decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// Frame index in the recording
    pub position: i32,
    pub mark_type: MarkType,
    /// Type before a refinement pass moved the mark
    pub old_type: Option<MarkType>,
    pub comment: Option<String>,
    /// Broadcast state at insertion time
    pub in_broadcast: bool,
}

impl Mark {
    /// Create a new mark
    pub fn new(mark_type: MarkType, position: i32, comment: Option<String>, in_broadcast: bool) -> Self {
        Self {
            position,
            mark_type,
            old_type: None,
            comment,
            in_broadcast,
        }
    }

    pub fn is_start(&self) -> bool {
        self.mark_type.is_start()
    }

    pub fn is_stop(&self) -> bool {
        self.mark_type.is_stop()
    }

    pub fn strength(&self) -> Strength {
        self.mark_type.strength
    }
}

/// Frame rate with the integer conversions used by the mark rules.
///
/// All conversions truncate toward zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FrameRate(pub f64);

impl FrameRate {
    /// Create a frame rate, rejecting non-positive values
    pub fn new(fps: f64) -> Result<Self, DomainError> {
        if !(fps > 0.0) {
            return Err(DomainError::BadArgs(format!("Frame rate must be positive, got {}", fps)));
        }
        Ok(Self(fps))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Frames spanned by a number of seconds
    pub fn frames(&self, secs: f64) -> i32 {
        (secs * self.0) as i32
    }

    /// Frames spanned by a number of milliseconds
    pub fn frames_ms(&self, ms: i64) -> i32 {
        (ms as f64 * self.0 / 1000.0) as i32
    }

    /// Whole seconds spanned by a frame distance
    pub fn secs(&self, frames: i32) -> i32 {
        (frames as f64 / self.0) as i32
    }

    /// Milliseconds spanned by a frame distance
    pub fn millis(&self, frames: i32) -> i64 {
        (1000.0 * frames as f64 / self.0) as i64
    }

    /// Hundredths of a second spanned by a frame distance
    pub fn centis(&self, frames: i32) -> i64 {
        (100.0 * frames as f64 / self.0) as i64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(25.0)
    }
}

/// Display aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const RATIO_4_3: AspectRatio = AspectRatio { num: 4, den: 3 };
    pub const RATIO_16_9: AspectRatio = AspectRatio { num: 16, den: 9 };

    pub fn is_4_3(&self) -> bool {
        *self == Self::RATIO_4_3
    }

    pub fn is_16_9(&self) -> bool {
        *self == Self::RATIO_16_9
    }

    /// The ratio a wrong 4:3/16:9 declaration gets corrected to
    pub fn inverted(&self) -> Self {
        if self.is_16_9() {
            Self::RATIO_4_3
        } else {
            Self::RATIO_16_9
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

impl FromStr for AspectRatio {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidFormat(format!("Invalid aspect ratio: {}", s)))?;
        let num = num
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidFormat(format!("Invalid aspect ratio: {}", s)))?;
        let den = den
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidFormat(format!("Invalid aspect ratio: {}", s)))?;
        if den == 0 {
            return Err(DomainError::InvalidFormat(format!("Invalid aspect ratio: {}", s)));
        }
        Ok(Self { num, den })
    }
}

/// Recording metadata the engine consumes
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingInfo {
    pub fps: FrameRate,
    /// Declared aspect ratio, corrected in place when contradicted by the video
    pub aspect_ratio: Option<AspectRatio>,
    /// H.264 video; SD recordings get the 4:3 aspect handling
    pub hd_video: bool,
    /// Expected broadcast length in seconds, 0 when unknown
    pub length_secs: i32,
    /// Offset of the broadcast start from the recording start, negative when
    /// the recording began late
    pub pre_timer_secs: i32,
    pub channel_name: String,
    /// Declared audio channel count of the main stream
    pub audio_channels: u8,
    pub recording_start: Option<DateTime<Utc>>,
}

impl Default for RecordingInfo {
    fn default() -> Self {
        Self {
            fps: FrameRate::default(),
            aspect_ratio: None,
            hd_video: true,
            length_secs: 0,
            pre_timer_secs: 120,
            channel_name: String::new(),
            audio_channels: 2,
            recording_start: None,
        }
    }
}

/// Kind of broadcaster-signalled VPS event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VpsKind {
    Start,
    PauseStart,
    PauseStop,
    Stop,
}

impl VpsKind {
    /// Line prefix in the VPS event log
    pub fn tag(&self) -> &'static str {
        match self {
            VpsKind::Start => "START:",
            VpsKind::PauseStart => "PAUSE_START:",
            VpsKind::PauseStop => "PAUSE_STOP:",
            VpsKind::Stop => "STOP:",
        }
    }

    /// Class of the mark this event produces
    pub fn class(&self) -> MarkClass {
        match self {
            VpsKind::Start | VpsKind::PauseStop => MarkClass::Start,
            VpsKind::PauseStart | VpsKind::Stop => MarkClass::Stop,
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, VpsKind::PauseStart | VpsKind::PauseStop)
    }
}

/// A VPS event as offset from the recording start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpsEvent {
    pub kind: VpsKind,
    pub offset_secs: i32,
}

/// Raw candidate event emitted by a per-frame detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub position: i32,
    pub mark_type: MarkType,
    #[serde(default)]
    pub aspect_before: Option<AspectRatio>,
    #[serde(default)]
    pub aspect_after: Option<AspectRatio>,
    #[serde(default)]
    pub channels_before: Option<u8>,
    #[serde(default)]
    pub channels_after: Option<u8>,
}

impl CandidateEvent {
    /// Event with no detector-specific details
    pub fn new(mark_type: MarkType, position: i32) -> Self {
        Self {
            position,
            mark_type,
            aspect_before: None,
            aspect_after: None,
            channels_before: None,
            channels_after: None,
        }
    }

    /// Diagnostic comment stored with the mark; starts end with `*`
    pub fn describe(&self) -> String {
        let p = self.position;
        match self.mark_type {
            MarkType::ASSUMED_START => format!("assuming start ({})*", p),
            MarkType::ASSUMED_STOP => format!("assuming stop ({})", p),
            MarkType::BLACK_START => format!("detected end of black screen ({})*", p),
            MarkType::BLACK_STOP => format!("detected start of black screen ({})", p),
            MarkType::LOGO_START => format!("detected logo start ({})*", p),
            MarkType::LOGO_STOP => format!("detected logo stop ({})", p),
            MarkType::HBORDER_START => format!("detected start of horiz. borders ({})*", p),
            MarkType::HBORDER_STOP => format!("detected stop of horiz. borders ({})", p),
            MarkType::VBORDER_START => format!("detected start of vert. borders ({})*", p),
            MarkType::VBORDER_STOP => format!("detected stop of vert. borders ({})", p),
            MarkType::ASPECT_START => match (self.aspect_before, self.aspect_after) {
                (Some(before), Some(after)) => {
                    format!("aspect ratio change from {} to {} ({})*", before, after, p)
                }
                (None, Some(after)) => format!("aspect ratio start with {} ({})*", after, p),
                _ => format!("aspect ratio start ({})*", p),
            },
            MarkType::ASPECT_STOP => match (self.aspect_before, self.aspect_after) {
                (Some(before), Some(after)) => {
                    format!("aspect ratio change from {} to {} ({})", before, after, p)
                }
                _ => format!("aspect ratio stop ({})", p),
            },
            MarkType::CHANNEL_START | MarkType::CHANNEL_STOP => {
                let star = if self.mark_type.is_start() { "*" } else { "" };
                format!(
                    "audio channel change from {} to {} ({}){}",
                    self.channels_before.unwrap_or(0),
                    self.channels_after.unwrap_or(0),
                    p,
                    star
                )
            }
            MarkType::RECORDING_START => format!("start of recording ({})", p),
            MarkType::RECORDING_STOP => format!("stop of recording ({})", p),
            other => format!("{} ({})", other.code().to_lowercase(), p),
        }
    }
}

/// Logo detector verdict for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoState {
    Visible,
    Absent,
    /// Broadcaster info overlay hides the logo
    Info,
    /// A different logo style is shown
    Changed,
    /// Closing credits without logo
    Credits,
    /// Advertising shown in a frame around the broadcast picture
    #[serde(rename = "ad_in_frame")]
    AdInFrame,
    /// Animated introduction logo before the static one
    Intro,
    #[default]
    Unknown,
}

/// Classification of the current frame returned by the decode service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub frame: i32,
    #[serde(default)]
    pub key_frame: bool,
    #[serde(default = "default_true")]
    pub video: bool,
    /// Perceptual hash of the picture, compared by Hamming distance
    #[serde(default)]
    pub fingerprint: Option<u64>,
    #[serde(default)]
    pub logo: LogoState,
    #[serde(default)]
    pub silent: bool,
    /// Observed display aspect ratio
    #[serde(default)]
    pub aspect: Option<AspectRatio>,
    /// Observed audio channel count
    #[serde(default)]
    pub audio_channels: Option<u8>,
    /// Candidate events detectors raised at this frame
    #[serde(default)]
    pub events: Vec<CandidateEvent>,
}

fn default_true() -> bool {
    true
}

impl FrameSample {
    /// Plain video frame without detector output
    pub fn new(frame: i32, key_frame: bool) -> Self {
        Self {
            frame,
            key_frame,
            video: true,
            fingerprint: None,
            logo: LogoState::Unknown,
            silent: false,
            aspect: None,
            audio_channels: None,
            events: Vec::new(),
        }
    }
}

/// Which passes a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSelection {
    /// Pass 1: online boundary detection and cleanup
    pub detect: bool,
    /// Pass 2: overlap refinement
    pub overlap: bool,
    /// Pass 3: silence, black screen and closing credits alignment
    pub fine_tune: bool,
}

impl PassSelection {
    /// Run every pass
    pub fn all() -> Self {
        Self {
            detect: true,
            overlap: true,
            fine_tune: true,
        }
    }

    /// Boundary detection only
    pub fn detect_only() -> Self {
        Self {
            detect: true,
            overlap: false,
            fine_tune: false,
        }
    }

    /// Refinement passes over an existing marks file
    pub fn refine_only() -> Self {
        Self {
            detect: false,
            overlap: true,
            fine_tune: true,
        }
    }
}

impl Default for PassSelection {
    fn default() -> Self {
        Self::all()
    }
}
