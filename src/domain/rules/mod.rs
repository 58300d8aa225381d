// Domain rules - Named thresholds and policies used by the mark engine

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Frames at the very start of a recording that belong to the previous one
pub const IGNORE_AT_START: i32 = 10;

/// Every threshold the mark engine applies.
///
/// Values are in the unit named by the suffix. All of them can be
/// overridden from the configuration file; per-channel fine-tune ranges
/// live in [`ChannelOverride`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // check positions
    /// Search range unit for boundary selection
    pub max_range_secs: i32,
    /// Length assumed when the recording does not declare one
    pub unknown_length_secs: i32,
    /// Start offset used with an unknown length
    pub unknown_length_start_secs: i32,
    /// Start offset used when the recording began after the broadcast
    pub late_start_secs: i32,
    /// Longest plausible pre-timer
    pub pre_timer_max_secs: i32,
    /// Pre-timer used instead of an implausible one
    pub pre_timer_fallback_secs: i32,
    /// Extra seconds added to the assumed stop
    pub astopoffs_secs: i32,
    /// Seconds after the assumed stop before the end is checked
    pub posttimer_secs: i32,

    // online insertion
    pub mark_diff_secs: i32,
    pub mark_diff_before_start_secs: i32,
    pub mark_diff_end_part_secs: i32,

    // logo stop/start pair evaluation
    pub info_logo_min_secs: i32,
    pub info_logo_max_secs: i32,
    pub black_before_stop_min_centis: i64,
    pub black_between_max_centis: i64,
    pub black_after_start_min_centis: i64,
    pub logo_change_min_secs: i32,
    pub logo_change_max_secs: i32,
    pub advertising_min_secs: i32,
    pub next_stop_min_secs: i32,
    pub start_in_broadcast_secs: i32,

    // start selection
    pub channel_stop_noise_secs: i32,
    pub logo_preview_start_stop_secs: i32,
    pub logo_preview_stop_start_secs: i32,
    pub logo_preview_short_secs: i32,
    pub vborder_min_secs: i32,
    pub aspect_logo_stop_secs: i32,
    pub black_before_start_min_ms: i64,
    pub closing_credits_black_distance_secs: i32,
    pub closing_credits_black_min_secs: i32,
    pub hborder_black_snap_secs: i32,
    pub logo_pairs_warn_count: usize,

    // stop selection
    pub logo_end_factor: f64,
    pub channel_stop_first_start_secs: i32,
    pub aspect_stop_logo_secs: i32,
    pub hborder_stop_prev_secs: i32,
    pub logo_stop_start_min_secs: i32,
    pub logo_stop_channel_start_secs: i32,
    pub text_preview_distance_secs: i32,
    pub text_preview_length_secs: i32,
    pub logo_stop_before_secs: i32,
    pub early_logo_stop_secs: i32,
    pub early_logo_stop_ad_after_secs: i32,
    pub weak_stop_range_factor: f64,

    // cleanup
    pub max_ad_secs: i32,
    pub border_pair_min_secs: i32,
    pub logo_gap_min_ms: i64,
    pub logo_gap_broadcast_after_secs: i32,
    pub preview_ad_before_ms: i64,
    pub preview_ad_after_ms: i64,
    pub preview_gap_min_ms: i64,
    pub preview_ad_before_max_ms: i64,
    pub preview_max_secs: i32,
    pub hborder_ad_max_secs: i32,
    pub first_part_weak_secs: i32,
    pub first_part_strong_secs: i32,
    pub last_part_min_secs: i32,
    pub last_ad_min_secs: i32,
    pub last_ad_max_secs: i32,
    pub last_assumed_stop_secs: i32,
    pub last_black_stop_secs: i32,
    pub last_logo_stop_secs: i32,
    pub last_other_stop_secs: i32,
    pub short_logo_part_secs: i32,
    pub short_logo_gap_secs: i32,
    pub short_hborder_gap_secs: i32,
    pub short_vborder_gap_secs: i32,

    // overlap
    pub overlap_before_secs: i32,
    pub overlap_after_secs: i32,
    pub overlap_min_secs: i32,
    pub overlap_similar_max: u32,

    // fine tune
    pub closing_credits_secs: i32,
    /// Search range for an introduction logo before a logo start
    pub intro_search_secs: i32,
    /// Search range for advertising in frame after a logo start
    pub ad_in_frame_start_secs: i32,
    /// Search range for advertising in frame before a logo stop
    pub ad_in_frame_stop_secs: i32,
    /// A longer black screen between introduction logo and logo start keeps the start
    pub intro_black_inner_max_ms: i64,
    /// Black screen end this close before an introduction logo is used instead
    pub intro_black_before_max_ms: i64,
    pub silence_range_secs: i32,
    pub silence_black_secs: i32,
    pub black_range_ms: i64,
    pub channel_overrides: Vec<ChannelOverride>,
}

/// Fine-tune ranges for channels with fading logos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOverride {
    pub channel: String,
    #[serde(default)]
    pub silence_range_secs: Option<i32>,
    #[serde(default)]
    pub black_range_ms: Option<i64>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_range_secs: 60,
            unknown_length_secs: 100 * 60 * 60,
            unknown_length_start_secs: 120,
            late_start_secs: 360,
            pre_timer_max_secs: 60 * 60,
            pre_timer_fallback_secs: 120,
            astopoffs_secs: 0,
            posttimer_secs: 600,

            mark_diff_secs: 30,
            mark_diff_before_start_secs: 2,
            mark_diff_end_part_secs: 15,

            info_logo_min_secs: 7,
            info_logo_max_secs: 17,
            black_before_stop_min_centis: 200,
            black_between_max_centis: 28,
            black_after_start_min_centis: 2000,
            logo_change_min_secs: 10,
            logo_change_max_secs: 21,
            advertising_min_secs: 300,
            next_stop_min_secs: 7,
            start_in_broadcast_secs: 240,

            channel_stop_noise_secs: 30,
            logo_preview_start_stop_secs: 55,
            logo_preview_stop_start_secs: 76,
            logo_preview_short_secs: 10,
            vborder_min_secs: 122,
            aspect_logo_stop_secs: 4,
            black_before_start_min_ms: 800,
            closing_credits_black_distance_secs: 67,
            closing_credits_black_min_secs: 5,
            hborder_black_snap_secs: 6,
            logo_pairs_warn_count: 3,

            logo_end_factor: 2.7,
            channel_stop_first_start_secs: 305,
            aspect_stop_logo_secs: 111,
            hborder_stop_prev_secs: 476,
            logo_stop_start_min_secs: 9,
            logo_stop_channel_start_secs: 20,
            text_preview_distance_secs: 13,
            text_preview_length_secs: 4,
            logo_stop_before_secs: 14,
            early_logo_stop_secs: 218,
            early_logo_stop_ad_after_secs: 33,
            weak_stop_range_factor: 1.1,

            max_ad_secs: 3600,
            border_pair_min_secs: 120,
            logo_gap_min_ms: 520,
            logo_gap_broadcast_after_secs: 203,
            preview_ad_before_ms: 1360,
            preview_ad_after_ms: 2160,
            preview_gap_min_ms: 520,
            preview_ad_before_max_ms: 585_000,
            preview_max_secs: 111,
            hborder_ad_max_secs: 130,
            first_part_weak_secs: 96,
            first_part_strong_secs: 8,
            last_part_min_secs: 15,
            last_ad_min_secs: 2,
            last_ad_max_secs: 163,
            last_assumed_stop_secs: 389,
            last_black_stop_secs: 351,
            last_logo_stop_secs: 306,
            last_other_stop_secs: 300,
            short_logo_part_secs: 38,
            short_logo_gap_secs: 23,
            short_hborder_gap_secs: 20,
            short_vborder_gap_secs: 2,

            overlap_before_secs: 120,
            overlap_after_secs: 300,
            overlap_min_secs: 4,
            overlap_similar_max: 4,

            closing_credits_secs: 25,
            intro_search_secs: 30,
            ad_in_frame_start_secs: 35,
            ad_in_frame_stop_secs: 45,
            intro_black_inner_max_ms: 1000,
            intro_black_before_max_ms: 3520,
            silence_range_secs: 5,
            silence_black_secs: 1,
            black_range_ms: 4270,
            channel_overrides: default_channel_overrides(),
        }
    }
}

fn default_channel_overrides() -> Vec<ChannelOverride> {
    vec![
        ChannelOverride {
            channel: "DMAX".to_string(),
            silence_range_secs: Some(12),
            black_range_ms: None,
        },
        ChannelOverride {
            channel: "TELE_5".to_string(),
            silence_range_secs: Some(7),
            black_range_ms: Some(5500),
        },
        ChannelOverride {
            channel: "Nickelodeon".to_string(),
            silence_range_secs: Some(7),
            black_range_ms: Some(5500),
        },
        ChannelOverride {
            channel: "Disney_Channel".to_string(),
            silence_range_secs: None,
            black_range_ms: Some(5500),
        },
    ]
}

impl Tuning {
    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_range_secs <= 0 {
            return Err(DomainError::BadArgs("max_range_secs must be positive".to_string()));
        }
        if self.info_logo_min_secs > self.info_logo_max_secs {
            return Err(DomainError::BadArgs(format!(
                "info logo window is empty: {}..{}s",
                self.info_logo_min_secs, self.info_logo_max_secs
            )));
        }
        if self.logo_change_min_secs > self.logo_change_max_secs {
            return Err(DomainError::BadArgs(format!(
                "logo change window is empty: {}..{}s",
                self.logo_change_min_secs, self.logo_change_max_secs
            )));
        }
        if !(0..=240).contains(&self.astopoffs_secs) {
            return Err(DomainError::BadArgs(format!(
                "astopoffs must be within 0..=240, got {}",
                self.astopoffs_secs
            )));
        }
        if !(0..=1200).contains(&self.posttimer_secs) {
            return Err(DomainError::BadArgs(format!(
                "posttimer must be within 0..=1200, got {}",
                self.posttimer_secs
            )));
        }
        if self.silence_range_secs < 1 {
            return Err(DomainError::BadArgs("silence_range_secs must be at least 1".to_string()));
        }
        if self.overlap_before_secs <= 0 || self.overlap_after_secs <= 0 {
            return Err(DomainError::BadArgs("overlap ranges must be positive".to_string()));
        }
        Ok(())
    }

    /// Search range in frames
    pub fn delta(&self, fps: FrameRate) -> i32 {
        fps.frames(self.max_range_secs as f64)
    }

    fn channel_override(&self, channel: &str) -> Option<&ChannelOverride> {
        self.channel_overrides.iter().find(|o| o.channel == channel)
    }

    /// Silence search range for a channel
    pub fn silence_range_for(&self, channel: &str) -> i32 {
        self.channel_override(channel)
            .and_then(|o| o.silence_range_secs)
            .unwrap_or(self.silence_range_secs)
    }

    /// Black screen snap range for a channel
    pub fn black_range_for(&self, channel: &str) -> i64 {
        self.channel_override(channel)
            .and_then(|o| o.black_range_ms)
            .unwrap_or(self.black_range_ms)
    }

    /// How far before the assumed stop the last ad may be dropped, by type of
    /// the final mark
    pub fn last_stop_window_secs(&self, mark_type: MarkType) -> i32 {
        match mark_type {
            MarkType::ASSUMED_STOP => self.last_assumed_stop_secs,
            MarkType::BLACK_STOP => self.last_black_stop_secs,
            MarkType::LOGO_STOP => self.last_logo_stop_secs,
            _ => self.last_other_stop_secs,
        }
    }
}

/// Minimum distance between two conflicting marks of the same class
pub struct MarkConflictPolicy;

impl MarkConflictPolicy {
    /// Conflict window in seconds for the current stage of processing
    pub fn window_secs(tuning: &Tuning, start_selected: bool, end_part: bool) -> i32 {
        if end_part {
            tuning.mark_diff_end_part_secs
        } else if !start_selected {
            tuning.mark_diff_before_start_secs
        } else {
            tuning.mark_diff_secs
        }
    }

    /// Pick the surviving type of two conflicting marks
    pub fn survivor(existing: MarkType, incoming: MarkType) -> MarkType {
        if existing > incoming {
            existing
        } else {
            incoming
        }
    }
}

#[cfg(test)]
mod tests;
