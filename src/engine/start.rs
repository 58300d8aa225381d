//! Broadcast start selection

use tracing::{debug, info, warn};

use super::session::Session;
use crate::domain::model::*;
use crate::domain::rules::IGNORE_AT_START;
use crate::ports::LogoSectionPort;

fn channel_layout(channels: u8) -> &'static str {
    match channels {
        1 => "mono",
        2 => "stereo",
        6 => "dd5.1",
        _ => "??",
    }
}

impl Session {
    /// Select the start mark once enough of the recording was seen.
    ///
    /// Detectors are tried from strongest to weakest; the first accepted
    /// mark becomes the begin, everything before it is deleted.
    pub(crate) fn check_start(&mut self, sections: &mut dyn LogoSectionPort) {
        info!(
            "Checking start at frame ({}), assumed start ({})",
            self.frame_current, self.positions.i_start_a
        );
        self.debug_marks("Marks before start selection");

        let delta = self.delta();
        let fps = self.fps();
        let mut hborder_stop_position: Option<i32> = None;

        let mut begin = self
            .marks
            .around(delta, 1, MarkType::RECORDING_START.into())
            .map(|m| m.position);
        if let Some(position) = begin {
            debug!("Recording start ({}) found, recording is incomplete", position);
            if let Some(stop) = self.marks.next(0, MarkType::CHANNEL_STOP.into()).map(|m| m.position) {
                if fps.secs(stop) < self.tuning.channel_stop_noise_secs
                    && self.marks.count(MarkType::CHANNEL_START.into()) == 0
                {
                    debug!("Delete channel stop ({}) without start mark", stop);
                    self.marks.delete(stop);
                }
            }
        }

        begin = self.select_channel_start(begin);
        if begin.is_none() {
            begin = self.select_aspect_start();
        }
        if begin.is_none() {
            begin = self.select_hborder_start(&mut hborder_stop_position);
        }
        if begin.is_none() {
            begin = self.select_vborder_start();
        }
        if begin.is_none() {
            begin = self.select_logo_start(sections);
        }

        if let Some(position) = begin {
            let is_recording_start = self.mark_type_at(position) == Some(MarkType::RECORDING_START);
            if !is_recording_start && position <= IGNORE_AT_START {
                debug!("Start mark ({}) dropped, it is too early", position);
                begin = None;
            }
        }

        if begin.is_none() {
            begin = self.select_any_start();
        }

        if let Some(position) = begin {
            let is_recording_start = self.mark_type_at(position) == Some(MarkType::RECORDING_START);
            if !is_recording_start && fps.secs(position) < 1 {
                debug!("Start mark ({}) dropped, it is in the first second", position);
                begin = None;
            }
        }

        if let Some(position) = begin {
            if self.mark_type_at(position) == Some(MarkType::BLACK_START) {
                begin = Some(self.skip_closing_credits(position));
            }
        }

        let begin_type = match begin {
            Some(position) => self.accept_start(position),
            None => {
                self.fallback_start(hborder_stop_position);
                None
            }
        };

        if let (Some(position), Some(MarkType::HBORDER_START)) = (begin, begin_type) {
            if let Some(black) = self
                .black_marks
                .next(position, MarkType::BLACK_START.into())
                .map(|m| m.position)
            {
                let diff = fps.secs(black - position);
                debug!("Black screen ({}) after horizontal border start, distance {}s", black, diff);
                if diff <= self.tuning.hborder_black_snap_secs {
                    self.marks.move_mark(position, black, "black screen");
                }
            }
        }

        let pairs = self.marks.logo_stop_start_pairs();
        if begin.is_some() && pairs >= self.tuning.logo_pairs_warn_count {
            warn!(
                "{} logo stop/start pairs found after start mark, logo detection looks unreliable",
                pairs
            );
        }

        self.positions.i_start = 0;
        self.save();
        self.debug_marks("Marks after start selection");
    }

    fn mark_type_at(&self, position: i32) -> Option<MarkType> {
        self.marks.get(position).map(|m| m.mark_type)
    }

    fn delete_strengths(&mut self, strengths: &[Strength]) {
        for strength in strengths {
            self.marks.delete_type((*strength).into());
        }
    }

    fn select_channel_start(&mut self, mut begin: Option<i32>) -> Option<i32> {
        let delta = self.delta();
        let positions = self.positions;

        if let Some(observed) = self.audio_channels {
            if self.info.audio_channels != observed {
                info!(
                    "Audio description in info ({}) wrong, we have {}",
                    channel_layout(self.info.audio_channels),
                    channel_layout(observed)
                );
            }
            self.info.audio_channels = observed;
        }

        let channels = self.info.audio_channels;
        if channels == 6 {
            info!("Dolby Digital 5.1 audio with 6 channels detected");
            if self.channel_change {
                debug!("Channel change detected, disable logo, border and aspect detection");
                self.detectors.disable_video();
                self.detectors.ignore_aspect = true;
                self.marks.delete_type(Strength::Aspect.into());

                begin = self
                    .marks
                    .around(3 * delta, positions.i_start_a, MarkType::CHANNEL_START.into())
                    .map(|m| m.position);
                match begin {
                    None => debug!("No audio channel start mark found"),
                    Some(position) if position > positions.i_stop_a => {
                        debug!("Audio channel start ({}) after assumed stop is not valid", position);
                        begin = None;
                    }
                    Some(position) => {
                        debug!("Audio channel start mark found at ({})", position);
                        if self.marks.next(position, MarkType::HBORDER_START.into()).is_some()
                            || self.marks.next(position, MarkType::VBORDER_START.into()).is_some()
                        {
                            self.has_border = true;
                        }
                        self.delete_strengths(&[Strength::Logo, Strength::HBorder, Strength::VBorder]);
                    }
                }
            } else {
                debug!("No audio channel change found till now, keep logo, border and aspect detection");
            }
        } else if channels > 0 {
            info!("Broadcast with {} audio channels", channels);
            if self.in_broadcast {
                self.detectors.ignore_aspect = false;
                self.detectors.ignore_logo = false;
                self.detectors.ignore_black = false;
            }
        }

        if begin.is_some() && self.in_broadcast {
            if let Some(aspect) = self.video_aspect {
                self.info.aspect_ratio = Some(aspect);
                info!("Video with aspect ratio of {} detected", aspect);
            }
            self.aspect_checked = true;
        }
        if begin.is_none() && self.in_broadcast {
            let channel_start = self.marks.next(0, MarkType::CHANNEL_START.into()).map(|m| m.position);
            let channel_stop = self.marks.last(MarkType::CHANNEL_STOP.into()).map(|m| m.position);
            if let (Some(start), Some(stop)) = (channel_start, channel_stop) {
                if start > stop {
                    debug!("Channel start after channel stop, delete weak marks between");
                    self.marks.delete_weak_in_range(stop, start, Strength::Channel);
                }
            }
        }
        if begin.is_none() && !self.in_broadcast {
            debug!(
                "Not in broadcast at frame ({}), try to find a channel start anyway",
                self.frame_current
            );
            begin = self
                .marks
                .around(4 * delta, positions.i_start_a, MarkType::CHANNEL_START.into())
                .map(|m| m.position);
            if begin.is_some() {
                if let Some(last_stop) = self.marks.last(MarkType::CHANNEL_STOP.into()) {
                    if last_stop.position <= positions.chk_start {
                        debug!(
                            "Last channel stop ({}) is too early, channel marks are from previous recording",
                            last_stop.position
                        );
                        begin = None;
                    }
                }
            }
        }

        if begin.is_some() {
            self.marks.delete_weak_in_range(0, i32::MAX, Strength::Channel);
        } else {
            let channel_start = self.marks.next(0, MarkType::CHANNEL_START.into());
            let channel_stop = self.marks.next(0, MarkType::CHANNEL_STOP.into()).map(|m| m.position);
            if let (None, Some(position)) = (channel_start, channel_stop) {
                debug!(
                    "Channel stop ({}) without start mark, assume start of the following recording",
                    position
                );
                self.marks.delete(position);
                self.marks.add(
                    MarkType::ASSUMED_START,
                    position,
                    Some(format!("assumed start from channel stop ({})", position)),
                    false,
                );
                begin = Some(position);
            }
        }
        begin
    }

    fn select_aspect_start(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let positions = self.positions;
        let mut begin = None;

        if self.info.aspect_ratio.is_none() {
            info!("No video aspect ratio found in recording info");
            self.info.aspect_ratio = self.video_aspect;
        }

        let aspect_start = self
            .marks
            .around(positions.chk_start, positions.chk_start + IGNORE_AT_START, MarkType::ASPECT_START.into())
            .map(|m| m.position);
        let (stop_after, stop_before) = match aspect_start {
            Some(start) => (
                self.marks.next(start, MarkType::ASPECT_STOP.into()).map(|m| m.position),
                self.marks.prev(start, MarkType::ASPECT_STOP.into()).map(|m| m.position),
            ),
            None => (None, None),
        };
        let early_change = aspect_start.is_some() && stop_after.is_some();
        if early_change {
            debug!("Very early aspect ratio change at ({:?}) and ({:?})", aspect_start, stop_after);
        }

        let first_stop = self.marks.next(0, MarkType::ASPECT_STOP.into()).map(|m| m.position);
        let stop_near_end = first_stop.is_some_and(|p| p as f64 > positions.i_stop_a as f64 * 0.8);
        if aspect_start.is_none() && stop_near_end {
            debug!("First aspect ratio stop ({:?}) near assumed end, we are in next broadcast", first_stop);
        } else {
            let declared = self.info.aspect_ratio;
            let mut wrong_info = false;
            if declared.is_some_and(|a| a.is_16_9()) {
                if aspect_start.is_some() && stop_before.is_some_and(|p| p > 0) {
                    debug!("Aspect ratio changes 16:9 -> 4:3 -> 16:9, info can not be 16:9");
                    wrong_info = true;
                }
                if !wrong_info && self.video_aspect.is_some_and(|a| a.is_4_3()) && self.in_broadcast {
                    debug!("Info tells 16:9 but we are in broadcast with 4:3");
                    wrong_info = true;
                }
                if let (Some(start), false) = (aspect_start, wrong_info) {
                    if let Some(logo_stop) = self.marks.prev(start, MarkType::LOGO_STOP.into()).map(|m| m.position) {
                        if fps.secs(start - logo_stop) <= self.tuning.aspect_logo_stop_secs {
                            debug!(
                                "Logo stop ({}) short before aspect ratio start ({}), info is wrong",
                                logo_stop, start
                            );
                            if stop_before == Some(0) {
                                self.marks.delete(0);
                            }
                            wrong_info = true;
                        }
                    }
                }
            }

            let differs = matches!((declared, self.video_aspect), (Some(d), Some(v)) if d != v);
            if wrong_info || (!early_change && differs) {
                self.invert_aspect_marks();
            }
        }

        let declared = self.info.aspect_ratio;
        let aspect_text = declared.map(|a| a.to_string()).unwrap_or_else(|| "unknown".to_string());
        if self.info.hd_video {
            info!("HD video with aspect ratio of {} detected", aspect_text);
        } else {
            info!("SD video with aspect ratio of {} detected", aspect_text);
            if declared.is_some_and(|a| a.is_4_3()) {
                info!("Logo and border detection disabled");
                self.detectors.disable_video();
                self.detectors.ignore_aspect = false;
                self.marks.delete_type(Strength::Channel.into());

                begin = self
                    .marks
                    .around(4 * delta, positions.i_start_a, MarkType::ASPECT_START.into())
                    .map(|m| m.position);
                match begin {
                    Some(position) if position > positions.i_start_a / 4 => {
                        debug!("Aspect ratio start ({}) is valid, delete logo and border marks", position);
                        self.delete_strengths(&[Strength::Logo, Strength::HBorder, Strength::VBorder]);
                        self.detectors.ignore_hborder = true;
                        self.detectors.ignore_vborder = true;
                    }
                    Some(position) => {
                        if self.marks.next(position, MarkType::ASPECT_STOP.into()).is_none() {
                            debug!("Aspect ratio start ({}) is not valid, ignoring", position);
                            self.marks.delete(position);
                            begin = None;
                        }
                        if begin.is_some_and(|p| p <= IGNORE_AT_START) {
                            debug!("Only got initial aspect ratio start, ignoring");
                            begin = None;
                        }
                    }
                    None => debug!("No aspect ratio start found"),
                }
            } else {
                begin = self
                    .marks
                    .around(3 * delta, positions.i_start_a, MarkType::ASPECT_START.into())
                    .map(|m| m.position);
                if let Some(position) = begin {
                    debug!("Aspect ratio start ({}) found, previous recording was 4:3", position);
                    let later_vborder = self
                        .marks
                        .around(delta, position, MarkType::VBORDER_START.into())
                        .is_some_and(|m| m.position > position);
                    let later_logo = self
                        .marks
                        .around(4 * delta, position, MarkType::LOGO_START.into())
                        .is_some_and(|m| m.position > position);
                    if later_vborder {
                        debug!("Later vertical border start found, do not use aspect ratio start");
                        begin = None;
                    } else if later_logo {
                        debug!("Later logo start found, do not use aspect ratio start");
                        begin = None;
                    }
                }
            }
        }

        self.aspect_checked = true;
        if begin.is_some() && self.info.aspect_ratio.is_some_and(|a| a.is_4_3()) {
            self.marks.delete_weak_in_range(0, i32::MAX, Strength::Aspect);
        }
        begin
    }

    /// Correct a wrong declared aspect ratio and swap aspect start and stop
    /// marks to match it
    fn invert_aspect_marks(&mut self) {
        let corrected = match self.info.aspect_ratio {
            Some(a) if a.is_16_9() => AspectRatio::RATIO_4_3,
            _ => AspectRatio::RATIO_16_9,
        };
        info!(
            "Video aspect description in info ({}) wrong, correct to ({})",
            self.info
                .aspect_ratio
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            corrected
        );
        self.info.aspect_ratio = Some(corrected);

        let aspect_marks = self.marks.delete_type(Strength::Aspect.into());
        for mark in aspect_marks {
            let (new_type, new_position) = if mark.is_start() {
                let position = self
                    .keyframes
                    .keyframe_before(mark.position - 1)
                    .unwrap_or(mark.position - 1);
                (MarkType::ASPECT_STOP, position)
            } else {
                let position = self
                    .keyframes
                    .keyframe_after(mark.position + 1)
                    .unwrap_or(mark.position + 1);
                (MarkType::ASPECT_START, position)
            };
            debug!(
                "Invert aspect mark ({}) {} to ({}) {}",
                mark.position, mark.mark_type, new_position, new_type
            );
            self.marks.add(new_type, new_position, mark.comment, mark.in_broadcast);
        }
    }

    fn select_hborder_start(&mut self, hborder_stop_position: &mut Option<i32>) -> Option<i32> {
        let delta = self.delta();
        let center = self.positions.i_start_a + delta;
        let mut begin = None;

        match self
            .marks
            .around(center, center, MarkType::HBORDER_START.into())
            .map(|m| m.position)
        {
            Some(start) => {
                debug!("Horizontal border start found at ({})", start);
                let stop = self.marks.next(start, MarkType::HBORDER_STOP.into()).map(|m| m.position);
                match stop {
                    Some(stop) if stop - start < 2 * delta => {
                        debug!(
                            "Horizontal border stop ({}) short after start ({}), end of previous broadcast or preview",
                            stop, start
                        );
                        *hborder_stop_position = Some(stop);
                        self.marks.delete(stop);
                    }
                    _ if start >= IGNORE_AT_START => {
                        self.marks.delete_type(Strength::VBorder.into());
                        self.detectors.ignore_vborder = true;
                        begin = Some(start);
                    }
                    _ => {
                        debug!("Delete too early horizontal border start ({})", start);
                        self.marks.delete(start);
                        if self.marks.count(Strength::HBorder.into()) == 0 {
                            debug!("Horizontal border since start, logo marks can not be valid");
                            self.marks.delete_type(Strength::Logo.into());
                        }
                    }
                }
            }
            None => {
                debug!("No horizontal border at start, ignore horizontal border detection");
                self.detectors.ignore_hborder = true;
                if let Some(stop) = self
                    .marks
                    .around(center, center, MarkType::HBORDER_STOP.into())
                    .map(|m| m.position)
                {
                    debug!("Horizontal border stop ({}) without start mark, assume start of the following recording", stop);
                    self.marks.delete(stop);
                    self.marks.add(
                        MarkType::ASSUMED_START,
                        stop,
                        Some(format!("assumed start from horizontal border stop ({})", stop)),
                        false,
                    );
                    begin = Some(stop);
                }
            }
        }
        begin
    }

    fn select_vborder_start(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let center = self.positions.i_start_a + delta;

        let Some(start) = self
            .marks
            .around(center, center, MarkType::VBORDER_START.into())
            .map(|m| m.position)
        else {
            debug!("No vertical border at start, ignore vertical border detection");
            self.detectors.ignore_vborder = true;
            if let Some(stop) = self
                .marks
                .around(center, center, MarkType::VBORDER_STOP.into())
                .map(|m| m.position)
            {
                debug!("Vertical border stop ({}) without start mark, possible start of the following recording", stop);
                self.marks.delete(stop);
                self.marks.add(
                    MarkType::ASSUMED_START,
                    stop,
                    Some(format!("assumed start from vertical border stop ({})", stop)),
                    false,
                );
            }
            return None;
        };

        debug!("Vertical border start found at ({})", start);
        if let Some(stop) = self.marks.next(start, MarkType::VBORDER_STOP.into()).map(|m| m.position) {
            let length = fps.secs(stop - start);
            let next_start = self.marks.next(stop, MarkType::VBORDER_START.into());
            if next_start.is_none()
                && (length <= self.tuning.vborder_min_secs || self.frame_current > self.positions.i_stop_a)
            {
                info!(
                    "Vertical border stop ({}) {}s after start ({}) in start part is not valid, delete marks",
                    stop, length, start
                );
                self.marks.delete(stop);
                self.marks.delete(start);
                return None;
            }
        }

        if start < IGNORE_AT_START {
            debug!("Ignore vertical border start ({}) from previous recording", start);
            return None;
        }
        self.marks.delete_type(Strength::HBorder.into());
        self.has_border = true;
        self.detectors.ignore_hborder = true;
        Some(start)
    }

    fn select_logo_start(&mut self, sections: &mut dyn LogoSectionPort) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();

        self.remove_logo_change_marks(sections);
        let positions = self.positions;
        let early_limit = positions.i_start / 8;

        let Some(mut start) = self
            .marks
            .around(positions.i_start_a + 2 * delta, positions.i_start_a, MarkType::LOGO_START.into())
            .map(|m| m.position)
        else {
            debug!("No logo start mark found");
            return None;
        };
        debug!("Logo start mark found at ({}) {}", start, self.timestamp(start));

        if start < early_limit {
            if let Some(next) = self.marks.next(start, MarkType::LOGO_START.into()).map(|m| m.position) {
                if next > early_limit && next - start < 5 * delta {
                    debug!("Later logo start mark found at ({})", next);
                    start = next;
                }
            }
        }

        loop {
            if self
                .evaluator
                .as_ref()
                .is_some_and(|e| e.closing_credits_at(start))
            {
                break;
            }
            let Some(stop) = self.marks.next(start, MarkType::LOGO_STOP.into()).map(|m| m.position) else {
                break;
            };
            let start_stop = fps.secs(stop - start);
            if start_stop >= self.tuning.logo_preview_start_stop_secs {
                debug!("Next logo stop ({}) far enough away ({}s)", stop, start_stop);
                break;
            }
            let Some(next_start) = self.marks.next(stop, MarkType::LOGO_START.into()).map(|m| m.position) else {
                break;
            };
            let stop_next = fps.secs(next_start - stop);
            if stop_next <= self.tuning.logo_preview_stop_start_secs
                || start_stop <= self.tuning.logo_preview_short_secs
            {
                debug!(
                    "Logo start ({}) short after logo start/stop ({}/{}), use it",
                    next_start, start, stop
                );
                start = next_start;
            } else {
                debug!("Next logo start ({}) too far away ({}s)", next_start, stop_next);
                break;
            }
        }

        if start < early_limit {
            debug!("Logo start mark ({}) too early, ignoring", start);
            return None;
        }
        self.marks.delete_type(Strength::HBorder.into());
        debug!("Disable border detection");
        self.detectors.ignore_hborder = true;
        self.detectors.ignore_vborder = true;
        Some(start)
    }

    fn select_any_start(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let i_start_a = self.positions.i_start_a;

        self.marks.delete_till(1, true);
        let mark = self
            .marks
            .around(i_start_a + 3 * delta, i_start_a, MarkClass::Start.into())
            .cloned()?;
        debug!("Found start mark ({}) {} in search for any type", mark.position, mark.mark_type);

        if mark.mark_type == MarkType::BLACK_START {
            let black_ms = self
                .marks
                .prev(mark.position, MarkType::BLACK_STOP.into())
                .map(|stop| fps.millis(mark.position - stop.position))
                .unwrap_or(0);
            debug!("Black screen before start mark lasts {}ms", black_ms);
            if black_ms < self.tuning.black_before_start_min_ms && mark.position > i_start_a + 2 * delta {
                debug!("Only a very late and short black screen start ({}), ignoring", mark.position);
                return None;
            }
        } else if !(mark.in_broadcast || self.detectors.ignore_logo) {
            debug!("Start mark ({}) {} found in advertising, ignoring", mark.position, mark.mark_type);
            return None;
        }
        Some(mark.position)
    }

    /// Skip black screens of long closing credits of the previous recording
    fn skip_closing_credits(&mut self, mut position: i32) -> i32 {
        let fps = self.fps();
        loop {
            let next_stop = self.black_marks.next(position, MarkType::BLACK_STOP.into()).map(|m| m.position);
            let next_start = self.black_marks.next(position, MarkType::BLACK_START.into()).map(|m| m.position);
            let (Some(stop), Some(start)) = (next_stop, next_start) else {
                break;
            };
            let distance = fps.secs(stop - position);
            let black_length = fps.secs(start - stop);
            debug!(
                "Next black screen from ({}) to ({}) in {}s, length {}s",
                stop, start, distance, black_length
            );
            if distance <= self.tuning.closing_credits_black_distance_secs
                && black_length >= self.tuning.closing_credits_black_min_secs
            {
                debug!("Long black screen short after, we are in closing credits of previous recording");
                position = start;
            } else {
                break;
            }
        }
        if self.marks.get(position).is_none() {
            self.marks.add(
                MarkType::BLACK_START,
                position,
                Some(CandidateEvent::new(MarkType::BLACK_START, position).describe()),
                true,
            );
        }
        position
    }

    /// Apply the selected begin; returns its type
    fn accept_start(&mut self, position: i32) -> Option<MarkType> {
        self.marks.delete_till(position, true);
        self.calculate_check_positions(position);
        let begin_type = self.mark_type_at(position)?;
        info!(
            "Using mark ({}) {} at {} as start mark",
            position,
            begin_type,
            self.timestamp(position)
        );

        if begin_type == MarkType::VBORDER_START || begin_type == MarkType::HBORDER_START {
            let kind = if begin_type == MarkType::HBORDER_START { "horizontal" } else { "vertical" };
            info!("Found {} borders, logo detection disabled", kind);
            self.detectors.ignore_logo = true;
            self.detectors.ignore_black = true;
            self.marks.delete_type(Strength::Logo.into());
        }

        debug!("Delete all black screen marks after start mark");
        let later_black: Vec<i32> = self
            .marks
            .iter()
            .filter(|m| m.strength() == Strength::BlackScreen && m.position > position)
            .map(|m| m.position)
            .collect();
        for black in later_black {
            self.marks.delete(black);
        }
        Some(begin_type)
    }

    fn fallback_start(&mut self, hborder_stop_position: Option<i32>) {
        match hborder_stop_position {
            Some(position) if position > 0 => {
                debug!("No valid start mark found, use horizontal border stop of previous recording");
                self.marks.add(
                    MarkType::ASSUMED_START,
                    position,
                    Some("start mark from border stop of previous recording*".to_string()),
                    true,
                );
                self.marks.delete_till(position, true);
            }
            _ => {
                let position = self.positions.i_start_a;
                info!("No valid start mark found, assume start at pre timer position ({})", position);
                self.marks.delete_till(position, true);
                self.marks.delete_type(Strength::BlackScreen.into());
                self.add_event(&CandidateEvent::new(MarkType::ASSUMED_START, position));
                self.calculate_check_positions(position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::marks::MarkStore;
    use crate::domain::model::*;
    use crate::engine::test_support::*;
    use crate::engine::{AbortFlag, EngineConfig, Session};
    use crate::planner::gop::KeyframeIndex;

    fn session(marks: &[(MarkType, i32)]) -> Session {
        let mut session = Session::new(
            recording(600, 60),
            &EngineConfig::default(),
            Box::new(MemoryRepository::default()),
            AbortFlag::new(),
        );
        session.calculate_check_positions(1500);
        session.marks = MarkStore::from_marks(marks.iter().map(|(t, p)| Mark::new(*t, *p, None, true)));
        session
    }

    #[test]
    fn test_invert_aspect_marks() {
        let mut session = session(&[(MarkType::ASPECT_START, 5000), (MarkType::ASPECT_STOP, 20000)]);
        session.info.aspect_ratio = Some(AspectRatio::RATIO_16_9);
        session.keyframes = KeyframeIndex::new(vec![4975, 5000, 5025, 19975, 20000, 20025]);

        session.invert_aspect_marks();
        assert_eq!(session.info.aspect_ratio, Some(AspectRatio::RATIO_4_3));
        let marks = session.marks().to_vec();
        assert_eq!(marks.len(), 2);
        assert_eq!((marks[0].mark_type, marks[0].position), (MarkType::ASPECT_STOP, 4975));
        assert_eq!((marks[1].mark_type, marks[1].position), (MarkType::ASPECT_START, 20025));
    }

    #[test]
    fn test_invert_aspect_marks_without_keyframes() {
        let mut session = session(&[(MarkType::ASPECT_STOP, 8000)]);
        session.info.aspect_ratio = Some(AspectRatio::RATIO_4_3);

        session.invert_aspect_marks();
        assert_eq!(session.info.aspect_ratio, Some(AspectRatio::RATIO_16_9));
        let mark = session.marks().first(MarkFilter::Any).unwrap();
        assert_eq!((mark.mark_type, mark.position), (MarkType::ASPECT_START, 8001));
    }

    #[test]
    fn test_early_hborder_start_is_deleted() {
        let mut session = session(&[(MarkType::HBORDER_START, 5), (MarkType::HBORDER_STOP, 15000)]);
        let mut hborder_stop = None;
        assert_eq!(session.select_hborder_start(&mut hborder_stop), None);
        assert!(session.marks().get(5).is_none());
        assert!(hborder_stop.is_none());
    }

    #[test]
    fn test_short_hborder_is_previous_broadcast() {
        let mut session = session(&[(MarkType::HBORDER_START, 1600), (MarkType::HBORDER_STOP, 2000)]);
        let mut hborder_stop = None;
        assert_eq!(session.select_hborder_start(&mut hborder_stop), None);
        assert_eq!(hborder_stop, Some(2000));
        assert!(session.marks().get(2000).is_none());
    }
}
