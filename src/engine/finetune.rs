//! Fine tuning of logo marks: closing credits, advertising in frame,
//! introduction logos, audio silence and black screen alignment

use tracing::{debug, info, warn};

use super::session::Session;
use super::{Pass, PassOutcome};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::ports::{DecodePort, LogoSectionPort};

impl Session {
    /// Pass 3: move logo marks onto closing credits, silence and black
    /// screens near them
    pub fn run_fine_tune_pass(
        &mut self,
        decoder: &mut dyn DecodePort,
        sections: &mut dyn LogoSectionPort,
    ) -> Result<PassOutcome, DomainError> {
        let progress = self.start_progress(Pass::FineTune, None);
        let mut moved = self.move_last_stop_after_closing_credits(sections);
        moved |= self.skip_ads_in_frame_and_intros(sections);

        if self.is_aborted() {
            progress.cancel();
            return Ok(PassOutcome::Aborted);
        }
        moved |= self.align_to_silence(decoder);

        if self.is_aborted() {
            if moved {
                self.save();
            }
            progress.cancel();
            return Ok(PassOutcome::Aborted);
        }
        moved |= self.align_to_black_screen();

        if moved {
            self.debug_marks("Marks after fine tuning");
            self.save();
        }
        progress.complete();
        Ok(PassOutcome::Completed)
    }

    fn move_last_stop_after_closing_credits(&mut self, sections: &mut dyn LogoSectionPort) -> bool {
        let Some(last) = self.marks.last(MarkFilter::Any).cloned() else {
            return false;
        };
        if last.mark_type != MarkType::LOGO_STOP && last.mark_type != MarkType::HBORDER_STOP {
            return false;
        }
        let end = last.position + self.fps().frames(self.tuning.closing_credits_secs as f64);
        debug!("Search closing credits from ({}) to ({})", last.position, end);
        match sections.closing_credits_end(last.position, end) {
            Ok(Some(credits_end)) if credits_end > last.position => {
                info!(
                    "Closing credits found, move end mark ({}) to ({}) at {}",
                    last.position,
                    credits_end,
                    self.timestamp(credits_end)
                );
                self.marks.move_mark(last.position, credits_end, "closing credits");
                true
            }
            Ok(_) => {
                debug!("No closing credits after ({})", last.position);
                false
            }
            Err(e) => {
                warn!("Closing credits analysis after ({}) failed: {}", last.position, e);
                false
            }
        }
    }

    /// Move logo starts behind advertising in frame or onto an introduction
    /// logo, and logo stops other than the last stop before advertising in
    /// frame
    fn skip_ads_in_frame_and_intros(&mut self, sections: &mut dyn LogoSectionPort) -> bool {
        let mut moved = false;
        for position in self.marks.positions(MarkFilter::Strength(Strength::Logo)) {
            if self.is_aborted() {
                break;
            }
            let Some(mark_type) = self.marks.get(position).map(|m| m.mark_type) else {
                continue;
            };
            let target = match mark_type {
                MarkType::LOGO_START => self.logo_start_target(sections, position),
                MarkType::LOGO_STOP => self.logo_stop_target(sections, position),
                _ => continue,
            };
            let Some((target, reason)) = target else {
                continue;
            };
            let prev = self.marks.before(position).map_or(i32::MIN, |m| m.position);
            let next = self.marks.after(position).map_or(i32::MAX, |m| m.position);
            if target == position || target <= prev || target >= next {
                debug!("Keep ({}) {}, target ({}) not between neighbour marks", position, mark_type, target);
                continue;
            }
            info!(
                "Move ({}) {} to ({}) at {}, {}",
                position,
                mark_type,
                target,
                self.timestamp(target),
                reason
            );
            self.marks.move_mark(position, target, reason);
            moved = true;
        }
        moved
    }

    fn logo_start_target(&self, sections: &mut dyn LogoSectionPort, start: i32) -> Option<(i32, &'static str)> {
        let fps = self.fps();
        let intro_from = (start - fps.frames(self.tuning.intro_search_secs as f64)).max(0);
        let intro = match sections.introduction_logo(intro_from, start) {
            Ok(intro) => intro,
            Err(e) => {
                warn!("Introduction logo search before ({}) failed: {}", start, e);
                None
            }
        };

        let ad_to = start + fps.frames(self.tuning.ad_in_frame_start_secs as f64);
        let ad_end = match sections.ad_in_frame(start, ad_to, true) {
            Ok(end) => end,
            Err(e) => {
                warn!("Advertising in frame search after ({}) failed: {}", start, e);
                None
            }
        };
        let ad_end = ad_end.filter(|&end| {
            let info_logo = self
                .evaluator
                .as_ref()
                .is_some_and(|e| e.includes_info_logo(start, end));
            if info_logo {
                debug!("Advertising in frame ({}) to ({}) is an info logo, ignore", start, end);
            }
            !info_logo
        });
        if let Some(end) = ad_end {
            let target = self.keyframes.keyframe_after(end + 1).unwrap_or(end + 1);
            return Some((target, "advertising in frame"));
        }

        let intro = intro?;
        let black_start = MarkFilter::Type(MarkType::BLACK_START);
        let black_stop = MarkFilter::Type(MarkType::BLACK_STOP);
        let inner_start = self.black_marks.next(intro, black_start).map(|m| m.position);
        let inner_stop = self.black_marks.next(intro, black_stop).map(|m| m.position);
        if let (Some(black_start), Some(black_stop)) = (inner_start, inner_stop) {
            let length = fps.millis(black_start - black_stop);
            if black_start <= start && black_stop <= start && length > self.tuning.intro_black_inner_max_ms {
                debug!(
                    "Black screen ({}) to ({}) between introduction logo ({}) and logo start ({}), keep",
                    black_stop, black_start, intro, start
                );
                return None;
            }
        }
        let before = self.black_marks.prev(intro, black_start).map(|m| m.position);
        if let Some(black) = before {
            if fps.millis(intro - black) <= self.tuning.intro_black_before_max_ms {
                return Some((black, "black screen before introduction logo"));
            }
        }
        Some((intro, "introduction logo"))
    }

    fn logo_stop_target(&self, sections: &mut dyn LogoSectionPort, stop: i32) -> Option<(i32, &'static str)> {
        let later_stop = self.marks.iter().any(|m| m.position > stop && !m.is_start());
        if !later_stop {
            return None;
        }
        let from = (stop - self.fps().frames(self.tuning.ad_in_frame_stop_secs as f64)).max(0);
        let begin = match sections.ad_in_frame(from, stop, false) {
            Ok(begin) => begin?,
            Err(e) => {
                warn!("Advertising in frame search before ({}) failed: {}", stop, e);
                return None;
            }
        };
        let target = self.keyframes.keyframe_before(begin - 1).unwrap_or(begin - 1);
        Some((target, "advertising in frame"))
    }

    /// Snap logo marks to audio silence. A failed seek ends the search.
    fn align_to_silence(&mut self, decoder: &mut dyn DecodePort) -> bool {
        let fps = self.fps();
        let range_secs = self.tuning.silence_range_for(&self.info.channel_name);
        let range = fps.frames(range_secs as f64);
        let black_window = fps.frames(self.tuning.silence_black_secs as f64);
        debug!("Search audio silence around logo marks, range {}s", range_secs);

        let mut moved = false;
        for position in self.marks.positions(MarkFilter::Strength(Strength::Logo)) {
            if self.is_aborted() {
                break;
            }
            let Some(mark_type) = self.marks.get(position).map(|m| m.mark_type) else {
                continue;
            };
            let found = match mark_type {
                MarkType::LOGO_START => self.silence_before_start(decoder, position, range),
                MarkType::LOGO_STOP => self.silence_around_stop(decoder, position, range),
                _ => continue,
            };
            let silence = match found {
                Ok(Some(silence)) if silence != position => silence,
                Ok(_) => {
                    debug!("No usable audio silence near ({}) {}", position, mark_type);
                    continue;
                }
                Err(e) => {
                    warn!("Silence search near ({}) failed: {}", position, e);
                    break;
                }
            };

            let black = self
                .black_marks
                .around(black_window, silence, MarkType::BLACK_START.into())
                .map(|m| m.position);
            let (target, reason) = match (black, mark_type.is_start()) {
                (Some(black), true) => (black, "black screen near silence"),
                (Some(black), false) => (black - 1, "black screen near silence"),
                (None, _) => (silence, "silence"),
            };
            if target == position {
                continue;
            }
            debug!("Move ({}) {} to ({}), {}", position, mark_type, target, reason);
            self.marks.move_mark(position, target, reason);
            moved = true;
        }
        moved
    }

    fn silence_before_start(
        &self,
        decoder: &mut dyn DecodePort,
        position: i32,
        range: i32,
    ) -> Result<Option<i32>, DomainError> {
        decoder.seek_to_frame((position - range).max(0))?;
        decoder.next_silence(position, true, true)
    }

    /// Prefer silence after the stop; silence before it only when none
    /// follows
    fn silence_around_stop(
        &self,
        decoder: &mut dyn DecodePort,
        position: i32,
        range: i32,
    ) -> Result<Option<i32>, DomainError> {
        let seek = (position - range).max(decoder.current_frame_number()).max(0);
        decoder.seek_to_frame(seek)?;
        let before = decoder.next_silence(position, true, false)?;

        decoder.seek_to_frame(position)?;
        let after_end = position + range - self.fps().frames(1.0);
        let after = decoder.next_silence(after_end, false, false)?;
        if after.is_none() && before.is_some() {
            debug!("Use silence before logo stop ({})", position);
        }
        Ok(after.or(before))
    }

    fn align_to_black_screen(&mut self) -> bool {
        let fps = self.fps();
        let range_ms = self.tuning.black_range_for(&self.info.channel_name);
        let window = fps.frames_ms(range_ms);
        debug!("Search black screen near logo marks, range {}ms", range_ms);

        let mut moved = false;
        for position in self.marks.positions(MarkFilter::Any) {
            let Some(mark_type) = self.marks.get(position).map(|m| m.mark_type) else {
                continue;
            };
            match mark_type {
                MarkType::LOGO_START => {
                    let Some(black) = self
                        .black_marks
                        .around(window, position, MarkType::BLACK_START.into())
                        .map(|m| m.position)
                    else {
                        debug!("No black screen near logo start ({})", position);
                        continue;
                    };
                    if black < position {
                        debug!(
                            "Black screen ({}) {}ms before logo start ({})",
                            black,
                            fps.millis(position - black),
                            position
                        );
                        self.marks.move_mark(position, black, "black screen");
                        moved = true;
                    }
                }
                MarkType::LOGO_STOP | MarkType::BLACK_STOP => {
                    let Some(black) = self
                        .black_marks
                        .next(position, MarkType::BLACK_START.into())
                        .map(|m| m.position)
                    else {
                        debug!("No black screen after stop ({})", position);
                        continue;
                    };
                    let distance_ms = fps.millis(black - position);
                    if distance_ms > range_ms {
                        continue;
                    }
                    let target = if self.full_decode {
                        black - 1
                    } else {
                        self.keyframes.keyframe_before(black - 1).unwrap_or(black - 1)
                    };
                    if target == position {
                        continue;
                    }
                    debug!(
                        "Black screen ({}) {}ms after stop ({}), move to ({})",
                        black, distance_ms, position, target
                    );
                    self.marks.move_mark(position, target, "black screen");
                    moved = true;
                }
                _ => {}
            }
        }
        moved
    }
}
