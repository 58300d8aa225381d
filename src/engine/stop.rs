//! Broadcast end selection

use tracing::{debug, info};

use super::session::Session;
use crate::domain::model::*;
use crate::ports::LogoSectionPort;

impl Session {
    /// Select the end mark once the frame loop passed the end check position
    pub(crate) fn check_stop(&mut self, sections: &mut dyn LogoSectionPort) {
        info!(
            "Checking stop at frame ({}), assumed stop ({}) at {}",
            self.frame_current,
            self.positions.i_stop_a,
            self.timestamp(self.positions.i_stop_a)
        );
        self.debug_marks("Marks before stop selection");

        self.remove_logo_change_marks(sections);

        let delta = self.delta();
        let i_stop_a = self.positions.i_stop_a;

        let mut end = self.select_channel_stop();
        if end.is_none() {
            end = self.select_aspect_stop();
        }
        if end.is_none() {
            end = self.select_hborder_stop();
        }
        if end.is_none() {
            end = self.select_vborder_stop();
        }
        if end.is_none() {
            end = self.select_logo_stop();
        }
        if end.is_none() {
            let window = (self.tuning.weak_stop_range_factor * delta as f64) as i32;
            end = self
                .marks
                .around(window, i_stop_a + delta, MarkClass::Stop.into())
                .map(|m| m.position);
            match end {
                Some(position) => debug!("Weak end mark found at ({})", position),
                None => debug!("No end mark found"),
            }
        }

        let last_start = self
            .marks
            .around(i32::MAX, self.frame_current, MarkClass::Start.into())
            .map(|m| m.position);

        match end {
            Some(position) => self.accept_stop(position, last_start),
            None => self.fallback_stop(),
        }

        debug!("Delete all black screen marks except start and end mark");
        let first = self.marks.first(MarkFilter::Any).map(|m| m.position);
        let last = self.marks.last(MarkFilter::Any).map(|m| m.position);
        let inner_black: Vec<i32> = self
            .marks
            .iter()
            .filter(|m| m.strength() == Strength::BlackScreen)
            .map(|m| m.position)
            .filter(|p| Some(*p) != first && Some(*p) != last)
            .collect();
        for position in inner_black {
            self.marks.delete(position);
        }

        self.positions.i_stop = 0;
        self.positions.i_stop_a = 0;
        self.got_end_mark = true;
        self.save();
        self.debug_marks("Marks after stop selection");
    }

    fn first_position(&self) -> i32 {
        self.marks.first(MarkFilter::Any).map(|m| m.position).unwrap_or(0)
    }

    fn select_channel_stop(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let i_stop_a = self.positions.i_stop_a;

        let mut end = self
            .marks
            .around(3 * delta, i_stop_a, MarkType::CHANNEL_STOP.into())
            .map(|m| m.position);
        let Some(position) = end else {
            debug!("No channel stop mark found");
            return None;
        };
        debug!("Channel stop found at ({})", position);

        if let Some(channel_start) = self.marks.prev(position, MarkType::CHANNEL_START.into()).map(|m| m.position) {
            if position - channel_start < delta {
                debug!(
                    "Channel start ({}) short before channel stop, try to find a stop mark before",
                    channel_start
                );
                end = self
                    .marks
                    .around(delta, i_stop_a - delta, MarkType::CHANNEL_STOP.into())
                    .map(|m| m.position);
            } else if let Some(first_start) = self.marks.next(0, MarkType::CHANNEL_START.into()).map(|m| m.position) {
                if fps.secs(position - first_start) < self.tuning.channel_stop_first_start_secs {
                    debug!("First channel start and channel stop too near, stop belongs to the next recording");
                    end = None;
                }
            }
        }

        if let Some(position) = end {
            let first = self.first_position();
            self.marks.delete_weak_in_range(first + 1, position, Strength::Channel);
        }
        end
    }

    fn select_aspect_stop(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();

        let Some(position) = self
            .marks
            .around(3 * delta, self.positions.i_stop_a, MarkType::ASPECT_STOP.into())
            .map(|m| m.position)
        else {
            debug!("No aspect ratio stop mark found");
            return None;
        };
        debug!("Aspect ratio stop found at ({})", position);

        if self.info.aspect_ratio.is_some_and(|a| a.is_4_3()) {
            debug!("Delete all weak marks");
            let first = self.first_position();
            self.marks.delete_weak_in_range(first + 1, position, Strength::Aspect);
            return Some(position);
        }

        if let Some(logo_stop) = self.marks.prev(position, MarkType::LOGO_STOP.into()).map(|m| m.position) {
            let diff = fps.secs(position - logo_stop);
            debug!(
                "Logo stop ({}) {}s before aspect ratio stop ({})",
                logo_stop, diff, position
            );
            if diff <= self.tuning.aspect_stop_logo_secs {
                debug!("Advertising before aspect ratio stop, use logo stop");
                return Some(logo_stop);
            }
        }
        Some(position)
    }

    fn select_hborder_stop(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let i_stop_a = self.positions.i_stop_a;

        let Some(position) = self
            .marks
            .around(5 * delta, i_stop_a, MarkType::HBORDER_STOP.into())
            .map(|m| m.position)
        else {
            debug!("No horizontal border stop mark found");
            return None;
        };
        debug!("Horizontal border stop found at ({})", position);

        let prev_start = self.marks.prev(position, MarkType::HBORDER_START.into()).map(|m| m.position);
        if !prev_start.is_some_and(|start| start > i_stop_a) {
            return Some(position);
        }

        debug!(
            "Horizontal border start ({:?}) after assumed stop, border stop ({}) is invalid",
            prev_start, position
        );
        let prev_stop = self.marks.prev(position, MarkType::HBORDER_STOP.into()).map(|m| m.position)?;
        let diff = fps.secs(i_stop_a - prev_stop);
        if diff <= self.tuning.hborder_stop_prev_secs {
            debug!(
                "Previous horizontal border stop ({}) {}s before assumed stop, use it",
                prev_stop, diff
            );
            Some(prev_stop)
        } else {
            debug!("Previous horizontal border stop ({}) {}s before assumed stop, not valid", prev_stop, diff);
            None
        }
    }

    fn select_vborder_stop(&mut self) -> Option<i32> {
        let delta = self.delta();
        let Some(position) = self
            .marks
            .around(3 * delta, self.positions.i_stop_a, MarkType::VBORDER_STOP.into())
            .map(|m| m.position)
        else {
            debug!("No vertical border stop mark found");
            return None;
        };
        debug!("Vertical border stop found at ({})", position);

        if self.marks.prev(position, MarkType::VBORDER_START.into()).is_some() {
            debug!("Vertical border start and stop found, delete weak marks except start mark");
            let first = self.first_position();
            self.marks.delete_weak_in_range(first + 1, i32::MAX, Strength::VBorder);
        }
        Some(position)
    }

    fn select_logo_stop(&mut self) -> Option<i32> {
        let delta = self.delta();
        let fps = self.fps();
        let i_stop_a = self.positions.i_stop_a;
        let window = (self.tuning.logo_end_factor * delta as f64) as i32;

        let mut end = loop {
            let Some(stop) = self
                .marks
                .around(window, i_stop_a, MarkType::LOGO_STOP.into())
                .map(|m| m.position)
            else {
                debug!("No logo stop mark found");
                break None;
            };
            match self.marks.prev(stop, MarkType::LOGO_START.into()).map(|m| m.position) {
                Some(start) if fps.secs(stop - start) < self.tuning.logo_stop_start_min_secs => {
                    debug!(
                        "Logo stop ({}) is invalid, logo start ({}) only {}s before",
                        stop,
                        start,
                        fps.secs(stop - start)
                    );
                    self.marks.delete(stop);
                    self.marks.delete(start);
                }
                _ => break Some(stop),
            }
        };

        if let Some(stop) = end {
            if let Some(channel_start) = self.marks.prev(stop, MarkType::CHANNEL_START.into()).map(|m| m.position) {
                if fps.secs(stop - channel_start) <= self.tuning.logo_stop_channel_start_secs {
                    debug!(
                        "Logo stop ({}) is invalid, channel start ({}) short before",
                        stop, channel_start
                    );
                    end = None;
                }
            }
        }

        let stop = end?;
        let prev_start = self.marks.prev(stop, MarkType::LOGO_START.into()).map(|m| m.position);
        let prev_stop = self.marks.prev(stop, MarkType::LOGO_STOP.into()).map(|m| m.position);
        if let (Some(start), Some(before)) = (prev_start, prev_stop) {
            let distance = fps.secs(stop - start);
            let length = fps.secs(start - before);
            if distance <= self.tuning.text_preview_distance_secs && length <= self.tuning.text_preview_length_secs {
                debug!(
                    "Logo start ({}) stop ({}) before assumed end too near and too short, text preview over the logo",
                    start, before
                );
                self.marks.delete(start);
                self.marks.delete(before);
            }
        }
        end = Some(stop);
        if let Some(before) = self.marks.prev(stop, MarkType::LOGO_STOP.into()).map(|m| m.position) {
            let diff = fps.secs(stop - before);
            if diff < self.tuning.logo_stop_before_secs {
                debug!("Logo stop before too near {}s, use ({}) as stop mark", diff, before);
                end = Some(before);
            }
        }

        let stop = end?;
        let before_assumed = fps.secs(i_stop_a - stop);
        debug!("End mark ({}) {}s before assumed stop ({})", stop, before_assumed, i_stop_a);
        if before_assumed >= self.tuning.early_logo_stop_secs {
            let prev_start = self.marks.prev(stop, MarkType::LOGO_START.into()).map(|m| m.position);
            let prev_stop = prev_start.and_then(|s| self.marks.prev(s, MarkType::LOGO_STOP.into()).map(|m| m.position));
            let next_start = self.marks.next(stop, MarkType::LOGO_START.into()).map(|m| m.position);
            let next_stop = self.marks.next(stop, MarkType::LOGO_STOP.into());
            if let (Some(_), Some(_), Some(next_start), None) = (prev_start, prev_stop, next_start, next_stop) {
                let ad_after = fps.secs(next_start - stop);
                debug!("Advertising after logo stop from ({}) to ({}) {}s", stop, next_start, ad_after);
                if ad_after <= self.tuning.early_logo_stop_ad_after_secs {
                    debug!("Advertising after logo stop too short, stop mark not valid");
                    end = None;
                }
            }
        }
        end
    }

    fn accept_stop(&mut self, mut position: i32, last_start: Option<i32>) {
        let delta = self.delta();
        let i_stop_a = self.positions.i_stop_a;
        let Some(end_type) = self.marks.get(position).map(|m| m.mark_type) else {
            return;
        };
        debug!("Found end mark at ({})", position);

        let weaker: Vec<i32> = self
            .marks
            .iter()
            .filter(|m| {
                m.position >= i_stop_a - delta
                    && m.position < position
                    && m.strength() < end_type.strength
            })
            .map(|m| m.position)
            .collect();
        for weak in weaker {
            debug!("Stronger end mark found, delete mark ({})", weak);
            self.marks.delete(weak);
        }

        if end_type == MarkType::BLACK_STOP && position < i_stop_a {
            if let Some(later) = self
                .marks
                .around(delta, position + 2 * delta, MarkClass::Stop.into())
                .map(|m| m.position)
            {
                debug!("Stop mark is weak, use next stop mark at ({})", later);
                position = later;
            }
        }

        let end_type = self.marks.get(position).map(|m| m.mark_type).unwrap_or(end_type);
        info!(
            "Using mark ({}) {} at {} as stop mark",
            position,
            end_type,
            self.timestamp(position)
        );
        self.marks.delete_till(position, false);

        if position < i_stop_a - 5 * delta && last_start.is_some_and(|start| start > position) {
            info!(
                "Last stop mark results in too short recording, set stop at the end of the recording ({})",
                self.iframe_current
            );
            self.add_event(&CandidateEvent::new(MarkType::ASSUMED_STOP, self.iframe_current));
        }
    }

    fn fallback_stop(&mut self) {
        let i_stop_a = self.positions.i_stop_a;
        if self.marks.next(0, MarkType::ASPECT_START.into()).is_some() {
            if let Some(last_stop) = self.marks.last(MarkType::ASPECT_STOP.into()).map(|m| m.position) {
                if last_stop > i_stop_a {
                    debug!("Very late aspect ratio stop found at ({})", last_stop);
                    self.marks.delete_till(last_stop, false);
                    return;
                }
            }
        }
        info!(
            "No stop mark found, add stop mark at the last keyframe ({})",
            self.iframe_current
        );
        self.add_event(&CandidateEvent::new(MarkType::ASSUMED_STOP, self.iframe_current));
    }
}
