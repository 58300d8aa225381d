//! Global cleanup of the finalized mark sequence and VPS override

use tracing::{debug, info};

use super::session::Session;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::domain::rules::Tuning;
use crate::planner::gop::KeyframeIndex;
use crate::utils::time::frame_to_timestamp;

/// Recording state the cleanup rules depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupContext {
    pub fps: FrameRate,
    pub length_secs: i32,
    pub in_broadcast: bool,
    pub got_end_mark: bool,
}

/// Ordered rewrite rules removing marks that make no sense
pub struct GlobalCleanup<'a> {
    tuning: &'a Tuning,
    ctx: CleanupContext,
}

impl<'a> GlobalCleanup<'a> {
    pub fn new(tuning: &'a Tuning, ctx: CleanupContext) -> Self {
        Self { tuning, ctx }
    }

    /// Apply all rules until the sequence no longer changes; returns the
    /// number of deleted marks
    pub fn run(&self, marks: &mut MarkStore) -> usize {
        let initial = marks.len();
        loop {
            let before = marks.len();
            self.remove_invalid(marks);
            self.remove_logo_with_stronger_pairs(marks);
            remove_inner(marks, |m| m.strength() == Strength::BlackScreen);
            self.remove_short_logo_gaps(marks);
            self.remove_previews(marks);
            self.remove_hborder_ads(marks);
            self.check_first_part(marks);
            self.check_last_part(marks);
            self.remove_short_pairs(marks);
            if marks.len() == before {
                break;
            }
            debug!("Cleanup removed {} marks, run rules again", before - marks.len());
        }
        initial - marks.len()
    }

    fn secs(&self, frames: i32) -> i32 {
        self.ctx.fps.secs(frames)
    }

    /// Frame the broadcast is assumed to end at, counted from the start mark
    fn assumed_stop_from(&self, start: i32) -> i32 {
        start
            + self
                .ctx
                .fps
                .frames((self.ctx.length_secs + self.tuning.astopoffs_secs) as f64)
    }

    fn remove_invalid(&self, marks: &mut MarkStore) {
        let mut cursor = first_position(marks);
        while let Some(position) = cursor {
            let Some(mark) = marks.get(position).cloned() else {
                break;
            };
            let first = first_position(marks);

            if mark.is_stop() && Some(position) == first {
                debug!("Sequence starts with stop mark ({}), delete it", position);
                marks.delete(position);
                cursor = first_position(marks);
                continue;
            }

            if let Some(next) = marks.after(position).cloned() {
                if next.mark_type.class == mark.mark_type.class {
                    if Some(position) == first && next.position > self.assumed_stop_from(0) {
                        debug!(
                            "Double start mark as first marks, second mark ({}) near end belongs to the next recording",
                            next.position
                        );
                        marks.delete(next.position);
                    } else {
                        let mut count_mark = marks.count(mark.mark_type.into());
                        let mut count_next = marks.count(next.mark_type.into());
                        debug!(
                            "Mark ({}) type count {}, followed by same class mark ({}) type count {}",
                            position, count_mark, next.position, count_next
                        );
                        if count_mark == count_next {
                            if mark.mark_type > next.mark_type {
                                count_mark += 1;
                            } else {
                                count_next += 1;
                            }
                        }
                        if count_mark < count_next {
                            debug!("Delete mark ({})", position);
                            marks.delete(position);
                            cursor = Some(next.position);
                            continue;
                        }
                        debug!("Delete mark ({})", next.position);
                        marks.delete(next.position);
                    }
                }
            }

            if mark.is_stop() {
                if let Some(next) = marks.after(position).cloned() {
                    if next.is_start() && self.secs(next.position - position) > self.tuning.max_ad_secs {
                        debug!(
                            "Stop ({}) start ({}) distance {}s too long, delete invalid pair",
                            position,
                            next.position,
                            self.secs(next.position - position)
                        );
                        let following = marks.after(next.position).map(|m| m.position);
                        marks.delete(next.position);
                        marks.delete(position);
                        cursor = following;
                        continue;
                    }
                }
            }

            if (!self.ctx.in_broadcast || self.ctx.got_end_mark)
                && mark.is_start()
                && marks.after(position).is_none()
                && Some(position) != first
            {
                debug!("Start mark ({}) at the end, delete it", position);
                marks.delete(position);
                break;
            }
            cursor = marks.after(position).map(|m| m.position);
        }
    }

    fn remove_logo_with_stronger_pairs(&self, marks: &mut MarkStore) {
        let channel_pair = marks.next(0, MarkType::CHANNEL_START.into()).is_some()
            && marks.next(0, MarkType::CHANNEL_STOP.into()).is_some();
        let hborder_pair = self.border_pair(marks, MarkType::HBORDER_START, MarkType::HBORDER_STOP);
        let vborder_pair = self.border_pair(marks, MarkType::VBORDER_START, MarkType::VBORDER_STOP);
        if channel_pair || hborder_pair || vborder_pair {
            debug!("Channel or border marks found, delete logo marks");
            remove_inner(marks, |m| m.strength() == Strength::Logo);
        }
    }

    /// Whether a border start/stop pair exists; a too short first pair is
    /// replaced by the next one
    fn border_pair(&self, marks: &MarkStore, start_type: MarkType, stop_type: MarkType) -> bool {
        let mut start = marks.next(0, start_type.into()).map(|m| m.position);
        let mut stop = marks.next(0, stop_type.into()).map(|m| m.position);
        if let (Some(s), Some(e)) = (start, stop) {
            let length = self.secs(e - s);
            if length < self.tuning.border_pair_min_secs {
                debug!("Border start/stop distance {}s too short, try next pair", length);
                start = marks.next(s, start_type.into()).map(|m| m.position);
                stop = marks.next(e, stop_type.into()).map(|m| m.position);
            }
        }
        start.is_some() && stop.is_some()
    }

    fn remove_short_logo_gaps(&self, marks: &mut MarkStore) {
        let fps = self.ctx.fps;
        let mut cursor = first_position(marks);
        while let Some(position) = cursor {
            cursor = marks.after(position).map(|m| m.position);
            let (Some(mark), Some(next)) = (marks.get(position), marks.after(position)) else {
                continue;
            };
            if mark.mark_type != MarkType::LOGO_STOP || next.mark_type != MarkType::LOGO_START {
                continue;
            }
            let start = next.position;
            let gap_ms = fps.millis(start - position);
            if gap_ms >= self.tuning.logo_gap_min_ms {
                continue;
            }
            let Some(following) = marks.after(start).filter(|m| m.mark_type == MarkType::LOGO_STOP) else {
                continue;
            };
            let following = following.position;
            let length_after = self.secs(following - start);
            if !self.is_gap_before_long_part(marks, position, start) {
                debug!(
                    "Very short logo stop ({}) start ({}) pair {}ms, length after {}s, delete",
                    position, start, gap_ms, length_after
                );
                marks.delete(start);
                marks.delete(position);
                cursor = Some(following);
            } else {
                debug!(
                    "Logo stop ({}) start ({}) pair {}ms before long broadcast part, keep",
                    position, start, gap_ms
                );
            }
        }
    }

    /// A very short logo stop/start gap followed by a long logo part can hold
    /// the real start mark
    fn is_gap_before_long_part(&self, marks: &MarkStore, stop: i32, start: i32) -> bool {
        if self.ctx.fps.millis(start - stop) >= self.tuning.logo_gap_min_ms {
            return false;
        }
        marks
            .after(start)
            .filter(|m| m.mark_type == MarkType::LOGO_STOP)
            .is_some_and(|m| self.secs(m.position - start) >= self.tuning.logo_gap_broadcast_after_secs)
    }

    fn remove_previews(&self, marks: &mut MarkStore) {
        let fps = self.ctx.fps;
        let tuning = self.tuning;
        let mut cursor = first_position(marks);
        while let Some(position) = cursor {
            cursor = marks.after(position).map(|m| m.position);
            let is_logo_start = marks.get(position).is_some_and(|m| m.mark_type == MarkType::LOGO_START);
            if !is_logo_start || Some(position) == first_position(marks) {
                continue;
            }
            let Some(stop) = marks.next(position, MarkType::LOGO_STOP.into()).map(|m| m.position) else {
                continue;
            };
            if Some(stop) == last_position(marks) {
                continue;
            }
            let stop_before = marks.prev(position, MarkType::LOGO_STOP.into()).map(|m| m.position);
            let start_after = marks.next(stop, MarkType::LOGO_START.into()).map(|m| m.position);
            let (Some(stop_before), Some(start_after)) = (stop_before, start_after) else {
                continue;
            };

            let ad_before = fps.millis(position - stop_before);
            let ad_after = fps.millis(start_after - stop);
            let preview = self.secs(stop - position);
            debug!(
                "Start ({}) stop ({}): length {}s, ad before {}ms, ad after {}ms",
                position, stop, preview, ad_before, ad_after
            );
            let ad_around = ad_before >= tuning.preview_ad_before_ms || ad_after >= tuning.preview_ad_after_ms;
            let ad_lengths = (tuning.preview_gap_min_ms..=tuning.preview_ad_before_max_ms).contains(&ad_before)
                && ad_after >= tuning.preview_gap_min_ms;
            if ad_around && ad_lengths && preview <= tuning.preview_max_secs {
                info!(
                    "Found preview between logo mark ({}) and logo mark ({}) in advertisement, deleting marks",
                    position, stop
                );
                marks.delete(position);
                marks.delete(stop);
                cursor = Some(start_after);
            }
        }
    }

    fn remove_hborder_ads(&self, marks: &mut MarkStore) {
        let mut cursor = first_position(marks);
        while let Some(position) = cursor {
            cursor = marks.after(position).map(|m| m.position);
            let is_hborder_start = marks.get(position).is_some_and(|m| m.mark_type == MarkType::HBORDER_START);
            if !is_hborder_start || Some(position) == first_position(marks) || cursor.is_none() {
                continue;
            }
            let Some(stop) = marks.next(position, MarkType::HBORDER_STOP.into()).map(|m| m.position) else {
                continue;
            };
            if Some(stop) == last_position(marks) {
                continue;
            }
            let length = self.secs(stop - position);
            if length >= self.tuning.hborder_ad_max_secs {
                continue;
            }
            info!(
                "Found advertisement of length {}s between horizontal border marks ({}) and ({}), deleting marks",
                length, position, stop
            );
            if let Some(logo_start) = marks.next(position, MarkType::LOGO_START.into()).map(|m| m.position) {
                if logo_start <= stop {
                    debug!("Invalid logo start ({}) between horizontal border start and stop, delete", logo_start);
                    marks.delete(logo_start);
                }
            }
            marks.delete(position);
            marks.delete(stop);
            cursor = marks.next(position, MarkFilter::Any).map(|m| m.position);
        }
    }

    fn check_first_part(&self, marks: &mut MarkStore) {
        let Some(first) = marks.first(MarkFilter::Any).cloned() else {
            return;
        };
        let Some(stop) = marks.next(first.position, MarkClass::Stop.into()).map(|m| m.position) else {
            return;
        };
        let max_secs = if first.mark_type <= MarkType::BLACK_START {
            self.tuning.first_part_weak_secs
        } else {
            self.tuning.first_part_strong_secs
        };
        let length = self.secs(stop - first.position);
        debug!("First broadcast part {}s from ({}) to ({})", length, first.position, stop);
        if length <= max_secs {
            debug!("Short start/stop sequence at start, delete first pair");
            marks.delete(first.position);
            marks.delete(stop);
        }
    }

    fn check_last_part(&self, marks: &mut MarkStore) {
        let Some(last) = marks.last(MarkFilter::Any).cloned() else {
            return;
        };
        if last.strength() >= Strength::Channel {
            return;
        }
        let Some(prev) = marks.before(last.position).map(|m| m.position) else {
            return;
        };
        let last_part = self.secs(last.position - prev);
        if last_part < self.tuning.last_part_min_secs {
            return;
        }
        let Some(stop) = marks.before(prev).map(|m| m.position) else {
            return;
        };
        let last_ad = self.secs(prev - stop);
        debug!("Last advertising {}s from ({}) to ({})", last_ad, stop, prev);
        if last_ad <= self.tuning.last_ad_min_secs || last_ad > self.tuning.last_ad_max_secs {
            return;
        }
        // 11s to 12s before a logo stop can be an undetected info logo
        if last.mark_type == MarkType::LOGO_STOP && (11..=12).contains(&last_ad) {
            return;
        }
        let Some(first) = first_position(marks) else {
            return;
        };
        let i_stop_a = self.assumed_stop_from(first);
        let before_assumed = self.secs(i_stop_a - stop);
        let window = self.tuning.last_stop_window_secs(last.mark_type);
        debug!(
            "Stop mark ({}) {}s before assumed stop ({}), allowed {}s",
            stop, before_assumed, i_stop_a, window
        );
        if before_assumed <= window {
            debug!("Use stop mark ({}) as end mark, recording length was too big", stop);
            marks.delete(last.position);
            marks.delete(prev);
        }
    }

    fn remove_short_pairs(&self, marks: &mut MarkStore) {
        let fps = self.ctx.fps;
        let rules = [
            (
                MarkType::LOGO_START,
                MarkType::LOGO_STOP,
                self.tuning.short_logo_part_secs,
            ),
            (MarkType::LOGO_STOP, MarkType::LOGO_START, self.tuning.short_logo_gap_secs),
            (
                MarkType::HBORDER_STOP,
                MarkType::HBORDER_START,
                self.tuning.short_hborder_gap_secs,
            ),
            (
                MarkType::VBORDER_STOP,
                MarkType::VBORDER_START,
                self.tuning.short_vborder_gap_secs,
            ),
        ];

        let mut cursor = first_position(marks);
        'marks: while let Some(position) = cursor {
            cursor = marks.after(position).map(|m| m.position);
            let (Some(mark), Some(next)) = (marks.get(position), marks.after(position)) else {
                continue;
            };
            let (mark_type, next_type, next_position) = (mark.mark_type, next.mark_type, next.position);
            let is_first = Some(position) == first_position(marks);
            for (first_type, second_type, max_secs) in rules {
                if mark_type != first_type || next_type != second_type {
                    continue;
                }
                // the selected start mark stays
                if mark_type == MarkType::LOGO_START && is_first {
                    continue;
                }
                if mark_type == MarkType::LOGO_STOP && self.is_gap_before_long_part(marks, position, next_position) {
                    debug!(
                        "Logo stop ({}) start ({}) before long broadcast part, keep",
                        position, next_position
                    );
                    continue;
                }
                if next_position - position <= fps.frames(max_secs as f64) {
                    info!(
                        "Mark distance between {} ({}) and {} ({}) too short, deleting",
                        mark_type, position, next_type, next_position
                    );
                    cursor = marks.after(next_position).map(|m| m.position);
                    marks.delete(next_position);
                    marks.delete(position);
                    continue 'marks;
                }
            }
        }
    }
}

fn first_position(marks: &MarkStore) -> Option<i32> {
    marks.first(MarkFilter::Any).map(|m| m.position)
}

fn last_position(marks: &MarkStore) -> Option<i32> {
    marks.last(MarkFilter::Any).map(|m| m.position)
}

/// Delete marks matching the predicate, except the first and the last mark
fn remove_inner<F>(marks: &mut MarkStore, predicate: F)
where
    F: Fn(&Mark) -> bool,
{
    let first = first_position(marks);
    let last = last_position(marks);
    let doomed: Vec<i32> = marks
        .iter()
        .filter(|m| Some(m.position) != first && Some(m.position) != last)
        .filter(|m| predicate(m))
        .map(|m| m.position)
        .collect();
    for position in doomed {
        debug!("Delete mark ({})", position);
        marks.delete(position);
    }
}

/// Replaces detector marks with broadcaster VPS events
pub struct VpsOverride<'a> {
    fps: FrameRate,
    /// Search window for pause events
    delta: i32,
    keyframes: &'a KeyframeIndex,
}

impl<'a> VpsOverride<'a> {
    pub fn new(fps: FrameRate, delta: i32, keyframes: &'a KeyframeIndex) -> Self {
        Self {
            fps,
            delta,
            keyframes,
        }
    }

    /// Apply start, pause start, pause stop and stop events in this order,
    /// then resolve same-class neighbours in favour of VPS marks
    pub fn apply(&self, marks: &mut MarkStore, events: &[VpsEvent]) {
        for kind in [VpsKind::Start, VpsKind::PauseStart, VpsKind::PauseStop, VpsKind::Stop] {
            match events.iter().find(|e| e.kind == kind) {
                Some(event) => {
                    info!("Found VPS {:?} event at offset {}s", kind, event.offset_secs);
                    self.apply_event(marks, event);
                }
                None => debug!("No VPS {:?} event found", kind),
            }
        }
        collapse_vps(marks);
    }

    /// Put a VPS mark at the event frame.
    ///
    /// Pause events replace the nearest mark of their class within `delta`
    /// frames. Start and stop events replace the first start and the last
    /// stop at any distance.
    fn apply_event(&self, marks: &mut MarkStore, event: &VpsEvent) {
        let Some(frame) = self
            .keyframes
            .frame_from_offset(event.offset_secs as i64 * 1000, self.fps)
        else {
            debug!("Failed to get frame from VPS offset {}s", event.offset_secs);
            return;
        };
        let class = event.kind.class();
        let vps_type = MarkType::new(Strength::Vps, class);
        let (class_name, star) = match class {
            MarkClass::Start => ("start", "*"),
            MarkClass::Stop => ("stop", ""),
        };
        debug!("VPS {:?} at frame ({}) at {}", event.kind, frame, frame_to_timestamp(frame, self.fps));

        let target = if event.kind.is_pause() {
            marks.around(self.delta, frame, class.into()).cloned()
        } else if class == MarkClass::Start {
            marks.first(class.into()).cloned()
        } else {
            marks.last(class.into()).cloned()
        };

        let Some(target) = target else {
            if event.kind.is_pause() {
                debug!("No mark to replace with VPS pause mark, add new mark");
                marks.add(
                    vps_type,
                    frame,
                    Some(format!("VPS {} ({}){}", pause_name(event.kind), frame, star)),
                    class == MarkClass::Start,
                );
            } else {
                debug!("No mark found to replace with VPS mark");
            }
            return;
        };

        if target.strength() >= Strength::Vps && target.mark_type != MarkType::RECORDING_START {
            debug!(
                "Keep mark ({}) {}, it is at least as trusted as a VPS mark",
                target.position, target.mark_type
            );
            return;
        }

        let comment = format!(
            "VPS {} ({}), moved from mark ({}) {} at {}{}",
            class_name,
            frame,
            target.position,
            target.mark_type.code(),
            frame_to_timestamp(target.position, self.fps),
            star
        );
        debug!("Replace mark ({}) {} with VPS mark ({})", target.position, target.mark_type, frame);
        marks.delete(target.position);
        marks.add(vps_type, frame, Some(comment), target.in_broadcast);

        match (class, event.kind.is_pause()) {
            (MarkClass::Start, false) => {
                marks.delete_weak_in_range(0, frame, Strength::Vps);
            }
            (MarkClass::Stop, false) => {
                marks.delete_weak_in_range(frame + 1, i32::MAX, Strength::Vps);
            }
            (MarkClass::Stop, true) => {
                if let Some(first) = marks.first(MarkFilter::Any).filter(|m| m.mark_type == MarkType::VPS_START) {
                    let first = first.position;
                    marks.delete_weak_in_range(first, frame, Strength::Vps);
                }
            }
            (MarkClass::Start, true) => {}
        }
    }
}

fn pause_name(kind: VpsKind) -> &'static str {
    match kind {
        VpsKind::PauseStart => "pause start",
        VpsKind::PauseStop => "pause stop",
        VpsKind::Start => "start",
        VpsKind::Stop => "stop",
    }
}

/// Resolve same-class neighbours left by VPS insertion; VPS marks win
fn collapse_vps(marks: &mut MarkStore) {
    let mut cursor = first_position(marks);
    while let Some(position) = cursor {
        let Some(mark) = marks.get(position).cloned() else {
            break;
        };
        if let Some(next) = marks.after(position).cloned() {
            if mark.mark_type.class == next.mark_type.class {
                let vps_type = MarkType::new(Strength::Vps, mark.mark_type.class);
                if mark.mark_type == vps_type {
                    debug!("Delete non VPS mark ({}) after VPS mark ({})", next.position, position);
                    marks.delete(next.position);
                    continue;
                }
                if next.mark_type == vps_type {
                    debug!("Delete non VPS mark ({}) before VPS mark ({})", position, next.position);
                    marks.delete(position);
                    cursor = Some(next.position);
                    continue;
                }
            }
        } else if mark.is_start() && Some(position) != first_position(marks) {
            debug!("Start mark ({}) at the end, delete it", position);
            marks.delete(position);
            break;
        }
        cursor = marks.after(position).map(|m| m.position);
    }
}

impl Session {
    /// Run the cleanup rules and the VPS override on the finalized sequence
    pub(crate) fn check_marks(&mut self) {
        self.debug_marks("Marks before cleanup");
        let ctx = CleanupContext {
            fps: self.fps(),
            length_secs: self.info.length_secs,
            in_broadcast: self.in_broadcast,
            got_end_mark: self.got_end_mark,
        };
        let removed = GlobalCleanup::new(&self.tuning, ctx).run(&mut self.marks);
        debug!("Cleanup removed {} marks", removed);

        if !self.vps_events.is_empty() {
            debug!("Apply {} VPS events", self.vps_events.len());
            let vps = VpsOverride::new(self.fps(), self.delta(), &self.keyframes);
            vps.apply(&mut self.marks, &self.vps_events);
        }
        self.debug_marks("Final marks");
        self.save();
    }
}
