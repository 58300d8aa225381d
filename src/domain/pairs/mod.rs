// Logo pair evaluation - Classifies logo stop/start gaps

use tracing::debug;

use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::domain::rules::Tuning;

/// Three-valued classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    #[default]
    Unknown,
    Yes,
    No,
}

/// A logo stop followed by a logo start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoStopStartPair {
    pub stop_position: i32,
    pub start_position: i32,
    /// Candidate for a logo style change
    pub is_logo_change: TriState,
    /// Candidate for an info overlay hiding the logo
    pub is_info_logo: TriState,
    /// Confirmed as info overlay by the logo section analysis
    pub info_logo_confirmed: bool,
    pub is_advertising: bool,
    pub is_start_mark_in_broadcast: bool,
    pub is_closing_credits: TriState,
}

impl LogoStopStartPair {
    fn new(stop_position: i32, start_position: i32) -> Self {
        Self {
            stop_position,
            start_position,
            is_logo_change: TriState::Unknown,
            is_info_logo: TriState::Unknown,
            info_logo_confirmed: false,
            is_advertising: false,
            is_start_mark_in_broadcast: false,
            is_closing_credits: TriState::Unknown,
        }
    }
}

/// Check positions the evaluation depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairContext {
    pub fps: FrameRate,
    /// Positive while the start boundary is still being searched
    pub i_start: i32,
    pub chk_start: i32,
    pub i_stop_a: i32,
}

/// Builds and classifies all logo stop/start pairs of a mark sequence.
///
/// The pair cursor only moves forward; build a new evaluator to restart.
#[derive(Debug, Clone)]
pub struct LogoPairEvaluator {
    pairs: Vec<LogoStopStartPair>,
    cursor: usize,
}

impl LogoPairEvaluator {
    /// Build the pair list and classify every pair
    pub fn new(marks: &MarkStore, black_marks: &MarkStore, ctx: PairContext, tuning: &Tuning) -> Self {
        debug!(
            "Evaluating logo stop/start pairs with i_start {}, chk_start {}, i_stop_a {}",
            ctx.i_start, ctx.chk_start, ctx.i_stop_a
        );
        let mut pairs = Vec::new();
        let mut stop: Option<i32> = None;
        for mark in marks.iter() {
            if mark.mark_type == MarkType::LOGO_STOP {
                stop = Some(mark.position);
            }
            if mark.mark_type == MarkType::LOGO_START {
                if let Some(stop_position) = stop.take() {
                    pairs.push(LogoStopStartPair::new(stop_position, mark.position));
                }
            }
        }

        let fps = ctx.fps;
        for pair in pairs.iter_mut() {
            pair.is_info_logo = classify_info_logo(black_marks, pair, fps, tuning);

            let stop_after_pair = marks
                .next(pair.stop_position, MarkFilter::Type(MarkType::LOGO_STOP))
                .map(|m| m.position);

            let mut delta_stop_start = fps.secs(pair.start_position - pair.stop_position);
            if delta_stop_start < tuning.logo_change_min_secs && pair.is_info_logo == TriState::No {
                debug!(
                    "Pair stop ({}) start ({}): delta too small {}s (expect >= {}s)",
                    pair.stop_position, pair.start_position, delta_stop_start, tuning.logo_change_min_secs
                );
                match marks.next(pair.start_position, MarkFilter::Type(MarkType::LOGO_START)) {
                    Some(next_start) => {
                        let delta_new = fps.secs(next_start.position - pair.stop_position);
                        if delta_new > tuning.logo_change_max_secs {
                            debug!("Next logo start ({}) too far away", next_start.position);
                        } else {
                            debug!("Replace logo start with next logo start ({})", next_start.position);
                            pair.start_position = next_start.position;
                            delta_stop_start = delta_new;
                        }
                    }
                    None => pair.is_logo_change = TriState::No,
                }
            }
            if delta_stop_start > tuning.logo_change_max_secs {
                debug!(
                    "Pair stop ({}) start ({}): delta too big {}s (expect <= {}s)",
                    pair.stop_position, pair.start_position, delta_stop_start, tuning.logo_change_max_secs
                );
                pair.is_logo_change = TriState::No;
            }
            if delta_stop_start >= tuning.advertising_min_secs {
                debug!(
                    "Pair stop ({}) start ({}): {}s is advertising",
                    pair.stop_position, pair.start_position, delta_stop_start
                );
                pair.is_advertising = true;
            }

            let mut delta_stop_after_pair = 0;
            match stop_after_pair {
                Some(next_stop) => {
                    delta_stop_after_pair = fps.secs(next_stop - pair.start_position);
                }
                None if ctx.i_start > 0 => {
                    let diff = fps.secs(ctx.chk_start - pair.stop_position);
                    delta_stop_after_pair = if diff > tuning.start_in_broadcast_secs {
                        diff
                    } else {
                        tuning.next_stop_min_secs
                    };
                }
                None => {
                    if pair.stop_position < ctx.i_stop_a {
                        pair.is_logo_change = TriState::No;
                    }
                }
            }
            if delta_stop_after_pair > 0 && delta_stop_after_pair < tuning.next_stop_min_secs {
                debug!(
                    "Pair stop ({}) start ({}): next logo stop too fast after pair {}s",
                    pair.stop_position, pair.start_position, delta_stop_after_pair
                );
                pair.is_logo_change = TriState::No;
            }
            if delta_stop_after_pair >= tuning.start_in_broadcast_secs {
                debug!(
                    "Pair stop ({}) start ({}): next logo stop in {}s, start is in broadcast",
                    pair.stop_position, pair.start_position, delta_stop_after_pair
                );
                pair.is_start_mark_in_broadcast = true;
            }
        }

        protect_broadcast_start(&mut pairs);

        for pair in &pairs {
            debug!(
                "Pair stop ({}) start ({}): logo change {:?}, info logo {:?}, advertising {}, start in broadcast {}",
                pair.stop_position,
                pair.start_position,
                pair.is_logo_change,
                pair.is_info_logo,
                pair.is_advertising,
                pair.is_start_mark_in_broadcast
            );
        }

        Self { pairs, cursor: 0 }
    }

    /// All pairs in position order
    pub fn pairs(&self) -> &[LogoStopStartPair] {
        &self.pairs
    }

    /// Next pair that is still a logo change or info logo candidate
    pub fn get_next_pair(&mut self) -> Option<LogoStopStartPair> {
        while let Some(pair) = self.pairs.get(self.cursor) {
            self.cursor += 1;
            if pair.is_logo_change == TriState::No && pair.is_info_logo == TriState::No {
                continue;
            }
            return Some(pair.clone());
        }
        None
    }

    fn find_mut(&mut self, stop_position: i32, start_position: i32) -> Option<&mut LogoStopStartPair> {
        self.pairs
            .iter_mut()
            .find(|p| p.stop_position == stop_position && p.start_position == start_position)
    }

    /// Record that a pair was confirmed as info logo
    pub fn set_info_logo(&mut self, stop_position: i32, start_position: i32) {
        if let Some(pair) = self.find_mut(stop_position, start_position) {
            pair.is_info_logo = TriState::Yes;
            pair.info_logo_confirmed = true;
        }
    }

    /// Record the closing credits state of a pair
    pub fn set_closing_credits(&mut self, stop_position: i32, start_position: i32, state: TriState) {
        if let Some(pair) = self.find_mut(stop_position, start_position) {
            pair.is_closing_credits = state;
        }
    }

    /// Whether the logo start at a position ends closing credits
    pub fn closing_credits_at(&self, start_position: i32) -> bool {
        self.pairs
            .iter()
            .any(|p| p.start_position == start_position && p.is_closing_credits == TriState::Yes)
    }

    /// Whether a confirmed info logo lies inside `[from, to]`
    pub fn includes_info_logo(&self, from: i32, to: i32) -> bool {
        self.pairs
            .iter()
            .any(|p| p.info_logo_confirmed && p.stop_position >= from && p.start_position <= to)
    }
}

/// Info-logo candidate when the gap fits the window and no long black screen
/// sits right before, inside or right after it
fn classify_info_logo(
    black_marks: &MarkStore,
    pair: &LogoStopStartPair,
    fps: FrameRate,
    tuning: &Tuning,
) -> TriState {
    let length = fps.secs(pair.start_position - pair.stop_position);
    if length < tuning.info_logo_min_secs || length > tuning.info_logo_max_secs {
        debug!(
            "Pair stop ({}) start ({}): length {}s outside info logo window",
            pair.stop_position, pair.start_position, length
        );
        return TriState::No;
    }

    let black_stop_type = MarkFilter::Type(MarkType::BLACK_STOP);
    let black_start_type = MarkFilter::Type(MarkType::BLACK_START);

    // black screen ending at the logo stop
    let black_stop = black_marks.prev(pair.stop_position + 1, black_stop_type);
    let black_start = black_marks.prev(pair.stop_position + 1, black_start_type);
    if let (Some(black_stop), Some(black_start)) = (black_stop, black_start) {
        let diff = fps.centis(pair.stop_position - black_start.position);
        let length_black = fps.centis(black_start.position - black_stop.position);
        if length_black > tuning.black_before_stop_min_centis && diff < 1 {
            debug!(
                "Pair stop ({}) start ({}): long black screen before stop, no info logo",
                pair.stop_position, pair.start_position
            );
            return TriState::No;
        }
    }

    // black screen inside the gap
    if let Some(black_stop) = black_marks.next(pair.stop_position, black_stop_type) {
        if let Some(black_start) = black_marks.next(black_stop.position, black_start_type) {
            if black_stop.position <= pair.start_position && black_start.position <= pair.start_position {
                let length_black = fps.centis(black_start.position - black_stop.position);
                if length_black > tuning.black_between_max_centis {
                    debug!(
                        "Pair stop ({}) start ({}): black screen inside gap, no info logo",
                        pair.stop_position, pair.start_position
                    );
                    return TriState::No;
                }
            }
        }
    }

    // black screen right after the logo start
    let black_stop = black_marks.next(pair.start_position - 1, black_stop_type);
    let black_start = black_marks.next(pair.start_position - 1, black_start_type);
    if let (Some(black_stop), Some(black_start)) = (black_stop, black_start) {
        let diff = fps.centis(black_start.position - pair.start_position);
        let length_black = fps.centis(black_stop.position - black_start.position);
        if length_black > tuning.black_after_start_min_centis && diff < 1 {
            debug!(
                "Pair stop ({}) start ({}): long black screen after start, no info logo",
                pair.stop_position, pair.start_position
            );
            return TriState::No;
        }
    }

    debug!(
        "Pair stop ({}) start ({}): possible info logo, length {}s",
        pair.stop_position, pair.start_position, length
    );
    TriState::Yes
}

/// Keep the pair between an advertising pair and the first in-broadcast pair;
/// it holds the real broadcast start
fn protect_broadcast_start(pairs: &mut [LogoStopStartPair]) {
    let is_unknown = |p: &LogoStopStartPair| p.is_logo_change == TriState::Unknown && !p.is_start_mark_in_broadcast;
    for i in 0..pairs.len() {
        if !pairs[i].is_advertising {
            continue;
        }
        let Some(next) = pairs.get(i + 1) else { continue };
        if !is_unknown(next) {
            continue;
        }
        let Some(next2) = pairs.get(i + 2) else { continue };
        let next2_in_broadcast = next2.is_start_mark_in_broadcast;
        let next2_unknown = is_unknown(next2);
        if next2_in_broadcast {
            debug!(
                "Pair stop ({}) start ({}): between advertising and broadcast, keep",
                pairs[i + 1].stop_position,
                pairs[i + 1].start_position
            );
            pairs[i + 1].is_logo_change = TriState::No;
        }
        if next2_unknown {
            if let Some(next3) = pairs.get(i + 3) {
                if next3.is_start_mark_in_broadcast {
                    debug!(
                        "Pair stop ({}) start ({}): between advertising and broadcast, keep",
                        pairs[i + 2].stop_position,
                        pairs[i + 2].start_position
                    );
                    pairs[i + 2].is_logo_change = TriState::No;
                }
            }
        }
    }
}
