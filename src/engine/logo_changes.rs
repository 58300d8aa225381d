//! Removal of logo stop/start pairs caused by info overlays or logo changes

use tracing::{debug, info, warn};

use super::session::Session;
use crate::domain::model::*;
use crate::domain::pairs::{LogoPairEvaluator, PairContext, TriState};
use crate::ports::LogoSectionPort;

impl Session {
    /// Analyze every candidate logo stop/start pair and delete the ones that
    /// do not bound advertising
    pub(crate) fn remove_logo_change_marks(&mut self, sections: &mut dyn LogoSectionPort) {
        debug!("Detect and remove logo stop/start pairs with special logo");
        let ctx = PairContext {
            fps: self.fps(),
            i_start: self.positions.i_start,
            chk_start: self.positions.chk_start,
            i_stop_a: self.positions.i_stop_a,
        };
        let mut evaluator = LogoPairEvaluator::new(&self.marks, &self.black_marks, ctx, &self.tuning);

        while let Some(pair) = evaluator.get_next_pair() {
            if self.is_aborted() {
                debug!("Abort requested, stop logo pair analysis");
                break;
            }
            let (stop, start) = (pair.stop_position, pair.start_position);
            debug!(
                "Check logo stop ({}) at {} and logo start ({}) at {}, info logo {:?}",
                stop,
                self.timestamp(stop),
                start,
                self.timestamp(start),
                pair.is_info_logo
            );

            let mut matched = false;
            if pair.is_info_logo != TriState::No && query(sections.is_info_logo(stop, start), "info logo") {
                debug!(
                    "Info logo found between ({}) and ({}), deleting marks between these positions",
                    stop, start
                );
                evaluator.set_info_logo(stop, start);
                self.marks.delete_range(stop, start, Strength::Logo.into());
                matched = true;
            }
            if pair.is_logo_change != TriState::No && query(sections.is_logo_change(stop, start), "logo change") {
                info!(
                    "Logo has changed between ({}) at {} and ({}) at {}, deleting marks between these positions",
                    stop,
                    self.timestamp(stop),
                    start,
                    self.timestamp(start)
                );
                self.marks.delete_range(stop, start, Strength::Logo.into());
                matched = true;
            }
            if !matched {
                let credits = match sections.closing_credits_end(stop, start) {
                    Ok(Some(end)) if end >= start - 1 => TriState::Yes,
                    Ok(_) => TriState::No,
                    Err(e) => {
                        warn!("Closing credits analysis between ({}) and ({}) failed: {}", stop, start, e);
                        TriState::No
                    }
                };
                if credits == TriState::Yes {
                    debug!("Closing credits without logo between ({}) and ({})", stop, start);
                }
                evaluator.set_closing_credits(stop, start, credits);
            }
        }

        self.evaluator = Some(evaluator);
        self.debug_marks("Marks after logo change removal");
    }
}

fn query(result: Result<bool, crate::domain::errors::DomainError>, what: &str) -> bool {
    result.unwrap_or_else(|e| {
        warn!("{} analysis failed: {}", what, e);
        false
    })
}
