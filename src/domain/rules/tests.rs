// Unit tests for engine rules

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;
    use crate::domain::rules::*;

    #[test]
    fn test_default_tuning_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_astopoffs() {
        let tuning = Tuning {
            astopoffs_secs: 300,
            ..Tuning::default()
        };
        assert!(matches!(tuning.validate(), Err(DomainError::BadArgs(_))));
    }

    #[test]
    fn test_empty_info_logo_window() {
        let tuning = Tuning {
            info_logo_min_secs: 20,
            info_logo_max_secs: 10,
            ..Tuning::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_delta() {
        let tuning = Tuning::default();
        assert_eq!(tuning.delta(FrameRate(25.0)), 1500);
        assert_eq!(tuning.delta(FrameRate(50.0)), 3000);
    }

    #[test]
    fn test_channel_overrides() {
        let tuning = Tuning::default();
        assert_eq!(tuning.silence_range_for("DMAX"), 12);
        assert_eq!(tuning.silence_range_for("TELE_5"), 7);
        assert_eq!(tuning.silence_range_for("Das_Erste"), 5);
        assert_eq!(tuning.black_range_for("Disney_Channel"), 5500);
        assert_eq!(tuning.black_range_for("DMAX"), 4270);
    }

    #[test]
    fn test_last_stop_window() {
        let tuning = Tuning::default();
        assert_eq!(tuning.last_stop_window_secs(MarkType::ASSUMED_STOP), 389);
        assert_eq!(tuning.last_stop_window_secs(MarkType::BLACK_STOP), 351);
        assert_eq!(tuning.last_stop_window_secs(MarkType::LOGO_STOP), 306);
        assert_eq!(tuning.last_stop_window_secs(MarkType::HBORDER_STOP), 300);
    }

    #[test]
    fn test_conflict_window() {
        let tuning = Tuning::default();
        assert_eq!(MarkConflictPolicy::window_secs(&tuning, false, false), 2);
        assert_eq!(MarkConflictPolicy::window_secs(&tuning, true, false), 30);
        assert_eq!(MarkConflictPolicy::window_secs(&tuning, true, true), 15);
        assert_eq!(MarkConflictPolicy::window_secs(&tuning, false, true), 15);
    }

    #[test]
    fn test_conflict_survivor_prefers_stronger() {
        assert_eq!(
            MarkConflictPolicy::survivor(MarkType::LOGO_START, MarkType::ASPECT_START),
            MarkType::ASPECT_START
        );
        assert_eq!(
            MarkConflictPolicy::survivor(MarkType::CHANNEL_STOP, MarkType::BLACK_STOP),
            MarkType::CHANNEL_STOP
        );
    }

    #[test]
    fn test_tuning_partial_toml() {
        let tuning: Tuning = toml::from_str("silence_range_secs = 9\nblack_range_ms = 3000\n").unwrap();
        assert_eq!(tuning.silence_range_secs, 9);
        assert_eq!(tuning.black_range_ms, 3000);
        assert_eq!(tuning.max_range_secs, 60);
    }
}
