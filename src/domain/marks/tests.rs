// Unit tests for the mark store

#[cfg(test)]
mod tests {
    use crate::domain::marks::*;
    use crate::domain::model::*;

    fn store_with(marks: &[(MarkType, i32)]) -> MarkStore {
        let mut store = MarkStore::new();
        for (mark_type, position) in marks {
            store.add(*mark_type, *position, None, false);
        }
        store
    }

    #[test]
    fn test_add_keeps_position_order() {
        let store = store_with(&[
            (MarkType::LOGO_STOP, 500),
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_START, 900),
        ]);
        assert_eq!(store.positions(MarkFilter::Any), vec![100, 500, 900]);
    }

    #[test]
    fn test_add_collision_keeps_stronger() {
        let mut store = MarkStore::new();
        store.add(MarkType::LOGO_START, 100, Some("logo".to_string()), true);
        store.add(MarkType::BLACK_START, 100, Some("black".to_string()), false);
        let mark = store.get(100).unwrap();
        assert_eq!(mark.mark_type, MarkType::LOGO_START);
        assert_eq!(mark.comment.as_deref(), Some("logo"));

        store.add(MarkType::ASPECT_START, 100, Some("aspect".to_string()), true);
        assert_eq!(store.get(100).unwrap().mark_type, MarkType::ASPECT_START);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_next_and_prev_are_strict() {
        let store = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::LOGO_START, 300),
        ]);
        let start = MarkFilter::Type(MarkType::LOGO_START);
        assert_eq!(store.next(100, start).unwrap().position, 300);
        assert_eq!(store.prev(300, start).unwrap().position, 100);
        assert!(store.prev(100, start).is_none());
        assert_eq!(store.next(150, MarkFilter::Any).unwrap().position, 200);
    }

    #[test]
    fn test_around_prefers_nearest_then_earlier() {
        let store = store_with(&[(MarkType::LOGO_START, 100), (MarkType::LOGO_START, 300)]);
        let start = MarkFilter::Type(MarkType::LOGO_START);
        assert_eq!(store.around(150, 210, start).unwrap().position, 300);
        assert_eq!(store.around(150, 200, start).unwrap().position, 100);
        assert_eq!(store.around(150, 190, start).unwrap().position, 100);
        assert!(store.around(50, 200, start).is_none());
        assert_eq!(store.around(0, 300, start).unwrap().position, 300);
    }

    #[test]
    fn test_delete_weak_in_range_is_half_open() {
        let mut store = store_with(&[
            (MarkType::BLACK_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::CHANNEL_START, 300),
            (MarkType::LOGO_START, 400),
        ]);
        let removed = store.delete_weak_in_range(100, 400, Strength::Channel);
        assert_eq!(removed.len(), 2);
        assert_eq!(store.positions(MarkFilter::Any), vec![300, 400]);
    }

    #[test]
    fn test_delete_range_is_inclusive() {
        let mut store = store_with(&[
            (MarkType::LOGO_STOP, 100),
            (MarkType::HBORDER_START, 150),
            (MarkType::LOGO_START, 200),
            (MarkType::LOGO_STOP, 201),
        ]);
        store.delete_range(100, 200, MarkFilter::Strength(Strength::Logo));
        assert_eq!(store.positions(MarkFilter::Any), vec![150, 201]);
    }

    #[test]
    fn test_delete_till() {
        let mut store = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::LOGO_START, 300),
        ]);
        let removed = store.delete_till(200, true);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.positions(MarkFilter::Any), vec![200, 300]);

        store.delete_till(200, false);
        assert_eq!(store.positions(MarkFilter::Any), vec![200]);
    }

    #[test]
    fn test_delete_type_by_class() {
        let mut store = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::ASPECT_START, 300),
        ]);
        store.delete_type(MarkFilter::Class(MarkClass::Start));
        assert_eq!(store.positions(MarkFilter::Any), vec![200]);
    }

    #[test]
    fn test_move_mark_tags_moved() {
        let mut store = store_with(&[(MarkType::LOGO_STOP, 1000)]);
        let new_position = store.move_mark(1000, 1040, "silence").unwrap();
        assert_eq!(new_position, 1040);
        assert!(store.get(1000).is_none());
        let mark = store.get(1040).unwrap();
        assert_eq!(mark.mark_type, MarkType::moved(MarkClass::Stop));
        assert_eq!(mark.old_type, Some(MarkType::LOGO_STOP));
        assert!(mark.comment.as_deref().unwrap().contains("silence"));

        store.move_mark(1040, 1050, "black screen");
        assert_eq!(store.get(1050).unwrap().old_type, Some(MarkType::LOGO_STOP));
    }

    #[test]
    fn test_move_missing_mark() {
        let mut store = MarkStore::new();
        assert!(store.move_mark(5, 10, "overlap").is_none());
    }

    #[test]
    fn test_count_and_first_last() {
        let store = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::HBORDER_START, 300),
            (MarkType::HBORDER_STOP, 400),
        ]);
        assert_eq!(store.count(MarkFilter::Strength(Strength::HBorder)), 2);
        assert_eq!(store.first(MarkFilter::Class(MarkClass::Stop)).unwrap().position, 200);
        assert_eq!(store.last(MarkFilter::Class(MarkClass::Start)).unwrap().position, 300);
    }

    #[test]
    fn test_logo_stop_start_pairs() {
        let store = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::LOGO_START, 300),
            (MarkType::LOGO_STOP, 400),
            (MarkType::LOGO_START, 500),
        ]);
        assert_eq!(store.logo_stop_start_pairs(), 2);
    }

    #[test]
    fn test_is_settled() {
        let store = store_with(&[(MarkType::LOGO_START, 100), (MarkType::LOGO_STOP, 200)]);
        assert!(store.is_settled());
        let store = store_with(&[(MarkType::LOGO_STOP, 100), (MarkType::LOGO_START, 200)]);
        assert!(!store.is_settled());
        let store = store_with(&[(MarkType::LOGO_START, 100), (MarkType::ASPECT_START, 200)]);
        assert!(!store.is_settled());
    }
}
