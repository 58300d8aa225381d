//! Property tests for mark store and cleanup invariants

use admark::adapters::MarksFileAdapter;
use admark::domain::marks::MarkStore;
use admark::domain::model::*;
use admark::domain::rules::Tuning;
use admark::engine::cleanup::{CleanupContext, GlobalCleanup};
use proptest::prelude::*;

const STRENGTHS: [Strength; 10] = [
    Strength::Assumed,
    Strength::BlackScreen,
    Strength::Logo,
    Strength::VBorder,
    Strength::HBorder,
    Strength::Aspect,
    Strength::Channel,
    Strength::Vps,
    Strength::Recording,
    Strength::Moved,
];

fn mark_type() -> impl Strategy<Value = MarkType> {
    (prop::sample::select(STRENGTHS.to_vec()), any::<bool>()).prop_map(|(strength, start)| {
        let class = if start { MarkClass::Start } else { MarkClass::Stop };
        MarkType::new(strength, class)
    })
}

fn marks() -> impl Strategy<Value = Vec<(MarkType, i32)>> {
    prop::collection::vec((mark_type(), 0..200_000i32), 0..24)
}

fn store_from(marks: &[(MarkType, i32)]) -> MarkStore {
    let mut store = MarkStore::new();
    for (mark_type, position) in marks {
        store.add(*mark_type, *position, Some(format!("test mark ({})", position)), mark_type.is_start());
    }
    store
}

fn finished_recording() -> CleanupContext {
    CleanupContext {
        fps: FrameRate(25.0),
        length_secs: 5400,
        in_broadcast: false,
        got_end_mark: true,
    }
}

proptest! {
    #[test]
    fn store_positions_strictly_increase(marks in marks()) {
        let store = store_from(&marks);
        let positions = store.positions(MarkFilter::Any);
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));

        for (_, position) in &marks {
            let strongest = marks
                .iter()
                .filter(|(_, p)| p == position)
                .map(|(t, _)| *t)
                .max();
            prop_assert_eq!(store.get(*position).map(|m| m.mark_type), strongest);
        }
    }

    #[test]
    fn cleanup_settles_and_is_idempotent(marks in marks()) {
        let tuning = Tuning::default();
        let cleanup = GlobalCleanup::new(&tuning, finished_recording());
        let mut store = store_from(&marks);
        cleanup.run(&mut store);
        prop_assert!(store.is_settled());

        let once = store.to_vec();
        prop_assert_eq!(cleanup.run(&mut store), 0);
        prop_assert_eq!(store.to_vec(), once);
    }

    #[test]
    fn marks_file_preserves_sequence(marks in marks()) {
        let fps = FrameRate(25.0);
        let store = store_from(&marks);
        let parsed = MarksFileAdapter::parse(&MarksFileAdapter::render(&store, fps), fps).unwrap();
        let expected: Vec<(i32, MarkType, Option<String>)> =
            store.iter().map(|m| (m.position, m.mark_type, m.comment.clone())).collect();
        let actual: Vec<(i32, MarkType, Option<String>)> =
            parsed.iter().map(|m| (m.position, m.mark_type, m.comment.clone())).collect();
        prop_assert_eq!(actual, expected);
    }
}
