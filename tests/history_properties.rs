//! Undo/redo property tests
//!
//! Drive a session with random insert/remove sequences and check that the
//! history reproduces every state exactly, text and underline formats alike.

use proptest::{prelude::*, prop_oneof};
use proptest::test_runner::Config as ProptestConfig;
use seisho::{AutoCorrectConfig, AutoCorrectEngine, Document, EditorSession, UndoGrouping};

const ALPHABET: &[char] = &['a', 'b', 'Z', 'é', 'ß', '.', '.', ' ', '\n', ','];

#[derive(Debug, Clone)]
enum Operation {
    Insert { pos: usize, text: String },
    Remove { pos: usize, len: usize },
}

fn text_strategy(max: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(ALPHABET), 0..max)
        .prop_map(|chars| chars.into_iter().collect())
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let insert = (0u16..64u16, text_strategy(6)).prop_map(|(pos, text)| Operation::Insert {
        pos: pos as usize,
        text,
    });
    let remove = (0u16..64u16, 0u16..4u16).prop_map(|(pos, len)| Operation::Remove {
        pos: pos as usize,
        len: len as usize,
    });

    prop_oneof![insert, remove]
}

fn grouping_strategy() -> impl Strategy<Value = UndoGrouping> {
    prop_oneof![Just(UndoGrouping::Merged), Just(UndoGrouping::Separate)]
}

fn is_fixed_point(document: &Document) -> bool {
    let mut rerun = document.clone();
    AutoCorrectEngine::new().run(&mut rerun);
    rerun == *document
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn undo_and_redo_reproduce_every_state(
        initial in text_strategy(24),
        ops in proptest::collection::vec(operation_strategy(), 0..12),
        grouping in grouping_strategy(),
    ) {
        let config = AutoCorrectConfig {
            undo_grouping: grouping,
            ..AutoCorrectConfig::default()
        };
        let mut session = EditorSession::with_text(&initial, config);
        let start = session.document().clone();

        for op in ops {
            let len = session.document().len_chars();
            match op {
                Operation::Insert { pos, text } => {
                    session.insert(pos % (len + 1), &text).unwrap();
                }
                Operation::Remove { pos, len: count } => {
                    let position = pos % (len + 1);
                    let count = count.min(len - position);
                    session.remove(position, count).unwrap();
                }
            }
            prop_assert!(
                is_fixed_point(session.document()),
                "not corrected after {:?}",
                session.text()
            );
        }
        let end = session.document().clone();

        while session.can_undo() {
            prop_assert!(session.undo().unwrap());
        }
        prop_assert_eq!(session.document(), &start);

        while session.can_redo() {
            prop_assert!(session.redo().unwrap());
        }
        prop_assert_eq!(session.document(), &end);
        prop_assert!(is_fixed_point(session.document()));
    }
}
