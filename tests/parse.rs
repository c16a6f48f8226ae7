mod common;

use momotalk::{parse, Language, MessageBlock};
use std::sync::Arc;

fn names(blocks: &[MessageBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|b| match b {
            MessageBlock::Speaker { entity, .. } | MessageBlock::RelationshipBanner { entity, .. } => {
                Some(entity.name.clone())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn speaker_and_choices() {
    let catalog = common::catalog();
    let blocks = parse("/S Hoshino hello\nworld\n/O yes\nno", &[], &catalog).unwrap();

    assert_eq!(blocks.len(), 2);
    match &blocks[0] {
        MessageBlock::Speaker { entity, lines } => {
            assert_eq!(entity.id, 1);
            assert_eq!(entity.language, Language::Cn);
            assert_eq!(lines, &["hello", "world"]);
        }
        other => panic!("expected a speaker, got {:?}", other),
    }
    assert_eq!(
        blocks[1],
        MessageBlock::ChoiceList {
            options: vec!["yes".into(), "no".into()]
        }
    );
    assert_eq!(blocks[0].content(), "hello\nworld");
}

#[test]
fn exact_name_beats_longer_matches() {
    let catalog = common::catalog();
    let blocks = parse("/s aru hi", &[], &catalog).unwrap();
    assert_eq!(names(&blocks), ["Aru"]);
}

#[test]
fn numeric_suffix_picks_among_matches() {
    let catalog = common::catalog();
    let blocks = parse("/S hosh2 hi\n/S hosh3", &[], &catalog).unwrap();
    assert_eq!(names(&blocks), ["Hoshino (Swimsuit)", "Hoshino (Armed)"]);
}

#[test]
fn candidates_are_searched() {
    let catalog = common::catalog();
    let candidates = [Arc::new(common::student(50, "Yuuka"))];
    let blocks = parse("/K Yuuka", &candidates, &catalog).unwrap();
    assert_eq!(
        blocks[0],
        MessageBlock::RelationshipBanner {
            entity: momotalk::EntityRef {
                id: 50,
                name: "Yuuka".into(),
                language: Language::Cn,
            },
            caption: "Enter Yuuka's relationship story".into(),
        }
    );
}

#[test]
fn counterpart_and_empty_speaker() {
    let catalog = common::catalog();
    let blocks = parse("\n/T\nok\n\n/S Shiroko\n", &[], &catalog).unwrap();
    assert_eq!(
        blocks,
        vec![
            MessageBlock::Counterpart { lines: vec!["ok".into()] },
            MessageBlock::Speaker {
                entity: momotalk::EntityRef {
                    id: 6,
                    name: "Shiroko".into(),
                    language: Language::Cn,
                },
                lines: vec![],
            },
        ]
    );
}

#[test]
fn every_bad_line_is_reported_with_its_number() {
    let catalog = common::catalog();
    let errors = parse("hello\n/S Nobody hi\nstill nobody\n\n/S\n/T ok", &[], &catalog).unwrap_err();
    assert_eq!(
        errors.messages(),
        [
            "line 1: cannot parse \"he\" as a command",
            "line 2: no character matches \"Nobody\"",
            "line 5: missing character name",
        ]
    );
}

#[test]
fn ambiguous_names_list_their_matches() {
    let catalog = common::catalog();
    let errors = parse("/S aru2x", &[], &catalog).unwrap_err();
    assert_eq!(errors.messages(), ["line 1: no character matches \"aru2x\""]);

    let errors = parse("/S ru", &[], &catalog).unwrap_err();
    assert_eq!(
        errors.messages(),
        ["line 1: \"ru\" may refer to 1.Aru/2.Aru (New Year), use a more precise name or ru+number"]
    );
}

#[test]
fn script_without_commands_is_rejected() {
    let catalog = common::catalog();
    let errors = parse("\n  \n", &[], &catalog).unwrap_err();
    assert_eq!(errors.messages(), ["script contains no command lines"]);
}

#[test]
fn index_suffix_applies_when_the_bare_name_is_ambiguous() {
    let catalog = momotalk::Catalog::from_records([
        common::student(1, "Hoshino (Swimsuit)"),
        common::student(2, "Hoshino (Armed)"),
        common::student(3, "Hoshino (New Year)"),
    ]);
    let errors = parse("/S Hoshino", &[], &catalog).unwrap_err();
    assert!(errors.messages()[0].starts_with("line 1: \"Hoshino\" may refer to 1.Hoshino (Swimsuit)/"));

    let blocks = parse("/S Hoshino2 hi", &[], &catalog).unwrap();
    assert_eq!(names(&blocks), ["Hoshino (Armed)"]);
}

#[test]
fn too_many_matches_is_rejected() {
    let catalog = momotalk::Catalog::from_records(
        ["A", "B", "C", "D", "E", "F"]
            .iter()
            .enumerate()
            .map(|(i, s)| common::student(i as u32 + 1, &format!("Aru {}", s))),
    );
    let errors = parse("/T hi\n/S aru", &[], &catalog).unwrap_err();
    assert_eq!(
        errors.messages(),
        ["line 2: \"aru\" is too ambiguous, use a more precise name"]
    );
}
