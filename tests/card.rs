mod common;

use common::Fixture;
use momotalk::card::{CardOptions, CardRenderer, CARD_MIN_HEIGHT, CARD_WIDTH};
use momotalk::items::{Item, ItemCatalog};
use momotalk::record::{EntityRecord, Skill, SkillKind};
use momotalk::{AssetKind, Catalog, Language};
use std::sync::Arc;

fn skill(kind: SkillKind, name: &str, desc: &str) -> Skill {
    Skill {
        kind,
        name: name.to_string(),
        desc: desc.to_string(),
        parameters: vec![(1..=6).map(|n| n.to_string()).collect()],
        cost: vec![5, 4, 4, 3, 3],
        icon: String::new(),
    }
}

fn hoshino() -> EntityRecord {
    EntityRecord {
        id: 10000,
        name: "Hoshino".into(),
        path_name: "Hoshino".into(),
        dev_name: "CH0063".into(),
        school: "Abydos".into(),
        club: "Countermeasure".into(),
        favor_item_tags: vec!["BC".into()],
        furniture_interaction: vec![1001, 1001],
        equipment: vec!["Hat".into(), "Bag".into()],
        skills: vec![
            skill(SkillKind::Autoattack, "Normal Attack", "Shoots"),
            skill(SkillKind::Ex, "Tactical Suppression", "Deals <?1> damage"),
            skill(SkillKind::Public, "Protect", "Shields for <?1> seconds"),
        ],
        max_hp1: 3000.0,
        max_hp100: 30000.0,
        attack_power1: 100.0,
        attack_power100: 1000.0,
        language: Some(Language::Cn),
        ..EntityRecord::default()
    }
}

fn fixture() -> Fixture {
    let mut english = hoshino();
    english.name = "Hoshino (en)".into();
    english.language = Some(Language::En);
    Fixture::with_records(Catalog::from_records([hoshino(), english]))
}

#[test]
fn card_is_fixed_width_and_never_short() {
    let fixture = fixture();
    let bare = EntityRecord {
        id: 7,
        name: "Nobody".into(),
        ..EntityRecord::default()
    };
    let image = CardRenderer::new(fixture.resources.clone())
        .render(&bare, Language::Cn, None)
        .unwrap();
    assert_eq!(image.width, CARD_WIDTH);
    assert!(image.height >= CARD_MIN_HEIGHT);
    assert_eq!(common::dimensions(&image.png_data), (image.width, image.height));
}

#[test]
fn skills_are_expanded_and_labelled() {
    let fixture = fixture();
    CardRenderer::new(fixture.resources.clone())
        .render(&hoshino(), Language::En, None)
        .unwrap();
    let seen = fixture.text.seen();
    let has = |s: &str| seen.iter().any(|t| t == s);

    assert!(has("Hoshino (en)"));
    assert!(has("Skills"));
    assert!(has("Deals 1/2/3/4/5 damage"));
    assert!(has("Shields for 1/2/3/4/5/6 seconds"));
    assert!(has("EX Skill · Cost 3"));
    assert!(has("Basic Skill"));
    assert!(has("Level 90 / 5 Stars / Bond 20"));
    assert!(!has("Normal Attack"));
    assert!(!has("Shoots"));
}

#[test]
fn missing_language_copy_falls_back_to_the_given_record() {
    let fixture = fixture();
    CardRenderer::new(fixture.resources.clone())
        .render(&hoshino(), Language::Jp, None)
        .unwrap();
    assert!(fixture.text.seen().iter().any(|t| t == "Hoshino"));
}

#[test]
fn gifts_and_equipment_use_the_item_tables() {
    let fixture = fixture();
    CardRenderer::new(fixture.resources.clone())
        .render(&hoshino(), Language::En, None)
        .unwrap();
    let seen = fixture.text.seen();
    assert!(seen.iter().any(|t| t == "Cap"));
    assert!(seen.iter().any(|t| t == "Bag"));
    assert!(seen.iter().any(|t| t == "Favorite Gifts"));
    assert!(!seen.iter().any(|t| t == "None"));
}

#[test]
fn stat_options_change_the_table() {
    let fixture = fixture();
    let options = CardOptions {
        level: 1,
        star_grade: 1,
        bond_level: 1,
    };
    CardRenderer::with_options(fixture.resources.clone(), options)
        .render(&hoshino(), Language::En, None)
        .unwrap();
    assert!(fixture.text.seen().iter().any(|t| t == "Level 1 / 1 Stars / Bond 1"));
}

#[test]
fn portrait_adds_height() {
    let fixture = fixture();
    let renderer = CardRenderer::new(fixture.resources.clone());
    let without = renderer.render(&hoshino(), Language::Cn, None).unwrap();

    let fixture = self::fixture();
    fixture.add_asset(AssetKind::Portrait, "CH0063", 400, 200);
    let renderer = CardRenderer::new(fixture.resources.clone());
    let with = renderer.render(&hoshino(), Language::Cn, None).unwrap();
    // 400x200 is scaled up to the 696 inner width
    assert_eq!(with.height, without.height - 24 + 348 + 12);
}

#[test]
fn card_rendering_is_deterministic() {
    let fixture = fixture();
    fixture.add_asset(AssetKind::Icon, "Hoshino", 32, 32);
    let renderer = CardRenderer::new(fixture.resources.clone());
    let a = renderer.render(&hoshino(), Language::En, Some("momotalk")).unwrap();
    let b = renderer.render(&hoshino(), Language::En, Some("momotalk")).unwrap();
    assert_eq!(common::sha256(&a.png_data), common::sha256(&b.png_data));
}

#[test]
fn tags_wrap_before_the_cover_icon() {
    let fixture = fixture();
    let renderer = CardRenderer::new(fixture.resources.clone());
    let record = |cover| EntityRecord {
        id: 8,
        name: "Tagged".into(),
        squad_type: "Main".into(),
        tactic_role: "Tanker".into(),
        position: "Front".into(),
        weapon_type: "Machinegun".into(),
        cover,
        ..EntityRecord::default()
    };
    let open = renderer.render(&record(false), Language::En, None).unwrap();
    let covered = renderer.render(&record(true), Language::En, None).unwrap();
    // six chips fit in one 41px row until the cover icon takes 56px; the last
    // one then starts a second row 8px below
    assert_eq!(covered.height - open.height, 41 + 8);
}

fn gift_fixture() -> Fixture {
    let favor = |id: u32, tag: &str| Item {
        id,
        category: "Favor".into(),
        tags: vec![tag.into()],
        name: format!("Gift {}", id),
        ..Item::default()
    };
    let mut fixture = fixture();
    fixture.resources.items = Arc::new(ItemCatalog::from_parts(
        vec![favor(1, "A"), favor(2, "A"), favor(3, "A"), favor(4, "B")],
        Vec::new(),
        Vec::new(),
    ));
    fixture
}

fn grid_height(fixture: &Fixture, tags: &[&str], furniture: &[u32]) -> u32 {
    let record = EntityRecord {
        id: 9,
        name: "Collector".into(),
        favor_item_tags: tags.iter().map(|t| t.to_string()).collect(),
        furniture_interaction: furniture.to_vec(),
        ..EntityRecord::default()
    };
    CardRenderer::new(fixture.resources.clone())
        .render(&record, Language::En, None)
        .unwrap()
        .height
}

#[test]
fn icon_grids_wrap_every_three_cells() {
    let fixture = gift_fixture();
    let three = grid_height(&fixture, &["A"], &[1]);
    let four = grid_height(&fixture, &["A", "B"], &[1]);
    // a 100px cell plus the 8px gap
    assert_eq!(four, three + 108);
}

#[test]
fn gift_panels_match_the_taller_grid() {
    let fixture = gift_fixture();
    let gifts_taller = grid_height(&fixture, &["A", "B"], &[1]);
    assert_eq!(grid_height(&fixture, &["A", "B"], &[1, 2, 3, 4]), gifts_taller);
    assert_eq!(grid_height(&fixture, &["B"], &[1, 2, 3, 4]), gifts_taller);
    assert_eq!(grid_height(&fixture, &["B"], &[1, 1, 1]), grid_height(&fixture, &["B"], &[1]));
}
