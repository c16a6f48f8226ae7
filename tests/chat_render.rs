mod common;

use common::{Fixture, FILL};
use momotalk::chat::{BACKGROUND, BLOCK_GAP, MIN_ROW_HEIGHT, TITLE_HEIGHT, TOP_MARGIN};
use momotalk::{parse, AssetKind, Catalog, ChatConfig, ChatRenderer, ConfigWarning, EntityRecord, Error, RenderedImage};
use std::sync::Arc;

const HEADER: u32 = TOP_MARGIN + TITLE_HEIGHT;

fn render(fixture: &Fixture, script: &str, images: &[Vec<u8>]) -> RenderedImage {
    let blocks = parse(script, &[], fixture.resources.catalog.as_ref()).unwrap();
    ChatRenderer::new(fixture.resources.clone())
        .render(&blocks, images, None)
        .unwrap()
}

fn pixel(image: &RenderedImage, x: u32, y: u32) -> [u8; 4] {
    let img = image::load_from_memory(&image.png_data).unwrap().to_rgba8();
    img.get_pixel(x, y).0
}

const AVATAR_CENTER: (u32, u32) = (12 + 32, HEADER + 32);
const BG: [u8; 4] = [BACKGROUND.r, BACKGROUND.g, BACKGROUND.b, 255];

/// A character known only to the script, with its icon on disk
fn custom(fixture: &Fixture, id: u32, name: &str) -> Arc<EntityRecord> {
    let icon = fixture.dir.path().join(format!("{}.png", name));
    std::fs::write(&icon, common::png(64, 64)).unwrap();
    Arc::new(EntityRecord {
        icon: Some(icon.to_string_lossy().into_owned()),
        ..common::student(id, name)
    })
}

#[test]
fn empty_chat_is_just_the_title_bar() {
    let fixture = Fixture::new();
    let image = ChatRenderer::new(fixture.resources.clone()).render(&[], &[], None).unwrap();
    assert_eq!((image.width, image.height), (720, HEADER));
    assert_eq!(common::dimensions(&image.png_data), (720, HEADER));
}

#[test]
fn block_heights_follow_their_content() {
    let fixture = Fixture::new();
    // one 42px text line in a bubble, then the row padding
    let reply = render(&fixture, "/T hi", &[]);
    assert_eq!(reply.height, HEADER + 90 + BLOCK_GAP);

    let spoken = render(&fixture, "/S Shiroko hi", &[]);
    assert_eq!(spoken.height, HEADER + 36 + 90 + BLOCK_GAP);

    let choices = render(&fixture, "/O yes", &[]);
    assert_eq!(choices.height, HEADER + 146 + 24 + BLOCK_GAP);
}

#[test]
fn every_block_takes_at_least_a_row() {
    let fixture = Fixture::new();
    let scripts = [
        "/T a",
        "/S Aru\n/T\n/O\n/K Shiroko",
        "/S Hoshino hi\nthere\n/T ok\n/O a\nb\nc\n/K Aru see you",
    ];
    for script in scripts {
        let blocks = parse(script, &[], fixture.resources.catalog.as_ref()).unwrap();
        let image = ChatRenderer::new(fixture.resources.clone()).render(&blocks, &[], None).unwrap();
        let floor = HEADER + blocks.len() as u32 * MIN_ROW_HEIGHT;
        assert!(image.height > floor, "{:?}: {} <= {}", script, image.height, floor);
    }
}

#[test]
fn rendering_is_deterministic() {
    let fixture = Fixture::new();
    let script = "/S Hoshino hello\nworld\n/T [img:1] nice\n/O yes\nno\n/K Hoshino";
    let images = [common::png(40, 20)];
    let first = render(&fixture, script, &images);
    let second = render(&fixture, script, &images);
    assert_eq!(common::sha256(&first.png_data), common::sha256(&second.png_data));
}

#[test]
fn inline_images_are_fitted() {
    let fixture = Fixture::new();
    let image = render(&fixture, "/T [img:1]", &[common::png(600, 300)]);
    // 300x150 after fitting, plus 8 below it and the row padding
    assert_eq!(image.height, HEADER + 150 + 8 + 8 + BLOCK_GAP);
}

#[test]
fn out_of_range_image_tokens_vanish() {
    let fixture = Fixture::new();
    let images = [common::png(10, 10), common::png(10, 10)];
    let with_token = render(&fixture, "/T a[img:3]b", &images);
    let without = render(&fixture, "/T ab", &images);
    assert_eq!(common::sha256(&with_token.png_data), common::sha256(&without.png_data));
}

#[test]
fn undecodable_images_abort_the_render() {
    let fixture = Fixture::new();
    let blocks = parse("/T hi", &[], fixture.resources.catalog.as_ref()).unwrap();
    let result = ChatRenderer::new(fixture.resources.clone()).render(&blocks, &[b"not an image".to_vec()], None);
    assert!(matches!(result, Err(Error::Image(_))));
}

#[test]
fn avatars_come_from_the_icon_directory() {
    let fixture = Fixture::new();
    let (x, y) = AVATAR_CENTER;
    let bare = render(&fixture, "/S Shiroko hi", &[]);
    assert_eq!(pixel(&bare, x, y), BG);

    let fixture = Fixture::new();
    fixture.add_asset(AssetKind::Icon, "Shiroko", 64, 64);
    let with_icon = render(&fixture, "/S Shiroko hi", &[]);
    assert_eq!(pixel(&with_icon, x, y), FILL);
}

#[test]
fn script_characters_keep_their_icon() {
    let fixture = Fixture::new();
    let yuuka = [custom(&fixture, 50, "Yuuka")];
    let blocks = parse("/S Yuuka hi", &yuuka, fixture.resources.catalog.as_ref()).unwrap();
    let image = ChatRenderer::new(fixture.resources.clone())
        .with_candidates(&yuuka)
        .render(&blocks, &[], None)
        .unwrap();
    let (x, y) = AVATAR_CENTER;
    assert_eq!(pixel(&image, x, y), FILL);
}

#[test]
fn script_characters_win_over_a_catalog_id_clash() {
    let fixture = Fixture::with_records(Catalog::from_records([common::student(50, "Serika")]));
    fixture.add_filled_asset(AssetKind::Icon, "Serika", 64, 64, [200, 40, 40, 255]);
    let yuuka = [custom(&fixture, 50, "Yuuka")];

    let blocks = parse("/S Yuuka hi", &yuuka, fixture.resources.catalog.as_ref()).unwrap();
    match &blocks[0] {
        momotalk::MessageBlock::Speaker { entity, .. } => assert_eq!(entity.name, "Yuuka"),
        other => panic!("expected a speaker, got {:?}", other),
    }
    let (x, y) = AVATAR_CENTER;
    let image = ChatRenderer::new(fixture.resources.clone())
        .with_candidates(&yuuka)
        .render(&blocks, &[], None)
        .unwrap();
    assert_eq!(pixel(&image, x, y), FILL);

    // Without the script's characters the id alone never picks Serika
    let image = ChatRenderer::new(fixture.resources.clone()).render(&blocks, &[], None).unwrap();
    assert_eq!(pixel(&image, x, y), BG);
}

#[test]
fn only_a_leading_text_bubble_has_a_tail() {
    let fixture = Fixture::new();
    let images = [common::png(10, 10)];
    // name row is 36px, the tail starts 12px into the first bubble
    let left = (94, HEADER + 36 + 17);
    let spoken = render(&fixture, "/S Aru hi", &images);
    assert_eq!(pixel(&spoken, left.0, left.1), [0x4b, 0x5a, 0x6f, 255]);
    let behind_image = render(&fixture, "/S Aru [img:1] hi", &images);
    assert_eq!(pixel(&behind_image, left.0, left.1), BG);

    let right = (702, HEADER + 19);
    let reply = render(&fixture, "/T hi", &images);
    assert_eq!(pixel(&reply, right.0, right.1), [0x4a, 0x8a, 0xc6, 255]);
    let behind_image = render(&fixture, "/T [img:1] hi", &images);
    assert_eq!(pixel(&behind_image, right.0, right.1), BG);
}

#[test]
fn title_comes_from_config() {
    let fixture = Fixture::new();
    let mut config = ChatConfig::default();
    assert!(config.set("title", "Schale Office").is_ok());
    ChatRenderer::with_config(fixture.resources.clone(), config)
        .render(&[], &[], None)
        .unwrap();
    assert!(fixture.text.seen().contains(&"Schale Office".to_string()));
}

#[test]
fn blank_title_keeps_the_default() {
    let fixture = Fixture::new();
    let mut config = ChatConfig::default();
    let warnings = config.apply([("title", "  "), ("titleBackground", "nope"), ("colour", "red")]);
    assert_eq!(warnings.len(), 3);
    assert_eq!(warnings[0], ConfigWarning::BlankValue("title".into()));
    assert_eq!(warnings[2], ConfigWarning::UnknownKey("colour".into()));

    ChatRenderer::with_config(fixture.resources.clone(), config)
        .render(&[], &[], None)
        .unwrap();
    assert!(fixture.text.seen().contains(&"MomoTalk".to_string()));
}

#[test]
fn watermark_goes_below_the_last_block() {
    let fixture = Fixture::new();
    let blocks = parse("/T hi", &[], fixture.resources.catalog.as_ref()).unwrap();
    let renderer = ChatRenderer::new(fixture.resources.clone());
    let plain = renderer.render(&blocks, &[], None).unwrap();
    let marked = renderer.render(&blocks, &[], Some("momotalk")).unwrap();
    // one 20px line is 26px tall
    assert_eq!(marked.height, plain.height + 26 + 12);
    assert_eq!(renderer.render(&blocks, &[], Some("   ")).unwrap().height, plain.height);
}

#[test]
fn concurrent_renders_keep_their_own_config() {
    let fixture = Fixture::new();
    let blocks = parse("/T hi", &[], fixture.resources.catalog.as_ref()).unwrap();
    let hashes: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = ["#ff0000", "#0000ff"]
            .into_iter()
            .map(|bg| {
                let resources = fixture.resources.clone();
                let blocks = &blocks;
                s.spawn(move || {
                    let mut config = ChatConfig::default();
                    config.set("titleBackground", bg).unwrap();
                    let image = ChatRenderer::with_config(resources, config).render(blocks, &[], None).unwrap();
                    common::sha256(&image.png_data)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_ne!(hashes[0], hashes[1]);
}
