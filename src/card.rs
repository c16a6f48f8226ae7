//! Character card renderer
//!
//! A card stacks full-width sections: portrait, identity header, tag row,
//! weapon and equipment, gifts and furniture, terrain, stats and skills.
//! Panels are sized from their measured content before anything is placed,
//! so every section lands as one row on the flow.

use crate::assets::{AssetKind, AssetRequest};
use crate::color::Color;
use crate::compositor::{Compositor, Primitive, RenderedImage};
use crate::error::Result;
use crate::localize::Language;
use crate::raster::{self, Shape};
use crate::record::{EntityRecord, Skill, SkillKind};
use crate::resources::Resources;
use crate::rich_text::parse_rich_text;
use crate::stats::{bond_stats, CharacterStats, StatKey};
use crate::text::{Align, Face, TextRequest};
use resvg::tiny_skia::Pixmap;
use std::sync::Arc;

pub const CARD_WIDTH: u32 = 720;
/// Cards never come out shorter than this
pub const CARD_MIN_HEIGHT: u32 = 480;
pub const CARD_BACKGROUND: Color = Color::rgb(0xf3, 0xf6, 0xfa);

const MARGIN: i32 = 12;
const INNER_WIDTH: u32 = CARD_WIDTH - 24;
const COLUMN_WIDTH: u32 = (INNER_WIDTH - 12) / 2;
const SECOND_COLUMN: i32 = MARGIN + COLUMN_WIDTH as i32 + 12;
const GRID_COLUMNS: usize = 3;
const GRID_GAP: u32 = 8;
const GRID_CELL: u32 = (COLUMN_WIDTH - 24 - 2 * GRID_GAP) / 3;
const PORTRAIT_HEIGHT: u32 = 420;
/// Gap left where a missing portrait would go
const PORTRAIT_PLACEHOLDER: u32 = 24;
const COVER_ICON: u32 = 48;

const PANEL: Color = Color::WHITE;
const BORDER: Color = Color::rgb(0xcd, 0xd3, 0xdc);
const CELL: Color = Color::rgb(0xee, 0xf3, 0xf8);
const TEXT_DARK: Color = Color::rgb(0x4b, 0x5a, 0x6f);
const TEXT_MUTED: Color = Color::rgb(0x87, 0x92, 0x9e);
const CHIP: Color = Color::rgb(0x4b, 0x5a, 0x6f);

const TERRAINS: [&str; 3] = ["Street", "Outdoor", "Indoor"];

/// Growth state the stat table is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardOptions {
    pub level: u32,
    pub star_grade: u8,
    pub bond_level: u32,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            level: 90,
            star_grade: 5,
            bond_level: 20,
        }
    }
}

pub struct CardRenderer {
    resources: Resources,
    options: CardOptions,
}

impl CardRenderer {
    pub fn new(resources: Resources) -> Self {
        Self::with_options(resources, CardOptions::default())
    }

    pub fn with_options(resources: Resources, options: CardOptions) -> Self {
        Self { resources, options }
    }

    pub fn options(&self) -> CardOptions {
        self.options
    }

    /// Renders `entity`, preferring its `lang` copy for display text
    pub fn render(&self, entity: &EntityRecord, lang: Language, watermark: Option<&str>) -> Result<RenderedImage> {
        let localized = self.resources.catalog.find_by_id(entity.id, lang);
        let record = localized.as_deref().unwrap_or(entity);
        let mut card = CardLayout {
            flow: Compositor::new(CARD_WIDTH, 12),
            resources: &self.resources,
            options: self.options,
            record,
            lang,
        };

        card.portrait()?;
        card.identity()?;
        card.tags()?;
        card.weapon_and_equipment()?;
        card.gifts_and_furniture()?;
        card.terrain()?;
        card.stat_table()?;
        card.skills()?;
        if let Some(mark) = watermark.map(str::trim).filter(|m| !m.is_empty()) {
            card.watermark(mark)?;
        }

        log::debug!("Rendered card for {} ({})", record.name, lang);
        card.flow.finish(CARD_BACKGROUND, CARD_MIN_HEIGHT)
    }
}

/// Primitives with tops relative to the panel they will sit in
struct Column {
    layers: Vec<Primitive>,
    height: u32,
}

impl Column {
    fn new() -> Self {
        Self {
            layers: Vec::new(),
            height: 12,
        }
    }

    fn push(&mut self, pixmap: impl Into<Arc<Pixmap>>, left: i32, top: u32) {
        self.layers.push(Primitive::pixels(pixmap, left, top));
    }
}

fn panel(left: i32, top: u32, width: u32, height: u32) -> Primitive {
    Primitive::shape(
        Shape::rounded(width, height, 12.0, PANEL).with_stroke(BORDER, 2.0),
        left,
        top,
    )
}

fn shifted(layers: Vec<Primitive>, top: u32) -> impl Iterator<Item = Primitive> {
    layers.into_iter().map(move |mut p| {
        p.top += top;
        p
    })
}

struct CardLayout<'a> {
    flow: Compositor,
    resources: &'a Resources,
    options: CardOptions,
    record: &'a EntityRecord,
    lang: Language,
}

impl CardLayout<'_> {
    fn text(&self, request: TextRequest) -> Result<Arc<Pixmap>> {
        Ok(Arc::new(self.resources.text.render(&request)?))
    }

    fn label(&self, key: &str) -> String {
        self.resources.localization.localize("i18n", key, self.lang)
    }

    fn localize(&self, table: &str, value: &str) -> String {
        self.resources.localization.localize(table, value, self.lang)
    }

    fn icon(&self, kind: AssetKind, name: &str, width: u32, height: u32) -> Result<Option<Pixmap>> {
        match self.resources.assets.get(kind, name) {
            Some(icon) => Ok(Some(raster::fit_within(&icon, width, height)?)),
            None => Ok(None),
        }
    }

    fn heading(&self, column: &mut Column, key: &str, left: i32) -> Result<()> {
        let title = self.text(
            TextRequest::new(self.label(key), 24.0, TEXT_DARK)
                .max_width(COLUMN_WIDTH - 24)
                .face(Face::Heading),
        )?;
        let h = title.height();
        column.push(title, left + 12, column.height);
        column.height += h + 8;
        Ok(())
    }

    fn full_panel(&mut self, column: Column) -> Result<()> {
        let top = self.flow.cursor();
        let height = column.height + 4;
        let row = std::iter::once(panel(MARGIN, top, INNER_WIDTH, height)).chain(shifted(column.layers, top));
        self.flow.place(row)?;
        self.flow.advance(height + 12);
        Ok(())
    }

    /// Two side-by-side panels as tall as the taller column
    fn two_columns(&mut self, left: Column, right: Column) -> Result<()> {
        let top = self.flow.cursor();
        let height = left.height.max(right.height) + 4;
        let row = [
            panel(MARGIN, top, COLUMN_WIDTH, height),
            panel(SECOND_COLUMN, top, COLUMN_WIDTH, height),
        ]
        .into_iter()
        .chain(shifted(left.layers, top))
        .chain(shifted(right.layers, top));
        self.flow.place(row)?;
        self.flow.advance(height + 12);
        Ok(())
    }

    fn portrait(&mut self) -> Result<()> {
        let top = self.flow.cursor();
        let portrait = match self.resources.assets.get(AssetKind::Portrait, &self.record.dev_name) {
            Some(p) => p,
            None => {
                log::debug!("No portrait for {}", self.record.dev_name);
                self.flow.advance(PORTRAIT_PLACEHOLDER);
                return Ok(());
            }
        };
        let mut fitted = raster::fit_within(&portrait, INNER_WIDTH, PORTRAIT_HEIGHT)?;
        raster::round_corners(&mut fitted, 16.0)?;
        let h = fitted.height();
        let left = (CARD_WIDTH as i32 - fitted.width() as i32) / 2;
        self.flow.place([Primitive::pixels(fitted, left, top)])?;
        self.flow.advance(h + 12);
        Ok(())
    }

    /// School emblem, name, and localized school and club
    fn identity(&mut self) -> Result<()> {
        let top = self.flow.cursor();
        let record = self.record;
        let name = self.text(
            TextRequest::new(record.name.as_str(), 40.0, TEXT_DARK)
                .max_width(INNER_WIDTH - 72)
                .face(Face::Heading),
        )?;
        let affiliation: Vec<String> = [("SchoolLong", &record.school), ("Club", &record.club)]
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(table, v)| self.localize(table, v))
            .collect();
        let sub = self.text(
            TextRequest::new(affiliation.join(" · "), 24.0, TEXT_MUTED).max_width(INNER_WIDTH - 72),
        )?;

        let (nh, sh) = (name.height(), sub.height());
        let mut row = Vec::with_capacity(3);
        if let Some(emblem) = self.icon(AssetKind::School, &record.school, 48, 48)? {
            row.push(Primitive::pixels(emblem, MARGIN, top));
        }
        row.push(Primitive::pixels(name, MARGIN + 60, top));
        row.push(Primitive::pixels(sub, MARGIN + 60, top + nh + 4));
        self.flow.place(row)?;
        self.flow.advance((nh + 4 + sh).max(48) + 12);
        Ok(())
    }

    /// Chips wrap before they would run under the cover icon
    fn tags(&mut self) -> Result<()> {
        let top = self.flow.cursor();
        let record = self.record;
        let tags = [
            (self.localize("SquadType", &record.squad_type), CHIP),
            (self.localize("TacticRole", &record.tactic_role), CHIP),
            (self.localize("Position", &record.position), CHIP),
            (self.localize("BulletType", record.bullet_type.key()), record.bullet_type.color()),
            (self.localize("ArmorType", record.armor_type.key()), record.armor_type.color()),
            (record.weapon_type.clone(), CHIP),
        ];

        let mut row = Vec::new();
        let mut limit = CARD_WIDTH as i32 - MARGIN;
        if record.cover {
            if let Some(cover) = self.icon(AssetKind::Ui, "Cover", COVER_ICON, COVER_ICON)? {
                row.push(Primitive::pixels(cover, limit - COVER_ICON as i32, top));
            }
            limit -= COVER_ICON as i32 + 8;
        }

        let (mut x, mut y, mut line_height) = (MARGIN, 0u32, 0u32);
        for (tag, color) in tags.into_iter().filter(|(t, _)| !t.is_empty()) {
            let text = self.text(TextRequest::new(tag, 22.0, Color::WHITE).max_width(INNER_WIDTH - 24))?;
            let (w, h) = (text.width() + 24, text.height() + 12);
            if x > MARGIN && x + w as i32 > limit {
                x = MARGIN;
                y += line_height + 8;
                line_height = 0;
            }
            row.push(Primitive::shape(Shape::rounded(w, h, h as f32 / 2.0, color), x, top + y));
            row.push(Primitive::pixels(text, x + 12, top + y + 6));
            x += w as i32 + 8;
            line_height = line_height.max(h);
        }

        let height = if record.cover { (y + line_height).max(COVER_ICON) } else { y + line_height };
        self.flow.place(row)?;
        self.flow.advance(height + 12);
        Ok(())
    }

    fn weapon_and_equipment(&mut self) -> Result<()> {
        let record = self.record;
        let mut weapon = Column::new();
        self.heading(&mut weapon, "Weapon", MARGIN)?;
        if let Some(icon) = self.icon(AssetKind::Weapon, &record.weapon_img, COLUMN_WIDTH - 24, 96)? {
            let h = icon.height();
            let left = MARGIN + (COLUMN_WIDTH as i32 - icon.width() as i32) / 2;
            weapon.push(icon, left, weapon.height);
            weapon.height += h + 8;
        }
        let weapon_name = record
            .weapon
            .as_ref()
            .map(|w| w.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| record.weapon_type.clone());
        if !weapon_name.is_empty() {
            let text = self.text(
                TextRequest::new(weapon_name, 24.0, TEXT_DARK)
                    .max_width(COLUMN_WIDTH - 24)
                    .align(Align::Center),
            )?;
            let h = text.height();
            let left = MARGIN + (COLUMN_WIDTH as i32 - text.width() as i32) / 2;
            weapon.push(text, left, weapon.height);
            weapon.height += h + 8;
        }

        let mut gear = Column::new();
        self.heading(&mut gear, "Equipment", SECOND_COLUMN)?;
        let requests: Vec<AssetRequest> = record
            .equipment
            .iter()
            .map(|c| AssetRequest::new(AssetKind::Equipment, c.as_str()))
            .collect();
        let icons = self.resources.assets.prefetch(&requests);
        for (category, icon) in record.equipment.iter().zip(icons) {
            let y = gear.height;
            if let Some(icon) = icon {
                gear.push(raster::fit_within(&icon, 40, 40)?, SECOND_COLUMN + 12, y);
            }
            let name = self
                .resources
                .items
                .equipment(category, 9)
                .map(|e| e.name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| category.clone());
            let text = self.text(TextRequest::new(name, 22.0, TEXT_DARK).max_width(COLUMN_WIDTH - 72))?;
            let h = text.height();
            gear.push(text, SECOND_COLUMN + 60, y + 40u32.saturating_sub(h) / 2);
            gear.height += h.max(40) + 8;
        }

        self.two_columns(weapon, gear)
    }

    /// `ceil(n/3)` rows of icon cells, one cell per entry even if its icon is missing
    fn grid(&self, key: &str, left: i32, icons: &[Option<Arc<Pixmap>>]) -> Result<Column> {
        let mut column = Column::new();
        self.heading(&mut column, key, left)?;
        if icons.is_empty() {
            let none = self.text(TextRequest::new(self.label("None"), 22.0, TEXT_MUTED))?;
            let h = none.height();
            column.push(none, left + 12, column.height);
            column.height += h + 12;
            return Ok(column);
        }

        let stride = GRID_CELL + GRID_GAP;
        for (i, icon) in icons.iter().enumerate() {
            let (r, c) = ((i / GRID_COLUMNS) as u32, (i % GRID_COLUMNS) as u32);
            let x = left + 12 + (c * stride) as i32;
            let y = column.height + r * stride;
            column
                .layers
                .push(Primitive::shape(Shape::rounded(GRID_CELL, GRID_CELL, 8.0, CELL), x, y));
            if let Some(icon) = icon {
                let fitted = raster::fit_within(icon, GRID_CELL - 8, GRID_CELL - 8)?;
                let dx = (GRID_CELL - fitted.width()) as i32 / 2;
                let dy = (GRID_CELL - fitted.height()) / 2;
                column.push(fitted, x + dx, y + dy);
            }
        }
        let rows = icons.len().div_ceil(GRID_COLUMNS) as u32;
        column.height += rows * stride + 4;
        Ok(column)
    }

    fn gifts_and_furniture(&mut self) -> Result<()> {
        let record = self.record;
        let gifts = self.resources.items.favors_by_tags(&record.favor_tags());
        let mut furniture: Vec<u32> = Vec::new();
        for id in &record.furniture_interaction {
            if !furniture.contains(id) {
                furniture.push(*id);
            }
        }

        let requests: Vec<AssetRequest> = gifts
            .iter()
            .map(|g| AssetRequest::new(AssetKind::Item, g.id.to_string()))
            .chain(furniture.iter().map(|id| AssetRequest::new(AssetKind::Furniture, id.to_string())))
            .collect();
        let icons = self.resources.assets.prefetch(&requests);
        let (gift_icons, furniture_icons) = icons.split_at(gifts.len());

        let left = self.grid("FavorItems", MARGIN, gift_icons)?;
        let right = self.grid("Furniture", SECOND_COLUMN, furniture_icons)?;
        self.two_columns(left, right)
    }

    fn terrain(&mut self) -> Result<()> {
        let mut column = Column::new();
        self.heading(&mut column, "Terrain", MARGIN)?;
        let cell_width = INNER_WIDTH / 3;
        let y = column.height;
        for (i, (name, grade)) in TERRAINS.iter().zip(self.record.adaptations()).enumerate() {
            let x = MARGIN + 12 + (i as u32 * cell_width) as i32;
            if let Some(icon) = self.icon(AssetKind::Ui, name, 48, 48)? {
                column.push(icon, x, y);
            }
            let label = self.text(TextRequest::new(self.label(name), 22.0, TEXT_DARK).max_width(cell_width - 120))?;
            let h = label.height();
            column.push(label, x + 56, y + 48u32.saturating_sub(h) / 2);
            let adapt = format!("Adapt_{}", grade.min(5));
            if let Some(icon) = self.icon(AssetKind::Ui, &adapt, 48, 48)? {
                column.push(icon, x + cell_width as i32 - 72, y);
            }
        }
        column.height += 48 + 12;
        self.full_panel(column)
    }

    /// Label left, value right, two stats per row
    fn stat_table(&mut self) -> Result<()> {
        let record = self.record;
        let options = self.options;
        let mut stats = CharacterStats::new(record, options.level, options.star_grade);
        for (name, value) in bond_stats(record, options.bond_level) {
            stats.add_named_buff(&name, value);
        }

        let mut column = Column::new();
        self.heading(&mut column, "Stats", MARGIN)?;
        let condition = self
            .label("StatsCondition")
            .replace("{level}", &options.level.to_string())
            .replace("{star}", &options.star_grade.to_string())
            .replace("{bond}", &options.bond_level.to_string());
        let condition = self.text(TextRequest::new(condition, 20.0, TEXT_MUTED).max_width(INNER_WIDTH - 24))?;
        let h = condition.height();
        column.push(condition, MARGIN + 12, column.height);
        column.height += h + 8;

        let track = COLUMN_WIDTH - 24;
        for pair in StatKey::CARD.chunks(2) {
            let y = column.height;
            let mut row_height = 28;
            for (c, key) in pair.iter().enumerate() {
                let x = MARGIN + 12 + (c as u32 * (COLUMN_WIDTH + 12)) as i32;
                if let Some(icon) = self.icon(AssetKind::Stat, key.name(), 28, 28)? {
                    column.push(icon, x, y);
                }
                let label = self.text(
                    TextRequest::new(self.localize("Stat", key.name()), 22.0, TEXT_DARK).max_width(track - 140),
                )?;
                let value = self.text(TextRequest::new(stats.total_string(*key), 22.0, TEXT_DARK))?;
                row_height = row_height.max(label.height()).max(value.height());
                column.push(label, x + 36, y);
                let right = x + track as i32 - value.width() as i32;
                column.push(value, right, y);
            }
            column.height += row_height + 10;
        }
        self.full_panel(column)
    }

    fn skills(&mut self) -> Result<()> {
        let top = self.flow.cursor();
        let title = self.text(
            TextRequest::new(self.label("Skills"), 28.0, TEXT_DARK)
                .max_width(INNER_WIDTH)
                .face(Face::Heading),
        )?;
        let h = title.height();
        self.flow.place([Primitive::pixels(title, MARGIN, top)])?;
        self.flow.advance(h + 8);

        let record = self.record;
        let skills: Vec<&Skill> = record
            .skills
            .iter()
            .filter(|s| s.kind != SkillKind::Autoattack)
            .collect();
        let requests: Vec<AssetRequest> = skills
            .iter()
            .map(|s| AssetRequest::new(AssetKind::Skill, s.icon.as_str()))
            .collect();
        let icons = self.resources.assets.prefetch(&requests);
        for (skill, icon) in skills.into_iter().zip(icons) {
            self.skill_card(skill, icon)?;
        }
        Ok(())
    }

    /// Badge, title, kind and cost, then the expanded description
    fn skill_card(&mut self, skill: &Skill, icon: Option<Arc<Pixmap>>) -> Result<()> {
        let top = self.flow.cursor();
        let x = MARGIN + 12;
        let text_left = x + 80;
        let text_width = INNER_WIDTH - 24 - 80;

        let title = self.text(
            TextRequest::new(skill.name.as_str(), 26.0, TEXT_DARK)
                .max_width(text_width)
                .face(Face::Heading),
        )?;
        let mut kind = self.label(skill.kind.label_key());
        if skill.kind == SkillKind::Ex {
            if let Some(cost) = skill.cost.last() {
                kind = format!("{} · {} {}", kind, self.label("Cost"), cost);
            }
        }
        let kind = self.text(TextRequest::new(kind, 20.0, TEXT_MUTED).max_width(text_width))?;
        let spans = parse_rich_text(
            &skill.desc,
            &skill.parameters,
            skill.kind.max_level(),
            TEXT_DARK,
            self.lang,
            &self.resources.localization,
        );
        let desc = self.text(TextRequest::rich(spans, 22.0).max_width(text_width))?;

        let (th, kh, dh) = (title.height(), kind.height(), desc.height());
        let height = (th + 4 + kh + 8 + dh).max(64) + 24;

        let mut row = vec![
            panel(MARGIN, top, INNER_WIDTH, height),
            Primitive::shape(
                Shape::rounded(64, 64, 12.0, self.record.bullet_type.color()),
                x,
                top + 12,
            ),
        ];
        if let Some(icon) = icon {
            let mut badge = raster::fit_within(&icon, 52, 52)?;
            raster::round_corners(&mut badge, 8.0)?;
            let dx = (52 - badge.width() as i32) / 2;
            let dy = (52 - badge.height()) / 2;
            row.push(Primitive::pixels(badge, x + 6 + dx, top + 18 + dy));
        }
        row.push(Primitive::pixels(title, text_left, top + 12));
        row.push(Primitive::pixels(kind, text_left, top + 12 + th + 4));
        row.push(Primitive::pixels(desc, text_left, top + 12 + th + 4 + kh + 8));
        self.flow.place(row)?;
        self.flow.advance(height + 8);
        Ok(())
    }

    fn watermark(&mut self, mark: &str) -> Result<()> {
        let top = self.flow.cursor();
        let text = self.text(
            TextRequest::new(mark, 20.0, TEXT_MUTED)
                .max_width(CARD_WIDTH - 48)
                .face(Face::Heading)
                .align(Align::Center),
        )?;
        let h = text.height();
        let left = (CARD_WIDTH as i32 - text.width() as i32) / 2;
        self.flow.place([Primitive::pixels(text, left, top)])?;
        self.flow.advance(h + 12);
        Ok(())
    }
}
