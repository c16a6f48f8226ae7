//! Entity records as stored in the data catalog
//!
//! Records are deserialized once when a language table is loaded. Loosely
//! typed sub-records (skills, furniture interactions) are normalized at that
//! point so renderers only ever see typed values.

use crate::color::Color;
use crate::error::Result;
use crate::localize::Language;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// A playable character in one language.
///
/// Several language copies of the same character share an `id`; identity is
/// the id, never the name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EntityRecord {
    pub id: u32,
    pub name: String,
    pub path_name: String,
    pub dev_name: String,
    pub family_name: String,
    pub personal_name: String,
    pub character_voice: String,
    /// Explicit avatar file, used by registered extra entities
    pub icon: Option<String>,

    pub school: String,
    pub club: String,
    pub star_grade: u8,
    pub squad_type: String,
    pub tactic_role: String,
    pub position: String,
    pub bullet_type: BulletType,
    pub armor_type: ArmorType,
    pub weapon_type: String,
    pub weapon_img: String,
    pub cover: bool,
    pub street_battle_adaptation: Option<u8>,
    pub outdoor_battle_adaptation: Option<u8>,
    pub indoor_battle_adaptation: Option<u8>,

    pub equipment: Vec<String>,
    pub weapon: Option<Weapon>,
    pub gear: Option<Gear>,
    #[serde(deserialize_with = "deserialize_skills")]
    pub skills: Vec<Skill>,
    pub favor_item_tags: Vec<String>,
    pub favor_item_unique_tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_flat_ids")]
    pub furniture_interaction: Vec<u32>,
    pub favor_stat_type: Vec<String>,
    pub favor_stat_value: Vec<Vec<f64>>,

    #[serde(rename = "MaxHP1")]
    pub max_hp1: f64,
    #[serde(rename = "MaxHP100")]
    pub max_hp100: f64,
    pub attack_power1: f64,
    pub attack_power100: f64,
    pub defense_power1: f64,
    pub defense_power100: f64,
    pub heal_power1: f64,
    pub heal_power100: f64,
    pub defense_penetration1: Option<f64>,
    pub defense_penetration100: Option<f64>,
    pub accuracy_point: f64,
    pub dodge_point: f64,
    pub critical_point: f64,
    pub critical_damage_rate: f64,
    pub stability_point: f64,
    pub ammo_count: f64,
    pub ammo_cost: f64,
    pub range: f64,
    pub regen_cost: f64,

    /// Language of the table this copy was loaded from
    #[serde(skip)]
    pub language: Option<Language>,
}

impl EntityRecord {
    /// Names that short-circuit a search on exact match
    pub fn exact_names(&self) -> impl Iterator<Item = &str> {
        [&self.name, &self.path_name, &self.dev_name]
            .into_iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    /// Every name field searched by substring
    pub fn search_names(&self) -> impl Iterator<Item = &str> {
        [
            &self.name,
            &self.path_name,
            &self.dev_name,
            &self.family_name,
            &self.personal_name,
            &self.character_voice,
        ]
        .into_iter()
        .map(String::as_str)
        .filter(|n| !n.is_empty())
    }

    /// Terrain adaptation grades in street, outdoor, indoor order
    pub fn adaptations(&self) -> [u8; 3] {
        [
            self.street_battle_adaptation.unwrap_or(2),
            self.outdoor_battle_adaptation.unwrap_or(2),
            self.indoor_battle_adaptation.unwrap_or(2),
        ]
    }

    /// Tags used to pick favorite gifts
    pub fn favor_tags(&self) -> Vec<String> {
        let mut tags = self.favor_item_tags.clone();
        for t in &self.favor_item_unique_tags {
            if !tags.contains(t) {
                tags.push(t.clone());
            }
        }
        tags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Weapon {
    pub name: String,
    pub desc: String,
    pub adaptation_type: String,
    pub adaptation_value: i32,
    pub attack_power1: f64,
    pub attack_power100: f64,
    #[serde(rename = "MaxHP1")]
    pub max_hp1: f64,
    #[serde(rename = "MaxHP100")]
    pub max_hp100: f64,
    pub heal_power1: f64,
    pub heal_power100: f64,
    pub stat_level_up_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Gear {
    pub name: String,
    pub desc: String,
}

/// Damage type of a character's attacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum BulletType {
    Explosion,
    Pierce,
    Mystic,
    Sonic,
    #[default]
    #[serde(other)]
    Normal,
}

impl BulletType {
    /// Badge color; `Normal` is the neutral style
    pub fn color(self) -> Color {
        match self {
            BulletType::Explosion => Color::rgb(0xa7, 0x0c, 0x19),
            BulletType::Pierce => Color::rgb(0xb2, 0x6d, 0x1f),
            BulletType::Mystic => Color::rgb(0x21, 0x6f, 0x9c),
            BulletType::Sonic => Color::rgb(0x94, 0x31, 0xa5),
            BulletType::Normal => Color::rgb(0x51, 0x5a, 0x6a),
        }
    }

    /// Key into the `BulletType` localization table
    pub fn key(self) -> &'static str {
        match self {
            BulletType::Explosion => "Explosion",
            BulletType::Pierce => "Pierce",
            BulletType::Mystic => "Mystic",
            BulletType::Sonic => "Sonic",
            BulletType::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum ArmorType {
    LightArmor,
    HeavyArmor,
    Unarmed,
    ElasticArmor,
    #[default]
    #[serde(other)]
    Normal,
}

impl ArmorType {
    pub fn color(self) -> Color {
        match self {
            ArmorType::LightArmor => Color::rgb(0xa7, 0x0c, 0x19),
            ArmorType::HeavyArmor => Color::rgb(0xb2, 0x6d, 0x1f),
            ArmorType::Unarmed => Color::rgb(0x21, 0x6f, 0x9c),
            ArmorType::ElasticArmor => Color::rgb(0x94, 0x31, 0xa5),
            ArmorType::Normal => Color::rgb(0x51, 0x5a, 0x6a),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ArmorType::LightArmor => "LightArmor",
            ArmorType::HeavyArmor => "HeavyArmor",
            ArmorType::Unarmed => "Unarmed",
            ArmorType::ElasticArmor => "ElasticArmor",
            ArmorType::Normal => "Normal",
        }
    }
}

/// Which slot a skill occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillKind {
    Ex,
    Public,
    Passive,
    ExtraPassive,
    WeaponPassive,
    GearPublic,
    Autoattack,
}

impl SkillKind {
    /// Maps a raw `SkillType` string; unknown kinds are `None`
    pub fn parse(raw: &str) -> Option<SkillKind> {
        let kind = match raw.to_ascii_lowercase().as_str() {
            "ex" => SkillKind::Ex,
            "normal" | "public" => SkillKind::Public,
            "passive" => SkillKind::Passive,
            "sub" | "extrapassive" => SkillKind::ExtraPassive,
            "weaponpassive" => SkillKind::WeaponPassive,
            "gearnormal" | "gearpublic" => SkillKind::GearPublic,
            "autoattack" => SkillKind::Autoattack,
            _ => return None,
        };
        Some(kind)
    }

    /// i18n key of the sub-label drawn under a skill title
    pub fn label_key(self) -> &'static str {
        match self {
            SkillKind::Ex => "ExSkill",
            SkillKind::Public => "PublicSkill",
            SkillKind::Passive => "PassiveSkill",
            SkillKind::ExtraPassive => "ExtraPassiveSkill",
            SkillKind::WeaponPassive => "WeaponPassiveSkill",
            SkillKind::GearPublic => "GearPublicSkill",
            SkillKind::Autoattack => "Autoattack",
        }
    }

    /// Highest skill level, which bounds the parameters shown
    pub fn max_level(self) -> usize {
        match self {
            SkillKind::Ex => 5,
            SkillKind::Autoattack => 1,
            _ => 10,
        }
    }
}

/// A normalized skill
#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub kind: SkillKind,
    pub name: String,
    pub desc: String,
    /// `parameters[n]` holds the per-level values of placeholder `<?n+1>`
    pub parameters: Vec<Vec<String>>,
    pub cost: Vec<u32>,
    pub icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawSkill {
    skill_type: String,
    name: String,
    desc: String,
    parameters: Vec<Vec<serde_json::Value>>,
    cost: Vec<u32>,
    icon: String,
}

impl RawSkill {
    fn normalize(self) -> Option<Skill> {
        let Some(kind) = SkillKind::parse(&self.skill_type) else {
            log::debug!("Dropping skill {:?} of unknown kind {:?}", self.name, self.skill_type);
            return None;
        };
        Some(Skill {
            kind,
            name: self.name,
            desc: self.desc,
            parameters: self
                .parameters
                .into_iter()
                .map(|level| level.iter().map(value_text).collect())
                .collect(),
            cost: self.cost,
            icon: self.icon,
        })
    }
}

fn value_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn deserialize_skills<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<Skill>, D::Error> {
    let raw: Vec<RawSkill> = Vec::deserialize(d)?;
    Ok(raw.into_iter().filter_map(RawSkill::normalize).collect())
}

/// Accepts a flat or nested array of ids
fn deserialize_flat_ids<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<u32>, D::Error> {
    fn walk(v: &serde_json::Value, out: &mut Vec<u32>) {
        match v {
            serde_json::Value::Array(items) => items.iter().for_each(|i| walk(i, out)),
            serde_json::Value::Number(n) => {
                if let Some(id) = n.as_u64().and_then(|n| u32::try_from(n).ok()) {
                    out.push(id);
                }
            }
            _ => {}
        }
    }
    let value = serde_json::Value::deserialize(d)?;
    let mut out = Vec::new();
    walk(&value, &mut out);
    Ok(out)
}

/// Reads a data table stored either as an array or as an object keyed by id
pub fn as_array<T: DeserializeOwned>(value: serde_json::Value) -> Result<Vec<T>> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_schale_style_record() {
        let record: EntityRecord = serde_json::from_value(json!({
            "Id": 10015,
            "Name": "Hoshino",
            "PathName": "hoshino",
            "DevName": "Hoshino",
            "BulletType": "Pierce",
            "ArmorType": "HeavyArmor",
            "MaxHP1": 2000,
            "MaxHP100": 30000,
            "StreetBattleAdaptation": 4,
            "FurnitureInteraction": [[1001, 1002], [1003]],
            "Skills": [
                { "SkillType": "ex", "Name": "Tactical", "Parameters": [["10%", 12]], "Cost": [3] },
                { "SkillType": "mystery", "Name": "Dropped" },
                { "SkillType": "sub", "Name": "Sub" }
            ],
            "SomethingNew": true
        }))
        .unwrap();

        assert_eq!(record.id, 10015);
        assert_eq!(record.bullet_type, BulletType::Pierce);
        assert_eq!(record.max_hp100, 30000.0);
        assert_eq!(record.adaptations(), [4, 2, 2]);
        assert_eq!(record.furniture_interaction, vec![1001, 1002, 1003]);
        assert_eq!(record.skills.len(), 2);
        assert_eq!(record.skills[0].kind, SkillKind::Ex);
        assert_eq!(record.skills[0].parameters, vec![vec!["10%".to_string(), "12".to_string()]]);
        assert_eq!(record.skills[1].kind, SkillKind::ExtraPassive);
    }

    #[test]
    fn unknown_bullet_type_is_neutral() {
        let record: EntityRecord =
            serde_json::from_value(json!({ "Id": 1, "BulletType": "Laser" })).unwrap();
        assert_eq!(record.bullet_type, BulletType::Normal);
        assert_eq!(record.bullet_type.color(), BulletType::Normal.color());
    }

    #[test]
    fn as_array_accepts_objects_keyed_by_id() {
        let items: Vec<Weapon> =
            as_array(json!({ "1": { "Name": "A" }, "2": { "Name": "B" } })).unwrap();
        let mut names: Vec<_> = items.into_iter().map(|w| w.name).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }
}
