//! Character statistics at a given level, star grade and bond level

use crate::record::EntityRecord;
use std::collections::BTreeMap;

/// Every statistic a character carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatKey {
    MaxHP,
    AttackPower,
    DefensePower,
    HealPower,
    AccuracyPoint,
    DodgePoint,
    CriticalPoint,
    CriticalDamageRate,
    CriticalChanceResistPoint,
    CriticalDamageResistRate,
    StabilityPoint,
    StabilityRate,
    AmmoCount,
    AmmoCost,
    Range,
    RegenCost,
    DamageRatio,
    DamagedRatio,
    HealEffectivenessRate,
    OppressionPower,
    OppressionResist,
    AttackSpeed,
    BlockRate,
    DefensePenetration,
    MoveSpeed,
    EnhanceExplosionRate,
    EnhancePierceRate,
    EnhanceMysticRate,
    ExtendBuffDuration,
    ExtendDebuffDuration,
    ExtendCCDuration,
}

impl StatKey {
    pub const ALL: [StatKey; 31] = [
        StatKey::MaxHP,
        StatKey::AttackPower,
        StatKey::DefensePower,
        StatKey::HealPower,
        StatKey::AccuracyPoint,
        StatKey::DodgePoint,
        StatKey::CriticalPoint,
        StatKey::CriticalDamageRate,
        StatKey::CriticalChanceResistPoint,
        StatKey::CriticalDamageResistRate,
        StatKey::StabilityPoint,
        StatKey::StabilityRate,
        StatKey::AmmoCount,
        StatKey::AmmoCost,
        StatKey::Range,
        StatKey::RegenCost,
        StatKey::DamageRatio,
        StatKey::DamagedRatio,
        StatKey::HealEffectivenessRate,
        StatKey::OppressionPower,
        StatKey::OppressionResist,
        StatKey::AttackSpeed,
        StatKey::BlockRate,
        StatKey::DefensePenetration,
        StatKey::MoveSpeed,
        StatKey::EnhanceExplosionRate,
        StatKey::EnhancePierceRate,
        StatKey::EnhanceMysticRate,
        StatKey::ExtendBuffDuration,
        StatKey::ExtendDebuffDuration,
        StatKey::ExtendCCDuration,
    ];

    /// Rows of the card's stat table, in display order
    pub const CARD: [StatKey; 16] = [
        StatKey::MaxHP,
        StatKey::AttackPower,
        StatKey::DefensePower,
        StatKey::HealPower,
        StatKey::AccuracyPoint,
        StatKey::DodgePoint,
        StatKey::CriticalPoint,
        StatKey::CriticalDamageRate,
        StatKey::CriticalChanceResistPoint,
        StatKey::CriticalDamageResistRate,
        StatKey::StabilityPoint,
        StatKey::Range,
        StatKey::OppressionPower,
        StatKey::OppressionResist,
        StatKey::HealEffectivenessRate,
        StatKey::AmmoCount,
    ];

    /// Name used by data files and the `Stat` localization table
    pub fn name(self) -> &'static str {
        match self {
            StatKey::MaxHP => "MaxHP",
            StatKey::AttackPower => "AttackPower",
            StatKey::DefensePower => "DefensePower",
            StatKey::HealPower => "HealPower",
            StatKey::AccuracyPoint => "AccuracyPoint",
            StatKey::DodgePoint => "DodgePoint",
            StatKey::CriticalPoint => "CriticalPoint",
            StatKey::CriticalDamageRate => "CriticalDamageRate",
            StatKey::CriticalChanceResistPoint => "CriticalChanceResistPoint",
            StatKey::CriticalDamageResistRate => "CriticalDamageResistRate",
            StatKey::StabilityPoint => "StabilityPoint",
            StatKey::StabilityRate => "StabilityRate",
            StatKey::AmmoCount => "AmmoCount",
            StatKey::AmmoCost => "AmmoCost",
            StatKey::Range => "Range",
            StatKey::RegenCost => "RegenCost",
            StatKey::DamageRatio => "DamageRatio",
            StatKey::DamagedRatio => "DamagedRatio",
            StatKey::HealEffectivenessRate => "HealEffectivenessRate",
            StatKey::OppressionPower => "OppressionPower",
            StatKey::OppressionResist => "OppressionResist",
            StatKey::AttackSpeed => "AttackSpeed",
            StatKey::BlockRate => "BlockRate",
            StatKey::DefensePenetration => "DefensePenetration",
            StatKey::MoveSpeed => "MoveSpeed",
            StatKey::EnhanceExplosionRate => "EnhanceExplosionRate",
            StatKey::EnhancePierceRate => "EnhancePierceRate",
            StatKey::EnhanceMysticRate => "EnhanceMysticRate",
            StatKey::ExtendBuffDuration => "ExtendBuffDuration",
            StatKey::ExtendDebuffDuration => "ExtendDebuffDuration",
            StatKey::ExtendCCDuration => "ExtendCCDuration",
        }
    }

    pub fn from_name(name: &str) -> Option<StatKey> {
        StatKey::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Shown as a percentage of 10000
    pub fn is_rate(self) -> bool {
        let name = self.name();
        name.ends_with("Rate") || name.starts_with("AttackSpeed") || name.starts_with("DamagedRatio")
    }
}

/// How a buff amount is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffKind {
    /// Added before the coefficient
    Flat,
    /// Added after the coefficient
    Separated,
    /// Per-ten-thousand change to the coefficient
    Coefficient,
}

/// Parses `Stat`, `Stat_Base` or `Stat_Coefficient`
pub fn parse_buff(name: &str) -> Option<(StatKey, BuffKind)> {
    let (stat, suffix) = match name.split_once('_') {
        Some((stat, suffix)) => (stat, Some(suffix)),
        None => (name, None),
    };
    let key = StatKey::from_name(stat)?;
    let kind = match suffix {
        None | Some("Base") => BuffKind::Flat,
        Some("Coefficient") => BuffKind::Coefficient,
        Some(_) => return None,
    };
    Some((key, kind))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StatLine {
    base: f64,
    flat: f64,
    coefficient: f64,
    separated: f64,
}

impl StatLine {
    fn new(base: f64) -> Self {
        Self {
            base,
            flat: 0.0,
            coefficient: 1.0,
            separated: 0.0,
        }
    }
}

const TRANSCENDENCE: [[f64; 5]; 3] = [
    [0.0, 1000.0, 1200.0, 1400.0, 1700.0],
    [0.0, 500.0, 700.0, 900.0, 1400.0],
    [0.0, 750.0, 1000.0, 1200.0, 1500.0],
];

/// Level the unique weapon is assumed to have at five stars
const WEAPON_LEVEL: u32 = 50;

// Halves round toward positive infinity
fn round(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

fn level_scale(level: u32) -> f64 {
    round4((level.max(1) - 1) as f64 / 99.0)
}

fn scaled(min: f64, max: f64, scale: f64) -> f64 {
    round(round4(min + (max - min) * scale))
}

/// Computed stats of one character
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterStats {
    pub level: u32,
    pub star_grade: u8,
    stats: BTreeMap<StatKey, StatLine>,
}

impl CharacterStats {
    pub fn new(record: &EntityRecord, level: u32, star_grade: u8) -> Self {
        let scale = level_scale(level);
        let mut mult = [1.0f64; 3];
        for (m, row) in mult.iter_mut().zip(TRANSCENDENCE.iter()) {
            for step in row.iter().take(star_grade as usize) {
                *m += step / 10000.0;
            }
        }
        let [attack_mult, hp_mult, heal_mult] = mult;
        let boosted = |min, max, mult: f64| round4(scaled(min, max, scale) * mult).ceil();

        let penetration = match (record.defense_penetration1, record.defense_penetration100) {
            (Some(min), Some(max)) => scaled(min, max, scale),
            (None, Some(max)) => scaled(0.0, max, scale),
            _ => 0.0,
        };

        let base = |key: StatKey| -> f64 {
            match key {
                StatKey::MaxHP => boosted(record.max_hp1, record.max_hp100, hp_mult),
                StatKey::AttackPower => boosted(record.attack_power1, record.attack_power100, attack_mult),
                StatKey::DefensePower => scaled(record.defense_power1, record.defense_power100, scale),
                StatKey::HealPower => boosted(record.heal_power1, record.heal_power100, heal_mult),
                StatKey::AccuracyPoint => record.accuracy_point,
                StatKey::DodgePoint => record.dodge_point,
                StatKey::CriticalPoint => record.critical_point,
                StatKey::CriticalDamageRate => record.critical_damage_rate,
                StatKey::CriticalChanceResistPoint => 100.0,
                StatKey::CriticalDamageResistRate => 5000.0,
                StatKey::StabilityPoint => record.stability_point,
                StatKey::StabilityRate => 2000.0,
                StatKey::AmmoCount => record.ammo_count,
                StatKey::AmmoCost => record.ammo_cost,
                StatKey::Range => record.range,
                StatKey::RegenCost => record.regen_cost,
                StatKey::OppressionPower | StatKey::OppressionResist => 100.0,
                StatKey::BlockRate => 0.0,
                StatKey::DefensePenetration => penetration,
                StatKey::MoveSpeed => 200.0,
                StatKey::DamageRatio
                | StatKey::DamagedRatio
                | StatKey::HealEffectivenessRate
                | StatKey::AttackSpeed
                | StatKey::EnhanceExplosionRate
                | StatKey::EnhancePierceRate
                | StatKey::EnhanceMysticRate
                | StatKey::ExtendBuffDuration
                | StatKey::ExtendDebuffDuration
                | StatKey::ExtendCCDuration => 10000.0,
            }
        };

        let mut stats = Self {
            level,
            star_grade,
            stats: StatKey::ALL.into_iter().map(|k| (k, StatLine::new(base(k)))).collect(),
        };

        if star_grade >= 5 {
            if let Some(weapon) = &record.weapon {
                let mut scale = (WEAPON_LEVEL - 1) as f64 / 99.0;
                if weapon.stat_level_up_type == "Standard" {
                    scale = round4(scale);
                }
                let bonus = |min: f64, max: f64| round(min + (max - min) * scale);
                stats.add_buff(StatKey::AttackPower, BuffKind::Flat, bonus(weapon.attack_power1, weapon.attack_power100));
                stats.add_buff(StatKey::MaxHP, BuffKind::Flat, bonus(weapon.max_hp1, weapon.max_hp100));
                stats.add_buff(StatKey::HealPower, BuffKind::Flat, bonus(weapon.heal_power1, weapon.heal_power100));
            }
        }
        stats
    }

    pub fn add_buff(&mut self, key: StatKey, kind: BuffKind, amount: f64) {
        let Some(line) = self.stats.get_mut(&key) else {
            return;
        };
        match kind {
            BuffKind::Flat => line.flat += amount,
            BuffKind::Separated => line.separated += amount,
            BuffKind::Coefficient => line.coefficient += amount / 10000.0,
        }
    }

    /// Applies a buff named like `AttackPower_Base`; returns false if unknown
    pub fn add_named_buff(&mut self, name: &str, amount: f64) -> bool {
        match parse_buff(name) {
            Some((key, kind)) => {
                self.add_buff(key, kind, amount);
                true
            }
            None => {
                log::debug!("Ignoring unknown stat buff {:?}", name);
                false
            }
        }
    }

    pub fn base(&self, key: StatKey) -> i64 {
        self.stats.get(&key).map(|l| l.base as i64).unwrap_or_default()
    }

    /// Final value with flat and coefficient buffs applied.
    ///
    /// The coefficient never drops below 0.2, and only `DamagedRatio` may go
    /// negative.
    pub fn total(&self, key: StatKey) -> i64 {
        let Some(line) = self.stats.get(&key) else {
            return 0;
        };
        let uncapped = key == StatKey::DamagedRatio;
        let coefficient = if uncapped {
            line.coefficient
        } else {
            line.coefficient.max(0.2)
        };
        let total = round(round4((line.base + line.flat) * coefficient)) + line.separated;
        let total = total as i64;
        if uncapped {
            total
        } else {
            total.max(0)
        }
    }

    /// Display form: rates as percentages, counts with thousands separators
    pub fn total_string(&self, key: StatKey) -> String {
        let total = self.total(key);
        if key == StatKey::DamagedRatio {
            format!("{:.0}%", (total - 10000) as f64 / 100.0)
        } else if key.is_rate() {
            format!("{:.0}%", total as f64 / 100.0)
        } else {
            group_thousands(total)
        }
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Stat bonuses granted by bond levels below `level` (capped at 50)
pub fn bond_stats(record: &EntityRecord, level: u32) -> Vec<(String, f64)> {
    let mut sums = [0.0f64; 2];
    for i in 1..level.min(50) as usize {
        let row = if i < 20 { i / 5 } else { 2 + i / 10 };
        let Some(values) = record.favor_stat_value.get(row) else {
            continue;
        };
        for (sum, v) in sums.iter_mut().zip(values) {
            *sum += v;
        }
    }
    record
        .favor_stat_type
        .iter()
        .take(2)
        .zip(sums)
        .map(|(name, sum)| (name.clone(), sum))
        .collect()
}
