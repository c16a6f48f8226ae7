//! Skill description markup expanded into colored spans

use crate::color::Color;
use crate::localize::{Language, Localization};
use crate::text::Span;
use regex::Regex;
use std::sync::LazyLock;

pub const PARAM_COLOR: Color = Color::rgb(0x34, 0xa4, 0xe4);
pub const BUFF_COLOR: Color = Color::rgb(0xff, 0x97, 0x00);

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\?(\d+)>|<([bdcs]):(.+?)>").expect("valid regex"));

/// Expands `<?n>` and `<b:x>`/`<d:x>`/`<c:x>`/`<s:x>` placeholders.
///
/// `<?n>` becomes the first `level` values of `params[n-1]` joined with `/`;
/// an out-of-range parameter expands to nothing. Buff tags are looked up in the
/// `BuffName` table. Plain text keeps `base`.
pub fn parse_rich_text(
    text: &str,
    params: &[Vec<String>],
    level: usize,
    base: Color,
    lang: Language,
    loc: &Localization,
) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in MARKUP.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_plain(&mut spans, &text[last..whole.start()], base);
        last = whole.end();

        if let Some(n) = caps.get(1) {
            let values = n
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| params.get(i));
            if let Some(values) = values {
                let joined = values.iter().take(level).cloned().collect::<Vec<_>>().join("/");
                if !joined.is_empty() {
                    spans.push(Span::new(joined, PARAM_COLOR));
                }
            }
            continue;
        }

        let prefix = match caps.get(2).map(|m| m.as_str()) {
            Some("b") => "Buff_",
            Some("d") => "Debuff_",
            Some("c") => "CC_",
            _ => "Special_",
        };
        let name = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
        let label = loc.localize("BuffName", &format!("{}{}", prefix, name), lang);
        spans.push(Span::new(label, BUFF_COLOR));
    }
    push_plain(&mut spans, &text[last..], base);
    spans
}

fn push_plain(spans: &mut Vec<Span>, text: &str, color: Color) {
    if !text.is_empty() {
        spans.push(Span::new(text, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::Table;
    use std::collections::HashMap;

    const BASE: Color = Color::rgb(0x4b, 0x5a, 0x6f);

    fn loc() -> Localization {
        let mut buffs = HashMap::new();
        buffs.insert("Buff_AttackPower".to_string(), "攻击力增加".to_string());
        buffs.insert("CC_Stunned".to_string(), "晕眩".to_string());
        let mut table = Table::new();
        table.insert("BuffName".to_string(), buffs);
        Localization::from_tables([(Language::Cn, table)])
    }

    fn params() -> Vec<Vec<String>> {
        vec![
            vec!["100%".into(), "110%".into(), "120%".into()],
            vec!["5".into(), "6".into()],
        ]
    }

    #[test]
    fn substitutes_parameters_and_buffs() {
        let spans = parse_rich_text(
            "Deals <?1> damage and grants <b:AttackPower> for <?2>s",
            &params(),
            2,
            BASE,
            Language::Cn,
            &loc(),
        );
        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Deals ", "100%/110%", " damage and grants ", "攻击力增加", " for ", "5/6", "s"]
        );
        assert_eq!(spans[1].color, PARAM_COLOR);
        assert_eq!(spans[3].color, BUFF_COLOR);
        assert_eq!(spans[0].color, BASE);
    }

    #[test]
    fn unknown_placeholders_degrade() {
        let spans = parse_rich_text("<?9><c:Stunned><s:Mark>", &params(), 10, BASE, Language::Cn, &loc());
        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["晕眩", "Special_Mark"]);
    }

    #[test]
    fn plain_text_is_one_span() {
        let spans = parse_rich_text("no markup", &[], 10, BASE, Language::Cn, &loc());
        assert_eq!(spans, vec![Span::new("no markup", BASE)]);
    }
}
