//! Parser for dialogue scripts
//!
//! A script is line oriented. A line starting with `/` and one of the role
//! letters opens a new block:
//!
//! ```text
//! /S <name> [text]   a character speaks
//! /T [text]          the viewer replies
//! /O [option]        a list of reply choices
//! /K <name> [text]   a relationship story banner
//! ```
//!
//! Any other line continues the open block. Choice lists take one option per
//! line; every other block joins continuation lines with `\n`. Role letters
//! are case-insensitive.

use crate::catalog::{EntityCatalog, EntityRef};
use crate::error::ParseErrors;
use crate::record::EntityRecord;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Above this many matches a name is rejected outright
pub const DISAMBIGUATION_THRESHOLD: usize = 5;

/// One parsed unit of dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBlock {
    Speaker { entity: EntityRef, lines: Vec<String> },
    Counterpart { lines: Vec<String> },
    ChoiceList { options: Vec<String> },
    RelationshipBanner { entity: EntityRef, caption: String },
}

impl MessageBlock {
    /// Text content joined with `\n`
    pub fn content(&self) -> String {
        match self {
            MessageBlock::Speaker { lines, .. } | MessageBlock::Counterpart { lines } => lines.join("\n"),
            MessageBlock::ChoiceList { options } => options.join("\n"),
            MessageBlock::RelationshipBanner { caption, .. } => caption.clone(),
        }
    }

    fn push_line(&mut self, line: &str) {
        match self {
            MessageBlock::Speaker { lines, .. } | MessageBlock::Counterpart { lines } => {
                lines.push(line.to_string())
            }
            MessageBlock::ChoiceList { options } => options.push(line.to_string()),
            MessageBlock::RelationshipBanner { caption, .. } => {
                caption.push('\n');
                caption.push_str(line);
            }
        }
    }
}

/// Default caption of a banner written without text
pub fn default_caption(name: &str) -> String {
    format!("Enter {}'s relationship story", name)
}

/// A piece of a bubble line: text, or a 1-based inline image index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Image(usize),
}

static IMAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[img:(\d+)\]").expect("valid regex"));

/// Splits a line on `[img:n]` tokens.
///
/// Tokens outside `1..=image_count` are dropped as if they were never
/// written, so the text around them stays one piece. Blank text pieces are
/// dropped.
pub fn segments(line: &str, image_count: usize) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut pending = String::new();
    let mut last = 0;
    for caps in IMAGE_TOKEN.captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        pending.push_str(&line[last..whole.start()]);
        last = whole.end();
        let index = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
        if let Some(n) = index.filter(|n| (1..=image_count).contains(n)) {
            flush_text(&mut out, &mut pending);
            out.push(Segment::Image(n));
        }
    }
    pending.push_str(&line[last..]);
    flush_text(&mut out, &mut pending);
    out
}

fn flush_text(out: &mut Vec<Segment>, pending: &mut String) {
    let text = pending.trim();
    if !text.is_empty() {
        out.push(Segment::Text(text.to_string()));
    }
    pending.clear();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Speaker,
    Counterpart,
    Choice,
    Relationship,
}

impl Role {
    fn from_letter(c: char) -> Option<Role> {
        match c.to_ascii_uppercase() {
            'S' => Some(Role::Speaker),
            'T' => Some(Role::Counterpart),
            'O' => Some(Role::Choice),
            'K' => Some(Role::Relationship),
            _ => None,
        }
    }
}

/// Splits `/X rest` into its role and remainder
fn command(line: &str) -> Option<(Role, &str)> {
    let rest = line.strip_prefix('/')?;
    let letter = rest.chars().next()?;
    let role = Role::from_letter(letter)?;
    Some((role, rest[letter.len_utf8()..].trim()))
}

/// `hoshino2` -> (`hoshino`, 2)
fn split_index(name: &str) -> Option<(&str, usize)> {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.is_empty() || base.len() == name.len() {
        return None;
    }
    let index = name[base.len()..].parse().ok()?;
    Some((base, index))
}

enum Open {
    Nothing,
    Block(MessageBlock),
    /// The opening command failed; continuations are absorbed silently
    Discarded,
}

pub struct ScriptParser<'a> {
    catalog: &'a dyn EntityCatalog,
    candidates: &'a [Arc<EntityRecord>],
    line: usize,
    open: Open,
    blocks: Vec<MessageBlock>,
    errors: Vec<String>,
}

impl<'a> ScriptParser<'a> {
    pub fn new(catalog: &'a dyn EntityCatalog, candidates: &'a [Arc<EntityRecord>]) -> Self {
        Self {
            catalog,
            candidates,
            line: 0,
            open: Open::Nothing,
            blocks: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Parses the whole script, reporting every bad line at once
    pub fn parse(mut self, script: &str) -> Result<Vec<MessageBlock>, ParseErrors> {
        let mut commands = 0;
        for (i, raw) in script.lines().enumerate() {
            self.line = i + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            match command(line) {
                Some((role, rest)) => {
                    commands += 1;
                    self.close();
                    self.open = match self.open_block(role, rest) {
                        Ok(block) => Open::Block(block),
                        Err(message) => {
                            self.error(message);
                            Open::Discarded
                        }
                    };
                }
                None => self.continue_block(line),
            }
        }
        self.close();

        if commands == 0 && self.errors.is_empty() {
            self.errors.push("script contains no command lines".to_string());
        }
        if self.errors.is_empty() {
            Ok(self.blocks)
        } else {
            Err(ParseErrors(self.errors))
        }
    }

    fn error(&mut self, message: String) {
        self.errors.push(format!("line {}: {}", self.line, message));
    }

    fn close(&mut self) {
        if let Open::Block(block) = std::mem::replace(&mut self.open, Open::Nothing) {
            self.blocks.push(block);
        }
    }

    fn continue_block(&mut self, line: &str) {
        match &mut self.open {
            Open::Block(block) => block.push_line(line),
            Open::Discarded => {}
            Open::Nothing => {
                let head: String = line.chars().take(2).collect();
                self.error(format!("cannot parse {:?} as a command", head));
            }
        }
    }

    fn open_block(&self, role: Role, rest: &str) -> Result<MessageBlock, String> {
        let initial = |text: &str| -> Vec<String> {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            }
        };
        match role {
            Role::Counterpart => Ok(MessageBlock::Counterpart { lines: initial(rest) }),
            Role::Choice => Ok(MessageBlock::ChoiceList {
                options: vec![rest.to_string()],
            }),
            Role::Speaker | Role::Relationship => {
                let (name, content) = match rest.split_once(char::is_whitespace) {
                    Some((name, content)) => (name, content.trim()),
                    None => (rest, ""),
                };
                if name.is_empty() {
                    return Err("missing character name".to_string());
                }
                let record = self.resolve(name)?;
                let entity = EntityRef::of(&record);
                Ok(if role == Role::Speaker {
                    MessageBlock::Speaker {
                        entity,
                        lines: initial(content),
                    }
                } else {
                    let caption = if content.is_empty() {
                        default_caption(&record.name)
                    } else {
                        content.to_string()
                    };
                    MessageBlock::RelationshipBanner { entity, caption }
                })
            }
        }
    }

    /// Exactly one match is accepted; `name2` picks the second of several
    fn resolve(&self, query: &str) -> Result<Arc<EntityRecord>, String> {
        let mut name = query;
        let mut found = self.catalog.find_by_name(query, self.candidates);
        if found.is_empty() {
            if let Some((base, index)) = split_index(query) {
                name = base;
                found = self.catalog.find_by_name(base, self.candidates);
                if let Some(hit) = index.checked_sub(1).and_then(|i| found.get(i)) {
                    found = vec![hit.clone()];
                }
            }
        }

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(format!("no character matches \"{}\"", name)),
            n if n > DISAMBIGUATION_THRESHOLD => Err(format!(
                "\"{}\" is too ambiguous, use a more precise name",
                name
            )),
            _ => {
                let listed: Vec<String> = found
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}.{}", i + 1, r.name))
                    .collect();
                Err(format!(
                    "\"{}\" may refer to {}, use a more precise name or {}+number",
                    name,
                    listed.join("/"),
                    name
                ))
            }
        }
    }
}

/// Parses `script`, trying `candidates` before the catalog
pub fn parse(
    script: &str,
    candidates: &[Arc<EntityRecord>],
    catalog: &dyn EntityCatalog,
) -> Result<Vec<MessageBlock>, ParseErrors> {
    ScriptParser::new(catalog, candidates).parse(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::from_records(
            ["Hoshino", "Hoshino (Swimsuit)", "Hoshino (Armed)", "Aru", "Aru (New Year)"]
                .iter()
                .enumerate()
                .map(|(i, n)| EntityRecord {
                    id: i as u32 + 1,
                    name: n.to_string(),
                    ..EntityRecord::default()
                }),
        )
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(command("/s Aru hi"), Some((Role::Speaker, "Aru hi")));
        assert_eq!(command("/K Aru"), Some((Role::Relationship, "Aru")));
        assert_eq!(command("/x nope"), None);
        assert_eq!(command("hello"), None);
    }

    #[test]
    fn splits_trailing_index() {
        assert_eq!(split_index("hoshino2"), Some(("hoshino", 2)));
        assert_eq!(split_index("hoshino"), None);
        assert_eq!(split_index("42"), None);
    }

    #[test]
    fn choices_take_one_option_per_line() {
        let blocks = parse("/O first\nsecond\n/T done", &[], &catalog()).unwrap();
        assert_eq!(
            blocks,
            vec![
                MessageBlock::ChoiceList {
                    options: vec!["first".into(), "second".into()]
                },
                MessageBlock::Counterpart {
                    lines: vec!["done".into()]
                },
            ]
        );
    }

    #[test]
    fn banner_gets_default_caption() {
        let blocks = parse("/k aru", &[], &catalog()).unwrap();
        let MessageBlock::RelationshipBanner { entity, caption } = &blocks[0] else {
            panic!("expected banner, got {:?}", blocks[0]);
        };
        assert_eq!(entity.id, 4);
        assert_eq!(caption, "Enter Aru's relationship story");
    }

    #[test]
    fn ambiguous_names_list_candidates() {
        let errors = parse("/S hosh hi", &[], &catalog()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.messages()[0],
            "line 1: \"hosh\" may refer to 1.Hoshino/2.Hoshino (Swimsuit)/3.Hoshino (Armed), \
             use a more precise name or hosh+number"
        );
    }

    #[test]
    fn errors_accumulate_and_skip_orphans() {
        let script = "/S Nobody hi\nstill nobody\n/S hosh\n/T ok\n/S a";
        let errors = parse(script, &[], &catalog()).unwrap_err();
        let messages = errors.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("line 1: no character matches"));
        assert!(messages[1].starts_with("line 3:"));
        assert!(messages[2].starts_with("line 5:"));
        assert!(messages[2].contains("too ambiguous") || messages[2].contains("may refer to"));
    }

    #[test]
    fn empty_script_is_an_error() {
        assert!(parse("", &[], &catalog()).is_err());
        assert!(parse("\n  \n", &[], &catalog()).is_err());
    }

    #[test]
    fn segments_split_on_image_tokens() {
        assert_eq!(
            segments("look [img:2] here[img:10]", 10),
            vec![
                Segment::Text("look".into()),
                Segment::Image(2),
                Segment::Text("here".into()),
                Segment::Image(10),
            ]
        );
        assert_eq!(segments("  ", 0), Vec::<Segment>::new());
    }

    #[test]
    fn missing_images_vanish_from_segments() {
        assert_eq!(
            segments("hello [img:3] world", 2),
            segments("hello  world", 2)
        );
        assert_eq!(segments("[img:0][img:1]", 1), vec![Segment::Image(1)]);
    }
}
