//! `rules.mk` parsing.
//!
//! Only the assignment subset of make syntax is understood:
//!
//! - `KEY = value` and `KEY := value` assign
//! - `KEY ?= value` assigns only if `KEY` is not yet set
//! - `KEY += value` appends with a single space (or assigns if unset)
//!
//! Comment lines and trailing `# comments` are ignored, as is anything
//! that is not an assignment (conditionals, includes, recipes).

use super::AttributeMap;

/// Assignment operator found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assign {
    Set,
    SetIfAbsent,
    Append,
}

/// Parse the contents of one `rules.mk` file on top of `attrs`.
///
/// Values already present in `attrs` are overridden, appended to or kept
/// according to each line's operator, which makes layering parent and child
/// rules files a matter of calling this once per file.
pub fn parse_rules_mk(contents: &str, attrs: &mut AttributeMap) {
    for line in contents.lines() {
        let Some((key, op, value)) = parse_line(line) else {
            continue;
        };

        match op {
            Assign::Set => {
                attrs.insert(key.to_string(), value.to_string());
            }
            Assign::SetIfAbsent => {
                attrs.entry(key.to_string()).or_insert_with(|| value.to_string());
            }
            Assign::Append => {
                attrs
                    .entry(key.to_string())
                    .and_modify(|existing| {
                        existing.push(' ');
                        existing.push_str(value);
                    })
                    .or_insert_with(|| value.to_string());
            }
        }
    }
}

/// Split one line into `(key, operator, value)`.
fn parse_line(line: &str) -> Option<(&str, Assign, &str)> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let eq = line.find('=')?;
    let (lhs, op) = match line[..eq].chars().last() {
        Some('+') => (&line[..eq - 1], Assign::Append),
        Some('?') => (&line[..eq - 1], Assign::SetIfAbsent),
        Some(':') => (&line[..eq - 1], Assign::Set),
        _ => (&line[..eq], Assign::Set),
    };

    let key = lhs.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    Some((key, op, line[eq + 1..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        parse_rules_mk(contents, &mut attrs);
        attrs
    }

    #[test]
    fn test_simple_assignments() {
        let attrs = parse("MCU = atmega32u4\nBOOTLOADER=caterina\n");
        assert_eq!(attrs["MCU"], "atmega32u4");
        assert_eq!(attrs["BOOTLOADER"], "caterina");
    }

    #[test]
    fn test_comments_are_ignored() {
        let attrs = parse(
            "# MCU name\n\
             MCU = STM32F303 # ARM\n\
             #SPLIT_KEYBOARD = yes\n",
        );
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["MCU"], "STM32F303");
    }

    #[test]
    fn test_colon_assignment() {
        let attrs = parse("LTO_ENABLE := yes\n");
        assert_eq!(attrs["LTO_ENABLE"], "yes");
    }

    #[test]
    fn test_conditional_assignment() {
        let attrs = parse("RGBLIGHT_ENABLE = no\nRGBLIGHT_ENABLE ?= yes\nAUDIO_ENABLE ?= yes\n");
        assert_eq!(attrs["RGBLIGHT_ENABLE"], "no");
        assert_eq!(attrs["AUDIO_ENABLE"], "yes");
    }

    #[test]
    fn test_append_assignment() {
        let attrs = parse("SRC = matrix.c\nSRC += split.c\nOPT_DEFS += -DFOO\n");
        assert_eq!(attrs["SRC"], "matrix.c split.c");
        assert_eq!(attrs["OPT_DEFS"], "-DFOO");
    }

    #[test]
    fn test_value_may_contain_operators() {
        let attrs = parse("OPT_DEFS = -DA=1 -DB+=2\n");
        assert_eq!(attrs["OPT_DEFS"], "-DA=1 -DB+=2");
    }

    #[test]
    fn test_non_assignments_are_skipped() {
        let attrs = parse(
            "ifeq ($(strip $(SPLIT_KEYBOARD)), yes)\n\
             include $(KEYBOARD_PATH)/extra.mk\n\
             endif\n\
             \n\
             SPLIT_KEYBOARD = yes\n",
        );
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["SPLIT_KEYBOARD"], "yes");
    }

    #[test]
    fn test_empty_value() {
        let attrs = parse("DEFAULT_FOLDER =\n");
        assert_eq!(attrs["DEFAULT_FOLDER"], "");
    }

    #[test]
    fn test_layering_overrides_parent() {
        let mut attrs = AttributeMap::new();
        parse_rules_mk("SPLIT_KEYBOARD = no\nMCU = atmega32u4\n", &mut attrs);
        parse_rules_mk("SPLIT_KEYBOARD = yes\n", &mut attrs);

        assert_eq!(attrs["SPLIT_KEYBOARD"], "yes");
        assert_eq!(attrs["MCU"], "atmega32u4");
    }
}
