//! Precomputed name dictionaries for DWARF enumerations.

use std::sync::Arc;

use gimli::constants;

use crate::columns::StringDict;

fn build_dict(prefix: &str, name: impl Fn(u16) -> Option<&'static str>) -> Arc<StringDict> {
    let mut entries = Vec::with_capacity(1 << 16);
    // Code 0 is unassigned in all three enumerations and maps to the empty string.
    for code in 0..=u16::MAX {
        let stripped = name(code)
            .and_then(|s| s.strip_prefix(prefix))
            .unwrap_or_default();
        entries.push(Box::from(stripped.as_bytes()));
    }
    Arc::new(StringDict::new(entries))
}

/// Dictionaries for the tag, attribute and form enumerations, indexed by the 16-bit code.
///
/// Built once per reader and shared by reference into every chunk.
#[derive(Clone, Debug)]
pub struct DictRegistry {
    /// Tag names without the `DW_TAG_` prefix.
    pub tags: Arc<StringDict>,
    /// Attribute names without the `DW_AT_` prefix.
    pub attrs: Arc<StringDict>,
    /// Form names without the `DW_FORM_` prefix.
    pub forms: Arc<StringDict>,
}

impl DictRegistry {
    /// Builds the three dictionaries.
    pub fn new() -> Self {
        DictRegistry {
            tags: build_dict("DW_TAG_", |code| constants::DwTag(code).static_string()),
            attrs: build_dict("DW_AT_", |code| constants::DwAt(code).static_string()),
            forms: build_dict("DW_FORM_", |code| constants::DwForm(code).static_string()),
        }
    }
}

impl Default for DictRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The `DW_LANG_*` name for a raw `DW_AT_language` value, prefix stripped.
pub(crate) fn language_name(raw: u64) -> &'static [u8] {
    u16::try_from(raw)
        .ok()
        .and_then(|code| constants::DwLang(code).static_string())
        .and_then(|s| s.strip_prefix("DW_LANG_"))
        .unwrap_or_default()
        .as_bytes()
}

/// The `DW_ATE_*` name for a raw `DW_AT_encoding` value, prefix stripped.
pub(crate) fn encoding_name(raw: u64) -> &'static [u8] {
    u8::try_from(raw)
        .ok()
        .and_then(|code| constants::DwAte(code).static_string())
        .and_then(|s| s.strip_prefix("DW_ATE_"))
        .unwrap_or_default()
        .as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_stripped() {
        let registry = DictRegistry::new();
        assert_eq!(
            registry.tags.get(constants::DW_TAG_compile_unit.0 as usize),
            b"compile_unit"
        );
        assert_eq!(
            registry.attrs.get(constants::DW_AT_name.0 as usize),
            b"name"
        );
        assert_eq!(
            registry.forms.get(constants::DW_FORM_ref4.0 as usize),
            b"ref4"
        );
    }

    #[test]
    fn test_unassigned_codes_are_empty() {
        let registry = DictRegistry::new();
        assert_eq!(registry.tags.get(0), b"");
        assert_eq!(registry.tags.get(0xfffe), b"");
        assert_eq!(registry.tags.len(), 1 << 16);
    }

    #[test]
    fn test_value_stringifiers() {
        assert_eq!(language_name(0x0004), b"C_plus_plus");
        assert_eq!(language_name(0xfff0), b"");
        assert_eq!(encoding_name(0x05), b"signed");
        assert_eq!(encoding_name(0x4000), b"");
    }
}
