//! Minimal INI reader/writer for NEAT parameter files.
//!
//! Accepts `[Section]` headers, `key = value` (or `key: value`) entries,
//! indented continuation lines, and `#` / `;` comments either on their own
//! line or after whitespace at the end of a value. Keys are case-insensitive.

use super::ConfigError;
use std::collections::BTreeSet;
use std::fmt::{Display, Write as _};
use std::str::FromStr;

/// One `[Section]` with its entries in file order
#[derive(Clone, Debug, Default)]
pub struct IniSection {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// A parsed INI file
#[derive(Clone, Debug, Default)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = IniDocument::default();
        let mut last_key: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
            if indented {
                if let (Some(key), Some(section)) = (&last_key, doc.sections.last_mut()) {
                    if let Some((_, value)) = section.entries.iter_mut().find(|(k, _)| k == key) {
                        let extra = strip_inline_comment(trimmed);
                        if !extra.is_empty() {
                            if !value.is_empty() {
                                value.push(' ');
                            }
                            value.push_str(extra);
                        }
                        continue;
                    }
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| ConfigError::Parse {
                        line: line_no,
                        message: format!("unterminated section header '{}'", trimmed),
                    })?
                    .trim()
                    .to_string();
                if doc.sections.iter().any(|s| s.name == name) {
                    return Err(ConfigError::Parse {
                        line: line_no,
                        message: format!("duplicate section [{}]", name),
                    });
                }
                doc.sections.push(IniSection {
                    name,
                    entries: Vec::new(),
                });
                last_key = None;
                continue;
            }

            let split_at = trimmed.find(|c| c == '=' || c == ':').ok_or_else(|| ConfigError::Parse {
                line: line_no,
                message: format!("expected 'key = value', found '{}'", trimmed),
            })?;
            let key = trimmed[..split_at].trim().to_ascii_lowercase();
            let value = strip_inline_comment(trimmed[split_at + 1..].trim()).to_string();
            if key.is_empty() {
                return Err(ConfigError::Parse {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            let section = doc.sections.last_mut().ok_or_else(|| ConfigError::Parse {
                line: line_no,
                message: format!("entry '{}' appears before any section header", key),
            })?;
            if section.get(&key).is_some() {
                return Err(ConfigError::Parse {
                    line: line_no,
                    message: format!("duplicate key '{}' in [{}]", key, section.name),
                });
            }
            section.entries.push((key.clone(), value));
            last_key = Some(key);
        }

        Ok(doc)
    }

    /// First section matching any of `names`
    pub fn section(&self, names: &[&str]) -> Option<&IniSection> {
        names
            .iter()
            .find_map(|name| self.sections.iter().find(|s| s.name == *name))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let mut cut = value.len();
    for marker in [" #", "\t#", " ;", "\t;"] {
        if let Some(pos) = value.find(marker) {
            cut = cut.min(pos);
        }
    }
    value[..cut].trim_end()
}

fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// A type that can be read from an INI value
pub trait IniValue: Sized {
    fn parse_ini(raw: &str) -> Result<Self, String>;
}

impl IniValue for bool {
    fn parse_ini(raw: &str) -> Result<Self, String> {
        match unquote(raw).to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(true),
            "0" | "no" | "false" | "off" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        }
    }
}

impl IniValue for String {
    fn parse_ini(raw: &str) -> Result<Self, String> {
        Ok(unquote(raw).to_string())
    }
}

macro_rules! ini_value_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IniValue for $ty {
                fn parse_ini(raw: &str) -> Result<Self, String> {
                    let raw = unquote(raw);
                    <$ty>::from_str(raw).map_err(|e| format!("'{}': {}", raw, e))
                }
            }
        )*
    };
}

ini_value_via_from_str!(
    f64,
    u32,
    usize,
    crate::genome::InitialConnection,
    crate::genome::StructuralSurer,
    crate::genome::attributes::InitType,
    crate::genome::attributes::BoolDefault,
    crate::network::ActivationFunction,
    crate::network::AggregationFunction,
    crate::stats::StatFunction,
);

/// Space-separated list, each element optionally quoted
impl<T: IniValue> IniValue for Vec<T> {
    fn parse_ini(raw: &str) -> Result<Self, String> {
        unquote(raw).split_whitespace().map(T::parse_ini).collect()
    }
}

/// Typed access to one section, tracking which keys were read
pub struct SectionReader<'a> {
    section: &'a IniSection,
    consumed: BTreeSet<String>,
}

impl<'a> SectionReader<'a> {
    pub fn new(section: &'a IniSection) -> Self {
        Self {
            section,
            consumed: BTreeSet::new(),
        }
    }

    pub fn required<T: IniValue>(&mut self, key: &str) -> Result<T, ConfigError> {
        self.read(key)?.ok_or_else(|| ConfigError::MissingKey {
            section: self.section.name.clone(),
            key: key.to_string(),
        })
    }

    pub fn optional<T: IniValue>(&mut self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.read(key)?.unwrap_or(default))
    }

    fn read<T: IniValue>(&mut self, key: &str) -> Result<Option<T>, ConfigError> {
        self.consumed.insert(key.to_string());
        match self.section.get(key) {
            None => Ok(None),
            Some(raw) => T::parse_ini(raw)
                .map(Some)
                .map_err(|message| ConfigError::InvalidValue {
                    section: self.section.name.clone(),
                    key: key.to_string(),
                    value: raw.to_string(),
                    message,
                }),
        }
    }

    /// Reject keys nobody asked for
    pub fn finish(self) -> Result<(), ConfigError> {
        let unknown: Vec<String> = self
            .section
            .keys()
            .filter(|k| !self.consumed.contains(*k))
            .map(str::to_string)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::UnknownKeys {
                section: self.section.name.clone(),
                keys: unknown,
            })
        }
    }
}

/// Builds INI text in the same dialect [`IniDocument::parse`] reads
#[derive(Default)]
pub struct IniWriter {
    out: String,
}

impl IniWriter {
    pub fn section(&mut self, name: &str) -> &mut Self {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let _ = writeln!(self.out, "[{}]", name);
        self
    }

    pub fn entry(&mut self, key: &str, value: impl Display) -> &mut Self {
        let _ = writeln!(self.out, "{:<34} = {}", key, value);
        self
    }

    pub fn bool_entry(&mut self, key: &str, value: bool) -> &mut Self {
        self.entry(key, if value { "True" } else { "False" })
    }

    pub fn list_entry<T: Display>(&mut self, key: &str, values: &[T]) -> &mut Self {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.entry(key, joined)
    }

    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# NEAT configuration
[NEAT]
fitness_criterion     = max
fitness_threshold     = 0.975
pop_size              = 150 # inline comment
reset_on_extinction   = False

[DefaultGenome]
activation_options    = gauss sin
                        tanh
bias_init_type        = 'gaussian'
; semicolon comment
Num_Inputs: 5
";

    #[test]
    fn test_parse_sections_and_values() {
        let doc = IniDocument::parse(SAMPLE).unwrap();
        let names: Vec<_> = doc.section_names().collect();
        assert_eq!(names, vec!["NEAT", "DefaultGenome"]);

        let neat = doc.section(&["NEAT"]).unwrap();
        assert_eq!(neat.get("fitness_threshold"), Some("0.975"));
        assert_eq!(neat.get("pop_size"), Some("150"));

        let genome = doc.section(&["DefaultGenome"]).unwrap();
        assert_eq!(genome.get("activation_options"), Some("gauss sin tanh"));
        assert_eq!(genome.get("num_inputs"), Some("5"));
    }

    #[test]
    fn test_typed_reads() {
        let doc = IniDocument::parse(SAMPLE).unwrap();
        let mut reader = SectionReader::new(doc.section(&["DefaultGenome"]).unwrap());
        let options: Vec<crate::network::ActivationFunction> =
            reader.required("activation_options").unwrap();
        assert_eq!(options.len(), 3);
        let init: crate::genome::attributes::InitType = reader.required("bias_init_type").unwrap();
        assert_eq!(init, crate::genome::attributes::InitType::Gaussian);
        let inputs: usize = reader.required("num_inputs").unwrap();
        assert_eq!(inputs, 5);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_booleans() {
        assert_eq!(bool::parse_ini("True"), Ok(true));
        assert_eq!(bool::parse_ini("false"), Ok(false));
        assert_eq!(bool::parse_ini("on"), Ok(true));
        assert!(bool::parse_ini("maybe").is_err());
    }

    #[test]
    fn test_missing_and_unknown_keys() {
        let doc = IniDocument::parse(SAMPLE).unwrap();
        let mut reader = SectionReader::new(doc.section(&["NEAT"]).unwrap());
        assert!(matches!(
            reader.required::<f64>("no_such_key"),
            Err(ConfigError::MissingKey { .. })
        ));
        let _: f64 = reader.required("fitness_threshold").unwrap();
        match reader.finish() {
            Err(ConfigError::UnknownKeys { keys, .. }) => {
                assert_eq!(keys, vec!["fitness_criterion", "pop_size", "reset_on_extinction"]);
            }
            other => panic!("expected unknown keys, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_names_the_key() {
        let doc = IniDocument::parse("[NEAT]\npop_size = lots\n").unwrap();
        let mut reader = SectionReader::new(doc.section(&["NEAT"]).unwrap());
        let err = reader.required::<usize>("pop_size").unwrap_err();
        assert!(err.to_string().contains("pop_size"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(IniDocument::parse("key = 1\n").is_err());
        assert!(IniDocument::parse("[A]\n[A]\n").is_err());
        assert!(IniDocument::parse("[A]\nx = 1\nx = 2\n").is_err());
        assert!(IniDocument::parse("[A\n").is_err());
        assert!(IniDocument::parse("[A]\nnot an entry\n").is_err());
    }

    #[test]
    fn test_writer_output_parses_back() {
        let text = IniWriter::default()
            .section("NEAT")
            .entry("pop_size", 30)
            .bool_entry("reset_on_extinction", true)
            .section("DefaultGenome")
            .list_entry("activation_options", &["sigmoid", "gauss"])
            .finish();
        let doc = IniDocument::parse(&text).unwrap();
        let neat = doc.section(&["NEAT"]).unwrap();
        assert_eq!(bool::parse_ini(neat.get("reset_on_extinction").unwrap()), Ok(true));
        assert_eq!(
            doc.section(&["DefaultGenome"]).unwrap().get("activation_options"),
            Some("sigmoid gauss")
        );
    }
}
