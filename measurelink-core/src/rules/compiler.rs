use crate::cache::calculate_config_hash;
use crate::error::ConfigError;
use crate::types::{split_label, MeasurementForm};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::rule_set::*;
use super::schema::*;

/// Pattern document shipped with the crate.
pub const BUILTIN_PATTERNS: &str = include_str!("../../patterns/dependency_patterns.json");

impl RuleSet {
    /// Validate a raw pattern document and compile it into typed rules.
    ///
    /// Every problem is reported as a `ConfigError`; nothing is left to be
    /// discovered during traversal.
    pub fn compile(document: &PatternDocument) -> Result<RuleSet, ConfigError> {
        let mut rules: BTreeMap<String, Vec<PatternRule>> = BTreeMap::new();

        for (label, entry) in &document.dep {
            for rule in compile_entry(label, entry)? {
                let variants = rules.entry(rule.relation.clone()).or_default();
                if variants.iter().any(|v| v.qualifier == rule.qualifier) {
                    return Err(ConfigError::InvalidShape {
                        rule: rule.label(),
                        expected: "a single definition per relation and qualifier".to_string(),
                    });
                }
                variants.push(rule);
            }
        }

        // Qualified variants first, by qualifier; the bare variant last.
        for variants in rules.values_mut() {
            variants.sort_by(|a, b| {
                (a.qualifier.is_none(), &a.qualifier).cmp(&(b.qualifier.is_none(), &b.qualifier))
            });
        }

        let operator_words = compile_words(&document.word)?;

        let mut rule_set = RuleSet {
            rules,
            operator_words,
            fingerprint: String::new(),
        };
        rule_set.fingerprint = calculate_config_hash(&rule_set.to_document())?;

        debug!(
            relations = rule_set.rules.len(),
            variants = rule_set.rule_count(),
            fingerprint = %rule_set.fingerprint,
            "compiled pattern rules"
        );
        Ok(rule_set)
    }

    pub fn from_json_str(content: &str) -> Result<RuleSet, ConfigError> {
        Self::compile(&PatternDocument::from_json_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let rule_set = Self::from_json_str(&content)?;
        info!(
            "📁 Loaded {} pattern rules from {}",
            rule_set.rule_count(),
            path.display()
        );
        Ok(rule_set)
    }

    pub fn builtin() -> Result<RuleSet, ConfigError> {
        Self::from_json_str(BUILTIN_PATTERNS)
    }

    /// Canonical document for this rule set. Compiling it again yields a rule
    /// set that matches identically.
    pub fn to_document(&self) -> PatternDocument {
        let mut dep = BTreeMap::new();

        for (relation, variants) in &self.rules {
            let mut entry = Map::new();
            let enhanced = variants.iter().any(|v| v.qualifier.is_some());
            entry.insert(ENHANCED_KEY.to_string(), Value::Bool(enhanced));

            for variant in variants {
                let body = variant_body(variant);
                match &variant.qualifier {
                    Some(q) => {
                        entry.insert(q.clone(), Value::Object(body));
                    }
                    None => entry.extend(body),
                }
            }
            dep.insert(relation.clone(), Value::Object(entry));
        }

        let mut word = BTreeMap::new();
        if !self.operator_words.is_empty() {
            word.insert(
                OPERATOR_KEY.to_string(),
                Value::Array(
                    self.operator_words
                        .iter()
                        .map(|w| Value::String(w.clone()))
                        .collect(),
                ),
            );
        }

        PatternDocument { dep, word }
    }
}

fn compile_entry(label: &str, entry: &Value) -> Result<Vec<PatternRule>, ConfigError> {
    let (relation, label_qualifier) = split_label(label);
    let Value::Object(map) = entry else {
        return Err(ConfigError::InvalidShape {
            rule: label.to_string(),
            expected: "an object".to_string(),
        });
    };

    let enhanced = match map.get(ENHANCED_KEY) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ConfigError::InvalidShape {
                rule: label.to_string(),
                expected: "`enhanced` to be true or false".to_string(),
            })
        }
    };

    let mut has_bare_fields = false;
    let mut attachments = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            ENHANCED_KEY => {}
            MEASUREMENT_TYPES_KEY => has_bare_fields = true,
            k if PosMode::from_key(k).is_some() => has_bare_fields = true,
            _ if enhanced && value.is_object() => attachments.push((key, value)),
            _ => {
                return Err(ConfigError::UnknownKey {
                    rule: label.to_string(),
                    key: key.clone(),
                })
            }
        }
    }

    let mut variants = Vec::new();
    if enhanced {
        if label_qualifier.is_some() {
            return Err(ConfigError::InvalidShape {
                rule: label.to_string(),
                expected: "an unqualified relation label on an enhanced entry".to_string(),
            });
        }
        if attachments.is_empty() && !has_bare_fields {
            return Err(ConfigError::MissingQualifiers {
                rule: label.to_string(),
            });
        }

        for (qualifier, value) in attachments {
            let rule_label = format!("{relation}:{qualifier}");
            let Value::Object(sub) = value else {
                continue;
            };
            for (key, inner) in sub {
                let known = key == MEASUREMENT_TYPES_KEY || PosMode::from_key(key).is_some();
                if known {
                    continue;
                }
                if inner.is_object() || key == ENHANCED_KEY {
                    return Err(ConfigError::NestedAttachment {
                        rule: relation.to_string(),
                        qualifier: qualifier.clone(),
                        key: key.clone(),
                    });
                }
                return Err(ConfigError::UnknownKey {
                    rule: rule_label,
                    key: key.clone(),
                });
            }
            variants.push(compile_variant(relation, Some(qualifier.as_str()), sub)?);
        }
    }

    if has_bare_fields || !enhanced {
        variants.push(compile_variant(relation, label_qualifier, map)?);
    }

    Ok(variants)
}

fn compile_variant(
    relation: &str,
    qualifier: Option<&str>,
    map: &Map<String, Value>,
) -> Result<PatternRule, ConfigError> {
    let rule_label = match qualifier {
        Some(q) => format!("{relation}:{q}"),
        None => relation.to_string(),
    };

    let measurement_types = compile_forms(&rule_label, map.get(MEASUREMENT_TYPES_KEY))?;

    let mut tests = Vec::new();
    for mode in [PosMode::In, PosMode::Equals, PosMode::Not] {
        if let Some(value) = map.get(mode.key()) {
            tests.extend(compile_pos(&rule_label, mode, value)?);
        }
    }

    if tests.is_empty() {
        return Err(ConfigError::NoPosTests { rule: rule_label });
    }
    if !tests.iter().any(|t| t.action.is_terminal()) {
        return Err(ConfigError::UnterminatedChain { rule: rule_label });
    }

    Ok(PatternRule {
        relation: relation.to_string(),
        qualifier: qualifier.map(str::to_string),
        measurement_types,
        tests,
    })
}

fn compile_forms(rule: &str, value: Option<&Value>) -> Result<Vec<MeasurementForm>, ConfigError> {
    let Some(Value::Array(items)) = value else {
        return Err(ConfigError::InvalidShape {
            rule: rule.to_string(),
            expected: "a `measurement_types` list".to_string(),
        });
    };

    let mut forms = Vec::new();
    for item in items {
        let form = item
            .as_str()
            .and_then(MeasurementForm::parse)
            .ok_or_else(|| ConfigError::UnknownMeasurementType {
                rule: rule.to_string(),
                value: item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()),
            })?;
        if !forms.contains(&form) {
            forms.push(form);
        }
    }

    if forms.is_empty() {
        return Err(ConfigError::EmptyMeasurementTypes {
            rule: rule.to_string(),
        });
    }
    Ok(forms)
}

fn compile_pos(rule: &str, mode: PosMode, value: &Value) -> Result<Vec<PosTest>, ConfigError> {
    let Value::Object(entries) = value else {
        return Err(ConfigError::UnsupportedPos {
            rule: rule.to_string(),
            field: mode.key().to_string(),
            tag: "*".to_string(),
            reason: "expected an object mapping POS tags to actions".to_string(),
        });
    };

    let mut compiled = Vec::with_capacity(entries.len());
    for (tag, action) in entries {
        compiled.push((tag.clone(), compile_action(rule, mode, tag, action)?));
    }

    if mode != PosMode::Not {
        return Ok(compiled
            .into_iter()
            .map(|(tag, action)| PosTest {
                mode,
                tags: vec![tag],
                action,
            })
            .collect());
    }

    // `pos_not` is one test over every listed tag, so the tags must agree on
    // what to do.
    let Some((first_tag, action)) = compiled.first().cloned() else {
        return Ok(Vec::new());
    };
    if let Some((tag, _)) = compiled.iter().find(|(_, a)| *a != action) {
        return Err(ConfigError::UnsupportedPos {
            rule: rule.to_string(),
            field: mode.key().to_string(),
            tag: tag.clone(),
            reason: format!("action differs from the one declared for `{first_tag}`"),
        });
    }
    Ok(vec![PosTest {
        mode,
        tags: compiled.into_iter().map(|(tag, _)| tag).collect(),
        action,
    }])
}

fn compile_action(rule: &str, mode: PosMode, tag: &str, value: &Value) -> Result<PosAction, ConfigError> {
    let unsupported = |reason: &str| ConfigError::UnsupportedPos {
        rule: rule.to_string(),
        field: mode.key().to_string(),
        tag: tag.to_string(),
        reason: reason.to_string(),
    };

    match value {
        Value::Null => Ok(PosAction::Accept),
        Value::String(name) if name == ADD_SIBLING => Ok(PosAction::Accept),
        Value::String(name) => match TraversalStep::from_name(name) {
            Some(step) => Ok(PosAction::Continue {
                step,
                relations: Vec::new(),
                fallback: Fallback::Never,
            }),
            None => Err(ConfigError::UnknownStep {
                rule: rule.to_string(),
                step: name.clone(),
            }),
        },
        Value::Object(fields) => {
            let mut step = None;
            let mut relations = Vec::new();
            let mut fallback = Fallback::Never;

            for (key, field) in fields {
                if key == ELSE_KEY {
                    fallback = match field {
                        Value::Bool(true) => Fallback::IfEmpty,
                        Value::Bool(false) => Fallback::Never,
                        Value::String(s) if s == ELSE_ALWAYS => Fallback::Always,
                        _ => return Err(unsupported("`else` must be true, false or \"always\"")),
                    };
                } else if let Some(found) = TraversalStep::from_name(key) {
                    if step.is_some() {
                        return Err(unsupported("more than one traversal step"));
                    }
                    step = Some(found);
                    relations = match field {
                        Value::Null => Vec::new(),
                        Value::Array(items) => items
                            .iter()
                            .map(|item| item.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                            .ok_or_else(|| unsupported("relation filter must list relation labels"))?,
                        _ => return Err(unsupported("relation filter must list relation labels")),
                    };
                } else if key.starts_with("get_") {
                    return Err(ConfigError::UnknownStep {
                        rule: rule.to_string(),
                        step: key.clone(),
                    });
                } else {
                    return Err(ConfigError::UnknownKey {
                        rule: rule.to_string(),
                        key: key.clone(),
                    });
                }
            }

            match step {
                Some(step) => Ok(PosAction::Continue {
                    step,
                    relations,
                    fallback,
                }),
                None => Err(unsupported("object action names no traversal step")),
            }
        }
        _ => Err(unsupported("expected null, a step name or a step object")),
    }
}

fn compile_words(word: &BTreeMap<String, Value>) -> Result<Vec<String>, ConfigError> {
    let mut operators = Vec::new();
    for (key, value) in word {
        if key != OPERATOR_KEY {
            return Err(ConfigError::UnknownKey {
                rule: WORD_SECTION.to_string(),
                key: key.clone(),
            });
        }
        let words = value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| ConfigError::InvalidShape {
                rule: format!("{WORD_SECTION}.{OPERATOR_KEY}"),
                expected: "a list of words".to_string(),
            })?;
        for w in words {
            if !operators.contains(&w) {
                operators.push(w);
            }
        }
    }
    Ok(operators)
}

fn variant_body(rule: &PatternRule) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(
        MEASUREMENT_TYPES_KEY.to_string(),
        Value::Array(
            rule.measurement_types
                .iter()
                .map(|f| Value::String(f.as_str().to_string()))
                .collect(),
        ),
    );

    for test in &rule.tests {
        let field = body
            .entry(test.mode.key().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(tags) = field {
            for tag in &test.tags {
                tags.insert(tag.clone(), action_value(&test.action));
            }
        }
    }
    body
}

fn action_value(action: &PosAction) -> Value {
    match action {
        PosAction::Accept => Value::Null,
        PosAction::Continue {
            step,
            relations,
            fallback,
        } => {
            let mut fields = Map::new();
            fields.insert(
                step.name().to_string(),
                Value::Array(relations.iter().map(|r| Value::String(r.clone())).collect()),
            );
            match fallback {
                Fallback::Never => {}
                Fallback::IfEmpty => {
                    fields.insert(ELSE_KEY.to_string(), Value::Bool(true));
                }
                Fallback::Always => {
                    fields.insert(ELSE_KEY.to_string(), Value::String(ELSE_ALWAYS.to_string()));
                }
            }
            Value::Object(fields)
        }
    }
}
