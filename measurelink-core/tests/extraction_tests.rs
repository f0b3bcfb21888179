//! Extraction boundary tests.
//!
//! Each sentence is built by hand as parser output (tokens, offsets, enhanced
//! dependencies) plus the measurement spans an extractor would supply, and
//! the tests assert on the records that come out the other end:
//!
//! - Scenarios: full sentences with known related entities
//! - Rule semantics: form restriction, qualifier specificity, descriptors
//! - Configuration: round-trip, rejections, file loading, the shared cache
//! - Robustness: batch isolation, determinism and cycle safety (proptest)

use measurelink_core::*;
use std::io::Write;
use std::sync::Arc;

// ============================================================================
// Fixture helpers
// ============================================================================

/// Build parser output from `(text, pos, after)` triples. Offsets are laid
/// out from the texts and separators, indices start at 1.
fn parsed(words: &[(&str, &str, &str)], edges: &[(usize, usize, &str)]) -> ParsedSentence {
    let mut offset = 0;
    let tokens = words
        .iter()
        .enumerate()
        .map(|(i, (text, pos, after))| {
            let start = offset;
            let end = start + text.len();
            offset = end + after.len();
            Token::new(i + 1, text, pos, start, end, after)
        })
        .collect();
    let edges = edges
        .iter()
        .map(|(governor, dependent, relation)| ParsedEdge {
            governor: *governor,
            dependent: *dependent,
            relation: relation.to_string(),
            qualifier: None,
        })
        .collect();
    ParsedSentence { tokens, edges }
}

fn token(parse: &ParsedSentence, index: TokenIndex) -> &Token {
    parse
        .tokens
        .iter()
        .find(|t| t.index == index)
        .unwrap_or_else(|| panic!("fixture has no token {index}"))
}

/// Measurement span whose offsets are taken from the fixture's tokens.
fn span(
    parse: &ParsedSentence,
    raw_value: &str,
    value: TokenIndex,
    unit: Option<TokenIndex>,
    quantified: Option<&str>,
) -> MeasurementSpan {
    let value_token = token(parse, value);
    MeasurementSpan {
        kind: "value".to_string(),
        parsed_value: raw_value.parse().ok(),
        raw_value: raw_value.to_string(),
        unit: unit.map(|index| {
            let t = token(parse, index);
            UnitSpan {
                name: t.text.clone(),
                token_indices: vec![],
                offset_start: t.offset_start,
                offset_end: t.offset_end,
                after: t.after.clone(),
            }
        }),
        quantified: quantified.map(|name| QuantifiedSpan {
            name: name.to_string(),
            raw_name: None,
            offset_start: None,
            offset_end: None,
            token_index: None,
        }),
        offset_start: value_token.offset_start,
        offset_end: value_token.offset_end,
        token_index: None,
        least: None,
        most: None,
    }
}

/// "The patient returned to Europe at 28 weeks of gestation."
fn returned_to_europe() -> SentenceInput {
    let parse = parsed(
        &[
            ("The", "DT", " "),
            ("patient", "NN", " "),
            ("returned", "VBD", " "),
            ("to", "TO", " "),
            ("Europe", "NNP", " "),
            ("at", "IN", " "),
            ("28", "CD", " "),
            ("weeks", "NNS", " "),
            ("of", "IN", " "),
            ("gestation", "NN", ""),
            (".", ".", ""),
        ],
        &[
            (0, 3, "ROOT"),
            (2, 1, "det"),
            (3, 2, "nsubj"),
            (5, 4, "case"),
            (3, 5, "nmod:to"),
            (8, 6, "case"),
            (8, 7, "nummod"),
            (3, 8, "nmod:at"),
            (10, 9, "case"),
            (8, 10, "nmod:of"),
            (3, 11, "punct"),
        ],
    );
    let measurements = vec![span(&parse, "28", 7, Some(8), Some("gestation"))];
    SentenceInput {
        parse,
        measurements,
    }
}

/// "a spatial resolution of 10m"
fn spatial_resolution() -> SentenceInput {
    let parse = parsed(
        &[
            ("a", "DT", " "),
            ("spatial", "JJ", " "),
            ("resolution", "NN", " "),
            ("of", "IN", " "),
            ("10", "CD", ""),
            ("m", "NN", ""),
        ],
        &[
            (0, 3, "ROOT"),
            (3, 1, "det"),
            (3, 2, "amod"),
            (6, 4, "case"),
            (6, 5, "nummod"),
            (3, 6, "nmod:of"),
        ],
    );
    let measurements = vec![span(&parse, "10", 5, Some(6), None)];
    SentenceInput {
        parse,
        measurements,
    }
}

/// "a six-year study period", or "a six year study period" when `hyphen`
/// is false.
fn study_period(hyphen: bool) -> SentenceInput {
    let words: Vec<(&str, &str, &str)> = if hyphen {
        vec![
            ("a", "DT", " "),
            ("six", "CD", ""),
            ("-", "HYPH", ""),
            ("year", "NN", " "),
            ("study", "NN", " "),
            ("period", "NN", ""),
        ]
    } else {
        vec![
            ("a", "DT", " "),
            ("six", "CD", " "),
            ("_", "SYM", " "),
            ("year", "NN", " "),
            ("study", "NN", " "),
            ("period", "NN", ""),
        ]
    };
    let parse = parsed(
        &words,
        &[
            (0, 6, "ROOT"),
            (6, 1, "det"),
            (4, 2, "nummod"),
            (4, 3, "punct"),
            (6, 4, "amod"),
            (6, 5, "compound"),
        ],
    );
    let measurements = vec![span(&parse, "six", 2, Some(4), None)];
    SentenceInput {
        parse,
        measurements,
    }
}

/// "approximately 5 kg of rice"
fn approximately_rice() -> SentenceInput {
    let parse = parsed(
        &[
            ("approximately", "RB", " "),
            ("5", "CD", " "),
            ("kg", "NN", " "),
            ("of", "IN", " "),
            ("rice", "NN", ""),
        ],
        &[
            (0, 3, "ROOT"),
            (2, 1, "advmod"),
            (3, 2, "nummod"),
            (5, 4, "case"),
            (3, 5, "nmod:of"),
        ],
    );
    let measurements = vec![span(&parse, "5", 2, Some(3), None)];
    SentenceInput {
        parse,
        measurements,
    }
}

/// "The patient returned to Europe at 20 to 28 weeks of gestation."
fn interval_to_europe() -> SentenceInput {
    let parse = parsed(
        &[
            ("The", "DT", " "),
            ("patient", "NN", " "),
            ("returned", "VBD", " "),
            ("to", "TO", " "),
            ("Europe", "NNP", " "),
            ("at", "IN", " "),
            ("20", "CD", " "),
            ("to", "TO", " "),
            ("28", "CD", " "),
            ("weeks", "NNS", " "),
            ("of", "IN", " "),
            ("gestation", "NN", ""),
            (".", ".", ""),
        ],
        &[
            (0, 3, "ROOT"),
            (2, 1, "det"),
            (3, 2, "nsubj"),
            (5, 4, "case"),
            (3, 5, "nmod:to"),
            (10, 6, "case"),
            (9, 7, "compound"),
            (9, 8, "dep"),
            (10, 9, "nummod"),
            (3, 10, "nmod:at"),
            (12, 11, "case"),
            (10, 12, "nmod:of"),
            (3, 13, "punct"),
        ],
    );
    let bound = |raw: &str, index| {
        let t = token(&parse, index);
        QuantityBound {
            parsed_value: raw.parse().ok(),
            raw_value: raw.to_string(),
            offset_start: t.offset_start,
            offset_end: t.offset_end,
            token_index: None,
        }
    };
    let mut interval = span(&parse, "20 to 28", 7, Some(10), Some("gestation"));
    interval.kind = "interval".to_string();
    interval.offset_end = token(&parse, 9).offset_end;
    interval.least = Some(bound("20", 7));
    interval.most = Some(bound("28", 9));
    let measurements = vec![interval];
    SentenceInput {
        parse,
        measurements,
    }
}

fn builtin_extractor() -> MeasurementExtractor {
    MeasurementExtractor::with_builtin_rules().expect("bundled patterns compile")
}

fn extractor_for(patterns: &str) -> MeasurementExtractor {
    let rules = RuleSet::from_json_str(patterns).expect("test patterns compile");
    MeasurementExtractor::new(Arc::new(rules), ExtractorConfig::default())
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verb_continuation_reaches_subject_and_destination() {
        let result = builtin_extractor()
            .extract(1, &returned_to_europe())
            .unwrap();

        assert_eq!(result.text, "The patient returned to Europe at 28 weeks of gestation.");
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];

        assert_eq!(record.related_names(), vec!["patient", "Europe"]);
        for entity in &record.related {
            assert_eq!(entity.connector, "returned");
            assert_eq!(entity.relation_form, "nmod:at");
        }
    }

    #[test]
    fn quantified_echo_is_folded_into_quantified() {
        let result = builtin_extractor()
            .extract(1, &returned_to_europe())
            .unwrap();
        let record = &result.records[0];

        assert!(!record.related_names().contains(&"gestation"));
        let quantified = record.quantified.as_ref().unwrap();
        assert_eq!(quantified.name, "gestation");
        assert_eq!(quantified.token_index, Some(10));
        assert_eq!(record.quantity.quantified, None);
    }

    #[test]
    fn attached_unit_relates_to_governing_noun_with_descriptor() {
        let input = spatial_resolution();
        let extractor = builtin_extractor();
        let stages = extractor.extract_capture_stages(1, &input).unwrap();
        assert_eq!(stages.bound[0].form, MeasurementForm::Attached);

        let record = &extractor.extract(1, &input).unwrap().records[0];
        assert_eq!(record.related_names(), vec!["resolution"]);

        let resolution = &record.related[0];
        assert_eq!(resolution.relation_form, "nmod:of");
        assert_eq!(resolution.connector, "");
        let descriptors: Vec<_> = resolution
            .descriptors
            .iter()
            .map(|d| d.raw_name.as_str())
            .collect();
        assert_eq!(descriptors, vec!["spatial"]);
    }

    #[test]
    fn misaligned_measurement_is_dropped_not_fatal() {
        let mut input = spatial_resolution();
        let good = input.measurements[0].clone();
        let mut bad = good.clone();
        bad.raw_value = "99".to_string();
        bad.offset_start = 100;
        bad.offset_end = 102;
        input.measurements = vec![bad, good];

        let result = builtin_extractor().extract(1, &input).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].quantity.raw_value, "10");
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].position, 0);
        assert_eq!(result.dropped[0].raw_value, "99");
    }

    #[test]
    fn adverbs_are_reported_separately() {
        let record = &builtin_extractor()
            .extract(1, &approximately_rice())
            .unwrap()
            .records[0];

        assert_eq!(record.related_names(), vec!["rice"]);
        assert_eq!(record.adverbs.len(), 1);
        assert_eq!(record.adverbs[0].raw_name, "approximately");
        assert_eq!(record.adverbs[0].relation_form, "advmod");
    }

    #[test]
    fn disabled_adverbs_are_not_collected() {
        let mut config = ExtractorConfig::default();
        config.adverbs.enabled = false;
        let extractor = MeasurementExtractor::new(Arc::new(RuleSet::builtin().unwrap()), config);

        let record = &extractor.extract(1, &approximately_rice()).unwrap().records[0];
        assert!(record.adverbs.is_empty());
    }

    #[test]
    fn simplified_projection_uses_names() {
        let result = builtin_extractor()
            .extract(1, &returned_to_europe())
            .unwrap();
        let simplified = result.simplified();

        assert_eq!(simplified.len(), 1);
        assert_eq!(simplified[0].value, serde_json::json!(28.0));
        assert_eq!(simplified[0].unit, "weeks");
        assert!(simplified[0].quantified.contains_key("gestation"));
        assert_eq!(
            simplified[0].related.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Europe", "patient"]
        );
    }

    #[test]
    fn interval_keys_on_lower_bound_and_keeps_both_ends() {
        let result = builtin_extractor()
            .extract(1, &interval_to_europe())
            .unwrap();
        assert!(result.dropped.is_empty());
        let record = &result.records[0];

        assert_eq!(record.kind, "interval");
        assert_eq!(record.quantity.token_index, Some(7));
        assert_eq!(record.quantity.least.as_ref().unwrap().token_index, Some(7));
        assert_eq!(record.quantity.most.as_ref().unwrap().token_index, Some(9));
        assert_eq!(record.related_names(), vec!["patient", "Europe"]);

        let simplified = record.simplify();
        assert_eq!(simplified.value, serde_json::json!([20.0, 28.0]));
        assert_eq!(simplified.unit, "weeks");
    }
}

// ============================================================================
// Rule semantics
// ============================================================================

mod rule_semantics {
    use super::*;
    use pretty_assertions::assert_eq;

    const HYPHEN_ONLY: &str = r#"{"dep": {"amod": {
        "measurement_types": ["hyphenated"],
        "pos_in": {"NN": null}
    }}}"#;

    #[test]
    fn rule_applies_only_to_listed_forms() {
        let extractor = extractor_for(HYPHEN_ONLY);

        let hyphenated = extractor.extract(1, &study_period(true)).unwrap();
        assert_eq!(hyphenated.records[0].related_names(), vec!["period"]);

        let spaced = extractor.extract(1, &study_period(false)).unwrap();
        assert!(spaced.records[0].related.is_empty());
    }

    #[test]
    fn hyphenated_measurement_gets_compound_descriptor() {
        let record = &builtin_extractor()
            .extract(1, &study_period(true))
            .unwrap()
            .records[0];

        assert_eq!(record.related_names(), vec!["period"]);
        let descriptors: Vec<_> = record.related[0]
            .descriptors
            .iter()
            .map(|d| d.raw_name.as_str())
            .collect();
        assert_eq!(descriptors, vec!["study"]);
    }

    #[test]
    fn qualified_variant_wins_and_bare_variant_covers_the_rest() {
        // "5 m of rope in boxes"
        let parse = parsed(
            &[
                ("5", "CD", " "),
                ("m", "NN", " "),
                ("of", "IN", " "),
                ("rope", "NN", " "),
                ("in", "IN", " "),
                ("boxes", "NNS", ""),
            ],
            &[
                (2, 1, "nummod"),
                (4, 3, "case"),
                (2, 4, "nmod:of"),
                (6, 5, "case"),
                (2, 6, "nmod:in"),
            ],
        );
        let input = SentenceInput {
            measurements: vec![span(&parse, "5", 1, Some(2), None)],
            parse,
        };
        let extractor = extractor_for(
            r#"{"dep": {"nmod": {
                "enhanced": true,
                "measurement_types": ["space_between"],
                "pos_in": {"NN": null},
                "of": {"measurement_types": ["space_between"], "pos_in": {"NN": null}}
            }}}"#,
        );

        let record = &extractor.extract(1, &input).unwrap().records[0];
        let forms: Vec<_> = record
            .related
            .iter()
            .map(|r| (r.raw_name.as_str(), r.relation_form.as_str()))
            .collect();
        assert_eq!(forms, vec![("rope", "nmod:of"), ("boxes", "nmod")]);
    }

    #[test]
    fn operator_word_links_to_its_subject() {
        // "apples or 5 kg": `or` sits next to the unit and leads to `apples`.
        let parse = parsed(
            &[
                ("apples", "NNS", " "),
                ("or", "CC", " "),
                ("5", "CD", " "),
                ("kg", "NN", ""),
            ],
            &[(2, 1, "nsubj"), (4, 3, "nummod"), (4, 2, "cc")],
        );
        let input = SentenceInput {
            measurements: vec![span(&parse, "5", 3, Some(4), None)],
            parse,
        };

        let record = &builtin_extractor().extract(1, &input).unwrap().records[0];
        assert_eq!(record.related_names(), vec!["apples"]);
        assert_eq!(record.related[0].relation_form, "operator");
    }

    #[test]
    fn stage_capture_matches_final_records() {
        let extractor = builtin_extractor();
        let input = returned_to_europe();
        let stages = extractor.extract_capture_stages(1, &input).unwrap();
        let result = extractor.extract(1, &input).unwrap();

        assert_eq!(stages.records, result.records);
        assert_eq!(stages.bound.len(), 1);
        // Raw matches still carry the quantified echo the filter removes.
        assert!(stages.matches[0].iter().any(|m| m.token_index == 10));
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;
    use pretty_assertions::assert_eq;

    fn corpus() -> Vec<SentenceInput> {
        vec![
            returned_to_europe(),
            spatial_resolution(),
            study_period(true),
            study_period(false),
            approximately_rice(),
        ]
    }

    #[test]
    fn serialized_rule_set_extracts_identically() {
        let original = RuleSet::builtin().unwrap();
        let json = original.to_document().to_json_string(true).unwrap();
        let reloaded = RuleSet::from_json_str(&json).unwrap();
        assert_eq!(reloaded.fingerprint(), original.fingerprint());

        let config = ExtractorConfig::default();
        let a = MeasurementExtractor::new(Arc::new(original), config.clone());
        let b = MeasurementExtractor::new(Arc::new(reloaded), config);
        for (i, input) in corpus().iter().enumerate() {
            assert_eq!(a.extract(i + 1, input).unwrap(), b.extract(i + 1, input).unwrap());
        }
    }

    fn rejection(document: &str) -> ConfigError {
        RuleSet::from_json_str(document).unwrap_err()
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(rejection(r#"{"dep": {"amod": "#), ConfigError::Syntax(_)));
        assert!(matches!(
            rejection(r#"{"dep": {}, "rules": {}}"#),
            ConfigError::UnknownSection(s) if s == "rules"
        ));
        assert!(matches!(
            rejection(r#"{"dep": {"amod": {"measurement_types": ["sideways"], "pos_in": {"NN": null}}}}"#),
            ConfigError::UnknownMeasurementType { value, .. } if value == "sideways"
        ));
        assert!(matches!(
            rejection(r#"{"dep": {"amod": {"measurement_types": [], "pos_in": {"NN": null}}}}"#),
            ConfigError::EmptyMeasurementTypes { .. }
        ));
        assert!(matches!(
            rejection(r#"{"dep": {"amod": {"pos_in": {"NN": null}}}}"#),
            ConfigError::InvalidShape { .. }
        ));
        assert!(matches!(
            rejection(
                r#"{"dep": {"amod": {"measurement_types": ["attached"],
                    "pos_in": {"VB": {"get_sibling": ["nsubj"]}, "NN": null}}}}"#
            ),
            ConfigError::UnknownStep { step, .. } if step == "get_sibling"
        ));
        assert!(matches!(
            rejection(
                r#"{"dep": {"amod": {"measurement_types": ["attached"],
                    "pos_not": {"NN": null, "VB": "get_child"}}}}"#
            ),
            ConfigError::UnsupportedPos { field, .. } if field == "pos_not"
        ));
        assert!(matches!(
            rejection(
                r#"{"dep": {"amod": {"measurement_types": ["attached"],
                    "pos_in": {"VB": {"get_cousin": ["nsubj"]}}}}}"#
            ),
            ConfigError::UnterminatedChain { .. }
        ));
        assert!(matches!(
            rejection(r#"{"dep": {"nmod": {"enhanced": true}}}"#),
            ConfigError::MissingQualifiers { .. }
        ));
        assert!(matches!(
            rejection(r#"{"dep": {}, "word": {"and": ["and"]}}"#),
            ConfigError::UnknownKey { key, .. } if key == "and"
        ));
    }

    #[test]
    fn settings_and_patterns_load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let config_path = dir.path().join("extractor.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "matching:\n  max_hops: 1\nadverbs:\n  enabled: false").unwrap();
        let config = ExtractorConfig::load_from_file(config_path.to_str().unwrap()).unwrap();
        assert_eq!(config.matching.max_hops, 1);
        assert!(!config.adverbs.enabled);
        assert_eq!(config.descriptors.depth, 1);

        let patterns_path = dir.path().join("patterns.json");
        std::fs::write(&patterns_path, HYPHEN_PATTERNS).unwrap();
        let cache = RuleSetCache::new();
        let extractor = MeasurementExtractor::from_cache(&cache, Some(patterns_path.as_path()), config).unwrap();

        let result = extractor.extract(1, &study_period(true)).unwrap();
        assert_eq!(result.records[0].related_names(), vec!["period"]);
        assert!(result.records[0].adverbs.is_empty());
    }

    const HYPHEN_PATTERNS: &str = r#"{"dep": {"amod": {
        "measurement_types": ["hyphenated"],
        "pos_in": {"NN": null}
    }}}"#;

    #[test]
    fn invalid_settings_are_rejected_before_extraction() {
        let mut config = ExtractorConfig::default();
        config.matching.max_hops = 0;
        let cache = RuleSetCache::new();

        let err = MeasurementExtractor::from_cache(&cache, None, config)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Settings(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn extractors_share_one_cached_rule_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, HYPHEN_PATTERNS).unwrap();

        let cache = RuleSetCache::new();
        let a = MeasurementExtractor::from_cache(&cache, Some(path.as_path()), ExtractorConfig::default()).unwrap();
        let b = MeasurementExtractor::from_cache(&cache, Some(path.as_path()), ExtractorConfig::default()).unwrap();

        assert!(Arc::ptr_eq(a.rule_engine().rules(), b.rule_engine().rules()));
        assert_eq!(cache.len(), 1);
    }
}

// ============================================================================
// Batches
// ============================================================================

mod batches {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn malformed_sentence_is_skipped_and_order_is_kept() {
        let mut broken = spatial_resolution();
        broken.parse.edges.push(ParsedEdge {
            governor: 3,
            dependent: 99,
            relation: "dep".to_string(),
            qualifier: None,
        });
        let inputs = vec![returned_to_europe(), broken, approximately_rice()];

        let batch = builtin_extractor().extract_batch(&inputs);

        assert_eq!(batch.results.len(), 3);
        let first = batch.results[0].as_ref().unwrap();
        assert_eq!(first.sentence, 1);
        assert!(matches!(
            batch.results[1],
            Err(ExtractError::Graph {
                sentence: 2,
                source: GraphBuildError::UnknownToken { token: 99, .. }
            })
        ));
        let third = batch.results[2].as_ref().unwrap();
        assert_eq!(third.sentence, 3);
        assert_eq!(third.records[0].related_names(), vec!["rice"]);

        assert_eq!(batch.stats.sentences_total, 3);
        assert_eq!(batch.stats.sentences_skipped, 1);
        assert_eq!(batch.stats.measurements_found, 2);
        assert_eq!(batch.errors().count(), 1);
    }

    #[test]
    fn batch_matches_sentence_by_sentence_extraction() {
        let extractor = builtin_extractor();
        let inputs = vec![spatial_resolution(), study_period(true), returned_to_europe()];

        let batch = extractor.extract_batch(&inputs);
        for (i, input) in inputs.iter().enumerate() {
            assert_eq!(batch.results[i], extractor.extract(i + 1, input));
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    const POS_TAGS: &[&str] = &["NN", "NNS", "VBD", "VB", "JJ", "PRP", "RB", "IN", "DT"];
    const RELATIONS: &[&str] = &[
        "nsubj", "nsubjpass", "dobj", "acl", "amod", "compound", "appos", "advmod", "nmod:at",
        "nmod:in", "nmod:of", "dep",
    ];

    /// Random graph over tokens 1..=n. Token 1 is the value and token 2 the
    /// unit; edges may form arbitrary cycles.
    fn arb_sentence() -> impl Strategy<Value = SentenceInput> {
        (3usize..9)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(proptest::sample::select(POS_TAGS), n),
                    proptest::collection::vec(
                        (1..=n, 1..=n, proptest::sample::select(RELATIONS)),
                        0..n * 3,
                    ),
                )
            })
            .prop_map(|(pos, edges)| {
                let words: Vec<String> = (1..=pos.len()).map(|i| format!("w{i}")).collect();
                let triples: Vec<(&str, &str, &str)> = words
                    .iter()
                    .zip(&pos)
                    .enumerate()
                    .map(|(i, (w, p))| match i {
                        0 => (w.as_str(), "CD", " "),
                        _ => (w.as_str(), *p, " "),
                    })
                    .collect();
                let edges: Vec<(usize, usize, &str)> = edges
                    .into_iter()
                    .filter(|(g, d, _)| g != d)
                    .collect();
                let parse = parsed(&triples, &edges);
                let measurements = vec![span(&parse, "1", 1, Some(2), None)];
                SentenceInput {
                    parse,
                    measurements,
                }
            })
    }

    proptest! {
        #[test]
        fn extraction_is_deterministic(input in arb_sentence()) {
            let extractor = builtin_extractor();
            let first = extractor.extract(1, &input).unwrap();
            let second = extractor.extract(1, &input).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn traversal_terminates_on_cyclic_graphs(input in arb_sentence()) {
            let mut config = ExtractorConfig::default();
            config.matching.max_hops = 6;
            let extractor = MeasurementExtractor::new(Arc::new(RuleSet::builtin().unwrap()), config);

            let result = extractor.extract(1, &input).unwrap();
            let n = input.parse.tokens.len();
            for record in &result.records {
                let mut seen = std::collections::HashSet::new();
                for entity in &record.related {
                    prop_assert!(entity.token_index >= 3 && entity.token_index <= n);
                    prop_assert!(seen.insert(entity.token_index));
                }
            }
        }
    }
}
