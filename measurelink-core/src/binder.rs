use crate::error::AlignmentError;
use crate::graphs::DependencyGraph;
use crate::types::*;
use tracing::warn;

/// Measurements that were tied to the graph, and the ones that could not be.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindOutcome {
    pub bound: Vec<Measurement>,
    pub dropped: Vec<AlignmentError>,
}

/// Aligns extractor spans to parser tokens by character offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementBinder;

impl MeasurementBinder {
    pub fn new() -> Self {
        Self
    }

    /// Bind every span. A span that cannot be aligned is dropped and recorded;
    /// the others are unaffected.
    pub fn bind(&self, spans: &[MeasurementSpan], graph: &DependencyGraph) -> BindOutcome {
        let mut outcome = BindOutcome::default();
        for (position, span) in spans.iter().enumerate() {
            match self.bind_one(position, span, graph) {
                Ok(measurement) => outcome.bound.push(measurement),
                Err(err) => {
                    warn!("⚠️  Dropping measurement: {}", err);
                    outcome.dropped.push(err);
                }
            }
        }
        outcome
    }

    pub fn bind_one(
        &self,
        position: usize,
        span: &MeasurementSpan,
        graph: &DependencyGraph,
    ) -> Result<Measurement, AlignmentError> {
        let (value_start, value_end) = span.value_offsets();
        let value_token = first_overlapping(graph, value_start, value_end).ok_or_else(|| {
            AlignmentError::Value {
                measurement: position,
                raw_value: span.raw_value.clone(),
                offset_start: value_start,
                offset_end: value_end,
            }
        })?;

        let unit_tokens = match &span.unit {
            Some(unit) => align_unit(position, unit, graph)?,
            None => Vec::new(),
        };

        let quantified_token = span
            .quantified
            .as_ref()
            .and_then(|q| align_quantified(q, graph));

        let form = classify_form(graph, value_token, &unit_tokens);

        let mut quantity = span.clone();
        quantity.token_index = Some(value_token);
        if let Some(unit) = quantity.unit.as_mut() {
            unit.token_indices = unit_tokens.clone();
        }
        if let Some(q) = quantity.quantified.as_mut() {
            if quantified_token.is_some() {
                q.token_index = quantified_token;
            }
        }
        for bound in [quantity.least.as_mut(), quantity.most.as_mut()].into_iter().flatten() {
            bound.token_index = first_overlapping(graph, bound.offset_start, bound.offset_end);
        }

        Ok(Measurement {
            position,
            quantity,
            value_token,
            unit_tokens,
            quantified_token,
            form,
        })
    }
}

fn first_overlapping(graph: &DependencyGraph, start: usize, end: usize) -> Option<TokenIndex> {
    graph.tokens_overlapping(start, end).first().map(|t| t.index)
}

fn align_unit(
    position: usize,
    unit: &UnitSpan,
    graph: &DependencyGraph,
) -> Result<Vec<TokenIndex>, AlignmentError> {
    let by_offset: Vec<TokenIndex> = graph
        .tokens_overlapping(unit.offset_start, unit.offset_end)
        .iter()
        .map(|t| t.index)
        .collect();
    if !by_offset.is_empty() {
        return Ok(by_offset);
    }

    let supplied: Vec<TokenIndex> = unit
        .token_indices
        .iter()
        .copied()
        .filter(|&i| graph.contains(i))
        .collect();
    if !supplied.is_empty() {
        return Ok(supplied);
    }

    Err(AlignmentError::Unit {
        measurement: position,
        unit: unit.name.clone(),
        offset_start: unit.offset_start,
        offset_end: unit.offset_end,
    })
}

fn align_quantified(span: &QuantifiedSpan, graph: &DependencyGraph) -> Option<TokenIndex> {
    if let (Some(start), Some(end)) = (span.offset_start, span.offset_end) {
        if let Some(token) = graph.tokens_overlapping(start, end).first() {
            return Some(token.index);
        }
    }
    if let Some(index) = span.token_index.filter(|&i| graph.contains(i)) {
        return Some(index);
    }
    graph
        .tokens()
        .iter()
        .find(|t| t.text == span.name)
        .map(|t| t.index)
}

/// How the value token sits against its unit: "10m", "10-m" or "10 m".
pub fn classify_form(
    graph: &DependencyGraph,
    value_token: TokenIndex,
    unit_tokens: &[TokenIndex],
) -> MeasurementForm {
    if unit_tokens.is_empty() {
        return MeasurementForm::SpaceBetween;
    }
    if unit_tokens.contains(&value_token) {
        return MeasurementForm::Attached;
    }
    let Some(value) = graph.token(value_token) else {
        return MeasurementForm::SpaceBetween;
    };

    match value.after.as_str() {
        "" => {
            let next_is_hyphen = graph
                .next_token(value_token)
                .map_or(false, |next| next.text == "-");
            if next_is_hyphen {
                MeasurementForm::Hyphenated
            } else {
                MeasurementForm::Attached
            }
        }
        "-" => MeasurementForm::Hyphenated,
        _ => MeasurementForm::SpaceBetween,
    }
}
