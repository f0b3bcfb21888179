//! Reading sentence inputs and writing extraction results.

use anyhow::{anyhow, Context, Result};
use measurelink_core::{ExtractionStages, SentenceExtraction, SentenceInput};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Output layout for a batch of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One pretty-printed JSON array
    Json,
    /// One compact JSON document per line
    Jsonl,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "jsonl" => Some(Self::Jsonl),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

/// Read sentence inputs from a file. Accepts a JSON array of sentences, an
/// object with a `sentences` array, a single sentence object, or JSON Lines.
pub fn read_inputs(path: &Path) -> Result<Vec<SentenceInput>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read input {}", path.display()))?;
    parse_inputs(&content).with_context(|| format!("invalid input in {}", path.display()))
}

pub fn parse_inputs(content: &str) -> Result<Vec<SentenceInput>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Into::into))
            .collect(),
        Ok(Value::Object(mut map)) => match map.remove("sentences") {
            Some(sentences) => Ok(serde_json::from_value(sentences)?),
            None => Ok(vec![serde_json::from_value(Value::Object(map))?]),
        },
        Ok(other) => Err(anyhow!("expected sentence objects, found {}", kind_of(&other))),
        Err(_) => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(no, line)| {
                serde_json::from_str(line).with_context(|| format!("line {}", no + 1))
            })
            .collect(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Render results; `simplify` swaps each record for the name-keyed
/// projection. JSON gives one document per sentence, JSON Lines one line per
/// measurement record tagged with its sentence number.
pub fn render(extractions: &[SentenceExtraction], format: OutputFormat, simplify: bool) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => {
            let documents: Vec<Value> = extractions
                .iter()
                .map(|extraction| to_document(extraction, simplify))
                .collect::<Result<_>>()?;
            serde_json::to_string_pretty(&documents)?
        }
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for extraction in extractions {
                for line in record_lines(extraction, simplify)? {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            out
        }
    };
    Ok(rendered)
}

#[derive(Serialize)]
struct RecordLine<'a, T: Serialize> {
    sentence: usize,
    #[serde(flatten)]
    record: &'a T,
}

fn record_lines(extraction: &SentenceExtraction, simplify: bool) -> Result<Vec<String>> {
    let sentence = extraction.sentence;
    let lines: Vec<String> = if simplify {
        extraction
            .simplified()
            .iter()
            .map(|record| serde_json::to_string(&RecordLine { sentence, record }))
            .collect::<Result<_, _>>()?
    } else {
        extraction
            .records
            .iter()
            .map(|record| serde_json::to_string(&RecordLine { sentence, record }))
            .collect::<Result<_, _>>()?
    };
    Ok(lines)
}

fn to_document(extraction: &SentenceExtraction, simplify: bool) -> Result<Value> {
    if !simplify {
        return Ok(serde_json::to_value(extraction)?);
    }

    #[derive(Serialize)]
    struct Simplified<'a, T: Serialize> {
        sentence: usize,
        text: &'a str,
        records: T,
    }

    Ok(serde_json::to_value(Simplified {
        sentence: extraction.sentence,
        text: &extraction.text,
        records: extraction.simplified(),
    })?)
}

pub fn save_results(
    extractions: &[SentenceExtraction],
    output_path: &str,
    format: OutputFormat,
    simplify: bool,
) -> Result<()> {
    let rendered = render(extractions, format, simplify)?;
    fs::write(output_path, rendered)
        .with_context(|| format!("failed to write {output_path}"))?;

    let shape = if simplify { "Simplified" } else { "Full" };
    match format {
        OutputFormat::Json => println!("💾 {shape} JSON results saved to: {output_path}"),
        OutputFormat::Jsonl => println!("💾 {shape} JSONL results saved to: {output_path}"),
    }
    Ok(())
}

/// Write each sentence's intermediate stages plus a summary file.
pub fn save_stages(stages: &[(usize, ExtractionStages)], output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    for (sentence, stage) in stages {
        let path = format!("{output_dir}/sentence_{sentence:04}_stages.json");
        fs::write(&path, serde_json::to_string_pretty(stage)?)?;
        println!(
            "  💾 {} ({} bound, {} dropped)",
            path,
            stage.bound.len(),
            stage.dropped.len()
        );
    }

    let summary = serde_json::json!({
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "sentences": stages.len(),
        "stage_counts": {
            "bound": stages.iter().map(|(_, s)| s.bound.len()).sum::<usize>(),
            "dropped": stages.iter().map(|(_, s)| s.dropped.len()).sum::<usize>(),
            "matches": stages.iter().map(|(_, s)| s.matches.iter().map(Vec::len).sum::<usize>()).sum::<usize>(),
            "records": stages.iter().map(|(_, s)| s.records.len()).sum::<usize>(),
        }
    });
    let summary_path = format!("{output_dir}/summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}
