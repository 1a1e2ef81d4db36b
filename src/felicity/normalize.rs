//! Repairs for the malformed payloads some firmware revisions send.
//!
//! Each repair only fires when its particular defect is detected, so a
//! well-formed payload passes through untouched.

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0},
    combinator::{opt, recognize},
    sequence::{delimited, pair, tuple},
    IResult,
};

use super::diagnostics::{DiagnosticEvent, DiagnosticSink, Patch};

const FAULT_KEY: &str = "\"Bfault\"";
const TEMPERATURE_KEY: &str = "\"BTemp\"";

pub fn normalize(text: &str, sink: &dyn DiagnosticSink) -> String {
    let mut text = text.to_string();

    let repairs: [(Patch, fn(&str) -> Option<String>); 3] = [
        (Patch::SingleQuotes, fix_single_quotes),
        (Patch::TrailingGarbage, strip_trailing_garbage),
        (Patch::MissingTemperatureKey, insert_missing_temperature_key),
    ];

    for (patch, repair) in repairs {
        if let Some(patched) = repair(&text) {
            sink.event(&DiagnosticEvent::Patched {
                patch,
                text: patched.clone(),
            });
            text = patched;
        }
    }

    sink.event(&DiagnosticEvent::Normalized { text: text.clone() });
    text
}

/// `{'CommVer':3}` -> `{"CommVer":3}`, only when no double quote is present.
pub fn fix_single_quotes(text: &str) -> Option<String> {
    (!text.contains('"') && text.contains("{'")).then(|| text.replace('\'', "\""))
}

/// Drop anything after the last `}`.
pub fn strip_trailing_garbage(text: &str) -> Option<String> {
    let end = text.rfind('}')? + 1;
    (end < text.len()).then(|| text[..end].to_string())
}

/// `"Bfault":0[[140,130]]` -> `"Bfault":0,"BTemp":[[140,130]]`
///
/// Some firmware drops the temperature key and its comma, gluing the array
/// straight onto the fault code.
pub fn insert_missing_temperature_key(text: &str) -> Option<String> {
    if text.contains(TEMPERATURE_KEY) || !text.contains(FAULT_KEY) {
        return None;
    }

    let mut out = String::with_capacity(text.len() + TEMPERATURE_KEY.len() + 2);
    let mut rest = text;
    let mut patched = false;

    while let Some(at) = rest.find(FAULT_KEY) {
        out.push_str(&rest[..at]);
        let candidate = &rest[at..];

        match fault_glued_to_array(candidate) {
            Ok((after, code)) => {
                out.push_str(&format!("{}:{},{}:[[", FAULT_KEY, code, TEMPERATURE_KEY));
                rest = after;
                patched = true;
            }
            Err(_) => {
                out.push_str(FAULT_KEY);
                rest = &candidate[FAULT_KEY.len()..];
            }
        }
    }
    out.push_str(rest);

    patched.then_some(out)
}

fn fault_glued_to_array(input: &str) -> IResult<&str, &str> {
    delimited(
        tuple((tag(FAULT_KEY), multispace0, char(':'), multispace0)),
        recognize(pair(opt(char('-')), digit1)),
        pair(multispace0, tag("[[")),
    )(input)
}
