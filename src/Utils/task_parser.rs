//! Spline task documents.
//!
//! A document is a list of sections, each a title followed by `key: v1, v2, ...`
//! pairs, e.g.
//! ```text
//! spline
//! kind: cubic
//! boundary: clamped, 0.0, 1.5
//! extrapolate: periodic
//! settings
//! loglevel: debug
//! condition_threshold: 1e10
//! ```
//! Lines starting with `//`, `#`, `%` or `;` are comments. The generic part parses into
//! `HashMap<section, HashMap<key, Option<Vec<Value>>>>`; [`SplineTask`] turns that
//! map into a spline recipe.
use crate::Utils::logger::init_logger;
use crate::numerical::interpolation::cubic_spline::BoundaryCondition;
use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use crate::numerical::interpolation::ppoly::Extrapolate;
use crate::numerical::interpolation::settings::SplineSettings;
use crate::numerical::interpolation::spline_enum::{Spline, SplineKind};
use log::info;
use ndarray::ArrayViewD;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

pub type SectionMap = HashMap<String, Option<Vec<Value>>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// a single entry of a value list
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self { Some(s.as_str()) } else { None }
    }

    /// integers are numbers too
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self { Some(*i) } else { None }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self { Some(*b) } else { None }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: letter or underscore, then letters, digits, underscores
fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

/// Section title; the whitespace after it is dropped.
pub(crate) fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, title) = identifier(input)?;
    Ok((input.trim(), title))
}

/// Integer, float, boolean or bare string, tried in this order.
pub(crate) fn parse_value(input: &str) -> IResult<&str, Value> {
    let token = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    map(token, |s: &str| {
        if let Ok(val) = s.parse::<i64>() {
            Value::Integer(val)
        } else if let Ok(val) = s.parse::<f64>() {
            Value::Float(val)
        } else if let Ok(val) = s.parse::<bool>() {
            Value::Boolean(val)
        } else {
            Value::String(s.to_string())
        }
    })
    .parse(input)
}

pub(crate) fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let comma = delimited(space0, tag(","), space0);
    separated_list0(comma, parse_value).parse(input)
}

pub(crate) fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let (input, result) = separated_pair(identifier, colon, parse_value_list).parse(input)?;
    Ok((input.trim(), result))
}

pub(crate) fn parse_section(input: &str) -> IResult<&str, (String, Vec<(String, Vec<Value>)>)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs)))
}

/// drops comment and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.is_empty()
                || trimmed.starts_with("//")
                || trimmed.starts_with('#')
                || trimmed.starts_with('%')
                || trimmed.starts_with(';'))
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses a whole document. A repeated section is merged into the first one; a
/// repeated key keeps its last value list.
pub fn parse_document(input: &str) -> SplineResult<DocumentMap> {
    let filtered = filter_comments(input);
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (remaining, sections) = parser
        .parse(filtered.as_str())
        .map_err(|e| SplineError::Config(format!("parsing error: {:?}", e)))?;
    if !remaining.trim().is_empty() {
        return Err(SplineError::Config(format!(
            "failed to parse the entire document, remaining: '{}'",
            remaining
        )));
    }
    let mut result: DocumentMap = HashMap::new();
    for (title, pairs) in sections {
        let section = result.entry(title).or_default();
        for (key, values) in pairs {
            section.insert(key, Some(values));
        }
    }
    Ok(result)
}

/// Like [`parse_document`], but every section and key of `template` is present in the
/// result (missing ones as `None`) and anything not in the template is an error.
pub fn parse_document_with_template(input: &str, template: &DocumentMap) -> SplineResult<DocumentMap> {
    let mut parsed = parse_document(input)?;
    for (title, section) in &parsed {
        let Some(expected) = template.get(title) else {
            return Err(SplineError::Config(format!("unknown section '{}'", title)));
        };
        if let Some(key) = section.keys().find(|k| !expected.contains_key(*k)) {
            return Err(SplineError::Config(format!(
                "unknown key '{}' in section '{}'",
                key, title
            )));
        }
    }
    for (title, keys) in template {
        let section = parsed.entry(title.clone()).or_default();
        for key in keys.keys() {
            section.entry(key.clone()).or_insert(None);
        }
    }
    Ok(parsed)
}

/// Sections and keys a spline task may contain.
pub fn spline_task_template() -> DocumentMap {
    let section = |keys: &[&str]| -> SectionMap { keys.iter().map(|k| (k.to_string(), None)).collect() };
    HashMap::from([
        (
            "spline".to_string(),
            section(&["kind", "boundary", "degree", "extrapolate", "axis"]),
        ),
        (
            "settings".to_string(),
            section(&[
                "loglevel",
                "logfile",
                "periodic_tolerance",
                "pivot_tolerance",
                "condition_threshold",
            ]),
        ),
    ])
}

/// Everything needed to build a spline from sampled data.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineTask {
    pub kind: SplineKind,
    /// `None` keeps the default of the chosen kind
    pub extrapolate: Option<Extrapolate>,
    pub axis: usize,
    pub loglevel: Option<String>,
    pub logfile: Option<String>,
    pub settings: SplineSettings,
}

impl Default for SplineTask {
    fn default() -> Self {
        SplineTask {
            kind: SplineKind::default(),
            extrapolate: None,
            axis: 0,
            loglevel: None,
            logfile: None,
            settings: SplineSettings::default(),
        }
    }
}

fn config_error(key: &str, message: impl Display) -> SplineError {
    SplineError::Config(format!("'{}': {}", key, message))
}

/// the single value of `key`, if present
fn single<'a>(section: &'a SectionMap, key: &str) -> SplineResult<Option<&'a Value>> {
    match section.get(key) {
        None | Some(None) => Ok(None),
        Some(Some(values)) if values.len() == 1 => Ok(Some(&values[0])),
        Some(Some(values)) => Err(config_error(
            key,
            format!("expected a single value, got {}", values.len()),
        )),
    }
}

fn single_string(section: &SectionMap, key: &str) -> SplineResult<Option<String>> {
    match single(section, key)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.to_lowercase())),
        Some(other) => Err(config_error(key, format!("expected a name, got '{}'", other))),
    }
}

fn single_float(section: &SectionMap, key: &str) -> SplineResult<Option<f64>> {
    match single(section, key)? {
        None => Ok(None),
        Some(v) => v
            .as_float()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(Some)
            .ok_or_else(|| config_error(key, format!("expected a positive number, got '{}'", v))),
    }
}

fn single_usize(section: &SectionMap, key: &str) -> SplineResult<Option<usize>> {
    match single(section, key)? {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| config_error(key, format!("expected a non-negative integer, got '{}'", v))),
    }
}

fn parse_boundary(values: &[Value]) -> SplineResult<BoundaryCondition> {
    let name = values
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| config_error("boundary", "expected a boundary condition name"))?;
    let rest = &values[1..];
    match (name.as_str(), rest.len()) {
        ("not_a_knot" | "not-a-knot", 0) => Ok(BoundaryCondition::NotAKnot),
        ("natural", 0) => Ok(BoundaryCondition::Natural),
        ("periodic", 0) => Ok(BoundaryCondition::Periodic),
        ("clamped", 0) => Ok(BoundaryCondition::Clamped { left: 0.0, right: 0.0 }),
        ("clamped", 2) => {
            let slope = |v: &Value| {
                v.as_float()
                    .ok_or_else(|| config_error("boundary", format!("slope '{}' is not a number", v)))
            };
            Ok(BoundaryCondition::Clamped {
                left: slope(&rest[0])?,
                right: slope(&rest[1])?,
            })
        }
        _ => Err(config_error(
            "boundary",
            format!(
                "expected not_a_knot, natural, periodic or clamped[, left, right], got '{}' with {} extra values",
                name,
                rest.len()
            ),
        )),
    }
}

fn parse_extrapolate(value: &Value) -> SplineResult<Extrapolate> {
    match value {
        Value::Boolean(b) => Ok(Extrapolate::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("periodic") => Ok(Extrapolate::Periodic),
        other => Err(config_error(
            "extrapolate",
            format!("expected true, false or periodic, got '{}'", other),
        )),
    }
}

impl SplineTask {
    /// Builds a task from an already parsed document; absent keys keep their defaults.
    pub fn from_document(doc: &DocumentMap) -> SplineResult<Self> {
        let empty = SectionMap::new();
        let spline = doc.get("spline").unwrap_or(&empty);
        let settings_section = doc.get("settings").unwrap_or(&empty);

        let boundary = match spline.get("boundary") {
            Some(Some(values)) => Some(parse_boundary(values)?),
            _ => None,
        };
        let degree = single_usize(spline, "degree")?;
        let kind_name = single_string(spline, "kind")?.unwrap_or_else(|| "cubic".to_string());
        if boundary.is_some() && kind_name != "cubic" {
            return Err(config_error(
                "boundary",
                format!("only applies to kind cubic, not '{}'", kind_name),
            ));
        }
        if degree.is_some_and(|d| d != 3) && kind_name != "bspline" {
            return Err(config_error(
                "degree",
                format!("kind '{}' is always cubic", kind_name),
            ));
        }
        let kind = match kind_name.as_str() {
            "cubic" => SplineKind::Cubic(boundary.unwrap_or_default()),
            "pchip" => SplineKind::Pchip,
            "akima" => SplineKind::Akima,
            "bspline" => SplineKind::Interpolating {
                degree: degree.unwrap_or(3),
            },
            other => {
                return Err(config_error(
                    "kind",
                    format!("expected cubic, pchip, akima or bspline, got '{}'", other),
                ));
            }
        };
        let extrapolate = single(spline, "extrapolate")?.map(parse_extrapolate).transpose()?;
        let axis = single_usize(spline, "axis")?.unwrap_or(0);

        let mut settings = SplineSettings::default();
        if let Some(tol) = single_float(settings_section, "periodic_tolerance")? {
            settings.periodic_rtol = tol;
            settings.periodic_atol = tol;
        }
        if let Some(tol) = single_float(settings_section, "pivot_tolerance")? {
            settings.pivot_rtol = tol;
        }
        if let Some(threshold) = single_float(settings_section, "condition_threshold")? {
            settings.condition_threshold = threshold;
        }
        let loglevel = match single(settings_section, "loglevel")? {
            None => None,
            Some(v) => Some(v.to_string()),
        };
        let logfile = match single(settings_section, "logfile")? {
            None => None,
            Some(v) => Some(v.to_string()),
        };
        Ok(SplineTask {
            kind,
            extrapolate,
            axis,
            loglevel,
            logfile,
            settings,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> SplineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SplineError::Config(format!("cannot read '{}': {}", path.display(), e)))?;
        text.parse()
    }

    /// Installs the logger requested by the task.
    pub fn init_logging(&self) -> SplineResult<()> {
        init_logger(self.loglevel.as_deref(), self.logfile.as_deref())
    }

    /// Builds the configured spline through the samples `y` at the sites `x`.
    pub fn build(&self, x: &[f64], y: ArrayViewD<'_, f64>) -> SplineResult<Spline> {
        info!("building {} along axis {}", self.kind, self.axis);
        self.kind
            .build_with_settings(x, y, self.axis, self.extrapolate.clone(), &self.settings)
    }
}

impl FromStr for SplineTask {
    type Err = SplineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let doc = parse_document_with_template(s, &spline_task_template())?;
        SplineTask::from_document(&doc)
    }
}

#[cfg(test)]
mod tests1 {
    use super::*;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("spline\n kind: cubic").unwrap();
        assert_eq!(title, "spline");
        assert_eq!(remaining, "kind: cubic");
        let (remaining, title) = parse_title("_settings2 loglevel: info").unwrap();
        assert_eq!(title, "_settings2");
        assert_eq!(remaining, "loglevel: info");
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("not_a_knot, 1").unwrap();
        assert_eq!(value, Value::String("not_a_knot".to_string()));
        assert_eq!(remaining, ", 1");
        assert_eq!(parse_value("3").unwrap().1, Value::Integer(3));
        assert_eq!(parse_value("1e-15").unwrap().1, Value::Float(1e-15));
        assert_eq!(parse_value("-2.5;").unwrap(), (";", Value::Float(-2.5)));
        assert_eq!(parse_value("false").unwrap().1, Value::Boolean(false));
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("boundary : clamped , 0.5,-1").unwrap();
        assert_eq!(key, "boundary");
        assert_eq!(
            values,
            vec![Value::String("clamped".to_string()), Value::Float(0.5), Value::Integer(-1)]
        );
        assert_eq!(remaining, "");
        let (_, (key, values)) = parse_key_value_pair("degree:").unwrap();
        assert_eq!(key, "degree");
        assert!(values.is_empty());
    }

    #[test]
    fn test_parse_section_stops_at_next_title() {
        let input = "spline kind: pchip axis: 1\nsettings\nloglevel: warn";
        let (remaining, (title, pairs)) = parse_section(input).unwrap();
        assert_eq!(title, "spline");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("axis".to_string(), vec![Value::Integer(1)]));
        assert_eq!(remaining, "settings\nloglevel: warn");
    }

    #[test]
    fn test_parse_document_with_comments() {
        let input = "
            # spline recipe
            spline
            kind: akima
            // trailing comment line
            settings
            loglevel: info
        ";
        let doc = parse_document(input).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc["spline"]["kind"],
            Some(vec![Value::String("akima".to_string())])
        );
        assert!(parse_document("").is_err());
        assert!(parse_document("spline kind: cubic :::").is_err());
    }

    #[test]
    fn test_template_fills_and_rejects() {
        let doc = parse_document_with_template("spline kind: cubic", &spline_task_template()).unwrap();
        assert_eq!(doc["spline"]["degree"], None);
        assert!(doc["settings"].contains_key("loglevel"));
        assert!(matches!(
            parse_document_with_template("spline colour: red", &spline_task_template()),
            Err(SplineError::Config(_))
        ));
        assert!(matches!(
            parse_document_with_template("plot kind: cubic", &spline_task_template()),
            Err(SplineError::Config(_))
        ));
    }
}
