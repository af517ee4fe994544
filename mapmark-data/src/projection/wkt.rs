//! Translation of WKT1 and ESRI `.prj` definitions into PROJ strings.
//!
//! A definition carrying a top-level `AUTHORITY["EPSG", code]` resolves to
//! that code. Otherwise the `GEOGCS` or `PROJCS` tree is translated
//! parameter by parameter.

use thiserror::Error;

const MAX_DEPTH: usize = 32;

/// Errors raised while reading a WKT definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WktError {
    /// The text ended inside a node.
    #[error("unexpected end of WKT")]
    UnexpectedEnd,
    /// A character that cannot appear at this point.
    #[error("unexpected {found:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Byte offset into the definition.
        offset: usize,
    },
    /// Nodes are nested deeper than any real CRS definition.
    #[error("WKT nested too deeply")]
    TooDeep,
    /// The root node is neither `GEOGCS` nor `PROJCS`.
    #[error("unsupported WKT root {0}")]
    UnsupportedRoot(String),
    /// The projection method has no PROJ equivalent here.
    #[error("unsupported projection {0}")]
    UnsupportedProjection(String),
    /// A required node or value is absent.
    #[error("WKT is missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Node(Node),
    Text(String),
    Number(f64),
    Word(String),
}

impl Value {
    fn node_named(&self, keyword: &str) -> Option<&Node> {
        match self {
            Self::Node(node) if node.keyword.eq_ignore_ascii_case(keyword) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    keyword: String,
    values: Vec<Value>,
}

impl Node {
    fn child(&self, keyword: &str) -> Option<&Self> {
        self.values.iter().find_map(|value| value.node_named(keyword))
    }

    fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.values.iter().filter_map(move |value| value.node_named(keyword))
    }

    fn text(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            Value::Text(text) | Value::Word(text) => Some(text),
            _ => None,
        }
    }

    fn number(&self, index: usize) -> Option<f64> {
        match self.values.get(index)? {
            Value::Number(number) => Some(*number),
            Value::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    fn numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|value| match value {
                Value::Number(number) => Some(*number),
                _ => None,
            })
            .collect()
    }

    fn epsg_code(&self) -> Option<u16> {
        let authority = self.child("AUTHORITY")?;
        if !authority.text(0)?.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        match authority.values.get(1)? {
            Value::Text(code) | Value::Word(code) => code.trim().parse().ok(),
            Value::Number(code) => code.to_string().parse().ok(),
            Value::Node(_) => None,
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.text.get(self.pos..)?.chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek().filter(|ch| ch.is_whitespace()) {
            self.pos += ch.len_utf8();
        }
    }

    fn unexpected(&self) -> WktError {
        self.peek().map_or(WktError::UnexpectedEnd, |found| WktError::UnexpectedChar {
            found,
            offset: self.pos,
        })
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek().filter(|ch| accept(*ch)) {
            self.pos += ch.len_utf8();
        }
        self.text.get(start..self.pos).unwrap_or_default()
    }

    fn node(&mut self, depth: usize) -> Result<Node, WktError> {
        if depth > MAX_DEPTH {
            return Err(WktError::TooDeep);
        }
        self.skip_whitespace();
        let keyword = self
            .take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            .to_owned();
        if keyword.is_empty() {
            return Err(self.unexpected());
        }
        self.skip_whitespace();
        let close = match self.peek() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;

        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Ok(Node { keyword, values });
        }
        loop {
            values.push(self.value(depth)?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(ch) if ch == close => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected()),
            }
        }
        Ok(Node { keyword, values })
    }

    fn value(&mut self, depth: usize) -> Result<Value, WktError> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => self.quoted().map(Value::Text),
            Some(ch) if ch == '-' || ch == '+' || ch == '.' || ch.is_ascii_digit() => {
                let literal = self.take_while(|c| {
                    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
                });
                literal
                    .parse()
                    .map(Value::Number)
                    .map_err(|_| WktError::UnexpectedChar {
                        found: ch,
                        offset: self.pos,
                    })
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self
                    .take_while(|c| c.is_ascii_alphanumeric() || c == '_')
                    .to_owned();
                self.skip_whitespace();
                if matches!(self.peek(), Some('[' | '(')) {
                    self.pos = start;
                    self.node(depth + 1).map(Value::Node)
                } else {
                    Ok(Value::Word(word))
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn quoted(&mut self) -> Result<String, WktError> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            let ch = self.peek().ok_or(WktError::UnexpectedEnd)?;
            self.pos += ch.len_utf8();
            if ch == '"' {
                // A doubled quote is an escaped quote.
                if self.peek() == Some('"') {
                    self.pos += 1;
                    text.push('"');
                } else {
                    return Ok(text);
                }
            } else {
                text.push(ch);
            }
        }
    }
}

fn parse(text: &str) -> Result<Node, WktError> {
    let mut parser = Parser { text, pos: 0 };
    let node = parser.node(0)?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(node),
        Some(_) => Err(parser.unexpected()),
    }
}

/// Result of reading a WKT definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WktDefinition {
    /// The definition names an EPSG code.
    Epsg(u16),
    /// The definition translated into a PROJ string.
    Proj(String),
}

/// Whether `text` looks like a WKT definition.
#[must_use]
pub fn looks_like_wkt(text: &str) -> bool {
    let upper = text.trim_start().to_ascii_uppercase();
    ["GEOGCS", "PROJCS", "GEOCCS", "COMPD_CS", "GEOGCRS", "PROJCRS"]
        .iter()
        .any(|keyword| upper.starts_with(keyword))
}

/// Read a WKT1 or ESRI definition.
///
/// # Errors
/// Returns [`WktError`] when the text does not parse or describes a CRS with
/// no PROJ translation.
///
/// # Examples
///
/// ```
/// use mapmark_data::projection::wkt::{WktDefinition, read_wkt};
///
/// # fn main() -> Result<(), mapmark_data::projection::wkt::WktError> {
/// let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],
///     PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;
/// assert_eq!(read_wkt(wkt)?, WktDefinition::Epsg(4326));
/// # Ok(())
/// # }
/// ```
pub fn read_wkt(text: &str) -> Result<WktDefinition, WktError> {
    let root = parse(text.trim())?;
    if let Some(code) = root.epsg_code() {
        return Ok(WktDefinition::Epsg(code));
    }
    match root.keyword.to_ascii_uppercase().as_str() {
        "GEOGCS" => geographic(&root).map(WktDefinition::Proj),
        "PROJCS" => projected(&root).map(WktDefinition::Proj),
        _ => Err(WktError::UnsupportedRoot(root.keyword)),
    }
}

fn datum_terms(geogcs: &Node) -> Result<String, WktError> {
    let datum = geogcs.child("DATUM").ok_or(WktError::Missing("DATUM"))?;
    let spheroid = datum
        .child("SPHEROID")
        .or_else(|| datum.child("ELLIPSOID"))
        .ok_or(WktError::Missing("SPHEROID"))?;
    let semi_major = spheroid.number(1).ok_or(WktError::Missing("semi-major axis"))?;
    let inverse_flattening = spheroid
        .number(2)
        .ok_or(WktError::Missing("inverse flattening"))?;

    let mut terms = if inverse_flattening.abs() < f64::EPSILON {
        format!("+a={semi_major} +b={semi_major}")
    } else {
        format!("+a={semi_major} +rf={inverse_flattening}")
    };
    if let Some(towgs84) = datum.child("TOWGS84") {
        let shifts: Vec<String> = towgs84.numbers().iter().map(f64::to_string).collect();
        if !shifts.is_empty() {
            terms.push_str(&format!(" +towgs84={}", shifts.join(",")));
        }
    }
    if let Some(meridian) = geogcs
        .child("PRIMEM")
        .and_then(|primem| primem.number(1))
        .filter(|longitude| longitude.abs() > f64::EPSILON)
    {
        terms.push_str(&format!(" +pm={meridian}"));
    }
    Ok(terms)
}

fn geographic(geogcs: &Node) -> Result<String, WktError> {
    Ok(format!("+proj=longlat {} +no_defs", datum_terms(geogcs)?))
}

/// Look up a `PARAMETER` by any of its spellings.
fn parameter(projcs: &Node, names: &[&str]) -> Option<f64> {
    projcs.children("PARAMETER").find_map(|param| {
        let name = normalise(param.text(0)?);
        names
            .iter()
            .any(|candidate| *candidate == name)
            .then(|| param.number(1))
            .flatten()
    })
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

const LATITUDE_OF_ORIGIN: &[&str] = &["latitudeoforigin", "latitudeofcenter", "latitudeofcentre"];
const CENTRAL_MERIDIAN: &[&str] = &[
    "centralmeridian",
    "longitudeofcenter",
    "longitudeofcentre",
    "longitudeoforigin",
];
const SCALE_FACTOR: &[&str] = &["scalefactor", "scalefactoratnaturalorigin"];
const FALSE_EASTING: &[&str] = &["falseeasting"];
const FALSE_NORTHING: &[&str] = &["falsenorthing"];
const STANDARD_PARALLEL_1: &[&str] = &["standardparallel1"];
const STANDARD_PARALLEL_2: &[&str] = &["standardparallel2"];

#[expect(
    clippy::float_arithmetic,
    reason = "false origins are converted from the CRS linear unit to metres"
)]
fn projected(projcs: &Node) -> Result<String, WktError> {
    let geogcs = projcs.child("GEOGCS").ok_or(WktError::Missing("GEOGCS"))?;
    let method = projcs
        .child("PROJECTION")
        .and_then(|projection| projection.text(0))
        .ok_or(WktError::Missing("PROJECTION"))?;
    let to_meter = projcs
        .child("UNIT")
        .and_then(|unit| unit.number(1))
        .unwrap_or(1.0);

    let lat_0 = parameter(projcs, LATITUDE_OF_ORIGIN).unwrap_or(0.0);
    let lon_0 = parameter(projcs, CENTRAL_MERIDIAN).unwrap_or(0.0);
    let k_0 = parameter(projcs, SCALE_FACTOR).unwrap_or(1.0);
    let x_0 = parameter(projcs, FALSE_EASTING).unwrap_or(0.0) * to_meter;
    let y_0 = parameter(projcs, FALSE_NORTHING).unwrap_or(0.0) * to_meter;
    let lat_1 = parameter(projcs, STANDARD_PARALLEL_1);
    let lat_2 = parameter(projcs, STANDARD_PARALLEL_2);
    let origin = format!("+x_0={x_0} +y_0={y_0}");

    let projection = match normalise(method).as_str() {
        "transversemercator" | "gausskruger" => {
            format!("+proj=tmerc +lat_0={lat_0} +lon_0={lon_0} +k_0={k_0} {origin}")
        }
        "mercatorauxiliarysphere" | "popularvisualisationpseudomercator" => {
            let radius = geogcs
                .child("DATUM")
                .and_then(|datum| datum.child("SPHEROID"))
                .and_then(|spheroid| spheroid.number(1))
                .unwrap_or(6_378_137.0);
            return Ok(format!(
                "+proj=merc +a={radius} +b={radius} +lat_ts=0 +lon_0={lon_0} {origin} +k=1 {} +no_defs",
                units(to_meter)
            ));
        }
        "mercator" | "mercator1sp" | "mercator2sp" => match lat_1 {
            Some(lat_ts) => format!("+proj=merc +lat_ts={lat_ts} +lon_0={lon_0} {origin}"),
            None => format!("+proj=merc +lon_0={lon_0} +k_0={k_0} {origin}"),
        },
        "lambertconformalconic" | "lambertconformalconic2sp" | "lambertconformalconic1sp" => {
            let lat_1 = lat_1.unwrap_or(lat_0);
            let lat_2 = lat_2.unwrap_or(lat_1);
            format!(
                "+proj=lcc +lat_1={lat_1} +lat_2={lat_2} +lat_0={lat_0} +lon_0={lon_0} +k_0={k_0} {origin}"
            )
        }
        "albers" | "albersconicequalarea" => {
            let lat_1 = lat_1.ok_or(WktError::Missing("standard_parallel_1"))?;
            let lat_2 = lat_2.unwrap_or(lat_1);
            format!("+proj=aea +lat_1={lat_1} +lat_2={lat_2} +lat_0={lat_0} +lon_0={lon_0} {origin}")
        }
        "lambertazimuthalequalarea" => {
            format!("+proj=laea +lat_0={lat_0} +lon_0={lon_0} {origin}")
        }
        "polarstereographic" | "stereographicnorthpole" | "stereographicsouthpole" => {
            let lat_ts = lat_1.unwrap_or(lat_0);
            let pole = if lat_ts < 0.0 { -90 } else { 90 };
            format!("+proj=stere +lat_0={pole} +lat_ts={lat_ts} +lon_0={lon_0} +k_0={k_0} {origin}")
        }
        "obliquestereographic" | "doublestereographic" => {
            format!("+proj=sterea +lat_0={lat_0} +lon_0={lon_0} +k_0={k_0} {origin}")
        }
        _ => return Err(WktError::UnsupportedProjection(method.to_owned())),
    };
    Ok(format!(
        "{projection} {} {} +no_defs",
        datum_terms(geogcs)?,
        units(to_meter)
    ))
}

#[expect(
    clippy::float_arithmetic,
    reason = "unit factors are compared with a tolerance"
)]
fn units(to_meter: f64) -> String {
    if (to_meter - 1.0).abs() < f64::EPSILON {
        "+units=m".to_owned()
    } else {
        format!("+to_meter={to_meter}")
    }
}
