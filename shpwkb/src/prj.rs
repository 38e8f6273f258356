//! Parser pour les fichiers .prj (WKT ESRI / OGC) et identification EPSG
//!
//! Ordre de résolution :
//! 1. `AUTHORITY["EPSG","xxxx"]` (ou `ID["EPSG",xxxx]`) sur la racine
//! 2. table des noms connus (GEOGCS / PROJCS)
//! 3. motifs UTM WGS84 et Gauss-Krüger CGCS2000, avec contrôle des paramètres
//!
//! Une définition UTM dont les paramètres sont décalés (faux est modifié,
//! méridien central non standard) n'a pas de code EPSG : on retourne `None`.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::ShpError;

/// Systèmes géographiques connus (noms normalisés)
const GEOGRAPHIC: &[(&str, u32)] = &[
    ("gcs_wgs_1984", 4326),
    ("wgs_84", 4326),
    ("wgs_1984", 4326),
    ("gcs_china_geodetic_coordinate_system_2000", 4490),
    ("china_geodetic_coordinate_system_2000", 4490),
    ("cgcs2000", 4490),
    ("gcs_beijing_1954", 4214),
    ("beijing_1954", 4214),
    ("gcs_xian_1980", 4610),
    ("xian_1980", 4610),
    ("gcs_korea_2000", 4737),
    ("korea_2000", 4737),
    ("gcs_hong_kong_1980", 4611),
    ("hong_kong_1980", 4611),
    ("gcs_tokyo", 4301),
    ("gcs_jgd_2000", 4612),
    ("gcs_jgd_2011", 6668),
    ("gcs_twd_1997", 3824),
];

/// Systèmes projetés connus (noms normalisés)
const PROJECTED: &[(&str, u32)] = &[
    ("wgs_1984_web_mercator_auxiliary_sphere", 3857),
    ("wgs_84_pseudo_mercator", 3857),
    ("korea_2000_korea_unified_coordinate_system", 5179),
    ("korea_2000_unified_cs", 5179),
    ("hong_kong_1980_grid", 2326),
    ("hong_kong_1980_grid_system", 2326),
    ("twd_1997_tm_taiwan", 3826),
];

/// Valeur d'un nœud WKT
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    Node(WktNode),
}

/// Nœud WKT: `KEYWORD[arg, arg, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

impl WktNode {
    /// Premier argument texte (le nom du CRS pour PROJCS/GEOGCS)
    pub fn name(&self) -> Option<&str> {
        match self.args.first()? {
            WktValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Sous-nœuds directs portant ce mot-clé
    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.args.iter().filter_map(move |arg| match arg {
            WktValue::Node(node) if node.keyword.eq_ignore_ascii_case(keyword) => Some(node),
            _ => None,
        })
    }

    pub fn child<'a>(&'a self, keyword: &'a str) -> Option<&'a WktNode> {
        self.children(keyword).next()
    }

    /// Valeur d'un `PARAMETER["name", value]` (nom insensible à la casse)
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.children("PARAMETER").find_map(|p| {
            let matches = p.name().map(normalize_name)? == normalize_name(name);
            match (matches, p.args.get(1)) {
                (true, Some(WktValue::Number(v))) => Some(*v),
                _ => None,
            }
        })
    }

    /// Code EPSG déclaré par `AUTHORITY` (WKT1) ou `ID` (WKT2)
    pub fn authority_code(&self) -> Option<u32> {
        let node = self.child("AUTHORITY").or_else(|| self.child("ID"))?;
        if !node.name()?.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        match node.args.get(1)? {
            WktValue::Text(code) => code.trim().parse().ok(),
            WktValue::Number(code) if code.fract() == 0.0 && *code > 0.0 => Some(*code as u32),
            _ => None,
        }
    }
}

/// Normalise un nom de CRS: minuscules, séparateurs réduits à `_`
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn error(&self, reason: &str) -> ShpError {
        ShpError::InvalidPrj(reason.to_string())
    }

    fn node(&mut self) -> Result<WktNode, ShpError> {
        self.skip_ws();
        let keyword = self.word();
        if keyword.is_empty() {
            return Err(self.error("expected keyword"));
        }
        self.skip_ws();
        let close = match self.chars.next() {
            Some((_, '[')) => ']',
            Some((_, '(')) => ')',
            _ => return Err(self.error(&format!("expected '[' after {}", keyword))),
        };

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek().copied() {
                Some((_, c)) if c == close => {
                    self.chars.next();
                    break;
                }
                Some((_, ',')) => {
                    self.chars.next();
                }
                Some((_, '"')) => args.push(WktValue::Text(self.quoted()?)),
                Some((_, c)) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                    let raw = self.word();
                    let value = raw
                        .parse::<f64>()
                        .map_err(|_| self.error(&format!("invalid number '{}'", raw)))?;
                    args.push(WktValue::Number(value));
                }
                Some((_, c)) if c.is_ascii_alphabetic() => {
                    // Mot-clé suivi d'un crochet = sous-nœud, sinon énumération (NORTH, EAST...)
                    let checkpoint = self.chars.clone();
                    let word = self.word();
                    self.skip_ws();
                    if matches!(self.chars.peek(), Some((_, '[')) | Some((_, '('))) {
                        self.chars = checkpoint;
                        args.push(WktValue::Node(self.node()?));
                    } else {
                        args.push(WktValue::Text(word));
                    }
                }
                Some((_, c)) => return Err(self.error(&format!("unexpected character '{}'", c))),
                None => return Err(self.error("unterminated node")),
            }
        }

        Ok(WktNode { keyword, args })
    }

    fn word(&mut self) -> String {
        let start = match self.chars.peek() {
            Some((i, _)) => *i,
            None => return String::new(),
        };
        let mut end = start;
        while let Some((i, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+') {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        self.text[start..end].to_string()
    }

    fn quoted(&mut self) -> Result<String, ShpError> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => {
                    if matches!(self.chars.peek(), Some((_, '"'))) {
                        self.chars.next();
                        out.push('"');
                    } else {
                        return Ok(out);
                    }
                }
                Some((_, c)) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

/// Parse un texte WKT en arbre
pub fn parse_wkt(text: &str) -> Result<WktNode, ShpError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut parser = Parser {
        chars: text.char_indices().peekable(),
        text,
    };
    parser.node()
}

fn utm_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^wgs_(?:1984|84)_utm_zone_(\d{1,2})([ns])$").expect("valid regex"))
}

fn gauss_kruger_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^cgcs2000_(3_degree_)?gk_(cm|zone)_(\d{1,3})e?$").expect("valid regex")
    })
}

/// Vérifie que les paramètres présents correspondent aux valeurs attendues
fn parameters_match(root: &WktNode, expected: &[(&str, f64)]) -> bool {
    expected.iter().all(|(name, want)| match root.parameter(name) {
        Some(got) => (got - want).abs() <= 1e-6 * want.abs().max(1.0),
        None => true,
    })
}

fn is_transverse_mercator(root: &WktNode) -> bool {
    match root.child("PROJECTION").and_then(WktNode::name) {
        Some(name) => {
            let name = normalize_name(name);
            name == "transverse_mercator" || name == "gauss_kruger"
        }
        None => true,
    }
}

fn identify_utm(root: &WktNode, name: &str) -> Option<u32> {
    let caps = utm_pattern().captures(name)?;
    let zone: u32 = caps[1].parse().ok()?;
    if !(1..=60).contains(&zone) || !is_transverse_mercator(root) {
        return None;
    }
    let south = &caps[2] == "s";
    let central_meridian = zone as f64 * 6.0 - 183.0;
    let false_northing = if south { 10_000_000.0 } else { 0.0 };
    let standard = parameters_match(
        root,
        &[
            ("false_easting", 500_000.0),
            ("false_northing", false_northing),
            ("central_meridian", central_meridian),
            ("scale_factor", 0.9996),
            ("latitude_of_origin", 0.0),
        ],
    );
    if !standard {
        debug!(name, "UTM definition with non-standard parameters");
        return None;
    }
    Some(if south { 32700 + zone } else { 32600 + zone })
}

fn identify_gauss_kruger(root: &WktNode, name: &str) -> Option<u32> {
    let caps = gauss_kruger_pattern().captures(name)?;
    let three_degree = caps.get(1).is_some();
    let by_zone = &caps[2] == "zone";
    let value: u32 = caps[3].parse().ok()?;
    if !is_transverse_mercator(root) {
        return None;
    }

    let (code, central_meridian, false_easting) = match (three_degree, by_zone) {
        (true, false) if (75..=135).contains(&value) && value % 3 == 0 => {
            (4534 + (value - 75) / 3, value as f64, 500_000.0)
        }
        (true, true) if (25..=45).contains(&value) => {
            (4513 + value - 25, value as f64 * 3.0, value as f64 * 1e6 + 500_000.0)
        }
        (false, false) if (75..=135).contains(&value) && (value - 75) % 6 == 0 => {
            (4502 + (value - 75) / 6, value as f64, 500_000.0)
        }
        (false, true) if (13..=23).contains(&value) => (
            4491 + value - 13,
            value as f64 * 6.0 - 3.0,
            value as f64 * 1e6 + 500_000.0,
        ),
        _ => return None,
    };

    parameters_match(
        root,
        &[
            ("false_easting", false_easting),
            ("central_meridian", central_meridian),
            ("scale_factor", 1.0),
        ],
    )
    .then_some(code)
}

fn lookup(table: &[(&str, u32)], name: &str) -> Option<u32> {
    table
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, code)| code)
}

/// Identifie le code EPSG d'un arbre WKT
pub fn identify_epsg(root: &WktNode) -> Option<u32> {
    if let Some(code) = root.authority_code() {
        return Some(code);
    }

    let name = normalize_name(root.name()?);
    match root.keyword.to_ascii_uppercase().as_str() {
        "PROJCS" | "PROJCRS" => lookup(PROJECTED, &name)
            .or_else(|| identify_utm(root, &name))
            .or_else(|| identify_gauss_kruger(root, &name)),
        "GEOGCS" | "GEOGCRS" | "GEODCRS" => lookup(GEOGRAPHIC, &name),
        _ => None,
    }
}

/// Lit un sidecar .prj et retourne son code EPSG s'il est identifiable.
///
/// # Errors
///
/// `MissingFile` si le sidecar n'existe pas, `InvalidPrj` s'il ne se parse pas.
pub fn read_epsg(prj_path: &Path) -> Result<Option<u32>, ShpError> {
    if !prj_path.exists() {
        return Err(ShpError::MissingFile(prj_path.display().to_string()));
    }
    let bytes = std::fs::read(prj_path)?;
    let text = String::from_utf8_lossy(&bytes);
    let root = parse_wkt(&text)?;
    Ok(identify_epsg(&root))
}
