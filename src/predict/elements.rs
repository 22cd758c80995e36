use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

use sgp4::Elements;

use crate::predict::error::{ElementsError, PredictError};
use crate::time::Epoch;

pub const DATA_LINE_LEN: usize = 69;

#[derive(Debug, Clone, PartialEq)]
pub struct TleSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl TleSet {
    pub fn new(name: &str, line1: &str, line2: &str) -> Result<Self, ElementsError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        if !checksum_valid(line1) {
            return Err(ElementsError::Checksum(1));
        }
        if !checksum_valid(line2) {
            return Err(ElementsError::Checksum(2));
        }
        Ok(Self {
            name: name.trim().to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElements {
    pub name: String,
    pub catalog_number: u64,
    pub epoch: Epoch,
    pub inclination: f64,
    pub right_ascension: f64,
    pub eccentricity: f64,
    pub argument_of_perigee: f64,
    pub mean_anomaly: f64,
    pub mean_motion: f64,
    pub decay: f64,
}

impl OrbitalElements {
    pub fn from_tle(tle: &TleSet) -> Result<Self, ElementsError> {
        let elements = Elements::from_tle(
            Some(tle.name.clone()),
            tle.line1.as_bytes(),
            tle.line2.as_bytes(),
        )
        .map_err(|e| ElementsError::Malformed(e.to_string()))?;

        if !(0.0..1.0).contains(&elements.eccentricity) || elements.mean_motion <= 0.0 {
            return Err(ElementsError::Malformed(format!(
                "unphysical orbit: e = {}, n = {} rev/day",
                elements.eccentricity, elements.mean_motion
            )));
        }

        Ok(Self {
            name: tle.name.clone(),
            catalog_number: elements.norad_id as u64,
            epoch: Epoch::from_datetime(elements.datetime)?,
            inclination: elements.inclination.to_radians(),
            right_ascension: elements.right_ascension.to_radians(),
            eccentricity: elements.eccentricity,
            argument_of_perigee: elements.argument_of_perigee.to_radians(),
            mean_anomaly: elements.mean_anomaly.to_radians(),
            mean_motion: TAU * elements.mean_motion,
            decay: TAU * elements.mean_motion_dot,
        })
    }
}

/// Sum of the first 68 characters' digits, '-' counting as 1, must equal the
/// 69th character modulo 10.
pub fn checksum_valid(line: &str) -> bool {
    let bytes = line.as_bytes();
    if bytes.len() < DATA_LINE_LEN {
        return false;
    }
    let sum: u32 = bytes[..DATA_LINE_LEN - 1]
        .iter()
        .map(|&c| match c {
            b'-' => 1,
            b'0'..=b'9' => (c - b'0') as u32,
            _ => 0,
        })
        .sum();
    match bytes[DATA_LINE_LEN - 1] {
        c @ b'0'..=b'9' => (c - b'0') as u32 == sum % 10,
        _ => false,
    }
}

pub fn load_tle_file(path: &Path) -> Result<Vec<(TleSet, OrbitalElements)>, PredictError> {
    let content = fs::read_to_string(path)?;
    let mut results = Vec::new();

    for (name, line1, line2) in parse_multi_tle(&content) {
        let label = name.clone().unwrap_or_else(|| "unnamed".to_string());
        let parsed = TleSet::new(name.as_deref().unwrap_or(""), &line1, &line2)
            .and_then(|tle| OrbitalElements::from_tle(&tle).map(|el| (tle, el)));
        match parsed {
            Ok(entry) => results.push(entry),
            Err(e) => log::warn!("Skipping element set {} in {}: {}", label, path.display(), e),
        }
    }

    Ok(results)
}

pub fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}
