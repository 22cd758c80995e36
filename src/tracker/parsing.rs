use crate::predict::TleSet;
use crate::tracker::TrackerError;

pub fn parse_tle_lines(tle: &str) -> Result<TleSet, TrackerError> {
    let lines: Vec<&str> = tle
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let tle = match lines.as_slice() {
        [line1, line2] => TleSet::new("", line1, line2)?,
        [name, line1, line2] => TleSet::new(name, line1, line2)?,
        _ => return Err(TrackerError::InvalidTleFormat),
    };
    Ok(tle)
}
