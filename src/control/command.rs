use std::str::FromStr;

use thiserror::Error;

use crate::gimbal::LimitKind;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Override must look like NAME=VALUE!")]
    Malformed,
    #[error("Bug: unknown override {0}!")]
    Unknown(String),
    #[error("Bad value for {name}: {value}!")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    Time {
        hour: u32,
        minute: Option<u32>,
        second: Option<u32>,
    },
    Date {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
    },
    Latitude(f64),
    Longitude(f64),
    Altitude(f64),
    ResumeSource,
    TargetAzimuth(f64),
    TargetElevation(f64),
    MotorPosition {
        axis: usize,
        pulse: i64,
    },
    MotorLimit {
        axis: usize,
        kind: LimitKind,
        pulse: u16,
    },
    /// `T_TLE=name` followed by the two data lines
    Elements(String),
}

impl FromStr for Override {
    type Err = CommandError;

    fn from_str(body: &str) -> Result<Self, Self::Err> {
        let (name, rest) = body.split_once('=').ok_or(CommandError::Malformed)?;
        let name = name.trim();

        if name == "T_TLE" {
            return Ok(Override::Elements(rest.replace('\r', "")));
        }

        let value = rest.lines().next().unwrap_or("").trim();
        let bad = || CommandError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let number = || value.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(bad);

        let parsed = match name {
            "GPS_UTC" => {
                let [hour, minute, second] = fields(value, &[':']).ok_or_else(bad)?;
                Override::Time {
                    hour: hour.ok_or_else(bad)?,
                    minute,
                    second,
                }
            }
            "GPS_Date" => {
                let [year, month, day] = fields(value, &['-', '/']).ok_or_else(bad)?;
                Override::Date {
                    year: year.ok_or_else(bad)? as i32,
                    month,
                    day,
                }
            }
            "GPS_Lat" => Override::Latitude(number()?),
            "GPS_Long" => Override::Longitude(number()?),
            "GPS_Alt" => Override::Altitude(number()?),
            "GPS_Enable" => Override::ResumeSource,
            "T_Az" => Override::TargetAzimuth(number()?),
            "T_El" => Override::TargetElevation(number()?),
            _ => match motor_field(name) {
                Some((axis, MotorField::Position)) => Override::MotorPosition {
                    axis,
                    pulse: value.parse().map_err(|_| bad())?,
                },
                Some((axis, MotorField::Limit(kind))) => Override::MotorLimit {
                    axis,
                    kind,
                    pulse: value.parse().map_err(|_| bad())?,
                },
                None => return Err(CommandError::Unknown(name.to_string())),
            },
        };
        Ok(parsed)
    }
}

enum MotorField {
    Position,
    Limit(LimitKind),
}

fn motor_field(name: &str) -> Option<(usize, MotorField)> {
    let rest = name.strip_prefix("G_Mot")?;
    let (digit, field) = rest.split_at_checked(1)?;
    let axis = match digit {
        "1" => 0,
        "2" => 1,
        _ => return None,
    };
    let field = match field {
        "Pos" => MotorField::Position,
        "Min" => MotorField::Limit(LimitKind::Min),
        "Max" => MotorField::Limit(LimitKind::Max),
        _ => return None,
    };
    Some((axis, field))
}

fn fields(value: &str, separators: &[char]) -> Option<[Option<u32>; 3]> {
    let mut out = [None; 3];
    let parts = value
        .split(|c: char| c.is_whitespace() || separators.contains(&c))
        .filter(|p| !p.is_empty());
    for (i, part) in parts.enumerate() {
        *out.get_mut(i)? = Some(part.parse().ok()?);
    }
    Some(out)
}
