#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, strum_macros::Display)]
pub enum CalibrationStep {
    #[default]
    MoveToStart,
    SwingFirstAxis,
    MeasureFirstAxis,
    MeasureSecondAxis,
    Calibrated,
}

impl CalibrationStep {
    pub fn next(self) -> Self {
        match self {
            CalibrationStep::MoveToStart => CalibrationStep::SwingFirstAxis,
            CalibrationStep::SwingFirstAxis => CalibrationStep::MeasureFirstAxis,
            CalibrationStep::MeasureFirstAxis => CalibrationStep::MeasureSecondAxis,
            CalibrationStep::MeasureSecondAxis | CalibrationStep::Calibrated => {
                CalibrationStep::Calibrated
            }
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn is_calibrated(self) -> bool {
        self == CalibrationStep::Calibrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_monotonically_to_terminal() {
        let mut step = CalibrationStep::default();
        let mut seen = vec![step.ordinal()];
        for _ in 0..10 {
            let next = step.next();
            assert!(next >= step);
            step = next;
            seen.push(step.ordinal());
        }
        assert_eq!(&seen[..5], &[0, 1, 2, 3, 4]);
        assert!(seen[5..].iter().all(|&s| s == 4));
        assert!(step.is_calibrated());
    }
}
