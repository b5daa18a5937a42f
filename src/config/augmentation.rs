/// How an augmentation list from the config is sampled.
///
/// Two values are a uniform `[low, high]` range; three or more are a set of
/// discrete choices.
#[derive(Clone, Debug, PartialEq)]
pub enum AugmentationParam {
    Range { low: f64, high: f64 },
    Choice(Vec<f64>),
}

impl AugmentationParam {
    /// Interpret a config list, rejecting single values and inverted ranges.
    pub fn from_values(values: &[f64]) -> Result<Self, String> {
        if let Some(bad) = values.iter().find(|value| !value.is_finite()) {
            return Err(format!("{bad} is not a finite number"));
        }
        match values {
            [] | [_] => Err(format!(
                "expected [low, high] or three or more choices, got {} value(s)",
                values.len()
            )),
            [low, high] if low > high => Err(format!("range low {low} exceeds high {high}")),
            [low, high] => Ok(Self::Range {
                low: *low,
                high: *high,
            }),
            choices => Ok(Self::Choice(choices.to_vec())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_values_are_a_range() {
        assert_eq!(
            AugmentationParam::from_values(&[0.0, 360.0]).unwrap(),
            AugmentationParam::Range {
                low: 0.0,
                high: 360.0
            }
        );
    }

    #[test]
    fn three_values_are_choices() {
        assert_eq!(
            AugmentationParam::from_values(&[0.5, 1.0, 2.0]).unwrap(),
            AugmentationParam::Choice(vec![0.5, 1.0, 2.0])
        );
    }

    #[test]
    fn single_value_and_inverted_range_are_rejected() {
        assert!(AugmentationParam::from_values(&[1.0]).is_err());
        assert!(AugmentationParam::from_values(&[2.0, 1.0]).is_err());
        assert!(AugmentationParam::from_values(&[f64::NAN, 1.0]).is_err());
    }
}
