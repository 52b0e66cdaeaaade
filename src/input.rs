//! Bounded numeric inputs: sliders and free-text fields.
use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// Range and granularity of one slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderBounds {
    pub const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Accept anything finite; used by free-form fields with no slider.
    pub const UNBOUNDED: SliderBounds = SliderBounds::new(f64::MIN, f64::MAX, 0.0);

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Finite and within range.
    pub fn check(&self, value: f64) -> Result<f64, InputError> {
        if !value.is_finite() {
            return Err(InputError::NonFinite);
        }
        if !self.contains(value) {
            return Err(InputError::OutOfBounds {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

pub fn parse_bounded(text: &str, bounds: SliderBounds) -> Result<f64, InputError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| InputError::NotANumber(trimmed.to_string()))?;
    bounds.check(value)
}

/// A text box backed by the last value that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericField {
    text: String,
    value: f64,
    bounds: SliderBounds,
    error: Option<String>,
    /// Treat `""` and `"-"` as zero while the user is mid-edit.
    lenient_partial: bool,
}

impl NumericField {
    pub fn new(value: f64, bounds: SliderBounds) -> Self {
        Self {
            text: value.to_string(),
            value,
            bounds,
            error: None,
            lenient_partial: false,
        }
    }

    pub fn lenient(mut self) -> Self {
        self.lenient_partial = true;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bounds(&self) -> SliderBounds {
        self.bounds
    }

    /// Inline validation message from the last rejected edit.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record an edit. On rejection the text is kept for display but the
    /// numeric value is untouched.
    pub fn edit(&mut self, text: &str) -> Result<f64, InputError> {
        self.text = text.to_string();
        if self.lenient_partial && matches!(text.trim(), "" | "-") {
            self.value = 0.0;
            self.error = None;
            return Ok(0.0);
        }
        match parse_bounded(text, self.bounds) {
            Ok(v) => {
                self.value = v;
                self.error = None;
                Ok(v)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Slider drag: already numeric, still bounds-checked.
    pub fn set(&mut self, value: f64) -> Result<f64, InputError> {
        let v = self.bounds.check(value).inspect_err(|e| {
            self.error = Some(e.to_string());
        })?;
        self.value = v;
        self.text = v.to_string();
        self.error = None;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: SliderBounds = SliderBounds::new(0.0, 1.0, 0.05);

    #[test]
    fn rejects_out_of_bounds_and_keeps_value() {
        let mut field = NumericField::new(0.8, UNIT);
        let err = field.edit("1.5").unwrap_err();
        assert_eq!(err, InputError::OutOfBounds { value: 1.5, min: 0.0, max: 1.0 });
        assert_eq!(field.value(), 0.8);
        assert_eq!(field.text(), "1.5");
        assert!(field.error().is_some());
    }

    #[test]
    fn rejects_garbage_and_non_finite() {
        let mut field = NumericField::new(0.2, SliderBounds::UNBOUNDED);
        assert!(matches!(field.edit("abc"), Err(InputError::NotANumber(_))));
        assert_eq!(field.edit("inf"), Err(InputError::NonFinite));
        assert_eq!(field.edit("NaN"), Err(InputError::NonFinite));
        assert_eq!(field.value(), 0.2);
    }

    #[test]
    fn accepted_edit_clears_error() {
        let mut field = NumericField::new(0.8, UNIT);
        let _ = field.edit("x");
        assert_eq!(field.edit(" 0.25 ").unwrap(), 0.25);
        assert_eq!(field.error(), None);
    }

    #[test]
    fn lenient_field_reads_partial_text_as_zero() {
        let mut field = NumericField::new(3.0, SliderBounds::UNBOUNDED).lenient();
        assert_eq!(field.edit("-").unwrap(), 0.0);
        assert_eq!(field.edit("").unwrap(), 0.0);

        let mut strict = NumericField::new(3.0, SliderBounds::UNBOUNDED);
        assert!(strict.edit("-").is_err());
        assert_eq!(strict.value(), 3.0);
    }

    #[test]
    fn slider_set_is_checked() {
        let mut field = NumericField::new(0.5, UNIT);
        assert!(field.set(-0.1).is_err());
        assert_eq!(field.value(), 0.5);
        assert_eq!(field.set(1.0).unwrap(), 1.0);
    }
}
