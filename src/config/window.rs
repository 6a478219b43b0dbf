use crate::api::DateWindow;
use crate::config::types::WindowConfig;
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, Utc};

/// Which side of the window a bound is parsed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parses an RFC 3339 instant or a `YYYY-MM-DD` date
///
/// A plain date starts at 00:00:00 UTC for [`Bound::Start`] and ends at
/// 23:59:59 UTC for [`Bound::End`].
pub fn parse_bound(value: &str, bound: Bound) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ConfigError::InvalidDate(format!(
            "'{}' is neither an RFC 3339 instant nor a YYYY-MM-DD date",
            value
        ))
    })?;
    let (hour, min, sec) = match bound {
        Bound::Start => (0, 0, 0),
        Bound::End => (23, 59, 59),
    };
    let at = date
        .and_hms_opt(hour, min, sec)
        .ok_or_else(|| ConfigError::InvalidDate(value.to_string()))?;
    Ok(at.and_utc())
}

impl WindowConfig {
    /// Replaces the configured bounds with any given on the command line
    pub fn with_overrides(&self, start: Option<String>, end: Option<String>) -> Self {
        Self {
            start: start.or_else(|| self.start.clone()),
            end: end.or_else(|| self.end.clone()),
        }
    }

    /// Parses both bounds into a window
    ///
    /// # Returns
    ///
    /// * `Ok(Some(DateWindow))` - Both bounds set and ordered
    /// * `Ok(None)` - At least one bound is missing
    /// * `Err(ConfigError)` - A bound does not parse or start is after end
    pub fn resolve(&self) -> Result<Option<DateWindow>, ConfigError> {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return Ok(None);
        };
        let start = parse_bound(start, Bound::Start)?;
        let end = parse_bound(end, Bound::End)?;
        if start > end {
            return Err(ConfigError::Validation(format!(
                "window start {} is after window end {}",
                start, end
            )));
        }
        Ok(Some(DateWindow::new(start, end)))
    }
}
