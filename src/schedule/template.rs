use crate::ConfigError;
use chrono::{Datelike, NaiveDate};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Year,
    Month,
    Day,
}

/// Maps a calendar day to the site's archive-index URL
///
/// The path template uses `{year}` (four digits), `{month}` and `{day}`
/// (two digits, zero padded). All three placeholders are required so that
/// every day maps to a distinct URL.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use newsday_archiver::schedule::IndexUrlTemplate;
///
/// let template = IndexUrlTemplate::new("https://newsday.co.tt", "{year}/{month}/{day}/").unwrap();
/// let day = NaiveDate::from_ymd_opt(2019, 7, 4).unwrap();
/// assert_eq!(template.build(day), "https://newsday.co.tt/2019/07/04/");
/// ```
#[derive(Debug, Clone)]
pub struct IndexUrlTemplate {
    base: Url,
    prefix: String,
    segments: Vec<Segment>,
}

impl IndexUrlTemplate {
    /// Parses the base URL and path template
    ///
    /// # Returns
    ///
    /// * `Ok(IndexUrlTemplate)` - A template that renders a valid URL for any day
    /// * `Err(ConfigError)` - The base URL or the template is malformed
    pub fn new(base_url: &str, path_template: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("base-url '{}': {}", base_url, e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url '{}' must use http or https",
                base_url
            )));
        }

        if base.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url '{}' has no host",
                base_url
            )));
        }

        let segments = parse_segments(path_template)?;
        for required in [Segment::Year, Segment::Month, Segment::Day] {
            if !segments.contains(&required) {
                return Err(ConfigError::InvalidTemplate(format!(
                    "'{}' is missing a {} placeholder",
                    path_template,
                    placeholder_name(&required)
                )));
            }
        }

        let prefix = base.as_str().trim_end_matches('/').to_string();
        let template = Self {
            base,
            prefix,
            segments,
        };

        // Reject templates that render to something the URL parser refuses
        if let Some(sample) = NaiveDate::from_ymd_opt(2000, 1, 1) {
            Url::parse(&template.build(sample)).map_err(|e| {
                ConfigError::InvalidTemplate(format!(
                    "'{}' does not produce a valid URL: {}",
                    path_template, e
                ))
            })?;
        }

        Ok(template)
    }

    /// Renders the archive-index URL for `day`
    pub fn build(&self, day: NaiveDate) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Year => path.push_str(&format!("{:04}", day.year())),
                Segment::Month => path.push_str(&format!("{:02}", day.month())),
                Segment::Day => path.push_str(&format!("{:02}", day.day())),
            }
        }
        format!("{}/{}", self.prefix, path.trim_start_matches('/'))
    }

    /// The site root the template is anchored on
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

fn placeholder_name(segment: &Segment) -> &'static str {
    match segment {
        Segment::Year => "{year}",
        Segment::Month => "{month}",
        Segment::Day => "{day}",
        Segment::Literal(_) => "literal",
    }
}

/// Splits a template into literal text and placeholders
fn parse_segments(template: &str) -> Result<Vec<Segment>, ConfigError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(ConfigError::InvalidTemplate(format!(
                        "'{}' has an unclosed '{{'",
                        template
                    )));
                }

                let segment = match name.as_str() {
                    "year" => Segment::Year,
                    "month" => Segment::Month,
                    "day" => Segment::Day,
                    other => {
                        return Err(ConfigError::InvalidTemplate(format!(
                            "'{}' uses unknown placeholder '{{{}}}'",
                            template, other
                        )))
                    }
                };

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
            }
            '}' => {
                return Err(ConfigError::InvalidTemplate(format!(
                    "'{}' has an unmatched '}}'",
                    template
                )))
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
