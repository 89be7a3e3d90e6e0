use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment label '{other}'")),
        }
    }
}

/// One annotated tweet, validated and ready to be written to a backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub tweet_id: i64,
    pub target: i32,
    /// `%Y-%m-%d %H:%M:%S`, as produced by preprocessing.
    pub date: String,
    pub username: String,
    pub flag: String,
    pub text: String,
    pub cleaned_text: String,
    pub original_sentiment: Option<Sentiment>,
    pub textblob_sentiment: Sentiment,
    pub vader_sentiment: Sentiment,
    pub textblob_polarity: f64,
    pub vader_compound: f64,
    pub comparison_textblob: bool,
    pub comparison_vader: bool,
}

/// Raw CSV row; every column is optional until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawRow {
    pub ids: Option<String>,
    pub target: Option<String>,
    pub date: Option<String>,
    pub flag: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub cleaned_text: Option<String>,
    pub textblob_sentiment: Option<String>,
    pub vader_sentiment: Option<String>,
    pub textblob_polarity: Option<String>,
    pub vader_compound: Option<String>,
    pub original_sentiment: Option<String>,
    pub comparison_textblob: Option<String>,
    pub comparison_vader: Option<String>,
}

impl TryFrom<RawRow> for Record {
    type Error = String;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        let tweet_id = match row.ids.as_deref().map(str::trim) {
            None | Some("") => return Err("missing tweet id".to_string()),
            Some(raw) => parse_integer(raw).ok_or_else(|| format!("invalid tweet id '{raw}'"))?,
        };
        let target = match row.target.as_deref().map(str::trim) {
            None | Some("") => return Err(format!("tweet {tweet_id}: missing target")),
            Some(raw) => parse_integer(raw)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| format!("tweet {tweet_id}: invalid target '{raw}'"))?,
        };

        let label = |value: Option<String>| -> Result<Sentiment, String> {
            match value.as_deref().map(str::trim) {
                None | Some("") => Ok(Sentiment::Neutral),
                Some(raw) => raw.parse().map_err(|e| format!("tweet {tweet_id}: {e}")),
            }
        };
        let original_sentiment = match row.original_sentiment.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|e| format!("tweet {tweet_id}: {e}"))?),
        };

        Ok(Record {
            tweet_id,
            target,
            date: row.date.unwrap_or_default(),
            username: row.user.unwrap_or_default(),
            flag: row.flag.unwrap_or_default(),
            text: row.text.unwrap_or_default(),
            cleaned_text: row.cleaned_text.unwrap_or_default(),
            original_sentiment,
            textblob_sentiment: label(row.textblob_sentiment)?,
            vader_sentiment: label(row.vader_sentiment)?,
            textblob_polarity: parse_score(row.textblob_polarity.as_deref()),
            vader_compound: parse_score(row.vader_compound.as_deref()),
            comparison_textblob: parse_flag(row.comparison_textblob.as_deref()),
            comparison_vader: parse_flag(row.comparison_vader.as_deref()),
        })
    }
}

/// Accepts plain integers and integral float text such as `"4.0"`.
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v.abs() < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

fn parse_score(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim),
        Some("True" | "true" | "TRUE" | "1" | "1.0")
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn raw(ids: &str, target: &str) -> RawRow {
        RawRow {
            ids: Some(ids.to_string()),
            target: Some(target.to_string()),
            date: Some("2009-04-06 22:19:45".to_string()),
            user: Some("alice".to_string()),
            flag: Some("NO_QUERY".to_string()),
            text: Some("I love it".to_string()),
            cleaned_text: Some("love".to_string()),
            textblob_sentiment: Some("positive".to_string()),
            vader_sentiment: Some("positive".to_string()),
            textblob_polarity: Some("0.5".to_string()),
            vader_compound: Some("0.6369".to_string()),
            original_sentiment: Some("positive".to_string()),
            comparison_textblob: Some("True".to_string()),
            comparison_vader: Some("False".to_string()),
        }
    }

    #[test]
    fn test_valid_row() {
        let record = Record::try_from(raw("1467810369", "4")).unwrap();
        assert_eq!(record.tweet_id, 1467810369);
        assert_eq!(record.target, 4);
        assert_eq!(record.original_sentiment, Some(Sentiment::Positive));
        assert_eq!(record.vader_compound, 0.6369);
        assert!(record.comparison_textblob);
        assert!(!record.comparison_vader);
    }

    #[rstest]
    #[case::float_text("1467810369.0", 1467810369)]
    #[case::padded(" 42 ", 42)]
    fn test_id_conversion(#[case] ids: &str, #[case] expected: i64) {
        let record = Record::try_from(raw(ids, "0")).unwrap();
        assert_eq!(record.tweet_id, expected);
    }

    #[rstest]
    #[case::header_row("ids", "target")]
    #[case::empty_id("", "4")]
    #[case::bad_target("1", "four")]
    #[case::nan_id("NaN", "4")]
    fn test_invalid_rows_rejected(#[case] ids: &str, #[case] target: &str) {
        assert!(Record::try_from(raw(ids, target)).is_err());
    }

    #[test]
    fn test_missing_scores_default() {
        let mut row = raw("7", "0");
        row.textblob_polarity = None;
        row.vader_compound = Some("nan".to_string());
        row.original_sentiment = None;
        row.vader_sentiment = None;
        let record = Record::try_from(row).unwrap();
        assert_eq!(record.textblob_polarity, 0.0);
        assert_eq!(record.vader_compound, 0.0);
        assert_eq!(record.original_sentiment, None);
        assert_eq!(record.vader_sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_labels() {
        assert_eq!("Negative".parse::<Sentiment>(), Ok(Sentiment::Negative));
        assert!("meh".parse::<Sentiment>().is_err());
        assert_eq!(Sentiment::Neutral.to_string(), "neutral");
    }
}
