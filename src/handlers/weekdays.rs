use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use tracing::info;

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

pub const PATTERN: &str =
    r"\b(?:count|how many)\b.*\b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b";

const DEFAULT_INPUT: &str = "dates.txt";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%b %d, %Y", "%Y/%m/%d", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Counts the dates in a file that fall on a given weekday.
#[derive(Debug, Default)]
pub struct WeekdayCounter;

#[async_trait]
impl Handler for WeekdayCounter {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let weekday = weekday_in(task.folded())
            .ok_or_else(|| TaskError::BadRequest("no weekday named in task".to_string()))?;
        let input = extract::file_token(task.normalized()).unwrap_or_else(|| DEFAULT_INPUT.to_string());

        let (_, text) = ctx.read_to_string(&input).await?;
        let mut count = 0usize;
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let date = parse_date(line).ok_or_else(|| {
                TaskError::Upstream(format!(
                    "line {} of {input} is not a recognized date",
                    lineno + 1
                ))
            })?;
            if date.weekday() == weekday {
                count += 1;
            }
        }

        let plural = format!("{}s", weekday_name(weekday));
        let output = extract::derived_name(&input, &format!("-{plural}.txt"));
        let artifact = ctx.write_artifact(&output, count.to_string().as_bytes()).await?;
        info!(weekday = %weekday, count, artifact = %artifact, "weekday count written");
        Ok(Completed::new(format!("Found {count} {plural}.")).with_artifact(artifact))
    }
}

fn weekday_in(folded: &str) -> Option<Weekday> {
    const DAYS: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    DAYS.iter()
        .filter_map(|(name, day)| folded.find(name).map(|pos| (pos, *day)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, day)| day)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn parse_date(line: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(line, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(line, fmt).ok())
                .map(|dt| dt.date())
        })
}
