use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::extract;
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

static TOP_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)extract top (\d+) words from (.+)").expect("static regex"));

/// Most frequent words of a file as `word: count` lines.
#[derive(Debug, Default)]
pub struct TopWords;

#[async_trait]
impl Handler for TopWords {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let caps = TOP_WORDS.captures(task.normalized()).ok_or_else(|| {
            TaskError::BadRequest("No valid file or number of words provided".to_string())
        })?;
        let n = extract::count(&caps[1], "word count")?;
        let (_, text) = ctx.read_to_string(&extract::target(&caps[2])).await?;

        let body = most_common(&text, n)
            .into_iter()
            .map(|(word, count)| format!("{word}: {count}"))
            .collect::<Vec<_>>()
            .join("\n");
        let artifact = ctx.write_artifact("words.txt", body.as_bytes()).await?;
        Ok(Completed::new(format!("Top {n} words written to {artifact}.")).with_artifact(artifact))
    }
}

/// Lowercased, ASCII punctuation removed; ties keep first-seen order.
fn most_common(text: &str, n: usize) -> Vec<(String, usize)> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, word) in cleaned.split_whitespace().enumerate() {
        counts.entry(word).or_insert((0, order)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(n)
        .map(|(word, count, _)| (word.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_orders_by_count_then_first_seen() {
        let text = "The cat, the DOG. A dog! the end";
        assert_eq!(
            most_common(text, 3),
            vec![
                ("the".to_string(), 3),
                ("dog".to_string(), 2),
                ("cat".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_most_common_handles_short_input() {
        assert!(most_common("", 5).is_empty());
        assert_eq!(most_common("solo", 5), vec![("solo".to_string(), 1)]);
    }
}
