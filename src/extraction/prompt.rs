//! Prompt construction and parsing of generated output.

const SUMMARY_INSTRUCTION: &str =
    "Summarize the following meeting transcript as bullet points, including key decisions if any:\n";

const ACTION_ITEMS_INSTRUCTION: &str =
    "Extract action items (tasks, owners, deadlines) as bullet points from this meeting transcript: ";

pub fn summary_prompt(transcript: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}{transcript}")
}

pub fn action_items_prompt(transcript: &str) -> String {
    format!("{ACTION_ITEMS_INSTRUCTION}{transcript}")
}

/// Split generated text into list entries.
///
/// One entry per line with bullets (`-`, `*`, `•`) and enumerators (`1.`,
/// `2)`) removed; blank lines are dropped.
pub fn parse_generated_items(generated: &str) -> Vec<String> {
    generated
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();

    if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        return rest.trim();
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return rest.trim();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_puts_transcript_on_next_line() {
        let prompt = summary_prompt("We agreed.");
        assert!(prompt.starts_with("Summarize the following meeting transcript"));
        assert!(prompt.ends_with("if any:\nWe agreed."));
    }

    #[test]
    fn action_items_prompt_appends_transcript() {
        let prompt = action_items_prompt("Bob will call.");
        assert!(prompt.ends_with("meeting transcript: Bob will call."));
    }

    #[test]
    fn parse_strips_bullets_and_blank_lines() {
        let items = parse_generated_items("- Send the deck\n\n* Book a room\n• Call Ana\n   \n");
        assert_eq!(items, vec!["Send the deck", "Book a room", "Call Ana"]);
    }

    #[test]
    fn parse_strips_enumerators() {
        let items = parse_generated_items("1. Draft memo\n2) Review budget\n10. Ship it");
        assert_eq!(items, vec!["Draft memo", "Review budget", "Ship it"]);
    }

    #[test]
    fn parse_keeps_leading_numbers_that_are_content() {
        let items = parse_generated_items("3.5 hours of review\n2024 roadmap draft");
        assert_eq!(items, vec!["3.5 hours of review", "2024 roadmap draft"]);
    }

    #[test]
    fn parse_single_line_output() {
        assert_eq!(parse_generated_items("Send the report"), vec!["Send the report"]);
    }

    #[test]
    fn parse_empty_output() {
        assert!(parse_generated_items("  \n - \n").is_empty());
    }
}
