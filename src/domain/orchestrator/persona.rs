//! Prompts sent on behalf of a domain persona and parsing of their replies

use serde_json::Value;

use crate::domain::template::Template;
use crate::domain::track::DomainTrack;
use crate::domain::validation::{InputDeclaration, InputType};

/// What the persona found for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Value(String),
    /// The latest message does not mention the input
    Missing,
    /// The message mentions the input but the value is unclear
    Ambiguous { question: Option<String> },
}

/// System prompt asking the persona to pull one input out of the latest message
pub fn extraction_prompt(
    track: DomainTrack,
    template: &Template,
    input: &InputDeclaration,
) -> String {
    let mut prompt = format!(
        "{}\n\nThe user is configuring the automation \"{}\". Extract the value of the \
         input \"{}\" ({}, type {}) from the user's latest message only.",
        track.persona(),
        template.name,
        input.name,
        input.label,
        input.input_type
    );

    if let Some(description) = &input.description {
        prompt.push_str(&format!("\nInput description: {}", description));
    }

    match input.input_type {
        InputType::Select => {
            let options = input
                .options
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            prompt.push_str(&format!("\nAllowed choices: {}", options));
        }
        InputType::RegionCode => {
            prompt.push_str("\nReturn the wilaya code (01 to 58) or the wilaya name.");
        }
        InputType::Phone => {
            prompt.push_str("\nReturn the phone number exactly as written.");
        }
        InputType::Number => {
            prompt.push_str("\nReturn digits only.");
        }
        InputType::Text => {}
    }

    prompt.push_str(
        "\n\nThe user may write in French, English, Arabic or Algerian Darja. \
         Reply with JSON only, no prose:\n\
         {\"value\": \"...\"} when the value is present,\n\
         {\"value\": null} when the message does not mention it,\n\
         {\"value\": null, \"ambiguous\": true, \"question\": \"...\"} when it is unclear.",
    );

    prompt
}

/// System prompt for a free reply when no template fits
pub fn conversational_prompt(track: DomainTrack) -> String {
    format!(
        "{}\n\nYou help Algerian businesses automate their work. No ready-made automation \
         matches the user's request yet. Answer briefly in the user's language, and ask \
         what they would like to automate (leads, deliveries, payments).",
        track.persona()
    )
}

/// Question asking the user for an input
pub fn slot_question(input: &InputDeclaration) -> String {
    let mut question = match input.input_type {
        InputType::RegionCode => format!("Which wilaya should I use for {}?", input.label),
        InputType::Phone => format!("What is the {} (mobile number)?", input.label),
        _ => format!("Please provide the {}.", input.label),
    };

    if let Some(description) = &input.description {
        question.push_str(&format!(" ({})", description));
    }

    if input.input_type == InputType::Select && !input.options.is_empty() {
        let options = input
            .options
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        question.push_str(&format!(" Options: {}.", options));
    }

    question
}

/// Re-prompt after a validation failure
pub fn rejection_prompt(input: &InputDeclaration, error: &str) -> String {
    format!("{}. {}", error, slot_question(input))
}

/// Parses the persona's reply, tolerating code fences; anything that is not JSON counts as missing
pub fn parse_extraction(reply: &str) -> Extraction {
    let body = strip_code_fence(reply.trim());

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let ambiguous = map
                .get("ambiguous")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            if ambiguous {
                return Extraction::Ambiguous {
                    question: map
                        .get("question")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string),
                };
            }

            match map.get("value") {
                Some(Value::String(s)) => raw_extraction(s),
                Some(Value::Number(n)) => Extraction::Value(n.to_string()),
                Some(Value::Bool(b)) => Extraction::Value(b.to_string()),
                _ => Extraction::Missing,
            }
        }
        Ok(Value::String(s)) => raw_extraction(&s),
        Ok(Value::Number(n)) => Extraction::Value(n.to_string()),
        Ok(Value::Null) => Extraction::Missing,
        Ok(_) => Extraction::Missing,
        Err(_) => Extraction::Missing,
    }
}

fn raw_extraction(text: &str) -> Extraction {
    let text = text.trim();

    if text.is_empty() || matches!(text.to_lowercase().as_str(), "null" | "none" | "n/a") {
        Extraction::Missing
    } else {
        Extraction::Value(text.to_string())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };

    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::ChoiceOption;

    #[test]
    fn test_parse_value() {
        assert_eq!(
            parse_extraction(r#"{"value": "16"}"#),
            Extraction::Value("16".to_string())
        );
        assert_eq!(
            parse_extraction(r#"{"value": 50}"#),
            Extraction::Value("50".to_string())
        );
    }

    #[test]
    fn test_parse_missing() {
        assert_eq!(parse_extraction(r#"{"value": null}"#), Extraction::Missing);
        assert_eq!(parse_extraction(r#"{"value": "  "}"#), Extraction::Missing);
        assert_eq!(parse_extraction("null"), Extraction::Missing);
    }

    #[test]
    fn test_parse_ambiguous() {
        assert_eq!(
            parse_extraction(
                r#"{"value": null, "ambiguous": true, "question": "Oran or Alger?"}"#
            ),
            Extraction::Ambiguous {
                question: Some("Oran or Alger?".to_string())
            }
        );
    }

    #[test]
    fn test_parse_code_fence() {
        assert_eq!(
            parse_extraction("```json\n{\"value\": \"0550123456\"}\n```"),
            Extraction::Value("0550123456".to_string())
        );
    }

    #[test]
    fn test_parse_non_json_is_missing() {
        assert_eq!(parse_extraction("Oran"), Extraction::Missing);
        assert_eq!(
            parse_extraction("Sure! The account number is 0012345678."),
            Extraction::Missing
        );
        assert_eq!(parse_extraction("   "), Extraction::Missing);
        assert_eq!(parse_extraction(r#""Oran""#), Extraction::Value("Oran".to_string()));
    }

    #[test]
    fn test_extraction_prompt_mentions_choices() {
        let template = Template::new("t", "Lead Scraper", "sales").with_keywords(["lead"]);
        let input = InputDeclaration::new("category", "Category", InputType::Select)
            .with_options(vec![ChoiceOption::new("cars", "Voitures")]);

        let prompt = extraction_prompt(DomainTrack::Sales, &template, &input);

        assert!(prompt.starts_with(DomainTrack::Sales.persona()));
        assert!(prompt.contains("Voitures"));
        assert!(prompt.contains("\"category\""));
    }

    #[test]
    fn test_slot_question() {
        let input = InputDeclaration::new("account_number", "CCP account number", InputType::Text);
        assert_eq!(slot_question(&input), "Please provide the CCP account number.");
        assert!(rejection_prompt(&input, "Too long").starts_with("Too long. Please provide"));
    }
}
