// crates/core/src/prompt.rs
//! Prompt template and the expected response shape for classification.

use serde_json::json;

use crate::category::Category;
use crate::llm::ResponseShape;

const PLACEHOLDER: &str = "{text}";

pub const PROMPT_TEMPLATE: &str = r#"Classify the following text into ONE of seven categories.
The first five are types of Drivelology (nonsense with underlying logic, irony, or a conceptual twist).
The last two are included for contrast.

Drivelology categories:
 - Reverse Punchline: subverts expectations by delivering a literal, technically correct, or backhanded response instead of a traditional punchline.
 - Figurative Literalism or Homophonic Pun: takes figurative language, idioms, or homophones literally, generating comic or linguistic tension.
 - Cultural or Linguistic Switchbait: plays on cultural or language-specific quirks to produce paradoxes, confusion, or humorous misinterpretation.
 - Inevitable Contradiction: constructs statements that collapse under their own logic; self-defeating, recursive, or satirically paradoxical.
 - Semantic Misdirection: builds toward depth or meaning, then veers suddenly into the mundane, anticlimactic, or unrelated.

Reference categories:
 - Pure Nonsense: syntactically correct but semantically meaningless; lacks any deeper logic or intent.
 - Normal Sentence: a clear, sensible statement with no twist, joke, or contradiction.

INPUT TEXT: {text}

Respond with a JSON object with the following keys:
 - reason: an explanation of why the text belongs to the category.
 - category: the category the text belongs to, in lowercase."#;

/// Substitute `text` into the single placeholder of [`PROMPT_TEMPLATE`].
pub fn build_prompt(text: &str) -> String {
    PROMPT_TEMPLATE.replacen(PLACEHOLDER, text, 1)
}

/// The `{reason, category}` object every classification response must match.
pub fn classification_shape() -> ResponseShape {
    let labels: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    ResponseShape {
        name: "drivelology_classification".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "reason": { "type": "string" },
                "category": { "type": "string", "enum": labels },
            },
            "required": ["reason", "category"],
            "additionalProperties": false,
        }),
    }
}
