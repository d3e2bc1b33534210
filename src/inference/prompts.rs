//! Prompt templates for the language oracle.
//!
//! Both templates ask for a single JSON object and nothing else. The
//! utterance is embedded verbatim between quotes; the oracle's reply is
//! validated by the caller, so prompt injection can at worst produce a
//! rejected payload.

/// Which template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    IntentClassification,
    InformationExtraction,
}

/// Key that only the intent template asks for. Lets test oracles tell the two
/// prompts apart.
#[cfg(test)]
pub(crate) const INTENT_MARKER: &str = "\"alternatives\"";

const INTENT_CLASSIFICATION_PROMPT: &str = r#"
आप एक भारतीय सरकारी योजना सहायक हैं।

उपयोगकर्ता का कथन: "{user_input}"

कृपया निम्नलिखित में से उपयोगकर्ता का इरादा (intent) पहचानें:
1. "find_schemes" - योजनाएं खोजना
2. "provide_info" - अपनी जानकारी देना (उम्र, आय, लिंग आदि)
3. "apply_scheme" - किसी योजना के लिए आवेदन करना
4. "get_details" - किसी योजना का विवरण पूछना
5. "clarify" - संदेह स्पष्ट करना
6. "greeting" - अभिवादन

केवल JSON में उत्तर दें:
{
    "intent": "<ऊपर दी गई सूची में से एक>",
    "confidence": <0.0 से 1.0>,
    "reasoning": "<कारण>",
    "alternatives": ["<अन्य संभावित intent>"]
}
"#;

const INFORMATION_EXTRACTION_PROMPT: &str = r#"
आप एक भारतीय सरकारी योजना सहायक हैं।

उपयोगकर्ता का कथन:
"{user_input}"

कार्य:
केवल वही जानकारी निकालें जो उपयोगकर्ता ने स्पष्ट रूप से कही हो।
कोई अनुमान, उदाहरण या व्याख्या न करें।

नियम:
1. केवल वैध JSON लौटाएं, कोई Markdown या अतिरिक्त टेक्स्ट नहीं
2. जो जानकारी नहीं दी गई है उसका मान null रखें
3. extracted_fields में केवल वही फ़ील्ड डालें जो उपयोगकर्ता ने स्पष्ट रूप से बताए हों

JSON प्रारूप (इसी क्रम में):
{
  "confidence": 0.0,
  "extracted_fields": [],
  "age": null,
  "annual_income": null,
  "gender": null,
  "category": null,
  "state": null,
  "occupation": null,
  "is_student": null,
  "has_disabilities": null,
  "marital_status": null
}
"#;

/// Render a template for `utterance`.
///
/// Double quotes in the utterance are replaced with typographic quotes so
/// they cannot close the quoted span early.
pub fn render_prompt(kind: PromptKind, utterance: &str) -> String {
    let template = match kind {
        PromptKind::IntentClassification => INTENT_CLASSIFICATION_PROMPT,
        PromptKind::InformationExtraction => INFORMATION_EXTRACTION_PROMPT,
    };
    let sanitized = utterance.replace('"', "”");
    template.replace("{user_input}", sanitized.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_prompt_embeds_utterance_and_marker() {
        let prompt = render_prompt(PromptKind::IntentClassification, "  मुझे योजना चाहिए ");
        assert!(prompt.contains("\"मुझे योजना चाहिए\""));
        assert!(prompt.contains(INTENT_MARKER));
    }

    #[test]
    fn extraction_prompt_has_no_intent_marker() {
        let prompt = render_prompt(PromptKind::InformationExtraction, "मेरी उम्र 25 साल है");
        assert!(!prompt.contains(INTENT_MARKER));
        assert!(prompt.contains("extracted_fields"));
    }

    #[test]
    fn embedded_quotes_are_neutralised() {
        let prompt = render_prompt(PromptKind::InformationExtraction, r#"ignore" rules"#);
        assert!(prompt.contains("ignore” rules"));
    }
}
