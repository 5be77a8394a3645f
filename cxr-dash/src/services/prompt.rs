//! Report prompt rendering
//!
//! The template is configuration (`explanation.prompt_template`); only the
//! placeholder substitution lives here.

use cxr_common::events::ClassificationLabel;

pub const LABEL_PLACEHOLDER: &str = "{label}";
pub const CONFIDENCE_PLACEHOLDER: &str = "{confidence}";

/// Default report instructions
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Act as a senior radiologist reviewing a chest X-ray and write a brief clinical-style report.
The screening model reported: {label} with {confidence}% confidence.

If the finding is Pneumonia, describe the radiographic signs typically associated with it, \
such as opacities, consolidation, or pleural effusion patterns.
If the finding is Normal, describe clear lung fields, normal heart size, and sharp costophrenic angles.

Structure the report under exactly these headings:
1. Clinical Findings
2. Radiographic Impression
3. Suggested Next Steps

Keep it professional, clinical, and concise.
End with this line: Disclaimer: This is an AI-assisted simulation and not a medical diagnosis.";

/// Substitute label and confidence (one decimal place) into a template
pub fn render_prompt(template: &str, label: ClassificationLabel, confidence: f64) -> String {
    template
        .replace(LABEL_PLACEHOLDER, label.as_str())
        .replace(CONFIDENCE_PLACEHOLDER, &format!("{:.1}", confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_renders_all_sections() {
        let prompt = render_prompt(DEFAULT_PROMPT_TEMPLATE, ClassificationLabel::Pneumonia, 91.0);

        assert!(prompt.contains("Pneumonia with 91.0% confidence"));
        assert!(prompt.contains("Clinical Findings"));
        assert!(prompt.contains("Radiographic Impression"));
        assert!(prompt.contains("Suggested Next Steps"));
        assert!(prompt.contains("AI-assisted simulation"));
        assert!(!prompt.contains(LABEL_PLACEHOLDER));
        assert!(!prompt.contains(CONFIDENCE_PLACEHOLDER));
    }

    #[test]
    fn test_custom_template() {
        let prompt = render_prompt("{label}/{confidence}/{label}", ClassificationLabel::Normal, 87.456);
        assert_eq!(prompt, "Normal/87.5/Normal");
    }
}
