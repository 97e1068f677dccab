use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{Question, SelectKind, SelectQuestion, TextBoxKind, TextBoxQuestion};

const AGREEMENT_KEYWORDS: &[&str] = &[
    "agree",
    "consent",
    "terms",
    "privacy",
    "acknowledge",
    "certify",
];

const TEXT_INPUT_TYPES: &[&str] = &["text", "number", "email", "tel", "url", "search"];

struct Selectors {
    file: Selector,
    checkbox: Selector,
    choice: Selector,
    textarea: Selector,
    input: Selector,
    select: Selector,
    option: Selector,
    heading: Selector,
    label: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |s: &str| Selector::parse(s).expect("static selector is valid");
        Selectors {
            file: parse("input[type='file']"),
            checkbox: parse("input[type='checkbox']"),
            choice: parse("input[type='radio'], input[type='checkbox']"),
            textarea: parse("textarea"),
            input: parse("input"),
            select: parse("select"),
            option: parse("option"),
            heading: parse("legend, .application-label, label, h3, h4"),
            label: parse("label"),
        }
    })
}

/// Classifies one form section into a typed question.
///
/// Predicates run in a fixed order: upload, agreement, radio/checkbox group,
/// text box, dropdown. Upload and agreement controls are checkbox-like too,
/// so they have to be ruled out before the generic group check.
pub fn classify(section_html: &str) -> Option<Question> {
    let fragment = Html::parse_fragment(section_html);
    let root = fragment.root_element();
    let sel = selectors();

    if root.select(&sel.file).next().is_some() {
        let heading = question_text(root).unwrap_or_else(|| section_text(root));
        return Some(Question::Upload { heading });
    }

    let checkboxes: Vec<ElementRef> = root.select(&sel.checkbox).collect();
    let choices: Vec<ElementRef> = root.select(&sel.choice).collect();
    if is_agreement_group(root, &checkboxes, choices.len()) {
        return Some(Question::Agreement {
            text: question_text(root).unwrap_or_else(|| section_text(root)),
        });
    }

    if !choices.is_empty() {
        let kind = if checkboxes.is_empty() {
            SelectKind::SingleSelect
        } else {
            SelectKind::MultiSelect
        };
        let options = dedup(choices.iter().map(|input| choice_label(root, *input)));
        let (question, marked) = question_and_marker(root);
        return Some(Question::Radio(SelectQuestion {
            question,
            options,
            kind,
            required: marked || choices.iter().any(|c| is_required(*c)),
        }));
    }

    if let Some(field) = text_field(root) {
        let numeric = field.value().attr("type") == Some("number")
            || field.value().attr("inputmode") == Some("numeric");
        let (question, marked) = question_and_marker(root);
        return Some(Question::TextBox(TextBoxQuestion {
            question,
            kind: if numeric {
                TextBoxKind::Numeric
            } else {
                TextBoxKind::Text
            },
            required: marked || is_required(field),
        }));
    }

    if let Some(select) = root.select(&sel.select).next() {
        let kind = if select.value().attr("multiple").is_some() {
            SelectKind::MultiSelect
        } else {
            SelectKind::SingleSelect
        };
        let options = dedup(
            select
                .select(&sel.option)
                .filter(|o| !is_placeholder_option(*o))
                .map(|o| collapse(&o.text().collect::<String>())),
        );
        let (question, marked) = question_and_marker(root);
        return Some(Question::Dropdown(SelectQuestion {
            question,
            options,
            kind,
            required: marked || is_required(select),
        }));
    }

    debug!(section = %section_text(root), "Ignoring unrecognized form section");
    None
}

fn is_agreement(text: &str) -> bool {
    let lower = text.to_lowercase();
    AGREEMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A lone consent checkbox, or a checkbox-only group whose every box is a consent.
fn is_agreement_group(root: ElementRef<'_>, checkboxes: &[ElementRef<'_>], choices: usize) -> bool {
    match checkboxes {
        [] => false,
        [_] => is_agreement(&section_text(root)),
        many => choices == many.len() && many.iter().all(|c| is_agreement(&choice_label(root, *c))),
    }
}

fn text_field(root: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let sel = selectors();
    if let Some(area) = root.select(&sel.textarea).find(|e| is_usable(*e)) {
        return Some(area);
    }
    root.select(&sel.input).find(|e| {
        let kind = e.value().attr("type").unwrap_or("text").to_lowercase();
        TEXT_INPUT_TYPES.contains(&kind.as_str()) && is_usable(*e)
    })
}

fn is_usable(el: ElementRef<'_>) -> bool {
    el.value().attr("disabled").is_none() && el.value().attr("type") != Some("hidden")
}

fn is_required(el: ElementRef<'_>) -> bool {
    el.value().attr("required").is_some() || el.value().attr("aria-required") == Some("true")
}

fn is_placeholder_option(option: ElementRef<'_>) -> bool {
    let value = option.value().attr("value").unwrap_or("").trim();
    let text = collapse(&option.text().collect::<String>());
    text.is_empty() || (value.is_empty() && text.to_lowercase().starts_with("select"))
}

/// True for labels that belong to one option of a radio/checkbox group.
fn is_option_label(root: ElementRef<'_>, label: ElementRef<'_>) -> bool {
    if label.select(&selectors().choice).next().is_some() {
        return true;
    }
    match label.value().attr("for") {
        Some(target) => root
            .select(&selectors().choice)
            .any(|input| input.value().id() == Some(target)),
        None => false,
    }
}

fn question_text(root: ElementRef<'_>) -> Option<String> {
    root.select(&selectors().heading)
        .filter(|h| !(h.value().name() == "label" && is_option_label(root, *h)))
        .map(|h| collapse(&h.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

/// Question text with the vendor's required marker stripped, and whether it was present.
fn question_and_marker(root: ElementRef<'_>) -> (String, bool) {
    let raw = question_text(root).unwrap_or_else(|| section_text(root));
    let stripped = raw.trim_end_matches(['*', '✱', ' ']).to_string();
    let marked = stripped.len() != raw.len();
    (stripped, marked)
}

fn choice_label(root: ElementRef<'_>, input: ElementRef<'_>) -> String {
    if let Some(id) = input.value().id() {
        let labelled = root
            .select(&selectors().label)
            .find(|l| l.value().attr("for") == Some(id))
            .map(|l| collapse(&l.text().collect::<String>()))
            .filter(|t| !t.is_empty());
        if let Some(text) = labelled {
            return text;
        }
    }
    let enclosing = input
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "label")
        .map(|l| collapse(&l.text().collect::<String>()))
        .filter(|t| !t.is_empty());
    enclosing.unwrap_or_else(|| input.value().attr("value").unwrap_or("").trim().to_string())
}

fn section_text(root: ElementRef<'_>) -> String {
    collapse(&root.text().collect::<Vec<_>>().join(" "))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_wins_over_everything() {
        let html = r#"<div><label>Resume/CV *</label>
            <input type="file" name="resume"><input type="checkbox" id="c"><label for="c">I agree</label></div>"#;
        assert_eq!(
            classify(html),
            Some(Question::Upload { heading: "Resume/CV *".into() })
        );
    }

    #[test]
    fn test_single_consent_checkbox_is_agreement() {
        let html = r#"<div><label><input type="checkbox" name="consent">
            I have read and agree to the Privacy Policy</label></div>"#;
        match classify(html) {
            Some(Question::Agreement { text }) => assert!(text.contains("Privacy Policy")),
            other => panic!("expected agreement, got {:?}", other),
        }
    }

    #[test]
    fn test_consent_checkbox_group_is_agreement() {
        let html = r#"<fieldset><legend>Consent</legend>
            <label><input type="checkbox" name="c1"> I agree to the Terms of Service</label>
            <label><input type="checkbox" name="c2"> I consent to processing under the Privacy Policy</label>
            </fieldset>"#;
        assert_eq!(
            classify(html),
            Some(Question::Agreement { text: "Consent".into() })
        );
    }

    #[test]
    fn test_mixed_checkbox_group_is_not_agreement() {
        let html = r#"<fieldset><legend>Anything else?</legend>
            <label><input type="checkbox" value="t"> I agree to the terms</label>
            <label><input type="checkbox" value="n"> Subscribe to the newsletter</label>
            </fieldset>"#;
        assert!(matches!(classify(html), Some(Question::Radio(_))));
    }

    #[test]
    fn test_radio_group_preserves_option_order() {
        let html = r#"<fieldset><legend>Do you require visa sponsorship? *</legend>
            <input type="radio" id="y" name="v" value="1"><label for="y">Yes</label>
            <input type="radio" id="n" name="v" value="0"><label for="n">No</label>
            </fieldset>"#;
        let question = classify(html).unwrap();
        assert_eq!(question.cache_type(), "radio");
        match question {
            Question::Radio(q) => {
                assert_eq!(q.question, "Do you require visa sponsorship?");
                assert_eq!(q.options, vec!["Yes", "No"]);
                assert_eq!(q.kind, SelectKind::SingleSelect);
                assert!(q.required);
            }
            other => panic!("expected radio, got {:?}", other),
        }
    }

    #[test]
    fn test_checkbox_group_is_multi_select() {
        let html = r#"<div><label class="application-label">Which languages do you know?</label>
            <label><input type="checkbox" value="rust">Rust</label>
            <label><input type="checkbox" value="go">Go</label>
            <label><input type="checkbox" value="go2">Go</label></div>"#;
        match classify(html) {
            Some(Question::Radio(q)) => {
                assert_eq!(q.kind, SelectKind::MultiSelect);
                assert_eq!(q.options, vec!["Rust", "Go"]);
                assert_eq!(q.question, "Which languages do you know?");
                assert!(!q.required);
            }
            other => panic!("expected checkbox group, got {:?}", other),
        }
    }

    #[test]
    fn test_number_input_is_numeric() {
        let html = r#"<div><label for="y">Years of Rust experience</label>
            <input type="number" id="y" required></div>"#;
        match classify(html) {
            Some(Question::TextBox(q)) => {
                assert_eq!(q.kind, TextBoxKind::Numeric);
                assert!(q.required);
                assert_eq!(q.question, "Years of Rust experience");
            }
            other => panic!("expected text box, got {:?}", other),
        }
    }

    #[test]
    fn test_hidden_and_disabled_inputs_are_ignored() {
        let html = r#"<div><input type="hidden" name="token"><input type="text" disabled></div>"#;
        assert_eq!(classify(html), None);
    }

    #[test]
    fn test_textarea_is_text() {
        let html = r#"<div><label>Why this role?</label><textarea></textarea></div>"#;
        assert_eq!(classify(html).unwrap().cache_type(), "text");
    }

    #[test]
    fn test_dropdown_skips_placeholder_and_detects_multiple() {
        let html = r#"<div><label>Country ✱</label><select multiple>
            <option value="">Select...</option><option>Germany</option><option>France</option>
            </select></div>"#;
        match classify(html) {
            Some(Question::Dropdown(q)) => {
                assert_eq!(q.options, vec!["Germany", "France"]);
                assert_eq!(q.kind, SelectKind::MultiSelect);
                assert_eq!(q.question, "Country");
                assert!(q.required);
            }
            other => panic!("expected dropdown, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_section_is_ignored() {
        assert_eq!(classify("<div><p>Voluntary self-identification</p></div>"), None);
    }
}
