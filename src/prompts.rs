// Prompt templates for every Answerer capability.
// Placeholders are `{name}` and are substituted with `fill`.

pub const SUMMARIZE_TEMPLATE: &str = "\
As a seasoned HR expert, extract the key requirements, responsibilities and \
qualifications from the job description below. Keep it short and factual. \
Do not add commentary.

Job description:
{text}";

pub const DETERMINE_SECTION_TEMPLATE: &str = "\
You are assisting a bot designed to automatically apply for jobs. Decide which \
section of the candidate's resume or profile holds the data needed to answer \
the question below.

Sections:
1. Personal information: name, contact details, links, location.
2. Self Identification: gender, pronouns, veteran status, disability, ethnicity.
3. Legal Authorization: work authorization, visa sponsorship, relocation rights.
4. Work Preferences: remote work, in-person work, travel, relocation, schedules.
5. Education Details: degrees, institutions, grades, courses.
6. Experience Details: positions, employers, durations, responsibilities, skills.
7. Projects: personal or professional projects.
8. Availability: notice period, start date.
9. Salary Expectations: compensation range.
10. Certifications: professional certifications.
11. Languages: spoken languages and proficiency.
12. Interests: professional and personal interests.
13. Cover letter: requests to write a cover letter or motivation text.

Answer with the section name only.

Question: {question}";

pub const SECTION_ANSWER_TEMPLATE: &str = "\
You are filling out a job application on behalf of the candidate. Answer the \
question in first person, concisely and truthfully, using only the {section} \
data below. If the data does not cover the question, give the most reasonable \
short answer consistent with it. Return only the answer.

{section} data:
{context}

Question: {question}";

pub const COVER_LETTER_TEMPLATE: &str = "\
Write a short, professional cover letter (three paragraphs at most) for the \
job below, addressed to {company}. Use only facts from the candidate's resume. \
Do not include placeholders, addresses or a signature block.

Job description:
{job_description}

Resume:
{resume}";

pub const NUMERIC_TEMPLATE: &str = "\
You are filling out a job application on behalf of the candidate. The question \
below expects a number. Using the candidate's education, experience and \
projects, answer with a single integer and nothing else. If unsure, estimate.

Candidate data:
{context}

Question: {question}";

pub const OPTIONS_TEMPLATE: &str = "\
You are filling out a job application on behalf of the candidate. Choose the \
single best option for the question below based on the candidate's profile. \
Reply with the exact text of one option and nothing else.

Candidate profile:
{context}

Question: {question}
Options: {options}";

pub const RESUME_OR_COVER_TEMPLATE: &str = "\
Given the heading of a file upload field on a job application form, answer \
'resume' if it asks for a resume/CV or 'cover' if it asks for a cover letter. \
Reply with one word.

Heading: {phrase}";

pub const IS_RELEVANT_POSITION_TEMPLATE: &str = "\
Evaluate how well the candidate fits the job on a scale from 1 to 10, taking \
the work preferences into account. Respond exactly in this format:
Score: <integer 1-10>
Reasoning: <two or three sentences>

Work preferences:
{work_preferences}

Resume:
{resume}

Job description:
{job_description}";

pub const WORK_PREFERENCES_MATCH_TEMPLATE: &str = "\
Decide whether the job matches the candidate's work preferences (location, \
remote/hybrid/onsite, seniority, positions). Respond with a JSON object only, \
no markdown fences, in this exact shape:
{\"match\": true, \"reason\": \"short reason\"}

Work preferences:
{work_preferences}

Job:
{job}";

pub const TAILOR_RESUME_TEMPLATE: &str = "\
You are an expert resume writer. Generate a complete resume tailored to the \
job below, in plain text with simple section headings. Stay strictly truthful: \
only use facts present in the candidate profile. Return the resume only.

Job description:
{job_description}

Candidate profile:
{resume}";

/// Substitutes `{key}` placeholders in a template in a single pass.
/// Substituted text is never rescanned; unknown placeholders are kept verbatim.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = tail.find('}').and_then(|end| {
            let key = &tail[1..end];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let prompt = fill(
            SECTION_ANSWER_TEMPLATE,
            &[("section", "Languages"), ("context", "- German"), ("question", "Do you speak German?")],
        );
        assert!(prompt.contains("using only the Languages"));
        assert!(prompt.contains("Languages data:\n- German"));
        assert!(!prompt.contains("{section}"));
    }

    #[test]
    fn test_fill_keeps_literal_json_braces() {
        let prompt = fill(WORK_PREFERENCES_MATCH_TEMPLATE, &[("work_preferences", "remote"), ("job", "SRE")]);
        assert!(prompt.contains("{\"match\": true"));
    }

    #[test]
    fn test_fill_does_not_rescan_substituted_values() {
        let prompt = fill(
            "Q: {question}\nOptions: {options}",
            &[("question", "Pick from {options} below"), ("options", "Yes, No")],
        );
        assert_eq!(prompt, "Q: Pick from {options} below\nOptions: Yes, No");
    }
}
