//! Prompt templates and rendering.
//!
//! The persona role-play prompt is a `{placeholder}` template rendered
//! against the persona attribute map. A placeholder with no matching
//! attribute is a hard `MissingField` error: a malformed persona must not
//! silently produce a degraded prompt.

use crate::error::PipelineError;
use crate::types::{BasePersona, Persona};
use std::collections::BTreeMap;

/// System prompt putting the model in character as one elderly Iranian.
pub const INTERVIEW_SYSTEM_PROMPT: &str = "\
شما یک مدل زبانی هستید که باید نقش یک «سالمند ایرانی» را ایفا کنید و به پرسش‌ها به زبان فارسی پاسخ دهید.
حتماً لحن و ویژگی‌های شخصیتی داده‌شده را رعایت کنید و پاسخ‌ها را طبیعی و منسجم بنویسید.
شما باید در این مکالمه نقش زیر را بازی کنید و به همه پرسش‌ها با حفظ کامل شخصیت، لحن، و جهان‌بینی این فرد پاسخ دهید.
تاریخچه گفتگو داده شده است.

[اطلاعات شخصیت]
سن: {age}
جنسیت: {gender}
تحصیلات: {level_of_education}
شغل سابق: {occupation}
وضعیت مالی: {financial_status}
وضعیت تاهل: {marital_status}
صفات شخصیتی: {personality_traits}
پیشینه و سبک زندگی: {background}
مذهب: {religion}
سلامت معنوی در موقعیت کاهش استقلال: {spiritual_health_loss_of_independence}
سلامت معنوی در موقعیت کاهش کنشگری اجتماعی: {spiritual_health_loss_of_social_activity}
سلامت معنوی با وجود کاهش سلامت جسمی و مشکلات جنسی: {spiritual_health_physical_health_and_sexual_issues}
سلامت معنوی هنگام مرگ نزدیکان و ترس از مرگ: {spiritual_health_loss_of_close_ones_and_fear_of_death}
سلامت معنوی در موقعیت کاهش ارتباطات خانوادگی: {spiritual_health_loss_of_family_connections}
سلامت معنوی در شرایط تغییر سبک زندگی: {spiritual_health_lifestyle_changes}
سلامت معنوی در موقعیت کاهش درآمد مالی: {spiritual_health_loss_of_income}
سلامت معنوی در موقعیت بیآرمانی: {spiritual_health_loss_of_aspiration}
سلامت معنوی در مواجهه با نیاز به یکپارچگی زندگی: {spiritual_health_life_integrity}

[دستورالعمل‌ها]
- فقط به فارسی پاسخ بده و اصلا از اصطلاحات و کلمات انگلیسی استفاده نکن
- از اصطلاحات و لحن متناسب با شخصیت استفاده کن
- نیازی نیست شخصیت اول صحبت خود سلام یا احوال پرسی کند. شما در میانه یک مصاحبه هستید.
- از کلمات، اصطلاحات، و مثال‌هایی استفاده کن که با سن، تجربه، و فرهنگ این شخصیت هماهنگ باشد.
- شخصیت باید در طول مکالمه ثابت بماند و تغییر نکند.
- اگر کاربر سوالی خارج از تخصص یا تجربه شخصیت پرسید، با توجه به محدودیت‌های دانشی و دیدگاه‌های او پاسخ بده.
- در لحن نوشتار، سبک گفتاری شخصیت را حفظ کن.
- پاسخ‌ها باید در یک پاراگراف و ۲ الی ۱۰ جمله باشد.
";

pub const INTERVIEW_ANSWER_PROMPT: &str = "\
پرسش: {question}

پاسخ خود را مانند شخصیت تعریف شده بنویس.
";

/// Render a `{placeholder}` template against a value map. Unmatched
/// placeholders raise `MissingField` naming the offending field.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> Result<String, PipelineError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) => {
                let name = &after_open[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => return Err(PipelineError::MissingField(name.to_string())),
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // Unterminated brace, keep it verbatim.
                out.push('{');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Build the role-play system prompt for one persona.
pub fn format_system_prompt(persona: &Persona) -> Result<String, PipelineError> {
    render(INTERVIEW_SYSTEM_PROMPT, &persona.attributes())
}

/// Build the per-question user prompt.
pub fn format_answer_prompt(question: &str) -> String {
    INTERVIEW_ANSWER_PROMPT.replace("{question}", question)
}

/// System prompt for the answer-analysis pass.
pub fn analysis_system_prompt() -> &'static str {
    "\
شما یک روانشناس متخصص سالمندان هستید. لطفاً پاسخ زیر را تحلیل کنید و نشانگرهای سلامت روان را شناسایی کنید.

برای هر نشانگر شناسایی شده، موارد زیر را مشخص کنید:
- aspect: \"emotion\" (هیجان)، \"belief\" (باور)، یا \"behavior\" (رفتار)
- subject: موضوع دقیق از نقشه ذهنی
- based_on_answer: بخشی از پاسخ کاربر که این شناسایی بر اساس آن انجام شده
- reasoning: توضیح اینکه چرا این نشانگر انتخاب شده از منظر روانشناسی

به عنوان یک روانشناس متخصص سالمندان، پاسخ های کاربر را به صورت جامع و دقیق تحلیل کنید و نشانگرهای سلامت روان را شناسایی کنید.
گام به گام جواب های کاربر را تحلیل کنید و دلایل منطقی انتخاب را بیان کنید.
"
}

/// User prompt for the analysis pass. The mind-map taxonomy and the
/// subject descriptions are embedded verbatim; their structure is opaque
/// to this code beyond being valid JSON.
pub fn analysis_user_prompt(
    question: &str,
    answer: &str,
    mindmap: &serde_json::Value,
    subjects: &serde_json::Value,
) -> String {
    format!(
        "\
سوال: {question}
پاسخ کاربر: {answer}

نشانگرهای سلامت روان:
{mindmap}

توضیحات موضوعات سلامت روان:
{subjects}

لطفاً نشانگرهای سلامت روان را در این پاسخ شناسایی کنید. یک پاسخ می‌تواند چندین نشانگر سالم و یا ناسالم داشته باشد.

لطفاً پاسخ را در قالب JSON زیر ارائه دهید:
{{
    \"unhealthy\": [
        {{
            \"aspect\": \"emotion/belief/behavior\",
            \"subject\": \"موضوع از نقشه ذهنی\",
            \"based_on_answer\": \"بخشی از پاسخ کاربر\",
            \"reasoning\": \"توضیح انتخاب\"
        }}
    ],
    \"healthy\": [
        {{
            \"aspect\": \"emotion/belief/behavior\",
            \"subject\": \"موضوع از نقشه ذهنی\",
            \"based_on_answer\": \"بخشی از پاسخ کاربر\",
            \"reasoning\": \"توضیح انتخاب\"
        }}
    ]
}}",
        question = question,
        answer = answer,
        mindmap = serde_json::to_string_pretty(mindmap).unwrap_or_else(|_| "{}".to_string()),
        subjects = serde_json::to_string_pretty(subjects).unwrap_or_else(|_| "{}".to_string()),
    )
}

/// System prompt asking the model to invent complete personas from scratch.
pub const PERSONA_GENERATION_PROMPT: &str = "\
You must generate a set of fictional but realistic Iranian elderly personas that represent cultural, geographical, and social diversity in Iran.

Rules:
- All personas must be elderly (age 65-90).
- Diversity must be reflected across all components, but keep the integrity and realism of each persona.
- Personas should reflect cultural and social realities of Iran.
- Reactions and attitudes do not need to be \"correct\" or \"moral\"; they may be shaped by culture, personal experience, or limitations.
- Personality traits and psychological states should be consistent with the individual's background.
- Return a JSON array of persona objects with English keys and Farsi values.
- Do not omit any variable.
";

/// Build the constrained completion prompt: the base demographic fields are
/// given and must be copied through unchanged; the model fills in only the
/// remaining profile attributes.
pub fn constrained_persona_prompt(base_personas: &[BasePersona]) -> String {
    let base_json = serde_json::to_string_pretty(base_personas)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "{PERSONA_GENERATION_PROMPT}
The following personas already have their demographic fields fixed by
statistical sampling. Complete each persona by filling in every missing
field (education, occupation, financial status, personality traits,
background and lifestyle, and the nine spiritual-health stances).

Hard constraint: copy the given fields through EXACTLY as provided. Do not
change age, gender, marital_status, children, living_situation, ethnicity,
language, or religion_and_sect for any persona.

Base personas:
{base_json}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::collections::BTreeMap;

    fn full_persona() -> Persona {
        let mut profile = BTreeMap::new();
        for key in [
            "level_of_education",
            "occupation",
            "financial_status",
            "personality_traits",
            "background",
            "religion",
            "spiritual_health_loss_of_independence",
            "spiritual_health_loss_of_social_activity",
            "spiritual_health_physical_health_and_sexual_issues",
            "spiritual_health_loss_of_close_ones_and_fear_of_death",
            "spiritual_health_loss_of_family_connections",
            "spiritual_health_lifestyle_changes",
            "spiritual_health_loss_of_income",
            "spiritual_health_loss_of_aspiration",
            "spiritual_health_life_integrity",
        ] {
            profile.insert(key.to_string(), serde_json::Value::String("---".to_string()));
        }

        Persona {
            id: "p1".to_string(),
            base: BasePersona {
                age: 70,
                gender: Gender::Male,
                marital_status: MaritalStatus::Married,
                children: ChildrenBand::TwoToThree,
                living_situation: LivingSituation::WithFamily,
                ethnicity: Ethnicity::Persian,
                language: "Persian".to_string(),
                religion_and_sect: Religion::ShiaMuslim,
            },
            profile,
        }
    }

    #[test]
    fn system_prompt_substitutes_every_placeholder() {
        let prompt = format_system_prompt(&full_persona()).unwrap();
        assert!(!prompt.contains('{'), "unsubstituted placeholder in:\n{prompt}");
        assert!(prompt.contains("سن: 70"));
    }

    #[test]
    fn missing_field_is_an_explicit_error() {
        let mut persona = full_persona();
        persona.profile.remove("occupation");

        match format_system_prompt(&persona) {
            Err(PipelineError::MissingField(field)) => assert_eq!(field, "occupation"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn render_keeps_unterminated_brace_verbatim() {
        let values = BTreeMap::from([("a".to_string(), "x".to_string())]);
        assert_eq!(render("{a} and {rest", &values).unwrap(), "x and {rest");
    }

    #[test]
    fn answer_prompt_embeds_question() {
        let prompt = format_answer_prompt("سوال تستی");
        assert!(prompt.contains("سوال تستی"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn analysis_prompt_embeds_taxonomy_verbatim() {
        let mindmap = serde_json::json!({"رنج": ["فقر", "تنهایی"]});
        let subjects = serde_json::json!({"loss_of_income": "کاهش درآمد"});
        let prompt = analysis_user_prompt("q", "a", &mindmap, &subjects);
        assert!(prompt.contains("فقر"));
        assert!(prompt.contains("loss_of_income"));
        // The JSON shape skeleton survives the format! escaping.
        assert!(prompt.contains("\"unhealthy\": ["));
    }

    #[test]
    fn constrained_prompt_embeds_base_fields() {
        let base = vec![full_persona().base];
        let prompt = constrained_persona_prompt(&base);
        assert!(prompt.contains("\"age\": 70"));
        assert!(prompt.contains("Shia Muslim"));
    }
}
