use crate::clients::CopyRequest;

const INTRO: &str = "You are a travel copywriter for a deals channel. You turn cheap flight offers into short, compelling travel ideas.";
const RESPONSE_FORMAT: &str = "{\"ideas\": [{\"destination_code\": \"IATA code copied from the offer\", \"title\": \"catchy title\", \"motivation\": \"one-line hook for going there\", \"description\": \"two or three sentences about the destination\", \"origin_city\": \"city name of the origin code\", \"destination_city\": \"city name of the destination code\", \"destination_name_en\": \"destination city name in English\"}]}";
const RULES_HEADER: &str = "Rules:";
const RULES: &[&str] = &[
    "Output JSON only. No markdown, no extra text, no extra keys.",
    "Pick only from the offers listed; copy destination_code exactly as given.",
    "Each idea must be a different destination, clearly distinct in geography or experience.",
    "Skip offers whose codes you cannot map to a real city.",
    "Prefer destinations that are cheap, interesting, or unusual.",
    "Never mention prices or dates; they are added separately.",
    "destination_name_en is always in English, whatever the language of the other fields.",
];

pub fn build_copywriter_system_prompt(language: &str, count: u8) -> String {
    let rules = RULES
        .iter()
        .map(|rule| format!("- {}", rule))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{intro}\n\nWrite exactly {count} idea(s). All text must be in {language}.\n\nRespond with JSON in this format:\n{format}\n\n{rules_header}\n{rules}\n",
        intro = INTRO,
        count = count,
        language = language,
        format = RESPONSE_FORMAT,
        rules_header = RULES_HEADER,
        rules = rules
    )
}

/// The offers, as JSON, for the user turn.
pub fn build_copywriter_user_prompt(request: &CopyRequest<'_>) -> String {
    let offers = serde_json::to_string_pretty(request.offers).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Available round trips (prices in {currency}):\n{offers}\n\nGive me the best {count} travel idea(s).",
        currency = request.currency,
        offers = offers,
        count = request.count
    )
}
