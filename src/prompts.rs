use crate::budget::cap_transcript;

pub const GOD_ROLL_PROMPT: &str = r#"
Analyze this Destiny 2 video transcript and extract god roll weapon recommendations.

OUTPUT FORMAT - Return ONLY a valid JSON array, no markdown, no explanation:
[
  {
    "weapon": "Exact weapon name as shown in game",
    "mode": "PvE" or "PvP" or "Both",
    "perks": ["Perk Name 1", "Perk Name 2", "Perk Name 3"],
    "notes": "Any relevant context from the video",
    "timestamp": "MM:SS"
  }
]

RULES:
1. Use EXACT Destiny 2 perk names with proper capitalization (e.g., "Kill Clip", "Slideshot", "Vorpal Weapon")
2. Include ALL perks mentioned for each roll (barrels, magazines, traits)
3. If the creator says "or" between perks, include all options in the perks array
4. Separate PvE and PvP rolls as different entries if they have different perks
5. If no god rolls are discussed in the video, return: []
6. Output ONLY valid JSON - no markdown code blocks, no text before or after

TRANSCRIPT:
"#;

pub fn compose_prompt(template: &str, transcript: &str, cap: usize) -> String {
    let transcript = cap_transcript(transcript, cap);
    let mut prompt = String::with_capacity(template.len() + transcript.len());
    prompt.push_str(template);
    prompt.push_str(transcript);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_template_then_transcript() {
        let p = compose_prompt("INSTRUCTIONS:\n", "kill clip and rampage", 100);
        assert_eq!(p, "INSTRUCTIONS:\nkill clip and rampage");
    }

    #[test]
    fn test_transcript_is_capped_but_template_is_not() {
        let p = compose_prompt(GOD_ROLL_PROMPT, &"z".repeat(50), 10);
        assert!(p.starts_with(GOD_ROLL_PROMPT));
        assert_eq!(p.len(), GOD_ROLL_PROMPT.len() + 10);
    }
}
