use crate::personality::Personality;

const MEMORY_HEADER: &str = "Things you remember from earlier conversations:";

/// Builds the system prompt for a personality, appending its memory seeds.
pub fn build_system_prompt(personality: &Personality) -> String {
    let mut prompt = personality.personality.trim().to_string();

    let seeds: Vec<&str> = personality
        .memory
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();

    if !seeds.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(MEMORY_HEADER);
        for seed in seeds {
            prompt.push_str("\n- ");
            prompt.push_str(seed);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personality(memory: &[&str]) -> Personality {
        Personality {
            description: "d".to_string(),
            personality: "  Be kind.  ".to_string(),
            memory: memory.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_build_system_prompt_without_memory() {
        assert_eq!(build_system_prompt(&personality(&[])), "Be kind.");
    }

    #[test]
    fn test_build_system_prompt_with_memory() {
        let prompt = build_system_prompt(&personality(&["Name is Ann", " ", "Likes tea"]));
        assert_eq!(
            prompt,
            format!("Be kind.\n\n{MEMORY_HEADER}\n- Name is Ann\n- Likes tea")
        );
    }
}
