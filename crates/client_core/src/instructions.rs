#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const INSTRUCTION_TEMPLATES: [InstructionTemplate; 5] = [
    InstructionTemplate {
        id: "improve",
        name: "Improve Writing",
        prompt: "Improve this text by enhancing clarity, flow, and style while maintaining the original message and tone.",
    },
    InstructionTemplate {
        id: "academic",
        name: "Academic Style",
        prompt: "Rewrite this in formal academic style with proper citations and scholarly tone.",
    },
    InstructionTemplate {
        id: "simplify",
        name: "Simplify",
        prompt: "Simplify this text to make it more accessible, using shorter sentences and simpler vocabulary.",
    },
    InstructionTemplate {
        id: "creative",
        name: "Creative Rewrite",
        prompt: "Rewrite this text in a more creative and engaging way, using vivid language and imagery.",
    },
    InstructionTemplate {
        id: "professional",
        name: "Professional",
        prompt: "Rewrite this for a professional business context, focusing on clarity and impact.",
    },
];

/// Template whose prompt matches `instruction` exactly, if any.
pub fn template_for_instruction(instruction: &str) -> Option<&'static InstructionTemplate> {
    let instruction = instruction.trim();
    INSTRUCTION_TEMPLATES
        .iter()
        .find(|template| template.prompt == instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_matched_by_prompt() {
        let simplify = &INSTRUCTION_TEMPLATES[2];
        assert_eq!(simplify.id, "simplify");
        assert_eq!(
            template_for_instruction(&format!("  {}\n", simplify.prompt)),
            Some(simplify)
        );
        assert_eq!(template_for_instruction("make it shorter"), None);
    }
}
