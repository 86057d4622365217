//! Prompt templates
//!
//! Pure string formatting behind a trait so deployments can swap the
//! wording (language, audience) without touching orchestration.

use crate::models::{CharacterProfile, LearningStep, MusicRequest, RequestParameters};

/// Fixed name of the recurring character
pub const CHARACTER_NAME: &str = "Lele";

pub trait PromptBuilder: Send + Sync {
    /// Ask the model to split a goal into steps plus a character sheet (JSON)
    fn decompose(&self, params: &RequestParameters) -> String;

    fn lyrics(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> String;

    fn image(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> String;

    /// Song submission for a step; `lyrics` is used verbatim when present
    fn music(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        lyrics: Option<&str>,
    ) -> MusicRequest;
}

/// Style tags sent with song submissions
pub fn style_tags(music_style: &str) -> &'static str {
    match music_style.trim().to_ascii_lowercase().as_str() {
        "soothing piano" | "gentle piano" => {
            "gentle piano, soft, calming, peaceful, but still upbeat and cheerful"
        }
        "lively" | "lively children's song" => {
            "lively children song, upbeat, cheerful, fun, energetic, bouncy"
        }
        "rhythmic" | "strong rhythm" => "rhythmic, energetic, engaging, upbeat, lively",
        "warm nursery rhyme" | "nursery rhyme" => {
            "warm nursery rhyme, sweet, tender, but cheerful and light"
        }
        _ => "children song, gentle, educational, upbeat, cheerful",
    }
}

/// English templates for young learners
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrompts;

impl PromptBuilder for DefaultPrompts {
    fn decompose(&self, params: &RequestParameters) -> String {
        let focus = params.learning_focus.trim();
        let focus_line = if focus.is_empty() {
            String::new()
        } else {
            format!("\nLearning focus: {}", focus)
        };
        let focus_rule = if focus.is_empty() {
            String::new()
        } else {
            format!("- Every step revolves around the learning focus \"{}\".\n", focus)
        };

        format!(
            r#"You are a special-education expert designing learning plans for children aged 3 to 6.

Goal: {goal}{focus_line}
Music style: {style}
Music voice: {voice}
Picture book style: {book}
Character name: {name} (fixed, do not rename)
Character type: {ctype}

Split the goal into 3 to 5 gradual learning steps.
{focus_rule}- Each step is simple, concrete and can stand alone as a lesson.
- Steps connect logically and keep the same scene, character and objects.
- Nothing frightening, violent, sad or dangerous; everything positive and warm.
- Each step's song lasts about 40 seconds.

Answer with valid JSON only, no prose and no Markdown fences:
{{
  "steps": [
    {{"step_number": 1, "step_name": "...", "step_description": "...", "learning_objective": "..."}}
  ],
  "character_name": "{name}",
  "character_description": "under 20 words",
  "character_sheet": {{
    "name": "{name}",
    "type": "{ctype}",
    "age": "...",
    "face": "...",
    "hair": "...",
    "outfit": "...",
    "accessory": "...",
    "main_colors": ["...", "..."],
    "reference_prompt": "one sentence fixing face, hair, outfit and colors for every step"
  }}
}}"#,
            goal = params.user_goal.trim(),
            focus_line = focus_line,
            style = params.music_style,
            voice = params.music_voice,
            book = params.picture_book_style,
            name = CHARACTER_NAME,
            ctype = params.character_type,
            focus_rule = focus_rule,
        )
    }

    fn lyrics(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> String {
        let structure = if step_number >= total_steps {
            "This is the final step: two or three [Verse] sections and one or two [Chorus] \
             sections, 8 to 15 lines in total, 35 to 45 seconds."
        } else {
            "Write it like a classic nursery rhyme: one or two [Verse] sections and an optional \
             repeating [Chorus], 6 to 10 short lines, 40 to 60 seconds."
        };

        format!(
            "You write learning songs for children aged 3 to 6.\n\n\
             Step: {name}\nDescription: {desc}\nObjective: {objective}\n\
             Character: {character}\nMusic style: {style}\nVoice: {voice}\n\
             Position: step {n} of {total}\n\n\
             {structure}\n\
             - Short lines, repetition and onomatopoeia; mention {character} by name.\n\
             - Every phrase starts on the downbeat.\n\
             - Keep the same singer, pitch range and tempo as the other steps.\n\
             - Output only the lyrics with [Verse]/[Chorus] tags, no notes or metadata.",
            name = step.step_name,
            desc = step.step_description,
            objective = step.learning_objective,
            character = character.name,
            style = params.music_style,
            voice = params.music_voice,
            n = step_number,
            total = total_steps,
            structure = structure,
        )
    }

    fn image(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> String {
        let described = if character.description.is_empty() {
            character.name.clone()
        } else {
            format!("{} ({})", character.name, character.description)
        };
        let consistency = match &character.reference_prompt {
            Some(card) => format!(
                "Character card (identical in every step, no outfit or hairstyle changes):\n{}",
                card
            ),
            None => "The character must appear and keep the same face, hair, outfit and art \
                     style in every step."
                .to_string(),
        };

        format!(
            "A {book} picture-book illustration for children aged 3 to 6.\n\n\
             Step: {name}\nDescription: {desc}\nObjective: {objective}\n\
             Position: step {n} of {total}\nCharacter: {described}\n\n\
             {consistency}\n\n\
             Show a warm everyday scene, not a lone object. The learning object is clear and \
             prominent, and the character points at or uses it. Bright soft colors, clean lines, \
             no text, nothing frightening or dangerous.",
            book = params.picture_book_style,
            name = step.step_name,
            desc = step.step_description,
            objective = step.learning_objective,
            n = step_number,
            total = total_steps,
            described = described,
            consistency = consistency,
        )
    }

    fn music(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        lyrics: Option<&str>,
    ) -> MusicRequest {
        let tags = style_tags(&params.music_style);
        let prompt = match lyrics.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lyrics) => lyrics.to_string(),
            None => format!(
                "[Verse]\n{name}\n{desc}\nLet's learn together\nWith {character} by our side\n\n\
                 [Chorus]\nStep by step we go\nLearning every day\n{objective}\n\
                 We're getting better, hooray!",
                name = step.step_name,
                desc = step.step_description,
                character = character.name,
                objective = step.learning_objective,
            ),
        };

        MusicRequest {
            prompt: Some(prompt),
            title: Some(step.step_name.clone()),
            tags: Some(format!("{}, {} vocals", tags, params.music_voice)),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> LearningStep {
        LearningStep {
            step_number: 2,
            step_name: "Rinse".into(),
            step_description: "Rinse the soap off".into(),
            learning_objective: "Hands are clean".into(),
        }
    }

    fn character() -> CharacterProfile {
        CharacterProfile {
            name: CHARACTER_NAME.into(),
            description: String::new(),
            reference_prompt: Some("round face, red shirt".into()),
        }
    }

    #[test]
    fn test_decompose_mentions_focus_only_when_set() {
        let mut params = RequestParameters::for_goal("wash hands");
        assert!(!DefaultPrompts.decompose(&params).contains("Learning focus"));
        params.learning_focus = "soap".into();
        assert!(DefaultPrompts.decompose(&params).contains("Learning focus: soap"));
    }

    #[test]
    fn test_image_prompt_pins_character_card() {
        let prompt =
            DefaultPrompts.image(&step(), &character(), &RequestParameters::default(), 2, 3);
        assert!(prompt.contains("round face, red shirt"));
        assert!(prompt.contains("step 2 of 3"));
    }

    #[test]
    fn test_music_request_prefers_lyrics() {
        let params = RequestParameters::default();
        let request = DefaultPrompts.music(&step(), &character(), &params, Some("[Verse] la la"));
        assert_eq!(request.prompt.as_deref(), Some("[Verse] la la"));
        assert_eq!(request.title.as_deref(), Some("Rinse"));

        let request = DefaultPrompts.music(&step(), &character(), &params, None);
        assert!(request.prompt.unwrap().contains("Rinse the soap off"));
    }
}
