//! Generation request prompts.

use crate::model::{TeaserContent, MAX_TEASER_SECONDS, MIN_TEASER_SECONDS};

/// Builds the content-extraction prompt.
///
/// The narration window is a small band around the target so the model
/// has room to land a natural sentence boundary.
#[must_use]
pub fn extraction_prompt(title: &str, excerpt: &str, target_seconds: u32, language: &str) -> String {
    let lower = target_seconds.saturating_sub(1).max(MIN_TEASER_SECONDS);
    let upper = (target_seconds + 1).min(MAX_TEASER_SECONDS);

    format!(
        "Extract teaser content from this podcast script for a {target_seconds}-second \
         social media clip.\n\
         \n\
         All textual fields must be written in natural, fluent {language}.\n\
         \n\
         PODCAST TITLE: {title}\n\
         \n\
         SCRIPT CONTENT:\n{excerpt}\n\
         \n\
         Provide:\n\
         1. headline: a catchy, attention-grabbing headline (max 10 words)\n\
         2. narration: a {lower}-{upper} second narration script that hooks viewers\n\
         3. key_points: 3-5 of the most interesting moments\n\
         4. visual_description: what the video should show\n\
         \n\
         Respond as JSON:\n\
         {{\n\
           \"headline\": \"...\",\n\
           \"narration\": \"...\",\n\
           \"key_points\": [\"...\"],\n\
           \"visual_description\": \"...\",\n\
           \"duration_seconds\": {target_seconds}\n\
         }}\n"
    )
}

/// Builds the video-generation prompt: three timed scenes derived from
/// the extracted key moments, plus overall style guidance.
#[must_use]
pub fn video_prompt(content: &TeaserContent) -> String {
    let insight = content
        .key_points
        .first()
        .map_or_else(|| content.headline.clone(), Clone::clone);
    let emotional = content.key_points.get(1).map_or_else(
        || {
            content
                .visual_description
                .split('.')
                .next()
                .unwrap_or_default()
                .to_string()
        },
        Clone::clone,
    );
    let curiosity = content.key_points.get(2).map_or_else(
        || format!("What comes next in '{}'?", content.headline),
        Clone::clone,
    );

    let total = content.duration_seconds.max(MIN_TEASER_SECONDS);
    let base = (total / 3).max(2);
    let mut scenes = [base, base, base];
    let mut remainder = total.saturating_sub(base * 3);
    for slot in &mut scenes {
        if remainder == 0 {
            break;
        }
        *slot += 1;
        remainder -= 1;
    }

    let mut prompt = format!(
        "A {total}-second vertical social-media teaser for a podcast episode titled \
         '{headline}'. Cinematic, symbolic, moody visuals with smooth modern motion; \
         no human faces. Visual direction: {visuals}\n\n",
        headline = content.headline,
        visuals = content.visual_description.trim(),
    );
    for (i, (seconds, narration)) in scenes
        .iter()
        .zip([&insight, &emotional, &curiosity])
        .enumerate()
    {
        prompt.push_str(&format!(
            "Scene {n} ({seconds}s): {narration}\n",
            n = i + 1,
        ));
    }
    prompt.push_str("\nKey moments:\n");
    for point in &content.key_points {
        prompt.push_str(&format!("- {point}\n"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> TeaserContent {
        TeaserContent {
            headline: "The Hidden Cost".into(),
            narration: "Nobody saw it coming.".into(),
            key_points: vec![
                "The first claim".into(),
                "The counter-argument".into(),
                "The unresolved question".into(),
            ],
            visual_description: "Stormy sea at dusk. Distant lighthouse.".into(),
            duration_seconds: 16,
        }
    }

    #[test]
    fn test_extraction_prompt_carries_window_and_language() {
        let prompt = extraction_prompt("Ep1", "the script", 15, "en-US");
        assert!(prompt.contains("14-16 second"));
        assert!(prompt.contains("fluent en-US"));
        assert!(prompt.contains("\"duration_seconds\": 15"));
        assert!(prompt.contains("the script"));
    }

    #[test]
    fn test_extraction_prompt_window_respects_bounds() {
        let prompt = extraction_prompt("Ep1", "s", MIN_TEASER_SECONDS, "en-US");
        assert!(prompt.contains(&format!(
            "{MIN_TEASER_SECONDS}-{} second",
            MIN_TEASER_SECONDS + 1
        )));
    }

    #[test]
    fn test_video_prompt_scene_durations_cover_total() {
        let prompt = video_prompt(&content());
        // 16s split into three scenes: 6 + 5 + 5.
        assert!(prompt.contains("Scene 1 (6s): The first claim"));
        assert!(prompt.contains("Scene 2 (5s): The counter-argument"));
        assert!(prompt.contains("Scene 3 (5s): The unresolved question"));
    }

    #[test]
    fn test_video_prompt_fills_missing_key_points() {
        let mut sparse = content();
        sparse.key_points.truncate(1);
        let prompt = video_prompt(&sparse);
        assert!(prompt.contains("The first claim"));
        assert!(prompt.contains("Stormy sea at dusk"));
        assert!(prompt.contains("What comes next in 'The Hidden Cost'?"));
    }
}
